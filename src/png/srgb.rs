use super::*;

/// Standard RGB colour space
///
/// Spec: [sRGB](https://www.w3.org/TR/png/#11sRGB)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(nonstandard_style)]
pub struct sRGB(pub SrgbIntent);
impl sRGB {
  /// ## Failure
  /// * `InvalidChunkData` unless the payload is one known intent byte.
  pub fn parse(data: &[u8]) -> PngResult<Self> {
    Ok(Self(match data {
      [0] => SrgbIntent::Perceptual,
      [1] => SrgbIntent::RelativeColorimetric,
      [2] => SrgbIntent::Saturation,
      [3] => SrgbIntent::AbsoluteColorimetric,
      _ => return Err(PngError::InvalidChunkData { ty: ChunkTy::sRGB, reason: "unknown intent" }),
    }))
  }
}
impl ChunkPayload for sRGB {
  const TY: ChunkTy = ChunkTy::sRGB;

  #[inline]
  fn payload(&self, _: &ImageGeometry) -> PngResult<Vec<u8>> {
    Ok(vec![self.0 as u8])
  }
}
