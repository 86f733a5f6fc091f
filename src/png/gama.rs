use super::*;

/// Image gamma, times 100,000.
///
/// Spec: [gAMA](https://www.w3.org/TR/png/#11gAMA)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(nonstandard_style)]
pub struct gAMA(pub u32);
impl gAMA {
  /// The gamma that goes with sRGB data (1/2.2).
  pub const SRGB: Self = Self(45455);

  /// ## Failure
  /// * `InvalidChunkData` unless `gamma` is positive and small enough.
  pub fn from_gamma(gamma: f64) -> PngResult<Self> {
    let scaled = gamma * 100_000.0;
    if !(scaled >= 0.5 && scaled < f64::from(u32::MAX)) {
      return Err(PngError::InvalidChunkData { ty: ChunkTy::gAMA, reason: "gamma out of range" });
    }
    Ok(Self((scaled + 0.5) as u32))
  }

  #[inline]
  #[must_use]
  pub fn gamma(self) -> f64 {
    f64::from(self.0) / 100_000.0
  }

  /// ## Failure
  /// * `InvalidChunkData` unless the payload is 4 bytes.
  pub fn parse(data: &[u8]) -> PngResult<Self> {
    match data.try_into() {
      Ok(bytes) => Ok(Self(u32::from_be_bytes(bytes))),
      Err(_) => Err(PngError::InvalidChunkData { ty: ChunkTy::gAMA, reason: "must be 4 bytes" }),
    }
  }
}
impl ChunkPayload for gAMA {
  const TY: ChunkTy = ChunkTy::gAMA;

  fn payload(&self, _: &ImageGeometry) -> PngResult<Vec<u8>> {
    if self.0 == 0 {
      return Err(PngError::InvalidChunkData { ty: Self::TY, reason: "gamma can't be 0" });
    }
    Ok(self.0.to_be_bytes().to_vec())
  }
}
