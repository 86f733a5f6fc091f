use super::*;

/// Transparency
///
/// Format depends on the PNG color type:
/// * greyscale: one sample value that's fully transparent.
/// * RGB: one RGB value that's fully transparent.
/// * indexed: an alpha value for each palette entry. There can be less alpha
///   entries than palette entries (missing entries are fully opaque).
///
/// Images that have an alpha channel can't use this.
///
/// Spec: [tRNS](https://www.w3.org/TR/png/#11tRNS)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[allow(nonstandard_style)]
pub enum tRNS {
  Y(u16),
  RGB([u16; 3]),
  Index(Vec<u8>),
}
impl tRNS {
  /// Parses a payload, which needs the geometry to be understood.
  ///
  /// ## Failure
  /// * `InvalidChunkData` if the length doesn't fit the color type, or the
  ///   image has an alpha channel.
  /// * `InvalidChunkData` with more alpha entries than the bit depth can
  ///   index.
  pub fn parse(data: &[u8], geometry: &ImageGeometry) -> PngResult<Self> {
    let bad = |reason| PngError::InvalidChunkData { ty: ChunkTy::tRNS, reason };
    match (geometry.color_type(), data) {
      (PngColorType::Y, [y0, y1]) => Ok(Self::Y(u16::from_be_bytes([*y0, *y1]))),
      (PngColorType::RGB, [r0, r1, g0, g1, b0, b1]) => Ok(Self::RGB([
        u16::from_be_bytes([*r0, *r1]),
        u16::from_be_bytes([*g0, *g1]),
        u16::from_be_bytes([*b0, *b1]),
      ])),
      (PngColorType::Index, alphas) if alphas.len() <= geometry.max_palette_len() => {
        Ok(Self::Index(alphas.to_vec()))
      }
      (PngColorType::YA | PngColorType::RGBA, _) => Err(bad("image already has alpha")),
      _ => Err(bad("wrong length for the color type")),
    }
  }
}
impl ChunkPayload for tRNS {
  const TY: ChunkTy = ChunkTy::tRNS;

  /// ## Failure
  /// * `InvalidChunkData` when the variant doesn't match the color type, when
  ///   a sample is too big for the bit depth, or with more alphas than the
  ///   bit depth can index.
  fn payload(&self, geometry: &ImageGeometry) -> PngResult<Vec<u8>> {
    let bad = |reason| PngError::InvalidChunkData { ty: Self::TY, reason };
    let max = if geometry.bit_depth() == 16 { u16::MAX } else { (1_u16 << geometry.bit_depth()) - 1 };
    match (self, geometry.color_type()) {
      (Self::Y(y), PngColorType::Y) => {
        if *y > max {
          return Err(bad("sample is too big for the bit depth"));
        }
        Ok(y.to_be_bytes().to_vec())
      }
      (Self::RGB(rgb), PngColorType::RGB) => {
        if rgb.iter().any(|c| *c > max) {
          return Err(bad("sample is too big for the bit depth"));
        }
        Ok(rgb.iter().flat_map(|c| c.to_be_bytes()).collect())
      }
      (Self::Index(alphas), PngColorType::Index) => {
        if alphas.len() > geometry.max_palette_len() {
          return Err(bad("more alpha entries than the bit depth can index"));
        }
        Ok(alphas.clone())
      }
      (_, PngColorType::YA | PngColorType::RGBA) => Err(bad("image already has alpha")),
      _ => Err(bad("variant doesn't match the color type")),
    }
  }
}
