use super::*;

/// Image Header
///
/// Spec: [IHDR](https://www.w3.org/TR/png/#11IHDR)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IHDR {
  pub width: u32,
  pub height: u32,
  pub bit_depth: u8,
  pub color_type: PngColorType,
  /// Adam7 interlacing. Only ever `false` in what this crate writes.
  pub interlaced: bool,
}
impl IHDR {
  /// Payload bytes. Compression and filter method are always 0.
  #[must_use]
  pub fn to_bytes(&self) -> [u8; 13] {
    let mut out = [0_u8; 13];
    out[0..4].copy_from_slice(&self.width.to_be_bytes());
    out[4..8].copy_from_slice(&self.height.to_be_bytes());
    out[8] = self.bit_depth;
    out[9] = self.color_type as u8;
    out[10] = 0;
    out[11] = 0;
    out[12] = u8::from(self.interlaced);
    out
  }

  /// The geometry this header describes.
  ///
  /// ## Failure
  /// * `InvalidGeometry` if the fields aren't a legal combination.
  /// * `Parse` if the image is interlaced.
  pub fn geometry(&self) -> PngResult<ImageGeometry> {
    if self.interlaced {
      return Err(PngError::Parse("interlaced images are not supported"));
    }
    let (alpha, greyscale, indexed) = match self.color_type {
      PngColorType::Y => (false, true, false),
      PngColorType::YA => (true, true, false),
      PngColorType::RGB => (false, false, false),
      PngColorType::RGBA => (true, false, false),
      PngColorType::Index => (false, false, true),
    };
    ImageGeometry::new(self.width, self.height, self.bit_depth, alpha, greyscale, indexed)
  }
}
impl From<&ImageGeometry> for IHDR {
  #[inline]
  fn from(g: &ImageGeometry) -> Self {
    Self {
      width: g.width(),
      height: g.height(),
      bit_depth: g.bit_depth(),
      color_type: g.color_type(),
      interlaced: false,
    }
  }
}
impl TryFrom<&[u8]> for IHDR {
  type Error = PngError;
  #[inline]
  fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
    let bytes: &[u8; 13] = data.try_into().map_err(|_| PngError::Parse("IHDR must be 13 bytes"))?;
    let [w0, w1, w2, w3, h0, h1, h2, h3, bit_depth, color_type, compression, filter, interlace] =
      *bytes;
    if compression != 0 || filter != 0 {
      return Err(PngError::Parse("unknown compression or filter method"));
    }
    Ok(Self {
      width: u32::from_be_bytes([w0, w1, w2, w3]),
      height: u32::from_be_bytes([h0, h1, h2, h3]),
      bit_depth,
      color_type: PngColorType::try_from(color_type)
        .map_err(|_| PngError::Parse("unknown color type"))?,
      interlaced: match interlace {
        0 => false,
        1 => true,
        _ => return Err(PngError::Parse("unknown interlace method")),
      },
    })
  }
}
