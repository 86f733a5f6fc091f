use super::*;

/// Largest width or height accepted, in pixels.
pub const MAX_DIMENSION: u32 = 1 << 24;

/// The types of color that PNG supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum PngColorType {
  /// Greyscale
  Y = 0,
  /// Red, Green, Blue
  RGB = 2,
  /// Index into a palette.
  ///
  /// The palette will have RGB8 data. There may optionally be a transparency
  /// chunk.
  Index = 3,
  /// Greyscale + Alpha
  YA = 4,
  /// Red, Green, Blue, Alpha
  RGBA = 6,
}
impl PngColorType {
  /// The number of channels in this type of color.
  #[inline]
  #[must_use]
  pub const fn channel_count(self) -> u8 {
    match self {
      Self::Y => 1,
      Self::RGB => 3,
      Self::Index => 1,
      Self::YA => 2,
      Self::RGBA => 4,
    }
  }
}
impl TryFrom<u8> for PngColorType {
  type Error = ();
  #[inline]
  fn try_from(value: u8) -> Result<Self, Self::Error> {
    Ok(match value {
      0 => PngColorType::Y,
      2 => PngColorType::RGB,
      3 => PngColorType::Index,
      4 => PngColorType::YA,
      6 => PngColorType::RGBA,
      _ => return Err(()),
    })
  }
}

/// Describes the pixel layout of an image.
///
/// This is checked when it's made, and can't change afterwards. Every size
/// that the rest of the writer needs is computed up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageGeometry {
  width: u32,
  height: u32,
  bit_depth: u8,
  channels: u8,
  alpha: bool,
  greyscale: bool,
  indexed: bool,
  bits_per_pixel: u32,
  bytes_per_pixel: usize,
  bytes_per_row: usize,
  samples_per_row: usize,
}
impl ImageGeometry {
  /// Makes a new geometry.
  ///
  /// * `alpha`: the image has an alpha channel.
  /// * `greyscale`: one (or two, with alpha) channels of grey.
  /// * `indexed`: one channel of palette indexes.
  ///
  /// With neither `greyscale` nor `indexed` the image is RGB(A).
  ///
  /// ## Failure
  /// * Width or height of 0, or above [`MAX_DIMENSION`].
  /// * Any bit depth / color type pair that PNG doesn't allow.
  pub fn new(
    width: u32, height: u32, bit_depth: u8, alpha: bool, greyscale: bool, indexed: bool,
  ) -> PngResult<Self> {
    if width == 0 || width > MAX_DIMENSION {
      return Err(PngError::InvalidGeometry("width must be 1 to 2^24"));
    }
    if height == 0 || height > MAX_DIMENSION {
      return Err(PngError::InvalidGeometry("height must be 1 to 2^24"));
    }
    if greyscale && indexed {
      return Err(PngError::InvalidGeometry("greyscale and indexed are exclusive"));
    }
    if indexed && alpha {
      return Err(PngError::InvalidGeometry("indexed images can't have an alpha channel"));
    }
    match bit_depth {
      1 | 2 | 4 => {
        if !(greyscale || indexed) || alpha {
          return Err(PngError::InvalidGeometry(
            "bit depths below 8 need greyscale (no alpha) or indexed",
          ));
        }
      }
      8 => (),
      16 => {
        if indexed {
          return Err(PngError::InvalidGeometry("indexed images can't be 16-bit"));
        }
      }
      _ => return Err(PngError::InvalidGeometry("bit depth must be 1, 2, 4, 8, or 16")),
    }
    let channels: u8 = if greyscale || indexed {
      if alpha {
        2
      } else {
        1
      }
    } else if alpha {
      4
    } else {
      3
    };
    let bits_per_pixel = u32::from(channels) * u32::from(bit_depth);
    let samples_per_row = usize::from(channels)
      .checked_mul(width as usize)
      .filter(|&s| s >= 1)
      .ok_or(PngError::InvalidGeometry("samples per row overflow"))?;
    let bits_per_row = (bits_per_pixel as usize)
      .checked_mul(width as usize)
      .ok_or(PngError::InvalidGeometry("bits per row overflow"))?;
    Ok(Self {
      width,
      height,
      bit_depth,
      channels,
      alpha,
      greyscale,
      indexed,
      bits_per_pixel,
      // only the filters care about this, and they want at least 1
      bytes_per_pixel: ((bits_per_pixel as usize + 7) / 8).max(1),
      bytes_per_row: (bits_per_row + 7) / 8,
      samples_per_row,
    })
  }

  /// 8-bit RGB
  #[inline]
  pub fn rgb8(width: u32, height: u32) -> PngResult<Self> {
    Self::new(width, height, 8, false, false, false)
  }
  /// 8-bit RGBA
  #[inline]
  pub fn rgba8(width: u32, height: u32) -> PngResult<Self> {
    Self::new(width, height, 8, true, false, false)
  }
  /// 8-bit greyscale
  #[inline]
  pub fn grey8(width: u32, height: u32) -> PngResult<Self> {
    Self::new(width, height, 8, false, true, false)
  }
  /// 8-bit palette indexes
  #[inline]
  pub fn indexed8(width: u32, height: u32) -> PngResult<Self> {
    Self::new(width, height, 8, false, false, true)
  }

  #[inline]
  #[must_use]
  pub const fn width(&self) -> u32 {
    self.width
  }
  #[inline]
  #[must_use]
  pub const fn height(&self) -> u32 {
    self.height
  }
  #[inline]
  #[must_use]
  pub const fn bit_depth(&self) -> u8 {
    self.bit_depth
  }
  #[inline]
  #[must_use]
  pub const fn channels(&self) -> u8 {
    self.channels
  }
  #[inline]
  #[must_use]
  pub const fn has_alpha(&self) -> bool {
    self.alpha
  }
  #[inline]
  #[must_use]
  pub const fn is_greyscale(&self) -> bool {
    self.greyscale
  }
  #[inline]
  #[must_use]
  pub const fn is_indexed(&self) -> bool {
    self.indexed
  }
  /// Most palette (and indexed `tRNS`) entries the image can use: 256, or
  /// fewer when the index is under 8 bits.
  #[inline]
  #[must_use]
  pub const fn max_palette_len(&self) -> usize {
    if self.indexed && self.bit_depth < 8 {
      1 << self.bit_depth
    } else {
      256
    }
  }
  /// Several samples share each byte.
  #[inline]
  #[must_use]
  pub const fn is_packed(&self) -> bool {
    self.bit_depth < 8
  }
  #[inline]
  #[must_use]
  pub const fn bits_per_pixel(&self) -> u32 {
    self.bits_per_pixel
  }
  /// Bytes per complete pixel, rounded up, minimum 1.
  ///
  /// This is the "left neighbor" distance used by the filters. Don't use it to
  /// size rows, packed pixels share bytes.
  #[inline]
  #[must_use]
  pub const fn bytes_per_pixel(&self) -> usize {
    self.bytes_per_pixel
  }
  /// Bytes of one raw row, not counting the filter byte.
  #[inline]
  #[must_use]
  pub const fn bytes_per_row(&self) -> usize {
    self.bytes_per_row
  }
  #[inline]
  #[must_use]
  pub const fn samples_per_row(&self) -> usize {
    self.samples_per_row
  }
  #[inline]
  #[must_use]
  pub const fn total_pixels(&self) -> u64 {
    self.width as u64 * self.height as u64
  }
  /// Bytes of all rows once filtered, including each row's filter byte.
  ///
  /// This is how much data goes into the compressor.
  #[inline]
  #[must_use]
  pub const fn total_raw_bytes(&self) -> u64 {
    (self.bytes_per_row as u64 + 1) * self.height as u64
  }

  #[inline]
  #[must_use]
  pub const fn color_type(&self) -> PngColorType {
    match (self.indexed, self.greyscale, self.alpha) {
      (true, _, _) => PngColorType::Index,
      (false, true, false) => PngColorType::Y,
      (false, true, true) => PngColorType::YA,
      (false, false, false) => PngColorType::RGB,
      (false, false, true) => PngColorType::RGBA,
    }
  }
}
