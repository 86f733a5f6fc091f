use super::*;

/// Palette data
///
/// Palette entries are always RGB.
///
/// If you want to have a paletted image with transparency then the transparency
/// info goes in a separate [`tRNS`] chunk.
///
/// Spec: [PLTE](https://www.w3.org/TR/png/#11PLTE)
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct PLTE(Vec<[u8; 3]>);
impl From<&[[u8; 3]]> for PLTE {
  #[inline]
  fn from(entries: &[[u8; 3]]) -> Self {
    Self(entries.to_vec())
  }
}
impl From<Vec<[u8; 3]>> for PLTE {
  #[inline]
  fn from(entries: Vec<[u8; 3]>) -> Self {
    Self(entries)
  }
}
impl Debug for PLTE {
  #[inline]
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    // currently prints no more than 4 palette entries
    f.debug_tuple("PLTE").field(&&self.0[..self.0.len().min(4)]).field(&self.0.len()).finish()
  }
}
impl PLTE {
  /// Gets the entries as a slice.
  #[inline]
  #[must_use]
  pub fn entries(&self) -> &[[u8; 3]] {
    &self.0
  }

  #[inline]
  #[must_use]
  pub fn len(&self) -> usize {
    self.0.len()
  }

  #[inline]
  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  /// Sets one entry, growing the palette if needed.
  ///
  /// ## Failure
  /// * `InvalidChunkData` past the 256th entry.
  pub fn set_entry(&mut self, index: usize, rgb: [u8; 3]) -> PngResult<()> {
    if index >= 256 {
      return Err(PngError::InvalidChunkData { ty: ChunkTy::PLTE, reason: "more than 256 entries" });
    }
    if index >= self.0.len() {
      self.0.resize(index + 1, [0; 3]);
    }
    self.0[index] = rgb;
    Ok(())
  }

  /// Parses a payload.
  ///
  /// ## Failure
  /// * `InvalidChunkData` if the length isn't a multiple of 3.
  pub fn parse(data: &[u8]) -> PngResult<Self> {
    match bytemuck::try_cast_slice::<u8, [u8; 3]>(data) {
      Ok(entries) => Ok(Self::from(entries)),
      Err(_) => {
        Err(PngError::InvalidChunkData { ty: ChunkTy::PLTE, reason: "length must be a multiple of 3" })
      }
    }
  }
}
impl ChunkPayload for PLTE {
  const TY: ChunkTy = ChunkTy::PLTE;

  /// ## Failure
  /// * `PaletteNotAllowed` for greyscale images.
  /// * `InvalidChunkData` with 0 or more than 256 entries, or more entries
  ///   than an indexed image's bit depth can address.
  fn payload(&self, geometry: &ImageGeometry) -> PngResult<Vec<u8>> {
    if geometry.is_greyscale() {
      return Err(PngError::PaletteNotAllowed);
    }
    let n = self.0.len();
    if n == 0 || n > 256 {
      return Err(PngError::InvalidChunkData { ty: Self::TY, reason: "must have 1 to 256 entries" });
    }
    if n > geometry.max_palette_len() {
      return Err(PngError::InvalidChunkData {
        ty: Self::TY,
        reason: "more entries than the bit depth can index",
      });
    }
    Ok(bytemuck::cast_slice::<[u8; 3], u8>(&self.0).to_vec())
  }
}
