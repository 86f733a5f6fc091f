use super::*;

/// Convenience access to the metadata chunks of an image being written.
///
/// Every setter builds the chunk, checks it against the image, and queues it
/// (replacing an equivalent queued chunk). Get one from
/// [`PngWriter::metadata`].
#[derive(Debug)]
pub struct PngMetadata<'w> {
  chunks: &'w mut ChunksList,
  geometry: ImageGeometry,
}
impl<'w> PngMetadata<'w> {
  #[inline]
  pub(crate) fn new(chunks: &'w mut ChunksList, geometry: ImageGeometry) -> Self {
    Self { chunks, geometry }
  }

  /// Queues any chunk value.
  pub fn queue<P: ChunkPayload>(&mut self, value: &P) -> PngResult<()> {
    let chunk = value.to_chunk(&self.geometry)?;
    debug!("metadata: queueing {:?}", chunk.ty());
    self.chunks.queue(chunk)
  }

  /// `pHYs` with square pixels.
  pub fn set_dpi(&mut self, dpi: f64) -> PngResult<()> {
    self.queue(&pHYs::from_dpi(dpi)?)
  }

  /// `pHYs`
  pub fn set_dpi_xy(&mut self, dpi_x: f64, dpi_y: f64) -> PngResult<()> {
    self.queue(&pHYs::from_dpi_xy(dpi_x, dpi_y)?)
  }

  /// `tEXt`, replacing any queued text with the same keyword.
  pub fn set_text(&mut self, keyword: &str, text: &str) -> PngResult<()> {
    self.queue(&tEXt::new(keyword, text))
  }

  /// `tIME`
  pub fn set_time(&mut self, time: tIME) -> PngResult<()> {
    self.queue(&time)
  }

  /// `gAMA`
  pub fn set_gamma(&mut self, gamma: f64) -> PngResult<()> {
    self.queue(&gAMA::from_gamma(gamma)?)
  }

  /// `sRGB`, along with the matching `gAMA`.
  pub fn set_srgb(&mut self, intent: SrgbIntent) -> PngResult<()> {
    self.queue(&sRGB(intent))?;
    self.queue(&gAMA::SRGB)
  }

  /// `tRNS`
  pub fn set_transparency(&mut self, trns: tRNS) -> PngResult<()> {
    self.queue(&trns)
  }

  /// `PLTE`
  pub fn create_palette(&mut self, entries: &[[u8; 3]]) -> PngResult<()> {
    self.queue(&PLTE::from(entries))
  }

  /// The text for a keyword, looking at queued chunks first.
  #[must_use]
  pub fn get_text(&self, keyword: &str) -> Option<String> {
    self
      .chunks
      .queued_of_type(ChunkTy::tEXt)
      .chain(self.chunks.written_of_type(ChunkTy::tEXt))
      .filter_map(|c| tEXt::parse(c.data()?).ok())
      .find(|t| t.keyword == keyword)
      .map(|t| t.text)
  }

  /// The DPI from `pHYs`, looking at queued chunks first.
  #[must_use]
  pub fn get_dpi(&self) -> Option<(f64, f64)> {
    self
      .chunks
      .queued_of_type(ChunkTy::pHYs)
      .chain(self.chunks.written_of_type(ChunkTy::pHYs))
      .find_map(|c| pHYs::parse(c.data()?).ok())
      .and_then(|p| p.dpi())
  }
}
