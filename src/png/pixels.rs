use super::*;

/// Size of the buffer compressed output is drained through.
const DEFLATE_BUF_SIZE: usize = 16 * 1024;

/// Calls to `deflate` in a row that produce nothing before we give up.
const MAX_STALLS: u32 = 4;

/// Turns raw rows into `IDAT` chunks.
///
/// Holds the previous row for the filters, the filter engine, the zlib stream
/// and the [`IdatWriter`].
#[derive(Debug)]
pub struct PixelsWriter<D: Deflater> {
  geometry: ImageGeometry,
  engine: RowFilterEngine,
  deflater: D,
  idat: IdatWriter,
  prev: Vec<u8>,
  filtered: Vec<u8>,
  out_buf: Vec<u8>,
  rows_done: u32,
  finished: bool,
}
impl<D: Deflater> PixelsWriter<D> {
  #[must_use]
  pub fn new(geometry: ImageGeometry, filter_type: FilterType, deflater: D) -> Self {
    Self {
      geometry,
      engine: RowFilterEngine::new(geometry, filter_type),
      deflater,
      idat: IdatWriter::default(),
      prev: vec![0; geometry.bytes_per_row()],
      filtered: Vec::with_capacity(geometry.bytes_per_row() + 1),
      out_buf: Vec::new(),
      rows_done: 0,
      finished: false,
    }
  }

  #[inline]
  #[must_use]
  pub fn engine(&self) -> &RowFilterEngine {
    &self.engine
  }
  #[inline]
  pub fn deflater_mut(&mut self) -> &mut D {
    &mut self.deflater
  }
  #[inline]
  #[must_use]
  pub fn idat(&self) -> &IdatWriter {
    &self.idat
  }
  #[inline]
  pub fn idat_mut(&mut self) -> &mut IdatWriter {
    &mut self.idat
  }
  #[inline]
  pub fn set_filter_type(&mut self, filter_type: FilterType) {
    self.engine.set_filter_type(filter_type);
  }
  /// Rows that went through the filter and into the zlib stream.
  #[inline]
  #[must_use]
  pub const fn rows_done(&self) -> u32 {
    self.rows_done
  }

  /// Filters and compresses the next row, writing any `IDAT` that fills up.
  ///
  /// `raw` must already be checked to be one row long.
  pub fn write_row<S: ByteSink, C: ChecksumEngine>(
    &mut self, out: &mut ChunkSink<'_, S, C>, raw: &[u8], preserved: Option<StandardFilter>,
  ) -> PngResult<StandardFilter> {
    if self.finished {
      return Err(PngError::StreamMisuse("row given after the stream was finished"));
    }
    debug_assert_eq!(raw.len(), self.geometry.bytes_per_row());
    let row = self.rows_done;
    let chosen = self.engine.filter_into(row, raw, &self.prev, preserved, &mut self.filtered)?;
    self.deflater.set_input(&self.filtered)?;
    self.drain(out, Some(row))?;
    self.prev.copy_from_slice(raw);
    self.rows_done += 1;
    Ok(chosen)
  }

  /// Ends the zlib stream and writes the last `IDAT`.
  pub fn finish<S: ByteSink, C: ChecksumEngine>(
    &mut self, out: &mut ChunkSink<'_, S, C>,
  ) -> PngResult<()> {
    if self.finished {
      return Ok(());
    }
    self.deflater.finish();
    self.drain(out, None)?;
    self.idat.flush(out, None)?;
    self.finished = true;
    debug!(
      "pixel data done: {} rows, {} raw bytes, {} IDAT bytes in {} chunks",
      self.rows_done,
      self.deflater.total_in(),
      self.idat.total_bytes(),
      self.idat.chunk_lens().len()
    );
    Ok(())
  }

  /// Pulls compressed output until the deflater wants input (or is done).
  fn drain<S: ByteSink, C: ChecksumEngine>(
    &mut self, out: &mut ChunkSink<'_, S, C>, row: Option<u32>,
  ) -> PngResult<()> {
    if self.out_buf.len() != DEFLATE_BUF_SIZE {
      self.out_buf.resize(DEFLATE_BUF_SIZE, 0);
    }
    let mut stalls = 0;
    loop {
      let n = self.deflater.deflate(&mut self.out_buf)?;
      if n > 0 {
        stalls = 0;
        self.idat.push(out, &self.out_buf[..n], row)?;
        continue;
      }
      if self.deflater.finished() || self.deflater.needs_input() {
        return Ok(());
      }
      stalls += 1;
      if stalls >= MAX_STALLS {
        return Err(PngError::Compression("deflater stopped making progress"));
      }
    }
  }

  /// IDAT payload bytes over filtered bytes.
  ///
  /// ## Failure
  /// * `NotFinished` before [`finish`](Self::finish).
  pub fn compression_ratio(&self) -> PngResult<f64> {
    if !self.finished {
      return Err(PngError::NotFinished);
    }
    Ok(self.idat.total_bytes() as f64 / self.geometry.total_raw_bytes() as f64)
  }

  /// Releases the compressor's buffers.
  pub fn end(&mut self) {
    self.deflater.end();
    self.out_buf = Vec::new();
  }
}
