use super::*;

/// Writes a PNG one row at a time.
///
/// * Make it with [`new`](Self::new) (or [`with_engines`](Self::with_engines)
///   to pick the compressor and checksum).
/// * Configure it and queue metadata.
/// * Write every row, top to bottom.
/// * Call [`finish`](Self::finish).
///
/// Nothing is written to the sink until the first row (or `finish`). Once a
/// write fails with anything other than a bad argument, the writer closes
/// itself and every later call gives `WriterClosed`.
///
/// Dropping the writer closes it. An unfinished image is just abandoned, with
/// whatever bytes were already written left in the sink.
pub struct PngWriter<S: ByteSink, D: Deflater = MinizDeflater, C: ChecksumEngine = FastCrc32> {
  sink: S,
  crc: C,
  geometry: ImageGeometry,
  chunks: ChunksList,
  group: ChunkGroup,
  pixels: PixelsWriter<D>,
  /// The row whose write is putting chunks out, for sink error context.
  row_in_flight: Option<u32>,
  should_close_sink: bool,
  copy_source: Option<(Vec<Chunk>, CopyPolicy)>,
  sample_buf: Vec<u8>,
  finished: bool,
  closed: bool,
}
impl<S: ByteSink> PngWriter<S> {
  /// A writer using `miniz_oxide` at the default level and `crc32fast`.
  #[inline]
  #[must_use]
  pub fn new(sink: S, geometry: ImageGeometry) -> Self {
    Self::with_engines(sink, geometry, MinizDeflater::default(), FastCrc32::new())
  }
}
impl<S: ByteSink, D: Deflater, C: ChecksumEngine> PngWriter<S, D, C> {
  #[must_use]
  pub fn with_engines(sink: S, geometry: ImageGeometry, deflater: D, crc: C) -> Self {
    debug!("new writer: {geometry:?}");
    Self {
      sink,
      crc,
      geometry,
      chunks: ChunksList::new(),
      group: ChunkGroup::BeforeHeader,
      pixels: PixelsWriter::new(geometry, FilterType::Default, deflater),
      row_in_flight: None,
      should_close_sink: true,
      copy_source: None,
      sample_buf: Vec::new(),
      finished: false,
      closed: false,
    }
  }

  #[inline]
  #[must_use]
  pub const fn geometry(&self) -> &ImageGeometry {
    &self.geometry
  }
  /// Written and queued chunks.
  #[inline]
  #[must_use]
  pub const fn chunks(&self) -> &ChunksList {
    &self.chunks
  }
  /// The current position in the chunk sequence.
  #[inline]
  #[must_use]
  pub const fn group(&self) -> ChunkGroup {
    self.group
  }
  #[inline]
  #[must_use]
  pub const fn rows_written(&self) -> u32 {
    self.pixels.rows_done()
  }
  #[inline]
  #[must_use]
  pub const fn is_finished(&self) -> bool {
    self.finished
  }
  #[inline]
  #[must_use]
  pub const fn is_closed(&self) -> bool {
    self.closed
  }
  #[inline]
  #[must_use]
  pub fn filter_type(&self) -> FilterType {
    self.pixels.engine().filter_type()
  }
  /// How many rows used each standard filter.
  #[inline]
  #[must_use]
  pub fn filters_used(&self) -> [u32; 5] {
    self.pixels.engine().filters_used()
  }
  /// Share of rows that used each standard filter, as percentages.
  #[inline]
  #[must_use]
  pub fn filters_used_percent(&self) -> [f64; 5] {
    self.pixels.engine().filters_used_percent()
  }

  fn check_open(&self) -> PngResult<()> {
    if self.closed {
      Err(PngError::WriterClosed)
    } else {
      Ok(())
    }
  }

  fn check_configurable(&self) -> PngResult<()> {
    self.check_open()?;
    if self.group >= ChunkGroup::PixelData {
      return Err(PngError::StreamMisuse("configuration must happen before the first row"));
    }
    Ok(())
  }

  pub fn set_filter_type(&mut self, filter_type: FilterType) -> PngResult<()> {
    self.check_configurable()?;
    self.pixels.set_filter_type(filter_type);
    Ok(())
  }

  /// 0 (no compression) through 9 (best).
  pub fn set_compression_level(&mut self, level: u8) -> PngResult<()> {
    self.check_configurable()?;
    self.pixels.deflater_mut().set_level(level)
  }

  pub fn set_deflate_strategy(&mut self, strategy: DeflateStrategy) -> PngResult<()> {
    self.check_configurable()?;
    self.pixels.deflater_mut().set_strategy(strategy)
  }

  /// Largest `IDAT` payload, [`DEFAULT_IDAT_MAX_SIZE`] unless set.
  pub fn set_idat_max_size(&mut self, max_size: usize) -> PngResult<()> {
    self.check_configurable()?;
    self.pixels.idat_mut().set_max_size(max_size)
  }

  /// If the sink's `close` gets called when the writer is done (default on).
  pub fn set_should_close_sink(&mut self, should_close: bool) {
    self.should_close_sink = should_close;
  }

  /// Copies chunks from another image, as the policy allows.
  ///
  /// The chunks are queued when the header is written, skipping any that a
  /// queued or written chunk is equivalent to.
  ///
  /// ## Failure
  /// * `StreamMisuse` once the header is written.
  pub fn copy_chunks_from(&mut self, source: &[Chunk], policy: CopyPolicy) -> PngResult<()> {
    self.check_open()?;
    if self.group >= ChunkGroup::BeforePalette {
      return Err(PngError::StreamMisuse("chunks must be copied before the header is written"));
    }
    self.copy_source = Some((source.to_vec(), policy));
    Ok(())
  }

  /// Queues a chunk to be written at the right point.
  ///
  /// A chunk queued after its window has passed is reported by `finish` as
  /// `UnwrittenChunks`.
  pub fn queue_chunk(&mut self, chunk: Chunk) -> PngResult<()> {
    self.check_open()?;
    self.chunks.queue(chunk)
  }

  /// Metadata setters and getters.
  #[inline]
  pub fn metadata(&mut self) -> PngMetadata<'_> {
    PngMetadata::new(&mut self.chunks, self.geometry)
  }

  /// Writes the next row.
  ///
  /// ## Failure
  /// * `RowLength` if `row` isn't exactly `bytes_per_row` long.
  /// * `RowOverrun` if every row was already written.
  pub fn write_row(&mut self, row: &[u8]) -> PngResult<()> {
    self.write_row_inner(row, None, None)
  }

  /// Writes several rows in order, stopping at the first error.
  pub fn write_rows<'r>(&mut self, rows: impl IntoIterator<Item = &'r [u8]>) -> PngResult<()> {
    rows.into_iter().try_for_each(|row| self.write_row(row))
  }

  /// Writes a row, checking that `index` is the next row.
  ///
  /// An `index` equal to the height counts as 0.
  ///
  /// ## Failure
  /// * `OutOfOrderRow` if `index` isn't the next row.
  /// * Same as [`write_row`](Self::write_row).
  pub fn write_row_at(&mut self, row: &[u8], index: u32) -> PngResult<()> {
    self.write_row_inner(row, Some(index), None)
  }

  /// Writes the next row with a given filter.
  ///
  /// The filter is only used with [`FilterType::Preserve`], other filter
  /// types ignore it.
  pub fn write_row_preserving(&mut self, row: &[u8], filter: StandardFilter) -> PngResult<()> {
    self.write_row_inner(row, None, Some(filter))
  }

  /// Writes the next row given as one integer per sample.
  ///
  /// See [`pack_samples`] for the layout.
  pub fn write_row_samples(&mut self, samples: &[u16]) -> PngResult<()> {
    self.check_open()?;
    let mut buf = core::mem::take(&mut self.sample_buf);
    let result = pack_samples(&self.geometry, samples, &mut buf)
      .and_then(|()| self.write_row_inner(&buf, None, None));
    self.sample_buf = buf;
    result
  }

  fn write_row_inner(
    &mut self, row: &[u8], index: Option<u32>, preserved: Option<StandardFilter>,
  ) -> PngResult<()> {
    self.check_open()?;
    let height = self.geometry.height();
    let rows_written = self.rows_written();
    if let Some(index) = index {
      let expected = rows_written % height;
      let passed = if index == height { 0 } else { index };
      if passed != expected {
        return Err(PngError::OutOfOrderRow { expected, passed: index });
      }
    }
    if rows_written >= height {
      return Err(PngError::RowOverrun { height });
    }
    if row.len() != self.geometry.bytes_per_row() {
      return Err(PngError::RowLength { expected: self.geometry.bytes_per_row(), actual: row.len() });
    }
    self.row_in_flight = Some(rows_written);
    let result = self.guard(|w| {
      if w.group < ChunkGroup::PixelData {
        w.advance_to(ChunkGroup::PixelData)?;
      }
      let mut out = ChunkSink { sink: &mut w.sink, crc: &mut w.crc };
      let filter = w.pixels.write_row(&mut out, row, preserved)?;
      trace!("row {rows_written} written with {filter:?}");
      Ok(())
    });
    self.row_in_flight = None;
    result
  }

  /// Moves the writer forward to `group`, writing everything in between.
  ///
  /// Rows are written through the `write_row` methods, this is for getting
  /// the header and metadata out early.
  ///
  /// ## Failure
  /// * `ChunkOrder` unless `group` is after the current one.
  /// * `IncompleteImage` to go past the pixel data before every row is in.
  pub fn advance_to(&mut self, group: ChunkGroup) -> PngResult<()> {
    self.check_open()?;
    if group <= self.group {
      return Err(PngError::ChunkOrder { from: self.group, to: group });
    }
    if group > ChunkGroup::PixelData && self.rows_written() < self.geometry.height() {
      return Err(PngError::IncompleteImage {
        written: self.rows_written(),
        height: self.geometry.height(),
      });
    }
    self.guard(|w| {
      while w.group < group {
        let next = match w.group.next() {
          Some(next) => next,
          None => return Err(PngError::ChunkOrder { from: w.group, to: group }),
        };
        w.enter(next)?;
      }
      Ok(())
    })
  }

  fn enter(&mut self, group: ChunkGroup) -> PngResult<()> {
    self.group.advance(group)?;
    debug!("entering chunk group {group:?}");
    match group {
      ChunkGroup::BeforeHeader => (),
      ChunkGroup::AfterHeader => {
        let ihdr = IHDR::from(&self.geometry).to_bytes();
        let mut out = ChunkSink { sink: &mut self.sink, crc: &mut self.crc };
        out.write_signature()?;
        out.write_chunk(ChunkTy::IHDR, &ihdr, self.row_in_flight)?;
        self.chunks.record_written(Chunk::new(ChunkTy::IHDR, ihdr.to_vec())?, group);
      }
      ChunkGroup::BeforePalette => {
        self.queue_copied_chunks()?;
        self.write_queued(group)?;
      }
      ChunkGroup::AfterPalette => {
        self.write_palette()?;
        self.write_queued(group)?;
      }
      ChunkGroup::PixelData => (),
      ChunkGroup::AfterPixelData => {
        let mut out = ChunkSink { sink: &mut self.sink, crc: &mut self.crc };
        self.pixels.finish(&mut out)?;
        let lens = self.pixels.idat().chunk_lens().to_vec();
        for len in lens {
          let idat = Chunk::streamed(ChunkTy::IDAT, len, ChunkGroup::PixelData);
          self.chunks.record_written(idat, ChunkGroup::PixelData);
        }
        self.write_queued(group)?;
        if let Some(first) = self.chunks.queued().first() {
          return Err(PngError::UnwrittenChunks { count: self.chunks.pending(), first: first.ty() });
        }
      }
      ChunkGroup::End => {
        let mut out = ChunkSink { sink: &mut self.sink, crc: &mut self.crc };
        out.write_chunk(ChunkTy::IEND, &[], None)?;
        self.chunks.record_written(Chunk::new(ChunkTy::IEND, Vec::new())?, group);
      }
    }
    Ok(())
  }

  fn queue_copied_chunks(&mut self) -> PngResult<()> {
    let Some((source, policy)) = self.copy_source.take() else {
      return Ok(());
    };
    for chunk in source {
      if !policy.allows(chunk.ty()) || !self.fits_image(&chunk) {
        continue;
      }
      if self.chunks.get_queued_equivalent(&chunk).is_some()
        || self.chunks.get_equivalent(&chunk).is_some()
      {
        trace!("not copying {:?}, an equivalent chunk is already there", chunk.ty());
        continue;
      }
      debug!("copying {:?} chunk", chunk.ty());
      self.chunks.queue(chunk.with_priority(false))?;
    }
    Ok(())
  }

  /// Copied chunks that would be wrong for this image are skipped.
  fn fits_image(&self, chunk: &Chunk) -> bool {
    match (chunk.ty(), chunk.data()) {
      (_, None) => false,
      (ChunkTy::PLTE, Some(data)) => {
        PLTE::parse(data).and_then(|p| p.payload(&self.geometry)).is_ok()
      }
      (ChunkTy::tRNS, Some(data)) => {
        tRNS::parse(data, &self.geometry).is_ok()
          && (!self.geometry.is_indexed() || data.len() <= self.queued_palette_len())
      }
      _ => true,
    }
  }

  fn queued_palette_len(&self) -> usize {
    self.chunks.queued_of_type(ChunkTy::PLTE).last().and_then(Chunk::data).map_or(0, |d| d.len() / 3)
  }

  /// An indexed `tRNS` can't have more entries than the written `PLTE`.
  fn check_against_palette(&self, chunk: &Chunk) -> PngResult<()> {
    if chunk.ty() != ChunkTy::tRNS || !self.geometry.is_indexed() {
      return Ok(());
    }
    let entries =
      self.chunks.written_of_type(ChunkTy::PLTE).next().and_then(Chunk::data).map_or(0, |d| d.len() / 3);
    if chunk.data().map_or(0, <[u8]>::len) > entries {
      return Err(PngError::InvalidChunkData {
        ty: ChunkTy::tRNS,
        reason: "more alpha entries than palette entries",
      });
    }
    Ok(())
  }

  fn write_palette(&mut self) -> PngResult<()> {
    let palette = self.chunks.remove_queued(ChunkTy::PLTE).pop();
    let Some(chunk) = palette else {
      if self.geometry.is_indexed() {
        return Err(PngError::MissingPalette);
      }
      return Ok(());
    };
    // raw queued chunks haven't been checked against the image yet
    let data = chunk.data().unwrap_or(&[]);
    PLTE::parse(data)?.payload(&self.geometry)?;
    let mut out = ChunkSink { sink: &mut self.sink, crc: &mut self.crc };
    out.write_chunk(ChunkTy::PLTE, data, self.row_in_flight)?;
    self.chunks.record_written(chunk, ChunkGroup::AfterPalette);
    Ok(())
  }

  fn write_queued(&mut self, group: ChunkGroup) -> PngResult<()> {
    for chunk in self.chunks.take_writable(group) {
      self.check_against_palette(&chunk)?;
      let mut out = ChunkSink { sink: &mut self.sink, crc: &mut self.crc };
      out.write_chunk(chunk.ty(), chunk.data().unwrap_or(&[]), self.row_in_flight)?;
      self.chunks.record_written(chunk, group);
    }
    Ok(())
  }

  /// Ends the image: finishes the zlib stream, writes the trailing chunks
  /// and `IEND`, and closes the sink if configured to.
  ///
  /// Calling this again after it worked does nothing.
  ///
  /// ## Failure
  /// * `IncompleteImage` if not every row was written.
  /// * `UnwrittenChunks` if queued chunks had no place to go.
  pub fn finish(&mut self) -> PngResult<()> {
    if self.finished {
      return Ok(());
    }
    self.check_open()?;
    self.advance_to(ChunkGroup::End)?;
    self.finished = true;
    debug!(
      "finished: {} rows, {} chunks, {} IDAT bytes",
      self.rows_written(),
      self.chunks.written().len(),
      self.pixels.idat().total_bytes()
    );
    self.release();
    Ok(())
  }

  /// IDAT payload bytes divided by the filtered row bytes (filter bytes
  /// included).
  ///
  /// ## Failure
  /// * `NotFinished` before [`finish`](Self::finish).
  pub fn compute_compression_ratio(&self) -> PngResult<f64> {
    if !self.finished {
      return Err(PngError::NotFinished);
    }
    self.pixels.compression_ratio()
  }

  /// Releases everything, without finishing the image. Never fails.
  ///
  /// This also happens on drop and after a failed write.
  #[inline]
  pub fn close(&mut self) {
    self.release();
  }

  fn release(&mut self) {
    if self.closed {
      return;
    }
    self.closed = true;
    self.pixels.end();
    if self.should_close_sink {
      if let Err(e) = self.sink.close() {
        warn!("closing the sink failed: {e}");
      }
    }
  }

  /// Runs `f`, closing the writer if it fails.
  fn guard<T>(&mut self, f: impl FnOnce(&mut Self) -> PngResult<T>) -> PngResult<T> {
    let result = f(self);
    if let Err(e) = &result {
      debug!("writer aborted: {e}");
      self.release();
    }
    result
  }
}
impl<S: ByteSink, D: Deflater, C: ChecksumEngine> Drop for PngWriter<S, D, C> {
  fn drop(&mut self) {
    self.release();
  }
}
impl<S: ByteSink, D: Deflater, C: ChecksumEngine> Debug for PngWriter<S, D, C> {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("PngWriter")
      .field("geometry", &self.geometry)
      .field("group", &self.group)
      .field("rows_written", &self.rows_written())
      .field("finished", &self.finished)
      .field("closed", &self.closed)
      .finish_non_exhaustive()
  }
}
