use super::*;

/// Default largest `IDAT` payload.
pub const DEFAULT_IDAT_MAX_SIZE: usize = 32 * 1024;

/// Cuts a continuous compressed stream into `IDAT` chunks.
///
/// Bytes are buffered until a full chunk's worth is ready, so every chunk
/// except the last one has exactly the maximum size.
#[derive(Debug, Clone)]
pub struct IdatWriter {
  max_size: usize,
  buf: Vec<u8>,
  chunk_lens: Vec<u32>,
  total_bytes: u64,
}
impl IdatWriter {
  /// ## Failure
  /// * `InvalidChunkData` if `max_size` is 0 or too big for a chunk.
  pub fn new(max_size: usize) -> PngResult<Self> {
    check_max_size(max_size)?;
    Ok(Self { max_size, buf: Vec::new(), chunk_lens: Vec::new(), total_bytes: 0 })
  }

  #[inline]
  #[must_use]
  pub const fn max_size(&self) -> usize {
    self.max_size
  }

  /// ## Failure
  /// * `InvalidChunkData` for a bad size.
  /// * `StreamMisuse` once any data was given.
  pub fn set_max_size(&mut self, max_size: usize) -> PngResult<()> {
    check_max_size(max_size)?;
    if self.total_bytes > 0 || !self.buf.is_empty() {
      return Err(PngError::StreamMisuse("IDAT size changed after data was written"));
    }
    self.max_size = max_size;
    Ok(())
  }

  /// Payload lengths of the chunks written so far.
  #[inline]
  #[must_use]
  pub fn chunk_lens(&self) -> &[u32] {
    &self.chunk_lens
  }

  /// Payload bytes written so far, over all chunks.
  #[inline]
  #[must_use]
  pub const fn total_bytes(&self) -> u64 {
    self.total_bytes
  }

  /// Adds compressed bytes, writing every chunk that fills up.
  pub fn push<S: ByteSink, C: ChecksumEngine>(
    &mut self, out: &mut ChunkSink<'_, S, C>, mut data: &[u8], row: Option<u32>,
  ) -> PngResult<()> {
    while !data.is_empty() {
      let room = self.max_size - self.buf.len();
      if self.buf.is_empty() && data.len() >= self.max_size {
        // a whole chunk straight from the input
        let (now, rest) = data.split_at(self.max_size);
        self.emit(out, now, row)?;
        data = rest;
        continue;
      }
      let take = room.min(data.len());
      self.buf.extend_from_slice(&data[..take]);
      data = &data[take..];
      if self.buf.len() == self.max_size {
        let full = core::mem::take(&mut self.buf);
        self.emit(out, &full, row)?;
        self.buf = full;
        self.buf.clear();
      }
    }
    Ok(())
  }

  /// Writes whatever is buffered as a final, shorter chunk.
  pub fn flush<S: ByteSink, C: ChecksumEngine>(
    &mut self, out: &mut ChunkSink<'_, S, C>, row: Option<u32>,
  ) -> PngResult<()> {
    if self.buf.is_empty() {
      return Ok(());
    }
    let last = core::mem::take(&mut self.buf);
    self.emit(out, &last, row)
  }

  fn emit<S: ByteSink, C: ChecksumEngine>(
    &mut self, out: &mut ChunkSink<'_, S, C>, payload: &[u8], row: Option<u32>,
  ) -> PngResult<()> {
    out.write_chunk(ChunkTy::IDAT, payload, row)?;
    self.chunk_lens.push(payload.len() as u32);
    self.total_bytes += payload.len() as u64;
    Ok(())
  }
}

impl Default for IdatWriter {
  #[inline]
  fn default() -> Self {
    Self { max_size: DEFAULT_IDAT_MAX_SIZE, buf: Vec::new(), chunk_lens: Vec::new(), total_bytes: 0 }
  }
}

fn check_max_size(max_size: usize) -> PngResult<()> {
  if max_size == 0 || max_size > Chunk::MAX_LEN {
    Err(PngError::InvalidChunkData { ty: ChunkTy::IDAT, reason: "max size must be 1 to 2^31-1" })
  } else {
    Ok(())
  }
}
