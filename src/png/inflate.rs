use super::*;

use miniz_oxide::{
  inflate::stream::{inflate, InflateState},
  DataFormat, MZError, MZFlush, MZStatus,
};

/// A stateful zlib decompressor, the mirror of [`Deflater`].
///
/// Give it input with `set_input` whenever it `needs_input`, and pull output
/// with `inflate` until it's `finished`.
pub trait Inflater {
  /// ## Failure
  /// * `StreamMisuse` if earlier input is still pending.
  fn set_input(&mut self, input: &[u8]) -> PngResult<()>;

  fn needs_input(&self) -> bool;

  /// Decompresses into `out`, returning the bytes written.
  fn inflate(&mut self, out: &mut [u8]) -> PngResult<usize>;

  /// The end of the zlib stream was reached.
  fn finished(&self) -> bool;

  fn reset(&mut self);
}

/// [`Inflater`] backed by `miniz_oxide`.
pub struct MinizInflater {
  state: Box<InflateState>,
  input: Vec<u8>,
  pos: usize,
  done: bool,
}
impl MinizInflater {
  #[must_use]
  pub fn new() -> Self {
    Self { state: InflateState::new_boxed(DataFormat::Zlib), input: Vec::new(), pos: 0, done: false }
  }
}
impl Default for MinizInflater {
  #[inline]
  fn default() -> Self {
    Self::new()
  }
}
impl Debug for MinizInflater {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("MinizInflater")
      .field("pending", &(self.input.len() - self.pos))
      .field("done", &self.done)
      .finish()
  }
}
impl Inflater for MinizInflater {
  fn set_input(&mut self, input: &[u8]) -> PngResult<()> {
    if self.pos < self.input.len() {
      return Err(PngError::StreamMisuse("input given while earlier input is pending"));
    }
    self.input.clear();
    self.input.extend_from_slice(input);
    self.pos = 0;
    Ok(())
  }

  #[inline]
  fn needs_input(&self) -> bool {
    self.pos >= self.input.len() && !self.done
  }

  fn inflate(&mut self, out: &mut [u8]) -> PngResult<usize> {
    if self.done || out.is_empty() {
      return Ok(0);
    }
    let result = inflate(&mut self.state, &self.input[self.pos..], out, MZFlush::None);
    self.pos += result.bytes_consumed;
    match result.status {
      Ok(MZStatus::Ok) => (),
      Ok(MZStatus::StreamEnd) => self.done = true,
      Ok(MZStatus::NeedDict) => return Err(PngError::Decompression("preset dictionary needed")),
      // no progress possible with what we were given, not a failure
      Err(MZError::Buf) => (),
      Err(MZError::Data) => return Err(PngError::Decompression("corrupt data")),
      Err(_) => return Err(PngError::Decompression("inflate failed")),
    }
    Ok(result.bytes_written)
  }

  #[inline]
  fn finished(&self) -> bool {
    self.done
  }

  fn reset(&mut self) {
    self.state.reset(DataFormat::Zlib);
    self.input.clear();
    self.pos = 0;
    self.done = false;
  }
}

/// Inflates a zlib stream split over any number of slices.
///
/// `expected` is only a capacity hint.
pub fn inflate_slices<'a, I: Inflater>(
  inflater: &mut I, slices: impl IntoIterator<Item = &'a [u8]>, expected: usize,
) -> PngResult<Vec<u8>> {
  let mut out = Vec::with_capacity(expected);
  let mut buf = vec![0_u8; 16 * 1024];
  for slice in slices {
    inflater.set_input(slice)?;
    loop {
      let n = inflater.inflate(&mut buf)?;
      out.extend_from_slice(&buf[..n]);
      if inflater.finished() || (n == 0 && inflater.needs_input()) {
        break;
      }
      if n == 0 {
        return Err(PngError::Decompression("inflate made no progress"));
      }
    }
    if inflater.finished() {
      break;
    }
  }
  // flush whatever is still held back
  while !inflater.finished() {
    let n = inflater.inflate(&mut buf)?;
    if n == 0 {
      return Err(PngError::Decompression("zlib stream is truncated"));
    }
    out.extend_from_slice(&buf[..n]);
  }
  Ok(out)
}
