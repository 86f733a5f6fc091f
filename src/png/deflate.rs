use super::*;

use miniz_oxide::deflate::core::{
  compress, create_comp_flags_from_zip_params, CompressionStrategy, CompressorOxide, TDEFLFlush,
  TDEFLStatus,
};

/// Where a compression stream is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StreamState {
  /// All given input was consumed, more may be given.
  AwaitingInput,
  /// Input was given and isn't fully consumed yet.
  HasInput,
  /// `finish` was called and all output has been handed out.
  Finished,
}

/// Deflate strategy, as zlib names them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum DeflateStrategy {
  #[default]
  Default,
  /// Favors Huffman coding over string matching, good for filtered data.
  Filtered,
  HuffmanOnly,
  Rle,
  /// Static Huffman tables only.
  Fixed,
}
impl DeflateStrategy {
  #[inline]
  const fn to_miniz(self) -> CompressionStrategy {
    match self {
      Self::Default => CompressionStrategy::Default,
      Self::Filtered => CompressionStrategy::Filtered,
      Self::HuffmanOnly => CompressionStrategy::HuffmanOnly,
      Self::Rle => CompressionStrategy::RLE,
      Self::Fixed => CompressionStrategy::Fixed,
    }
  }
}

/// Compression level used when nothing else is said.
pub const DEFAULT_COMPRESSION_LEVEL: u8 = 6;

/// A stateful zlib compressor that's fed a bit at a time.
///
/// The usage pattern is:
/// 1) `set_input` with some bytes (only when [`needs_input`](Self::needs_input)).
/// 2) call `deflate` with an output buffer until it gives back 0 bytes and
///    needs input again.
/// 3) repeat, then call `finish` once there's no more input, and keep calling
///    `deflate` until [`finished`](Self::finished).
///
/// A stream must be driven to finished exactly once per image. `reset` starts
/// a new stream, `end` also frees the buffers.
pub trait Deflater {
  /// Gives the stream more input. The bytes are copied.
  ///
  /// ## Failure
  /// * `StreamMisuse` if earlier input is still pending, or after `finish`.
  fn set_input(&mut self, input: &[u8]) -> PngResult<()>;

  /// If all given input was consumed.
  fn needs_input(&self) -> bool;

  /// Compresses pending input into `out`, returning how many bytes were
  /// written. This can be 0 when the compressor is holding data back until it
  /// sees more input.
  fn deflate(&mut self, out: &mut [u8]) -> PngResult<usize>;

  /// Marks the end of the input. Further `deflate` calls drain the rest.
  fn finish(&mut self);

  fn state(&self) -> StreamState;

  #[inline]
  fn finished(&self) -> bool {
    self.state() == StreamState::Finished
  }

  /// Discards everything and gets ready for a new stream.
  fn reset(&mut self);

  /// Like `reset`, but also releases buffers.
  fn end(&mut self);

  /// Sets the level, 0 (store only) through 9 (best).
  ///
  /// ## Failure
  /// * `StreamMisuse` once input has been supplied to this stream.
  fn set_level(&mut self, level: u8) -> PngResult<()>;

  /// Sets the strategy.
  ///
  /// ## Failure
  /// * `StreamMisuse` once input has been supplied to this stream.
  fn set_strategy(&mut self, strategy: DeflateStrategy) -> PngResult<()>;

  /// Bytes given to the stream so far.
  fn total_in(&self) -> u64;

  /// Bytes produced by the stream so far.
  fn total_out(&self) -> u64;
}

/// The input side that both deflaters share.
#[derive(Debug, Clone, Default)]
struct PendingInput {
  data: Vec<u8>,
  pos: usize,
}
impl PendingInput {
  #[inline]
  fn is_empty(&self) -> bool {
    self.pos >= self.data.len()
  }
  #[inline]
  fn rest(&self) -> &[u8] {
    &self.data[self.pos..]
  }
  fn set(&mut self, input: &[u8]) {
    self.data.clear();
    self.data.extend_from_slice(input);
    self.pos = 0;
  }
  fn clear(&mut self) {
    self.data.clear();
    self.pos = 0;
  }
}

fn check_level(level: u8) -> PngResult<()> {
  if level > 9 {
    Err(PngError::StreamMisuse("compression level must be 0 to 9"))
  } else {
    Ok(())
  }
}

/// [`Deflater`] backed by the streaming core of `miniz_oxide`.
pub struct MinizDeflater {
  compressor: Box<CompressorOxide>,
  level: u8,
  strategy: DeflateStrategy,
  input: PendingInput,
  started: bool,
  finishing: bool,
  done: bool,
  total_in: u64,
  total_out: u64,
}
impl MinizDeflater {
  #[must_use]
  pub fn new(level: u8) -> Self {
    let level = level.min(9);
    let strategy = DeflateStrategy::Default;
    Self {
      compressor: Box::new(CompressorOxide::new(Self::flags(level, strategy))),
      level,
      strategy,
      input: PendingInput::default(),
      started: false,
      finishing: false,
      done: false,
      total_in: 0,
      total_out: 0,
    }
  }

  #[inline]
  fn flags(level: u8, strategy: DeflateStrategy) -> u32 {
    // positive window bits selects the zlib wrapper
    create_comp_flags_from_zip_params(i32::from(level), 15, strategy.to_miniz() as i32)
  }

  fn rebuild(&mut self) {
    self.compressor = Box::new(CompressorOxide::new(Self::flags(self.level, self.strategy)));
  }
}
impl Default for MinizDeflater {
  #[inline]
  fn default() -> Self {
    Self::new(DEFAULT_COMPRESSION_LEVEL)
  }
}
impl Debug for MinizDeflater {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("MinizDeflater")
      .field("level", &self.level)
      .field("strategy", &self.strategy)
      .field("state", &self.state())
      .field("total_in", &self.total_in)
      .field("total_out", &self.total_out)
      .finish()
  }
}
impl Deflater for MinizDeflater {
  fn set_input(&mut self, input: &[u8]) -> PngResult<()> {
    if self.finishing {
      return Err(PngError::StreamMisuse("input given after finish"));
    }
    if !self.input.is_empty() {
      return Err(PngError::StreamMisuse("input given while earlier input is pending"));
    }
    self.input.set(input);
    self.started = true;
    self.total_in += input.len() as u64;
    Ok(())
  }

  #[inline]
  fn needs_input(&self) -> bool {
    self.input.is_empty() && !self.finishing
  }

  fn deflate(&mut self, out: &mut [u8]) -> PngResult<usize> {
    if self.done || out.is_empty() {
      return Ok(0);
    }
    if self.input.is_empty() && !self.finishing {
      return Ok(0);
    }
    let flush = if self.finishing { TDEFLFlush::Finish } else { TDEFLFlush::None };
    let (status, bytes_in, bytes_out) = compress(&mut self.compressor, self.input.rest(), out, flush);
    self.input.pos += bytes_in;
    self.total_out += bytes_out as u64;
    match status {
      TDEFLStatus::Okay => (),
      TDEFLStatus::Done => {
        debug!("deflate stream done: {} -> {} bytes", self.total_in, self.total_out);
        self.done = true;
      }
      TDEFLStatus::BadParam => return Err(PngError::Compression("bad parameter")),
      TDEFLStatus::PutBufFailed => return Err(PngError::Compression("output buffer failure")),
    }
    Ok(bytes_out)
  }

  #[inline]
  fn finish(&mut self) {
    self.finishing = true;
  }

  fn state(&self) -> StreamState {
    if self.done {
      StreamState::Finished
    } else if self.input.is_empty() {
      StreamState::AwaitingInput
    } else {
      StreamState::HasInput
    }
  }

  fn reset(&mut self) {
    self.compressor.reset();
    self.input.clear();
    self.started = false;
    self.finishing = false;
    self.done = false;
    self.total_in = 0;
    self.total_out = 0;
  }

  fn end(&mut self) {
    self.reset();
    self.input = PendingInput::default();
  }

  fn set_level(&mut self, level: u8) -> PngResult<()> {
    check_level(level)?;
    if self.started {
      return Err(PngError::StreamMisuse("level changed after input was given"));
    }
    self.level = level;
    self.rebuild();
    Ok(())
  }

  fn set_strategy(&mut self, strategy: DeflateStrategy) -> PngResult<()> {
    if self.started {
      return Err(PngError::StreamMisuse("strategy changed after input was given"));
    }
    self.strategy = strategy;
    self.rebuild();
    Ok(())
  }

  #[inline]
  fn total_in(&self) -> u64 {
    self.total_in
  }

  #[inline]
  fn total_out(&self) -> u64 {
    self.total_out
  }
}

/// Largest payload of a stored deflate block.
const MAX_STORED_BLOCK: usize = 0xFFFF;

/// A [`Deflater`] that doesn't compress at all.
///
/// It writes a valid zlib stream made only of stored blocks, so the output is
/// slightly *larger* than the input. The level and strategy are accepted and
/// ignored. It has no dependencies, which makes the output easy to predict in
/// tests.
#[derive(Debug, Clone)]
pub struct StoredDeflater {
  input: PendingInput,
  block: Vec<u8>,
  output: Vec<u8>,
  output_pos: usize,
  adler: u32,
  header_written: bool,
  started: bool,
  finishing: bool,
  trailer_written: bool,
  total_in: u64,
  total_out: u64,
}
impl StoredDeflater {
  #[inline]
  #[must_use]
  pub fn new() -> Self {
    Self {
      input: PendingInput::default(),
      block: Vec::new(),
      output: Vec::new(),
      output_pos: 0,
      adler: 1,
      header_written: false,
      started: false,
      finishing: false,
      trailer_written: false,
      total_in: 0,
      total_out: 0,
    }
  }

  fn push_block(&mut self, last: bool) {
    let len = self.block.len();
    debug_assert!(len <= MAX_STORED_BLOCK);
    // BFINAL in bit 0, BTYPE 00, padded out to the byte boundary.
    self.output.push(u8::from(last));
    self.output.extend_from_slice(&(len as u16).to_le_bytes());
    self.output.extend_from_slice(&(!(len as u16)).to_le_bytes());
    self.output.extend_from_slice(&self.block);
    self.block.clear();
  }

  /// Moves pending input into blocks, producing output for every full block.
  fn absorb_input(&mut self) {
    if !self.header_written {
      // CMF: deflate with a 32K window. FLG: no dict, lowest level, check bits.
      self.output.extend_from_slice(&[0x78, 0x01]);
      self.header_written = true;
    }
    while !self.input.is_empty() {
      let room = MAX_STORED_BLOCK - self.block.len();
      let rest = self.input.rest();
      let take = room.min(rest.len());
      let taken = &rest[..take];
      self.adler = adler32_update(self.adler, taken);
      self.block.extend_from_slice(taken);
      self.input.pos += take;
      if self.block.len() == MAX_STORED_BLOCK {
        self.push_block(false);
      }
    }
    if self.finishing && !self.trailer_written {
      self.push_block(true);
      self.output.extend_from_slice(&self.adler.to_be_bytes());
      self.trailer_written = true;
    }
  }
}
impl Default for StoredDeflater {
  #[inline]
  fn default() -> Self {
    Self::new()
  }
}
impl Deflater for StoredDeflater {
  fn set_input(&mut self, input: &[u8]) -> PngResult<()> {
    if self.finishing {
      return Err(PngError::StreamMisuse("input given after finish"));
    }
    if !self.input.is_empty() {
      return Err(PngError::StreamMisuse("input given while earlier input is pending"));
    }
    self.input.set(input);
    self.started = true;
    self.total_in += input.len() as u64;
    Ok(())
  }

  #[inline]
  fn needs_input(&self) -> bool {
    self.input.is_empty() && !self.finishing
  }

  fn deflate(&mut self, out: &mut [u8]) -> PngResult<usize> {
    if self.finishing || !self.input.is_empty() {
      self.absorb_input();
    }
    let available = &self.output[self.output_pos..];
    let n = available.len().min(out.len());
    out[..n].copy_from_slice(&available[..n]);
    self.output_pos += n;
    if self.output_pos == self.output.len() {
      self.output.clear();
      self.output_pos = 0;
    }
    self.total_out += n as u64;
    Ok(n)
  }

  #[inline]
  fn finish(&mut self) {
    self.finishing = true;
  }

  fn state(&self) -> StreamState {
    if self.trailer_written && self.output.is_empty() {
      StreamState::Finished
    } else if self.input.is_empty() {
      StreamState::AwaitingInput
    } else {
      StreamState::HasInput
    }
  }

  fn reset(&mut self) {
    self.input.clear();
    self.block.clear();
    self.output.clear();
    self.output_pos = 0;
    self.adler = 1;
    self.header_written = false;
    self.started = false;
    self.finishing = false;
    self.trailer_written = false;
    self.total_in = 0;
    self.total_out = 0;
  }

  fn end(&mut self) {
    self.reset();
    self.input = PendingInput::default();
    self.block = Vec::new();
    self.output = Vec::new();
  }

  fn set_level(&mut self, level: u8) -> PngResult<()> {
    check_level(level)?;
    if self.started {
      return Err(PngError::StreamMisuse("level changed after input was given"));
    }
    Ok(())
  }

  fn set_strategy(&mut self, _strategy: DeflateStrategy) -> PngResult<()> {
    if self.started {
      return Err(PngError::StreamMisuse("strategy changed after input was given"));
    }
    Ok(())
  }

  #[inline]
  fn total_in(&self) -> u64 {
    self.total_in
  }

  #[inline]
  fn total_out(&self) -> u64 {
    self.total_out
  }
}

/// Largest number of bytes that can be summed before the Adler-32 sums must
/// be reduced.
const ADLER_NMAX: usize = 5552;
const ADLER_MOD: u32 = 65521;

/// Folds `data` into a running Adler-32.
#[must_use]
pub fn adler32_update(adler: u32, data: &[u8]) -> u32 {
  let mut a = adler & 0xFFFF;
  let mut b = adler >> 16;
  for chunk in data.chunks(ADLER_NMAX) {
    for &byte in chunk {
      a += u32::from(byte);
      b += a;
    }
    a %= ADLER_MOD;
    b %= ADLER_MOD;
  }
  (b << 16) | a
}

/// Compresses a whole buffer, used to score filter candidates.
#[inline]
#[must_use]
pub(crate) fn quick_deflated_len(data: &[u8]) -> usize {
  miniz_oxide::deflate::compress_to_vec(data, 1).len()
}
