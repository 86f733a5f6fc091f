use alloc::string::String;
use core::fmt;

use thiserror::Error;

use crate::png::{ChunkGroup, ChunkTy};

/// Result alias used throughout the crate.
pub type PngResult<T> = Result<T, PngError>;

/// An error from the `linepng` crate.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PngError {
  /// The image description is not a legal PNG pixel layout.
  #[error("invalid image geometry: {0}")]
  InvalidGeometry(&'static str),

  /// A filter code that isn't part of the known set.
  #[error("invalid filter type: {0}")]
  InvalidFilter(i32),

  /// The compression stream was driven out of order.
  #[error("compression stream misuse: {0}")]
  StreamMisuse(&'static str),

  /// The deflate library reported a failure.
  #[error("compression failed: {0}")]
  Compression(&'static str),

  /// The inflate library reported a failure.
  #[error("decompression failed: {0}")]
  Decompression(&'static str),

  /// A row was given with the wrong row number.
  #[error("rows must be written in order: expected {expected}, passed {passed}")]
  OutOfOrderRow {
    /// The row number the writer was waiting for.
    expected: u32,
    /// The row number the caller gave.
    passed: u32,
  },

  /// All rows were already written and the writer wasn't reset.
  #[error("all {height} rows were already written")]
  RowOverrun {
    /// Height of the image.
    height: u32,
  },

  /// A raw row of the wrong length.
  #[error("row has {actual} bytes, expected {expected}")]
  RowLength {
    /// `bytes_per_row` of the geometry.
    expected: usize,
    /// Length of the slice that was passed.
    actual: usize,
  },

  /// An integer sample doesn't fit in the image's bit depth.
  #[error("sample {index} is {value}, too big for bit depth {bit_depth}")]
  SampleOutOfRange {
    /// Position of the sample within the row.
    index: usize,
    /// The sample.
    value: u16,
    /// Bit depth of the image.
    bit_depth: u8,
  },

  /// `finish` was called before every row was written.
  #[error("only {written} of {height} rows were written")]
  IncompleteImage {
    /// Rows written so far.
    written: u32,
    /// Height of the image.
    height: u32,
  },

  /// The compression ratio is only known once the image is finished.
  #[error("the image must be finished first")]
  NotFinished,

  /// The writer was finished, or aborted after an earlier error.
  #[error("the writer is already closed")]
  WriterClosed,

  /// An attempt to move the chunk writing position backwards.
  #[error("can't go from chunk group {from:?} to {to:?}")]
  ChunkOrder {
    /// Current group.
    from: ChunkGroup,
    /// Requested group.
    to: ChunkGroup,
  },

  /// An indexed image needs a `PLTE` chunk.
  #[error("missing palette")]
  MissingPalette,

  /// Greyscale images can't have a `PLTE` chunk.
  #[error("cannot write palette for this format")]
  PaletteNotAllowed,

  /// Some queued chunks couldn't be placed in any legal position.
  #[error("{count} chunks were not written, eg: {first:?}")]
  UnwrittenChunks {
    /// How many chunks are still queued.
    count: usize,
    /// Type of the first one.
    first: ChunkTy,
  },

  /// Only ancillary chunks and `PLTE` can be queued.
  #[error("critical chunk {0:?} can't be queued")]
  CriticalChunk(ChunkTy),

  /// The chunk payload is not legal for its type or for this image.
  #[error("invalid {ty:?} data: {reason}")]
  InvalidChunkData {
    /// Chunk type.
    ty: ChunkTy,
    /// What's wrong.
    reason: &'static str,
  },

  /// The byte sink failed.
  #[error("{context}: {source}")]
  Sink {
    /// What was being written.
    context: SinkContext,
    /// The sink's own error.
    source: SinkError,
  },

  /// The bytes are not a PNG datastream we can read.
  #[error("parse error: {0}")]
  Parse(&'static str),

  /// A chunk's declared CRC doesn't match its content.
  #[error("bad CRC in {ty:?} chunk")]
  CrcMismatch {
    /// Chunk type.
    ty: ChunkTy,
  },
}

/// Describes what was in flight when a [`ByteSink`](crate::ByteSink) failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkContext {
  /// The eight signature bytes.
  Signature,
  /// A chunk, and the row being processed when it was written (if any).
  Chunk {
    /// Chunk type.
    ty: ChunkTy,
    /// Row number, for chunks written while rows are fed.
    row: Option<u32>,
  },
}
impl fmt::Display for SinkContext {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Signature => write!(f, "writing the PNG signature"),
      Self::Chunk { ty, row: None } => write!(f, "writing chunk {ty:?}"),
      Self::Chunk { ty, row: Some(row) } => write!(f, "writing chunk {ty:?} (row {row})"),
    }
  }
}

/// An error produced by a [`ByteSink`](crate::ByteSink).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct SinkError(pub String);

#[cfg(feature = "std")]
impl From<std::io::Error> for SinkError {
  #[inline]
  fn from(e: std::io::Error) -> Self {
    use alloc::string::ToString;
    Self(e.to_string())
  }
}
