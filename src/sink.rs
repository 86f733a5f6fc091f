//! Output side of the writer.

use alloc::{string::String, vec::Vec};

use crate::SinkError;

/// An append-only destination for bytes.
///
/// The writer never seeks and never rewrites: it only appends, and when it's
/// done (or gives up) it calls `close` once.
pub trait ByteSink {
  /// Appends all of `bytes`.
  fn write(&mut self, bytes: &[u8]) -> Result<(), SinkError>;

  /// Appends one byte.
  #[inline]
  fn write_byte(&mut self, byte: u8) -> Result<(), SinkError> {
    self.write(&[byte])
  }

  /// Releases the sink. Writes after this are an error.
  fn close(&mut self) -> Result<(), SinkError>;
}

impl ByteSink for Vec<u8> {
  #[inline]
  fn write(&mut self, bytes: &[u8]) -> Result<(), SinkError> {
    self.try_reserve(bytes.len()).map_err(|_| SinkError(String::from("allocation failed")))?;
    self.extend_from_slice(bytes);
    Ok(())
  }
  #[inline]
  fn write_byte(&mut self, byte: u8) -> Result<(), SinkError> {
    self.write(&[byte])
  }
  #[inline]
  fn close(&mut self) -> Result<(), SinkError> {
    Ok(())
  }
}

impl<S: ByteSink + ?Sized> ByteSink for &mut S {
  #[inline]
  fn write(&mut self, bytes: &[u8]) -> Result<(), SinkError> {
    (**self).write(bytes)
  }
  #[inline]
  fn write_byte(&mut self, byte: u8) -> Result<(), SinkError> {
    (**self).write_byte(byte)
  }
  #[inline]
  fn close(&mut self) -> Result<(), SinkError> {
    (**self).close()
  }
}

/// Adapts any [`std::io::Write`] into a [`ByteSink`].
///
/// Closing flushes the writer; later writes fail.
#[cfg(feature = "std")]
#[cfg_attr(docs_rs, doc(cfg(feature = "std")))]
#[derive(Debug)]
pub struct IoSink<W: std::io::Write> {
  inner: W,
  closed: bool,
}
#[cfg(feature = "std")]
impl<W: std::io::Write> IoSink<W> {
  /// Wraps a writer.
  #[inline]
  #[must_use]
  pub const fn new(inner: W) -> Self {
    Self { inner, closed: false }
  }
  /// Gets the writer back.
  #[inline]
  #[must_use]
  pub fn into_inner(self) -> W {
    self.inner
  }
  /// If `close` was called.
  #[inline]
  #[must_use]
  pub const fn is_closed(&self) -> bool {
    self.closed
  }
}
#[cfg(feature = "std")]
impl<W: std::io::Write> ByteSink for IoSink<W> {
  #[inline]
  fn write(&mut self, bytes: &[u8]) -> Result<(), SinkError> {
    if self.closed {
      return Err(SinkError(String::from("sink is closed")));
    }
    self.inner.write_all(bytes)?;
    Ok(())
  }
  #[inline]
  fn close(&mut self) -> Result<(), SinkError> {
    if self.closed {
      return Ok(());
    }
    self.closed = true;
    self.inner.flush()?;
    Ok(())
  }
}
