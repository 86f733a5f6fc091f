use super::*;

/// An incremental CRC-32 (the zlib / PNG polynomial).
///
/// For each chunk the writer calls `reset`, `update`s with the tag and then
/// the payload, and reads the `value`.
pub trait ChecksumEngine {
  /// Starts over from an empty input.
  fn reset(&mut self);
  /// Folds more bytes into the running value.
  fn update(&mut self, bytes: &[u8]);
  /// The CRC of everything given since the last reset.
  fn value(&self) -> u32;
}

/// CRC-32 using the [`crc32fast`] crate.
#[derive(Clone, Default)]
pub struct FastCrc32(crc32fast::Hasher);
impl FastCrc32 {
  #[inline]
  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }
}
impl ChecksumEngine for FastCrc32 {
  #[inline]
  fn reset(&mut self) {
    self.0.reset();
  }
  #[inline]
  fn update(&mut self, bytes: &[u8]) {
    self.0.update(bytes);
  }
  #[inline]
  fn value(&self) -> u32 {
    self.0.clone().finalize()
  }
}
impl Debug for FastCrc32 {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_tuple("FastCrc32").field(&self.value()).finish()
  }
}

/// CRC-32 with a plain lookup table, no other crates involved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableCrc32(u32);
impl TableCrc32 {
  #[inline]
  #[must_use]
  pub const fn new() -> Self {
    Self(u32::MAX)
  }
}
impl Default for TableCrc32 {
  #[inline]
  fn default() -> Self {
    Self::new()
  }
}
impl ChecksumEngine for TableCrc32 {
  #[inline]
  fn reset(&mut self) {
    self.0 = u32::MAX;
  }
  #[inline]
  fn update(&mut self, bytes: &[u8]) {
    self.0 = update_crc(self.0, bytes.iter().copied());
  }
  #[inline]
  fn value(&self) -> u32 {
    self.0 ^ u32::MAX
  }
}

const CRC_TABLE: [u32; 256] = make_crc_table();

const fn make_crc_table() -> [u32; 256] {
  let mut out = [0; 256];
  let mut n = 0;
  while n < 256 {
    let mut c = n as u32;
    let mut k = 0;
    while k < 8 {
      if (c & 1) != 0 {
        c = 0xEDB8_8320_u32 ^ (c >> 1);
      } else {
        c >>= 1;
      }
      //
      k += 1;
    }
    out[n] = c;
    //
    n += 1;
  }
  out
}

fn update_crc(mut crc: u32, iter: impl Iterator<Item = u8>) -> u32 {
  for byte in iter {
    let i = (crc ^ u32::from(byte)) as u8 as usize;
    crc = CRC_TABLE[i] ^ (crc >> 8);
  }
  crc
}

/// CRC of a chunk: the type tag followed by the payload.
#[inline]
pub fn chunk_crc<C: ChecksumEngine>(crc: &mut C, ty: ChunkTy, data: &[u8]) -> u32 {
  crc.reset();
  crc.update(&ty.0);
  crc.update(data);
  crc.value()
}
