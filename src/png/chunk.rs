use super::*;

/// The four byte type tag of a chunk.
///
/// The case of each letter is meaningful (bit 5 of each byte):
/// * 1st letter uppercase: critical.
/// * 2nd letter uppercase: public.
/// * 4th letter lowercase: safe to copy.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ChunkTy(pub [u8; 4]);
#[allow(nonstandard_style)]
impl ChunkTy {
  pub const IHDR: Self = Self(*b"IHDR");
  pub const PLTE: Self = Self(*b"PLTE");
  pub const IDAT: Self = Self(*b"IDAT");
  pub const IEND: Self = Self(*b"IEND");
  pub const tRNS: Self = Self(*b"tRNS");
  pub const gAMA: Self = Self(*b"gAMA");
  pub const sRGB: Self = Self(*b"sRGB");
  pub const cHRM: Self = Self(*b"cHRM");
  pub const iCCP: Self = Self(*b"iCCP");
  pub const sBIT: Self = Self(*b"sBIT");
  pub const bKGD: Self = Self(*b"bKGD");
  pub const hIST: Self = Self(*b"hIST");
  pub const pHYs: Self = Self(*b"pHYs");
  pub const sPLT: Self = Self(*b"sPLT");
  pub const tEXt: Self = Self(*b"tEXt");
  pub const zTXt: Self = Self(*b"zTXt");
  pub const iTXt: Self = Self(*b"iTXt");
  pub const tIME: Self = Self(*b"tIME");

  /// Types defined by the PNG spec, which are told apart by type alone.
  const KNOWN: [Self; 18] = [
    Self::IHDR,
    Self::PLTE,
    Self::IDAT,
    Self::IEND,
    Self::tRNS,
    Self::gAMA,
    Self::sRGB,
    Self::cHRM,
    Self::iCCP,
    Self::sBIT,
    Self::bKGD,
    Self::hIST,
    Self::pHYs,
    Self::sPLT,
    Self::tEXt,
    Self::zTXt,
    Self::iTXt,
    Self::tIME,
  ];

  #[inline]
  #[must_use]
  pub const fn is_critical(self) -> bool {
    (self.0[0] & 0x20) == 0
  }
  #[inline]
  #[must_use]
  pub const fn is_public(self) -> bool {
    (self.0[1] & 0x20) == 0
  }
  #[inline]
  #[must_use]
  pub const fn is_safe_to_copy(self) -> bool {
    (self.0[3] & 0x20) != 0
  }
  /// All four bytes are ASCII letters.
  #[inline]
  #[must_use]
  pub const fn is_valid(self) -> bool {
    self.0[0].is_ascii_alphabetic()
      && self.0[1].is_ascii_alphabetic()
      && self.0[2].is_ascii_alphabetic()
      && self.0[3].is_ascii_alphabetic()
  }
  #[inline]
  #[must_use]
  pub fn is_known(self) -> bool {
    Self::KNOWN.contains(&self)
  }
  /// Several chunks of this type can be in one image, told apart by the
  /// keyword (or palette name) at the start of the payload.
  #[inline]
  #[must_use]
  pub fn is_keyed(self) -> bool {
    matches!(self, Self::tEXt | Self::zTXt | Self::iTXt | Self::sPLT)
  }

  /// Where chunks of this type may be placed.
  #[must_use]
  pub fn ordering(self) -> ChunkOrdering {
    match self {
      Self::IHDR | Self::PLTE | Self::IDAT | Self::IEND => ChunkOrdering::Fixed,
      Self::gAMA | Self::sRGB | Self::cHRM | Self::iCCP | Self::sBIT => ChunkOrdering::BeforePalette,
      Self::tRNS | Self::bKGD | Self::hIST => ChunkOrdering::AfterPaletteBeforeData,
      Self::pHYs | Self::sPLT => ChunkOrdering::BeforeData,
      _ => ChunkOrdering::Anywhere,
    }
  }
}
impl Debug for ChunkTy {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    for b in self.0 {
      if b.is_ascii_graphic() {
        f.write_char(b as char)?;
      } else {
        write!(f, "\\x{b:02X}")?;
      }
    }
    Ok(())
  }
}

/// Position of the writer within the chunk sequence.
///
/// The writer only ever moves forward through these:
///
/// ```text
/// BeforeHeader -> AfterHeader -> BeforePalette -> AfterPalette
///   -> PixelData -> AfterPixelData -> End
/// ```
///
/// For chunks, this is the group they were written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ChunkGroup {
  /// Nothing written yet.
  #[default]
  BeforeHeader,
  /// The signature and `IHDR` are out.
  AfterHeader,
  /// Ancillary chunks that must come before `PLTE`.
  BeforePalette,
  /// `PLTE` (if any) and the ancillary chunks that follow it.
  AfterPalette,
  /// `IDAT` chunks.
  PixelData,
  /// Ancillary chunks after the image data.
  AfterPixelData,
  /// `IEND` is out, nothing else can be written.
  End,
}
impl ChunkGroup {
  /// The group after this one, if any.
  #[inline]
  #[must_use]
  pub const fn next(self) -> Option<Self> {
    Some(match self {
      Self::BeforeHeader => Self::AfterHeader,
      Self::AfterHeader => Self::BeforePalette,
      Self::BeforePalette => Self::AfterPalette,
      Self::AfterPalette => Self::PixelData,
      Self::PixelData => Self::AfterPixelData,
      Self::AfterPixelData => Self::End,
      Self::End => return None,
    })
  }

  /// Moves to `to`, which must be strictly later.
  ///
  /// ## Failure
  /// * `ChunkOrder` if `to` isn't after the current group.
  #[inline]
  pub fn advance(&mut self, to: Self) -> PngResult<()> {
    if to <= *self {
      return Err(PngError::ChunkOrder { from: *self, to });
    }
    *self = to;
    Ok(())
  }
}

/// The window a chunk must be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChunkOrdering {
  /// The critical chunks, which the writer places itself.
  Fixed,
  /// Before `PLTE`.
  BeforePalette,
  /// After `PLTE`, before the first `IDAT`.
  AfterPaletteBeforeData,
  /// Anywhere before the first `IDAT`.
  BeforeData,
  /// Anywhere after `IHDR`.
  Anywhere,
}
impl ChunkOrdering {
  /// The groups a queued chunk can be written in, earliest first.
  #[must_use]
  pub const fn groups(self) -> &'static [ChunkGroup] {
    use ChunkGroup::*;
    match self {
      Self::Fixed => &[],
      Self::BeforePalette => &[BeforePalette],
      Self::AfterPaletteBeforeData => &[AfterPalette],
      Self::BeforeData => &[BeforePalette, AfterPalette],
      Self::Anywhere => &[BeforePalette, AfterPalette, AfterPixelData],
    }
  }

  /// If a chunk should be written on entering `group`.
  ///
  /// Priority chunks go out at the first allowed group, others at the last.
  #[must_use]
  pub fn writes_in(self, group: ChunkGroup, priority: bool) -> bool {
    let groups = self.groups();
    if priority {
      groups.contains(&group)
    } else {
      groups.last() == Some(&group)
    }
  }
}

/// One chunk, either queued or already written.
///
/// Streamed `IDAT` chunks don't keep their payload, only its length.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Chunk {
  ty: ChunkTy,
  data: Option<Vec<u8>>,
  len: u32,
  group: Option<ChunkGroup>,
  priority: bool,
}
impl Chunk {
  /// Largest payload a chunk can have.
  pub const MAX_LEN: usize = (1 << 31) - 1;

  /// ## Failure
  /// * `InvalidChunkData` if the type isn't four letters or the payload is
  ///   too big.
  pub fn new(ty: ChunkTy, data: Vec<u8>) -> PngResult<Self> {
    if !ty.is_valid() {
      return Err(PngError::InvalidChunkData { ty, reason: "type must be four ASCII letters" });
    }
    if data.len() > Self::MAX_LEN {
      return Err(PngError::InvalidChunkData { ty, reason: "payload longer than 2^31-1" });
    }
    Ok(Self { ty, len: data.len() as u32, data: Some(data), group: None, priority: false })
  }

  /// A chunk that was written straight from a stream.
  #[inline]
  pub(crate) const fn streamed(ty: ChunkTy, len: u32, group: ChunkGroup) -> Self {
    Self { ty, data: None, len, group: Some(group), priority: false }
  }

  /// Marks this chunk to be written as early as its type allows.
  #[inline]
  #[must_use]
  pub fn with_priority(mut self, priority: bool) -> Self {
    self.priority = priority;
    self
  }

  #[inline]
  #[must_use]
  pub const fn ty(&self) -> ChunkTy {
    self.ty
  }
  /// The payload, if it was kept.
  #[inline]
  #[must_use]
  pub fn data(&self) -> Option<&[u8]> {
    self.data.as_deref()
  }
  #[inline]
  #[must_use]
  pub const fn len(&self) -> u32 {
    self.len
  }
  #[inline]
  #[must_use]
  pub const fn is_empty(&self) -> bool {
    self.len == 0
  }
  /// Group the chunk was written in (or read from).
  #[inline]
  #[must_use]
  pub const fn group(&self) -> Option<ChunkGroup> {
    self.group
  }
  #[inline]
  #[must_use]
  pub const fn priority(&self) -> bool {
    self.priority
  }
  #[inline]
  #[must_use]
  pub const fn is_critical(&self) -> bool {
    self.ty.is_critical()
  }
  #[inline]
  #[must_use]
  pub fn ordering(&self) -> ChunkOrdering {
    self.ty.ordering()
  }

  #[inline]
  pub(crate) fn set_group(&mut self, group: ChunkGroup) {
    self.group = Some(group);
  }

  /// The keyword (or palette name) of a keyed chunk: payload bytes up to the
  /// first null.
  #[must_use]
  pub fn keyword(&self) -> Option<&[u8]> {
    if !self.ty.is_keyed() {
      return None;
    }
    let data = self.data.as_deref()?;
    Some(match data.iter().position(|&b| b == 0) {
      Some(end) => &data[..end],
      None => data,
    })
  }

  /// If the two chunks can't both be in one image.
  ///
  /// * Keyed types (`tEXt`, `zTXt`, `iTXt`, `sPLT`) are equivalent when the
  ///   keyword matches.
  /// * Other known types are equivalent by type.
  /// * Unknown types are equivalent by type and payload.
  #[must_use]
  pub fn is_equivalent(&self, other: &Self) -> bool {
    if self.ty != other.ty {
      false
    } else if self.ty.is_keyed() {
      self.keyword() == other.keyword()
    } else if self.ty.is_known() {
      true
    } else {
      self.data == other.data
    }
  }
}
impl Debug for Chunk {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("Chunk")
      .field("ty", &self.ty)
      .field("len", &self.len)
      .field("data", &self.data.as_deref().map(|d| &d[..d.len().min(12)]))
      .field("group", &self.group)
      .field("priority", &self.priority)
      .finish()
  }
}

/// Serializes a value into a chunk payload.
pub trait ChunkPayload {
  /// The type tag of the chunk.
  const TY: ChunkTy;

  /// The payload bytes, checked against the image it's for.
  fn payload(&self, geometry: &ImageGeometry) -> PngResult<Vec<u8>>;

  /// Builds the whole chunk.
  #[inline]
  fn to_chunk(&self, geometry: &ImageGeometry) -> PngResult<Chunk> {
    Chunk::new(Self::TY, self.payload(geometry)?)
  }
}

/// Writes whole chunks to a sink.
///
/// Holds the sink and the checksum engine for the duration of a write call.
pub struct ChunkSink<'a, S: ByteSink, C: ChecksumEngine> {
  pub sink: &'a mut S,
  pub crc: &'a mut C,
}
impl<S: ByteSink, C: ChecksumEngine> ChunkSink<'_, S, C> {
  /// Writes the eight signature bytes.
  pub fn write_signature(&mut self) -> PngResult<()> {
    self
      .sink
      .write(&PNG_SIGNATURE)
      .map_err(|source| PngError::Sink { context: SinkContext::Signature, source })
  }

  /// Writes one chunk: length, tag, payload, CRC.
  ///
  /// `row` is only used to describe sink failures.
  pub fn write_chunk(&mut self, ty: ChunkTy, data: &[u8], row: Option<u32>) -> PngResult<()> {
    if data.len() > Chunk::MAX_LEN {
      return Err(PngError::InvalidChunkData { ty, reason: "payload longer than 2^31-1" });
    }
    let crc = chunk_crc(&mut *self.crc, ty, data);
    let context = SinkContext::Chunk { ty, row };
    let wrap = |source: SinkError| PngError::Sink { context, source };
    self.sink.write(&(data.len() as u32).to_be_bytes()).map_err(wrap)?;
    self.sink.write(&ty.0).map_err(wrap)?;
    self.sink.write(data).map_err(wrap)?;
    self.sink.write(&crc.to_be_bytes()).map_err(wrap)?;
    trace!("wrote {ty:?} chunk, {} bytes", data.len());
    Ok(())
  }
}
