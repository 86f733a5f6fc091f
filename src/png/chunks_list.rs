use super::*;

/// The chunks of one image: the ones already written, in order, and the ones
/// waiting for their turn.
#[derive(Debug, Clone, Default)]
pub struct ChunksList {
  written: Vec<Chunk>,
  queue: Vec<Chunk>,
}
impl ChunksList {
  #[inline]
  #[must_use]
  pub const fn new() -> Self {
    Self { written: Vec::new(), queue: Vec::new() }
  }

  /// Written chunks, in the order they went out.
  #[inline]
  #[must_use]
  pub fn written(&self) -> &[Chunk] {
    &self.written
  }

  /// Chunks waiting to be written.
  #[inline]
  #[must_use]
  pub fn queued(&self) -> &[Chunk] {
    &self.queue
  }

  #[inline]
  #[must_use]
  pub fn pending(&self) -> usize {
    self.queue.len()
  }

  /// Adds a chunk to the queue, dropping any queued chunk it's equivalent to.
  ///
  /// ## Failure
  /// * `CriticalChunk` for critical chunks other than `PLTE`.
  pub fn queue(&mut self, chunk: Chunk) -> PngResult<()> {
    if chunk.is_critical() && chunk.ty() != ChunkTy::PLTE {
      return Err(PngError::CriticalChunk(chunk.ty()));
    }
    let before = self.queue.len();
    self.queue.retain(|queued| !queued.is_equivalent(&chunk));
    if self.queue.len() != before {
      debug!("queued {:?} chunk replaces an equivalent one", chunk.ty());
    }
    self.queue.push(chunk);
    Ok(())
  }

  /// Written chunks of one type.
  pub fn written_of_type(&self, ty: ChunkTy) -> impl Iterator<Item = &Chunk> + '_ {
    self.written.iter().filter(move |c| c.ty() == ty)
  }

  /// Queued chunks of one type.
  pub fn queued_of_type(&self, ty: ChunkTy) -> impl Iterator<Item = &Chunk> + '_ {
    self.queue.iter().filter(move |c| c.ty() == ty)
  }

  /// A written chunk equivalent to `chunk`, if any.
  #[must_use]
  pub fn get_equivalent(&self, chunk: &Chunk) -> Option<&Chunk> {
    self.written.iter().find(|c| c.is_equivalent(chunk))
  }

  /// A queued chunk equivalent to `chunk`, if any.
  #[must_use]
  pub fn get_queued_equivalent(&self, chunk: &Chunk) -> Option<&Chunk> {
    self.queue.iter().find(|c| c.is_equivalent(chunk))
  }

  /// Removes the queued chunks of one type.
  pub fn remove_queued(&mut self, ty: ChunkTy) -> Vec<Chunk> {
    let (taken, kept): (Vec<Chunk>, Vec<Chunk>) =
      core::mem::take(&mut self.queue).into_iter().partition(|c| c.ty() == ty);
    self.queue = kept;
    taken
  }

  /// Takes out the queued chunks that should be written on entering `group`,
  /// in queue order.
  pub(crate) fn take_writable(&mut self, group: ChunkGroup) -> Vec<Chunk> {
    let (taken, kept): (Vec<Chunk>, Vec<Chunk>) = core::mem::take(&mut self.queue)
      .into_iter()
      .partition(|c: &Chunk| c.ordering().writes_in(group, c.priority()));
    self.queue = kept;
    taken
  }

  #[inline]
  pub(crate) fn record_written(&mut self, mut chunk: Chunk, group: ChunkGroup) {
    chunk.set_group(group);
    self.written.push(chunk);
  }
}

/// Which chunks of a source image are copied into a new one.
///
/// Policies combine with `|`. Critical chunks are never copied, except `PLTE`
/// with [`PALETTE`](Self::PALETTE).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct CopyPolicy(pub u32);
impl CopyPolicy {
  pub const NONE: Self = Self(0);
  /// `PLTE`
  pub const PALETTE: Self = Self(1 << 0);
  /// `tRNS`
  pub const TRANSPARENCY: Self = Self(1 << 1);
  /// `tEXt`, `zTXt`, `iTXt`
  pub const TEXTUAL: Self = Self(1 << 2);
  /// `pHYs`
  pub const PHYSICAL: Self = Self(1 << 3);
  /// `gAMA`, `sRGB`, `cHRM`, `iCCP`, `sBIT`
  pub const COLOR: Self = Self(1 << 4);
  /// `tIME`
  pub const TIME: Self = Self(1 << 5);
  /// Any ancillary chunk marked safe to copy.
  pub const SAFE_TO_COPY: Self = Self(1 << 6);
  /// Every ancillary chunk, plus the palette.
  pub const ALL: Self = Self(u32::MAX);

  #[inline]
  #[must_use]
  pub const fn contains(self, other: Self) -> bool {
    (self.0 & other.0) == other.0
  }

  /// If a chunk of this type gets copied.
  #[must_use]
  pub fn allows(self, ty: ChunkTy) -> bool {
    if ty == ChunkTy::PLTE {
      return self.contains(Self::PALETTE);
    }
    if ty.is_critical() {
      return false;
    }
    if self == Self::ALL {
      return true;
    }
    let by_kind = match ty {
      ChunkTy::tRNS => self.contains(Self::TRANSPARENCY),
      ChunkTy::tEXt | ChunkTy::zTXt | ChunkTy::iTXt => self.contains(Self::TEXTUAL),
      ChunkTy::pHYs => self.contains(Self::PHYSICAL),
      ChunkTy::gAMA | ChunkTy::sRGB | ChunkTy::cHRM | ChunkTy::iCCP | ChunkTy::sBIT => {
        self.contains(Self::COLOR)
      }
      ChunkTy::tIME => self.contains(Self::TIME),
      _ => false,
    };
    by_kind || (ty.is_safe_to_copy() && self.contains(Self::SAFE_TO_COPY))
  }
}
impl core::ops::BitOr for CopyPolicy {
  type Output = Self;
  #[inline]
  fn bitor(self, rhs: Self) -> Self {
    Self(self.0 | rhs.0)
  }
}
impl core::ops::BitOrAssign for CopyPolicy {
  #[inline]
  fn bitor_assign(&mut self, rhs: Self) {
    self.0 |= rhs.0;
  }
}
