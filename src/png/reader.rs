use super::*;

/// How much to care about bad CRCs while reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ErrorBehaviour {
  /// Any CRC mismatch is an error.
  #[default]
  Strict,
  /// Only CRC mismatches in critical chunks are errors.
  Lenient,
  /// CRCs aren't checked.
  SuperLenient,
}
impl ErrorBehaviour {
  #[inline]
  #[must_use]
  pub const fn checks_crc(self, ty: ChunkTy) -> bool {
    match self {
      Self::Strict => true,
      Self::Lenient => ty.is_critical(),
      Self::SuperLenient => false,
    }
  }
}

/// An unparsed chunk from a PNG.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawChunk<'b> {
  pub ty: ChunkTy,
  pub data: &'b [u8],
  pub declared_crc: u32,
}
impl RawChunk<'_> {
  /// The CRC the chunk should have.
  #[inline]
  pub fn actual_crc<C: ChecksumEngine>(&self, crc: &mut C) -> u32 {
    chunk_crc(crc, self.ty, self.data)
  }
}
impl Debug for RawChunk<'_> {
  #[inline]
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("RawChunk")
      .field("ty", &self.ty)
      .field("data", &(&self.data[..self.data.len().min(12)], self.data.len()))
      .field("declared_crc", &self.declared_crc)
      .finish()
  }
}

/// An iterator that produces successive raw chunks from PNG bytes.
///
/// Stops after the first error.
#[derive(Debug, Clone)]
pub struct RawChunkIter<'b, C: ChecksumEngine = TableCrc32> {
  spare: &'b [u8],
  behaviour: ErrorBehaviour,
  crc: C,
  done: bool,
}
impl<'b> RawChunkIter<'b> {
  /// Pass the full PNG bytes, the signature is checked and skipped.
  ///
  /// ## Failure
  /// * `Parse` if the signature is wrong.
  pub fn new(bytes: &'b [u8], behaviour: ErrorBehaviour) -> PngResult<Self> {
    if !is_png_header_correct(bytes) {
      return Err(PngError::Parse("missing PNG signature"));
    }
    let spare = &bytes[PNG_SIGNATURE.len()..];
    Ok(Self { spare, behaviour, crc: TableCrc32::new(), done: false })
  }
}
impl<'b, C: ChecksumEngine> RawChunkIter<'b, C> {
  fn take(&mut self, n: usize) -> Option<&'b [u8]> {
    if self.spare.len() < n {
      return None;
    }
    let (head, rest) = self.spare.split_at(n);
    self.spare = rest;
    Some(head)
  }

  fn read_u32(&mut self) -> Option<u32> {
    let bytes: [u8; 4] = self.take(4)?.try_into().ok()?;
    Some(u32::from_be_bytes(bytes))
  }

  fn next_chunk(&mut self) -> PngResult<RawChunk<'b>> {
    const TRUNCATED: PngError = PngError::Parse("truncated chunk");
    let len = self.read_u32().ok_or(TRUNCATED)? as usize;
    if len > Chunk::MAX_LEN {
      return Err(PngError::Parse("chunk length over 2^31-1"));
    }
    let ty_bytes: [u8; 4] = self.take(4).and_then(|b| b.try_into().ok()).ok_or(TRUNCATED)?;
    let ty = ChunkTy(ty_bytes);
    let data = self.take(len).ok_or(TRUNCATED)?;
    let declared_crc = self.read_u32().ok_or(TRUNCATED)?;
    let chunk = RawChunk { ty, data, declared_crc };
    if self.behaviour.checks_crc(ty) && chunk.actual_crc(&mut self.crc) != declared_crc {
      return Err(PngError::CrcMismatch { ty });
    }
    Ok(chunk)
  }
}
impl<'b, C: ChecksumEngine> Iterator for RawChunkIter<'b, C> {
  type Item = PngResult<RawChunk<'b>>;
  #[inline]
  fn next(&mut self) -> Option<Self::Item> {
    if self.done || self.spare.is_empty() {
      return None;
    }
    let result = self.next_chunk();
    if result.is_err() {
      self.done = true;
    }
    Some(result)
  }
}

/// Everything [`read_png`] gets out of a datastream.
#[derive(Debug, Clone)]
pub struct DecodedPng {
  pub geometry: ImageGeometry,
  /// Every chunk in order. `IDAT` chunks keep only their length.
  pub chunks: Vec<Chunk>,
  /// Unfiltered rows, `bytes_per_row` each.
  pub rows: Vec<Vec<u8>>,
  /// The filter each row was stored with.
  pub filters: Vec<StandardFilter>,
}

/// Reads a whole (non-interlaced) PNG back into raw rows.
///
/// ## Failure
/// * `Parse` for anything structurally wrong.
/// * `CrcMismatch` as the `behaviour` says.
/// * `Decompression` if the image data is corrupt.
pub fn read_png(bytes: &[u8], behaviour: ErrorBehaviour) -> PngResult<DecodedPng> {
  let mut iter = RawChunkIter::new(bytes, behaviour)?;
  let ihdr = match iter.next() {
    Some(Ok(c)) if c.ty == ChunkTy::IHDR => c,
    Some(Err(e)) => return Err(e),
    _ => return Err(PngError::Parse("first chunk must be IHDR")),
  };
  let geometry = IHDR::try_from(ihdr.data)?.geometry()?;
  let mut chunks = Vec::new();
  chunks.push(read_chunk(&ihdr, ChunkGroup::AfterHeader)?);

  let mut group = ChunkGroup::BeforePalette;
  let mut idat: Vec<&[u8]> = Vec::new();
  let mut saw_iend = false;
  for raw in iter {
    let raw = raw?;
    if saw_iend {
      return Err(PngError::Parse("chunks after IEND"));
    }
    match raw.ty {
      ChunkTy::IHDR => return Err(PngError::Parse("more than one IHDR")),
      ChunkTy::PLTE => {
        if group >= ChunkGroup::AfterPalette {
          return Err(PngError::Parse("PLTE out of place"));
        }
        group = ChunkGroup::AfterPalette;
      }
      ChunkTy::IDAT => {
        if group > ChunkGroup::PixelData {
          return Err(PngError::Parse("IDAT chunks must be consecutive"));
        }
        group = ChunkGroup::PixelData;
        idat.push(raw.data);
        chunks.push(Chunk::streamed(ChunkTy::IDAT, raw.data.len() as u32, group));
        continue;
      }
      ChunkTy::IEND => {
        group = ChunkGroup::End;
        saw_iend = true;
      }
      _ => {
        if group == ChunkGroup::PixelData {
          group = ChunkGroup::AfterPixelData;
        }
      }
    }
    chunks.push(read_chunk(&raw, group)?);
  }
  if !saw_iend {
    return Err(PngError::Parse("missing IEND"));
  }
  if idat.is_empty() {
    return Err(PngError::Parse("no IDAT chunks"));
  }
  if geometry.is_indexed() && !chunks.iter().any(|c| c.ty() == ChunkTy::PLTE) {
    return Err(PngError::MissingPalette);
  }

  let expected = usize::try_from(geometry.total_raw_bytes())
    .map_err(|_| PngError::Parse("image too big for this platform"))?;
  let mut inflater = MinizInflater::new();
  let data = inflate_slices(&mut inflater, idat, expected)?;
  if data.len() != expected {
    return Err(PngError::Parse("wrong amount of image data"));
  }
  debug!("inflated {} IDAT chunks into {} bytes", idat_count(&chunks), data.len());

  let bpr = geometry.bytes_per_row();
  let bpp = geometry.bytes_per_pixel();
  let mut rows: Vec<Vec<u8>> = Vec::with_capacity(geometry.height() as usize);
  let mut filters = Vec::with_capacity(geometry.height() as usize);
  let zero_row = vec![0_u8; bpr];
  for filtered in data.chunks_exact(bpr + 1) {
    let filter =
      StandardFilter::from_byte(filtered[0]).ok_or(PngError::Parse("unknown filter byte"))?;
    let mut row = filtered[1..].to_vec();
    let prev = rows.last().unwrap_or(&zero_row);
    unfilter_row(filter, prev, &mut row, bpp);
    rows.push(row);
    filters.push(filter);
  }
  Ok(DecodedPng { geometry, chunks, rows, filters })
}

fn read_chunk(raw: &RawChunk<'_>, group: ChunkGroup) -> PngResult<Chunk> {
  let mut chunk = Chunk::new(raw.ty, raw.data.to_vec())
    .map_err(|_| PngError::Parse("chunk type must be four ASCII letters"))?;
  chunk.set_group(group);
  Ok(chunk)
}

fn idat_count(chunks: &[Chunk]) -> usize {
  chunks.iter().filter(|c| c.ty() == ChunkTy::IDAT).count()
}
