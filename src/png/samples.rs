use super::*;

/// Packs one integer per sample into the raw row layout.
///
/// * Depths below 8 put several samples in each byte, leftmost sample in the
///   high bits. The unused low bits of the last byte are 0.
/// * Depth 8 is one byte per sample.
/// * Depth 16 is two bytes per sample, big-endian.
///
/// `out` is cleared first and ends up `bytes_per_row` long.
///
/// ## Failure
/// * `RowLength` unless there are exactly `samples_per_row` samples.
/// * `SampleOutOfRange` if a sample doesn't fit the bit depth.
pub fn pack_samples(geometry: &ImageGeometry, samples: &[u16], out: &mut Vec<u8>) -> PngResult<()> {
  if samples.len() != geometry.samples_per_row() {
    return Err(PngError::RowLength { expected: geometry.samples_per_row(), actual: samples.len() });
  }
  let depth = geometry.bit_depth();
  let max: u16 = if depth == 16 { u16::MAX } else { (1 << depth) - 1 };
  if let Some((index, &value)) = samples.iter().enumerate().find(|&(_, &s)| s > max) {
    return Err(PngError::SampleOutOfRange { index, value, bit_depth: depth });
  }
  out.clear();
  out.reserve(geometry.bytes_per_row());
  match depth {
    16 => samples.iter().for_each(|s| out.extend_from_slice(&s.to_be_bytes())),
    8 => out.extend(samples.iter().map(|&s| s as u8)),
    _ => {
      let per_byte = usize::from(8 / depth);
      for group in samples.chunks(per_byte) {
        let mut byte = 0_u8;
        for (i, &s) in group.iter().enumerate() {
          byte |= (s as u8) << (8 - depth * (i as u8 + 1));
        }
        out.push(byte);
      }
    }
  }
  debug_assert_eq!(out.len(), geometry.bytes_per_row());
  Ok(())
}

/// The reverse of [`pack_samples`].
///
/// ## Failure
/// * `RowLength` unless `row` is exactly `bytes_per_row` long.
pub fn unpack_samples(geometry: &ImageGeometry, row: &[u8], out: &mut Vec<u16>) -> PngResult<()> {
  if row.len() != geometry.bytes_per_row() {
    return Err(PngError::RowLength { expected: geometry.bytes_per_row(), actual: row.len() });
  }
  let depth = geometry.bit_depth();
  out.clear();
  out.reserve(geometry.samples_per_row());
  match depth {
    16 => out.extend(row.chunks_exact(2).map(|b| u16::from_be_bytes([b[0], b[1]]))),
    8 => out.extend(row.iter().map(|&b| u16::from(b))),
    _ => {
      let mask = (1_u8 << depth) - 1;
      let per_byte = 8 / depth;
      'bytes: for &byte in row {
        for i in 0..per_byte {
          if out.len() == geometry.samples_per_row() {
            break 'bytes;
          }
          out.push(u16::from((byte >> (8 - depth * (i + 1))) & mask));
        }
      }
    }
  }
  Ok(())
}
