use super::*;

/// Image last-modification time, in UTC.
///
/// Spec: [tIME](https://www.w3.org/TR/png/#11tIME)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[allow(nonstandard_style)]
pub struct tIME {
  pub year: u16,
  /// 1-12
  pub month: u8,
  /// 1-31
  pub day: u8,
  /// 0-23
  pub hour: u8,
  /// 0-59
  pub minute: u8,
  /// 0-60, leap seconds allowed.
  pub second: u8,
}
impl tIME {
  /// ## Failure
  /// * `InvalidChunkData` unless the payload is 7 bytes.
  pub fn parse(data: &[u8]) -> PngResult<Self> {
    match data {
      [y0, y1, month, day, hour, minute, second] => Ok(Self {
        year: u16::from_be_bytes([*y0, *y1]),
        month: *month,
        day: *day,
        hour: *hour,
        minute: *minute,
        second: *second,
      }),
      _ => Err(PngError::InvalidChunkData { ty: ChunkTy::tIME, reason: "must be 7 bytes" }),
    }
  }

  fn is_valid(&self) -> bool {
    (1..=12).contains(&self.month)
      && (1..=31).contains(&self.day)
      && self.hour <= 23
      && self.minute <= 59
      && self.second <= 60
  }
}
impl ChunkPayload for tIME {
  const TY: ChunkTy = ChunkTy::tIME;

  fn payload(&self, _: &ImageGeometry) -> PngResult<Vec<u8>> {
    if !self.is_valid() {
      return Err(PngError::InvalidChunkData { ty: Self::TY, reason: "field out of range" });
    }
    let [y0, y1] = self.year.to_be_bytes();
    Ok(vec![y0, y1, self.month, self.day, self.hour, self.minute, self.second])
  }
}
