use super::*;

/// Textual data
///
/// A keyword and some text, both Latin-1. The keyword is 1-79 bytes, with no
/// leading, trailing, or doubled spaces.
///
/// Spec: [tEXt](https://www.w3.org/TR/png/#11tEXt)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[allow(nonstandard_style)]
pub struct tEXt {
  pub keyword: String,
  pub text: String,
}
impl tEXt {
  #[inline]
  #[must_use]
  pub fn new(keyword: &str, text: &str) -> Self {
    Self { keyword: String::from(keyword), text: String::from(text) }
  }

  /// ## Failure
  /// * `InvalidChunkData` without a null separator or with a bad keyword.
  pub fn parse(data: &[u8]) -> PngResult<Self> {
    let sep = data.iter().position(|&b| b == 0).ok_or(PngError::InvalidChunkData {
      ty: ChunkTy::tEXt,
      reason: "no null after the keyword",
    })?;
    check_keyword(&data[..sep])?;
    Ok(Self { keyword: latin1_decode(&data[..sep]), text: latin1_decode(&data[sep + 1..]) })
  }
}
impl ChunkPayload for tEXt {
  const TY: ChunkTy = ChunkTy::tEXt;

  /// ## Failure
  /// * `InvalidChunkData` with a bad keyword, or characters outside Latin-1.
  fn payload(&self, _: &ImageGeometry) -> PngResult<Vec<u8>> {
    let mut out = Vec::with_capacity(self.keyword.len() + 1 + self.text.len());
    latin1_encode(&self.keyword, &mut out)?;
    check_keyword(&out)?;
    out.push(0);
    let text_start = out.len();
    latin1_encode(&self.text, &mut out)?;
    if out[text_start..].contains(&0) {
      return Err(PngError::InvalidChunkData { ty: Self::TY, reason: "text can't contain nulls" });
    }
    Ok(out)
  }
}

fn check_keyword(keyword: &[u8]) -> PngResult<()> {
  let bad = |reason| PngError::InvalidChunkData { ty: ChunkTy::tEXt, reason };
  if keyword.is_empty() || keyword.len() > 79 {
    return Err(bad("keyword must be 1 to 79 bytes"));
  }
  if keyword.first() == Some(&b' ') || keyword.last() == Some(&b' ') {
    return Err(bad("keyword can't start or end with a space"));
  }
  if keyword.windows(2).any(|w| w == b"  ") {
    return Err(bad("keyword can't have consecutive spaces"));
  }
  if !keyword.iter().all(|&b| (32..=126).contains(&b) || b >= 161) {
    return Err(bad("keyword has non-printable characters"));
  }
  Ok(())
}

fn latin1_encode(s: &str, out: &mut Vec<u8>) -> PngResult<()> {
  for ch in s.chars() {
    let code = u32::from(ch);
    if code > 0xFF {
      return Err(PngError::InvalidChunkData { ty: ChunkTy::tEXt, reason: "text must be Latin-1" });
    }
    out.push(code as u8);
  }
  Ok(())
}

fn latin1_decode(bytes: &[u8]) -> String {
  bytes.iter().map(|&b| char::from(b)).collect()
}
