//! From the PNG spec:
//!
//! > Filters are applied to **bytes**, not to pixels, regardless of the bit
//! > depth or color type of the image.
//!
//! All the arithmetic here wraps around modulo 256.

use super::*;

/// The five filters that can actually appear in PNG data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum StandardFilter {
  None = 0,
  /// Difference from the byte one pixel to the left.
  Sub = 1,
  /// Difference from the byte above.
  Up = 2,
  /// Difference from the average of left and above.
  Average = 3,
  /// Difference from the [`paeth_predictor`] of left, above, and upper left.
  Paeth = 4,
}
impl StandardFilter {
  /// All filters, in filter byte order.
  pub const ALL: [Self; 5] = [Self::None, Self::Sub, Self::Up, Self::Average, Self::Paeth];

  /// The filter for a filter byte, if it's one of the five.
  #[inline]
  #[must_use]
  pub const fn from_byte(byte: u8) -> Option<Self> {
    Some(match byte {
      0 => Self::None,
      1 => Self::Sub,
      2 => Self::Up,
      3 => Self::Average,
      4 => Self::Paeth,
      _ => return None,
    })
  }
}

/// Ways of picking a filter for each row by trying them out.
///
/// The variants differ in how many rows get all five filters evaluated. Rows
/// in between reuse the most recent pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AdaptiveStrategy {
  /// Evaluate every 8th row.
  Fast,
  /// Evaluate every 4th row.
  Medium,
  /// Evaluate every row.
  Full,
  /// Evaluate every row, scoring by actually compressing each candidate.
  SuperAdaptive,
}
impl AdaptiveStrategy {
  #[inline]
  #[must_use]
  pub const fn sample_interval(self) -> u32 {
    match self {
      Self::Fast => 8,
      Self::Medium => 4,
      Self::Full | Self::SuperAdaptive => 1,
    }
  }
}

/// What filter to use, or how to choose one.
///
/// Everything other than `Standard` is resolved to a [`StandardFilter`] per
/// row, before any byte of that row is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterType {
  /// Always this filter.
  Standard(StandardFilter),
  /// A fixed filter guessed from the image's geometry.
  Default,
  /// Try the filters, keep the best.
  Adaptive(AdaptiveStrategy),
  /// Use the filter the caller gives along with each row.
  Preserve,
  /// Row `n` uses filter `n % 5`. Only useful for tests.
  Cyclic,
  /// Placeholder, can't be used to write.
  Unknown,
}
impl Default for FilterType {
  #[inline]
  fn default() -> Self {
    Self::Default
  }
}
impl From<StandardFilter> for FilterType {
  #[inline]
  fn from(f: StandardFilter) -> Self {
    Self::Standard(f)
  }
}
impl FilterType {
  /// The integer code for this filter type.
  ///
  /// Standard filters are their filter byte, strategies are negative.
  #[inline]
  #[must_use]
  pub const fn code(self) -> i32 {
    match self {
      Self::Standard(f) => f as i32,
      Self::Default => -1,
      Self::Adaptive(AdaptiveStrategy::Fast) => -2,
      Self::Adaptive(AdaptiveStrategy::Medium) => -3,
      Self::Adaptive(AdaptiveStrategy::Full) => -4,
      Self::Adaptive(AdaptiveStrategy::SuperAdaptive) => -10,
      Self::Preserve => -40,
      Self::Cyclic => -50,
      Self::Unknown => -100,
    }
  }
}
impl TryFrom<i32> for FilterType {
  type Error = PngError;
  #[inline]
  fn try_from(code: i32) -> Result<Self, Self::Error> {
    Ok(match code {
      0..=4 => match StandardFilter::from_byte(code as u8) {
        Some(f) => Self::Standard(f),
        None => return Err(PngError::InvalidFilter(code)),
      },
      -1 => Self::Default,
      -2 => Self::Adaptive(AdaptiveStrategy::Fast),
      -3 => Self::Adaptive(AdaptiveStrategy::Medium),
      -4 => Self::Adaptive(AdaptiveStrategy::Full),
      -10 => Self::Adaptive(AdaptiveStrategy::SuperAdaptive),
      -40 => Self::Preserve,
      -50 => Self::Cyclic,
      -100 => Self::Unknown,
      _ => return Err(PngError::InvalidFilter(code)),
    })
  }
}

/// The Paeth filter function computes a simple linear function of the three
/// neighboring bytes (left `a`, above `b`, upper left `c`).
///
/// The output is the neighbor closest to the computed value. If any neighbor
/// isn't present because this is the top or left edge of the image just
/// substitute 0 in that position.
#[inline]
#[must_use]
pub const fn paeth_predictor(a: u8, b: u8, c: u8) -> u8 {
  // Note: "The calculations within the PaethPredictor function shall be
  // performed exactly, without overflow." i32 is wide enough for any u8 input.
  let a_ = a as i32;
  let b_ = b as i32;
  let c_ = c as i32;
  let p = a_ + b_ - c_;
  let pa = (p - a_).abs();
  let pb = (p - b_).abs();
  let pc = (p - c_).abs();
  // The order of these tests is part of the format, don't change it.
  if pa <= pb && pa <= pc {
    a
  } else if pb <= pc {
    b
  } else {
    c
  }
}

#[inline]
const fn average(a: u8, b: u8) -> u8 {
  ((a as u16 + b as u16) / 2) as u8
}

/// Filters one row.
///
/// * `raw` is the row's unfiltered bytes.
/// * `prev` is the unfiltered row above (all zeroes for the first row).
/// * `bpp` is the geometry's bytes per pixel.
/// * `out` gets the filtered bytes (no filter type byte).
///
/// ## Panics
/// * If the slices don't all have the same length.
pub fn filter_row(filter: StandardFilter, raw: &[u8], prev: &[u8], bpp: usize, out: &mut [u8]) {
  assert_eq!(raw.len(), prev.len());
  assert_eq!(raw.len(), out.len());
  let lead = bpp.min(raw.len());
  match filter {
    StandardFilter::None => out.copy_from_slice(raw),
    StandardFilter::Sub => {
      out[..lead].copy_from_slice(&raw[..lead]);
      out[lead..].iter_mut().zip(raw[lead..].iter().zip(raw.iter())).for_each(|(o, (x, a))| {
        *o = x.wrapping_sub(*a);
      });
    }
    StandardFilter::Up => {
      out.iter_mut().zip(raw.iter().zip(prev.iter())).for_each(|(o, (x, b))| {
        *o = x.wrapping_sub(*b);
      });
    }
    StandardFilter::Average => {
      for i in 0..lead {
        out[i] = raw[i].wrapping_sub(prev[i] / 2);
      }
      for i in lead..raw.len() {
        out[i] = raw[i].wrapping_sub(average(raw[i - bpp], prev[i]));
      }
    }
    StandardFilter::Paeth => {
      for i in 0..lead {
        // with a and c both 0 the predictor is always b
        out[i] = raw[i].wrapping_sub(paeth_predictor(0, prev[i], 0));
      }
      for i in lead..raw.len() {
        out[i] = raw[i].wrapping_sub(paeth_predictor(raw[i - bpp], prev[i], prev[i - bpp]));
      }
    }
  }
}

/// Undoes [`filter_row`] in place.
///
/// `prev` is the already reconstructed row above (zeroes for the first row).
///
/// ## Panics
/// * If the slices have different lengths.
pub fn unfilter_row(filter: StandardFilter, prev: &[u8], row: &mut [u8], bpp: usize) {
  assert_eq!(row.len(), prev.len());
  let lead = bpp.min(row.len());
  match filter {
    StandardFilter::None => (),
    StandardFilter::Sub => {
      for i in lead..row.len() {
        row[i] = row[i].wrapping_add(row[i - bpp]);
      }
    }
    StandardFilter::Up => {
      row.iter_mut().zip(prev.iter()).for_each(|(x, b)| *x = x.wrapping_add(*b));
    }
    StandardFilter::Average => {
      for i in 0..lead {
        row[i] = row[i].wrapping_add(prev[i] / 2);
      }
      for i in lead..row.len() {
        row[i] = row[i].wrapping_add(average(row[i - bpp], prev[i]));
      }
    }
    StandardFilter::Paeth => {
      for i in 0..lead {
        row[i] = row[i].wrapping_add(paeth_predictor(0, prev[i], 0));
      }
      for i in lead..row.len() {
        row[i] = row[i].wrapping_add(paeth_predictor(row[i - bpp], prev[i], prev[i - bpp]));
      }
    }
  }
}

/// Sum of the filtered bytes read as signed values, lower is better.
///
/// This is the usual "minimum sum of absolute differences" heuristic.
#[inline]
#[must_use]
pub fn filter_score(filtered: &[u8]) -> u64 {
  filtered.iter().map(|&b| u64::from((b as i8).unsigned_abs())).sum()
}

/// The filter to use for an image when the caller says [`FilterType::Default`].
#[must_use]
pub fn default_filter_for(geometry: &ImageGeometry) -> StandardFilter {
  if geometry.is_indexed() || geometry.bit_depth() < 8 || geometry.total_pixels() < 1024 {
    StandardFilter::None
  } else if geometry.height() == 1 {
    StandardFilter::Sub
  } else if geometry.width() == 1 {
    StandardFilter::Up
  } else {
    StandardFilter::Paeth
  }
}

/// Filters rows, choosing the filter according to a [`FilterType`].
#[derive(Debug, Clone)]
pub struct RowFilterEngine {
  geometry: ImageGeometry,
  filter_type: FilterType,
  candidates: [Vec<u8>; 5],
  last_choice: Option<StandardFilter>,
  filters_used: [u32; 5],
}
impl RowFilterEngine {
  #[must_use]
  pub fn new(geometry: ImageGeometry, filter_type: FilterType) -> Self {
    Self {
      geometry,
      filter_type,
      candidates: Default::default(),
      last_choice: None,
      filters_used: [0; 5],
    }
  }

  #[inline]
  #[must_use]
  pub const fn filter_type(&self) -> FilterType {
    self.filter_type
  }

  #[inline]
  pub fn set_filter_type(&mut self, filter_type: FilterType) {
    self.filter_type = filter_type;
  }

  /// How many rows used each standard filter.
  #[inline]
  #[must_use]
  pub const fn filters_used(&self) -> [u32; 5] {
    self.filters_used
  }

  /// Share of rows that used each standard filter, as percentages.
  #[must_use]
  pub fn filters_used_percent(&self) -> [f64; 5] {
    let total: u32 = self.filters_used.iter().sum();
    let mut out = [0.0; 5];
    if total > 0 {
      for (o, n) in out.iter_mut().zip(self.filters_used.iter()) {
        *o = f64::from(*n) * 100.0 / f64::from(total);
      }
    }
    out
  }

  /// Filters a row into `out` (cleared first), prepending the filter byte.
  ///
  /// * `row_num` counts from 0.
  /// * `prev` must be all zeroes for row 0.
  /// * `preserved` is the caller's per row choice, used by
  ///   [`FilterType::Preserve`].
  ///
  /// ## Failure
  /// * `InvalidFilter` with [`FilterType::Unknown`].
  pub fn filter_into(
    &mut self, row_num: u32, raw: &[u8], prev: &[u8], preserved: Option<StandardFilter>,
    out: &mut Vec<u8>,
  ) -> PngResult<StandardFilter> {
    let bpp = self.geometry.bytes_per_pixel();
    let chosen = match self.filter_type {
      FilterType::Standard(f) => f,
      FilterType::Default => default_filter_for(&self.geometry),
      FilterType::Preserve => preserved.unwrap_or_else(|| default_filter_for(&self.geometry)),
      FilterType::Cyclic => StandardFilter::ALL[(row_num % 5) as usize],
      FilterType::Unknown => return Err(PngError::InvalidFilter(FilterType::Unknown.code())),
      FilterType::Adaptive(strategy) => {
        let evaluate = row_num % strategy.sample_interval() == 0;
        match self.last_choice {
          Some(last) if !evaluate => last,
          _ => {
            let best = self.evaluate_all(strategy, raw, prev, bpp);
            trace!("row {row_num}: adaptive pick {best:?}");
            out.clear();
            out.push(best as u8);
            out.extend_from_slice(&self.candidates[best as usize]);
            self.record(best);
            return Ok(best);
          }
        }
      }
    };
    out.clear();
    out.push(chosen as u8);
    out.resize(raw.len() + 1, 0);
    filter_row(chosen, raw, prev, bpp, &mut out[1..]);
    self.record(chosen);
    Ok(chosen)
  }

  #[inline]
  fn record(&mut self, f: StandardFilter) {
    self.last_choice = Some(f);
    self.filters_used[f as usize] += 1;
  }

  /// Fills all candidates and returns the best. Ties go to the lowest filter.
  fn evaluate_all(
    &mut self, strategy: AdaptiveStrategy, raw: &[u8], prev: &[u8], bpp: usize,
  ) -> StandardFilter {
    let mut best = StandardFilter::None;
    let mut best_score = u64::MAX;
    for f in StandardFilter::ALL {
      let candidate = &mut self.candidates[f as usize];
      candidate.clear();
      candidate.resize(raw.len(), 0);
      filter_row(f, raw, prev, bpp, candidate);
      let score = match strategy {
        AdaptiveStrategy::SuperAdaptive => quick_deflated_len(candidate) as u64,
        _ => filter_score(candidate),
      };
      if score < best_score {
        best_score = score;
        best = f;
      }
    }
    best
  }
}
