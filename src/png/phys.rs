use super::*;

const INCHES_PER_METER: f64 = 1.0 / 0.0254;

/// Physical pixel dimensions
///
/// Spec: [pHYs](https://www.w3.org/TR/png/#11pHYs)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(nonstandard_style)]
pub struct pHYs {
  pub pixels_per_unit_x: u32,
  pub pixels_per_unit_y: u32,
  /// When `false` the values only give the aspect ratio.
  pub unit_is_meter: bool,
}
impl pHYs {
  /// Square pixels at the given dots per inch.
  ///
  /// ## Failure
  /// * `InvalidChunkData` unless `dpi` is positive.
  pub fn from_dpi(dpi: f64) -> PngResult<Self> {
    Self::from_dpi_xy(dpi, dpi)
  }

  /// ## Failure
  /// * `InvalidChunkData` unless both values are positive.
  pub fn from_dpi_xy(dpi_x: f64, dpi_y: f64) -> PngResult<Self> {
    let to_ppm = |dpi: f64| {
      let ppm = dpi * INCHES_PER_METER;
      if ppm >= 0.5 && ppm < f64::from(u32::MAX) {
        Ok((ppm + 0.5) as u32)
      } else {
        Err(PngError::InvalidChunkData { ty: ChunkTy::pHYs, reason: "dpi out of range" })
      }
    };
    Ok(Self {
      pixels_per_unit_x: to_ppm(dpi_x)?,
      pixels_per_unit_y: to_ppm(dpi_y)?,
      unit_is_meter: true,
    })
  }

  /// Dots per inch, if the unit is known.
  #[must_use]
  pub fn dpi(&self) -> Option<(f64, f64)> {
    if !self.unit_is_meter {
      return None;
    }
    let to_dpi = |ppm: u32| f64::from(ppm) / INCHES_PER_METER;
    Some((to_dpi(self.pixels_per_unit_x), to_dpi(self.pixels_per_unit_y)))
  }

  /// ## Failure
  /// * `InvalidChunkData` unless the payload is 9 bytes with a known unit.
  pub fn parse(data: &[u8]) -> PngResult<Self> {
    let bad = |reason| PngError::InvalidChunkData { ty: ChunkTy::pHYs, reason };
    match data {
      [x0, x1, x2, x3, y0, y1, y2, y3, unit] => Ok(Self {
        pixels_per_unit_x: u32::from_be_bytes([*x0, *x1, *x2, *x3]),
        pixels_per_unit_y: u32::from_be_bytes([*y0, *y1, *y2, *y3]),
        unit_is_meter: match unit {
          0 => false,
          1 => true,
          _ => return Err(bad("unknown unit")),
        },
      }),
      _ => Err(bad("must be 9 bytes")),
    }
  }
}
impl ChunkPayload for pHYs {
  const TY: ChunkTy = ChunkTy::pHYs;

  fn payload(&self, _: &ImageGeometry) -> PngResult<Vec<u8>> {
    let mut out = Vec::with_capacity(9);
    out.extend_from_slice(&self.pixels_per_unit_x.to_be_bytes());
    out.extend_from_slice(&self.pixels_per_unit_y.to_be_bytes());
    out.push(u8::from(self.unit_is_meter));
    Ok(out)
  }
}
