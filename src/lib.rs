#![no_std]
#![cfg_attr(docs_rs, feature(doc_cfg))]
#![forbid(unsafe_code)]

//! A crate for writing PNG data one row at a time.
//!
//! You describe the image with an [`ImageGeometry`](png::ImageGeometry),
//! hand a [`ByteSink`] to a [`PngWriter`](png::PngWriter), and then feed it
//! the raw (unfiltered) pixel rows from top to bottom. The writer filters each
//! row, pushes it through a single continuous zlib stream, and emits the
//! compressed data as `IDAT` chunks as it goes. Metadata chunks are placed in
//! the proper position relative to the palette and the image data.
//!
//! ```
//! use linepng::png::*;
//! # fn main() -> Result<(), linepng::PngError> {
//! let geometry = ImageGeometry::grey8(2, 2)?;
//! let mut out: Vec<u8> = Vec::new();
//! let mut writer = PngWriter::new(&mut out, geometry);
//! writer.write_row(&[0x10, 0x20])?;
//! writer.write_row(&[0x30, 0x40])?;
//! writer.finish()?;
//! drop(writer);
//! assert!(is_png_header_correct(&out));
//! # Ok(())
//! # }
//! ```

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

#[cfg(target_pointer_width = "16")]
compile_error!("this crate assumes 32-bit or bigger pointers!");

mod error;
pub use error::*;

mod sink;
pub use sink::*;

pub mod png;

/// Used by the `sRGB` chunk to select a rendering intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
// Note: the byte values are the ones PNG uses, other formats number these
// differently.
#[repr(u8)]
pub enum SrgbIntent {
  /// for images preferring good adaptation to the output device gamut at the
  /// expense of colorimetric accuracy, such as photographs.
  Perceptual = 0,
  /// for images requiring colour appearance matching (relative to the output
  /// device white point), such as logos.
  RelativeColorimetric = 1,
  /// for images preferring preservation of saturation at the expense of hue and
  /// lightness, such as charts and graphs.
  Saturation = 2,
  /// for images requiring preservation of absolute colorimetry, such as
  /// previews of images destined for a different output device (proofs).
  AbsoluteColorimetric = 3,
}
