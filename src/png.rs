//! Module for writing PNG data.
//!
//! * [Portable Network Graphics Specification (Second Edition)][png-spec]
//!
//! [png-spec]: https://www.w3.org/TR/2003/REC-PNG-20031110/
//!
//! ## How The Writer Works
//!
//! A PNG datastream is an 8 byte signature followed by a series of "chunks".
//! Each chunk is a big-endian length, a 4 byte type tag, the payload, and a
//! CRC-32 over the tag and payload. The order of the chunks is fixed by the
//! PNG spec:
//!
//! ```text
//! IHDR, {ancillary before PLTE}*, PLTE?, {ancillary after PLTE}*,
//! IDAT+, {ancillary after IDAT}*, IEND
//! ```
//!
//! The [`PngWriter`] tracks where it is within that order with a
//! [`ChunkGroup`], which only ever moves forward. Chunks you queue are held in
//! the [`ChunksList`] until the writer reaches a position where they're
//! allowed to go.
//!
//! The image data itself is produced row by row:
//!
//! 1) Each raw row is run through one of the five PNG filters (see
//!    [`StandardFilter`]). The choice can be fixed or picked per row by a
//!    [`FilterType`] strategy.
//! 2) The filter byte plus the filtered row goes into a single zlib stream
//!    (a [`Deflater`]).
//! 3) The compressed output is cut into `IDAT` chunks of a bounded size. The
//!    cut points mean nothing, all `IDAT` payloads together form one stream.
//!
//! Interlaced output is not supported.
//!
//! ## Reading
//!
//! There's also just enough of a reader to check what was written:
//! [`RawChunkIter`] walks the chunks (checking CRCs according to an
//! [`ErrorBehaviour`]) and [`read_png`] inflates and unfilters the rows.

use alloc::{boxed::Box, string::String, vec, vec::Vec};
use core::fmt::{Debug, Write};

use log::{debug, trace, warn};

use crate::{ByteSink, PngError, PngResult, SinkContext, SinkError, SrgbIntent};

mod geometry;
pub use geometry::*;

mod crc32;
pub use crc32::*;

mod deflate;
pub use deflate::*;

mod inflate;
pub use inflate::*;

mod filter;
pub use filter::*;

mod chunk;
pub use chunk::*;

mod chunks_list;
pub use chunks_list::*;

mod ihdr;
pub use ihdr::*;

mod plte;
pub use plte::*;

mod trns;
pub use trns::*;

mod gama;
pub use gama::*;

mod srgb;
pub use srgb::*;

mod phys;
pub use phys::*;

mod text;
pub use text::*;

mod time;
pub use time::*;

mod metadata;
pub use metadata::*;

mod idat;
pub use idat::*;

mod pixels;
pub use pixels::*;

mod samples;
pub use samples::*;

mod writer;
pub use writer::*;

mod reader;
pub use reader::*;


/// The first eight bytes of a PNG datastream should match these bytes.
pub const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// Checks if the PNG's initial 8 bytes are correct.
///
/// * If this is the case, the rest of the bytes are very likely PNG data.
/// * If this is *not* the case, the rest of the bytes are very likely *not* PNG
///   data.
#[inline]
#[must_use]
pub const fn is_png_header_correct(bytes: &[u8]) -> bool {
  matches!(bytes, [137, 80, 78, 71, 13, 10, 26, 10, ..])
}
