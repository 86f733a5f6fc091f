use linepng::{png::*, ByteSink, IoSink, PngError, SinkContext, SinkError, SrgbIntent};

fn idat_payloads(png: &[u8]) -> Vec<Vec<u8>> {
  RawChunkIter::new(png, ErrorBehaviour::Strict)
    .unwrap()
    .map(|c| c.unwrap())
    .filter(|c| c.ty == ChunkTy::IDAT)
    .map(|c| c.data.to_vec())
    .collect()
}

fn chunk_types(png: &[u8]) -> Vec<ChunkTy> {
  RawChunkIter::new(png, ErrorBehaviour::Strict).unwrap().map(|c| c.unwrap().ty).collect()
}

fn write_rows(geometry: ImageGeometry, rows: &[Vec<u8>], filter_type: FilterType) -> Vec<u8> {
  let mut out = Vec::new();
  let mut writer = PngWriter::new(&mut out, geometry);
  writer.set_filter_type(filter_type).unwrap();
  writer.write_rows(rows.iter().map(|r| r.as_slice())).unwrap();
  writer.finish().unwrap();
  drop(writer);
  out
}

#[test]
fn test_two_by_two_grey_stored() {
  let geometry = ImageGeometry::grey8(2, 2).unwrap();
  let mut out = Vec::new();
  let mut writer =
    PngWriter::with_engines(&mut out, geometry, StoredDeflater::new(), FastCrc32::new());
  writer.set_filter_type(FilterType::Standard(StandardFilter::None)).unwrap();
  writer.write_row(&[0x10, 0x20]).unwrap();
  writer.write_row(&[0x30, 0x40]).unwrap();
  writer.finish().unwrap();
  assert!(writer.is_finished());
  drop(writer);

  assert!(is_png_header_correct(&out));
  assert_eq!(chunk_types(&out), [ChunkTy::IHDR, ChunkTy::IDAT, ChunkTy::IEND]);
  let idat = idat_payloads(&out);
  assert_eq!(idat.len(), 1);
  #[rustfmt::skip]
  let expected: [u8; 17] = [
    0x78, 0x01,
    0x01, 0x06, 0x00, 0xF9, 0xFF,
    0x00, 0x10, 0x20, 0x00, 0x30, 0x40,
    0x01, 0x76, 0x00, 0xA1,
  ];
  assert_eq!(idat[0], expected);

  let decoded = read_png(&out, ErrorBehaviour::Strict).unwrap();
  assert_eq!(decoded.geometry, geometry);
  assert_eq!(decoded.rows, [vec![0x10, 0x20], vec![0x30, 0x40]]);
  assert_eq!(decoded.filters, [StandardFilter::None, StandardFilter::None]);
}

#[test]
fn test_level_zero_inflates_to_filtered_rows() {
  let geometry = ImageGeometry::grey8(2, 2).unwrap();
  let mut out = Vec::new();
  let mut writer = PngWriter::new(&mut out, geometry);
  writer.set_compression_level(0).unwrap();
  writer.set_filter_type(FilterType::Standard(StandardFilter::None)).unwrap();
  writer.write_row(&[0x10, 0x20]).unwrap();
  writer.write_row(&[0x30, 0x40]).unwrap();
  writer.finish().unwrap();
  drop(writer);

  let idat = idat_payloads(&out);
  let mut inflater = MinizInflater::new();
  let data = inflate_slices(&mut inflater, idat.iter().map(|v| v.as_slice()), 6).unwrap();
  assert_eq!(data, [0x00, 0x10, 0x20, 0x00, 0x30, 0x40]);
}

#[test]
fn test_round_trip_many_layouts() {
  let layouts = [
    (1, 1, 1, false, true, false),
    (7, 5, 1, false, true, false),
    (13, 3, 2, false, true, false),
    (9, 4, 4, false, true, false),
    (17, 9, 8, false, true, false),
    (5, 6, 16, false, true, false),
    (8, 8, 8, true, true, false),
    (3, 11, 16, true, true, false),
    (31, 7, 8, false, false, false),
    (4, 4, 16, false, false, false),
    (19, 13, 8, true, false, false),
    (2, 2, 16, true, false, false),
    (10, 3, 1, false, false, true),
    (6, 6, 2, false, false, true),
    (15, 2, 4, false, false, true),
    (40, 40, 8, false, false, true),
  ];
  let filter_types = [
    FilterType::Default,
    FilterType::Standard(StandardFilter::Paeth),
    FilterType::Standard(StandardFilter::Average),
    FilterType::Cyclic,
    FilterType::Adaptive(AdaptiveStrategy::Full),
    FilterType::Adaptive(AdaptiveStrategy::SuperAdaptive),
  ];
  for (w, h, depth, alpha, grey, indexed) in layouts {
    let geometry = ImageGeometry::new(w, h, depth, alpha, grey, indexed).unwrap();
    for filter_type in filter_types {
      let rows: Vec<Vec<u8>> = (0..h).map(|_| random_row(&geometry)).collect();
      let mut out = Vec::new();
      let mut writer = PngWriter::new(&mut out, geometry);
      writer.set_filter_type(filter_type).unwrap();
      if indexed {
        let entries: Vec<[u8; 3]> = (0..1_u16 << depth).map(|i| [i as u8, 0, 255]).collect();
        writer.metadata().create_palette(&entries).unwrap();
      }
      for row in &rows {
        writer.write_row(row).unwrap();
      }
      writer.finish().unwrap();
      drop(writer);

      let decoded = read_png(&out, ErrorBehaviour::Strict).unwrap();
      assert_eq!(decoded.geometry, geometry);
      assert_eq!(decoded.rows, rows, "{geometry:?} with {filter_type:?}");
    }
  }
}

/// Random bytes, with the padding bits of a packed row zeroed.
fn random_row(geometry: &ImageGeometry) -> Vec<u8> {
  let mut row = super::rand_bytes(geometry.bytes_per_row());
  let used_bits = geometry.bits_per_pixel() as usize * geometry.width() as usize;
  let spare_bits = row.len() * 8 - used_bits;
  if spare_bits > 0 {
    if let Some(last) = row.last_mut() {
      *last &= 0xFF << spare_bits;
    }
  }
  row
}

#[test]
fn test_zero_width_is_rejected() {
  assert!(matches!(ImageGeometry::rgb8(0, 10), Err(PngError::InvalidGeometry(_))));
  assert!(matches!(ImageGeometry::rgb8(10, 0), Err(PngError::InvalidGeometry(_))));
}

#[test]
fn test_row_errors() {
  let geometry = ImageGeometry::grey8(2, 2).unwrap();
  let mut out = Vec::new();
  let mut writer = PngWriter::new(&mut out, geometry);

  assert!(matches!(
    writer.write_row(&[1, 2, 3]),
    Err(PngError::RowLength { expected: 2, actual: 3 })
  ));
  assert!(matches!(
    writer.write_row_at(&[1, 2], 1),
    Err(PngError::OutOfOrderRow { expected: 0, passed: 1 })
  ));
  // argument errors leave the writer usable
  assert!(!writer.is_closed());
  writer.write_row_at(&[1, 2], 0).unwrap();
  writer.write_row_at(&[3, 4], 1).unwrap();
  assert!(matches!(writer.write_row(&[5, 6]), Err(PngError::RowOverrun { height: 2 })));
  assert!(matches!(writer.write_row_at(&[5, 6], 2), Err(PngError::RowOverrun { height: 2 })));
  assert_eq!(writer.rows_written(), 2);
  writer.finish().unwrap();
}

#[test]
fn test_write_row_at_height_counts_as_zero() {
  let geometry = ImageGeometry::grey8(1, 3).unwrap();
  let mut out = Vec::new();
  let mut writer = PngWriter::new(&mut out, geometry);
  writer.write_row_at(&[9], 3).unwrap();
  writer.write_row_at(&[9], 1).unwrap();
  writer.write_row_at(&[9], 2).unwrap();
  writer.finish().unwrap();
}

#[test]
fn test_finish_needs_every_row() {
  let geometry = ImageGeometry::grey8(1, 3).unwrap();
  let mut out = Vec::new();
  let mut writer = PngWriter::new(&mut out, geometry);
  writer.write_row(&[1]).unwrap();
  assert!(matches!(writer.finish(), Err(PngError::IncompleteImage { written: 1, height: 3 })));
}

#[test]
fn test_compression_ratio_needs_finish() {
  let geometry = ImageGeometry::rgb8(64, 64).unwrap();
  let mut out = Vec::new();
  let mut writer = PngWriter::new(&mut out, geometry);
  let row = vec![0x55; geometry.bytes_per_row()];
  for _ in 0..64 {
    writer.write_row(&row).unwrap();
  }
  assert!(matches!(writer.compute_compression_ratio(), Err(PngError::NotFinished)));
  writer.finish().unwrap();
  let ratio = writer.compute_compression_ratio().unwrap();
  assert!(ratio > 0.0 && ratio < 0.1, "ratio {ratio}");
}

#[test]
fn test_finish_is_idempotent_and_close_is_final() {
  let geometry = ImageGeometry::grey8(1, 1).unwrap();
  let mut out = Vec::new();
  let mut writer = PngWriter::new(&mut out, geometry);
  writer.write_row(&[0]).unwrap();
  writer.finish().unwrap();
  writer.finish().unwrap();
  assert!(writer.is_closed());
  assert!(matches!(writer.write_row(&[0]), Err(PngError::WriterClosed)));
  drop(writer);
  assert_eq!(chunk_types(&out).iter().filter(|&&ty| ty == ChunkTy::IEND).count(), 1);

  let mut out = Vec::new();
  let mut writer = PngWriter::new(&mut out, geometry);
  writer.close();
  writer.close();
  assert!(matches!(writer.write_row(&[0]), Err(PngError::WriterClosed)));
  assert!(matches!(writer.finish(), Err(PngError::WriterClosed)));
  drop(writer);
  assert!(out.is_empty());
}

#[test]
fn test_missing_palette_closes_the_writer() {
  let geometry = ImageGeometry::indexed8(2, 2).unwrap();
  let mut out = Vec::new();
  let mut writer = PngWriter::new(&mut out, geometry);
  assert!(matches!(writer.write_row(&[0, 1]), Err(PngError::MissingPalette)));
  assert!(writer.is_closed());
  assert!(matches!(writer.write_row(&[0, 1]), Err(PngError::WriterClosed)));
}

#[test]
fn test_palette_not_allowed_for_grey() {
  let geometry = ImageGeometry::grey8(2, 2).unwrap();
  let mut out = Vec::new();
  let mut writer = PngWriter::new(&mut out, geometry);
  let result = writer.metadata().create_palette(&[[0, 0, 0], [255, 255, 255]]);
  assert!(matches!(result, Err(PngError::PaletteNotAllowed)));
  assert!(!writer.is_closed());
}

#[test]
fn test_late_chunks_are_unwritten() {
  let geometry = ImageGeometry::grey8(1, 1).unwrap();
  let mut out = Vec::new();
  let mut writer = PngWriter::new(&mut out, geometry);
  writer.write_row(&[7]).unwrap();
  writer.metadata().set_gamma(1.0 / 2.2).unwrap();
  assert!(matches!(
    writer.finish(),
    Err(PngError::UnwrittenChunks { count: 1, first: ChunkTy::gAMA })
  ));
  assert!(writer.is_closed());
}

#[test]
fn test_configuration_is_rejected_after_first_row() {
  let geometry = ImageGeometry::grey8(1, 2).unwrap();
  let mut out = Vec::new();
  let mut writer = PngWriter::new(&mut out, geometry);
  writer.write_row(&[7]).unwrap();
  assert!(matches!(writer.set_compression_level(9), Err(PngError::StreamMisuse(_))));
  assert!(matches!(writer.set_idat_max_size(100), Err(PngError::StreamMisuse(_))));
  assert!(matches!(writer.set_filter_type(FilterType::Cyclic), Err(PngError::StreamMisuse(_))));
  assert!(matches!(
    writer.copy_chunks_from(&[], CopyPolicy::ALL),
    Err(PngError::StreamMisuse(_))
  ));
  writer.write_row(&[8]).unwrap();
  writer.finish().unwrap();
}

#[test]
fn test_idat_splitting() {
  let geometry = ImageGeometry::rgb8(32, 32).unwrap();
  let mut out = Vec::new();
  let mut writer = PngWriter::new(&mut out, geometry);
  writer.set_compression_level(0).unwrap();
  writer.set_idat_max_size(1000).unwrap();
  let rows: Vec<Vec<u8>> = (0..32).map(|_| super::rand_bytes(geometry.bytes_per_row())).collect();
  for row in &rows {
    writer.write_row(row).unwrap();
  }
  writer.finish().unwrap();
  drop(writer);

  let idat = idat_payloads(&out);
  assert!(idat.len() > 3);
  let (last, full) = idat.split_last().unwrap();
  assert!(full.iter().all(|p| p.len() == 1000));
  assert!(!last.is_empty() && last.len() <= 1000);
  assert_eq!(read_png(&out, ErrorBehaviour::Strict).unwrap().rows, rows);
}

#[test]
fn test_metadata_placement() {
  let geometry = ImageGeometry::indexed8(4, 2).unwrap();
  let mut out = Vec::new();
  let mut writer = PngWriter::new(&mut out, geometry);
  {
    let mut meta = writer.metadata();
    meta.set_text("Comment", "after the pixels").unwrap();
    meta.set_transparency(tRNS::Index(vec![0, 128])).unwrap();
    meta.create_palette(&[[0, 0, 0], [255, 0, 0], [0, 255, 0], [0, 0, 255]]).unwrap();
    meta.set_srgb(SrgbIntent::Perceptual).unwrap();
    meta.set_dpi(72.0).unwrap();
    assert_eq!(meta.get_text("Comment").as_deref(), Some("after the pixels"));
    let (x, y) = meta.get_dpi().unwrap();
    assert!((x - 72.0).abs() < 0.05 && (y - 72.0).abs() < 0.05);
  }
  let early = tEXt::new("Title", "before the pixels").to_chunk(&geometry).unwrap();
  writer.queue_chunk(early.with_priority(true)).unwrap();
  writer.write_row(&[0, 1, 2, 3]).unwrap();
  writer.write_row(&[3, 2, 1, 0]).unwrap();
  writer.finish().unwrap();
  drop(writer);

  let types = chunk_types(&out);
  let pos = |ty: ChunkTy| types.iter().position(|&t| t == ty).unwrap();
  let text_positions: Vec<usize> =
    types.iter().enumerate().filter(|&(_, &t)| t == ChunkTy::tEXt).map(|(i, _)| i).collect();
  assert_eq!(types[0], ChunkTy::IHDR);
  assert!(pos(ChunkTy::sRGB) < pos(ChunkTy::PLTE));
  assert!(pos(ChunkTy::gAMA) < pos(ChunkTy::PLTE));
  assert!(pos(ChunkTy::PLTE) < pos(ChunkTy::tRNS));
  assert!(pos(ChunkTy::tRNS) < pos(ChunkTy::IDAT));
  assert!(pos(ChunkTy::pHYs) < pos(ChunkTy::IDAT));
  assert_eq!(text_positions.len(), 2);
  assert!(text_positions[0] < pos(ChunkTy::IDAT));
  assert!(text_positions[1] > pos(ChunkTy::IDAT));
  assert_eq!(types.last(), Some(&ChunkTy::IEND));

  let decoded = read_png(&out, ErrorBehaviour::Strict).unwrap();
  assert_eq!(decoded.rows, [vec![0, 1, 2, 3], vec![3, 2, 1, 0]]);
  let gama = decoded.chunks.iter().find(|c| c.ty() == ChunkTy::gAMA).unwrap();
  assert_eq!(gama.data(), Some(&gAMA::SRGB.0.to_be_bytes()[..]));
}

#[test]
fn test_copy_chunks_from_another_image() {
  let geometry = ImageGeometry::rgb8(2, 1).unwrap();
  let mut out = Vec::new();
  let mut writer = PngWriter::new(&mut out, geometry);
  writer.metadata().set_text("Title", "first").unwrap();
  writer.metadata().set_text("Author", "someone").unwrap();
  writer.metadata().set_gamma(1.0).unwrap();
  writer.metadata().set_dpi(300.0).unwrap();
  writer.write_row(&[1, 2, 3, 4, 5, 6]).unwrap();
  writer.finish().unwrap();
  drop(writer);
  let source = read_png(&out, ErrorBehaviour::Strict).unwrap().chunks;

  let mut copy = Vec::new();
  let mut writer = PngWriter::new(&mut copy, geometry);
  writer.metadata().set_text("Title", "second").unwrap();
  writer.copy_chunks_from(&source, CopyPolicy::TEXTUAL | CopyPolicy::PHYSICAL).unwrap();
  writer.write_row(&[6, 5, 4, 3, 2, 1]).unwrap();
  writer.finish().unwrap();
  let written = writer.chunks().written().to_vec();
  drop(writer);

  let texts: Vec<tEXt> = written
    .iter()
    .filter(|c| c.ty() == ChunkTy::tEXt)
    .map(|c| tEXt::parse(c.data().unwrap()).unwrap())
    .collect();
  assert_eq!(texts.len(), 2);
  assert!(texts.iter().any(|t| t.keyword == "Title" && t.text == "second"));
  assert!(texts.iter().any(|t| t.keyword == "Author" && t.text == "someone"));
  assert!(written.iter().any(|c| c.ty() == ChunkTy::pHYs));
  assert!(!written.iter().any(|c| c.ty() == ChunkTy::gAMA));
  assert_eq!(written.iter().filter(|c| c.ty() == ChunkTy::IHDR).count(), 1);
  read_png(&copy, ErrorBehaviour::Strict).unwrap();
}

#[test]
fn test_copied_palette_must_fit() {
  let source = vec![Chunk::new(ChunkTy::PLTE, vec![0; 3 * 20]).unwrap()];
  // 20 entries can't index a 2-bit image, so the palette isn't copied
  let geometry = ImageGeometry::new(4, 1, 2, false, false, true).unwrap();
  let mut out = Vec::new();
  let mut writer = PngWriter::new(&mut out, geometry);
  writer.copy_chunks_from(&source, CopyPolicy::ALL).unwrap();
  assert!(matches!(writer.write_row(&[0]), Err(PngError::MissingPalette)));

  let geometry = ImageGeometry::indexed8(4, 1).unwrap();
  let mut out = Vec::new();
  let mut writer = PngWriter::new(&mut out, geometry);
  writer.copy_chunks_from(&source, CopyPolicy::PALETTE).unwrap();
  writer.write_row(&[0, 5, 10, 19]).unwrap();
  writer.finish().unwrap();
  drop(writer);
  assert!(chunk_types(&out).contains(&ChunkTy::PLTE));
}

#[test]
fn test_indexed_transparency_must_fit_the_palette() {
  let geometry = ImageGeometry::indexed8(2, 1).unwrap();
  let mut out = Vec::new();
  let mut writer = PngWriter::new(&mut out, geometry);
  writer.metadata().create_palette(&[[0, 0, 0], [255, 255, 255]]).unwrap();
  writer.metadata().set_transparency(tRNS::Index(vec![0; 200])).unwrap();
  assert!(matches!(
    writer.write_row(&[0, 1]),
    Err(PngError::InvalidChunkData { ty: ChunkTy::tRNS, .. })
  ));
  assert!(writer.is_closed());
  drop(writer);
  assert!(!chunk_types(&out).contains(&ChunkTy::tRNS));

  // a copied tRNS that's bigger than the copied palette is left out
  let source = vec![
    Chunk::new(ChunkTy::PLTE, vec![0; 3 * 2]).unwrap(),
    Chunk::new(ChunkTy::tRNS, vec![0; 3]).unwrap(),
  ];
  let mut out = Vec::new();
  let mut writer = PngWriter::new(&mut out, geometry);
  writer.copy_chunks_from(&source, CopyPolicy::ALL).unwrap();
  writer.write_row(&[0, 1]).unwrap();
  writer.finish().unwrap();
  drop(writer);
  let types = chunk_types(&out);
  assert!(types.contains(&ChunkTy::PLTE));
  assert!(!types.contains(&ChunkTy::tRNS));
}

#[test]
fn test_preserve_filter() {
  let geometry = ImageGeometry::grey8(3, 3).unwrap();
  let rows = [[1, 2, 3], [4, 5, 6], [7, 8, 9]];
  let filters = [StandardFilter::Sub, StandardFilter::Up, StandardFilter::Average];
  let mut out = Vec::new();
  let mut writer = PngWriter::new(&mut out, geometry);
  writer.set_filter_type(FilterType::Preserve).unwrap();
  for (row, filter) in rows.iter().zip(filters) {
    writer.write_row_preserving(row, filter).unwrap();
  }
  writer.finish().unwrap();
  assert_eq!(writer.filters_used(), [0, 1, 1, 1, 0]);
  drop(writer);

  let decoded = read_png(&out, ErrorBehaviour::Strict).unwrap();
  assert_eq!(decoded.filters, filters);
  assert_eq!(decoded.rows, rows.map(|r| r.to_vec()));
}

#[test]
fn test_write_row_samples() {
  let geometry = ImageGeometry::new(5, 2, 2, false, true, false).unwrap();
  let mut out = Vec::new();
  let mut writer = PngWriter::new(&mut out, geometry);
  writer.write_row_samples(&[3, 0, 1, 2, 3]).unwrap();
  assert!(matches!(
    writer.write_row_samples(&[0, 0, 4, 0, 0]),
    Err(PngError::SampleOutOfRange { index: 2, value: 4, bit_depth: 2 })
  ));
  writer.write_row_samples(&[0, 1, 2, 3, 0]).unwrap();
  writer.finish().unwrap();
  drop(writer);

  let decoded = read_png(&out, ErrorBehaviour::Strict).unwrap();
  assert_eq!(decoded.rows, [vec![0b1100_0110, 0b1100_0000], vec![0b0001_1011, 0b0000_0000]]);
  let mut samples = Vec::new();
  unpack_samples(&geometry, &decoded.rows[1], &mut samples).unwrap();
  assert_eq!(samples, [0, 1, 2, 3, 0]);
}

#[test]
fn test_io_sink() {
  let geometry = ImageGeometry::rgba8(3, 2).unwrap();
  let rows = vec![super::rand_bytes(12), super::rand_bytes(12)];
  let mut sink = IoSink::new(Vec::new());
  let mut writer = PngWriter::new(&mut sink, geometry);
  for row in &rows {
    writer.write_row(row).unwrap();
  }
  writer.finish().unwrap();
  drop(writer);
  assert!(sink.is_closed());

  let bytes = sink.into_inner();
  assert_eq!(bytes, write_rows(geometry, &rows, FilterType::Default));
  assert_eq!(read_png(&bytes, ErrorBehaviour::Strict).unwrap().rows, rows);
}

#[test]
fn test_sink_is_left_open_when_asked() {
  let geometry = ImageGeometry::grey8(1, 1).unwrap();
  let mut sink = IoSink::new(Vec::new());
  let mut writer = PngWriter::new(&mut sink, geometry);
  writer.set_should_close_sink(false);
  writer.write_row(&[1]).unwrap();
  writer.finish().unwrap();
  drop(writer);
  assert!(!sink.is_closed());

  let mut writer = PngWriter::new(&mut sink, geometry);
  writer.write_row(&[1]).unwrap();
  writer.finish().unwrap();
  drop(writer);
  assert!(sink.is_closed());
  // two whole images, back to back
  let bytes = sink.into_inner();
  assert_eq!(bytes.len() % 2, 0);
  let (a, b) = bytes.split_at(bytes.len() / 2);
  assert_eq!(a, b);
}

#[test]
fn test_advance_to_writes_header_early() {
  let geometry = ImageGeometry::grey8(1, 1).unwrap();
  let mut out = Vec::new();
  let mut writer = PngWriter::new(&mut out, geometry);
  writer.metadata().set_gamma(1.0).unwrap();
  writer.advance_to(ChunkGroup::AfterPalette).unwrap();
  assert_eq!(writer.group(), ChunkGroup::AfterPalette);
  assert!(matches!(
    writer.advance_to(ChunkGroup::BeforePalette),
    Err(PngError::ChunkOrder { from: ChunkGroup::AfterPalette, to: ChunkGroup::BeforePalette })
  ));
  assert!(matches!(
    writer.advance_to(ChunkGroup::End),
    Err(PngError::IncompleteImage { written: 0, height: 1 })
  ));
  assert_eq!(writer.chunks().written_of_type(ChunkTy::gAMA).count(), 1);
  writer.write_row(&[0]).unwrap();
  writer.finish().unwrap();
}

#[test]
fn test_reader_spots_corruption() {
  let geometry = ImageGeometry::grey8(4, 4).unwrap();
  let rows: Vec<Vec<u8>> = (0..4).map(|_| super::rand_bytes(4)).collect();
  let mut png = write_rows(geometry, &rows, FilterType::Default);

  // the zlib header byte: signature, IHDR, then the IDAT length and type
  let zlib_start = 8 + 25 + 8;
  assert_eq!(png[zlib_start], 0x78);
  png[zlib_start] ^= 0xFF;
  assert!(matches!(
    read_png(&png, ErrorBehaviour::Strict),
    Err(PngError::CrcMismatch { ty: ChunkTy::IDAT })
  ));
  assert!(read_png(&png, ErrorBehaviour::SuperLenient).is_err());

  assert!(read_png(&png[..png.len() - 12], ErrorBehaviour::SuperLenient).is_err());
}

#[test]
fn test_RawChunkIter_no_panics() {
  // even totally random data should never panic the iterator!
  for _ in 0..50 {
    let mut v = PNG_SIGNATURE.to_vec();
    v.extend(super::rand_bytes(1024));
    for _ in RawChunkIter::new(&v, ErrorBehaviour::SuperLenient).unwrap() {
      //
    }
    let _ = read_png(&v, ErrorBehaviour::SuperLenient);
  }
}

/// Accepts a fixed number of writes, then fails every write.
#[derive(Debug, Default)]
struct FlakySink {
  bytes: Vec<u8>,
  writes_left: usize,
  closes: u32,
  fail_close: bool,
}
impl FlakySink {
  fn new(writes_left: usize, fail_close: bool) -> Self {
    Self { writes_left, fail_close, ..Self::default() }
  }
}
impl ByteSink for FlakySink {
  fn write(&mut self, bytes: &[u8]) -> Result<(), SinkError> {
    if self.writes_left == 0 {
      return Err(SinkError(String::from("disk full")));
    }
    self.writes_left -= 1;
    self.bytes.extend_from_slice(bytes);
    Ok(())
  }
  fn close(&mut self) -> Result<(), SinkError> {
    self.closes += 1;
    if self.fail_close {
      Err(SinkError(String::from("close failed")))
    } else {
      Ok(())
    }
  }
}

#[test]
fn test_sink_failure_names_the_row_in_flight() {
  let geometry = ImageGeometry::grey8(2, 2).unwrap();
  // the signature and half of IHDR get out
  let mut sink = FlakySink::new(3, false);
  let mut writer = PngWriter::new(&mut sink, geometry);
  match writer.write_row(&[1, 2]) {
    Err(PngError::Sink { context, source }) => {
      assert_eq!(context, SinkContext::Chunk { ty: ChunkTy::IHDR, row: Some(0) });
      assert_eq!(source, SinkError(String::from("disk full")));
    }
    other => panic!("expected a sink error, got {other:?}"),
  }
  assert!(writer.is_closed());
  assert!(matches!(writer.write_row(&[1, 2]), Err(PngError::WriterClosed)));
  assert!(matches!(writer.finish(), Err(PngError::WriterClosed)));
  drop(writer);
  assert_eq!(sink.closes, 1);
  assert_eq!(&sink.bytes[..8], &PNG_SIGNATURE[..]);
}

#[test]
fn test_sink_failure_survives_a_failing_close() {
  let geometry = ImageGeometry::grey8(2, 2).unwrap();
  // the signature and IHDR get out, the rows stay buffered until finish
  let mut sink = FlakySink::new(5, true);
  let mut writer = PngWriter::new(&mut sink, geometry);
  writer.write_row(&[1, 2]).unwrap();
  writer.write_row(&[3, 4]).unwrap();
  match writer.finish() {
    Err(PngError::Sink { context, source }) => {
      assert_eq!(context, SinkContext::Chunk { ty: ChunkTy::IDAT, row: None });
      assert_eq!(source, SinkError(String::from("disk full")));
    }
    other => panic!("expected a sink error, got {other:?}"),
  }
  assert!(writer.is_closed());
  assert!(!writer.is_finished());
  assert!(matches!(writer.finish(), Err(PngError::WriterClosed)));
  assert!(matches!(writer.write_row(&[5, 6]), Err(PngError::WriterClosed)));
  writer.close();
  drop(writer);
  assert_eq!(sink.closes, 1);
}
