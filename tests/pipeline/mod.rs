use pngrow::*;

const FORMATS: &[(PngColorType, u8)] = &[
  (PngColorType::Y, 1),
  (PngColorType::Y, 2),
  (PngColorType::Y, 4),
  (PngColorType::Y, 8),
  (PngColorType::Y, 16),
  (PngColorType::RGB, 8),
  (PngColorType::RGB, 16),
  (PngColorType::Index, 1),
  (PngColorType::Index, 2),
  (PngColorType::Index, 4),
  (PngColorType::Index, 8),
  (PngColorType::YA, 8),
  (PngColorType::YA, 16),
  (PngColorType::RGBA, 8),
  (PngColorType::RGBA, 16),
];

fn header_for(width: u32, color_type: PngColorType, bit_depth: u8) -> ImageHeader {
  let header = ImageHeader::new(width, color_type, bit_depth);
  if color_type == PngColorType::Index {
    header.with_palette(build_grayscale_palette(bit_depth))
  } else {
    header
  }
}

/// A spread of configurations, each built fresh since configs own callbacks.
fn configs() -> Vec<TransformConfig> {
  let mut out = Vec::new();
  out.push(TransformConfig::default());
  let mut c = TransformConfig::default();
  c.set_expand();
  out.push(c);
  let mut c = TransformConfig::default();
  c.set_expand().set_strip_16().set_chop_mode(ChopMode::Round);
  out.push(c);
  let mut c = TransformConfig::default();
  c.set_packing().set_packswap().set_invert_mono();
  out.push(c);
  let mut c = TransformConfig::default();
  c.set_expand().set_gray_to_rgb().set_filler(0xFFFF, FillerPlacement::Before).set_swap();
  out.push(c);
  let mut c = TransformConfig::default();
  c.set_gamma(2.2, 0.45455).set_background(Color16::rgb(40, 50, 60), BackgroundGamma::Screen, false);
  out.push(c);
  let mut c = TransformConfig::default();
  c.set_expand()
    .set_gamma(2.2, 0.45455)
    .set_background(Color16::gray(1), BackgroundGamma::File, true)
    .set_strip_16();
  out.push(c);
  let mut c = TransformConfig::default();
  c.set_rgb_to_gray(NonGrayPolicy::Ignore, -1.0, -1.0).set_gamma(2.2, 1.0).set_strip_alpha();
  out.push(c);
  let mut c = TransformConfig::default();
  c.set_expand().set_bgr().set_swap_alpha().set_invert_alpha().set_intrapixel();
  out.push(c);
  out
}

fn config_count() -> usize {
  configs().len()
}

fn nth_config(n: usize) -> TransformConfig {
  configs().swap_remove(n)
}

#[test]
fn test_rowbytes_invariant_all_formats() {
  for &(color_type, bit_depth) in FORMATS {
    for width in [1, 2, 3, 7, 13] {
      for n in 0..config_count() {
        let header = header_for(width, color_type, bit_depth);
        let mut p = ScanlinePipeline::new(&header, nth_config(n)).unwrap();
        let mut row = super::rand_bytes(p.input_info().rowbytes);
        let report = p.apply(&mut row).unwrap();
        let info = report.info;
        assert_eq!(info.pixel_depth, info.channels * info.bit_depth);
        assert_eq!(info.rowbytes, rowbytes_for(width, info.pixel_depth));
        assert_eq!(row.len(), info.rowbytes, "{color_type:?} {bit_depth} config {n}");
        assert_eq!(p.output_info(), info, "{color_type:?} {bit_depth} config {n}");
      }
    }
  }
}

#[test]
fn test_random_rows_never_panic() {
  for &(color_type, bit_depth) in FORMATS {
    for n in 0..config_count() {
      let header = header_for(17, color_type, bit_depth);
      let mut p = ScanlinePipeline::new(&header, nth_config(n)).unwrap();
      for _ in 0..8 {
        let mut row = super::rand_bytes(p.input_info().rowbytes);
        p.apply(&mut row).unwrap();
      }
      p.finish();
    }
  }
}

#[test]
fn test_palette_with_background_scenario() {
  let black = RGB8::new(0, 0, 0);
  let white = RGB8::new(255, 255, 255);
  let header = ImageHeader::new(4, PngColorType::Index, 8)
    .with_palette(vec![black, white])
    .with_transparency(Transparency::Index { alphas: vec![0, 255] });
  let mut config = TransformConfig::default();
  config.set_expand().set_background(Color16::rgb(255, 0, 0), BackgroundGamma::Screen, false);
  let mut p = ScanlinePipeline::new(&header, config).unwrap();
  assert!(p.trans_alphas().is_empty());
  let mut row = vec![0, 1, 0, 1];
  let report = p.apply(&mut row).unwrap();
  assert_eq!(report.info, RowInfo::new(4, PngColorType::RGB, 8));
  assert_eq!(row, [255, 0, 0, 255, 255, 255, 255, 0, 0, 255, 255, 255]);
}

#[test]
fn test_palette_background_by_index() {
  let header = ImageHeader::new(2, PngColorType::Index, 8)
    .with_palette(vec![RGB8::new(1, 2, 3), RGB8::new(9, 8, 7)])
    .with_transparency(Transparency::Index { alphas: vec![255, 0] });
  let mut config = TransformConfig::default();
  config.set_expand().set_background(Color16::index(0), BackgroundGamma::Screen, true);
  let mut p = ScanlinePipeline::new(&header, config).unwrap();
  let mut row = vec![1, 0];
  p.apply(&mut row).unwrap();
  assert_eq!(row, [1, 2, 3, 1, 2, 3]);
}

#[test]
fn test_16_to_8_keeps_high_bytes() {
  let mut config = TransformConfig::default();
  config.set_strip_16();
  let mut p = ScanlinePipeline::new(&ImageHeader::new(5, PngColorType::RGB, 16), config).unwrap();
  let input = super::rand_bytes(30);
  let mut row = input.clone();
  let report = p.apply(&mut row).unwrap();
  assert_eq!(report.info.bit_depth, 8);
  assert_eq!(row.len(), input.len() / 2);
  for (i, b) in row.iter().enumerate() {
    assert_eq!(*b, input[i * 2]);
  }
}

#[test]
fn test_16_to_8_round() {
  let mut config = TransformConfig::default();
  config.set_strip_16().set_chop_mode(ChopMode::Round);
  let mut p = ScanlinePipeline::new(&ImageHeader::new(3, PngColorType::Y, 16), config).unwrap();
  let mut row = vec![0x12, 0xFF, 0x12, 0x34, 0xFF, 0xFF];
  p.apply(&mut row).unwrap();
  assert_eq!(row, [0x13, 0x12, 0xFF]);
}

#[test]
fn test_background_alpha_zero_and_max() {
  let mut config = TransformConfig::default();
  config.set_gamma(2.2, 0.45455).set_background(Color16::rgb(10, 20, 30), BackgroundGamma::Screen, false);
  let mut p = ScanlinePipeline::new(&ImageHeader::new(3, PngColorType::RGBA, 8), config).unwrap();
  let tables = p.gamma_tables().unwrap();
  let table = *tables.table_8().unwrap();
  let to_1 = *tables.to_1_8().unwrap();
  let from_1 = *tables.from_1_8().unwrap();
  let (back, back_1) = p.background();
  let mut row = vec![200, 150, 100, 0, 200, 150, 100, 255, 200, 150, 100, 77];
  let report = p.apply(&mut row).unwrap();
  assert_eq!(report.info, RowInfo::new(3, PngColorType::RGB, 8));
  assert_eq!(&row[0..3], &[10, 20, 30]);
  assert_eq!(&row[3..6], &[table[200], table[150], table[100]]);

  // partial alpha blends in linear light, not in the file's gamma
  let linear = |v: u8, b_1: u16| from_1[composite8(to_1[v as usize], 77, b_1 as u8) as usize];
  let expected = [linear(200, back_1.red), linear(150, back_1.green), linear(100, back_1.blue)];
  assert_eq!(&row[6..9], &expected);
  let naive = [composite8(200, 77, back.red as u8), composite8(150, 77, back.green as u8)];
  assert_ne!(&row[6..8], &naive);
}

#[test]
fn test_background_partial_alpha_16() {
  let mut config = TransformConfig::default();
  config.set_gamma(2.2, 0.45455).set_background(
    Color16::rgb(0x1000, 0x2000, 0x3000),
    BackgroundGamma::Screen,
    false,
  );
  let mut p = ScanlinePipeline::new(&ImageHeader::new(1, PngColorType::RGBA, 16), config).unwrap();
  let tables = p.gamma_tables().unwrap().clone();
  let (to_1, from_1) = (tables.to_1_16().unwrap(), tables.from_1_16().unwrap());
  let (back, back_1) = p.background();
  let mut row = vec![0xC0, 0x00, 0x80, 0x00, 0x40, 0x00, 0x80, 0x00];
  let report = p.apply(&mut row).unwrap();
  assert_eq!(report.info, RowInfo::new(1, PngColorType::RGB, 16));
  let channel = |i: usize| u16::from_be_bytes([row[i * 2], row[i * 2 + 1]]);
  for (i, (v, b, b_1)) in
    [(0xC000, back.red, back_1.red), (0x8000, back.green, back_1.green), (0x4000, back.blue, back_1.blue)]
      .into_iter()
      .enumerate()
  {
    let expected = from_1.lookup(composite16(to_1.lookup(v), 0x8000, b_1));
    assert_eq!(channel(i), expected, "channel {i}");
    assert_ne!(channel(i), composite16(v, 0x8000, b), "channel {i}");
  }
}

#[test]
fn test_gray_key_after_gray_to_rgb() {
  let header = ImageHeader::new(2, PngColorType::Y, 8).with_transparency(Transparency::Y { y: 50 });
  let mut config = TransformConfig::default();
  config.set_gray_to_rgb().set_background(Color16::rgb(255, 0, 0), BackgroundGamma::Screen, false);
  let mut p = ScanlinePipeline::new(&header, config).unwrap();
  let mut row = vec![50, 0];
  let report = p.apply(&mut row).unwrap();
  assert_eq!(report.info, RowInfo::new(2, PngColorType::RGB, 8));
  assert_eq!(row, [255, 0, 0, 0, 0, 0]);
}

#[test]
fn test_gray_key_expanded_then_composited() {
  let header = ImageHeader::new(4, PngColorType::Y, 2).with_transparency(Transparency::Y { y: 2 });
  let mut config = TransformConfig::default();
  config.set_expand().set_background(Color16::gray(1), BackgroundGamma::Screen, true);
  let mut p = ScanlinePipeline::new(&header, config).unwrap();
  let mut row = vec![0b00_01_10_11];
  let report = p.apply(&mut row).unwrap();
  assert_eq!(report.info, RowInfo::new(4, PngColorType::Y, 8));
  assert_eq!(row, [0x00, 0x55, 0x55, 0xFF]);
}

#[test]
fn test_rgb_key_composited_in_place() {
  let header = ImageHeader::new(2, PngColorType::RGB, 8)
    .with_transparency(Transparency::RGB { r: 1, g: 2, b: 3 });
  let mut config = TransformConfig::default();
  config.set_background(Color16::rgb(7, 7, 7), BackgroundGamma::Screen, false);
  let mut p = ScanlinePipeline::new(&header, config).unwrap();
  let mut row = vec![1, 2, 3, 1, 2, 4];
  p.apply(&mut row).unwrap();
  assert_eq!(row, [7, 7, 7, 1, 2, 4]);
}

#[test]
fn test_non_gray_policies() {
  let header = ImageHeader::new(1, PngColorType::RGB, 8);
  let mut config = TransformConfig::default();
  config.set_rgb_to_gray(NonGrayPolicy::Error, -1.0, -1.0);
  let mut p = ScanlinePipeline::new(&header, config).unwrap();
  let mut row = vec![5, 5, 5];
  let report = p.apply(&mut row).unwrap();
  assert!(!report.non_gray);
  assert_eq!(row, [5]);
  let mut row = vec![1, 2, 3];
  assert_eq!(p.apply(&mut row), Err(PngRowError::NonGrayPixel { row: 1 }));
  assert!(p.saw_non_gray());

  let mut config = TransformConfig::default();
  config.set_rgb_to_gray(NonGrayPolicy::Warn, 0.5, 0.25);
  let mut p = ScanlinePipeline::new(&header, config).unwrap();
  let mut row = vec![200, 100, 0];
  let report = p.apply(&mut row).unwrap();
  assert!(report.non_gray);
  assert_eq!(report.info.color_type, PngColorType::Y);
  assert_eq!(row, [((16384 * 200 + 8192 * 100) >> 15) as u8]);
}

#[test]
fn test_user_transform_grows_row() {
  let mut config = TransformConfig::default();
  config.set_user_transform(UserTransform {
    bit_depth: 0,
    channels: 4,
    callback: Box::new(|info: &RowInfo, row: &mut [u8]| {
      assert_eq!(info.channels, 3);
      for i in (0..info.width as usize).rev() {
        row.copy_within(i * 3..i * 3 + 3, i * 4);
        row[i * 4 + 3] = 0x80;
      }
    }),
  });
  let mut p = ScanlinePipeline::new(&ImageHeader::new(2, PngColorType::RGB, 8), config).unwrap();
  let mut row = vec![1, 2, 3, 4, 5, 6];
  let report = p.apply(&mut row).unwrap();
  assert_eq!(row, [1, 2, 3, 0x80, 4, 5, 6, 0x80]);
  assert_eq!(report.info.channels, 4);
  assert_eq!(report.info.rowbytes, 8);
  assert_eq!(p.output_info(), report.info);
}

#[test]
fn test_shift_gray_and_palette() {
  let sig = SignificantBits { gray: 4, ..Default::default() };
  let header = ImageHeader::new(2, PngColorType::Y, 8).with_sig_bit(sig);
  let mut config = TransformConfig::default();
  config.set_shift();
  let mut p = ScanlinePipeline::new(&header, config).unwrap();
  let mut row = vec![0xF0, 0x80];
  p.apply(&mut row).unwrap();
  assert_eq!(row, [0x0F, 0x08]);

  let sig = SignificantBits { red: 4, green: 8, blue: 1, ..Default::default() };
  let header = ImageHeader::new(1, PngColorType::Index, 8)
    .with_palette(vec![RGB8::new(0xFF, 0xFF, 0xFF)])
    .with_sig_bit(sig);
  let mut config = TransformConfig::default();
  config.set_shift();
  let p = ScanlinePipeline::new(&header, config).unwrap();
  assert_eq!(p.palette(), &[RGB8::new(0x0F, 0xFF, 0x01)]);
}

#[test]
fn test_expanded_palette_is_shifted_once() {
  let sig = SignificantBits { red: 4, green: 4, blue: 4, ..Default::default() };
  let header = ImageHeader::new(1, PngColorType::Index, 8)
    .with_palette(vec![RGB8::new(0xF0, 0xF0, 0xF0)])
    .with_sig_bit(sig);
  let mut config = TransformConfig::default();
  config.set_expand().set_shift();
  let mut p = ScanlinePipeline::new(&header, config).unwrap();
  assert_eq!(p.palette(), &[RGB8::new(0x0F, 0x0F, 0x0F)]);
  let mut row = vec![0];
  let report = p.apply(&mut row).unwrap();
  assert_eq!(report.info, RowInfo::new(1, PngColorType::RGB, 8));
  assert_eq!(row, [0x0F, 0x0F, 0x0F]);
}

#[test]
fn test_palette_init_adjustments() {
  let header = ImageHeader::new(1, PngColorType::Index, 8)
    .with_palette(vec![RGB8::new(0, 0, 0), RGB8::new(128, 128, 128), RGB8::new(255, 255, 255)])
    .with_transparency(Transparency::Index { alphas: vec![0, 255] });
  let mut config = TransformConfig::default();
  config.set_invert_alpha();
  let p = ScanlinePipeline::new(&header, config).unwrap();
  assert_eq!(p.trans_alphas(), &[255, 0]);

  // gamma is on for palettes, and the palette itself gets corrected
  let header = ImageHeader::new(1, PngColorType::Index, 8)
    .with_palette(vec![RGB8::new(0, 0, 0), RGB8::new(128, 128, 128), RGB8::new(255, 255, 255)]);
  let mut config = TransformConfig::default();
  config.set_gamma(2.2, 1.0);
  let p = ScanlinePipeline::new(&header, config).unwrap();
  assert!(p.transforms().contains(Transforms::GAMMA));
  let t = p.gamma_tables().unwrap().table_8().unwrap();
  assert_eq!(p.palette()[0], RGB8::new(0, 0, 0));
  assert_eq!(p.palette()[1], RGB8::new(t[128], t[128], t[128]));
  assert_eq!(p.palette()[2], RGB8::new(255, 255, 255));

  // binary transparency with a near identity gamma turns gamma off
  let header = header.with_transparency(Transparency::Index { alphas: vec![0, 255] });
  let mut config = TransformConfig::default();
  config.set_gamma(2.2, 1.0 / 2.2);
  let p = ScanlinePipeline::new(&header, config).unwrap();
  assert!(!p.transforms().contains(Transforms::GAMMA));
}

#[test]
fn test_rgb_to_gray_forces_palette_expand() {
  let header = ImageHeader::new(2, PngColorType::Index, 8)
    .with_palette(vec![RGB8::new(9, 9, 9), RGB8::new(255, 0, 0)]);
  let mut config = TransformConfig::default();
  config.set_rgb_to_gray(NonGrayPolicy::Ignore, -1.0, -1.0);
  let mut p = ScanlinePipeline::new(&header, config).unwrap();
  assert!(p.transforms().contains(Transforms::EXPAND));
  let mut row = vec![0, 1];
  let report = p.apply(&mut row).unwrap();
  assert!(report.non_gray);
  assert_eq!(row, [9, ((6968_u32 * 255) >> 15) as u8]);
}

#[test]
fn test_pack_unpack_round_trip() {
  for depth in [1, 2, 4] {
    let width = 11;
    let mut info = RowInfo::new(width, PngColorType::Y, depth);
    let original = super::rand_bytes(info.rowbytes);
    let mut unpacked = Vec::new();
    assert!(unpack(&mut info, &original, &mut unpacked));
    assert_eq!(info.bit_depth, 8);
    pack(&mut info, &mut unpacked, depth);
    assert_eq!(info, RowInfo::new(width, PngColorType::Y, depth));
    // the padding bits of the last byte don't survive
    let full = (width as usize * depth as usize) / 8;
    assert_eq!(&unpacked[..full], &original[..full]);
    for i in 0..width as usize {
      assert_eq!(packed_sample(&unpacked, i, depth), packed_sample(&original, i, depth));
    }
  }
}

#[test]
fn test_finish_releases_tables() {
  let mut config = TransformConfig::default();
  config.set_gamma(2.2, 1.0);
  let mut p = ScanlinePipeline::new(&ImageHeader::new(1, PngColorType::Y, 8), config).unwrap();
  assert!(p.gamma_tables().is_some());
  p.finish();
  assert!(p.gamma_tables().is_none());
  assert_eq!(p.state(), PipelineState::Finalized);
  assert_eq!(p.apply(&mut vec![0]), Err(PngRowError::Finalized));
}

#[test]
fn test_rgba8_upload_helper() {
  let header = ImageHeader::new(2, PngColorType::RGB, 8);
  let mut config = TransformConfig::default();
  config.set_filler(0xFF, FillerPlacement::After);
  let mut p = ScanlinePipeline::new(&header, config).unwrap();
  let mut row = vec![1, 2, 3, 4, 5, 6];
  let report = p.apply(&mut row).unwrap();
  // a filler channel doesn't make the row RGBA
  assert!(rgba8_pixels(&report.info, &row).is_none());

  let info = RowInfo::new(2, PngColorType::RGBA, 8);
  let pixels = rgba8_pixels(&info, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
  assert_eq!(pixels.len(), 2);
  assert_eq!(pixels[1].a, 8);
}

#[cfg(feature = "dither")]
#[test]
fn test_histogram_reduction_300_to_256() {
  let palette: Vec<RGB8> = (0..300_u32).map(|i| RGB8::new(i as u8, (i >> 8) as u8 * 100, 7)).collect();
  let histogram: Vec<u16> = (0..300_u16).collect();
  let d = PaletteDitherBuilder {
    palette: &palette,
    maximum_colors: 256,
    histogram: Some(&histogram),
    full_dither: false,
    bits: DitherBits::default(),
  }
  .build()
  .unwrap();
  assert_eq!(d.palette().len(), 256);
  let index = d.dither_index().unwrap();
  assert_eq!(index.len(), 300);
  assert!(index.iter().all(|&i| (i as usize) < 256));
  // the 256 most used entries all survive, and the index finds them
  for orig in 44..300 {
    assert_eq!(d.palette()[index[orig] as usize], palette[orig]);
  }
}

#[cfg(feature = "dither")]
#[test]
fn test_dither_palette_image() {
  let palette: Vec<RGB8> = (0..16_u8).map(|i| RGB8::new(i * 17, 255 - i * 17, i * 5)).collect();
  let header = ImageHeader::new(16, PngColorType::Index, 8).with_palette(palette);
  let mut config = TransformConfig::default();
  config.set_dither(DitherConfig { maximum_colors: 4, ..Default::default() });
  let mut p = ScanlinePipeline::new(&header, config).unwrap();
  assert_eq!(p.palette().len(), 4);
  let mut row: Vec<u8> = (0..16).collect();
  let report = p.apply(&mut row).unwrap();
  assert_eq!(report.info, RowInfo::new(16, PngColorType::Index, 8));
  assert!(row.iter().all(|&i| i < 4));
}

#[cfg(feature = "dither")]
#[test]
fn test_dither_with_palette_expand_is_dropped() {
  let header = ImageHeader::new(1, PngColorType::Index, 8).with_palette(build_grayscale_palette(8));
  let mut config = TransformConfig::default();
  config.set_expand().set_dither(DitherConfig { maximum_colors: 4, ..Default::default() });
  let p = ScanlinePipeline::new(&header, config).unwrap();
  assert!(!p.transforms().contains(Transforms::DITHER));
  assert_eq!(p.palette().len(), 256);
}

#[cfg(feature = "dither")]
#[test]
fn test_full_dither_rgb_rows() {
  let target = vec![RGB8::new(0, 0, 0), RGB8::new(255, 255, 255), RGB8::new(255, 0, 0)];
  let mut config = TransformConfig::default();
  config.set_dither(DitherConfig { palette: Some(target.clone()), full_dither: true, ..Default::default() });
  let mut p = ScanlinePipeline::new(&ImageHeader::new(3, PngColorType::RGB, 8), config).unwrap();
  assert_eq!(p.palette(), &target[..]);
  let mut row = vec![250, 250, 250, 5, 5, 5, 220, 10, 10];
  let report = p.apply(&mut row).unwrap();
  assert_eq!(report.info, RowInfo::new(3, PngColorType::Index, 8));
  assert_eq!(row, [1, 0, 2]);
  assert_eq!(p.output_info(), report.info);
}
