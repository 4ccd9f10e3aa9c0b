//! The per-row transformation pipeline.
//!
//! A [`ScanlinePipeline`] is built once per image from the header and a
//! [`TransformConfig`]. Building it makes every per-image decision up front:
//! which stages really run, the gamma tables, the background color in both
//! gamma forms, and any palette adjustments. After that each call to
//! [`apply`](ScanlinePipeline::apply) runs the same fixed sequence of stages
//! over one de-filtered scanline.
//!
//! Stages that widen the row (expansion, unpacking, gray to RGB, filler) write
//! into a scratch buffer owned by the pipeline, and the two buffers are swapped
//! afterward. Everything else works in place.

use crate::{
  add_filler, background_forms, bgr, chop, composite_palette, expand, expand_palette, gamma_significant,
  gray_to_rgb, invert_alpha, invert_mono, packswap, rgb_to_gray, scale_to_8, strip_alpha, swap_alpha,
  swap_bytes, undo_intrapixel, unpack, unshift, BackgroundCompositor, ChopMode, Color16, FillerPlacement,
  GammaTableBuilder, GammaTables, GrayCoefficients, ImageHeader, NonGrayPolicy, PngColorType, PngRowError,
  RowInfo, SignificantBits, TransformConfig, Transforms, UserTransform, GAMMA_THRESHOLD, RGB8,
};

#[cfg(feature = "dither")]
use crate::{PaletteDither, PaletteDitherBuilder};

/// Where a pipeline is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineState {
  /// Tables are built, no rows yet.
  Initialized,
  /// At least one row has been applied.
  RowActive,
  /// [`finish`](ScanlinePipeline::finish) was called. No more rows.
  Finalized,
}

/// What happened to one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowReport {
  /// The shape of the row after every stage.
  pub info: RowInfo,
  /// RGB to gray reduction met a pixel that wasn't gray.
  pub non_gray: bool,
}

/// Runs a widening stage from `row` into `scratch`, and swaps them if the stage
/// did anything.
#[inline]
fn widen(row: &mut Vec<u8>, scratch: &mut Vec<u8>, stage: impl FnOnce(&[u8], &mut Vec<u8>) -> bool) {
  if stage(row.as_slice(), scratch) {
    core::mem::swap(row, scratch);
  }
}

/// Transforms the scanlines of one image.
#[derive(Debug)]
pub struct ScanlinePipeline {
  state: PipelineState,
  input: RowInfo,
  transforms: Transforms,
  chop_mode: ChopMode,
  gray_coefficients: GrayCoefficients,
  non_gray_policy: NonGrayPolicy,
  background: Color16,
  background_1: Color16,
  background_is_gray: bool,
  /// The row background stage runs: there's alpha or a key to composite.
  composite: bool,
  key: Option<Color16>,
  palette: Vec<RGB8>,
  trans_alphas: Vec<u8>,
  sig_bit: Option<SignificantBits>,
  gamma: Option<GammaTables>,
  #[cfg(feature = "dither")]
  dither: Option<PaletteDither>,
  filler: u16,
  filler_placement: FillerPlacement,
  user_transform: Option<UserTransform>,
  scratch: Vec<u8>,
  row_number: u32,
  saw_non_gray: bool,
}

impl ScanlinePipeline {
  /// Builds the pipeline for an image.
  ///
  /// Requests that make no sense for this image are dropped with a warning
  /// rather than failing.
  ///
  /// ## Failure
  /// * The header is invalid.
  /// * A gamma table or the dither cube couldn't be allocated.
  pub fn new(header: &ImageHeader, config: TransformConfig) -> Result<Self, PngRowError> {
    header.validate()?;
    let TransformConfig {
      mut transforms,
      chop_mode,
      gray_coefficients,
      non_gray_policy,
      screen_gamma,
      file_gamma,
      background: background_config,
      dither: dither_config,
      filler,
      filler_placement,
      user_transform,
    } = config;
    let color_type = header.color_type;
    let bit_depth = header.bit_depth;
    let is_palette = color_type == PngColorType::Index;
    let mut palette = header.palette.clone();
    let mut trans_alphas: Vec<u8> =
      header.transparency.as_ref().map(|t| t.alphas().to_vec()).unwrap_or_default();
    // gray keys may be matched against rows already copied out to RGB
    let key = header.transparency.as_ref().and_then(|t| t.key()).map(|mut k| {
      if !color_type.has_color() {
        (k.red, k.green, k.blue) = (k.gray, k.gray, k.gray);
      }
      k
    });

    if transforms.contains(Transforms::GAMMA)
      && !(gamma_significant(file_gamma, screen_gamma) || color_type.has_alpha() || is_palette)
    {
      log::debug!("png: gamma {file_gamma} and screen {screen_gamma} cancel out");
      transforms.remove(Transforms::GAMMA);
    }
    if is_palette && transforms.contains(Transforms::RGB_TO_GRAY) {
      transforms.insert(Transforms::EXPAND);
    }
    if transforms.contains(Transforms::SHIFT) && header.sig_bit.is_none() {
      log::warn!("png: shift requested but the image has no significant bits");
      transforms.remove(Transforms::SHIFT);
    }

    #[cfg(feature = "dither")]
    let dither = match dither_config {
      Some(cfg) if transforms.contains(Transforms::DITHER) => {
        if is_palette && !cfg.full_dither && transforms.contains(Transforms::EXPAND) {
          log::warn!("png: palette dithering can't be combined with palette expansion");
          transforms.remove(Transforms::DITHER);
          None
        } else {
          let source = cfg.palette.as_deref().unwrap_or(palette.as_slice());
          let histogram = cfg.histogram.as_deref().or(header.histogram.as_deref());
          let d = PaletteDitherBuilder {
            palette: source,
            maximum_colors: cfg.maximum_colors,
            histogram,
            full_dither: cfg.full_dither,
            bits: cfg.bits,
          }
          .build()?;
          palette = d.palette().to_vec();
          trans_alphas.truncate(palette.len());
          Some(d)
        }
      }
      _ => None,
    };
    #[cfg(not(feature = "dither"))]
    drop(dither_config);

    // the background color, before any gamma
    let mut background = Color16::default();
    let mut background_is_gray = false;
    if let Some(bg) = background_config.filter(|_| transforms.contains(Transforms::BACKGROUND)) {
      background = bg.color;
      if bg.need_expand {
        if is_palette {
          let idx = usize::from(background.index);
          let entry = palette.get(idx).copied().unwrap_or_else(|| {
            log::warn!("png: background index {idx} is past the end of the palette");
            RGB8::default()
          });
          background.red = u16::from(entry.r);
          background.green = u16::from(entry.g);
          background.blue = u16::from(entry.b);
        } else if !color_type.has_color() {
          if transforms.contains(Transforms::EXPAND) && bit_depth < 8 {
            background.gray = u16::from(scale_to_8(bit_depth, background.gray as u8));
          }
          background.red = background.gray;
          background.green = background.gray;
          background.blue = background.gray;
        }
      }
      background_is_gray = if bg.need_expand {
        !color_type.has_color()
      } else {
        background.red == background.green && background.red == background.blue
      };
    }

    if is_palette && transforms.contains(Transforms::GAMMA) {
      let partial_alpha = trans_alphas.iter().any(|&a| a != 0 && a != 0xFF);
      if !trans_alphas.is_empty() && !partial_alpha && !gamma_significant(file_gamma, screen_gamma) {
        transforms.remove(Transforms::GAMMA);
      }
    }

    let gamma = if transforms.intersects(Transforms::GAMMA | Transforms::RGB_TO_GRAY) {
      GammaTableBuilder {
        file_gamma,
        screen_gamma,
        bit_depth,
        color_type,
        sig_bit: header.sig_bit,
        reducing_16: transforms.contains(Transforms::STRIP_16),
        background: transforms.contains(Transforms::BACKGROUND),
        rgb_to_gray: transforms.contains(Transforms::RGB_TO_GRAY),
      }
      .build()?
    } else {
      None
    };

    let mut background_1 = background;
    if let Some(bg) = background_config.filter(|_| transforms.contains(Transforms::BACKGROUND)) {
      let expands_low = transforms.contains(Transforms::EXPAND) && bit_depth < 8;
      let composite_depth = if is_palette || expands_low { 8 } else { bit_depth };
      let max = if composite_depth == 16 { u16::MAX } else { (1_u16 << composite_depth) - 1 };
      if gamma.is_some() {
        let (g, gs) = bg.gamma.exponents(file_gamma, screen_gamma);
        let (back, back_1) = background_forms(background, max, g, gs);
        // palettes keep the color as given when the screen exponent is near 1
        if !(is_palette && (gs - 1.0).abs() < GAMMA_THRESHOLD) {
          background = back;
        }
        background_1 = back_1;
      }
      if is_palette {
        let as_rgb = |c: Color16| RGB8::new(c.red as u8, c.green as u8, c.blue as u8);
        let (back, back_1) = (as_rgb(background), as_rgb(background_1));
        composite_palette(&mut palette, &trans_alphas, back, back_1, gamma.as_ref());
        trans_alphas.clear();
      }
    } else if let (true, Some(t)) = (is_palette, gamma.as_ref().and_then(GammaTables::table_8)) {
      for entry in &mut palette {
        *entry = RGB8::new(t[entry.r as usize], t[entry.g as usize], t[entry.b as usize]);
      }
    }

    if is_palette && transforms.contains(Transforms::SHIFT) {
      if let Some(sig) = header.sig_bit {
        let amount = |s: u8| if (1..8).contains(&s) { 8 - s } else { 0 };
        let (sr, sg, sb) = (amount(sig.red), amount(sig.green), amount(sig.blue));
        for entry in &mut palette {
          *entry = RGB8::new(entry.r >> sr, entry.g >> sg, entry.b >> sb);
        }
      }
    }

    if is_palette
      && transforms.contains(Transforms::INVERT_ALPHA)
      && !transforms.contains(Transforms::EXPAND)
    {
      for a in &mut trans_alphas {
        *a = !*a;
      }
    }

    let composite = transforms.contains(Transforms::BACKGROUND)
      && !is_palette
      && (header.num_trans() > 0 || color_type.has_alpha());

    log::debug!("png: transforms {transforms:?} for {color_type:?} at {bit_depth} bits");
    Ok(Self {
      state: PipelineState::Initialized,
      input: RowInfo::new(header.width, color_type, bit_depth),
      transforms,
      chop_mode,
      gray_coefficients,
      non_gray_policy,
      background,
      background_1,
      background_is_gray,
      composite,
      key,
      palette,
      trans_alphas,
      sig_bit: header.sig_bit,
      gamma,
      #[cfg(feature = "dither")]
      dither,
      filler,
      filler_placement,
      user_transform,
      scratch: Vec::new(),
      row_number: 0,
      saw_non_gray: false,
    })
  }

  /// Where the pipeline is in its life.
  #[inline]
  #[must_use]
  pub const fn state(&self) -> PipelineState {
    self.state
  }

  /// The transformations that actually run, after init dropped or added any.
  #[inline]
  #[must_use]
  pub const fn transforms(&self) -> Transforms {
    self.transforms
  }

  /// The shape rows must have going in.
  #[inline]
  #[must_use]
  pub const fn input_info(&self) -> RowInfo {
    self.input
  }

  /// The palette after init: reduced, gamma corrected, or composited.
  #[inline]
  #[must_use]
  pub fn palette(&self) -> &[RGB8] {
    &self.palette
  }

  /// The per-index alpha values after init. Empty once the palette was
  /// composited against a background.
  #[inline]
  #[must_use]
  pub fn trans_alphas(&self) -> &[u8] {
    &self.trans_alphas
  }

  /// The gamma tables, if gamma is on.
  #[inline]
  #[must_use]
  pub fn gamma_tables(&self) -> Option<&GammaTables> {
    self.gamma.as_ref()
  }

  /// The background color as `(background, background_1)`.
  #[inline]
  #[must_use]
  pub const fn background(&self) -> (Color16, Color16) {
    (self.background, self.background_1)
  }

  /// If any row so far had a non-gray pixel reduced to gray.
  #[inline]
  #[must_use]
  pub const fn saw_non_gray(&self) -> bool {
    self.saw_non_gray
  }

  /// The shape rows will have coming out.
  ///
  /// The stages are run over a one pixel scratch row to find out. The user
  /// callback isn't called, only its declared depth and channels are used.
  #[must_use]
  pub fn output_info(&self) -> RowInfo {
    let mut info = self.input;
    info.width = 1;
    info.recompute();
    let mut row = vec![0_u8; info.rowbytes];
    let mut scratch = Vec::new();
    if self.run_stages(&mut info, &mut row, &mut scratch).is_err() {
      log::debug!("png: output shape stages failed on a scratch row");
    }
    if let Some(user) = &self.user_transform {
      if user.bit_depth != 0 {
        info.bit_depth = user.bit_depth;
      }
      if user.channels != 0 {
        info.channels = user.channels;
      }
    }
    info.width = self.input.width;
    info.recompute();
    info
  }

  /// Transforms one row.
  ///
  /// The first [`input_info`](Self::input_info)`.rowbytes` bytes of `row` must
  /// hold the de-filtered scanline. On success `row` holds exactly the output
  /// row, which may be longer or shorter than what went in.
  ///
  /// ## Failure
  /// * `row` is empty, or shorter than the input rowbytes.
  /// * The pipeline was already finished.
  /// * Dithering left a row of zero bytes.
  /// * RGB to gray met a color pixel under [`NonGrayPolicy::Error`].
  /// * The row couldn't grow for the user transform.
  pub fn apply(&mut self, row: &mut Vec<u8>) -> Result<RowReport, PngRowError> {
    if self.state == PipelineState::Finalized {
      return Err(PngRowError::Finalized);
    }
    if row.is_empty() {
      return Err(PngRowError::MissingRow);
    }
    let needed = self.input.rowbytes;
    if row.len() < needed {
      return Err(PngRowError::RowTooShort { needed, got: row.len() });
    }
    self.state = PipelineState::RowActive;
    let row_number = self.row_number;
    self.row_number = self.row_number.wrapping_add(1);
    row.truncate(needed);

    let mut info = self.input;
    let mut scratch = core::mem::take(&mut self.scratch);
    let stages = self.run_stages(&mut info, row, &mut scratch);
    self.scratch = scratch;
    let non_gray = stages?;

    if non_gray {
      self.saw_non_gray = true;
      match self.non_gray_policy {
        NonGrayPolicy::Ignore => (),
        NonGrayPolicy::Warn => {
          log::warn!("png: rgb_to_gray found a non-gray pixel in row {row_number}");
        }
        NonGrayPolicy::Error => return Err(PngRowError::NonGrayPixel { row: row_number }),
      }
    }

    if let Some(user) = self.user_transform.as_mut() {
      let mut after = info;
      if user.bit_depth != 0 {
        after.bit_depth = user.bit_depth;
      }
      if user.channels != 0 {
        after.channels = user.channels;
      }
      after.recompute();
      if row.len() < after.rowbytes {
        row.try_reserve(after.rowbytes - row.len())?;
        row.resize(after.rowbytes, 0);
      }
      (user.callback)(&info, row);
      info = after;
    }

    row.truncate(info.rowbytes);
    log::trace!("png: row {row_number} done as {info:?}");
    Ok(RowReport { info, non_gray })
  }

  /// Ends the image, releasing the tables.
  pub fn finish(&mut self) {
    if self.state != PipelineState::Finalized {
      log::debug!("png: pipeline finished after {} rows", self.row_number);
    }
    self.state = PipelineState::Finalized;
    self.gamma = None;
    #[cfg(feature = "dither")]
    {
      self.dither = None;
    }
    self.user_transform = None;
    self.scratch = Vec::new();
  }

  /// Every stage but the user transform, in order. Returns if RGB to gray
  /// reduction found a non-gray pixel.
  fn run_stages(
    &self, info: &mut RowInfo, row: &mut Vec<u8>, scratch: &mut Vec<u8>,
  ) -> Result<bool, PngRowError> {
    let t = self.transforms;
    let is_palette = self.input.color_type == PngColorType::Index;

    if t.contains(Transforms::INTRAPIXEL) {
      undo_intrapixel(info, row);
    }
    if t.contains(Transforms::EXPAND) {
      if info.color_type == PngColorType::Index {
        widen(row, scratch, |src, dst| expand_palette(info, src, dst, &self.palette, &self.trans_alphas));
      } else {
        widen(row, scratch, |src, dst| expand(info, src, dst, self.key));
      }
    }
    if t.contains(Transforms::STRIP_ALPHA) {
      strip_alpha(info, row);
    }
    let mut non_gray = false;
    if t.contains(Transforms::RGB_TO_GRAY) {
      non_gray = rgb_to_gray(info, row, self.gray_coefficients, self.gamma.as_ref());
    }
    if t.contains(Transforms::GRAY_TO_RGB) && !self.background_is_gray {
      widen(row, scratch, |src, dst| gray_to_rgb(info, src, dst));
    }
    if self.composite {
      let compositor = BackgroundCompositor {
        background: self.background,
        background_1: self.background_1,
        key: self.key,
        gamma: self.gamma.as_ref(),
      };
      compositor.composite_row(info, row);
    }
    if t.contains(Transforms::GAMMA) && !self.composite && !is_palette {
      if let Some(tables) = &self.gamma {
        tables.correct_row(info, row);
      }
    }
    if t.contains(Transforms::STRIP_16) {
      chop(info, row, self.chop_mode);
    }
    if t.contains(Transforms::DITHER) {
      #[cfg(feature = "dither")]
      {
        if let Some(d) = &self.dither {
          d.dither_row(info, row);
        }
      }
      if info.rowbytes == 0 {
        return Err(PngRowError::ZeroRowBytes);
      }
    }
    if t.contains(Transforms::INVERT_MONO) {
      invert_mono(info, row);
    }
    // palette images had their palette shifted at init
    if t.contains(Transforms::SHIFT) && !is_palette {
      if let Some(sig) = &self.sig_bit {
        unshift(info, row, sig);
      }
    }
    if t.contains(Transforms::PACK) {
      widen(row, scratch, |src, dst| unpack(info, src, dst));
    }
    if t.contains(Transforms::BGR) {
      bgr(info, row);
    }
    if t.contains(Transforms::PACKSWAP) {
      packswap(info, row);
    }
    if t.contains(Transforms::GRAY_TO_RGB) && self.background_is_gray {
      widen(row, scratch, |src, dst| gray_to_rgb(info, src, dst));
    }
    if t.contains(Transforms::FILLER) {
      let (filler, placement) = (self.filler, self.filler_placement);
      widen(row, scratch, |src, dst| add_filler(info, src, dst, filler, placement));
    }
    if t.contains(Transforms::INVERT_ALPHA) {
      invert_alpha(info, row);
    }
    if t.contains(Transforms::SWAP_ALPHA) {
      swap_alpha(info, row);
    }
    if t.contains(Transforms::SWAP_BYTES) {
      swap_bytes(info, row);
    }
    Ok(non_gray)
  }
}
