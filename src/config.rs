//! Requesting transformations before decoding starts.
//!
//! A [`TransformConfig`] is filled in once per image, then handed to
//! [`ScanlinePipeline::new`](crate::ScanlinePipeline::new). Each setter turns on
//! one transformation (and records its parameters), and setters can be chained.
//!
//! ```
//! # use pngrow::*;
//! let mut config = TransformConfig::default();
//! config.set_expand().set_strip_16().set_filler(0xFF, FillerPlacement::After);
//! assert!(config.transforms().contains(Transforms::EXPAND | Transforms::FILLER));
//! ```

use core::fmt;

use crate::{
  BackgroundGamma, ChopMode, Color16, FillerPlacement, GrayCoefficients, RowInfo, Transforms, RGB8,
};

/// What to do when RGB to gray reduction meets a pixel that isn't gray.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum NonGrayPolicy {
  /// Carry on silently. The row report still says it happened.
  #[default]
  Ignore,
  /// Log a warning, once per row, and carry on.
  Warn,
  /// Fail the row with [`PngRowError::NonGrayPixel`](crate::PngRowError::NonGrayPixel).
  Error,
}

/// Bits per channel of the dither quantization cube.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub struct DitherBits {
  pub red: u8,
  pub green: u8,
  pub blue: u8,
}
impl Default for DitherBits {
  #[inline]
  fn default() -> Self {
    Self { red: 5, green: 5, blue: 5 }
  }
}
impl DitherBits {
  /// Clamps each channel to `1..=6`, which keeps cube distances within a byte.
  #[must_use]
  pub fn clamped(self) -> Self {
    let out =
      Self { red: clamp_bits(self.red), green: clamp_bits(self.green), blue: clamp_bits(self.blue) };
    if out != self {
      log::warn!("png: dither bits {self:?} clamped to {out:?}");
    }
    out
  }

  /// Cube index of a color. Out of range bits are treated as clamped.
  #[inline]
  #[must_use]
  pub const fn cell(self, r: u8, g: u8, b: u8) -> usize {
    let (rb, gb, bb) = (clamp_bits(self.red), clamp_bits(self.green), clamp_bits(self.blue));
    let r = (r >> (8 - rb)) as usize;
    let g = (g >> (8 - gb)) as usize;
    let b = (b >> (8 - bb)) as usize;
    (r << (gb + bb)) | (g << bb) | b
  }

  /// Cells in the whole cube.
  #[inline]
  #[must_use]
  pub const fn cells(self) -> usize {
    1 << (clamp_bits(self.red) + clamp_bits(self.green) + clamp_bits(self.blue))
  }
}

#[inline]
const fn clamp_bits(b: u8) -> u8 {
  if b < 1 {
    1
  } else if b > 6 {
    6
  } else {
    b
  }
}

/// Parameters for the dither stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DitherConfig {
  /// The palette to dither toward. `None` uses the image's own palette.
  pub palette: Option<Vec<RGB8>>,
  /// Most palette entries the output may use.
  pub maximum_colors: usize,
  /// Use counts per palette entry. `None` uses the image's `hIST`, if any.
  pub histogram: Option<Vec<u16>>,
  /// Quantize true-color rows through a lookup cube, rather than only remapping
  /// an indexed image's palette.
  pub full_dither: bool,
  /// Cube resolution, for `full_dither`.
  pub bits: DitherBits,
}
impl Default for DitherConfig {
  #[inline]
  fn default() -> Self {
    Self { palette: None, maximum_colors: 256, histogram: None, full_dither: false, bits: DitherBits::default() }
  }
}

/// The background color request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackgroundConfig {
  /// The color. Which fields matter depends on `need_expand`.
  pub color: Color16,
  /// Which gamma `color` is in.
  pub gamma: BackgroundGamma,
  /// The color is in the image's own format: `index` for indexed images, a
  /// `gray` at the image's depth for gray images. Otherwise it's given as 8 or
  /// 16 bit `red`, `green`, `blue` (and `gray`) at the row depth.
  pub need_expand: bool,
}

/// Callback run on every row at the end of the pipeline.
pub type UserTransformFn = Box<dyn FnMut(&RowInfo, &mut [u8])>;

/// A caller supplied last stage.
///
/// The callback sees the row as it stands after every other stage. If it
/// changes the depth or channel count, say so in `bit_depth` and `channels`
/// (0 means "unchanged") so the row can be sized for it beforehand and the row
/// info updated afterward.
pub struct UserTransform {
  /// Bit depth of the row after the callback, or 0.
  pub bit_depth: u8,
  /// Channels of the row after the callback, or 0.
  pub channels: u8,
  /// The callback.
  pub callback: UserTransformFn,
}
impl fmt::Debug for UserTransform {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("UserTransform")
      .field("bit_depth", &self.bit_depth)
      .field("channels", &self.channels)
      .finish_non_exhaustive()
  }
}

/// The transformations to apply to an image, and their parameters.
#[derive(Debug, Default)]
pub struct TransformConfig {
  pub(crate) transforms: Transforms,
  pub(crate) chop_mode: ChopMode,
  pub(crate) gray_coefficients: GrayCoefficients,
  pub(crate) non_gray_policy: NonGrayPolicy,
  pub(crate) screen_gamma: f64,
  pub(crate) file_gamma: f64,
  pub(crate) background: Option<BackgroundConfig>,
  pub(crate) dither: Option<DitherConfig>,
  pub(crate) filler: u16,
  pub(crate) filler_placement: FillerPlacement,
  pub(crate) user_transform: Option<UserTransform>,
}
impl TransformConfig {
  /// The transformations requested so far.
  ///
  /// The pipeline may still turn some of these off (or on) once it sees the
  /// image header.
  #[inline]
  #[must_use]
  pub const fn transforms(&self) -> Transforms {
    self.transforms
  }

  /// Expands indexed images to RGB, gray images below 8 bits up to 8 bits, and
  /// transparency keys to full alpha channels.
  #[inline]
  pub fn set_expand(&mut self) -> &mut Self {
    self.transforms.insert(Transforms::EXPAND);
    self
  }

  /// Reduces 16-bit samples to 8 bits.
  #[inline]
  pub fn set_strip_16(&mut self) -> &mut Self {
    self.transforms.insert(Transforms::STRIP_16);
    self
  }

  /// How [`set_strip_16`](Self::set_strip_16) reduces samples.
  #[inline]
  pub fn set_chop_mode(&mut self, mode: ChopMode) -> &mut Self {
    self.chop_mode = mode;
    self
  }

  /// Drops the alpha channel without compositing.
  #[inline]
  pub fn set_strip_alpha(&mut self) -> &mut Self {
    self.transforms.insert(Transforms::STRIP_ALPHA);
    self
  }

  /// Turns 8 and 16 bit gray into RGB.
  #[inline]
  pub fn set_gray_to_rgb(&mut self) -> &mut Self {
    self.transforms.insert(Transforms::GRAY_TO_RGB);
    self
  }

  /// Reduces RGB to gray with the given red and green weights (blue gets the
  /// rest). Negative weights select the defaults.
  pub fn set_rgb_to_gray(&mut self, policy: NonGrayPolicy, red: f64, green: f64) -> &mut Self {
    self.transforms.insert(Transforms::RGB_TO_GRAY);
    self.non_gray_policy = policy;
    self.gray_coefficients = GrayCoefficients::from_weights(red, green);
    self
  }

  /// Sets the display gamma, and the gamma the file was encoded with.
  ///
  /// Whether gamma correction actually happens is decided against the image
  /// header: images with alpha or a palette always get it, others only when
  /// the two gammas don't nearly cancel out.
  pub fn set_gamma(&mut self, screen_gamma: f64, file_gamma: f64) -> &mut Self {
    if !(file_gamma >= 0.0 && screen_gamma >= 0.0) {
      log::warn!("png: ignoring invalid gamma ({screen_gamma}, {file_gamma})");
      return self;
    }
    self.screen_gamma = screen_gamma;
    self.file_gamma = file_gamma;
    self.transforms.insert(Transforms::GAMMA);
    self
  }

  /// Composites transparent pixels against a background color.
  pub fn set_background(&mut self, color: Color16, gamma: BackgroundGamma, need_expand: bool) -> &mut Self {
    if let BackgroundGamma::Unique(g) = gamma {
      if !(g > 0.0) {
        log::warn!("png: ignoring background with invalid gamma {g}");
        return self;
      }
    }
    self.transforms.insert(Transforms::BACKGROUND);
    if need_expand {
      self.transforms.insert(Transforms::BACKGROUND_EXPAND);
    }
    self.background = Some(BackgroundConfig { color, gamma, need_expand });
    self
  }

  /// Reduces the palette, or quantizes true-color rows, to a limited palette.
  ///
  /// Without the `dither` feature this only logs a warning.
  pub fn set_dither(&mut self, dither: DitherConfig) -> &mut Self {
    if cfg!(feature = "dither") {
      self.transforms.insert(Transforms::DITHER);
      self.dither = Some(dither);
    } else {
      log::warn!("png: dithering was requested but the `dither` feature is off");
    }
    self
  }

  /// Unpacks 1, 2, and 4 bit samples into a byte each, without scaling them.
  #[inline]
  pub fn set_packing(&mut self) -> &mut Self {
    self.transforms.insert(Transforms::PACK);
    self
  }

  /// Shifts samples down to their significant bits, per the header's `sBIT`.
  #[inline]
  pub fn set_shift(&mut self) -> &mut Self {
    self.transforms.insert(Transforms::SHIFT);
    self
  }

  /// Swaps RGB to BGR.
  #[inline]
  pub fn set_bgr(&mut self) -> &mut Self {
    self.transforms.insert(Transforms::BGR);
    self
  }

  /// Reverses the order of sub-byte pixels within each byte.
  #[inline]
  pub fn set_packswap(&mut self) -> &mut Self {
    self.transforms.insert(Transforms::PACKSWAP);
    self
  }

  /// Swaps 16-bit samples to little-endian.
  #[inline]
  pub fn set_swap(&mut self) -> &mut Self {
    self.transforms.insert(Transforms::SWAP_BYTES);
    self
  }

  /// Moves alpha before the color channels.
  #[inline]
  pub fn set_swap_alpha(&mut self) -> &mut Self {
    self.transforms.insert(Transforms::SWAP_ALPHA);
    self
  }

  /// Inverts alpha, so 0 is opaque.
  #[inline]
  pub fn set_invert_alpha(&mut self) -> &mut Self {
    self.transforms.insert(Transforms::INVERT_ALPHA);
    self
  }

  /// Inverts gray samples, so 0 is white.
  #[inline]
  pub fn set_invert_mono(&mut self) -> &mut Self {
    self.transforms.insert(Transforms::INVERT_MONO);
    self
  }

  /// Adds a filler channel to gray and RGB rows.
  #[inline]
  pub fn set_filler(&mut self, filler: u16, placement: FillerPlacement) -> &mut Self {
    self.transforms.insert(Transforms::FILLER);
    self.filler = filler;
    self.filler_placement = placement;
    self
  }

  /// Undoes MNG intrapixel differencing.
  #[inline]
  pub fn set_intrapixel(&mut self) -> &mut Self {
    self.transforms.insert(Transforms::INTRAPIXEL);
    self
  }

  /// Runs a callback on every row after the other stages.
  pub fn set_user_transform(&mut self, user: UserTransform) -> &mut Self {
    let depth_ok = matches!(user.bit_depth, 0 | 1 | 2 | 4 | 8 | 16);
    if !depth_ok || user.channels > 4 {
      log::warn!("png: ignoring user transform with depth {} and {} channels", user.bit_depth, user.channels);
      return self;
    }
    self.transforms.insert(Transforms::USER_TRANSFORM);
    self.user_transform = Some(user);
    self
  }
}
