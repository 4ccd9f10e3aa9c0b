//! Gamma lookup tables and the per-row gamma correction stage.
//!
//! A "gamma" here is the libpng style encoding exponent: a file gamma of
//! `0.45455` means samples were stored as `linear ^ 0.45455`. The correction
//! exponent between file and screen is `1 / (file_gamma * screen_gamma)`.
//!
//! 8-bit images get plain 256 entry tables. 16-bit images get a table with
//! `2^(8 - shift)` segments of 256 entries each, looked up by
//! `[low_byte >> shift][high_byte]`, so images with fewer significant bits (or
//! ones that will be reduced to 8 bits anyway) don't pay for all 65536 entries.

use crate::{packed_sample, scale_to_8, set_packed_sample, PngColorType, PngRowError, RowInfo, SignificantBits};

/// Combined gammas closer than this to 1.0 are treated as "no correction".
pub const GAMMA_THRESHOLD: f64 = 0.05;

/// Screen gammas at or below this are treated as unknown.
const SCREEN_GAMMA_EPSILON: f64 = 0.000001;

/// The most significant bits a 16-bit table keeps when its output is going to
/// be reduced to 8 bits.
const MAX_GAMMA_8: i32 = 11;

/// If `file_gamma * screen_gamma` is far enough from 1.0 to need correcting.
#[inline]
#[must_use]
pub fn gamma_significant(file_gamma: f64, screen_gamma: f64) -> bool {
  (file_gamma * screen_gamma - 1.0).abs() >= GAMMA_THRESHOLD
}

/// Applies `g` to a sample of maximum value `max`, rounding to nearest.
#[inline]
#[must_use]
pub fn gamma_correct(value: u16, max: u16, g: f64) -> u16 {
  let m = f64::from(max);
  ((f64::from(value) / m).powf(g) * m + 0.5) as u16
}

fn build_8(g: f64) -> [u8; 256] {
  let mut table = [0_u8; 256];
  for (i, t) in table.iter_mut().enumerate() {
    *t = ((i as f64 / 255.0).powf(g) * 255.0 + 0.5) as u8;
  }
  table
}

/// A segmented 16-bit gamma table.
#[derive(Clone, PartialEq, Eq)]
pub struct GammaTable16 {
  shift: u8,
  entries: Vec<u16>,
}
impl core::fmt::Debug for GammaTable16 {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("GammaTable16")
      .field("shift", &self.shift)
      .field("segments", &self.segments())
      .finish()
  }
}
impl GammaTable16 {
  /// Bits dropped from the low byte before indexing.
  #[inline]
  #[must_use]
  pub const fn shift(&self) -> u8 {
    self.shift
  }

  /// Number of 256 entry segments.
  #[inline]
  #[must_use]
  pub const fn segments(&self) -> usize {
    1 << (8 - self.shift)
  }

  /// Looks up a 16-bit sample.
  #[inline]
  #[must_use]
  pub fn lookup(&self, value: u16) -> u16 {
    let seg = ((value & 0xFF) >> self.shift) as usize;
    let hi = (value >> 8) as usize;
    self.entries[seg * 256 + hi]
  }

  fn alloc(shift: u8) -> Result<Self, PngRowError> {
    let len = 256_usize << (8 - shift);
    let mut entries = Vec::new();
    entries.try_reserve_exact(len)?;
    entries.resize(len, 0);
    Ok(Self { shift, entries })
  }

  /// Evaluates every entry directly.
  fn direct(shift: u8, g: f64) -> Result<Self, PngRowError> {
    // scales a segment number back up to the low bits it stands for
    const SEGMENT_SCALE: [u32; 8] = [0x10, 0x21, 0x42, 0x84, 0x110, 0x248, 0x550, 0xFF0];
    let mut t = Self::alloc(shift)?;
    let scale = SEGMENT_SCALE.get(shift as usize).copied().unwrap_or(0);
    for seg in 0..t.segments() {
      let ig = (seg as u32 * scale) >> 4;
      for hi in 0..256_u32 {
        let x = f64::from(ig + (hi << 8)) / 65535.0;
        t.entries[seg * 256 + hi as usize] = (x.powf(g) * 65535.0 + 0.5) as u16;
      }
    }
    Ok(t)
  }

  /// Walks the output bytes and fills every input that maps to each one.
  ///
  /// Every entry ends up as a doubled byte (`v | v << 8`), which keeps the
  /// later 16-to-8 reduction exact and the table monotonic with no gaps.
  fn inverse_sweep(shift: u8, g: f64) -> Result<Self, PngRowError> {
    let mut t = Self::alloc(shift)?;
    let num = t.segments() as u32;
    let total = num << 8;
    let low_mask = 0xFF_u32 >> shift;
    let ig = 1.0 / g;
    let mut last = 0_u32;
    let place = |t: &mut Self, last: u32, v: u16| {
      let seg = (last & low_mask) as usize;
      let hi = (last >> (8 - shift)) as usize;
      t.entries[seg * 256 + hi] = v;
    };
    for i in 0..256_u32 {
      let fout = (f64::from(i) + 0.5) / 256.0;
      let max = (fout.powf(ig) * f64::from(total)) as u32;
      while last <= max && last < total {
        place(&mut t, last, (i | (i << 8)) as u16);
        last += 1;
      }
    }
    while last < total {
      place(&mut t, last, 0xFFFF);
      last += 1;
    }
    Ok(t)
  }
}

/// Everything needed to build the gamma tables for one image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GammaTableBuilder {
  /// Encoding gamma of the image. `0.0` means unknown, and no tables are built.
  pub file_gamma: f64,
  /// Gamma of the display.
  pub screen_gamma: f64,
  /// Bit depth of the image as stored.
  pub bit_depth: u8,
  /// Color type of the image as stored.
  pub color_type: PngColorType,
  /// Significant bits of the image, if known.
  pub sig_bit: Option<SignificantBits>,
  /// 16-bit samples will be reduced to 8 bits later.
  pub reducing_16: bool,
  /// Background compositing is active and needs the linear tables.
  pub background: bool,
  /// RGB to gray reduction is active and needs the linear tables.
  pub rgb_to_gray: bool,
}
impl GammaTableBuilder {
  /// The 16-bit table shift: more dropped low bits for fewer significant bits.
  #[must_use]
  pub fn shift_16(&self) -> u8 {
    let sig = self.sig_bit.map_or(0, |s| s.max_color_bits(self.color_type)) as i32;
    let mut shift = if sig > 0 { 16 - sig } else { 0 };
    if self.reducing_16 && shift < 16 - MAX_GAMMA_8 {
      shift = 16 - MAX_GAMMA_8;
    }
    shift.clamp(0, 8) as u8
  }

  /// The file to screen correction exponent.
  #[inline]
  #[must_use]
  pub fn correction(&self) -> f64 {
    if self.screen_gamma > SCREEN_GAMMA_EPSILON {
      1.0 / (self.file_gamma * self.screen_gamma)
    } else {
      1.0
    }
  }

  /// The file to linear exponent.
  #[inline]
  #[must_use]
  pub fn to_linear(&self) -> f64 {
    1.0 / self.file_gamma
  }

  /// The linear to screen exponent.
  ///
  /// With no screen gamma this goes back to the file encoding, which is what
  /// RGB to gray reduction wants.
  #[inline]
  #[must_use]
  pub fn from_linear(&self) -> f64 {
    if self.screen_gamma > SCREEN_GAMMA_EPSILON {
      1.0 / self.screen_gamma
    } else {
      self.file_gamma
    }
  }

  /// Builds the tables.
  ///
  /// Gives `Ok(None)` when the file gamma is 0, which means gamma is off.
  ///
  /// ## Failure
  /// * The 16-bit tables couldn't be allocated.
  pub fn build(&self) -> Result<Option<GammaTables>, PngRowError> {
    if self.file_gamma == 0.0 {
      return Ok(None);
    }
    let linear = self.background || self.rgb_to_gray;
    let mut out = GammaTables::default();
    if self.bit_depth <= 8 {
      out.table_8 = Some(build_8(self.correction()));
      if linear {
        out.to_1_8 = Some(build_8(self.to_linear()));
        out.from_1_8 = Some(build_8(self.from_linear()));
      }
    } else {
      let shift = self.shift_16();
      log::debug!("png: 16-bit gamma tables with shift {shift}");
      out.table_16 = Some(if self.reducing_16 || self.background {
        GammaTable16::inverse_sweep(shift, self.correction())?
      } else {
        GammaTable16::direct(shift, self.correction())?
      });
      if linear {
        out.to_1_16 = Some(GammaTable16::direct(shift, self.to_linear())?);
        out.from_1_16 = Some(GammaTable16::direct(shift, self.from_linear())?);
      }
    }
    Ok(Some(out))
  }
}

/// The gamma tables for one image.
///
/// Which tables exist depends on the image depth and on whether linear light
/// compositing was requested.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GammaTables {
  table_8: Option<[u8; 256]>,
  to_1_8: Option<[u8; 256]>,
  from_1_8: Option<[u8; 256]>,
  table_16: Option<GammaTable16>,
  to_1_16: Option<GammaTable16>,
  from_1_16: Option<GammaTable16>,
}
impl GammaTables {
  /// File to screen, 8-bit.
  #[inline]
  #[must_use]
  pub fn table_8(&self) -> Option<&[u8; 256]> {
    self.table_8.as_ref()
  }

  /// File to linear, 8-bit.
  #[inline]
  #[must_use]
  pub fn to_1_8(&self) -> Option<&[u8; 256]> {
    self.to_1_8.as_ref()
  }

  /// Linear to screen, 8-bit.
  #[inline]
  #[must_use]
  pub fn from_1_8(&self) -> Option<&[u8; 256]> {
    self.from_1_8.as_ref()
  }

  /// File to screen, 16-bit.
  #[inline]
  #[must_use]
  pub fn table_16(&self) -> Option<&GammaTable16> {
    self.table_16.as_ref()
  }

  /// File to linear, 16-bit.
  #[inline]
  #[must_use]
  pub fn to_1_16(&self) -> Option<&GammaTable16> {
    self.to_1_16.as_ref()
  }

  /// Linear to screen, 16-bit.
  #[inline]
  #[must_use]
  pub fn from_1_16(&self) -> Option<&GammaTable16> {
    self.from_1_16.as_ref()
  }

  /// Gamma corrects every color sample of a row. Alpha is left alone.
  pub fn correct_row(&self, info: &RowInfo, row: &mut [u8]) {
    let color_samples = match info.color_type {
      PngColorType::Y | PngColorType::YA => 1,
      PngColorType::RGB | PngColorType::RGBA => 3,
      PngColorType::Index => return,
    };
    let stride = info.channels as usize;
    let width = info.width as usize;
    match info.bit_depth {
      16 => {
        let Some(t) = &self.table_16 else { return };
        for px in row[..info.rowbytes].chunks_exact_mut(stride * 2).take(width) {
          for s in px[..color_samples * 2].chunks_exact_mut(2) {
            let v = t.lookup(u16::from_be_bytes([s[0], s[1]]));
            s.copy_from_slice(&v.to_be_bytes());
          }
        }
      }
      8 => {
        let Some(t) = &self.table_8 else { return };
        for px in row[..info.rowbytes].chunks_exact_mut(stride).take(width) {
          for s in &mut px[..color_samples] {
            *s = t[*s as usize];
          }
        }
      }
      depth @ (2 | 4) if info.color_type == PngColorType::Y => {
        let Some(t) = &self.table_8 else { return };
        for i in 0..width {
          let v = scale_to_8(depth, packed_sample(row, i, depth));
          set_packed_sample(row, i, depth, t[v as usize] >> (8 - depth));
        }
      }
      _ => (),
    }
  }
}
