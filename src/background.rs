//! Compositing against a background color.
//!
//! The background is kept in two forms. `background` is in screen gamma, it's
//! what fully transparent pixels become. `background_1` is in linear light, and
//! is what partially transparent pixels are blended with before being taken
//! back to screen gamma. Without gamma tables the two are the same color.

use crate::{
  gamma_correct, packed_sample, scale_to_8, set_packed_sample, Color16, GammaTables, PngColorType,
  RowInfo, RGB8,
};

/// Which gamma the background color was given in.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum BackgroundGamma {
  /// Already in screen gamma.
  #[default]
  Screen,
  /// Same gamma as the image file.
  File,
  /// Some other gamma.
  Unique(f64),
}
impl BackgroundGamma {
  /// The `(to_linear, to_screen)` exponents for a background of this kind.
  #[must_use]
  pub fn exponents(self, file_gamma: f64, screen_gamma: f64) -> (f64, f64) {
    match self {
      Self::Screen => (screen_gamma, 1.0),
      Self::File => (1.0 / file_gamma, 1.0 / (file_gamma * screen_gamma)),
      Self::Unique(g) => (1.0 / g, 1.0 / (g * screen_gamma)),
    }
  }
}

/// Blends two 8-bit samples. `alpha` is the weight of `fg`.
#[inline]
#[must_use]
pub const fn composite8(fg: u8, alpha: u8, bg: u8) -> u8 {
  let t = fg as u32 * alpha as u32 + bg as u32 * (255 - alpha as u32) + 128;
  ((t + (t >> 8)) >> 8) as u8
}

/// Blends two 16-bit samples. `alpha` is the weight of `fg`.
#[inline]
#[must_use]
pub const fn composite16(fg: u16, alpha: u16, bg: u16) -> u16 {
  let t = fg as u64 * alpha as u64 + bg as u64 * (65535 - alpha as u64) + 32768;
  ((t + (t >> 16)) >> 16) as u16
}

/// Both forms of a background color, as `(background, background_1)`.
///
/// `max` is the largest sample value at the depth the rows will have when the
/// compositing happens. Both exponents are always applied.
#[must_use]
pub fn background_forms(color: Color16, max: u16, g: f64, gs: f64) -> (Color16, Color16) {
  let with = |x: f64| Color16 {
    index: color.index,
    red: gamma_correct(color.red, max, x),
    green: gamma_correct(color.green, max, x),
    blue: gamma_correct(color.blue, max, x),
    gray: gamma_correct(color.gray, max, x),
  };
  (with(gs), with(g))
}

/// Composites a palette against a background, once, so rows never need it.
///
/// Entries past the end of `alphas` are opaque. With gamma tables the opaque
/// entries are also gamma corrected and the blending is done in linear light.
pub fn composite_palette(
  palette: &mut [RGB8], alphas: &[u8], back: RGB8, back_1: RGB8, gamma: Option<&GammaTables>,
) {
  let table = gamma.and_then(GammaTables::table_8);
  let linear = gamma.and_then(|t| Some((t.to_1_8()?, t.from_1_8()?)));
  for (i, entry) in palette.iter_mut().enumerate() {
    let a = alphas.get(i).copied().unwrap_or(0xFF);
    let blend = |v: u8, b: u8, b_1: u8| -> u8 {
      match (a, table, linear) {
        (0xFF, Some(t), _) => t[v as usize],
        (0xFF, None, _) => v,
        (_, _, Some((to_1, from_1))) => from_1[composite8(to_1[v as usize], a, b_1) as usize],
        (_, _, None) => composite8(v, a, b),
      }
    };
    *entry = if a == 0 {
      back
    } else {
      RGB8::new(
        blend(entry.r, back.r, back_1.r),
        blend(entry.g, back.g, back_1.g),
        blend(entry.b, back.b, back_1.b),
      )
    };
  }
}

/// Composites rows against a background color, then drops their alpha.
///
/// Rows with an alpha channel are blended by it. Rows without one are compared
/// to the transparency `key`, and matching pixels are replaced outright.
#[derive(Debug, Clone, Copy)]
pub struct BackgroundCompositor<'a> {
  /// The background in screen gamma.
  pub background: Color16,
  /// The background in linear light.
  pub background_1: Color16,
  /// The transparency key, for rows with no alpha channel.
  pub key: Option<Color16>,
  /// Gamma tables, if gamma correction is on.
  pub gamma: Option<&'a GammaTables>,
}

/// The color samples of a color, in channel order.
#[inline]
fn samples_of(c: Color16, color_channels: usize) -> [u16; 3] {
  if color_channels == 1 {
    [c.gray, 0, 0]
  } else {
    [c.red, c.green, c.blue]
  }
}

impl BackgroundCompositor<'_> {
  /// Composites one row.
  ///
  /// Alpha rows come out without alpha. Key rows keep their layout.
  pub fn composite_row(&self, info: &mut RowInfo, row: &mut [u8]) {
    match info.color_type {
      PngColorType::YA | PngColorType::RGBA => self.composite_alpha(info, row),
      PngColorType::Y | PngColorType::RGB => self.replace_key(info, row),
      PngColorType::Index => (),
    }
  }

  fn replace_key(&self, info: &RowInfo, row: &mut [u8]) {
    let Some(key) = self.key else { return };
    let width = info.width as usize;
    match (info.color_type, info.bit_depth) {
      (PngColorType::Y, depth @ (1 | 2 | 4)) => {
        let mask = (1_u8 << depth) - 1;
        let key = key.gray as u8 & mask;
        let back = self.background.gray as u8 & mask;
        let table = if depth == 1 { None } else { self.gamma.and_then(GammaTables::table_8) };
        for i in 0..width {
          let v = packed_sample(row, i, depth);
          if v == key {
            set_packed_sample(row, i, depth, back);
          } else if let Some(t) = table {
            set_packed_sample(row, i, depth, t[scale_to_8(depth, v) as usize] >> (8 - depth));
          }
        }
      }
      (_, 8) => {
        let n = info.channels as usize;
        let key = samples_of(key, n);
        let back = samples_of(self.background, n);
        let table = self.gamma.and_then(GammaTables::table_8);
        for px in row[..info.rowbytes].chunks_exact_mut(n) {
          if px.iter().zip(key).all(|(&v, k)| u16::from(v) == k) {
            for (v, b) in px.iter_mut().zip(back) {
              *v = b as u8;
            }
          } else if let Some(t) = table {
            for v in px.iter_mut() {
              *v = t[*v as usize];
            }
          }
        }
      }
      (_, 16) => {
        let n = info.channels as usize;
        let key = samples_of(key, n);
        let back = samples_of(self.background, n);
        let table = self.gamma.and_then(GammaTables::table_16);
        for px in row[..info.rowbytes].chunks_exact_mut(n * 2) {
          let is_key =
            px.chunks_exact(2).zip(key).all(|(s, k)| u16::from_be_bytes([s[0], s[1]]) == k);
          for (s, b) in px.chunks_exact_mut(2).zip(back) {
            let v = if is_key {
              b
            } else if let Some(t) = table {
              t.lookup(u16::from_be_bytes([s[0], s[1]]))
            } else {
              continue;
            };
            s.copy_from_slice(&v.to_be_bytes());
          }
        }
      }
      _ => (),
    }
  }

  fn composite_alpha(&self, info: &mut RowInfo, row: &mut [u8]) {
    let color = info.channels as usize - 1;
    let back = samples_of(self.background, color);
    let back_1 = samples_of(self.background_1, color);
    let width = info.width as usize;
    match info.bit_depth {
      8 => {
        let table = self.gamma.and_then(GammaTables::table_8);
        let linear = self.gamma.and_then(|t| Some((t.to_1_8()?, t.from_1_8()?)));
        for i in 0..width {
          let s = i * (color + 1);
          let d = i * color;
          let a = row[s + color];
          for c in 0..color {
            let v = row[s + c];
            row[d + c] = match a {
              0xFF => table.map_or(v, |t| t[v as usize]),
              0 => back[c] as u8,
              _ => match linear {
                Some((to_1, from_1)) => {
                  from_1[composite8(to_1[v as usize], a, back_1[c] as u8) as usize]
                }
                None => composite8(v, a, back[c] as u8),
              },
            };
          }
        }
      }
      16 => {
        let table = self.gamma.and_then(GammaTables::table_16);
        let linear = self.gamma.and_then(|t| Some((t.to_1_16()?, t.from_1_16()?)));
        let read = |row: &[u8], at: usize| u16::from_be_bytes([row[at], row[at + 1]]);
        for i in 0..width {
          let s = i * (color + 1) * 2;
          let d = i * color * 2;
          let a = read(row, s + color * 2);
          for c in 0..color {
            let v = read(row, s + c * 2);
            let out = match a {
              0xFFFF => table.map_or(v, |t| t.lookup(v)),
              0 => back[c],
              _ => match linear {
                Some((to_1, from_1)) => from_1.lookup(composite16(to_1.lookup(v), a, back_1[c])),
                None => composite16(v, a, back[c]),
              },
            };
            row[d + c * 2..d + c * 2 + 2].copy_from_slice(&out.to_be_bytes());
          }
        }
      }
      _ => return,
    }
    info.set_layout(info.color_type.without_alpha(), color as u8, info.bit_depth);
  }
}
