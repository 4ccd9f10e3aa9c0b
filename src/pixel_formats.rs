//! Module for pixel formats and color values.
//!
//! There's two main factors with a pixel format:
//! * **Channels:** generally one or more of red, green, blue, and alpha. Some
//!   formats only use gray, marked as "Y" in format names.
//! * **Bit Depth:** how many bits per channel. PNG uses identical bit depth
//!   for all channels of a pixel.
//!
//! When the bit depth and channel layout allows, multiple pixels are packed
//! within a single byte, with the leftmost pixel in the high bits.
//!
//! ## Format Conversion
//!
//! ### Between Gray and RGB
//! When going from grayscale to RGB one just simply copies the gray value to
//! each of the RGB channels.
//!
//! The reverse is a weighted sum, because the human eye doesn't respond
//! equally to all three colors. The default weights are
//! ```text
//! Y = 0.212671 * R + 0.715160 * G + 0.072169 * B
//! ```
//! and they only give the right answer on linear values, so the pipeline
//! converts through the gamma tables when it has them.
//!
//! ### Between Bit Depths
//! To *increase* bit depth the current bit pattern is used as the top bits
//! and then copied down until all new bits are filled. To *reduce* 16-bit
//! samples the high byte is kept, optionally rounded by the low byte.

use bytemuck::{Pod, Zeroable};
use ::pixel_formats::r8g8b8a8_Srgb;

use crate::{PngColorType, RowInfo};

/// An RGB palette entry, u8 per channel.
///
/// This is the layout of `PLTE` chunk data, so palette bytes can be cast
/// directly into a slice of these.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Zeroable, Pod)]
#[repr(C)]
#[allow(missing_docs)]
pub struct RGB8 {
  pub r: u8,
  pub g: u8,
  pub b: u8,
}
impl RGB8 {
  /// Makes a new entry.
  #[inline]
  #[must_use]
  pub const fn new(r: u8, g: u8, b: u8) -> Self {
    Self { r, g, b }
  }

  /// Sum of the per-channel absolute differences.
  #[inline]
  #[must_use]
  pub const fn manhattan_distance(self, other: Self) -> u32 {
    self.r.abs_diff(other.r) as u32
      + self.g.abs_diff(other.g) as u32
      + self.b.abs_diff(other.b) as u32
  }
}

/// A color in sample units of some bit depth, plus a palette index.
///
/// Used for transparency keys and background colors. Which fields matter
/// depends on the color type of the image it goes with: gray images use
/// `gray`, color images use `red`, `green`, and `blue`, and indexed images use
/// `index`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub struct Color16 {
  pub index: u8,
  pub red: u16,
  pub green: u16,
  pub blue: u16,
  pub gray: u16,
}
impl Color16 {
  /// A gray value.
  #[inline]
  #[must_use]
  pub const fn gray(gray: u16) -> Self {
    Self { index: 0, red: 0, green: 0, blue: 0, gray }
  }

  /// An RGB value.
  #[inline]
  #[must_use]
  pub const fn rgb(red: u16, green: u16, blue: u16) -> Self {
    Self { index: 0, red, green, blue, gray: 0 }
  }

  /// A palette index.
  #[inline]
  #[must_use]
  pub const fn index(index: u8) -> Self {
    Self { index, red: 0, green: 0, blue: 0, gray: 0 }
  }
}

/// Builds an evenly spaced gray palette for the bit depth.
///
/// Depths other than 1, 2, 4, or 8 give an empty palette.
#[must_use]
pub fn build_grayscale_palette(bit_depth: u8) -> Vec<RGB8> {
  let (count, step): (u16, u16) = match bit_depth {
    1 => (2, 0xFF),
    2 => (4, 0x55),
    4 => (16, 0x11),
    8 => (256, 1),
    _ => return Vec::new(),
  };
  (0..count)
    .map(|i| {
      let v = (i * step) as u8;
      RGB8::new(v, v, v)
    })
    .collect()
}

/// Converts a finished 8-bit RGBA row into pixels for upload.
///
/// Gives `None` if the row isn't 8-bit RGBA or is shorter than its rowbytes.
#[must_use]
pub fn rgba8_pixels(info: &RowInfo, row: &[u8]) -> Option<Vec<r8g8b8a8_Srgb>> {
  if info.color_type != PngColorType::RGBA || info.bit_depth != 8 || info.channels != 4 {
    return None;
  }
  let bytes = row.get(..info.rowbytes)?;
  Some(
    bytes
      .chunks_exact(4)
      .map(|px| r8g8b8a8_Srgb { r: px[0], g: px[1], b: px[2], a: px[3] })
      .collect(),
  )
}
