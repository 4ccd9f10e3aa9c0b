//! The image header the pipeline is built from.
//!
//! Chunk parsing happens elsewhere. These types only decode the already
//! separated payload bytes of `PLTE`, `tRNS`, `sBIT`, and `hIST` into values.

use bytemuck::try_cast_slice;

use crate::{Color16, PngColorType, PngRowError, RGB8};

/// Transparency info.
///
/// For gray and RGB images this is a single color key. For indexed images it's
/// an alpha value per palette entry, and entries past the end of the array are
/// fully opaque.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Transparency {
  Y { y: u16 },
  RGB { r: u16, g: u16, b: u16 },
  Index { alphas: Vec<u8> },
}
impl Transparency {
  /// Decodes the payload of a `tRNS` chunk for an image of the given type.
  ///
  /// Gives `None` if the payload has the wrong length for the color type, or
  /// if the color type can't have a `tRNS` chunk at all.
  #[must_use]
  pub fn from_trns_data(color_type: PngColorType, data: &[u8]) -> Option<Self> {
    match (color_type, data) {
      (PngColorType::Y, [y0, y1]) => Some(Self::Y { y: u16::from_be_bytes([*y0, *y1]) }),
      (PngColorType::RGB, [r0, r1, g0, g1, b0, b1]) => Some(Self::RGB {
        r: u16::from_be_bytes([*r0, *r1]),
        g: u16::from_be_bytes([*g0, *g1]),
        b: u16::from_be_bytes([*b0, *b1]),
      }),
      (PngColorType::Index, alphas) if alphas.len() <= 256 => {
        Some(Self::Index { alphas: alphas.to_vec() })
      }
      _ => None,
    }
  }

  /// The color key, for gray and RGB images.
  #[inline]
  #[must_use]
  pub const fn key(&self) -> Option<Color16> {
    match self {
      Self::Y { y } => Some(Color16::gray(*y)),
      Self::RGB { r, g, b } => Some(Color16::rgb(*r, *g, *b)),
      Self::Index { .. } => None,
    }
  }

  /// The alpha array, for indexed images.
  #[inline]
  #[must_use]
  pub fn alphas(&self) -> &[u8] {
    match self {
      Self::Index { alphas } => alphas,
      _ => &[],
    }
  }

  /// How many entries the transparency info holds (libpng's `num_trans`).
  #[inline]
  #[must_use]
  pub fn count(&self) -> usize {
    match self {
      Self::Index { alphas } => alphas.len(),
      _ => 1,
    }
  }
}

/// Significant bits per channel, from the `sBIT` chunk.
///
/// Channels that the image doesn't have are left at 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub struct SignificantBits {
  pub red: u8,
  pub green: u8,
  pub blue: u8,
  pub gray: u8,
  pub alpha: u8,
}
impl SignificantBits {
  /// Decodes the payload of an `sBIT` chunk for an image of the given type.
  #[must_use]
  pub fn from_sbit_data(color_type: PngColorType, data: &[u8]) -> Option<Self> {
    let mut out = Self::default();
    match (color_type, data) {
      (PngColorType::Y, [y]) => out.gray = *y,
      (PngColorType::RGB | PngColorType::Index, [r, g, b]) => {
        (out.red, out.green, out.blue) = (*r, *g, *b);
      }
      (PngColorType::YA, [y, a]) => (out.gray, out.alpha) = (*y, *a),
      (PngColorType::RGBA, [r, g, b, a]) => {
        (out.red, out.green, out.blue, out.alpha) = (*r, *g, *b, *a);
      }
      _ => return None,
    }
    Some(out)
  }

  /// The largest significant bit count over the color (or gray) channels.
  #[inline]
  #[must_use]
  pub fn max_color_bits(&self, color_type: PngColorType) -> u8 {
    if color_type.has_color() {
      self.red.max(self.green).max(self.blue)
    } else {
      self.gray
    }
  }
}

/// Decodes `PLTE` payload bytes into palette entries.
#[inline]
#[must_use]
pub fn palette_from_plte_data(data: &[u8]) -> Option<Vec<RGB8>> {
  try_cast_slice::<u8, RGB8>(data).ok().map(<[RGB8]>::to_vec)
}

/// Decodes `hIST` payload bytes into per-entry usage counts.
#[must_use]
pub fn histogram_from_hist_data(data: &[u8]) -> Option<Vec<u16>> {
  if data.len() % 2 != 0 {
    return None;
  }
  Some(data.chunks_exact(2).map(|c| u16::from_be_bytes([c[0], c[1]])).collect())
}

/// Everything about the image that the transformations depend on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageHeader {
  /// Pixels per row.
  pub width: u32,
  /// Bits per sample: 1, 2, 4, 8, or 16.
  pub bit_depth: u8,
  /// Color type of the stored pixels.
  pub color_type: PngColorType,
  /// The `PLTE` entries. Required for indexed images, optional otherwise.
  pub palette: Vec<RGB8>,
  /// The `tRNS` info, if any.
  pub transparency: Option<Transparency>,
  /// The `sBIT` info, if any.
  pub sig_bit: Option<SignificantBits>,
  /// The `hIST` info, if any. One count per palette entry.
  pub histogram: Option<Vec<u16>>,
}
impl ImageHeader {
  /// A header with no ancillary info.
  #[inline]
  #[must_use]
  pub const fn new(width: u32, color_type: PngColorType, bit_depth: u8) -> Self {
    Self {
      width,
      bit_depth,
      color_type,
      palette: Vec::new(),
      transparency: None,
      sig_bit: None,
      histogram: None,
    }
  }

  /// Sets the palette.
  #[inline]
  #[must_use]
  pub fn with_palette(mut self, palette: Vec<RGB8>) -> Self {
    self.palette = palette;
    self
  }

  /// Sets the transparency info.
  #[inline]
  #[must_use]
  pub fn with_transparency(mut self, transparency: Transparency) -> Self {
    self.transparency = Some(transparency);
    self
  }

  /// Sets the significant bits.
  #[inline]
  #[must_use]
  pub fn with_sig_bit(mut self, sig_bit: SignificantBits) -> Self {
    self.sig_bit = Some(sig_bit);
    self
  }

  /// Sets the palette histogram.
  #[inline]
  #[must_use]
  pub fn with_histogram(mut self, histogram: Vec<u16>) -> Self {
    self.histogram = Some(histogram);
    self
  }

  /// Checks the pieces the pipeline relies on for memory safety.
  ///
  /// ## Failure
  /// * Zero width.
  /// * Illegal bit depth for the color type.
  /// * An indexed image with no palette, or any palette over 256 entries.
  /// * Transparency info of the wrong kind for the color type.
  pub fn validate(&self) -> Result<(), PngRowError> {
    if self.width == 0 || !self.color_type.allows_bit_depth(self.bit_depth) {
      return Err(PngRowError::InvalidHeader);
    }
    if self.palette.len() > 256 {
      return Err(PngRowError::InvalidHeader);
    }
    if self.color_type == PngColorType::Index && self.palette.is_empty() {
      return Err(PngRowError::InvalidHeader);
    }
    match (&self.transparency, self.color_type) {
      (None, _)
      | (Some(Transparency::Y { .. }), PngColorType::Y)
      | (Some(Transparency::RGB { .. }), PngColorType::RGB)
      | (Some(Transparency::Index { .. }), PngColorType::Index) => Ok(()),
      _ => Err(PngRowError::InvalidHeader),
    }
  }

  /// Number of transparency entries, 0 when there's no `tRNS`.
  #[inline]
  #[must_use]
  pub fn num_trans(&self) -> usize {
    self.transparency.as_ref().map_or(0, Transparency::count)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_trns_decoding() {
    assert_eq!(
      Transparency::from_trns_data(PngColorType::Y, &[0x12, 0x34]),
      Some(Transparency::Y { y: 0x1234 })
    );
    assert_eq!(
      Transparency::from_trns_data(PngColorType::RGB, &[0, 1, 0, 2, 0, 3]),
      Some(Transparency::RGB { r: 1, g: 2, b: 3 })
    );
    assert_eq!(
      Transparency::from_trns_data(PngColorType::Index, &[0, 128]).map(|t| t.count()),
      Some(2)
    );
    assert_eq!(Transparency::from_trns_data(PngColorType::Y, &[0]), None);
    assert_eq!(Transparency::from_trns_data(PngColorType::RGBA, &[0, 0]), None);
  }

  #[test]
  fn test_sbit_decoding() {
    let sb = SignificantBits::from_sbit_data(PngColorType::RGBA, &[5, 6, 5, 1]).unwrap();
    assert_eq!(sb.max_color_bits(PngColorType::RGBA), 6);
    assert_eq!(sb.alpha, 1);
    let sb = SignificantBits::from_sbit_data(PngColorType::Y, &[3]).unwrap();
    assert_eq!(sb.max_color_bits(PngColorType::Y), 3);
    assert!(SignificantBits::from_sbit_data(PngColorType::Y, &[3, 3]).is_none());
  }

  #[test]
  fn test_validate() {
    assert!(ImageHeader::new(4, PngColorType::RGB, 8).validate().is_ok());
    assert!(ImageHeader::new(4, PngColorType::RGB, 4).validate().is_err());
    assert!(ImageHeader::new(0, PngColorType::RGB, 8).validate().is_err());
    assert!(ImageHeader::new(4, PngColorType::Index, 16).validate().is_err());
    assert!(ImageHeader::new(4, PngColorType::Index, 8).validate().is_err());
    let plte = palette_from_plte_data(&[0, 0, 0, 255, 255, 255]).unwrap();
    let h = ImageHeader::new(4, PngColorType::Index, 8).with_palette(plte);
    assert!(h.validate().is_ok());
    let bad = h.clone().with_transparency(Transparency::Y { y: 0 });
    assert_eq!(bad.validate(), Err(PngRowError::InvalidHeader));
    assert!(palette_from_plte_data(&[0, 0]).is_none());
    assert_eq!(histogram_from_hist_data(&[0, 1, 1, 0]), Some(vec![1, 256]));
  }
}
