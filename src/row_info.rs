//! Per-row shape metadata.

use crate::PngRowError;

/// PNG color types.
///
/// The discriminant is the value used in the `IHDR` chunk. Bit 1 marks color,
/// bit 2 marks an alpha channel, and bit 0 marks indexed color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum PngColorType {
  /// Greyscale
  Y = 0,
  /// Red, Green, Blue
  RGB = 2,
  /// Index into a palette.
  Index = 3,
  /// Greyscale + Alpha
  YA = 4,
  /// Red, Green, Blue, Alpha
  RGBA = 6,
}
impl PngColorType {
  /// The number of channels in a pixel of this color type.
  #[inline]
  #[must_use]
  pub const fn channel_count(self) -> u8 {
    match self {
      Self::Y => 1,
      Self::RGB => 3,
      Self::Index => 1,
      Self::YA => 2,
      Self::RGBA => 4,
    }
  }

  /// If the type stores red/green/blue (directly or through a palette).
  #[inline]
  #[must_use]
  pub const fn has_color(self) -> bool {
    (self as u8) & 2 != 0
  }

  /// If the type carries an explicit alpha channel.
  #[inline]
  #[must_use]
  pub const fn has_alpha(self) -> bool {
    (self as u8) & 4 != 0
  }

  /// Adds an alpha channel. Indexed color is left alone.
  #[inline]
  #[must_use]
  pub const fn with_alpha(self) -> Self {
    match self {
      Self::Y | Self::YA => Self::YA,
      Self::RGB | Self::RGBA => Self::RGBA,
      Self::Index => Self::Index,
    }
  }

  /// Removes the alpha channel, if any.
  #[inline]
  #[must_use]
  pub const fn without_alpha(self) -> Self {
    match self {
      Self::Y | Self::YA => Self::Y,
      Self::RGB | Self::RGBA => Self::RGB,
      Self::Index => Self::Index,
    }
  }

  /// Converts a gray type to the matching RGB type.
  #[inline]
  #[must_use]
  pub const fn with_color(self) -> Self {
    match self {
      Self::Y => Self::RGB,
      Self::YA => Self::RGBA,
      other => other,
    }
  }

  /// Converts an RGB type to the matching gray type.
  #[inline]
  #[must_use]
  pub const fn without_color(self) -> Self {
    match self {
      Self::RGB => Self::Y,
      Self::RGBA => Self::YA,
      other => other,
    }
  }

  /// Checks that `bit_depth` is legal for this color type.
  #[inline]
  #[must_use]
  pub const fn allows_bit_depth(self, bit_depth: u8) -> bool {
    match self {
      Self::Y => matches!(bit_depth, 1 | 2 | 4 | 8 | 16),
      Self::Index => matches!(bit_depth, 1 | 2 | 4 | 8),
      Self::RGB | Self::YA | Self::RGBA => matches!(bit_depth, 8 | 16),
    }
  }
}
impl TryFrom<u8> for PngColorType {
  type Error = PngRowError;
  #[inline]
  fn try_from(value: u8) -> Result<Self, Self::Error> {
    Ok(match value {
      0 => Self::Y,
      2 => Self::RGB,
      3 => Self::Index,
      4 => Self::YA,
      6 => Self::RGBA,
      _ => return Err(PngRowError::InvalidHeader),
    })
  }
}

/// Bytes needed for `width` pixels of `pixel_depth` bits each.
///
/// Sub-byte rows round up to the next whole byte.
#[inline]
#[must_use]
pub const fn rowbytes_for(width: u32, pixel_depth: u8) -> usize {
  let bits = (width as usize).saturating_mul(pixel_depth as usize);
  (bits / 8) + ((bits % 8 != 0) as usize)
}

/// The shape of one scanline as it moves through the pipeline.
///
/// Every stage that changes the layout updates this, and
/// `rowbytes == ceil(width * pixel_depth / 8)` holds between stages.
///
/// `channels` is tracked on its own rather than derived from `color_type`,
/// because filler insertion adds a channel without changing the color type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowInfo {
  pub width: u32,
  pub color_type: PngColorType,
  pub bit_depth: u8,
  pub channels: u8,
  pub pixel_depth: u8,
  pub rowbytes: usize,
}
impl RowInfo {
  /// Shape of an untransformed row of the given format.
  #[inline]
  #[must_use]
  pub const fn new(width: u32, color_type: PngColorType, bit_depth: u8) -> Self {
    let channels = color_type.channel_count();
    let pixel_depth = channels * bit_depth;
    Self {
      width,
      color_type,
      bit_depth,
      channels,
      pixel_depth,
      rowbytes: rowbytes_for(width, pixel_depth),
    }
  }

  /// Recomputes `pixel_depth` and `rowbytes` from the other fields.
  #[inline]
  pub fn recompute(&mut self) {
    self.pixel_depth = self.channels * self.bit_depth;
    self.rowbytes = rowbytes_for(self.width, self.pixel_depth);
  }

  /// Sets the color type, channel count, and depth at once, then recomputes.
  #[inline]
  pub fn set_layout(&mut self, color_type: PngColorType, channels: u8, bit_depth: u8) {
    self.color_type = color_type;
    self.channels = channels;
    self.bit_depth = bit_depth;
    self.recompute();
  }

  /// Bytes per sample: 2 for 16-bit rows, otherwise 1.
  #[inline]
  #[must_use]
  pub const fn bytes_per_sample(&self) -> usize {
    if self.bit_depth == 16 {
      2
    } else {
      1
    }
  }

  /// Bytes per whole pixel. Only meaningful for rows of 8 bits or more.
  #[inline]
  #[must_use]
  pub const fn bytes_per_pixel(&self) -> usize {
    self.channels as usize * self.bytes_per_sample()
  }
}
