//! Conversion between gray and RGB rows.

use crate::{GammaTables, PngColorType, RowInfo};

/// Fixed point RGB to gray weights, in units of 1/32768.
///
/// The three weights always sum to 32768.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub struct GrayCoefficients {
  pub red: u16,
  pub green: u16,
  pub blue: u16,
}
impl Default for GrayCoefficients {
  /// Weights of `0.212671`, `0.715160`, and `0.072169`.
  #[inline]
  fn default() -> Self {
    Self::from_red_green(6968, 23434)
  }
}
impl GrayCoefficients {
  const fn from_red_green(red: u16, green: u16) -> Self {
    Self { red, green, blue: 32768 - red - green }
  }

  /// Makes weights from a red and green fraction, with blue getting the rest.
  ///
  /// A negative weight selects the defaults. Weights summing to 1.0 or more
  /// log a warning and also select the defaults.
  #[must_use]
  pub fn from_weights(red: f64, green: f64) -> Self {
    let red_fixed = (red * 100000.0 + 0.5) as i64;
    let green_fixed = (green * 100000.0 + 0.5) as i64;
    if red < 0.0 || green < 0.0 {
      Self::default()
    } else if red_fixed + green_fixed < 100000 {
      Self::from_red_green((red_fixed * 32768 / 100000) as u16, (green_fixed * 32768 / 100000) as u16)
    } else {
      log::warn!("png: ignoring out of range rgb_to_gray coefficients");
      Self::default()
    }
  }

  #[inline]
  fn weigh(&self, r: u32, g: u32, b: u32) -> u32 {
    (u32::from(self.red) * r + u32::from(self.green) * g + u32::from(self.blue) * b) >> 15
  }
}

/// Copies each gray sample into red, green, and blue.
///
/// Rows that already have color, or are below 8 bits, are left alone and
/// `false` is returned without touching `dst`.
pub fn gray_to_rgb(info: &mut RowInfo, src: &[u8], dst: &mut Vec<u8>) -> bool {
  if info.bit_depth < 8 || info.color_type.has_color() {
    return false;
  }
  let sample = info.bytes_per_sample();
  let has_alpha = info.color_type.has_alpha();
  dst.clear();
  for px in src[..info.rowbytes].chunks_exact(info.bytes_per_pixel()) {
    let (gray, alpha) = px.split_at(sample);
    dst.extend_from_slice(gray);
    dst.extend_from_slice(gray);
    dst.extend_from_slice(gray);
    if has_alpha {
      dst.extend_from_slice(alpha);
    }
  }
  let channels = info.channels + 2;
  info.set_layout(info.color_type.with_color(), channels, info.bit_depth);
  true
}

/// Reduces RGB rows to gray, in place.
///
/// When the gamma tables have linear versions the weighting is done in linear
/// light. Pixels whose channels are all equal pass through untouched.
///
/// Returns if any pixel had unequal channels, which means color was lost.
pub fn rgb_to_gray(
  info: &mut RowInfo, row: &mut [u8], coefficients: GrayCoefficients, gamma: Option<&GammaTables>,
) -> bool {
  if !info.color_type.has_color() || info.color_type == PngColorType::Index {
    return false;
  }
  let has_alpha = info.color_type.has_alpha();
  let width = info.width as usize;
  let mut non_gray = false;
  if info.bit_depth == 8 {
    let linear = gamma.and_then(|t| Some((t.to_1_8()?, t.from_1_8()?)));
    let stride = if has_alpha { 4 } else { 3 };
    let out_stride = if has_alpha { 2 } else { 1 };
    for i in 0..width {
      let s = i * stride;
      let (r, g, b) = (row[s], row[s + 1], row[s + 2]);
      let gray = if r == g && g == b {
        r
      } else {
        non_gray = true;
        match linear {
          Some((to_1, from_1)) => {
            let v = coefficients.weigh(
              u32::from(to_1[r as usize]),
              u32::from(to_1[g as usize]),
              u32::from(to_1[b as usize]),
            );
            from_1[v as usize]
          }
          None => coefficients.weigh(u32::from(r), u32::from(g), u32::from(b)) as u8,
        }
      };
      let d = i * out_stride;
      row[d] = gray;
      if has_alpha {
        row[d + 1] = row[s + 3];
      }
    }
  } else if info.bit_depth == 16 {
    let linear = gamma.and_then(|t| Some((t.to_1_16()?, t.from_1_16()?)));
    let stride = if has_alpha { 8 } else { 6 };
    let out_stride = if has_alpha { 4 } else { 2 };
    let read = |row: &[u8], at: usize| u16::from_be_bytes([row[at], row[at + 1]]);
    for i in 0..width {
      let s = i * stride;
      let (r, g, b) = (read(row, s), read(row, s + 2), read(row, s + 4));
      let gray = if r == g && g == b {
        r
      } else {
        non_gray = true;
        match linear {
          Some((to_1, from_1)) => {
            let v = coefficients.weigh(
              u32::from(to_1.lookup(r)),
              u32::from(to_1.lookup(g)),
              u32::from(to_1.lookup(b)),
            );
            from_1.lookup(v as u16)
          }
          None => coefficients.weigh(u32::from(r), u32::from(g), u32::from(b)) as u16,
        }
      };
      let d = i * out_stride;
      row[d..d + 2].copy_from_slice(&gray.to_be_bytes());
      if has_alpha {
        row.copy_within(s + 6..s + 8, d + 2);
      }
    }
  } else {
    return false;
  }
  let channels = info.channels - 2;
  info.set_layout(info.color_type.without_color(), channels, info.bit_depth);
  non_gray
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_coefficients() {
    let c = GrayCoefficients::default();
    assert_eq!(c.red as u32 + c.green as u32 + c.blue as u32, 32768);
    assert_eq!(c.blue, 2366);
    let c = GrayCoefficients::from_weights(0.299, 0.587);
    assert_eq!(c.red, 9797);
    assert_eq!(c.green, 19234);
    assert_eq!(GrayCoefficients::from_weights(0.6, 0.6), GrayCoefficients::default());
    assert_eq!(GrayCoefficients::from_weights(-1.0, 0.1), GrayCoefficients::default());
  }

  #[test]
  fn test_gray_to_rgb_twice_is_noop() {
    let mut info = RowInfo::new(2, PngColorType::YA, 8);
    let mut dst = Vec::new();
    assert!(gray_to_rgb(&mut info, &[10, 20, 30, 40], &mut dst));
    assert_eq!(dst, [10, 10, 10, 20, 30, 30, 30, 40]);
    assert_eq!(info, RowInfo::new(2, PngColorType::RGBA, 8));
    let before = dst.clone();
    let mut dst2 = Vec::new();
    assert!(!gray_to_rgb(&mut info, &before, &mut dst2));
    assert_eq!(info, RowInfo::new(2, PngColorType::RGBA, 8));
    assert!(dst2.is_empty());
  }

  #[test]
  fn test_gray_to_rgb_16() {
    let mut info = RowInfo::new(1, PngColorType::Y, 16);
    let mut dst = Vec::new();
    assert!(gray_to_rgb(&mut info, &[0xAB, 0xCD], &mut dst));
    assert_eq!(dst, [0xAB, 0xCD, 0xAB, 0xCD, 0xAB, 0xCD]);
    assert_eq!(info.rowbytes, 6);
  }

  #[test]
  fn test_rgb_to_gray() {
    let mut info = RowInfo::new(3, PngColorType::RGB, 8);
    let mut row = [50, 50, 50, 255, 0, 0, 0, 0, 255];
    let non_gray = rgb_to_gray(&mut info, &mut row, GrayCoefficients::default(), None);
    assert!(non_gray);
    assert_eq!(info, RowInfo::new(3, PngColorType::Y, 8));
    assert_eq!(&row[..3], &[50, ((6968_u32 * 255) >> 15) as u8, ((2366_u32 * 255) >> 15) as u8]);

    let mut info = RowInfo::new(1, PngColorType::RGBA, 16);
    let mut row = [1, 2, 1, 2, 1, 2, 0xAA, 0xBB];
    let non_gray = rgb_to_gray(&mut info, &mut row, GrayCoefficients::default(), None);
    assert!(!non_gray);
    assert_eq!(info.color_type, PngColorType::YA);
    assert_eq!(&row[..4], &[1, 2, 0xAA, 0xBB]);
  }
}
