//! Channel reordering, alpha handling, and filler insertion.
//!
//! Apart from [`add_filler`] these only ever keep or shrink the row, so they
//! work in place.

use crate::{PngColorType, RowInfo};

/// Where a filler channel goes relative to the color channels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FillerPlacement {
  /// `XRGB` / `XG`
  Before,
  /// `RGBX` / `GX`
  #[default]
  After,
}

/// Drops the alpha channel, in place.
pub fn strip_alpha(info: &mut RowInfo, row: &mut [u8]) {
  if !info.color_type.has_alpha() {
    return;
  }
  let sample = info.bytes_per_sample();
  let in_px = info.bytes_per_pixel();
  let out_px = in_px - sample;
  for i in 0..info.width as usize {
    row.copy_within(i * in_px..i * in_px + out_px, i * out_px);
  }
  let channels = info.channels - 1;
  info.set_layout(info.color_type.without_alpha(), channels, info.bit_depth);
}

/// Swaps red and blue.
pub fn bgr(info: &RowInfo, row: &mut [u8]) {
  if !matches!(info.color_type, PngColorType::RGB | PngColorType::RGBA) {
    return;
  }
  let sample = info.bytes_per_sample();
  for px in row[..info.rowbytes].chunks_exact_mut(info.bytes_per_pixel()) {
    for k in 0..sample {
      px.swap(k, 2 * sample + k);
    }
  }
}

/// Moves alpha from last to first: `RGBA` to `ARGB`, `GA` to `AG`.
pub fn swap_alpha(info: &RowInfo, row: &mut [u8]) {
  if !info.color_type.has_alpha() {
    return;
  }
  let sample = info.bytes_per_sample();
  for px in row[..info.rowbytes].chunks_exact_mut(info.bytes_per_pixel()) {
    px.rotate_right(sample);
  }
}

/// Inverts the alpha channel, so 0 is opaque.
pub fn invert_alpha(info: &RowInfo, row: &mut [u8]) {
  if !info.color_type.has_alpha() {
    return;
  }
  let sample = info.bytes_per_sample();
  let px_bytes = info.bytes_per_pixel();
  for px in row[..info.rowbytes].chunks_exact_mut(px_bytes) {
    for b in &mut px[px_bytes - sample..] {
      *b = !*b;
    }
  }
}

/// Swaps 16-bit samples to little-endian.
pub fn swap_bytes(info: &RowInfo, row: &mut [u8]) {
  if info.bit_depth != 16 {
    return;
  }
  for pair in row[..info.rowbytes].chunks_exact_mut(2) {
    pair.swap(0, 1);
  }
}

/// Adds a filler channel to gray or RGB rows of 8 or 16 bits.
///
/// The filler is written big-endian for 16-bit rows. The color type stays the
/// same, only the channel count grows.
///
/// Returns `false` without touching `dst` if the row can't take a filler.
pub fn add_filler(
  info: &mut RowInfo, src: &[u8], dst: &mut Vec<u8>, filler: u16, placement: FillerPlacement,
) -> bool {
  let color_channels = match info.color_type {
    PngColorType::Y => 1,
    PngColorType::RGB => 3,
    _ => return false,
  };
  if info.channels != color_channels || info.bit_depth < 8 {
    return false;
  }
  let be = filler.to_be_bytes();
  let fill: &[u8] = if info.bit_depth == 16 { &be } else { &be[1..] };
  dst.clear();
  for px in src[..info.rowbytes].chunks_exact(info.bytes_per_pixel()) {
    match placement {
      FillerPlacement::Before => {
        dst.extend_from_slice(fill);
        dst.extend_from_slice(px);
      }
      FillerPlacement::After => {
        dst.extend_from_slice(px);
        dst.extend_from_slice(fill);
      }
    }
  }
  info.channels += 1;
  info.recompute();
  true
}

/// Undoes MNG intrapixel differencing: red and blue were stored minus green.
pub fn undo_intrapixel(info: &RowInfo, row: &mut [u8]) {
  if !matches!(info.color_type, PngColorType::RGB | PngColorType::RGBA) {
    return;
  }
  let px_bytes = info.bytes_per_pixel();
  let pixels = row[..info.rowbytes].chunks_exact_mut(px_bytes);
  match info.bit_depth {
    8 => {
      for px in pixels {
        px[0] = px[0].wrapping_add(px[1]);
        px[2] = px[2].wrapping_add(px[1]);
      }
    }
    16 => {
      for px in pixels {
        let r = u16::from_be_bytes([px[0], px[1]]);
        let g = u16::from_be_bytes([px[2], px[3]]);
        let b = u16::from_be_bytes([px[4], px[5]]);
        px[0..2].copy_from_slice(&r.wrapping_add(g).to_be_bytes());
        px[4..6].copy_from_slice(&b.wrapping_add(g).to_be_bytes());
      }
    }
    _ => (),
  }
}
