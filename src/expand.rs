//! Palette, transparency, and low bit depth expansion.
//!
//! These all widen the row, so they read from one buffer and write into
//! another. The caller swaps the buffers afterward.

use crate::{packed_sample, scale_to_8, Color16, PngColorType, RowInfo, RGB8};

/// Expands indexed pixels into RGB, or RGBA when `alphas` is non-empty.
///
/// Indexes at or past `alphas.len()` are fully opaque. Indexes past the end of
/// the palette come out black.
///
/// Returns `false` without touching `dst` if the row isn't indexed.
pub fn expand_palette(
  info: &mut RowInfo, src: &[u8], dst: &mut Vec<u8>, palette: &[RGB8], alphas: &[u8],
) -> bool {
  if info.color_type != PngColorType::Index {
    return false;
  }
  let depth = info.bit_depth;
  let width = info.width as usize;
  dst.clear();
  for i in 0..width {
    let idx = (if depth < 8 { packed_sample(src, i, depth) } else { src[i] }) as usize;
    let RGB8 { r, g, b } = palette.get(idx).copied().unwrap_or_default();
    dst.extend_from_slice(&[r, g, b]);
    if !alphas.is_empty() {
      dst.push(alphas.get(idx).copied().unwrap_or(0xFF));
    }
  }
  if alphas.is_empty() {
    info.set_layout(PngColorType::RGB, 3, 8);
  } else {
    info.set_layout(PngColorType::RGBA, 4, 8);
  }
  true
}

/// Expands gray rows below 8 bits up to 8 bits, and turns a transparency key
/// into a real alpha channel.
///
/// Low depth gray samples are scaled (a 1-bit `1` becomes `0xFF`), and the key
/// is scaled the same way so it still matches. Pixels equal to the key get
/// alpha 0, all others get full alpha.
///
/// Returns `false` without touching `dst` if there was nothing to do.
pub fn expand(info: &mut RowInfo, src: &[u8], dst: &mut Vec<u8>, key: Option<Color16>) -> bool {
  let width = info.width as usize;
  match (info.color_type, info.bit_depth) {
    (PngColorType::Y, depth @ (1 | 2 | 4)) => {
      let mask = (1_u8 << depth) - 1;
      let key = key.map(|k| scale_to_8(depth, (k.gray as u8) & mask));
      dst.clear();
      for i in 0..width {
        let v = scale_to_8(depth, packed_sample(src, i, depth));
        dst.push(v);
        if let Some(k) = key {
          dst.push(if v == k { 0 } else { 0xFF });
        }
      }
      if key.is_some() {
        info.set_layout(PngColorType::YA, 2, 8);
      } else {
        info.set_layout(PngColorType::Y, 1, 8);
      }
      true
    }
    (PngColorType::Y, 8) => {
      let Some(k) = key else { return false };
      dst.clear();
      for &v in &src[..width] {
        dst.extend_from_slice(&[v, if u16::from(v) == k.gray { 0 } else { 0xFF }]);
      }
      info.set_layout(PngColorType::YA, 2, 8);
      true
    }
    (PngColorType::Y, 16) => {
      let Some(k) = key else { return false };
      dst.clear();
      for px in src[..width * 2].chunks_exact(2) {
        let a = if u16::from_be_bytes([px[0], px[1]]) == k.gray { 0 } else { 0xFF };
        dst.extend_from_slice(&[px[0], px[1], a, a]);
      }
      info.set_layout(PngColorType::YA, 2, 16);
      true
    }
    (PngColorType::RGB, 8) => {
      let Some(k) = key else { return false };
      dst.clear();
      for px in src[..width * 3].chunks_exact(3) {
        let is_key = u16::from(px[0]) == k.red
          && u16::from(px[1]) == k.green
          && u16::from(px[2]) == k.blue;
        dst.extend_from_slice(px);
        dst.push(if is_key { 0 } else { 0xFF });
      }
      info.set_layout(PngColorType::RGBA, 4, 8);
      true
    }
    (PngColorType::RGB, 16) => {
      let Some(k) = key else { return false };
      dst.clear();
      for px in src[..width * 6].chunks_exact(6) {
        let is_key = u16::from_be_bytes([px[0], px[1]]) == k.red
          && u16::from_be_bytes([px[2], px[3]]) == k.green
          && u16::from_be_bytes([px[4], px[5]]) == k.blue;
        let a = if is_key { 0 } else { 0xFF };
        dst.extend_from_slice(px);
        dst.extend_from_slice(&[a, a]);
      }
      info.set_layout(PngColorType::RGBA, 4, 16);
      true
    }
    _ => false,
  }
}
