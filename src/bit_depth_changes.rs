//! Bit depth changes: unpacking, packing, 16-to-8 reduction, and unshifting.
//!
//! Sub-byte samples are packed MSB first: the leftmost pixel of a byte sits in
//! its high bits. 16-bit samples are big-endian.

use bitfrob::u8_replicate_bits;

use crate::{PngColorType, RowInfo, SignificantBits};

/// How 16-bit samples are reduced to 8 bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ChopMode {
  /// Keep the high byte.
  #[default]
  Truncate,
  /// Keep the high byte, bumped by one when the low byte is far enough above
  /// it that the true `v * 255 / 65535` would round up.
  Round,
}

/// Reads the `i`th sample of `depth` bits from a packed row.
#[inline]
#[must_use]
pub fn packed_sample(row: &[u8], i: usize, depth: u8) -> u8 {
  let depth = depth as usize;
  let bit = i * depth;
  let shift = 8 - depth - (bit % 8);
  let mask = (1_u16 << depth) as u8 - 1;
  (row[bit / 8] >> shift) & mask
}

/// Writes the `i`th sample of `depth` bits into a packed row.
#[inline]
pub fn set_packed_sample(row: &mut [u8], i: usize, depth: u8, value: u8) {
  let depth = depth as usize;
  let bit = i * depth;
  let shift = 8 - depth - (bit % 8);
  let mask = ((1_u16 << depth) as u8 - 1) << shift;
  let b = &mut row[bit / 8];
  *b = (*b & !mask) | ((value << shift) & mask);
}

/// Scales a 1, 2, or 4 bit value up to 8 bits by repeating its bit pattern.
///
/// Other depths are returned as-is.
#[inline]
#[must_use]
pub fn scale_to_8(bit_depth: u8, value: u8) -> u8 {
  match bit_depth {
    1 | 2 | 4 => u8_replicate_bits(bit_depth as u32, value),
    _ => value,
  }
}

/// Unpacks 1, 2, or 4 bit samples into one byte each.
///
/// Sample values are kept, not scaled: a 2-bit `3` becomes the byte `3`.
/// Returns `false` without touching `dst` when the row is already 8 bits or
/// more.
pub fn unpack(info: &mut RowInfo, src: &[u8], dst: &mut Vec<u8>) -> bool {
  if info.bit_depth >= 8 {
    return false;
  }
  let depth = info.bit_depth;
  let count = info.width as usize * info.channels as usize;
  dst.clear();
  dst.extend((0..count).map(|i| packed_sample(src, i, depth)));
  info.bit_depth = 8;
  info.recompute();
  true
}

/// Packs one-byte samples down to `bit_depth` bits each.
///
/// This is the inverse of [`unpack`]. Only single channel 8-bit rows are
/// packed, and only the low `bit_depth` bits of each sample are kept.
pub fn pack(info: &mut RowInfo, row: &mut [u8], bit_depth: u8) {
  if info.bit_depth != 8 || info.channels != 1 || !matches!(bit_depth, 1 | 2 | 4) {
    return;
  }
  let count = info.width as usize;
  let per_byte = 8 / bit_depth as usize;
  let mask = (1_u8 << bit_depth) - 1;
  let mut out_i = 0;
  for start in (0..count).step_by(per_byte) {
    let mut b = 0_u8;
    for k in 0..per_byte {
      let v = if start + k < count { row[start + k] & mask } else { 0 };
      b |= v << (8 - bit_depth as usize * (k + 1));
    }
    // the write position never passes the read position
    row[out_i] = b;
    out_i += 1;
  }
  info.bit_depth = bit_depth;
  info.recompute();
}

/// Reduces 16-bit samples to 8 bits, in place.
pub fn chop(info: &mut RowInfo, row: &mut [u8], mode: ChopMode) {
  if info.bit_depth != 16 {
    return;
  }
  let count = info.width as usize * info.channels as usize;
  for i in 0..count {
    let hi = row[2 * i];
    let lo = row[2 * i + 1];
    row[i] = match mode {
      ChopMode::Truncate => hi,
      ChopMode::Round => hi + ((lo as i32 - hi as i32) > 128) as u8,
    };
  }
  info.bit_depth = 8;
  info.recompute();
}

/// Shifts samples down so only their significant bits remain.
///
/// Each channel is shifted right by `bit_depth - sig_bit` for that channel.
/// Indexed rows are handled through the palette instead, so they're skipped.
pub fn unshift(info: &RowInfo, row: &mut [u8], sig_bit: &SignificantBits) {
  if info.color_type == PngColorType::Index {
    return;
  }
  let depth = info.bit_depth as i32;
  let amount = |sig: u8| -> u32 {
    if sig == 0 {
      0
    } else {
      (depth - sig as i32).max(0) as u32
    }
  };
  let mut shifts = [0_u32; 4];
  let mut n = if info.color_type.has_color() {
    shifts[0] = amount(sig_bit.red);
    shifts[1] = amount(sig_bit.green);
    shifts[2] = amount(sig_bit.blue);
    3
  } else {
    shifts[0] = amount(sig_bit.gray);
    1
  };
  if info.color_type.has_alpha() {
    shifts[n] = amount(sig_bit.alpha);
    n += 1;
  }
  let shifts = &shifts[..n];
  if shifts.iter().all(|&s| s == 0) {
    return;
  }
  match info.bit_depth {
    1 | 2 | 4 => {
      // sub-byte rows are always one gray channel
      let count = info.width as usize;
      for i in 0..count {
        let v = packed_sample(row, i, info.bit_depth);
        set_packed_sample(row, i, info.bit_depth, v >> shifts[0]);
      }
    }
    8 => {
      for (i, b) in row[..info.rowbytes].iter_mut().enumerate() {
        *b >>= shifts[i % n];
      }
    }
    16 => {
      for (i, pair) in row[..info.rowbytes].chunks_exact_mut(2).enumerate() {
        let v = u16::from_be_bytes([pair[0], pair[1]]) >> shifts[i % n];
        pair.copy_from_slice(&v.to_be_bytes());
      }
    }
    _ => (),
  }
}

/// Bitwise inverts gray samples. Alpha, when present, is left alone.
pub fn invert_mono(info: &RowInfo, row: &mut [u8]) {
  match (info.color_type, info.bit_depth) {
    (PngColorType::Y, _) => {
      for b in &mut row[..info.rowbytes] {
        *b = !*b;
      }
    }
    (PngColorType::YA, 8) => {
      for px in row[..info.rowbytes].chunks_exact_mut(2) {
        px[0] = !px[0];
      }
    }
    (PngColorType::YA, 16) => {
      for px in row[..info.rowbytes].chunks_exact_mut(4) {
        px[0] = !px[0];
        px[1] = !px[1];
      }
    }
    _ => (),
  }
}

/// Reverses the order of the pixels packed within each byte.
pub fn packswap(info: &RowInfo, row: &mut [u8]) {
  let depth = info.bit_depth;
  if depth >= 8 {
    return;
  }
  for b in &mut row[..info.rowbytes] {
    *b = match depth {
      1 => b.reverse_bits(),
      2 => {
        let r = b.rotate_left(4);
        ((r & 0xCC) >> 2) | ((r & 0x33) << 2)
      }
      _ => b.rotate_left(4),
    };
  }
}
