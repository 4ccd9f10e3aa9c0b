//! Palette reduction and true-color quantization.
//!
//! There's two jobs here, and a builder may do either or both:
//!
//! * Shrink a palette that has more entries than the output can hold. With a
//!   histogram the least used entries are dropped. Without one, the closest
//!   pairs of colors are merged until the palette fits. The pair merging is a
//!   heuristic: the result is *a* valid reduction, but which entry of a pair
//!   survives depends on scan order.
//! * For true-color input, build a lookup cube over quantized RGB that gives
//!   the nearest palette entry for every cell.

use crate::{DitherBits, PngColorType, PngRowError, RowInfo, RGB8};

/// Number of distance buckets for the pair merging. Manhattan distance between
/// two RGB8 colors is at most `3 * 255`.
const DISTANCE_BUCKETS: usize = 769;

/// How far apart the first round of pair merging looks, and how much further
/// each following round looks.
const MERGE_DISTANCE_STEP: u32 = 96;

/// Inputs for building a [`PaletteDither`].
#[derive(Debug, Clone, Copy)]
pub struct PaletteDitherBuilder<'a> {
  /// The palette to reduce, or to quantize toward.
  pub palette: &'a [RGB8],
  /// Most entries the result may have. Clamped to `1..=256`.
  pub maximum_colors: usize,
  /// Use counts per palette entry. Missing entries count as unused.
  pub histogram: Option<&'a [u16]>,
  /// Build a quantization cube for true-color input, rather than a table for
  /// remapping palette indexes.
  pub full_dither: bool,
  /// Cube resolution, for `full_dither`.
  pub bits: DitherBits,
}

/// A reduced palette plus whatever tables the dither stage needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteDither {
  palette: Vec<RGB8>,
  dither_index: Option<Vec<u8>>,
  palette_lookup: Option<Vec<u8>>,
  bits: DitherBits,
}
impl PaletteDither {
  /// The palette after reduction.
  #[inline]
  #[must_use]
  pub fn palette(&self) -> &[RGB8] {
    &self.palette
  }

  /// For each original palette index, the index it now maps to.
  ///
  /// Only present when not doing `full_dither`.
  #[inline]
  #[must_use]
  pub fn dither_index(&self) -> Option<&[u8]> {
    self.dither_index.as_deref()
  }

  /// The quantization cube. Only present with `full_dither`.
  #[inline]
  #[must_use]
  pub fn palette_lookup(&self) -> Option<&[u8]> {
    self.palette_lookup.as_deref()
  }

  /// Nearest palette index for a color, through the cube.
  #[inline]
  #[must_use]
  pub fn lookup(&self, r: u8, g: u8, b: u8) -> Option<u8> {
    self.palette_lookup.as_ref().map(|t| t[self.bits.cell(r, g, b)])
  }

  /// Runs the dither stage on one row.
  ///
  /// 8-bit RGB and RGBA rows become 8-bit indexed rows through the cube (alpha
  /// is discarded). 8-bit indexed rows are remapped through the index table.
  /// Anything else is left alone.
  pub fn dither_row(&self, info: &mut RowInfo, row: &mut [u8]) {
    if info.bit_depth != 8 {
      return;
    }
    match (info.color_type, &self.palette_lookup, &self.dither_index) {
      (PngColorType::RGB | PngColorType::RGBA, Some(lookup), _) => {
        let stride = info.channels as usize;
        for i in 0..info.width as usize {
          let s = i * stride;
          row[i] = lookup[self.bits.cell(row[s], row[s + 1], row[s + 2])];
        }
        info.set_layout(PngColorType::Index, 1, 8);
      }
      (PngColorType::Index, _, Some(index)) => {
        for b in &mut row[..info.rowbytes] {
          if let Some(&to) = index.get(*b as usize) {
            *b = to;
          }
        }
      }
      _ => (),
    }
  }
}

impl PaletteDitherBuilder<'_> {
  /// Builds the reduced palette and tables.
  ///
  /// ## Failure
  /// * The quantization cube couldn't be allocated.
  pub fn build(&self) -> Result<PaletteDither, PngRowError> {
    let maximum = self.maximum_colors.clamp(1, 256);
    let mut palette = self.palette.to_vec();
    let num_palette = palette.len();
    let mut dither_index: Option<Vec<usize>> =
      if self.full_dither { None } else { Some((0..num_palette).collect()) };

    if num_palette > maximum {
      match self.histogram {
        Some(histogram) => {
          drop_least_used(&mut palette, maximum, histogram, dither_index.as_mut())
        }
        None => merge_closest_pairs(&mut palette, maximum, dither_index.as_mut()),
      }
      palette.truncate(maximum);
      log::debug!("png: palette reduced from {num_palette} to {maximum} entries");
    }

    let bits = self.bits.clamped();
    let palette_lookup =
      if self.full_dither { Some(build_cube(&palette, bits)?) } else { None };

    Ok(PaletteDither {
      palette,
      dither_index: dither_index
        .map(|v| v.into_iter().map(|i| i.min(usize::from(u8::MAX)) as u8).collect()),
      palette_lookup,
      bits,
    })
  }
}

/// Sorts just enough of the palette by use count to find the least used
/// entries, then moves every surviving entry below `maximum`.
fn drop_least_used(
  palette: &mut [RGB8], maximum: usize, histogram: &[u16], mut dither_index: Option<&mut Vec<usize>>,
) {
  let num_palette = palette.len();
  let uses = |i: usize| histogram.get(i).copied().unwrap_or(0);
  let mut sort: Vec<usize> = (0..num_palette).collect();

  // a partial bubble sort, most used first: only the bottom
  // `num_palette - maximum` slots need to be in their final place
  for i in (maximum..num_palette).rev() {
    let mut done = true;
    for j in 0..i {
      if uses(sort[j]) < uses(sort[j + 1]) {
        sort.swap(j, j + 1);
        done = false;
      }
    }
    if done {
      break;
    }
  }

  let mut j = num_palette;
  for i in 0..maximum {
    let kept = sort[i];
    if kept < maximum {
      continue;
    }
    // find a dropped entry that's sitting in a slot below the limit
    loop {
      j -= 1;
      if sort[j] < maximum {
        break;
      }
    }
    let hole = sort[j];
    match dither_index.as_deref_mut() {
      Some(index) => {
        palette.swap(kept, hole);
        index[kept] = hole;
        index[hole] = kept;
      }
      None => palette[hole] = palette[kept],
    }
  }

  if let Some(index) = dither_index {
    remap_to_nearest(palette, maximum, index);
  }
}

/// Points every index entry that's past the limit at the nearest color below
/// the limit.
fn remap_to_nearest(palette: &[RGB8], maximum: usize, index: &mut [usize]) {
  for slot in index.iter_mut() {
    if *slot < maximum {
      continue;
    }
    let color = palette[*slot];
    let mut min_d = color.manhattan_distance(palette[0]);
    let mut min_k = 0;
    for (k, &entry) in palette.iter().enumerate().take(maximum).skip(1) {
      let d = color.manhattan_distance(entry);
      if d < min_d {
        min_d = d;
        min_k = k;
      }
    }
    *slot = min_k;
  }
}

/// Repeatedly merges the closest pairs of palette entries until the palette
/// fits within `maximum`.
///
/// `index_to_palette` and `palette_to_index` track where each original entry
/// currently lives, since merging moves the last live entry into the hole.
fn merge_closest_pairs(palette: &mut [RGB8], maximum: usize, mut dither_index: Option<&mut Vec<usize>>) {
  let num_palette = palette.len();
  let mut index_to_palette: Vec<usize> = (0..num_palette).collect();
  let mut palette_to_index: Vec<usize> = (0..num_palette).collect();
  let mut buckets: Vec<Vec<(usize, usize)>> = vec![Vec::new(); DISTANCE_BUCKETS];
  let mut num_new = num_palette;
  let mut max_d = MERGE_DISTANCE_STEP;

  while num_new > maximum {
    let before = num_new;
    for i in 0..num_new.saturating_sub(1) {
      for j in (i + 1)..num_new {
        let d = palette[i].manhattan_distance(palette[j]);
        if d <= max_d {
          buckets[d as usize].push((i, j));
        }
      }
    }

    'merge: for bucket in buckets.iter().take(max_d as usize + 1) {
      // newest pairs first
      for &(left, right) in bucket.iter().rev() {
        if index_to_palette[left] < num_new && index_to_palette[right] < num_new {
          let (j, next_j) = if num_new & 1 != 0 { (left, right) } else { (right, left) };
          num_new -= 1;
          palette[index_to_palette[j]] = palette[num_new];
          if let Some(index) = dither_index.as_deref_mut() {
            for slot in index.iter_mut() {
              if *slot == index_to_palette[j] {
                *slot = index_to_palette[next_j];
              }
              if *slot == num_new {
                *slot = index_to_palette[j];
              }
            }
          }
          index_to_palette[palette_to_index[num_new]] = index_to_palette[j];
          palette_to_index[index_to_palette[j]] = palette_to_index[num_new];
          index_to_palette[j] = num_new;
          palette_to_index[num_new] = j;
        }
        if num_new <= maximum {
          break 'merge;
        }
      }
    }

    for bucket in &mut buckets {
      bucket.clear();
    }
    if num_new == before && max_d as usize >= DISTANCE_BUCKETS {
      // every pair was in range and none could merge
      break;
    }
    max_d += MERGE_DISTANCE_STEP;
  }

  if let Some(index) = dither_index {
    remap_to_nearest(palette, maximum, index);
  }
}

/// For every cell of the cube, finds the nearest palette entry.
///
/// The distance mixes the largest per-axis difference with the sum of all of
/// them, which favors entries that are close on every axis at once.
fn build_cube(palette: &[RGB8], bits: DitherBits) -> Result<Vec<u8>, PngRowError> {
  let cells = bits.cells();
  let mut lookup = Vec::new();
  lookup.try_reserve_exact(cells)?;
  lookup.resize(cells, 0_u8);
  let mut distance = Vec::new();
  distance.try_reserve_exact(cells)?;
  distance.resize(cells, u8::MAX);

  let (num_red, num_green, num_blue) = (1_i32 << bits.red, 1_i32 << bits.green, 1_i32 << bits.blue);
  for (i, entry) in palette.iter().enumerate() {
    let r = i32::from(entry.r >> (8 - bits.red));
    let g = i32::from(entry.g >> (8 - bits.green));
    let b = i32::from(entry.b >> (8 - bits.blue));
    for ir in 0..num_red {
      let dr = (ir - r).abs();
      let index_r = (ir as usize) << (bits.green + bits.blue);
      for ig in 0..num_green {
        let dg = (ig - g).abs();
        let dt = dr + dg;
        let dm = dr.max(dg);
        let index_g = index_r | ((ig as usize) << bits.blue);
        for ib in 0..num_blue {
          let cell = index_g | ib as usize;
          let db = (ib - b).abs();
          let d = dm.max(db) + dt + db;
          if d < i32::from(distance[cell]) {
            distance[cell] = d as u8;
            lookup[cell] = i as u8;
          }
        }
      }
    }
  }
  Ok(lookup)
}
