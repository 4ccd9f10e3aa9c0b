use core::fmt;
use std::collections::TryReserveError;

/// An error from the `pngrow` crate.
///
/// Every variant is fatal for the image being decoded: once one of these is
/// returned the pipeline should be dropped rather than fed more rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PngRowError {
  /// The scanline buffer given to the pipeline was empty.
  MissingRow,

  /// The scanline buffer is shorter than the input rowbytes.
  RowTooShort {
    /// Bytes the input row occupies.
    needed: usize,
    /// Bytes the caller actually provided.
    got: usize,
  },

  /// A row came out of the dither stage with zero rowbytes.
  ZeroRowBytes,

  /// RGB to gray reduction hit a pixel with unequal channels and the caller
  /// asked for that to be an error.
  NonGrayPixel {
    /// Zero-based index of the offending row within the image.
    row: u32,
  },

  /// The allocator couldn't give us enough space for a table or palette.
  Alloc,

  /// The header describes a bit depth / color type pair (or palette) that PNG
  /// doesn't allow.
  InvalidHeader,

  /// A row was submitted after the pipeline was finished.
  Finalized,
}
impl From<TryReserveError> for PngRowError {
  #[inline]
  fn from(_: TryReserveError) -> Self {
    Self::Alloc
  }
}
impl fmt::Display for PngRowError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::MissingRow => write!(f, "no scanline buffer was provided"),
      Self::RowTooShort { needed, got } => {
        write!(f, "scanline buffer holds {got} bytes but the row needs {needed}")
      }
      Self::ZeroRowBytes => write!(f, "row has zero bytes after dithering"),
      Self::NonGrayPixel { row } => write!(f, "non-gray pixel found in row {row}"),
      Self::Alloc => write!(f, "allocation failed"),
      Self::InvalidHeader => write!(f, "invalid bit depth, color type, or palette"),
      Self::Finalized => write!(f, "the pipeline was already finished"),
    }
  }
}
impl std::error::Error for PngRowError {}

/// Shorthand for results with a [`PngRowError`].
pub type PngRowResult<T> = Result<T, PngRowError>;
