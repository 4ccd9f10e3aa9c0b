#![forbid(unsafe_code)]
#![cfg_attr(docs_rs, feature(doc_cfg))]
//#![warn(missing_docs)]

//! Read-side PNG scanline transformations.
//!
//! Once a PNG row has been inflated and de-filtered it's still in whatever
//! format the file used. This crate turns those rows into the format the
//! program actually wants: palettes and transparency expanded, gamma
//! corrected, composited against a background, reduced to 8 bits, dithered to
//! a palette, reordered, and so on.
//!
//! * Describe the image with an [`ImageHeader`].
//! * Say what you want with a [`TransformConfig`].
//! * Build a [`ScanlinePipeline`] and [`apply`](ScanlinePipeline::apply) it to
//!   each row in turn.
//!
//! ```
//! # use pngrow::*;
//! let header = ImageHeader::new(2, PngColorType::Index, 8)
//!   .with_palette(vec![RGB8::new(0, 0, 0), RGB8::new(255, 255, 255)])
//!   .with_transparency(Transparency::Index { alphas: vec![0] });
//! let mut config = TransformConfig::default();
//! config.set_expand();
//! let mut pipeline = ScanlinePipeline::new(&header, config).unwrap();
//! let mut row = vec![0, 1];
//! let report = pipeline.apply(&mut row).unwrap();
//! assert_eq!(report.info.color_type, PngColorType::RGBA);
//! assert_eq!(row, [0, 0, 0, 0, 255, 255, 255, 255]);
//! ```
//!
//! The individual stages are also public, for use on their own.
//!
//! ## Features
//! * `dither` (default): palette reduction and true-color quantization. With
//!   this off, asking for dithering only logs a warning.

#[cfg(target_pointer_width = "16")]
compile_error!("this crate assumes 32-bit or bigger pointers!");

mod error;
pub use error::*;

pub mod row_info;
pub use row_info::*;

pub mod pixel_formats;
pub use pixel_formats::*;

pub mod header;
pub use header::*;

pub mod transforms;
pub use transforms::*;

pub mod config;
pub use config::*;

pub mod bit_depth_changes;
pub use bit_depth_changes::*;

pub mod expand;
pub use expand::*;

pub mod color_space;
pub use color_space::*;

pub mod swizzle;
pub use swizzle::*;

pub mod gamma;
pub use gamma::*;

pub mod background;
pub use background::*;

#[cfg(feature = "dither")]
#[cfg_attr(docs_rs, doc(cfg(feature = "dither")))]
pub mod dither;
#[cfg(feature = "dither")]
pub use dither::*;

pub mod pipeline;
pub use pipeline::*;
