//! # exif-sweep
//!
//! Bulk EXIF metadata remover. Every tag is dropped except a configurable
//! preserve list of the tags that affect how an image is decoded or shown
//! (dimensions, compression, resolution, orientation, ...).
//!
//! ## Quick Start
//!
//! The simplest way to use the library is through a [`Pipeline`](pipeline::Pipeline),
//! which sweeps every recognized image in a folder:
//!
//! ```rust,no_run
//! use exif_sweep::pipeline::{BatchSummary, Pipeline};
//!
//! fn main() -> anyhow::Result<()> {
//!     let pipeline = Pipeline::builder()
//!         .input("./photos")
//!         .output("./clean")
//!         .build()?;
//!
//!     let outcomes = pipeline.run()?;
//!     for outcome in &outcomes {
//!         if outcome.is_failed() {
//!             eprintln!("Failed: {}", outcome.path.display());
//!         }
//!     }
//!     println!("{}", BatchSummary::from(&outcomes));
//!     Ok(())
//! }
//! ```
//!
//! ## Lower-Level Usage
//!
//! For a single image, build a [`Sweeper`](sweeper::Sweeper) and call it
//! directly:
//!
//! ```rust,no_run
//! use exif_sweep::config::Config;
//! use exif_sweep::picture::Image;
//!
//! fn main() -> anyhow::Result<()> {
//!     let sweeper = Config::load(Some("config.json".as_ref()))?.sweeper();
//!     let image = Image::open("photo.jpg".as_ref())?;
//!
//!     // What would be removed?
//!     for row in sweeper.describe(&image) {
//!         println!("{:<8} {:<28} {:<5} {}", row.ifd.name(), row.name, row.kept, row.value);
//!     }
//!
//!     let (clean, report) = sweeper.strip_metadata(&image)?;
//!     println!("Removed {} tags", report.removed().count());
//!     clean.save("photo-clean.jpg".as_ref())?;
//!     Ok(())
//! }
//! ```
//!
//! ## Supported Formats
//!
//! | Format | Handling |
//! |--------|----------|
//! | JPEG (`.jpg`, `.jpeg`) | EXIF APP1 segment filtered; picture data untouched |
//! | PNG (`.png`) | `eXIf` chunk filtered; picture data untouched |
//! | WebP (single-file only) | `EXIF` chunk filtered; picture data untouched |
//! | TIFF, BMP, GIF | Re-encoded from decoded pixels; no metadata is written |
//!
//! ## Modules
//!
//! - [`config`]: configuration file (folders, preserve list, dry run)
//! - [`error`]: the [`SweepError`](error::SweepError) taxonomy
//! - [`exif`]: EXIF block decoding, encoding, and tag names
//! - [`picture`]: loading, re-encoding, and saving one image
//! - [`sweeper`]: tag filtering and inspection
//! - [`pipeline`]: batch sweeps over a folder

pub mod config;
pub mod error;
pub mod exif;
pub mod picture;
pub mod pipeline;
pub mod sweeper;
