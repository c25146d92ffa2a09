//! # negtag
//!
//! Batch EXIF tagger for scanned film negatives: match frame files to the
//! exposure records in a per-roll shot log, merge each record with the
//! roll-level template into a tag mapping, and burn the metadata into the
//! scans via concurrent `exiftool` invocations.
//!
//! A batch is best-effort by design — every per-file problem (a frame with
//! no record, a filename with no index, bad coordinates, a tag writer that
//! exits nonzero) is logged and contained, never fatal. Only a missing
//! negatives directory or shot log aborts a run.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use negtag::config::Config;
//! use negtag::pipeline::run_batch;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(Some("config.json".as_ref()))?;
//!
//!     let report = run_batch(
//!         Path::new("./negatives"),
//!         Path::new("./roll-12.tse"),
//!         &config,
//!     )
//!     .await?;
//!
//!     println!(
//!         "Submitted {} files, {} failed, {} unmatched",
//!         report.submitted,
//!         report.failed(),
//!         report.unmatched.len()
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Lower-Level Usage
//!
//! The stages compose individually for more control:
//!
//! ```rust,no_run
//! use negtag::frame::{collect_frames, match_frames};
//! use negtag::pipeline::build_tag_maps;
//! use negtag::shotlog::ShotLog;
//! use std::path::Path;
//!
//! # fn main() -> anyhow::Result<()> {
//! let log = ShotLog::load(Path::new("roll-12.tse"))?;
//! let frames = collect_frames(Path::new("./negatives"))?;
//!
//! let report = match_frames(&frames, &log);
//! for file in &report.unmatched {
//!     eprintln!("no exposure record for {}", file.display());
//! }
//!
//! let tag_maps = build_tag_maps(&log, &report.matched);
//! for (index, tags) in &tag_maps {
//!     println!("frame {index}: {} tags", tags.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Shot log format
//!
//! Plain UTF-8 text, one line per frame in capture order:
//!
//! ```text
//! #Make NIKON CORPORATION
//! #Model NIKON N2000
//! 5.6	1/500	105mm	sunset over the pier	2024-01-01	35.0,-118.2
//! ;frame voided, lens cap on
//! 8	1/250	105mm
//! ```
//!
//! `#KEY value` lines set roll-level template tags, `;` lines skip voided
//! frames, and everything else is a tab-separated record (fnumber, shutter
//! speed, focal length, comment, date, coordinates — trailing fields
//! optional, defaulting to `N/A`).
//!
//! ## Modules
//!
//! - [`shotlog`] — shot log parsing and per-record tag export
//! - [`frame`] — frame collection, index derivation, record matching
//! - [`metadata`] — the tag mapping type and ordered merge
//! - [`tagger`] — sidecar materialization and the tag-writer fan-out
//! - [`transcode`] — archival/preview conversions via ImageMagick
//! - [`dispatch`] — the shared fire-then-join child-process model
//! - [`pipeline`] — end-to-end batch orchestration
//! - [`config`] — configuration types and loading/saving
//! - [`error`] — the domain error taxonomy

pub mod config;
pub mod dispatch;
pub mod error;
pub mod frame;
pub mod metadata;
pub mod pipeline;
pub mod shotlog;
pub mod tagger;
pub mod transcode;

pub use error::Error;
