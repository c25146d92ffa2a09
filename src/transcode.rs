use anyhow::Result;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::dispatch::{self, DispatchOutcome, Launch};
use crate::error::Error;
use crate::frame;

/// Convert every `.tif` scan in a directory: one lossless LZW `.tiff`
/// archival copy and one half-resolution `.jpg` preview, both written as
/// siblings of the source.
///
/// Conversions run as concurrent transcoder (ImageMagick) invocations with
/// the same fire-then-join model as tagging. A scan whose dimensions cannot
/// be read is logged and skipped; a failed conversion is logged and never
/// cancels its siblings.
pub async fn transcode_batch(dir: &Path, config: &Config) -> Result<Vec<DispatchOutcome>> {
    if !dir.is_dir() {
        return Err(Error::MissingDirectory(dir.to_path_buf()).into());
    }

    let mut launches = Vec::new();
    for source in frame::collect_frames(dir)? {
        if source
            .extension()
            .and_then(|e| e.to_str())
            .is_none_or(|e| !e.eq_ignore_ascii_case("tif"))
        {
            continue;
        }

        // Preview geometry needs the source dimensions up front.
        let (width, height) = match image::image_dimensions(&source) {
            Ok(dims) => dims,
            Err(e) => {
                log::error!("Skipping {}: cannot read dimensions: {e}", source.display());
                continue;
            }
        };

        log::debug!("Converting '{}' ({width}x{height})", source.display());
        let (archival, preview) = conversion_launches(&source, width, height, config)?;
        launches.push(archival);
        launches.push(preview);
    }

    log::info!("Dispatching {} conversions", launches.len());

    if config.output.dry_run {
        for launch in &launches {
            log::info!(
                "DRY RUN: {} {}",
                launch.program,
                launch
                    .args
                    .iter()
                    .map(|a| a.to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join(" ")
            );
        }
        return Ok(Vec::new());
    }

    Ok(dispatch::dispatch_all(launches, config.invocation_timeout()).await)
}

/// Build the archival and preview invocations for one source scan.
fn conversion_launches(
    source: &Path,
    width: u32,
    height: u32,
    config: &Config,
) -> Result<(Launch, Launch)> {
    let absolute = std::path::absolute(source)?;

    // `[0]` selects the first page of a multi-page scan.
    let mut first_page = absolute.clone().into_os_string();
    first_page.push("[0]");

    let archival = Launch {
        program: config.tools.magick.clone(),
        args: vec![
            first_page.clone(),
            OsString::from("-compress"),
            OsString::from("lzw"),
            archival_path(source).into_os_string(),
        ],
        target: source.to_path_buf(),
    };

    let preview = Launch {
        program: config.tools.magick.clone(),
        args: vec![
            first_page,
            OsString::from("-resize"),
            OsString::from(format!("{}x{}", width / 2, height / 2)),
            preview_path(source).into_os_string(),
        ],
        target: source.to_path_buf(),
    };

    Ok((archival, preview))
}

/// Sibling output path for the archival copy.
pub fn archival_path(source: &Path) -> PathBuf {
    source.with_extension("tiff")
}

/// Sibling output path for the half-resolution preview.
pub fn preview_path(source: &Path) -> PathBuf {
    source.with_extension("jpg")
}
