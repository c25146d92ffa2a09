use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::config::Config;
use crate::dispatch::{self, DispatchOutcome, Launch};
use crate::metadata::TagMap;

/// The result of a tagging batch.
#[derive(Debug)]
pub struct TagRun {
    /// One outcome per (frame file, sidecar) invocation, in launch order.
    pub outcomes: Vec<DispatchOutcome>,
    /// Paths of the sidecars that were materialized for this run. All of
    /// them are removed by the time `tag_batch` returns.
    pub sidecars: Vec<PathBuf>,
}

/// Materialize one JSON sidecar per tag mapping and dispatch one tag-writer
/// invocation per frame file, all concurrently.
///
/// A mapping is computed once per frame index and its sidecar is shared by
/// every file at that index (master + derivatives), so siblings receive
/// byte-identical metadata. Sidecars are written before any child is
/// launched and removed after every child has been joined — on every exit
/// path, failures included, since the [`NamedTempFile`] handles own the
/// files until then.
///
/// In dry-run mode the would-be command lines are logged and nothing is
/// spawned.
pub async fn tag_batch(
    matched: &BTreeMap<u32, Vec<PathBuf>>,
    tag_maps: &BTreeMap<u32, TagMap>,
    config: &Config,
) -> Result<TagRun> {
    // Sidecar pass: one transient file per distinct mapping. The handles
    // keep the files alive (and guarantee their removal) for the whole run.
    let mut sidecars: BTreeMap<u32, NamedTempFile> = BTreeMap::new();
    for (&index, tags) in tag_maps {
        if !matched.contains_key(&index) {
            continue;
        }
        let mut sidecar = tempfile::Builder::new()
            .prefix("negtag-")
            .suffix(".json")
            .tempfile()
            .context("Failed to create metadata sidecar")?;
        serde_json::to_writer(&mut sidecar, tags)
            .context("Failed to serialize metadata sidecar")?;
        sidecar.flush().context("Failed to flush metadata sidecar")?;
        log::debug!("Sidecar for frame {index}: {}", sidecar.path().display());
        sidecars.insert(index, sidecar);
    }

    let mut launches = Vec::new();
    for (index, files) in matched {
        let Some(sidecar) = sidecars.get(index) else {
            continue;
        };
        for file in files {
            launches.push(tag_launch(file, sidecar.path(), config)?);
        }
    }

    log::info!("Tagging {} files", launches.len());

    let sidecar_paths: Vec<PathBuf> = sidecars.values().map(|s| s.path().to_path_buf()).collect();

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
        drop(sidecars);
        return Ok(TagRun {
            outcomes: Vec::new(),
            sidecars: sidecar_paths,
        });
    }

    let outcomes = dispatch::dispatch_all(launches, config.invocation_timeout()).await;

    // Cleanup pass: every wait has completed, delete the sidecars. The
    // existence check makes the delete idempotent; RAII would reclaim them
    // anyway if this is never reached.
    for (index, sidecar) in sidecars {
        if sidecar.path().exists() {
            if let Err(e) = sidecar.close() {
                log::warn!("Failed to remove sidecar for frame {index}: {e}");
            }
        }
    }

    Ok(TagRun {
        outcomes,
        sidecars: sidecar_paths,
    })
}

/// Build the tag-writer invocation for one (frame file, sidecar) pair:
/// `exiftool -m -q -j=<sidecar> <absolute frame path>`.
fn tag_launch(file: &Path, sidecar: &Path, config: &Config) -> Result<Launch> {
    let absolute = std::path::absolute(file)
        .with_context(|| format!("Failed to resolve {}", file.display()))?;

    let mut json_arg = OsString::from("-j=");
    json_arg.push(sidecar);

    Ok(Launch {
        program: config.tools.exiftool.clone(),
        args: vec![
            OsString::from("-m"),
            OsString::from("-q"),
            json_arg,
            absolute.into_os_string(),
        ],
        target: file.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn tag_map(pairs: &[(&str, &str)]) -> TagMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn fixture(dir: &TempDir, names: &[&str]) -> BTreeMap<u32, Vec<PathBuf>> {
        let mut matched: BTreeMap<u32, Vec<PathBuf>> = BTreeMap::new();
        for (i, name) in names.iter().enumerate() {
            let path = dir.path().join(name);
            fs::write(&path, b"scan").unwrap();
            matched.entry(i as u32 + 1).or_default().push(path);
        }
        matched
    }

    fn config_with_writer(writer: &str) -> Config {
        let mut config = Config::default();
        config.tools.exiftool = writer.to_string();
        config
    }

    #[tokio::test]
    async fn one_invocation_per_file_sidecars_cleaned() {
        let dir = TempDir::new().unwrap();
        let matched = fixture(&dir, &["A0001.tif", "A0002.tif"]);
        let tag_maps: BTreeMap<u32, TagMap> = [
            (1, tag_map(&[("Make", "Example")])),
            (2, tag_map(&[("Make", "Example")])),
        ]
        .into();

        let run = tag_batch(&matched, &tag_maps, &config_with_writer("true"))
            .await
            .unwrap();

        assert_eq!(run.outcomes.len(), 2);
        assert!(run.outcomes.iter().all(|o| o.succeeded()));
        assert_eq!(run.sidecars.len(), 2);
        for sidecar in &run.sidecars {
            assert!(!sidecar.exists(), "sidecar left behind: {}", sidecar.display());
        }
    }

    #[tokio::test]
    async fn files_sharing_an_index_share_one_sidecar() {
        let dir = TempDir::new().unwrap();
        let master = dir.path().join("A0001.tif");
        let preview = dir.path().join("A0001.jpg");
        fs::write(&master, b"scan").unwrap();
        fs::write(&preview, b"scan").unwrap();

        let matched: BTreeMap<u32, Vec<PathBuf>> =
            [(1, vec![master.clone(), preview.clone()])].into();
        let tag_maps: BTreeMap<u32, TagMap> = [(1, tag_map(&[("Make", "Example")]))].into();

        let run = tag_batch(&matched, &tag_maps, &config_with_writer("true"))
            .await
            .unwrap();

        assert_eq!(run.outcomes.len(), 2);
        assert_eq!(run.sidecars.len(), 1);
    }

    #[tokio::test]
    async fn failed_invocations_do_not_skip_cleanup() {
        let dir = TempDir::new().unwrap();
        let matched = fixture(&dir, &["A0001.tif", "A0002.tif"]);
        let tag_maps: BTreeMap<u32, TagMap> = [
            (1, tag_map(&[("Make", "Example")])),
            (2, tag_map(&[("Make", "Example")])),
        ]
        .into();

        let run = tag_batch(&matched, &tag_maps, &config_with_writer("false"))
            .await
            .unwrap();

        assert_eq!(run.outcomes.len(), 2);
        assert!(run.outcomes.iter().all(|o| !o.succeeded()));
        for sidecar in &run.sidecars {
            assert!(!sidecar.exists());
        }
    }

    #[tokio::test]
    async fn dry_run_spawns_nothing() {
        let dir = TempDir::new().unwrap();
        let matched = fixture(&dir, &["A0001.tif"]);
        let tag_maps: BTreeMap<u32, TagMap> = [(1, tag_map(&[("Make", "Example")]))].into();

        // A tag writer that would fail loudly if it were ever launched.
        let mut config = config_with_writer("/nonexistent/tagwriter");
        config.output.dry_run = true;

        let run = tag_batch(&matched, &tag_maps, &config).await.unwrap();
        assert!(run.outcomes.is_empty());
        for sidecar in &run.sidecars {
            assert!(!sidecar.exists());
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn sidecar_holds_the_serialized_mapping() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let matched = fixture(&dir, &["A0001.tif"]);
        let tag_maps: BTreeMap<u32, TagMap> =
            [(1, tag_map(&[("Make", "Example"), ("FNumber", "5.6")]))].into();

        // A fake tag writer that captures the sidecar it was pointed at.
        let captured = dir.path().join("captured.json");
        let writer = dir.path().join("fake-exiftool");
        fs::write(
            &writer,
            format!(
                "#!/bin/sh\nfor a in \"$@\"; do case \"$a\" in -j=*) cp \"${{a#-j=}}\" \"{}\";; esac; done\n",
                captured.display()
            ),
        )
        .unwrap();
        fs::set_permissions(&writer, fs::Permissions::from_mode(0o755)).unwrap();

        let run = tag_batch(&matched, &tag_maps, &config_with_writer(writer.to_str().unwrap()))
            .await
            .unwrap();
        assert!(run.outcomes[0].succeeded());

        let contents = fs::read_to_string(&captured).unwrap();
        let parsed: TagMap = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed, tag_maps[&1]);
    }

    #[tokio::test]
    async fn index_without_files_gets_no_sidecar() {
        let dir = TempDir::new().unwrap();
        let matched = fixture(&dir, &["A0001.tif"]);
        let tag_maps: BTreeMap<u32, TagMap> = [
            (1, tag_map(&[("Make", "Example")])),
            // Record 2 exists in the log but no frame was scanned.
            (2, tag_map(&[("Make", "Example")])),
        ]
        .into();

        let run = tag_batch(&matched, &tag_maps, &config_with_writer("true"))
            .await
            .unwrap();
        assert_eq!(run.outcomes.len(), 1);
        assert_eq!(run.sidecars.len(), 1);
    }
}
