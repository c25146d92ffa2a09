use anyhow::Result;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::dispatch::DispatchOutcome;
use crate::frame::{self, MatchReport};
use crate::metadata::{self, TagMap};
use crate::shotlog::ShotLog;
use crate::tagger;

/// The result of one full tagging batch.
///
/// Per-file failures live in `outcomes`; they never abort the batch and,
/// by design, never change the process exit code — the report is how an
/// operator finds out what needs attention.
#[derive(Debug)]
pub struct BatchReport {
    /// Number of (frame file, sidecar) pairs submitted for tagging.
    pub submitted: usize,
    /// One outcome per tag-writer invocation, in launch order. Empty on a
    /// dry run.
    pub outcomes: Vec<DispatchOutcome>,
    /// Frame files whose index has no exposure record.
    pub unmatched: Vec<PathBuf>,
    /// Files with no derivable frame index.
    pub unindexed: Vec<PathBuf>,
    /// The merged tag mapping per frame index, shared by every file at
    /// that index.
    pub tag_maps: BTreeMap<u32, TagMap>,
}

impl BatchReport {
    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.succeeded()).count()
    }
}

/// Merge the roll template with each matched record's export, once per
/// frame index.
///
/// The export is computed once here and reused for every file sharing the
/// index, so a master scan and its derivatives receive identical mappings.
/// Record fields override template defaults on key collision.
pub fn build_tag_maps(
    log: &ShotLog,
    matched: &BTreeMap<u32, Vec<PathBuf>>,
) -> BTreeMap<u32, TagMap> {
    matched
        .keys()
        .filter_map(|&index| {
            let record = log.record(index)?;
            Some((index, metadata::merge(&log.template, &record.export())))
        })
        .collect()
}

/// Run the full batch: parse the shot log, match frames, build metadata,
/// and dispatch the tag-writer fan-out.
///
/// Fails only on startup conditions — a missing negatives directory or
/// shot log. Everything after that is contained at file granularity.
pub async fn run_batch(negatives_dir: &Path, log_file: &Path, config: &Config) -> Result<BatchReport> {
    let frames = frame::collect_frames(negatives_dir)?;
    let log = ShotLog::load(log_file)?;
    log::info!(
        "Shot log: {} template keys, {} records; {} frame files found",
        log.template.len(),
        log.records.len(),
        frames.len()
    );

    let MatchReport {
        matched,
        unmatched,
        unindexed,
    } = frame::match_frames(&frames, &log);

    let tag_maps = build_tag_maps(&log, &matched);
    let submitted: usize = matched.values().map(Vec::len).sum();

    let run = tagger::tag_batch(&matched, &tag_maps, config).await?;

    Ok(BatchReport {
        submitted,
        outcomes: run.outcomes,
        unmatched,
        unindexed,
        tag_maps,
    })
}
