//! Batch discovery and the sequential batch driver.

use std::path::{Path, PathBuf};
use tracing::{info, warn};

use voxreel_media::MemoryGovernor;

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::group;

/// One discovered group: a narration track paired with a clip pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSpec {
    /// Zero-based position in the batch; names the output file.
    pub index: usize,
    pub voice: PathBuf,
    pub clip_dir: PathBuf,
}

/// Outcome counters for a completed batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// Pair narration tracks with clip pools by sorted position.
///
/// Tracks sort by numeric stem when every stem parses as an integer
/// ("2.mp3" before "10.mp3"), lexically otherwise; pool directories the
/// same way. A count mismatch truncates to the shorter side with a
/// warning, so trailing unmatched entries are silently skipped beyond
/// that log line.
pub fn discover_groups(voices_dir: &Path, videos_dir: &Path) -> EngineResult<Vec<GroupSpec>> {
    let mut voices: Vec<PathBuf> = std::fs::read_dir(voices_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("mp3")
        })
        .collect();
    sort_by_stem(&mut voices);

    let mut pools: Vec<PathBuf> = std::fs::read_dir(videos_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    sort_by_stem(&mut pools);

    if voices.len() != pools.len() {
        warn!(
            voices = voices.len(),
            pools = pools.len(),
            "Narration/pool count mismatch, truncating to the shorter side"
        );
    }

    Ok(voices
        .into_iter()
        .zip(pools)
        .enumerate()
        .map(|(index, (voice, clip_dir))| GroupSpec {
            index,
            voice,
            clip_dir,
        })
        .collect())
}

/// Sort paths by file stem: numerically when every stem is an integer,
/// lexically otherwise.
fn sort_by_stem(paths: &mut [PathBuf]) {
    let numeric: Option<Vec<u64>> = paths
        .iter()
        .map(|p| stem(p).parse::<u64>().ok())
        .collect();
    match numeric {
        Some(keys) => {
            let mut keyed: Vec<(u64, PathBuf)> =
                keys.into_iter().zip(paths.iter().cloned()).collect();
            keyed.sort_by_key(|(k, _)| *k);
            for (slot, (_, path)) in paths.iter_mut().zip(keyed) {
                *slot = path;
            }
        }
        None => paths.sort_by_key(|p| stem(p).to_string()),
    }
}

fn stem(path: &Path) -> &str {
    path.file_stem().and_then(|s| s.to_str()).unwrap_or("")
}

/// Run the whole batch sequentially.
///
/// A missing batch tree is fatal; any single group failure is logged,
/// counted, and skipped so the remaining groups still run.
pub async fn run_batch(config: &EngineConfig) -> EngineResult<BatchSummary> {
    let voices_dir = config.voices_dir();
    let videos_dir = config.videos_dir();
    for dir in [&voices_dir, &videos_dir] {
        if !dir.is_dir() {
            return Err(EngineError::config(format!(
                "Batch directory does not exist: {}",
                dir.display()
            )));
        }
    }

    let output_dir = config.output_dir();
    std::fs::create_dir_all(&output_dir)?;

    let groups = discover_groups(&voices_dir, &videos_dir)?;
    info!(groups = groups.len(), batch = %config.batch_dir().display(), "Batch discovered");

    let mut governor = MemoryGovernor::new(config.governor.clone());
    let mut summary = BatchSummary::default();

    for spec in &groups {
        let output = output_dir.join(format!("{}.mp4", spec.index));
        match group::process_group(
            config,
            spec.index,
            &spec.voice,
            &spec.clip_dir,
            &output,
            &mut governor,
        )
        .await
        {
            Ok(()) => summary.succeeded += 1,
            Err(e) => {
                warn!(group = spec.index, "Group failed: {}", e);
                summary.failed += 1;
            }
        }
    }

    info!(
        succeeded = summary.succeeded,
        failed = summary.failed,
        "Batch complete"
    );
    Ok(summary)
}
