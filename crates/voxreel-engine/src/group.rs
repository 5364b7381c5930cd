//! Per-group processing: one narration track plus one clip pool in,
//! one composite out.
//!
//! Each group runs inside its own [`MediaSession`]. Whatever the
//! outcome, every handle opened during the group is released and the
//! session compacted before the result propagates; a failed group never
//! leaks decode state into the next one.

use std::path::Path;
use tracing::{debug, info, warn};

use voxreel_media::{
    compose_timeline, ComposeClip, MediaSession, MemoryGovernor, MemoryProbe, SourceHandle,
};
use voxreel_models::Timeline;

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::loader::{self, LoadedClip};

/// Process one group end to end.
pub async fn process_group<P: MemoryProbe>(
    config: &EngineConfig,
    index: usize,
    voice_path: &Path,
    clip_dir: &Path,
    output_path: &Path,
    governor: &mut MemoryGovernor<P>,
) -> EngineResult<()> {
    info!(
        group = index,
        voice = %voice_path.display(),
        pool = %clip_dir.display(),
        "Processing group"
    );

    let session = MediaSession::new();

    if let Some(cooldown) = governor.check_group() {
        warn!(
            group = index,
            used_percent = cooldown.sample.system_used_percent,
            pause_secs = cooldown.pause.as_secs(),
            "Memory high before group, cooling down"
        );
        tokio::time::sleep(cooldown.pause).await;
        session.compact();
    }
    governor.reset_group();

    let mut audio: Option<SourceHandle> = None;
    let mut clips: Vec<LoadedClip> = Vec::new();

    let result = run_group(
        config, index, voice_path, clip_dir, output_path, governor, &session, &mut audio,
        &mut clips,
    )
    .await;

    // Release everything the group opened, whatever happened above.
    release_group(&session, audio, clips);

    if result.is_ok() {
        info!(group = index, output = %output_path.display(), "Group complete");
    }
    result
}

/// Release every handle a group opened, then compact its session.
/// Outcomes are logged, never escalated.
fn release_group(session: &MediaSession, audio: Option<SourceHandle>, clips: Vec<LoadedClip>) {
    if let Some(mut handle) = audio {
        let outcome = handle.release();
        debug!(source = %handle.path().display(), ?outcome, "Narration handle released");
    }
    for mut clip in clips {
        let outcome = clip.handle.release();
        debug!(source = %clip.handle.path().display(), ?outcome, "Clip handle released");
    }
    let stats = session.compact();
    debug!(
        evicted = stats.evicted_probes,
        swept = stats.swept_scratch_files,
        "Group session compacted"
    );
}

#[allow(clippy::too_many_arguments)]
async fn run_group<P: MemoryProbe>(
    config: &EngineConfig,
    index: usize,
    voice_path: &Path,
    clip_dir: &Path,
    output_path: &Path,
    governor: &mut MemoryGovernor<P>,
    session: &MediaSession,
    audio: &mut Option<SourceHandle>,
    clips: &mut Vec<LoadedClip>,
) -> EngineResult<()> {
    let narration = session.open_audio(voice_path).await?;
    let target = narration.duration();
    *audio = Some(narration);
    info!(group = index, target_secs = target, "Narration probed");

    *clips = loader::load_pool(session, governor, clip_dir, config.target_ratio).await?;
    if clips.is_empty() {
        return Err(EngineError::EmptyPool { group: index });
    }

    let durations: Vec<f64> = clips.iter().map(|c| c.info.duration).collect();
    let timeline = Timeline::assemble(&durations, target)?;
    info!(
        group = index,
        segments = timeline.len(),
        duration = timeline.total_duration(),
        "Timeline assembled"
    );

    let pool: Vec<ComposeClip> = clips
        .iter()
        .map(|c| ComposeClip {
            path: c.handle.path().to_path_buf(),
            plan: c.plan,
            duration: c.info.duration,
        })
        .collect();

    compose_timeline(&pool, &timeline, voice_path, output_path, &config.encoding).await?;
    Ok(())
}
