//! Clip pool loading.
//!
//! Resolves the ordered pool for one group, opens each clip through the
//! group's session, and plans its normalization. A clip that fails to
//! open or probe is logged and skipped; only an empty surviving pool is
//! fatal to the group (decided by the caller).

use std::path::{Path, PathBuf};
use tracing::{info, warn};

use voxreel_media::{MediaSession, MemoryGovernor, MemoryProbe, SourceHandle, VideoInfo};
use voxreel_models::{AspectRatio, FramePlan};

use crate::error::EngineResult;

/// One successfully loaded and normalized pool clip.
#[derive(Debug)]
pub struct LoadedClip {
    pub handle: SourceHandle,
    pub info: VideoInfo,
    pub plan: FramePlan,
}

/// List the `.mp4` files of a pool directory in lexical filename
/// order.
///
/// The order is a plain string sort, not numeric: "10.mp4" sorts before
/// "2.mp4". Pool order is part of the output contract, so this must not
/// be "fixed" to a numeric sort.
pub fn list_clip_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("mp4")
        })
        .collect();
    files.sort_by_key(|path| path.file_name().map(|n| n.to_os_string()));
    Ok(files)
}

/// Load every clip of `dir` in pool order.
///
/// Before each clip the governor's hard watermark is consulted; a trip
/// pauses the load and compacts the session. Every third successful
/// load compacts unconditionally.
pub async fn load_pool<P: MemoryProbe>(
    session: &MediaSession,
    governor: &mut MemoryGovernor<P>,
    dir: &Path,
    ratio: AspectRatio,
) -> EngineResult<Vec<LoadedClip>> {
    let files = list_clip_files(dir)?;
    info!(pool = %dir.display(), candidates = files.len(), "Loading clip pool");

    let mut clips = Vec::with_capacity(files.len());
    for path in files {
        if let Some(cooldown) = governor.check_clip() {
            warn!(
                used_percent = cooldown.sample.system_used_percent,
                pause_secs = cooldown.pause.as_secs(),
                "Memory high before clip load, cooling down"
            );
            tokio::time::sleep(cooldown.pause).await;
            session.compact();
        }

        let handle = match session.open_video(&path).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!(clip = %path.display(), "Skipping clip that failed to open: {}", e);
                continue;
            }
        };

        let info = match handle.video_info() {
            Some(info) if info.width > 0 && info.height > 0 => info,
            _ => {
                warn!(clip = %path.display(), "Skipping clip with unusable geometry");
                continue;
            }
        };

        let plan = FramePlan::plan(info.width, info.height, ratio);
        info!(
            clip = %path.display(),
            duration = info.duration,
            src = format!("{}x{}", info.width, info.height),
            out = format!("{}x{}", plan.out_w(), plan.out_h()),
            "Loaded clip"
        );
        clips.push(LoadedClip { handle, info, plan });

        if governor.note_clip_loaded() {
            session.compact();
        }
    }

    Ok(clips)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_list_clip_files_is_lexical() {
        let dir = TempDir::new().unwrap();
        for name in ["2.mp4", "10.mp4", "1.mp4"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }

        let names: Vec<String> = list_clip_files(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        // Lexical, not numeric: "10" sorts before "2".
        assert_eq!(names, vec!["1.mp4", "10.mp4", "2.mp4"]);
    }

    #[test]
    fn test_list_clip_files_filters_extension() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.mp4"), b"").unwrap();
        std::fs::write(dir.path().join("b.mov"), b"").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"").unwrap();
        std::fs::create_dir(dir.path().join("sub.mp4")).unwrap();

        let files = list_clip_files(dir.path()).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("a.mp4"));
    }
}
