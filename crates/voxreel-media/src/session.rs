//! Backend session and handle lifecycle.
//!
//! A [`MediaSession`] scopes one group's decode handles: every source
//! opened through it is registered until released, probe results are
//! cached per path, and [`MediaSession::compact`] drops cached state
//! that no live handle still references. Handles release through
//! [`SourceHandle::release`] or, as a backstop, on drop; the release
//! hook runs at most once per handle and never errors.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::MediaResult;
use crate::probe::{self, VideoInfo};

/// What a handle points at.
#[derive(Debug, Clone, Copy)]
pub enum SourceKind {
    /// A video clip with probed geometry.
    Video(VideoInfo),
    /// An audio-only source (narration track).
    Audio { duration: f64 },
}

/// Outcome of releasing a handle. Informational only; never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    Released,
    AlreadyReleased,
}

/// Counters from one compaction pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompactionStats {
    pub evicted_probes: usize,
    pub swept_scratch_files: usize,
}

#[derive(Debug, Clone)]
enum ProbeEntry {
    Video(VideoInfo),
    Duration(f64),
}

#[derive(Debug, Default)]
struct SessionInner {
    next_id: u64,
    /// Live handle id -> source path
    live: HashMap<u64, PathBuf>,
    probe_cache: HashMap<PathBuf, ProbeEntry>,
    scratch: Option<PathBuf>,
}

impl SessionInner {
    fn register(&mut self, path: &Path) -> u64 {
        self.next_id += 1;
        self.live.insert(self.next_id, path.to_path_buf());
        self.next_id
    }

    fn deregister(&mut self, id: u64) -> bool {
        self.live.remove(&id).is_some()
    }
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        if let Some(scratch) = self.scratch.take() {
            if let Err(e) = std::fs::remove_dir_all(&scratch) {
                warn!(path = %scratch.display(), "Failed to remove scratch dir: {}", e);
            }
        }
    }
}

/// A per-group backend session. One session per group; handles never
/// cross sessions.
#[derive(Clone, Default)]
pub struct MediaSession {
    inner: Arc<Mutex<SessionInner>>,
}

impl MediaSession {
    /// Create a new, empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a video source: probe (cached per path) and register a handle.
    pub async fn open_video(&self, path: impl AsRef<Path>) -> MediaResult<SourceHandle> {
        let path = path.as_ref();

        let cached = {
            let inner = self.inner.lock().expect("session lock poisoned");
            match inner.probe_cache.get(path) {
                Some(ProbeEntry::Video(info)) => Some(*info),
                _ => None,
            }
        };

        let info = match cached {
            Some(info) => info,
            None => {
                let info = probe::probe_video(path).await?;
                self.inner
                    .lock()
                    .expect("session lock poisoned")
                    .probe_cache
                    .insert(path.to_path_buf(), ProbeEntry::Video(info));
                info
            }
        };

        Ok(self.register_handle(path, SourceKind::Video(info)))
    }

    /// Open an audio source: duration-only probe plus registration.
    pub async fn open_audio(&self, path: impl AsRef<Path>) -> MediaResult<SourceHandle> {
        let path = path.as_ref();

        let cached = {
            let inner = self.inner.lock().expect("session lock poisoned");
            match inner.probe_cache.get(path) {
                Some(ProbeEntry::Duration(d)) => Some(*d),
                _ => None,
            }
        };

        let duration = match cached {
            Some(d) => d,
            None => {
                let d = probe::probe_duration(path).await?;
                self.inner
                    .lock()
                    .expect("session lock poisoned")
                    .probe_cache
                    .insert(path.to_path_buf(), ProbeEntry::Duration(d));
                d
            }
        };

        Ok(self.register_handle(path, SourceKind::Audio { duration }))
    }

    fn register_handle(&self, path: &Path, kind: SourceKind) -> SourceHandle {
        let id = self
            .inner
            .lock()
            .expect("session lock poisoned")
            .register(path);
        SourceHandle {
            id,
            path: path.to_path_buf(),
            kind,
            session: Arc::clone(&self.inner),
            released: false,
        }
    }

    /// Release decode state no live handle references: evict orphaned
    /// probe cache entries and sweep loose scratch files.
    pub fn compact(&self) -> CompactionStats {
        let mut stats = CompactionStats::default();
        let mut inner = self.inner.lock().expect("session lock poisoned");

        let live_paths: Vec<PathBuf> = inner.live.values().cloned().collect();
        let before = inner.probe_cache.len();
        inner
            .probe_cache
            .retain(|path, _| live_paths.iter().any(|p| p == path));
        stats.evicted_probes = before - inner.probe_cache.len();

        if let Some(scratch) = inner.scratch.clone() {
            if let Ok(entries) = std::fs::read_dir(&scratch) {
                for entry in entries.flatten() {
                    if std::fs::remove_file(entry.path()).is_ok() {
                        stats.swept_scratch_files += 1;
                    }
                }
            }
        }

        debug!(
            evicted = stats.evicted_probes,
            swept = stats.swept_scratch_files,
            "Session compacted"
        );
        stats
    }

    /// Scratch directory for transient files, created on first use and
    /// removed when the session's last owner drops.
    pub fn scratch_dir(&self) -> MediaResult<PathBuf> {
        let mut inner = self.inner.lock().expect("session lock poisoned");
        if let Some(dir) = &inner.scratch {
            return Ok(dir.clone());
        }
        let dir = std::env::temp_dir().join(format!("voxreel_{}", Uuid::new_v4().simple()));
        std::fs::create_dir_all(&dir)?;
        inner.scratch = Some(dir.clone());
        Ok(dir)
    }

    /// Number of handles currently registered.
    pub fn live_handles(&self) -> usize {
        self.inner.lock().expect("session lock poisoned").live.len()
    }

    /// Number of cached probe results.
    pub fn cached_probes(&self) -> usize {
        self.inner
            .lock()
            .expect("session lock poisoned")
            .probe_cache
            .len()
    }

    /// Register a handle with a pre-supplied probe result, bypassing
    /// ffprobe. Test support only.
    #[cfg(any(test, feature = "test-util"))]
    pub fn open_probed(&self, path: impl AsRef<Path>, info: VideoInfo) -> SourceHandle {
        let path = path.as_ref();
        self.inner
            .lock()
            .expect("session lock poisoned")
            .probe_cache
            .insert(path.to_path_buf(), ProbeEntry::Video(info));
        self.register_handle(path, SourceKind::Video(info))
    }
}

/// An open decode handle scoped to its session.
#[derive(Debug)]
pub struct SourceHandle {
    id: u64,
    path: PathBuf,
    kind: SourceKind,
    session: Arc<Mutex<SessionInner>>,
    released: bool,
}

impl SourceHandle {
    /// Source file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Probed video information, if this is a video handle.
    pub fn video_info(&self) -> Option<VideoInfo> {
        match self.kind {
            SourceKind::Video(info) => Some(info),
            SourceKind::Audio { .. } => None,
        }
    }

    /// Source duration in seconds.
    pub fn duration(&self) -> f64 {
        match self.kind {
            SourceKind::Video(info) => info.duration,
            SourceKind::Audio { duration } => duration,
        }
    }

    /// Release this handle. Best-effort and idempotent: the second and
    /// later calls report [`ReleaseOutcome::AlreadyReleased`].
    pub fn release(&mut self) -> ReleaseOutcome {
        if self.released {
            return ReleaseOutcome::AlreadyReleased;
        }
        self.released = true;
        match self.session.lock() {
            Ok(mut inner) => {
                inner.deregister(self.id);
            }
            Err(_) => warn!(path = %self.path.display(), "Session lock poisoned during release"),
        }
        ReleaseOutcome::Released
    }
}

impl Drop for SourceHandle {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> VideoInfo {
        VideoInfo {
            duration: 4.0,
            width: 1920,
            height: 1080,
        }
    }

    #[test]
    fn test_release_is_idempotent() {
        let session = MediaSession::new();
        let mut handle = session.open_probed("a.mp4", info());
        assert_eq!(session.live_handles(), 1);

        assert_eq!(handle.release(), ReleaseOutcome::Released);
        assert_eq!(session.live_handles(), 0);
        assert_eq!(handle.release(), ReleaseOutcome::AlreadyReleased);
        assert_eq!(session.live_handles(), 0);
    }

    #[test]
    fn test_drop_releases_exactly_once() {
        let session = MediaSession::new();
        {
            let _handle = session.open_probed("a.mp4", info());
            assert_eq!(session.live_handles(), 1);
        }
        assert_eq!(session.live_handles(), 0);

        // Explicit release followed by drop must not double-deregister.
        let other = session.open_probed("b.mp4", info());
        let mut handle = session.open_probed("a.mp4", info());
        handle.release();
        drop(handle);
        assert_eq!(session.live_handles(), 1);
        drop(other);
        assert_eq!(session.live_handles(), 0);
    }

    #[test]
    fn test_compact_evicts_only_orphaned_probes() {
        let session = MediaSession::new();
        let live = session.open_probed("keep.mp4", info());
        let mut gone = session.open_probed("evict.mp4", info());
        assert_eq!(session.cached_probes(), 2);

        gone.release();
        let stats = session.compact();
        assert_eq!(stats.evicted_probes, 1);
        assert_eq!(session.cached_probes(), 1);

        drop(live);
        let stats = session.compact();
        assert_eq!(stats.evicted_probes, 1);
        assert_eq!(session.cached_probes(), 0);
    }

    #[test]
    fn test_scratch_dir_sweep_and_cleanup() {
        let scratch;
        {
            let session = MediaSession::new();
            scratch = session.scratch_dir().unwrap();
            assert!(scratch.is_dir());
            std::fs::write(scratch.join("loose.bin"), b"x").unwrap();

            let stats = session.compact();
            assert_eq!(stats.swept_scratch_files, 1);
            assert!(!scratch.join("loose.bin").exists());
        }
        assert!(!scratch.exists(), "scratch dir must go with the session");
    }
}
