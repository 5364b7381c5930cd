//! FFmpeg CLI backend for the Voxreel assembly engine.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building with multi-input support
//! - FFprobe-based source probing
//! - Per-group backend sessions with handle lifecycle and compaction
//! - The memory pressure governor
//! - Timeline composition (concat + audio replacement + encode)

pub mod command;
pub mod compose;
pub mod error;
pub mod filters;
pub mod memory;
pub mod probe;
pub mod session;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use compose::{build_compose_command, compose_timeline, ComposeClip};
pub use error::{MediaError, MediaResult};
pub use memory::{
    Cooldown, GovernorConfig, MemoryGovernor, MemoryProbe, MemorySample, SystemMemoryProbe,
};
pub use probe::{probe_duration, probe_video, VideoInfo};
pub use session::{CompactionStats, MediaSession, ReleaseOutcome, SourceHandle, SourceKind};
