//! Timeline assembly against a target narration duration.
//!
//! A timeline is an ordered list of segments over an ordered clip pool.
//! One forward pass appends whole clips until the narration duration is
//! reached; if the pool runs out first, the pool is re-walked cyclically
//! and the final segment is trimmed so the total lands exactly on the
//! target. The two branches intentionally differ: the first may
//! overshoot by up to one clip, the second never does.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from timeline assembly.
#[derive(Debug, Error, PartialEq)]
pub enum AssemblyError {
    #[error("clip pool is empty")]
    EmptyPool,

    #[error("target duration must be positive, got {0}")]
    InvalidTarget(f64),

    #[error("clip duration must be positive and finite, got {0}")]
    InvalidClipDuration(f64),
}

/// A contiguous, possibly-trimmed slice of one pool clip.
///
/// `clip_index` points into the pool the timeline was assembled from;
/// `start` and `end` are offsets in seconds within that clip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub clip_index: usize,
    pub start: f64,
    pub end: f64,
}

impl Segment {
    /// Duration of this segment in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// True if the segment covers its clip end to end.
    pub fn is_whole(&self, clip_duration: f64) -> bool {
        self.start == 0.0 && (self.end - clip_duration).abs() < 1e-9
    }
}

/// An ordered sequence of segments forming the composite video track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    segments: Vec<Segment>,
}

impl Timeline {
    /// Assemble a timeline over a pool of clip `durations` (seconds, in
    /// pool order) covering at least `target` seconds of narration.
    ///
    /// First pass walks the pool in order, appending whole clips until
    /// the running total reaches the target; the clip that crosses the
    /// threshold is included whole, so this branch may overshoot. If the
    /// whole pool falls short, the pool is walked again from the start,
    /// cyclically, and the last segment is trimmed to `[0, remaining)`
    /// so the total equals the target exactly.
    pub fn assemble(durations: &[f64], target: f64) -> Result<Timeline, AssemblyError> {
        if durations.is_empty() {
            return Err(AssemblyError::EmptyPool);
        }
        if !target.is_finite() || target <= 0.0 {
            return Err(AssemblyError::InvalidTarget(target));
        }
        // A zero-length clip would spin the cyclic pass forever.
        if let Some(&bad) = durations.iter().find(|d| !d.is_finite() || **d <= 0.0) {
            return Err(AssemblyError::InvalidClipDuration(bad));
        }

        let mut segments = Vec::new();
        let mut total = 0.0_f64;

        // Forward pass: whole clips until the target is reached.
        for (index, &duration) in durations.iter().enumerate() {
            if total >= target {
                break;
            }
            segments.push(Segment {
                clip_index: index,
                start: 0.0,
                end: duration,
            });
            total += duration;
        }

        // Pool exhausted below target: loop from the start and trim the
        // final segment to land exactly on the target.
        if total < target {
            let mut remaining = target - total;
            let mut index = 0usize;
            while remaining > 0.0 {
                let clip_index = index % durations.len();
                let duration = durations[clip_index];
                if duration >= remaining {
                    segments.push(Segment {
                        clip_index,
                        start: 0.0,
                        end: remaining,
                    });
                    remaining = 0.0;
                } else {
                    segments.push(Segment {
                        clip_index,
                        start: 0.0,
                        end: duration,
                    });
                    remaining -= duration;
                }
                index += 1;
            }
        }

        Ok(Timeline { segments })
    }

    /// The segments in playback order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Total assembled duration in seconds.
    pub fn total_duration(&self) -> f64 {
        self.segments.iter().map(Segment::duration).sum()
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// True if the timeline has no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}
