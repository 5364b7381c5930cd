//! Memory pressure governor.
//!
//! The governor is the backpressure valve between the batch driver and
//! the decode/encode backend. It samples system memory at two check
//! points — once before a group's load phase (soft watermark) and once
//! before each clip load (hard watermark) — and answers with a cooldown
//! directive when a watermark is crossed. Independently of pressure,
//! every third successful clip load requests a compaction pass.
//!
//! The governor only decides; the caller sleeps and compacts, which
//! keeps the decision logic synchronous and testable.

use std::time::Duration;
use tracing::debug;

/// A point-in-time memory reading. Recomputed on demand, never stored.
#[derive(Debug, Clone, Copy)]
pub struct MemorySample {
    /// Resident set size of this process, in bytes.
    pub process_resident_bytes: u64,
    /// System-wide used memory as a percentage of total.
    pub system_used_percent: f64,
}

/// Source of memory samples. Production uses [`SystemMemoryProbe`];
/// tests script the sequence.
pub trait MemoryProbe {
    fn sample(&mut self) -> MemorySample;
}

/// Live sampling through `sysinfo`.
pub struct SystemMemoryProbe {
    system: sysinfo::System,
}

impl SystemMemoryProbe {
    pub fn new() -> Self {
        Self {
            system: sysinfo::System::new(),
        }
    }
}

impl Default for SystemMemoryProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProbe for SystemMemoryProbe {
    fn sample(&mut self) -> MemorySample {
        self.system.refresh_memory();
        let total = self.system.total_memory();
        let used = self.system.used_memory();
        let system_used_percent = if total > 0 {
            used as f64 / total as f64 * 100.0
        } else {
            0.0
        };

        let process_resident_bytes = sysinfo::get_current_pid()
            .ok()
            .and_then(|pid| {
                self.system
                    .refresh_processes(sysinfo::ProcessesToUpdate::Some(&[pid]), true);
                self.system.process(pid).map(|p| p.memory())
            })
            .unwrap_or(0);

        MemorySample {
            process_resident_bytes,
            system_used_percent,
        }
    }
}

/// Governor thresholds and cooldown lengths.
#[derive(Debug, Clone)]
pub struct GovernorConfig {
    /// Watermark checked once before each group's load phase (percent).
    pub soft_threshold: f64,
    /// Watermark checked before each individual clip load (percent).
    pub hard_threshold: f64,
    /// Cooldown after tripping the soft watermark.
    pub soft_cooldown: Duration,
    /// Cooldown after tripping the hard watermark.
    pub hard_cooldown: Duration,
    /// Unconditional compaction cadence: every Nth loaded clip.
    pub compact_every: u32,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            soft_threshold: 80.0,
            hard_threshold: 85.0,
            soft_cooldown: Duration::from_secs(5),
            hard_cooldown: Duration::from_secs(3),
            compact_every: 3,
        }
    }
}

/// A cooldown directive: pause this long, then compact.
#[derive(Debug, Clone, Copy)]
pub struct Cooldown {
    pub pause: Duration,
    pub sample: MemorySample,
}

/// Watermark-driven backpressure against the decode/encode backend.
pub struct MemoryGovernor<P> {
    config: GovernorConfig,
    probe: P,
    loaded_clips: u32,
}

impl MemoryGovernor<SystemMemoryProbe> {
    /// Governor with live system sampling.
    pub fn new(config: GovernorConfig) -> Self {
        Self::with_probe(config, SystemMemoryProbe::new())
    }
}

impl<P: MemoryProbe> MemoryGovernor<P> {
    /// Governor with an explicit probe (tests use scripted samples).
    pub fn with_probe(config: GovernorConfig, probe: P) -> Self {
        Self {
            config,
            probe,
            loaded_clips: 0,
        }
    }

    /// Soft-watermark check before a group's load phase.
    pub fn check_group(&mut self) -> Option<Cooldown> {
        self.check(self.config.soft_threshold, self.config.soft_cooldown)
    }

    /// Hard-watermark check before one clip load.
    pub fn check_clip(&mut self) -> Option<Cooldown> {
        self.check(self.config.hard_threshold, self.config.hard_cooldown)
    }

    fn check(&mut self, threshold: f64, pause: Duration) -> Option<Cooldown> {
        let sample = self.probe.sample();
        if sample.system_used_percent > threshold {
            debug!(
                used_percent = sample.system_used_percent,
                threshold, "Memory watermark exceeded"
            );
            Some(Cooldown { pause, sample })
        } else {
            None
        }
    }

    /// Record one successful clip load; true on every Nth load, asking
    /// the caller for an unconditional compaction pass.
    pub fn note_clip_loaded(&mut self) -> bool {
        self.loaded_clips += 1;
        self.config.compact_every > 0 && self.loaded_clips % self.config.compact_every == 0
    }

    /// Reset the per-group load counter.
    pub fn reset_group(&mut self) {
        self.loaded_clips = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Probe that replays a fixed percent sequence.
    struct ScriptedProbe {
        samples: Vec<f64>,
        next: usize,
    }

    impl ScriptedProbe {
        fn new(samples: &[f64]) -> Self {
            Self {
                samples: samples.to_vec(),
                next: 0,
            }
        }
    }

    impl MemoryProbe for ScriptedProbe {
        fn sample(&mut self) -> MemorySample {
            let percent = self.samples[self.next];
            self.next += 1;
            MemorySample {
                process_resident_bytes: 0,
                system_used_percent: percent,
            }
        }
    }

    fn governor(samples: &[f64]) -> MemoryGovernor<ScriptedProbe> {
        MemoryGovernor::with_probe(GovernorConfig::default(), ScriptedProbe::new(samples))
    }

    #[test]
    fn test_cooldown_fires_only_above_threshold() {
        // Group checks against the 80% soft watermark.
        let mut gov = governor(&[79.9, 80.0, 80.1]);
        assert!(gov.check_group().is_none());
        assert!(gov.check_group().is_none(), "exactly at watermark is fine");
        let cooldown = gov.check_group().expect("above watermark must trip");
        assert_eq!(cooldown.pause, Duration::from_secs(5));
    }

    #[test]
    fn test_clip_check_uses_hard_watermark() {
        let mut gov = governor(&[84.0, 86.0]);
        assert!(gov.check_clip().is_none());
        let cooldown = gov.check_clip().expect("86% must trip the 85% mark");
        assert_eq!(cooldown.pause, Duration::from_secs(3));
        assert!((cooldown.sample.system_used_percent - 86.0).abs() < 1e-9);
    }

    #[test]
    fn test_compaction_cadence_ignores_pressure() {
        let mut gov = governor(&[]);
        let compactions: Vec<bool> = (0..7).map(|_| gov.note_clip_loaded()).collect();
        assert_eq!(
            compactions,
            vec![false, false, true, false, false, true, false]
        );
    }

    #[test]
    fn test_reset_group_restarts_cadence() {
        let mut gov = governor(&[]);
        gov.note_clip_loaded();
        gov.note_clip_loaded();
        gov.reset_group();
        assert!(!gov.note_clip_loaded());
        assert!(!gov.note_clip_loaded());
        assert!(gov.note_clip_loaded());
    }
}
