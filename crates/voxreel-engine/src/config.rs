//! Engine configuration.

use std::path::PathBuf;
use std::time::Duration;

use voxreel_media::GovernorConfig;
use voxreel_models::{AspectRatio, EncodingConfig};

use crate::error::{EngineError, EngineResult};

/// Immutable engine configuration, loaded once at startup and passed
/// into every component.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Root of the batch tree; batches live under `{source_dir}/{date}`.
    pub source_dir: PathBuf,
    /// Batch date stamp (`YYYY-MM-DD`), today by default.
    pub date: String,
    /// Target aspect ratio every clip is normalized to.
    pub target_ratio: AspectRatio,
    /// Fixed encode parameters for every composite.
    pub encoding: EncodingConfig,
    /// Memory governor thresholds and cooldowns.
    pub governor: GovernorConfig,
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// `VOXREEL_SOURCE_DIR` is required; everything else has defaults.
    pub fn from_env() -> EngineResult<Self> {
        let source_dir = std::env::var("VOXREEL_SOURCE_DIR")
            .map(PathBuf::from)
            .map_err(|_| EngineError::config("VOXREEL_SOURCE_DIR is not set"))?;

        let date = match std::env::var("VOXREEL_DATE") {
            Ok(d) => d,
            Err(_) => chrono::Local::now().format("%Y-%m-%d").to_string(),
        };

        let target_ratio = match std::env::var("VOXREEL_ASPECT") {
            Ok(s) => s
                .parse()
                .map_err(|e| EngineError::config(format!("VOXREEL_ASPECT: {}", e)))?,
            Err(_) => AspectRatio::WIDESCREEN,
        };

        let mut governor = GovernorConfig::default();
        if let Some(v) = env_parse::<f64>("VOXREEL_SOFT_THRESHOLD")? {
            governor.soft_threshold = v;
        }
        if let Some(v) = env_parse::<f64>("VOXREEL_HARD_THRESHOLD")? {
            governor.hard_threshold = v;
        }
        if let Some(v) = env_parse::<u64>("VOXREEL_SOFT_COOLDOWN_SECS")? {
            governor.soft_cooldown = Duration::from_secs(v);
        }
        if let Some(v) = env_parse::<u64>("VOXREEL_HARD_COOLDOWN_SECS")? {
            governor.hard_cooldown = Duration::from_secs(v);
        }
        if let Some(v) = env_parse::<u32>("VOXREEL_COMPACT_EVERY")? {
            governor.compact_every = v;
        }

        let config = Self {
            source_dir,
            date,
            target_ratio,
            encoding: EncodingConfig::default(),
            governor,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate value ranges. Called by `from_env`; failures are fatal.
    pub fn validate(&self) -> EngineResult<()> {
        for (name, value) in [
            ("soft threshold", self.governor.soft_threshold),
            ("hard threshold", self.governor.hard_threshold),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(EngineError::config(format!(
                    "{} must be a percentage in 0..=100, got {}",
                    name, value
                )));
            }
        }
        if self.governor.compact_every == 0 {
            return Err(EngineError::config("compaction cadence must be >= 1"));
        }
        Ok(())
    }

    /// Root of this batch's tree.
    pub fn batch_dir(&self) -> PathBuf {
        self.source_dir.join(&self.date)
    }

    /// Narration audio directory (`voices/{n}.mp3`).
    pub fn voices_dir(&self) -> PathBuf {
        self.batch_dir().join("voices")
    }

    /// Clip pool directory (`videos/{n}/*.mp4`).
    pub fn videos_dir(&self) -> PathBuf {
        self.batch_dir().join("videos")
    }

    /// Composite output directory (`videos_out/{n}.mp4`).
    pub fn output_dir(&self) -> PathBuf {
        self.batch_dir().join("videos_out")
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> EngineResult<Option<T>> {
    match std::env::var(name) {
        Ok(s) => s
            .parse()
            .map(Some)
            .map_err(|_| EngineError::config(format!("{} has an unparseable value: {}", name, s))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EngineConfig {
        EngineConfig {
            source_dir: PathBuf::from("/data"),
            date: "2026-08-26".to_string(),
            target_ratio: AspectRatio::WIDESCREEN,
            encoding: EncodingConfig::default(),
            governor: GovernorConfig::default(),
        }
    }

    #[test]
    fn test_batch_paths() {
        let config = config();
        assert_eq!(config.voices_dir(), PathBuf::from("/data/2026-08-26/voices"));
        assert_eq!(config.videos_dir(), PathBuf::from("/data/2026-08-26/videos"));
        assert_eq!(
            config.output_dir(),
            PathBuf::from("/data/2026-08-26/videos_out")
        );
    }

    #[test]
    fn test_validate_rejects_bad_threshold() {
        let mut config = config();
        config.governor.soft_threshold = 120.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_cadence() {
        let mut config = config();
        config.governor.compact_every = 0;
        assert!(config.validate().is_err());
    }
}
