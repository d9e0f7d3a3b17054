use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::audio_system::{PoolConfig, SoundDefinition};
use crate::error::ConfigError;

fn default_max_frequent_instances() -> usize {
    30
}

fn default_pitch_range() -> f32 {
    0.05
}

fn default_tick_rate_hz() -> u32 {
    60
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Emitter pool sizing
    #[serde(default)]
    pub pool: PoolConfig,

    /// Concurrent cap for sounds flagged as frequent
    #[serde(default = "default_max_frequent_instances")]
    pub max_frequent_instances: usize,

    /// Force-stop non-looping voices still playing after this many ticks
    #[serde(default)]
    pub max_watch_ticks: Option<u64>,

    /// Default half-width of random pitch variation
    #[serde(default = "default_pitch_range")]
    pub pitch_range: f32,

    /// Fixed seed for pitch randomization (reproducible runs)
    #[serde(default)]
    pub rng_seed: Option<u64>,

    /// Scheduling ticks per second
    #[serde(default = "default_tick_rate_hz")]
    pub tick_rate_hz: u32,

    /// Named sounds available to the application
    #[serde(default)]
    pub sounds: BTreeMap<String, SoundDefinition>,

    /// Audio file for each sound id (device playback only)
    #[serde(default)]
    pub assets: BTreeMap<String, PathBuf>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        let mut sounds = BTreeMap::new();
        sounds.insert(
            "coin_collected".to_string(),
            SoundDefinition::new("coin"),
        );
        sounds.insert(
            "player_footsteps".to_string(),
            SoundDefinition::new("footstep").frequent(true),
        );
        sounds.insert(
            "music".to_string(),
            SoundDefinition::new("music").looping(true).play_on_ready(true),
        );

        Self {
            pool: PoolConfig::default(),
            max_frequent_instances: default_max_frequent_instances(),
            max_watch_ticks: None,
            pitch_range: default_pitch_range(),
            rng_seed: None,
            tick_rate_hz: default_tick_rate_hz(),
            sounds,
            assets: BTreeMap::new(),
        }
    }
}

impl AudioConfig {
    /// Load and validate a configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let load_failed = |source: Box<dyn std::error::Error + Send + Sync>| ConfigError::LoadFailed {
            path: path.display().to_string(),
            source,
        };

        let content = fs::read_to_string(path).map_err(|e| load_failed(Box::new(e)))?;
        let config: AudioConfig =
            serde_json::from_str(&content).map_err(|e| load_failed(Box::new(e)))?;
        config.validate()?;

        tracing::info!("✓ Loaded config from: {}", path.display());
        Ok(config)
    }

    /// Load a configuration file, writing the defaults first if it is missing
    pub fn load_or_create(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            return Self::load(path);
        }

        let config = AudioConfig::default();
        config.save(path)?;
        tracing::info!("✓ Created default config at: {}", path.display());
        Ok(config)
    }

    /// Save configuration to disk
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ConfigError::DirectoryCreationFailed {
                path: parent.display().to_string(),
                source,
            })?;
        }

        let save_failed = |source: Box<dyn std::error::Error + Send + Sync>| ConfigError::SaveFailed {
            path: path.display().to_string(),
            source,
        };
        let json = serde_json::to_string_pretty(self).map_err(|e| save_failed(Box::new(e)))?;
        fs::write(path, json).map_err(|e| save_failed(Box::new(e)))?;

        Ok(())
    }

    /// Platform config location, e.g. `~/.config/SoundPool/config.json`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|dir| dir.join("SoundPool"))
            .unwrap_or_else(|| PathBuf::from("config"))
            .join("config.json")
    }

    /// Reject settings the engine cannot honour
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pool.max_size == 0 {
            return Err(ConfigError::Invalid("pool.max_size must be at least 1".into()));
        }
        if self.pool.default_capacity > self.pool.max_size {
            return Err(ConfigError::Invalid(format!(
                "pool.default_capacity ({}) exceeds pool.max_size ({})",
                self.pool.default_capacity, self.pool.max_size
            )));
        }
        if self.pool.prewarm > self.pool.max_size {
            return Err(ConfigError::Invalid(format!(
                "pool.prewarm ({}) exceeds pool.max_size ({})",
                self.pool.prewarm, self.pool.max_size
            )));
        }
        if !self.pitch_range.is_finite() || !(0.0..1.0).contains(&self.pitch_range) {
            return Err(ConfigError::Invalid(format!(
                "pitch_range must be in [0, 1), got {}",
                self.pitch_range
            )));
        }
        if self.tick_rate_hz == 0 {
            return Err(ConfigError::Invalid("tick_rate_hz must be positive".into()));
        }
        if self.max_watch_ticks == Some(0) {
            return Err(ConfigError::Invalid(
                "max_watch_ticks must be positive when set".into(),
            ));
        }
        Ok(())
    }
}
