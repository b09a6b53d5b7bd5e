//! Emitter configuration, trail presets and the capacity rules derived from them.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, TrailError};

/// Ticks per second the host is assumed to run at when converting a per-second
/// spawn frequency into a per-frame cadence.
pub const ASSUMED_FRAME_RATE: u32 = 60;
/// Spawns per second used for pool sizing when the spawn frequency is 0.
pub const FALLBACK_SPAWN_FREQUENCY: u32 = 30;
/// Lerp factor between the last spawn and the current position for moving trails.
pub const MOVE_TARGET_LERP: f32 = 0.9;
/// Seconds a follow-mode trail takes to fade in after it is placed.
pub const FOLLOW_FADE_IN_SECONDS: f32 = 0.3;
/// Largest pool a configuration may ask for.
pub const MAX_POOL_CAPACITY: usize = 1 << 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionType {
    /// Trails stay where they were stamped.
    #[default]
    Static,
    /// Trails drift from the emitter towards the previous spawn point.
    MoveOut,
    /// Trails drift from near the previous spawn point towards where the emitter was.
    MoveIn,
    /// A chain of trails replays the emitter's recent path.
    Follow,
}

impl MotionType {
    pub fn is_follow(self) -> bool {
        matches!(self, MotionType::Follow)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitterConfig {
    pub motion_type: MotionType,
    /// Spawns per second; 0 makes every tick spawn-eligible.
    pub spawn_frequency: u32,
    /// Seconds a trail stays visible, fade included.
    pub life_time: f32,
    pub minimum_spawn_displacement: f32,
    /// Share of `life_time` spent fading out, in `[0, 1]`.
    pub fade_duration_fraction: f32,
    /// Ticks between consecutive follow trails.
    pub follow_frames_span: usize,
    pub follow_trail_count: usize,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            motion_type: MotionType::Static,
            spawn_frequency: 0,
            life_time: 1.0,
            minimum_spawn_displacement: 0.0,
            fade_duration_fraction: 0.3,
            follow_frames_span: 10,
            follow_trail_count: 0,
        }
    }
}

impl EmitterConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(source: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values that would otherwise trip the emitter's setter assertions.
    pub fn validate(&self) -> Result<()> {
        check_non_negative("life_time", self.life_time)?;
        check_non_negative("minimum_spawn_displacement", self.minimum_spawn_displacement)?;
        if !(0.0..=1.0).contains(&self.fade_duration_fraction) {
            return Err(TrailError::InvalidConfig {
                field: "fade_duration_fraction",
                reason: format!("{} is outside [0, 1]", self.fade_duration_fraction),
            });
        }
        if self.follow_frames_span == 0 {
            return Err(TrailError::InvalidConfig {
                field: "follow_frames_span",
                reason: "must be at least 1".into(),
            });
        }
        self.pool_capacity()?;
        Ok(())
    }

    pub fn pool_capacity(&self) -> Result<usize> {
        checked_pool_capacity(
            self.motion_type,
            self.spawn_frequency,
            self.life_time,
            self.follow_trail_count,
        )
    }
}

fn check_non_negative(field: &'static str, value: f32) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(TrailError::InvalidConfig {
            field,
            reason: format!("{value} is not a finite non-negative number"),
        })
    }
}

/// Number of pooled actors a configuration needs, `None` past [`MAX_POOL_CAPACITY`].
pub fn pool_capacity(
    motion_type: MotionType,
    spawn_frequency: u32,
    life_time: f32,
    follow_trail_count: usize,
) -> Option<usize> {
    let capacity = if motion_type.is_follow() {
        follow_trail_count
    } else {
        let frequency = if spawn_frequency == 0 {
            FALLBACK_SPAWN_FREQUENCY
        } else {
            spawn_frequency
        };
        let seconds = life_time.ceil();
        // Also rejects NaN.
        if !(seconds <= MAX_POOL_CAPACITY as f32) {
            return None;
        }
        (frequency as usize).checked_mul(seconds as usize)?
    };
    (capacity <= MAX_POOL_CAPACITY).then_some(capacity)
}

/// [`pool_capacity`], with oversized pools reported as [`TrailError::InvalidConfig`].
pub fn checked_pool_capacity(
    motion_type: MotionType,
    spawn_frequency: u32,
    life_time: f32,
    follow_trail_count: usize,
) -> Result<usize> {
    pool_capacity(motion_type, spawn_frequency, life_time, follow_trail_count).ok_or_else(|| {
        TrailError::InvalidConfig {
            field: if motion_type.is_follow() {
                "follow_trail_count"
            } else {
                "life_time"
            },
            reason: format!("needs more than {MAX_POOL_CAPACITY} pooled actors"),
        }
    })
}

/// Ticks between spawn-eligible frames. Frequencies above the frame rate clamp to 1.
pub fn spawn_period_frames(spawn_frequency: u32) -> u32 {
    if spawn_frequency == 0 {
        1
    } else {
        (ASSUMED_FRAME_RATE / spawn_frequency).max(1)
    }
}

/// Named emitter configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrailPreset {
    pub name: String,
    #[serde(default)]
    pub emitter: EmitterConfig,
}

impl Default for TrailPreset {
    fn default() -> Self {
        Self {
            name: "Default".into(),
            emitter: EmitterConfig::default(),
        }
    }
}

/// A file holding any number of `[[presets]]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PresetFile {
    #[serde(default)]
    pub presets: Vec<TrailPreset>,
}

impl PresetFile {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let file: Self = toml::from_str(source)?;
        file.validate()?;
        Ok(file)
    }

    pub fn from_json_str(source: &str) -> Result<Self> {
        let file: Self = serde_json::from_str(source)?;
        file.validate()?;
        Ok(file)
    }

    /// Loads a preset file, picking the parser from the extension (`.json`, else TOML).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        let file = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&source)?,
            _ => Self::from_toml_str(&source)?,
        };
        info!(
            "loaded {} trail preset(s) from {}",
            file.presets.len(),
            path.display()
        );
        Ok(file)
    }

    pub fn find(&self, name: &str) -> Option<&TrailPreset> {
        self.presets.iter().find(|preset| preset.name == name)
    }

    fn validate(&self) -> Result<()> {
        self.presets
            .iter()
            .try_for_each(|preset| preset.emitter.validate())
    }
}
