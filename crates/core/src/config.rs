//! Tunable timings, speeds and vision cones for the simulation.
//! This module exists so every behavior reads its constants from one explicit value
//! passed into the world instead of a process-wide settings object.
//! It does not own map data or per-agent state.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid setting `{field}`: {message}")]
    Invalid { field: &'static str, message: String },
}

/// Path search used when NPCs plan their next step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathAlgorithm {
    /// Breadth-first frontiers; every step costs the same.
    Wave,
    /// A* with diagonal steps costing `sqrt(2)`.
    #[default]
    Weighted,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViewCone {
    pub radius: f64,
    /// Full cone width in degrees.
    pub angle: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSettings {
    pub speed: f64,
    pub rotation_speed: f64,
    pub body_moving_speed: f64,
    pub jump_half_duration: f64,
    pub jump_settle: f64,
    pub respawn_delay: f64,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            speed: 2.0,
            rotation_speed: 2.0,
            body_moving_speed: 1.0,
            jump_half_duration: 0.5,
            jump_settle: 0.1,
            respawn_delay: 1.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NpcSettings {
    pub speed: f64,
    pub excited_speed: f64,
    pub rotation_speed: f64,
    pub normal_view: ViewCone,
    pub excited_view: ViewCone,
    pub corpse_settle: f64,
}

impl Default for NpcSettings {
    fn default() -> Self {
        Self {
            speed: 1.5,
            excited_speed: 2.5,
            rotation_speed: 2.0,
            normal_view: ViewCone { radius: 6.0, angle: 90.0 },
            excited_view: ViewCone { radius: 10.0, angle: 140.0 },
            corpse_settle: 0.5,
        }
    }
}

/// Clip lengths handed to the animation backend, in seconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationSettings {
    pub hit: f64,
    pub post_hit: f64,
    pub pre_jump: f64,
    pub post_jump: f64,
    pub pick_up: f64,
    pub fall: f64,
    pub fade: f64,
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self { hit: 0.4, post_hit: 0.3, pre_jump: 0.3, post_jump: 0.3, pick_up: 0.5, fall: 1.0, fade: 0.2 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Grace added to a job's duration before the scheduler stops waiting for its
    /// completion signal.
    pub resume_action_timeout: f64,
    pub alert_radius: f64,
    pub path_algorithm: PathAlgorithm,
    pub player: PlayerSettings,
    pub npc: NpcSettings,
    pub animation: AnimationSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            resume_action_timeout: 0.5,
            alert_radius: 5.0,
            path_algorithm: PathAlgorithm::default(),
            player: PlayerSettings::default(),
            npc: NpcSettings::default(),
            animation: AnimationSettings::default(),
        }
    }
}

impl Settings {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        non_negative("resume_action_timeout", self.resume_action_timeout)?;
        positive("alert_radius", self.alert_radius)?;
        positive("player.speed", self.player.speed)?;
        positive("player.rotation_speed", self.player.rotation_speed)?;
        positive("player.body_moving_speed", self.player.body_moving_speed)?;
        positive("npc.speed", self.npc.speed)?;
        positive("npc.excited_speed", self.npc.excited_speed)?;
        positive("npc.rotation_speed", self.npc.rotation_speed)?;
        cone("npc.normal_view", self.npc.normal_view)?;
        cone("npc.excited_view", self.npc.excited_view)?;
        let a = &self.animation;
        for (field, value) in [
            ("animation.hit", a.hit),
            ("animation.post_hit", a.post_hit),
            ("animation.pre_jump", a.pre_jump),
            ("animation.post_jump", a.post_jump),
            ("animation.pick_up", a.pick_up),
            ("animation.fall", a.fall),
            ("animation.fade", a.fade),
        ] {
            non_negative(field, value)?;
        }
        Ok(())
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        return Ok(());
    }
    Err(ConfigError::Invalid { field, message: format!("must be positive, got {value}") })
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        return Ok(());
    }
    Err(ConfigError::Invalid { field, message: format!("must not be negative, got {value}") })
}

fn cone(field: &'static str, view: ViewCone) -> Result<(), ConfigError> {
    positive(field, view.radius)?;
    if view.angle > 0.0 && view.angle < 180.0 {
        return Ok(());
    }
    Err(ConfigError::Invalid {
        field,
        message: format!("cone angle must be inside (0, 180), got {}", view.angle),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn empty_document_yields_defaults() {
        let settings = Settings::from_toml_str("").expect("empty settings parse");
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let text = r#"
            alert_radius = 3.5
            path_algorithm = "wave"

            [npc]
            excited_speed = 4.0
            excited_view = { radius = 12.0, angle = 120.0 }
        "#;
        let settings = Settings::from_toml_str(text).expect("settings parse");
        assert_eq!(settings.alert_radius, 3.5);
        assert_eq!(settings.path_algorithm, PathAlgorithm::Wave);
        assert_eq!(settings.npc.excited_speed, 4.0);
        assert_eq!(settings.npc.excited_view, ViewCone { radius: 12.0, angle: 120.0 });
        assert_eq!(settings.npc.speed, NpcSettings::default().speed);
        assert_eq!(settings.player, PlayerSettings::default());
    }

    #[test]
    fn rejects_cone_wider_than_half_turn() {
        let text = "[npc]\nnormal_view = { radius = 6.0, angle = 200.0 }\n";
        let err = Settings::from_toml_str(text).expect_err("cone must be rejected");
        assert!(
            matches!(err, ConfigError::Invalid { field: "npc.normal_view", .. }),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn rejects_non_positive_speed() {
        let err = Settings::from_toml_str("[player]\nspeed = 0.0\n").expect_err("zero speed");
        assert!(matches!(err, ConfigError::Invalid { field: "player.speed", .. }));
    }

    #[test]
    fn reports_syntax_errors_as_parse_errors() {
        let err = Settings::from_toml_str("alert_radius = = 2").expect_err("bad toml");
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn loads_settings_from_file() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("settings.toml");
        fs::write(&path, "resume_action_timeout = 0.25\n").expect("write settings");
        let settings = Settings::load(&path).expect("load");
        assert_eq!(settings.resume_action_timeout, 0.25);

        let missing = Settings::load(&dir.path().join("missing.toml")).expect_err("missing file");
        assert!(matches!(missing, ConfigError::Io { .. }));
    }
}
