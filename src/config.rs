use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::scoring::RankTable;

pub const DEFAULT_CONFIG_PATH: &str = "terraquiz.json";
pub const CONFIG_ENV_VAR: &str = "TERRAQUIZ_CONFIG";

/// Tunables for a quiz session. Every field has a default, so a config file
/// only needs the keys it wants to override.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct Settings {
    pub time_limit_secs: u32,
    pub points_correct: u32,
    pub speed_bonus: u32,
    /// Seconds before the deadline at which the speed bonus stops applying.
    pub speed_bonus_threshold_secs: u32,
    /// Remaining seconds at which the one-shot final countdown signal fires.
    pub final_warning_secs: u32,
    pub questions_path: PathBuf,
    pub leaderboard_path: PathBuf,
    pub ranks: RankTable,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            time_limit_secs: 30,
            points_correct: 10,
            speed_bonus: 5,
            speed_bonus_threshold_secs: 10,
            final_warning_secs: 10,
            questions_path: PathBuf::from("data/preguntas.csv"),
            leaderboard_path: PathBuf::from("data/leaderboard.csv"),
            ranks: RankTable::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read settings file at {path}: {source}")]
    Read { path: String, source: io::Error },
    #[error("failed to parse settings file at {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

impl Settings {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|source| SettingsError::Read {
            path: path.display().to_string(),
            source,
        })?;

        serde_json::from_slice(&data).map_err(|source| SettingsError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Like [`Settings::from_file`], but a missing file means "use the defaults".
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            log::debug!("no settings file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        Self::from_file(path)
    }

    /// Latest elapsed second at which a correct answer still earns the speed bonus.
    pub fn speed_bonus_deadline(&self) -> u32 {
        self.time_limit_secs
            .saturating_sub(self.speed_bonus_threshold_secs)
    }
}
