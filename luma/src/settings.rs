use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::extract::{check_precision, ExtractMode, ExtractOptions, PrecisionError, DEFAULT_PRECISION};
use crate::tone_curve::Smoothing;

quick_error! {
    #[derive(Debug)]
    pub enum SettingsError {
        Io(err: std::io::Error) {
            from()
            display("couldn't read settings: {}", err)
            cause(err)
        }
        Json(err: serde_json::Error) {
            from()
            display("couldn't parse settings: {}", err)
            cause(err)
        }
        Precision(err: PrecisionError) {
            from()
            display("bad settings: {}", err)
            cause(err)
        }
    }
}

/// Everything the command line can also set. Missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Registry to use instead of the builtin one.
    pub registry: Option<PathBuf>,
    pub precision: u32,
    pub extract_mode: ExtractMode,
    pub smoothing: Smoothing,
    /// Where `--save` writes. Defaults to the download directory.
    pub output_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            registry: None,
            precision: DEFAULT_PRECISION,
            extract_mode: ExtractMode::Fixed,
            smoothing: Smoothing::default(),
            output_dir: None,
        }
    }
}

impl Settings {
    pub fn from_json(text: &str) -> Result<Settings, SettingsError> {
        let settings: Settings = serde_json::from_str(text)?;
        check_precision(settings.precision)?;
        Ok(settings)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Settings, SettingsError> {
        let path = path.as_ref();
        let settings = Settings::from_json(&fs::read_to_string(path)?)?;
        info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            mode: self.extract_mode,
            precision: self.precision,
        }
    }
}
