use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::error::PreferencesError;

pub const ZOOM_MIN: u16 = 80;
pub const ZOOM_MAX: u16 = 150;
pub const ZOOM_STEP: u16 = 10;
pub const ZOOM_DEFAULT: u16 = 100;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub theme: Theme,
    pub zoom_percent: u16,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: Theme::Light,
            zoom_percent: ZOOM_DEFAULT,
        }
    }
}

/// Clamps to `[80, 150]` and snaps to the nearest step of 10.
pub fn clamp_zoom(raw: f64) -> u16 {
    if !raw.is_finite() {
        return ZOOM_DEFAULT;
    }
    let clamped = raw.clamp(f64::from(ZOOM_MIN), f64::from(ZOOM_MAX));
    let step = f64::from(ZOOM_STEP);
    ((clamped / step).round() * step) as u16
}

impl Preferences {
    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    pub fn with_zoom(mut self, zoom: f64) -> Self {
        self.zoom_percent = clamp_zoom(zoom);
        self
    }

    pub fn normalized(self) -> Self {
        self.with_zoom(f64::from(self.zoom_percent))
    }
}

fn zoom_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').parse::<f64>().ok(),
        _ => None,
    }
}

/// Reads a stored record, falling back to defaults field by field.
///
/// Understands `{theme, zoomPercent}` as well as the older
/// `{darkMode, zoom}` record.
pub fn parse_preferences(raw: &str) -> Preferences {
    let defaults = Preferences::default();
    let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(raw) else {
        return defaults;
    };

    let theme = obj
        .get("theme")
        .and_then(Value::as_str)
        .and_then(Theme::parse)
        .or_else(|| {
            obj.get("darkMode")
                .and_then(Value::as_bool)
                .map(|dark| if dark { Theme::Dark } else { Theme::Light })
        })
        .unwrap_or(defaults.theme);

    let zoom_percent = obj
        .get("zoomPercent")
        .or_else(|| obj.get("zoom"))
        .and_then(zoom_value)
        .map(clamp_zoom)
        .unwrap_or(defaults.zoom_percent);

    Preferences {
        theme,
        zoom_percent,
    }
}

/// Where the single preferences record is kept.
pub trait PreferenceBackend {
    /// The stored record, or `None` when absent or unreadable.
    fn read(&self) -> Option<String>;
    fn write(&self, payload: &str) -> Result<(), PreferencesError>;
}

#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PreferenceBackend for JsonFileBackend {
    fn read(&self) -> Option<String> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Some(raw),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %err,
                    "unable to read preferences; using defaults"
                );
                None
            }
        }
    }

    fn write(&self, payload: &str) -> Result<(), PreferencesError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let part_path = self.path.with_extension("json.part");
        fs::write(&part_path, payload)?;
        if let Err(err) = fs::rename(&part_path, &self.path) {
            let _ = fs::remove_file(&part_path);
            return Err(err.into());
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryBackend {
    value: Mutex<Option<String>>,
}

impl MemoryBackend {
    pub fn with_value(raw: impl Into<String>) -> Self {
        Self {
            value: Mutex::new(Some(raw.into())),
        }
    }
}

impl PreferenceBackend for MemoryBackend {
    fn read(&self) -> Option<String> {
        self.value
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn write(&self, payload: &str) -> Result<(), PreferencesError> {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = Some(payload.to_string());
        Ok(())
    }
}

/// What the presentation layer needs to render theme and zoom.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DisplaySettings {
    pub theme: Theme,
    pub css_class: String,
    pub scale_factor: f64,
}

impl From<Preferences> for DisplaySettings {
    fn from(prefs: Preferences) -> Self {
        let css_class = match prefs.theme {
            Theme::Light => "",
            Theme::Dark => "dark-mode",
        };
        Self {
            theme: prefs.theme,
            css_class: css_class.to_string(),
            scale_factor: f64::from(prefs.zoom_percent) / 100.0,
        }
    }
}

pub struct PreferenceStore<B> {
    backend: B,
    applied: Preferences,
}

impl<B: PreferenceBackend> PreferenceStore<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            applied: Preferences::default(),
        }
    }

    /// Never fails: an absent or corrupted record yields defaults.
    pub fn load(&self) -> Preferences {
        match self.backend.read() {
            Some(raw) if !raw.trim().is_empty() => parse_preferences(&raw),
            _ => Preferences::default(),
        }
    }

    pub fn apply(&mut self, prefs: Preferences) {
        self.applied = prefs.normalized();
    }

    pub fn current(&self) -> Preferences {
        self.applied
    }

    pub fn display(&self) -> DisplaySettings {
        DisplaySettings::from(self.applied)
    }

    /// Replaces the stored record. Does not change what is applied.
    pub fn save(&self, prefs: &Preferences) -> Result<(), PreferencesError> {
        let payload = serde_json::to_string_pretty(&prefs.normalized())?;
        self.backend.write(&payload)?;
        tracing::info!(
            theme = prefs.theme.as_str(),
            zoom = prefs.zoom_percent,
            "preferences saved"
        );
        Ok(())
    }
}
