// src/config.rs

//! Configuration for the video output and its host window.
//!
//! The structs deserialize from JSON; every field has a default, so a file
//! only needs the settings it changes. Values that parse but make no sense
//! (a `pause` priority while focused, a sensitivity of 0) are caught by
//! [`Config::validate`].
//!
//! Lookup order used by [`Config::resolve`]:
//! 1. with `-userconf`, `dosframe.json` in the user config dir, generated
//!    from the defaults if it does not exist yet.
//! 2. each explicit `-conf` path, in order; the first that loads wins. A
//!    path that fails to load is retried relative to the user config dir.
//! 3. `dosframe.json` in the working directory.
//! 4. `dosframe.json` in the user config dir.
//! 5. the defaults, written to `dosframe.json` in the user config dir and
//!    read back. If that write fails the in-memory defaults are used.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{SurfaceError, SurfaceResult};

/// File name searched for in the working and user config directories.
pub const CONFIG_FILE_NAME: &str = "dosframe.json";

/// Environment variable naming a config file for [`CONFIG`].
pub const CONFIG_ENV_VAR: &str = "DOSFRAME_CONFIG";

/// Process-wide configuration, loaded on first use from `DOSFRAME_CONFIG`
/// or the default search path.
pub static CONFIG: Lazy<Config> = Lazy::new(|| {
    let explicit: Vec<PathBuf> = std::env::var_os(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .into_iter()
        .collect();
    let (config, source) = Config::resolve(&explicit, user_config_dir().as_deref(), false);
    match source {
        Some(path) => info!("Configuration loaded from {}", path.display()),
        None => info!("Using default configuration"),
    }
    config
});

/// Root of the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Host window and presentation settings (the `sdl` section).
    pub sdl: WindowConfig,
}

/// Host window settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    /// Start directly in fullscreen.
    pub fullscreen: bool,
    /// Sync to vblank if the output device supports it.
    pub vsync: bool,
    /// Resolution used in fullscreen: `original`, `desktop` or `WxH`.
    /// `0x0` means the desktop resolution.
    pub fullresolution: String,
    /// Window scaling target, same grammar as `fullresolution`. Only
    /// honoured by outputs that scale in hardware.
    pub windowresolution: String,
    /// Video system used for output.
    pub output: Output,
    /// Lock the mouse when the screen is clicked.
    pub autolock: bool,
    /// Mouse sensitivity, 1 to 1000.
    pub sensitivity: u32,
    /// Use scancodes rather than symbolic keys.
    pub usescancodes: bool,
    /// Keep the console open after an error.
    pub waitonerror: bool,
    pub priority: Priority,
}

impl Default for WindowConfig {
    fn default() -> Self {
        WindowConfig {
            fullscreen: false,
            vsync: false,
            fullresolution: "0x0".to_string(),
            windowresolution: "original".to_string(),
            output: Output::Surface,
            autolock: false,
            sensitivity: 100,
            usescancodes: true,
            waitonerror: true,
            priority: Priority::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Output {
    #[default]
    Surface,
    Overlay,
}

/// Scheduling priority while focused and while in the background.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Priority {
    pub active: PriorityLevel,
    pub inactive: PriorityLevel,
}

impl Default for Priority {
    fn default() -> Self {
        Priority {
            active: PriorityLevel::Higher,
            inactive: PriorityLevel::Normal,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PriorityLevel {
    Lowest,
    Lower,
    Normal,
    Higher,
    Highest,
    /// Only meaningful for `inactive`.
    Pause,
}

/// Parsed form of `fullresolution` / `windowresolution`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Original,
    Desktop,
    Fixed { width: u32, height: u32 },
}

impl FromStr for Resolution {
    type Err = SurfaceError;

    fn from_str(s: &str) -> SurfaceResult<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("original") {
            return Ok(Resolution::Original);
        }
        if s.eq_ignore_ascii_case("desktop") {
            return Ok(Resolution::Desktop);
        }
        let bad = || SurfaceError::InvalidConfig(format!("resolution `{s}` is not WxH"));
        let (w, h) = s.split_once(&['x', 'X'][..]).ok_or_else(bad)?;
        let width: u32 = w.trim().parse().map_err(|_| bad())?;
        let height: u32 = h.trim().parse().map_err(|_| bad())?;
        if width == 0 && height == 0 {
            return Ok(Resolution::Desktop);
        }
        if width == 0 || height == 0 {
            return Err(bad());
        }
        Ok(Resolution::Fixed { width, height })
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Original => write!(f, "original"),
            Resolution::Desktop => write!(f, "desktop"),
            Resolution::Fixed { width, height } => write!(f, "{width}x{height}"),
        }
    }
}

impl WindowConfig {
    pub fn full_resolution(&self) -> SurfaceResult<Resolution> {
        self.fullresolution.parse()
    }

    pub fn window_resolution(&self) -> SurfaceResult<Resolution> {
        self.windowresolution.parse()
    }
}

impl Config {
    /// Checks values serde cannot reject on its own.
    pub fn validate(&self) -> SurfaceResult<()> {
        let sdl = &self.sdl;
        sdl.full_resolution()?;
        sdl.window_resolution()?;
        if !(1..=1000).contains(&sdl.sensitivity) {
            return Err(SurfaceError::InvalidConfig(format!(
                "sensitivity {} is outside 1..=1000",
                sdl.sensitivity
            )));
        }
        if sdl.priority.active == PriorityLevel::Pause {
            return Err(SurfaceError::InvalidConfig(
                "`pause` is only valid as the inactive priority".to_string(),
            ));
        }
        Ok(())
    }

    /// Parses and validates a JSON document.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(text).context("Malformed configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("In config file {}", path.display()))
    }

    /// Walks the lookup order described in the module docs. Returns the
    /// config and the file it came from, or defaults and `None` when no
    /// file could be read or generated.
    pub fn resolve(
        explicit: &[PathBuf],
        user_dir: Option<&Path>,
        user_conf: bool,
    ) -> (Self, Option<PathBuf>) {
        let user_file = user_dir.map(|dir| dir.join(CONFIG_FILE_NAME));

        if user_conf {
            match &user_file {
                Some(path) if path.exists() => match Self::load(path) {
                    Ok(config) => return (config, Some(path.clone())),
                    Err(e) => warn!("Skipping user config {}: {:#}", path.display(), e),
                },
                Some(path) => {
                    if let Some(config) = Self::generate_default(path) {
                        return (config, Some(path.clone()));
                    }
                }
                None => warn!("-userconf given but no user config directory is known"),
            }
        }

        let mut candidates: Vec<PathBuf> = Vec::new();
        for path in explicit {
            candidates.push(path.clone());
            if path.is_relative() {
                if let Some(dir) = user_dir {
                    candidates.push(dir.join(path));
                }
            }
        }
        candidates.push(PathBuf::from(CONFIG_FILE_NAME));
        candidates.extend(user_file.clone());

        for path in candidates {
            if !path.exists() {
                debug!("Config candidate {} does not exist", path.display());
                continue;
            }
            match Self::load(&path) {
                Ok(config) => return (config, Some(path)),
                Err(e) => warn!("Skipping config {}: {:#}", path.display(), e),
            }
        }

        if let Some(path) = user_file {
            if !path.exists() {
                if let Some(config) = Self::generate_default(&path) {
                    return (config, Some(path));
                }
            }
        }
        info!("Using default settings. Create a config file to change them");
        (Self::default(), None)
    }

    /// Writes the defaults to `path` and reads them back.
    fn generate_default(path: &Path) -> Option<Self> {
        if let Err(e) = Self::default().save(path) {
            warn!("Could not write default configuration: {:#}", e);
            return None;
        }
        info!(
            "Generating default configuration. Writing it to {}",
            path.display()
        );
        match Self::load(path) {
            Ok(config) => Some(config),
            Err(e) => {
                warn!("Generated configuration did not load: {:#}", e);
                None
            }
        }
    }

    /// Writes this config as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }
        let text = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))
    }
}

/// Per-user config directory: `$XDG_CONFIG_HOME/dosframe`, falling back to
/// `$HOME/.config/dosframe`.
pub fn user_config_dir() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))?;
    Some(base.join("dosframe"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("dosframe-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn defaults_match_the_host_section() {
        let sdl = Config::default().sdl;
        assert!(!sdl.fullscreen);
        assert_eq!(sdl.output, Output::Surface);
        assert_eq!(sdl.sensitivity, 100);
        assert_eq!(sdl.priority.active, PriorityLevel::Higher);
        assert_eq!(sdl.priority.inactive, PriorityLevel::Normal);
        assert_eq!(sdl.full_resolution().unwrap(), Resolution::Desktop);
        assert_eq!(sdl.window_resolution().unwrap(), Resolution::Original);
        Config::default().validate().unwrap();
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let config =
            Config::from_json(r#"{"sdl": {"output": "overlay", "priority": {"inactive": "pause"}}}"#)
                .unwrap();
        assert_eq!(config.sdl.output, Output::Overlay);
        assert_eq!(config.sdl.priority.inactive, PriorityLevel::Pause);
        assert_eq!(config.sdl.priority.active, PriorityLevel::Higher);
        assert!(config.sdl.waitonerror);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        assert!(Config::from_json(r#"{"sdl": {"sensitivity": 0}}"#).is_err());
        assert!(Config::from_json(r#"{"sdl": {"priority": {"active": "pause"}}}"#).is_err());
        assert!(Config::from_json(r#"{"sdl": {"output": "opengl"}}"#).is_err());
        assert!(Config::from_json(r#"{"sdl": {"windowresolution": "big"}}"#).is_err());
    }

    #[test]
    fn resolution_grammar() {
        assert_eq!(
            "1024x768".parse::<Resolution>().unwrap(),
            Resolution::Fixed {
                width: 1024,
                height: 768
            }
        );
        assert_eq!("DESKTOP".parse::<Resolution>().unwrap(), Resolution::Desktop);
        assert!("0x768".parse::<Resolution>().is_err());
        assert_eq!(
            Resolution::Fixed {
                width: 640,
                height: 400
            }
            .to_string(),
            "640x400"
        );
    }

    #[test]
    fn resolve_prefers_explicit_paths_and_falls_back_to_user_dir() {
        let dir = scratch_dir("resolve");
        let user_dir = dir.join("user");

        let mut overlay = Config::default();
        overlay.sdl.output = Output::Overlay;
        overlay.save(&user_dir.join("custom.json")).unwrap();

        fs::write(dir.join("broken.json"), "{ not json").unwrap();

        let explicit = vec![dir.join("broken.json"), PathBuf::from("custom.json")];
        let (config, source) = Config::resolve(&explicit, Some(&user_dir), false);
        assert_eq!(config.sdl.output, Output::Overlay);
        assert_eq!(source, Some(user_dir.join("custom.json")));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn nothing_found_generates_the_user_file() {
        let dir = scratch_dir("generate");
        let user_dir = dir.join("user");

        let (config, source) = Config::resolve(&[dir.join("missing.json")], Some(&user_dir), false);
        let user_file = user_dir.join(CONFIG_FILE_NAME);
        assert_eq!(config, Config::default());
        assert_eq!(source, Some(user_file.clone()));
        assert!(user_file.exists());
        assert_eq!(Config::load(&user_file).unwrap(), Config::default());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn unwritable_user_dir_falls_back_to_defaults() {
        let dir = scratch_dir("readonly");
        // A regular file where the directory should be makes the write fail.
        let blocker = dir.join("user");
        fs::write(&blocker, "not a directory").unwrap();

        let (config, source) = Config::resolve(&[], Some(&blocker), false);
        assert_eq!(config, Config::default());
        assert_eq!(source, None);

        let (_, source) = Config::resolve(&[], None, false);
        assert_eq!(source, None);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn userconf_reads_the_user_file_before_explicit_paths() {
        let dir = scratch_dir("userconf");
        let user_dir = dir.join("user");

        let mut overlay = Config::default();
        overlay.sdl.output = Output::Overlay;
        overlay.save(&dir.join("explicit.json")).unwrap();

        // First run creates the user file from the defaults.
        let explicit = vec![dir.join("explicit.json")];
        let (config, source) = Config::resolve(&explicit, Some(&user_dir), true);
        assert_eq!(config.sdl.output, Output::Surface);
        assert_eq!(source, Some(user_dir.join(CONFIG_FILE_NAME)));

        // A customised user file wins over -conf.
        let mut vsync = Config::default();
        vsync.sdl.vsync = true;
        vsync.save(&user_dir.join(CONFIG_FILE_NAME)).unwrap();
        let (config, _) = Config::resolve(&explicit, Some(&user_dir), true);
        assert!(config.sdl.vsync);

        // Without -userconf the explicit path is used.
        let (config, source) = Config::resolve(&explicit, Some(&user_dir), false);
        assert_eq!(config.sdl.output, Output::Overlay);
        assert_eq!(source, Some(dir.join("explicit.json")));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn input_keys_survive_a_round_trip() {
        let defaults = Config::default().sdl;
        assert!(!defaults.autolock);
        assert!(defaults.usescancodes);

        let config =
            Config::from_json(r#"{"sdl": {"autolock": true, "usescancodes": false}}"#).unwrap();
        assert!(config.sdl.autolock);
        assert!(!config.sdl.usescancodes);

        let text = serde_json::to_string(&config).unwrap();
        assert!(text.contains(r#""autolock":true"#));
        assert!(text.contains(r#""usescancodes":false"#));
    }
}
