use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const SETTINGS_FILE_NAME: &str = "wsched.toml";

/// Result returned by [`load_settings`], capturing the source and any non-fatal issues.
#[derive(Debug, Clone)]
pub struct SettingsLoadResult {
    pub settings: Settings,
    pub warnings: Vec<String>,
    pub source: SettingsSource,
}

/// Indicates where the settings were loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsSource {
    /// No usable `wsched.toml` was found; defaults were synthesized.
    Default,
    /// Settings were read from `wsched.toml`.
    File,
}

/// Errors that can occur when persisting settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("TOML serialization error: {0}")]
    Ser(#[from] toml::ser::Error),
    #[error("{} already exists", .0.display())]
    Exists(PathBuf),
}

/// Tool settings stored next to the site's `_config.yml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub paths: PathSettings,
}

/// Site-relative locations of the compositor's inputs and output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathSettings {
    #[serde(default = "PathSettings::default_config")]
    pub config: String,
    #[serde(default = "PathSettings::default_includes")]
    pub includes: String,
    #[serde(default = "PathSettings::default_output")]
    pub output: String,
    #[serde(default = "PathSettings::default_lesson_suffix")]
    pub lesson_suffix: String,
    #[serde(default = "PathSettings::default_schedule_file")]
    pub schedule_file: String,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            config: Self::default_config(),
            includes: Self::default_includes(),
            output: Self::default_output(),
            lesson_suffix: Self::default_lesson_suffix(),
            schedule_file: Self::default_schedule_file(),
        }
    }
}

impl PathSettings {
    fn default_config() -> String {
        "_config.yml".to_string()
    }

    fn default_includes() -> String {
        "_includes/rsg".to_string()
    }

    fn default_output() -> String {
        "_includes/rsg/schedule.html".to_string()
    }

    fn default_lesson_suffix() -> String {
        "-lesson".to_string()
    }

    fn default_schedule_file() -> String {
        "schedule.html".to_string()
    }
}

/// Absolute locations derived from [`Settings`] and a site root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub config: PathBuf,
    pub includes: PathBuf,
    pub output: PathBuf,
    lesson_suffix: String,
    schedule_file: String,
}

impl ResolvedPaths {
    /// `<includes>/<gh-name><suffix>/<schedule file>`
    pub fn fragment_path(&self, gh_name: &str) -> PathBuf {
        self.includes
            .join(format!("{gh_name}{}", self.lesson_suffix))
            .join(&self.schedule_file)
    }
}

impl Settings {
    pub fn resolve(&self, site_root: &Path) -> ResolvedPaths {
        ResolvedPaths {
            config: resolve_path(site_root, &self.paths.config),
            includes: resolve_path(site_root, &self.paths.includes),
            output: resolve_path(site_root, &self.paths.output),
            lesson_suffix: self.paths.lesson_suffix.clone(),
            schedule_file: self.paths.schedule_file.clone(),
        }
    }
}

/// Represents overrides sourced from CLI flags.
#[derive(Debug, Default, Clone)]
pub struct RuntimeOverrides {
    pub config: Option<String>,
    pub includes: Option<String>,
    pub output: Option<String>,
}

impl RuntimeOverrides {
    pub fn is_empty(&self) -> bool {
        self.config.is_none() && self.includes.is_none() && self.output.is_none()
    }
}

pub fn apply_runtime_overrides(settings: &mut Settings, overrides: &RuntimeOverrides) {
    if let Some(config) = overrides.config.as_ref() {
        settings.paths.config = config.clone();
    }
    if let Some(includes) = overrides.includes.as_ref() {
        settings.paths.includes = includes.clone();
    }
    if let Some(output) = overrides.output.as_ref() {
        settings.paths.output = output.clone();
    }
}

/// Path to `wsched.toml` for a site.
pub fn settings_path(site_root: &Path) -> PathBuf {
    site_root.join(SETTINGS_FILE_NAME)
}

/// Load the settings, falling back to defaults when the file is absent or unusable.
pub fn load_settings(site_root: &Path) -> SettingsLoadResult {
    let path = settings_path(site_root);
    let mut warnings = Vec::new();

    if path.exists() {
        match fs::read_to_string(&path) {
            Ok(raw) => match toml::from_str::<Settings>(&raw) {
                Ok(settings) => {
                    let (settings, mut sanitize_warnings) = sanitize_settings(settings);
                    warnings.append(&mut sanitize_warnings);
                    return SettingsLoadResult {
                        settings,
                        warnings,
                        source: SettingsSource::File,
                    };
                }
                Err(err) => warnings.push(format!(
                    "Failed to parse {} as TOML: {}. Falling back to defaults.",
                    SETTINGS_FILE_NAME, err
                )),
            },
            Err(err) => warnings.push(format!(
                "Failed to read {}: {}. Falling back to defaults.",
                SETTINGS_FILE_NAME, err
            )),
        }
    }

    SettingsLoadResult {
        settings: Settings::default(),
        warnings,
        source: SettingsSource::Default,
    }
}

/// Write a settings file, refusing to replace an existing one unless `force` is set.
pub fn save_settings(site_root: &Path, settings: &Settings, force: bool) -> Result<PathBuf, SettingsError> {
    let path = settings_path(site_root);
    if path.exists() && !force {
        return Err(SettingsError::Exists(path));
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, toml::to_string_pretty(settings)?)?;
    Ok(path)
}

fn sanitize_settings(mut settings: Settings) -> (Settings, Vec<String>) {
    let mut warnings = Vec::new();
    let defaults = PathSettings::default();
    let paths = &mut settings.paths;

    for (key, value, default) in [
        ("config", &mut paths.config, defaults.config),
        ("includes", &mut paths.includes, defaults.includes),
        ("output", &mut paths.output, defaults.output),
        ("schedule_file", &mut paths.schedule_file, defaults.schedule_file),
    ] {
        if value.trim().is_empty() {
            warnings.push(format!(
                "paths.{key} is empty; using default '{default}'."
            ));
            *value = default;
        } else {
            *value = value.trim().to_string();
        }
    }

    (settings, warnings)
}

fn resolve_path(site_root: &Path, value: &str) -> PathBuf {
    let path = Path::new(value);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        site_root.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp = tempdir().unwrap();
        let result = load_settings(temp.path());
        assert_eq!(result.source, SettingsSource::Default);
        assert!(result.warnings.is_empty());
        assert_eq!(result.settings, Settings::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let temp = tempdir().unwrap();
        fs::write(
            settings_path(temp.path()),
            "[paths]\noutput = \"_site/schedule.html\"\n",
        )
        .unwrap();

        let result = load_settings(temp.path());
        assert_eq!(result.source, SettingsSource::File);
        assert_eq!(result.settings.paths.output, "_site/schedule.html");
        assert_eq!(result.settings.paths.config, "_config.yml");
    }

    #[test]
    fn test_bad_toml_falls_back_with_warning() {
        let temp = tempdir().unwrap();
        fs::write(settings_path(temp.path()), "[paths\noutput = ").unwrap();

        let result = load_settings(temp.path());
        assert_eq!(result.source, SettingsSource::Default);
        assert!(
            result.warnings.iter().any(|w| w.contains("Failed to parse")),
            "{:?}",
            result.warnings
        );
    }

    #[test]
    fn test_sanitize_blank_paths() {
        let mut settings = Settings::default();
        settings.paths.includes = "   ".to_string();

        let (sanitized, warnings) = sanitize_settings(settings);
        assert_eq!(sanitized.paths.includes, "_includes/rsg");
        assert!(warnings.iter().any(|w| w.contains("paths.includes")));
    }

    #[test]
    fn test_overrides_and_resolution() {
        let mut settings = Settings::default();
        let overrides = RuntimeOverrides {
            output: Some("/tmp/out/schedule.html".to_string()),
            ..RuntimeOverrides::default()
        };
        assert!(!overrides.is_empty());
        apply_runtime_overrides(&mut settings, &overrides);

        let paths = settings.resolve(Path::new("/srv/site"));
        assert_eq!(paths.output, PathBuf::from("/tmp/out/schedule.html"));
        assert_eq!(paths.config, PathBuf::from("/srv/site/_config.yml"));
        assert_eq!(
            paths.fragment_path("git-novice"),
            PathBuf::from("/srv/site/_includes/rsg/git-novice-lesson/schedule.html")
        );
    }

    #[test]
    fn test_save_refuses_to_overwrite() {
        let temp = tempdir().unwrap();
        let path = save_settings(temp.path(), &Settings::default(), false).unwrap();
        assert!(path.exists());

        let err = save_settings(temp.path(), &Settings::default(), false).unwrap_err();
        assert!(matches!(err, SettingsError::Exists(_)));
        assert!(save_settings(temp.path(), &Settings::default(), true).is_ok());

        let reloaded = load_settings(temp.path());
        assert_eq!(reloaded.source, SettingsSource::File);
        assert_eq!(reloaded.settings, Settings::default());
    }
}
