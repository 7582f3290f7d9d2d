use serde::{Deserialize, Serialize};
use tokio::fs;
use std::path::{Path, PathBuf};
use directories::ProjectDirs;

use crate::shared::error::{AppError, AppResult};
use crate::shared::types::Language;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub backend: BackendSettings,
    pub preferences: UserPreferences,
    pub monitor: MonitorSettings,
    pub diagnostics: DiagnosticsSettings,
    pub cache: CacheSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    pub endpoint: String,
    pub model: String,
    /// Optional per-request timeout; `None` waits for the backend indefinitely
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserPreferences {
    pub default_target_lang: String,
    /// Catalogue labels in the form `"Spanish (es)"`
    pub languages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsSettings {
    pub enabled: bool,
    pub log_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// `None` keeps every translation for the process lifetime
    pub max_entries: Option<usize>,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434/api/generate".to_string(),
            model: "deepseek-r1:1.5b".to_string(),
            timeout_secs: None,
        }
    }
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            default_target_lang: "es".to_string(),
            languages: [
                "English (en)",
                "Spanish (es)",
                "French (fr)",
                "German (de)",
                "Chinese (zh)",
                "Portuguese (pt)",
                "Dutch (nl)",
                "Russian (ru)",
                "Korean (ko)",
                "Italian (it)",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self { poll_interval_ms: 500 }
    }
}

impl Default for DiagnosticsSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            log_path: None,
        }
    }
}

impl UserPreferences {
    /// Parsed language catalogue; malformed labels are skipped
    pub fn catalogue(&self) -> Vec<Language> {
        self.languages
            .iter()
            .filter_map(|label| {
                let parsed = Language::from_label(label);
                if parsed.is_none() {
                    tracing::warn!("[Settings] Ignoring malformed language label: {}", label);
                }
                parsed
            })
            .collect()
    }

    /// Resolve a code (or catalogue label) against the catalogue, falling
    /// back to the ISO name for codes outside it.
    pub fn resolve_language(&self, code_or_label: &str) -> Language {
        if let Some(lang) = Language::from_label(code_or_label) {
            return lang;
        }
        let wanted = code_or_label.trim();
        self.catalogue()
            .into_iter()
            .find(|lang| lang.code.eq_ignore_ascii_case(wanted))
            .unwrap_or_else(|| Language::from_code(wanted))
    }

    pub fn default_language(&self) -> Language {
        self.resolve_language(&self.default_target_lang)
    }
}

impl AppSettings {
    fn project_dirs() -> AppResult<ProjectDirs> {
        ProjectDirs::from("com", "antigravity", "clip-translate")
            .ok_or_else(|| AppError::Config("Failed to determine config directory".to_string()))
    }

    pub fn get_settings_path() -> AppResult<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("settings.json"))
    }

    /// Default location of the diagnostic log
    pub fn default_log_path() -> AppResult<PathBuf> {
        Ok(Self::project_dirs()?.data_dir().join("translator_log.txt"))
    }

    /// Effective diagnostic log path, or `None` when the file log is disabled
    pub fn log_path(&self) -> AppResult<Option<PathBuf>> {
        if !self.diagnostics.enabled {
            return Ok(None);
        }
        match &self.diagnostics.log_path {
            Some(path) => Ok(Some(path.clone())),
            None => Self::default_log_path().map(Some),
        }
    }

    pub async fn load() -> AppResult<Self> {
        let path = Self::get_settings_path()?;
        Self::load_from(&path).await
    }

    /// Load settings from `path`, writing the defaults there on first run
    pub async fn load_from(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            let settings = Self::default();
            settings.save_to(path).await?;
            return Ok(settings);
        }

        let content = fs::read_to_string(path).await
            .map_err(|e| AppError::Config(format!("Failed to read settings file: {}", e)))?;

        serde_json::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse settings: {}", e)))
    }

    pub async fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await
                .map_err(|e| AppError::Config(format!("Failed to create config directory: {}", e)))?;
        }

        let content = serde_json::to_string_pretty(self)?;

        fs::write(path, content).await
            .map_err(|e| AppError::Config(format!("Failed to write settings file: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_desktop_app() {
        let settings = AppSettings::default();
        assert_eq!(settings.backend.endpoint, "http://localhost:11434/api/generate");
        assert_eq!(settings.backend.model, "deepseek-r1:1.5b");
        assert_eq!(settings.preferences.catalogue().len(), 10);
        assert_eq!(settings.preferences.default_language(), Language::new("Spanish", "es"));
        assert_eq!(settings.cache.max_entries, None);
    }

    #[test]
    fn test_resolve_language() {
        let prefs = UserPreferences::default();
        assert_eq!(prefs.resolve_language("FR"), Language::new("French", "fr"));
        assert_eq!(prefs.resolve_language("Korean (ko)"), Language::new("Korean", "ko"));
        // Outside the catalogue: resolved through ISO 639
        assert_eq!(prefs.resolve_language("ja"), Language::new("Japanese", "ja"));
    }

    #[test]
    fn test_partial_settings_file_uses_defaults() {
        let parsed: AppSettings =
            serde_json::from_str(r#"{ "backend": { "model": "qwen3:4b" } }"#).expect("valid json");
        assert_eq!(parsed.backend.model, "qwen3:4b");
        assert_eq!(parsed.backend.endpoint, BackendSettings::default().endpoint);
        assert_eq!(parsed.monitor.poll_interval_ms, 500);
    }

    #[test]
    fn test_log_path_disabled() {
        let mut settings = AppSettings::default();
        settings.diagnostics.enabled = false;
        assert_eq!(settings.log_path().expect("no dirs needed"), None);

        settings.diagnostics.enabled = true;
        settings.diagnostics.log_path = Some(PathBuf::from("/tmp/log.txt"));
        assert_eq!(settings.log_path().expect("explicit path"), Some(PathBuf::from("/tmp/log.txt")));
    }

    #[tokio::test]
    async fn test_load_creates_defaults_then_reads_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("settings.json");

        let first = AppSettings::load_from(&path).await.expect("first load");
        assert_eq!(first, AppSettings::default());
        assert!(path.exists());

        let mut changed = first.clone();
        changed.preferences.default_target_lang = "de".to_string();
        changed.save_to(&path).await.expect("save");

        let reloaded = AppSettings::load_from(&path).await.expect("reload");
        assert_eq!(reloaded.preferences.default_language(), Language::new("German", "de"));
    }

    #[tokio::test]
    async fn test_load_rejects_invalid_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");
        tokio::fs::write(&path, "{ not json").await.expect("write");

        let err = AppSettings::load_from(&path).await.expect_err("should fail");
        assert!(matches!(err, AppError::Config(_)));
    }
}
