//! Application settings from `config.json` / `config.toml`, overridden by the environment.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ReportError, Result};
use crate::excel::DEFAULT_SHEET;
use crate::models::LayoutParams;
use crate::types::{SignatoryTable, SCHEMA_WIDTH};

pub const CONFIG_ENV: &str = "SITE_REPORTS_CONFIG";
const DEFAULT_FILES: [&str; 2] = ["config.json", "config.toml"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub template_path: PathBuf,
    pub weekly_template_path: PathBuf,
    /// Base directory for signature and logo lookup.
    pub assets_dir: PathBuf,
    pub sheet_name: String,
    /// 1-based; `None` when the sheet has no header row.
    pub header_row: Option<u32>,
    /// 0-based column holding each row's discipline.
    pub discipline_col: Option<usize>,
    pub schema_width: usize,
    pub project_name: String,
    pub layout: LayoutParams,
    pub signatories: SignatoryTable,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            template_path: PathBuf::from("Site_Daily_report_Template_Date.docx"),
            weekly_template_path: PathBuf::from("Weekly_report_template.docx"),
            assets_dir: PathBuf::from("."),
            sheet_name: DEFAULT_SHEET.to_string(),
            header_row: Some(1),
            discipline_col: None,
            schema_width: SCHEMA_WIDTH,
            project_name: String::new(),
            layout: LayoutParams::default(),
            signatories: SignatoryTable::default(),
        }
    }
}

impl AppConfig {
    /// Load `.env`, then the first config file found, then environment overrides.
    /// A missing file means defaults; a file that does not parse is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }
        let mut config = match Self::locate(explicit) {
            Some(path) => {
                tracing::info!(path = %path.display(), "loading configuration");
                Self::from_file(&path)?
            }
            None => AppConfig::default(),
        };
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
            return Some(PathBuf::from(path));
        }
        DEFAULT_FILES.iter().map(PathBuf::from).find(|p| p.is_file())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ReportError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let is_toml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("toml") || e.eq_ignore_ascii_case("tml"));
        let parsed: std::result::Result<AppConfig, String> = if is_toml {
            toml::from_str(&text).map_err(|e| e.to_string())
        } else {
            serde_json::from_str(&text).map_err(|e| e.to_string())
        };
        parsed.map_err(|reason| ReportError::Config {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// Environment values win over file values. Empty variables are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        if let Some(v) = get("TEMPLATE_PATH") {
            self.template_path = PathBuf::from(v);
        }
        if let Some(v) = get("WEEKLY_TEMPLATE_PATH") {
            self.weekly_template_path = PathBuf::from(v);
        }
        if let Some(v) = get("ASSETS_DIR") {
            self.assets_dir = PathBuf::from(v);
        }
        if let Some(v) = get("SHEET_NAME") {
            self.sheet_name = v;
        }
        if let Some(v) = get("DISCIPLINE_COL") {
            match v.parse::<usize>() {
                Ok(col) => self.discipline_col = Some(col),
                Err(e) => tracing::warn!(value = %v, error = %e, "ignoring DISCIPLINE_COL"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn json_and_toml_files_fill_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("config.json");
        std::fs::write(&json, r#"{"sheet_name": "Daily", "layout": {"images_per_row": 3}}"#).unwrap();
        let cfg = AppConfig::from_file(&json).unwrap();
        assert_eq!(cfg.sheet_name, "Daily");
        assert_eq!(cfg.layout.images_per_row, 3);
        assert_eq!(cfg.layout.spacing_mm, 2.0);
        assert_eq!(cfg.header_row, Some(1));

        let toml_path = dir.path().join("config.toml");
        std::fs::write(&toml_path, "discipline_col = 14\nproject_name = \"Mini-grid\"\n").unwrap();
        let cfg = AppConfig::from_file(&toml_path).unwrap();
        assert_eq!(cfg.discipline_col, Some(14));
        assert_eq!(cfg.project_name, "Mini-grid");
    }

    #[test]
    fn unparseable_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(AppConfig::from_file(&path), Err(ReportError::Config { .. })));
    }

    #[test]
    fn environment_overrides_file_values() {
        let env: HashMap<&str, &str> = [
            ("TEMPLATE_PATH", "daily.docx"),
            ("SHEET_NAME", "  "),
            ("DISCIPLINE_COL", "12"),
        ]
        .into_iter()
        .collect();
        let mut cfg = AppConfig::default();
        cfg.apply_env(|name| env.get(name).map(|v| v.to_string()));
        assert_eq!(cfg.template_path, PathBuf::from("daily.docx"));
        assert_eq!(cfg.sheet_name, "Reports");
        assert_eq!(cfg.discipline_col, Some(12));

        let mut cfg = AppConfig::default();
        cfg.apply_env(|name| (name == "DISCIPLINE_COL").then(|| "eleven".to_string()));
        assert_eq!(cfg.discipline_col, None);
    }
}
