//! Request files: rows plus uploaded images in one JSON document.
//!
//! ```json
//! {"rows": [["06/08/2025", "Site A", ...]],
//!  "uploads": {"Site A|06/08/2025": [{"name": "north.jpg", "data": "<base64>"}]}}
//! ```

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{ReportError, Result};
use crate::types::{ImageMap, SiteDate};

#[derive(Debug, Clone, Deserialize)]
pub struct Upload {
    #[serde(default)]
    pub name: String,
    /// Base64 image bytes.
    pub data: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportRequest {
    #[serde(default)]
    pub rows: Vec<Vec<String>>,
    #[serde(default)]
    pub uploads: BTreeMap<String, Vec<Upload>>,
}

impl ReportRequest {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| ReportError::Request(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ReportError::Request(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&text)
    }

    /// Decode uploads into an image map. Keys must be `site|date`.
    pub fn image_map(&self) -> Result<ImageMap> {
        let mut map = ImageMap::new();
        for (key, uploads) in &self.uploads {
            let site_date = SiteDate::parse(key)
                .ok_or_else(|| ReportError::Request(format!("upload key '{}' is not 'site|date'", key)))?;
            let images = map.entry(site_date).or_default();
            for (i, upload) in uploads.iter().enumerate() {
                let bytes = BASE64.decode(upload.data.trim()).map_err(|e| {
                    let label = if upload.name.is_empty() {
                        format!("#{}", i + 1)
                    } else {
                        upload.name.clone()
                    };
                    ReportError::Request(format!("upload {} for '{}' is not valid base64: {}", label, key, e))
                })?;
                images.push(bytes);
            }
        }
        Ok(map)
    }
}
