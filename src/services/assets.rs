use std::path::{Path, PathBuf};

pub const SIGNATURES_DIR: &str = "signatures";
const EXTENSIONS: &[&str] = &["", ".png", ".jpg", ".jpeg", ".webp"];

/// Finds image assets (signatures, logos) by logical name under a base directory.
#[derive(Debug, Clone)]
pub struct AssetResolver {
    base_dir: PathBuf,
}

impl AssetResolver {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        AssetResolver {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Look `name` up with or without extension.
    ///
    /// A name carrying its own directory is searched only there; a bare name is searched
    /// in `signatures/` first and then the base directory. Within a directory the bare
    /// stem is tried before `.png`, `.jpg`, `.jpeg` and `.webp`. `None` means "omit".
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let requested = self.base_dir.join(name);
        let stem = requested.file_stem()?.to_os_string();
        let parent = requested.parent().unwrap_or(&self.base_dir);

        let search_dirs = if parent != self.base_dir.as_path() {
            vec![parent.to_path_buf()]
        } else {
            vec![self.base_dir.join(SIGNATURES_DIR), self.base_dir.clone()]
        };

        for dir in &search_dirs {
            for ext in EXTENSIONS {
                let mut file_name = stem.clone();
                file_name.push(ext);
                let candidate = dir.join(&file_name);
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
        }
        None
    }
}

/// One-shot lookup against `base_dir`.
pub fn resolve_asset(base_dir: &Path, name: &str) -> Option<PathBuf> {
    AssetResolver::new(base_dir).resolve(name)
}
