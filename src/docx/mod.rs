//! Word-processing templates: open, inspect and render `.docx` packages.

pub mod drawing;
pub mod markup;
pub mod package;

use std::collections::BTreeSet;
use std::path::Path;

use crate::error::{RenderError, ReportError};
use crate::models::TemplateContext;

pub use package::{deterministic_options, DocxPackage, MAIN_DOCUMENT_PART};

/// A loaded template. Rendering never mutates it, so one instance serves a whole batch.
#[derive(Debug, Clone)]
pub struct DocxTemplate {
    package: DocxPackage,
}

impl DocxTemplate {
    pub fn open(path: &Path) -> Result<Self, ReportError> {
        Ok(DocxTemplate {
            package: DocxPackage::open(path)?,
        })
    }

    pub fn from_package(package: DocxPackage) -> Self {
        DocxTemplate { package }
    }

    /// Every placeholder name used in the body, headers and footers.
    pub fn declared_placeholders(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        for part in self.package.text_parts() {
            if let Some(data) = self.package.part(&part) {
                names.extend(markup::find_placeholders(&String::from_utf8_lossy(data)));
            }
        }
        names
    }

    /// Render `ctx` into a fresh copy of the template and return the document bytes.
    pub fn render(&self, ctx: &TemplateContext) -> Result<Vec<u8>, RenderError> {
        let mut doc = self.package.clone();
        for part in doc.text_parts() {
            let xml = match doc.part(&part) {
                Some(data) => String::from_utf8(data.to_vec()).map_err(|e| RenderError::Markup {
                    part: part.clone(),
                    reason: e.to_string(),
                })?,
                None => continue,
            };
            let rendered = markup::render_part(&xml, &part, ctx, &mut doc)?;
            doc.set_part(&part, rendered.into_bytes());
        }
        doc.to_bytes()
    }
}
