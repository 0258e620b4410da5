//! Batch generation: one rendered document per row, all bundled into one zip archive.

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::ZipWriter;

use crate::docx::{deterministic_options, DocxTemplate};
use crate::error::{BatchWarning, ReportError, Result};
use crate::models::LayoutParams;
use crate::naming::{report_base_name, NameAllocator};
use crate::services::assets::AssetResolver;
use crate::services::context::{
    build_context, check_placeholders, provided_placeholders, required_placeholders, resolve_signatories,
};
use crate::services::gallery::build_gallery_in;
use crate::services::normalizer::to_report_rows;
use crate::services::sanitizer::SanitizedTemplate;
use crate::types::{Discipline, ImageMap, ReportRow, SignatoryTable, SCHEMA_WIDTH};

pub const REPORT_EXTENSION: &str = "docx";

/// Archive bytes plus what went into them.
#[derive(Debug, Clone, Default)]
pub struct GeneratedArchive {
    pub bytes: Vec<u8>,
    /// Entry names in archive order.
    pub entries: Vec<String>,
    pub warnings: Vec<BatchWarning>,
}

#[derive(Debug, Clone)]
pub struct ReportGenerator {
    template_path: PathBuf,
    assets: AssetResolver,
    signatories: SignatoryTable,
    schema_width: usize,
    scratch_dir: PathBuf,
}

impl ReportGenerator {
    /// Assets are looked up next to the template unless [`with_assets`](Self::with_assets) says otherwise.
    pub fn new(template_path: impl Into<PathBuf>) -> Self {
        let template_path = template_path.into();
        let assets_dir = template_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        ReportGenerator {
            template_path,
            assets: AssetResolver::new(assets_dir),
            signatories: SignatoryTable::default(),
            schema_width: SCHEMA_WIDTH,
            scratch_dir: std::env::temp_dir(),
        }
    }

    pub fn with_assets(mut self, assets: AssetResolver) -> Self {
        self.assets = assets;
        self
    }

    pub fn with_signatories(mut self, signatories: SignatoryTable) -> Self {
        self.signatories = signatories;
        self
    }

    pub fn with_schema_width(mut self, width: usize) -> Self {
        self.schema_width = width;
        self
    }

    /// Directory for the sanitized template and per-image scratch files.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    pub fn template_path(&self) -> &Path {
        &self.template_path
    }

    /// Normalize raw rows to the configured schema width, then generate.
    pub fn generate<S: AsRef<str>>(
        &self,
        rows: &[Vec<S>],
        images: &ImageMap,
        discipline: Discipline,
        layout: &LayoutParams,
    ) -> Result<GeneratedArchive> {
        let rows = to_report_rows(rows, self.schema_width);
        self.generate_rows(&rows, images, discipline, layout)
    }

    /// Rows are processed strictly in order so collision suffixes are deterministic.
    pub fn generate_rows(
        &self,
        rows: &[ReportRow],
        images: &ImageMap,
        discipline: Discipline,
        layout: &LayoutParams,
    ) -> Result<GeneratedArchive> {
        tracing::info!(
            rows = rows.len(),
            %discipline,
            template = %self.template_path.display(),
            "generating reports"
        );
        // Removed on every exit path once this goes out of scope.
        let sanitized = SanitizedTemplate::create_in(&self.template_path, &self.scratch_dir)?;
        let template = DocxTemplate::open(sanitized.path())?;

        let mut warnings =
            check_placeholders(&template.declared_placeholders(), &provided_placeholders(), &required_placeholders());
        for w in &warnings {
            tracing::warn!(warning = %w, "template check");
        }
        let signatories = resolve_signatories(self.signatories.profile(discipline), &self.assets, &mut warnings);

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = deterministic_options();
        let mut names = NameAllocator::new();
        let mut entries = Vec::with_capacity(rows.len());

        for (index, row) in rows.iter().enumerate() {
            let key = row.site_date();
            let row_images = images.get(&key).map(Vec::as_slice).unwrap_or(&[]);
            tracing::debug!(row = index, site = %key.site, date = %key.date, images = row_images.len(), "rendering row");

            let gallery = build_gallery_in(row_images, layout, &self.scratch_dir)?;
            for skipped in gallery.skipped {
                warnings.push(BatchWarning::ImageSkipped {
                    site: key.site.clone(),
                    date: key.date.clone(),
                    index: skipped.index,
                    reason: skipped.reason,
                });
            }

            let ctx = build_context(row, gallery.layout, &signatories);
            let document = match template.render(&ctx) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!(row = index, site = %key.site, date = %key.date, error = %e, "row not generated");
                    warnings.push(BatchWarning::RowFailed {
                        row: index,
                        site: key.site.clone(),
                        date: key.date.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let name = format!(
                "{}.{}",
                names.allocate(&report_base_name(&key.site, &key.date)),
                REPORT_EXTENSION
            );
            writer.start_file(name.as_str(), options).map_err(ReportError::Archive)?;
            writer.write_all(&document)?;
            entries.push(name);
        }

        let bytes = writer.finish().map_err(ReportError::Archive)?.into_inner();
        tracing::info!(entries = entries.len(), warnings = warnings.len(), bytes = bytes.len(), "archive ready");
        Ok(GeneratedArchive {
            bytes,
            entries,
            warnings,
        })
    }
}

/// One-call form with the built-in signatories and assets next to the template.
pub fn generate_reports<S: AsRef<str>>(
    template_path: &Path,
    rows: &[Vec<S>],
    images: &ImageMap,
    discipline: Discipline,
    layout: &LayoutParams,
) -> Result<GeneratedArchive> {
    ReportGenerator::new(template_path).generate(rows, images, discipline, layout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::package::fixtures;
    use crate::types::SiteDate;
    use std::io::Read;
    use zip::ZipArchive;

    const BODY: &str = concat!(
        "<w:p><w:r><w:t>{{ Site_Name }} {{ Date }}</w:t></w:r></w:p>",
        "<w:p><w:r><w:t>{{p Images }}</w:t></w:r></w:p>",
        "<w:p><w:r><w:t>{{ Consultant_Name }} {{ Consultant_Title }} {{ Consultant_Signature }}</w:t></w:r></w:p>",
        "<w:p><w:r><w:t>{{ Contractor_Name }} {{ Contractor_Title }} {{ Contractor_Signature }}</w:t></w:r></w:p>",
    );

    fn setup() -> (tempfile::TempDir, ReportGenerator) {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("template.docx");
        std::fs::write(&template, fixtures::docx_with_body(BODY)).unwrap();
        let scratch = dir.path().join("scratch");
        std::fs::create_dir(&scratch).unwrap();
        let generator = ReportGenerator::new(&template).with_scratch_dir(&scratch);
        (dir, generator)
    }

    fn row(date: &str, site: &str) -> Vec<String> {
        let mut cells = vec![date.to_string(), site.to_string()];
        cells.resize(11, String::new());
        cells
    }

    fn document_xml(archive: &[u8], entry: &str) -> String {
        let mut zip = ZipArchive::new(Cursor::new(archive)).unwrap();
        let mut inner = Vec::new();
        zip.by_name(entry).unwrap().read_to_end(&mut inner).unwrap();
        let mut doc = ZipArchive::new(Cursor::new(inner)).unwrap();
        let mut xml = String::new();
        doc.by_name("word/document.xml").unwrap().read_to_string(&mut xml).unwrap();
        xml
    }

    #[test]
    fn duplicate_rows_get_numbered_names() {
        let (_dir, generator) = setup();
        let rows = vec![row("2025-08-06", "Site A"), row("06/08/2025", "Site A"), row("", "")];
        let out = generator
            .generate(&rows, &ImageMap::new(), Discipline::Civil, &LayoutParams::default())
            .unwrap();
        assert_eq!(
            out.entries,
            vec!["Site A_06.08.2025.docx", "Site A_06.08.2025_2.docx", "report.docx"]
        );
        let xml = document_xml(&out.bytes, "Site A_06.08.2025.docx");
        assert!(xml.contains("Site A 2025-08-06"));
        assert!(xml.contains("IRANZI Prince Jean Claude"));
    }

    #[test]
    fn missing_signatures_are_warned_once_per_batch() {
        let (_dir, generator) = setup();
        let rows = vec![row("2025-08-06", "Site A"), row("2025-08-07", "Site A")];
        let out = generator
            .generate(&rows, &ImageMap::new(), Discipline::Electrical, &LayoutParams::default())
            .unwrap();
        let not_found = out
            .warnings
            .iter()
            .filter(|w| matches!(w, BatchWarning::SignatureNotFound { .. }))
            .count();
        assert_eq!(not_found, 2);
        assert_eq!(out.entries.len(), 2);
    }

    #[test]
    fn uploaded_images_land_in_the_gallery() {
        let (dir, generator) = setup();
        let mut images = ImageMap::new();
        images.insert(
            SiteDate::new("Site A", "2025-08-06"),
            vec![crate::services::images::fixtures::png(4, 2), b"junk".to_vec()],
        );
        let layout = LayoutParams {
            images_per_row: 1,
            ..LayoutParams::default()
        };
        let out = generator
            .generate(&[row(" 2025-08-06 ", " Site A ")], &images, Discipline::Civil, &layout)
            .unwrap();
        let xml = document_xml(&out.bytes, &out.entries[0]);
        assert_eq!(xml.matches("<pic:pic ").count(), 1);
        assert!(xml.contains(r#"cx="2520000""#));
        assert!(out.warnings.iter().any(|w| matches!(
            w,
            BatchWarning::ImageSkipped { index: 1, .. }
        )));
        assert_eq!(std::fs::read_dir(dir.path().join("scratch")).unwrap().count(), 0);
    }

    #[test]
    fn missing_template_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = generate_reports(
            &dir.path().join("nope.docx"),
            &[row("2025-08-06", "Site A")],
            &ImageMap::new(),
            Discipline::Civil,
            &LayoutParams::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ReportError::TemplateIo { .. }));
    }

    #[test]
    fn identical_inputs_give_identical_archives() {
        let (_dir, generator) = setup();
        let rows = vec![row("2025-08-06", "Site A")];
        let a = generator
            .generate(&rows, &ImageMap::new(), Discipline::Civil, &LayoutParams::default())
            .unwrap();
        let b = generator
            .generate(&rows, &ImageMap::new(), Discipline::Civil, &LayoutParams::default())
            .unwrap();
        assert_eq!(a.bytes, b.bytes);
    }
}
