//! Rewrites template placeholders into identifier form on a temporary copy of the template.

use regex::{Captures, Regex};
use std::fs::File;
use std::io::{BufWriter, Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tempfile::NamedTempFile;
use zip::read::ZipArchive;
use zip::ZipWriter;

use crate::docx::deterministic_options;
use crate::docx::markup::merge_split_placeholders;
use crate::error::{ReportError, Result};
use crate::types::ReportField;

/// Spellings found in older templates, rewritten verbatim before anything else.
const REPLACEMENTS: &[(&str, &str)] = &[
    ("Reaction&amp;WayForword", "Reaction_and_WayForword"),
    ("Reaction&amp;WayForward", "Reaction_and_WayForword"),
    ("Reaction &amp; WayForword", "Reaction_and_WayForword"),
    ("Reaction &amp; Way Forward", "Reaction_and_WayForword"),
];

fn token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{([^{}<]*)\}\}").expect("token regex"))
}

fn identifier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex"))
}

/// Sanitized copy of a template. The file is deleted when this value is dropped.
#[derive(Debug)]
pub struct SanitizedTemplate {
    file: NamedTempFile,
    source: PathBuf,
}

impl SanitizedTemplate {
    /// Write the sanitized copy to the system temp directory.
    pub fn create(template: &Path) -> Result<Self> {
        Self::create_in(template, &std::env::temp_dir())
    }

    pub fn create_in(template: &Path, temp_dir: &Path) -> Result<Self> {
        let bytes = std::fs::read(template).map_err(|source| ReportError::TemplateIo {
            path: template.to_path_buf(),
            source,
        })?;
        let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(|source| ReportError::TemplateFormat {
            path: template.to_path_buf(),
            source,
        })?;

        let file = tempfile::Builder::new()
            .prefix("site-report-template-")
            .suffix(".docx")
            .tempfile_in(temp_dir)
            .map_err(ReportError::Scratch)?;
        let handle: File = file.reopen().map_err(ReportError::Scratch)?;
        let mut writer = ZipWriter::new(BufWriter::new(handle));
        let options = deterministic_options();
        let mut rewritten = 0usize;

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).map_err(|source| ReportError::TemplateFormat {
                path: template.to_path_buf(),
                source,
            })?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_string();
            let mut data = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut data).map_err(|source| ReportError::TemplateIo {
                path: template.to_path_buf(),
                source,
            })?;

            if name.ends_with(".xml") {
                if let Ok(xml) = std::str::from_utf8(&data) {
                    let cleaned = sanitize_xml(xml);
                    if cleaned != xml {
                        rewritten += 1;
                        data = cleaned.into_bytes();
                    }
                }
            }

            writer.start_file(name.as_str(), options).map_err(ReportError::Archive)?;
            writer.write_all(&data)?;
        }
        let mut inner = writer.finish().map_err(ReportError::Archive)?;
        inner.flush()?;

        tracing::debug!(template = %template.display(), rewritten, "sanitized template copy written");
        Ok(SanitizedTemplate {
            file,
            source: template.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn source(&self) -> &Path {
        &self.source
    }
}

/// Apply the replacement table, merge split placeholders and rewrite non-identifier names.
pub fn sanitize_xml(xml: &str) -> String {
    let mut out = xml.to_string();
    for (from, to) in REPLACEMENTS {
        if out.contains(from) {
            out = out.replace(from, to);
        }
    }
    let merged = merge_split_placeholders(&out);
    token_re()
        .replace_all(&merged, |caps: &Captures| rewrite_token(&caps[0], &caps[1]))
        .into_owned()
}

fn rewrite_token(token: &str, body: &str) -> String {
    let trimmed = body.trim();
    let (prefix, name) = match trimmed.split_once(char::is_whitespace) {
        Some((p @ ("p" | "r"), rest)) => (Some(p), rest.trim()),
        _ => (None, trimmed),
    };
    if name.is_empty() || identifier_re().is_match(name) {
        return token.to_string();
    }

    let unescaped = quick_xml::escape::unescape(name)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| name.to_string());
    let identifier = match ReportField::from_header(&unescaped) {
        Some(field) => field.placeholder().to_string(),
        None => to_identifier(&unescaped),
    };
    if identifier.is_empty() {
        return token.to_string();
    }
    match prefix {
        Some(p) => format!("{{{{{} {} }}}}", p, identifier),
        None => format!("{{{{ {} }}}}", identifier),
    }
}

/// Join alphanumeric runs with `_`; `&` reads as "and".
fn to_identifier(name: &str) -> String {
    let spelled = name.replace('&', " and ");
    let parts: Vec<&str> = spelled
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|p| !p.is_empty())
        .collect();
    let joined = parts.join("_");
    match joined.chars().next() {
        Some(c) if c.is_ascii_digit() => format!("_{}", joined),
        _ => joined,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::package::fixtures;
    use crate::docx::DocxTemplate;

    #[test]
    fn fixed_table_applies_first() {
        let xml = "<w:t>{{ Reaction&amp;WayForword }}</w:t>";
        assert_eq!(sanitize_xml(xml), "<w:t>{{ Reaction_and_WayForword }}</w:t>");
    }

    #[test]
    fn non_identifier_names_use_header_aliases() {
        assert_eq!(sanitize_xml("{{ Site Name }}"), "{{ Site_Name }}");
        assert_eq!(
            sanitize_xml("{{ Consultant Recommendations }}"),
            "{{ Consultant_Recommandation }}"
        );
        assert_eq!(sanitize_xml("{{p Comment on HSE }}"), "{{p Comment_on_HSE }}");
    }

    #[test]
    fn unknown_names_become_underscore_identifiers() {
        assert_eq!(sanitize_xml("{{ Weather &amp; Notes }}"), "{{ Weather_and_Notes }}");
        assert_eq!(sanitize_xml("{{ 2nd visit }}"), "{{ _2nd_visit }}");
    }

    #[test]
    fn valid_placeholders_and_plain_text_are_untouched() {
        let xml = "<w:t>{{ Date }} and {{p Images }} plus { braces }</w:t>";
        assert_eq!(sanitize_xml(xml), xml);
    }

    #[test]
    fn copy_is_rewritten_and_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let original = dir.path().join("template.docx");
        let body = "<w:p><w:r><w:t>{{ Reaction&amp;</w:t></w:r><w:r><w:t>WayForword }}</w:t></w:r></w:p>";
        std::fs::write(&original, fixtures::docx_with_body(body)).unwrap();
        let before = std::fs::read(&original).unwrap();

        let scratch = tempfile::tempdir().unwrap();
        let sanitized = SanitizedTemplate::create_in(&original, scratch.path()).unwrap();
        let copy_path = sanitized.path().to_path_buf();
        assert!(copy_path.extension().is_some_and(|e| e == "docx"));

        let template = DocxTemplate::open(&copy_path).unwrap();
        assert!(template.declared_placeholders().contains("Reaction_and_WayForword"));
        assert_eq!(std::fs::read(&original).unwrap(), before);

        drop(sanitized);
        assert!(!copy_path.exists());
    }

    #[test]
    fn unreadable_template_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = SanitizedTemplate::create(&dir.path().join("missing.docx")).unwrap_err();
        assert!(matches!(err, ReportError::TemplateIo { .. }));

        let junk = dir.path().join("junk.docx");
        std::fs::write(&junk, b"not a zip").unwrap();
        let err = SanitizedTemplate::create(&junk).unwrap_err();
        assert!(matches!(err, ReportError::TemplateFormat { .. }));
    }
}
