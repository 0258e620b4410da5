//! In-memory view of a word-processing (.docx) zip package.

use regex::Regex;
use std::collections::HashSet;
use std::io::{Cursor, Read, Write};
use std::path::Path;
use std::sync::OnceLock;
use zip::read::ZipArchive;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::error::{RenderError, ReportError};
use crate::models::ImageKind;

pub const MAIN_DOCUMENT_PART: &str = "word/document.xml";
const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
const FIRST_DRAWING_ID: u32 = 1000;
const IMAGE_REL_TYPE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
const EMPTY_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"></Relationships>"#;

fn rel_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"\bId="([^"]*)""#).expect("relationship id regex"))
}

fn doc_pr_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"<wp:docPr\b[^>]*?\bid="(\d+)""#).expect("docPr id regex"))
}

/// First drawing id above every `wp:docPr` id already in the package.
fn first_free_drawing_id(parts: &[(String, Vec<u8>)]) -> u32 {
    parts
        .iter()
        .filter(|(name, _)| name.ends_with(".xml"))
        .flat_map(|(_, data)| {
            let xml = String::from_utf8_lossy(data);
            doc_pr_id_re()
                .captures_iter(&xml)
                .filter_map(|c| c[1].parse::<u32>().ok())
                .collect::<Vec<_>>()
        })
        .max()
        .map_or(FIRST_DRAWING_ID, |highest| highest.saturating_add(1).max(FIRST_DRAWING_ID))
}

fn text_part_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^word/(document|header\d*|footer\d*)\.xml$").expect("text part regex"))
}

/// Fixed timestamp so the same inputs always produce the same bytes.
pub fn deterministic_options() -> SimpleFileOptions {
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    match zip::DateTime::from_date_and_time(1980, 1, 1, 0, 0, 0) {
        Ok(fixed) => options.last_modified_time(fixed),
        Err(_) => options,
    }
}

#[derive(Debug, Clone)]
pub struct DocxPackage {
    parts: Vec<(String, Vec<u8>)>,
    next_media: usize,
    next_drawing_id: u32,
}

impl DocxPackage {
    pub fn open(path: &Path) -> Result<Self, ReportError> {
        let bytes = std::fs::read(path).map_err(|source| ReportError::TemplateIo {
            path: path.to_path_buf(),
            source,
        })?;
        let package = Self::from_bytes(&bytes).map_err(|source| ReportError::TemplateFormat {
            path: path.to_path_buf(),
            source,
        })?;
        if package.part(MAIN_DOCUMENT_PART).is_none() {
            return Err(ReportError::MissingDocumentPart(path.to_path_buf()));
        }
        Ok(package)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, zip::result::ZipError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut parts = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().replace('\\', "/");
            let mut data = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut data)?;
            parts.push((name, data));
        }
        let next_drawing_id = first_free_drawing_id(&parts);
        Ok(DocxPackage {
            parts,
            next_media: 1,
            next_drawing_id,
        })
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, data)| data.as_slice())
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|(n, _)| n.as_str())
    }

    pub fn set_part(&mut self, name: &str, data: Vec<u8>) {
        match self.parts.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = data,
            None => self.parts.push((name.to_string(), data)),
        }
    }

    /// Parts that carry body text: the main document plus headers and footers.
    pub fn text_parts(&self) -> Vec<String> {
        self.part_names()
            .filter(|n| text_part_re().is_match(n))
            .map(str::to_string)
            .collect()
    }

    /// Next unique `wp:docPr` id for an inline drawing.
    pub fn next_drawing_id(&mut self) -> u32 {
        let id = self.next_drawing_id;
        self.next_drawing_id += 1;
        id
    }

    /// Store `bytes` as a media part and link it from `owner_part`. Returns the relationship id.
    pub fn add_image(&mut self, owner_part: &str, bytes: &[u8], kind: ImageKind) -> Result<String, RenderError> {
        let media_name = loop {
            let candidate = format!("word/media/report_image{}.{}", self.next_media, kind.extension());
            self.next_media += 1;
            if self.part(&candidate).is_none() {
                break candidate;
            }
        };
        let target = media_name.trim_start_matches("word/").to_string();
        self.set_part(&media_name, bytes.to_vec());
        self.ensure_default_content_type(kind)?;
        self.add_relationship(owner_part, IMAGE_REL_TYPE, &target)
    }

    fn rels_part_for(owner_part: &str) -> String {
        match owner_part.rsplit_once('/') {
            Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
            None => format!("_rels/{}.rels", owner_part),
        }
    }

    fn add_relationship(&mut self, owner_part: &str, rel_type: &str, target: &str) -> Result<String, RenderError> {
        let rels_name = Self::rels_part_for(owner_part);
        let rels = match self.part(&rels_name) {
            Some(data) => String::from_utf8(data.to_vec())
                .map_err(|e| RenderError::Image(format!("{} is not UTF-8: {}", rels_name, e)))?,
            None => EMPTY_RELS.to_string(),
        };

        let existing: HashSet<&str> = rel_id_re()
            .captures_iter(&rels)
            .filter_map(|c| c.get(1).map(|m| m.as_str()))
            .collect();
        let mut n = 1usize;
        let id = loop {
            let candidate = format!("rIdImg{}", n);
            if !existing.contains(candidate.as_str()) {
                break candidate;
            }
            n += 1;
        };

        let rel = format!(r#"<Relationship Id="{}" Type="{}" Target="{}"/>"#, id, rel_type, target);
        let updated = insert_before_close(&rels, "Relationships", &rel)
            .ok_or_else(|| RenderError::Image(format!("{} has no Relationships element", rels_name)))?;
        self.set_part(&rels_name, updated.into_bytes());
        Ok(id)
    }

    fn ensure_default_content_type(&mut self, kind: ImageKind) -> Result<(), RenderError> {
        let types = self
            .part(CONTENT_TYPES_PART)
            .map(|d| String::from_utf8_lossy(d).into_owned())
            .ok_or_else(|| RenderError::Image("package has no [Content_Types].xml".to_string()))?;
        let ext = kind.extension();
        let marker = format!(r#"extension="{}""#, ext);
        if types.to_ascii_lowercase().contains(&marker) {
            return Ok(());
        }
        let default = format!(r#"<Default Extension="{}" ContentType="{}"/>"#, ext, kind.content_type());
        let updated = insert_before_close(&types, "Types", &default)
            .ok_or_else(|| RenderError::Image("[Content_Types].xml has no Types element".to_string()))?;
        self.set_part(CONTENT_TYPES_PART, updated.into_bytes());
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, RenderError> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = deterministic_options();
        for (name, data) in &self.parts {
            writer.start_file(name.as_str(), options)?;
            writer.write_all(data)?;
        }
        Ok(writer.finish()?.into_inner())
    }
}

/// Insert `child` just before `</root>`, expanding a self-closed `<root .../>` if needed.
fn insert_before_close(xml: &str, root: &str, child: &str) -> Option<String> {
    let close = format!("</{}>", root);
    if let Some(pos) = xml.rfind(&close) {
        let mut out = String::with_capacity(xml.len() + child.len());
        out.push_str(&xml[..pos]);
        out.push_str(child);
        out.push_str(&xml[pos..]);
        return Some(out);
    }
    let open = format!("<{}", root);
    let start = xml.find(&open)?;
    let end = start + xml[start..].find("/>")?;
    Some(format!("{}>{}{}{}", &xml[..end], child, close, &xml[end + 2..]))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_image_links_media_relationship_and_content_type() {
        let mut pkg = DocxPackage::from_bytes(&fixtures::docx_with_body("<w:p/>")).unwrap();
        let id = pkg.add_image(MAIN_DOCUMENT_PART, b"png-bytes", ImageKind::Png).unwrap();
        assert_eq!(id, "rIdImg1");
        assert_eq!(pkg.part("word/media/report_image1.png"), Some(&b"png-bytes"[..]));

        let rels = String::from_utf8(pkg.part("word/_rels/document.xml.rels").unwrap().to_vec()).unwrap();
        assert!(rels.contains(r#"Id="rIdImg1""#));
        assert!(rels.contains(r#"Target="media/report_image1.png""#));
        assert!(rels.ends_with("</Relationships>"));

        let second = pkg.add_image(MAIN_DOCUMENT_PART, b"more", ImageKind::Png).unwrap();
        assert_eq!(second, "rIdImg2");
        let types = String::from_utf8(pkg.part("[Content_Types].xml").unwrap().to_vec()).unwrap();
        assert_eq!(types.matches(r#"Extension="png""#).count(), 1);
    }

    #[test]
    fn drawing_ids_start_above_those_in_the_template() {
        let mut fresh = DocxPackage::from_bytes(&fixtures::docx_with_body("<w:p/>")).unwrap();
        assert_eq!(fresh.next_drawing_id(), 1000);

        let body = r#"<w:p><w:r><w:drawing><wp:inline><wp:docPr id="1500" name="Picture 1"/></wp:inline></w:drawing></w:r></w:p><w:p><w:r><w:drawing><wp:inline><wp:docPr name="Logo" id="7"/></wp:inline></w:drawing></w:r></w:p>"#;
        let mut pkg = DocxPackage::from_bytes(&fixtures::docx_with_body(body)).unwrap();
        assert_eq!(pkg.next_drawing_id(), 1501);
        assert_eq!(pkg.next_drawing_id(), 1502);
    }

    #[test]
    fn header_images_get_their_own_rels_part() {
        let mut pkg = DocxPackage::from_bytes(&fixtures::docx_with_body("<w:p/>")).unwrap();
        pkg.add_image("word/header1.xml", b"j", ImageKind::Jpeg).unwrap();
        assert!(pkg.part("word/_rels/header1.xml.rels").is_some());
    }

    #[test]
    fn round_trips_through_bytes() {
        let mut pkg = DocxPackage::from_bytes(&fixtures::docx_with_body("<w:p/>")).unwrap();
        pkg.set_part("word/extra.xml", b"<x/>".to_vec());
        let again = DocxPackage::from_bytes(&pkg.to_bytes().unwrap()).unwrap();
        assert_eq!(again.part("word/extra.xml"), Some(&b"<x/>"[..]));
        assert_eq!(again.text_parts(), vec![MAIN_DOCUMENT_PART.to_string()]);
    }

    #[test]
    fn insert_expands_self_closed_root() {
        let out = insert_before_close(r#"<?xml?><Types a="1"/>"#, "Types", "<D/>").unwrap();
        assert_eq!(out, r#"<?xml?><Types a="1"><D/></Types>"#);
    }
}
