#![allow(dead_code)]

use image::{DynamicImage, ImageFormat, RgbImage};
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const DOCUMENT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"/>"#;

/// Daily template body: every row field, the gallery and both signatories.
pub const DAILY_BODY: &str = concat!(
    "<w:p><w:r><w:t>{{ Site_Name }} / {{ District }} / {{ Date }}</w:t></w:r></w:p>",
    "<w:p><w:r><w:t>{{ Work }} {{ Human_Resources }} {{ Supply }}</w:t></w:r></w:p>",
    "<w:p><w:r><w:t>{{ Work_Executed }} {{ Comment_on_work }} {{ Another_Work_Executed }}</w:t></w:r></w:p>",
    "<w:p><w:r><w:t>{{ Comment_on_HSE }} {{ Consultant_Recommandation }} {{ Non_Compliant_work }}</w:t></w:r></w:p>",
    "<w:p><w:r><w:t>{{ Reaction&amp;WayForword }} {{ challenges }}</w:t></w:r></w:p>",
    "<w:p><w:r><w:t>{{p Images }}</w:t></w:r></w:p>",
    "<w:p><w:r><w:t>{{ Consultant_Name }}, {{ Consultant_Title }} {{ Consultant_Signature }}</w:t></w:r></w:p>",
    "<w:p><w:r><w:t>{{ Contractor_Name }}, {{ Contractor_Title }} {{ Contractor_Signature }}</w:t></w:r></w:p>",
);

/// Minimal word package with `body_xml` inside `<w:body>`.
pub fn docx_with_body(body_xml: &str) -> Vec<u8> {
    docx_without_parts(body_xml, &[])
}

/// Like [`docx_with_body`], minus the named parts.
pub fn docx_without_parts(body_xml: &str, omit: &[&str]) -> Vec<u8> {
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><w:body>{}<w:sectPr/></w:body></w:document>"#,
        body_xml
    );
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, data) in [
        ("[Content_Types].xml", CONTENT_TYPES),
        ("_rels/.rels", PACKAGE_RELS),
        ("word/document.xml", document.as_str()),
        ("word/_rels/document.xml.rels", DOCUMENT_RELS),
    ] {
        if omit.contains(&name) {
            continue;
        }
        writer.start_file(name, options).unwrap();
        writer.write_all(data.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

pub fn write_template(dir: &Path, name: &str, body_xml: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, docx_with_body(body_xml)).unwrap();
    path
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([30, 120, 200])));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

/// Positional row with the given date and site, padded to `width` cells.
pub fn row(date: &str, site: &str, width: usize) -> Vec<String> {
    let mut cells = vec![date.to_string(), site.to_string()];
    cells.resize(width, String::new());
    cells
}

pub fn entry_names(archive: &[u8]) -> Vec<String> {
    let zip = ZipArchive::new(Cursor::new(archive)).unwrap();
    zip.file_names().map(str::to_string).collect()
}

pub fn entry_bytes(archive: &[u8], name: &str) -> Vec<u8> {
    let mut zip = ZipArchive::new(Cursor::new(archive)).unwrap();
    let mut out = Vec::new();
    zip.by_name(name).unwrap().read_to_end(&mut out).unwrap();
    out
}

/// `word/document.xml` of a rendered document.
pub fn document_xml(docx: &[u8]) -> String {
    String::from_utf8(entry_bytes(docx, "word/document.xml")).unwrap()
}
