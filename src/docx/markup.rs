//! Placeholder discovery and substitution inside WordprocessingML parts.

use quick_xml::events::Event;
use quick_xml::Reader;
use regex::{Captures, Regex};
use std::collections::BTreeSet;
use std::sync::OnceLock;

use crate::docx::drawing::{gallery_xml, inline_picture};
use crate::docx::package::DocxPackage;
use crate::error::RenderError;
use crate::models::{ContextValue, TemplateContext};

const TEXT_OPEN: &str = r#"<w:t xml:space="preserve">"#;
const LINE_BREAK: &str = r#"</w:t><w:br/><w:t xml:space="preserve">"#;
const TAB: &str = r#"</w:t><w:tab/><w:t xml:space="preserve">"#;

/// `{{ Name }}`, `{{p Name }}` or `{{r Name }}`; group 1 is the name.
pub fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{\{\s*(?:[pr]\s+)?([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("placeholder regex")
    })
}

/// A `{{ ... }}` token whose braces or body may be interleaved with markup tags.
fn split_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{(?:<[^>]*>)*\{(?:[^{}<]|<[^>]*>)*\}(?:<[^>]*>)*\}").expect("split token regex")
    })
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("tag regex"))
}

/// Elements Word scatters through a run of typed text.
const RUN_LEVEL_TAGS: &[&str] = &["w:r", "w:rPr", "w:t", "w:proofErr", "w:bookmarkStart", "w:bookmarkEnd"];

fn tag_name(tag: &str) -> &str {
    tag.trim_start_matches('<')
        .trim_start_matches('/')
        .split(|c: char| c.is_whitespace() || c == '/' || c == '>')
        .next()
        .unwrap_or("")
}

/// Run-level tags plus empty formatting elements such as `<w:b/>`.
fn is_run_level(tag: &str) -> bool {
    let name = tag_name(tag);
    RUN_LEVEL_TAGS.contains(&name) || (tag.ends_with("/>") && name != "w:p")
}

/// Word often splits a typed `{{ Name }}` over several runs. Drop the markup inside
/// each token so it reads as one piece of text again. Tokens crossing anything above
/// run level (a paragraph, a hyperlink) are left alone and render as literal text.
pub fn merge_split_placeholders(xml: &str) -> String {
    split_token_re()
        .replace_all(xml, |caps: &Captures| {
            let token = &caps[0];
            let mergeable = tag_re().find_iter(token).all(|m| is_run_level(m.as_str()));
            if !token.contains('<') || !mergeable {
                token.to_string()
            } else {
                tag_re().replace_all(token, "").into_owned()
            }
        })
        .into_owned()
}

/// Names of every well-formed placeholder in `xml`.
pub fn find_placeholders(xml: &str) -> BTreeSet<String> {
    let merged = merge_split_placeholders(xml);
    placeholder_re()
        .captures_iter(&merged)
        .map(|c| c[1].to_string())
        .collect()
}

/// Substitute `ctx` into one text part. Media is registered on `package` against `part_name`.
pub fn render_part(
    xml: &str,
    part_name: &str,
    ctx: &TemplateContext,
    package: &mut DocxPackage,
) -> Result<String, RenderError> {
    let merged = merge_split_placeholders(xml);
    let with_galleries = expand_galleries(&merged, part_name, ctx, package)?;
    let rendered = substitute_inline(&with_galleries, part_name, ctx, package)?;
    let rendered = rendered.replace("<w:t>", TEXT_OPEN);
    check_well_formed(&rendered).map_err(|reason| RenderError::Markup {
        part: part_name.to_string(),
        reason,
    })?;
    Ok(rendered)
}

/// Replace each paragraph holding a gallery placeholder with the gallery tables.
fn expand_galleries(
    xml: &str,
    part_name: &str,
    ctx: &TemplateContext,
    package: &mut DocxPackage,
) -> Result<String, RenderError> {
    let mut out = String::with_capacity(xml.len());
    let mut rest = xml;
    loop {
        let hit = placeholder_re().captures_iter(rest).find_map(|c| {
            let whole = c.get(0)?;
            match ctx.get(&c[1]) {
                Some(ContextValue::Gallery(gallery)) => Some((whole.start(), whole.end(), gallery)),
                _ => None,
            }
        });
        let Some((start, end, gallery)) = hit else {
            out.push_str(rest);
            return Ok(out);
        };
        match paragraph_bounds(rest, start, end) {
            Some((p_start, p_end)) => {
                out.push_str(&rest[..p_start]);
                out.push_str(&gallery_xml(package, part_name, gallery)?);
                out.push_str("<w:p/>");
                rest = &rest[p_end..];
            }
            None => {
                tracing::warn!(part = part_name, "gallery placeholder outside a paragraph; dropped");
                out.push_str(&rest[..start]);
                rest = &rest[end..];
            }
        }
    }
}

fn paragraph_bounds(xml: &str, start: usize, end: usize) -> Option<(usize, usize)> {
    let before = &xml[..start];
    let open = match (before.rfind("<w:p>"), before.rfind("<w:p ")) {
        (Some(a), Some(b)) => a.max(b),
        (a, b) => a.or(b)?,
    };
    let close = end + xml[end..].find("</w:p>")? + "</w:p>".len();
    Some((open, close))
}

fn substitute_inline(
    xml: &str,
    part_name: &str,
    ctx: &TemplateContext,
    package: &mut DocxPackage,
) -> Result<String, RenderError> {
    let mut out = String::with_capacity(xml.len());
    let mut last = 0;
    for caps in placeholder_re().captures_iter(xml) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&xml[last..whole.start()]);
        match ctx.get(&caps[1]) {
            Some(ContextValue::Text(text)) => out.push_str(&text_markup(text)),
            Some(ContextValue::Image(placed)) => {
                out.push_str("</w:t>");
                out.push_str(&inline_picture(package, part_name, placed)?);
                out.push_str(TEXT_OPEN);
            }
            Some(ContextValue::Gallery(_)) | None => {}
        }
        last = whole.end();
    }
    out.push_str(&xml[last..]);
    Ok(out)
}

fn text_markup(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n");
    let escaped = quick_xml::escape::escape(normalized.as_str());
    escaped.replace('\n', LINE_BREAK).replace('\t', TAB)
}

/// Parse `xml` end to end; every start tag must be closed by a matching end tag.
pub fn check_well_formed(xml: &str) -> Result<(), String> {
    let mut reader = Reader::from_str(xml);
    let mut depth = 0usize;
    loop {
        match reader.read_event() {
            Ok(Event::Start(_)) => depth += 1,
            Ok(Event::End(e)) => {
                if depth == 0 {
                    return Err(format!(
                        "unexpected closing tag </{}>",
                        String::from_utf8_lossy(e.name().as_ref())
                    ));
                }
                depth -= 1;
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(format!("{} at byte {}", e, reader.buffer_position()));
            }
        }
    }
    if depth != 0 {
        return Err(format!("{} element(s) left open", depth));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::package::{fixtures, MAIN_DOCUMENT_PART};
    use crate::models::{GalleryBlock, GalleryCell, GalleryLayout, GalleryRow, CellMargins, ImageKind, PlacedImage, PreparedImage};

    fn package() -> DocxPackage {
        DocxPackage::from_bytes(&fixtures::docx_with_body("<w:p/>")).unwrap()
    }

    fn wrap(body: &str) -> String {
        format!(
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
            body
        )
    }

    fn placed() -> PlacedImage {
        PlacedImage {
            image: PreparedImage {
                bytes: vec![9; 4],
                kind: ImageKind::Png,
                width_px: 1,
                height_px: 1,
            },
            width_emu: 1_080_000,
            height_emu: 1_080_000,
        }
    }

    #[test]
    fn merges_placeholder_split_across_runs() {
        let xml = r#"<w:p><w:r><w:t>{{ Site_</w:t></w:r><w:proofErr w:type="spellStart"/><w:r><w:rPr><w:b/></w:rPr><w:t>Name }}</w:t></w:r></w:p>"#;
        let merged = merge_split_placeholders(xml);
        assert_eq!(merged, r#"<w:p><w:r><w:t>{{ Site_Name }}</w:t></w:r></w:p>"#);
        assert!(find_placeholders(xml).contains("Site_Name"));
    }

    #[test]
    fn merges_split_braces() {
        let xml = r#"<w:r><w:t>{</w:t></w:r><w:r><w:t>{Date}</w:t></w:r><w:r><w:t>}</w:t></w:r>"#;
        assert_eq!(merge_split_placeholders(xml), "<w:r><w:t>{{Date}}</w:t></w:r>");
    }

    #[test]
    fn does_not_merge_across_paragraphs() {
        let xml = r#"<w:p><w:r><w:t>{{ A</w:t></w:r></w:p><w:p><w:r><w:t>B }}</w:t></w:r></w:p>"#;
        assert_eq!(merge_split_placeholders(xml), xml);
    }

    #[test]
    fn does_not_merge_across_a_hyperlink() {
        let xml = wrap(r#"<w:p><w:hyperlink r:id="rId9"><w:r><w:t>{{ Site_</w:t></w:r></w:hyperlink><w:r><w:t>Name }}</w:t></w:r></w:p>"#);
        assert_eq!(merge_split_placeholders(&xml), xml);

        let mut ctx = TemplateContext::new();
        ctx.insert_text("Site_Name", "Site A");
        let out = render_part(&xml, MAIN_DOCUMENT_PART, &ctx, &mut package()).unwrap();
        assert!(out.contains("</w:hyperlink>"));
        assert!(out.contains("{{ Site_"));
        assert!(!out.contains("Site A"));
    }

    #[test]
    fn finds_prefixed_placeholders() {
        let found = find_placeholders("<w:t>{{p Images }} {{r Work}} {{ Date }} {{ bad name }}</w:t>");
        let names: Vec<&str> = found.iter().map(String::as_str).collect();
        assert_eq!(names, vec!["Date", "Images", "Work"]);
    }

    #[test]
    fn text_is_escaped_and_line_breaks_kept() {
        let mut ctx = TemplateContext::new();
        ctx.insert_text("Work", "Walls & <slab>\nsecond line");
        let xml = wrap("<w:p><w:r><w:t>{{ Work }}</w:t></w:r></w:p>");
        let out = render_part(&xml, MAIN_DOCUMENT_PART, &ctx, &mut package()).unwrap();
        assert!(out.contains("Walls &amp; &lt;slab&gt;"));
        assert!(out.contains("<w:br/>"));
        assert!(out.contains("second line"));
    }

    #[test]
    fn unknown_placeholders_render_empty() {
        let xml = wrap("<w:p><w:r><w:t>[{{ Nope }}]</w:t></w:r></w:p>");
        let out = render_part(&xml, MAIN_DOCUMENT_PART, &TemplateContext::new(), &mut package()).unwrap();
        assert!(out.contains(r#"<w:t xml:space="preserve">[]</w:t>"#));
    }

    #[test]
    fn image_value_becomes_inline_drawing() {
        let mut ctx = TemplateContext::new();
        ctx.insert("Consultant_Signature", ContextValue::Image(placed()));
        let mut pkg = package();
        let xml = wrap("<w:p><w:r><w:t>{{ Consultant_Signature }}</w:t></w:r></w:p>");
        let out = render_part(&xml, MAIN_DOCUMENT_PART, &ctx, &mut pkg).unwrap();
        assert_eq!(out.matches("<pic:pic ").count(), 1);
        assert!(pkg.part("word/media/report_image1.png").is_some());
    }

    #[test]
    fn gallery_replaces_its_paragraph() {
        let margins = CellMargins::for_column(2.0, 0, 2);
        let cell = GalleryCell {
            margins,
            width_mm: 73.0,
            image: Some(placed()),
            bordered: false,
        };
        let empty = GalleryCell {
            image: None,
            ..cell.clone()
        };
        let mut ctx = TemplateContext::new();
        ctx.insert(
            "Images",
            ContextValue::Gallery(GalleryLayout {
                blocks: vec![GalleryBlock::Row(GalleryRow { cells: vec![cell, empty] })],
            }),
        );
        let xml = wrap(r#"<w:p><w:pPr><w:jc w:val="center"/></w:pPr><w:r><w:t>{{p Images }}</w:t></w:r></w:p><w:p><w:r><w:t>after</w:t></w:r></w:p>"#);
        let out = render_part(&xml, MAIN_DOCUMENT_PART, &ctx, &mut package()).unwrap();
        assert!(!out.contains("Images"));
        assert!(out.contains("<w:tbl>"));
        assert!(out.contains("</w:tbl><w:p/><w:p>"));
        assert!(!out.contains("w:jc"));
    }

    #[test]
    fn malformed_output_is_reported() {
        assert!(check_well_formed("<a><b></a>").is_err());
        assert!(check_well_formed("<a><b/>").is_err());
        assert!(check_well_formed("<?xml version=\"1.0\"?><a><b/></a>").is_ok());
    }
}
