//! WordprocessingML fragments for inline pictures and the image gallery grid.

use std::fmt::Write as _;

use crate::docx::package::DocxPackage;
use crate::error::RenderError;
use crate::models::layout::mm_to_twips;
use crate::models::{CellMargins, GalleryBlock, GalleryCell, GalleryLayout, GalleryRow, PlacedImage};

const BORDER_COLOR: &str = "888888";
/// Eighths of a point.
const BORDER_SIZE: u32 = 4;

pub const PAGE_BREAK_PARAGRAPH: &str = r#"<w:p><w:r><w:br w:type="page"/></w:r></w:p>"#;

/// `<w:drawing>` for `placed`, with its media registered against `owner_part`.
/// Namespaces are declared locally so the fragment works in any part.
pub fn inline_picture(
    package: &mut DocxPackage,
    owner_part: &str,
    placed: &PlacedImage,
) -> Result<String, RenderError> {
    let rel_id = package.add_image(owner_part, &placed.image.bytes, placed.image.kind)?;
    let id = package.next_drawing_id();
    let (cx, cy) = (placed.width_emu, placed.height_emu);
    Ok(format!(
        concat!(
            r#"<w:drawing><wp:inline xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing" distT="0" distB="0" distL="0" distR="0">"#,
            r#"<wp:extent cx="{cx}" cy="{cy}"/><wp:docPr id="{id}" name="Picture {id}"/>"#,
            r#"<wp:cNvGraphicFramePr><a:graphicFrameLocks xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" noChangeAspect="1"/></wp:cNvGraphicFramePr>"#,
            r#"<a:graphic xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main"><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/picture">"#,
            r#"<pic:pic xmlns:pic="http://schemas.openxmlformats.org/drawingml/2006/picture">"#,
            r#"<pic:nvPicPr><pic:cNvPr id="{id}" name="image{id}.{ext}"/><pic:cNvPicPr/></pic:nvPicPr>"#,
            r#"<pic:blipFill><a:blip xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" r:embed="{rel}"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill>"#,
            r#"<pic:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></pic:spPr>"#,
            r#"</pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing>"#,
        ),
        cx = cx,
        cy = cy,
        id = id,
        ext = placed.image.kind.extension(),
        rel = rel_id,
    ))
}

/// Block-level markup for a gallery: one fixed-layout table per grid row, page breaks between.
pub fn gallery_xml(
    package: &mut DocxPackage,
    owner_part: &str,
    gallery: &GalleryLayout,
) -> Result<String, RenderError> {
    let mut out = String::new();
    for block in &gallery.blocks {
        match block {
            GalleryBlock::Row(row) => out.push_str(&row_table(package, owner_part, row)?),
            GalleryBlock::PageBreak => out.push_str(PAGE_BREAK_PARAGRAPH),
        }
    }
    Ok(out)
}

fn row_table(package: &mut DocxPackage, owner_part: &str, row: &GalleryRow) -> Result<String, RenderError> {
    let widths: Vec<u32> = row.cells.iter().map(|c| mm_to_twips(c.width_mm)).collect();
    let total: u32 = widths.iter().sum();

    let mut xml = String::new();
    let _ = write!(
        xml,
        r#"<w:tbl><w:tblPr><w:tblW w:w="{}" w:type="dxa"/><w:tblLayout w:type="fixed"/><w:tblLook w:val="04A0" w:firstRow="1" w:lastRow="0" w:firstColumn="1" w:lastColumn="0" w:noHBand="0" w:noVBand="1"/></w:tblPr><w:tblGrid>"#,
        total
    );
    for w in &widths {
        let _ = write!(xml, r#"<w:gridCol w:w="{}"/>"#, w);
    }
    xml.push_str("</w:tblGrid><w:tr>");
    for (cell, width) in row.cells.iter().zip(&widths) {
        xml.push_str(&cell_xml(package, owner_part, cell, *width)?);
    }
    xml.push_str("</w:tr></w:tbl>");
    Ok(xml)
}

fn cell_xml(
    package: &mut DocxPackage,
    owner_part: &str,
    cell: &GalleryCell,
    width_twips: u32,
) -> Result<String, RenderError> {
    let mut xml = String::new();
    let _ = write!(xml, r#"<w:tc><w:tcPr><w:tcW w:w="{}" w:type="dxa"/>"#, width_twips);
    if cell.bordered {
        xml.push_str(&borders_xml());
    }
    xml.push_str(&margins_xml(&cell.margins));
    xml.push_str("</w:tcPr><w:p>");
    if let Some(placed) = &cell.image {
        xml.push_str("<w:r>");
        xml.push_str(&inline_picture(package, owner_part, placed)?);
        xml.push_str("</w:r>");
    }
    xml.push_str("</w:p></w:tc>");
    Ok(xml)
}

fn margins_xml(m: &CellMargins) -> String {
    let mut xml = String::from("<w:tcMar>");
    for (side, value) in [("top", m.top), ("left", m.left), ("bottom", m.bottom), ("right", m.right)] {
        let _ = write!(xml, r#"<w:{} w:w="{}" w:type="dxa"/>"#, side, mm_to_twips(value));
    }
    xml.push_str("</w:tcMar>");
    xml
}

fn borders_xml() -> String {
    let mut xml = String::from("<w:tcBorders>");
    for side in ["top", "left", "bottom", "right"] {
        let _ = write!(
            xml,
            r#"<w:{} w:val="single" w:sz="{}" w:space="0" w:color="{}"/>"#,
            side, BORDER_SIZE, BORDER_COLOR
        );
    }
    xml.push_str("</w:tcBorders>");
    xml
}
