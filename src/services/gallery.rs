//! Image gallery layout: packs uploaded images into fixed-width grid rows.
//!
//! Each input group of `images_per_row` images is staged to scratch files, decoded,
//! and the scratch files are removed before the next group is touched. Images that
//! fail to decode are skipped and reported; the remaining images stay densely packed.

use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

use crate::error::{ReportError, Result};
use crate::models::{
    CellMargins, GalleryBlock, GalleryCell, GalleryLayout, GalleryRow, LayoutParams, PlacedImage,
};
use crate::services::images::prepare_image_file;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedImage {
    /// Position in the caller's image list.
    pub index: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct GalleryOutcome {
    pub layout: GalleryLayout,
    pub skipped: Vec<SkippedImage>,
}

/// Lay out `images` using the system temp directory for scratch files.
pub fn build_gallery(images: &[Vec<u8>], params: &LayoutParams) -> Result<GalleryOutcome> {
    build_gallery_in(images, params, &std::env::temp_dir())
}

pub fn build_gallery_in(
    images: &[Vec<u8>],
    params: &LayoutParams,
    scratch_dir: &Path,
) -> Result<GalleryOutcome> {
    let per_row = params.images_per_row();
    let width_mm = params.content_width_mm();
    let height_mm = params.content_height_mm();

    let mut grid = GridBuilder::new(params);
    let mut skipped = Vec::new();

    for (group_idx, group) in images.chunks(per_row).enumerate() {
        let mut staged = Vec::with_capacity(group.len());
        for (offset, data) in group.iter().enumerate() {
            staged.push((group_idx * per_row + offset, stage_scratch(data, scratch_dir)?));
        }
        for (index, scratch) in staged {
            match prepare_image_file(scratch.path()) {
                Ok(image) => {
                    let (width_emu, height_emu) = image.extent_emu(width_mm, height_mm);
                    grid.push(PlacedImage {
                        image,
                        width_emu,
                        height_emu,
                    });
                }
                Err(reason) => {
                    tracing::warn!(index, %reason, "skipping gallery image");
                    skipped.push(SkippedImage { index, reason });
                }
            }
            // scratch file is removed here
        }
    }

    Ok(GalleryOutcome {
        layout: grid.finish(),
        skipped,
    })
}

fn stage_scratch(data: &[u8], dir: &Path) -> Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("site-report-")
        .suffix(".img")
        .tempfile_in(dir)
        .map_err(ReportError::Scratch)?;
    file.write_all(data).map_err(ReportError::Scratch)?;
    file.flush().map_err(ReportError::Scratch)?;
    Ok(file)
}

struct GridBuilder<'a> {
    params: &'a LayoutParams,
    columns: usize,
    per_row: usize,
    pending: Vec<PlacedImage>,
    rows_since_break: usize,
    layout: GalleryLayout,
}

impl<'a> GridBuilder<'a> {
    fn new(params: &'a LayoutParams) -> Self {
        GridBuilder {
            params,
            columns: params.grid_columns(),
            per_row: params.images_per_row(),
            pending: Vec::new(),
            rows_since_break: 0,
            layout: GalleryLayout::default(),
        }
    }

    fn push(&mut self, image: PlacedImage) {
        self.pending.push(image);
        if self.pending.len() == self.per_row {
            self.flush_row();
        }
    }

    fn flush_row(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        // Breaks are emitted lazily so a gallery never ends on an empty page.
        let rows_per_page = self.params.rows_per_page;
        if rows_per_page > 0 && self.rows_since_break == rows_per_page {
            self.layout.blocks.push(GalleryBlock::PageBreak);
            self.rows_since_break = 0;
        }
        let images = std::mem::take(&mut self.pending);
        self.layout
            .blocks
            .push(GalleryBlock::Row(grid_row(images, self.columns, self.params)));
        self.rows_since_break += 1;
    }

    fn finish(mut self) -> GalleryLayout {
        self.flush_row();
        self.layout
    }
}

fn grid_row(images: Vec<PlacedImage>, columns: usize, params: &LayoutParams) -> GalleryRow {
    let spacing = params.spacing_mm();
    let width_mm = params.content_width_mm();
    let mut images = images.into_iter();
    let cells = (0..columns)
        .map(|col| {
            let margins = CellMargins::for_column(spacing, col, columns);
            let image = images.next();
            GalleryCell {
                width_mm: width_mm + margins.left + margins.right,
                bordered: params.add_border && image.is_some(),
                margins,
                image,
            }
        })
        .collect();
    GalleryRow { cells }
}
