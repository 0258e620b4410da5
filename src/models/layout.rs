use serde::{Deserialize, Serialize};

/// Gallery grids never have fewer columns than this, even for one image per row.
pub const MIN_GRID_COLUMNS: usize = 2;

pub const EMU_PER_MM: f64 = 36_000.0;
pub const TWIPS_PER_MM: f64 = 1440.0 / 25.4;

/// Millimetres to Word twips (1/20 pt), rounded, never negative.
pub fn mm_to_twips(mm: f64) -> u32 {
    let twips = (mm * TWIPS_PER_MM).round();
    if twips.is_finite() && twips > 0.0 {
        twips as u32
    } else {
        0
    }
}

pub fn mm_to_emu(mm: f64) -> u64 {
    let emu = mm * EMU_PER_MM;
    if emu.is_finite() && emu > 0.0 {
        emu as u64
    } else {
        0
    }
}

/// Caller-facing gallery settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutParams {
    /// Rendered width of every image.
    pub width_mm: f64,
    /// Fixed rendered height; `None` keeps each image's aspect ratio.
    pub height_mm: Option<f64>,
    /// Gap between neighbouring images and between an image and the grid edge.
    pub spacing_mm: f64,
    pub images_per_row: usize,
    pub add_border: bool,
    /// Grid rows per page before a page break; 0 disables breaks.
    pub rows_per_page: usize,
}

impl Default for LayoutParams {
    fn default() -> Self {
        LayoutParams {
            width_mm: 70.0,
            height_mm: None,
            spacing_mm: 2.0,
            images_per_row: 2,
            add_border: false,
            rows_per_page: 2,
        }
    }
}

impl LayoutParams {
    pub fn images_per_row(&self) -> usize {
        self.images_per_row.max(1)
    }

    pub fn grid_columns(&self) -> usize {
        self.images_per_row().max(MIN_GRID_COLUMNS)
    }

    pub fn content_width_mm(&self) -> f64 {
        if self.width_mm.is_finite() {
            self.width_mm.max(1.0)
        } else {
            1.0
        }
    }

    /// Zero or unusable heights mean "derive from aspect ratio".
    pub fn content_height_mm(&self) -> Option<f64> {
        self.height_mm
            .filter(|h| h.is_finite() && *h > 0.0)
            .map(|h| h.max(1.0))
    }

    pub fn spacing_mm(&self) -> f64 {
        if self.spacing_mm.is_finite() {
            self.spacing_mm.max(0.0)
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellMargins {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

impl CellMargins {
    /// Outer edges get the full spacing, edges facing a neighbour get half of it,
    /// so two adjacent images end up exactly `spacing_mm` apart.
    pub fn for_column(spacing_mm: f64, column_index: usize, total_columns: usize) -> Self {
        let spacing = if spacing_mm.is_finite() { spacing_mm.max(0.0) } else { 0.0 };
        let (left, right) = if total_columns <= 1 {
            (spacing, spacing)
        } else {
            let inner = spacing / 2.0;
            let left = if column_index == 0 { spacing } else { inner };
            let right = if column_index == total_columns - 1 { spacing } else { inner };
            (left, right)
        };
        CellMargins {
            top: spacing,
            bottom: spacing,
            left,
            right,
        }
    }
}

/// Image ready for embedding in a word-processing package.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedImage {
    pub bytes: Vec<u8>,
    pub kind: ImageKind,
    pub width_px: u32,
    pub height_px: u32,
}

impl PreparedImage {
    /// Extent in EMU for a target width, keeping aspect unless a height is forced.
    pub fn extent_emu(&self, width_mm: f64, height_mm: Option<f64>) -> (u64, u64) {
        let cx = mm_to_emu(width_mm);
        let cy = match height_mm {
            Some(h) => mm_to_emu(h),
            None if self.width_px > 0 => {
                (cx as f64 * self.height_px as f64 / self.width_px as f64).round() as u64
            }
            None => cx,
        };
        (cx, cy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageKind {
    Png,
    Jpeg,
    Gif,
    Bmp,
}

impl ImageKind {
    pub fn extension(self) -> &'static str {
        match self {
            ImageKind::Png => "png",
            ImageKind::Jpeg => "jpeg",
            ImageKind::Gif => "gif",
            ImageKind::Bmp => "bmp",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ImageKind::Png => "image/png",
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Gif => "image/gif",
            ImageKind::Bmp => "image/bmp",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedImage {
    pub image: PreparedImage,
    pub width_emu: u64,
    pub height_emu: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GalleryCell {
    pub margins: CellMargins,
    pub width_mm: f64,
    pub image: Option<PlacedImage>,
    /// Only occupied cells are bordered.
    pub bordered: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GalleryRow {
    pub cells: Vec<GalleryCell>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GalleryBlock {
    Row(GalleryRow),
    PageBreak,
}

/// Grid of image rows, each with the same column count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GalleryLayout {
    pub blocks: Vec<GalleryBlock>,
}

impl GalleryLayout {
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = &GalleryRow> {
        self.blocks.iter().filter_map(|b| match b {
            GalleryBlock::Row(row) => Some(row),
            GalleryBlock::PageBreak => None,
        })
    }

    pub fn image_count(&self) -> usize {
        self.rows()
            .map(|r| r.cells.iter().filter(|c| c.image.is_some()).count())
            .sum()
    }
}
