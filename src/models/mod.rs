pub mod context;
pub mod layout;

pub use context::{ContextValue, TemplateContext};
pub use layout::{
    CellMargins, GalleryBlock, GalleryCell, GalleryLayout, GalleryRow, ImageKind, LayoutParams,
    PlacedImage, PreparedImage, MIN_GRID_COLUMNS,
};
