//! Daily and weekly site reports rendered from a DOCX template.
//!
//! Rows come from a spreadsheet or a JSON request file. Each selected row becomes one
//! document with its uploaded photos laid out in a grid, and the documents are bundled
//! into a single zip archive.

pub mod commands;
pub mod config;
pub mod docx;
pub mod error;
pub mod excel;
pub mod models;
pub mod naming;
pub mod request;
pub mod services;
pub mod types;

pub use error::{BatchWarning, RenderError, ReportError, Result};
pub use models::{LayoutParams, TemplateContext};
pub use naming::{format_date_title, normalize_date, report_base_name, safe_filename};
pub use services::{
    build_gallery, generate_reports, generate_weekly_report, normalize_rows, resolve_asset, unique_sites_and_dates,
    GeneratedArchive, ReportGenerator,
};
pub use types::{Discipline, ImageMap, ReportField, ReportRow, SignatoryTable, SiteDate};
