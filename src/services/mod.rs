pub mod assets;
pub mod batch;
pub mod context;
pub mod gallery;
pub mod images;
pub mod normalizer;
pub mod sanitizer;
pub mod weekly;

pub use assets::{resolve_asset, AssetResolver};
pub use batch::{generate_reports, GeneratedArchive, ReportGenerator};
pub use gallery::{build_gallery, GalleryOutcome};
pub use normalizer::{normalize_rows, select_rows, site_date_pairs, unique_sites_and_dates, ColumnMap, RowSelection};
pub use sanitizer::SanitizedTemplate;
pub use weekly::{generate_weekly_report, DigestSummarizer, Summarizer, WeeklyReport, WeeklyRequest};
