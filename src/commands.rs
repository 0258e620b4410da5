use chrono::{Local, NaiveDate};
use clap::Args;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::AppConfig;
use crate::excel;
use crate::naming::parse_any_date;
use crate::request::ReportRequest;
use crate::services::normalizer::normalize_rows;
use crate::services::{
    generate_weekly_report, select_rows, unique_sites_and_dates, AssetResolver, ColumnMap, DigestSummarizer,
    ReportGenerator, RowSelection, WeeklyRequest,
};
use crate::types::{Discipline, ImageMap, SiteDate, SCHEMA_WIDTH};

/// Where report rows come from.
#[derive(Args, Debug, Clone)]
pub struct RowSourceArgs {
    /// Spreadsheet (.xlsx, .xlsm, .xls, .ods) or JSON request file.
    #[arg(long, value_name = "PATH")]
    pub rows: PathBuf,
    /// Worksheet holding the reports (spreadsheets only).
    #[arg(long)]
    pub sheet: Option<String>,
    /// 1-based header row; 0 when the sheet has no header.
    #[arg(long)]
    pub header_row: Option<u32>,
}

#[derive(Args, Debug, Clone)]
pub struct SitesArgs {
    #[command(flatten)]
    pub source: RowSourceArgs,
    #[arg(long, help = "Output machine-readable JSON")]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub source: RowSourceArgs,
    /// Only rows for this site. Repeatable.
    #[arg(long = "site")]
    pub sites: Vec<String>,
    /// Only rows for this date. Repeatable.
    #[arg(long = "date")]
    pub dates: Vec<String>,
    #[arg(long, default_value = "Civil")]
    pub discipline: Discipline,
    /// Photo for one site and day, as `SITE|DATE=PATH`. Repeatable.
    #[arg(long = "image", value_name = "SITE|DATE=PATH")]
    pub images: Vec<String>,
    #[arg(long)]
    pub width_mm: Option<f64>,
    #[arg(long)]
    pub height_mm: Option<f64>,
    #[arg(long)]
    pub spacing_mm: Option<f64>,
    #[arg(long)]
    pub per_row: Option<usize>,
    #[arg(long)]
    pub rows_per_page: Option<usize>,
    #[arg(long)]
    pub border: bool,
    #[arg(long)]
    pub template: Option<PathBuf>,
    /// Archive path. Defaults to a timestamped file in Downloads (or Desktop).
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct WeeklyArgs {
    #[command(flatten)]
    pub source: RowSourceArgs,
    /// Any date inside the wanted week. Defaults to today.
    #[arg(long)]
    pub week_of: Option<String>,
    #[arg(long)]
    pub template: Option<PathBuf>,
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Serialize)]
pub struct SitesListing {
    pub sites: Vec<String>,
    pub dates: Vec<String>,
}

/// Rows in sheet order, how to read them, and any uploads that came with them.
struct LoadedRows {
    rows: Vec<Vec<String>>,
    columns: ColumnMap,
    images: ImageMap,
}

fn is_request_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

fn load_rows(source: &RowSourceArgs, config: &AppConfig) -> Result<LoadedRows, String> {
    if is_request_file(&source.rows) {
        let request = ReportRequest::load(&source.rows).map_err(|e| e.to_string())?;
        let images = request.image_map().map_err(|e| e.to_string())?;
        return Ok(LoadedRows {
            rows: normalize_rows(&request.rows, config.schema_width),
            columns: ColumnMap::positional(),
            images,
        });
    }

    let sheet = source.sheet.as_deref().unwrap_or(&config.sheet_name);
    let header_row = match source.header_row {
        Some(0) => None,
        Some(n) => Some(n),
        None => config.header_row,
    };
    let read = excel::read_sheet_rows(&source.rows, sheet, header_row).map_err(|e| {
        match excel::get_sheet_names(&source.rows) {
            Ok(names) if !names.iter().any(|n| n == sheet) => {
                format!("{} (available sheets: {})", e, names.join(", "))
            }
            _ => e.to_string(),
        }
    })?;
    let rows = if read.columns == ColumnMap::positional() {
        normalize_rows(&read.rows, config.schema_width)
    } else {
        read.rows
    };
    Ok(LoadedRows {
        rows,
        columns: read.columns,
        images: ImageMap::new(),
    })
}

/// Parse `SITE|DATE=PATH` and read the image file.
fn read_image_arg(arg: &str) -> Result<(SiteDate, Vec<u8>), String> {
    let (key, path) = arg
        .split_once('=')
        .ok_or_else(|| format!("Image '{}' must look like SITE|DATE=PATH.", arg))?;
    let key = SiteDate::parse(key).ok_or_else(|| format!("Image key '{}' must look like SITE|DATE.", key))?;
    let bytes = fs::read(path.trim()).map_err(|e| format!("Could not read image {}: {}", path.trim(), e))?;
    Ok((key, bytes))
}

/// Timestamped file in Downloads (or Desktop) that does not exist yet.
fn default_output_path(stem: &str, extension: &str) -> Result<PathBuf, String> {
    let dir = dirs::download_dir()
        .or_else(dirs::desktop_dir)
        .ok_or("Could not find Downloads or Desktop folder.")?;
    Ok(unused_path(&dir, stem, extension))
}

fn unused_path(dir: &Path, stem: &str, extension: &str) -> PathBuf {
    let mut p = dir.join(format!("{}.{}", stem, extension));
    let mut counter = 2u32;
    while p.exists() {
        p = dir.join(format!("{}_{}.{}", stem, counter, extension));
        counter += 1;
    }
    p
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<(), String> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| format!("Could not create {}: {}", parent.display(), e))?;
    }
    fs::write(path, bytes).map_err(|e| format!("Could not write {}: {}", path.display(), e))
}

fn print_warnings<W: std::fmt::Display>(warnings: &[W]) {
    for w in warnings {
        eprintln!("warning: {}", w);
    }
}

pub fn list_sites(args: &SitesArgs, config: &AppConfig) -> Result<(), String> {
    let loaded = load_rows(&args.source, config)?;
    let ordered: Vec<Vec<String>> = loaded
        .rows
        .iter()
        .map(|cells| loaded.columns.reorder(cells, SCHEMA_WIDTH))
        .collect();
    let (sites, dates) = unique_sites_and_dates(&ordered);
    if args.json {
        let listing = SitesListing { sites, dates };
        let text = serde_json::to_string_pretty(&listing).map_err(|e| e.to_string())?;
        println!("{}", text);
    } else {
        println!("Sites ({}):", sites.len());
        for s in &sites {
            println!("  {}", s);
        }
        println!("Dates ({}):", dates.len());
        for d in &dates {
            println!("  {}", d);
        }
    }
    Ok(())
}

pub fn generate(args: &GenerateArgs, config: &AppConfig) -> Result<PathBuf, String> {
    let LoadedRows {
        rows,
        columns,
        mut images,
    } = load_rows(&args.source, config)?;

    let selection = RowSelection {
        sites: args.sites.iter().map(|s| s.trim().to_string()).collect(),
        dates: args.dates.iter().map(|d| d.trim().to_string()).collect(),
        discipline: Some(args.discipline),
        discipline_col: config.discipline_col,
    };
    let records = select_rows(&rows, &columns, &selection);
    if records.is_empty() {
        return Err("No rows match the selected sites and dates.".to_string());
    }

    for arg in &args.images {
        let (key, bytes) = read_image_arg(arg)?;
        images.entry(key).or_default().push(bytes);
    }

    let mut layout = config.layout.clone();
    if let Some(v) = args.width_mm {
        layout.width_mm = v;
    }
    if args.height_mm.is_some() {
        layout.height_mm = args.height_mm;
    }
    if let Some(v) = args.spacing_mm {
        layout.spacing_mm = v;
    }
    if let Some(v) = args.per_row {
        layout.images_per_row = v;
    }
    if let Some(v) = args.rows_per_page {
        layout.rows_per_page = v;
    }
    if args.border {
        layout.add_border = true;
    }

    let template = args.template.clone().unwrap_or_else(|| config.template_path.clone());
    let generator = ReportGenerator::new(template)
        .with_assets(AssetResolver::new(&config.assets_dir))
        .with_signatories(config.signatories.clone())
        .with_schema_width(config.schema_width);
    let archive = generator
        .generate_rows(&records, &images, args.discipline, &layout)
        .map_err(|e| e.to_string())?;

    let out = match &args.out {
        Some(p) => p.clone(),
        None => default_output_path(
            &format!("Site_Reports_{}", Local::now().format("%Y%m%d_%H%M%S")),
            "zip",
        )?,
    };
    write_output(&out, &archive.bytes)?;
    println!("Wrote {} report(s) to {}", archive.entries.len(), out.display());
    print_warnings(&archive.warnings);
    Ok(out)
}

pub fn weekly(args: &WeeklyArgs, config: &AppConfig) -> Result<PathBuf, String> {
    let loaded = load_rows(&args.source, config)?;
    let records = select_rows(&loaded.rows, &loaded.columns, &RowSelection::all());
    let today = Local::now().date_naive();
    let week_of: NaiveDate = match &args.week_of {
        Some(s) => parse_any_date(s)?,
        None => today,
    };

    let template = args
        .template
        .clone()
        .unwrap_or_else(|| config.weekly_template_path.clone());
    let request = WeeklyRequest {
        week_of,
        project_name: config.project_name.clone(),
        today,
    };
    let report =
        generate_weekly_report(&template, &records, &request, &DigestSummarizer).map_err(|e| e.to_string())?;

    let out = match &args.out {
        Some(p) => p.clone(),
        None => default_output_path(report.file_name.trim_end_matches(".docx"), "docx")?,
    };
    write_output(&out, &report.bytes)?;
    println!(
        "Wrote weekly report ({} row(s)) to {}",
        report.rows_used,
        out.display()
    );
    print_warnings(&report.warnings);
    Ok(out)
}
