mod common;

use chrono::NaiveDate;
use rust_xlsxwriter::Workbook;
use std::path::{Path, PathBuf};

use common::{document_xml, entry_bytes, write_template, DAILY_BODY};
use site_report_lib::excel::{get_sheet_names, read_sheet_rows, DEFAULT_SHEET};
use site_report_lib::services::weekly::WEEKLY_KEYS;
use site_report_lib::services::{
    generate_weekly_report, select_rows, ColumnMap, DigestSummarizer, ReportGenerator, RowSelection, WeeklyRequest,
};
use site_report_lib::{Discipline, ImageMap, LayoutParams, ReportError};

/// Sheet with shuffled, aliased headers and a discipline column at the end.
fn write_reports_sheet(dir: &Path) -> PathBuf {
    let path = dir.join("reports.xlsx");
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(DEFAULT_SHEET).unwrap();
    let headers = ["Site", "Date", "District", "Work executed", "Challenge", "Discipline"];
    for (col, h) in headers.iter().enumerate() {
        sheet.write_string(0, col as u16, *h).unwrap();
    }
    let data = [
        ["Site A", "06/08/2025", "Gasabo", "Trenching completed", "Difficult access road", "Civil"],
        ["Site B", "07/08/2025", "Kicukiro", "Poles erected", "", "Electrical"],
        ["", "", "", "", "", ""],
        ["Site A", "08/08/2025", "Gasabo", "Cable pulling", "", ""],
    ];
    for (r, cells) in data.iter().enumerate() {
        for (col, value) in cells.iter().enumerate() {
            if !value.is_empty() {
                sheet.write_string(r as u32 + 1, col as u16, *value).unwrap();
            }
        }
    }
    sheet.write_number(5, 0, 42.0).unwrap();
    workbook.add_worksheet().set_name("Notes").unwrap();
    workbook.save(&path).unwrap();
    path
}

#[test]
fn aliased_headers_map_columns_by_name() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_reports_sheet(dir.path());

    let sheet = read_sheet_rows(&path, DEFAULT_SHEET, Some(1)).unwrap();
    assert_eq!(sheet.headers[0], "Site");
    assert_ne!(sheet.columns, ColumnMap::positional());
    // the blank row is dropped, the stray number row is kept
    assert_eq!(sheet.rows.len(), 4);
    assert_eq!(sheet.rows[3][0], "42");

    let rows = select_rows(&sheet.rows, &sheet.columns, &RowSelection::all());
    assert_eq!(rows[0].site_name, "Site A");
    assert_eq!(rows[0].date, "06/08/2025");
    assert_eq!(rows[0].district, "Gasabo");
    assert_eq!(rows[0].work_executed, "Trenching completed");
    assert_eq!(rows[0].challenges, "Difficult access road");
}

#[test]
fn selection_filters_by_site_date_and_discipline() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_reports_sheet(dir.path());
    let sheet = read_sheet_rows(&path, DEFAULT_SHEET, Some(1)).unwrap();

    let selection = RowSelection {
        discipline: Some(Discipline::Civil),
        discipline_col: Some(5),
        ..RowSelection::all()
    };
    let civil = select_rows(&sheet.rows, &sheet.columns, &selection);
    let sites: Vec<&str> = civil.iter().map(|r| r.site_name.as_str()).collect();
    // Site B is electrical; rows with no discipline match either
    assert_eq!(sites, vec!["Site A", "Site A", "42"]);

    let selection = RowSelection {
        sites: ["Site A".to_string()].into_iter().collect(),
        dates: ["2025-08-08".to_string()].into_iter().collect(),
        ..RowSelection::all()
    };
    let picked = select_rows(&sheet.rows, &sheet.columns, &selection);
    assert_eq!(picked.len(), 1);
    assert_eq!(picked[0].work_executed, "Cable pulling");
}

#[test]
fn sheet_without_headers_is_read_positionally() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_reports_sheet(dir.path());
    let sheet = read_sheet_rows(&path, DEFAULT_SHEET, None).unwrap();
    assert!(sheet.headers.is_empty());
    assert_eq!(sheet.columns, ColumnMap::positional());
    assert_eq!(sheet.rows.len(), 5);
}

#[test]
fn unknown_sheet_is_a_row_source_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_reports_sheet(dir.path());
    assert_eq!(get_sheet_names(&path).unwrap(), vec!["Reports", "Notes"]);
    let err = read_sheet_rows(&path, "Daily", Some(1)).unwrap_err();
    assert!(matches!(err, ReportError::RowSource(_)));
}

#[test]
fn spreadsheet_rows_flow_into_the_archive() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_reports_sheet(dir.path());
    let template = write_template(dir.path(), "daily.docx", DAILY_BODY);
    let sheet = read_sheet_rows(&path, DEFAULT_SHEET, Some(1)).unwrap();
    let selection = RowSelection {
        sites: ["Site A".to_string()].into_iter().collect(),
        ..RowSelection::all()
    };
    let rows = select_rows(&sheet.rows, &sheet.columns, &selection);

    let out = ReportGenerator::new(&template)
        .generate_rows(&rows, &ImageMap::new(), Discipline::Civil, &LayoutParams::default())
        .unwrap();
    assert_eq!(out.entries, vec!["Site A_06.08.2025.docx", "Site A_08.08.2025.docx"]);
    let xml = document_xml(&entry_bytes(&out.bytes, &out.entries[0]));
    assert!(xml.contains("Trenching completed"));
    assert!(xml.contains("Difficult access road"));
}

#[test]
fn weekly_report_covers_monday_to_sunday() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_reports_sheet(dir.path());
    let body: String = WEEKLY_KEYS
        .iter()
        .map(|k| format!("<w:p><w:r><w:t>{}: {{{{ {} }}}}</w:t></w:r></w:p>", k, k))
        .collect();
    let template = write_template(dir.path(), "weekly.docx", &body);
    let sheet = read_sheet_rows(&path, DEFAULT_SHEET, Some(1)).unwrap();
    let rows = select_rows(&sheet.rows, &sheet.columns, &RowSelection::all());

    let request = WeeklyRequest {
        week_of: NaiveDate::from_ymd_opt(2025, 8, 7).unwrap(),
        project_name: "Mini-grid rollout".to_string(),
        today: NaiveDate::from_ymd_opt(2025, 8, 11).unwrap(),
    };
    let report = generate_weekly_report(&template, &rows, &request, &DigestSummarizer).unwrap();

    assert_eq!(report.file_name, "Weekly_Report_04.08.2025_10.08.2025.docx");
    assert_eq!(report.rows_used, 3);
    assert!(report.warnings.is_empty());
    let xml = document_xml(&report.bytes);
    assert!(xml.contains("PERIOD_FROM: 04.08.2025"));
    assert!(xml.contains("DATE: 11.08.2025"));
    assert!(xml.contains("PROJECT_NAME: Mini-grid rollout"));
    assert!(xml.contains("Site A: Trenching completed; Cable pulling."));
    assert!(xml.contains("• Difficult access road"));
}
