//! Row normalization: fixed-width padding, header-driven column mapping, selection.

use std::collections::BTreeSet;

use crate::naming::normalize_date;
use crate::types::{Discipline, ReportField, ReportRow, SiteDate, SCHEMA_WIDTH};

/// Pad every row with empty strings to exactly `width` cells, dropping any extra.
pub fn normalize_rows<S: AsRef<str>>(raw: &[Vec<S>], width: usize) -> Vec<Vec<String>> {
    raw.iter()
        .map(|row| {
            let mut cells: Vec<String> = row.iter().take(width).map(|c| c.as_ref().to_string()).collect();
            cells.resize(width, String::new());
            cells
        })
        .collect()
}

/// Distinct trimmed sites (column 1) and dates (column 0), sorted. Blank values are skipped.
pub fn unique_sites_and_dates<S: AsRef<str>>(rows: &[Vec<S>]) -> (Vec<String>, Vec<String>) {
    let mut sites = BTreeSet::new();
    let mut dates = BTreeSet::new();
    for row in rows {
        if let Some(site) = row.get(ReportField::SiteName.index()).map(|c| c.as_ref().trim()) {
            if !site.is_empty() {
                sites.insert(site.to_string());
            }
        }
        if let Some(date) = row.get(ReportField::Date.index()).map(|c| c.as_ref().trim()) {
            if !date.is_empty() {
                dates.insert(date.to_string());
            }
        }
    }
    (sites.into_iter().collect(), dates.into_iter().collect())
}

/// Positional rows into records, padded to `width` first so narrower schemas leave later fields empty.
pub fn to_report_rows<S: AsRef<str>>(raw: &[Vec<S>], width: usize) -> Vec<ReportRow> {
    normalize_rows(raw, width.min(SCHEMA_WIDTH))
        .iter()
        .map(|cells| ReportRow::from_cells(cells))
        .collect()
}

/// Sorted distinct (site, date) pairs; rows missing either are skipped.
pub fn site_date_pairs(rows: &[ReportRow]) -> Vec<SiteDate> {
    rows.iter()
        .map(ReportRow::site_date)
        .filter(|k| !k.site.is_empty() && !k.date.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Where each report field lives in a sheet row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    sources: [Option<usize>; SCHEMA_WIDTH],
}

impl ColumnMap {
    /// Sheet columns already in canonical order.
    pub fn positional() -> Self {
        let mut sources = [None; SCHEMA_WIDTH];
        for field in ReportField::ALL {
            sources[field.index()] = Some(field.index());
        }
        ColumnMap { sources }
    }

    /// Map by header text. `None` unless both the date and site columns are recognised.
    /// The first column claiming a field wins.
    pub fn from_headers<S: AsRef<str>>(headers: &[S]) -> Option<Self> {
        let mut sources = [None; SCHEMA_WIDTH];
        for (col, header) in headers.iter().enumerate() {
            if let Some(field) = ReportField::from_header(header.as_ref()) {
                let slot = &mut sources[field.index()];
                if slot.is_none() {
                    *slot = Some(col);
                }
            }
        }
        let map = ColumnMap { sources };
        if map.source(ReportField::Date).is_some() && map.source(ReportField::SiteName).is_some() {
            Some(map)
        } else {
            None
        }
    }

    pub fn source(&self, field: ReportField) -> Option<usize> {
        self.sources[field.index()]
    }

    pub fn mapped_fields(&self) -> usize {
        self.sources.iter().filter(|s| s.is_some()).count()
    }

    fn cell<'a, S: AsRef<str>>(&self, cells: &'a [S], field: ReportField) -> &'a str {
        self.source(field)
            .and_then(|col| cells.get(col))
            .map(|c| c.as_ref())
            .unwrap_or("")
    }

    /// Cells in canonical schema order, `width` wide.
    pub fn reorder<S: AsRef<str>>(&self, cells: &[S], width: usize) -> Vec<String> {
        let mut out: Vec<String> = ReportField::ALL
            .iter()
            .take(width)
            .map(|f| self.cell(cells, *f).to_string())
            .collect();
        out.resize(width, String::new());
        out
    }

    pub fn to_row<S: AsRef<str>>(&self, cells: &[S]) -> ReportRow {
        ReportRow::from_cells(&self.reorder(cells, SCHEMA_WIDTH))
    }
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self::positional()
    }
}

/// Which rows of a sheet to report on. Empty sets select everything.
#[derive(Debug, Clone, Default)]
pub struct RowSelection {
    pub sites: BTreeSet<String>,
    pub dates: BTreeSet<String>,
    pub discipline: Option<Discipline>,
    /// Sheet column naming each row's discipline. Rows with an empty cell there always match.
    pub discipline_col: Option<usize>,
}

impl RowSelection {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn matches<S: AsRef<str>>(&self, cells: &[S], columns: &ColumnMap) -> bool {
        let site = columns.cell(cells, ReportField::SiteName).trim();
        if !self.sites.is_empty() && !self.sites.contains(site) {
            return false;
        }
        let date = columns.cell(cells, ReportField::Date).trim();
        if !self.dates.is_empty()
            && !self.dates.contains(date)
            && !self.dates.iter().any(|d| normalize_date(d) == normalize_date(date))
        {
            return false;
        }
        if let (Some(discipline), Some(col)) = (self.discipline, self.discipline_col) {
            let cell = cells.get(col).map(|c| c.as_ref().trim()).unwrap_or("");
            if !cell.is_empty() && !cell.eq_ignore_ascii_case(discipline.as_str()) {
                return false;
            }
        }
        true
    }
}

/// Keep the rows `selection` matches, in input order, as records.
pub fn select_rows<S: AsRef<str>>(raw: &[Vec<S>], columns: &ColumnMap, selection: &RowSelection) -> Vec<ReportRow> {
    raw.iter()
        .filter(|cells| selection.matches(cells.as_slice(), columns))
        .map(|cells| columns.to_row(cells.as_slice()))
        .collect()
}
