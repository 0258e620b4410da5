//! Weekly summary report built from the daily rows of one ISO week.

use chrono::{Datelike, Duration, NaiveDate};
use std::collections::BTreeMap;
use std::path::Path;

use crate::docx::DocxTemplate;
use crate::error::{BatchWarning, ReportError, Result};
use crate::models::TemplateContext;
use crate::naming::{format_date_title, parse_any_date};
use crate::services::sanitizer::SanitizedTemplate;
use crate::types::ReportRow;

pub const SUMMARY_FALLBACK: &str = "Summary not available.";
const SEE_SUMMARY: &str = "See attached summary.";
const NO_ISSUES: &str = "None.";
const NO_INCIDENTS: &str = "No incidents reported this week.";

pub const WEEKLY_KEYS: [&str; 14] = [
    "WEEK_NO",
    "PERIOD_FROM",
    "PERIOD_TO",
    "DOCUMENT_NO",
    "DATE",
    "PROJECT_NAME",
    "SUMMARY",
    "PROJECT_PROGRESS",
    "ISSUES",
    "DIFFICULTIES",
    "ONGOING_ACTIVITIES",
    "ACHIEVEMENTS",
    "PLANNED_ACTIVITIES",
    "HSE",
];

/// Monday and Sunday of the ISO week holding `date`.
pub fn week_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let monday = date - Duration::days(date.weekday().num_days_from_monday() as i64);
    (monday, monday + Duration::days(6))
}

/// Rows dated within `start..=end`, ordered by date. Rows with unparseable dates are left out.
pub fn rows_in_week(rows: &[ReportRow], start: NaiveDate, end: NaiveDate) -> Vec<ReportRow> {
    let mut dated: Vec<(NaiveDate, &ReportRow)> = rows
        .iter()
        .filter_map(|r| parse_any_date(&r.date).ok().map(|d| (d, r)))
        .filter(|(d, _)| *d >= start && *d <= end)
        .collect();
    dated.sort_by_key(|(d, _)| *d);
    dated.into_iter().map(|(_, r)| r.clone()).collect()
}

/// Produces the free-text summary paragraph for a week of rows.
pub trait Summarizer {
    fn summarize(&self, rows: &[ReportRow]) -> std::result::Result<String, String>;
}

/// Local per-site digest of executed work. Needs no network.
#[derive(Debug, Clone, Copy, Default)]
pub struct DigestSummarizer;

impl Summarizer for DigestSummarizer {
    fn summarize(&self, rows: &[ReportRow]) -> std::result::Result<String, String> {
        let mut per_site: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for row in rows {
            let site = row.site_name.trim();
            if site.is_empty() {
                continue;
            }
            let items = per_site.entry(site).or_default();
            for text in [&row.work_executed, &row.another_work_executed] {
                let text = text.trim();
                if !text.is_empty() && !items.contains(&text) {
                    items.push(text);
                }
            }
        }
        let lines: Vec<String> = per_site
            .into_iter()
            .map(|(site, items)| {
                if items.is_empty() {
                    format!("{}: no executed work recorded.", site)
                } else {
                    format!("{}: {}.", site, items.join("; ").trim_end_matches('.'))
                }
            })
            .collect();
        if lines.is_empty() {
            return Err("no site activity in this period".to_string());
        }
        Ok(lines.join("\n"))
    }
}

/// Inputs for one weekly document.
#[derive(Debug, Clone)]
pub struct WeeklyRequest {
    /// Any date inside the wanted week.
    pub week_of: NaiveDate,
    pub project_name: String,
    /// Issue date printed on the report.
    pub today: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct WeeklyReport {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub rows_used: usize,
    pub warnings: Vec<BatchWarning>,
}

fn bullets<'a>(items: impl IntoIterator<Item = &'a str>) -> Option<String> {
    let mut seen: Vec<&str> = Vec::new();
    for item in items {
        let item = item.trim();
        if !item.is_empty() && !seen.contains(&item) {
            seen.push(item);
        }
    }
    if seen.is_empty() {
        None
    } else {
        Some(seen.iter().map(|s| format!("• {}", s)).collect::<Vec<_>>().join("\n"))
    }
}

fn mentions(text: &str, words: &[&str]) -> bool {
    let lower = text.to_lowercase();
    words.iter().any(|w| lower.contains(w))
}

pub fn weekly_file_name(start: NaiveDate, end: NaiveDate) -> String {
    format!(
        "Weekly_Report_{}_{}.docx",
        start.format("%d.%m.%Y"),
        end.format("%d.%m.%Y")
    )
}

/// Context for the weekly template. `rows` should already be limited to the week.
pub fn build_weekly_context(
    rows: &[ReportRow],
    start: NaiveDate,
    end: NaiveDate,
    project_name: &str,
    summary: &str,
    today: NaiveDate,
) -> TemplateContext {
    let mut ctx = TemplateContext::new();
    ctx.insert_text("WEEK_NO", start.iso_week().week().to_string());
    ctx.insert_text("PERIOD_FROM", start.format("%d.%m.%Y").to_string());
    ctx.insert_text("PERIOD_TO", end.format("%d.%m.%Y").to_string());
    ctx.insert_text(
        "DOCUMENT_NO",
        format!("WR-{}-{}", start.format("%Y%m%d"), end.format("%Y%m%d")),
    );
    ctx.insert_text("DATE", today.format("%d.%m.%Y").to_string());
    ctx.insert_text("PROJECT_NAME", project_name);
    let summary = summary.trim();
    ctx.insert_text("SUMMARY", if summary.is_empty() { SUMMARY_FALLBACK } else { summary });

    let progress: Vec<String> = rows
        .iter()
        .filter_map(|r| {
            let done: Vec<&str> = [r.work_executed.trim(), r.another_work_executed.trim()]
                .into_iter()
                .filter(|s| !s.is_empty())
                .collect();
            if done.is_empty() {
                return None;
            }
            Some(format!("• {} ({}): {}", r.site_name, format_date_title(&r.date), done.join("; ")))
        })
        .collect();
    let progress = if progress.is_empty() {
        SEE_SUMMARY.to_string()
    } else {
        progress.join("\n")
    };
    ctx.insert_text("PROJECT_PROGRESS", progress);

    ctx.insert_text(
        "ISSUES",
        bullets(rows.iter().map(|r| r.challenges.as_str())).unwrap_or_else(|| NO_ISSUES.to_string()),
    );
    ctx.insert_text(
        "DIFFICULTIES",
        bullets(
            rows.iter()
                .map(|r| r.challenges.as_str())
                .filter(|c| mentions(c, &["difficult"])),
        )
        .unwrap_or_else(|| NO_ISSUES.to_string()),
    );
    ctx.insert_text(
        "ONGOING_ACTIVITIES",
        bullets(rows.iter().map(|r| r.work.as_str())).unwrap_or_else(|| SEE_SUMMARY.to_string()),
    );
    ctx.insert_text(
        "ACHIEVEMENTS",
        bullets(
            rows.iter()
                .flat_map(|r| [r.work_executed.as_str(), r.another_work_executed.as_str()])
                .filter(|w| mentions(w, &["complete", "finish"])),
        )
        .unwrap_or_else(|| SEE_SUMMARY.to_string()),
    );
    ctx.insert_text(
        "PLANNED_ACTIVITIES",
        bullets(rows.iter().map(|r| r.reaction_way_forward.as_str())).unwrap_or_else(|| SEE_SUMMARY.to_string()),
    );
    ctx.insert_text(
        "HSE",
        bullets(rows.iter().map(|r| r.comment_on_hse.as_str())).unwrap_or_else(|| NO_INCIDENTS.to_string()),
    );
    ctx
}

/// Render the weekly report for the week holding `request.week_of`.
pub fn generate_weekly_report(
    template_path: &Path,
    rows: &[ReportRow],
    request: &WeeklyRequest,
    summarizer: &dyn Summarizer,
) -> Result<WeeklyReport> {
    let (start, end) = week_bounds(request.week_of);
    let week_rows = rows_in_week(rows, start, end);
    tracing::info!(%start, %end, rows = week_rows.len(), "generating weekly report");

    let summary = match summarizer.summarize(&week_rows) {
        Ok(text) => text,
        Err(reason) => {
            tracing::warn!(%reason, "weekly summary unavailable");
            String::new()
        }
    };

    let sanitized = SanitizedTemplate::create(template_path)?;
    let template = DocxTemplate::open(sanitized.path())?;
    let declared = template.declared_placeholders();
    let missing: Vec<String> = WEEKLY_KEYS
        .iter()
        .filter(|k| !declared.contains(**k))
        .map(|k| k.to_string())
        .collect();
    let mut warnings = Vec::new();
    if !missing.is_empty() {
        tracing::warn!(?missing, "weekly template is missing placeholders");
        warnings.push(BatchWarning::MissingPlaceholders { placeholders: missing });
    }

    let ctx = build_weekly_context(&week_rows, start, end, &request.project_name, &summary, request.today);
    let file_name = weekly_file_name(start, end);
    let bytes = template.render(&ctx).map_err(|source| ReportError::Render {
        name: file_name.clone(),
        source,
    })?;
    Ok(WeeklyReport {
        file_name,
        bytes,
        rows_used: week_rows.len(),
        warnings,
    })
}
