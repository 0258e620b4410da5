use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Columns of the report sheet, in sheet order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReportField {
    Date,
    SiteName,
    District,
    Work,
    HumanResources,
    Supply,
    WorkExecuted,
    CommentOnWork,
    AnotherWorkExecuted,
    CommentOnHse,
    ConsultantRecommendation,
    NonCompliantWork,
    ReactionWayForward,
    Challenges,
}

/// Full schema width (K).
pub const SCHEMA_WIDTH: usize = 14;
/// Width of the older sheet layout that stops after the recommendation column.
pub const LEGACY_SCHEMA_WIDTH: usize = 11;

impl ReportField {
    pub const ALL: [ReportField; SCHEMA_WIDTH] = [
        ReportField::Date,
        ReportField::SiteName,
        ReportField::District,
        ReportField::Work,
        ReportField::HumanResources,
        ReportField::Supply,
        ReportField::WorkExecuted,
        ReportField::CommentOnWork,
        ReportField::AnotherWorkExecuted,
        ReportField::CommentOnHse,
        ReportField::ConsultantRecommendation,
        ReportField::NonCompliantWork,
        ReportField::ReactionWayForward,
        ReportField::Challenges,
    ];

    /// Template placeholder bound to this column.
    pub fn placeholder(self) -> &'static str {
        match self {
            ReportField::Date => "Date",
            ReportField::SiteName => "Site_Name",
            ReportField::District => "District",
            ReportField::Work => "Work",
            ReportField::HumanResources => "Human_Resources",
            ReportField::Supply => "Supply",
            ReportField::WorkExecuted => "Work_Executed",
            ReportField::CommentOnWork => "Comment_on_work",
            ReportField::AnotherWorkExecuted => "Another_Work_Executed",
            ReportField::CommentOnHse => "Comment_on_HSE",
            ReportField::ConsultantRecommendation => "Consultant_Recommandation",
            ReportField::NonCompliantWork => "Non_Compliant_work",
            ReportField::ReactionWayForward => "Reaction_and_WayForword",
            ReportField::Challenges => "challenges",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Resolve a sheet header or placeholder spelling to its column.
    /// Case, spacing and punctuation are ignored ("Site name", "site-names", "SITE").
    pub fn from_header(raw: &str) -> Option<ReportField> {
        let key = normalize_header_key(raw);
        if key.is_empty() {
            return None;
        }
        if let Some(field) = ReportField::ALL
            .iter()
            .copied()
            .find(|f| normalize_header_key(f.placeholder()) == key)
        {
            return Some(field);
        }
        HEADER_ALIASES
            .iter()
            .find(|(alias, _)| *alias == key)
            .map(|(_, field)| *field)
    }
}

/// Lowercase, collapse non-alphanumeric runs to `_`, trim underscores.
pub fn normalize_header_key(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_sep = false;
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_sep = true;
        }
    }
    out
}

const HEADER_ALIASES: &[(&str, ReportField)] = &[
    ("site", ReportField::SiteName),
    ("site_names", ReportField::SiteName),
    ("comments_on_work", ReportField::CommentOnWork),
    ("comments_on_hse", ReportField::CommentOnHse),
    ("hse", ReportField::CommentOnHse),
    ("recommendation", ReportField::ConsultantRecommendation),
    ("recommendations", ReportField::ConsultantRecommendation),
    ("consultant_recommendation", ReportField::ConsultantRecommendation),
    ("consultant_recommendations", ReportField::ConsultantRecommendation),
    ("non_compliance_work", ReportField::NonCompliantWork),
    ("reaction_way_forword", ReportField::ReactionWayForward),
    ("reaction_way_forward", ReportField::ReactionWayForward),
    ("reaction_and_way_forward", ReportField::ReactionWayForward),
    ("reaction_and_way_forword", ReportField::ReactionWayForward),
    ("reaction_wayforward", ReportField::ReactionWayForward),
    ("reaction_wayforword", ReportField::ReactionWayForward),
    ("reaction_amp_wayforword", ReportField::ReactionWayForward),
    ("challenge", ReportField::Challenges),
];

/// One normalized sheet row. Site and date are trimmed; other fields are kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    pub date: String,
    pub site_name: String,
    pub district: String,
    pub work: String,
    pub human_resources: String,
    pub supply: String,
    pub work_executed: String,
    pub comment_on_work: String,
    pub another_work_executed: String,
    pub comment_on_hse: String,
    pub consultant_recommendation: String,
    pub non_compliant_work: String,
    pub reaction_way_forward: String,
    pub challenges: String,
}

impl ReportRow {
    /// Build from positional cells. Missing trailing cells are empty; extra cells are ignored.
    pub fn from_cells<S: AsRef<str>>(cells: &[S]) -> Self {
        let mut row = ReportRow::default();
        for field in ReportField::ALL {
            if let Some(value) = cells.get(field.index()) {
                row.set(field, value.as_ref().to_string());
            }
        }
        row.date = row.date.trim().to_string();
        row.site_name = row.site_name.trim().to_string();
        row
    }

    pub fn get(&self, field: ReportField) -> &str {
        match field {
            ReportField::Date => &self.date,
            ReportField::SiteName => &self.site_name,
            ReportField::District => &self.district,
            ReportField::Work => &self.work,
            ReportField::HumanResources => &self.human_resources,
            ReportField::Supply => &self.supply,
            ReportField::WorkExecuted => &self.work_executed,
            ReportField::CommentOnWork => &self.comment_on_work,
            ReportField::AnotherWorkExecuted => &self.another_work_executed,
            ReportField::CommentOnHse => &self.comment_on_hse,
            ReportField::ConsultantRecommendation => &self.consultant_recommendation,
            ReportField::NonCompliantWork => &self.non_compliant_work,
            ReportField::ReactionWayForward => &self.reaction_way_forward,
            ReportField::Challenges => &self.challenges,
        }
    }

    pub fn set(&mut self, field: ReportField, value: String) {
        let slot = match field {
            ReportField::Date => &mut self.date,
            ReportField::SiteName => &mut self.site_name,
            ReportField::District => &mut self.district,
            ReportField::Work => &mut self.work,
            ReportField::HumanResources => &mut self.human_resources,
            ReportField::Supply => &mut self.supply,
            ReportField::WorkExecuted => &mut self.work_executed,
            ReportField::CommentOnWork => &mut self.comment_on_work,
            ReportField::AnotherWorkExecuted => &mut self.another_work_executed,
            ReportField::CommentOnHse => &mut self.comment_on_hse,
            ReportField::ConsultantRecommendation => &mut self.consultant_recommendation,
            ReportField::NonCompliantWork => &mut self.non_compliant_work,
            ReportField::ReactionWayForward => &mut self.reaction_way_forward,
            ReportField::Challenges => &mut self.challenges,
        };
        *slot = value;
    }

    /// Key used to look up uploaded images for this row.
    pub fn site_date(&self) -> SiteDate {
        SiteDate::new(&self.site_name, &self.date)
    }
}

/// Upload key: one site on one day.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SiteDate {
    pub site: String,
    pub date: String,
}

impl SiteDate {
    pub fn new(site: &str, date: &str) -> Self {
        SiteDate {
            site: site.trim().to_string(),
            date: date.trim().to_string(),
        }
    }

    /// Parse the `site|date` form used by request files and the CLI.
    pub fn parse(key: &str) -> Option<Self> {
        let (site, date) = key.split_once('|')?;
        Some(SiteDate::new(site, date))
    }
}

impl fmt::Display for SiteDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.site, self.date)
    }
}

/// Uploaded image bytes per (site, date), in upload order.
pub type ImageMap = HashMap<SiteDate, Vec<Vec<u8>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Discipline {
    Civil,
    Electrical,
}

impl Discipline {
    pub fn as_str(self) -> &'static str {
        match self {
            Discipline::Civil => "Civil",
            Discipline::Electrical => "Electrical",
        }
    }
}

impl fmt::Display for Discipline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Discipline {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "civil" => Ok(Discipline::Civil),
            "electrical" => Ok(Discipline::Electrical),
            other => Err(format!("Unknown discipline '{}'. Use Civil or Electrical.", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatoryRole {
    Consultant,
    Contractor,
}

impl SignatoryRole {
    pub fn key_prefix(self) -> &'static str {
        match self {
            SignatoryRole::Consultant => "Consultant",
            SignatoryRole::Contractor => "Contractor",
        }
    }
}

impl fmt::Display for SignatoryRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key_prefix())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signatory {
    pub name: String,
    pub title: String,
    /// Asset name handed to the asset resolver, with or without extension.
    pub signature: String,
}

impl Signatory {
    fn new(name: &str, title: &str, signature: &str) -> Self {
        Signatory {
            name: name.to_string(),
            title: title.to_string(),
            signature: signature.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatoryProfile {
    pub consultant: Signatory,
    pub contractor: Signatory,
}

impl SignatoryProfile {
    pub fn signatory(&self, role: SignatoryRole) -> &Signatory {
        match role {
            SignatoryRole::Consultant => &self.consultant,
            SignatoryRole::Contractor => &self.contractor,
        }
    }
}

/// Signatories per discipline. Injected at call time so callers can substitute their own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatoryTable {
    pub civil: SignatoryProfile,
    pub electrical: SignatoryProfile,
}

impl SignatoryTable {
    pub fn profile(&self, discipline: Discipline) -> &SignatoryProfile {
        match discipline {
            Discipline::Civil => &self.civil,
            Discipline::Electrical => &self.electrical,
        }
    }
}

impl Default for SignatoryTable {
    fn default() -> Self {
        let contractor = Signatory::new("Issac HABIMANA", "Electrical Engineer", "issac_habimana.jpg");
        SignatoryTable {
            civil: SignatoryProfile {
                consultant: Signatory::new(
                    "IRANZI Prince Jean Claude",
                    "Civil Engineer",
                    "iranzi_prince_jean_claude.jpg",
                ),
                contractor: contractor.clone(),
            },
            electrical: SignatoryProfile {
                consultant: Signatory::new("Alexis IVUGIZA", "Electrical Engineer", "alexis_ivugiza.jpg"),
                contractor,
            },
        }
    }
}
