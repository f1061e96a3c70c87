use crate::dataset::Table;
use serde::{Serialize, Serializer};
use thiserror::Error;
use unicode_general_category::{get_general_category, GeneralCategory};

pub const MAX_SCORE: u32 = 500;
pub const PASSING_SCORE: f64 = 250.0;
pub const NAME_NOT_AVAILABLE: &str = "Name not available";
pub const NOT_AVAILABLE: &str = "N/A";

const IDENTIFIER_KEYWORDS: [&str; 3] = ["seat", "id", "seating"];
const NAME_KEYWORDS: [&str; 2] = ["name", "arabic"];
const SCORE_KEYWORDS: [&str; 3] = ["total", "score", "degree"];
const STATUS_KEYWORDS: [&str; 3] = ["status", "result", "pass"];

/// Compared case-insensitively against name and status cells.
const PLACEHOLDERS: [&str; 4] = ["nan", "none", "null", "n/a"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleColumn {
    pub index: usize,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnRoles {
    /// Only `None` for a table without columns.
    pub identifier: Option<RoleColumn>,
    pub display_name: Option<RoleColumn>,
    pub score: Option<RoleColumn>,
    pub status: Option<RoleColumn>,
}

/// Assigns semantic roles to columns by keyword. For each role the first column
/// (in file order) whose lower-cased name contains any keyword wins.
pub fn resolve_roles(columns: &[String]) -> ColumnRoles {
    let identifier = find_column(columns, &IDENTIFIER_KEYWORDS).or_else(|| {
        columns.first().map(|name| RoleColumn {
            index: 0,
            name: name.clone(),
        })
    });
    ColumnRoles {
        identifier,
        display_name: find_column(columns, &NAME_KEYWORDS),
        score: find_column(columns, &SCORE_KEYWORDS),
        status: find_column(columns, &STATUS_KEYWORDS),
    }
}

fn find_column(columns: &[String], keywords: &[&str]) -> Option<RoleColumn> {
    columns.iter().enumerate().find_map(|(index, name)| {
        let lower = name.to_lowercase();
        keywords
            .iter()
            .any(|k| lower.contains(k))
            .then(|| RoleColumn {
                index,
                name: name.clone(),
            })
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Pass,
    Fail,
    Unknown,
    /// Upper-cased value of a status cell other than PASS / FAIL / UNKNOWN.
    Reported(String),
}

impl Status {
    pub fn as_str(&self) -> &str {
        match self {
            Status::Pass => "PASS",
            Status::Fail => "FAIL",
            Status::Unknown => "UNKNOWN",
            Status::Reported(s) => s.as_str(),
        }
    }

    fn from_cell(raw: &str) -> Self {
        let up = raw.trim().to_uppercase();
        match up.as_str() {
            "PASS" => Status::Pass,
            "FAIL" => Status::Fail,
            "UNKNOWN" => Status::Unknown,
            _ => Status::Reported(up),
        }
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecord {
    pub seat_number: String,
    pub name: String,
    pub total_score: String,
    pub max_score: u32,
    pub status: Status,
    /// 1-based row position in the results file, not a score ranking.
    pub rank: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("No data available")]
    NoData,
    #[error("Seat number required")]
    MissingIdentifier,
    #[error("Student not found")]
    NotFound { identifier: String },
}

impl LookupError {
    pub fn code(&self) -> &'static str {
        match self {
            LookupError::NoData => "no_data",
            LookupError::MissingIdentifier => "bad_params",
            LookupError::NotFound { .. } => "not_found",
        }
    }
}

/// Looks up a row by identifier: trimmed, case-insensitive, exact. Duplicate
/// identifiers resolve to the first row.
pub fn find(
    table: &Table,
    roles: &ColumnRoles,
    identifier: &str,
) -> Result<StudentRecord, LookupError> {
    let Some(id_col) = roles.identifier.as_ref().filter(|_| !table.is_empty()) else {
        return Err(LookupError::NoData);
    };
    let query = identifier.trim();
    if query.is_empty() {
        return Err(LookupError::MissingIdentifier);
    }

    let wanted = query.to_uppercase();
    let (pos, row) = table
        .rows()
        .enumerate()
        .find(|(_, row)| row[id_col.index].trim().to_uppercase() == wanted)
        .ok_or_else(|| LookupError::NotFound {
            identifier: query.to_string(),
        })?;

    let cell = |role: &Option<RoleColumn>| role.as_ref().map(|c| row[c.index].as_str());
    let score = cell(&roles.score);

    Ok(StudentRecord {
        seat_number: row[id_col.index].clone(),
        name: display_name(cell(&roles.display_name)),
        total_score: score
            .map(str::to_string)
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        max_score: MAX_SCORE,
        status: resolve_status(cell(&roles.status), score),
        rank: pos + 1,
    })
}

pub fn display_name(raw: Option<&str>) -> String {
    let Some(raw) = raw.map(str::trim).filter(|s| is_present(s)) else {
        return NAME_NOT_AVAILABLE.to_string();
    };
    let cleaned: String = raw
        .chars()
        .filter(|c| is_printable(*c) || c.is_whitespace())
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        NAME_NOT_AVAILABLE.to_string()
    } else {
        cleaned.to_string()
    }
}

// Control, format, private-use and unassigned code points render as blank boxes in
// browsers and PDFs. U+FFFD marks bytes the decoder could not map.
fn is_printable(c: char) -> bool {
    c != '\u{FFFD}'
        && !matches!(
            get_general_category(c),
            GeneralCategory::Control
                | GeneralCategory::Format
                | GeneralCategory::Surrogate
                | GeneralCategory::PrivateUse
                | GeneralCategory::Unassigned
                | GeneralCategory::LineSeparator
                | GeneralCategory::ParagraphSeparator
        )
}

fn is_present(s: &str) -> bool {
    !s.is_empty() && !PLACEHOLDERS.iter().any(|p| s.eq_ignore_ascii_case(p))
}

/// A status cell wins; otherwise the score decides; with neither the status is unknown.
pub fn resolve_status(status: Option<&str>, score: Option<&str>) -> Status {
    if let Some(s) = status.map(str::trim).filter(|s| is_present(s)) {
        return Status::from_cell(s);
    }
    match score.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) if is_passing_score(s) => Status::Pass,
        Some(_) => Status::Fail,
        None => Status::Unknown,
    }
}

/// `%` and thousands separators are ignored; unparseable scores do not pass.
/// Arabic-Indic and extended Arabic-Indic digits count like ASCII digits.
pub fn is_passing_score(raw: &str) -> bool {
    let ascii: String = raw
        .chars()
        .filter(|c| !matches!(c, '%' | ','))
        .map(ascii_digit)
        .collect();
    ascii
        .trim()
        .parse::<f64>()
        .map(|v| v >= PASSING_SCORE)
        .unwrap_or(false)
}

fn ascii_digit(c: char) -> char {
    let offset = match c {
        '\u{0660}'..='\u{0669}' => c as u32 - 0x0660,
        '\u{06F0}'..='\u{06F9}' => c as u32 - 0x06F0,
        _ => return c,
    };
    char::from(b'0' + offset as u8)
}
