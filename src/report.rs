use crate::pdf::{self, DocumentInfo, Font, Page};
use crate::resolver::{StudentRecord, MAX_SCORE, NOT_AVAILABLE};
use chrono::NaiveDateTime;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

pub const DEFAULT_TITLE: &str = "STEM G12 Official Results";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const MIME_TYPE: &str = "application/pdf";

/// Student record as clients send it back for printing, usually a
/// `students.search` result. Every field is optional and may be a string or a
/// number; missing fields print as `N/A` and `maxScore` defaults to 500.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportFields {
    pub seat_number: Option<Value>,
    pub name: Option<Value>,
    pub total_score: Option<Value>,
    pub max_score: Option<Value>,
    pub status: Option<Value>,
    pub rank: Option<Value>,
}

impl From<&StudentRecord> for ReportFields {
    fn from(rec: &StudentRecord) -> Self {
        Self {
            seat_number: Some(json!(rec.seat_number)),
            name: Some(json!(rec.name)),
            total_score: Some(json!(rec.total_score)),
            max_score: Some(json!(rec.max_score)),
            status: Some(json!(rec.status.as_str())),
            rank: Some(json!(rec.rank)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("{field} must be a string or a number")]
    UnsupportedField { field: &'static str },
}

struct ResolvedFields {
    seat_number: String,
    name: String,
    total_score: String,
    max_score: String,
    status: String,
    rank: String,
}

impl ReportFields {
    fn resolve(&self) -> Result<ResolvedFields, RenderError> {
        Ok(ResolvedFields {
            seat_number: printable_or_na("seatNumber", self.seat_number.as_ref())?,
            name: printable_or_na("name", self.name.as_ref())?,
            total_score: printable_or_na("totalScore", self.total_score.as_ref())?,
            max_score: scalar_text("maxScore", self.max_score.as_ref())?
                .filter(|s| !pdf::encode_latin1(s).is_empty())
                .unwrap_or_else(|| MAX_SCORE.to_string()),
            status: printable_or_na("status", self.status.as_ref())?,
            rank: printable_or_na("rank", self.rank.as_ref())?,
        })
    }

    /// Download name, e.g. `STEM_Result_A004.pdf`.
    pub fn file_name(&self) -> String {
        let seat = scalar_text("seatNumber", self.seat_number.as_ref())
            .ok()
            .flatten()
            .map(|s| {
                s.trim()
                    .chars()
                    .map(|c| {
                        if c.is_alphanumeric() || c == '-' || c == '_' {
                            c
                        } else {
                            '_'
                        }
                    })
                    .collect::<String>()
            })
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "unknown".to_string());
        format!("STEM_Result_{seat}.pdf")
    }
}

fn scalar_text(field: &'static str, value: Option<&Value>) -> Result<Option<String>, RenderError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(Value::Array(_)) | Some(Value::Object(_)) => {
            Err(RenderError::UnsupportedField { field })
        }
    }
}

// A field with nothing drawable left (e.g. an Arabic-only name) prints as N/A.
fn printable_or_na(field: &'static str, value: Option<&Value>) -> Result<String, RenderError> {
    Ok(scalar_text(field, value)?
        .filter(|s| !pdf::encode_latin1(s).is_empty())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string()))
}

pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT).ok()
}

/// Renders the one-page results slip.
pub fn render_report(
    fields: &ReportFields,
    title: &str,
    generated_at: NaiveDateTime,
) -> Result<Vec<u8>, RenderError> {
    let r = fields.resolve()?;

    let mut page = Page::a4();
    let (width, height) = (page.width(), page.height());
    let margin = 50.0;

    page.text_centered(Font::Bold, 24.0, height - 80.0, title);
    page.rule(margin, width - margin, height - 100.0, 1.0);

    let mut y = height - 150.0;
    page.text(Font::Bold, 16.0, margin, y, "Student Information");
    y -= 30.0;

    let lines = [
        format!("Seat Number: {}", r.seat_number),
        format!("Name: {}", r.name),
        format!("Total Score: {}/{}", r.total_score, r.max_score),
        format!("Status: {}", r.status),
        format!("Rank: #{}", r.rank),
    ];
    for line in &lines {
        page.text(Font::Regular, 12.0, 70.0, y, line);
        y -= 25.0;
    }
    page.rule(margin, width - margin, y - 5.0, 0.5);

    page.rule(margin, width - margin, 70.0, 0.5);
    page.text_centered(
        Font::Oblique,
        10.0,
        50.0,
        &format!("Generated on: {}", generated_at.format(TIMESTAMP_FORMAT)),
    );

    Ok(pdf::write_pdf(
        &[page],
        &DocumentInfo {
            title: format!("{} - {}", title, r.seat_number),
            created: generated_at,
        },
    ))
}
