use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use crate::ipc::error::{ok, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::report::{self, ReportFields};
use crate::resolver;
use serde_json::{json, Value};
use std::path::PathBuf;

use super::students::{lookup_err, seat_param};

fn write_report_file(path: &str, contents: &[u8]) -> Result<(), HandlerErr> {
    let out = PathBuf::from(path);
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| HandlerErr {
            code: "write_failed",
            message: e.to_string(),
            details: Some(json!({ "path": path })),
        })?;
    }
    std::fs::write(&out, contents).map_err(|e| HandlerErr {
        code: "write_failed",
        message: e.to_string(),
        details: Some(json!({ "path": path })),
    })
}

/// Fields to print: `studentData` as sent by the client, or a fresh lookup
/// when only `seatNumber` is given.
fn report_fields(state: &AppState, req: &Request) -> Result<ReportFields, Value> {
    match req.params.get("studentData") {
        Some(v @ Value::Object(_)) => serde_json::from_value(v.clone()).map_err(|e| {
            HandlerErr::bad_params(format!("invalid studentData: {e}")).response(&req.id)
        }),
        Some(Value::Null) | None => {
            let seat = seat_param(&req.params).map_err(|e| e.response(&req.id))?;
            if seat.trim().is_empty() {
                return Err(HandlerErr::bad_params("missing studentData").response(&req.id));
            }
            let ds = state
                .data()
                .ok_or_else(|| lookup_err(&req.id, resolver::LookupError::NoData))?;
            resolver::find(&ds.table, &ds.roles, &seat)
                .map(|rec| ReportFields::from(&rec))
                .map_err(|e| lookup_err(&req.id, e))
        }
        Some(_) => Err(HandlerErr::bad_params("studentData must be an object").response(&req.id)),
    }
}

fn handle_student_pdf(state: &AppState, req: &Request) -> Value {
    let fields = match report_fields(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let generated_at = match req.params.get("generatedAt").and_then(|v| v.as_str()) {
        Some(raw) => match report::parse_timestamp(raw) {
            Some(t) => t,
            None => {
                return HandlerErr::bad_params(format!(
                    "generatedAt must look like {}",
                    report::TIMESTAMP_FORMAT
                ))
                .response(&req.id)
            }
        },
        None => chrono::Local::now().naive_local(),
    };

    let bytes = match report::render_report(&fields, &state.config.report_title, generated_at) {
        Ok(v) => v,
        Err(e) => {
            tracing::error!(error = %e, "pdf render failed");
            return HandlerErr {
                code: "render_failed",
                message: "PDF generation failed".to_string(),
                details: None,
            }
            .response(&req.id);
        }
    };

    let file_name = fields.file_name();
    let mut result = json!({
        "fileName": file_name,
        "mimeType": report::MIME_TYPE,
        "byteCount": bytes.len(),
    });

    match req.params.get("outPath").and_then(|v| v.as_str()) {
        Some(out_path) if !out_path.trim().is_empty() => {
            if let Err(e) = write_report_file(out_path, &bytes) {
                tracing::error!(path = %out_path, error = %e.message, "pdf write failed");
                return e.response(&req.id);
            }
            result["path"] = json!(out_path);
        }
        _ => {
            result["pdfBase64"] = json!(STANDARD.encode(&bytes));
        }
    }

    tracing::debug!(file = %file_name, bytes = bytes.len(), "report rendered");
    ok(&req.id, result)
}

pub fn try_handle(state: &AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "reports.studentPdf" => Some(handle_student_pdf(state, req)),
        _ => None,
    }
}
