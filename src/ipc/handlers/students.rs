use crate::ipc::error::{err, ok, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::resolver::{self, LookupError};
use serde_json::{json, Value};

/// Reads the seat number from `seatNumber`, or `seating_no` as older web
/// clients send it. Numbers are accepted and searched as text.
pub(super) fn seat_param(params: &Value) -> Result<String, HandlerErr> {
    let raw = params
        .get("seatNumber")
        .or_else(|| params.get("seating_no"));
    match raw {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(_) => Err(HandlerErr::bad_params("seatNumber must be a string")),
    }
}

pub(super) fn lookup_err(id: &str, e: LookupError) -> Value {
    let details = match &e {
        LookupError::NotFound { identifier } => Some(json!({ "seatNumber": identifier })),
        _ => None,
    };
    err(id, e.code(), e.to_string(), details)
}

fn handle_students_search(state: &AppState, req: &Request) -> Value {
    let seat = match seat_param(&req.params) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let Some(ds) = state.data() else {
        return lookup_err(&req.id, LookupError::NoData);
    };

    match resolver::find(&ds.table, &ds.roles, &seat) {
        Ok(rec) => {
            tracing::debug!(seat = %rec.seat_number, rank = rec.rank, "student found");
            ok(&req.id, json!(rec))
        }
        Err(e) => {
            tracing::debug!(seat = %seat.trim(), error = %e, "student lookup failed");
            lookup_err(&req.id, e)
        }
    }
}

pub fn try_handle(state: &AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "students.search" => Some(handle_students_search(state, req)),
        _ => None,
    }
}
