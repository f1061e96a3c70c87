use crate::dataset;
use crate::ipc::error::ok;
use crate::ipc::types::{AppState, Request};
use serde_json::{json, Map, Value};

fn handle_health(state: &AppState, req: &Request) -> Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "datasetPath": state.config.dataset_path.to_string_lossy(),
            "hasData": state.data().is_some(),
            "rowCount": state.dataset.as_ref().map(|d| d.table.len()).unwrap_or(0),
        }),
    )
}

fn delimiter_label(d: u8) -> String {
    match d {
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}

fn handle_debug_snapshot(state: &AppState, req: &Request) -> Value {
    let path = &state.config.dataset_path;
    let Some(ds) = state.dataset.as_ref() else {
        return ok(
            &req.id,
            json!({
                "hasData": false,
                "totalRows": 0,
                "columns": [],
                "sampleData": [],
                "roles": null,
                "source": {
                    "path": path.to_string_lossy(),
                    "exists": dataset::source_exists(path),
                },
                "loadError": state.load_error,
            }),
        );
    };

    let columns = ds.table.columns();
    // Objects keep column order (serde_json is built with preserve_order).
    let sample: Vec<Value> = ds
        .table
        .rows()
        .take(state.config.sample_rows)
        .map(|row| {
            let mut obj = Map::new();
            for (col, cell) in columns.iter().zip(row.iter()) {
                obj.insert(col.clone(), json!(cell));
            }
            Value::Object(obj)
        })
        .collect();

    let p = &ds.provenance;
    ok(
        &req.id,
        json!({
            "hasData": !ds.table.is_empty(),
            "totalRows": ds.table.len(),
            "columns": columns,
            "sampleData": sample,
            "roles": ds.roles,
            "source": {
                "path": p.path.to_string_lossy(),
                "exists": dataset::source_exists(&p.path),
                "synthetic": p.synthetic,
                "encoding": p.encoding.map(|e| e.label()),
                "delimiter": p.delimiter.map(delimiter_label),
                "sha256": p.sha256,
            },
            "loadError": state.load_error,
        }),
    )
}

pub fn try_handle(state: &AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "debug.snapshot" => Some(handle_debug_snapshot(state, req)),
        _ => None,
    }
}
