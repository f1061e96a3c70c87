use crate::config::ServiceConfig;
use crate::dataset::{self, Provenance, Table};
use crate::resolver::{self, ColumnRoles};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// A loaded results table with its column roles, fixed for the process lifetime.
pub struct Dataset {
    pub table: Table,
    pub roles: ColumnRoles,
    pub provenance: Provenance,
}

pub struct AppState {
    pub config: ServiceConfig,
    pub dataset: Option<Dataset>,
    /// Why `dataset` is `None`, reported by `health` and `debug.snapshot`.
    pub load_error: Option<String>,
}

impl AppState {
    /// Loads the configured results file. A load failure does not stop the
    /// service; it starts without data and every lookup reports `no_data`.
    pub fn load(config: ServiceConfig) -> Self {
        match dataset::load(&config.dataset_source()) {
            Ok(loaded) => {
                let roles = resolver::resolve_roles(loaded.table.columns());
                tracing::info!(
                    identifier = ?roles.identifier.as_ref().map(|c| c.name.as_str()),
                    name = ?roles.display_name.as_ref().map(|c| c.name.as_str()),
                    score = ?roles.score.as_ref().map(|c| c.name.as_str()),
                    status = ?roles.status.as_ref().map(|c| c.name.as_str()),
                    "column roles resolved"
                );
                Self {
                    config,
                    dataset: Some(Dataset {
                        table: loaded.table,
                        roles,
                        provenance: loaded.provenance,
                    }),
                    load_error: None,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "starting without results data");
                Self {
                    config,
                    dataset: None,
                    load_error: Some(e.to_string()),
                }
            }
        }
    }

    /// The loaded dataset, if it has at least one row.
    pub fn data(&self) -> Option<&Dataset> {
        self.dataset.as_ref().filter(|d| !d.table.is_empty())
    }
}
