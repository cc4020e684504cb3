//! SQL warehouse statement endpoint.
//!
//! One shape of read: `SELECT * FROM <table>`, materialized fully into
//! memory. The statement API is synchronous up to a server-side wait
//! budget; a statement still pending after that is reported as unavailable
//! rather than polled further.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::Http;
use crate::error::PlatformError;

#[derive(Clone, Debug, Serialize)]
struct StatementRequest {
    statement: String,
    warehouse_id: String,
    wait_timeout: String,
    format: String,
    disposition: String,
}

#[derive(Clone, Debug, Deserialize)]
struct StatementResponse {
    status: StatementStatus,

    #[serde(default)]
    manifest: Option<Manifest>,

    #[serde(default)]
    result: Option<ResultData>,
}

#[derive(Clone, Debug, Deserialize)]
struct StatementStatus {
    state: String,

    #[serde(default)]
    error: Option<StatementError>,
}

#[derive(Clone, Debug, Deserialize)]
struct StatementError {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
struct Manifest {
    schema: Schema,
}

#[derive(Clone, Debug, Deserialize)]
struct Schema {
    columns: Vec<Column>,
}

#[derive(Clone, Debug, Deserialize)]
struct Column {
    name: String,
}

#[derive(Clone, Debug, Deserialize)]
struct ResultData {
    #[serde(default)]
    data_array: Vec<Vec<Option<String>>>,
}

/// Fully materialized result set: column names plus rows of nullable
/// string cells, exactly as the endpoint delivers them.
#[derive(Clone, Debug, Default)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl Table {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

pub struct WarehouseClient {
    http: Http,
    warehouse_id: String,
}

impl WarehouseClient {
    pub fn new(host: &str, token: &str, warehouse_id: &str) -> Result<Self, PlatformError> {
        Ok(WarehouseClient {
            http: Http::new(host, token)?,
            warehouse_id: warehouse_id.to_string(),
        })
    }

    /// Read a whole table into memory.
    pub async fn read_table(&self, table: &str) -> Result<Table, PlatformError> {
        validate_table_name(table)?;

        let request = StatementRequest {
            statement: format!("SELECT * FROM {}", table),
            warehouse_id: self.warehouse_id.clone(),
            wait_timeout: "30s".to_string(),
            format: "JSON_ARRAY".to_string(),
            disposition: "INLINE".to_string(),
        };

        let response: StatementResponse = self.http.post("/api/2.0/sql/statements", &request).await?;

        match response.status.state.as_str() {
            "SUCCEEDED" => {
                let columns = response
                    .manifest
                    .map(|m| m.schema.columns.into_iter().map(|c| c.name).collect())
                    .unwrap_or_default();
                let rows = response.result.map(|r| r.data_array).unwrap_or_default();
                debug!(table, rows = rows.len(), "loaded table");
                Ok(Table { columns, rows })
            }
            "FAILED" | "CANCELED" | "CLOSED" => Err(PlatformError::RemoteQueryFailed(
                response
                    .status
                    .error
                    .and_then(|e| e.message)
                    .unwrap_or_else(|| format!("statement {}", response.status.state)),
            )),
            state => Err(PlatformError::unavailable(format!(
                "statement still {} after wait timeout",
                state
            ))),
        }
    }
}

/// The table name is interpolated into the statement, so it must look like
/// a plain dotted identifier.
fn validate_table_name(table: &str) -> Result<(), PlatformError> {
    let valid = !table.is_empty()
        && table
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    if valid {
        Ok(())
    } else {
        Err(PlatformError::Malformed(format!(
            "invalid table name: {:?}",
            table
        )))
    }
}
