use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct SqlRequest {
    pub stmt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bulk_args: Option<Vec<Vec<serde_json::Value>>>,
}

/// Reply of `/_sql`.
///
/// Single statements carry `rows` and `rowcount`; bulk requests carry one
/// entry per value set in `results` instead.
#[derive(Debug, Deserialize)]
pub struct SqlResponse {
    pub cols: Vec<String>,
    #[serde(default)]
    pub rows: Option<Vec<Vec<serde_json::Value>>>,
    #[serde(default)]
    pub rowcount: Option<i64>,
    pub duration: f64,
    #[serde(default)]
    pub results: Option<Vec<BulkResponse>>,
}

#[derive(Debug, Deserialize)]
pub struct BulkResponse {
    pub rowcount: i64,
    #[serde(default)]
    pub error_message: Option<String>,
}
