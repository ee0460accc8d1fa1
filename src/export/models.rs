// src/export/models.rs

use serde::{Deserialize, Serialize};

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ExportPdfRequest {
    pub plan_id: Option<String>,
}

/// Payload of a `generate-pdf` job
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PdfJobData {
    pub plan_id: String,
    pub user_id: String,
}
