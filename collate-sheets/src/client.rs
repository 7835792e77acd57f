//! HTTP implementation of [`SheetsApi`] over the Sheets v4 REST surface.
//!
//! Wire DTOs stay private to this module; the public surface speaks the
//! types from [`crate::api`]. Every transport/status failure is mapped to a
//! typed [`ApiError`] — 401/403 → `AccessDenied`, 404 → `NotFound`, 429/5xx
//! and transport errors → `Transient`.

use std::time::Duration;

use serde::Deserialize;

use collate_core::types::{SheetName, SpreadsheetId};

use crate::api::{RangeUpdate, SheetInfo, SheetsApi, SpreadsheetMeta};
use crate::error::ApiError;

const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com/v4";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Blocking Sheets client authenticated with a bearer token.
pub struct HttpSheetsClient {
    agent: ureq::Agent,
    base_url: String,
    token: String,
}

impl HttpSheetsClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_base_url(token, DEFAULT_BASE_URL)
    }

    /// Point the client at a different endpoint (local test server).
    pub fn with_base_url(token: impl Into<String>, base_url: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(REQUEST_TIMEOUT)
            .build();
        Self {
            agent,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn get(&self, url: &str) -> Result<ureq::Response, ApiError> {
        self.agent
            .get(url)
            .set("Authorization", &format!("Bearer {}", self.token))
            .call()
            .map_err(map_ureq_error)
    }

    fn post_json(
        &self,
        url: &str,
        body: serde_json::Value,
    ) -> Result<ureq::Response, ApiError> {
        self.agent
            .post(url)
            .set("Authorization", &format!("Bearer {}", self.token))
            .send_json(body)
            .map_err(map_ureq_error)
    }
}

impl SheetsApi for HttpSheetsClient {
    fn spreadsheet_meta(&self, id: &SpreadsheetId) -> Result<SpreadsheetMeta, ApiError> {
        let url = format!(
            "{}/spreadsheets/{}?fields=properties(modifiedTime),sheets(properties(title,gridProperties(rowCount,columnCount)))",
            self.base_url,
            encode_segment(&id.0),
        );
        let dto: SpreadsheetDto = self.get(&url)?.into_json().map_err(ApiError::Decode)?;
        Ok(dto.into())
    }

    fn sheet_values(
        &self,
        id: &SpreadsheetId,
        sheet: &SheetName,
    ) -> Result<Vec<Vec<String>>, ApiError> {
        let url = format!(
            "{}/spreadsheets/{}/values/{}",
            self.base_url,
            encode_segment(&id.0),
            encode_segment(&sheet.0),
        );
        let dto: ValueRangeDto = self.get(&url)?.into_json().map_err(ApiError::Decode)?;
        Ok(dto.values)
    }

    fn batch_update(
        &self,
        id: &SpreadsheetId,
        updates: &[RangeUpdate],
    ) -> Result<usize, ApiError> {
        let url = format!(
            "{}/spreadsheets/{}/values:batchUpdate",
            self.base_url,
            encode_segment(&id.0),
        );
        let data: Vec<serde_json::Value> = updates
            .iter()
            .map(|u| {
                serde_json::json!({
                    "range": u.range,
                    "values": u.values,
                })
            })
            .collect();
        let body = serde_json::json!({
            "valueInputOption": "RAW",
            "data": data,
        });
        tracing::debug!("batch update of {} range(s) against {}", updates.len(), id);
        let dto: BatchUpdateResponseDto =
            self.post_json(&url, body)?.into_json().map_err(ApiError::Decode)?;
        Ok(dto.total_updated_rows.unwrap_or(updates.len()))
    }
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

fn map_ureq_error(err: ureq::Error) -> ApiError {
    match err {
        ureq::Error::Status(status, response) => {
            let message = response
                .into_string()
                .unwrap_or_else(|_| String::from("<unreadable body>"));
            match status {
                401 | 403 => ApiError::AccessDenied { status },
                404 => ApiError::NotFound { context: message },
                429 | 500..=599 => ApiError::Transient {
                    message: format!("HTTP {status}: {message}"),
                },
                _ => ApiError::Unexpected { status, message },
            }
        }
        ureq::Error::Transport(transport) => ApiError::Transient {
            message: transport.to_string(),
        },
    }
}

/// Percent-encode one URL path segment (sheet titles may contain spaces).
fn encode_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            other => out.push_str(&format!("%{other:02X}")),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Wire DTOs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SpreadsheetDto {
    #[serde(default)]
    properties: SpreadsheetPropertiesDto,
    #[serde(default)]
    sheets: Vec<SheetDto>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpreadsheetPropertiesDto {
    #[serde(default)]
    modified_time: String,
}

#[derive(Debug, Deserialize)]
struct SheetDto {
    #[serde(default)]
    properties: SheetPropertiesDto,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetPropertiesDto {
    #[serde(default)]
    title: String,
    #[serde(default)]
    grid_properties: GridPropertiesDto,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GridPropertiesDto {
    #[serde(default)]
    row_count: u32,
    #[serde(default)]
    column_count: u32,
}

#[derive(Debug, Deserialize)]
struct ValueRangeDto {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchUpdateResponseDto {
    #[serde(default)]
    total_updated_rows: Option<usize>,
}

impl From<SpreadsheetDto> for SpreadsheetMeta {
    fn from(dto: SpreadsheetDto) -> Self {
        SpreadsheetMeta {
            modified_time: dto.properties.modified_time,
            sheets: dto
                .sheets
                .into_iter()
                .map(|s| SheetInfo {
                    title: s.properties.title,
                    row_count: s.properties.grid_properties.row_count,
                    column_count: s.properties.grid_properties.column_count,
                })
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
