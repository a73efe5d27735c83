//! # sheetsync-smartsheet
//!
//! [`SheetGateway`] implementation over the Smartsheet REST API (2.0).
//!
//! Every request is a blocking call authenticated with a bearer token and
//! tagged with a `Smartsheet-Change-Agent` header so the sheet history shows
//! which tool made a change. Non-2xx responses are decoded from the API's
//! `{errorCode, message}` body into [`GatewayError::Api`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use sheetsync_core::{FetchOptions, SheetGateway};
//! use sheetsync_smartsheet::{ClientConfig, SmartsheetClient};
//!
//! let mut client = SmartsheetClient::new(ClientConfig::new(token))?;
//! let sheet = client.get_sheet(4_583_173_393_803_140, FetchOptions::full())?;
//! ```

pub mod wire;

use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use sheetsync_core::{
    Column, FetchOptions, GatewayError, NewRow, Row, RowId, RowUpdate, Sheet, SheetGateway,
    SheetId,
};
use tracing::{debug, trace};

use crate::wire::{
    OutgoingNewRow, OutgoingUpdate, WireColumn, WireError, WirePage, WireResult, WireRow,
    WireSheet,
};

/// Public API endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.smartsheet.com/2.0";

/// Row ids per delete request; the ids travel in the query string
pub const DELETE_CHUNK: usize = 400;

const CHANGE_AGENT_HEADER: &str = "Smartsheet-Change-Agent";

/// Connection settings for [`SmartsheetClient`]
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub base_url: String,
    pub token: String,
    pub change_agent: String,
}

impl ClientConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: token.into(),
            change_agent: "sheetsync".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_change_agent(mut self, change_agent: impl Into<String>) -> Self {
        self.change_agent = change_agent.into();
        self
    }
}

/// Blocking Smartsheet API client
#[derive(Clone, Debug)]
pub struct SmartsheetClient {
    http: Client,
    base_url: String,
    token: String,
}

impl SmartsheetClient {
    pub fn new(config: ClientConfig) -> Result<Self, GatewayError> {
        let mut headers = HeaderMap::new();
        let agent = HeaderValue::from_str(&config.change_agent)
            .map_err(|e| GatewayError::Transport(format!("invalid change agent: {e}")))?;
        headers.insert(CHANGE_AGENT_HEADER, agent);

        let http = Client::builder()
            .default_headers(headers)
            .user_agent(concat!("sheetsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(transport)?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send `request` and decode a successful body as `T`
    fn send<T: DeserializeOwned>(
        &self,
        sheet_id: SheetId,
        request: RequestBuilder,
    ) -> Result<T, GatewayError> {
        let resp = request.bearer_auth(&self.token).send().map_err(transport)?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(api_error(sheet_id, status, &body));
        }
        resp.json().map_err(|e| GatewayError::Decode(e.to_string()))
    }

    fn rows_result(
        &self,
        sheet_id: SheetId,
        request: RequestBuilder,
    ) -> Result<Vec<Row>, GatewayError> {
        let body: WireResult<Vec<WireRow>> = self.send(sheet_id, request)?;
        debug!(sheet_id, message = %body.message, version = ?body.version, "rows written");
        Ok(body
            .result
            .unwrap_or_default()
            .into_iter()
            .map(Row::from)
            .collect())
    }
}

impl SheetGateway for SmartsheetClient {
    fn get_sheet(&mut self, sheet_id: SheetId, options: FetchOptions) -> Result<Sheet, GatewayError> {
        let mut request = self.http.get(self.url(&format!("/sheets/{sheet_id}")));
        if options.include_object_values {
            request = request.query(&[("include", "objectValue"), ("level", "2")]);
        }
        let wire: WireSheet = self.send(sheet_id, request)?;
        let mut sheet = Sheet::from(wire);
        if !options.include_descendants {
            sheet.rows.retain(Row::is_top_level);
        }
        trace!(sheet_id, rows = sheet.rows.len(), "fetched sheet");
        Ok(sheet)
    }

    fn get_columns(&mut self, sheet_id: SheetId) -> Result<Vec<Column>, GatewayError> {
        let request = self
            .http
            .get(self.url(&format!("/sheets/{sheet_id}/columns")))
            .query(&[("includeAll", "true")]);
        let page: WirePage<WireColumn> = self.send(sheet_id, request)?;
        Ok(page.data.into_iter().map(Column::from).collect())
    }

    fn add_rows(&mut self, sheet_id: SheetId, rows: &[NewRow]) -> Result<Vec<Row>, GatewayError> {
        let body: Vec<OutgoingNewRow> = rows.iter().map(OutgoingNewRow::from).collect();
        let request = self
            .http
            .post(self.url(&format!("/sheets/{sheet_id}/rows")))
            .json(&body);
        self.rows_result(sheet_id, request)
    }

    fn update_rows(
        &mut self,
        sheet_id: SheetId,
        rows: &[RowUpdate],
    ) -> Result<Vec<Row>, GatewayError> {
        let body: Vec<OutgoingUpdate> = rows.iter().map(OutgoingUpdate::from).collect();
        let request = self
            .http
            .put(self.url(&format!("/sheets/{sheet_id}/rows")))
            .json(&body);
        self.rows_result(sheet_id, request)
    }

    fn delete_rows(&mut self, sheet_id: SheetId, ids: &[RowId]) -> Result<(), GatewayError> {
        for chunk in ids.chunks(DELETE_CHUNK) {
            let request = self
                .http
                .delete(self.url(&format!("/sheets/{sheet_id}/rows")))
                .query(&[
                    ("ids", join_ids(chunk)),
                    ("ignoreRowsNotFound", "true".to_string()),
                ]);
            let _: WireResult<Vec<RowId>> = self.send(sheet_id, request)?;
            debug!(sheet_id, deleted = chunk.len(), "deleted rows");
        }
        Ok(())
    }
}

/// Comma separated ids for the `ids` query parameter
pub fn join_ids(ids: &[RowId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn transport(err: reqwest::Error) -> GatewayError {
    GatewayError::Transport(err.to_string())
}

/// Map a non-2xx response to a gateway error
pub fn api_error(sheet_id: SheetId, status: StatusCode, body: &str) -> GatewayError {
    let parsed: Option<WireError> = serde_json::from_str(body).ok();
    if status == StatusCode::NOT_FOUND && parsed.as_ref().map_or(true, |e| e.error_code == 1006) {
        return GatewayError::SheetNotFound(sheet_id);
    }
    match parsed {
        Some(err) => GatewayError::Api {
            status: status.as_u16(),
            code: err.error_code,
            message: err.message,
        },
        None => GatewayError::Api {
            status: status.as_u16(),
            code: 0,
            message: truncate(body.trim(), 240),
        },
    }
}

fn truncate(message: &str, limit: usize) -> String {
    let mut out = message.replace(['\n', '\r'], " ");
    if out.chars().count() > limit {
        out = out.chars().take(limit).collect();
        out.push_str("...");
    }
    out
}
