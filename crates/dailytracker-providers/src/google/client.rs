//! Google Drive and Sheets REST client.
//!
//! Drive is used to find spreadsheets by name; Sheets to create them and
//! append rows.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{AppendRequest, AppendSummary, BoxFuture, SpreadsheetFile, SpreadsheetStore};

use super::config::GoogleConfig;

const PROVIDER_NAME: &str = "google-sheets";

/// MIME type Drive assigns to native spreadsheets.
const SPREADSHEET_MIME_TYPE: &str = "application/vnd.google-apps.spreadsheet";

/// Input mode for `values.append`.
const VALUE_INPUT_OPTION: &str = "USER_ENTERED";

/// Drive + Sheets client.
///
/// The access token is passed per call rather than stored, so a refreshed
/// token is used as soon as the session has it.
#[derive(Debug)]
pub struct GoogleSheetsClient {
    http_client: reqwest::Client,
    drive_api_base: Url,
    sheets_api_base: Url,
    api_key: Option<String>,
}

impl GoogleSheetsClient {
    /// Creates a client from the provider configuration.
    pub fn new(config: &GoogleConfig) -> ProviderResult<Self> {
        Self::with_endpoints(
            config.drive_api_base.clone(),
            config.sheets_api_base.clone(),
            config.api_key.clone(),
            config.timeout,
        )
    }

    /// Creates a client against explicit API base URLs.
    pub fn with_endpoints(
        drive_api_base: Url,
        sheets_api_base: Url,
        api_key: Option<String>,
        timeout: Duration,
    ) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(format!("dailytracker/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                ProviderError::configuration(format!("failed to create HTTP client: {}", e))
                    .with_source(e)
            })?;

        Ok(Self {
            http_client,
            drive_api_base,
            sheets_api_base,
            api_key,
        })
    }

    /// Lists spreadsheets with exactly this name.
    pub async fn list_spreadsheets(
        &self,
        access_token: &str,
        name: &str,
    ) -> ProviderResult<Vec<SpreadsheetFile>> {
        let url = endpoint(&self.drive_api_base, &["files"])?;
        let query = drive_name_query(name);

        let request = self
            .http_client
            .get(url)
            .bearer_auth(access_token)
            .query(&[
                ("q", query.as_str()),
                ("fields", "files(id,name)"),
                ("spaces", "drive"),
            ]);

        let list: FileListResponse = self.send_json(self.with_key(request), "files.list").await?;
        debug!(name, matches = list.files.len(), "searched for spreadsheet");

        Ok(list
            .files
            .into_iter()
            .map(|f| SpreadsheetFile::new(f.id, f.name))
            .collect())
    }

    /// Creates a spreadsheet and returns its ID.
    pub async fn create_spreadsheet(&self, access_token: &str, title: &str) -> ProviderResult<String> {
        let url = endpoint(&self.sheets_api_base, &["spreadsheets"])?;
        let body = CreateSpreadsheetRequest {
            properties: SpreadsheetProperties {
                title: title.to_string(),
            },
        };

        let request = self
            .http_client
            .post(url)
            .bearer_auth(access_token)
            .json(&body);

        let created: CreateSpreadsheetResponse =
            self.send_json(self.with_key(request), "spreadsheets.create").await?;
        info!(title, spreadsheet_id = %created.spreadsheet_id, "created spreadsheet");
        Ok(created.spreadsheet_id)
    }

    /// Appends rows at the request's anchor range.
    pub async fn append_values(
        &self,
        access_token: &str,
        request: &AppendRequest,
    ) -> ProviderResult<AppendSummary> {
        let append_segment = format!("{}:append", request.range);
        let url = endpoint(
            &self.sheets_api_base,
            &[
                "spreadsheets",
                &request.spreadsheet_id,
                "values",
                &append_segment,
            ],
        )?;

        let body = ValueRange {
            values: &request.rows,
        };

        let http_request = self
            .http_client
            .post(url)
            .bearer_auth(access_token)
            .query(&[("valueInputOption", VALUE_INPUT_OPTION)])
            .json(&body);

        let response: AppendResponse = self
            .send_json(self.with_key(http_request), "values.append")
            .await?;

        let updates = response.updates.unwrap_or_default();
        debug!(
            spreadsheet_id = %request.spreadsheet_id,
            updated_range = ?updates.updated_range,
            rows = request.rows.len(),
            "appended rows"
        );
        Ok(AppendSummary {
            updated_range: updates.updated_range,
            updated_rows: updates.updated_rows.unwrap_or(0),
        })
    }

    fn with_key(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.api_key {
            Some(ref key) => request.query(&[("key", key.as_str())]),
            None => request,
        }
    }

    async fn send_json<T>(&self, request: reqwest::RequestBuilder, operation: &str) -> ProviderResult<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::network(format!("{}: request timeout", operation))
            } else if e.is_connect() {
                ProviderError::network(format!("{}: connection failed: {}", operation, e))
            } else {
                ProviderError::network(format!("{}: request failed: {}", operation, e))
            }
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            ProviderError::network(format!("{}: failed to read response: {}", operation, e))
        })?;

        if let Some(err) = status_error(status, &body, operation) {
            return Err(err);
        }

        serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("{}: failed to parse response: {}", operation, e))
        })
    }
}

impl SpreadsheetStore for GoogleSheetsClient {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn find_by_name<'a>(
        &'a self,
        access_token: &'a str,
        name: &'a str,
    ) -> BoxFuture<'a, ProviderResult<Vec<SpreadsheetFile>>> {
        Box::pin(async move {
            self.list_spreadsheets(access_token, name)
                .await
                .map_err(|e| e.with_provider(PROVIDER_NAME))
        })
    }

    fn create<'a>(
        &'a self,
        access_token: &'a str,
        title: &'a str,
    ) -> BoxFuture<'a, ProviderResult<String>> {
        Box::pin(async move {
            self.create_spreadsheet(access_token, title)
                .await
                .map_err(|e| e.with_provider(PROVIDER_NAME))
        })
    }

    fn append<'a>(
        &'a self,
        access_token: &'a str,
        request: AppendRequest,
    ) -> BoxFuture<'a, ProviderResult<AppendSummary>> {
        Box::pin(async move {
            self.append_values(access_token, &request)
                .await
                .map_err(|e| e.with_provider(PROVIDER_NAME))
        })
    }
}

/// Joins path segments beneath an API base, percent-encoding each segment.
fn endpoint(base: &Url, segments: &[&str]) -> ProviderResult<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ProviderError::configuration(format!("API base cannot be a base: {}", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Builds the Drive search expression for an exact-name spreadsheet match.
fn drive_name_query(name: &str) -> String {
    let escaped = name.replace('\\', "\\\\").replace('\'', "\\'");
    format!(
        "name = '{}' and mimeType = '{}' and trashed = false",
        escaped, SPREADSHEET_MIME_TYPE
    )
}

/// Maps a non-success HTTP status to a provider error.
fn status_error(status: reqwest::StatusCode, body: &str, operation: &str) -> Option<ProviderError> {
    if status.is_success() {
        return None;
    }

    let detail = api_error_message(body).unwrap_or_else(|| body.trim().to_string());
    let message = format!("{} failed ({}): {}", operation, status, detail);
    Some(ProviderError::from_http_status(status.as_u16(), &detail, message))
}

/// Pulls `error.message` out of a Google API error body.
fn api_error_message(body: &str) -> Option<String> {
    let parsed: ApiErrorResponse = serde_json::from_str(body).ok()?;
    Some(parsed.error.message)
}

#[derive(Debug, Deserialize)]
struct FileListResponse {
    #[serde(default)]
    files: Vec<ApiFile>,
}

#[derive(Debug, Deserialize)]
struct ApiFile {
    id: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Serialize)]
struct CreateSpreadsheetRequest {
    properties: SpreadsheetProperties,
}

#[derive(Debug, Serialize)]
struct SpreadsheetProperties {
    title: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSpreadsheetResponse {
    spreadsheet_id: String,
}

#[derive(Debug, Serialize)]
struct ValueRange<'a> {
    values: &'a [Vec<Value>],
}

#[derive(Debug, Deserialize)]
struct AppendResponse {
    #[serde(default)]
    updates: Option<UpdateValuesResponse>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateValuesResponse {
    updated_range: Option<String>,
    updated_rows: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}
