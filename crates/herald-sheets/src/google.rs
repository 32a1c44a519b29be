//! Google Sheets values API client.

use std::time::Duration;

use reqwest::{Client, Url};
use tracing::debug;

use herald_types::{Row, rows_from_table};

use crate::types::{ApiErrorBody, Spreadsheet, ValueRange};
use crate::{FetchError, RecordSource};

const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Cell range read from the selected sheet.
const CELL_RANGE: &str = "A1:Z1000";

/// Reads event rows from a Google spreadsheet with an API key.
pub struct SheetsSource {
    client: Client,
    base_url: String,
    spreadsheet_id: String,
    api_key: String,
}

impl SheetsSource {
    /// Create a new source for the given spreadsheet.
    pub fn new(spreadsheet_id: &str, api_key: &str) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            spreadsheet_id: spreadsheet_id.to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Point the client at a different API root.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Build `{base}/{spreadsheet_id}/{extra...}?key=...` with each segment
    /// percent-encoded.
    fn url(&self, extra: &[&str]) -> Result<Url, FetchError> {
        let mut url =
            Url::parse(&self.base_url).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| FetchError::InvalidUrl(self.base_url.clone()))?
            .push(&self.spreadsheet_id)
            .extend(extra);
        url.query_pairs_mut().append_pair("key", &self.api_key);
        Ok(url)
    }

    /// Fetch spreadsheet metadata (sheet titles).
    pub async fn get_metadata(&self) -> Result<Spreadsheet, FetchError> {
        let resp = self.client.get(self.url(&[])?).send().await?;
        let resp = check_status(resp, "spreadsheet metadata").await?;
        Ok(resp.json().await?)
    }

    /// Fetch the raw cell grid of one sheet.
    pub async fn get_values(&self, title: &str) -> Result<ValueRange, FetchError> {
        let range = format!("{title}!{CELL_RANGE}");
        let resp = self.client.get(self.url(&["values", &range])?).send().await?;
        let resp = check_status(resp, "sheet values").await?;
        Ok(resp.json().await?)
    }
}

#[async_trait::async_trait]
impl RecordSource for SheetsSource {
    fn source_type(&self) -> &str {
        "sheets"
    }

    async fn fetch_records(&self, table: &str) -> Result<Vec<Row>, FetchError> {
        let metadata = self.get_metadata().await?;
        let title = select_sheet(&metadata, table)?;
        let values = self.get_values(&title).await?;
        let rows = rows_from_values(values);
        debug!(table, rows = rows.len(), "Fetched sheet rows");
        Ok(rows)
    }
}

/// Find the sheet whose title matches `table` exactly.
pub fn select_sheet(metadata: &Spreadsheet, table: &str) -> Result<String, FetchError> {
    let available: Vec<String> = metadata
        .sheets
        .iter()
        .map(|s| s.properties.title.clone())
        .collect();
    debug!(?available, "Spreadsheet tables");

    if available.iter().any(|t| t == table) {
        Ok(table.to_string())
    } else {
        Err(FetchError::TableNotFound {
            table: table.to_string(),
            available,
        })
    }
}

/// Turn a value grid into rows; the first line is the header.
pub fn rows_from_values(values: ValueRange) -> Vec<Row> {
    let mut lines = values.values.into_iter();
    let Some(headers) = lines.next() else {
        return Vec::new();
    };
    let data: Vec<Vec<String>> = lines.collect();
    rows_from_table(&headers, &data)
}

async fn check_status(
    resp: reqwest::Response,
    context: &'static str,
) -> Result<reqwest::Response, FetchError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&body)
        .ok()
        .and_then(|b| b.error.message)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());
    Err(FetchError::Status {
        context,
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Sheet, SheetProperties};

    fn metadata(titles: &[&str]) -> Spreadsheet {
        Spreadsheet {
            sheets: titles
                .iter()
                .map(|t| Sheet {
                    properties: SheetProperties {
                        title: t.to_string(),
                        sheet_id: None,
                    },
                })
                .collect(),
        }
    }

    #[test]
    fn test_values_url_is_encoded() {
        let source = SheetsSource::new("sheet-id", "k3y").unwrap();
        let url = source.url(&["values", "Hoja 1!A1:Z1000"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/sheet-id/values/Hoja%201!A1:Z1000?key=k3y"
        );
    }

    #[test]
    fn test_with_base_url() {
        let source = SheetsSource::new("abc", "k")
            .unwrap()
            .with_base_url("http://127.0.0.1:9999/v4/spreadsheets/");
        let url = source.url(&[]).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9999/v4/spreadsheets/abc?key=k");
    }

    #[test]
    fn test_select_sheet() {
        let meta = metadata(&["Hoja 1", "Hoja3"]);
        assert_eq!(select_sheet(&meta, "Hoja3").unwrap(), "Hoja3");

        match select_sheet(&meta, "hoja3") {
            Err(FetchError::TableNotFound { table, available }) => {
                assert_eq!(table, "hoja3");
                assert_eq!(available, vec!["Hoja 1", "Hoja3"]);
            }
            other => panic!("expected TableNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_rows_from_values() {
        let values: ValueRange = serde_json::from_str(
            r#"{"values": [
                ["Actividad", "Hora de inicio", "Teléfono", "Ubicación"],
                ["Board Meeting", "25/12/2024 10:00", "3001234567"],
                ["Standup", "26/12/2024 09:00", "3007654321", "Sala 2"]
            ]}"#,
        )
        .unwrap();
        let rows = rows_from_values(values);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["actividad"], "Board Meeting");
        assert_eq!(rows[0]["ubicacion"], "");
        assert_eq!(rows[1]["ubicacion"], "Sala 2");
    }

    #[test]
    fn test_rows_from_empty_values() {
        let values = ValueRange {
            range: None,
            values: vec![],
        };
        assert!(rows_from_values(values).is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_source_is_fetch_error() {
        let source = SheetsSource::new("abc", "k")
            .unwrap()
            .with_base_url("http://127.0.0.1:1/v4/spreadsheets");
        let result = source.fetch_records("Hoja3").await;
        assert!(matches!(result, Err(FetchError::Http(_))));
    }
}
