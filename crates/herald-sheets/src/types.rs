//! Google Sheets API types (minimal subset).

use serde::Deserialize;

/// Spreadsheet metadata returned by `GET /v4/spreadsheets/{id}`.
#[derive(Debug, Deserialize)]
pub struct Spreadsheet {
    #[serde(default)]
    pub sheets: Vec<Sheet>,
}

#[derive(Debug, Deserialize)]
pub struct Sheet {
    pub properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetProperties {
    pub title: String,
    #[serde(default)]
    pub sheet_id: Option<i64>,
}

/// Cell values returned by `GET /values/{range}`.
#[derive(Debug, Deserialize)]
pub struct ValueRange {
    #[serde(default)]
    pub range: Option<String>,
    /// Row-major cells. Trailing empty cells are omitted by the API.
    #[serde(default)]
    pub values: Vec<Vec<String>>,
}

/// Error envelope returned on non-2xx responses.
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiError,
}

#[derive(Debug, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spreadsheet_deserialize() {
        let json = r#"{
            "spreadsheetId": "abc",
            "sheets": [
                { "properties": { "sheetId": 0, "title": "Hoja 1", "index": 0 } },
                { "properties": { "sheetId": 7, "title": "Hoja3", "index": 1 } }
            ]
        }"#;
        let meta: Spreadsheet = serde_json::from_str(json).unwrap();
        assert_eq!(meta.sheets.len(), 2);
        assert_eq!(meta.sheets[1].properties.title, "Hoja3");
        assert_eq!(meta.sheets[1].properties.sheet_id, Some(7));
    }

    #[test]
    fn test_value_range_without_values() {
        let json = r#"{ "range": "Hoja3!A1:Z1000", "majorDimension": "ROWS" }"#;
        let range: ValueRange = serde_json::from_str(json).unwrap();
        assert!(range.values.is_empty());
    }
}
