//! JSON-file record source.
//!
//! The file holds an object mapping table names to arrays of rows, where each
//! row maps the raw header text to a cell:
//!
//! ```json
//! {
//!   "Hoja3": [
//!     { "Actividad": "Board Meeting", "Hora de inicio": "25/12/2024 10:00", "Teléfono": "3001234567" }
//!   ]
//! }
//! ```
//!
//! Headers go through the same normalization as the spreadsheet source, and
//! a column present in any row of a table is present in all of them.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use herald_types::{Row, rows_from_table};

use crate::{FetchError, RecordSource};

/// Reads rows from a JSON file on every fetch, so edits are picked up live.
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

#[async_trait::async_trait]
impl RecordSource for JsonFileSource {
    fn source_type(&self) -> &str {
        "file"
    }

    async fn fetch_records(&self, table: &str) -> Result<Vec<Row>, FetchError> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let tables: Map<String, Value> = serde_json::from_str(&content)?;

        let Some(entries) = tables.get(table) else {
            return Err(FetchError::TableNotFound {
                table: table.to_string(),
                available: tables.keys().cloned().collect(),
            });
        };

        let objects: Vec<&Map<String, Value>> = entries
            .as_array()
            .map(|items| items.iter().filter_map(Value::as_object).collect())
            .unwrap_or_default();
        Ok(rows_from_objects(&objects))
    }
}

/// Lay the objects out as a table over the union of their headers, so a
/// column present in any row is present (possibly empty) in every row.
fn rows_from_objects(objects: &[&Map<String, Value>]) -> Vec<Row> {
    let mut headers: Vec<String> = Vec::new();
    for object in objects {
        for header in object.keys() {
            if !headers.contains(header) {
                headers.push(header.clone());
            }
        }
    }

    let lines: Vec<Vec<String>> = objects
        .iter()
        .map(|object| {
            headers
                .iter()
                .map(|h| object.get(h).map(cell_text).unwrap_or_default())
                .collect()
        })
        .collect();
    rows_from_table(&headers, &lines)
}

fn cell_text(cell: &Value) -> String {
    match cell {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_fixture(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[tokio::test]
    async fn test_fetch_rows() {
        let path = write_fixture(
            "herald-file-source-rows.json",
            r#"{
                "Hoja3": [
                    { "Actividad": "Board Meeting", "Hora de inicio": "25/12/2024 10:00", "Teléfono": 3001234567 },
                    { "Actividad": "Standup", "Notas": null },
                    "not a row"
                ]
            }"#,
        );
        let source = JsonFileSource::new(&path);
        let rows = source.fetch_records("Hoja3").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["actividad"], "Board Meeting");
        assert_eq!(rows[0]["telefono"], "3001234567");
        assert_eq!(rows[1]["notas"], "");
        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_columns_missing_from_a_row_are_empty() {
        let path = write_fixture(
            "herald-file-source-sparse.json",
            r#"{
                "Hoja3": [
                    { "Actividad": "A", "Hora de inicio": "25/12/2024 10:00", "Teléfono": "300" },
                    { "Actividad": "B" }
                ]
            }"#,
        );
        let source = JsonFileSource::new(&path);
        let rows = source.fetch_records("Hoja3").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].len(), 3);
        assert_eq!(rows[1].get("telefono").map(String::as_str), Some(""));
        assert_eq!(rows[1].get("horadeinicio").map(String::as_str), Some(""));
        assert_eq!(rows[0]["telefono"], "300");
        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_missing_table() {
        let path = write_fixture("herald-file-source-missing.json", r#"{ "Hoja 1": [] }"#);
        let source = JsonFileSource::new(&path);
        match source.fetch_records("Hoja3").await {
            Err(FetchError::TableNotFound { available, .. }) => {
                assert_eq!(available, vec!["Hoja 1"]);
            }
            other => panic!("expected TableNotFound, got {other:?}"),
        }
        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_missing_file() {
        let source = JsonFileSource::new(Path::new("/nonexistent/herald/rows.json"));
        assert!(matches!(
            source.fetch_records("Hoja3").await,
            Err(FetchError::Io(_))
        ));
    }
}
