use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// ──────────────────── Row Types ────────────────────

/// One data row from a tabular source, keyed by normalized column name.
///
/// Absent cells are stored as the empty string, never omitted.
pub type Row = HashMap<String, String>;

/// Normalized column keys used by the event table.
pub mod columns {
    pub const ACTIVITY: &str = "actividad";
    pub const START: &str = "horadeinicio";
    pub const END: &str = "horadefinalización";
    pub const LOCATION: &str = "ubicacion";
    pub const NOTES: &str = "notas";
    pub const LINK: &str = "enlace";
    pub const PHONE: &str = "telefono";
}

/// Fixed header → key mapping for the known sheet columns.
const COLUMN_MAPPING: &[(&str, &str)] = &[
    ("Radicado", "radicado"),
    ("Nombre del asunto", "nombredelasunto"),
    ("Estado", "estado"),
    ("Asignado a", "asignadoa"),
    ("Fecha", "fecha"),
    ("Fecha estimada respuesta", "fechaestimadarespuesta"),
    ("Respuesta", "respuesta"),
    ("Enlace", "enlace"),
    ("Actividad", "actividad"),
    ("Hora de inicio", "horadeinicio"),
    ("Ubicación", "ubicacion"),
    ("Notas", "notas"),
    ("Teléfono", "telefono"),
];

/// Map a raw header cell to its normalized column key.
///
/// Known headers go through the fixed mapping; anything else is lowercased
/// with spaces removed.
pub fn normalize_header(header: &str) -> String {
    COLUMN_MAPPING
        .iter()
        .find(|(raw, _)| *raw == header)
        .map(|(_, key)| (*key).to_string())
        .unwrap_or_else(|| header.to_lowercase().replace(' ', ""))
}

/// Build rows from a header line and data lines.
///
/// Short data lines are padded with empty strings so every header key is
/// present in every row.
pub fn rows_from_table(headers: &[String], lines: &[Vec<String>]) -> Vec<Row> {
    let keys: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();
    lines
        .iter()
        .map(|line| {
            keys.iter()
                .enumerate()
                .map(|(i, key)| (key.clone(), line.get(i).cloned().unwrap_or_default()))
                .collect()
        })
        .collect()
}

// ──────────────────── Event Types ────────────────────

/// A scheduled event as read from the event table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Activity name shown in the reminder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Raw start timestamp, `DD/MM/YYYY HH:MM`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    /// Recipient phone number, as typed in the sheet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl EventRecord {
    /// Extract an event from a normalized row. Blank cells become `None`.
    pub fn from_row(row: &Row) -> Self {
        let field = |key: &str| {
            row.get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        Self {
            label: field(columns::ACTIVITY),
            start: field(columns::START),
            end: field(columns::END),
            phone: field(columns::PHONE),
            location: field(columns::LOCATION),
            notes: field(columns::NOTES),
            link: field(columns::LINK),
        }
    }

    /// Returns the required fields when all three are present.
    pub fn required(&self) -> Option<(&str, &str, &str)> {
        Some((
            self.label.as_deref()?,
            self.start.as_deref()?,
            self.phone.as_deref()?,
        ))
    }

    /// Display label for logs, even when the record is incomplete.
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or("<sin actividad>")
    }
}
