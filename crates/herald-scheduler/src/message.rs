//! Reminder text.

use herald_types::EventRecord;

use crate::resolver::format_start;

/// Shown when an event has no location.
pub const NO_LOCATION: &str = "No especificado";

/// Spoken lead time for a threshold in hours.
pub fn lead_phrase(hours: u32) -> String {
    match hours {
        48 => "en 2 días".to_string(),
        24 => "mañana".to_string(),
        1 => "en 1 hora".to_string(),
        n => format!("en {n} horas"),
    }
}

/// Compose the SMS body for `event` at `lead_hours` before its start.
///
/// Notes and link are appended only when present.
pub fn compose(event: &EventRecord, lead_hours: u32) -> String {
    let label = event.label.as_deref().unwrap_or_default();
    let start = event.start.as_deref().unwrap_or_default();

    let mut body = format!(
        "Recordatorio: El evento \"{label}\" comenzará {} ({}).",
        lead_phrase(lead_hours),
        format_start(start)
    );
    body.push_str(" Lugar: ");
    body.push_str(event.location.as_deref().unwrap_or(NO_LOCATION));

    if let Some(notes) = &event.notes {
        body.push_str(". Orden día: ");
        body.push_str(notes);
    }
    if let Some(link) = &event.link {
        body.push_str(". Link: ");
        body.push_str(link);
    }
    body
}
