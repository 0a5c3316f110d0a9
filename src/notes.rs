use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Marks a notes string as carrying an encoded payload rather than plain text.
pub const NOTES_PREFIX: &str = "__meta__:";

/// The decoded contents of a budget item's notes field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemNotes {
    pub is_cost: bool,
    pub notes: String,
}

impl ItemNotes {
    pub fn new<S: Into<String>>(notes: S, is_cost: bool) -> Self {
        ItemNotes {
            is_cost,
            notes: notes.into(),
        }
    }
}

/// Packs the cost flag and free text notes into the single string that gets persisted.
///
/// Plain billable notes are stored untouched so that records written before the flag
/// existed read back the same. The payload form is only needed when the item is a
/// cost line, or when the plain text would otherwise be mistaken for a payload.
pub fn encode(notes: &str, is_cost: bool) -> String {
    if !is_cost && !notes.starts_with(NOTES_PREFIX) {
        return notes.to_owned();
    }

    let payload = json!({ "is_cost": is_cost, "notes": notes });
    format!("{}{}", NOTES_PREFIX, payload)
}

/// Unpacks a persisted notes string.
///
/// Anything that isn't a well formed payload is treated as plain notes on a billable
/// line, so decoding never fails.
pub fn decode(raw: &str) -> ItemNotes {
    if let Some(json) = raw.strip_prefix(NOTES_PREFIX) {
        match serde_json::from_str::<ItemNotes>(json) {
            Ok(payload) => return payload,
            Err(e) => debug!("notes carry the payload prefix but failed to parse: {}", e),
        }
    }

    ItemNotes::new(raw, false)
}
