//! Marker records, insert drafts, and raw store documents.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::types::{LatLng, MarkerId, TimestampMs};

/// Collection holding marker records.
pub const MARKER_COLLECTION: &str = "quests";
/// Field the store fills with its own creation timestamp.
pub const CREATED_AT_FIELD: &str = "createdAt";
/// Field holding the marker coordinates.
pub const LOCATION_FIELD: &str = "location";

/// Raw document as returned by a [`crate::persist::DocumentStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Store-assigned id.
    pub id: MarkerId,
    /// Stored fields, normally a JSON object.
    pub fields: Value,
}

/// Decoded, well-formed marker record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerRecord {
    /// Store-assigned id.
    pub id: MarkerId,
    /// Marker coordinates.
    pub location: LatLng,
    /// Server-assigned creation time, if the store wrote one.
    pub created_at: Option<TimestampMs>,
    /// Reserved link to a following marker. Always `None` today.
    pub next: Option<MarkerId>,
}

impl MarkerRecord {
    /// Decodes a document, returning `None` when the location is missing or malformed.
    pub fn from_document(doc: &Document) -> Option<Self> {
        let location = doc
            .fields
            .get(LOCATION_FIELD)
            .cloned()
            .and_then(|v| serde_json::from_value::<LatLng>(v).ok())
            .filter(LatLng::is_well_formed)?;

        let created_at = doc.fields.get(CREATED_AT_FIELD).and_then(Value::as_u64);
        let next = doc
            .fields
            .get("next")
            .and_then(Value::as_str)
            .map(str::to_string);

        Some(Self {
            id: doc.id.clone(),
            location,
            created_at,
            next,
        })
    }
}

/// Insert payload for a new marker record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerDraft {
    /// Coordinates to persist.
    pub location: LatLng,
}

impl MarkerDraft {
    /// Draft for a marker at `location`.
    pub fn new(location: LatLng) -> Self {
        Self { location }
    }

    /// Document fields to hand to the store. The store adds [`CREATED_AT_FIELD`].
    pub fn to_fields(&self) -> Value {
        json!({
            "location": {
                "lat": self.location.lat,
                "lng": self.location.lng,
            },
            "next": Value::Null,
        })
    }
}
