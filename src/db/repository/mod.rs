//! Repository layer: typed, collection-scoped operations over a `RecordStore`.
//!
//! Callers work with model structs; the store only ever sees JSON objects.

mod patient;
mod report;
mod user;

use serde::de::DeserializeOwned;
use serde_json::Value;

pub use patient::*;
pub use report::*;
pub use user::*;

/// Decode stored documents, skipping (and logging) any that no longer match
/// the current model shape.
fn decode_all<T: DeserializeOwned>(collection: &str, docs: Vec<Value>) -> Vec<T> {
    docs.into_iter()
        .filter_map(|doc| match serde_json::from_value::<T>(doc) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(collection, error = %e, "Skipping undecodable record");
                None
            }
        })
        .collect()
}
