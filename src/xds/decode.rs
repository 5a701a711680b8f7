//! Best-effort decoding of discovery response entries into typed resources.
//!
//! Each entry of a discovery response is a self-typed `Any`. Entries that
//! fail to decode are logged and skipped; one bad entry never aborts the
//! batch.

use envoy_types::pb::google::protobuf::Any;
use prost::Message;
use tracing::warn;

use super::resources::ResourceKind;
use crate::{Error, Result};

/// Outcome of decoding a batch of entries.
///
/// `items` keeps response order. `failures` is the side channel for entries
/// that could not be decoded and is never mixed into `items`.
#[derive(Debug)]
pub struct Decoded<T> {
    pub items: Vec<T>,
    pub failures: Vec<Error>,
}

impl<T> Default for Decoded<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            failures: Vec::new(),
        }
    }
}

/// Decode one entry as the typed object of `kind`.
///
/// The entry's type URL must name the requested kind.
pub fn decode_resource<T>(entry: &Any, kind: ResourceKind) -> Result<T>
where
    T: Message + Default,
{
    if entry.type_url != kind.type_url() {
        return Err(Error::decode(
            entry.type_url.clone(),
            format!("expected resource of type {}", kind.type_url()),
        ));
    }

    T::decode(&entry.value[..])
        .map_err(|e| Error::decode(entry.type_url.clone(), e.to_string()))
}

/// Decode every entry, collecting successes and routing failures aside.
pub fn decode_resources<T>(entries: &[Any], kind: ResourceKind) -> Decoded<T>
where
    T: Message + Default,
{
    let mut decoded = Decoded::default();

    for (index, entry) in entries.iter().enumerate() {
        match decode_resource::<T>(entry, kind) {
            Ok(item) => decoded.items.push(item),
            Err(error) => {
                warn!(
                    index,
                    kind = %kind,
                    type_url = %entry.type_url,
                    error = %error,
                    "Skipping resource that failed to decode"
                );
                decoded.failures.push(error);
            }
        }
    }

    decoded
}
