use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::record::{CanonicalRecord, RawPriceItem, TransformError};

/// Prices of one poll cycle, keyed by the connection point code.
///
/// Serializes into a single JSON object. Keys come out sorted.
#[must_use]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceSnapshot(BTreeMap<String, CanonicalRecord>);

impl PriceSnapshot {
    /// Transform the raw items, a later item wins over an earlier one with the same code.
    ///
    /// Fails on the first malformed item, nothing is returned for the rest.
    pub fn try_from_items(
        items: impl IntoIterator<Item = RawPriceItem>,
    ) -> Result<Self, TransformError> {
        items.into_iter().map(RawPriceItem::transform).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl FromIterator<(String, CanonicalRecord)> for PriceSnapshot {
    fn from_iter<T: IntoIterator<Item = (String, CanonicalRecord)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
