use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type Map = BTreeMap<String, String>;

/// Selects a set of endpoints by their labels.
#[derive(Clone, Debug, Eq, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Selector {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    match_labels: Option<Map>,
}

// === Selector ===

impl Selector {
    pub fn from_map(map: Map) -> Self {
        Self {
            match_labels: Some(map),
        }
    }

    pub fn match_labels(&self) -> Option<&Map> {
        self.match_labels.as_ref()
    }

    /// Returns true if every label in `target` is present in this selector's
    /// `matchLabels` with the same value.
    ///
    /// A selector without any `matchLabels` only contains an empty target.
    /// Labels on the selector that are absent from `target` are ignored.
    pub fn contains_labels(&self, target: &Map) -> bool {
        match self.match_labels.as_ref().filter(|labels| !labels.is_empty()) {
            None => target.is_empty(),
            Some(labels) => target.iter().all(|(k, v)| labels.get(k) == Some(v)),
        }
    }
}

impl std::iter::FromIterator<(String, String)> for Selector {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self::from_map(iter.into_iter().collect())
    }
}

impl std::iter::FromIterator<(&'static str, &'static str)> for Selector {
    fn from_iter<T: IntoIterator<Item = (&'static str, &'static str)>>(iter: T) -> Self {
        Self::from_map(
            iter.into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}
