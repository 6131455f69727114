//! Toggle definitions and the immutable snapshot that holds them.
use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::Arc,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;

/// Strategy parameters attached to a toggle.
pub type Parameters = HashMap<String, String>;

/// A named feature toggle.
///
/// Toggles are immutable once constructed. `name` is the identity key within a
/// [`ToggleSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toggle {
    pub name: String,
    pub enabled: bool,
    #[serde(rename = "strategy", default = "default_strategy_name")]
    pub strategy_name: String,
    #[serde(default, deserialize_with = "deserialize_parameters")]
    pub parameters: Parameters,
}

impl Toggle {
    /// Create a toggle with no strategy parameters.
    pub fn new(name: impl Into<String>, enabled: bool, strategy_name: impl Into<String>) -> Toggle {
        Toggle {
            name: name.into(),
            enabled,
            strategy_name: strategy_name.into(),
            parameters: Parameters::new(),
        }
    }

    /// Attach strategy parameters.
    pub fn with_parameters(mut self, parameters: Parameters) -> Toggle {
        self.parameters = parameters;
        self
    }
}

fn default_strategy_name() -> String {
    crate::strategy::DEFAULT_STRATEGY.to_owned()
}

/// `parameters` may be missing or explicitly `null` on the wire.
fn deserialize_parameters<'de, D>(deserializer: D) -> std::result::Result<Parameters, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Parameters>::deserialize(deserializer)?.unwrap_or_default())
}

/// Wire representation shared by the remote endpoint and the backup file.
#[derive(Debug, Serialize, Deserialize)]
struct TogglesResponse<T> {
    #[serde(default = "default_version")]
    version: u32,
    features: Vec<T>,
}

fn default_version() -> u32 {
    1
}

/// An immutable, point-in-time mapping of all known toggles.
///
/// A snapshot is never mutated once built; [`ToggleCache`](crate::ToggleCache) replaces it
/// wholesale.
#[derive(Debug)]
pub struct ToggleSnapshot {
    toggles: HashMap<String, Arc<Toggle>>,
    version: u32,
    created_at: DateTime<Utc>,
}

impl ToggleSnapshot {
    /// An empty snapshot, used when nothing better is known at cold start.
    pub fn empty() -> ToggleSnapshot {
        ToggleSnapshot::with_version(Vec::new(), default_version())
    }

    /// Build a snapshot from a list of toggles. If a name appears more than once, the last
    /// occurrence wins.
    pub fn new(toggles: impl IntoIterator<Item = Toggle>) -> ToggleSnapshot {
        ToggleSnapshot::with_version(toggles, default_version())
    }

    fn with_version(toggles: impl IntoIterator<Item = Toggle>, version: u32) -> ToggleSnapshot {
        let toggles = toggles
            .into_iter()
            .map(|toggle| (toggle.name.clone(), Arc::new(toggle)))
            .collect();

        ToggleSnapshot {
            toggles,
            version,
            created_at: Utc::now(),
        }
    }

    /// Decode a snapshot from its JSON wire form.
    pub fn from_json(bytes: &[u8]) -> Result<ToggleSnapshot> {
        let response: TogglesResponse<Toggle> = serde_json::from_slice(bytes)?;
        Ok(ToggleSnapshot::with_version(
            response.features,
            response.version,
        ))
    }

    /// Encode the snapshot into its JSON wire form. Toggles are written in name order.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        let ordered: BTreeMap<&str, &Toggle> = self
            .toggles
            .iter()
            .map(|(name, toggle)| (name.as_str(), &**toggle))
            .collect();

        let response = TogglesResponse {
            version: self.version,
            features: ordered.into_values().collect(),
        };

        Ok(serde_json::to_vec_pretty(&response)?)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Toggle>> {
        self.toggles.get(name)
    }

    pub fn toggle_names(&self) -> HashSet<String> {
        self.toggles.keys().cloned().collect()
    }

    pub fn toggles(&self) -> impl Iterator<Item = &Toggle> {
        self.toggles.values().map(|toggle| &**toggle)
    }

    pub fn len(&self) -> usize {
        self.toggles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.toggles.is_empty()
    }

    /// Payload format version reported by the server.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Timestamp when this snapshot was built.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Default for ToggleSnapshot {
    fn default() -> ToggleSnapshot {
        ToggleSnapshot::empty()
    }
}
