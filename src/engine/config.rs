//! Runtime configuration.
//!
//! [`RuntimeConfig`] carries the deployment-level knobs of a runtime: how
//! many slots to reserve up front, an optional hard cap on live slots, and
//! the category/priority table the [`PriorityResolver`] is seeded with.
//!
//! With the `serde` feature enabled the configuration can be deserialized,
//! so a deployment can keep its category table in a data file:
//!
//! ```ignore
//! let config: RuntimeConfig = serde_json::from_str(r#"{
//!     "max_slots": 4096,
//!     "categories": { "input": -10, "agent": 0, "camera": 100 }
//! }"#)?;
//! let runtime = Runtime::<Agent>::with_config(config);
//! ```
//!
//! [`PriorityResolver`]: crate::engine::priority::PriorityResolver

use std::collections::BTreeMap;

use crate::engine::types::{Priority, DEFAULT_INITIAL_CAPACITY};


/// Deployment-level runtime settings.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RuntimeConfig {
    /// Slots reserved when the runtime is created.
    pub initial_capacity: usize,

    /// Maximum number of simultaneously occupied slots. `None` means the
    /// index space is the only limit.
    pub max_slots: Option<u32>,

    /// Category name to priority.
    pub categories: BTreeMap<String, Priority>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            max_slots: None,
            categories: BTreeMap::new(),
        }
    }
}

impl RuntimeConfig {
    /// Default configuration with an empty category table.
    pub fn new() -> Self { Self::default() }

    /// Slots reserved up front.
    pub fn with_initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }

    /// Upper bound on occupied slots; creation fails beyond it.
    pub fn with_max_slots(mut self, max_slots: u32) -> Self {
        self.max_slots = Some(max_slots);
        self
    }

    /// Adds a category to the priority table.
    pub fn with_category(mut self, name: impl Into<String>, priority: Priority) -> Self {
        self.categories.insert(name.into(), priority);
        self
    }
}
