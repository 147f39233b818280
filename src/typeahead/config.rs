//! Configuration types and defaults for typeahead triggers.
//!
//! Field names follow the JS host (`type`, `trigger`, `maxResults`,
//! `className`) so configs cross the WASM boundary unchanged.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::error::{Result, TypeaheadError};

/// Default number of options shown in a menu.
pub const DEFAULT_MAX_RESULTS: usize = 5;

fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

// =============================================================================
// TriggerConfig
// =============================================================================

/// Configuration for a single typeahead kind (mentions, hashtags, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerConfig {
    /// Unique identifier for this typeahead kind, e.g. `mention`.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Trigger character(s), e.g. `@`
    pub trigger: String,
    /// Max options exposed to the menu. Default: 5
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    /// Extra class for this kind's popover
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
}

impl TriggerConfig {
    pub fn new(type_name: impl Into<String>, trigger: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            trigger: trigger.into(),
            max_results: DEFAULT_MAX_RESULTS,
            class_name: None,
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    /// Check required fields of a single config.
    pub fn validate(&self) -> Result<()> {
        if self.type_name.is_empty() {
            return Err(TypeaheadError::MissingField { field: "type" });
        }
        if self.trigger.is_empty() {
            return Err(TypeaheadError::MissingField { field: "trigger" });
        }
        if self.max_results == 0 {
            return Err(TypeaheadError::InvalidMaxResults {
                type_name: self.type_name.clone(),
            });
        }
        Ok(())
    }

    /// Class for this kind's menu popover.
    pub fn popover_class(&self) -> String {
        format!("typeahead-popover {}", self.class_name.as_deref().unwrap_or(""))
    }
}

// =============================================================================
// Plugin parameters
// =============================================================================

/// Plugin parameters: every trigger registered on one editor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeaheadPluginParams {
    pub configs: Vec<TriggerConfig>,
}

impl TypeaheadPluginParams {
    pub fn new(configs: Vec<TriggerConfig>) -> Self {
        Self { configs }
    }

    /// Parse params from a JSON string, then validate them.
    pub fn from_json(json: &str) -> Result<Self> {
        let params: Self = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    /// Validate every config and reject duplicate types.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for config in &self.configs {
            config.validate()?;
            if !seen.insert(config.type_name.as_str()) {
                return Err(TypeaheadError::DuplicateType(config.type_name.clone()));
            }
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
