//! Tree-wide behavior switches.
//!
//! Settings are plain data and can be loaded from YAML or JSON. Every field
//! has a default, so a document lists only what it changes:
//!
//! ```yaml
//! trailing_arguments: ignore
//! max_suggestions: 20
//! ```

use serde::{Deserialize, Serialize};

use crate::error::SettingsError;

/// What the binder does with tokens left over once every indexed parameter
/// is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrailingArguments {
    /// Fail with [`DispatchError::TooManyArguments`](crate::DispatchError::TooManyArguments).
    #[default]
    Reject,
    /// Skip the token and keep scanning, so later flags still bind.
    Ignore,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub trailing_arguments: TrailingArguments,

    /// Upper bound on the number of completions returned; `None` for no cap.
    pub max_suggestions: Option<usize>,

    /// Offer flag and named-parameter names even when the partial token is
    /// empty. Off by default so an empty prefix lists values, not switches.
    pub suggest_names_on_empty_prefix: bool,
}

impl Settings {
    pub fn from_yaml_str(input: &str) -> Result<Self, SettingsError> {
        Ok(serde_yaml::from_str(input)?)
    }

    pub fn from_json_str(input: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(input)?)
    }
}
