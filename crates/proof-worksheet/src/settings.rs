//! Worksheet settings.
//!
//! Settings are plain data loaded from YAML; every field has a default so a partial file (or no
//! file at all) is valid.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Where the finale phase puts an unbound cursor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CursorPlacement {
    /// The first incomplete derivation step.
    #[default]
    FirstIncomplete,
    /// The last incomplete derivation step.
    LastIncomplete,
    /// Leave the cursor at the input offset.
    AsIs,
}

/// Tunables for loading, renumbering and proof output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorksheetSettings {
    /// Finale cursor placement when the input offset did not bind a statement.
    pub cursor_placement: CursorPlacement,
    /// Step number interval used by renumbering.
    pub renumber_interval: u32,
    /// Maximum number of candidates kept by a step selector search.
    pub step_selector_max_results: usize,
    /// Type code every step formula must start with.
    pub provable_type: String,
    /// Right margin for generated proof text.
    pub proof_text_width: usize,
    /// Indent of generated proof continuation lines.
    pub proof_indent: usize,
}

impl Default for WorksheetSettings {
    fn default() -> Self {
        Self {
            cursor_placement: CursorPlacement::FirstIncomplete,
            renumber_interval: 1,
            step_selector_max_results: 50,
            provable_type: "|-".to_string(),
            proof_text_width: 79,
            proof_indent: 4,
        }
    }
}

/// Errors produced while reading settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("YAML parse error: {0}")]
    /// YAML parsing failed.
    Yaml(#[from] serde_yaml::Error),

    #[error("I/O error: {0}")]
    /// Filesystem I/O failed.
    Io(#[from] std::io::Error),

    #[error("invalid setting '{field}': {message}")]
    /// A value is out of range.
    Invalid {
        /// Field name.
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },
}

impl WorksheetSettings {
    /// Parse settings from YAML text.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_yaml::from_str(yaml)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read settings from a YAML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.renumber_interval == 0 {
            return Err(SettingsError::Invalid {
                field: "renumber_interval",
                message: "must be at least 1".into(),
            });
        }
        if self.step_selector_max_results == 0 {
            return Err(SettingsError::Invalid {
                field: "step_selector_max_results",
                message: "must be at least 1".into(),
            });
        }
        if self.provable_type.trim().is_empty() {
            return Err(SettingsError::Invalid {
                field: "provable_type",
                message: "must not be blank".into(),
            });
        }
        if self.proof_indent >= self.proof_text_width {
            return Err(SettingsError::Invalid {
                field: "proof_indent",
                message: format!("must be less than proof_text_width ({})", self.proof_text_width),
            });
        }
        Ok(())
    }
}
