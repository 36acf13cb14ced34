// SPDX-License-Identifier: MIT OR Apache-2.0
//! Container configuration.

use crate::refresh::RefreshScope;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Whether a member may switch between primitive and reference values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MemberKindPolicy {
    /// The member becomes a reference holder, or stops being one, as its
    /// value changes
    #[default]
    Dynamic,
    /// The kind decided at build time is kept; updates that would flip it
    /// are rejected. Null fits either kind.
    Fixed,
}

/// Configuration of a node container
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Member kind policy
    pub member_kind_policy: MemberKindPolicy,
    /// How far references are reconciled after an update
    pub update_refresh_scope: RefreshScope,
}

impl ModelConfig {
    /// Set the member kind policy
    pub fn with_member_kind_policy(mut self, policy: MemberKindPolicy) -> Self {
        self.member_kind_policy = policy;
        self
    }

    /// Set the post-update refresh scope
    pub fn with_update_refresh_scope(mut self, scope: RefreshScope) -> Self {
        self.update_refresh_scope = scope;
        self
    }

    /// Serialize to RON
    pub fn to_ron(&self) -> Result<String, ConfigError> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }

    /// Deserialize from RON; missing fields take their defaults
    pub fn from_ron(s: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(s)?)
    }
}

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Malformed configuration text
    #[error("Failed to parse model config: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Configuration could not be written
    #[error("Failed to serialize model config: {0}")]
    Serialize(#[from] ron::Error),
}
