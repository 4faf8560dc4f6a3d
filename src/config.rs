//! Configuration for structure extraction.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default number of recovery frames a fault context can hold.
pub const DEFAULT_FAULT_STACK_CAPACITY: usize = 64;

/// Default size of the warning/error message buffer, in bytes.
pub const DEFAULT_WARNING_MESSAGE_LIMIT: usize = 256;

/// Part consulted for core properties when `[Content_Types].xml` does not name one.
pub const DEFAULT_CORE_PROPERTIES_PART: &str = "/docProps/core.xml";

/// Structure extraction configuration.
///
/// # Example
///
/// ```
/// use xps_structure::config::StructureConfig;
///
/// let config = StructureConfig::new()
///     .with_fault_stack_capacity(16)
///     .with_merge_outlines(false);
/// assert_eq!(config.fault_stack_capacity, 16);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructureConfig {
    /// Maximum depth of the recovery-frame stack.
    pub fault_stack_capacity: usize,

    /// Messages longer than this many bytes are truncated before they are
    /// compared or logged.
    pub warning_message_limit: usize,

    /// Core-properties part used when the content-types part cannot be read.
    pub core_properties_fallback: String,

    /// Resolve internal outline targets against the page/anchor table.
    pub resolve_links: bool,

    /// Append outline fragments of every sub-document (false keeps only the
    /// first non-empty fragment).
    pub merge_outlines: bool,
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl StructureConfig {
    /// Create new configuration with defaults.
    pub fn new() -> Self {
        Self {
            fault_stack_capacity: DEFAULT_FAULT_STACK_CAPACITY,
            warning_message_limit: DEFAULT_WARNING_MESSAGE_LIMIT,
            core_properties_fallback: DEFAULT_CORE_PROPERTIES_PART.to_string(),
            resolve_links: true,
            merge_outlines: true,
        }
    }

    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        if self.fault_stack_capacity == 0 {
            return Err(Error::Config("fault_stack_capacity must be at least 1".to_string()));
        }
        if self.warning_message_limit == 0 {
            return Err(Error::Config("warning_message_limit must be at least 1".to_string()));
        }
        if !self.core_properties_fallback.starts_with('/') {
            return Err(Error::Config(format!(
                "core_properties_fallback must be an absolute part name, got '{}'",
                self.core_properties_fallback
            )));
        }
        Ok(())
    }

    /// Set the recovery-frame stack capacity.
    pub fn with_fault_stack_capacity(mut self, capacity: usize) -> Self {
        self.fault_stack_capacity = capacity;
        self
    }

    /// Set the message truncation limit.
    pub fn with_warning_message_limit(mut self, limit: usize) -> Self {
        self.warning_message_limit = limit;
        self
    }

    /// Set the fallback core-properties part name.
    pub fn with_core_properties_fallback(mut self, part: impl Into<String>) -> Self {
        self.core_properties_fallback = part.into();
        self
    }

    /// Enable or disable internal target resolution.
    pub fn with_resolve_links(mut self, enable: bool) -> Self {
        self.resolve_links = enable;
        self
    }

    /// Enable or disable merging of per-sub-document outlines.
    pub fn with_merge_outlines(mut self, enable: bool) -> Self {
        self.merge_outlines = enable;
        self
    }
}
