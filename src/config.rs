use std::path::PathBuf;

use crate::error::{Error, Result};

/// How the coordinator should react to a schema mismatch between the
/// configuration a caller opens with and the schema already written to the
/// file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaMode {
    /// Reject the open if the on-disk schema differs from the requested one.
    Automatic,
    /// Apply an additive migration, never removing existing properties.
    AdditiveExplicit,
    /// Apply an additive migration, tolerating it even on implicit opens.
    AdditiveDiscovered,
    /// Never alter the on-disk schema; open read-only against it.
    Immutable,
    /// Accept any on-disk schema as-is, skipping validation entirely.
    ResetFile,
}

/// Caller-supplied configuration for opening (or reopening) a database file
/// through the coordinator.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
    pub encryption_key: Option<Vec<u8>>,
    pub immutable: bool,
    pub in_memory: bool,
    pub schema_mode: SchemaMode,
    pub schema_version: u64,
    pub automatic_change_notifications: bool,
    /// Target size, in bytes, of the storage engine's page cache. `None`
    /// leaves the decision to the storage engine's own default.
    pub cache_size: Option<usize>,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            encryption_key: None,
            immutable: false,
            in_memory: false,
            schema_mode: SchemaMode::Automatic,
            schema_version: 0,
            automatic_change_notifications: true,
            cache_size: None,
        }
    }

    /// Checks that `other` can reuse an already-open coordinator configured
    /// with `self`, per the configuration-mismatch error class.
    pub fn reconcile(&self, other: &DbConfig) -> Result<()> {
        if self.in_memory != other.in_memory {
            return Err(Error::ConfigMismatch { field: "in_memory" });
        }
        if self.immutable != other.immutable {
            return Err(Error::ConfigMismatch { field: "immutable" });
        }
        if self.encryption_key != other.encryption_key {
            return Err(Error::ConfigMismatch { field: "encryption_key" });
        }
        if self.schema_mode == SchemaMode::Immutable && self.schema_version != other.schema_version
        {
            return Err(Error::ConfigMismatch { field: "schema_version" });
        }
        Ok(())
    }
}
