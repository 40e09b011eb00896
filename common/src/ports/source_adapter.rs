//! Source adapter port and registry (§6, §9 "Dependency inversion"). Concrete
//! adapters (HTTP/RSS/PDF fetchers, etc.) are external collaborators; the
//! core only depends on this trait and a keyed dispatch table, exactly the
//! pattern the design notes call for in place of an inheritance hierarchy.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct CollectedItem {
    pub raw_content: String,
    pub metadata: Value,
    pub source_type: String,
    pub collected_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigValidation {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl ConfigValidation {
    pub fn ok() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
        }
    }

    pub fn invalid(errors: Vec<String>) -> Self {
        Self {
            is_valid: false,
            errors,
        }
    }
}

#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Yields raw content items for the given source configuration.
    async fn collect(&self, config: &Value) -> Result<Vec<CollectedItem>, AppError>;

    fn supports(&self, source_type: &str) -> bool;

    fn validate_config(&self, config: &Value) -> ConfigValidation;
}

/// Runtime polymorphism over `SourceAdapter`s keyed by `sourceType` string
/// (`RSS`, `WEB`, `SOCIAL_MEDIA`, `PDF`, `OCR`, `WIKIPEDIA`, ...). Registering
/// twice for the same key overwrites (§6).
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<String, Arc<dyn SourceAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, source_type: impl Into<String>, adapter: Arc<dyn SourceAdapter>) {
        self.adapters.insert(source_type.into(), adapter);
    }

    pub fn get(&self, source_type: &str) -> Option<Arc<dyn SourceAdapter>> {
        self.adapters.get(source_type).cloned()
    }
}
