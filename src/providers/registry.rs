//! Process-wide provider registries: registration is explicit at
//! startup, not discovered dynamically.

use std::collections::HashMap;
use std::sync::Arc;

use super::{AiProvider, ApprovalProvider};

/// Holds both kinds of providers. Write-once after startup: registered
/// entries are never replaced, only looked up.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    ai: HashMap<String, Arc<dyn AiProvider>>,
    approval: HashMap<String, Arc<dyn ApprovalProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_ai(&mut self, key: impl Into<String>, provider: Arc<dyn AiProvider>) {
        self.ai.insert(key.into(), provider);
    }

    pub fn register_approval(&mut self, key: impl Into<String>, provider: Arc<dyn ApprovalProvider>) {
        self.approval.insert(key.into(), provider);
    }

    pub fn ai(&self, key: &str) -> Option<Arc<dyn AiProvider>> {
        self.ai.get(key).cloned()
    }

    pub fn approval(&self, key: &str) -> Option<Arc<dyn ApprovalProvider>> {
        self.approval.get(key).cloned()
    }

    pub fn has_ai(&self, key: &str) -> bool {
        self.ai.contains_key(key)
    }

    /// True if `key` resolves under either registry (an AI key may
    /// serve as an approval provider via the adapter).
    pub fn has_any(&self, key: &str) -> bool {
        self.approval.contains_key(key) || self.ai.contains_key(key)
    }
}
