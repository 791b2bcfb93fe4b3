//! The `StandardsProvider` external interface: a plugin producing the
//! once-per-session standards bundle that gets hashed for audit at
//! `init`. No concrete provider ships with this crate.

use std::collections::HashMap;

use serde_json::Value;

use crate::profile::ProfileError;

pub trait StandardsProvider: Send + Sync {
    fn key(&self) -> &str;

    fn bundle(&self, context: &HashMap<String, Value>) -> Result<String, ProfileError>;
}
