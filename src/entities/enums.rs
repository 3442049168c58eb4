//! Enumerazioni - Tipi enumerati utilizzati nelle entità

use serde::{Deserialize, Serialize};

/// Outcome of the age-based deletion classification. Serialized lowercase
/// because it travels inside realtime notifications as `"global"`/`"local"`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeleteType {
    Global,
    Local,
}
