//! Owner attribution.

use serde::{Deserialize, Serialize};

/// Which partner a record belongs to, for the income tax split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Owner {
    Daan,
    Wim,
    #[default]
    #[serde(alias = "beiden")]
    Both,
}
