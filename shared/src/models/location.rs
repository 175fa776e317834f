//! Administrative location lookups (state, LGA, ward, community)

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct State {
    pub id: String,
    pub name: String,
}

/// Local Government Area
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Lga {
    pub id: String,
    pub name: String,
    pub state_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ward {
    pub id: String,
    pub name: String,
    pub lga_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Community {
    pub id: String,
    pub name: String,
    pub ward_id: String,
}
