use serde::{Deserialize, Serialize};

/// A lighting project. Owns its fixture instances, scenes, cue lists and
/// scene boards; fixture definitions live in the shared catalog.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}
