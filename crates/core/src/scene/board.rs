use serde::{Deserialize, Serialize};

/// A grid of buttons that trigger scenes, used by wall-panel style UIs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneBoard {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub rows: Option<u32>,
    pub columns: Option<u32>,
    pub buttons: Vec<SceneBoardButton>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneBoardButton {
    pub scene_id: String,
    pub label: Option<String>,
    pub row: u32,
    pub col: u32,
}
