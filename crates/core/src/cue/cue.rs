use serde::{Deserialize, Serialize};

/// An ordered sequence of cues within a project.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CueList {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub description: Option<String>,
    pub is_loop: bool,
    pub cues: Vec<Cue>,
}

/// A triggered transition into a scene with fade timings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    pub id: String,
    pub name: String,
    /// Display number; fractional so cues can be inserted between others.
    pub cue_number: f64,
    pub scene_id: String,
    pub fade_in_seconds: f64,
    pub fade_out_seconds: f64,
    /// Seconds after completion at which the next cue fires automatically.
    pub follow_seconds: Option<f64>,
    pub easing: Option<String>,
    pub notes: Option<String>,
}
