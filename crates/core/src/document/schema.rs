//! The on-disk/on-wire representation of an exported project.
//!
//! Every entity that may be referenced elsewhere in the document carries a
//! `ref_id` that is unique within the document. Cross-references always go
//! through ref IDs; storage primary keys of the source project never appear
//! as references. Field names serialize as lowerCamelCase and optional
//! fields are omitted when absent, so documents stay stable and diffable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scene::scene::ChannelValue;

/// The current version of the project document format.
///
/// Stamped on every document this server writes. Incremented when breaking
/// changes are made to [`ProjectDocument`] or its children.
pub const DOCUMENT_VERSION: &str = "1.0";

/// Top-level structure of an exported project.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDocument {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<DocumentMetadata>,
    pub project: ExportedProject,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fixture_definitions: Vec<ExportedFixtureDefinition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fixtures: Vec<ExportedFixtureInstance>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scenes: Vec<ExportedScene>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cue_lists: Vec<ExportedCueList>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scene_boards: Vec<ExportedSceneBoard>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exported_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub producer: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedProject {
    /// Primary key in the source system; informational only, never used as
    /// a cross-reference target.
    pub original_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedFixtureDefinition {
    pub ref_id: String,
    pub manufacturer: String,
    pub model: String,
    pub kind: String,
    pub is_built_in: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub channels: Vec<ExportedChannelDefinition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modes: Vec<ExportedFixtureMode>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedChannelDefinition {
    #[serde(default)]
    pub ref_id: String,
    pub name: String,
    pub kind: String,
    pub offset: u16,
    pub min_value: u8,
    pub default_value: u8,
    pub max_value: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fade_behavior: Option<String>,
    #[serde(default)]
    pub is_discrete: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedFixtureMode {
    pub ref_id: String,
    pub name: String,
    #[serde(default)]
    pub short_name: String,
    pub channel_count: u16,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mode_channels: Vec<ExportedModeChannel>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedModeChannel {
    pub channel_ref_id: String,
    pub offset: u16,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedFixtureInstance {
    pub ref_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub definition_ref_id: String,
    pub universe: u16,
    pub start_channel: u16,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode_ref_id: Option<String>,
    /// Mode resolution by name, kept for documents written before modes
    /// carried ref IDs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_count: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_channels: Option<Vec<ExportedInstanceChannel>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_order: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedInstanceChannel {
    pub name: String,
    pub kind: String,
    pub offset: u16,
    pub min_value: u8,
    pub default_value: u8,
    pub max_value: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fade_behavior: Option<String>,
    #[serde(default)]
    pub is_discrete: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedScene {
    pub ref_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fixture_values: Vec<ExportedFixtureValue>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedFixtureValue {
    pub fixture_ref_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene_order: Option<u32>,
    /// Sparse channel list; the only form writers emit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels: Option<Vec<ChannelValue>>,
    /// Legacy dense integer array (offset = array index). Read-only input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_values: Option<Vec<u8>>,
}

impl ExportedFixtureValue {
    /// Normalizes to the sparse form, converting the legacy dense array
    /// when it is the only shape present.
    pub fn normalized_channels(&self) -> Vec<ChannelValue> {
        if let Some(channels) = &self.channels {
            return channels.clone();
        }
        self.channel_values
            .as_ref()
            .map(|dense| {
                dense
                    .iter()
                    .enumerate()
                    .map(|(offset, value)| ChannelValue {
                        offset: offset as u16,
                        value: *value,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedCueList {
    pub ref_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "loop", default)]
    pub is_loop: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cues: Vec<ExportedCue>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedCue {
    pub name: String,
    pub cue_number: f64,
    pub scene_ref_id: String,
    pub fade_in_seconds: f64,
    pub fade_out_seconds: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_seconds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub easing: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedSceneBoard {
    pub ref_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buttons: Vec<ExportedSceneBoardButton>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedSceneBoardButton {
    pub scene_ref_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub row: u32,
    #[serde(default)]
    pub col: u32,
}

impl ProjectDocument {
    /// Creates an empty document for the given project block, stamped with
    /// the current format version.
    pub fn new(project: ExportedProject) -> Self {
        Self {
            version: DOCUMENT_VERSION.to_string(),
            metadata: None,
            project,
            fixture_definitions: Vec::new(),
            fixtures: Vec::new(),
            scenes: Vec::new(),
            cue_lists: Vec::new(),
            scene_boards: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_document_parses() {
        let raw = r#"{"version":"1.0","project":{"originalId":"p0","name":"X"}}"#;
        let doc: ProjectDocument = serde_json::from_str(raw).unwrap();
        assert_eq!(doc.version, "1.0");
        assert_eq!(doc.project.name, "X");
        assert!(doc.fixtures.is_empty());
        assert!(doc.scene_boards.is_empty());
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let raw = r#"{"version":"1.0","project":{"originalId":"p0","name":"X"},"futureField":42}"#;
        assert!(serde_json::from_str::<ProjectDocument>(raw).is_ok());
    }

    #[test]
    fn test_optional_fields_are_omitted() {
        let doc = ProjectDocument::new(ExportedProject {
            original_id: "p0".to_string(),
            name: "X".to_string(),
            description: None,
        });
        let raw = serde_json::to_string(&doc).unwrap();
        assert!(!raw.contains("description"));
        assert!(!raw.contains("metadata"));
        assert!(!raw.contains("fixtureDefinitions"));
    }

    #[test]
    fn test_field_names_are_camel_case() {
        let value = ExportedFixtureValue {
            fixture_ref_id: "f1".to_string(),
            scene_order: Some(1),
            channels: Some(vec![ChannelValue {
                offset: 0,
                value: 255,
            }]),
            channel_values: None,
        };
        let raw = serde_json::to_string(&value).unwrap();
        assert!(raw.contains("fixtureRefId"));
        assert!(raw.contains("sceneOrder"));
        assert!(!raw.contains("channelValues"));
    }

    #[test]
    fn test_normalized_channels_prefers_sparse() {
        let value = ExportedFixtureValue {
            fixture_ref_id: "f1".to_string(),
            scene_order: None,
            channels: Some(vec![ChannelValue {
                offset: 5,
                value: 10,
            }]),
            channel_values: Some(vec![1, 2, 3]),
        };
        assert_eq!(value.normalized_channels().len(), 1);
        assert_eq!(value.normalized_channels()[0].offset, 5);
    }

    #[test]
    fn test_normalized_channels_converts_dense() {
        let value = ExportedFixtureValue {
            fixture_ref_id: "f1".to_string(),
            scene_order: None,
            channels: None,
            channel_values: Some(vec![255, 128, 0, 0]),
        };
        let normalized = value.normalized_channels();
        assert_eq!(normalized.len(), 4);
        assert_eq!(normalized[0].offset, 0);
        assert_eq!(normalized[0].value, 255);
        assert_eq!(normalized[1].value, 128);
        assert_eq!(normalized[3].offset, 3);
    }

    #[test]
    fn test_cue_list_loop_field_name() {
        let list = ExportedCueList {
            ref_id: "c1".to_string(),
            name: "Main".to_string(),
            description: None,
            is_loop: true,
            cues: Vec::new(),
        };
        let raw = serde_json::to_string(&list).unwrap();
        assert!(raw.contains(r#""loop":true"#));
    }
}
