//! Project export.
//!
//! Traverses a project's entity graph through the repository interfaces and
//! produces a self-contained [`ProjectDocument`]. Ref IDs are the storage
//! primary key strings, which makes export idempotent: exporting the same
//! project twice produces documents whose cross-references match.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;

use lumen_fixtures::{FixtureDefinition, FixtureInstance};

use crate::document::schema::{
    DocumentMetadata, ExportedChannelDefinition, ExportedCue, ExportedCueList,
    ExportedFixtureDefinition, ExportedFixtureInstance, ExportedFixtureMode, ExportedFixtureValue,
    ExportedInstanceChannel, ExportedModeChannel, ExportedProject, ExportedScene,
    ExportedSceneBoard, ExportedSceneBoardButton, ProjectDocument,
};
use crate::error::{LumenError, Result};
use crate::repository::{Repository, SceneBoardRepository};

#[derive(Clone, Copy, Debug)]
pub struct ExportOptions {
    pub include_fixtures: bool,
    pub include_scenes: bool,
    pub include_cue_lists: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            include_fixtures: true,
            include_scenes: true,
            include_cue_lists: true,
        }
    }
}

/// Entity counts for one export.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ExportStats {
    pub fixture_definitions: usize,
    pub fixtures: usize,
    pub scenes: usize,
    pub cue_lists: usize,
    pub cues: usize,
    pub scene_boards: usize,
}

pub struct Exporter {
    repo: Arc<dyn Repository>,
    boards: Option<Arc<dyn SceneBoardRepository>>,
}

impl Exporter {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self { repo, boards: None }
    }

    /// Enables scene board export for deployments that store boards.
    pub fn with_scene_boards(mut self, boards: Arc<dyn SceneBoardRepository>) -> Self {
        self.boards = Some(boards);
        self
    }

    /// Exports a project to a document. There are no partial-output
    /// semantics: either the full document is returned or an error is.
    pub async fn export(
        &self,
        project_id: &str,
        options: &ExportOptions,
    ) -> Result<(ProjectDocument, ExportStats)> {
        let project = self
            .repo
            .find_project(project_id)
            .await?
            .ok_or_else(|| LumenError::ProjectNotFound(project_id.to_string()))?;

        let mut document = ProjectDocument::new(ExportedProject {
            original_id: project.id.clone(),
            name: project.name.clone(),
            description: project.description.clone(),
        });
        document.metadata = Some(DocumentMetadata {
            exported_at: Some(Utc::now()),
            producer: Some(format!("lumen {}", env!("CARGO_PKG_VERSION"))),
        });
        let mut stats = ExportStats::default();

        if options.include_fixtures {
            self.export_fixtures(project_id, &mut document, &mut stats)
                .await?;
        }

        if options.include_scenes {
            let scenes = self.repo.list_scenes(project_id).await?;
            for scene in scenes {
                let mut fixture_values = Vec::with_capacity(scene.fixture_values.len());
                for value in &scene.fixture_values {
                    fixture_values.push(ExportedFixtureValue {
                        fixture_ref_id: value.fixture_id.clone(),
                        scene_order: value.scene_order,
                        channels: Some(value.decoded_channels()?),
                        channel_values: None,
                    });
                }
                document.scenes.push(ExportedScene {
                    ref_id: scene.id,
                    name: scene.name,
                    description: scene.description,
                    fixture_values,
                });
                stats.scenes += 1;
            }
        }

        if options.include_cue_lists {
            let cue_lists = self.repo.list_cue_lists(project_id).await?;
            for cue_list in cue_lists {
                let cues: Vec<ExportedCue> = cue_list
                    .cues
                    .iter()
                    .map(|cue| ExportedCue {
                        name: cue.name.clone(),
                        cue_number: cue.cue_number,
                        scene_ref_id: cue.scene_id.clone(),
                        fade_in_seconds: cue.fade_in_seconds,
                        fade_out_seconds: cue.fade_out_seconds,
                        follow_seconds: cue.follow_seconds,
                        easing: cue.easing.clone(),
                        notes: cue.notes.clone(),
                    })
                    .collect();
                stats.cues += cues.len();
                document.cue_lists.push(ExportedCueList {
                    ref_id: cue_list.id,
                    name: cue_list.name,
                    description: cue_list.description,
                    is_loop: cue_list.is_loop,
                    cues,
                });
                stats.cue_lists += 1;
            }
        }

        if let Some(boards) = &self.boards {
            for board in boards.list_scene_boards(project_id).await? {
                document.scene_boards.push(ExportedSceneBoard {
                    ref_id: board.id,
                    name: board.name,
                    rows: board.rows,
                    columns: board.columns,
                    buttons: board
                        .buttons
                        .iter()
                        .map(|b| ExportedSceneBoardButton {
                            scene_ref_id: b.scene_id.clone(),
                            label: b.label.clone(),
                            row: b.row,
                            col: b.col,
                        })
                        .collect(),
                });
                stats.scene_boards += 1;
            }
        }

        Ok((document, stats))
    }

    async fn export_fixtures(
        &self,
        project_id: &str,
        document: &mut ProjectDocument,
        stats: &mut ExportStats,
    ) -> Result<()> {
        let instances = self.repo.list_fixture_instances(project_id).await?;

        // Unique referenced definitions, in first-reference order.
        let mut definitions: HashMap<String, FixtureDefinition> = HashMap::new();
        for instance in &instances {
            if definitions.contains_key(&instance.definition_id) {
                continue;
            }
            if let Some(definition) = self
                .repo
                .find_fixture_definition(&instance.definition_id)
                .await?
            {
                document
                    .fixture_definitions
                    .push(export_definition(&definition));
                stats.fixture_definitions += 1;
                definitions.insert(instance.definition_id.clone(), definition);
            }
        }

        for instance in &instances {
            let definition = definitions.get(&instance.definition_id);
            document
                .fixtures
                .push(export_instance(instance, definition));
            stats.fixtures += 1;
        }
        Ok(())
    }
}

fn export_definition(definition: &FixtureDefinition) -> ExportedFixtureDefinition {
    ExportedFixtureDefinition {
        ref_id: definition.id.clone(),
        manufacturer: definition.manufacturer.clone(),
        model: definition.model.clone(),
        kind: definition.kind.to_string(),
        is_built_in: definition.is_built_in,
        channels: definition
            .channels
            .iter()
            .map(|channel| ExportedChannelDefinition {
                ref_id: channel.id.clone(),
                name: channel.name.clone(),
                kind: channel.kind.to_string(),
                offset: channel.offset,
                min_value: channel.min_value,
                default_value: channel.default_value,
                max_value: channel.max_value,
                fade_behavior: Some(channel.fade_behavior.to_string()),
                is_discrete: channel.is_discrete,
            })
            .collect(),
        modes: definition
            .modes
            .iter()
            .map(|mode| ExportedFixtureMode {
                ref_id: mode.id.clone(),
                name: mode.name.clone(),
                short_name: mode.short_name.clone(),
                channel_count: mode.channel_count,
                mode_channels: mode
                    .channels
                    .iter()
                    .map(|mc| ExportedModeChannel {
                        channel_ref_id: mc.channel_id.clone(),
                        offset: mc.offset,
                    })
                    .collect(),
            })
            .collect(),
    }
}

fn export_instance(
    instance: &FixtureInstance,
    definition: Option<&FixtureDefinition>,
) -> ExportedFixtureInstance {
    // A mode ref is only emitted when the selected mode still resolves on
    // the definition; the name is kept alongside for older readers.
    let mode_ref_id = instance.mode_name.as_deref().and_then(|name| {
        definition
            .and_then(|d| d.mode_by_name(name))
            .map(|m| m.id.clone())
    });

    let instance_channels = if instance.channels.is_empty() {
        None
    } else {
        Some(
            instance
                .channels
                .iter()
                .map(|channel| ExportedInstanceChannel {
                    name: channel.name.clone(),
                    kind: channel.kind.to_string(),
                    offset: channel.offset,
                    min_value: channel.min_value,
                    default_value: channel.default_value,
                    max_value: channel.max_value,
                    fade_behavior: Some(channel.fade_behavior.to_string()),
                    is_discrete: channel.is_discrete,
                })
                .collect(),
        )
    };

    ExportedFixtureInstance {
        ref_id: instance.id.clone(),
        name: instance.name.clone(),
        description: instance.description.clone(),
        definition_ref_id: instance.definition_id.clone(),
        universe: instance.universe,
        start_channel: instance.start_channel,
        tags: instance.decoded_tags(),
        mode_ref_id,
        mode_name: instance.mode_name.clone(),
        channel_count: instance.channel_count,
        instance_channels,
        x: instance.x,
        y: instance.y,
        rotation: instance.rotation,
        project_order: instance.project_order,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cue::cue::{Cue, CueList};
    use crate::repository::{seed_builtin_definitions, MemoryRepository};
    use crate::scene::board::{SceneBoard, SceneBoardButton};
    use crate::scene::scene::{encode_channel_values, ChannelValue, FixtureValue, Scene};
    use lumen_fixtures::{FixtureInstance, FixtureKind, InstanceChannel};

    async fn demo_project(repo: &MemoryRepository) -> String {
        seed_builtin_definitions(repo).await.unwrap();
        let project = repo.create_project("Club Night", None).await.unwrap();
        let par = repo
            .find_definition_by_manufacturer_model("Shehds", "LED Flat PAR 12x3W RGBW")
            .await
            .unwrap()
            .unwrap();

        let channels: Vec<InstanceChannel> = par.channels.iter().map(Into::into).collect();
        let instance = repo
            .create_fixture_instance(FixtureInstance {
                id: String::new(),
                name: "Left PAR".to_string(),
                description: None,
                definition_id: par.id.clone(),
                project_id: project.id.clone(),
                manufacturer: par.manufacturer.clone(),
                model: par.model.clone(),
                kind: FixtureKind::Par,
                universe: 1,
                start_channel: 1,
                tags: FixtureInstance::encode_tags(&["front".to_string()]),
                mode_name: Some("8-Channel".to_string()),
                channel_count: Some(channels.len() as u16),
                x: Some(0.5),
                y: None,
                rotation: None,
                project_order: Some(0),
                channels,
            })
            .await
            .unwrap();

        let scene = repo
            .create_scene(Scene {
                id: String::new(),
                project_id: project.id.clone(),
                name: "Warm Wash".to_string(),
                description: None,
                fixture_values: vec![FixtureValue {
                    fixture_id: instance.id.clone(),
                    scene_order: Some(0),
                    channels: encode_channel_values(&[
                        ChannelValue {
                            offset: 0,
                            value: 255,
                        },
                        ChannelValue {
                            offset: 1,
                            value: 180,
                        },
                    ]),
                }],
            })
            .await
            .unwrap();

        repo.create_cue_list(CueList {
            id: String::new(),
            project_id: project.id.clone(),
            name: "Main".to_string(),
            description: None,
            is_loop: false,
            cues: vec![Cue {
                id: String::new(),
                name: "Opening".to_string(),
                cue_number: 1.0,
                scene_id: scene.id.clone(),
                fade_in_seconds: 3.0,
                fade_out_seconds: 2.0,
                follow_seconds: None,
                easing: None,
                notes: None,
            }],
        })
        .await
        .unwrap();

        repo.create_scene_board(SceneBoard {
            id: String::new(),
            project_id: project.id.clone(),
            name: "Wall Panel".to_string(),
            rows: Some(2),
            columns: Some(4),
            buttons: vec![SceneBoardButton {
                scene_id: scene.id.clone(),
                label: Some("Warm".to_string()),
                row: 0,
                col: 0,
            }],
        })
        .await
        .unwrap();

        project.id
    }

    #[tokio::test]
    async fn test_export_missing_project_is_not_found() {
        let repo = Arc::new(MemoryRepository::new());
        let exporter = Exporter::new(repo);
        let err = exporter
            .export("nope", &ExportOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LumenError::ProjectNotFound(_)));
    }

    #[tokio::test]
    async fn test_export_full_project() {
        let repo = Arc::new(MemoryRepository::new());
        let project_id = demo_project(&repo).await;

        let exporter = Exporter::new(repo.clone()).with_scene_boards(repo.clone());
        let (document, stats) = exporter
            .export(&project_id, &ExportOptions::default())
            .await
            .unwrap();

        assert_eq!(stats.fixture_definitions, 1);
        assert_eq!(stats.fixtures, 1);
        assert_eq!(stats.scenes, 1);
        assert_eq!(stats.cue_lists, 1);
        assert_eq!(stats.cues, 1);
        assert_eq!(stats.scene_boards, 1);

        // Ref IDs are storage IDs, and cross-references resolve in-document.
        let fixture = &document.fixtures[0];
        assert_eq!(fixture.definition_ref_id, document.fixture_definitions[0].ref_id);
        assert_eq!(fixture.tags, vec!["front"]);
        assert!(fixture.mode_ref_id.is_some());

        let scene = &document.scenes[0];
        assert_eq!(scene.fixture_values[0].fixture_ref_id, fixture.ref_id);
        assert!(scene.fixture_values[0].channel_values.is_none());

        assert_eq!(document.cue_lists[0].cues[0].scene_ref_id, scene.ref_id);
        assert_eq!(
            document.scene_boards[0].buttons[0].scene_ref_id,
            scene.ref_id
        );
    }

    #[tokio::test]
    async fn test_export_respects_include_flags() {
        let repo = Arc::new(MemoryRepository::new());
        let project_id = demo_project(&repo).await;

        let exporter = Exporter::new(repo);
        let options = ExportOptions {
            include_fixtures: false,
            include_scenes: false,
            include_cue_lists: true,
        };
        let (document, stats) = exporter.export(&project_id, &options).await.unwrap();

        assert!(document.fixture_definitions.is_empty());
        assert!(document.fixtures.is_empty());
        assert!(document.scenes.is_empty());
        assert_eq!(stats.fixtures, 0);
        assert_eq!(stats.cue_lists, 1);
    }

    #[tokio::test]
    async fn test_export_is_idempotent_modulo_timestamp() {
        let repo = Arc::new(MemoryRepository::new());
        let project_id = demo_project(&repo).await;

        let exporter = Exporter::new(repo.clone()).with_scene_boards(repo.clone());
        let (mut first, _) = exporter
            .export(&project_id, &ExportOptions::default())
            .await
            .unwrap();
        let (mut second, _) = exporter
            .export(&project_id, &ExportOptions::default())
            .await
            .unwrap();

        first.metadata = None;
        second.metadata = None;
        assert_eq!(first, second);
    }
}
