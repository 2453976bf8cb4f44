//! Project import.
//!
//! Consumes a [`ProjectDocument`], materializes entities through the
//! repository interfaces and rewrites every ref ID to a newly-assigned
//! storage ID. Mapping tables live on the stack of a single import call;
//! there is no shared remapping state between imports.
//!
//! Error policy: the first repository error aborts the import and is
//! returned verbatim; entities created before the failure persist, since
//! the repository layer provides no cross-call transaction. Dangling ref IDs
//! and conflict-skip decisions are never errors; they produce warnings and
//! the affected entity is skipped.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use lumen_fixtures::{
    ChannelDefinition, ChannelKind, FadeBehavior, FixtureDefinition, FixtureInstance, FixtureKind,
    FixtureMode, InstanceChannel, ModeChannel,
};

use crate::cue::cue::{Cue, CueList};
use crate::document::codec;
use crate::document::schema::{
    ExportedFixtureDefinition, ExportedFixtureInstance, ProjectDocument,
};
use crate::error::Result;
use crate::repository::{Repository, SceneBoardRepository};
use crate::scene::board::{SceneBoard, SceneBoardButton};
use crate::scene::scene::{encode_channel_values, FixtureValue, Scene};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ImportMode {
    /// Always create a new project.
    #[default]
    Create,
    /// Add the document's entities into an existing project.
    Merge,
    /// Currently behaviorally identical to Merge.
    Replace,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FixtureConflictStrategy {
    /// Reuse the existing definition, with a warning.
    #[default]
    Skip,
    /// Alias of Skip today: reuse the existing definition.
    Replace,
    /// Create the imported definition under a renamed model.
    Rename,
}

#[derive(Clone, Debug, Default)]
pub struct ImportOptions {
    pub mode: ImportMode,
    /// Target for Merge and Replace; ignored by Create.
    pub target_project_id: Option<String>,
    /// Overrides the document's project name in Create mode.
    pub project_name: Option<String>,
    pub fixture_conflict_strategy: FixtureConflictStrategy,
    /// When false, a built-in definition in the document silently reuses
    /// the matching definition already present in the catalog.
    pub import_built_in_fixtures: bool,
}

/// Entity counts for one import.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ImportStats {
    pub fixture_definitions_created: usize,
    pub fixture_modes_created: usize,
    pub fixtures_created: usize,
    pub scenes_created: usize,
    pub cue_lists_created: usize,
    pub cues_created: usize,
    pub scene_boards_created: usize,
}

#[derive(Clone, Debug)]
pub struct ImportReport {
    pub project_id: String,
    pub stats: ImportStats,
    pub warnings: Vec<String>,
}

/// Per-import remapping state: document ref IDs to storage IDs, plus the
/// mode ref ID to mode name table instances resolve through.
#[derive(Default)]
struct ImportState {
    definition_ids: HashMap<String, String>,
    fixture_ids: HashMap<String, String>,
    scene_ids: HashMap<String, String>,
    mode_ref_to_name: HashMap<String, String>,
    stats: ImportStats,
    warnings: Vec<String>,
}

impl ImportState {
    fn warn(&mut self, message: String) {
        log::warn!("import: {}", message);
        self.warnings.push(message);
    }
}

pub struct Importer {
    repo: Arc<dyn Repository>,
    boards: Option<Arc<dyn SceneBoardRepository>>,
}

impl Importer {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self { repo, boards: None }
    }

    /// Enables scene board import for deployments that store boards.
    pub fn with_scene_boards(mut self, boards: Arc<dyn SceneBoardRepository>) -> Self {
        self.boards = Some(boards);
        self
    }

    /// Imports a document from JSON text. Returns `Ok(None)` when Merge or
    /// Replace targets a project that does not exist.
    pub async fn import(
        &self,
        document_json: &str,
        options: &ImportOptions,
    ) -> Result<Option<ImportReport>> {
        let document = codec::from_json(document_json)?;
        self.import_document(&document, options).await
    }

    /// Imports an already-parsed document.
    pub async fn import_document(
        &self,
        document: &ProjectDocument,
        options: &ImportOptions,
    ) -> Result<Option<ImportReport>> {
        let project_id = match options.mode {
            ImportMode::Create => {
                let name = options
                    .project_name
                    .as_deref()
                    .unwrap_or(&document.project.name);
                self.repo
                    .create_project(name, document.project.description.clone())
                    .await?
                    .id
            }
            ImportMode::Merge | ImportMode::Replace => {
                let target = match options.target_project_id.as_deref() {
                    Some(target) => target,
                    None => return Ok(None),
                };
                match self.repo.find_project(target).await? {
                    Some(project) => project.id,
                    None => return Ok(None),
                }
            }
        };

        let mut state = ImportState::default();

        for exported in &document.fixture_definitions {
            self.import_definition(exported, options, &mut state).await?;
        }
        for exported in &document.fixtures {
            self.import_instance(exported, &project_id, &mut state).await?;
        }
        self.import_scenes(document, &project_id, &mut state).await?;
        self.import_cue_lists(document, &project_id, &mut state)
            .await?;
        self.import_scene_boards(document, &project_id, &mut state)
            .await?;

        log::info!(
            "import into project {}: {} definitions, {} fixtures, {} scenes, {} cue lists, {} warnings",
            project_id,
            state.stats.fixture_definitions_created,
            state.stats.fixtures_created,
            state.stats.scenes_created,
            state.stats.cue_lists_created,
            state.warnings.len()
        );

        Ok(Some(ImportReport {
            project_id,
            stats: state.stats,
            warnings: state.warnings,
        }))
    }

    async fn import_definition(
        &self,
        exported: &ExportedFixtureDefinition,
        options: &ImportOptions,
        state: &mut ImportState,
    ) -> Result<()> {
        let existing = self
            .repo
            .find_definition_by_manufacturer_model(&exported.manufacturer, &exported.model)
            .await?;

        if let Some(existing) = &existing {
            let builtin_reuse = exported.is_built_in && !options.import_built_in_fixtures;
            let reuse = builtin_reuse
                || matches!(
                    options.fixture_conflict_strategy,
                    FixtureConflictStrategy::Skip | FixtureConflictStrategy::Replace
                );
            if reuse {
                if !builtin_reuse {
                    state.warn(format!(
                        "Fixture definition already exists, reusing: {} {}",
                        exported.manufacturer, exported.model
                    ));
                }
                state
                    .definition_ids
                    .insert(exported.ref_id.clone(), existing.id.clone());
                return self.merge_modes(exported, existing, state).await;
            }
        }

        // Rename keeps the catalog's (manufacturer, model) uniqueness by
        // suffixing the imported model until a free slot is found.
        let mut model = exported.model.clone();
        if existing.is_some() {
            let mut n = 2;
            loop {
                let candidate = format!("{} ({})", exported.model, n);
                if self
                    .repo
                    .find_definition_by_manufacturer_model(&exported.manufacturer, &candidate)
                    .await?
                    .is_none()
                {
                    model = candidate;
                    break;
                }
                n += 1;
            }
            log::info!(
                "import: renamed conflicting fixture definition to {} {}",
                exported.manufacturer,
                model
            );
        }

        let channels: Vec<ChannelDefinition> = exported
            .channels
            .iter()
            .map(|c| ChannelDefinition {
                id: String::new(),
                name: c.name.clone(),
                kind: ChannelKind::from(c.kind.as_str()),
                offset: c.offset,
                min_value: c.min_value,
                default_value: c.default_value,
                max_value: c.max_value,
                fade_behavior: c
                    .fade_behavior
                    .as_deref()
                    .map(FadeBehavior::from)
                    .unwrap_or_default(),
                is_discrete: c.is_discrete,
            })
            .collect();

        let created = self
            .repo
            .create_fixture_definition(FixtureDefinition {
                id: String::new(),
                manufacturer: exported.manufacturer.clone(),
                model,
                kind: FixtureKind::from(exported.kind.as_str()),
                is_built_in: false,
                channels,
                modes: Vec::new(),
            })
            .await?;
        state.stats.fixture_definitions_created += 1;
        state
            .definition_ids
            .insert(exported.ref_id.clone(), created.id.clone());

        // Channel ref map, scoped to this definition. Documents written
        // before channels carried ref IDs key modes by channel name.
        let mut channel_ref_map: HashMap<String, String> = HashMap::new();
        for (exported_channel, created_channel) in
            exported.channels.iter().zip(created.channels.iter())
        {
            let key = if exported_channel.ref_id.is_empty() {
                exported_channel.name.clone()
            } else {
                exported_channel.ref_id.clone()
            };
            channel_ref_map.insert(key, created_channel.id.clone());
        }

        for exported_mode in &exported.modes {
            state
                .mode_ref_to_name
                .insert(exported_mode.ref_id.clone(), exported_mode.name.clone());

            let mut bindings = Vec::new();
            for mc in &exported_mode.mode_channels {
                match channel_ref_map.get(&mc.channel_ref_id) {
                    Some(channel_id) => bindings.push(ModeChannel {
                        channel_id: channel_id.clone(),
                        offset: mc.offset,
                    }),
                    None => state.warn(format!(
                        "Mode channel references unknown channel: {}",
                        mc.channel_ref_id
                    )),
                }
            }
            self.repo
                .add_fixture_mode(
                    &created.id,
                    FixtureMode {
                        id: String::new(),
                        name: exported_mode.name.clone(),
                        short_name: exported_mode.short_name.clone(),
                        channel_count: exported_mode.channel_count,
                        channels: bindings,
                    },
                )
                .await?;
            state.stats.fixture_modes_created += 1;
        }
        Ok(())
    }

    /// Adds exported modes whose names are not already present on a reused
    /// definition. Channel refs translate through the exported channel
    /// list (ref ID to name) and then the existing definition's channel
    /// names.
    async fn merge_modes(
        &self,
        exported: &ExportedFixtureDefinition,
        existing: &FixtureDefinition,
        state: &mut ImportState,
    ) -> Result<()> {
        let existing_names: HashSet<&str> =
            existing.modes.iter().map(|m| m.name.as_str()).collect();
        let ref_to_name: HashMap<&str, &str> = exported
            .channels
            .iter()
            .map(|c| {
                let key = if c.ref_id.is_empty() {
                    c.name.as_str()
                } else {
                    c.ref_id.as_str()
                };
                (key, c.name.as_str())
            })
            .collect();

        for exported_mode in &exported.modes {
            state
                .mode_ref_to_name
                .insert(exported_mode.ref_id.clone(), exported_mode.name.clone());
            if existing_names.contains(exported_mode.name.as_str()) {
                continue;
            }

            let mut bindings = Vec::new();
            for mc in &exported_mode.mode_channels {
                let resolved = ref_to_name
                    .get(mc.channel_ref_id.as_str())
                    .and_then(|name| existing.channel_by_name(name));
                match resolved {
                    Some(channel) => bindings.push(ModeChannel {
                        channel_id: channel.id.clone(),
                        offset: mc.offset,
                    }),
                    None => state.warn(format!(
                        "Mode '{}' references unknown channel: {}",
                        exported_mode.name, mc.channel_ref_id
                    )),
                }
            }
            self.repo
                .add_fixture_mode(
                    &existing.id,
                    FixtureMode {
                        id: String::new(),
                        name: exported_mode.name.clone(),
                        short_name: exported_mode.short_name.clone(),
                        channel_count: exported_mode.channel_count,
                        channels: bindings,
                    },
                )
                .await?;
            state.stats.fixture_modes_created += 1;
        }
        Ok(())
    }

    async fn import_instance(
        &self,
        exported: &ExportedFixtureInstance,
        project_id: &str,
        state: &mut ImportState,
    ) -> Result<()> {
        let definition_id = match state.definition_ids.get(&exported.definition_ref_id) {
            Some(id) => id.clone(),
            None => {
                state.warn(format!(
                    "Fixture '{}' references unknown definition: {}",
                    exported.name, exported.definition_ref_id
                ));
                return Ok(());
            }
        };
        let definition = match self.repo.find_fixture_definition(&definition_id).await? {
            Some(definition) => definition,
            None => {
                state.warn(format!(
                    "Fixture '{}' references unknown definition: {}",
                    exported.name, exported.definition_ref_id
                ));
                return Ok(());
            }
        };

        // Mode refs win over the legacy name; an unmapped ref falls back
        // to the literal name with a warning.
        let mode_name = match &exported.mode_ref_id {
            Some(mode_ref) => match state.mode_ref_to_name.get(mode_ref) {
                Some(name) => Some(name.clone()),
                None => {
                    state.warn(format!(
                        "Fixture '{}' references unknown mode: {}",
                        exported.name, mode_ref
                    ));
                    exported.mode_name.clone()
                }
            },
            None => exported.mode_name.clone(),
        };

        let channels: Vec<InstanceChannel> = if let Some(explicit) = &exported.instance_channels {
            explicit
                .iter()
                .map(|c| InstanceChannel {
                    name: c.name.clone(),
                    kind: ChannelKind::from(c.kind.as_str()),
                    offset: c.offset,
                    min_value: c.min_value,
                    default_value: c.default_value,
                    max_value: c.max_value,
                    fade_behavior: c
                        .fade_behavior
                        .as_deref()
                        .map(FadeBehavior::from)
                        .unwrap_or_default(),
                    is_discrete: c.is_discrete,
                })
                .collect()
        } else if let Some(mode) = mode_name
            .as_deref()
            .and_then(|name| definition.mode_by_name(name))
        {
            // The mode's offset wins; every other attribute comes from the
            // bound channel definition.
            mode.channels
                .iter()
                .filter_map(|binding| {
                    definition.channel_by_id(&binding.channel_id).map(|channel| {
                        let mut instance_channel = InstanceChannel::from(channel);
                        instance_channel.offset = binding.offset;
                        instance_channel
                    })
                })
                .collect()
        } else {
            definition.channels.iter().map(Into::into).collect()
        };

        let channel_count = exported.channel_count.unwrap_or(channels.len() as u16);
        let created = self
            .repo
            .create_fixture_instance(FixtureInstance {
                id: String::new(),
                name: exported.name.clone(),
                description: exported.description.clone(),
                definition_id,
                project_id: project_id.to_string(),
                manufacturer: definition.manufacturer.clone(),
                model: definition.model.clone(),
                kind: definition.kind.clone(),
                universe: exported.universe,
                start_channel: exported.start_channel,
                tags: FixtureInstance::encode_tags(&exported.tags),
                mode_name,
                channel_count: Some(channel_count),
                x: exported.x,
                y: exported.y,
                rotation: exported.rotation,
                project_order: exported.project_order,
                channels,
            })
            .await?;
        state.stats.fixtures_created += 1;
        state
            .fixture_ids
            .insert(exported.ref_id.clone(), created.id);
        Ok(())
    }

    async fn import_scenes(
        &self,
        document: &ProjectDocument,
        project_id: &str,
        state: &mut ImportState,
    ) -> Result<()> {
        for exported in &document.scenes {
            let mut fixture_values = Vec::new();
            for value in &exported.fixture_values {
                let fixture_id = match state.fixture_ids.get(&value.fixture_ref_id) {
                    Some(id) => id.clone(),
                    None => {
                        state.warn(format!(
                            "Scene '{}' references unknown fixture: {}",
                            exported.name, value.fixture_ref_id
                        ));
                        continue;
                    }
                };
                fixture_values.push(FixtureValue {
                    fixture_id,
                    scene_order: value.scene_order,
                    channels: encode_channel_values(&value.normalized_channels()),
                });
            }

            let created = self
                .repo
                .create_scene(Scene {
                    id: String::new(),
                    project_id: project_id.to_string(),
                    name: exported.name.clone(),
                    description: exported.description.clone(),
                    fixture_values,
                })
                .await?;
            state.stats.scenes_created += 1;
            state.scene_ids.insert(exported.ref_id.clone(), created.id);
        }
        Ok(())
    }

    async fn import_cue_lists(
        &self,
        document: &ProjectDocument,
        project_id: &str,
        state: &mut ImportState,
    ) -> Result<()> {
        for exported in &document.cue_lists {
            let mut cues = Vec::new();
            for cue in &exported.cues {
                let scene_id = match state.scene_ids.get(&cue.scene_ref_id) {
                    Some(id) => id.clone(),
                    None => {
                        state.warn(format!(
                            "Cue '{}' references unknown scene: {}",
                            cue.name, cue.scene_ref_id
                        ));
                        continue;
                    }
                };
                cues.push(Cue {
                    id: String::new(),
                    name: cue.name.clone(),
                    cue_number: cue.cue_number,
                    scene_id,
                    fade_in_seconds: cue.fade_in_seconds,
                    fade_out_seconds: cue.fade_out_seconds,
                    follow_seconds: cue.follow_seconds,
                    easing: cue.easing.clone(),
                    notes: cue.notes.clone(),
                });
            }
            state.stats.cues_created += cues.len();
            self.repo
                .create_cue_list(CueList {
                    id: String::new(),
                    project_id: project_id.to_string(),
                    name: exported.name.clone(),
                    description: exported.description.clone(),
                    is_loop: exported.is_loop,
                    cues,
                })
                .await?;
            state.stats.cue_lists_created += 1;
        }
        Ok(())
    }

    /// Boards are imported whenever a board repository was supplied,
    /// independent of whether scenes were included; unresolved scene refs
    /// are warnings, not errors.
    async fn import_scene_boards(
        &self,
        document: &ProjectDocument,
        project_id: &str,
        state: &mut ImportState,
    ) -> Result<()> {
        let boards = match &self.boards {
            Some(boards) => boards,
            None => return Ok(()),
        };
        for exported in &document.scene_boards {
            let mut buttons = Vec::new();
            for button in &exported.buttons {
                let scene_id = match state.scene_ids.get(&button.scene_ref_id) {
                    Some(id) => id.clone(),
                    None => {
                        state.warn(format!(
                            "Scene board '{}' references unknown scene: {}",
                            exported.name, button.scene_ref_id
                        ));
                        continue;
                    }
                };
                buttons.push(SceneBoardButton {
                    scene_id,
                    label: button.label.clone(),
                    row: button.row,
                    col: button.col,
                });
            }
            boards
                .create_scene_board(SceneBoard {
                    id: String::new(),
                    project_id: project_id.to_string(),
                    name: exported.name.clone(),
                    rows: exported.rows,
                    columns: exported.columns,
                    buttons,
                })
                .await?;
            state.stats.scene_boards_created += 1;
        }
        Ok(())
    }
}
