//! In-memory repository backend.
//!
//! Used by the test suite and the CLI. Collections are plain vectors so
//! listings come back in creation order, which satisfies the deterministic
//! ordering the exporter relies on.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use uuid::Uuid;

use lumen_fixtures::{FixtureDefinition, FixtureInstance, FixtureMode};

use crate::cue::cue::CueList;
use crate::error::{LumenError, Result};
use crate::project::Project;
use crate::repository::{Repository, SceneBoardRepository};
use crate::scene::board::SceneBoard;
use crate::scene::scene::Scene;

#[derive(Default)]
struct Stores {
    projects: Vec<Project>,
    definitions: Vec<FixtureDefinition>,
    instances: Vec<FixtureInstance>,
    scenes: Vec<Scene>,
    cue_lists: Vec<CueList>,
    boards: Vec<SceneBoard>,
}

#[derive(Default)]
pub struct MemoryRepository {
    stores: Mutex<Stores>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn assign_id(id: &mut String) {
    if id.is_empty() {
        *id = Uuid::new_v4().to_string();
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn find_project(&self, id: &str) -> Result<Option<Project>> {
        let stores = self.stores.lock();
        Ok(stores.projects.iter().find(|p| p.id == id).cloned())
    }

    async fn create_project(&self, name: &str, description: Option<String>) -> Result<Project> {
        let project = Project {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            description,
        };
        let mut stores = self.stores.lock();
        stores.projects.push(project.clone());
        Ok(project)
    }

    async fn find_fixture_definition(&self, id: &str) -> Result<Option<FixtureDefinition>> {
        let stores = self.stores.lock();
        Ok(stores.definitions.iter().find(|d| d.id == id).cloned())
    }

    async fn find_definition_by_manufacturer_model(
        &self,
        manufacturer: &str,
        model: &str,
    ) -> Result<Option<FixtureDefinition>> {
        let stores = self.stores.lock();
        Ok(stores
            .definitions
            .iter()
            .find(|d| d.manufacturer == manufacturer && d.model == model)
            .cloned())
    }

    async fn create_fixture_definition(
        &self,
        mut definition: FixtureDefinition,
    ) -> Result<FixtureDefinition> {
        let mut stores = self.stores.lock();
        if stores
            .definitions
            .iter()
            .any(|d| d.manufacturer == definition.manufacturer && d.model == definition.model)
        {
            return Err(LumenError::repository(format!(
                "fixture definition already exists: {} {}",
                definition.manufacturer, definition.model
            )));
        }

        assign_id(&mut definition.id);
        // Channel and mode IDs are always freshly assigned, with mode
        // bindings remapped, so IDs stay unique across the whole catalog
        // no matter what the caller seeded them with.
        let mut channel_ids: HashMap<String, String> = HashMap::new();
        for channel in &mut definition.channels {
            let new_id = Uuid::new_v4().to_string();
            if !channel.id.is_empty() {
                channel_ids.insert(channel.id.clone(), new_id.clone());
            }
            channel.id = new_id;
        }
        for mode in &mut definition.modes {
            mode.id = Uuid::new_v4().to_string();
            for binding in &mut mode.channels {
                if let Some(new_id) = channel_ids.get(&binding.channel_id) {
                    binding.channel_id = new_id.clone();
                }
            }
        }
        stores.definitions.push(definition.clone());
        Ok(definition)
    }

    async fn add_fixture_mode(
        &self,
        definition_id: &str,
        mut mode: FixtureMode,
    ) -> Result<FixtureMode> {
        let mut stores = self.stores.lock();
        let definition = stores
            .definitions
            .iter_mut()
            .find(|d| d.id == definition_id)
            .ok_or_else(|| {
                LumenError::repository(format!("no such fixture definition: {}", definition_id))
            })?;
        if definition.modes.iter().any(|m| m.name == mode.name) {
            return Err(LumenError::repository(format!(
                "mode name already exists on definition: {}",
                mode.name
            )));
        }
        assign_id(&mut mode.id);
        definition.modes.push(mode.clone());
        Ok(mode)
    }

    async fn find_fixture_instance(&self, id: &str) -> Result<Option<FixtureInstance>> {
        let stores = self.stores.lock();
        Ok(stores.instances.iter().find(|i| i.id == id).cloned())
    }

    async fn list_fixture_instances(&self, project_id: &str) -> Result<Vec<FixtureInstance>> {
        let stores = self.stores.lock();
        Ok(stores
            .instances
            .iter()
            .filter(|i| i.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn create_fixture_instance(
        &self,
        mut instance: FixtureInstance,
    ) -> Result<FixtureInstance> {
        assign_id(&mut instance.id);
        let mut stores = self.stores.lock();
        stores.instances.push(instance.clone());
        Ok(instance)
    }

    async fn find_scene(&self, id: &str) -> Result<Option<Scene>> {
        let stores = self.stores.lock();
        Ok(stores.scenes.iter().find(|s| s.id == id).cloned())
    }

    async fn list_scenes(&self, project_id: &str) -> Result<Vec<Scene>> {
        let stores = self.stores.lock();
        Ok(stores
            .scenes
            .iter()
            .filter(|s| s.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn create_scene(&self, mut scene: Scene) -> Result<Scene> {
        assign_id(&mut scene.id);
        let mut stores = self.stores.lock();
        stores.scenes.push(scene.clone());
        Ok(scene)
    }

    async fn list_cue_lists(&self, project_id: &str) -> Result<Vec<CueList>> {
        let stores = self.stores.lock();
        Ok(stores
            .cue_lists
            .iter()
            .filter(|c| c.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn create_cue_list(&self, mut cue_list: CueList) -> Result<CueList> {
        assign_id(&mut cue_list.id);
        for cue in &mut cue_list.cues {
            assign_id(&mut cue.id);
        }
        let mut stores = self.stores.lock();
        stores.cue_lists.push(cue_list.clone());
        Ok(cue_list)
    }
}

#[async_trait]
impl SceneBoardRepository for MemoryRepository {
    async fn list_scene_boards(&self, project_id: &str) -> Result<Vec<SceneBoard>> {
        let stores = self.stores.lock();
        Ok(stores
            .boards
            .iter()
            .filter(|b| b.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn create_scene_board(&self, mut board: SceneBoard) -> Result<SceneBoard> {
        assign_id(&mut board.id);
        let mut stores = self.stores.lock();
        stores.boards.push(board.clone());
        Ok(board)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::seed_builtin_definitions;
    use lumen_fixtures::{ChannelDefinition, ChannelKind, FadeBehavior, FixtureKind};

    fn bare_definition(manufacturer: &str, model: &str) -> FixtureDefinition {
        FixtureDefinition {
            id: String::new(),
            manufacturer: manufacturer.to_string(),
            model: model.to_string(),
            kind: FixtureKind::Par,
            is_built_in: false,
            channels: vec![ChannelDefinition {
                id: String::new(),
                name: "Dimmer".to_string(),
                kind: ChannelKind::Intensity,
                offset: 0,
                min_value: 0,
                default_value: 0,
                max_value: 255,
                fade_behavior: FadeBehavior::Fade,
                is_discrete: false,
            }],
            modes: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_create_assigns_ids() {
        let repo = MemoryRepository::new();
        let created = repo
            .create_fixture_definition(bare_definition("ACME", "Par64"))
            .await
            .unwrap();
        assert!(!created.id.is_empty());
        assert!(!created.channels[0].id.is_empty());

        let found = repo
            .find_definition_by_manufacturer_model("ACME", "Par64")
            .await
            .unwrap();
        assert_eq!(found, Some(created));
    }

    #[tokio::test]
    async fn test_duplicate_manufacturer_model_rejected() {
        let repo = MemoryRepository::new();
        repo.create_fixture_definition(bare_definition("ACME", "Par64"))
            .await
            .unwrap();
        let err = repo
            .create_fixture_definition(bare_definition("ACME", "Par64"))
            .await
            .unwrap_err();
        assert!(matches!(err, LumenError::Repository(_)));
    }

    #[tokio::test]
    async fn test_duplicate_mode_name_rejected() {
        let repo = MemoryRepository::new();
        let definition = repo
            .create_fixture_definition(bare_definition("ACME", "Par64"))
            .await
            .unwrap();
        let mode = FixtureMode {
            id: String::new(),
            name: "Standard".to_string(),
            short_name: "STD".to_string(),
            channel_count: 0,
            channels: Vec::new(),
        };
        repo.add_fixture_mode(&definition.id, mode.clone())
            .await
            .unwrap();
        assert!(repo.add_fixture_mode(&definition.id, mode).await.is_err());
    }

    #[tokio::test]
    async fn test_listings_preserve_creation_order() {
        let repo = MemoryRepository::new();
        let project = repo.create_project("P", None).await.unwrap();
        for name in ["Intro", "Chorus", "Blackout"] {
            repo.create_scene(Scene {
                id: String::new(),
                project_id: project.id.clone(),
                name: name.to_string(),
                description: None,
                fixture_values: Vec::new(),
            })
            .await
            .unwrap();
        }
        let names: Vec<String> = repo
            .list_scenes(&project.id)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["Intro", "Chorus", "Blackout"]);
    }

    #[tokio::test]
    async fn test_seed_builtin_definitions_is_idempotent() {
        let repo = MemoryRepository::new();
        let first = seed_builtin_definitions(&repo).await.unwrap();
        assert_eq!(first, 5);
        let second = seed_builtin_definitions(&repo).await.unwrap();
        assert_eq!(second, 0);
    }
}
