//! Persistence contracts consumed by the exporter, importer and the
//! preview session manager.
//!
//! Backends must return collections in a deterministic order for a given
//! project (creation order or a stored order attribute) so that two exports
//! of an unchanged project produce identical documents.

use async_trait::async_trait;

use lumen_fixtures::{builtin_definitions, FixtureDefinition, FixtureInstance, FixtureMode};

use crate::cue::cue::CueList;
use crate::error::Result;
use crate::project::Project;
use crate::scene::board::SceneBoard;
use crate::scene::scene::Scene;

pub use memory::MemoryRepository;

mod memory;

/// Facade over project storage. Creation calls assign storage IDs and
/// return the persisted entity; aggregate creators (definitions with their
/// channels and modes, instances with their channels, scenes with their
/// fixture values, cue lists with their cues) persist parent and children
/// in one atomic call.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn find_project(&self, id: &str) -> Result<Option<Project>>;
    async fn create_project(&self, name: &str, description: Option<String>) -> Result<Project>;

    async fn find_fixture_definition(&self, id: &str) -> Result<Option<FixtureDefinition>>;
    /// Catalog lookup; at most one definition exists per (manufacturer, model).
    async fn find_definition_by_manufacturer_model(
        &self,
        manufacturer: &str,
        model: &str,
    ) -> Result<Option<FixtureDefinition>>;
    /// Persists a definition with its channels and modes. The backend
    /// assigns fresh IDs to the definition, every channel and every mode
    /// (remapping mode bindings), preserving the caller's ordering.
    async fn create_fixture_definition(
        &self,
        definition: FixtureDefinition,
    ) -> Result<FixtureDefinition>;
    /// Adds a mode to an existing definition. Mode names are unique within
    /// a definition; adding a duplicate name is a repository error.
    async fn add_fixture_mode(&self, definition_id: &str, mode: FixtureMode)
        -> Result<FixtureMode>;

    async fn find_fixture_instance(&self, id: &str) -> Result<Option<FixtureInstance>>;
    async fn list_fixture_instances(&self, project_id: &str) -> Result<Vec<FixtureInstance>>;
    async fn create_fixture_instance(&self, instance: FixtureInstance) -> Result<FixtureInstance>;

    async fn find_scene(&self, id: &str) -> Result<Option<Scene>>;
    async fn list_scenes(&self, project_id: &str) -> Result<Vec<Scene>>;
    async fn create_scene(&self, scene: Scene) -> Result<Scene>;

    async fn list_cue_lists(&self, project_id: &str) -> Result<Vec<CueList>>;
    async fn create_cue_list(&self, cue_list: CueList) -> Result<CueList>;
}

/// Storage for scene boards, split out because deployments without board
/// UIs run without one. The exporter and importer take it as an optional
/// collaborator.
#[async_trait]
pub trait SceneBoardRepository: Send + Sync {
    async fn list_scene_boards(&self, project_id: &str) -> Result<Vec<SceneBoard>>;
    async fn create_scene_board(&self, board: SceneBoard) -> Result<SceneBoard>;
}

/// Installs the built-in fixture library into a repository, skipping any
/// definition whose (manufacturer, model) is already present. Returns the
/// number of definitions created.
pub async fn seed_builtin_definitions(repo: &dyn Repository) -> Result<usize> {
    let mut created = 0;
    for definition in builtin_definitions() {
        let existing = repo
            .find_definition_by_manufacturer_model(&definition.manufacturer, &definition.model)
            .await?;
        if existing.is_none() {
            log::info!(
                "Seeding built-in fixture definition: {} {}",
                definition.manufacturer,
                definition.model
            );
            repo.create_fixture_definition(definition).await?;
            created += 1;
        }
    }
    Ok(created)
}
