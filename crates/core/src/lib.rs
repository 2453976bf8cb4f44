pub use config::{ConfigError, ConfigFile, ConfigManager, Settings};
pub use cue::cue::{Cue, CueList};
pub use dmx::{DmxEngine, OverrideEngine, UNIVERSE_SIZE};
pub use document::codec::{
    from_json, load_from_file, save_to_file, to_json, MAX_DOCUMENT_FILE_SIZE,
};
pub use document::schema::{ProjectDocument, DOCUMENT_VERSION};
pub use error::{LumenError, Result};
pub use export::{ExportOptions, ExportStats, Exporter};
pub use import::{
    FixtureConflictStrategy, ImportMode, ImportOptions, ImportReport, ImportStats, Importer,
};
pub use preview::manager::{
    PreviewSessionManager, SessionUpdateCallback, DEFAULT_SESSION_TIMEOUT,
};
pub use preview::session::{PreviewSession, UniverseSnapshot};
pub use project::Project;
pub use repository::{
    seed_builtin_definitions, MemoryRepository, Repository, SceneBoardRepository,
};
pub use scene::board::{SceneBoard, SceneBoardButton};
pub use scene::scene::{
    decode_channel_payload, encode_channel_values, ChannelValue, FixtureValue, Scene,
};

mod config;
mod cue;
mod dmx;
pub mod document;
mod error;
mod export;
mod import;
mod preview;
mod project;
mod repository;
mod scene;
