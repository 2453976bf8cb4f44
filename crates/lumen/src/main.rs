use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use lumen_core::{
    encode_channel_values, load_from_file, save_to_file, seed_builtin_definitions, ChannelValue,
    ConfigManager, Cue, CueList, ExportOptions, Exporter, FixtureConflictStrategy, FixtureValue,
    ImportOptions, Importer, MemoryRepository, OverrideEngine, PreviewSessionManager, Repository,
    Scene, SceneBoard, SceneBoardButton, SceneBoardRepository,
};
use lumen_fixtures::{FixtureInstance, InstanceChannel};

/// Project document tools for the Lumen lighting server.
#[derive(Parser, Debug)]
#[command(name = "lumen")]
#[command(about = "Lumen stage-lighting project tools")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the demo project, run a short preview session and export the
    /// project to a document file
    Demo {
        #[arg(long, default_value = "demo-project.json")]
        out: PathBuf,
    },
    /// Print a summary of a project document
    Inspect {
        #[arg(long)]
        file: PathBuf,
    },
    /// Validate a document by importing it into an in-memory backend
    Import {
        #[arg(long)]
        file: PathBuf,

        /// Override the document's project name
        #[arg(long)]
        project_name: Option<String>,

        #[arg(long, value_enum, default_value = "skip")]
        conflict: ConflictArg,

        /// Import built-in definitions through the conflict strategy
        /// instead of silently reusing catalog matches
        #[arg(long)]
        import_builtin: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ConflictArg {
    Skip,
    Replace,
    Rename,
}

impl From<ConflictArg> for FixtureConflictStrategy {
    fn from(arg: ConflictArg) -> Self {
        match arg {
            ConflictArg::Skip => FixtureConflictStrategy::Skip,
            ConflictArg::Replace => FixtureConflictStrategy::Replace,
            ConflictArg::Rename => FixtureConflictStrategy::Rename,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    match args.command {
        Command::Demo { out } => demo(out).await,
        Command::Inspect { file } => inspect(file),
        Command::Import {
            file,
            project_name,
            conflict,
            import_builtin,
        } => import(file, project_name, conflict, import_builtin).await,
    }
}

async fn demo(out: PathBuf) -> Result<()> {
    let mut config = ConfigManager::new(None);
    let settings = config.load()?;

    let repo = Arc::new(MemoryRepository::new());
    let engine = Arc::new(OverrideEngine::new());

    if settings.seed_builtin_library {
        let seeded = seed_builtin_definitions(repo.as_ref()).await?;
        println!("Seeded {} built-in fixture definitions", seeded);
    }

    let project = repo.create_project("Demo Show", None).await?;

    // Patch a small rig from the built-in library.
    let left_par = patch_fixture(&repo, &project.id, "Left PAR", "LED Flat PAR 12x3W RGBW", 1, 1)
        .await?;
    let right_par =
        patch_fixture(&repo, &project.id, "Right PAR", "LED Flat PAR 12x3W RGBW", 1, 9).await?;
    let _wash = patch_fixture(&repo, &project.id, "Left Wash", "LED Wash 7x18W RGBWA+UV", 1, 18)
        .await?;

    let scene = repo
        .create_scene(Scene {
            id: String::new(),
            project_id: project.id.clone(),
            name: "Warm Wash".to_string(),
            description: None,
            fixture_values: vec![
                warm_value(&left_par.id, 0),
                warm_value(&right_par.id, 1),
            ],
        })
        .await?;

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
    .await?;

    repo.create_scene_board(SceneBoard {
        id: String::new(),
        project_id: project.id.clone(),
        name: "Wall Panel".to_string(),
        rows: Some(1),
        columns: Some(4),
        buttons: vec![SceneBoardButton {
            scene_id: scene.id.clone(),
            label: Some("Warm".to_string()),
            row: 0,
            col: 0,
        }],
    })
    .await?;

    // Drive a preview session against the scene.
    if settings.dmx_enabled {
        let manager = Arc::new(
            PreviewSessionManager::new(repo.clone(), engine.clone())
                .with_timeout(Duration::from_secs(settings.preview_timeout_secs)),
        );
        manager.set_session_update_callback(Arc::new(|session, output| {
            log::info!(
                "preview update: session {} has {} overrides across {} universes",
                session.id,
                session.overrides.len(),
                output.len()
            );
        }));

        let session = manager.start_session(&project.id, Some("demo".to_string()));
        manager.initialize_with_scene(&session.id, &scene.id).await?;
        manager
            .update_channel_value(&session.id, &left_par.id, 1, 255)
            .await?;
        let output = manager.get_dmx_output(&session.id).unwrap_or_default();
        println!(
            "Preview session {} active with {} universes of output",
            session.id,
            output.len()
        );
        manager.commit_session(&session.id);
    }

    // Export the project to a document file.
    let exporter = Exporter::new(repo.clone()).with_scene_boards(repo.clone());
    let (document, stats) = exporter
        .export(&project.id, &ExportOptions::default())
        .await?;
    save_to_file(&document, &out)?;
    println!(
        "Exported {} fixtures, {} scenes, {} cue lists to {}",
        stats.fixtures,
        stats.scenes,
        stats.cue_lists,
        out.display()
    );
    Ok(())
}

fn inspect(file: PathBuf) -> Result<()> {
    let document = load_from_file(&file)?;
    println!("Project: {}", document.project.name);
    println!("Version: {}", document.version);
    if let Some(metadata) = &document.metadata {
        if let Some(exported_at) = metadata.exported_at {
            println!("Exported at: {}", exported_at);
        }
        if let Some(producer) = &metadata.producer {
            println!("Producer: {}", producer);
        }
    }
    println!("Fixture definitions: {}", document.fixture_definitions.len());
    println!("Fixtures: {}", document.fixtures.len());
    println!("Scenes: {}", document.scenes.len());
    println!(
        "Cue lists: {} ({} cues)",
        document.cue_lists.len(),
        document.cue_lists.iter().map(|c| c.cues.len()).sum::<usize>()
    );
    println!("Scene boards: {}", document.scene_boards.len());
    Ok(())
}

async fn import(
    file: PathBuf,
    project_name: Option<String>,
    conflict: ConflictArg,
    import_builtin: bool,
) -> Result<()> {
    let document = load_from_file(&file)?;

    let repo = Arc::new(MemoryRepository::new());
    seed_builtin_definitions(repo.as_ref()).await?;

    let importer = Importer::new(repo.clone()).with_scene_boards(repo.clone());
    let options = ImportOptions {
        project_name,
        fixture_conflict_strategy: conflict.into(),
        import_built_in_fixtures: import_builtin,
        ..Default::default()
    };

    match importer.import_document(&document, &options).await? {
        Some(report) => {
            println!("Imported into project {}", report.project_id);
            println!(
                "Created: {} definitions, {} modes, {} fixtures, {} scenes, {} cue lists, {} cues, {} boards",
                report.stats.fixture_definitions_created,
                report.stats.fixture_modes_created,
                report.stats.fixtures_created,
                report.stats.scenes_created,
                report.stats.cue_lists_created,
                report.stats.cues_created,
                report.stats.scene_boards_created,
            );
            if report.warnings.is_empty() {
                println!("No warnings");
            } else {
                println!("Warnings:");
                for warning in &report.warnings {
                    println!("  - {}", warning);
                }
            }
        }
        None => println!("Nothing imported: target project not found"),
    }
    Ok(())
}

/// Creates a fixture instance from a built-in Shehds definition, with the
/// definition's full channel list snapshotted onto the instance.
async fn patch_fixture(
    repo: &Arc<MemoryRepository>,
    project_id: &str,
    name: &str,
    model: &str,
    universe: u16,
    start_channel: u16,
) -> Result<FixtureInstance> {
    let definition = repo
        .find_definition_by_manufacturer_model("Shehds", model)
        .await?
        .ok_or_else(|| anyhow::anyhow!("built-in definition {} not found", model))?;

    let channels: Vec<InstanceChannel> = definition.channels.iter().map(Into::into).collect();
    let instance = repo
        .create_fixture_instance(FixtureInstance {
            id: String::new(),
            name: name.to_string(),
            description: None,
            definition_id: definition.id.clone(),
            project_id: project_id.to_string(),
            manufacturer: definition.manufacturer.clone(),
            model: definition.model.clone(),
            kind: definition.kind.clone(),
            universe,
            start_channel,
            tags: None,
            mode_name: None,
            channel_count: Some(channels.len() as u16),
            x: None,
            y: None,
            rotation: None,
            project_order: None,
            channels,
        })
        .await?;
    Ok(instance)
}

fn warm_value(fixture_id: &str, order: u32) -> FixtureValue {
    FixtureValue {
        fixture_id: fixture_id.to_string(),
        scene_order: Some(order),
        channels: encode_channel_values(&[
            ChannelValue {
                offset: 0,
                value: 255,
            },
            ChannelValue {
                offset: 1,
                value: 230,
            },
            ChannelValue {
                offset: 4,
                value: 60,
            },
        ]),
    }
}
