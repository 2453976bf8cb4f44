//! Preview session manager.
//!
//! A concurrent, session-scoped override layer on top of the live DMX
//! output engine. Each project has at most one active session; starting a
//! new one supersedes (cancels) the previous. Session state sits behind a
//! single readers/writer lock; the subscription callback is always invoked
//! outside that lock, on a freshly-spawned task per publication, so slow
//! subscribers cannot stall session operations. The manager must live
//! inside a tokio runtime: timers and publications are spawned tasks.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::RwLock;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::dmx::{DmxEngine, UNIVERSE_SIZE};
use crate::error::Result;
use crate::preview::session::{override_key, parse_override_key, PreviewSession, UniverseSnapshot};
use crate::repository::Repository;

/// Sessions idle out after 30 minutes unless configured otherwise.
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Single subscription sink. Receives a stable snapshot of the session and
/// its per-universe DMX output after every mutating operation.
pub type SessionUpdateCallback = Arc<dyn Fn(PreviewSession, Vec<UniverseSnapshot>) + Send + Sync>;

#[derive(Default)]
struct ManagerState {
    sessions: HashMap<String, PreviewSession>,
    timers: HashMap<String, JoinHandle<()>>,
    callback: Option<SessionUpdateCallback>,
}

pub struct PreviewSessionManager {
    repo: Arc<dyn Repository>,
    dmx: Arc<dyn DmxEngine>,
    timeout: Duration,
    state: RwLock<ManagerState>,
}

impl PreviewSessionManager {
    pub fn new(repo: Arc<dyn Repository>, dmx: Arc<dyn DmxEngine>) -> Self {
        Self {
            repo,
            dmx,
            timeout: DEFAULT_SESSION_TIMEOUT,
            state: RwLock::new(ManagerState::default()),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Starts a preview session for a project, superseding any session
    /// already active on it. Supersession happens under the same write
    /// lock as installation, so concurrent starts serialize and exactly
    /// one session per project survives.
    pub fn start_session(
        self: &Arc<Self>,
        project_id: &str,
        user_id: Option<String>,
    ) -> PreviewSession {
        let session = PreviewSession {
            id: Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            user_id,
            active: true,
            created_at: Utc::now(),
            overrides: HashMap::new(),
        };

        let (superseded, callback) = {
            let mut state = self.state.write();
            let stale: Vec<String> = state
                .sessions
                .values()
                .filter(|s| s.project_id == project_id && s.active)
                .map(|s| s.id.clone())
                .collect();
            let superseded: Vec<PreviewSession> = stale
                .iter()
                .filter_map(|id| self.remove_session_locked(&mut state, id))
                .collect();

            state.sessions.insert(session.id.clone(), session.clone());
            let timer = self.spawn_idle_timer(&session.id);
            state.timers.insert(session.id.clone(), timer);
            (superseded, state.callback.clone())
        };

        for old in superseded {
            log::info!("preview session {} superseded", old.id);
            self.publish(callback.clone(), old, Vec::new());
        }
        log::info!(
            "started preview session {} on project {}",
            session.id,
            project_id
        );
        self.publish(callback, session.clone(), Vec::new());
        session
    }

    /// Sets one channel of a fixture within the session, writing the
    /// override through to the DMX engine. The value is silently clamped
    /// into 0..=255. Returns false when the session or fixture is missing.
    pub async fn update_channel_value(
        self: &Arc<Self>,
        session_id: &str,
        fixture_id: &str,
        channel_index: u16,
        value: i32,
    ) -> Result<bool> {
        if !self.session_is_active(session_id) {
            return Ok(false);
        }
        let fixture = match self.repo.find_fixture_instance(fixture_id).await? {
            Some(fixture) => fixture,
            None => return Ok(false),
        };
        let clamped = value.clamp(0, 255) as u8;

        let (snapshot, output, callback) = {
            let mut state = self.state.write();
            let session = match state.sessions.get_mut(session_id) {
                Some(session) if session.active => session,
                _ => return Ok(false),
            };

            let absolute_channel = fixture.start_channel + channel_index;
            session
                .overrides
                .insert(override_key(fixture.universe, absolute_channel), clamped);
            self.dmx
                .set_channel_override(fixture.universe, absolute_channel, clamped);
            session.created_at = Utc::now();
            let snapshot = session.clone();

            // Any update pushes the idle deadline out.
            if let Some(old) = state.timers.remove(session_id) {
                old.abort();
            }
            let timer = self.spawn_idle_timer(session_id);
            state.timers.insert(session_id.to_string(), timer);

            let output = self.dmx_output_for(&snapshot);
            (snapshot, output, state.callback.clone())
        };
        self.publish(callback, snapshot, output);
        Ok(true)
    }

    /// Seeds the session's overrides from a scene, so users start tweaking
    /// from the scene's look instead of blackout. Supports the legacy
    /// dense channel payload form.
    pub async fn initialize_with_scene(
        self: &Arc<Self>,
        session_id: &str,
        scene_id: &str,
    ) -> Result<bool> {
        if !self.session_is_active(session_id) {
            return Ok(false);
        }
        let scene = match self.repo.find_scene(scene_id).await? {
            Some(scene) => scene,
            None => return Ok(false),
        };

        // Resolve fixtures and decode payloads before taking the lock.
        let mut loaded = Vec::new();
        for value in &scene.fixture_values {
            let fixture = match self.repo.find_fixture_instance(&value.fixture_id).await? {
                Some(fixture) => fixture,
                None => continue,
            };
            match value.decoded_channels() {
                Ok(channels) => loaded.push((fixture, channels)),
                Err(_) => log::warn!(
                    "scene {} has a malformed channel payload for fixture {}",
                    scene.id,
                    value.fixture_id
                ),
            }
        }

        let (snapshot, output, callback) = {
            let mut state = self.state.write();
            let session = match state.sessions.get_mut(session_id) {
                Some(session) if session.active => session,
                _ => return Ok(false),
            };
            for (fixture, channels) in &loaded {
                for channel_value in channels {
                    let absolute_channel = fixture.start_channel + channel_value.offset;
                    session.overrides.insert(
                        override_key(fixture.universe, absolute_channel),
                        channel_value.value,
                    );
                    self.dmx.set_channel_override(
                        fixture.universe,
                        absolute_channel,
                        channel_value.value,
                    );
                }
            }
            let snapshot = session.clone();
            let output = self.dmx_output_for(&snapshot);
            (snapshot, output, state.callback.clone())
        };
        self.publish(callback, snapshot, output);
        Ok(true)
    }

    /// Ends the session, keeping the committed look in play only insofar
    /// as it was already written through. Today this shares the cancel
    /// path, which also clears the engine overrides; see the project
    /// design notes on whether commit should instead promote them.
    pub fn commit_session(&self, session_id: &str) -> bool {
        self.cancel_session(session_id)
    }

    /// Tears a session down: stops its timer, removes its overrides from
    /// the DMX engine and publishes a final snapshot with an empty output
    /// list. Idempotent: a second call returns false.
    pub fn cancel_session(&self, session_id: &str) -> bool {
        let (session, callback) = {
            let mut state = self.state.write();
            let session = match self.remove_session_locked(&mut state, session_id) {
                Some(session) => session,
                None => return false,
            };
            (session, state.callback.clone())
        };
        log::info!("cancelled preview session {}", session_id);
        self.publish(callback, session, Vec::new());
        true
    }

    /// Removes a session and its timer and clears its engine overrides.
    /// Must be called with the write lock held.
    fn remove_session_locked(
        &self,
        state: &mut ManagerState,
        session_id: &str,
    ) -> Option<PreviewSession> {
        let mut session = state.sessions.remove(session_id)?;
        if let Some(timer) = state.timers.remove(session_id) {
            timer.abort();
        }
        for key in session.overrides.keys() {
            if let Some((universe, channel)) = parse_override_key(key) {
                self.dmx.clear_channel_override(universe, channel);
            }
        }
        session.active = false;
        Some(session)
    }

    pub fn get_session(&self, session_id: &str) -> Option<PreviewSession> {
        self.state.read().sessions.get(session_id).cloned()
    }

    pub fn get_project_session(&self, project_id: &str) -> Option<PreviewSession> {
        self.state
            .read()
            .sessions
            .values()
            .find(|s| s.project_id == project_id && s.active)
            .cloned()
    }

    /// Computes, per universe the session touches, a full 512-slot channel
    /// array: the engine's current output overlaid with the session's
    /// overrides.
    pub fn get_dmx_output(&self, session_id: &str) -> Option<Vec<UniverseSnapshot>> {
        let state = self.state.read();
        state
            .sessions
            .get(session_id)
            .map(|session| self.dmx_output_for(session))
    }

    /// Installs the single subscription sink.
    pub fn set_session_update_callback(&self, callback: SessionUpdateCallback) {
        self.state.write().callback = Some(callback);
    }

    fn session_is_active(&self, session_id: &str) -> bool {
        let state = self.state.read();
        state
            .sessions
            .get(session_id)
            .map(|s| s.active)
            .unwrap_or(false)
    }

    fn spawn_idle_timer(self: &Arc<Self>, session_id: &str) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        let session_id = session_id.to_string();
        let timeout = self.timeout;
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            log::info!("preview session {} hit idle timeout", session_id);
            manager.cancel_session(&session_id);
        })
    }

    fn dmx_output_for(&self, session: &PreviewSession) -> Vec<UniverseSnapshot> {
        let mut universes: Vec<u16> = session
            .overrides
            .keys()
            .filter_map(|key| parse_override_key(key))
            .map(|(universe, _)| universe)
            .collect();
        universes.sort_unstable();
        universes.dedup();

        universes
            .into_iter()
            .map(|universe| {
                let mut channels = self.dmx.universe_output(universe).to_vec();
                for (key, value) in &session.overrides {
                    if let Some((key_universe, channel)) = parse_override_key(key) {
                        if key_universe == universe && (1..=UNIVERSE_SIZE as u16).contains(&channel)
                        {
                            channels[(channel - 1) as usize] = *value;
                        }
                    }
                }
                UniverseSnapshot { universe, channels }
            })
            .collect()
    }

    fn publish(
        &self,
        callback: Option<SessionUpdateCallback>,
        session: PreviewSession,
        output: Vec<UniverseSnapshot>,
    ) {
        if let Some(callback) = callback {
            // Fire-and-forget; the snapshot was computed under the lock so
            // the callback never observes a half-applied update.
            tokio::spawn(async move {
                callback(session, output);
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dmx::OverrideEngine;
    use crate::repository::MemoryRepository;
    use crate::scene::scene::{FixtureValue, Scene};
    use lumen_fixtures::{FixtureInstance, FixtureKind};

    struct TestRig {
        manager: Arc<PreviewSessionManager>,
        repo: Arc<MemoryRepository>,
        engine: Arc<OverrideEngine>,
        project_id: String,
        fixture_id: String,
    }

    async fn setup(universe: u16, start_channel: u16) -> TestRig {
        let repo = Arc::new(MemoryRepository::new());
        let engine = Arc::new(OverrideEngine::new());
        let project = repo.create_project("P", None).await.unwrap();
        let fixture = repo
            .create_fixture_instance(FixtureInstance {
                id: String::new(),
                name: "Par 1".to_string(),
                description: None,
                definition_id: "def".to_string(),
                project_id: project.id.clone(),
                manufacturer: "ACME".to_string(),
                model: "Par64".to_string(),
                kind: FixtureKind::Par,
                universe,
                start_channel,
                tags: None,
                mode_name: None,
                channel_count: Some(3),
                x: None,
                y: None,
                rotation: None,
                project_order: None,
                channels: Vec::new(),
            })
            .await
            .unwrap();
        let manager = Arc::new(PreviewSessionManager::new(repo.clone(), engine.clone()));
        TestRig {
            manager,
            repo,
            engine,
            project_id: project.id,
            fixture_id: fixture.id,
        }
    }

    #[tokio::test]
    async fn test_update_channel_value_writes_through() {
        let t = setup(1, 10).await;
        let session = t.manager.start_session(&t.project_id, None);

        let updated = t
            .manager
            .update_channel_value(&session.id, &t.fixture_id, 0, 100)
            .await
            .unwrap();
        assert!(updated);

        let session = t.manager.get_session(&session.id).unwrap();
        assert_eq!(session.overrides.get("1:10"), Some(&100));
        assert_eq!(t.engine.universe_output(1)[9], 100);
    }

    #[tokio::test]
    async fn test_update_clamps_out_of_range_values() {
        let t = setup(1, 1).await;
        let session = t.manager.start_session(&t.project_id, None);

        t.manager
            .update_channel_value(&session.id, &t.fixture_id, 0, -50)
            .await
            .unwrap();
        t.manager
            .update_channel_value(&session.id, &t.fixture_id, 1, 500)
            .await
            .unwrap();

        let session = t.manager.get_session(&session.id).unwrap();
        assert_eq!(session.overrides.get("1:1"), Some(&0));
        assert_eq!(session.overrides.get("1:2"), Some(&255));
    }

    #[tokio::test]
    async fn test_last_writer_wins_per_key() {
        let t = setup(2, 5).await;
        let session = t.manager.start_session(&t.project_id, None);

        for value in [10, 20, 30] {
            t.manager
                .update_channel_value(&session.id, &t.fixture_id, 3, value)
                .await
                .unwrap();
        }
        let session = t.manager.get_session(&session.id).unwrap();
        assert_eq!(session.overrides.len(), 1);
        assert_eq!(session.overrides.get("2:8"), Some(&30));
    }

    #[tokio::test]
    async fn test_update_missing_session_or_fixture_returns_false() {
        let t = setup(1, 1).await;
        assert!(!t
            .manager
            .update_channel_value("nope", &t.fixture_id, 0, 1)
            .await
            .unwrap());

        let session = t.manager.start_session(&t.project_id, None);
        assert!(!t
            .manager
            .update_channel_value(&session.id, "nope", 0, 1)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_start_session_supersedes_previous() {
        let t = setup(1, 1).await;
        let first = t.manager.start_session(&t.project_id, None);
        t.manager
            .update_channel_value(&first.id, &t.fixture_id, 0, 100)
            .await
            .unwrap();
        assert_eq!(t.engine.override_count(), 1);

        let second = t.manager.start_session(&t.project_id, Some("op".to_string()));

        assert!(t.manager.get_session(&first.id).is_none());
        assert_eq!(t.engine.override_count(), 0);

        let active = t.manager.get_project_session(&t.project_id).unwrap();
        assert_eq!(active.id, second.id);
        assert!(active.overrides.is_empty());
        assert_eq!(active.user_id.as_deref(), Some("op"));
    }

    #[tokio::test]
    async fn test_cancel_session_is_idempotent() {
        let t = setup(1, 1).await;
        let session = t.manager.start_session(&t.project_id, None);
        t.manager
            .update_channel_value(&session.id, &t.fixture_id, 0, 42)
            .await
            .unwrap();

        assert!(t.manager.cancel_session(&session.id));
        assert!(!t.manager.cancel_session(&session.id));
        assert_eq!(t.engine.override_count(), 0);
    }

    #[tokio::test]
    async fn test_commit_session_tears_down_state() {
        let t = setup(1, 1).await;
        let session = t.manager.start_session(&t.project_id, None);
        t.manager
            .update_channel_value(&session.id, &t.fixture_id, 0, 42)
            .await
            .unwrap();

        assert!(t.manager.commit_session(&session.id));
        assert!(t.manager.get_session(&session.id).is_none());
        assert_eq!(t.engine.override_count(), 0);
    }

    #[tokio::test]
    async fn test_initialize_with_scene_seeds_overrides() {
        let t = setup(1, 10).await;
        let scene = t
            .repo
            .create_scene(Scene {
                id: String::new(),
                project_id: t.project_id.clone(),
                name: "Look".to_string(),
                description: None,
                fixture_values: vec![FixtureValue {
                    fixture_id: t.fixture_id.clone(),
                    scene_order: None,
                    // Legacy dense payload.
                    channels: "[200,200,200]".to_string(),
                }],
            })
            .await
            .unwrap();

        let session = t.manager.start_session(&t.project_id, None);
        let initialized = t
            .manager
            .initialize_with_scene(&session.id, &scene.id)
            .await
            .unwrap();
        assert!(initialized);

        let session = t.manager.get_session(&session.id).unwrap();
        assert_eq!(session.overrides.len(), 3);
        for key in ["1:10", "1:11", "1:12"] {
            assert_eq!(session.overrides.get(key), Some(&200));
        }
        assert_eq!(t.engine.override_count(), 3);
        assert_eq!(t.engine.universe_output(1)[9], 200);
    }

    #[tokio::test]
    async fn test_initialize_with_missing_scene_returns_false() {
        let t = setup(1, 1).await;
        let session = t.manager.start_session(&t.project_id, None);
        assert!(!t
            .manager
            .initialize_with_scene(&session.id, "nope")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_get_dmx_output_overlays_engine_state() {
        let t = setup(1, 10).await;
        t.engine.set_base_level(1, 1, 33);

        let session = t.manager.start_session(&t.project_id, None);
        t.manager
            .update_channel_value(&session.id, &t.fixture_id, 0, 100)
            .await
            .unwrap();

        let output = t.manager.get_dmx_output(&session.id).unwrap();
        assert_eq!(output.len(), 1);
        assert_eq!(output[0].universe, 1);
        assert_eq!(output[0].channels.len(), 512);
        assert_eq!(output[0].channels[0], 33);
        assert_eq!(output[0].channels[9], 100);
    }

    #[tokio::test]
    async fn test_idle_timeout_cancels_session() {
        let repo = Arc::new(MemoryRepository::new());
        let engine = Arc::new(OverrideEngine::new());
        let manager = Arc::new(
            PreviewSessionManager::new(repo, engine).with_timeout(Duration::from_millis(50)),
        );

        let session = manager.start_session("p1", None);
        assert!(manager.get_session(&session.id).is_some());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(manager.get_session(&session.id).is_none());
    }

    #[tokio::test]
    async fn test_update_resets_idle_timer() {
        let t = setup(1, 1).await;
        let manager = Arc::new(
            PreviewSessionManager::new(t.repo.clone(), t.engine.clone())
                .with_timeout(Duration::from_millis(500)),
        );

        let session = manager.start_session(&t.project_id, None);
        for _ in 0..3 {
            tokio::time::sleep(Duration::from_millis(200)).await;
            manager
                .update_channel_value(&session.id, &t.fixture_id, 0, 1)
                .await
                .unwrap();
        }
        // 600ms of wall time has passed, but never a 500ms idle gap.
        assert!(manager.get_session(&session.id).is_some());

        tokio::time::sleep(Duration::from_millis(900)).await;
        assert!(manager.get_session(&session.id).is_none());
    }

    #[tokio::test]
    async fn test_callback_receives_snapshots() {
        let t = setup(1, 1).await;
        let received: Arc<parking_lot::Mutex<Vec<(String, usize)>>> =
            Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = received.clone();
        t.manager
            .set_session_update_callback(Arc::new(move |session, output| {
                sink.lock().push((session.id.clone(), output.len()));
            }));

        let session = t.manager.start_session(&t.project_id, None);
        t.manager
            .update_channel_value(&session.id, &t.fixture_id, 0, 77)
            .await
            .unwrap();
        t.manager.cancel_session(&session.id);

        tokio::time::sleep(Duration::from_millis(50)).await;
        let received = received.lock();
        assert!(received.len() >= 3);
        assert!(received.iter().all(|(id, _)| id == &session.id));
        // The cancel publication carries an empty output list.
        assert!(received.iter().any(|(_, universes)| *universes == 0));
    }
}
