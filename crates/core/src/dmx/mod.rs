//! Interface to the live DMX output engine.
//!
//! The engine itself (frame generation, Art-Net transport) lives outside
//! the core; the preview session manager only needs to install and clear
//! channel overrides and read back current universe output. Overrides take
//! precedence over scene playback inside the engine.

use std::collections::HashMap;

use parking_lot::Mutex;

/// Channels per DMX universe. Channel numbers are 1-based, 1..=512.
pub const UNIVERSE_SIZE: usize = 512;

/// Contract the preview session manager writes through. Implementations
/// carry their own synchronization; all methods take `&self`.
pub trait DmxEngine: Send + Sync {
    /// Installs an override for a (universe, 1-based channel) slot.
    fn set_channel_override(&self, universe: u16, channel: u16, value: u8);

    /// Removes the override for a (universe, 1-based channel) slot.
    fn clear_channel_override(&self, universe: u16, channel: u16);

    /// Current output of a universe with overrides applied.
    fn universe_output(&self, universe: u16) -> [u8; UNIVERSE_SIZE];
}

#[derive(Default)]
struct EngineState {
    base: HashMap<u16, [u8; UNIVERSE_SIZE]>,
    overrides: HashMap<(u16, u16), u8>,
}

/// In-memory engine: per-universe output arrays plus an override registry.
/// Stands in for the Art-Net backed engine in tests and the CLI.
#[derive(Default)]
pub struct OverrideEngine {
    state: Mutex<EngineState>,
}

impl OverrideEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a base (playback) level, as scene playback would.
    pub fn set_base_level(&self, universe: u16, channel: u16, value: u8) {
        if !(1..=UNIVERSE_SIZE as u16).contains(&channel) {
            return;
        }
        let mut state = self.state.lock();
        let frame = state.base.entry(universe).or_insert([0; UNIVERSE_SIZE]);
        frame[(channel - 1) as usize] = value;
    }

    /// Number of overrides currently installed across all universes.
    pub fn override_count(&self) -> usize {
        self.state.lock().overrides.len()
    }
}

impl DmxEngine for OverrideEngine {
    fn set_channel_override(&self, universe: u16, channel: u16, value: u8) {
        if !(1..=UNIVERSE_SIZE as u16).contains(&channel) {
            return;
        }
        self.state.lock().overrides.insert((universe, channel), value);
    }

    fn clear_channel_override(&self, universe: u16, channel: u16) {
        self.state.lock().overrides.remove(&(universe, channel));
    }

    fn universe_output(&self, universe: u16) -> [u8; UNIVERSE_SIZE] {
        let state = self.state.lock();
        let mut frame = state
            .base
            .get(&universe)
            .copied()
            .unwrap_or([0; UNIVERSE_SIZE]);
        for ((u, channel), value) in &state.overrides {
            if *u == universe {
                frame[(*channel - 1) as usize] = *value;
            }
        }
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_takes_precedence_over_base() {
        let engine = OverrideEngine::new();
        engine.set_base_level(1, 10, 40);
        engine.set_channel_override(1, 10, 200);

        let frame = engine.universe_output(1);
        assert_eq!(frame[9], 200);

        engine.clear_channel_override(1, 10);
        let frame = engine.universe_output(1);
        assert_eq!(frame[9], 40);
    }

    #[test]
    fn test_unknown_universe_reads_as_zeroes() {
        let engine = OverrideEngine::new();
        assert_eq!(engine.universe_output(7), [0; UNIVERSE_SIZE]);
    }

    #[test]
    fn test_out_of_range_channels_are_ignored() {
        let engine = OverrideEngine::new();
        engine.set_channel_override(1, 0, 255);
        engine.set_channel_override(1, 513, 255);
        assert_eq!(engine.override_count(), 0);
    }
}
