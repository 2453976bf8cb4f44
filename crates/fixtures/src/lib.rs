use serde::{Deserialize, Serialize};

pub use library::builtin_definitions;

mod library;

/// Manufacturer-provided specification of a fixture's controllable channels.
///
/// Definitions shipped with the server carry `is_built_in = true` and are
/// shared across all projects. Definitions created by an import are always
/// project-agnostic but not built-in.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FixtureDefinition {
    pub id: String,
    pub manufacturer: String,
    pub model: String,
    pub kind: FixtureKind,
    pub is_built_in: bool,
    pub channels: Vec<ChannelDefinition>,
    pub modes: Vec<FixtureMode>,
}

impl FixtureDefinition {
    pub fn channel_by_id(&self, channel_id: &str) -> Option<&ChannelDefinition> {
        self.channels.iter().find(|c| c.id == channel_id)
    }

    pub fn channel_by_name(&self, name: &str) -> Option<&ChannelDefinition> {
        self.channels.iter().find(|c| c.name == name)
    }

    pub fn mode_by_name(&self, name: &str) -> Option<&FixtureMode> {
        self.modes.iter().find(|m| m.name == name)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum FixtureKind {
    MovingHead,
    Par,
    LedBar,
    Wash,
    Pinspot,
    Smoke,
    Other(String),
}

impl std::fmt::Display for FixtureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            FixtureKind::MovingHead => write!(f, "MOVING_HEAD"),
            FixtureKind::Par => write!(f, "PAR"),
            FixtureKind::LedBar => write!(f, "LED_BAR"),
            FixtureKind::Wash => write!(f, "WASH"),
            FixtureKind::Pinspot => write!(f, "PINSPOT"),
            FixtureKind::Smoke => write!(f, "SMOKE"),
            FixtureKind::Other(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for FixtureKind {
    fn from(s: &str) -> Self {
        match s {
            "MOVING_HEAD" => FixtureKind::MovingHead,
            "PAR" => FixtureKind::Par,
            "LED_BAR" => FixtureKind::LedBar,
            "WASH" => FixtureKind::Wash,
            "PINSPOT" => FixtureKind::Pinspot,
            "SMOKE" => FixtureKind::Smoke,
            other => FixtureKind::Other(other.to_string()),
        }
    }
}

/// A single controllable channel within a fixture definition.
///
/// `offset` is the channel's position within the definition's footprint.
/// Bounds are always within 0..=255 with `min <= default <= max`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChannelDefinition {
    pub id: String,
    pub name: String,
    pub kind: ChannelKind,
    pub offset: u16,
    pub min_value: u8,
    pub default_value: u8,
    pub max_value: u8,
    pub fade_behavior: FadeBehavior,
    pub is_discrete: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ChannelKind {
    Intensity,
    Red,
    Green,
    Blue,
    White,
    Amber,
    Uv,
    Color,
    Gobo,
    Strobe,
    Pan,
    Tilt,
    Other(String),
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ChannelKind::Intensity => write!(f, "INTENSITY"),
            ChannelKind::Red => write!(f, "RED"),
            ChannelKind::Green => write!(f, "GREEN"),
            ChannelKind::Blue => write!(f, "BLUE"),
            ChannelKind::White => write!(f, "WHITE"),
            ChannelKind::Amber => write!(f, "AMBER"),
            ChannelKind::Uv => write!(f, "UV"),
            ChannelKind::Color => write!(f, "COLOR"),
            ChannelKind::Gobo => write!(f, "GOBO"),
            ChannelKind::Strobe => write!(f, "STROBE"),
            ChannelKind::Pan => write!(f, "PAN"),
            ChannelKind::Tilt => write!(f, "TILT"),
            ChannelKind::Other(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for ChannelKind {
    fn from(s: &str) -> Self {
        match s {
            "INTENSITY" => ChannelKind::Intensity,
            "RED" => ChannelKind::Red,
            "GREEN" => ChannelKind::Green,
            "BLUE" => ChannelKind::Blue,
            "WHITE" => ChannelKind::White,
            "AMBER" => ChannelKind::Amber,
            "UV" => ChannelKind::Uv,
            "COLOR" => ChannelKind::Color,
            "GOBO" => ChannelKind::Gobo,
            "STROBE" => ChannelKind::Strobe,
            "PAN" => ChannelKind::Pan,
            "TILT" => ChannelKind::Tilt,
            other => ChannelKind::Other(other.to_string()),
        }
    }
}

/// How a channel transitions between values during a fade.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum FadeBehavior {
    #[default]
    Fade,
    Snap,
}

impl std::fmt::Display for FadeBehavior {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            FadeBehavior::Fade => write!(f, "FADE"),
            FadeBehavior::Snap => write!(f, "SNAP"),
        }
    }
}

impl From<&str> for FadeBehavior {
    fn from(s: &str) -> Self {
        match s {
            "SNAP" => FadeBehavior::Snap,
            _ => FadeBehavior::Fade,
        }
    }
}

/// A named subset/ordering of a definition's channels.
///
/// Mode names are unique within their definition. Each binding places one
/// of the definition's channels at an offset within the mode's footprint;
/// bindings reference distinct channels at distinct offsets.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FixtureMode {
    pub id: String,
    pub name: String,
    pub short_name: String,
    pub channel_count: u16,
    pub channels: Vec<ModeChannel>,
}

/// Binds one of the owning definition's channels to an offset within a mode.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModeChannel {
    pub channel_id: String,
    pub offset: u16,
}

/// A specific placement of a fixture in a project at a universe + start
/// channel. Carries a denormalized channel snapshot taken from the
/// definition (or selected mode) at creation time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FixtureInstance {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub definition_id: String,
    pub project_id: String,
    // Denormalized from the definition so instance listings don't need a join.
    pub manufacturer: String,
    pub model: String,
    pub kind: FixtureKind,
    pub universe: u16,
    pub start_channel: u16,
    /// JSON-encoded string array, `None` when the instance has no tags.
    pub tags: Option<String>,
    pub mode_name: Option<String>,
    pub channel_count: Option<u16>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub rotation: Option<f64>,
    pub project_order: Option<u32>,
    pub channels: Vec<InstanceChannel>,
}

impl FixtureInstance {
    /// Decodes the stored tag payload into a string list. A missing or
    /// malformed payload decodes to an empty list.
    pub fn decoded_tags(&self) -> Vec<String> {
        self.tags
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default()
    }

    /// Encodes a tag list into the stored JSON form. Empty lists clear the
    /// payload entirely.
    pub fn encode_tags(tags: &[String]) -> Option<String> {
        if tags.is_empty() {
            None
        } else {
            serde_json::to_string(tags).ok()
        }
    }
}

/// Per-instance channel snapshot, denormalized from the definition (and
/// mode, when one is selected) at instance creation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InstanceChannel {
    pub name: String,
    pub kind: ChannelKind,
    pub offset: u16,
    pub min_value: u8,
    pub default_value: u8,
    pub max_value: u8,
    pub fade_behavior: FadeBehavior,
    pub is_discrete: bool,
}

impl From<&ChannelDefinition> for InstanceChannel {
    fn from(channel: &ChannelDefinition) -> Self {
        InstanceChannel {
            name: channel.name.clone(),
            kind: channel.kind.clone(),
            offset: channel.offset,
            min_value: channel.min_value,
            default_value: channel.default_value,
            max_value: channel.max_value,
            fade_behavior: channel.fade_behavior,
            is_discrete: channel.is_discrete,
        }
    }
}

#[macro_export]
macro_rules! channel_defs {
    ($(($name:expr, $kind:expr)),* $(,)?) => {{
        let mut defs: Vec<$crate::ChannelDefinition> = Vec::new();
        $(
            let offset = defs.len() as u16;
            defs.push($crate::ChannelDefinition {
                id: format!("ch-{}", $name.to_lowercase().replace(' ', "-")),
                name: $name.to_string(),
                kind: $kind,
                offset,
                min_value: 0,
                default_value: 0,
                max_value: 255,
                fade_behavior: $crate::FadeBehavior::Fade,
                is_discrete: false,
            });
        )*
        defs
    }};
}
