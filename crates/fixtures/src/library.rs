use crate::{
    channel_defs, ChannelDefinition, ChannelKind, FixtureDefinition, FixtureKind, FixtureMode,
    ModeChannel,
};

/// Definitions shipped with the server. Note in the future we'll load these
/// from disk; for now the set matches the hardware the project was built
/// around.
pub fn builtin_definitions() -> Vec<FixtureDefinition> {
    vec![
        rgbw_par(),
        led_spot_60w(),
        led_wash_7x18(),
        mini_pinspot(),
        geyser_smoke(),
    ]
}

fn rgbw_par() -> FixtureDefinition {
    let channels = channel_defs![
        ("Dimmer", ChannelKind::Intensity),
        ("Red", ChannelKind::Red),
        ("Green", ChannelKind::Green),
        ("Blue", ChannelKind::Blue),
        ("White", ChannelKind::White),
        ("Strobe", ChannelKind::Strobe),
        ("Program", ChannelKind::Other("Program".to_string())),
        ("Function", ChannelKind::Other("Function".to_string())),
    ];
    let modes = vec![
        mode(
            "m-8ch",
            "8-Channel",
            "8CH",
            &channels,
            &[
                "Dimmer", "Red", "Green", "Blue", "White", "Strobe", "Program", "Function",
            ],
        ),
        // Compact mode drops the program/function channels.
        mode(
            "m-4ch",
            "4-Channel",
            "4CH",
            &channels,
            &["Red", "Green", "Blue", "White"],
        ),
    ];
    FixtureDefinition {
        id: String::new(),
        manufacturer: "Shehds".to_string(),
        model: "LED Flat PAR 12x3W RGBW".to_string(),
        kind: FixtureKind::Par,
        is_built_in: true,
        channels,
        modes,
    }
}

fn led_spot_60w() -> FixtureDefinition {
    let channels = channel_defs![
        ("Pan", ChannelKind::Pan),
        ("Tilt", ChannelKind::Tilt),
        ("Color", ChannelKind::Color),
        ("Gobo", ChannelKind::Gobo),
        ("Strobe", ChannelKind::Strobe),
        ("Dimmer", ChannelKind::Intensity),
        ("Speed", ChannelKind::Other("Speed".to_string())),
        ("Auto", ChannelKind::Other("Auto".to_string())),
        ("Reset", ChannelKind::Other("Reset".to_string())),
    ];
    let modes = vec![mode(
        "m-9ch",
        "9-Channel",
        "9CH",
        &channels,
        &[
            "Pan", "Tilt", "Color", "Gobo", "Strobe", "Dimmer", "Speed", "Auto", "Reset",
        ],
    )];
    FixtureDefinition {
        id: String::new(),
        manufacturer: "Shehds".to_string(),
        model: "LED Spot 60W Lighting".to_string(),
        kind: FixtureKind::MovingHead,
        is_built_in: true,
        channels,
        modes,
    }
}

fn led_wash_7x18() -> FixtureDefinition {
    let channels = channel_defs![
        ("Pan", ChannelKind::Pan),
        ("Tilt", ChannelKind::Tilt),
        ("Dimmer", ChannelKind::Intensity),
        ("Red", ChannelKind::Red),
        ("Green", ChannelKind::Green),
        ("Blue", ChannelKind::Blue),
        ("White", ChannelKind::White),
        ("Amber", ChannelKind::Amber),
        ("UV", ChannelKind::Uv),
        ("Function", ChannelKind::Other("Function".to_string())),
    ];
    let modes = vec![mode(
        "m-10ch",
        "10-Channel",
        "10CH",
        &channels,
        &[
            "Pan", "Tilt", "Dimmer", "Red", "Green", "Blue", "White", "Amber", "UV", "Function",
        ],
    )];
    FixtureDefinition {
        id: String::new(),
        manufacturer: "Shehds".to_string(),
        model: "LED Wash 7x18W RGBWA+UV".to_string(),
        kind: FixtureKind::Wash,
        is_built_in: true,
        channels,
        modes,
    }
}

fn mini_pinspot() -> FixtureDefinition {
    let channels = channel_defs![
        ("Dimmer", ChannelKind::Intensity),
        ("Red", ChannelKind::Red),
        ("Green", ChannelKind::Green),
        ("Blue", ChannelKind::Blue),
        ("White", ChannelKind::White),
        ("Strobe", ChannelKind::Strobe),
        // 0-50: no effect, 51-100: color selection, 101-150: jump,
        // 151-200: gradient, 201-250: automatic, 251-255: voice control
        ("Function", ChannelKind::Other("Function".to_string())),
        ("Speed", ChannelKind::Other("FunctionSpeed".to_string())),
    ];
    let modes = vec![mode(
        "m-8ch",
        "8-Channel",
        "8CH",
        &channels,
        &[
            "Dimmer", "Red", "Green", "Blue", "White", "Strobe", "Function", "Speed",
        ],
    )];
    FixtureDefinition {
        id: String::new(),
        manufacturer: "Shehds".to_string(),
        model: "Mini LED Pinspot 10W".to_string(),
        kind: FixtureKind::Pinspot,
        is_built_in: true,
        channels,
        modes,
    }
}

fn geyser_smoke() -> FixtureDefinition {
    let channels = channel_defs![
        ("Smoke", ChannelKind::Other("Smoke".to_string())),
        ("Red", ChannelKind::Red),
        ("Green", ChannelKind::Green),
        ("Blue", ChannelKind::Blue),
        ("Strobe", ChannelKind::Strobe),
        ("Effect", ChannelKind::Other("Function".to_string())),
        ("Speed", ChannelKind::Other("FunctionSpeed".to_string())),
    ];
    let modes = vec![mode(
        "m-7ch",
        "7-Channel",
        "7CH",
        &channels,
        &["Smoke", "Red", "Green", "Blue", "Strobe", "Effect", "Speed"],
    )];
    FixtureDefinition {
        id: String::new(),
        manufacturer: "DL Geyser".to_string(),
        model: "DL Geyser 1000 LED Smoke Machine".to_string(),
        kind: FixtureKind::Smoke,
        is_built_in: true,
        channels,
        modes,
    }
}

fn mode(
    id: &str,
    name: &str,
    short_name: &str,
    channels: &[ChannelDefinition],
    channel_names: &[&str],
) -> FixtureMode {
    let bindings: Vec<ModeChannel> = channel_names
        .iter()
        .enumerate()
        .filter_map(|(offset, channel_name)| {
            channels
                .iter()
                .find(|c| c.name == *channel_name)
                .map(|c| ModeChannel {
                    channel_id: c.id.clone(),
                    offset: offset as u16,
                })
        })
        .collect();
    FixtureMode {
        id: id.to_string(),
        name: name.to_string(),
        short_name: short_name.to_string(),
        channel_count: bindings.len() as u16,
        channels: bindings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_definitions_are_built_in() {
        let defs = builtin_definitions();
        assert_eq!(defs.len(), 5);
        assert!(defs.iter().all(|d| d.is_built_in));
    }

    #[test]
    fn test_builtin_mode_bindings_resolve() {
        for def in builtin_definitions() {
            for mode in &def.modes {
                assert_eq!(mode.channels.len() as u16, mode.channel_count);
                for binding in &mode.channels {
                    assert!(
                        def.channel_by_id(&binding.channel_id).is_some(),
                        "{} mode {} references unknown channel {}",
                        def.model,
                        mode.name,
                        binding.channel_id
                    );
                }
            }
        }
    }

    #[test]
    fn test_par_compact_mode_is_rgbw() {
        let defs = builtin_definitions();
        let par = defs
            .iter()
            .find(|d| d.model.contains("PAR"))
            .expect("par definition");
        let compact = par.mode_by_name("4-Channel").expect("compact mode");
        assert_eq!(compact.channel_count, 4);
        assert_eq!(compact.channels[0].offset, 0);
    }
}
