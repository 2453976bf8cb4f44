use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A named snapshot of channel values across fixtures.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub description: Option<String>,
    pub fixture_values: Vec<FixtureValue>,
}

/// Channel values one scene holds for one fixture instance. The channel
/// list is stored as a JSON payload; see [`FixtureValue::decoded_channels`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FixtureValue {
    pub fixture_id: String,
    pub scene_order: Option<u32>,
    /// JSON payload: sparse `[{"offset":0,"value":255},...]` for anything
    /// written by this server, or a legacy dense `[255,128,...]` integer
    /// array where the index is the offset.
    pub channels: String,
}

/// One sparse (offset, value) pair. `offset` is 0-based within the fixture.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChannelValue {
    pub offset: u16,
    pub value: u8,
}

/// The two stored channel payload shapes. Only the sparse form is ever
/// written; the dense form survives as a read-only legacy input.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChannelPayload {
    Sparse(Vec<ChannelValue>),
    Dense(Vec<u8>),
}

impl FixtureValue {
    /// Decodes the stored payload into the sparse form, converting the
    /// legacy dense array (index becomes offset) when present.
    pub fn decoded_channels(&self) -> Result<Vec<ChannelValue>> {
        decode_channel_payload(&self.channels)
    }
}

/// Decodes a stored channel payload, accepting both shapes.
pub fn decode_channel_payload(raw: &str) -> Result<Vec<ChannelValue>> {
    let payload: ChannelPayload = serde_json::from_str(raw)?;
    Ok(match payload {
        ChannelPayload::Sparse(values) => values,
        ChannelPayload::Dense(values) => values
            .into_iter()
            .enumerate()
            .map(|(offset, value)| ChannelValue {
                offset: offset as u16,
                value,
            })
            .collect(),
    })
}

/// Encodes a sparse channel list into the stored JSON form.
pub fn encode_channel_values(values: &[ChannelValue]) -> String {
    serde_json::to_string(values).unwrap_or_else(|_| "[]".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_sparse_payload() {
        let values = decode_channel_payload(r#"[{"offset":2,"value":128}]"#).unwrap();
        assert_eq!(
            values,
            vec![ChannelValue {
                offset: 2,
                value: 128
            }]
        );
    }

    #[test]
    fn test_decode_legacy_dense_payload() {
        let values = decode_channel_payload("[255,128,0,0]").unwrap();
        assert_eq!(values.len(), 4);
        assert_eq!(
            values[0],
            ChannelValue {
                offset: 0,
                value: 255
            }
        );
        assert_eq!(
            values[1],
            ChannelValue {
                offset: 1,
                value: 128
            }
        );
        assert_eq!(values[3], ChannelValue { offset: 3, value: 0 });
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_channel_payload("not json").is_err());
    }

    #[test]
    fn test_encode_emits_sparse_form() {
        let encoded = encode_channel_values(&[ChannelValue {
            offset: 0,
            value: 200,
        }]);
        assert_eq!(encoded, r#"[{"offset":0,"value":200}]"#);
        // Round-trips through the decoder.
        assert_eq!(decode_channel_payload(&encoded).unwrap().len(), 1);
    }
}
