//! Raw command request and response representations.

use serde::{Deserialize, Deserializer, Serialize, de};

use crate::error::Error;

/// Network functions are six bits on the wire.
pub const MAX_NETFN: u8 = 0x3f;

/// A raw BMC command: network function, command code and data bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRequest {
    #[serde(deserialize_with = "netfn")]
    pub netfn: u8,
    pub command: u8,
    #[serde(default)]
    pub data: Vec<u8>,
}

impl RawRequest {
    /// Parse the JSON form `{"netfn": 6, "command": 1, "data": [0, 1]}`.
    ///
    /// Anything that is not such an object, including out-of-range values,
    /// is a malformed command.
    pub fn parse(payload: &str) -> Result<Self, Error> {
        serde_json::from_str(payload).map_err(|source| Error::MalformedCommand { source })
    }
}

fn netfn<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let value = u8::deserialize(deserializer)?;
    if value > MAX_NETFN {
        return Err(de::Error::custom(format!(
            "netfn {value} does not fit in six bits"
        )));
    }
    Ok(value)
}

/// What the BMC answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawResponse {
    /// Response network function (request netfn + 1).
    pub netfn: u8,
    pub command: u8,
    /// Completion code; zero is success.
    pub code: u8,
    pub data: Vec<u8>,
}

impl RawResponse {
    /// JSON text returned to the caller.
    pub fn render(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| format!("{self:?} ({e})"))
    }
}
