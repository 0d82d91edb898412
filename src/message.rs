//! JSON envelopes exchanged with bulbs.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::serde_as;

use crate::errors::Error;
use crate::mac::MacAddress;
use crate::method::{Method, MethodAsWire};

type Result<T> = std::result::Result<T, Error>;

/// An outbound request.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    #[serde_as(as = "MethodAsWire")]
    pub method: Method,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl Request {
    pub fn new(method: impl Into<Method>) -> Self {
        Request {
            method: method.into(),
            id: None,
            params: None,
        }
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }

    pub fn with_id(mut self, id: u32) -> Self {
        self.id = Some(id);
        self
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(Error::JsonDump)
    }
}

/// Error object a bulb returns instead of a result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceError {
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

/// A reply to a [`Request`].
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    #[serde_as(as = "MethodAsWire")]
    #[serde(default)]
    pub method: Method,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<DeviceError>,
}

impl Response {
    pub fn from_slice(buf: &[u8]) -> Result<Self> {
        let text = String::from_utf8(buf.to_vec()).map_err(Error::Utf8Decode)?;
        serde_json::from_str(&text).map_err(Error::JsonLoad)
    }

    /// The `result` object, or the bulb's error.
    pub fn into_result(self) -> Result<Value> {
        match self.error {
            Some(err) => Err(Error::Device {
                code: err.code,
                message: err.message,
            }),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }

    /// The MAC address a bulb reports in its result, if any.
    pub fn mac(&self) -> Option<MacAddress> {
        self.result
            .as_ref()
            .and_then(|r| r.get("mac"))
            .and_then(|m| m.as_str())
            .and_then(|m| m.parse().ok())
    }
}

/// A message a bulb sends unprompted (push or heartbeat).
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    #[serde_as(as = "MethodAsWire")]
    #[serde(default)]
    pub method: Method,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,
    #[serde(default)]
    pub params: Value,
}

impl InboundMessage {
    pub fn from_slice(buf: &[u8]) -> Result<Self> {
        let text = String::from_utf8(buf.to_vec()).map_err(Error::Utf8Decode)?;
        serde_json::from_str(&text).map_err(Error::JsonLoad)
    }

    pub fn mac(&self) -> Option<MacAddress> {
        self.params
            .get("mac")
            .and_then(|m| m.as_str())
            .and_then(|m| m.parse().ok())
    }
}
