//! JSON-RPC envelopes exchanged with clients and with the upstream node.

use serde::Deserialize;
use serde::Deserializer;
use serde_json::json;

use crate::alias::JsonValue;
use crate::eth::primitives::ErrorCode;
use crate::eth::primitives::GatewayError;
use crate::eth::primitives::RpcError;
use crate::ext::not;

pub const JSONRPC_VERSION: &str = "2.0";

fn default_jsonrpc() -> String {
    JSONRPC_VERSION.to_owned()
}

/// Distinguishes a present `null` from an absent field.
fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<JsonValue>, D::Error>
where
    D: Deserializer<'de>,
{
    JsonValue::deserialize(deserializer).map(Some)
}

// -----------------------------------------------------------------------------
// Call
// -----------------------------------------------------------------------------

/// A single JSON-RPC call. Params are kept raw and only decoded for intercepted methods.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RpcCall {
    #[serde(default = "default_jsonrpc")]
    pub jsonrpc: String,

    #[serde(default)]
    pub id: JsonValue,

    pub method: String,

    #[serde(default, skip_serializing_if = "JsonValue::is_null")]
    pub params: JsonValue,
}

impl RpcCall {
    pub fn new(id: impl Into<JsonValue>, method: &str, params: JsonValue) -> Self {
        Self {
            jsonrpc: default_jsonrpc(),
            id: id.into(),
            method: method.to_owned(),
            params,
        }
    }
}

// -----------------------------------------------------------------------------
// Response
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RpcResponse {
    #[serde(default = "default_jsonrpc")]
    pub jsonrpc: String,

    #[serde(default)]
    pub id: JsonValue,

    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "deserialize_present")]
    pub result: Option<JsonValue>,

    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "deserialize_present")]
    pub error: Option<JsonValue>,
}

impl RpcResponse {
    pub fn success(id: JsonValue, result: JsonValue) -> Self {
        Self {
            jsonrpc: default_jsonrpc(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Converts a gateway failure into a JSON-RPC error object correlated to the originating call.
    pub fn failure(id: JsonValue, error: &GatewayError) -> Self {
        Self {
            jsonrpc: default_jsonrpc(),
            id,
            result: None,
            error: Some(json!({
                "code": error.error_code(),
                "message": error.to_string(),
            })),
        }
    }

    /// Checks if the upstream rejected the call. Rejected responses are never examined.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Checks if the envelope carries neither a result nor an error.
    pub fn is_empty(&self) -> bool {
        self.result.is_none() && self.error.is_none()
    }
}

// -----------------------------------------------------------------------------
// Payload
// -----------------------------------------------------------------------------

/// Inbound payload: one call or an ordered batch of calls.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcPayload {
    Single(RpcCall),
    Batch(Vec<RpcCall>),
}

impl RpcPayload {
    /// Parses an HTTP body choosing the variant by the JSON structure of the payload.
    pub fn parse(body: &[u8]) -> Result<Self, RpcError> {
        let value: JsonValue = serde_json::from_slice(body).map_err(|e| RpcError::PayloadInvalid { decode_error: e.to_string() })?;
        match value {
            JsonValue::Object(_) => Ok(Self::Single(parse_call(value)?)),
            JsonValue::Array(values) if values.is_empty() => Err(RpcError::BatchEmpty),
            JsonValue::Array(values) => {
                let calls = values.into_iter().map(parse_call).collect::<Result<Vec<_>, _>>()?;
                Ok(Self::Batch(calls))
            }
            _ => Err(RpcError::PayloadShapeInvalid),
        }
    }

    pub fn is_batch(&self) -> bool {
        matches!(self, Self::Batch(_))
    }
}

fn parse_call(value: JsonValue) -> Result<RpcCall, RpcError> {
    if not(value.is_object()) {
        return Err(RpcError::PayloadShapeInvalid);
    }
    serde_json::from_value(value).map_err(|e| RpcError::CallInvalid { decode_error: e.to_string() })
}

/// Outbound reply mirroring the shape of the inbound payload.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum RpcReply {
    Single(RpcResponse),
    Batch(Vec<RpcResponse>),
}
