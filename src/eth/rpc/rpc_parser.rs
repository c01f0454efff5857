//! Helper functions for parsing parameters of intercepted RPC calls.

use std::slice::Iter;

use serde::de::DeserializeOwned;

use crate::alias::JsonValue;
use crate::eth::primitives::RpcError;
use crate::ext::type_basename;

/// Sequence of positional JSON-RPC parameters.
pub type RpcParams<'a> = Iter<'a, JsonValue>;

/// Starts reading the positional parameters of a call. Absent params are an empty sequence.
pub fn rpc_params(params: &JsonValue) -> Result<RpcParams<'_>, RpcError> {
    const EMPTY: &[JsonValue] = &[];
    match params {
        JsonValue::Array(values) => Ok(values.iter()),
        JsonValue::Null => Ok(EMPTY.iter()),
        _ => Err(RpcError::ParamsShapeInvalid),
    }
}

/// Extracts the next RPC parameter. Fails if parameter not present.
pub fn next_rpc_param<'a, T>(mut params: RpcParams<'a>) -> Result<(RpcParams<'a>, T), RpcError>
where
    T: DeserializeOwned,
{
    let value = match params.next() {
        Some(JsonValue::Null) | None =>
            return Err(RpcError::ParameterMissing {
                rust_type: type_basename::<T>(),
            }),
        Some(value) => value,
    };

    match T::deserialize(value) {
        Ok(value) => Ok((params, value)),
        Err(e) => Err(RpcError::ParameterInvalid {
            rust_type: type_basename::<T>(),
            decode_error: e.to_string(),
        }),
    }
}

/// Extract the next RPC parameter. Assumes default value if not present.
pub fn next_rpc_param_or_default<'a, T>(params: RpcParams<'a>) -> Result<(RpcParams<'a>, T), RpcError>
where
    T: DeserializeOwned + Default,
{
    match next_rpc_param(params.clone()) {
        Ok((params, value)) => Ok((params, value)),
        Err(RpcError::ParameterMissing { .. }) => Ok((params, T::default())),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::eth::primitives::Address;
    use crate::eth::primitives::BlockSelection;

    #[test]
    fn parses_positional_params_in_order() {
        let params = json!(["0x9d8a62f656a8d1615c1294fd71e9cfb3e4855a4f", "pending"]);
        let (params, address) = next_rpc_param::<Address>(rpc_params(&params).unwrap()).unwrap();
        let (_, block) = next_rpc_param_or_default::<BlockSelection>(params).unwrap();
        assert_eq!(address.to_string(), "0x9d8a62f656a8d1615c1294fd71e9cfb3e4855a4f");
        assert_eq!(block, BlockSelection::Pending);
    }

    #[test]
    fn missing_or_null_param_uses_default() {
        for params in [json!(["0x9d8a62f656a8d1615c1294fd71e9cfb3e4855a4f"]), json!(["0x9d8a62f656a8d1615c1294fd71e9cfb3e4855a4f", null])] {
            let (params, _) = next_rpc_param::<Address>(rpc_params(&params).unwrap()).unwrap();
            let (_, block) = next_rpc_param_or_default::<BlockSelection>(params).unwrap();
            assert_eq!(block, BlockSelection::Latest);
        }
    }

    #[test]
    fn reports_missing_and_invalid_params() {
        let params = json!([]);
        assert!(matches!(
            next_rpc_param::<Address>(rpc_params(&params).unwrap()),
            Err(RpcError::ParameterMissing { rust_type: "Address" })
        ));

        let params = json!(["0x12"]);
        assert!(matches!(
            next_rpc_param::<Address>(rpc_params(&params).unwrap()),
            Err(RpcError::ParameterInvalid { .. })
        ));

        assert!(matches!(rpc_params(&json!({"a": 1})), Err(RpcError::ParamsShapeInvalid)));
        assert_eq!(rpc_params(&JsonValue::Null).unwrap().count(), 0);
    }
}
