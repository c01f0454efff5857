//! Signed raw transaction decoding.
//!
//! Accepts every envelope the node accepts through `eth_sendRawTransaction`: legacy (pre and post EIP-155) and
//! EIP-2718 typed transactions. The signer is recovered locally from the signature over the signing hash; no node or
//! cache is consulted.

use alloy_consensus::Transaction;
use alloy_consensus::transaction::SignerRecoverable;
use alloy_eips::Typed2718;
use alloy_eips::eip2718::Decodable2718;
use display_json::DebugAsJson;

use crate::alias::AlloyTxEnvelope;
use crate::eth::primitives::Address;
use crate::eth::primitives::ChainId;
use crate::eth::primitives::Hash;
use crate::eth::primitives::Nonce;
use crate::eth::primitives::TransactionDecodeError;

#[derive(DebugAsJson, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TransactionInput {
    /// EIP-2718 type. Legacy transactions are `0`.
    pub tx_type: u8,
    pub hash: Hash,
    pub nonce: Nonce,
    /// Absent for legacy transactions signed without replay protection.
    pub chain_id: Option<ChainId>,
    pub signer: Address,
}

impl TransactionInput {
    /// Decodes a hex encoded raw transaction. The `0x` prefix is optional.
    pub fn decode_hex(raw: &str) -> Result<Self, TransactionDecodeError> {
        let raw = raw.trim();
        let digits = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")).unwrap_or(raw);
        match const_hex::decode(digits) {
            Ok(bytes) => Self::decode(&bytes),
            Err(e) => Err(TransactionDecodeError::Decode { reason: e.to_string() }),
        }
    }

    /// Decodes raw transaction bytes and recovers the signer.
    pub fn decode(bytes: &[u8]) -> Result<Self, TransactionDecodeError> {
        if bytes.is_empty() {
            return Err(TransactionDecodeError::Decode {
                reason: "empty transaction bytes".into(),
            });
        }

        // decode envelope (legacy when first byte is a rlp list, typed otherwise)
        let mut buf = bytes;
        let envelope = match AlloyTxEnvelope::decode_2718(&mut buf) {
            Ok(envelope) => envelope,
            Err(e) => return Err(TransactionDecodeError::Decode { reason: e.to_string() }),
        };
        if !buf.is_empty() {
            return Err(TransactionDecodeError::Decode {
                reason: format!("{} unexpected trailing bytes", buf.len()),
            });
        }

        // recover signer
        let signer = match envelope.recover_signer() {
            Ok(signer) => Address::from(signer),
            Err(e) => {
                tracing::warn!(reason = ?e, "failed to recover transaction signer");
                return Err(TransactionDecodeError::Signature {
                    reason: "signature does not recover to a valid public key".into(),
                });
            }
        };

        Ok(Self {
            tx_type: envelope.ty(),
            hash: Hash::keccak(bytes),
            nonce: Nonce::from(envelope.nonce()),
            chain_id: envelope.chain_id().map(ChainId::from),
            signer,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    // EIP-155 reference transaction: nonce 9, chain 1, signed by private key 0x4646..46.
    const EIP155_TX: &str = "0xf86c098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a76400008025a028ef61340bd939bc2195fe537567866003e1a15d3c71ff63e1590620aa636276a067cbe9d8997f761aecb703304b3800ccf555c9f3dc64214b297fb1966a3b6d83";
    const EIP155_SIGNER: &str = "0x9d8a62f656a8d1615c1294fd71e9cfb3e4855a4f";

    #[test]
    fn decode_eip155_transaction() {
        let tx = TransactionInput::decode_hex(EIP155_TX).unwrap();
        assert_eq!(tx.tx_type, 0);
        assert_eq!(tx.nonce, Nonce::new(9));
        assert_eq!(tx.chain_id, Some(ChainId(1)));
        assert_eq!(tx.signer, Address::from_str(EIP155_SIGNER).unwrap());
    }

    #[test]
    fn decode_ignores_hex_prefix() {
        let with_prefix = TransactionInput::decode_hex(EIP155_TX).unwrap();
        let without_prefix = TransactionInput::decode_hex(EIP155_TX.trim_start_matches("0x")).unwrap();
        assert_eq!(with_prefix, without_prefix);
        assert_eq!(with_prefix.hash, without_prefix.hash);
    }

    #[test]
    fn decode_fails_with_corrupted_signature() {
        // replace r with a value above the curve order
        let r = "28ef61340bd939bc2195fe537567866003e1a15d3c71ff63e1590620aa636276";
        let corrupted = EIP155_TX.replace(r, &"ff".repeat(32));
        let result = TransactionInput::decode_hex(&corrupted);
        assert!(matches!(result, Err(TransactionDecodeError::Signature { .. })), "{:?}", result);
    }

    #[test]
    fn decode_fails_with_malformed_encoding() {
        assert!(matches!(TransactionInput::decode_hex("0xzz"), Err(TransactionDecodeError::Decode { .. })));
        assert!(matches!(TransactionInput::decode_hex("0x"), Err(TransactionDecodeError::Decode { .. })));
        assert!(matches!(TransactionInput::decode_hex("0xf86c09"), Err(TransactionDecodeError::Decode { .. })));
    }

    #[test]
    fn decode_fails_with_trailing_bytes() {
        let padded = format!("{}00", EIP155_TX);
        assert!(matches!(TransactionInput::decode_hex(&padded), Err(TransactionDecodeError::Decode { .. })));
    }
}
