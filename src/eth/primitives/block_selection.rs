use std::fmt::Display;

use crate::alias::JsonValue;
use crate::eth::primitives::Hash;
use crate::eth::primitives::Nonce;

/// Block parameter of state queries like `eth_getTransactionCount`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BlockSelection {
    /// Most recent block. Also assumed when the parameter is omitted.
    #[default]
    Latest,

    /// Most recent block plus the node's pending transactions.
    Pending,

    /// Genesis block.
    Earliest,

    /// Latest safe head block.
    Safe,

    /// Latest finalized block.
    Finalized,

    /// Block by its number.
    Number(u64),

    /// Block by its hash.
    Hash(Hash),
}

impl BlockSelection {
    /// Checks if the selection points to the latest block, the only view shadowed by the gateway.
    pub fn is_latest(&self) -> bool {
        matches!(self, Self::Latest)
    }
}

impl Display for BlockSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlockSelection::Latest => write!(f, "latest"),
            BlockSelection::Pending => write!(f, "pending"),
            BlockSelection::Earliest => write!(f, "earliest"),
            BlockSelection::Safe => write!(f, "safe"),
            BlockSelection::Finalized => write!(f, "finalized"),
            BlockSelection::Number(number) => write!(f, "{:#x}", number),
            BlockSelection::Hash(hash) => write!(f, "{}", hash),
        }
    }
}

// -----------------------------------------------------------------------------
// Serialization / Deserilization
// -----------------------------------------------------------------------------

impl serde::Serialize for BlockSelection {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for BlockSelection {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = JsonValue::deserialize(deserializer)?;
        match value {
            JsonValue::String(value) => parse_block_tag(&value).map_err(serde::de::Error::custom),

            // EIP-1898
            JsonValue::Object(map) => {
                if let Some(JsonValue::String(hash)) = map.get("blockHash") {
                    let hash: Hash = hash.parse().map_err(serde::de::Error::custom)?;
                    return Ok(Self::Hash(hash));
                }
                if let Some(JsonValue::String(number)) = map.get("blockNumber") {
                    return parse_block_tag(number).map_err(serde::de::Error::custom);
                }
                Err(serde::de::Error::custom("block object must contain blockHash or blockNumber"))
            }

            other => Err(serde::de::Error::custom(format!("invalid block selection: {}", other))),
        }
    }
}

fn parse_block_tag(value: &str) -> anyhow::Result<BlockSelection> {
    match value.to_lowercase().as_str() {
        // parse special keywords
        "latest" => Ok(BlockSelection::Latest),
        "pending" => Ok(BlockSelection::Pending),
        "earliest" => Ok(BlockSelection::Earliest),
        "safe" => Ok(BlockSelection::Safe),
        "finalized" => Ok(BlockSelection::Finalized),

        // parse hash (66: H256 with 0x prefix)
        s if s.len() == 66 => Ok(BlockSelection::Hash(s.parse()?)),

        // parse number
        s => Ok(BlockSelection::Number(Nonce::from_hex_quantity(s)?.as_u64())),
    }
}
