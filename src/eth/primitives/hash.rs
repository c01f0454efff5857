use std::fmt::Display;
use std::str::FromStr;

use alloy_primitives::B256;
use alloy_primitives::keccak256;
use display_json::DebugAsJson;

/// 32-byte keccak hash, used to identify transactions.
#[derive(DebugAsJson, Clone, Copy, Default, Eq, PartialEq, Hash)]
pub struct Hash(pub B256);

impl Hash {
    /// Hashes arbitrary bytes with keccak256.
    pub fn keccak(data: impl AsRef<[u8]>) -> Self {
        Self(keccak256(data))
    }
}

impl Display for Hash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", const_hex::encode_prefixed(self.0))
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl FromStr for Hash {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(B256::from_str(s)?))
    }
}

impl serde::Serialize for Hash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for Hash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

impl From<B256> for Hash {
    fn from(value: B256) -> Self {
        Self(value)
    }
}
