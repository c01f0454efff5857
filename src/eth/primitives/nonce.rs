//! Account transaction count.
//!
//! On the JSON-RPC wire a nonce is a hex quantity (`0x1a`). In the shadow storage it is persisted as a decimal
//! string, which is what `Display` and `FromStr` produce and accept.

use std::fmt::Display;
use std::str::FromStr;

use anyhow::anyhow;

use crate::gen_newtype_from;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Nonce(u64);

impl Nonce {
    pub const ZERO: Nonce = Nonce(0);

    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Returns the nonce that follows the current one.
    pub fn next_nonce(&self) -> Option<Nonce> {
        self.0.checked_add(1).map(Nonce)
    }

    /// Formats the nonce as a JSON-RPC hex quantity.
    pub fn to_hex_quantity(&self) -> String {
        format!("{:#x}", self.0)
    }

    /// Parses a JSON-RPC hex quantity. Leading zeros are tolerated, an empty quantity is not.
    pub fn from_hex_quantity(s: &str) -> anyhow::Result<Self> {
        let Some(digits) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) else {
            return Err(anyhow!("hex quantity must start with 0x: {}", s));
        };
        if digits.is_empty() {
            return Err(anyhow!("hex quantity without digits: {}", s));
        }
        Ok(Self(u64::from_str_radix(digits, 16)?))
    }
}

impl Display for Nonce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for Nonce {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse::<u64>()?))
    }
}

// -----------------------------------------------------------------------------
// Serialization / Deserialization
// -----------------------------------------------------------------------------

impl serde::Serialize for Nonce {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex_quantity())
    }
}

impl<'de> serde::Deserialize<'de> for Nonce {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(serde::Deserialize)]
        #[serde(untagged)]
        enum Quantity {
            Hex(String),
            Number(u64),
        }

        match Quantity::deserialize(deserializer)? {
            Quantity::Hex(s) => Nonce::from_hex_quantity(&s).map_err(serde::de::Error::custom),
            Quantity::Number(n) => Ok(Nonce(n)),
        }
    }
}

// -----------------------------------------------------------------------------
// Conversions: Other -> Self
// -----------------------------------------------------------------------------
gen_newtype_from!(self = Nonce, other = u8, u16, u32, u64);

// -----------------------------------------------------------------------------
// Conversions: Self -> Other
// -----------------------------------------------------------------------------
impl From<Nonce> for u64 {
    fn from(value: Nonce) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn deserialize_hex_quantity() {
        assert_eq!(serde_json::from_value::<Nonce>(json!("0x0")).unwrap(), Nonce::ZERO);
        assert_eq!(serde_json::from_value::<Nonce>(json!("0x1a")).unwrap(), Nonce::new(26));
        assert_eq!(serde_json::from_value::<Nonce>(json!("0x001a")).unwrap(), Nonce::new(26));
        assert_eq!(serde_json::from_value::<Nonce>(json!(7)).unwrap(), Nonce::new(7));
    }

    #[test]
    fn deserialize_rejects_invalid_quantity() {
        assert!(serde_json::from_value::<Nonce>(json!("0x")).is_err());
        assert!(serde_json::from_value::<Nonce>(json!("1a")).is_err());
        assert!(serde_json::from_value::<Nonce>(json!("0xzz")).is_err());
        assert!(serde_json::from_value::<Nonce>(json!(null)).is_err());
    }

    #[test]
    fn serialize_as_hex_quantity() {
        assert_eq!(serde_json::to_value(Nonce::new(26)).unwrap(), json!("0x1a"));
        assert_eq!(serde_json::to_value(Nonce::ZERO).unwrap(), json!("0x0"));
    }

    #[test]
    fn storage_format_is_decimal() {
        assert_eq!(Nonce::new(26).to_string(), "26");
        assert_eq!("26".parse::<Nonce>().unwrap(), Nonce::new(26));
    }

    #[test]
    fn next_nonce_does_not_overflow() {
        assert_eq!(Nonce::new(1).next_nonce(), Some(Nonce::new(2)));
        assert_eq!(Nonce::new(u64::MAX).next_nonce(), None);
    }
}
