use std::fmt::Display;
use std::ops::Deref;
use std::str::FromStr;

use alloy_primitives::FixedBytes;
use anyhow::anyhow;
use display_json::DebugAsJson;
#[cfg(test)]
use fake::Dummy;
#[cfg(test)]
use fake::Faker;

use crate::alias::AlloyAddress;

/// Address of an Ethereum account (wallet or contract).
///
/// Always displayed as lowercase hex with `0x` prefix, which is also the format used as storage key.
#[derive(DebugAsJson, Clone, Copy, Default, Eq, PartialEq, PartialOrd, Ord, Hash)]
pub struct Address(pub FixedBytes<20>);

impl Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", const_hex::encode_prefixed(self.0))
    }
}

#[cfg(test)]
impl Dummy<Faker> for Address {
    fn dummy_with_rng<R: rand::Rng + ?Sized>(_: &Faker, rng: &mut R) -> Self {
        let mut bytes = [0u8; 20];
        rng.fill_bytes(&mut bytes);
        Self(FixedBytes(bytes))
    }
}

impl Deref for Address {
    type Target = FixedBytes<20>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

// -----------------------------------------------------------------------------
// Serialization / Deserialization
// -----------------------------------------------------------------------------

impl serde::Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

// -----------------------------------------------------------------------------
// Conversions: Other -> Self
// -----------------------------------------------------------------------------

impl From<[u8; 20]> for Address {
    fn from(value: [u8; 20]) -> Self {
        Self(FixedBytes::from(value))
    }
}

impl From<AlloyAddress> for Address {
    fn from(value: AlloyAddress) -> Self {
        Self(value.0)
    }
}

/// Parses an address from hexadecimal, with or without `0x` prefix and in any letter case.
impl FromStr for Address {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
        if digits.len() != 40 {
            return Err(anyhow!("address must have exactly 40 hex digits, but received {}", digits.len()));
        }
        Ok(Self(FixedBytes::from_str(digits)?))
    }
}

// -----------------------------------------------------------------------------
// Conversions: Self -> Other
// -----------------------------------------------------------------------------

impl From<Address> for AlloyAddress {
    fn from(value: Address) -> Self {
        AlloyAddress::from(value.0)
    }
}

#[cfg(test)]
mod tests {
    use fake::Fake;

    use super::*;

    #[test]
    fn parse_ignores_prefix_and_case() {
        let lower = Address::from_str("0x9d8a62f656a8d1615c1294fd71e9cfb3e4855a4f").unwrap();
        let checksum = Address::from_str("0x9d8A62f656a8d1615C1294fd71e9CFb3E4855A4F").unwrap();
        let bare = Address::from_str("9d8a62f656a8d1615c1294fd71e9cfb3e4855a4f").unwrap();
        assert_eq!(lower, checksum);
        assert_eq!(lower, bare);
    }

    #[test]
    fn display_is_lowercase_prefixed() {
        let address = Address::from_str("0x9d8A62f656a8d1615C1294fd71e9CFb3E4855A4F").unwrap();
        assert_eq!(address.to_string(), "0x9d8a62f656a8d1615c1294fd71e9cfb3e4855a4f");
    }

    #[test]
    fn parse_rejects_wrong_length() {
        assert!(Address::from_str("0x1234").is_err());
        assert!(Address::from_str("").is_err());
    }

    #[test]
    fn serde_uses_lowercase_string() {
        let address: Address = Faker.fake();
        let json = serde_json::to_string(&address).unwrap();
        assert_eq!(json, format!("\"{}\"", address));
        assert_eq!(serde_json::from_str::<Address>(&json).unwrap(), address);
    }
}
