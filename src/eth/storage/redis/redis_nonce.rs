use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use redis::RedisError;
use redis::RedisResult;
use redis::Script;

use crate::eth::primitives::Address;
use crate::eth::primitives::Hash;
use crate::eth::primitives::Nonce;
use crate::eth::primitives::StorageError;
use crate::eth::storage::NonceStorage;
use crate::eth::storage::SubmissionMark;
use crate::ext::not;

/// Value stored for a seen submission. Only the key presence matters.
const SUBMISSION_MARKER: &str = "exist";

/// Lua check for a canonical decimal count, the only format written by this storage.
///
/// Counts are compared as strings because Lua numbers are doubles and lose precision above 2^53.
const LUA_IS_COUNT: &str = r"
    local function is_count(value)
        return value == '0' or string.find(value, '^[1-9]%d*$') ~= nil
    end
    local function count_less(a, b)
        return #a < #b or (#a == #b and a < b)
    end
";

/// Stores `ARGV[1]` when the key is absent or holds a smaller count, then returns the effective count.
///
/// A stored value that is not a count is returned unchanged, so the caller reports it as invalid.
static OBSERVE_SCRIPT: LazyLock<Script> = LazyLock::new(|| {
    Script::new(&format!(
        r"{LUA_IS_COUNT}
        local current = redis.call('GET', KEYS[1])
        if current == false or (is_count(current) and count_less(current, ARGV[1])) then
            redis.call('SET', KEYS[1], ARGV[1])
            return ARGV[1]
        end
        return current
        "
    ))
});

/// Increments an existing count. Returns nil without creating the key when it does not exist.
///
/// Replies `{'ok', count}` or `{'invalid', value}`.
static BUMP_SCRIPT: LazyLock<Script> = LazyLock::new(|| {
    Script::new(&format!(
        r"{LUA_IS_COUNT}
        local current = redis.call('GET', KEYS[1])
        if current == false then
            return false
        end
        if not is_count(current) then
            return {{'invalid', current}}
        end
        redis.call('INCR', KEYS[1])
        return {{'ok', redis.call('GET', KEYS[1])}}
        "
    ))
});

/// Sets the submission marker `KEYS[2]` and increments the count `KEYS[1]` only if the marker was absent.
///
/// Returns nil without marking when the count does not exist. Replies `{'first', count}`, `{'duplicate', count}` or
/// `{'invalid', value}`.
static RECORD_SUBMISSION_SCRIPT: LazyLock<Script> = LazyLock::new(|| {
    Script::new(&format!(
        r"{LUA_IS_COUNT}
        local current = redis.call('GET', KEYS[1])
        if current == false then
            return false
        end
        if not is_count(current) then
            return {{'invalid', current}}
        end
        if redis.call('SET', KEYS[2], ARGV[1], 'NX', 'EX', ARGV[2]) then
            redis.call('INCR', KEYS[1])
            return {{'first', redis.call('GET', KEYS[1])}}
        end
        return {{'duplicate', current}}
        "
    ))
});

type RedisOptStringResult = RedisResult<Option<String>>;
type RedisStringResult = RedisResult<String>;
type RedisOptTaggedResult = RedisResult<Option<(String, String)>>;

/// Nonce storage backed by a shared Redis instance, so multiple gateway replicas agree on shadow nonces.
///
/// Keys:
/// * lowercase `0x` address: decimal shadow nonce, without expiration.
/// * lowercase `0x` transaction hash: submission marker, expiring after the dedup TTL.
#[derive(derive_new::new)]
pub struct RedisNonceStorage {
    conn: ConnectionManager,
    submission_ttl: Duration,
}

impl RedisNonceStorage {
    fn nonce_key(address: &Address) -> String {
        address.to_string()
    }

    fn submission_key(tx_hash: &Hash) -> String {
        tx_hash.to_string()
    }

    /// Redis rejects `EX 0`, so sub-second TTLs are rounded up.
    fn submission_ttl_secs(&self) -> u64 {
        self.submission_ttl.as_secs().max(1)
    }

    /// Parses a stored count, accepting only the canonical decimal format the scripts compare.
    fn parse_nonce(key: &str, value: String) -> Result<Nonce, StorageError> {
        let canonical = value == "0" || (not(value.starts_with('0')) && value.bytes().all(|b| b.is_ascii_digit()));
        match value.parse::<Nonce>() {
            Ok(nonce) if canonical => Ok(nonce),
            _ => {
                tracing::error!(%key, %value, "redis holds invalid shadow nonce");
                Err(StorageError::ValueInvalid { key: key.to_owned(), value })
            }
        }
    }
}

fn unavailable(e: RedisError, message: &str) -> StorageError {
    tracing::error!(reason = ?e, %message);
    StorageError::Unavailable { reason: e.to_string() }
}

#[async_trait]
impl NonceStorage for RedisNonceStorage {
    async fn read(&self, address: &Address) -> Result<Option<Nonce>, StorageError> {
        let key = Self::nonce_key(address);
        let mut conn = self.conn.clone();

        let value: RedisOptStringResult = conn.get(&key).await;
        match value {
            Ok(Some(value)) => Self::parse_nonce(&key, value).map(Some),
            Ok(None) => Ok(None),
            Err(e) => Err(unavailable(e, "failed to read shadow nonce from redis")),
        }
    }

    async fn observe(&self, address: &Address, upstream: Nonce) -> Result<Nonce, StorageError> {
        let key = Self::nonce_key(address);
        let mut conn = self.conn.clone();

        let value: RedisStringResult = OBSERVE_SCRIPT.key(&key).arg(upstream.as_u64()).invoke_async(&mut conn).await;
        match value {
            Ok(value) => Self::parse_nonce(&key, value),
            Err(e) => Err(unavailable(e, "failed to observe shadow nonce in redis")),
        }
    }

    async fn bump(&self, address: &Address) -> Result<Nonce, StorageError> {
        let key = Self::nonce_key(address);
        let mut conn = self.conn.clone();

        let value: RedisOptTaggedResult = BUMP_SCRIPT.key(&key).invoke_async(&mut conn).await;
        match value {
            // an `invalid` reply carries the stored value, which fails parsing
            Ok(Some((_, value))) => Self::parse_nonce(&key, value),
            Ok(None) => Err(StorageError::RecordMissing { address: *address }),
            Err(e) => Err(unavailable(e, "failed to bump shadow nonce in redis")),
        }
    }

    async fn check_and_mark(&self, tx_hash: &Hash) -> Result<SubmissionMark, StorageError> {
        let key = Self::submission_key(tx_hash);
        let mut conn = self.conn.clone();

        // SET NX answers OK only for the first writer and nil when the key is already present
        let set: RedisOptStringResult = redis::cmd("SET")
            .arg(&key)
            .arg(SUBMISSION_MARKER)
            .arg("NX")
            .arg("EX")
            .arg(self.submission_ttl_secs())
            .query_async(&mut conn)
            .await;
        match set {
            Ok(Some(_)) => Ok(SubmissionMark::First),
            Ok(None) => Ok(SubmissionMark::Duplicate),
            Err(e) => Err(unavailable(e, "failed to mark submission in redis")),
        }
    }

    async fn record_submission(&self, address: &Address, tx_hash: &Hash) -> Result<(SubmissionMark, Nonce), StorageError> {
        let key = Self::nonce_key(address);
        let mut conn = self.conn.clone();

        let value: RedisOptTaggedResult = RECORD_SUBMISSION_SCRIPT
            .key(&key)
            .key(Self::submission_key(tx_hash))
            .arg(SUBMISSION_MARKER)
            .arg(self.submission_ttl_secs())
            .invoke_async(&mut conn)
            .await;
        match value {
            Ok(Some((tag, value))) => {
                let nonce = Self::parse_nonce(&key, value)?;
                let mark = if tag == "first" { SubmissionMark::First } else { SubmissionMark::Duplicate };
                Ok((mark, nonce))
            }
            Ok(None) => Err(StorageError::RecordMissing { address: *address }),
            Err(e) => Err(unavailable(e, "failed to record submission in redis")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_lowercase_prefixed_hex() {
        let address: Address = "0x9D8A62F656A8D1615C1294FD71E9CFB3E4855A4F".parse().unwrap();
        assert_eq!(RedisNonceStorage::nonce_key(&address), "0x9d8a62f656a8d1615c1294fd71e9cfb3e4855a4f");

        let tx_hash = Hash::keccak(b"");
        assert_eq!(
            RedisNonceStorage::submission_key(&tx_hash),
            "0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn stored_nonce_must_be_decimal() {
        assert_eq!(RedisNonceStorage::parse_nonce("k", "42".into()).unwrap(), Nonce::new(42));
        assert_eq!(RedisNonceStorage::parse_nonce("k", "0".into()).unwrap(), Nonce::ZERO);
        for value in ["0x2a", "042", " 42", "", "18446744073709551616"] {
            assert!(
                matches!(RedisNonceStorage::parse_nonce("k", value.into()), Err(StorageError::ValueInvalid { .. })),
                "value: {value:?}"
            );
        }
    }
}
