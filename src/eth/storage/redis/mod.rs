mod redis_nonce;

pub use redis_nonce::RedisNonceStorage;
