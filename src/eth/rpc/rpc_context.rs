use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use crate::eth::rpc::RpcInterceptor;
use crate::eth::rpc::RpcUpstream;
use crate::eth::storage::NonceStorage;
use crate::ext::DisplayExt;

/// Services and limits shared by all requests handled by the RPC server.
pub struct RpcContext {
    // services
    pub interceptor: RpcInterceptor,

    // limits
    pub request_timeout: Duration,
    pub max_body_size: usize,
}

impl RpcContext {
    pub fn new(upstream: Arc<dyn RpcUpstream>, storage: Arc<dyn NonceStorage>, request_timeout: Duration, max_body_size: usize) -> Self {
        Self {
            interceptor: RpcInterceptor::new(upstream, storage),
            request_timeout,
            max_body_size,
        }
    }
}

impl Debug for RpcContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcContext")
            .field("request_timeout", &self.request_timeout.to_string_ext())
            .field("max_body_size", &self.max_body_size)
            .finish_non_exhaustive()
    }
}
