//! Ethereum JSON-RPC gateway.

mod rpc_context;
mod rpc_interceptor;
mod rpc_message;
mod rpc_parser;
mod rpc_server;
mod rpc_upstream;

pub use rpc_context::RpcContext;
pub use rpc_interceptor::METHOD_GET_TRANSACTION_COUNT;
pub use rpc_interceptor::METHOD_SEND_RAW_TRANSACTION;
pub use rpc_interceptor::RpcInterceptor;
pub use rpc_message::JSONRPC_VERSION;
pub use rpc_message::RpcCall;
pub use rpc_message::RpcPayload;
pub use rpc_message::RpcReply;
pub use rpc_message::RpcResponse;
pub use rpc_parser::RpcParams;
pub use rpc_parser::next_rpc_param;
pub use rpc_parser::next_rpc_param_or_default;
pub use rpc_parser::rpc_params;
pub use rpc_server::handle_http_request;
pub use rpc_server::handle_rpc_body;
pub use rpc_server::handle_rpc_payload;
pub use rpc_server::serve_rpc;
pub use rpc_upstream::RpcUpstream;
