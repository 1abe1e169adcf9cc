pub mod messages;
pub mod rpc;
pub mod transport;

#[cfg(test)]
pub(crate) mod fake;

pub use rpc::RpcTransport;
pub use transport::ChainTransport;
