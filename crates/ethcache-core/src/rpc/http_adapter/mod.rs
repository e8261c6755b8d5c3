//! Native JSON-RPC client for Ethereum execution nodes.
//!
//! Implements [`super::EthRpc`] over JSON-RPC 2.0 using `reqwest`, with
//! typed protocol structs and strict result parsing.

mod client;
mod parsing;
mod protocol;

pub use client::HttpRpcClient;
