//! JSON-RPC transport over HTTP(S) using `reqwest`, with per-attempt
//! timeout, basic auth, and optional request rate limiting.

mod connection;
mod transport;

pub(crate) use connection::parse_connection;
pub use transport::HttpTransport;
