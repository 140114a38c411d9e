//! Broker adapters.
//!
//! Each broker implements [`BrokerAdapter`] on top of shared plumbing:
//!
//! - `capabilities` - per-endpoint batch and day-span bounds
//! - `session` - the atomically swapped `(access token, catalog)` snapshot
//! - `http` - request/envelope handling with error mapping
//! - `wire` - payload shapes both brokers share
//! - `upstox`, `zerodha` - the adapters

mod capabilities;
mod http;
mod session;
mod traits;
mod wire;

pub mod upstox;
pub mod zerodha;

pub use capabilities::{EndpointLimits, QuoteEndpoint};
pub use session::{BrokerSession, SessionSlot};
pub use traits::BrokerAdapter;
pub use upstox::UpstoxAdapter;
pub use zerodha::ZerodhaAdapter;
