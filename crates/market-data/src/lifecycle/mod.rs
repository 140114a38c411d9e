//! Credential lifecycle.
//!
//! - `traits` - injected [`Authenticator`] and [`TokenStore`]
//! - `rotator` - fetch-then-store credential rotation
//! - `state` - per-broker state machine and status
//! - `manager` - the background health loop

mod manager;
mod rotator;
mod state;
mod traits;

pub use manager::{LifecycleConfig, TokenLifecycleManager};
pub use rotator::{Rotator, TokenRotator};
pub use state::{BrokerState, BrokerStatus};
pub use traits::{Authenticator, TokenStore};
