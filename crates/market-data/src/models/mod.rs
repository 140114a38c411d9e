//! Gateway data models
//!
//! - `types` - Type aliases for identifiers and result maps
//! - `instrument` - Catalog rows (`Instrument`), caller references (`InstrumentRef`)
//!   and reverse-resolution results (`SymbolInfo`)
//! - `quote` - Quotes before (`ProviderQuote`) and after (`Quote`) reverse resolution
//! - `candle` - Historical candles

mod candle;
mod instrument;
mod quote;
mod types;

pub use candle::Candle;
pub use instrument::{Instrument, InstrumentRef, SymbolInfo};
pub use quote::{Ohlc, ProviderQuote, Quote};
pub use types::{BrokerType, ExchangeToken, InstrumentKey, QuoteMap};
