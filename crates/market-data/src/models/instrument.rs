use serde::{Deserialize, Serialize};

/// One row of a broker's instrument master catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    /// Provider-internal key (e.g. `NSE_EQ|INE002A01018` or `738561`).
    pub instrument_key: String,
    /// Exchange-assigned token (e.g. `2885`).
    pub exchange_token: String,
    /// Exchange code (e.g. `NSE`, `BSE`, `MCX`).
    pub exchange: String,
    /// Instrument type (e.g. `EQ`, `FUT`, `INDEX`).
    pub instrument_type: String,
    /// Exchange trading symbol (e.g. `RELIANCE`).
    pub trading_symbol: String,
}

impl Instrument {
    /// The caller-facing reference for this row.
    pub fn to_ref(&self) -> InstrumentRef {
        InstrumentRef::new(&self.exchange, &self.exchange_token, &self.instrument_type)
    }
}

/// Caller-facing instrument reference: the (exchange, exchange_token, instrument_type) triple.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstrumentRef {
    pub exchange: String,
    pub exchange_token: String,
    pub instrument_type: String,
}

impl InstrumentRef {
    pub fn new(
        exchange: impl Into<String>,
        exchange_token: impl Into<String>,
        instrument_type: impl Into<String>,
    ) -> Self {
        Self {
            exchange: exchange.into(),
            exchange_token: exchange_token.into(),
            instrument_type: instrument_type.into(),
        }
    }
}

impl std::fmt::Display for InstrumentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.exchange, self.exchange_token, self.instrument_type
        )
    }
}

/// Result of reverse-resolving a provider instrument key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolInfo {
    pub trading_symbol: String,
    pub instrument_type: String,
    pub exchange_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instrument_to_ref() {
        let instrument = Instrument {
            instrument_key: "NSE_EQ|INE002A01018".to_string(),
            exchange_token: "2885".to_string(),
            exchange: "NSE".to_string(),
            instrument_type: "EQ".to_string(),
            trading_symbol: "RELIANCE".to_string(),
        };
        assert_eq!(instrument.to_ref(), InstrumentRef::new("NSE", "2885", "EQ"));
    }

    #[test]
    fn test_ref_display() {
        assert_eq!(
            InstrumentRef::new("NSE", "26000", "INDEX").to_string(),
            "NSE/26000/INDEX"
        );
    }
}
