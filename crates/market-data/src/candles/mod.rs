//! Candle sequence assembly.

mod assembler;

pub use assembler::CandleAssembler;
