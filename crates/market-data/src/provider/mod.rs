//! Quote source abstraction and the Yahoo Finance implementation.
//!
//! This module contains:
//! - The `QuoteSource` trait the quote cache fetches through
//! - The Yahoo client pieces: session, crumb and chunked quote fetching

mod traits;

pub mod yahoo;

// Re-exports
pub use traits::QuoteSource;
