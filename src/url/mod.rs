//! URL handling module for Depthcrawl
//!
//! Every URL that reaches the frontier passes through this module first, so
//! two spellings of the same page (relative vs absolute, with or without a
//! fragment) end up as one key.

mod normalize;

pub use normalize::{normalize_link, parse_seed, same_host};
