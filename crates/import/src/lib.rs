pub mod dedup;
pub mod ofx;

pub use dedup::{DuplicateDetector, MatchPolicy};
pub use ofx::{parse, LegacySyntax, ParseError};
