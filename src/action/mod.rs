pub mod errors;
pub mod normalize;
pub mod types;

pub use errors::ParseError;
pub use normalize::{normalize, normalize_str};
pub use types::{Action, Key, ScrollDirection, DEFAULT_SWIPE_MS};
