pub mod field_odds;
pub mod odds;

pub use field_odds::*;
pub use odds::*;
