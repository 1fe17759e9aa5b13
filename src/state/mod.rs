pub mod bet;
pub mod chain_games;
pub mod event;
pub mod field;
pub mod mapping;
pub mod payout_info;
pub mod quick_games;
pub mod result;
pub mod undo;

pub use bet::*;
pub use chain_games::*;
pub use event::*;
pub use field::*;
pub use mapping::*;
pub use payout_info::*;
pub use quick_games::*;
pub use result::*;
pub use undo::*;
