mod connect_id;
pub mod helpers;
mod pair_key;

pub use connect_id::ConnectId;
pub use pair_key::{PairKey, PairKeyError, PAIR_KEY_SEPARATOR};
