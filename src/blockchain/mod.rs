pub mod block;
pub mod hash;
pub mod model;
pub mod pow;
pub mod validation;

pub use block::Block;
pub use hash::hash_block;
pub use model::{Ledger, Reassigned};
pub use pow::{MiningJob, MiningOutcome};
pub use validation::{is_valid_chain, validate_chain};

/// Default Proof-of-Work difficulty (number of leading zero hex digits).
pub const DEFAULT_DIFFICULTY: u32 = 4;

/// Difficulty bounds accepted from configuration.
pub const DIFF_MIN: u32 = 1;
pub const DIFF_MAX: u32 = 8;
