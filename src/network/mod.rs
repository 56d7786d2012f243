pub mod consensus;
#[cfg(test)]
pub mod mock;
pub mod peers;

pub use consensus::{ChainFetcher, HttpChainFetcher, resolve_conflicts};
pub use peers::PeerRegistry;
