//! Per-scenario random number streams.
//!
//! Every scenario draws from its own generator seeded by mixing
//! `(master_seed, group, index, sub-stream)`. No generator is ever shared
//! between scenarios, so a scenario's draws do not depend on which worker
//! evaluates it or in what order.

mod stream;

pub(crate) use stream::splitmix64;
pub use stream::{derive_seed, ScenarioRng, SubStream};
