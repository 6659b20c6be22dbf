//! A registry of independent polls, each tallied with plurality, Condorcet
//! or Schulze.
//!
//! Every poll keeps its aggregate up to date as ballots arrive, so closing a
//! poll only has to read the winners off the aggregate. See the [manual] for
//! the details of each method.
//!
//! ```
//! use poll_tally::*;
//!
//! let clock = ManualClock::new();
//! let mut registry = PollRegistry::new(Identity::from("owner"), clock.clone());
//! let alice = Identity::from("alice");
//! let request = Builder::new(&TallyRules::PLURALITY)
//!     .candidates(3)?
//!     .duration(10)?
//!     .build()?;
//! let id = registry.create_poll(&alice, &request)?;
//! registry.submit_vote(&id, Ballot::Single(2), &Identity::from("bob"))?;
//! assert_eq!(registry.close_poll(&id, &alice)?, vec![2]);
//! # Ok::<(), PollError>(())
//! ```

mod access;
mod ballot;
mod clock;
mod config;
mod id;
mod poll;
mod registry;
mod tally;

pub mod builder;
pub mod manual;
pub mod snapshot;

pub use crate::access::{AccessController, AccessRequest};
pub use crate::ballot::{BallotStore, VoterRecord};
pub use crate::builder::{ranked_ballot, Builder, PollRequest};
pub use crate::clock::{ManualClock, TickSource};
pub use crate::config::*;
pub use crate::id::{IdPreimage, PollIdGenerator};
pub use crate::poll::Poll;
pub use crate::registry::PollRegistry;
pub use crate::snapshot::RegistrySnapshot;
pub use crate::tally::{
    PairwiseMatrix, PairwiseTally, PluralityTally, SchulzeTally, Tally, TallyStrategy,
};
