use log::{debug, warn};

use crate::config::*;

/// The creation parameters a poll identifier is derived from.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct IdPreimage<'a> {
    pub creator: &'a Identity,
    /// Number of polls the creator had before this one.
    pub sequence: u64,
    pub candidate_count: u32,
    pub uri: &'a str,
    pub duration: Tick,
    pub created_tick: Tick,
    pub method: TallyMethod,
}

impl IdPreimage<'_> {
    // Variable-length fields are length-prefixed so that no two preimages
    // share an encoding.
    fn encode(&self, salt: u64) -> String {
        format!(
            "poll:{}:{}|{:016x}|{}|{}:{}|{}|{}|{}|{}",
            self.creator.0.len(),
            self.creator.0,
            self.sequence,
            self.candidate_count,
            self.uri.len(),
            self.uri,
            self.duration,
            self.created_tick,
            self.method,
            salt
        )
    }
}

/// Derives content-addressed poll identifiers.
pub struct PollIdGenerator;

impl PollIdGenerator {
    /// The identifier for the given parameters and salt.
    pub fn derive(preimage: &IdPreimage, salt: u64) -> PollId {
        PollId(sha256::digest(preimage.encode(salt)))
    }

    /// Returns the first identifier not already taken, starting from salt 0.
    ///
    /// With a fresh per-creator sequence number the first candidate is
    /// always free, so the loop only guards against digest collisions.
    pub fn generate(preimage: &IdPreimage, taken: impl Fn(&PollId) -> bool) -> PollId {
        let mut salt: u64 = 0;
        loop {
            let id = PollIdGenerator::derive(preimage, salt);
            if !taken(&id) {
                debug!("PollIdGenerator: {:?} -> {}", preimage, id);
                return id;
            }
            warn!("PollIdGenerator: collision on {}, salt {}", id, salt);
            salt += 1;
        }
    }
}
