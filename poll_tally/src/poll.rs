use log::{debug, info};
use snafu::prelude::*;

use crate::ballot::{check_ballot, BallotStore};
use crate::config::*;
use crate::tally::{Tally, TallyStrategy};

/// A single voting event.
///
/// State machine: `Open` -> `Closed`, never back. A poll closes when its
/// creator closes it, when a vote observes that the expiration tick has been
/// reached, or when it reaches its voter cap.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Poll {
    id: PollId,
    creator: Identity,
    candidate_count: u32,
    uri: String,
    created_tick: Tick,
    expire_tick: Tick,
    closed: bool,
    rules: TallyRules,
    ballots: BallotStore,
    tally: Tally,
}

impl Poll {
    pub(crate) fn new(
        id: PollId,
        creator: Identity,
        candidate_count: u32,
        uri: String,
        created_tick: Tick,
        expire_tick: Tick,
        rules: TallyRules,
    ) -> Poll {
        let tally = Tally::new(&rules, candidate_count);
        Poll {
            id,
            creator,
            candidate_count,
            uri,
            created_tick,
            expire_tick,
            closed: false,
            rules,
            ballots: BallotStore::new(),
            tally,
        }
    }

    pub fn id(&self) -> &PollId {
        &self.id
    }

    pub fn creator(&self) -> &Identity {
        &self.creator
    }

    pub fn candidate_count(&self) -> u32 {
        self.candidate_count
    }

    pub fn uri(&self) -> &str {
        self.uri.as_str()
    }

    pub fn created_tick(&self) -> Tick {
        self.created_tick
    }

    pub fn expire_tick(&self) -> Tick {
        self.expire_tick
    }

    pub fn rules(&self) -> &TallyRules {
        &self.rules
    }

    pub fn method(&self) -> TallyMethod {
        self.rules.method
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn status(&self) -> PollStatus {
        if self.closed {
            PollStatus::Closed
        } else {
            PollStatus::Open
        }
    }

    pub fn ballots(&self) -> &BallotStore {
        &self.ballots
    }

    pub fn tally(&self) -> &Tally {
        &self.tally
    }

    pub fn is_expired_at(&self, tick: Tick) -> bool {
        tick >= self.expire_tick
    }

    pub(crate) fn voter_cap_reached(&self) -> bool {
        self.rules
            .max_voters
            .map(|cap| self.ballots.len() as u64 >= cap)
            .unwrap_or(false)
    }

    pub(crate) fn ensure_open(&self) -> PollResult<()> {
        ensure!(
            !self.closed,
            PollAlreadyClosedSnafu {
                id: self.id.clone()
            }
        );
        Ok(())
    }

    fn check_candidate(&self, candidate: CandidateIndex) -> PollResult<()> {
        ensure!(
            candidate < self.candidate_count,
            CandidateNotFoundSnafu {
                id: self.id.clone(),
                candidate
            }
        );
        Ok(())
    }

    /// Records the first ballot of a voter.
    ///
    /// All the checks run before anything is written, so a rejected ballot
    /// leaves the poll as it was.
    pub(crate) fn submit(&mut self, voter: &Identity, ballot: Ballot) -> PollResult<()> {
        check_ballot(&self.id, &ballot, self.rules.method, self.candidate_count)?;
        self.ballots.insert_first(&self.id, voter, ballot.clone())?;
        self.tally.apply(&ballot);
        debug!(
            "Poll {}: {} voted {:?}, first preferences: {:?}",
            self.id,
            voter,
            ballot,
            self.tally.first_preferences()
        );
        Ok(())
    }

    /// Replaces the ballot of a voter: the previous contribution is removed
    /// from the aggregate before the new one is added.
    pub(crate) fn change(&mut self, voter: &Identity, ballot: Ballot) -> PollResult<()> {
        check_ballot(&self.id, &ballot, self.rules.method, self.candidate_count)?;
        let previous = self.ballots.replace(&self.id, voter, ballot.clone())?;
        self.tally.revoke(&previous);
        self.tally.apply(&ballot);
        debug!(
            "Poll {}: {} changed {:?} -> {:?}",
            self.id, voter, previous, ballot
        );
        Ok(())
    }

    /// Marks the poll closed and returns the winner set.
    pub(crate) fn close(&mut self, reason: CloseReason) -> Vec<CandidateIndex> {
        self.closed = true;
        let winners = self.tally.winners();
        info!(
            "Poll {} closed ({:?}) with {} voters, winners: {:?}",
            self.id,
            reason,
            self.ballots.len(),
            winners
        );
        winners
    }

    /// Restores the closed flag of a poll read back from a snapshot.
    pub(crate) fn mark_closed(&mut self) {
        self.closed = true;
    }

    /// The winner set; only available once the poll is closed.
    pub fn winners(&self) -> PollResult<Vec<CandidateIndex>> {
        ensure!(
            self.closed,
            PollNotClosedSnafu {
                id: self.id.clone()
            }
        );
        Ok(self.tally.winners())
    }

    /// First-preference counts, one per candidate.
    pub fn votes(&self) -> Vec<u64> {
        self.tally.first_preferences().to_vec()
    }

    pub fn votes_of(&self, candidate: CandidateIndex) -> PollResult<u64> {
        self.check_candidate(candidate)?;
        Ok(self.tally.first_preferences()[candidate as usize])
    }
}
