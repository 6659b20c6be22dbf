use log::{debug, info};
use snafu::prelude::*;
use std::collections::HashMap;

use crate::access::{AccessController, AccessRequest};
use crate::builder::PollRequest;
use crate::clock::{ManualClock, TickSource};
use crate::config::*;
use crate::id::{IdPreimage, PollIdGenerator};
use crate::poll::Poll;
use crate::tally::PairwiseMatrix;

/// The collection of all the polls, with the operations exposed to callers.
///
/// Polls are never removed. Both indices (global and per creator) are
/// append-only and keep creation order.
pub struct PollRegistry<C: TickSource = ManualClock> {
    pub(crate) owner: Identity,
    pub(crate) clock: C,
    pub(crate) polls: HashMap<PollId, Poll>,
    pub(crate) index: Vec<PollId>,
    pub(crate) by_creator: HashMap<Identity, Vec<PollId>>,
    pub(crate) events: Vec<PollEvent>,
}

impl<C: TickSource> PollRegistry<C> {
    pub fn new(owner: Identity, clock: C) -> PollRegistry<C> {
        PollRegistry {
            owner,
            clock,
            polls: HashMap::new(),
            index: Vec::new(),
            by_creator: HashMap::new(),
            events: Vec::new(),
        }
    }

    pub fn owner(&self) -> &Identity {
        &self.owner
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn current_tick(&self) -> Tick {
        self.clock.current_tick()
    }

    // ********* Creation *********

    /// Opens a new poll on behalf of `creator` and returns its identifier.
    pub fn create_poll(&mut self, creator: &Identity, request: &PollRequest) -> PollResult<PollId> {
        request.validate()?;
        let now = self.clock.current_tick();
        let sequence = self.owner_poll_count(creator) as u64;
        let preimage = IdPreimage {
            creator,
            sequence,
            candidate_count: request.candidate_count,
            uri: request.uri.as_str(),
            duration: request.duration,
            created_tick: now,
            method: request.rules.method,
        };
        let id = PollIdGenerator::generate(&preimage, |id| self.polls.contains_key(id));
        let expire_tick = now
            .checked_add(request.duration)
            .context(InvalidDurationSnafu {})?;
        let poll = Poll::new(
            id.clone(),
            creator.clone(),
            request.candidate_count,
            request.uri.clone(),
            now,
            expire_tick,
            request.rules.clone(),
        );
        self.insert(poll);
        info!(
            "Created poll {} by {}: {} candidates, {}, expires at tick {}",
            id, creator, request.candidate_count, request.rules.method, expire_tick
        );
        self.events.push(PollEvent::Created {
            id: id.clone(),
            creator: creator.clone(),
            candidate_count: request.candidate_count,
            uri: request.uri.clone(),
            expire_tick,
        });
        Ok(id)
    }

    pub(crate) fn insert(&mut self, poll: Poll) {
        let id = poll.id().clone();
        self.index.push(id.clone());
        self.by_creator
            .entry(poll.creator().clone())
            .or_default()
            .push(id.clone());
        self.polls.insert(id, poll);
    }

    // ********* Enumeration *********

    pub fn by_id(&self, id: &PollId) -> PollResult<&Poll> {
        self.polls
            .get(id)
            .context(PollNotFoundSnafu { id: id.clone() })
    }

    pub fn poll_by_hash(&self, id: &PollId) -> PollResult<&Poll> {
        self.by_id(id)
    }

    pub fn poll_count(&self) -> usize {
        self.index.len()
    }

    pub fn poll_by_index(&self, index: usize) -> PollResult<(&PollId, &Poll)> {
        let id = self.index.get(index).context(IndexOutOfRangeSnafu {
            index,
            len: self.index.len(),
        })?;
        Ok((id, self.poll_by_hash(id)?))
    }

    pub fn owner_poll_count(&self, creator: &Identity) -> usize {
        self.by_creator.get(creator).map(|v| v.len()).unwrap_or(0)
    }

    pub fn owner_poll_by_index(&self, creator: &Identity, index: usize) -> PollResult<&PollId> {
        let ids: &[PollId] = self
            .by_creator
            .get(creator)
            .map(|v| v.as_slice())
            .unwrap_or(&[]);
        ids.get(index).context(IndexOutOfRangeSnafu {
            index,
            len: ids.len(),
        })
    }

    pub fn by_index(&self, index: usize) -> PollResult<(&PollId, &Poll)> {
        self.poll_by_index(index)
    }

    pub fn by_creator_index(&self, creator: &Identity, index: usize) -> PollResult<&PollId> {
        self.owner_poll_by_index(creator, index)
    }

    pub fn poll_count_of(&self, creator: &Identity) -> usize {
        self.owner_poll_count(creator)
    }

    /// All the polls, in creation order.
    pub fn polls(&self) -> impl Iterator<Item = &Poll> {
        self.index.iter().filter_map(|id| self.polls.get(id))
    }

    // ********* Voting *********

    /// Finds an open poll for a vote. A poll found past its expiration is
    /// closed on the spot and the vote is rejected.
    fn open_poll_for_vote(&mut self, id: &PollId) -> PollResult<&mut Poll> {
        let now = self.clock.current_tick();
        let poll = self
            .polls
            .get_mut(id)
            .context(PollNotFoundSnafu { id: id.clone() })?;
        poll.ensure_open()?;
        if poll.is_expired_at(now) {
            let winners = poll.close(CloseReason::Expired);
            self.events.push(PollEvent::Closed {
                id: id.clone(),
                winners,
                reason: CloseReason::Expired,
            });
            return PollExpiredSnafu {
                id: id.clone(),
                expire_tick: poll.expire_tick(),
            }
            .fail();
        }
        Ok(poll)
    }

    pub fn submit_vote(&mut self, id: &PollId, ballot: Ballot, voter: &Identity) -> PollResult<()> {
        let poll = self.open_poll_for_vote(id)?;
        poll.submit(voter, ballot)?;
        if poll.voter_cap_reached() {
            let winners = poll.close(CloseReason::VoterCap);
            self.events.push(PollEvent::Closed {
                id: id.clone(),
                winners,
                reason: CloseReason::VoterCap,
            });
        }
        Ok(())
    }

    pub fn change_vote(&mut self, id: &PollId, ballot: Ballot, voter: &Identity) -> PollResult<()> {
        let poll = self.open_poll_for_vote(id)?;
        poll.change(voter, ballot)
    }

    /// Closes the poll (creator only) and returns the winners.
    pub fn close_poll(&mut self, id: &PollId, caller: &Identity) -> PollResult<Vec<CandidateIndex>> {
        let poll = self
            .polls
            .get_mut(id)
            .context(PollNotFoundSnafu { id: id.clone() })?;
        AccessController::authorize(
            Access::CreatorOnly,
            &AccessRequest {
                caller,
                owner: &self.owner,
                creator: Some(poll.creator()),
                voter: None,
            },
        )?;
        poll.ensure_open()?;
        let winners = poll.close(CloseReason::Explicit);
        self.events.push(PollEvent::Closed {
            id: id.clone(),
            winners: winners.clone(),
            reason: CloseReason::Explicit,
        });
        Ok(winners)
    }

    // ********* Reads *********

    fn creator_read(&self, id: &PollId, caller: &Identity) -> PollResult<&Poll> {
        let poll = self.poll_by_hash(id)?;
        AccessController::authorize(
            Access::CreatorOnly,
            &AccessRequest {
                caller,
                owner: &self.owner,
                creator: Some(poll.creator()),
                voter: None,
            },
        )?;
        Ok(poll)
    }

    /// First-preference counts of every candidate (creator only).
    pub fn votes(&self, id: &PollId, caller: &Identity) -> PollResult<Vec<u64>> {
        Ok(self.creator_read(id, caller)?.votes())
    }

    pub fn votes_of(&self, id: &PollId, candidate: CandidateIndex, caller: &Identity) -> PollResult<u64> {
        self.creator_read(id, caller)?.votes_of(candidate)
    }

    /// The full pairwise preference matrix of a ranked poll (creator only).
    pub fn pairwise(&self, id: &PollId, caller: &Identity) -> PollResult<PairwiseMatrix> {
        let poll = self.creator_read(id, caller)?;
        poll.tally().pairwise().cloned().context(UnsupportedMethodSnafu {
            id: id.clone(),
            method: poll.method(),
        })
    }

    /// The current ballot of `voter` (the poll's creator or the voter only).
    pub fn vote_of(&self, id: &PollId, voter: &Identity, caller: &Identity) -> PollResult<Ballot> {
        let poll = self.poll_by_hash(id)?;
        AccessController::authorize_voter_read(poll, &self.owner, caller, voter, true)?;
        let record = poll.ballots().get(voter).context(VoterNotFoundSnafu {
            id: id.clone(),
            voter: voter.clone(),
        })?;
        Ok(record.ballot.clone())
    }

    pub fn did_vote(&self, id: &PollId, voter: &Identity, caller: &Identity) -> PollResult<bool> {
        let poll = self.poll_by_hash(id)?;
        AccessController::authorize_voter_read(poll, &self.owner, caller, voter, false)?;
        Ok(poll.ballots().did_vote(voter))
    }

    pub fn winners(&self, id: &PollId) -> PollResult<Vec<CandidateIndex>> {
        self.poll_by_hash(id)?.winners()
    }

    pub fn expire(&self, id: &PollId) -> PollResult<Tick> {
        Ok(self.poll_by_hash(id)?.expire_tick())
    }

    pub fn finished(&self, id: &PollId) -> PollResult<bool> {
        Ok(self.poll_by_hash(id)?.is_closed())
    }

    pub fn voter_count(&self, id: &PollId) -> PollResult<usize> {
        Ok(self.poll_by_hash(id)?.ballots().len())
    }

    // ********* Events *********

    pub fn events(&self) -> &[PollEvent] {
        &self.events
    }

    /// Hands over the events emitted so far.
    pub fn drain_events(&mut self) -> Vec<PollEvent> {
        debug!("drain_events: {} events", self.events.len());
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ranked_ballot;

    fn setup() -> (PollRegistry, ManualClock) {
        let _ = env_logger::builder().is_test(true).try_init();
        let clock = ManualClock::new();
        (PollRegistry::new(Identity::from("owner"), clock.clone()), clock)
    }

    fn who(s: &str) -> Identity {
        Identity::from(s)
    }

    fn create(reg: &mut PollRegistry, creator: &str, candidates: u32, duration: Tick, rules: &TallyRules) -> PollId {
        reg.create_poll(&who(creator), &PollRequest::new(candidates, "", duration, rules))
            .unwrap()
    }

    fn closed_event(reg: &PollRegistry) -> Option<(Vec<u32>, CloseReason)> {
        reg.events().iter().rev().find_map(|e| match e {
            PollEvent::Closed { winners, reason, .. } => Some((winners.clone(), *reason)),
            _ => None,
        })
    }

    #[test]
    fn poll_creation_boundaries() {
        let (mut reg, _) = setup();
        let owner = who("owner");
        let rules = TallyRules::PLURALITY;
        for (count, duration, kind) in [
            (0, 5, "InvalidCandidateCount"),
            (1, 5, "InvalidCandidateCount"),
            (19, 10, "InvalidCandidateCount"),
            (2, 0, "InvalidDuration"),
        ] {
            let res = reg.create_poll(&owner, &PollRequest::new(count, "", duration, &rules));
            assert_eq!(res.unwrap_err().kind(), kind);
        }
        assert_eq!(reg.poll_count(), 0);
        assert!(reg.events().is_empty());
        assert!(reg
            .create_poll(&owner, &PollRequest::new(2, "", 1, &rules))
            .is_ok());
    }

    #[test]
    fn oversized_polls_are_rejected() {
        let (mut reg, _) = setup();
        let owner = who("owner");
        for rules in [
            TallyRules::SCHULZE,
            TallyRules::CONDORCET,
            TallyRules::LEGACY_PLURALITY,
        ] {
            let res = reg.create_poll(&owner, &PollRequest::new(u32::MAX, "", 5, &rules));
            assert_eq!(res.unwrap_err().kind(), "InvalidCandidateCount");
        }
        assert_eq!(reg.poll_count(), 0);
        assert!(reg
            .create_poll(&owner, &PollRequest::new(256, "", 5, &TallyRules::SCHULZE))
            .is_ok());
    }

    #[test]
    fn expiration_must_lie_after_creation() {
        let (mut reg, clock) = setup();
        clock.set(u64::MAX - 1);
        let owner = who("owner");
        let rules = TallyRules::PLURALITY;
        assert_eq!(
            reg.create_poll(&owner, &PollRequest::new(3, "", 2, &rules)),
            Err(PollError::InvalidDuration {})
        );
        let id = reg
            .create_poll(&owner, &PollRequest::new(3, "", 1, &rules))
            .unwrap();
        assert_eq!(reg.expire(&id), Ok(u64::MAX));
        assert_eq!(reg.poll_count(), 1);
    }

    #[test]
    fn creation_sets_expiration_and_emits_event() {
        let (mut reg, clock) = setup();
        clock.advance(7);
        let id = create(&mut reg, "alice", 3, 5, &TallyRules::PLURALITY);
        assert_eq!(reg.expire(&id), Ok(12));
        assert_eq!(reg.finished(&id), Ok(false));
        assert_eq!(
            reg.events(),
            &[PollEvent::Created {
                id,
                creator: who("alice"),
                candidate_count: 3,
                uri: "".to_string(),
                expire_tick: 12
            }]
        );
    }

    #[test]
    fn identical_requests_get_distinct_ids() {
        let (mut reg, _) = setup();
        let a = create(&mut reg, "alice", 3, 5, &TallyRules::PLURALITY);
        let b = create(&mut reg, "alice", 3, 5, &TallyRules::PLURALITY);
        let c = create(&mut reg, "bob", 3, 5, &TallyRules::PLURALITY);
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(reg.poll_count(), 3);
    }

    #[test]
    fn enumeration() {
        let (mut reg, _) = setup();
        assert_eq!(reg.poll_count(), 0);
        assert_eq!(reg.owner_poll_count(&who("alice")), 0);
        let rules = TallyRules::PLURALITY;
        let a = reg
            .create_poll(&who("alice"), &PollRequest::new(3, "some_uri", 5, &rules))
            .unwrap();
        reg.create_poll(&who("bob"), &PollRequest::new(3, "other_uri", 5, &rules))
            .unwrap();
        reg.create_poll(&who("bob"), &PollRequest::new(3, "another_uri", 5, &rules))
            .unwrap();

        assert_eq!(reg.poll_count(), 3);
        assert_eq!(reg.owner_poll_count(&who("alice")), 1);
        assert_eq!(reg.owner_poll_count(&who("bob")), 2);

        let (first_id, first) = reg.poll_by_index(0).unwrap();
        assert_eq!(first_id, &a);
        assert_eq!(first.uri(), "some_uri");
        assert_eq!(reg.owner_poll_by_index(&who("alice"), 0), Ok(&a));
        let bob_second = reg.owner_poll_by_index(&who("bob"), 1).unwrap().clone();
        assert_eq!(reg.poll_by_hash(&bob_second).unwrap().uri(), "another_uri");

        assert_eq!(reg.poll_by_index(3).unwrap_err().kind(), "IndexOutOfRange");
        assert_eq!(
            reg.owner_poll_by_index(&who("carol"), 0).unwrap_err().kind(),
            "IndexOutOfRange"
        );
        assert_eq!(reg.poll_count_of(&who("bob")), 2);
        assert_eq!(reg.by_creator_index(&who("alice"), 0), Ok(&a));
        assert_eq!(reg.by_index(0).unwrap().0, &a);
        assert_eq!(reg.by_id(&a).unwrap().creator(), &who("alice"));
        let uris: Vec<&str> = reg.polls().map(|p| p.uri()).collect();
        assert_eq!(uris, vec!["some_uri", "other_uri", "another_uri"]);
    }

    #[test]
    fn unknown_poll() {
        let (mut reg, _) = setup();
        create(&mut reg, "owner", 3, 5, &TallyRules::PLURALITY);
        let id = PollId::from("0xc7d192c913a3e8099bc01a2520830ac822853710d241c1b13a1e68534e9676ed");
        let a = who("a");
        let kind = |r: PollResult<()>| r.unwrap_err().kind();
        assert_eq!(kind(reg.submit_vote(&id, Ballot::Single(1), &a)), "PollNotFound");
        assert_eq!(kind(reg.change_vote(&id, Ballot::Single(1), &a)), "PollNotFound");
        assert_eq!(kind(reg.close_poll(&id, &a).map(|_| ())), "PollNotFound");
        assert_eq!(kind(reg.votes_of(&id, 0, &a).map(|_| ())), "PollNotFound");
        assert_eq!(kind(reg.votes(&id, &a).map(|_| ())), "PollNotFound");
        assert_eq!(kind(reg.vote_of(&id, &a, &a).map(|_| ())), "PollNotFound");
        assert_eq!(kind(reg.did_vote(&id, &a, &a).map(|_| ())), "PollNotFound");
        assert_eq!(kind(reg.winners(&id).map(|_| ())), "PollNotFound");
        assert_eq!(kind(reg.expire(&id).map(|_| ())), "PollNotFound");
        assert_eq!(kind(reg.finished(&id).map(|_| ())), "PollNotFound");
    }

    #[test]
    fn creator_only_methods() {
        let (mut reg, _) = setup();
        let id = create(&mut reg, "owner", 3, 5, &TallyRules::PLURALITY);
        let a = who("a");
        assert_eq!(reg.votes(&id, &a).unwrap_err().kind(), "Unauthorized");
        assert_eq!(reg.votes_of(&id, 0, &a).unwrap_err().kind(), "Unauthorized");
        assert_eq!(reg.close_poll(&id, &a).unwrap_err().kind(), "Unauthorized");
        assert_eq!(reg.finished(&id), Ok(false));
    }

    #[test]
    fn creator_or_voter_methods() {
        let (mut reg, _) = setup();
        let creator = who("owner");
        let (a, b) = (who("a"), who("b"));
        let id = create(&mut reg, "owner", 3, 5, &TallyRules::PLURALITY);
        assert_eq!(
            reg.vote_of(&id, &a, &creator).unwrap_err().kind(),
            "VoterNotFound"
        );
        reg.submit_vote(&id, Ballot::Single(1), &a).unwrap();
        assert_eq!(reg.vote_of(&id, &a, &a), Ok(Ballot::Single(1)));
        assert_eq!(reg.vote_of(&id, &a, &creator), Ok(Ballot::Single(1)));
        assert_eq!(
            reg.vote_of(&id, &a, &b),
            Err(PollError::Unauthorized {
                caller: b.clone(),
                required: Access::CreatorOrVoter
            })
        );
        assert_eq!(reg.did_vote(&id, &a, &a), Ok(true));
        assert_eq!(reg.did_vote(&id, &b, &b), Ok(false));
        assert_eq!(reg.did_vote(&id, &b, &creator), Ok(false));
    }

    #[test]
    fn vote_and_change_vote() {
        let (mut reg, _) = setup();
        let creator = who("owner");
        let a = who("a");
        let id = create(&mut reg, "owner", 3, 5, &TallyRules::PLURALITY);
        assert_eq!(
            reg.change_vote(&id, Ballot::Single(0), &a).unwrap_err().kind(),
            "HasNotVoted"
        );
        reg.submit_vote(&id, Ballot::Single(1), &a).unwrap();
        assert_eq!(reg.votes_of(&id, 1, &creator), Ok(1));
        assert_eq!(reg.votes(&id, &creator), Ok(vec![0, 1, 0]));
        assert_eq!(
            reg.submit_vote(&id, Ballot::Single(0), &a).unwrap_err().kind(),
            "AlreadyVoted"
        );
        assert_eq!(
            reg.change_vote(&id, Ballot::Single(100), &a).unwrap_err().kind(),
            "CandidateNotFound"
        );
        reg.change_vote(&id, Ballot::Single(0), &a).unwrap();
        assert_eq!(reg.votes_of(&id, 1, &creator), Ok(0));
        assert_eq!(reg.votes_of(&id, 0, &creator), Ok(1));
        assert_eq!(
            reg.votes_of(&id, 100, &creator).unwrap_err().kind(),
            "CandidateNotFound"
        );
        assert_eq!(reg.voter_count(&id), Ok(1));
    }

    #[test]
    fn vote_after_explicit_close() {
        let (mut reg, _) = setup();
        let creator = who("owner");
        let id = create(&mut reg, "owner", 3, 15, &TallyRules::PLURALITY);
        reg.submit_vote(&id, Ballot::Single(1), &creator).unwrap();
        assert_eq!(reg.close_poll(&id, &creator), Ok(vec![1]));
        assert_eq!(
            reg.submit_vote(&id, Ballot::Single(1), &who("a")).unwrap_err().kind(),
            "PollAlreadyClosed"
        );
        assert_eq!(
            reg.change_vote(&id, Ballot::Single(0), &creator).unwrap_err().kind(),
            "PollAlreadyClosed"
        );
        assert_eq!(
            reg.close_poll(&id, &creator).unwrap_err().kind(),
            "PollAlreadyClosed"
        );
        assert_eq!(reg.finished(&id), Ok(true));
    }

    #[test]
    fn expiration_closes_the_poll_as_a_side_effect() {
        let (mut reg, clock) = setup();
        let creator = who("owner");
        let id = create(&mut reg, "owner", 3, 6, &TallyRules::PLURALITY);
        for (tick, voter, c) in [(0, "a", 0), (1, "b", 1), (1, "c", 1), (2, "d", 2), (2, "e", 2)] {
            clock.set(tick);
            reg.submit_vote(&id, Ballot::Single(c), &who(voter)).unwrap();
        }
        assert_eq!(reg.winners(&id).unwrap_err().kind(), "PollNotClosed");
        clock.set(7);
        assert_eq!(
            reg.submit_vote(&id, Ballot::Single(1), &who("f")),
            Err(PollError::PollExpired {
                id: id.clone(),
                expire_tick: 6
            })
        );
        assert_eq!(reg.finished(&id), Ok(true));
        assert_eq!(reg.votes_of(&id, 1, &creator), Ok(2));
        assert_eq!(reg.voter_count(&id), Ok(5));
        assert_eq!(
            closed_event(&reg),
            Some((vec![1, 2], CloseReason::Expired))
        );
        assert_eq!(reg.winners(&id), Ok(vec![1, 2]));
        // Once closed, later votes see a closed poll.
        assert_eq!(
            reg.submit_vote(&id, Ballot::Single(1), &who("f")).unwrap_err().kind(),
            "PollAlreadyClosed"
        );
    }

    #[test]
    fn expiration_is_checked_on_change_vote_too() {
        let (mut reg, clock) = setup();
        let id = create(&mut reg, "owner", 3, 5, &TallyRules::CONDORCET);
        reg.submit_vote(&id, Ballot::Ranked(vec![0, 1, 2]), &who("a"))
            .unwrap();
        clock.set(5);
        assert_eq!(
            reg.change_vote(&id, Ballot::Ranked(vec![2, 1, 0]), &who("a"))
                .unwrap_err()
                .kind(),
            "PollExpired"
        );
        assert_eq!(reg.winners(&id), Ok(vec![0]));
    }

    #[test]
    fn voter_cap_closes_the_poll() {
        let (mut reg, _) = setup();
        let rules = TallyRules::LEGACY_PLURALITY.with_max_voters(5);
        let id = create(&mut reg, "owner", 3, 100, &rules);
        for (voter, c) in [("a", 1), ("b", 1), ("c", 2), ("d", 2)] {
            reg.submit_vote(&id, Ballot::Single(c), &who(voter)).unwrap();
        }
        assert_eq!(reg.finished(&id), Ok(false));
        reg.submit_vote(&id, Ballot::Single(0), &who("e")).unwrap();
        assert_eq!(reg.finished(&id), Ok(true));
        assert_eq!(
            closed_event(&reg),
            Some((vec![1, 2], CloseReason::VoterCap))
        );
        assert_eq!(
            reg.close_poll(&id, &who("owner")).unwrap_err().kind(),
            "PollAlreadyClosed"
        );
    }

    #[test]
    fn zero_votes_per_variant() {
        let (mut reg, clock) = setup();
        let creator = who("owner");
        let current = create(&mut reg, "owner", 3, 5, &TallyRules::PLURALITY);
        let legacy = create(&mut reg, "owner", 3, 5, &TallyRules::LEGACY_PLURALITY);
        let condorcet = create(&mut reg, "owner", 3, 5, &TallyRules::CONDORCET);
        let schulze = create(&mut reg, "owner", 3, 5, &TallyRules::SCHULZE);
        clock.advance(5);
        assert_eq!(reg.close_poll(&current, &creator), Ok(vec![]));
        assert_eq!(reg.close_poll(&legacy, &creator), Ok(vec![0, 1, 2]));
        assert_eq!(reg.close_poll(&condorcet, &creator), Ok(vec![]));
        // No ballot, every path has strength zero: all candidates tie.
        assert_eq!(reg.close_poll(&schulze, &creator), Ok(vec![0, 1, 2]));
    }

    #[test]
    fn plurality_winners() {
        let (mut reg, _) = setup();
        let creator = who("owner");
        let id = create(&mut reg, "owner", 3, 5, &TallyRules::PLURALITY);
        for (voter, c) in [("a", 0), ("b", 1), ("c", 2), ("d", 2)] {
            reg.submit_vote(&id, Ballot::Single(c), &who(voter)).unwrap();
        }
        assert_eq!(reg.close_poll(&id, &creator), Ok(vec![2]));

        let id = create(&mut reg, "owner", 3, 5, &TallyRules::PLURALITY);
        for (voter, c) in [("a", 1), ("b", 1), ("c", 2), ("d", 2), ("e", 0)] {
            reg.submit_vote(&id, Ballot::Single(c), &who(voter)).unwrap();
        }
        reg.close_poll(&id, &creator).unwrap();
        assert_eq!(reg.winners(&id), Ok(vec![1, 2]));
        let votes = reg.votes(&id, &creator).unwrap();
        assert_eq!(votes.iter().sum::<u64>(), reg.voter_count(&id).unwrap() as u64);
    }

    #[test]
    fn simultaneous_polls_are_independent() {
        let (mut reg, _) = setup();
        let (owner, a) = (who("owner"), who("a"));
        let first = create(&mut reg, "owner", 3, 15, &TallyRules::PLURALITY);
        let second = create(&mut reg, "a", 3, 15, &TallyRules::PLURALITY);
        for (voter, c) in [("a", 0), ("b", 1), ("c", 2), ("d", 2)] {
            reg.submit_vote(&first, Ballot::Single(c), &who(voter)).unwrap();
            reg.submit_vote(&second, Ballot::Single(0), &who(voter)).unwrap();
        }
        assert_eq!(reg.close_poll(&first, &owner), Ok(vec![2]));
        assert_eq!(reg.finished(&second), Ok(false));
        assert_eq!(reg.close_poll(&second, &a), Ok(vec![0]));
    }

    #[test]
    fn condorcet_polls() {
        let (mut reg, _) = setup();
        let creator = who("owner");
        let id = create(&mut reg, "owner", 3, 5, &TallyRules::CONDORCET);
        assert_eq!(
            reg.submit_vote(&id, Ballot::Ranked(vec![2, 1]), &who("a"))
                .unwrap_err()
                .kind(),
            "MalformedBallot"
        );
        reg.submit_vote(&id, Ballot::Ranked(vec![2, 0, 1]), &creator)
            .unwrap();
        reg.change_vote(&id, Ballot::Ranked(vec![1, 2, 0]), &creator)
            .unwrap();
        assert_eq!(reg.votes_of(&id, 2, &creator), Ok(1));
        assert_eq!(reg.close_poll(&id, &creator), Ok(vec![2]));

        let id = create(&mut reg, "owner", 3, 5, &TallyRules::CONDORCET);
        for (voter, ranks) in [("a", [0, 1, 2]), ("b", [1, 2, 0]), ("c", [2, 0, 1])] {
            reg.submit_vote(&id, Ballot::Ranked(ranks.to_vec()), &who(voter))
                .unwrap();
        }
        assert_eq!(reg.close_poll(&id, &creator), Ok(vec![]));
    }

    #[test]
    fn schulze_several_draws() {
        let (mut reg, _) = setup();
        let creator = who("owner");
        let id = create(&mut reg, "owner", 4, 100, &TallyRules::SCHULZE);
        let piles: [(usize, [u32; 4]); 4] = [
            (3, [0, 1, 2, 3]),
            (2, [3, 0, 1, 2]),
            (2, [3, 1, 2, 0]),
            (2, [2, 1, 3, 0]),
        ];
        let mut voter = 0;
        for (n, order) in piles.iter() {
            for _ in 0..*n {
                let ballot = ranked_ballot(order).unwrap();
                reg.submit_vote(&id, ballot.clone(), &who(&format!("v{}", voter)))
                    .unwrap();
                assert_eq!(reg.vote_of(&id, &who(&format!("v{}", voter)), &creator), Ok(ballot));
                voter += 1;
            }
        }
        assert_eq!(reg.close_poll(&id, &creator), Ok(vec![1, 3]));
        let m = reg.pairwise(&id, &creator).unwrap();
        // B beats D 5 to 4, D beats A 6 to 3.
        assert_eq!((m.get(1, 3), m.get(3, 1)), (5, 4));
        assert_eq!((m.get(3, 0), m.get(0, 3)), (6, 3));
    }

    #[test]
    fn pairwise_needs_a_ranked_method() {
        let (mut reg, _) = setup();
        let id = create(&mut reg, "owner", 3, 5, &TallyRules::PLURALITY);
        assert_eq!(
            reg.pairwise(&id, &who("owner")).unwrap_err().kind(),
            "UnsupportedMethod"
        );
    }

    #[test]
    fn drain_events() {
        let (mut reg, _) = setup();
        let id = create(&mut reg, "owner", 2, 5, &TallyRules::PLURALITY);
        reg.close_poll(&id, &who("owner")).unwrap();
        let events = reg.drain_events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], PollEvent::Closed { reason: CloseReason::Explicit, .. }));
        assert!(reg.events().is_empty());
    }
}
