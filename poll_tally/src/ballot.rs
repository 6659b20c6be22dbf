use log::debug;
use snafu::prelude::*;
use std::collections::BTreeMap;

use crate::config::*;

/// What the registry remembers about one voter of one poll.
///
/// Once created, a record is never removed: `voted` stays true for the
/// lifetime of the poll and the ballot is only ever overwritten.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct VoterRecord {
    pub voted: bool,
    pub ballot: Ballot,
}

/// Per-poll map from voter identity to that voter's current ballot.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct BallotStore {
    records: BTreeMap<Identity, VoterRecord>,
}

impl BallotStore {
    pub fn new() -> BallotStore {
        BallotStore::default()
    }

    pub fn get(&self, voter: &Identity) -> Option<&VoterRecord> {
        self.records.get(voter)
    }

    pub fn did_vote(&self, voter: &Identity) -> bool {
        self.records.get(voter).map(|r| r.voted).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All the voters and their ballots, ordered by voter identity.
    pub fn iter(&self) -> impl Iterator<Item = (&Identity, &VoterRecord)> {
        self.records.iter()
    }

    /// Creates the record of a first-time voter.
    pub(crate) fn insert_first(&mut self, id: &PollId, voter: &Identity, ballot: Ballot) -> PollResult<()> {
        ensure!(
            !self.records.contains_key(voter),
            AlreadyVotedSnafu {
                id: id.clone(),
                voter: voter.clone()
            }
        );
        self.records.insert(
            voter.clone(),
            VoterRecord {
                voted: true,
                ballot,
            },
        );
        Ok(())
    }

    /// Overwrites the ballot of an existing voter and hands back the previous one.
    pub(crate) fn replace(&mut self, id: &PollId, voter: &Identity, ballot: Ballot) -> PollResult<Ballot> {
        let record = self.records.get_mut(voter).context(HasNotVotedSnafu {
            id: id.clone(),
            voter: voter.clone(),
        })?;
        Ok(std::mem::replace(&mut record.ballot, ballot))
    }
}

/// Checks that a ballot has the shape the poll expects.
///
/// Out-of-range entries are reported before shape problems, so a ranking such
/// as `[100, 1, 0]` is a missing candidate rather than a malformed ballot.
pub(crate) fn check_ballot(
    id: &PollId,
    ballot: &Ballot,
    method: TallyMethod,
    candidate_count: u32,
) -> PollResult<()> {
    match (method.is_ranked(), ballot) {
        (false, Ballot::Single(c)) => {
            ensure!(
                *c < candidate_count,
                CandidateNotFoundSnafu {
                    id: id.clone(),
                    candidate: *c
                }
            );
            Ok(())
        }
        (false, Ballot::Ranked(_)) => MalformedBallotSnafu {
            id: id.clone(),
            reason: "voting must be for only one candidate",
        }
        .fail(),
        (true, Ballot::Single(_)) => MalformedBallotSnafu {
            id: id.clone(),
            reason: "voting must be casted for all candidates",
        }
        .fail(),
        (true, Ballot::Ranked(ranks)) => {
            if let Some(bad) = ranks.iter().find(|r| **r >= candidate_count) {
                return CandidateNotFoundSnafu {
                    id: id.clone(),
                    candidate: *bad,
                }
                .fail();
            }
            ensure!(
                ranks.len() == candidate_count as usize,
                MalformedBallotSnafu {
                    id: id.clone(),
                    reason: format!(
                        "voting must be casted for all candidates ({} ranks for {} candidates)",
                        ranks.len(),
                        candidate_count
                    ),
                }
            );
            let mut seen = vec![false; candidate_count as usize];
            for r in ranks.iter() {
                let slot = &mut seen[*r as usize];
                if *slot {
                    debug!("check_ballot: rank {} used twice in {:?}", r, ranks);
                    return MalformedBallotSnafu {
                        id: id.clone(),
                        reason: format!("rank {} is used more than once", r),
                    }
                    .fail();
                }
                *slot = true;
            }
            Ok(())
        }
    }
}
