pub use crate::config::*;
use snafu::prelude::*;

/// Everything the registry needs to open a poll.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct PollRequest {
    pub candidate_count: u32,
    pub uri: String,
    /// Number of ticks the poll stays open, counted from creation.
    pub duration: Tick,
    pub rules: TallyRules,
}

impl PollRequest {
    pub fn new(candidate_count: u32, uri: &str, duration: Tick, rules: &TallyRules) -> PollRequest {
        PollRequest {
            candidate_count,
            uri: uri.to_string(),
            duration,
            rules: rules.clone(),
        }
    }

    pub fn validate(&self) -> PollResult<()> {
        self.rules.check_candidate_count(self.candidate_count)?;
        ensure!(self.duration > 0, InvalidDurationSnafu {});
        Ok(())
    }
}

/// A builder for poll requests, validating each setting as it is given.
///
/// ```
/// use poll_tally::builder::Builder;
/// use poll_tally::{PollError, TallyRules};
///
/// let request = Builder::new(&TallyRules::SCHULZE)
///     .candidates(4)?
///     .uri("ipfs://poll-description")
///     .duration(100)?
///     .build()?;
///
/// assert_eq!(request.candidate_count, 4);
/// # Ok::<(), PollError>(())
/// ```
pub struct Builder {
    pub(crate) _rules: TallyRules,
    pub(crate) _candidate_count: Option<u32>,
    pub(crate) _uri: String,
    pub(crate) _duration: Option<Tick>,
}

impl Builder {
    pub fn new(rules: &TallyRules) -> Builder {
        Builder {
            _rules: rules.clone(),
            _candidate_count: None,
            _uri: String::new(),
            _duration: None,
        }
    }

    pub fn candidates(self, count: u32) -> PollResult<Builder> {
        self._rules.check_candidate_count(count)?;
        Ok(Builder {
            _candidate_count: Some(count),
            ..self
        })
    }

    pub fn uri(self, uri: &str) -> Builder {
        Builder {
            _uri: uri.to_string(),
            ..self
        }
    }

    pub fn duration(self, ticks: Tick) -> PollResult<Builder> {
        ensure!(ticks > 0, InvalidDurationSnafu {});
        Ok(Builder {
            _duration: Some(ticks),
            ..self
        })
    }

    pub fn max_voters(self, max_voters: u64) -> Builder {
        Builder {
            _rules: self._rules.clone().with_max_voters(max_voters),
            ..self
        }
    }

    pub fn build(self) -> PollResult<PollRequest> {
        let request = PollRequest {
            candidate_count: self._candidate_count.unwrap_or(0),
            uri: self._uri,
            duration: self._duration.unwrap_or(0),
            rules: self._rules,
        };
        request.validate()?;
        Ok(request)
    }
}

/// Builds a ranked ballot from a preference order.
///
/// `order` lists candidate indices from the most to the least preferred. The
/// result gives, for each candidate, its rank. Returns `None` when `order` is
/// not a permutation of `0..order.len()`.
///
/// ```
/// use poll_tally::builder::ranked_ballot;
/// use poll_tally::Ballot;
///
/// // D first, then A, B, C.
/// assert_eq!(ranked_ballot(&[3, 0, 1, 2]), Some(Ballot::Ranked(vec![1, 2, 3, 0])));
/// ```
pub fn ranked_ballot(order: &[CandidateIndex]) -> Option<Ballot> {
    let mut ranks: Vec<Option<u32>> = vec![None; order.len()];
    for (rank, cid) in order.iter().enumerate() {
        let slot = ranks.get_mut(*cid as usize)?;
        if slot.is_some() {
            return None;
        }
        *slot = Some(rank as u32);
    }
    ranks.into_iter().collect::<Option<Vec<u32>>>().map(Ballot::Ranked)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_checks_settings() {
        assert_eq!(
            Builder::new(&TallyRules::PLURALITY)
                .candidates(1)
                .err()
                .map(|e| e.kind()),
            Some("InvalidCandidateCount")
        );
        assert_eq!(
            Builder::new(&TallyRules::PLURALITY)
                .duration(0)
                .err()
                .map(|e| e.kind()),
            Some("InvalidDuration")
        );
        // Nothing set at all.
        assert!(Builder::new(&TallyRules::PLURALITY).build().is_err());

        let request = Builder::new(&TallyRules::LEGACY_PLURALITY)
            .candidates(3)
            .unwrap()
            .duration(5)
            .unwrap()
            .max_voters(5)
            .build()
            .unwrap();
        assert_eq!(request.rules.max_voters, Some(5));
        assert_eq!(request.uri, "");
    }

    #[test]
    fn ranked_ballot_rejects_non_permutations() {
        assert_eq!(ranked_ballot(&[0, 0, 1]), None);
        assert_eq!(ranked_ballot(&[0, 3, 1]), None);
        assert_eq!(ranked_ballot(&[2, 0, 1]), Some(Ballot::Ranked(vec![1, 2, 0])));
    }
}
