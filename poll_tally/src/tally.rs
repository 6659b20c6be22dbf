use log::{debug, warn};

use crate::config::*;

/// A tabulation rule with an incrementally maintained aggregate.
///
/// Ballots handed to a strategy have already been validated against the poll,
/// so the strategy only has to account for them.
pub trait TallyStrategy {
    /// Adds the contribution of a ballot.
    fn apply(&mut self, ballot: &Ballot);

    /// Removes the contribution of a ballot that was applied before.
    fn revoke(&mut self, ballot: &Ballot);

    /// For each candidate, the number of ballots that put it first.
    fn first_preferences(&self) -> &[u64];

    /// The winner set, sorted by candidate index. Ties produce several winners.
    fn winners(&self) -> Vec<CandidateIndex>;
}

// ********* Plurality *********

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct PluralityTally {
    counts: Vec<u64>,
    zero_vote_policy: ZeroVotePolicy,
}

impl PluralityTally {
    pub fn new(candidate_count: u32, zero_vote_policy: ZeroVotePolicy) -> PluralityTally {
        PluralityTally {
            counts: vec![0; candidate_count as usize],
            zero_vote_policy,
        }
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }
}

impl TallyStrategy for PluralityTally {
    fn apply(&mut self, ballot: &Ballot) {
        match ballot {
            Ballot::Single(c) => self.counts[*c as usize] += 1,
            Ballot::Ranked(_) => warn!("PluralityTally: ignoring ranked ballot {:?}", ballot),
        }
    }

    fn revoke(&mut self, ballot: &Ballot) {
        match ballot {
            Ballot::Single(c) => self.counts[*c as usize] -= 1,
            Ballot::Ranked(_) => warn!("PluralityTally: ignoring ranked ballot {:?}", ballot),
        }
    }

    fn first_preferences(&self) -> &[u64] {
        &self.counts
    }

    fn winners(&self) -> Vec<CandidateIndex> {
        if self.total() == 0 {
            return match self.zero_vote_policy {
                ZeroVotePolicy::NoWinners => vec![],
                ZeroVotePolicy::AllCandidates => (0..self.counts.len() as u32).collect(),
            };
        }
        let max_count = self.counts.iter().cloned().max().unwrap_or(0);
        self.counts
            .iter()
            .enumerate()
            .filter_map(|(idx, c)| {
                if *c == max_count {
                    Some(idx as u32)
                } else {
                    None
                }
            })
            .collect()
    }
}

// ********* Pairwise preferences *********

/// `get(i, j)` is the number of ballots ranking candidate `i` strictly ahead of `j`.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct PairwiseMatrix {
    size: usize,
    cells: Vec<u64>,
}

impl PairwiseMatrix {
    pub fn new(size: usize) -> PairwiseMatrix {
        PairwiseMatrix {
            size,
            cells: vec![0; size * size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, i: usize, j: usize) -> u64 {
        self.cells[i * self.size + j]
    }

    /// The matrix as a list of rows.
    pub fn rows(&self) -> Vec<Vec<u64>> {
        self.cells.chunks(self.size.max(1)).map(|r| r.to_vec()).collect()
    }

    fn add_ranking(&mut self, ranks: &[u32]) {
        self.visit_ranking(ranks, |cell| *cell += 1);
    }

    fn remove_ranking(&mut self, ranks: &[u32]) {
        self.visit_ranking(ranks, |cell| *cell -= 1);
    }

    fn visit_ranking(&mut self, ranks: &[u32], mut f: impl FnMut(&mut u64)) {
        for (i, ri) in ranks.iter().enumerate() {
            for (j, rj) in ranks.iter().enumerate() {
                if ri < rj {
                    f(&mut self.cells[i * self.size + j]);
                }
            }
        }
    }
}

/// Condorcet pairwise method: the winner, if any, beats every other
/// candidate by a strict majority of the ballots.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct PairwiseTally {
    matrix: PairwiseMatrix,
    first: Vec<u64>,
}

impl PairwiseTally {
    pub fn new(candidate_count: u32) -> PairwiseTally {
        PairwiseTally {
            matrix: PairwiseMatrix::new(candidate_count as usize),
            first: vec![0; candidate_count as usize],
        }
    }

    pub fn matrix(&self) -> &PairwiseMatrix {
        &self.matrix
    }

    fn first_choice(ranks: &[u32]) -> Option<usize> {
        ranks.iter().position(|r| *r == 0)
    }
}

impl TallyStrategy for PairwiseTally {
    fn apply(&mut self, ballot: &Ballot) {
        match ballot {
            Ballot::Ranked(ranks) => {
                self.matrix.add_ranking(ranks);
                if let Some(c) = PairwiseTally::first_choice(ranks) {
                    self.first[c] += 1;
                }
            }
            Ballot::Single(_) => warn!("PairwiseTally: ignoring single ballot {:?}", ballot),
        }
    }

    fn revoke(&mut self, ballot: &Ballot) {
        match ballot {
            Ballot::Ranked(ranks) => {
                self.matrix.remove_ranking(ranks);
                if let Some(c) = PairwiseTally::first_choice(ranks) {
                    self.first[c] -= 1;
                }
            }
            Ballot::Single(_) => warn!("PairwiseTally: ignoring single ballot {:?}", ballot),
        }
    }

    fn first_preferences(&self) -> &[u64] {
        &self.first
    }

    fn winners(&self) -> Vec<CandidateIndex> {
        let n = self.matrix.size();
        let res: Vec<CandidateIndex> = (0..n)
            .filter(|&i| {
                (0..n)
                    .filter(|&j| j != i)
                    .all(|j| self.matrix.get(i, j) > self.matrix.get(j, i))
            })
            .map(|i| i as u32)
            .collect();
        debug!("PairwiseTally::winners: {:?}", res);
        res
    }
}

// ********* Schulze *********

/// Schulze method, on top of the same pairwise matrix.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SchulzeTally {
    pairwise: PairwiseTally,
    strength: PathStrength,
}

impl SchulzeTally {
    pub fn new(candidate_count: u32, strength: PathStrength) -> SchulzeTally {
        SchulzeTally {
            pairwise: PairwiseTally::new(candidate_count),
            strength,
        }
    }

    pub fn matrix(&self) -> &PairwiseMatrix {
        self.pairwise.matrix()
    }

    fn link_strength(&self, i: usize, j: usize) -> u64 {
        let m = self.pairwise.matrix();
        let (d_ij, d_ji) = (m.get(i, j), m.get(j, i));
        match self.strength {
            PathStrength::Margin => d_ij.saturating_sub(d_ji),
            PathStrength::WinningVotes if d_ij > d_ji => d_ij,
            PathStrength::WinningVotes => 0,
            PathStrength::Raw => d_ij,
        }
    }

    /// Widest-path closure: `p[i][j]` is the strength of the strongest path
    /// from `i` to `j`, where a path is as strong as its weakest link.
    pub fn strongest_paths(&self) -> Vec<Vec<u64>> {
        let n = self.pairwise.matrix().size();
        let mut p: Vec<Vec<u64>> = (0..n)
            .map(|i| {
                (0..n)
                    .map(|j| if i == j { 0 } else { self.link_strength(i, j) })
                    .collect()
            })
            .collect();
        for k in 0..n {
            for i in 0..n {
                if i == k {
                    continue;
                }
                for j in 0..n {
                    if j == k || j == i {
                        continue;
                    }
                    let through_k = p[i][k].min(p[k][j]);
                    if through_k > p[i][j] {
                        p[i][j] = through_k;
                    }
                }
            }
        }
        debug!("SchulzeTally::strongest_paths: {:?}", p);
        p
    }
}

impl TallyStrategy for SchulzeTally {
    fn apply(&mut self, ballot: &Ballot) {
        self.pairwise.apply(ballot)
    }

    fn revoke(&mut self, ballot: &Ballot) {
        self.pairwise.revoke(ballot)
    }

    fn first_preferences(&self) -> &[u64] {
        self.pairwise.first_preferences()
    }

    fn winners(&self) -> Vec<CandidateIndex> {
        let p = self.strongest_paths();
        let n = p.len();
        (0..n)
            .filter(|&i| (0..n).filter(|&j| j != i).all(|j| p[i][j] >= p[j][i]))
            .map(|i| i as u32)
            .collect()
    }
}

// ********* Dispatch *********

/// The aggregate owned by a poll, selected by its `TallyMethod`.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum Tally {
    Plurality(PluralityTally),
    Condorcet(PairwiseTally),
    Schulze(SchulzeTally),
}

impl Tally {
    pub fn new(rules: &TallyRules, candidate_count: u32) -> Tally {
        match rules.method {
            TallyMethod::Plurality => {
                Tally::Plurality(PluralityTally::new(candidate_count, rules.zero_vote_policy))
            }
            TallyMethod::Condorcet => Tally::Condorcet(PairwiseTally::new(candidate_count)),
            TallyMethod::Schulze => {
                Tally::Schulze(SchulzeTally::new(candidate_count, rules.path_strength))
            }
        }
    }

    /// The pairwise matrix, for the ranked methods.
    pub fn pairwise(&self) -> Option<&PairwiseMatrix> {
        match self {
            Tally::Plurality(_) => None,
            Tally::Condorcet(t) => Some(t.matrix()),
            Tally::Schulze(t) => Some(t.matrix()),
        }
    }

    fn strategy(&self) -> &dyn TallyStrategy {
        match self {
            Tally::Plurality(t) => t,
            Tally::Condorcet(t) => t,
            Tally::Schulze(t) => t,
        }
    }

    fn strategy_mut(&mut self) -> &mut dyn TallyStrategy {
        match self {
            Tally::Plurality(t) => t,
            Tally::Condorcet(t) => t,
            Tally::Schulze(t) => t,
        }
    }
}

impl TallyStrategy for Tally {
    fn apply(&mut self, ballot: &Ballot) {
        self.strategy_mut().apply(ballot)
    }

    fn revoke(&mut self, ballot: &Ballot) {
        self.strategy_mut().revoke(ballot)
    }

    fn first_preferences(&self) -> &[u64] {
        self.strategy().first_preferences()
    }

    fn winners(&self) -> Vec<CandidateIndex> {
        self.strategy().winners()
    }
}
