// ********* Input data structures ***********

use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use std::fmt::Display;

/// Abstract, monotonically increasing time unit used for expiration.
pub type Tick = u64;

/// Candidates are identified by their zero-based position in the poll.
pub type CandidateIndex = u32;

/// Opaque caller token, supplied by the host environment.
///
/// One token is one voter: the registry never tries to tell two tokens apart
/// beyond string equality.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(pub String);

impl From<&str> for Identity {
    fn from(s: &str) -> Self {
        Identity(s.to_string())
    }
}

impl Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Content-addressed identifier of a poll (lowercase hex SHA-256).
///
/// Identifiers are only ever produced by the registry. Building one from a
/// string is useful to look up an id received through an event.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PollId(pub(crate) String);

impl PollId {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for PollId {
    fn from(s: &str) -> Self {
        PollId(s.trim_start_matches("0x").to_lowercase())
    }
}

impl Display for PollId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", self.0)
    }
}

/// A ballot, as submitted by a voter.
///
/// The shape depends on the tally method of the poll:
/// - plurality polls take a single candidate index,
/// - Condorcet and Schulze polls take a full ranking: entry `i` is the rank
///   given to candidate `i` (0 is the most preferred). Every rank in
///   `[0, candidate_count)` must be used exactly once.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Ballot {
    Single(CandidateIndex),
    Ranked(Vec<u32>),
}

// ******** Output data structures *********

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CloseReason {
    /// The creator called `close_poll`.
    Explicit,
    /// A vote arrived at or after the expiration tick.
    Expired,
    /// The poll reached its maximum number of voters.
    VoterCap,
}

/// Notifications emitted by the registry, in the order they happened.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum PollEvent {
    Created {
        id: PollId,
        creator: Identity,
        candidate_count: u32,
        uri: String,
        expire_tick: Tick,
    },
    Closed {
        id: PollId,
        winners: Vec<CandidateIndex>,
        reason: CloseReason,
    },
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum PollStatus {
    Open,
    Closed,
}

/// The class of callers an operation is restricted to.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum Access {
    CreatorOnly,
    CreatorOrVoter,
    OwnerOnly,
    Anyone,
}

impl Display for Access {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Access::CreatorOnly => "the poll's creator",
            Access::CreatorOrVoter => "the poll's creator or the voter",
            Access::OwnerOnly => "the registry owner",
            Access::Anyone => "anyone",
        };
        write!(f, "{}", s)
    }
}

/// What the caller turned out to be for a given operation.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum Role {
    Creator,
    Voter,
    Owner,
    Anyone,
}

// ********* Errors **********

/// Every way an operation on the registry can be rejected.
///
/// A rejected operation leaves ballots and aggregates untouched. The only
/// state change that comes with an error is the implicit close performed when
/// a vote reaches an expired poll (`PollExpired`).
#[derive(Debug, Snafu, Clone, PartialEq, Eq)]
#[snafu(visibility(pub(crate)))]
pub enum PollError {
    #[snafu(display(
        "The list of candidates should have at least two elements (limit: {max:?}), got {count}"
    ))]
    InvalidCandidateCount { count: u32, max: Option<u32> },

    #[snafu(display("The duration of the poll must be greater than zero"))]
    InvalidDuration {},

    #[snafu(display("Invalid poll id {id}. This poll doesn't exist"))]
    PollNotFound { id: PollId },

    #[snafu(display("Index {index} is out of range ({len} entries)"))]
    IndexOutOfRange { index: usize, len: usize },

    #[snafu(display("Candidate {candidate} doesn't exist in poll {id}"))]
    CandidateNotFound { id: PollId, candidate: u32 },

    #[snafu(display("Malformed ballot for poll {id}: {reason}"))]
    MalformedBallot { id: PollId, reason: String },

    #[snafu(display("{voter} already voted in poll {id}, use changeVote instead"))]
    AlreadyVoted { id: PollId, voter: Identity },

    #[snafu(display("{voter} hasn't voted in poll {id}, use submitVote instead"))]
    HasNotVoted { id: PollId, voter: Identity },

    #[snafu(display("Voter {voter} must exist in poll {id}"))]
    VoterNotFound { id: PollId, voter: Identity },

    #[snafu(display("{caller} is not allowed to call this method, it requires {required}"))]
    Unauthorized { caller: Identity, required: Access },

    #[snafu(display("Poll {id} is closed already"))]
    PollAlreadyClosed { id: PollId },

    #[snafu(display("Poll {id} expired at tick {expire_tick}. No more votes allowed"))]
    PollExpired { id: PollId, expire_tick: Tick },

    #[snafu(display("Poll {id} is not closed yet"))]
    PollNotClosed { id: PollId },

    #[snafu(display("Poll {id} is tallied with {method}, which has no pairwise matrix"))]
    UnsupportedMethod { id: PollId, method: TallyMethod },

    #[snafu(display("Unsupported snapshot schema version {version}"))]
    UnsupportedSchema { version: u64 },

    #[snafu(display("Corrupt snapshot: {reason}"))]
    SnapshotCorrupt { reason: String },
}

impl PollError {
    /// The name of the variant, stable across message changes.
    pub fn kind(&self) -> &'static str {
        match self {
            PollError::InvalidCandidateCount { .. } => "InvalidCandidateCount",
            PollError::InvalidDuration {} => "InvalidDuration",
            PollError::PollNotFound { .. } => "PollNotFound",
            PollError::IndexOutOfRange { .. } => "IndexOutOfRange",
            PollError::CandidateNotFound { .. } => "CandidateNotFound",
            PollError::MalformedBallot { .. } => "MalformedBallot",
            PollError::AlreadyVoted { .. } => "AlreadyVoted",
            PollError::HasNotVoted { .. } => "HasNotVoted",
            PollError::VoterNotFound { .. } => "VoterNotFound",
            PollError::Unauthorized { .. } => "Unauthorized",
            PollError::PollAlreadyClosed { .. } => "PollAlreadyClosed",
            PollError::PollExpired { .. } => "PollExpired",
            PollError::PollNotClosed { .. } => "PollNotClosed",
            PollError::UnsupportedMethod { .. } => "UnsupportedMethod",
            PollError::UnsupportedSchema { .. } => "UnsupportedSchema",
            PollError::SnapshotCorrupt { .. } => "SnapshotCorrupt",
        }
    }
}

pub type PollResult<T> = Result<T, PollError>;

// ********* Configuration **********

/// The social-choice rule used to turn ballots into winners.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TallyMethod {
    Plurality,
    Condorcet,
    Schulze,
}

impl TallyMethod {
    pub fn is_ranked(&self) -> bool {
        !matches!(self, TallyMethod::Plurality)
    }

    /// Largest candidate count the method accepts, whatever the rules say.
    ///
    /// Ranked methods keep a `n * n` matrix and close in `O(n^3)`.
    pub fn candidate_ceiling(&self) -> u32 {
        match self {
            TallyMethod::Plurality => 4096,
            TallyMethod::Condorcet | TallyMethod::Schulze => 256,
        }
    }
}

impl Display for TallyMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TallyMethod::Plurality => "plurality",
            TallyMethod::Condorcet => "condorcet",
            TallyMethod::Schulze => "schulze",
        };
        write!(f, "{}", s)
    }
}

/// What a plurality poll returns when nobody voted.
///
/// The single-poll legacy deployment declared every candidate a winner, the
/// multi-poll registry declares none. Both are kept.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ZeroVotePolicy {
    NoWinners,
    AllCandidates,
}

/// How the Schulze method weighs a pairwise defeat before the widest-path
/// closure.
///
/// - `Margin`: `d[i][j] - d[j][i]` when positive, else 0.
/// - `WinningVotes`: `d[i][j]` when `d[i][j] > d[j][i]`, else 0.
/// - `Raw`: `d[i][j]`, unconditionally.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PathStrength {
    Margin,
    WinningVotes,
    Raw,
}

/// Rules attached to a poll at creation time.
///
/// Options that do not apply to the selected method are ignored.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct TallyRules {
    pub method: TallyMethod,
    #[serde(rename = "maxCandidates")]
    pub max_candidates: Option<u32>,
    /// The poll closes as soon as this many voters have submitted a ballot.
    #[serde(rename = "maxVoters")]
    pub max_voters: Option<u64>,
    #[serde(rename = "zeroVotePolicy")]
    pub zero_vote_policy: ZeroVotePolicy,
    #[serde(rename = "pathStrength")]
    pub path_strength: PathStrength,
}

impl TallyRules {
    /// Plurality as run by the multi-poll registry.
    pub const PLURALITY: TallyRules = TallyRules {
        method: TallyMethod::Plurality,
        max_candidates: Some(18),
        max_voters: None,
        zero_vote_policy: ZeroVotePolicy::NoWinners,
        path_strength: PathStrength::Margin,
    };

    /// Plurality as run by the original single-poll ballot.
    pub const LEGACY_PLURALITY: TallyRules = TallyRules {
        method: TallyMethod::Plurality,
        max_candidates: None,
        max_voters: None,
        zero_vote_policy: ZeroVotePolicy::AllCandidates,
        path_strength: PathStrength::Margin,
    };

    pub const CONDORCET: TallyRules = TallyRules {
        method: TallyMethod::Condorcet,
        max_candidates: None,
        max_voters: None,
        zero_vote_policy: ZeroVotePolicy::NoWinners,
        path_strength: PathStrength::Margin,
    };

    pub const SCHULZE: TallyRules = TallyRules {
        method: TallyMethod::Schulze,
        max_candidates: None,
        max_voters: None,
        zero_vote_policy: ZeroVotePolicy::NoWinners,
        path_strength: PathStrength::Margin,
    };

    pub fn with_max_voters(self, max_voters: u64) -> TallyRules {
        TallyRules {
            max_voters: Some(max_voters),
            ..self
        }
    }

    pub fn with_path_strength(self, path_strength: PathStrength) -> TallyRules {
        TallyRules {
            path_strength,
            ..self
        }
    }

    /// The cap that applies: `max_candidates` when set, bounded by the ceiling
    /// of the method.
    pub fn effective_max_candidates(&self) -> u32 {
        let ceiling = self.method.candidate_ceiling();
        self.max_candidates
            .map(|max| max.min(ceiling))
            .unwrap_or(ceiling)
    }

    /// Checks the candidate count against the floor of two and the method cap.
    pub fn check_candidate_count(&self, count: u32) -> PollResult<()> {
        let max = self.effective_max_candidates();
        ensure!(
            count >= 2 && count <= max,
            InvalidCandidateCountSnafu {
                count,
                max: Some(max)
            }
        );
        Ok(())
    }
}

impl Default for TallyRules {
    fn default() -> Self {
        TallyRules::PLURALITY
    }
}
