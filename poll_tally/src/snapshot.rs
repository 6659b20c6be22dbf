//! Versioned export and import of a whole registry.
//!
//! A snapshot is a plain serde document. Aggregates are not stored: they are
//! rebuilt by replaying the ballots on import, so a snapshot can never carry
//! counts that disagree with its ballots.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::access::{AccessController, AccessRequest};
use crate::clock::TickSource;
use crate::config::*;
use crate::poll::Poll;
use crate::registry::PollRegistry;

pub const SCHEMA_VERSION: u64 = 2;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    #[serde(rename = "schemaVersion")]
    pub schema_version: u64,
    pub owner: Identity,
    /// In creation order.
    pub polls: Vec<PollRecord>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct PollRecord {
    pub id: PollId,
    pub creator: Identity,
    #[serde(rename = "candidateCount")]
    pub candidate_count: u32,
    pub uri: String,
    #[serde(rename = "createdTick")]
    pub created_tick: Tick,
    #[serde(rename = "expireTick")]
    pub expire_tick: Tick,
    pub closed: bool,
    pub rules: TallyRules,
    pub voters: Vec<VoterEntry>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct VoterEntry {
    pub voter: Identity,
    pub ballot: Ballot,
}

// Version 1 documents: the method is a bare tag and there are no rules.

#[derive(Debug, Deserialize)]
struct RegistrySnapshotV1 {
    owner: Identity,
    polls: Vec<PollRecordV1>,
}

#[derive(Debug, Deserialize)]
struct PollRecordV1 {
    id: PollId,
    creator: Identity,
    #[serde(rename = "candidateCount")]
    candidate_count: u32,
    uri: String,
    #[serde(rename = "createdTick")]
    created_tick: Tick,
    #[serde(rename = "expireTick")]
    expire_tick: Tick,
    closed: bool,
    method: String,
    voters: Vec<VoterEntry>,
}

fn corrupt(reason: impl ToString) -> PollError {
    SnapshotCorruptSnafu {
        reason: reason.to_string(),
    }
    .build()
}

fn preset_for_tag(tag: &str) -> PollResult<TallyRules> {
    match tag {
        "plurality" => Ok(TallyRules::PLURALITY),
        "legacyPlurality" => Ok(TallyRules::LEGACY_PLURALITY),
        "condorcet" => Ok(TallyRules::CONDORCET),
        "schulze" => Ok(TallyRules::SCHULZE),
        x => Err(corrupt(format!("unknown method tag {:?}", x))),
    }
}

/// Reads a snapshot document of any known schema version and upgrades it to
/// the current one.
pub fn migrate(doc: serde_json::Value) -> PollResult<RegistrySnapshot> {
    let version = doc
        .get("schemaVersion")
        .and_then(|v| v.as_u64())
        .context(SnapshotCorruptSnafu {
            reason: "missing schemaVersion",
        })?;
    match version {
        SCHEMA_VERSION => serde_json::from_value(doc).map_err(corrupt),
        1 => {
            let v1: RegistrySnapshotV1 = serde_json::from_value(doc).map_err(corrupt)?;
            info!("migrate: upgrading {} polls from schema 1", v1.polls.len());
            let mut polls = Vec::new();
            for p in v1.polls {
                let rules = preset_for_tag(p.method.as_str())?;
                polls.push(PollRecord {
                    id: p.id,
                    creator: p.creator,
                    candidate_count: p.candidate_count,
                    uri: p.uri,
                    created_tick: p.created_tick,
                    expire_tick: p.expire_tick,
                    closed: p.closed,
                    rules,
                    voters: p.voters,
                });
            }
            Ok(RegistrySnapshot {
                schema_version: SCHEMA_VERSION,
                owner: v1.owner,
                polls,
            })
        }
        version => UnsupportedSchemaSnafu { version }.fail(),
    }
}

pub fn to_json_string(snapshot: &RegistrySnapshot) -> PollResult<String> {
    serde_json::to_string_pretty(snapshot).map_err(corrupt)
}

/// Parses a snapshot, migrating older schema versions.
pub fn from_json_str(s: &str) -> PollResult<RegistrySnapshot> {
    let doc: serde_json::Value = serde_json::from_str(s).map_err(corrupt)?;
    migrate(doc)
}

impl PollRecord {
    fn from_poll(poll: &Poll) -> PollRecord {
        PollRecord {
            id: poll.id().clone(),
            creator: poll.creator().clone(),
            candidate_count: poll.candidate_count(),
            uri: poll.uri().to_string(),
            created_tick: poll.created_tick(),
            expire_tick: poll.expire_tick(),
            closed: poll.is_closed(),
            rules: poll.rules().clone(),
            voters: poll
                .ballots()
                .iter()
                .map(|(voter, record)| VoterEntry {
                    voter: voter.clone(),
                    ballot: record.ballot.clone(),
                })
                .collect(),
        }
    }

    fn into_poll(self) -> PollResult<Poll> {
        self.rules
            .check_candidate_count(self.candidate_count)
            .map_err(|e| corrupt(format!("poll {}: {}", self.id, e)))?;
        ensure!(
            self.expire_tick > self.created_tick,
            SnapshotCorruptSnafu {
                reason: format!("poll {} expires before it was created", self.id)
            }
        );
        let mut poll = Poll::new(
            self.id,
            self.creator,
            self.candidate_count,
            self.uri,
            self.created_tick,
            self.expire_tick,
            self.rules,
        );
        for entry in self.voters {
            poll.submit(&entry.voter, entry.ballot).map_err(corrupt)?;
        }
        if self.closed || poll.voter_cap_reached() {
            poll.mark_closed();
        }
        Ok(poll)
    }
}

impl<C: TickSource> PollRegistry<C> {
    /// Exports every poll with its ballots (registry owner only).
    pub fn export(&self, caller: &Identity) -> PollResult<RegistrySnapshot> {
        AccessController::authorize(
            Access::OwnerOnly,
            &AccessRequest {
                caller,
                owner: &self.owner,
                creator: None,
                voter: None,
            },
        )?;
        let polls: Vec<PollRecord> = self.polls().map(PollRecord::from_poll).collect();
        debug!("export: {} polls", polls.len());
        Ok(RegistrySnapshot {
            schema_version: SCHEMA_VERSION,
            owner: self.owner.clone(),
            polls,
        })
    }

    /// Rebuilds a registry from a snapshot, replaying every ballot.
    ///
    /// No event is emitted: the events of the exported registry were already
    /// handed out.
    pub fn import(snapshot: RegistrySnapshot, clock: C) -> PollResult<PollRegistry<C>> {
        ensure!(
            snapshot.schema_version == SCHEMA_VERSION,
            UnsupportedSchemaSnafu {
                version: snapshot.schema_version
            }
        );
        let mut registry = PollRegistry::new(snapshot.owner, clock);
        for record in snapshot.polls {
            ensure!(
                !registry.polls.contains_key(&record.id),
                SnapshotCorruptSnafu {
                    reason: format!("poll {} appears twice", record.id)
                }
            );
            registry.insert(record.into_poll()?);
        }
        info!("import: restored {} polls", registry.poll_count());
        Ok(registry)
    }
}
