/*!

This is the long-form manual for `poll_tally` and `rankanizer`.

## Polls

A poll is created by a caller (its creator) with a number of candidates, an
opaque description URI, a duration in ticks and a set of [TallyRules](crate::TallyRules).
Candidates are only known by their index, from `0` to `candidate_count - 1`.

A poll is open until one of these happens:
* its creator calls `close_poll`
* a vote (submitted or changed) arrives at or after the expiration tick. The vote
  is rejected with `PollExpired`, and the poll is closed on the spot
* the number of voters reaches `max_voters`, when the rules set one

Once closed, a poll never reopens and its winners can be read by anyone.

## Access

| operation | who |
|-----------|-----|
| `create_poll`, `submit_vote`, `change_vote`, `winners`, `expire`, `finished`, enumeration | anyone |
| `close_poll`, `votes`, `votes_of`, `pairwise` | the poll's creator |
| `vote_of`, `did_vote` | the poll's creator, or the voter being asked about |
| `export` | the registry owner |

## Ballots

Plurality polls take `Ballot::Single(candidate)`.

Condorcet and Schulze polls take `Ballot::Ranked(ranks)` where `ranks[i]` is the rank
given to candidate `i` and `0` is the most preferred. Each rank from `0` to
`candidate_count - 1` must be used exactly once: ties and partial rankings are not
supported. The helper [ranked_ballot](crate::builder::ranked_ballot) builds such a
ballot from a list of candidates in order of preference.

A voter submits once with `submit_vote` and may then replace the ballot as often as
needed with `change_vote`, as long as the poll is open.

## Tally methods

### `plurality`

Each ballot counts one vote for its candidate. The winners are all the candidates with
the largest count. When nobody voted, the result depends on `zeroVotePolicy`:
* `noWinners` (the `PLURALITY` preset): no winner
* `allCandidates` (the `LEGACY_PLURALITY` preset): every candidate wins

The `PLURALITY` preset caps polls at 18 candidates. Whatever the rules say, plurality polls
stop at 4096 candidates and ranked polls at 256.

### `condorcet`

The registry maintains the pairwise matrix `d`, where `d[i][j]` is the number of
ballots ranking `i` ahead of `j`. A candidate wins when it beats every other
candidate: `d[i][j] > d[j][i]` for all `j`. There is at most one such candidate, and
there may be none (preference cycles, pairwise ties).

### `schulze`

Built on the same pairwise matrix. Each ordered pair gets a link strength, chosen
with `pathStrength`:
* `margin` (default): `d[i][j] - d[j][i]` when positive, else 0
* `winningVotes`: `d[i][j]` when `d[i][j] > d[j][i]`, else 0
* `raw`: `d[i][j]`

The strength of a path is the strength of its weakest link, and `p[i][j]` is the
strength of the strongest path from `i` to `j`. The winners are the candidates `i` with
`p[i][j] >= p[j][i]` for every `j`. There is always at least one winner; ties give
several.

## Reported counts

`votes` and `votes_of` report, for every method, the number of ballots that put
each candidate first. The pairwise matrix of the ranked methods is available
separately through `pairwise`.

## Snapshots

The registry owner can export every poll and its ballots as a JSON document
(schema version 2) and import it back. Aggregates are rebuilt from the ballots.
Version 1 documents name the method with a single tag (`plurality`,
`legacyPlurality`, `condorcet`, `schulze`) and are upgraded with
`snapshot::migrate`.

## Scenario files

The `rankanizer` program replays a scenario against a fresh registry and prints a
summary. Example:

```json
{
  "outputSettings": { "scenarioName": "lunch" },
  "owner": "owner",
  "polls": [
    { "label": "lunch", "creator": "alice", "candidateCount": 3, "duration": 10, "rules": "schulze" }
  ],
  "steps": [
    { "action": "submitVote", "poll": "lunch", "voter": "bob", "ballot": [0, 2, 1] },
    { "action": "advance", "ticks": 3 },
    { "action": "changeVote", "poll": "lunch", "voter": "bob", "ballot": [1, 0, 2] },
    { "action": "closePoll", "poll": "lunch", "caller": "alice" }
  ]
}
```

`rules` is either one of the preset names (`plurality`, `legacyPlurality`,
`condorcet`, `schulze`) or a full rules object:

```json
{ "method": "schulze", "maxCandidates": null, "maxVoters": 10,
  "zeroVotePolicy": "noWinners", "pathStrength": "winningVotes" }
```

Steps that are rejected by the registry do not stop the run: they are listed in the
`rejections` section of the summary, with the name of the error.
*/
