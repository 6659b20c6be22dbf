use log::{debug, info, warn};

use poll_tally::*;
use snafu::{prelude::*, ErrorCompat, Snafu};

use std::collections::HashMap;
use std::fs;

use serde::{Deserialize, Serialize};
use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::scenario::config_reader::*;

pub mod config_reader;

#[derive(Debug, Snafu)]
pub enum ScenarioError {
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Error writing the summary to {path}"))]
    WritingSummary {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error reading the results of poll {label}"))]
    ReadingResults { source: PollError, label: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type ScenarioResult<T> = Result<T, ScenarioError>;

/// An operation of the scenario that the registry refused.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Rejection {
    /// Index in `steps`, or none for a poll that could not be created.
    pub step: Option<usize>,
    pub action: String,
    pub poll: Option<String>,
    pub error: String,
}

struct ScenarioRun {
    registry: PollRegistry<ManualClock>,
    clock: ManualClock,
    // label -> (id, creator)
    polls: HashMap<String, (PollId, Identity)>,
    rejections: Vec<Rejection>,
}

impl ScenarioRun {
    fn new(owner: &str) -> ScenarioRun {
        let clock = ManualClock::new();
        ScenarioRun {
            registry: PollRegistry::new(Identity::from(owner), clock.clone()),
            clock,
            polls: HashMap::new(),
            rejections: Vec::new(),
        }
    }

    fn create_polls(&mut self, polls: &[ScenarioPoll]) -> ScenarioResult<()> {
        for p in polls.iter() {
            let rules = validate_rules(&p.rules)?;
            let request = PollRequest::new(
                p.candidate_count,
                p.uri.clone().unwrap_or_default().as_str(),
                p.duration,
                &rules,
            );
            let creator = Identity::from(p.creator.as_str());
            match self.registry.create_poll(&creator, &request) {
                Ok(id) => {
                    info!("Poll {:?} has id {}", p.label, id);
                    self.polls.insert(p.label.clone(), (id, creator));
                }
                Err(e) => {
                    warn!("Could not create poll {:?}: {}", p.label, e);
                    self.rejections.push(Rejection {
                        step: None,
                        action: "createPoll".to_string(),
                        poll: Some(p.label.clone()),
                        error: e.kind().to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    fn poll_id(&self, label: &str) -> PollResult<PollId> {
        // A label that names no created poll is a poll that does not exist.
        match self.polls.get(label) {
            Some((id, _)) => Ok(id.clone()),
            None => Err(PollError::PollNotFound {
                id: PollId::from(label),
            }),
        }
    }

    fn apply(&mut self, step: &Step) -> PollResult<()> {
        match step {
            Step::SubmitVote {
                poll,
                voter,
                ballot,
            } => {
                let id = self.poll_id(poll)?;
                self.registry
                    .submit_vote(&id, ballot.clone(), &Identity::from(voter.as_str()))
            }
            Step::ChangeVote {
                poll,
                voter,
                ballot,
            } => {
                let id = self.poll_id(poll)?;
                self.registry
                    .change_vote(&id, ballot.clone(), &Identity::from(voter.as_str()))
            }
            Step::ClosePoll { poll, caller } => {
                let id = self.poll_id(poll)?;
                let winners = self
                    .registry
                    .close_poll(&id, &Identity::from(caller.as_str()))?;
                info!("Poll {:?} closed, winners: {:?}", poll, winners);
                Ok(())
            }
            Step::Advance { ticks } => {
                let now = self.clock.advance(*ticks);
                debug!("Clock advanced to tick {}", now);
                Ok(())
            }
        }
    }

    fn run_steps(&mut self, steps: &[Step]) {
        for (idx, step) in steps.iter().enumerate() {
            if let Err(e) = self.apply(step) {
                warn!("Step {} ({}) rejected: {}", idx, step.action(), e);
                self.rejections.push(Rejection {
                    step: Some(idx),
                    action: step.action().to_string(),
                    poll: step.poll_label().map(|s| s.to_string()),
                    error: e.kind().to_string(),
                });
            }
        }
    }

    fn close_reason(&self, id: &PollId) -> Option<CloseReason> {
        self.registry.events().iter().find_map(|e| match e {
            PollEvent::Closed {
                id: closed_id,
                reason,
                ..
            } if closed_id == id => Some(*reason),
            _ => None,
        })
    }

    fn poll_result_js(&self, label: &str) -> ScenarioResult<Option<JSValue>> {
        let (id, creator) = match self.polls.get(label) {
            Some(x) => x,
            None => return Ok(None),
        };
        let poll = self
            .registry
            .poll_by_hash(id)
            .context(ReadingResultsSnafu { label })?;
        let votes = self
            .registry
            .votes(id, creator)
            .context(ReadingResultsSnafu { label })?;
        Ok(Some(json!({
            "label": label,
            "method": poll.method().to_string(),
            "closed": poll.is_closed(),
            "closeReason": self.close_reason(id),
            "expireTick": poll.expire_tick(),
            "voterCount": poll.ballots().len(),
            "votes": votes,
            "winners": self.registry.winners(id).ok(),
        })))
    }
}

/// Replays the scenario against a fresh registry and returns the summary.
pub fn build_summary(config: &ScenarioConfig) -> ScenarioResult<JSValue> {
    let mut run = ScenarioRun::new(config.owner.as_str());
    run.create_polls(&config.polls)?;
    run.run_steps(&config.steps);

    let mut results: Vec<JSValue> = Vec::new();
    for p in config.polls.iter() {
        if let Some(js) = run.poll_result_js(p.label.as_str())? {
            results.push(js);
        }
    }
    info!(
        "Scenario {:?}: {} polls, {} steps, {} rejected",
        config.output_settings.scenario_name,
        results.len(),
        config.steps.len(),
        run.rejections.len()
    );
    let c = OutputConfig {
        scenario: config.output_settings.scenario_name.clone(),
        owner: config.owner.clone(),
        description: config.output_settings.description.clone(),
    };
    Ok(json!({
        "config": c,
        "results": results,
        "rejections": run.rejections,
    }))
}

pub fn run_scenario(
    scenario_path: &str,
    check_summary_path: Option<String>,
    out: Option<String>,
) -> ScenarioResult<()> {
    let config = read_scenario(scenario_path)?;
    info!("config: {:?}", config);

    let summary_js = build_summary(&config)?;
    let pretty_js_stats = serde_json::to_string_pretty(&summary_js).context(ParsingJsonSnafu {})?;

    match out {
        Some(path) if path != "stdout" => {
            fs::write(path.as_str(), pretty_js_stats.as_str())
                .context(WritingSummarySnafu { path: path.clone() })?;
            info!("Summary written to {}", path);
        }
        _ => println!("{}", pretty_js_stats),
    }

    // The reference summary, if provided for comparison
    if let Some(summary_p) = check_summary_path {
        let summary_ref = read_summary(summary_p.as_str())?;
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
        if pretty_js_summary_ref != pretty_js_stats {
            warn!("Found differences with the reference string");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_stats.as_ref(),
                "\n",
            );
            whatever!("Difference detected between calculated summary and reference summary")
        }
    }
    Ok(())
}

fn run_scenario_test(test_name: &str, scenario_lpath: &str, summary_lpath: &str) {
    let test_dir = option_env!("RANKANIZER_TEST_DIR")
        .unwrap_or(concat!(env!("CARGO_MANIFEST_DIR"), "/testdata"));
    info!("Running test {}", test_name);
    let res = run_scenario(
        format!("{}/{}/{}", test_dir, test_name, scenario_lpath).as_str(),
        Some(format!("{}/{}/{}", test_dir, test_name, summary_lpath)),
        None,
    );
    if let Err(e) = res {
        eprintln!("An error occured {}", e);
        if let Some(bt) = ErrorCompat::backtrace(&e) {
            eprintln!("trace: {}", bt);
        }
        panic!("Scenario {} failed: {}", test_name, e);
    }
}

pub fn test_wrapper(test_name: &str) {
    run_scenario_test(
        test_name,
        format!("{}_scenario.json", test_name).as_str(),
        format!("{}_expected_summary.json", test_name).as_str(),
    )
}
