use crate::scenario::*;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "scenarioName")]
    pub scenario_name: String,
    pub description: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub scenario: String,
    pub owner: String,
    pub description: Option<String>,
}

/// Either the name of a preset or a full rules object.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RulesSpec {
    Preset(String),
    Full(TallyRules),
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioPoll {
    pub label: String,
    pub creator: String,
    #[serde(rename = "candidateCount")]
    pub candidate_count: u32,
    pub uri: Option<String>,
    pub duration: Tick,
    pub rules: RulesSpec,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Step {
    SubmitVote {
        poll: String,
        voter: String,
        ballot: Ballot,
    },
    ChangeVote {
        poll: String,
        voter: String,
        ballot: Ballot,
    },
    ClosePoll {
        poll: String,
        caller: String,
    },
    Advance {
        ticks: Tick,
    },
}

impl Step {
    pub fn action(&self) -> &'static str {
        match self {
            Step::SubmitVote { .. } => "submitVote",
            Step::ChangeVote { .. } => "changeVote",
            Step::ClosePoll { .. } => "closePoll",
            Step::Advance { .. } => "advance",
        }
    }

    pub fn poll_label(&self) -> Option<&str> {
        match self {
            Step::SubmitVote { poll, .. }
            | Step::ChangeVote { poll, .. }
            | Step::ClosePoll { poll, .. } => Some(poll.as_str()),
            Step::Advance { .. } => None,
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    #[serde(rename = "outputSettings")]
    pub output_settings: OutputSettings,
    pub owner: String,
    pub polls: Vec<ScenarioPoll>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

pub fn read_scenario(path: &str) -> ScenarioResult<ScenarioConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: ScenarioConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(config)
}

pub fn read_summary(path: &str) -> ScenarioResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    debug!("read content: {:?}", contents);
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

pub fn validate_rules(spec: &RulesSpec) -> ScenarioResult<TallyRules> {
    let res = match spec {
        RulesSpec::Full(rules) => rules.clone(),
        RulesSpec::Preset(name) => match name.as_str() {
            "plurality" => TallyRules::PLURALITY,
            "legacyPlurality" => TallyRules::LEGACY_PLURALITY,
            "condorcet" => TallyRules::CONDORCET,
            "schulze" => TallyRules::SCHULZE,
            x => {
                whatever!("Unknown rules preset {:?}", x)
            }
        },
    };
    Ok(res)
}
