use clap::Parser;

/// Replays a poll scenario against a fresh registry and summarizes the outcome.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path) The JSON scenario to replay: the polls to create and the steps to apply to them.
    /// See the manual of the poll_tally crate for the format.
    #[clap(short, long, value_parser)]
    pub scenario: String,

    /// (file path) A reference summary in JSON format. If provided, rankanizer will
    /// check that the computed summary matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the summary will be written in JSON format to the given
    /// location. By default it is printed on the standard output.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
