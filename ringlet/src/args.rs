//! The command line args for the ringlet bench tool

use clap::Parser;

/// Route synthetic keys over a bounded load hash ring
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Args {
    /// The path to the config file for ringlet
    #[clap(short, long, default_value = "ringlet.yml")]
    pub conf: String,
    /// The number of nodes to add to the ring
    #[clap(short, long, default_value_t = 8)]
    pub nodes: usize,
    /// The number of keys to route
    #[clap(short, long, default_value_t = 100_000)]
    pub keys: usize,
    /// Where to load and save benchmark results
    #[clap(short, long, default_value = "ringlet.bench")]
    pub bench_path: String,
    /// Save this runs results for the next run to compare against
    #[clap(short, long)]
    pub write: bool,
}
