//! Benchmarks ringlet lookups

use owo_colors::OwoColorize;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rkyv::util::AlignedVec;
use rkyv::{Archive, Deserialize, Serialize};

use crate::errors::Errors;

/// Print a benchmark result with colors
macro_rules! print_bench {
    ($name:expr, $prior:expr, $current:expr) => {
        let diff = match $prior.cmp(&$current) {
            Ordering::Less => {
                // get the difference to check if its a large change
                let diff = $current - $prior;
                // get the % change
                let change = diff.as_nanos() as f64 / $prior.as_nanos().max(1) as f64;
                // convert our change to a %
                let change_percent = change * 100.0;
                // check if this change is more then 2%
                if diff.as_nanos() as f64 > ($prior.as_nanos() as f64 * 0.02) {
                    format!("+{:.2?} (+{:.2}%)", diff, change_percent)
                        .bright_red()
                        .to_string()
                } else {
                    format!("+{:.2?} (+{:.2}%)", diff, change_percent)
                        .bright_blue()
                        .to_string()
                }
            }
            Ordering::Equal => format!("{:.2?} (0.00%)", Duration::from_secs(0))
                .bright_blue()
                .to_string(),
            Ordering::Greater => {
                // get the difference to check if its a large change
                let diff = $prior - $current;
                // get the % change
                let change = diff.as_nanos() as f64 / $prior.as_nanos() as f64;
                // convert our change to a %
                let change_percent = change * 100.0;
                format!("-{:.2?} (-{:.2}%)", diff, change_percent)
                    .bright_green()
                    .to_string()
            }
        };
        // print our result and the change
        println!("{}: {:.2?} ({})", $name, $current, diff);
    };
}

/// A benchmarks results
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct BenchResult {
    /// The slowest lookup
    pub max: Duration,
    /// The average lookup
    pub avg: Duration,
    /// The fastest lookup
    pub min: Duration,
    /// The total time the whole run took
    pub total: Duration,
}

impl BenchResult {
    /// Summarize a set of lookup times
    ///
    /// Returns `None` if no lookups were timed.
    ///
    /// # Arguments
    ///
    /// * `times` - The time each lookup took
    /// * `total` - The total time the run took
    pub fn summarize(times: &[Duration], total: Duration) -> Option<Self> {
        // find the maximum and minimum
        let max = times.iter().max()?;
        let min = times.iter().min()?;
        // find the average in nano seconds
        let sum = times.iter().map(Duration::as_nanos).sum::<u128>();
        let avg = Duration::from_nanos((sum / times.len() as u128) as u64);
        Some(BenchResult {
            max: *max,
            avg,
            min: *min,
            total,
        })
    }
}

/// A benchmarking tool for ringlet
pub struct Bencher {
    /// The total timer
    total_timer: Instant,
    /// The timer for a specific instance
    instance: Option<Instant>,
    /// The instance times recorded by this bencher
    instance_times: Vec<Duration>,
    /// The path to write our benchmarks too
    path: PathBuf,
    /// The last run's results
    prior: Option<BenchResult>,
}

impl Bencher {
    /// Create a new bencher and load old results from disk if they exist
    ///
    /// # Arguments
    ///
    /// * `path` - The path to load old results from
    /// * `instances` - The number of instances this bencher will time
    pub fn new<P: AsRef<Path>>(path: P, instances: usize) -> Result<Self, Errors> {
        // check if we have any prior benchmark results
        let prior = if path.as_ref().exists() {
            // load our prior results from disk
            let buff = std::fs::read(&path)?;
            // copy them into an aligned buffer so they can be accessed
            let mut aligned = AlignedVec::<16>::with_capacity(buff.len());
            aligned.extend_from_slice(&buff);
            // deserialize our prior results
            Some(rkyv::from_bytes::<BenchResult, rkyv::rancor::Error>(
                &aligned,
            )?)
        } else {
            None
        };
        // build our bencher
        Ok(Bencher {
            total_timer: Instant::now(),
            instance: None,
            instance_times: Vec::with_capacity(instances),
            path: path.as_ref().to_path_buf(),
            prior,
        })
    }

    /// Start a new instance timer
    pub fn instance_start(&mut self) {
        self.instance = Some(Instant::now());
    }

    /// Stop the current instance timer
    pub fn instance_stop(&mut self) {
        if let Some(instance) = self.instance.take() {
            self.instance_times.push(instance.elapsed());
        }
    }

    /// Print the latest benchmark results to screen
    pub fn print(&self, result: &BenchResult) {
        // if we have prior results then also log the difference
        if let Some(prior) = &self.prior {
            print_bench!("max", prior.max, result.max);
            print_bench!("average", prior.avg, result.avg);
            print_bench!("min", prior.min, result.min);
            print_bench!("total", prior.total, result.total);
        } else {
            println!("max: {:?}", result.max);
            println!("average: {:?}", result.avg);
            println!("min: {:?}", result.min);
            println!("total: {:?}", result.total);
        }
    }

    /// Get our total times and write them to disk if needed
    ///
    /// # Arguments
    ///
    /// * `write` - Whether to save these results for the next run
    pub fn finish(&mut self, write: bool) -> Result<Option<BenchResult>, Errors> {
        // summarize our timings
        let Some(result) =
            BenchResult::summarize(&self.instance_times, self.total_timer.elapsed())
        else {
            return Ok(None);
        };
        // print our results
        self.print(&result);
        // write a new benchmark to disk if requested
        if write {
            // serialize our latest benchmark
            let archived = rkyv::to_bytes::<rkyv::rancor::Error>(&result)?;
            // write our archived benchmark to disk
            std::fs::write(&self.path, archived)?;
        }
        Ok(Some(result))
    }
}
