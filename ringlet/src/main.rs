//! Routes synthetic keys over a bounded load hash ring and reports the spread

use clap::Parser;
use owo_colors::OwoColorize;
use tracing::{info, instrument};

mod args;

use args::Args;
use ringlet::bencher::Bencher;
use ringlet::errors::Errors;
use ringlet::{trace, Conf, ConsistentHash, RingError};

/// Route every key with bounded loads, returning the node each key landed on
///
/// # Arguments
///
/// * `ring` - The ring to route over
/// * `bencher` - The bencher to time each lookup with
/// * `keys` - The keys to route
#[instrument(name = "route", skip_all, err(Debug))]
fn route(
    ring: &ConsistentHash,
    bencher: &mut Bencher,
    keys: &[String],
) -> Result<Vec<String>, Errors> {
    let mut assigned = Vec::with_capacity(keys.len());
    for key in keys {
        // time just our lookup
        bencher.instance_start();
        let node = ring.get_least(key)?;
        bencher.instance_stop();
        // check this assignment out to its node
        ring.incr_load(&node)?;
        assigned.push(node);
    }
    Ok(assigned)
}

/// Print the load on every node, highlighting any at the threshold
///
/// # Arguments
///
/// * `ring` - The ring to report on
fn report(ring: &ConsistentHash) {
    // get the most load any node could reach
    let threshold = ring.threshold();
    println!(
        "{} keys over {} nodes (threshold {})",
        ring.total_load(),
        ring.len(),
        threshold
    );
    for (name, load) in ring.loads() {
        if load.saturating_add(1) >= threshold {
            println!("  {name}: {}", load.bright_yellow());
        } else {
            println!("  {name}: {}", load.bright_green());
        }
    }
}

fn main() -> Result<(), Errors> {
    // get our command line args
    let args = Args::parse();
    // load our config
    let conf = Conf::new(&args.conf).map_err(RingError::from)?;
    // setup tracing
    trace::setup(&conf)?;
    // build our ring and add our nodes
    let ring = ConsistentHash::from_conf(&conf.ring);
    for i in 0..args.nodes {
        ring.add(&format!("node-{i}"))?;
    }
    info!(
        nodes = ring.len(),
        vnodes = ring.vnode_count(),
        load_factor = ring.load_factor(),
        "built ring"
    );
    // build the keys to route
    let keys = (0..args.keys)
        .map(|i| format!("key-{i}"))
        .collect::<Vec<String>>();
    // route every key and time each lookup
    let mut bencher = Bencher::new(&args.bench_path, keys.len())?;
    let assigned = route(&ring, &mut bencher, &keys)?;
    bencher.finish(args.write)?;
    report(&ring);
    // check how many keys move when a node leaves
    if args.nodes > 1 {
        let before = keys
            .iter()
            .map(|key| ring.get(key))
            .collect::<Result<Vec<String>, RingError>>()?;
        ring.remove("node-0");
        let mut moved = 0;
        for (key, old) in keys.iter().zip(before.iter()) {
            if ring.get(key)? != *old {
                moved += 1;
            }
        }
        println!("removing node-0 moved {moved} of {} keys", keys.len());
    }
    // release every assignment that is still on the ring
    for node in assigned.iter().filter(|node| ring.contains(node)) {
        ring.decr_load(node)?;
    }
    info!(total_load = ring.total_load(), "released all loads");
    Ok(())
}
