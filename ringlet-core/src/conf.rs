//! The config for a ringlet hash ring

use config::{Config, ConfigError};
use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

use crate::bounded::DEFAULT_LOAD_FACTOR;
use crate::hasher::HasherKind;
use crate::ring::DEFAULT_REPLICAS;

/// Help serde default the number of virtual nodes per node
fn default_replicas() -> usize {
    DEFAULT_REPLICAS
}

/// Help serde default how far over the average load a node may go
fn default_load_factor() -> f64 {
    DEFAULT_LOAD_FACTOR
}

/// The settings for the hash ring itself
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RingConf {
    /// The number of virtual nodes to place for each node
    #[serde(default = "default_replicas")]
    pub replicas: usize,
    /// The hash to place nodes and keys with
    #[serde(default)]
    pub hasher: HasherKind,
    /// How far over the average load a node may go before keys overflow
    #[serde(default = "default_load_factor")]
    pub load_factor: f64,
}

impl Default for RingConf {
    /// Builds a default ring config
    fn default() -> Self {
        RingConf {
            replicas: default_replicas(),
            hasher: HasherKind::default(),
            load_factor: default_load_factor(),
        }
    }
}

/// The different levels to log tracing info at
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub enum TraceLevel {
    /// Log everything include high verbosity low priority info
    Trace,
    /// Log low priority debug infomation and up
    Debug,
    /// Log standard priority information and up
    #[default]
    Info,
    /// Log only warning and Errors
    Warn,
    /// Log only errors
    Error,
    /// Do not log anything
    Off,
}

impl TraceLevel {
    /// Convert this [`TraceLevel`] to a [`LevelFilter`]
    pub fn to_filter(&self) -> LevelFilter {
        match self {
            TraceLevel::Trace => LevelFilter::TRACE,
            TraceLevel::Debug => LevelFilter::DEBUG,
            TraceLevel::Info => LevelFilter::INFO,
            TraceLevel::Warn => LevelFilter::WARN,
            TraceLevel::Error => LevelFilter::ERROR,
            TraceLevel::Off => LevelFilter::OFF,
        }
    }
}

/// The tracing settings for ringlet
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Tracing {
    /// The level to log traces at
    #[serde(default)]
    pub level: TraceLevel,
}

/// The config for running ringlet
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Conf {
    /// The hash ring settings to use
    #[serde(default)]
    pub ring: RingConf,
    /// The tracing settings to use
    #[serde(default)]
    pub tracing: Tracing,
}

impl Conf {
    /// Build a config from our environment and a config file
    ///
    /// Env vars look like `RINGLET_RING__REPLICAS=40`.
    ///
    /// # Arguments
    ///
    /// * `path` - The path to an optional config file
    pub fn new(path: &str) -> Result<Self, ConfigError> {
        // build our config sources
        let conf = Config::builder()
            // start with the settings in our config file
            .add_source(config::File::with_name(path).required(false))
            // overlay our env vars on top
            .add_source(
                config::Environment::with_prefix("ringlet")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        conf.try_deserialize()
    }
}
