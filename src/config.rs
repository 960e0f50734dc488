use std::path::PathBuf;
use std::str::FromStr;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_EVENT_HISTORY: usize = 1000;
const DEFAULT_STATS_HISTORY: usize = 60;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid value `{value}` for environment variable `{name}`: {source}")]
    InvalidNumber {
        name: &'static str,
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Startup configuration, read once from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Address the API server binds to (`CREO_LISTEN_ADDR`).
    pub listen_addr: String,
    /// Root of the host filesystem (`ROOTFS_MOUNT_PATH`).
    pub rootfs: PathBuf,
    /// Number of past events kept for historical queries (`CREO_EVENT_HISTORY`).
    pub event_history: usize,
    /// Number of stats samples kept per container (`CREO_STATS_HISTORY`).
    pub stats_history: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_owned(),
            rootfs: PathBuf::from("/"),
            event_history: DEFAULT_EVENT_HISTORY,
            stats_history: DEFAULT_STATS_HISTORY,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    ///
    /// Unset variables keep their defaults; numeric variables that fail to parse are an error.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            listen_addr: lookup("CREO_LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            rootfs: lookup("ROOTFS_MOUNT_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.rootfs),
            event_history: parse_var(&lookup, "CREO_EVENT_HISTORY")?
                .unwrap_or(defaults.event_history),
            stats_history: parse_var(&lookup, "CREO_STATS_HISTORY")?
                .unwrap_or(defaults.stats_history),
        })
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &'static str) -> Result<Option<T>>
where
    T: FromStr<Err = std::num::ParseIntError>,
{
    lookup(name)
        .map(|value| {
            T::from_str(value.trim()).map_err(|source| Error::InvalidNumber {
                name,
                value,
                source,
            })
        })
        .transpose()
}
