use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid machine id: {0}")]
    InvalidMachineID(String),
    #[error("failed to read file `{path}`: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// The 128-bit machine identifier from `/etc/machine-id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachineID([u8; 16]);

impl MachineID {
    pub fn new(src: [u8; 16]) -> Self {
        Self(src)
    }

    pub fn as_raw(&self) -> [u8; 16] {
        self.0
    }
}

impl FromStr for MachineID {
    type Err = Error;

    /// Parses a `MachineID` from its 32 character hexadecimal representation.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.len() != 32 || !s.is_ascii() {
            return Err(Error::InvalidMachineID(s.to_owned()));
        }
        let mut bytes = [0u8; 16];
        for i in (0..s.len()).step_by(2) {
            bytes[i / 2] = u8::from_str_radix(&s[i..i + 2], 16)
                .map_err(|_| Error::InvalidMachineID(s.to_owned()))?;
        }

        Ok(MachineID::new(bytes))
    }
}

impl fmt::Display for MachineID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

impl serde::Serialize for MachineID {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Static description of the host the monitor runs on.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MachineInfo {
    pub machine_id: MachineID,
    pub hostname: String,
    pub num_cores: usize,
}

/// Reads the machine description below `rootfs`.
///
/// The hostname is taken from `etc/hostname`, falling back to
/// `proc/sys/kernel/hostname` when the former is missing.
///
/// # Errors
///
/// Returns [`Error::ReadFile`] if neither hostname source nor `etc/machine-id` can be read,
/// and [`Error::InvalidMachineID`] if the machine id is malformed.
pub fn read_machine_info(rootfs: impl AsRef<Path>) -> Result<MachineInfo> {
    let rootfs = rootfs.as_ref();
    let machine_id = MachineID::from_str(read_trimmed(rootfs.join("etc/machine-id"))?.as_str())?;
    let hostname = read_trimmed(rootfs.join("etc/hostname"))
        .or_else(|_| read_trimmed(rootfs.join("proc/sys/kernel/hostname")))?;
    log::debug!("Hostname: {}", &hostname);
    let num_cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);

    Ok(MachineInfo {
        machine_id,
        hostname,
        num_cores,
    })
}

fn read_trimmed(path: PathBuf) -> Result<String> {
    std::fs::read_to_string(&path)
        .map(|s| s.trim().to_owned())
        .map_err(|source| Error::ReadFile { path, source })
}
