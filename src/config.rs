use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{OrganizerError, Result};
use crate::geometry::{AxisPair, parse_tuple};

pub const CONFIG_FILE_NAME: &str = "organizer.json";

/// One program to launch and arrange.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramSpec {
    /// Substring looked up in window titles.
    pub name: String,
    pub executable_path: PathBuf,
    pub size: AxisPair,
    pub position: AxisPair,
    pub startup_delay: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    pub retry_count: u32,
    pub debug_enabled: bool,
    pub list_windows_on_start: bool,
    /// Process programs on one thread each instead of one after another.
    pub parallel: bool,
    pub programs: Vec<ProgramSpec>,
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default = "default_retry")]
    retry: u32,
    #[serde(default)]
    debug: bool,
    #[serde(default)]
    get_list: bool,
    #[serde(default)]
    parallel: bool,
    programs: Vec<ProgramEntry>,
}

#[derive(Debug, Deserialize)]
struct ProgramEntry {
    name: String,
    location: PathBuf,
    size: String,
    position: String,
    #[serde(default)]
    delay: f64,
}

fn default_retry() -> u32 {
    5
}

impl RuntimeConfig {
    pub fn load(path: &Path) -> Result<Self> {
        log::debug!("Reading config from {}", path.display());
        let text = std::fs::read_to_string(path).map_err(|source| OrganizerError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(path, &text)
    }

    /// Parses and validates a config document. `origin` only labels errors.
    pub fn from_json(origin: &Path, text: &str) -> Result<Self> {
        let file: ConfigFile =
            serde_json::from_str(text).map_err(|source| OrganizerError::ConfigSyntax {
                path: origin.to_path_buf(),
                source,
            })?;

        let programs = file
            .programs
            .into_iter()
            .enumerate()
            .map(|(index, entry)| entry.into_spec(index))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            retry_count: file.retry,
            debug_enabled: file.debug,
            list_windows_on_start: file.get_list,
            parallel: file.parallel,
            programs,
        })
    }
}

impl ProgramEntry {
    fn into_spec(self, index: usize) -> Result<ProgramSpec> {
        if self.name.trim().is_empty() {
            return Err(OrganizerError::InvalidProgram {
                index,
                reason: "name must not be empty".into(),
            });
        }

        let startup_delay =
            Duration::try_from_secs_f64(self.delay).map_err(|err| OrganizerError::InvalidProgram {
                index,
                reason: format!("delay {} is not a valid duration: {err}", self.delay),
            })?;

        let size = parse_field(&self.name, "size", &self.size)?;
        let position = parse_field(&self.name, "position", &self.position)?;

        Ok(ProgramSpec {
            name: self.name,
            executable_path: self.location,
            size,
            position,
            startup_delay,
        })
    }
}

fn parse_field(program: &str, field: &'static str, input: &str) -> Result<AxisPair> {
    parse_tuple(input).map_err(|source| OrganizerError::InvalidTuple {
        program: program.to_string(),
        field,
        input: input.to_string(),
        source,
    })
}

/// Where to look for the config when none is given on the command line:
/// next to the executable first, then the working directory.
pub fn default_config_path() -> PathBuf {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    config_path_near(exe_dir.as_deref())
}

fn config_path_near(exe_dir: Option<&Path>) -> PathBuf {
    exe_dir
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .filter(|candidate| candidate.is_file())
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME))
}
