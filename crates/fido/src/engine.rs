//! Invoking `Fido` / `FidoChooseParameters` as a child process

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;

/// Placeholder arguments, replaced with the temporary file paths of a run
pub const INPUT_GRAPH: &str = "INPUT_GRAPH";
pub const INPUT_PROTEINS: &str = "INPUT_PROTEINS";

pub const FIDO: &str = "Fido";
pub const FIDO_CHOOSE_PARAMETERS: &str = "FidoChooseParameters";

/// `Fido` splits subgraphs bigger than 2^18 connected states by default
pub const DEFAULT_LOG2_STATES: u32 = 18;

const EXCEPTION_MARKER: &str = "caught an exception";
const WARNING_MARKER: &str = "Warning:";
const PARAMETERS_MARKER: &str = "Using best gamma, alpha, beta =";

/// Fido's model parameters
#[derive(Serialize, Deserialize, Debug, Default, Copy, Clone, PartialEq)]
pub struct ModelParameters {
    /// Protein prior probability (gamma)
    pub protein: f64,
    /// Peptide emission probability (alpha)
    pub peptide: f64,
    /// Spurious peptide identification probability (beta)
    pub spurious: f64,
}

impl ModelParameters {
    pub fn is_unset(&self) -> bool {
        self.protein == 0.0 && self.peptide == 0.0 && self.spurious == 0.0
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum Accuracy {
    #[default]
    Default,
    Best,
    Relaxed,
    Sloppy,
}

impl std::str::FromStr for Accuracy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Ok(Accuracy::Default),
            "best" => Ok(Accuracy::Best),
            "relaxed" => Ok(Accuracy::Relaxed),
            "sloppy" => Ok(Accuracy::Sloppy),
            _ => Err(format!(
                "invalid accuracy `{s}`, expected one of `best`, `relaxed`, `sloppy` or empty"
            )),
        }
    }
}

/// Switches for `FidoChooseParameters`
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct SearchOptions {
    pub no_cleanup: bool,
    pub all_psms: bool,
    pub group_level: bool,
    pub accuracy: Accuracy,
    pub log2_states_precalc: u32,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Mode {
    /// Run `Fido` with known parameters
    Direct(ModelParameters),
    /// Estimate parameters with `FidoChooseParameters`
    ChooseParameters(SearchOptions),
}

impl Mode {
    pub fn executable_name(&self) -> &'static str {
        match self {
            Mode::Direct(_) => FIDO,
            Mode::ChooseParameters(_) => FIDO_CHOOSE_PARAMETERS,
        }
    }
}

#[derive(Error, Debug)]
pub enum EngineFailure {
    #[error("Fatal error running Fido (command: '{command}'): {source}. Does the Fido executable exist?")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
    #[error("Fido did not finish normally (command: '{command}')")]
    Terminated { command: String },
    #[error("Error running Fido: '{0}'")]
    Exception(String),
}

/// Captured standard streams of a finished engine process
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EngineOutput {
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Clone)]
pub struct Engine {
    pub executable: PathBuf,
    pub mode: Mode,
    pub log2_states: u32,
}

impl Engine {
    /// `exe` may be empty (look the binary up on `PATH`), a directory
    /// containing the binaries, or the full path of the binary to run.
    pub fn new(exe: &str, mode: Mode, log2_states: u32) -> Self {
        let executable = if exe.is_empty() {
            PathBuf::from(mode.executable_name())
        } else if Path::new(exe).is_dir() {
            Path::new(exe).join(mode.executable_name())
        } else {
            PathBuf::from(exe)
        };
        Engine {
            executable,
            mode,
            log2_states,
        }
    }

    /// Command line arguments, with [`INPUT_GRAPH`] and [`INPUT_PROTEINS`]
    /// standing in for the file paths
    pub fn arguments(&self) -> Vec<String> {
        let mut args = Vec::new();
        let mut log2_states = self.log2_states;
        match &self.mode {
            Mode::ChooseParameters(opts) => {
                if opts.no_cleanup {
                    args.push("-p".into());
                }
                if opts.all_psms {
                    args.push("-a".into());
                }
                if opts.group_level {
                    args.push("-g".into());
                }
                let level = match opts.accuracy {
                    Accuracy::Default => None,
                    Accuracy::Best => Some("1"),
                    Accuracy::Relaxed => Some("2"),
                    Accuracy::Sloppy => Some("3"),
                };
                if let Some(level) = level {
                    args.push("-c".into());
                    args.push(level.into());
                }
                args.push(INPUT_GRAPH.into());
                args.push(INPUT_PROTEINS.into());
                if opts.log2_states_precalc != 0 {
                    // positional: precalc limit must be followed by the main limit
                    if log2_states == 0 {
                        log2_states = DEFAULT_LOG2_STATES;
                    }
                    args.push(opts.log2_states_precalc.to_string());
                }
            }
            Mode::Direct(params) => {
                let mut buf = ryu::Buffer::new();
                args.push(INPUT_GRAPH.into());
                args.push(buf.format(params.protein).into());
                args.push(buf.format(params.peptide).into());
                args.push(buf.format(params.spurious).into());
            }
        }
        if log2_states != 0 {
            args.push(log2_states.to_string());
        }
        args
    }

    fn command_line(&self, args: &[OsString]) -> String {
        format!(
            "{} \"{}\"",
            self.executable.display(),
            args.iter().map(|arg| arg.to_string_lossy()).join("\" \"")
        )
    }

    /// Run the engine on the given input files and block until it exits.
    /// There is no timeout: inference on large graphs can take very long.
    pub fn run(&self, graph: &Path, proteins: Option<&Path>) -> Result<EngineOutput, EngineFailure> {
        let args = self
            .arguments()
            .into_iter()
            .map(|arg| match proteins {
                _ if arg == INPUT_GRAPH => graph.as_os_str().to_owned(),
                Some(path) if arg == INPUT_PROTEINS => path.as_os_str().to_owned(),
                _ => arg.into(),
            })
            .collect::<Vec<OsString>>();
        let command = self.command_line(&args);
        log::debug!("running {}", command);

        let output = Command::new(&self.executable)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| EngineFailure::Spawn {
                command: command.clone(),
                source,
            })?;

        match output.status.code() {
            None => return Err(EngineFailure::Terminated { command }),
            Some(0) => {}
            Some(code) => log::warn!("Fido exited with status {}", code),
        }

        Ok(EngineOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Inspect the diagnostic output of `FidoChooseParameters`.
///
/// Returns the chosen parameters if the search reported them, or an error if
/// Fido reported an exception.
pub fn parse_parameter_search(stderr: &str) -> Result<Option<ModelParameters>, EngineFailure> {
    let lines = stderr
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>();

    let (first, last) = match (lines.first(), lines.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return Ok(None),
    };
    if first.starts_with(EXCEPTION_MARKER) {
        return Err(EngineFailure::Exception(first.into()));
    }
    for line in lines.iter().filter(|line| line.starts_with(WARNING_MARKER)) {
        log::warn!("{}", line);
    }

    if !last.starts_with(PARAMETERS_MARKER) {
        return Ok(None);
    }
    log::info!("{}", last);
    let values = last
        .rsplit('=')
        .next()
        .unwrap_or_default()
        .split_whitespace()
        .map(str::parse::<f64>)
        .collect::<Result<Vec<_>, _>>();
    match values.as_deref() {
        Ok([protein, peptide, spurious, ..]) => Ok(Some(ModelParameters {
            protein: *protein,
            peptide: *peptide,
            spurious: *spurious,
        })),
        _ => {
            log::warn!("could not read parameters chosen by Fido from `{}`", last);
            Ok(None)
        }
    }
}
