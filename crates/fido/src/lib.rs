pub mod engine;
pub mod graph;
pub mod identification;
pub mod merge;
pub mod proteins;
pub mod results;
pub mod sanitize;

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error on `{}`: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not (de)serialize identification data: {0}")]
    Json(#[from] serde_json::Error),
    #[error(
        "Unsuitable score type for peptide-spectrum matches detected (problem: {0}). \
         Fido requires probabilities as scores, e.g. as produced by \
         IDPosteriorErrorProbability with the 'prob_correct' option."
    )]
    UnsuitableScore(ScoreProblem),
    #[error("user parameter `{0}` of peptide hit `{1}` is not a number")]
    NonNumericScore(String, String),
    #[error(
        "All protein hits must be annotated with target/decoy meta data \
         (offending accession: `{0}`). Run PeptideIndexer with the \
         'annotate_proteins' option to accomplish this."
    )]
    MissingTargetDecoy(String),
    #[error("No target proteins found. Fido needs both targets and decoys.")]
    NoTargets,
    #[error("No decoy proteins found. Fido needs both targets and decoys.")]
    NoDecoys,
    #[error("accession `{0}` was not registered before encoding")]
    UnknownAccession(String),
    #[error("Fido reported protein `{0}`, which is not part of the input graph")]
    UnknownToken(String),
    #[error("malformed Fido result line: `{0}`")]
    MalformedResult(String),
}

/// Why a peptide score could not be used as a posterior probability
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ScoreProblem {
    LowerIsBetter,
    BelowZero,
    AboveOne,
    NotANumber,
}

impl std::fmt::Display for ScoreProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LowerIsBetter => f.write_str("lower scores are better"),
            Self::BelowZero => f.write_str("score < 0"),
            Self::AboveOne => f.write_str("score > 1"),
            Self::NotANumber => f.write_str("score is NaN"),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn io<P: AsRef<Path>>(path: P) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        move |source| Error::Io { path, source }
    }
}

pub fn read_json<P, T>(path: P) -> Result<T>
where
    P: AsRef<Path>,
    T: for<'de> serde::Deserialize<'de>,
{
    let contents = std::fs::read_to_string(path.as_ref()).map_err(Error::io(&path))?;
    Ok(serde_json::from_str(&contents)?)
}

pub fn write_json<P, T>(path: P, value: &T) -> Result<()>
where
    P: AsRef<Path>,
    T: serde::Serialize,
{
    let contents = serde_json::to_string_pretty(value)?;
    std::fs::write(path.as_ref(), contents).map_err(Error::io(&path))
}
