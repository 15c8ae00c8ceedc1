//! Writing the PSM graph that Fido reads:
//!
//! ```text
//! e <peptide sequence>
//! r <protein>
//! r <protein>
//! p <probability>
//! ```

use crate::identification::{PeptideHit, PeptideIdentification};
use crate::sanitize::Accessions;
use crate::{Error, Result, ScoreProblem};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub struct GraphEncoder<'a> {
    pub accessions: &'a Accessions,
    /// Read the probability from this user parameter instead of the score,
    /// where the hit has it
    pub prob_param: Option<&'a str>,
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct GraphSummary {
    /// Number of `e`/`p` blocks written
    pub peptides: usize,
    /// Hits whose posterior error probability was converted
    pub converted: usize,
    /// Advisories emitted about converted scores; never more than one
    pub advisories: usize,
}

fn is_error_probability(score_type: &str) -> bool {
    let score_type = score_type.to_lowercase();
    score_type == "posterior error probability" || score_type.starts_with("consensus_")
}

impl<'a> GraphEncoder<'a> {
    /// Resolve the posterior probability of the best hit of `pid`
    fn probability(
        &self,
        pid: &PeptideIdentification,
        hit: &PeptideHit,
        summary: &mut GraphSummary,
    ) -> Result<f64> {
        let alternate = self
            .prob_param
            .filter(|param| !param.is_empty())
            .and_then(|param| hit.meta.get(param).map(|value| (param, value)));

        let score = match alternate {
            Some((param, value)) => value
                .as_f64()
                .ok_or_else(|| Error::NonNumericScore(param.into(), hit.sequence.clone()))?,
            None if pid.higher_score_better => hit.score,
            None if is_error_probability(&pid.score_type) => {
                if summary.advisories == 0 {
                    log::warn!(
                        "Scores of peptide hits seem to be posterior error probabilities. \
                         Converting to (positive) posterior probabilities."
                    );
                    summary.advisories += 1;
                }
                summary.converted += 1;
                1.0 - hit.score
            }
            None => {
                return Err(Error::UnsuitableScore(ScoreProblem::LowerIsBetter));
            }
        };

        if score.is_nan() {
            Err(Error::UnsuitableScore(ScoreProblem::NotANumber))
        } else if score < 0.0 {
            Err(Error::UnsuitableScore(ScoreProblem::BelowZero))
        } else if score > 1.0 {
            Err(Error::UnsuitableScore(ScoreProblem::AboveOne))
        } else {
            Ok(score)
        }
    }

    /// Write one subgraph per peptide identification that has a usable best
    /// hit. A non-empty `identifier` restricts the graph to identifications
    /// of that run.
    pub fn encode<W: Write>(
        &self,
        peptides: &mut [PeptideIdentification],
        identifier: &str,
        mut out: W,
    ) -> Result<GraphSummary> {
        let mut summary = GraphSummary::default();
        let mut line = String::new();
        for pid in peptides.iter_mut() {
            if (!identifier.is_empty() && pid.identifier != identifier) || pid.hits.is_empty() {
                continue;
            }
            pid.sort();
            let pid = &*pid;
            let hit = &pid.hits[0];
            let accessions = hit.accessions();
            if hit.sequence.is_empty() || accessions.is_empty() {
                continue;
            }
            let probability = self.probability(pid, hit, &mut summary)?;

            line.clear();
            line.push_str("e ");
            line.push_str(&hit.sequence);
            line.push('\n');
            for accession in accessions {
                line.push_str("r ");
                line.push_str(self.accessions.sanitize(accession)?);
                line.push('\n');
            }
            line.push_str("p ");
            line.push_str(ryu::Buffer::new().format(probability));
            line.push('\n');
            out.write_all(line.as_bytes())
                .map_err(Error::io("<graph>"))?;
            summary.peptides += 1;
        }
        Ok(summary)
    }

    pub fn write<P: AsRef<Path>>(
        &self,
        peptides: &mut [PeptideIdentification],
        identifier: &str,
        path: P,
    ) -> Result<GraphSummary> {
        let path = path.as_ref();
        let mut out = BufWriter::new(File::create(path).map_err(Error::io(path))?);
        let summary = self
            .encode(peptides, identifier, &mut out)
            .map_err(|err| match err {
                Error::Io { source, .. } => Error::Io {
                    path: path.into(),
                    source,
                },
                err => err,
            })?;
        out.flush().map_err(Error::io(path))?;
        log::debug!(
            "wrote {} peptides to PSM graph `{}`",
            summary.peptides,
            path.display()
        );
        Ok(summary)
    }
}
