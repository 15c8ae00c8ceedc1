//! Reading Fido's protein groups. Each output line is a probability followed
//! by the group's proteins, e.g.:
//!
//! ```text
//! 0.6788 { SW:TRP6_HUMAN_3 , GP:AJ271067_1_1 , GP:AJ271068_1_2 }
//! ```

use crate::engine::ModelParameters;
use crate::identification::{ProteinGroup, ProteinIdentification};
use crate::sanitize::Accessions;
use crate::{Error, Result};

pub const PROB_PROTEIN: &str = "Fido_prob_protein";
pub const PROB_PEPTIDE: &str = "Fido_prob_peptide";
pub const PROB_SPURIOUS: &str = "Fido_prob_spurious";

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Inference {
    /// Sorted groups, each with sorted accessions
    pub groups: Vec<ProteinGroup>,
    /// Proteins across all retained groups
    pub proteins: usize,
    /// Proteins listed with probability zero, whether retained or not
    pub zero_proteins: usize,
    keep_zero_group: bool,
}

fn is_delimiter(token: &str) -> bool {
    token.chars().all(|c| matches!(c, '{' | '}' | ','))
}

impl Inference {
    /// Parse Fido's standard output, translating tokens back to the original
    /// accessions. Proteins with probability zero are dropped unless
    /// `keep_zero_group` is set.
    pub fn decode(stdout: &str, accessions: &Accessions, keep_zero_group: bool) -> Result<Self> {
        let mut inference = Inference {
            keep_zero_group,
            ..Default::default()
        };

        for line in stdout.lines() {
            let mut tokens = line.split_whitespace();
            let probability = match tokens.next().map(str::parse::<f64>) {
                Some(Ok(p)) if (0.0..=1.0).contains(&p) => p,
                Some(_) => return Err(Error::MalformedResult(line.into())),
                None => continue,
            };

            let mut group = ProteinGroup {
                probability,
                accessions: Vec::new(),
            };
            for token in tokens.filter(|token| !is_delimiter(token)) {
                if probability == 0.0 {
                    inference.zero_proteins += 1;
                    if !keep_zero_group {
                        continue;
                    }
                }
                group
                    .accessions
                    .push(accessions.desanitize(token)?.to_string());
            }

            if !group.accessions.is_empty() {
                group.accessions.sort();
                group.accessions.dedup();
                inference.proteins += group.accessions.len();
                inference.groups.push(group);
            }
        }
        inference.groups.sort();
        Ok(inference)
    }

    /// Replace the protein groups of `run` and record the model parameters
    pub fn attach(&self, run: &mut ProteinIdentification, params: &ModelParameters) {
        run.indistinguishable_proteins = self.groups.clone();
        run.set_meta(PROB_PROTEIN, params.protein);
        run.set_meta(PROB_PEPTIDE, params.peptide);
        run.set_meta(PROB_SPURIOUS, params.spurious);
    }
}

impl std::fmt::Display for Inference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Inferred {} proteins in {} groups ({}{} proteins with probability zero{})",
            self.proteins,
            self.groups.len(),
            if self.keep_zero_group && self.zero_proteins > 0 {
                "including "
            } else {
                ""
            },
            self.zero_proteins,
            if self.keep_zero_group || self.zero_proteins == 0 {
                ""
            } else {
                " not included"
            }
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::identification::MetaValue;

    fn accessions() -> Accessions {
        // sorted order: P2, P3, P4, sp|P1|A HUMAN
        Accessions::new(vec!["sp|P1|A HUMAN", "P2", "P3", "P4"])
    }

    const OUTPUT: &str = "\
0.9 { P3_2 , P2_1 }
0.0 { P4_3 , sp|P1|A_4 }

0.5 { P4_3 }
0.9 { P2_1 }
";

    #[test]
    fn decode_and_order_groups() -> Result<()> {
        let inference = Inference::decode(OUTPUT, &accessions(), false)?;
        let groups = inference
            .groups
            .iter()
            .map(|g| (g.probability, g.accessions.join(";")))
            .collect::<Vec<_>>();
        assert_eq!(
            groups,
            vec![
                (0.5, "P4".to_string()),
                (0.9, "P2".to_string()),
                (0.9, "P2;P3".to_string()),
            ]
        );
        assert_eq!(inference.proteins, 4);
        assert_eq!(inference.zero_proteins, 2);
        assert_eq!(
            inference.to_string(),
            "Inferred 4 proteins in 3 groups (2 proteins with probability zero not included)"
        );
        Ok(())
    }

    #[test]
    fn keep_zero_group() -> Result<()> {
        let inference = Inference::decode(OUTPUT, &accessions(), true)?;
        assert_eq!(inference.groups.len(), 4);
        assert_eq!(
            inference.groups[0],
            ProteinGroup {
                probability: 0.0,
                accessions: vec!["P4".into(), "sp|P1|A HUMAN".into()],
            }
        );
        assert_eq!(inference.zero_proteins, 2);
        assert_eq!(
            inference.to_string(),
            "Inferred 6 proteins in 4 groups (including 2 proteins with probability zero)"
        );
        Ok(())
    }

    #[test]
    fn unknown_token() {
        assert!(matches!(
            Inference::decode("0.7 { P9_9 }\n", &accessions(), false),
            Err(Error::UnknownToken(tok)) if tok == "P9_9"
        ));
    }

    #[test]
    fn malformed_line() {
        assert!(matches!(
            Inference::decode("{ P2_1 }\n", &accessions(), false),
            Err(Error::MalformedResult(_))
        ));
    }

    #[test]
    fn reject_non_probabilities() {
        for line in ["nan { P2_1 }\n", "1.5 { P2_1 }\n", "-0.1 { P2_1 }\n", "inf { P2_1 }\n"] {
            assert!(
                matches!(
                    Inference::decode(line, &accessions(), false),
                    Err(Error::MalformedResult(l)) if l == line.trim_end()
                ),
                "{line}"
            );
        }
    }

    #[test]
    fn attach_to_run() -> Result<()> {
        let inference = Inference::decode("1.0 { P2_1 }\n", &accessions(), false)?;
        let mut run = ProteinIdentification::default();
        let params = ModelParameters {
            protein: 0.5,
            peptide: 0.1,
            spurious: 0.01,
        };
        inference.attach(&mut run, &params);
        assert_eq!(run.indistinguishable_proteins, inference.groups);
        assert_eq!(run.meta.get(PROB_PEPTIDE), Some(&MetaValue::Number(0.1)));
        Ok(())
    }
}
