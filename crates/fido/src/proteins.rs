//! Target and decoy protein lists for `FidoChooseParameters`

use crate::identification::{ProteinIdentification, TargetDecoy};
use crate::sanitize::Accessions;
use crate::{Error, Result};
use itertools::Itertools;
use std::collections::BTreeSet;
use std::path::Path;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ProteinLists<'a> {
    pub targets: BTreeSet<&'a str>,
    pub decoys: BTreeSet<&'a str>,
}

impl<'a> ProteinLists<'a> {
    /// Partition the (sanitized) protein accessions of a run. Every hit must
    /// carry a target/decoy annotation, and both sets must be non-empty.
    pub fn new(run: &ProteinIdentification, accessions: &'a Accessions) -> Result<Self> {
        let mut lists = ProteinLists::default();
        for hit in &run.hits {
            let token = accessions.sanitize(&hit.accession)?;
            match hit.target_decoy() {
                Some(TargetDecoy::Target) => lists.targets.insert(token),
                Some(TargetDecoy::Decoy) => lists.decoys.insert(token),
                None => return Err(Error::MissingTargetDecoy(hit.accession.clone())),
            };
        }

        if lists.targets.is_empty() {
            return Err(Error::NoTargets);
        }
        if lists.decoys.is_empty() {
            return Err(Error::NoDecoys);
        }
        Ok(lists)
    }

    pub fn encode(&self) -> String {
        format!(
            "{{ {} }}\n{{ {} }}\n",
            self.targets.iter().join(" , "),
            self.decoys.iter().join(" , ")
        )
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path.as_ref(), self.encode()).map_err(Error::io(&path))?;
        log::debug!(
            "wrote {} target and {} decoy proteins to `{}`",
            self.targets.len(),
            self.decoys.len(),
            path.as_ref().display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::identification::{ProteinHit, TARGET_DECOY};

    fn hit(accession: &str, label: Option<&str>) -> ProteinHit {
        let mut hit = ProteinHit {
            accession: accession.into(),
            ..Default::default()
        };
        if let Some(label) = label {
            hit.meta.insert(TARGET_DECOY.into(), label.into());
        }
        hit
    }

    fn run(hits: Vec<ProteinHit>) -> ProteinIdentification {
        ProteinIdentification {
            hits,
            ..Default::default()
        }
    }

    #[test]
    fn encode_target_and_decoy_lines() -> Result<()> {
        let accessions = Accessions::new(vec!["A", "B", "DECOY_A"]);
        let run = run(vec![
            hit("B", Some("target")),
            hit("A", Some("target")),
            hit("DECOY_A", Some("decoy")),
            hit("A", Some("target")),
        ]);
        let lists = ProteinLists::new(&run, &accessions)?;
        assert_eq!(lists.encode(), "{ A_1 , B_2 }\n{ DECOY_A_3 }\n");
        Ok(())
    }

    #[test]
    fn require_annotations_and_both_sets() {
        let accessions = Accessions::new(vec!["A", "B"]);

        let unlabeled = run(vec![hit("A", Some("target")), hit("B", None)]);
        assert!(matches!(
            ProteinLists::new(&unlabeled, &accessions),
            Err(Error::MissingTargetDecoy(acc)) if acc == "B"
        ));

        let targets_only = run(vec![hit("A", Some("target")), hit("B", Some("target"))]);
        assert!(matches!(
            ProteinLists::new(&targets_only, &accessions),
            Err(Error::NoDecoys)
        ));

        let decoys_only = run(vec![hit("A", Some("decoy"))]);
        assert!(matches!(
            ProteinLists::new(&decoys_only, &accessions),
            Err(Error::NoTargets)
        ));
    }
}
