//! Pooling several protein identification runs into one, so that a single
//! inference covers all of them

use crate::identification::{PeptideIdentification, ProteinHit, ProteinIdentification};
use fnv::FnvHashMap;
use std::collections::BTreeMap;

pub const POOLED_SEARCH_ENGINE: &str = "Fido";
pub const POOLED_SCORE_TYPE: &str = "Posterior Probability";

/// How multiple identification runs are handled
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum Strategy {
    /// Merge all runs and infer once (a single run is used as-is)
    #[default]
    Pooled,
    /// Infer each run on its own peptides
    Separate,
}

/// Build one run holding every distinct protein of `runs`. Where an accession
/// occurs more than once, the hit from the earliest run (and earliest
/// position within it) is kept. Peptide identifications are re-pointed at the
/// new run, whose identifier is empty.
pub fn pool_runs(
    runs: &[ProteinIdentification],
    peptides: &mut [PeptideIdentification],
) -> ProteinIdentification {
    let mut first: BTreeMap<&str, &ProteinHit> = BTreeMap::new();
    for hit in runs.iter().flat_map(|run| run.hits.iter()) {
        first.entry(hit.accession.as_str()).or_insert(hit);
    }

    for pid in peptides.iter_mut() {
        pid.identifier.clear();
    }

    log::info!(
        "pooled {} protein identification runs into {} distinct proteins",
        runs.len(),
        first.len()
    );

    ProteinIdentification {
        identifier: String::new(),
        search_engine: POOLED_SEARCH_ENGINE.into(),
        score_type: POOLED_SCORE_TYPE.into(),
        higher_score_better: true,
        date_time: Some(chrono::Local::now().to_rfc3339()),
        hits: first.into_values().cloned().collect(),
        ..Default::default()
    }
}

/// Set the score of every grouped protein to its group's probability
pub fn score_hits(run: &mut ProteinIdentification) {
    let mut index: FnvHashMap<&str, usize> = FnvHashMap::default();
    for (ix, hit) in run.hits.iter().enumerate() {
        index.entry(hit.accession.as_str()).or_insert(ix);
    }
    let index = &index;

    let scores = run
        .indistinguishable_proteins
        .iter()
        .flat_map(|group| {
            group
                .accessions
                .iter()
                .filter_map(move |accession| index.get(accession.as_str()))
                .map(move |&ix| (ix, group.probability))
        })
        .collect::<Vec<_>>();

    for (ix, probability) in scores {
        run.hits[ix].score = probability;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::identification::{MetaValue, ProteinGroup, TARGET_DECOY};

    fn hit(accession: &str, label: &str) -> ProteinHit {
        let mut hit = ProteinHit {
            accession: accession.into(),
            ..Default::default()
        };
        hit.meta.insert(TARGET_DECOY.into(), label.into());
        hit
    }

    fn run(identifier: &str, hits: Vec<ProteinHit>) -> ProteinIdentification {
        ProteinIdentification {
            identifier: identifier.into(),
            search_engine: "XTandem".into(),
            hits,
            ..Default::default()
        }
    }

    #[test]
    fn first_occurrence_wins() {
        let runs = vec![
            run("r1", vec![hit("C", "target"), hit("X", "run1"), hit("X", "run1-dup")]),
            run("r2", vec![hit("X", "run2"), hit("A", "decoy")]),
            run("r3", vec![hit("B", "target"), hit("X", "run3")]),
        ];
        let mut peptides = vec![PeptideIdentification {
            identifier: "r2".into(),
            ..Default::default()
        }];

        let pooled = pool_runs(&runs, &mut peptides);
        assert_eq!(peptides[0].identifier, "");
        assert_eq!(pooled.identifier, "");
        assert_eq!(pooled.search_engine, POOLED_SEARCH_ENGINE);
        assert_eq!(pooled.score_type, POOLED_SCORE_TYPE);
        assert!(pooled.higher_score_better);

        let accessions = pooled
            .hits
            .iter()
            .map(|h| h.accession.as_str())
            .collect::<Vec<_>>();
        assert_eq!(accessions, vec!["A", "B", "C", "X"]);
        assert_eq!(
            pooled.hits[3].meta.get(TARGET_DECOY),
            Some(&MetaValue::Text("run1".into()))
        );
    }

    #[test]
    fn group_probabilities_become_scores() {
        let mut pooled = run("", vec![hit("A", "target"), hit("B", "target"), hit("C", "decoy")]);
        pooled.indistinguishable_proteins = vec![
            ProteinGroup {
                probability: 0.25,
                accessions: vec!["C".into()],
            },
            ProteinGroup {
                probability: 0.75,
                accessions: vec!["A".into(), "B".into()],
            },
        ];
        pooled.hits.push(hit("D", "target"));
        pooled.hits[3].score = 0.5;
        score_hits(&mut pooled);
        let scores = pooled.hits.iter().map(|h| h.score).collect::<Vec<_>>();
        assert_eq!(scores, vec![0.75, 0.75, 0.25, 0.5]);
        assert_eq!(pooled.indistinguishable_proteins.len(), 2);
    }
}
