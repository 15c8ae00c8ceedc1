//! Protein and peptide identification results, as consumed and produced by
//! the inference pipeline.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::Path;

/// Meta value key holding the target/decoy annotation of a protein hit
pub const TARGET_DECOY: &str = "target_decoy";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum MetaValue {
    Number(f64),
    Text(String),
}

impl MetaValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetaValue::Number(n) => Some(*n),
            MetaValue::Text(s) => s.trim().parse().ok(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetaValue::Number(_) => None,
            MetaValue::Text(s) => Some(s),
        }
    }
}

impl From<f64> for MetaValue {
    fn from(value: f64) -> Self {
        MetaValue::Number(value)
    }
}

impl From<&str> for MetaValue {
    fn from(value: &str) -> Self {
        MetaValue::Text(value.into())
    }
}

pub type MetaInfo = BTreeMap<String, MetaValue>;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct PeptideHit {
    pub sequence: String,
    #[serde(default)]
    pub charge: i32,
    pub score: f64,
    #[serde(default)]
    pub protein_accessions: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: MetaInfo,
}

impl PeptideHit {
    /// Distinct, non-empty protein accessions referenced by this hit, sorted
    pub fn accessions(&self) -> Vec<&str> {
        self.protein_accessions
            .iter()
            .map(String::as_str)
            .filter(|acc| !acc.is_empty())
            .sorted()
            .dedup()
            .collect()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PeptideIdentification {
    /// Links this identification to a [`ProteinIdentification`] run
    #[serde(default)]
    pub identifier: String,
    #[serde(default)]
    pub score_type: String,
    #[serde(default = "default_true")]
    pub higher_score_better: bool,
    #[serde(default)]
    pub hits: Vec<PeptideHit>,
}

impl Default for PeptideIdentification {
    fn default() -> Self {
        Self {
            identifier: String::default(),
            score_type: String::default(),
            higher_score_better: true,
            hits: Vec::default(),
        }
    }
}

impl PeptideIdentification {
    /// Order hits best-first
    pub fn sort(&mut self) {
        match self.higher_score_better {
            true => self.hits.sort_by(|a, b| b.score.total_cmp(&a.score)),
            false => self.hits.sort_by(|a, b| a.score.total_cmp(&b.score)),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct ProteinHit {
    pub accession: String,
    #[serde(default)]
    pub score: f64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: MetaInfo,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TargetDecoy {
    Target,
    Decoy,
}

impl ProteinHit {
    pub fn target_decoy(&self) -> Option<TargetDecoy> {
        match self.meta.get(TARGET_DECOY).and_then(MetaValue::as_str) {
            Some("target") => Some(TargetDecoy::Target),
            Some("decoy") => Some(TargetDecoy::Decoy),
            _ => None,
        }
    }
}

/// Proteins that cannot be told apart by the inference engine, sharing one
/// posterior probability
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct ProteinGroup {
    pub probability: f64,
    pub accessions: Vec<String>,
}

impl Eq for ProteinGroup {}

impl PartialOrd for ProteinGroup {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ProteinGroup {
    fn cmp(&self, other: &Self) -> Ordering {
        self.probability
            .total_cmp(&other.probability)
            .then_with(|| self.accessions.cmp(&other.accessions))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProteinIdentification {
    #[serde(default)]
    pub identifier: String,
    #[serde(default)]
    pub search_engine: String,
    #[serde(default)]
    pub score_type: String,
    #[serde(default = "default_true")]
    pub higher_score_better: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(default)]
    pub hits: Vec<ProteinHit>,
    #[serde(default)]
    pub indistinguishable_proteins: Vec<ProteinGroup>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: MetaInfo,
}

impl Default for ProteinIdentification {
    fn default() -> Self {
        Self {
            identifier: String::default(),
            search_engine: String::default(),
            score_type: String::default(),
            higher_score_better: true,
            date_time: None,
            hits: Vec::default(),
            indistinguishable_proteins: Vec::default(),
            meta: MetaInfo::default(),
        }
    }
}

impl ProteinIdentification {
    pub fn set_meta<V: Into<MetaValue>>(&mut self, key: &str, value: V) {
        self.meta.insert(key.into(), value.into());
    }
}

/// Contents of an identification file: protein runs and the peptide
/// identifications that point at them
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct IdentificationData {
    pub proteins: Vec<ProteinIdentification>,
    pub peptides: Vec<PeptideIdentification>,
}

impl IdentificationData {
    pub fn load<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        crate::read_json(path)
    }

    pub fn store<P: AsRef<Path>>(&self, path: P) -> crate::Result<()> {
        crate::write_json(path, self)
    }

    /// Every protein accession across all runs
    pub fn accessions(&self) -> impl Iterator<Item = &str> {
        self.proteins
            .iter()
            .flat_map(|run| run.hits.iter().map(|hit| hit.accession.as_str()))
    }
}

fn default_true() -> bool {
    true
}
