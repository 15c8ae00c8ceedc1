//! Fido's text formats split on whitespace, commas and braces, so protein
//! accessions containing any of those have to be replaced by safe tokens
//! before they are written, and translated back when results are read.

use crate::{Error, Result};
use fnv::FnvHashMap;
use itertools::Itertools;

const UNSAFE: &[char] = &[' ', '\t', ',', '{', '}'];

/// Two-way mapping between original accessions and wire-safe tokens.
///
/// Built once from the complete set of accessions and never modified
/// afterwards.
#[derive(Debug, Default, Clone)]
pub struct Accessions {
    tokens: FnvHashMap<String, String>,
    originals: FnvHashMap<String, String>,
}

impl Accessions {
    /// Tokens are the accession prefix up to the first unsafe character,
    /// followed by `_<n>`, where `n` counts (from 1) over the sorted, distinct
    /// accessions. The counter alone makes every token unique.
    pub fn new<'a, I>(accessions: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut mapping = Self::default();
        for (n, accession) in accessions.into_iter().sorted().dedup().enumerate() {
            let prefix = match accession.find(UNSAFE) {
                Some(pos) => &accession[..pos],
                None => accession,
            };
            let token = format!("{}_{}", prefix, n + 1);
            mapping
                .originals
                .insert(token.clone(), accession.to_string());
            mapping.tokens.insert(accession.to_string(), token);
        }
        log::debug!("sanitized {} protein accessions", mapping.len());
        mapping
    }

    pub fn sanitize(&self, accession: &str) -> Result<&str> {
        self.tokens
            .get(accession)
            .map(String::as_str)
            .ok_or_else(|| Error::UnknownAccession(accession.into()))
    }

    pub fn desanitize(&self, token: &str) -> Result<&str> {
        self.originals
            .get(token)
            .map(String::as_str)
            .ok_or_else(|| Error::UnknownToken(token.into()))
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use quickcheck_macros::quickcheck;
    use std::collections::HashSet;

    #[test]
    fn tokens_follow_sorted_order() -> Result<()> {
        let accessions = Accessions::new(vec![
            "sp|P02768|ALBU_HUMAN Serum albumin",
            "DECOY_P1",
            "GP:AJ271067,1",
            "DECOY_P1",
        ]);
        assert_eq!(accessions.len(), 3);
        assert_eq!(accessions.sanitize("DECOY_P1")?, "DECOY_P1_1");
        assert_eq!(accessions.sanitize("GP:AJ271067,1")?, "GP:AJ271067_2");
        assert_eq!(
            accessions.sanitize("sp|P02768|ALBU_HUMAN Serum albumin")?,
            "sp|P02768|ALBU_HUMAN_3"
        );
        assert_eq!(accessions.desanitize("GP:AJ271067_2")?, "GP:AJ271067,1");
        Ok(())
    }

    #[test]
    fn colliding_prefixes_stay_unique() -> Result<()> {
        let accessions = Accessions::new(vec!["X{1}", "X{2}", "X"]);
        assert_eq!(accessions.sanitize("X")?, "X_1");
        assert_eq!(accessions.sanitize("X{1}")?, "X_2");
        assert_eq!(accessions.sanitize("X{2}")?, "X_3");
        Ok(())
    }

    #[test]
    fn unregistered_lookups_fail() {
        let accessions = Accessions::new(vec!["P1"]);
        assert!(matches!(
            accessions.sanitize("P2"),
            Err(Error::UnknownAccession(acc)) if acc == "P2"
        ));
        assert!(matches!(
            accessions.desanitize("P1"),
            Err(Error::UnknownToken(tok)) if tok == "P1"
        ));
    }

    #[quickcheck]
    fn round_trip_is_bijective(input: Vec<String>) -> bool {
        let accessions = Accessions::new(input.iter().map(String::as_str));
        let mut seen = HashSet::new();
        input.iter().all(|acc| {
            let token = accessions.sanitize(acc).unwrap();
            let clean = !token.contains(UNSAFE);
            // duplicates in the input map to the same token
            seen.insert((acc.clone(), token.to_string()));
            clean && accessions.desanitize(token).unwrap() == acc
        }) && seen.iter().map(|(_, tok)| tok).collect::<HashSet<_>>().len() == seen.len()
    }
}
