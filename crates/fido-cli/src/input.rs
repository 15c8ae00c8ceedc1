use anyhow::{ensure, Context};
use clap::ArgMatches;
use fido_core::engine::{Accuracy, Mode, ModelParameters, SearchOptions};
use fido_core::merge::Strategy;
use serde::Deserialize;
use std::path::PathBuf;

/// Read peptide probabilities from this user parameter, if present
pub const DEFAULT_PROB_PARAM: &str = "Posterior Probability_score";

/// Actual run parameters - may include overrides or default values not set by user
#[derive(Debug, Clone)]
pub struct Settings {
    pub version: String,
    pub input: PathBuf,
    pub output: PathBuf,
    pub exe: String,
    pub prob_param: String,
    pub strategy: Strategy,
    pub keep_zero_group: bool,
    pub mode: Mode,
    pub log2_states: u32,
    /// At 2 and above, temporary files are kept
    pub debug: u8,
}

#[derive(Deserialize, Default, Debug)]
/// Input parameters deserialized from JSON file
pub struct Input {
    #[serde(rename = "in")]
    input: Option<String>,
    out: Option<String>,
    exe: Option<String>,
    prob_param: Option<String>,
    separate_runs: Option<bool>,
    keep_zero_group: Option<bool>,
    no_cleanup: Option<bool>,
    #[serde(rename = "all_PSMs", alias = "all_psms")]
    all_psms: Option<bool>,
    group_level: Option<bool>,
    accuracy: Option<String>,
    log2_states: Option<u32>,
    log2_states_precalc: Option<u32>,
    prob: Option<ProbOptions>,
    debug: Option<u8>,
}

#[derive(Deserialize, Default, Debug)]
pub struct ProbOptions {
    protein: Option<f64>,
    peptide: Option<f64>,
    spurious: Option<f64>,
}

impl From<ProbOptions> for ModelParameters {
    fn from(value: ProbOptions) -> Self {
        ModelParameters {
            protein: value.protein.unwrap_or_default(),
            peptide: value.peptide.unwrap_or_default(),
            spurious: value.spurious.unwrap_or_default(),
        }
    }
}

impl Input {
    pub fn from_arguments(matches: ArgMatches) -> anyhow::Result<Self> {
        let mut input = match matches.get_one::<String>("parameters") {
            Some(path) => Input::load(path)
                .with_context(|| format!("Failed to read parameters from `{path}`"))?,
            None => Input::default(),
        };

        // Handle JSON configuration overrides
        if let Some(path) = matches.get_one::<String>("in") {
            log::trace!("overriding `in` parameter.");
            input.input = Some(path.into());
        }
        if let Some(path) = matches.get_one::<String>("out") {
            log::trace!("overriding `out` parameter.");
            input.out = Some(path.into());
        }
        if let Some(exe) = matches.get_one::<String>("exe") {
            input.exe = Some(exe.into());
        }
        if let Some(prob_param) = matches.get_one::<String>("prob-param") {
            input.prob_param = Some(prob_param.into());
        }
        if let Some(accuracy) = matches.get_one::<String>("accuracy") {
            input.accuracy = Some(accuracy.into());
        }
        if let Some(n) = matches.get_one::<u32>("log2-states").copied() {
            input.log2_states = Some(n);
        }
        if let Some(n) = matches.get_one::<u32>("log2-states-precalc").copied() {
            input.log2_states_precalc = Some(n);
        }
        if let Some(debug) = matches.get_one::<u8>("debug").copied() {
            input.debug = Some(debug);
        }

        let prob = input.prob.get_or_insert_with(ProbOptions::default);
        if let Some(p) = matches.get_one::<f64>("prob-protein").copied() {
            prob.protein = Some(p);
        }
        if let Some(p) = matches.get_one::<f64>("prob-peptide").copied() {
            prob.peptide = Some(p);
        }
        if let Some(p) = matches.get_one::<f64>("prob-spurious").copied() {
            prob.spurious = Some(p);
        }

        for (flag, value) in [
            ("separate-runs", &mut input.separate_runs),
            ("keep-zero-group", &mut input.keep_zero_group),
            ("no-cleanup", &mut input.no_cleanup),
            ("all-psms", &mut input.all_psms),
            ("group-level", &mut input.group_level),
        ] {
            if matches.get_flag(flag) {
                *value = Some(true);
            }
        }

        // avoid to later panic if these parameters are not set (but doesn't check if files exist)
        ensure!(
            input.input.is_some(),
            "`in` must be set. For more information try '--help'"
        );
        ensure!(
            input.out.is_some(),
            "`out` must be set. For more information try '--help'"
        );

        Ok(input)
    }

    pub fn load<S: AsRef<str>>(path: S) -> anyhow::Result<Self> {
        fido_core::read_json(path.as_ref()).map_err(anyhow::Error::from)
    }

    pub fn build(self) -> anyhow::Result<Settings> {
        let prob: ModelParameters = self.prob.map(Into::into).unwrap_or_default();
        ensure!(
            prob.protein >= 0.0 && prob.peptide >= 0.0 && prob.spurious >= 0.0,
            "`prob` values must not be negative"
        );

        let accuracy = self
            .accuracy
            .as_deref()
            .unwrap_or_default()
            .parse::<Accuracy>()
            .map_err(anyhow::Error::msg)?;

        let mode = if prob.is_unset() {
            Mode::ChooseParameters(SearchOptions {
                no_cleanup: self.no_cleanup.unwrap_or(false),
                all_psms: self.all_psms.unwrap_or(false),
                group_level: self.group_level.unwrap_or(false),
                accuracy,
                log2_states_precalc: self.log2_states_precalc.unwrap_or(0),
            })
        } else {
            if self.no_cleanup.is_some()
                || self.all_psms.is_some()
                || self.group_level.is_some()
                || accuracy != Accuracy::Default
                || self.log2_states_precalc.unwrap_or(0) != 0
            {
                log::warn!(
                    "running Fido with fixed `prob` values; parameter search options are ignored"
                );
            }
            Mode::Direct(prob)
        };

        let strategy = match self.separate_runs.unwrap_or(false) {
            true => Strategy::Separate,
            false => Strategy::Pooled,
        };

        Ok(Settings {
            version: clap::crate_version!().into(),
            input: self.input.context("`in` must be set")?.into(),
            output: self.out.context("`out` must be set")?.into(),
            exe: self.exe.unwrap_or_default(),
            prob_param: self
                .prob_param
                .unwrap_or_else(|| DEFAULT_PROB_PARAM.into()),
            strategy,
            keep_zero_group: self.keep_zero_group.unwrap_or(false),
            mode,
            log2_states: self.log2_states.unwrap_or(0),
            debug: self.debug.unwrap_or(0),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse(json: &str) -> anyhow::Result<Settings> {
        let input: Input = serde_json::from_str(json)?;
        input.build()
    }

    #[test]
    fn defaults() -> anyhow::Result<()> {
        let settings = parse(r#"{"in": "ids.json", "out": "out.json"}"#)?;
        assert_eq!(settings.input, PathBuf::from("ids.json"));
        assert_eq!(settings.prob_param, DEFAULT_PROB_PARAM);
        assert_eq!(settings.strategy, Strategy::Pooled);
        assert_eq!(settings.mode, Mode::ChooseParameters(SearchOptions::default()));
        assert_eq!(settings.debug, 0);
        Ok(())
    }

    #[test]
    fn search_options() -> anyhow::Result<()> {
        let settings = parse(
            r#"{"in": "a", "out": "b", "separate_runs": true, "all_PSMs": true,
                "accuracy": "sloppy", "log2_states_precalc": 10}"#,
        )?;
        assert_eq!(settings.strategy, Strategy::Separate);
        assert_eq!(
            settings.mode,
            Mode::ChooseParameters(SearchOptions {
                all_psms: true,
                accuracy: Accuracy::Sloppy,
                log2_states_precalc: 10,
                ..Default::default()
            })
        );
        Ok(())
    }

    #[test]
    fn direct_mode() -> anyhow::Result<()> {
        let settings = parse(
            r#"{"in": "a", "out": "b", "prob": {"protein": 0.5, "peptide": 0.1}}"#,
        )?;
        assert_eq!(
            settings.mode,
            Mode::Direct(ModelParameters {
                protein: 0.5,
                peptide: 0.1,
                spurious: 0.0
            })
        );
        Ok(())
    }

    #[test]
    fn reject_invalid_values() {
        assert!(parse(r#"{"in": "a", "out": "b", "accuracy": "perfect"}"#).is_err());
        assert!(parse(r#"{"in": "a", "out": "b", "prob": {"protein": -0.5}}"#).is_err());
        assert!(parse(r#"{"out": "b"}"#).is_err());
    }
}
