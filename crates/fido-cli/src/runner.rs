use super::input::Settings;
use anyhow::{ensure, Context};
use fido_core::engine::{parse_parameter_search, Engine, Mode, ModelParameters};
use fido_core::graph::GraphEncoder;
use fido_core::identification::{IdentificationData, PeptideIdentification, ProteinIdentification};
use fido_core::merge::{pool_runs, score_hits, Strategy};
use fido_core::proteins::ProteinLists;
use fido_core::results::Inference;
use fido_core::sanitize::Accessions;
use log::{debug, error, info};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::TempDir;

pub struct Runner {
    pub parameters: Settings,
    engine: Engine,
    start: Instant,
}

/// What happened during [`Runner::run`]
#[derive(Debug)]
pub struct Report {
    /// Whether inference succeeded for the last run attempted
    pub success: bool,
    /// Number of times the engine was invoked
    pub runs: usize,
    /// Temporary directory, if it was kept for debugging
    pub temp_dir: Option<PathBuf>,
}

impl Runner {
    pub fn new(parameters: Settings) -> Self {
        let engine = Engine::new(&parameters.exe, parameters.mode, parameters.log2_states);
        Self {
            parameters,
            engine,
            start: Instant::now(),
        }
    }

    pub fn run(&self) -> anyhow::Result<Report> {
        debug!("fido-adapter v{}", self.parameters.version);
        info!("Reading input data...");
        let input = &self.parameters.input;
        let mut data = IdentificationData::load(input)
            .with_context(|| format!("Failed to read identifications from `{}`", input.display()))?;
        ensure!(
            !data.proteins.is_empty() && !data.peptides.is_empty(),
            "Input file `{}` should contain both protein and peptide data.",
            input.display()
        );

        let accessions = Accessions::new(data.accessions());

        let temp_dir = tempfile::Builder::new()
            .prefix("fido")
            .tempdir()
            .context("Failed to create temporary directory")?;

        let (success, runs) = self.infer(&mut data, &accessions, temp_dir.path())?;

        let output = &self.parameters.output;
        data.store(output)
            .with_context(|| format!("Failed to write identifications to `{}`", output.display()))?;

        let temp_dir = self.cleanup(temp_dir)?;
        info!("finished in {:#?}", self.start.elapsed());

        Ok(Report {
            success,
            runs,
            temp_dir,
        })
    }

    /// Run inference according to the configured strategy. Only the outcome
    /// of the last run attempted is reported.
    fn infer(
        &self,
        data: &mut IdentificationData,
        accessions: &Accessions,
        temp_dir: &Path,
    ) -> anyhow::Result<(bool, usize)> {
        // chosen parameters of one run become the defaults of the next
        let mut params = match self.parameters.mode {
            Mode::Direct(params) => params,
            Mode::ChooseParameters(_) => ModelParameters::default(),
        };

        match self.parameters.strategy {
            Strategy::Separate => {
                let mut success = false;
                for (ix, run) in data.proteins.iter_mut().enumerate() {
                    info!("Protein identification run {}:", ix + 1);
                    success = self.infer_run(
                        run,
                        &mut data.peptides,
                        accessions,
                        temp_dir,
                        &mut params,
                        Some(ix + 1),
                    )?;
                }
                Ok((success, data.proteins.len()))
            }
            Strategy::Pooled if data.proteins.len() > 1 => {
                let mut pooled = pool_runs(&data.proteins, &mut data.peptides);
                let success = self.infer_run(
                    &mut pooled,
                    &mut data.peptides,
                    accessions,
                    temp_dir,
                    &mut params,
                    None,
                )?;
                score_hits(&mut pooled);
                data.proteins = vec![pooled];
                Ok((success, 1))
            }
            Strategy::Pooled => {
                let success = self.infer_run(
                    &mut data.proteins[0],
                    &mut data.peptides,
                    accessions,
                    temp_dir,
                    &mut params,
                    None,
                )?;
                Ok((success, 1))
            }
        }
    }

    /// Encode one run, run Fido on it and attach the resulting protein
    /// groups. Returns `Ok(false)` if Fido itself failed; errors in the input
    /// data or in Fido's output abort the whole pipeline.
    fn infer_run(
        &self,
        run: &mut ProteinIdentification,
        peptides: &mut [PeptideIdentification],
        accessions: &Accessions,
        temp_dir: &Path,
        params: &mut ModelParameters,
        counter: Option<usize>,
    ) -> anyhow::Result<bool> {
        info!("Generating temporary files for Fido...");
        let suffix = counter.map(|n| format!(".{n}")).unwrap_or_default();
        let graph_path = temp_dir.join(format!("fido_input_graph{suffix}.txt"));
        let proteins_path = temp_dir.join(format!("fido_input_proteins{suffix}.txt"));

        // validate target/decoy annotations before anything is written
        let lists = match self.parameters.mode {
            Mode::ChooseParameters(_) => Some(ProteinLists::new(run, accessions)?),
            Mode::Direct(_) => None,
        };

        let encoder = GraphEncoder {
            accessions,
            prob_param: Some(self.parameters.prob_param.as_str()),
        };
        let summary = encoder.write(peptides, &run.identifier, &graph_path)?;
        debug!("PSM graph: {:?}", summary);

        let output = match &lists {
            Some(lists) => {
                lists.write(&proteins_path)?;
                info!("Running Fido with parameter estimation...");
                self.engine.run(&graph_path, Some(&proteins_path))
            }
            None => {
                info!("Running Fido with fixed parameters...");
                self.engine.run(&graph_path, None)
            }
        };
        let output = match output {
            Ok(output) => output,
            Err(e) => {
                error!("{}", e);
                return Ok(false);
            }
        };

        if lists.is_some() {
            info!("Fido parameter search:");
            self.dump(temp_dir.join(format!("fido_status{suffix}.txt")), &output.stderr)?;
            match parse_parameter_search(&output.stderr) {
                Ok(Some(chosen)) => *params = chosen,
                Ok(None) => {}
                Err(e) => {
                    error!("{}", e);
                    return Ok(false);
                }
            }
        }

        info!("Parsing Fido results and writing output...");
        self.dump(temp_dir.join(format!("fido_output{suffix}.txt")), &output.stdout)?;
        let inference = Inference::decode(&output.stdout, accessions, self.parameters.keep_zero_group)?;
        inference.attach(run, params);
        info!("{}", inference);
        Ok(true)
    }

    /// Keep a copy of engine output next to its inputs, at debug level 2+
    fn dump(&self, path: PathBuf, contents: &str) -> anyhow::Result<()> {
        if self.parameters.debug > 1 {
            std::fs::write(&path, contents)
                .with_context(|| format!("Failed to write `{}`", path.display()))?;
        }
        Ok(())
    }

    fn cleanup(&self, temp_dir: TempDir) -> anyhow::Result<Option<PathBuf>> {
        if self.parameters.debug > 1 {
            let path = temp_dir.into_path();
            info!(
                "Keeping temporary files at '{}'. Set debug level to 0 or 1 to remove them.",
                path.display()
            );
            return Ok(Some(path));
        }

        info!("Removing temporary files...");
        let path = temp_dir.path().to_path_buf();
        temp_dir
            .close()
            .with_context(|| format!("Failed to remove `{}`", path.display()))?;
        if self.parameters.debug == 1 {
            info!(
                "Set debug level to 2 or higher to keep temporary files at '{}'.",
                path.display()
            );
        }
        Ok(None)
    }
}
