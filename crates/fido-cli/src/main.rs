use clap::{value_parser, Arg, ArgAction, Command, ValueHint};
use fido_cli::input::Input;
use fido_cli::runner::Runner;
use std::process::ExitCode;

/// Exit status when Fido could not be run or reported an error
const EXTERNAL_PROGRAM_ERROR: u8 = 2;

fn flag(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .action(ArgAction::SetTrue)
        .help(help)
}

fn main() -> anyhow::Result<ExitCode> {
    env_logger::Builder::default()
        .filter_level(log::LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("FIDO_LOG", "error,fido=info"))
        .init();

    let matches = Command::new("fido-adapter")
        .version(clap::crate_version!())
        .about("Runs the protein inference engine Fido on peptide identifications")
        .arg(
            Arg::new("in")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help("Input: identification results (JSON). Overrides `in` in the parameter file.")
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("out")
                .short('o')
                .long("out")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help("Output: identification results with scored/grouped proteins")
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("parameters")
                .short('p')
                .long("parameters")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help("Path to configuration parameters (JSON file)")
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("exe")
                .long("exe")
                .help(
                    "Path to the executable to use, or to the directory containing the 'Fido' \
                     and 'FidoChooseParameters' executables; may be empty if the executables \
                     are globally available.",
                )
                .value_hint(ValueHint::AnyPath),
        )
        .arg(
            Arg::new("prob-param")
                .long("prob-param")
                .help(
                    "Read the peptide probability from this user parameter in the input, \
                     instead of from the score, if available",
                ),
        )
        .arg(flag(
            "separate-runs",
            "Process multiple protein identification runs separately, don't merge them",
        ))
        .arg(flag(
            "keep-zero-group",
            "Keep the group of proteins with estimated probability of zero (it may be very large)",
        ))
        .arg(flag(
            "no-cleanup",
            "Omit clean-up of peptide sequences (removal of non-letter characters, replacement of I with L)",
        ))
        .arg(flag(
            "all-psms",
            "Consider all PSMs of each peptide, instead of only the best one",
        ))
        .arg(flag(
            "group-level",
            "Perform inference on protein group level instead of individual protein level",
        ))
        .arg(
            Arg::new("accuracy")
                .long("accuracy")
                .value_parser(["best", "relaxed", "sloppy"])
                .help("Accuracy level of start parameters; empty uses Fido's default ('best')"),
        )
        .arg(
            Arg::new("log2-states")
                .long("log2-states")
                .value_parser(value_parser!(u32))
                .help(
                    "Binary logarithm of the max. number of connected states in a subgraph. \
                     '0' uses the default (18).",
                ),
        )
        .arg(
            Arg::new("log2-states-precalc")
                .long("log2-states-precalc")
                .value_parser(value_parser!(u32))
                .help("Like `--log2-states`, but for the precalculation"),
        )
        .arg(
            Arg::new("prob-protein")
                .long("prob-protein")
                .value_parser(value_parser!(f64))
                .help("Protein prior probability ('gamma'), for running Fido without parameter estimation"),
        )
        .arg(
            Arg::new("prob-peptide")
                .long("prob-peptide")
                .value_parser(value_parser!(f64))
                .help("Peptide emission probability ('alpha')"),
        )
        .arg(
            Arg::new("prob-spurious")
                .long("prob-spurious")
                .value_parser(value_parser!(f64))
                .help("Spurious peptide identification probability ('beta')"),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .value_parser(value_parser!(u8))
                .help("Debug level; 2 and above keeps temporary files"),
        )
        .help_template(
            "{usage-heading} {usage}\n\n\
             {about-with-newline}\n\
             Version {version}\n\n\
             {all-args}{after-help}",
        )
        .get_matches();

    let input = Input::from_arguments(matches)?;
    let runner = input.build().map(Runner::new)?;
    let report = runner.run()?;

    if report.success {
        Ok(ExitCode::SUCCESS)
    } else {
        log::error!("Fido did not complete successfully");
        Ok(ExitCode::from(EXTERNAL_PROGRAM_ERROR))
    }
}
