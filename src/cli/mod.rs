//! Command line front end for running and inspecting stored models.

pub mod output;

use std::{
    io::{self, BufRead},
    path::{Path, PathBuf},
};

use chrono::NaiveDate;
use shell_words::split;

use crate::{
    config::ConfigManager,
    errors::CliError,
    reporting::{balance_report, structure_report, transaction_report, ReportFormat},
    simulation::TimeBasedModel,
    storage::{JsonStorage, ModelReader, ModelWriter},
    utils::build_info::BuildMetadata,
};

const USAGE: &str = "\
Usage: bizsim_cli <command> [args]
Commands:
  run <model> [--save <path>]        run a model to its end condition
  structure <model> [--latex]        print each entity's chart of accounts
  balances <model> [--as-of <date>] [--latex]
                                     print leaf balances (dates as YYYY-MM-DD)
  transactions <model> [--latex]     print posted transactions
  config                             show the active configuration
  version                            show build information
  help                               show this message
  -                                  read commands from stdin, one per line

<model> is a path to a model JSON file or the name of a stored model.";

/// A parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Run {
        model: String,
        save: Option<PathBuf>,
    },
    Structure {
        model: String,
        format: ReportFormat,
    },
    Balances {
        model: String,
        as_of: Option<NaiveDate>,
        format: ReportFormat,
    },
    Transactions {
        model: String,
        format: ReportFormat,
    },
    Config,
    Version,
    Help,
    Script,
}

impl Command {
    pub fn parse<S: AsRef<str>>(tokens: &[S]) -> Result<Self, CliError> {
        let words: Vec<&str> = tokens.iter().map(|token| token.as_ref()).collect();
        let (name, rest) = match words.split_first() {
            Some((name, rest)) => (name.to_ascii_lowercase(), rest),
            None => return Ok(Command::Help),
        };

        match name.as_str() {
            "run" => {
                let (model, flags) = split_model(&name, rest)?;
                let save = flag_value(&flags, "--save")?.map(PathBuf::from);
                reject_unknown(&flags, &["--save"], &[])?;
                Ok(Command::Run { model, save })
            }
            "structure" => {
                let (model, flags) = split_model(&name, rest)?;
                reject_unknown(&flags, &[], &["--latex"])?;
                Ok(Command::Structure {
                    model,
                    format: report_format(&flags),
                })
            }
            "balances" => {
                let (model, flags) = split_model(&name, rest)?;
                let as_of = flag_value(&flags, "--as-of")?
                    .map(parse_date)
                    .transpose()?;
                reject_unknown(&flags, &["--as-of"], &["--latex"])?;
                Ok(Command::Balances {
                    model,
                    as_of,
                    format: report_format(&flags),
                })
            }
            "transactions" => {
                let (model, flags) = split_model(&name, rest)?;
                reject_unknown(&flags, &[], &["--latex"])?;
                Ok(Command::Transactions {
                    model,
                    format: report_format(&flags),
                })
            }
            "config" => Ok(Command::Config),
            "version" | "--version" | "-v" => Ok(Command::Version),
            "help" | "--help" | "-h" => Ok(Command::Help),
            "-" => Ok(Command::Script),
            other => Err(CliError::Input(format!(
                "unknown command `{}`; try `help`",
                other
            ))),
        }
    }
}

/// Entry point used by the `bizsim_cli` binary.
pub fn run_cli<S: AsRef<str>>(args: &[S]) -> Result<(), CliError> {
    match Command::parse(args)? {
        Command::Script => run_script(io::stdin().lock()),
        command => execute(command),
    }
}

/// Runs one command per input line. Failures are reported and the script
/// continues; the call fails afterwards if any line failed.
pub fn run_script(input: impl BufRead) -> Result<(), CliError> {
    let mut failures = 0usize;
    for (line_no, line) in input.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let outcome = split(trimmed)
            .map_err(|err| CliError::Input(err.to_string()))
            .and_then(|tokens| Command::parse(tokens.as_slice()))
            .and_then(|command| match command {
                Command::Script => Err(CliError::Input("`-` cannot be nested".into())),
                command => execute(command),
            });
        if let Err(err) = outcome {
            output::error(format!("line {}: {}", line_no + 1, err));
            failures += 1;
        }
    }
    if failures > 0 {
        return Err(CliError::Command(format!(
            "{} script command(s) failed",
            failures
        )));
    }
    Ok(())
}

fn execute(command: Command) -> Result<(), CliError> {
    match command {
        Command::Run { model, save } => run_model(&model, save.as_deref()),
        Command::Structure { model, format } => {
            let model = load_model(&model)?;
            for entity in model.entities() {
                output::section(format!("{} structure", entity.name()));
                println!("{}", structure_report(entity.structure(), format));
            }
            Ok(())
        }
        Command::Balances {
            model,
            as_of,
            format,
        } => {
            let model = load_model(&model)?;
            let config = ConfigManager::new()?.load()?;
            for entity in model.entities() {
                let title = match as_of {
                    Some(date) => format!(
                        "{} balances as of {} ({})",
                        entity.name(),
                        date,
                        config.currency
                    ),
                    None => format!("{} balances ({})", entity.name(), config.currency),
                };
                output::section(title);
                println!(
                    "{}",
                    balance_report(entity.gl(), as_of, format, config.decimal_places)
                );
            }
            Ok(())
        }
        Command::Transactions { model, format } => {
            let model = load_model(&model)?;
            let decimal_places = ConfigManager::new()?.load()?.decimal_places;
            for entity in model.entities() {
                output::section(format!("{} transactions", entity.name()));
                println!(
                    "{}",
                    transaction_report(entity.gl(), format, decimal_places)
                );
            }
            Ok(())
        }
        Command::Config => {
            let manager = ConfigManager::new()?;
            let config = manager.load()?;
            output::section("Configuration");
            println!("path:              {}", manager.config_path().display());
            println!("currency:          {}", config.currency);
            println!("decimal places:    {}", config.decimal_places);
            println!(
                "last opened model: {}",
                config.last_opened_model.as_deref().unwrap_or("-")
            );
            Ok(())
        }
        Command::Version => {
            println!("{}", BuildMetadata::current());
            Ok(())
        }
        Command::Help => {
            println!("{}", USAGE);
            Ok(())
        }
        Command::Script => Err(CliError::Input("`-` must be the only argument".into())),
    }
}

fn run_model(reference: &str, save: Option<&Path>) -> Result<(), CliError> {
    let mut model = load_model(reference)?;
    let summary = model.run()?;
    output::success(format!(
        "`{}` ran {} period(s), posted {} transaction(s)",
        model.name(),
        summary.periods_run,
        summary.transactions_posted
    ));
    if let Some(date) = summary.last_period {
        output::info(format!("last period: {}", date));
    }
    if let Some(path) = save {
        JsonStorage::new_default()?.write_model(&model, path)?;
        output::info(format!("saved to {}", path.display()));
    }
    if let Err(err) = ConfigManager::new().and_then(|m| m.record_last_model(Some(model.name()))) {
        output::warning(format!("could not record last model: {}", err));
    }
    Ok(())
}

/// Loads a model from a file path, falling back to a stored model name.
fn load_model(reference: &str) -> Result<TimeBasedModel, CliError> {
    let storage = JsonStorage::new_default()?;
    let path = Path::new(reference);
    if path.is_file() {
        return Ok(storage.read_model(path)?);
    }
    let stored = storage.model_path(reference);
    if stored.is_file() {
        return Ok(storage.read_model(&stored)?);
    }
    Err(CliError::Input(format!("model `{}` not found", reference)))
}

fn split_model<'a>(command: &str, args: &[&'a str]) -> Result<(String, Vec<&'a str>), CliError> {
    match args.split_first() {
        Some((model, flags)) if !model.starts_with("--") => Ok((model.to_string(), flags.to_vec())),
        _ => Err(CliError::Input(format!("`{}` requires a <model> argument", command))),
    }
}

fn flag_value<'a>(flags: &[&'a str], flag: &str) -> Result<Option<&'a str>, CliError> {
    match flags.iter().position(|candidate| *candidate == flag) {
        Some(idx) => flags
            .get(idx + 1)
            .copied()
            .filter(|value| !value.starts_with("--"))
            .map(Some)
            .ok_or_else(|| CliError::Input(format!("`{}` requires a value", flag))),
        None => Ok(None),
    }
}

fn reject_unknown(flags: &[&str], valued: &[&str], switches: &[&str]) -> Result<(), CliError> {
    let mut idx = 0;
    while idx < flags.len() {
        let flag = flags[idx];
        if valued.contains(&flag) {
            idx += 2;
        } else if switches.contains(&flag) {
            idx += 1;
        } else {
            return Err(CliError::Input(format!("unexpected argument `{}`", flag)));
        }
    }
    Ok(())
}

fn report_format(flags: &[&str]) -> ReportFormat {
    if flags.contains(&"--latex") {
        ReportFormat::Latex
    } else {
        ReportFormat::Text
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, CliError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| CliError::Input(format!("invalid date `{}`; expected YYYY-MM-DD", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_with_save() {
        let command = Command::parse(&["run", "plan.json", "--save", "out.json"]).unwrap();
        assert_eq!(
            command,
            Command::Run {
                model: "plan.json".into(),
                save: Some(PathBuf::from("out.json")),
            }
        );
    }

    #[test]
    fn parses_balances_options() {
        let command =
            Command::parse(&["Balances", "plan", "--latex", "--as-of", "2024-03-31"]).unwrap();
        assert_eq!(
            command,
            Command::Balances {
                model: "plan".into(),
                as_of: NaiveDate::from_ymd_opt(2024, 3, 31),
                format: ReportFormat::Latex,
            }
        );
    }

    #[test]
    fn empty_args_show_help() {
        let empty: [&str; 0] = [];
        assert_eq!(Command::parse(&empty).unwrap(), Command::Help);
        assert_eq!(Command::parse(&["-"]).unwrap(), Command::Script);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(Command::parse(&["structure"]), Err(CliError::Input(_))));
        assert!(matches!(
            Command::parse(&["balances", "m", "--as-of", "31/03/2024"]),
            Err(CliError::Input(_))
        ));
        assert!(matches!(
            Command::parse(&["run", "m", "--save"]),
            Err(CliError::Input(_))
        ));
        assert!(matches!(
            Command::parse(&["transactions", "m", "--bogus"]),
            Err(CliError::Input(_))
        ));
        assert!(matches!(Command::parse(&["frobnicate"]), Err(CliError::Input(_))));
    }

    #[test]
    fn script_reports_failures() {
        let script = "# comment\n\nversion\nnot-a-command\n";
        let err = run_script(script.as_bytes()).unwrap_err();
        assert!(matches!(err, CliError::Command(_)));
        assert!(run_script("help\n".as_bytes()).is_ok());
    }
}
