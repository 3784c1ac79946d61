use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, Subcommand, ValueEnum, ValueHint};
use enduro_core::config::EngineConfig;
use enduro_core::enduro::Enduro;
use enduro_core::jart::Jart;
use enduro_core::record;
use enduro_core::text;
use enduro_core::units::seconds_to_time;
use enduro_core::validation::compare_timing;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Enduro route sheet and JART tool", long_about = None)]
struct Cli {
    /// Engine configuration (TOML)
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write an empty route sheet built from the configuration
    New {
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Print the recalculated route sheet
    Show {
        #[arg(value_hint = ValueHint::FilePath)]
        input: PathBuf,
    },
    /// Print the JART chart for a route sheet
    Jart {
        #[arg(value_hint = ValueHint::FilePath)]
        input: PathBuf,
        /// Start the minute column at 0 instead of the key time's minute
        #[arg(long, action = ArgAction::SetTrue)]
        zero_start_minute: bool,
    },
    /// Convert between the plain-text and JSON forms
    Convert {
        #[arg(value_hint = ValueHint::FilePath)]
        input: PathBuf,
        #[arg(long, value_enum)]
        to: Format,
        /// Output path (`-` for stdout)
        #[arg(short, long, default_value = "-", value_hint = ValueHint::FilePath)]
        output: PathBuf,
    },
    /// Report validation errors, optionally diffing against a printout
    Check {
        #[arg(value_hint = ValueHint::FilePath)]
        input: PathBuf,
        /// Full route sheet printout to compare timings with
        #[arg(long, value_hint = ValueHint::FilePath)]
        printout: Option<PathBuf>,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let config = match &cli.config {
        Some(path) => EngineConfig::from_path(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    debug!(?config, "configuration");

    match cli.command {
        Command::New { format } => {
            let enduro = Enduro::from_config(&config);
            print!("{}", encode(&enduro, format)?);
            Ok(())
        }
        Command::Show { input } => handle_show(&load(&input, &cli.config, &config)?),
        Command::Jart {
            input,
            zero_start_minute,
        } => {
            let enduro = load(&input, &cli.config, &config)?;
            for row in Jart::from_enduro(&enduro, zero_start_minute).rows() {
                println!("{row}");
            }
            Ok(())
        }
        Command::Convert { input, to, output } => {
            let enduro = load(&input, &cli.config, &config)?;
            let encoded = encode(&enduro, to)?;
            if output == Path::new("-") {
                print!("{encoded}");
            } else {
                fs::write(&output, encoded)
                    .with_context(|| format!("writing {}", output.display()))?;
                info!(path = %output.display(), "written");
            }
            Ok(())
        }
        Command::Check { input, printout } => {
            handle_check(&load(&input, &cli.config, &config)?, printout.as_deref())
        }
    }
}

/// Reads a route sheet in either form. JSON is detected by a leading `{`.
/// Options from an explicit `--config` replace the file's.
fn load(path: &Path, config_path: &Option<PathBuf>, config: &EngineConfig) -> Result<Enduro> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let mut enduro = if content.trim_start().starts_with('{') {
        record::from_json(&content).with_context(|| format!("parsing {}", path.display()))?
    } else {
        text::parse(&content)
    };
    if config_path.is_some() {
        enduro.route_sheet_mut().set_options(config.options);
    }
    debug!(
        path = %path.display(),
        actions = enduro.route_sheet().len(),
        "route sheet loaded"
    );
    Ok(enduro)
}

fn encode(enduro: &Enduro, format: Format) -> Result<String> {
    Ok(match format {
        Format::Text => text::render(enduro),
        Format::Json => {
            let mut json = record::to_json(enduro)?;
            json.push('\n');
            json
        }
    })
}

fn handle_show(enduro: &Enduro) -> Result<()> {
    let sheet = enduro.route_sheet();
    let key_time = sheet.key_time();
    for line in enduro.title_lines() {
        println!("{line}");
    }
    println!();
    for (index, action) in sheet.actions().enumerate() {
        print!(
            "{index:>4} {:>3} {:<12} {:>7} {} {} {:>7}",
            action.lap() + 1,
            action.action_type().label(),
            action.start_distance(),
            seconds_to_time(key_time, action.start_time()),
            seconds_to_time(key_time, action.end_time()),
            action.end_distance(),
        );
        if let Some(error) = action.error() {
            print!("  ! {error}");
        }
        println!();
    }
    println!();
    println!(
        "length {}  ground {}  resets {}  laps {}  duration {}  free {} min",
        sheet.length(),
        sheet.ground_distance(),
        sheet.reset_distance(),
        sheet.lap_count(),
        seconds_to_time(0, sheet.duration()),
        sheet.free_time() / 60,
    );
    Ok(())
}

fn handle_check(enduro: &Enduro, printout: Option<&Path>) -> Result<()> {
    let sheet = enduro.route_sheet();
    for (index, error) in sheet.errors() {
        println!("{index:>4}: {error}");
    }
    let error_count = sheet.errors().count();

    if let Some(path) = printout {
        let content =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let printout = text::parse_printout(&content)
            .with_context(|| format!("parsing printout {}", path.display()))?;
        let report = compare_timing(enduro, &printout);
        if !report.title_matches {
            println!("title differs");
        }
        if !report.key_time_matches {
            println!("key time differs");
        }
        if report.expected_actions != report.actual_actions {
            println!(
                "action count differs: printout {} computed {}",
                report.expected_actions, report.actual_actions
            );
        }
        for m in &report.mismatches {
            println!(
                "{:>4} {:<12} {:?}: printout {} computed {}",
                m.index,
                m.action_type.label(),
                m.field,
                m.expected,
                m.actual
            );
        }
        if !report.is_identical() {
            bail!("route sheet does not match printout {}", path.display());
        }
    }

    if error_count > 0 {
        bail!("{error_count} actions have errors");
    }
    println!("ok");
    Ok(())
}
