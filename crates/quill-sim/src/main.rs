use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, Command};
use quill_core::QuillConfig;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod simulator;

use simulator::{run_simulator, SimulatorConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Command::new("quill-sim")
        .version(quill_core::VERSION)
        .about("Quill document session simulator")
        .subcommand_required(true)
        .subcommand(
            Command::new("simulate")
                .about("Run a seeded random session and check document invariants")
                .arg(
                    Arg::new("ops")
                        .long("ops")
                        .default_value("1000")
                        .value_parser(value_parser!(u64))
                        .help("Number of user operations to simulate"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .default_value("42")
                        .value_parser(value_parser!(u64))
                        .help("Random seed for reproducibility"),
                )
                .arg(
                    Arg::new("topic")
                        .long("topic")
                        .default_value("Lighthouses")
                        .help("Topic the document is about"),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("TOML session configuration"),
                )
                .arg(
                    Arg::new("stop-on-violation")
                        .long("stop-on-violation")
                        .action(ArgAction::SetTrue)
                        .help("Stop simulation on first violation"),
                ),
        );

    let matches = cli.get_matches();

    if let Some(("simulate", args)) = matches.subcommand() {
        let quill = match args.get_one::<PathBuf>("config") {
            Some(path) => {
                let source = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                QuillConfig::from_toml_str(&source)
                    .with_context(|| format!("parsing {}", path.display()))?
            }
            None => QuillConfig::default(),
        };

        let config = SimulatorConfig {
            seed: args.get_one::<u64>("seed").copied().unwrap_or(42),
            operations: args.get_one::<u64>("ops").copied().unwrap_or(1000),
            stop_on_first_violation: args.get_flag("stop-on-violation"),
            topic: args
                .get_one::<String>("topic")
                .cloned()
                .unwrap_or_default(),
            quill,
        };

        tracing::info!(
            seed = config.seed,
            operations = config.operations,
            topic = %config.topic,
            "running simulator"
        );

        let report = run_simulator(config).await;
        println!("{}", report.generate_text());

        if !report.passed() {
            std::process::exit(1);
        }
    }

    Ok(())
}
