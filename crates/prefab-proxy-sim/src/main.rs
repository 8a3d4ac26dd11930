use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use prefab_proxy::{NestingPolicy, ProxyConfig};
use prefab_proxy_sim::{run_simulator, SimulatorConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("prefab-proxy-sim")
        .version(prefab_proxy::VERSION)
        .about("Simulate editor authoring sessions against template proxies")
        .arg_required_else_help(true)
        .subcommand(
            Command::new("simulate")
                .about("Run a seeded authoring session and check the preview invariants")
                .arg(
                    Arg::new("ticks")
                        .long("ticks")
                        .default_value("500")
                        .value_parser(value_parser!(u64))
                        .help("Number of host ticks to simulate"),
                )
                .arg(
                    Arg::new("ops-per-tick")
                        .long("ops-per-tick")
                        .default_value("3")
                        .value_parser(value_parser!(usize))
                        .help("Authoring operations applied before each tick"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .default_value("42")
                        .value_parser(value_parser!(u64))
                        .help("Random seed for reproducibility"),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("TOML file with proxy configuration"),
                )
                .arg(
                    Arg::new("policy")
                        .long("policy")
                        .value_parser(["strict", "single-level"])
                        .help("Override the nesting policy"),
                )
                .arg(
                    Arg::new("stop-on-violation")
                        .long("stop-on-violation")
                        .action(ArgAction::SetTrue)
                        .help("Stop simulation on first violation"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output the report as JSON"),
                )
                .arg(
                    Arg::new("verbose")
                        .long("verbose")
                        .short('v')
                        .action(ArgAction::SetTrue)
                        .help("Log every proxy decision"),
                ),
        )
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_proxy_config(args: &ArgMatches) -> Result<ProxyConfig> {
    let mut config = match args.get_one::<PathBuf>("config") {
        Some(path) => {
            let source = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            ProxyConfig::from_toml_str(&source)
                .with_context(|| format!("invalid config in {}", path.display()))?
        }
        None => ProxyConfig::default(),
    };
    match args.get_one::<String>("policy").map(String::as_str) {
        Some("single-level") => config.nesting = NestingPolicy::SingleLevel,
        Some(_) => config.nesting = NestingPolicy::Strict,
        None => {}
    }
    Ok(config)
}

fn simulate(args: &ArgMatches) -> Result<bool> {
    let ticks = args.get_one::<u64>("ticks").copied().context("missing --ticks")?;
    let ops_per_tick = args
        .get_one::<usize>("ops-per-tick")
        .copied()
        .context("missing --ops-per-tick")?;
    let seed = args.get_one::<u64>("seed").copied().context("missing --seed")?;
    let json = args.get_flag("json");

    let config = SimulatorConfig {
        seed,
        ticks,
        ops_per_tick,
        proxy: load_proxy_config(args)?,
        stop_on_first_violation: args.get_flag("stop-on-violation"),
    };

    if !json {
        println!("Running prefab proxy simulator...");
        println!("Ticks: {ticks}");
        println!("Seed: {seed}");
        println!();
    }

    let report = run_simulator(config);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.generate_text());
    }
    Ok(report.passed())
}

fn main() -> Result<()> {
    let matches = cli().get_matches();

    match matches.subcommand() {
        Some(("simulate", args)) => {
            init_tracing(args.get_flag("verbose"));
            let passed = simulate(args)?;
            std::process::exit(if passed { 0 } else { 1 });
        }
        _ => Ok(()),
    }
}
