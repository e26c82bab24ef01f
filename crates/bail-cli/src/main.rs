use anyhow::{bail, Context, Result};
use bail_cli::commands::{parse_ops, progress_text, schema_listing};
use bail_cli::{CliConfig, JsonDirStore};
use bail_core::{SessionId, SessionOrchestrator};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn session_arg() -> Arg {
    Arg::new("session")
        .required(true)
        .value_parser(value_parser!(String))
        .help("Session id ([A-Za-z0-9_-], up to 128 characters)")
}

fn json_flag() -> Arg {
    Arg::new("json")
        .long("json")
        .action(ArgAction::SetTrue)
        .help("Output as JSON")
}

fn cli() -> Command {
    Command::new("bail")
        .version(bail_core::VERSION)
        .about("Fill and render French furnished-lease contracts")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("data-dir")
                .long("data-dir")
                .env("BAIL_DATA_DIR")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Directory of session records"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .subcommand(Command::new("schema").about("List every declared field"))
        .subcommand(Command::new("list").about("List stored sessions"))
        .subcommand(
            Command::new("new").about("Create an empty session").arg(
                Arg::new("id")
                    .long("id")
                    .value_parser(value_parser!(String))
                    .help("Session id (random if omitted)"),
            ),
        )
        .subcommand(
            Command::new("apply")
                .about("Apply a JSON batch of operations")
                .arg(session_arg())
                .arg(
                    Arg::new("file")
                        .long("file")
                        .short('f')
                        .value_parser(value_parser!(PathBuf))
                        .help("Batch file (stdin if omitted)"),
                ),
        )
        .subcommand(
            Command::new("render")
                .about("Render the contract as HTML")
                .arg(session_arg())
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .value_parser(value_parser!(PathBuf))
                        .help("Write the document here instead of stdout"),
                ),
        )
        .subcommand(
            Command::new("progress")
                .about("Show completion per section")
                .arg(session_arg())
                .arg(json_flag()),
        )
        .subcommand(
            Command::new("show")
                .about("Show the fields of one section, or the whole record")
                .arg(session_arg())
                .arg(
                    Arg::new("section")
                        .long("section")
                        .value_parser(value_parser!(String))
                        .help("Top-level section key"),
                ),
        )
}

fn session_id(args: &ArgMatches) -> Result<SessionId> {
    let raw = args
        .get_one::<String>("session")
        .context("missing session id")?;
    Ok(raw.parse()?)
}

fn read_batch(args: &ArgMatches) -> Result<String> {
    match args.get_one::<PathBuf>("file") {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("cannot read batch {}", path.display())),
        None => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .context("cannot read batch from stdin")?;
            Ok(input)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let matches = cli().get_matches();

    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => CliConfig::load(path)?,
        None => CliConfig::default(),
    };
    let data_dir = config.resolve_data_dir(
        matches
            .get_one::<PathBuf>("data-dir")
            .map(PathBuf::as_path),
    );
    let store = Arc::new(JsonDirStore::new(&data_dir));
    let orchestrator =
        SessionOrchestrator::furnished_lease(store.clone(), config.orchestrator.clone())?;
    tracing::debug!(data_dir = %data_dir.display(), "store opened");

    match matches.subcommand() {
        Some(("schema", _)) => print!("{}", schema_listing(orchestrator.schema())),
        Some(("list", _)) => {
            for id in store.list().await? {
                println!("{id}");
            }
        }
        Some(("new", args)) => {
            let id = match args.get_one::<String>("id") {
                Some(raw) => raw.parse()?,
                None => SessionId::generate(),
            };
            let session = orchestrator.get_or_create(&id).await?;
            println!("{}", session.id());
        }
        Some(("apply", args)) => {
            let id = session_id(args)?;
            let ops = parse_ops(&read_batch(args)?).context("invalid batch")?;
            let report = orchestrator.apply_mutation_batch(&id, &ops).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if report.has_errors() {
                std::process::exit(2);
            }
        }
        Some(("render", args)) => {
            let id = session_id(args)?;
            let render = orchestrator.current_render(&id).await?;
            match args.get_one::<PathBuf>("output") {
                Some(path) => std::fs::write(path, &render.document)
                    .with_context(|| format!("cannot write {}", path.display()))?,
                None => print!("{}", render.document),
            }
            eprintln!(
                "version {}, {} unresolved, digest {}",
                render.state_version,
                render.unresolved.len(),
                render.digest.short()
            );
            for path in &render.unresolved {
                eprintln!("  à compléter: {path}");
            }
        }
        Some(("progress", args)) => {
            let id = session_id(args)?;
            let report = orchestrator.progress(&id).await?;
            if args.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", progress_text(&report));
            }
        }
        Some(("show", args)) => {
            let id = session_id(args)?;
            match args.get_one::<String>("section") {
                Some(section) => {
                    let details = orchestrator.section_details(&id, section).await?;
                    println!("{}", serde_json::to_string_pretty(&details)?);
                }
                None => {
                    let session = orchestrator.get_or_create(&id).await?;
                    println!("{}", serde_json::to_string_pretty(&session.to_record())?);
                }
            }
        }
        Some((other, _)) => bail!("unknown subcommand {other}"),
        None => bail!("no subcommand given"),
    }
    Ok(())
}
