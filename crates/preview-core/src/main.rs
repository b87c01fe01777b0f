use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use preview_core::host::MemoryHost;
use preview_core::normalize::normalize_source;
use preview_core::{
    default_project, logging, BuildStatus, FileNode, FileSource, HostEvent, LivePreview, PreviewConfig,
    ProjectStore, RenderController, RenderStatus,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Command::new("live-preview")
        .version(preview_core::VERSION)
        .about("Live preview pipeline for single-file UI components")
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .global(true)
                .help("Increase log verbosity (RUST_LOG overrides)"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .action(ArgAction::SetTrue)
                .global(true)
                .help("Emit logs as JSON lines"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_parser(value_parser!(PathBuf))
                .global(true)
                .help("TOML configuration file"),
        )
        .subcommand_required(true)
        .subcommand(
            Command::new("build")
                .about("Build one preview document from a project tree")
                .arg(
                    Arg::new("project")
                        .long("project")
                        .value_parser(value_parser!(PathBuf))
                        .help("JSON file holding the project tree (default: starter project)"),
                )
                .arg(
                    Arg::new("out")
                        .long("out")
                        .value_parser(value_parser!(PathBuf))
                        .help("Write the document here instead of stdout"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print the build status as JSON"),
                ),
        )
        .subcommand(
            Command::new("normalize")
                .about("Print the export-normalized form of a source file")
                .arg(
                    Arg::new("file")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Source file to normalize"),
                )
                .arg(
                    Arg::new("strip-imports")
                        .long("strip-imports")
                        .action(ArgAction::SetTrue)
                        .help("Remove import statements first"),
                ),
        )
        .subcommand(
            Command::new("simulate")
                .about("Drive the debounced pipeline with a burst of edits")
                .arg(
                    Arg::new("edits")
                        .long("edits")
                        .default_value("5")
                        .value_parser(value_parser!(u32))
                        .help("Number of edits to apply"),
                )
                .arg(
                    Arg::new("interval-ms")
                        .long("interval-ms")
                        .default_value("100")
                        .value_parser(value_parser!(u64))
                        .help("Delay between edits"),
                ),
        );

    let matches = cli.get_matches();
    let verbosity = matches.get_count("verbose");
    logging::init(verbosity, matches.get_flag("log-json"));

    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => PreviewConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => PreviewConfig::default(),
    };

    match matches.subcommand() {
        Some(("build", args)) => build(args, config),
        Some(("normalize", args)) => normalize(args, &config),
        Some(("simulate", args)) => simulate(args, config).await,
        _ => Ok(()),
    }
}

fn build(args: &ArgMatches, config: PreviewConfig) -> Result<()> {
    let files: Vec<FileNode> = match args.get_one::<PathBuf>("project") {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading project {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parsing project {}", path.display()))?
        }
        None => default_project(),
    };

    let host = Arc::new(MemoryHost::new());
    let controller = RenderController::new(host.clone(), config);
    let generation = controller.rebuild(&files);
    // a one-shot build has no embedded context to report back
    if controller.status().status == RenderStatus::Pending {
        controller.handle_event(HostEvent::Loaded { generation });
    }
    let status = BuildStatus::from_session(&controller.status(), false);

    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("Generation: {}", status.generation);
        println!("Status: {}", status.status);
        if let Some(message) = &status.error_message {
            println!("Error: {message}");
        }
    }

    if status.status == RenderStatus::Error {
        std::process::exit(1);
    }

    let document = host
        .bound_document()
        .context("build succeeded but no document is bound")?;
    match args.get_one::<PathBuf>("out") {
        Some(path) => {
            std::fs::write(path, document).with_context(|| format!("writing {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
        None => println!("{document}"),
    }
    Ok(())
}

fn normalize(args: &ArgMatches, config: &PreviewConfig) -> Result<()> {
    let Some(path) = args.get_one::<PathBuf>("file") else {
        bail!("missing source file");
    };
    let source = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let strip = args.get_flag("strip-imports") || config.strip_imports;
    println!("{}", normalize_source(&source, strip));
    Ok(())
}

async fn simulate(args: &ArgMatches, config: PreviewConfig) -> Result<()> {
    let edits = *args.get_one::<u32>("edits").context("missing --edits")?;
    let interval = Duration::from_millis(*args.get_one::<u64>("interval-ms").context("missing --interval-ms")?);
    let quiet_period = config.quiet_period();

    let store = ProjectStore::with_default_project();
    let app_id = find_id(&store.snapshot(), &config.entry_file)
        .with_context(|| format!("starter project has no `{}`", config.entry_file))?;

    let (host, events) = MemoryHost::with_events(true);
    let host = Arc::new(host);
    let preview = LivePreview::spawn(&store, host.clone(), Some(events), config);

    println!("Running live preview simulation ({})...", chrono::Utc::now().to_rfc3339());
    println!("Edits: {edits}");
    println!("Interval: {}ms", interval.as_millis());
    println!("Quiet period: {}ms", quiet_period.as_millis());
    println!();

    let started = Instant::now();
    for i in 1..=edits {
        let source = format!("function App() {{\n  return <h1>Edit {i}</h1>;\n}}\n\nexport default App;");
        store.update_file_content(&app_id, &source)?;
        tokio::time::sleep(interval).await;
    }
    tokio::time::sleep(quiet_period + Duration::from_millis(200)).await;

    let status = preview.status();
    println!("Elapsed: {:.2}s", started.elapsed().as_secs_f64());
    println!("Generations: {}", status.generation.0);
    println!("Status: {}", status.status);
    println!("Outstanding handles: {}", host.outstanding());
    println!("{}", serde_json::to_string_pretty(&status)?);

    preview.shutdown().await;
    println!("Outstanding handles after shutdown: {}", host.outstanding());
    Ok(())
}

fn find_id(nodes: &[FileNode], name: &str) -> Option<preview_core::NodeId> {
    nodes.iter().find_map(|node| {
        if node.is_file() && node.name == name {
            Some(node.id.clone())
        } else {
            find_id(&node.children, name)
        }
    })
}
