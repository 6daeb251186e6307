use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use codeguard_discovery::{Discovery, DiscoveryReport, Provider};
use codeguard_pipeline::Session;
use codeguard_protocol::{results_schema, serialize_json_pretty, AiMode, Category, ResultsModel};
use codeguard_tools::ProcessExecutor;
use config::Config;
use report::{HumanView, JsonView, ResultsView};
use serde_json::json;
use std::env;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod config;
mod report;

#[derive(Parser)]
#[command(name = "codeguard")]
#[command(about = "Code quality pipeline over MCP providers with local fallback", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Config file (overrides CODEGUARD_CONFIG and <path>/codeguard.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover providers and list their capabilities
    Discover(DiscoverArgs),

    /// Show the execution plan for one category without running it
    Plan(PlanArgs),

    /// Run every enabled tool of one category
    Run(RunArgs),

    /// Run all categories, then one AI pass over everything
    #[command(name = "run-all")]
    RunAll(ExecArgs),

    /// Run every capability of one provider
    #[command(name = "run-provider")]
    RunProvider(RunProviderArgs),

    /// Print the JSON Schema of the results document
    Schema,
}

#[derive(Args)]
struct DiscoverArgs {
    /// Project directory (used to find codeguard.toml)
    #[arg(short, long, default_value = ".")]
    path: PathBuf,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct PlanArgs {
    /// linting | formatting | testing | security | dependencies | analysis
    category: Category,

    /// Project directory
    #[arg(short, long, default_value = ".")]
    path: PathBuf,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct RunArgs {
    category: Category,

    #[command(flatten)]
    exec: ExecArgs,
}

#[derive(Args)]
struct RunProviderArgs {
    /// Provider name as shown by `discover`
    name: String,

    #[command(flatten)]
    exec: ExecArgs,
}

#[derive(Args)]
struct ExecArgs {
    /// Project directory
    #[arg(short, long, default_value = ".")]
    path: PathBuf,

    /// off | safe-only | suggest (overrides config and CODEGUARD_AI_MODE)
    #[arg(long)]
    ai_mode: Option<AiMode>,

    /// Report remote failures instead of running tools locally
    #[arg(long)]
    no_local_fallback: bool,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

enum Target {
    Category(Category),
    All,
    Provider(String),
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut cli = Cli::parse();

    // Keep stdout clean for JSON consumers.
    let json_output = match &cli.command {
        Commands::Discover(args) => args.json,
        Commands::Plan(args) => args.json,
        Commands::Run(args) => args.exec.json,
        Commands::RunAll(args) => args.json,
        Commands::RunProvider(args) => args.exec.json,
        Commands::Schema => true,
    };
    if json_output {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Discover(args) => run_discover(args, config_path).await?,
        Commands::Plan(args) => run_plan(args, config_path).await?,
        Commands::Run(args) => {
            run_exec(args.exec, Target::Category(args.category), config_path).await?
        }
        Commands::RunAll(args) => run_exec(args, Target::All, config_path).await?,
        Commands::RunProvider(args) => {
            run_exec(args.exec, Target::Provider(args.name), config_path).await?
        }
        Commands::Schema => print_stdout(&serialize_json_pretty(&results_schema())?)?,
    }

    Ok(())
}

async fn run_discover(args: DiscoverArgs, config_path: Option<&Path>) -> Result<()> {
    let root = args.path.canonicalize().context("Invalid project path")?;
    let config = load_config(config_path, &root)?;
    let (session, found) = open_session(&config).await?;

    if args.json {
        let providers: Vec<_> = session
            .providers()
            .iter()
            .map(|p| json!({"name": p.name(), "capabilities": p.capabilities()}))
            .collect();
        let out = json!({
            "providers": providers,
            "warnings": found.warnings,
            "usedBuiltin": found.used_builtin,
        });
        print_stdout(&serialize_json_pretty(&out)?)
    } else {
        print_stdout(&report::render_providers(session.providers(), &found.warnings))
    }
}

async fn run_plan(args: PlanArgs, config_path: Option<&Path>) -> Result<()> {
    let root = args.path.canonicalize().context("Invalid project path")?;
    let config = load_config(config_path, &root)?;
    let (session, _) = open_session(&config).await?;
    let plan = session.plan(args.category, &root, &config.selection(args.category)?);

    if args.json {
        print_stdout(&serialize_json_pretty(&plan)?)
    } else {
        print_stdout(&report::render_plan(&plan))
    }
}

async fn run_exec(exec: ExecArgs, target: Target, config_path: Option<&Path>) -> Result<()> {
    let root = exec.path.canonicalize().context("Invalid project path")?;
    let mut config = load_config(config_path, &root)?;
    if let Some(mode) = exec.ai_mode {
        config.ai_mode = mode;
    }
    if exec.no_local_fallback {
        config.prefer_remote = false;
    }

    let (mut session, _) = open_session(&config).await?;
    let mut view: Box<dyn ResultsView> = if exec.json {
        Box::new(JsonView::new(io::stdout()))
    } else {
        Box::new(HumanView::new(io::stdout()))
    };

    let model = match target {
        Target::Category(category) => {
            let enabled = config.selection(category)?;
            session.run_category(category, &root, &enabled).await
        }
        Target::All => {
            let selections = config.selections()?;
            session
                .run_all_with_progress(&root, &selections, |category, results| {
                    log::debug!("{category} done");
                    let partial = ResultsModel {
                        results: results.to_vec(),
                        remaining: Vec::new(),
                    };
                    if let Err(err) = view.update_results_view(&partial) {
                        log::warn!("Failed to update results view: {err}");
                    }
                })
                .await
        }
        Target::Provider(name) => session.run_provider(&name, &root).await?,
    };

    view.show_results(model)?;
    if !model.is_clean() {
        std::process::exit(1);
    }
    Ok(())
}

fn load_config(explicit: Option<&Path>, root: &Path) -> Result<Config> {
    let mut config = Config::load(explicit, root)?;
    config.apply_env(|key| env::var(key).ok())?;
    Ok(config)
}

async fn open_session(config: &Config) -> Result<(Session, DiscoveryReport)> {
    let discovery =
        Discovery::new(config.discovery_config()).context("Failed to build HTTP client")?;
    let registry = Arc::new(config.registry());
    let local = Arc::new(ProcessExecutor::new(
        Arc::clone(&registry),
        config.local_config(),
    ));
    let mut session = Session::new(registry, local, config.dispatch_config(), config.ai_mode);
    let report = session.refresh(&discovery, &config.servers).await;
    Ok((session, report))
}

fn print_stdout(text: &str) -> Result<()> {
    report::write_text(&mut io::stdout(), text)
}
