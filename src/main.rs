use anyhow::Context;
use clap::{Parser, Subcommand};
use site_pipeline::config::{self, PipelineConfig};
use site_pipeline::output;
use site_pipeline::pipeline::Pipeline;
use site_pipeline::plan::{self, Plan};
use site_pipeline::reload::{NullNotifier, ReloadHub};
use site_pipeline::server;
use site_pipeline::stage::Stage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn version_string() -> &'static str {
    let hash = env!("PIPELINE_GIT_HASH");
    if hash.is_empty() {
        env!("CARGO_PKG_VERSION")
    } else {
        // Leaked once at startup, called exactly once
        Box::leak(format!("{} ({hash})", env!("CARGO_PKG_VERSION")).into_boxed_str())
    }
}

#[derive(Parser)]
#[command(name = "site-pipeline")]
#[command(about = "Asset pipeline and live-reload dev server for Hugo sites")]
#[command(long_about = "\
Asset pipeline and live-reload dev server for Hugo sites

Project structure:

  pipeline.toml          # Optional config (see 'site-pipeline gen-config')
  src/
  ├── css/*.css          # → style CLI → dist/css
  ├── js/app.js          # → bundler entry
  ├── js/**/*            # → dist/js (everything but the entry)
  ├── fonts/**/*         # → dist/fonts
  ├── img/**/*           # → dist/img
  └── *                  # → dist/
  site/                  # Hugo project → dist/

Commands:
  build           all stages in parallel, then optimize images
  build-preview   like build, with drafts and future posts, no optimize
  server          build, then serve dist/ with live reload and watch sources")]
#[command(version = version_string())]
struct Cli {
    /// Project root
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Config file, relative to the project root
    #[arg(long, default_value = "pipeline.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build every asset and the site, then optimize images
    Build,
    /// Build with drafts and future content, without image optimization
    BuildPreview,
    /// Build, then serve the output with live reload
    Server,
    /// Compile stylesheets
    Css,
    /// Bundle scripts and copy the remaining script files
    Js,
    /// Copy fonts
    Fonts,
    /// Copy files sitting directly in the source directory
    SrcRoot,
    /// Copy images
    Images,
    /// Run the site generator
    Hugo,
    /// Run the site generator with drafts and future content
    HugoPreview,
    /// Generate responsive variants, optimize SVG/GIF, add srcset
    Optimize,
    /// Print a stock pipeline.toml with all options documented
    GenConfig,
}

impl Command {
    fn plan(&self) -> Option<Plan> {
        let stage = match self {
            Command::Build => return Some(Plan::build()),
            Command::BuildPreview => return Some(Plan::build_preview()),
            Command::Server | Command::GenConfig => return None,
            Command::Css => Stage::Css,
            Command::Js => Stage::Js,
            Command::Fonts => Stage::Fonts,
            Command::SrcRoot => Stage::SrcRoot,
            Command::Images => Stage::Images,
            Command::Hugo => Stage::Hugo,
            Command::HugoPreview => Stage::HugoPreview,
            Command::Optimize => Stage::Optimize,
        };
        Some(Plan::single(stage))
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let config = load_config(&cli.root, &cli.config)?;
    init_thread_pool(&config.processing);

    match cli.command.plan() {
        Some(plan) => run_plan(&plan, Pipeline::new(&cli.root, config, NullNotifier)),
        None => run_server(&cli.root, config),
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "site_pipeline=info,tower_http=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(root: &Path, config_path: &Path) -> anyhow::Result<PipelineConfig> {
    let path = root.join(config_path);
    config::load_config(&path).with_context(|| format!("loading {}", path.display()))
}

fn run_plan(plan: &Plan, pipeline: Pipeline<NullNotifier>) -> anyhow::Result<()> {
    output::print_plan_header(plan);
    let start = Instant::now();
    match plan::execute(plan, &pipeline) {
        Ok(reports) => {
            output::print_plan_summary(plan, &reports, start.elapsed());
            Ok(())
        }
        Err(err) => {
            output::print_failure(&err);
            Err(err.into())
        }
    }
}

fn run_server(root: &Path, config: PipelineConfig) -> anyhow::Result<()> {
    let layout = config::Layout::resolve(root, &config.paths);
    let hub = ReloadHub::new(&layout.output, config.server.notify);
    let pipeline = Arc::new(Pipeline::new(root, config, hub));

    output::print_plan_header(&Plan::server());
    let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
    runtime.block_on(server::serve(pipeline))?;
    Ok(())
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores: user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
