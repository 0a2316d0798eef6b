//! Bundlestore CLI
//!
//! Builds activity bundles and publishes them as a static catalog.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use bundlestore::{
    error::{AppError, Result},
    models::{Config, FeedIndexEntry, FeedState},
    pipeline::{self, FeedGenerator, ProgressDisplay},
    services::{LogNotifier, TemplateRenderer, TokioRunner},
    storage::{FEED_STATE_FILE, INDEX_FILE, LocalStorage},
};

/// Bundlestore - static catalog generator for activity bundles
#[derive(Parser, Debug)]
#[command(
    name = "bundlestore",
    version,
    about = "Build activity bundles and publish them as a static catalog"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "bundlestore.toml")]
    config: PathBuf,

    /// Directory scanned for bundles (overrides paths.input)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output directory of the generated site (overrides paths.output)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Clear existing output without asking
    #[arg(short = 'y', long)]
    noconfirm: bool,

    /// Hide progress bars
    #[arg(long)]
    no_progress: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List discovered bundles
    List,

    /// Build every source bundle into a `.xo` artifact
    Build {
        #[command(flatten)]
        build: BuildArgs,
    },

    /// Generate the catalog site
    Generate {
        /// Build bundles before generating
        #[arg(long)]
        build: bool,

        #[command(flatten)]
        build_args: BuildArgs,

        /// Name copied icons after the bundle id
        #[arg(long)]
        unique_icons: bool,

        /// Include screenshot carousels
        #[arg(long)]
        screenshots: bool,

        /// Include flatpak cards for registered repositories
        #[arg(long)]
        flatpaks: bool,

        /// Static asset directory (templates, css, js, ...)
        #[arg(long)]
        static_dir: Option<PathBuf>,

        /// Also write sitemap.xml for this public domain
        #[arg(long, value_name = "DOMAIN")]
        sitemap: Option<String>,
    },

    /// Write sitemap.xml for discovered bundles
    Sitemap {
        /// Public domain (defaults to feed.domain)
        #[arg(long)]
        domain: Option<String>,
    },

    /// Install discovered bundles
    Install {
        /// Install system-wide instead of for the current user
        #[arg(long)]
        system: bool,
    },

    /// Validate configuration
    Validate,

    /// Show the state of the output directory
    Info,
}

/// Flags shared by commands that run the build step.
#[derive(clap::Args, Debug, Default)]
struct BuildArgs {
    /// Skip the default setup.py step and only run the entrypoint
    #[arg(long = "override")]
    override_default: bool,

    /// Script template run for each bundle
    #[arg(long)]
    entrypoint: Option<PathBuf>,

    /// Run the entrypoint inside each bundle directory
    #[arg(long)]
    chdir: bool,

    /// Build git checkouts from their newest tag
    #[arg(long)]
    checkout_latest_tag: bool,
}

impl BuildArgs {
    fn apply(&self, config: &mut Config) {
        if self.override_default {
            config.build.override_default = true;
        }
        if let Some(entrypoint) = &self.entrypoint {
            config.build.entrypoint = Some(entrypoint.clone());
        }
        if self.chdir {
            config.build.chdir = true;
        }
        if self.checkout_latest_tag {
            config.build.checkout_latest_tag = true;
        }
    }
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Ask before clearing an existing output directory.
fn confirm_overwrite(dir: &Path) -> bool {
    let prompt = format!("{} already exists. Clear generated files?", dir.display());
    inquire::Confirm::new(&prompt)
        .with_default(false)
        .prompt()
        .unwrap_or_else(|e| {
            log::warn!("Confirmation unavailable: {}", e);
            false
        })
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load_if_exists(&cli.config)?;
    config.apply_env();
    if let Some(input) = &cli.input {
        config.paths.input = input.clone();
    }
    if let Some(output) = &cli.output {
        config.paths.output = output.clone();
    }

    let show_progress = !cli.no_progress && !cli.verbose;
    let storage = LocalStorage::new(&config.paths.output);

    match cli.command {
        Command::List => {
            let bundles = pipeline::scan_required(&config.paths.input)?;
            for bundle in &bundles {
                println!(
                    "{}\t{}\t{}\t{}",
                    bundle.label(),
                    bundle.version().unwrap_or("-"),
                    bundle.bundle_id(),
                    bundle
                        .artifact_path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "(not built)".into())
                );
            }
            log::info!("{} bundles in {}", bundles.len(), config.paths.input.display());
        }

        Command::Build { build } => {
            build.apply(&mut config);
            config.validate()?;

            let mut bundles = pipeline::scan_required(&config.paths.input)?;
            let progress = ProgressDisplay::new(bundles.len(), show_progress);
            let summary =
                pipeline::build_all(&mut bundles, &TokioRunner, &config.build, true, &progress)
                    .await?;
            log::info!("Build finished: {}", summary);
        }

        Command::Generate {
            build,
            build_args,
            unique_icons,
            screenshots,
            flatpaks,
            static_dir,
            sitemap,
        } => {
            build_args.apply(&mut config);
            config.feed.unique_icons |= unique_icons;
            config.feed.include_screenshots |= screenshots;
            config.feed.include_flatpaks |= flatpaks;
            if static_dir.is_some() {
                config.paths.static_dir = static_dir;
            }
            config.validate()?;

            let mut bundles = pipeline::scan_required(&config.paths.input)?;
            if build {
                let progress = ProgressDisplay::new(bundles.len(), show_progress);
                let summary = pipeline::build_all(
                    &mut bundles,
                    &TokioRunner,
                    &config.build,
                    true,
                    &progress,
                )
                .await?;
                log::info!("Build finished: {}", summary);
            }

            let renderer = TemplateRenderer::new(config.paths.static_dir.as_deref());
            let notifier = LogNotifier;
            let generator = FeedGenerator::new(&config, &renderer, &notifier)?;
            let progress = ProgressDisplay::new(bundles.len(), show_progress);
            generator
                .generate(&bundles, cli.noconfirm, confirm_overwrite, &progress)
                .await?;

            if let Some(domain) = sitemap {
                pipeline::generate_sitemap(&bundles, &domain, &storage).await?;
            }
        }

        Command::Sitemap { domain } => {
            let bundles = pipeline::scan(&config.paths.input)?;
            let domain = domain.unwrap_or_else(|| config.feed.domain.clone());
            pipeline::generate_sitemap(&bundles, &domain, &storage).await?;
        }

        Command::Install { system } => {
            config.validate()?;
            let bundles = pipeline::scan_required(&config.paths.input)?;
            let progress = ProgressDisplay::new(bundles.len(), show_progress);
            pipeline::install_all(&bundles, &TokioRunner, &config.build, system, &progress)
                .await?;
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            for (label, path) in [
                ("static_dir", &config.paths.static_dir),
                ("flatpak_registry", &config.paths.flatpak_registry),
                ("placeholder_icon", &config.paths.placeholder_icon),
                ("bots_file", &config.paths.bots_file),
            ] {
                if let Some(path) = path.as_deref().filter(|p| !p.exists()) {
                    return Err(AppError::config(format!(
                        "paths.{label} {} does not exist",
                        path.display()
                    )));
                }
            }
            log::info!("Config OK");
        }

        Command::Info => {
            log::info!("Input directory: {}", config.paths.input.display());
            log::info!("Output directory: {}", storage.root().display());

            match storage.read_json::<Vec<FeedIndexEntry>>(INDEX_FILE).await? {
                Some(index) => log::info!("Catalog index: {} bundles", index.len()),
                None => log::info!("No catalog generated yet."),
            }
            if let Some(state) = storage.read_json::<FeedState>(FEED_STATE_FILE).await? {
                let generated = chrono::DateTime::from_timestamp(state.generated as i64, 0)
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| state.generated.to_string());
                log::info!("Last generated: {}", generated);
                log::info!("Tracked releases: {}", state.bundles.len());
            }
        }
    }

    Ok(())
}
