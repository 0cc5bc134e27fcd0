// src/main.rs

use anyhow::Result;
use appnest::config::Config;
use appnest::desktop::{
    ActionTranslations, CollisionResolver, EntryRegistrar, EntrySynthesizer, HelperCommand,
    Registrar,
};
use appnest::image::{ElfInspector, ImageDescriptor};
use appnest::integration::confirm::{self, Confirmation, Decision, HeadlessConfirmation, Prompt};
use appnest::integration::{IntegrationResult, Integrator, TracingReporter};
use appnest::maintenance::{self, StaleEntryCollector, StalenessDetector, Systemctl};
use appnest::paths;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{info, warn};

/// External tool performing delta updates of images
const UPDATER_TOOL: &str = "appimageupdatetool";

#[derive(Parser)]
#[command(name = "appnest")]
#[command(author, version, about = "Desktop integration for AppImages", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Move an AppImage to the integration folder and add it to the menu
    Integrate {
        /// Path to the AppImage
        path: PathBuf,
        /// Keep the launcher name even if another entry uses it
        #[arg(long)]
        no_resolve_collisions: bool,
    },
    /// Remove launcher entries whose AppImage no longer exists
    Clean {
        /// Log every removed entry
        #[arg(short, long)]
        verbose: bool,
    },
    /// Remove an integrated AppImage with its launcher entry and icons
    Remove {
        /// Path to the integrated AppImage
        path: PathBuf,
        /// Delete without asking
        #[arg(short, long)]
        yes: bool,
    },
    /// Update an integrated AppImage and refresh its launcher entry
    Update {
        /// Path to the integrated AppImage
        path: PathBuf,
    },
    /// Show integration details of an AppImage
    Status {
        /// Path to the AppImage
        path: PathBuf,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the effective configuration
    Config {
        /// Write a configuration file with commented defaults if none exists
        #[arg(long)]
        init: bool,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type
        shell: Shell,
    },
}

/// Interactive prompts on the terminal
struct TerminalConfirmation;

impl Confirmation for TerminalConfirmation {
    fn confirm(&self, prompt: &Prompt<'_>) -> Decision {
        let answer = dialoguer::Confirm::new()
            .with_prompt(prompt.message())
            .default(prompt.default_decision() == Decision::Yes)
            .interact_opt();

        match answer {
            Ok(Some(true)) => Decision::Yes,
            Ok(Some(false)) => Decision::No,
            // Esc or q
            Ok(None) => Decision::Cancel,
            Err(e) => {
                warn!("Prompt failed, using default answer: {}", e);
                prompt.default_decision()
            }
        }
    }
}

/// Answers every prompt with yes, for `--yes`
struct AssumeYes;

impl Confirmation for AssumeYes {
    fn confirm(&self, _prompt: &Prompt<'_>) -> Decision {
        Decision::Yes
    }
}

/// Process-wide settings and locations, loaded once
struct Context {
    config: Config,
    applications_dir: PathBuf,
    icons_dir: PathBuf,
    own_binary: PathBuf,
}

impl Context {
    fn load() -> Result<Self> {
        Ok(Self {
            config: Config::load()?,
            applications_dir: paths::user_applications_dir()?,
            icons_dir: paths::user_icons_dir()?,
            own_binary: std::env::current_exe()?,
        })
    }

    fn registrar(&self) -> EntryRegistrar {
        EntryRegistrar::new(self.applications_dir.clone(), self.icons_dir.clone())
    }

    fn translations(&self) -> ActionTranslations {
        paths::translations_dir(&self.own_binary)
            .map(|dir| ActionTranslations::load_from_dir(&dir))
            .unwrap_or_default()
    }

    fn synthesizer<'a>(
        &self,
        inspector: &'a ElfInspector,
        reporter: &'a TracingReporter,
    ) -> Result<EntrySynthesizer<'a>> {
        Ok(EntrySynthesizer::new(
            inspector,
            CollisionResolver::new(paths::launcher_dirs()?),
            HelperCommand::new(self.own_binary.clone()),
            reporter,
        )
        .with_translations(self.translations()))
    }

    fn refresh_caches(&self) {
        maintenance::refresh_desktop_caches(&self.applications_dir, &self.icons_dir);
    }
}

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Integrate {
            path,
            no_resolve_collisions,
        }) => cmd_integrate(&Context::load()?, &path, !no_resolve_collisions),
        Some(Commands::Clean { verbose }) => {
            let ctx = Context::load()?;
            let collector =
                StaleEntryCollector::new(ctx.applications_dir.clone(), ctx.icons_dir.clone());
            let removed = collector.collect(verbose);
            if removed > 0 {
                ctx.refresh_caches();
            }
            println!("Removed {} stale launcher entr{}", removed, if removed == 1 { "y" } else { "ies" });
            Ok(())
        }
        Some(Commands::Remove { path, yes }) => cmd_remove(&Context::load()?, &path, yes),
        Some(Commands::Update { path }) => cmd_update(&Context::load()?, &path),
        Some(Commands::Status { path, json }) => cmd_status(&Context::load()?, &path, json),
        Some(Commands::Config { init }) => cmd_config(init),
        Some(Commands::Completions { shell }) => {
            clap_complete::generate(shell, &mut Cli::command(), "appnest", &mut std::io::stdout());
            Ok(())
        }
        None => {
            println!("AppNest v{}", env!("CARGO_PKG_VERSION"));
            println!("Run 'appnest --help' for usage information");
            Ok(())
        }
    }
}

fn cmd_integrate(ctx: &Context, path: &Path, resolve_collisions: bool) -> Result<()> {
    let path = std::path::absolute(path)?;
    info!("Integrating {}", path.display());

    let inspector = ElfInspector::new();
    let reporter = TracingReporter;
    let registrar = ctx.registrar();
    let confirmation = confirmation(false);

    let integrator = Integrator::new(
        &inspector,
        ctx.config.destination_policy(),
        confirmation.as_ref(),
        &registrar,
        ctx.synthesizer(&inspector, &reporter)?,
        &reporter,
    )
    .with_collision_resolution(resolve_collisions);

    // resolved up front, the source is gone after a successful move
    let destination = integrator.destination_for(&path);

    match integrator.integrate(&path) {
        IntegrationResult::Successful => {
            ctx.refresh_caches();
            println!("Integrated {}", destination.display());
            Ok(())
        }
        IntegrationResult::Aborted => {
            println!("Integration aborted, {} was left in place", path.display());
            Ok(())
        }
        IntegrationResult::Failed => Err(anyhow::anyhow!(
            "Failed to integrate {}",
            path.display()
        )),
    }
}

fn confirmation(assume_yes: bool) -> Box<dyn Confirmation> {
    if assume_yes {
        Box::new(AssumeYes)
    } else if confirm::is_headless() {
        Box::new(HeadlessConfirmation)
    } else {
        Box::new(TerminalConfirmation)
    }
}

fn cmd_remove(ctx: &Context, path: &Path, assume_yes: bool) -> Result<()> {
    let path = std::path::absolute(path)?;
    let inspector = ElfInspector::new();
    let reporter = TracingReporter;
    let registrar = ctx.registrar();
    let confirmation = confirmation(assume_yes);

    let integrator = Integrator::new(
        &inspector,
        ctx.config.destination_policy(),
        confirmation.as_ref(),
        &registrar,
        ctx.synthesizer(&inspector, &reporter)?,
        &reporter,
    );

    match integrator.remove(&path) {
        IntegrationResult::Successful => {
            ctx.refresh_caches();
            println!("Removed {}", path.display());
            Ok(())
        }
        IntegrationResult::Aborted => {
            println!("Nothing removed");
            Ok(())
        }
        IntegrationResult::Failed => Err(anyhow::anyhow!("Failed to remove {}", path.display())),
    }
}

fn cmd_update(ctx: &Context, path: &Path) -> Result<()> {
    let path = std::path::absolute(path)?;
    let inspector = ElfInspector::new();
    let reporter = TracingReporter;
    let registrar = ctx.registrar();

    match which::which(UPDATER_TOOL) {
        Ok(tool) => {
            info!("Updating {} with {}", path.display(), tool.display());
            let status = Command::new(&tool).arg("-O").arg(&path).status()?;
            if !status.success() {
                return Err(anyhow::anyhow!(
                    "{} failed for {} ({})",
                    UPDATER_TOOL,
                    path.display(),
                    status
                ));
            }
        }
        Err(_) => warn!("{} is not installed, refreshing launcher only", UPDATER_TOOL),
    }

    let launcher = registrar.register(&path)?;
    ctx.synthesizer(&inspector, &reporter)?
        .synthesize(&launcher, &path, false)?;

    ctx.refresh_caches();
    println!("Updated {}", path.display());
    Ok(())
}

/// Integration details printed by `status`
#[derive(Debug, Serialize)]
struct StatusReport {
    image: PathBuf,
    format: String,
    digest: Option<String>,
    destination: PathBuf,
    integrated: bool,
    launcher: Option<PathBuf>,
    launcher_outdated: bool,
    /// Only reported when the mount service is enabled
    mount_service_current: Option<bool>,
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

fn cmd_status(ctx: &Context, path: &Path, json: bool) -> Result<()> {
    let path = std::path::absolute(path)?;
    let inspector = ElfInspector::new();
    let registrar = ctx.registrar();

    let descriptor = ImageDescriptor::inspect(&path, &inspector);
    let destination =
        appnest::integration::resolve_destination(&descriptor, &ctx.config.destination_policy());
    let registered = registrar.is_registered(&path);
    let launcher = registered.then(|| registrar.entry_path(&path));
    let integrated =
        registered && appnest::integration::is_in_directory(&path, &ctx.config.destination());

    let detector = StalenessDetector::new(
        ctx.own_binary.clone(),
        Box::new(registrar),
        Box::new(Systemctl),
        paths::MOUNT_SERVICE_UNIT,
    );

    let report = StatusReport {
        format: descriptor.format.as_str().to_string(),
        digest: descriptor.digest.clone(),
        destination,
        integrated,
        launcher,
        launcher_outdated: detector.is_entry_stale(&path),
        mount_service_current: ctx
            .config
            .enable_daemon()
            .then(|| detector.has_background_service_restarted()),
        image: path,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Image: {}", report.image.display());
    println!("  Format: {}", report.format);
    println!("  Digest: {}", report.digest.as_deref().unwrap_or("none"));
    println!("  Destination: {}", report.destination.display());
    println!("  Integrated: {}", yes_no(report.integrated));
    if let Some(launcher) = &report.launcher {
        println!("  Launcher: {}", launcher.display());
    }
    println!("  Launcher outdated: {}", yes_no(report.launcher_outdated));
    if let Some(current) = report.mount_service_current {
        println!("  Mount service current: {}", yes_no(current));
    }

    Ok(())
}

fn cmd_config(init: bool) -> Result<()> {
    let path = paths::config_file_path()?;
    let config = Config::load()?;

    if init {
        if path.exists() {
            println!("Configuration already exists at {}", path.display());
        } else {
            config.write_to(&path)?;
            println!("Wrote {}", path.display());
        }
        return Ok(());
    }

    println!("# {}", path.display());
    print!("{}", config.render());
    println!();
    println!("ask_to_move: {}", config.ask_to_move());
    println!("destination: {}", config.destination().display());
    println!("enable_daemon: {}", config.enable_daemon());
    Ok(())
}
