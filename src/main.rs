// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, error, info, warn};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use scenefit::alignment::{MultiTrackAligner, Track};
use scenefit::analysis::{DurationAnalyzer, MediaAsset};
use scenefit::app_config::{self, Config};
use scenefit::archive::{TimelineArchiver, list_projects};
use scenefit::errors::AppError;
use scenefit::file_utils::FileManager;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fit a scene list to a target duration
    Reconcile {
        /// JSON file holding an array of scene records
        #[arg(value_name = "SCENES")]
        input: PathBuf,

        /// Target total duration in seconds
        #[arg(short, long)]
        target: f64,

        /// Where to write the reconciled records (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write the per-stage report as JSON
        #[arg(long)]
        report: Option<PathBuf>,

        /// Archive the result under this project id
        #[arg(long)]
        archive_project: Option<String>,
    },

    /// Align media tracks to a common duration
    Align {
        /// JSON file holding an object of tracks keyed by id, or an array of tracks
        #[arg(value_name = "TRACKS")]
        input: PathBuf,

        /// Where to write the aligned tracks (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Measure the duration of media assets
    Analyze {
        /// JSON file holding one asset description or an array of them
        #[arg(value_name = "ASSETS")]
        input: PathBuf,

        /// Check this duration against container metadata instead
        #[arg(long)]
        verify: Option<f64>,
    },

    /// Manage archived timeline versions
    Archive {
        /// Project id
        #[arg(short, long, default_value = "default")]
        project: String,

        /// Archive root directory (overrides the config)
        #[arg(long)]
        root: Option<PathBuf>,

        #[command(subcommand)]
        action: ArchiveAction,
    },

    /// Generate shell completions for scenefit
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand, Debug)]
enum ArchiveAction {
    /// Save a scene list as a version
    Save {
        #[arg(value_name = "SCENES")]
        input: PathBuf,
        #[arg(short, long, default_value = "")]
        note: String,
    },
    /// Print or write the scenes of a version
    Load {
        version: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List versions
    List {
        #[arg(long)]
        limit: Option<usize>,
        /// List oldest versions first (newest first by default)
        #[arg(long)]
        oldest_first: bool,
    },
    /// Delete a version
    Delete { version: String },
    /// Compare two versions
    Compare { version_a: String, version_b: String },
    /// Export a version file
    Export { version: String, path: PathBuf },
    /// Import a version file or a bare scene list
    Import {
        path: PathBuf,
        #[arg(short, long)]
        note: Option<String>,
    },
    /// Make a version current
    Checkout { version: String },
    /// List archived projects
    Projects,
}

/// scenefit - scene timeline reconciliation
///
/// Fits ordered video scene lists to a target duration, aligns media tracks
/// and keeps a version history of timelines.
#[derive(Parser, Debug)]
#[command(name = "scenefit")]
#[command(version)]
#[command(about = "Scene timeline reconciliation engine")]
#[command(long_about = "scenefit fits scene lists to hard duration constraints while protecting important scenes.

EXAMPLES:
    scenefit reconcile scenes.json --target 100          # Fit to 100 seconds, print records
    scenefit reconcile scenes.json -t 60 -o out.json     # Write the result to a file
    scenefit align tracks.json                           # Align tracks to the base track
    scenefit analyze assets.json                         # Measure asset durations
    scenefit archive -p demo save scenes.json -n first   # Archive a timeline
    scenefit archive -p demo list --limit 5              # Show the newest versions
    scenefit completions bash > scenefit.bash            # Generate bash completions

CONFIGURATION:
    Configuration is stored in scenefit.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "scenefit.json", global = true)]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji and ANSI colour for log level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("❌ ", "1;31"),
            Level::Warn => ("🚧 ", "1;33"),
            Level::Info => (" ", "1;32"),
            Level::Debug => ("🔍 ", "1;36"),
            Level::Trace => ("📋 ", "1;35"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (emoji, colour) = Self::style_for_level(record.level());
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "\x1B[{}m{} {} {}\x1B[0m",
                colour,
                now,
                emoji,
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn main() -> Result<()> {
    // Trace so the level set after loading the config is the effective filter
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "scenefit", &mut std::io::stdout());
        return Ok(());
    }

    let config = load_config(&cli.config_path, cli.log_level.clone())?;

    let outcome = match cli.command {
        Commands::Reconcile {
            input,
            target,
            output,
            report,
            archive_project,
        } => run_reconcile(
            &config,
            &input,
            target,
            output.as_deref(),
            report.as_deref(),
            archive_project.as_deref(),
        ),
        Commands::Align { input, output } => run_align(&config, &input, output.as_deref()),
        Commands::Analyze { input, verify } => run_analyze(&config, &input, verify),
        Commands::Archive {
            project,
            root,
            action,
        } => run_archive(&config, &project, root, action),
        Commands::Completions { .. } => Ok(()),
    };

    if let Err(e) = outcome {
        error!("{:#}", e);
        std::process::exit(1);
    }
    Ok(())
}

/// Load or create the configuration and apply the effective log level
fn load_config(config_path: &str, cli_level: Option<CliLogLevel>) -> Result<Config> {
    let mut config = Config::load_or_create(config_path)
        .with_context(|| format!("Failed to load config file: {}", config_path))?;

    // Command line wins over the file
    if let Some(level) = cli_level {
        config.log_level = level.into();
    }
    log::set_max_level(config.log_level.to_level_filter());

    config
        .validate()
        .context("Configuration validation failed")?;
    Ok(config)
}

fn read_json(path: &Path) -> Result<Value> {
    let content = FileManager::read_to_string(path)?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse JSON: {:?}", path))
}

/// Write pretty JSON to a file, or to stdout when no path is given
fn write_json<T: Serialize + ?Sized>(path: Option<&Path>, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    match path {
        Some(path) => {
            FileManager::write_to_file(path, &json)?;
            info!("Wrote {:?}", path);
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn open_archiver(config: &Config, root: Option<PathBuf>, project: &str) -> Result<TimelineArchiver> {
    let root = match root {
        Some(root) => root,
        None => config.archive.resolve_root()?,
    };
    Ok(TimelineArchiver::open(&root, project).map_err(AppError::from)?)
}

fn run_reconcile(
    config: &Config,
    input: &Path,
    target: f64,
    output: Option<&Path>,
    report: Option<&Path>,
    archive_project: Option<&str>,
) -> Result<()> {
    let records = read_json(input)?;
    let scenes = config.schema.to_scenes(&records).map_err(AppError::from)?;
    info!("Loaded {} scenes from {:?}", scenes.len(), input);

    let outcome = config
        .pipeline()
        .reconcile(&scenes, target)
        .map_err(AppError::from)?;

    if let Some(project) = archive_project {
        let archiver = open_archiver(config, None, project)?;
        let version = archiver
            .save(&outcome.scenes, &format!("reconcile to {:.3}s", target))
            .map_err(AppError::from)?;
        info!("Archived result as {} in project {}", version, project);
    }

    if let Some(report_path) = report {
        write_json(Some(report_path), &outcome.report)?;
    }
    write_json(output, &config.schema.to_records(&outcome.scenes, &records))
}

fn run_align(config: &Config, input: &Path, output: Option<&Path>) -> Result<()> {
    let value = read_json(input)?;
    let aligner = MultiTrackAligner::new(config.alignment.clone());

    match value {
        Value::Array(_) => {
            let tracks: Vec<Track> =
                serde_json::from_value(value).context("Failed to parse track list")?;
            let keyed: BTreeMap<String, Track> =
                tracks.iter().map(|t| (t.id.clone(), t.clone())).collect();
            if keyed.len() != tracks.len() {
                return Err(anyhow!("Track ids must be unique"));
            }
            let mut aligned = aligner.align(&keyed).map_err(AppError::from)?;
            let ordered: Vec<Track> = tracks
                .iter()
                .filter_map(|t| aligned.remove(&t.id))
                .collect();
            write_json(output, &ordered)
        }
        Value::Object(_) => {
            let mut tracks: BTreeMap<String, Track> =
                serde_json::from_value(value).context("Failed to parse track map")?;
            // Keys are authoritative when they disagree with embedded ids
            for (key, track) in tracks.iter_mut() {
                if track.id != *key {
                    warn!("Track key {} overrides id {}", key, track.id);
                    track.id = key.clone();
                }
            }
            let aligned = aligner.align(&tracks).map_err(AppError::from)?;
            write_json(output, &aligned)
        }
        _ => Err(anyhow!("Expected an array or object of tracks in {:?}", input)),
    }
}

fn run_analyze(config: &Config, input: &Path, verify: Option<f64>) -> Result<()> {
    let value = read_json(input)?;
    let assets: Vec<MediaAsset> = if value.is_array() {
        serde_json::from_value(value).context("Failed to parse asset list")?
    } else {
        vec![serde_json::from_value(value).context("Failed to parse asset")?]
    };
    let analyzer = DurationAnalyzer::new(config.analyzer.clone());

    let mut results = Vec::with_capacity(assets.len());
    for asset in &assets {
        let entry = match verify {
            Some(duration) => serde_json::json!({
                "asset": asset.name,
                "duration": duration,
                "verified": analyzer.verify(asset, duration),
            }),
            None => {
                let report = analyzer.analyze(asset).map_err(AppError::from)?;
                serde_json::json!({ "asset": asset.name, "report": report })
            }
        };
        results.push(entry);
    }
    write_json(None, &results)
}

fn run_archive(
    config: &Config,
    project: &str,
    root: Option<PathBuf>,
    action: ArchiveAction,
) -> Result<()> {
    if let ArchiveAction::Projects = action {
        let root = match root {
            Some(root) => root,
            None => config.archive.resolve_root()?,
        };
        let projects = list_projects(&root).map_err(AppError::from)?;
        return write_json(None, &projects);
    }

    let archiver = open_archiver(config, root, project)?;
    match action {
        ArchiveAction::Save { input, note } => {
            let records = read_json(&input)?;
            let scenes = config.schema.to_scenes(&records).map_err(AppError::from)?;
            let version = archiver.save(&scenes, &note).map_err(AppError::from)?;
            println!("{}", version);
        }
        ArchiveAction::Load { version, output } => {
            let scenes = archiver.load(&version).map_err(AppError::from)?;
            write_json(output.as_deref(), &scenes)?;
        }
        ArchiveAction::List {
            limit,
            oldest_first,
        } => {
            let versions = archiver.list(limit, !oldest_first).map_err(AppError::from)?;
            write_json(None, &versions)?;
        }
        ArchiveAction::Delete { version } => {
            archiver.delete(&version).map_err(AppError::from)?;
        }
        ArchiveAction::Compare {
            version_a,
            version_b,
        } => {
            let diff = archiver
                .compare(&version_a, &version_b)
                .map_err(AppError::from)?;
            write_json(None, &diff)?;
        }
        ArchiveAction::Export { version, path } => {
            archiver.export(&version, &path).map_err(AppError::from)?;
        }
        ArchiveAction::Import { path, note } => {
            let version = archiver
                .import(&path, note.as_deref())
                .map_err(AppError::from)?;
            println!("{}", version);
        }
        ArchiveAction::Checkout { version } => {
            archiver.checkout(&version).map_err(AppError::from)?;
            info!("Current version of {} is now {}", project, version);
        }
        ArchiveAction::Projects => {}
    }
    Ok(())
}
