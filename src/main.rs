//! @ai:module:intent CLI entry point for the module generator
//! @ai:module:layer presentation
//! @ai:module:public_api main
//! @ai:module:depends_on generator, config, scanner, allocator, output

use clap::{Parser, Subcommand, ValueEnum};
use rust_sgx_gen::{
    allocate, format_descriptor, scan_file, CargoVerifier, GenerateOptions, Generator,
    GeneratorConfig, ManifestValidator, OutputFormat, Result, RunnerVariant, SkipVerification,
    DEFAULT_CONFIG_FILE, DEFAULT_INFO_FILE,
};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rust-sgx-gen")]
#[command(author, version, about = "Generate Authentic Execution modules from annotated Rust libraries")]
struct Cli {
    /// Log level
    #[arg(short, long, global = true, value_enum, default_value = "info")]
    loglevel: LogLevel,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a module project from an annotated library crate
    Generate {
        /// Input Cargo project
        #[arg(short, long, value_parser = existing_dir)]
        input: PathBuf,

        /// Output directory, must not exist
        #[arg(short, long, value_parser = new_path)]
        output: PathBuf,

        /// Module identifier
        #[arg(short = 'm', long)]
        module_id: u16,

        /// Event manager port
        #[arg(short = 'e', long)]
        em_port: u16,

        /// Runner variant (sgx or native)
        #[arg(short, long, value_parser = parse_runner, default_value = "sgx")]
        runner: RunnerVariant,

        /// Public key of the remote attestation service provider
        #[arg(short = 's', long, value_parser = existing_file)]
        spkey: Option<PathBuf>,

        /// Write module info as JSON to this file
        #[arg(short = 'p', long, num_args = 0..=1, default_missing_value = DEFAULT_INFO_FILE)]
        print: Option<PathBuf>,

        /// Configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Worker threads in the generated module
        #[arg(long)]
        threads: Option<usize>,

        /// Directory overriding the built-in stubs
        #[arg(long)]
        stubs: Option<PathBuf>,

        /// Skip `cargo verify-project` on the input manifest
        #[arg(long, default_value = "false")]
        skip_verify: bool,
    },

    /// Show the identifiers a library would be given, without writing anything
    Scan {
        /// Path to the library entry file
        path: PathBuf,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: Format,
    },

    /// Write a default configuration file
    InitConfig {
        #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
        output: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
    JsonPretty,
}

impl From<Format> for OutputFormat {
    fn from(f: Format) -> Self {
        match f {
            Format::Text => OutputFormat::Text,
            Format::Json => OutputFormat::Json,
            Format::JsonPretty => OutputFormat::JsonPretty,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

fn parse_runner(s: &str) -> std::result::Result<RunnerVariant, String> {
    s.parse().map_err(|e: rust_sgx_gen::Error| e.to_string())
}

fn existing_dir(s: &str) -> std::result::Result<PathBuf, String> {
    let path = PathBuf::from(s);
    if path.is_dir() {
        Ok(path)
    } else {
        Err(format!("{s} is not an existing directory"))
    }
}

fn existing_file(s: &str) -> std::result::Result<PathBuf, String> {
    let path = PathBuf::from(s);
    if path.is_file() {
        Ok(path)
    } else {
        Err(format!("{s} is not an existing file"))
    }
}

fn new_path(s: &str) -> std::result::Result<PathBuf, String> {
    let path = PathBuf::from(s);
    if path.exists() {
        Err(format!("{s} already exists"))
    } else {
        Ok(path)
    }
}

fn init_logging(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.directive()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.loglevel);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::from(1)
        }
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Generate {
            input,
            output,
            module_id,
            em_port,
            runner,
            spkey,
            print,
            config,
            threads,
            stubs,
            skip_verify,
        } => {
            let mut config = match config {
                Some(path) => GeneratorConfig::load(&path)?,
                None => GeneratorConfig::default(),
            };
            if let Some(threads) = threads {
                config.runtime.num_threads = threads;
            }
            if let Some(dir) = stubs {
                config.stubs.dir = Some(dir);
            }
            if skip_verify {
                config.validation.verify_project = false;
            }
            config.validate()?;

            let options = GenerateOptions {
                input,
                output,
                module_id,
                em_port,
                runner,
                sp_key: spkey,
                info_file: print,
                num_threads: config.runtime.num_threads,
                stubs: config.stub_library(),
            };

            let validator: &dyn ManifestValidator = if config.validation.verify_project {
                &CargoVerifier
            } else {
                &SkipVerification
            };

            let generation = Generator::new(&options, validator).run()?;
            tracing::info!(
                "Generated module {} ({} declarations) in {}",
                generation.name,
                generation.descriptor.len(),
                options.output.display()
            );
            Ok(())
        }

        Commands::Scan { path, format } => {
            let (_, scanned) = scan_file(&path)?;
            let descriptor = allocate(&scanned)?;
            println!("{}", format_descriptor(&descriptor, format.into()));
            Ok(())
        }

        Commands::InitConfig { output } => {
            GeneratorConfig::default().save(&output)?;
            tracing::info!("Default configuration written to {}", output.display());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn generate_args(input: &std::path::Path, extra: &[&str]) -> Vec<String> {
        let mut args: Vec<String> = ["rust-sgx-gen", "generate", "-i"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        args.push(input.display().to_string());
        args.extend(["-o", "does-not-exist-out", "-m", "1", "-e", "5000"].map(String::from));
        args.extend(extra.iter().map(|s| s.to_string()));
        args
    }

    #[test]
    fn test_short_loglevel_flag() {
        let cli = Cli::try_parse_from(["rust-sgx-gen", "-l", "debug", "scan", "lib.rs"]).unwrap();
        assert!(matches!(cli.loglevel, LogLevel::Debug));

        let cli = Cli::try_parse_from(["rust-sgx-gen", "scan", "lib.rs", "--loglevel", "warn"]).unwrap();
        assert!(matches!(cli.loglevel, LogLevel::Warn));
    }

    #[test]
    fn test_runner_parsed_case_insensitively() {
        let temp = TempDir::new().unwrap();

        let cli = Cli::try_parse_from(generate_args(temp.path(), &["-r", "NATIVE"])).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Generate { runner: RunnerVariant::Native, .. }
        ));

        let cli = Cli::try_parse_from(generate_args(temp.path(), &[])).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Generate { runner: RunnerVariant::Sgx, .. }
        ));

        assert!(Cli::try_parse_from(generate_args(temp.path(), &["-r", "nosgx"])).is_err());
    }

    #[test]
    fn test_bare_print_flag_uses_default_info_file() {
        let temp = TempDir::new().unwrap();

        let cli = Cli::try_parse_from(generate_args(temp.path(), &["-p"])).unwrap();
        let Commands::Generate { print, .. } = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(print, Some(PathBuf::from(DEFAULT_INFO_FILE)));

        let cli = Cli::try_parse_from(generate_args(temp.path(), &[])).unwrap();
        let Commands::Generate { print, .. } = cli.command else {
            panic!("expected generate");
        };
        assert!(print.is_none());
    }
}
