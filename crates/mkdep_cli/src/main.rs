//! mkdep CLI: dependency scanning for generated makefiles.
//!
//! `mkdep depends` regenerates the dependency files of one or more targets,
//! `mkdep check` shows what such a pass would rescan, and `mkdep copy-mod` /
//! `mkdep touch` are the build-time helpers called from generated recipes.

#![warn(missing_docs)]

mod check;
mod depends;
mod module;
mod report;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

/// mkdep, the include and module dependency scanner.
#[derive(Parser, Debug)]
#[command(name = "mkdep", version, about = "Dependency scanner for generated makefiles")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Control colored output.
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Regenerate the dependency files of targets.
    Depends(DependsArgs),
    /// Report which objects a `depends` pass would rescan.
    Check(CheckArgs),
    /// Refresh a module stamp if the compiled module changed.
    CopyMod(CopyModArgs),
    /// Create a file or update its modification time.
    Touch(TouchArgs),
}

/// Arguments for the `mkdep depends` subcommand.
#[derive(Parser, Debug)]
pub struct DependsArgs {
    /// `DependInfo.toml` of each target to process.
    #[arg(required = true, num_args = 1..)]
    pub targets: Vec<PathBuf>,

    /// Directory descriptor; defaults to the one beside the target directory.
    #[arg(long)]
    pub directory_info: Option<PathBuf>,

    /// Output format for diagnostics.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Arguments for the `mkdep check` subcommand.
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// `DependInfo.toml` of the target.
    pub target: PathBuf,

    /// Directory descriptor; defaults to the one beside the target directory.
    #[arg(long)]
    pub directory_info: Option<PathBuf>,

    /// Output format for the report.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Arguments for the `mkdep copy-mod` subcommand.
#[derive(Parser, Debug)]
pub struct CopyModArgs {
    /// Module file path without the `.mod` extension.
    pub module: PathBuf,

    /// Stamp file to refresh.
    pub stamp: PathBuf,

    /// Compiler family identifier (`GNU`, `Intel`, `SunPro`).
    pub compiler_id: Option<String>,
}

/// Arguments for the `mkdep touch` subcommand.
#[derive(Parser, Debug)]
pub struct TouchArgs {
    /// File to create or update.
    pub file: PathBuf,
}

/// Controls whether colored output is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Detect from terminal capabilities.
    Auto,
    /// Always produce colored output.
    Always,
    /// Never produce colored output.
    Never,
}

/// Diagnostic output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Whether to use colored output.
    pub color: bool,
}

fn main() {
    let cli = Cli::parse();

    let color = match cli.color {
        ColorChoice::Auto => std::io::stderr().is_terminal(),
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        color,
    };
    init_logging(&global);

    let result = match cli.command {
        Command::Depends(ref args) => depends::run(args, &global),
        Command::Check(ref args) => check::run(args, &global),
        Command::CopyMod(ref args) => module::copy_mod(args, &global),
        Command::Touch(ref args) => module::touch(args),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

/// The log filter used when `MKDEP_LOG` is not set.
fn default_log_level(global: &GlobalArgs) -> &'static str {
    if global.quiet {
        "error"
    } else if global.verbose {
        "debug"
    } else {
        "warn"
    }
}

/// Installs the `tracing` subscriber writing to stderr.
fn init_logging(global: &GlobalArgs) {
    let filter = EnvFilter::try_from_env("MKDEP_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_log_level(global)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(global.color)
        .with_target(false)
        .without_time()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parse_depends_single_target() {
        let cli = Cli::parse_from(["mkdep", "depends", "app.dir/DependInfo.toml"]);
        match cli.command {
            Command::Depends(ref args) => {
                assert_eq!(args.targets, vec![PathBuf::from("app.dir/DependInfo.toml")]);
                assert!(args.directory_info.is_none());
                assert_eq!(args.format, ReportFormat::Text);
            }
            _ => panic!("expected Depends command"),
        }
    }

    #[test]
    fn parse_depends_with_args() {
        let cli = Cli::parse_from([
            "mkdep",
            "depends",
            "a.dir/DependInfo.toml",
            "b.dir/DependInfo.toml",
            "--directory-info",
            "MkdepFiles/DirectoryInformation.toml",
            "--format",
            "json",
        ]);
        match cli.command {
            Command::Depends(ref args) => {
                assert_eq!(args.targets.len(), 2);
                assert_eq!(
                    args.directory_info.as_deref(),
                    Some(std::path::Path::new("MkdepFiles/DirectoryInformation.toml"))
                );
                assert_eq!(args.format, ReportFormat::Json);
            }
            _ => panic!("expected Depends command"),
        }
    }

    #[test]
    fn depends_requires_a_target() {
        assert!(Cli::try_parse_from(["mkdep", "depends"]).is_err());
    }

    #[test]
    fn parse_copy_mod() {
        let cli = Cli::parse_from([
            "mkdep",
            "copy-mod",
            "alpha",
            "app.dir/alpha.mod.stamp",
            "GNU",
        ]);
        match cli.command {
            Command::CopyMod(ref args) => {
                assert_eq!(args.module, PathBuf::from("alpha"));
                assert_eq!(args.stamp, PathBuf::from("app.dir/alpha.mod.stamp"));
                assert_eq!(args.compiler_id.as_deref(), Some("GNU"));
            }
            _ => panic!("expected CopyMod command"),
        }
    }

    #[test]
    fn parse_copy_mod_without_compiler() {
        let cli = Cli::parse_from(["mkdep", "copy-mod", "alpha", "alpha.mod.stamp"]);
        match cli.command {
            Command::CopyMod(ref args) => assert!(args.compiler_id.is_none()),
            _ => panic!("expected CopyMod command"),
        }
    }

    #[test]
    fn parse_touch() {
        let cli = Cli::parse_from(["mkdep", "touch", "app.dir/mod_a.o.provides.build"]);
        match cli.command {
            Command::Touch(ref args) => {
                assert_eq!(args.file, PathBuf::from("app.dir/mod_a.o.provides.build"));
            }
            _ => panic!("expected Touch command"),
        }
    }

    #[test]
    fn parse_check() {
        let cli = Cli::parse_from(["mkdep", "check", "app.dir/DependInfo.toml", "-f", "json"]);
        match cli.command {
            Command::Check(ref args) => {
                assert_eq!(args.target, PathBuf::from("app.dir/DependInfo.toml"));
                assert_eq!(args.format, ReportFormat::Json);
            }
            _ => panic!("expected Check command"),
        }
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::parse_from(["mkdep", "--quiet", "--color", "never", "touch", "x"]);
        assert!(cli.quiet);
        assert!(!cli.verbose);
        assert_eq!(cli.color, ColorChoice::Never);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["mkdep", "touch", "x", "--verbose"]);
        assert!(cli.verbose);
    }

    #[test]
    fn log_level_follows_flags() {
        let mut global = GlobalArgs {
            quiet: false,
            verbose: false,
            color: false,
        };
        assert_eq!(default_log_level(&global), "warn");
        global.verbose = true;
        assert_eq!(default_log_level(&global), "debug");
        global.quiet = true;
        assert_eq!(default_log_level(&global), "error");
    }
}
