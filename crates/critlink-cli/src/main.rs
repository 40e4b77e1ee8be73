#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{CommandFactory, Parser, Subcommand};
use critlink_core::config::load_project_config;
use output::{CliError, OutputMode, render_error, resolve_output_mode};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "critlink: criterion link graph builder",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Shorthand for `--format json`.
    #[arg(long, global = true, hide = true)]
    json: bool,

    /// Project config file (defaults to `critlink.toml` in the current directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn output_mode(&self) -> OutputMode {
        resolve_output_mode(self.format, self.json)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Build the link artifact from extracted text",
        long_about = "Load the code universe from the configuration tree, extract \
                      relationships from the document text, break mutual links, tag \
                      back-references, and write the artifact.",
        after_help = "EXAMPLES:\n    # Build with paths from critlink.toml\n    critlink build\n\n    # Preview without writing\n    critlink build --dry-run --json"
    )]
    Build(cmd::build::BuildArgs),

    #[command(
        about = "Re-run cycle breaking and tagging over existing artifacts",
        long_about = "Rewrite each artifact through the same break and tag passes as a \
                      build. Missing files are skipped; unchanged files are not written.",
        after_help = "EXAMPLES:\n    # Rewrite the configured artifacts\n    critlink rewrite\n\n    # Rewrite one file, reporting only\n    critlink rewrite src/assets/ems_links.json --dry-run"
    )]
    Rewrite(cmd::rewrite::RewriteArgs),

    #[command(
        about = "Audit artifacts without modifying them",
        long_about = "Report self-edges, mutual links, missing or spurious back-reference \
                      tags, ordering problems, and forward cycles. Exits non-zero when \
                      any artifact needs attention.",
        after_help = "EXAMPLES:\n    # Check the configured artifacts\n    critlink check\n\n    # Machine-readable report\n    critlink check --json"
    )]
    Check(cmd::check::CheckArgs),

    #[command(
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n    # Bash\n    critlink completions bash > /etc/bash_completion.d/critlink"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("CRITLINK_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "critlink=debug,info"
        } else {
            "critlink=info,warn"
        })
    });

    let format = env::var("CRITLINK_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn run(cli: Cli, output: OutputMode) -> anyhow::Result<()> {
    let project_root = env::current_dir()?;

    if let Commands::Completions(args) = &cli.command {
        let mut command = Cli::command();
        return cmd::completions::run_completions(args.shell, &mut command);
    }

    let config = load_project_config(&project_root, cli.config.as_deref())?;
    debug!(?config, "resolved project config");

    match &cli.command {
        Commands::Build(args) => cmd::build::run_build(args, &config, output, &project_root),
        Commands::Rewrite(args) => {
            cmd::rewrite::run_rewrite(args, &config, output, &project_root)
        }
        Commands::Check(args) => cmd::check::run_check(args, &config, output, &project_root),
        Commands::Completions(_) => Ok(()),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let output = cli.output_mode();
    match run(cli, output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if let Err(render_err) = render_error(output, &CliError::from(&err)) {
                eprintln!("error: {err:#} (while rendering: {render_err})");
            }
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_flag_parses_before_subcommand() {
        let cli = Cli::parse_from(["critlink", "--format", "json", "check"]);
        assert_eq!(cli.format, Some(OutputMode::Json));
        assert!(cli.output_mode().is_json());
    }

    #[test]
    fn json_flag_after_subcommand() {
        let cli = Cli::parse_from(["critlink", "rewrite", "--json"]);
        assert!(cli.json);
        assert!(cli.output_mode().is_json());
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::parse_from(["critlink", "build", "--config", "alt.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("alt.toml")));
    }

    #[test]
    fn verbose_short_flag() {
        let cli = Cli::parse_from(["critlink", "-v", "check"]);
        assert!(cli.verbose);
    }

    #[test]
    fn build_subcommand_parses() {
        let cli = Cli::parse_from(["critlink", "build", "--dry-run"]);
        assert!(matches!(cli.command, Commands::Build(ref a) if a.dry_run));
    }

    #[test]
    fn rewrite_subcommand_parses_paths() {
        let cli = Cli::parse_from(["critlink", "rewrite", "a.json", "b.json"]);
        assert!(matches!(cli.command, Commands::Rewrite(ref a) if a.paths.len() == 2));
    }

    #[test]
    fn check_subcommand_parses() {
        let cli = Cli::parse_from(["critlink", "check"]);
        assert!(matches!(cli.command, Commands::Check(_)));
    }

    #[test]
    fn completions_subcommand_parses() {
        let cli = Cli::parse_from(["critlink", "completions", "zsh"]);
        assert!(matches!(cli.command, Commands::Completions(_)));
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
