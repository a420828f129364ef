mod commands;
mod core;
mod golang;
mod graph;
mod utils;

use clap::{ArgAction, Parser};
use commands::OutputFormat;
use crate::core::error::{ConfigError, PatrolError, PatrolResult, print_error};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// List the packages of a Go module affected by the changes since a revision
#[derive(Parser)]
#[command(name = "patrol")]
#[command(version, about, long_about = None)]
#[command(styles = get_styles())]
struct Cli {
  /// Revision that should be used to detect changes in HEAD.
  /// E.g.: -from=a0e002f951f56d53d552f9427b3331b11ea66e92
  #[arg(long, value_name = "REVISION")]
  from: Option<String>,

  /// Also count changes to non-Go files (templates, fixtures, embedded assets)
  #[arg(long)]
  all_files: bool,

  /// Output format
  #[arg(long, value_enum, default_value_t = OutputFormat::Names)]
  format: OutputFormat,

  /// Config file (default: patrol.toml, .patrol.toml or .config/patrol.toml in the module root)
  #[arg(long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Increase log verbosity on stderr (-v info, -vv debug, -vvv trace)
  #[arg(short, long, action = ArgAction::Count)]
  verbose: u8,

  /// Path to the module (the directory holding go.mod)
  repository: Option<PathBuf>,
}

fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .usage(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .literal(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))))
    .invalid(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .error(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))))
}

fn init_tracing(verbose: u8) {
  let level = match verbose {
    0 => "warn",
    1 => "info",
    2 => "debug",
    _ => "trace",
  };

  tracing_subscriber::registry()
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
    .with(
      tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false),
    )
    .init();
}

fn run(cli: Cli) -> PatrolResult<()> {
  let repository = cli.repository.ok_or_else(|| {
    PatrolError::Config(ConfigError::MissingArgument {
      name: "repository path".to_string(),
    })
  })?;
  let from = cli
    .from
    .filter(|rev| !rev.is_empty())
    .ok_or_else(|| PatrolError::Config(ConfigError::MissingArgument { name: "from".to_string() }))?;

  let ctx = crate::core::context::ModuleContext::build(&repository, cli.config.as_deref())?;

  commands::run_affected(&ctx, &from, cli.all_files, cli.format)
}

fn main() {
  let cli = Cli::parse_from(utils::normalize_go_style_flags(std::env::args_os()));
  init_tracing(cli.verbose);

  if let Err(err) = run(cli) {
    handle_error(err);
  }
}

fn handle_error(err: PatrolError) -> ! {
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}
