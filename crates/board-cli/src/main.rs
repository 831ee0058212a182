#![forbid(unsafe_code)]

mod cmd;
mod identity;
mod output;

use board_core::Board;
use board_core::config::resolve_config;
use clap::{Parser, Subcommand};
use std::env;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use identity::IdentityFlags;
use output::{CliError, OutputMode};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "pb: a community problem board",
    long_about = None
)]
struct Cli {
    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Acting user id (overrides PB_USER).
    #[arg(long, global = true, value_name = "UID")]
    user: Option<String>,

    /// Acting user's display name (overrides PB_USER_NAME).
    #[arg(long, global = true)]
    name: Option<String>,

    /// Acting user's email (overrides PB_USER_EMAIL).
    #[arg(long, global = true)]
    email: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn identity(&self) -> IdentityFlags<'_> {
        IdentityFlags {
            user: self.user.as_deref(),
            name: self.name.as_deref(),
            email: self.email.as_deref(),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Post and engage with problems",
        after_help = "EXAMPLES:\n    pb problem list\n    pb problem watch <id>\n    pb problem show <id> --json"
    )]
    Problem(cmd::problem::ProblemArgs),

    #[command(
        about = "Comment, react, and accept solutions",
        after_help = "EXAMPLES:\n    pb comment list <problem-id>\n    pb comment accept <comment-id>"
    )]
    Comment(cmd::comment::CommentArgs),

    #[command(about = "Read your notifications")]
    Notify(cmd::notify::NotifyArgs),

    #[command(about = "Manage your profile and account")]
    User(cmd::user::UserArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("PB_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "board=debug,info"
        } else {
            "board=info,warn"
        })
    });

    let format = env::var("PB_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

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

fn run(cli: &Cli, output: &mut OutputMode) -> anyhow::Result<()> {
    let project_root = env::current_dir()?;
    let config = resolve_config(&project_root)?;
    *output = output::resolve_output_mode(cli.json, config.output.as_deref());

    let board = Board::open(config, &project_root)?;
    let ctx = cmd::Context {
        board: &board,
        output: *output,
        identity: cli.identity(),
    };

    match &cli.command {
        Commands::Problem(args) => cmd::problem::run_problem(args, &ctx),
        Commands::Comment(args) => cmd::comment::run_comment(args, &ctx),
        Commands::Notify(args) => cmd::notify::run_notify(args, &ctx),
        Commands::User(args) => cmd::user::run_user(args, &ctx),
    }
}

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    // Until the config is read, only the flag and FORMAT env can pick a mode.
    let mut output = output::resolve_output_mode(cli.json, None);

    match run(&cli, &mut output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::debug!(error = %format!("{err:#}"), "command failed");
            if let Err(render_err) = output::render_error(output, &CliError::from(&err)) {
                eprintln!("{err:#} ({render_err})");
            }
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_flag_parses_after_subcommand() {
        let cli = Cli::parse_from(["pb", "problem", "list", "--json"]);
        assert!(cli.json);
    }

    #[test]
    fn identity_flags_are_global() {
        let cli = Cli::parse_from([
            "pb", "comment", "like", "c1", "--user", "u1", "--name", "Ann",
        ]);
        let flags = cli.identity();
        assert_eq!(flags.user, Some("u1"));
        assert_eq!(flags.name, Some("Ann"));
        assert!(flags.email.is_none());
    }

    #[test]
    fn problem_create_collects_repeated_features() {
        let cli = Cli::parse_from([
            "pb",
            "problem",
            "create",
            "--title",
            "T",
            "--description",
            "D",
            "--category",
            "work",
            "--frequency",
            "daily",
            "--feature",
            "cheap",
            "--feature",
            "quiet",
        ]);
        let Commands::Problem(args) = cli.command else {
            panic!("expected problem command");
        };
        let cmd::problem::ProblemCommand::Create(create) = args.command else {
            panic!("expected create");
        };
        assert_eq!(create.features, vec!["cheap", "quiet"]);
    }

    #[test]
    fn problem_list_rejects_category_with_owner() {
        let parsed = Cli::try_parse_from([
            "pb", "problem", "list", "--category", "work", "--owner", "u1",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn comment_reply_flag_parses() {
        let cli = Cli::parse_from(["pb", "comment", "add", "p1", "hello", "--reply-to", "c1"]);
        let Commands::Comment(args) = cli.command else {
            panic!("expected comment command");
        };
        let cmd::comment::CommentCommand::Add(add) = args.command else {
            panic!("expected add");
        };
        assert_eq!(add.parent_id.as_deref(), Some("c1"));
    }
}
