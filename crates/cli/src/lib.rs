pub mod commands;
pub mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use signoff_core::config::{AppConfig, ConfigOverrides, LoadOptions};

use commands::act::ActArgs;
use commands::ActorArgs;

#[derive(Debug, Parser)]
#[command(
    name = "signoff",
    about = "Contract sign-off operator CLI",
    long_about = "Drive contracts through legal, management and final approval, run amendments, \
                  and inspect reviewer work queues.",
    after_help = "Examples:\n  \
                  signoff migrate\n  \
                  signoff create --title \"Hosting agreement\"\n  \
                  signoff act --contract C-1 --as lee@x.com --legal approve --role legal\n  \
                  signoff queue --as max@x.com --management"
)]
pub struct Cli {
    #[arg(long = "config", global = true, value_name = "PATH", help = "Configuration file to load")]
    config_file: Option<PathBuf>,
    #[arg(long, global = true, value_name = "URL", help = "Override database.url")]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Create a contract in draft status")]
    Create {
        #[arg(long, help = "Contract title")]
        title: String,
    },
    #[command(about = "Apply one workflow action to a contract as the given actor")]
    Act(ActArgs),
    #[command(about = "List contracts awaiting the actor and contracts the actor already answered")]
    Queue {
        #[command(flatten)]
        actor: ActorArgs,
    },
    #[command(about = "Show a contract with its approvers and timeline")]
    Show {
        #[arg(long, help = "Contract identifier")]
        contract: String,
    },
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Self::Migrate => "migrate",
            Self::Config => "config",
            Self::Create { .. } => "create",
            Self::Act(_) => "act",
            Self::Queue { .. } => "queue",
            Self::Show { .. } => "show",
        }
    }
}

impl Cli {
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config_file.clone(),
            require_file: self.config_file.is_some(),
            overrides: ConfigOverrides {
                database_url: self.database_url.clone(),
                ..ConfigOverrides::default()
            },
        }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = cli.load_options();

    if let Ok(config) = AppConfig::load(options.clone()) {
        logging::init_logging(&config);
    }

    let command = cli.command.name();
    tracing::debug!(event_name = "system.cli.command_started", command, "running command");

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(options),
        Command::Config => commands::CommandResult {
            exit_code: 0,
            output: commands::config::run(options),
        },
        Command::Create { title } => commands::create::run(options, &title),
        Command::Act(args) => commands::act::run(options, args),
        Command::Queue { actor } => commands::queue::run(options, actor),
        Command::Show { contract } => commands::show::run(options, &contract),
    };

    tracing::info!(
        event_name = "system.cli.command_finished",
        command,
        exit_code = result.exit_code,
        "command finished"
    );
    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Command};
    use crate::commands::act::ActionCommand;
    use signoff_core::ApproverRole;

    #[test]
    fn act_parses_actor_flags_and_nested_action() {
        let cli = Cli::try_parse_from([
            "signoff",
            "act",
            "--contract",
            "C-1",
            "--as",
            "lee@x.com",
            "--legal",
            "--note",
            "looks fine",
            "approve",
            "--role",
            "legal",
        ])
        .expect("parse");

        let Command::Act(args) = cli.command else {
            panic!("expected act command");
        };
        assert_eq!(args.contract, "C-1");
        assert!(args.actor.legal);
        assert!(!args.actor.admin);
        assert_eq!(args.note.as_deref(), Some("looks fine"));
        assert!(matches!(args.action, ActionCommand::Approve { role: ApproverRole::Legal }));
    }

    #[test]
    fn unknown_role_is_a_parse_error() {
        let result = Cli::try_parse_from([
            "signoff", "act", "--contract", "C-1", "--as", "a@x.com", "approve", "--role", "sales",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn config_flag_marks_file_as_required() {
        let cli = Cli::try_parse_from(["signoff", "--config", "custom.toml", "migrate"])
            .expect("parse");
        let options = cli.load_options();
        assert!(options.require_file);
        assert_eq!(options.config_path.as_deref(), Some(std::path::Path::new("custom.toml")));
    }
}
