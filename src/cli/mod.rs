mod commands;
mod output;
mod picker;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::error::Result;

const NAME_ARG_HELP: &str = "Command name as listed by `command-helper list`.";
const ERROR_CODE_ARG_HELP: &str = "Error code from CLI stderr (example: `E300`).";
const ERROR_FORMAT_ARG_HELP: &str = "Error output format (`text` or `json`).";
const ANSWER_ARG_HELP: &str = "Answer the next prompt instead of opening the interactive picker. \
Repeat once per prompt; `-` cancels that prompt.";
const CLI_AFTER_HELP: &str = r#"Examples:
  command-helper
  command-helper run --repeat
  command-helper list
  command-helper show build
  command-helper --answer build --answer prod
  command-helper --config ./commands.toml list --json
  command-helper explain E110

Config (`.command-helper.toml`):
  [commands.build]
  command = "npm run build"
  description = "npm run build -- -e {env}"
  args = { env = { choices = ["dev", "prod"] } }

More help:
  command-helper help <command>
"#;
const RUN_COMMAND_AFTER_HELP: &str = r#"Examples:
  command-helper run
  command-helper run --repeat
  command-helper --answer greet --answer world run

Notes:
  - Arguments are asked for in declaration order.
  - Cancelling an argument prompt sends the text with the values given so far.
"#;
const SHOW_COMMAND_AFTER_HELP: &str = r#"Examples:
  command-helper show build
  command-helper show build --json

Recovery:
  If the command does not exist, run `command-helper list`.
"#;
const EXPLAIN_COMMAND_AFTER_HELP: &str = r#"Examples:
  command-helper explain E300
  command-helper explain e110

Tip:
  Error codes are shown in stderr output, for example `error[E300]: ...`.
"#;

/// Top-level command line parser.
#[derive(Debug, Parser)]
#[command(
    name = "command-helper",
    version,
    about = "Pick a configured shell command, fill its arguments, and run it in a persistent shell.",
    after_help = CLI_AFTER_HELP,
    infer_subcommands = true,
    next_line_help = true
)]
pub struct Cli {
    /// Config file override path.
    /// Default: `COMMAND_HELPER_CONFIG`, then `.command-helper.toml` or
    /// `.vscode/settings.json` found by walking up from the current directory.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Error output format.
    #[arg(long, value_enum, global = true, default_value_t = ErrorFormatArg::Text, help = ERROR_FORMAT_ARG_HELP)]
    pub error_format: ErrorFormatArg,
    /// Scripted prompt answers.
    #[arg(long = "answer", value_name = "VALUE", global = true, help = ANSWER_ARG_HELP)]
    pub answers: Vec<String>,
    /// Subcommand; `run` when omitted.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Supported CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Picks a command, asks for its arguments, and sends it to the shell.
    #[command(after_help = RUN_COMMAND_AFTER_HELP)]
    Run {
        /// Keep picking commands until the picker is cancelled.
        #[arg(long)]
        repeat: bool,
    },
    /// Lists configured commands in config order.
    #[command(visible_alias = "ls")]
    List {
        /// Print structured JSON output.
        #[arg(long)]
        json: bool,
    },
    /// Shows one command definition and its placeholders.
    #[command(after_help = SHOW_COMMAND_AFTER_HELP)]
    Show {
        /// Command name.
        #[arg(help = NAME_ARG_HELP)]
        name: String,
        /// Print structured JSON output.
        #[arg(long)]
        json: bool,
    },
    /// Inspects config selection.
    Config {
        /// Config operation.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Explains a stable error code with recovery guidance.
    #[command(after_help = EXPLAIN_COMMAND_AFTER_HELP)]
    Explain {
        /// Error code from stderr (for example: `E300`).
        #[arg(help = ERROR_CODE_ARG_HELP)]
        code: String,
    },
}

/// Supported config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Prints the selected config file and how it was found.
    Path {
        /// Print structured JSON output.
        #[arg(long)]
        json: bool,
    },
}

/// Error format argument.
#[derive(Debug, Clone, Copy, ValueEnum, Eq, PartialEq)]
pub enum ErrorFormatArg {
    /// Human-readable text diagnostics.
    Text,
    /// Machine-readable JSON diagnostics.
    Json,
}

/// Runs CLI and returns process exit code.
pub fn run(cli: Cli) -> Result<i32> {
    commands::run(cli)
}

/// Prints one error in the requested format.
pub fn report_error(error: &crate::error::HelperError, format: ErrorFormatArg) {
    commands::report_error(error, format);
}

#[cfg(test)]
mod unit_tests {
    use super::{Cli, Command, ConfigCommand, ErrorFormatArg};
    use clap::{error::ErrorKind, CommandFactory, Parser};

    #[test]
    fn cli_help_includes_examples_and_help_hint() {
        let mut command = Cli::command();
        let help = command.render_long_help().to_string();
        assert!(help.contains("Examples:"));
        assert!(help.contains("command-helper run --repeat"));
        assert!(help.contains("command-helper help <command>"));
    }

    #[test]
    fn cli_version_flag_is_available() {
        let error = Cli::try_parse_from(["command-helper", "--version"]).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::DisplayVersion);
    }

    #[test]
    fn cli_without_subcommand_defaults_to_none() {
        let cli = Cli::try_parse_from(["command-helper"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.answers.is_empty());
    }

    #[test]
    fn cli_collects_answers_in_order_including_cancel() {
        let cli = Cli::try_parse_from([
            "command-helper",
            "--answer",
            "build",
            "run",
            "--answer",
            "-",
        ])
        .unwrap();
        assert_eq!(cli.answers, ["build", "-"]);
        assert!(matches!(cli.command, Some(Command::Run { repeat: false })));
    }

    #[test]
    fn cli_list_alias_parses_to_list_command() {
        let cli = Cli::try_parse_from(["command-helper", "ls"]).unwrap();
        assert!(matches!(cli.command, Some(Command::List { json: false })));
    }

    #[test]
    fn cli_show_parses_name() {
        let cli = Cli::try_parse_from(["command-helper", "show", "build", "--json"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Show { name, json: true }) if name == "build"
        ));
    }

    #[test]
    fn cli_config_path_parses() {
        let cli = Cli::try_parse_from(["command-helper", "config", "path"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Config {
                command: ConfigCommand::Path { json: false }
            })
        ));
    }

    #[test]
    fn cli_explain_help_mentions_error_codes() {
        let error = Cli::try_parse_from(["command-helper", "help", "explain"]).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::DisplayHelp);
        let help = error.to_string();
        assert!(help.contains("command-helper explain E300"));
        assert!(help.contains("error[E300]"));
    }

    #[test]
    fn cli_error_format_defaults_to_text() {
        let cli = Cli::try_parse_from(["command-helper", "list"]).unwrap();
        assert_eq!(cli.error_format, ErrorFormatArg::Text);
    }

    #[test]
    fn cli_error_format_accepts_json() {
        let cli = Cli::try_parse_from(["command-helper", "--error-format", "json", "list"]).unwrap();
        assert_eq!(cli.error_format, ErrorFormatArg::Json);
    }
}
