use std::env::VarError;
use std::io::{self, BufRead};
use std::path::Path;
use std::process::ExitStatus;

use indexmap::IndexMap;
use serde::Serialize;

use crate::{
    catalog::CommandCatalog,
    config::{
        resolve_config_path, ConfigFormat, ConfigSelection, ConfigSource, HelperConfig,
        TerminalSettings, CONFIG_ENV_VAR,
    },
    error::{
        classify_error_code, explain_error_code, known_error_codes, HelperError, Result,
    },
    prompt::{Prompter, ScriptedPrompter},
    runner::{AbortReason, CommandRunner, RunOutcome},
    template,
    terminal::{ShellTerminalFactory, TerminalFactory, TerminalHandle},
    types::{ArgumentSpec, CommandDefinition},
};

use super::{
    output::{self, OutputStatus},
    picker::TuiPrompter,
    Cli, Command, ConfigCommand, ErrorFormatArg,
};

const REPEAT_CONTINUE_PROMPT: &str = "Press Enter to pick another command (Ctrl+D to stop).";

#[derive(Debug, Clone)]
struct EffectiveCliState {
    selection: ConfigSelection,
    format: Option<ConfigFormat>,
    terminal: TerminalSettings,
    catalog: CommandCatalog,
}

#[derive(Debug, Serialize)]
struct CommandEntryOutput<'a> {
    name: &'a str,
    #[serde(flatten)]
    definition: &'a CommandDefinition,
    placeholders: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ConfigPathOutput<'a> {
    source: ConfigSource,
    path: Option<&'a Path>,
    format: Option<ConfigFormat>,
    commands: usize,
}

#[derive(Debug, Serialize)]
struct ErrorOutput<'a> {
    code: &'a str,
    message: String,
}

pub(crate) fn run(cli: Cli) -> Result<i32> {
    let Cli {
        config,
        answers,
        command,
        ..
    } = cli;

    match command.unwrap_or(Command::Run { repeat: false }) {
        Command::Explain { code } => run_explain(&code),
        Command::Run { repeat } => {
            let state = load_effective_state(config.as_deref())?;
            run_commands(&state, answers, repeat)
        }
        Command::List { json } => {
            let state = load_effective_state(config.as_deref())?;
            run_list(&state.catalog, json)
        }
        Command::Show { name, json } => {
            let state = load_effective_state(config.as_deref())?;
            run_show(&state.catalog, &name, json)
        }
        Command::Config {
            command: ConfigCommand::Path { json },
        } => {
            let state = load_effective_state(config.as_deref())?;
            run_config_path(&state, json)
        }
    }
}

pub(crate) fn report_error(error: &HelperError, format: ErrorFormatArg) {
    let code = classify_error_code(error);
    let line = match format {
        ErrorFormatArg::Text => format!("error[{code}]: {error}"),
        ErrorFormatArg::Json => {
            let payload = ErrorOutput {
                code,
                message: error.to_string(),
            };
            serde_json::to_string(&payload)
                .unwrap_or_else(|_| format!("{{\"code\":\"{code}\"}}"))
        }
    };
    let _ = output::stderr_line(&line);
}

fn run_commands(state: &EffectiveCliState, answers: Vec<String>, repeat: bool) -> Result<i32> {
    let factory = ShellTerminalFactory::from_settings(&state.terminal);
    tracing::debug!(shell = %factory.shell().display(), commands = state.catalog.len(), "starting run");
    let mut runner = CommandRunner::new(
        &state.catalog,
        TerminalHandle::new(state.terminal.name.clone(), factory),
    );

    let run_result = if answers.is_empty() {
        TuiPrompter::new().and_then(|mut prompter| {
            run_loop(&mut runner, &mut prompter, repeat, wait_for_enter)
        })
    } else {
        let mut prompter = ScriptedPrompter::new(answers);
        let result = run_loop(&mut runner, &mut prompter, repeat, || Ok(true));
        if prompter.remaining() > 0 {
            tracing::warn!(unused = prompter.remaining(), "some --answer values were not used");
        }
        result
    };

    let shutdown_result = match runner.terminal_mut().take() {
        Some(mut shell) => shell.shutdown(),
        None => Ok(None),
    };
    finish_run(run_result, shutdown_result)
}

// The run error wins; a shutdown failure after it is only logged.
fn finish_run(
    run_result: Result<()>,
    shutdown_result: Result<Option<ExitStatus>>,
) -> Result<i32> {
    match (run_result, shutdown_result) {
        (Err(error), Err(shutdown_error)) => {
            tracing::warn!(error = %shutdown_error, "failed to stop shell after run error");
            Err(error)
        }
        (Err(error), Ok(_)) => Err(error),
        (Ok(()), shutdown_result) => {
            Ok(shutdown_result?.and_then(|status| status.code()).unwrap_or(0))
        }
    }
}

fn run_loop<F: TerminalFactory>(
    runner: &mut CommandRunner<'_, F>,
    prompter: &mut impl Prompter,
    repeat: bool,
    mut keep_going: impl FnMut() -> Result<bool>,
) -> Result<()> {
    loop {
        match runner.run(prompter)? {
            RunOutcome::Aborted(AbortReason::NothingSelected) => return Ok(()),
            RunOutcome::Aborted(AbortReason::NoTemplate) | RunOutcome::Sent(_) if !repeat => {
                return Ok(())
            }
            RunOutcome::Sent(_) => {
                if !keep_going()? {
                    return Ok(());
                }
            }
            RunOutcome::Aborted(AbortReason::NoTemplate) => {}
        }
    }
}

// The picker hides the shell output; give the user a chance to read it first.
fn wait_for_enter() -> Result<bool> {
    output::stderr_line(REPEAT_CONTINUE_PROMPT)?;
    let mut line = String::new();
    let read = io::stdin().lock().read_line(&mut line)?;
    Ok(read > 0)
}

fn run_list(catalog: &CommandCatalog, json: bool) -> Result<i32> {
    if json {
        let entries: Vec<CommandEntryOutput> = catalog
            .iter()
            .map(|(name, definition)| command_entry(name, definition))
            .collect();
        output::stdout_json(&entries)?;
        return Ok(0);
    }

    let width = catalog
        .iter()
        .map(|(name, _)| name.chars().count())
        .max()
        .unwrap_or(0);
    let mut lines = Vec::with_capacity(catalog.len() * 2);
    for (name, definition) in catalog.iter() {
        lines.push(format!("{name:<width$}  {}", definition.invocation));
        if let Some(description) = definition.description.as_deref() {
            lines.push(format!("{:width$}    {description}", ""));
        }
    }
    if lines.is_empty() {
        lines.push("no commands configured".to_owned());
    }
    print_lines(&lines)
}

fn run_show(catalog: &CommandCatalog, name: &str, json: bool) -> Result<i32> {
    let definition = catalog
        .get(name)
        .ok_or_else(|| HelperError::NotFound(format!("command `{name}` is not configured")))?;
    if json {
        output::stdout_json(&command_entry(name, definition))?;
        return Ok(0);
    }

    let mut lines = vec![
        format!("name: {name}"),
        format!("command: {}", definition.invocation),
        format!(
            "description: {}",
            definition.description.as_deref().unwrap_or("<none; nothing is sent>")
        ),
    ];
    if !definition.arguments.is_empty() {
        lines.push("arguments:".to_owned());
        lines.extend(describe_arguments(&definition.arguments));
    }
    let placeholders = definition
        .description
        .as_deref()
        .map(template::placeholders)
        .unwrap_or_default();
    if !placeholders.is_empty() {
        lines.push(format!("placeholders: {}", placeholders.join(", ")));
    }
    print_lines(&lines)
}

fn describe_arguments(arguments: &IndexMap<String, ArgumentSpec>) -> Vec<String> {
    arguments
        .iter()
        .map(|(name, spec)| match spec {
            ArgumentSpec::FreeText => format!("  {name}: free text"),
            ArgumentSpec::Choices(choices) => {
                format!("  {name}: one of [{}]", choices.join(", "))
            }
        })
        .collect()
}

fn run_config_path(state: &EffectiveCliState, json: bool) -> Result<i32> {
    if json {
        output::stdout_json(&ConfigPathOutput {
            source: state.selection.source,
            path: state.selection.path.as_deref(),
            format: state.format,
            commands: state.catalog.len(),
        })?;
        return Ok(0);
    }

    let mut lines = vec![format!("source: {}", config_source_label(state.selection.source))];
    if let Some(path) = state.selection.path.as_deref() {
        lines.push(format!("path: {}", path.display()));
    }
    lines.push(format!("commands: {}", state.catalog.len()));
    print_lines(&lines)
}

fn run_explain(code: &str) -> Result<i32> {
    let Some(explanation) = explain_error_code(code) else {
        return Err(HelperError::InvalidInput(format!(
            "unknown error code `{}`; known codes: {}",
            code.trim(),
            known_error_codes().join(", ")
        )));
    };
    print_lines(&[explanation.to_owned()])
}

fn command_entry<'a>(name: &'a str, definition: &'a CommandDefinition) -> CommandEntryOutput<'a> {
    CommandEntryOutput {
        name,
        definition,
        placeholders: definition
            .description
            .as_deref()
            .map(template::placeholders)
            .unwrap_or_default(),
    }
}

fn print_lines(lines: &[String]) -> Result<i32> {
    if output::stdout_lines(lines)? == OutputStatus::BrokenPipe {
        tracing::debug!("stdout closed before output was written");
    }
    Ok(0)
}

fn config_source_label(source: ConfigSource) -> &'static str {
    match source {
        ConfigSource::Flag => "flag",
        ConfigSource::Env => "env",
        ConfigSource::Discovered => "discovered",
        ConfigSource::None => "none",
    }
}

fn load_effective_state(config_override: Option<&Path>) -> Result<EffectiveCliState> {
    let current_dir = std::env::current_dir()?;
    let env_path = read_config_env_var()?;
    let selection = resolve_config_path(config_override, env_path.as_deref(), &current_dir)?;
    let loaded = match selection.path.as_deref() {
        Some(path) => Some(HelperConfig::load_from_path(path)?),
        None => None,
    };
    tracing::debug!(
        source = config_source_label(selection.source),
        path = ?selection.path,
        "config selected"
    );

    Ok(match loaded {
        Some(config) => EffectiveCliState {
            selection,
            format: Some(config.format),
            terminal: config.terminal,
            catalog: config.catalog,
        },
        None => EffectiveCliState {
            selection,
            format: None,
            terminal: TerminalSettings::default(),
            catalog: CommandCatalog::default(),
        },
    })
}

fn read_config_env_var() -> Result<Option<String>> {
    match std::env::var(CONFIG_ENV_VAR) {
        Ok(value) => Ok(Some(value)),
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(_)) => Err(HelperError::Config(format!(
            "{CONFIG_ENV_VAR} must be valid UTF-8"
        ))),
    }
}

#[cfg(test)]
mod unit_tests {
    use super::{describe_arguments, finish_run, run_loop};
    use crate::{
        catalog::CommandCatalog,
        error::{HelperError, Result},
        prompt::ScriptedPrompter,
        runner::CommandRunner,
        terminal::{TerminalFactory, TerminalHandle, TerminalSink},
        types::{ArgumentSpec, CommandDefinition},
    };

    #[derive(Default)]
    struct CountingSink {
        sends: usize,
    }

    impl TerminalSink for CountingSink {
        fn is_alive(&mut self) -> bool {
            true
        }

        fn show(&mut self) -> Result<()> {
            Ok(())
        }

        fn send_text(&mut self, _text: &str) -> Result<()> {
            self.sends += 1;
            Ok(())
        }
    }

    struct CountingFactory;

    impl TerminalFactory for CountingFactory {
        type Sink = CountingSink;

        fn create(&mut self, _name: &str) -> Result<Self::Sink> {
            Ok(CountingSink::default())
        }
    }

    fn catalog() -> CommandCatalog {
        [
            (
                "hello".to_owned(),
                CommandDefinition::new("echo hello").with_description("echo hello"),
            ),
            ("bare".to_owned(), CommandDefinition::new("true")),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn repeat_loop_runs_until_picker_is_cancelled() {
        let catalog = catalog();
        let mut runner = CommandRunner::new(&catalog, TerminalHandle::new("t", CountingFactory));
        let mut prompter = ScriptedPrompter::new(["hello", "bare", "hello"]);
        run_loop(&mut runner, &mut prompter, true, || Ok(true)).unwrap();
        assert_eq!(runner.terminal_mut().take().unwrap().sends, 2);
        assert_eq!(prompter.transcript().len(), 4);
    }

    #[test]
    fn single_run_stops_after_first_outcome() {
        let catalog = catalog();
        let mut runner = CommandRunner::new(&catalog, TerminalHandle::new("t", CountingFactory));
        let mut prompter = ScriptedPrompter::new(["bare", "hello"]);
        run_loop(&mut runner, &mut prompter, false, || Ok(true)).unwrap();
        assert!(!runner.terminal().is_created());
        assert_eq!(prompter.remaining(), 1);
    }

    #[test]
    fn repeat_loop_stops_when_user_declines() {
        let catalog = catalog();
        let mut runner = CommandRunner::new(&catalog, TerminalHandle::new("t", CountingFactory));
        let mut prompter = ScriptedPrompter::new(["hello", "hello"]);
        run_loop(&mut runner, &mut prompter, true, || Ok(false)).unwrap();
        assert_eq!(prompter.remaining(), 1);
    }

    #[cfg(unix)]
    fn exit_status(code: i32) -> std::process::ExitStatus {
        use std::os::unix::process::ExitStatusExt;
        std::process::ExitStatus::from_raw(code << 8)
    }

    #[cfg(unix)]
    #[test]
    fn finish_run_returns_shell_exit_code() {
        assert_eq!(finish_run(Ok(()), Ok(Some(exit_status(3)))).unwrap(), 3);
        assert_eq!(finish_run(Ok(()), Ok(None)).unwrap(), 0);
    }

    #[test]
    fn finish_run_keeps_run_error_when_shutdown_also_fails() {
        let error = finish_run(
            Err(HelperError::NotFound("`deploy` is not an option".to_owned())),
            Err(HelperError::Terminal("wait failed".to_owned())),
        )
        .unwrap_err();
        assert!(matches!(error, HelperError::NotFound(_)));
    }

    #[test]
    fn finish_run_reports_shutdown_error_after_clean_run() {
        let error = finish_run(Ok(()), Err(HelperError::Terminal("wait failed".to_owned())))
            .unwrap_err();
        assert!(matches!(error, HelperError::Terminal(_)));
    }

    #[test]
    fn describe_arguments_lists_kinds_in_order() {
        let definition = CommandDefinition::new("deploy")
            .with_argument(
                "env",
                ArgumentSpec::Choices(vec!["dev".to_owned(), "prod".to_owned()]),
            )
            .with_argument("tag", ArgumentSpec::FreeText);
        assert_eq!(
            describe_arguments(&definition.arguments),
            ["  env: one of [dev, prod]", "  tag: free text"]
        );
    }
}
