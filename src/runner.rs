use indexmap::IndexMap;

use crate::{
    catalog::CommandCatalog,
    error::{HelperError, Result},
    prompt::Prompter,
    template,
    terminal::{TerminalFactory, TerminalHandle},
    types::{ArgumentSpec, InputRequest, PickItem},
};

/// Title of the initial command picker.
pub const COMMAND_PICK_TITLE: &str = "Run command";

/// Why a run ended without sending anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// The command picker was dismissed.
    NothingSelected,
    /// The selected command has no description template, or an empty one.
    NoTemplate,
}

/// State of one run, from selection to dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSession {
    /// Selected command name.
    pub command: String,
    /// Description text; starts as the template.
    pub text: String,
    /// Collected values in declaration order.
    pub arguments: IndexMap<String, String>,
    /// Number of arguments the command declares.
    pub declared_arguments: usize,
}

impl RunSession {
    fn new(command: &str, template: &str, declared_arguments: usize) -> Self {
        Self {
            command: command.to_owned(),
            text: template.to_owned(),
            arguments: IndexMap::new(),
            declared_arguments,
        }
    }

    /// Returns `true` when a cancelled prompt left arguments unresolved.
    pub fn is_partial(&self) -> bool {
        self.arguments.len() < self.declared_arguments
    }

    fn apply_arguments(&mut self) {
        self.text = template::substitute(&self.text, &self.arguments);
    }
}

/// Result of one [`CommandRunner::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Nothing was sent.
    Aborted(AbortReason),
    /// The resolved text was sent to the terminal.
    Sent(RunSession),
}

/// Picks a command, resolves its arguments and sends the result to a terminal.
pub struct CommandRunner<'a, F: TerminalFactory> {
    catalog: &'a CommandCatalog,
    pick_items: Vec<PickItem>,
    terminal: TerminalHandle<F>,
}

impl<'a, F: TerminalFactory> CommandRunner<'a, F> {
    /// Creates a runner; the pick list is built here and never refreshed.
    pub fn new(catalog: &'a CommandCatalog, terminal: TerminalHandle<F>) -> Self {
        Self {
            catalog,
            pick_items: catalog.pick_items(),
            terminal,
        }
    }

    /// Catalog the runner picks from.
    pub fn catalog(&self) -> &CommandCatalog {
        self.catalog
    }

    /// Pick list shown by every run.
    pub fn pick_items(&self) -> &[PickItem] {
        &self.pick_items
    }

    /// Terminal owned by the runner.
    pub fn terminal(&self) -> &TerminalHandle<F> {
        &self.terminal
    }

    /// Mutable access to the owned terminal.
    pub fn terminal_mut(&mut self) -> &mut TerminalHandle<F> {
        &mut self.terminal
    }

    /// Runs one interaction end to end.
    ///
    /// A dismissed argument prompt stops asking for further arguments but the
    /// run still sends the text with the values collected so far; unresolved
    /// `{name}` tokens stay literal.
    pub fn run(&mut self, prompter: &mut impl Prompter) -> Result<RunOutcome> {
        let Some(index) = prompter.pick(COMMAND_PICK_TITLE, &self.pick_items)? else {
            tracing::debug!("no command selected");
            return Ok(RunOutcome::Aborted(AbortReason::NothingSelected));
        };
        let name = self
            .pick_items
            .get(index)
            .map(|item| item.label.as_str())
            .ok_or_else(|| {
                HelperError::InvalidInput(format!("picker returned unknown entry {index}"))
            })?;
        let Some(definition) = self.catalog.get(name) else {
            return Ok(RunOutcome::Aborted(AbortReason::NothingSelected));
        };
        let Some(description) = definition
            .description
            .as_deref()
            .filter(|text| !text.is_empty())
        else {
            tracing::debug!(command = name, "command has no description template");
            return Ok(RunOutcome::Aborted(AbortReason::NoTemplate));
        };

        let mut session = RunSession::new(name, description, definition.arguments.len());
        session.arguments = resolve_arguments(prompter, &definition.arguments)?;
        session.apply_arguments();
        if session.is_partial() {
            tracing::debug!(
                command = %session.command,
                resolved = session.arguments.len(),
                declared = session.declared_arguments,
                "argument prompt cancelled; sending partially resolved text"
            );
        }

        self.terminal.show_and_send(&session.text)?;
        tracing::info!(command = %session.command, text = %session.text, "command sent");
        Ok(RunOutcome::Sent(session))
    }
}

/// Asks for each argument in declaration order, stopping at the first cancel.
///
/// An empty answer counts as a cancel.
fn resolve_arguments(
    prompter: &mut impl Prompter,
    specs: &IndexMap<String, ArgumentSpec>,
) -> Result<IndexMap<String, String>> {
    let mut resolved = IndexMap::with_capacity(specs.len());
    for (name, spec) in specs {
        let value = match spec {
            ArgumentSpec::FreeText => prompter.input(&InputRequest::for_argument(name))?,
            ArgumentSpec::Choices(choices) => {
                let items: Vec<PickItem> = choices.iter().map(PickItem::label).collect();
                prompter
                    .pick(name, &items)?
                    .and_then(|index| choices.get(index).cloned())
            }
        };
        let Some(value) = value.filter(|value| !value.is_empty()) else {
            tracing::debug!(argument = %name, "argument prompt cancelled");
            break;
        };
        resolved.insert(name.clone(), value);
    }
    Ok(resolved)
}
