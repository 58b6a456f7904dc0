use std::{
    io::{self, Write},
    path::{Path, PathBuf},
    process::{Child, ChildStdin, Command as ProcessCommand, ExitStatus, Stdio},
};

use crate::{
    config::TerminalSettings,
    error::{HelperError, Result},
};

const SHELL_ENV_VAR: &str = "SHELL";
const FALLBACK_SHELL: &str = "/bin/sh";

/// A terminal-like target that executes text typed into it.
pub trait TerminalSink {
    /// Returns `false` once the sink can no longer accept input.
    fn is_alive(&mut self) -> bool;

    /// Brings the sink to the foreground.
    fn show(&mut self) -> Result<()>;

    /// Types `text` as one input line and submits it.
    fn send_text(&mut self, text: &str) -> Result<()>;
}

/// Creates terminal sinks on demand.
pub trait TerminalFactory {
    /// Sink type produced by this factory.
    type Sink: TerminalSink;

    /// Creates a new sink with the given display name.
    fn create(&mut self, name: &str) -> Result<Self::Sink>;
}

/// Owns at most one sink, created on first use and replaced when it dies.
pub struct TerminalHandle<F: TerminalFactory> {
    name: String,
    factory: F,
    sink: Option<F::Sink>,
}

impl<F: TerminalFactory> TerminalHandle<F> {
    /// Creates an empty handle; nothing is spawned until the first send.
    pub fn new(name: impl Into<String>, factory: F) -> Self {
        Self {
            name: name.into(),
            factory,
            sink: None,
        }
    }

    /// Terminal display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` once a sink has been created and not yet taken.
    pub fn is_created(&self) -> bool {
        self.sink.is_some()
    }

    /// Factory used to create sinks.
    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Removes the current sink, if any.
    pub fn take(&mut self) -> Option<F::Sink> {
        self.sink.take()
    }

    /// Shows the sink, then sends `text` to it.
    pub fn show_and_send(&mut self, text: &str) -> Result<()> {
        let sink = self.ensure()?;
        sink.show()?;
        sink.send_text(text)
    }

    fn ensure(&mut self) -> Result<&mut F::Sink> {
        let sink = match self.sink.take() {
            Some(mut sink) => {
                if sink.is_alive() {
                    sink
                } else {
                    tracing::warn!(terminal = %self.name, "terminal is gone; creating a new one");
                    self.factory.create(&self.name)?
                }
            }
            None => {
                tracing::debug!(terminal = %self.name, "creating terminal");
                self.factory.create(&self.name)?
            }
        };
        Ok(self.sink.insert(sink))
    }
}

/// A long-lived shell reading commands from a pipe.
///
/// Output goes straight to this process's stdout and stderr, so shell state
/// such as the working directory carries over between sends.
#[derive(Debug)]
pub struct ShellTerminal {
    name: String,
    child: Child,
    stdin: Option<ChildStdin>,
}

impl ShellTerminal {
    /// Starts `shell` with a piped stdin.
    pub fn spawn(name: &str, shell: &Path) -> Result<Self> {
        let mut child = ProcessCommand::new(shell)
            .stdin(Stdio::piped())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|error| {
                HelperError::Terminal(format!(
                    "failed to start shell `{}`: {error}",
                    shell.display()
                ))
            })?;
        let stdin = child.stdin.take();
        tracing::debug!(terminal = name, shell = %shell.display(), pid = child.id(), "shell started");
        Ok(Self {
            name: name.to_owned(),
            child,
            stdin,
        })
    }

    /// Closes stdin and waits for queued commands to finish.
    ///
    /// Calling it again after the shell exited returns `Ok(None)`.
    pub fn shutdown(&mut self) -> Result<Option<ExitStatus>> {
        if self.stdin.take().is_none() {
            return Ok(None);
        }
        let status = self.child.wait()?;
        tracing::debug!(terminal = %self.name, %status, "shell exited");
        Ok(Some(status))
    }
}

impl TerminalSink for ShellTerminal {
    fn is_alive(&mut self) -> bool {
        self.stdin.is_some() && matches!(self.child.try_wait(), Ok(None))
    }

    fn show(&mut self) -> Result<()> {
        let stderr = io::stderr();
        let mut handle = stderr.lock();
        writeln!(handle, "==> {}", self.name)?;
        handle.flush()?;
        Ok(())
    }

    fn send_text(&mut self, text: &str) -> Result<()> {
        {
            let stderr = io::stderr();
            let mut handle = stderr.lock();
            writeln!(handle, "$ {text}")?;
            handle.flush()?;
        }

        let stdin = self.stdin.as_mut().ok_or_else(|| {
            HelperError::Terminal(format!("terminal `{}` is closed", self.name))
        })?;
        stdin
            .write_all(text.as_bytes())
            .and_then(|_| stdin.write_all(b"\n"))
            .and_then(|_| stdin.flush())
            .map_err(|error| match error.kind() {
                io::ErrorKind::BrokenPipe => {
                    HelperError::Terminal(format!("terminal `{}` stopped reading input", self.name))
                }
                _ => HelperError::Io(error),
            })
    }
}

impl Drop for ShellTerminal {
    fn drop(&mut self) {
        if let Err(error) = self.shutdown() {
            tracing::warn!(terminal = %self.name, %error, "failed to stop shell");
        }
    }
}

/// Spawns [`ShellTerminal`]s with a fixed shell program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellTerminalFactory {
    shell: PathBuf,
}

impl ShellTerminalFactory {
    /// Uses `shell` for every terminal.
    pub fn new(shell: impl Into<PathBuf>) -> Self {
        Self {
            shell: shell.into(),
        }
    }

    /// Resolves the shell from settings, then `$SHELL`, then `/bin/sh`.
    pub fn from_settings(settings: &TerminalSettings) -> Self {
        let shell = settings
            .shell
            .clone()
            .or_else(|| {
                std::env::var_os(SHELL_ENV_VAR)
                    .filter(|value| !value.is_empty())
                    .map(PathBuf::from)
            })
            .unwrap_or_else(|| PathBuf::from(FALLBACK_SHELL));
        Self::new(shell)
    }

    /// Shell program used for new terminals.
    pub fn shell(&self) -> &Path {
        &self.shell
    }
}

impl TerminalFactory for ShellTerminalFactory {
    type Sink = ShellTerminal;

    fn create(&mut self, name: &str) -> Result<Self::Sink> {
        ShellTerminal::spawn(name, &self.shell)
    }
}
