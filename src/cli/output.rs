use std::io::{self, Write};

use serde::Serialize;

use crate::error::Result;

/// Result of writing to an output stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OutputStatus {
    /// Write completed.
    Written,
    /// Stream was closed by the reader.
    BrokenPipe,
}

fn map_result(result: io::Result<()>) -> io::Result<OutputStatus> {
    match result {
        Ok(()) => Ok(OutputStatus::Written),
        Err(error) if error.kind() == io::ErrorKind::BrokenPipe => Ok(OutputStatus::BrokenPipe),
        Err(error) => Err(error),
    }
}

fn write_lines(mut handle: impl Write, lines: &[String]) -> io::Result<OutputStatus> {
    let mut result = Ok(());
    for line in lines {
        result = handle
            .write_all(line.as_bytes())
            .and_then(|_| handle.write_all(b"\n"));
        if result.is_err() {
            break;
        }
    }
    map_result(result.and_then(|_| handle.flush()))
}

/// Writes each line to stdout and flushes once.
pub(crate) fn stdout_lines(lines: &[String]) -> io::Result<OutputStatus> {
    write_lines(io::stdout().lock(), lines)
}

/// Writes text and a newline to stdout.
pub(crate) fn stdout_line(text: &str) -> io::Result<OutputStatus> {
    stdout_lines(&[text.to_owned()])
}

/// Writes pretty JSON and a newline to stdout.
pub(crate) fn stdout_json(value: &impl Serialize) -> Result<OutputStatus> {
    let rendered = serde_json::to_string_pretty(value)?;
    Ok(stdout_line(&rendered)?)
}

/// Writes text and a newline to stderr.
pub(crate) fn stderr_line(text: &str) -> io::Result<OutputStatus> {
    write_lines(io::stderr().lock(), &[text.to_owned()])
}

#[cfg(test)]
mod unit_tests {
    use std::io::{self, Write};

    use super::{write_lines, OutputStatus};

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_lines_joins_with_newlines() {
        let mut buffer = Vec::new();
        let status = write_lines(&mut buffer, &["a".to_owned(), "b".to_owned()]).unwrap();
        assert_eq!(status, OutputStatus::Written);
        assert_eq!(buffer, b"a\nb\n");
    }

    #[test]
    fn broken_pipe_is_not_an_error() {
        let status = write_lines(ClosedPipe, &["a".to_owned()]).unwrap();
        assert_eq!(status, OutputStatus::BrokenPipe);
    }
}
