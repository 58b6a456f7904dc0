use std::collections::VecDeque;

use crate::{
    error::{HelperError, Result},
    types::{InputRequest, PickItem},
};

/// Answer literal that cancels the prompt it is consumed by.
pub const CANCEL_ANSWER: &str = "-";

/// User-facing prompts used by a run.
///
/// Each call blocks until the user answers. `Ok(None)` means the prompt was
/// dismissed; errors are reserved for failures of the UI itself.
pub trait Prompter {
    /// Shows a single-selection list and returns the index of the chosen item.
    fn pick(&mut self, title: &str, items: &[PickItem]) -> Result<Option<usize>>;

    /// Shows a text entry prompt and returns the submitted text.
    fn input(&mut self, request: &InputRequest) -> Result<Option<String>>;
}

impl<P: Prompter + ?Sized> Prompter for &mut P {
    fn pick(&mut self, title: &str, items: &[PickItem]) -> Result<Option<usize>> {
        (**self).pick(title, items)
    }

    fn input(&mut self, request: &InputRequest) -> Result<Option<String>> {
        (**self).input(request)
    }
}

/// One prompt shown by a [`ScriptedPrompter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptRecord {
    /// A pick prompt with the labels it offered.
    Pick {
        /// Prompt title.
        title: String,
        /// Offered labels in order.
        labels: Vec<String>,
    },
    /// A text entry prompt.
    Input(InputRequest),
}

/// Replays queued answers instead of asking a person.
///
/// Pick answers are matched against item labels. An exhausted queue or the
/// [`CANCEL_ANSWER`] literal cancels the prompt.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<String>,
    transcript: Vec<PromptRecord>,
}

impl ScriptedPrompter {
    /// Creates a prompter that answers with `answers` in order.
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            transcript: Vec::new(),
        }
    }

    /// Prompts shown so far.
    pub fn transcript(&self) -> &[PromptRecord] {
        &self.transcript
    }

    /// Answers not consumed yet.
    pub fn remaining(&self) -> usize {
        self.answers.len()
    }

    fn next_answer(&mut self) -> Option<String> {
        self.answers
            .pop_front()
            .filter(|answer| answer != CANCEL_ANSWER)
    }
}

impl Prompter for ScriptedPrompter {
    fn pick(&mut self, title: &str, items: &[PickItem]) -> Result<Option<usize>> {
        self.transcript.push(PromptRecord::Pick {
            title: title.to_owned(),
            labels: items.iter().map(|item| item.label.clone()).collect(),
        });
        let Some(answer) = self.next_answer() else {
            return Ok(None);
        };
        items
            .iter()
            .position(|item| item.label == answer)
            .map(Some)
            .ok_or_else(|| {
                HelperError::NotFound(format!("`{answer}` is not an option of `{title}`"))
            })
    }

    fn input(&mut self, request: &InputRequest) -> Result<Option<String>> {
        self.transcript.push(PromptRecord::Input(request.clone()));
        Ok(self.next_answer())
    }
}

#[cfg(test)]
mod unit_tests {
    use super::{PromptRecord, Prompter, ScriptedPrompter};
    use crate::{
        error::HelperError,
        types::{InputRequest, PickItem},
    };

    fn items() -> Vec<PickItem> {
        vec![PickItem::label("dev"), PickItem::label("prod")]
    }

    #[test]
    fn pick_matches_by_label() {
        let mut prompter = ScriptedPrompter::new(["prod"]);
        assert_eq!(prompter.pick("env", &items()).unwrap(), Some(1));
        assert_eq!(prompter.remaining(), 0);
    }

    #[test]
    fn cancel_literal_and_exhaustion_cancel() {
        let mut prompter = ScriptedPrompter::new(["-"]);
        assert_eq!(prompter.pick("env", &items()).unwrap(), None);
        let request = InputRequest::for_argument("name");
        assert_eq!(prompter.input(&request).unwrap(), None);
    }

    #[test]
    fn unknown_pick_answer_is_not_found() {
        let mut prompter = ScriptedPrompter::new(["staging"]);
        assert!(matches!(
            prompter.pick("env", &items()),
            Err(HelperError::NotFound(_))
        ));
    }

    #[test]
    fn input_returns_answer_verbatim_and_records_prompt() {
        let mut prompter = ScriptedPrompter::new(["  spaced value "]);
        let request = InputRequest::for_argument("name");
        assert_eq!(
            prompter.input(&request).unwrap().as_deref(),
            Some("  spaced value ")
        );
        assert_eq!(prompter.transcript(), [PromptRecord::Input(request)]);
    }
}
