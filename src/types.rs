use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

const ARGUMENT_INPUT_TITLE: &str = "Current script arguments";

/// How one placeholder value is obtained from the user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "choices", rename_all = "snake_case")]
pub enum ArgumentSpec {
    /// Open text entry.
    FreeText,
    /// Single selection from the listed candidates, in order.
    Choices(Vec<String>),
}

/// One named entry of the command catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandDefinition {
    /// Literal shell string shown next to the name. Display-only.
    pub invocation: String,
    /// Declared arguments in declaration order.
    #[serde(default)]
    pub arguments: IndexMap<String, ArgumentSpec>,
    /// Template with `{name}` placeholders; this is the text that gets sent.
    pub description: Option<String>,
}

impl CommandDefinition {
    /// Creates a definition without arguments or template.
    pub fn new(invocation: impl Into<String>) -> Self {
        Self {
            invocation: invocation.into(),
            arguments: IndexMap::new(),
            description: None,
        }
    }

    /// Sets the description template.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Appends one argument after the already declared ones.
    pub fn with_argument(mut self, name: impl Into<String>, spec: ArgumentSpec) -> Self {
        self.arguments.insert(name.into(), spec);
        self
    }
}

/// One selectable row of a pick prompt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PickItem {
    /// Primary label.
    pub label: String,
    /// Secondary caption shown beside the label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Tertiary detail line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl PickItem {
    /// Creates a label-only item.
    pub fn label(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            description: None,
            detail: None,
        }
    }
}

/// Parameters of one free-text prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputRequest {
    /// Prompt title.
    pub title: String,
    /// Placeholder shown while the input is empty.
    pub placeholder: String,
    /// Explanatory prompt line.
    pub prompt: String,
}

impl InputRequest {
    /// Builds the prompt used for one free-text argument.
    pub fn for_argument(argument_name: &str) -> Self {
        Self {
            title: ARGUMENT_INPUT_TITLE.to_owned(),
            placeholder: format!("argument \"{argument_name}\""),
            prompt: format!("Provide argument for argument \"{argument_name}\""),
        }
    }
}
