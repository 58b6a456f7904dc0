use indexmap::IndexMap;
use serde::Serialize;

use crate::types::{CommandDefinition, PickItem};

/// Named command definitions in declaration order.
///
/// Loaded once at startup and never mutated afterwards.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct CommandCatalog {
    commands: IndexMap<String, CommandDefinition>,
}

impl CommandCatalog {
    /// Creates a catalog from an ordered map.
    pub fn new(commands: IndexMap<String, CommandDefinition>) -> Self {
        Self { commands }
    }

    /// Looks up one definition by name.
    pub fn get(&self, name: &str) -> Option<&CommandDefinition> {
        self.commands.get(name)
    }

    /// Iterates entries in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CommandDefinition)> {
        self.commands
            .iter()
            .map(|(name, definition)| (name.as_str(), definition))
    }

    /// Number of configured commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns `true` when no command is configured.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Builds one pick entry per command: name, invocation, then description.
    pub fn pick_items(&self) -> Vec<PickItem> {
        self.iter()
            .map(|(name, definition)| PickItem {
                label: name.to_owned(),
                description: Some(definition.invocation.clone()),
                detail: Some(definition.description.clone().unwrap_or_default()),
            })
            .collect()
    }
}

impl FromIterator<(String, CommandDefinition)> for CommandCatalog {
    fn from_iter<I: IntoIterator<Item = (String, CommandDefinition)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod unit_tests {
    use super::CommandCatalog;
    use crate::types::CommandDefinition;

    fn catalog() -> CommandCatalog {
        [
            (
                "test".to_owned(),
                CommandDefinition::new("cargo test").with_description("cargo test {filter}"),
            ),
            ("build".to_owned(), CommandDefinition::new("cargo build")),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn pick_items_follow_catalog_order() {
        let labels: Vec<String> = catalog()
            .pick_items()
            .into_iter()
            .map(|item| item.label)
            .collect();
        assert_eq!(labels, ["test", "build"]);
    }

    #[test]
    fn pick_items_carry_invocation_and_detail() {
        let items = catalog().pick_items();
        assert_eq!(items[0].description.as_deref(), Some("cargo test"));
        assert_eq!(items[0].detail.as_deref(), Some("cargo test {filter}"));
        assert_eq!(items[1].description.as_deref(), Some("cargo build"));
        assert_eq!(items[1].detail.as_deref(), Some(""));
    }

    #[test]
    fn get_finds_by_exact_name() {
        let catalog = catalog();
        assert_eq!(catalog.len(), 2);
        assert!(catalog.get("build").is_some());
        assert!(catalog.get("Build").is_none());
        assert!(!catalog.is_empty());
    }
}
