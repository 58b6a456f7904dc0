use std::{
    fs,
    path::{Component, Path, PathBuf},
};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    catalog::CommandCatalog,
    error::{HelperError, Result},
    types::{ArgumentSpec, CommandDefinition},
};

const CONFIG_VERSION_V1: u32 = 1;
const DEFAULT_TERMINAL_NAME: &str = "command-helper";

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = ".command-helper.toml";
/// Editor settings file consulted when no dedicated config exists.
///
/// Parsed leniently: comments and trailing commas are accepted.
pub const SETTINGS_FILE_PATH: &str = ".vscode/settings.json";
/// Settings key holding the command catalog in JSON settings files.
pub const SETTINGS_COMMANDS_KEY: &str = "command-helper.commands";
/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "COMMAND_HELPER_CONFIG";

/// Source used to select the effective config file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    /// Selected via `--config` CLI flag.
    Flag,
    /// Selected via `COMMAND_HELPER_CONFIG` environment variable.
    Env,
    /// Selected by walking from the current working directory to root.
    Discovered,
    /// No config file selected.
    None,
}

/// Resolved config selection before parsing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigSelection {
    /// Source used for selection.
    pub source: ConfigSource,
    /// Selected path when a config file was found.
    pub path: Option<PathBuf>,
}

/// On-disk format of a config file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigFormat {
    /// `.command-helper.toml` layout.
    Toml,
    /// Editor `settings.json` layout.
    Json,
}

impl ConfigFormat {
    /// Picks the format from the file extension; anything but `.json` is TOML.
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|extension| extension.to_str()) {
            Some(extension) if extension.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Toml,
        }
    }
}

/// Raw TOML shape for one `.command-helper.toml` file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct HelperConfigFile {
    /// Schema version.
    #[serde(default = "default_config_version")]
    pub version: u32,
    /// Persistent shell settings.
    #[serde(default)]
    pub terminal: TerminalConfigFile,
    /// Command catalog keyed by command name.
    #[serde(default)]
    pub commands: IndexMap<String, CommandFile>,
}

/// Raw `[terminal]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TerminalConfigFile {
    /// Terminal display name.
    pub name: Option<String>,
    /// Shell executable override.
    pub shell: Option<String>,
}

/// Raw command entry, shared by the TOML and JSON layouts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CommandFile {
    /// Literal invocation shown in the picker.
    pub command: String,
    /// Declared arguments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<IndexMap<String, ArgumentFile>>,
    /// Template sent to the terminal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Raw argument entry: a string means free text, a table lists choices.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ArgumentFile {
    /// Free-text argument; the string content is not used.
    FreeText(String),
    /// Choice-list argument.
    Choices(ChoicesFile),
}

/// Raw `{ choices = [...] }` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ChoicesFile {
    /// Candidate values in display order.
    #[serde(default)]
    pub choices: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SettingsFile {
    #[serde(rename = "command-helper.commands", default)]
    commands: IndexMap<String, CommandFile>,
}

/// Effective terminal settings after defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TerminalSettings {
    /// Terminal display name.
    pub name: String,
    /// Shell executable override; `None` falls back to `$SHELL`.
    pub shell: Option<PathBuf>,
}

impl Default for TerminalSettings {
    fn default() -> Self {
        Self {
            name: DEFAULT_TERMINAL_NAME.to_owned(),
            shell: None,
        }
    }
}

/// Effective and validated configuration.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HelperConfig {
    /// Absolute config file path.
    pub source_path: PathBuf,
    /// Format the file was parsed as.
    pub format: ConfigFormat,
    /// Effective terminal settings.
    pub terminal: TerminalSettings,
    /// Loaded command catalog.
    pub catalog: CommandCatalog,
}

impl HelperConfig {
    /// Loads and validates a config file from disk.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let cwd = std::env::current_dir()?;
        let absolute_path = absolutize_path(path.as_ref(), &cwd);
        if !absolute_path.exists() {
            return Err(HelperError::Config(format!(
                "config file does not exist: {}",
                absolute_path.display()
            )));
        }

        let raw = fs::read_to_string(&absolute_path)?;
        validate_config_file_permissions(&absolute_path)?;
        Self::parse_from_str(&raw, &absolute_path)
    }

    /// Parses config text; the format follows the `source_path` extension.
    pub fn parse_from_str(raw: &str, source_path: impl AsRef<Path>) -> Result<Self> {
        let source_path = source_path.as_ref();
        let format = ConfigFormat::for_path(source_path);
        let parsed = match format {
            ConfigFormat::Toml => toml::from_str::<HelperConfigFile>(raw)
                .map_err(|error| HelperError::Config(format!("invalid config TOML: {error}")))?,
            ConfigFormat::Json => {
                let settings = json5::from_str::<SettingsFile>(raw).map_err(|error| {
                    HelperError::Config(format!("invalid settings JSON: {error}"))
                })?;
                HelperConfigFile {
                    version: CONFIG_VERSION_V1,
                    terminal: TerminalConfigFile::default(),
                    commands: settings.commands,
                }
            }
        };
        build_config(parsed, source_path, format)
    }
}

/// Resolves one config path based on precedence rules.
pub fn resolve_config_path(
    explicit_path: Option<&Path>,
    env_path: Option<&str>,
    cwd: impl AsRef<Path>,
) -> Result<ConfigSelection> {
    let cwd = cwd.as_ref();
    if let Some(path) = explicit_path {
        let candidate = absolutize_path(path, cwd);
        if !is_regular_config_candidate(&candidate) {
            return Err(HelperError::Config(format!(
                "config file must be a regular file: {}",
                candidate.display()
            )));
        }
        return Ok(ConfigSelection {
            source: ConfigSource::Flag,
            path: Some(candidate),
        });
    }

    if let Some(value) = env_path {
        if value.trim().is_empty() {
            return Err(HelperError::Config(format!(
                "{CONFIG_ENV_VAR} cannot be empty"
            )));
        }

        let candidate = absolutize_path(Path::new(value), cwd);
        if !is_regular_config_candidate(&candidate) {
            return Err(HelperError::Config(format!(
                "config file must be a regular file: {}",
                candidate.display()
            )));
        }
        return Ok(ConfigSelection {
            source: ConfigSource::Env,
            path: Some(candidate),
        });
    }

    if let Some(discovered) = discover_config(cwd) {
        return Ok(ConfigSelection {
            source: ConfigSource::Discovered,
            path: Some(discovered),
        });
    }

    Ok(ConfigSelection {
        source: ConfigSource::None,
        path: None,
    })
}

/// Walks from `start_dir` to the filesystem root looking for a config.
///
/// In each directory `.command-helper.toml` wins over `.vscode/settings.json`.
pub fn discover_config(start_dir: impl AsRef<Path>) -> Option<PathBuf> {
    let mut current = start_dir.as_ref();
    loop {
        for name in [CONFIG_FILE_NAME, SETTINGS_FILE_PATH] {
            let candidate = current.join(name);
            if is_regular_config_candidate(&candidate) {
                return Some(candidate);
            }
        }

        let parent = current.parent()?;
        current = parent;
    }
}

fn default_config_version() -> u32 {
    CONFIG_VERSION_V1
}

fn build_config(
    raw: HelperConfigFile,
    source_path: &Path,
    format: ConfigFormat,
) -> Result<HelperConfig> {
    validate_raw_config(&raw)?;

    let defaults = TerminalSettings::default();
    let terminal = TerminalSettings {
        name: raw.terminal.name.unwrap_or(defaults.name),
        shell: raw.terminal.shell.map(PathBuf::from),
    };
    let catalog = raw
        .commands
        .into_iter()
        .map(|(name, command)| (name, command_definition(command)))
        .collect();

    Ok(HelperConfig {
        source_path: source_path.to_path_buf(),
        format,
        terminal,
        catalog,
    })
}

fn validate_raw_config(config: &HelperConfigFile) -> Result<()> {
    if config.version != CONFIG_VERSION_V1 {
        return Err(HelperError::Config(format!(
            "unsupported config version {}; expected {CONFIG_VERSION_V1}",
            config.version
        )));
    }
    if let Some(name) = &config.terminal.name {
        if name.trim().is_empty() {
            return Err(HelperError::Config(
                "terminal name cannot be empty".to_owned(),
            ));
        }
    }
    if let Some(shell) = &config.terminal.shell {
        if shell.trim().is_empty() {
            return Err(HelperError::Config(
                "terminal shell cannot be empty".to_owned(),
            ));
        }
    }
    Ok(())
}

fn command_definition(raw: CommandFile) -> CommandDefinition {
    let arguments = raw
        .args
        .unwrap_or_default()
        .into_iter()
        .map(|(name, argument)| {
            let spec = match argument {
                ArgumentFile::FreeText(_) => ArgumentSpec::FreeText,
                ArgumentFile::Choices(choices) => ArgumentSpec::Choices(choices.choices),
            };
            (name, spec)
        })
        .collect();
    CommandDefinition {
        invocation: raw.command,
        arguments,
        description: raw.description,
    }
}

fn normalize_path(path: &Path) -> PathBuf {
    let is_absolute = path.is_absolute();
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::Prefix(prefix) => normalized.push(prefix.as_os_str()),
            Component::RootDir => normalized.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() && !is_absolute {
                    normalized.push("..");
                }
            }
            Component::Normal(part) => normalized.push(part),
        }
    }

    if normalized.as_os_str().is_empty() {
        if is_absolute {
            PathBuf::from(std::path::MAIN_SEPARATOR.to_string())
        } else {
            PathBuf::from(".")
        }
    } else {
        normalized
    }
}

fn absolutize_path(path: &Path, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize_path(path)
    } else {
        normalize_path(&cwd.join(path))
    }
}

// Every entry ends up typed into a shell, so a world-writable file is refused.
fn validate_config_file_permissions(path: &Path) -> Result<()> {
    let metadata = fs::symlink_metadata(path)?;
    if metadata.file_type().is_symlink() || !metadata.file_type().is_file() {
        return Err(HelperError::Config(format!(
            "config path must be a regular file: {}",
            path.display()
        )));
    }

    #[cfg(unix)]
    {
        let mode = metadata.permissions().mode() & 0o777;
        if mode & 0o002 != 0 {
            return Err(HelperError::Config(format!(
                "config file must not be world writable: {}",
                path.display()
            )));
        }
    }

    Ok(())
}

fn is_regular_config_candidate(path: &Path) -> bool {
    let Ok(metadata) = fs::symlink_metadata(path) else {
        return false;
    };
    !metadata.file_type().is_symlink() && metadata.file_type().is_file()
}
