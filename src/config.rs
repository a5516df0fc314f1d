//! Configuration loading and persistence.
//!
//! Settings live in `config.json` under the platform config directory
//! (`<config>/editor-bridge`). A missing file means defaults; environment
//! variables override the file and command-line flags override both.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf};

use crate::constants;
use crate::session::protocol::WireFormat;

/// Name of the configuration file inside [`Config::config_dir`].
pub const CONFIG_FILE: &str = "config.json";

/// Runtime configuration for the bridge binary.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Launch string for the editor, split into argv by [`split_command`].
    pub editor_command: String,
    /// Grid width requested when attaching.
    pub initial_columns: u16,
    /// Grid height requested when attaching.
    pub initial_rows: u16,
    /// Framing the editor speaks on stdio. `nvim --embed` needs `msgpack`;
    /// `json-lines` is for editors behind a line-protocol adapter.
    pub wire_format: WireFormat,
    /// Log file; defaults to `editor-bridge.log` in the config directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            editor_command: "nvim --embed".to_string(),
            initial_columns: constants::DEFAULT_COLUMNS,
            initial_rows: constants::DEFAULT_ROWS,
            wire_format: WireFormat::MessagePack,
            log_file: None,
        }
    }
}

impl Config {
    /// Returns the configuration directory path, creating it if necessary.
    ///
    /// `EDITOR_BRIDGE_CONFIG_DIR` overrides the platform config directory.
    pub fn config_dir() -> Result<PathBuf> {
        let dir = match std::env::var_os("EDITOR_BRIDGE_CONFIG_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => dirs::config_dir()
                .context("Could not determine config directory")?
                .join("editor-bridge"),
        };
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create config dir {}", dir.display()))?;
        Ok(dir)
    }

    /// Loads configuration from the config directory, with environment
    /// variable overrides applied.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_dir()?.join(CONFIG_FILE))?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Loads configuration from `path`; a missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    /// Apply `EDITOR_BRIDGE_*` overrides, looking variables up with `var`.
    pub fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(command) = var("EDITOR_BRIDGE_COMMAND") {
            self.editor_command = command;
        }
        if let Some(log_file) = var("EDITOR_BRIDGE_LOG_FILE") {
            self.log_file = Some(PathBuf::from(log_file));
        }
        if let Some(wire) = var("EDITOR_BRIDGE_WIRE_FORMAT") {
            match wire.parse::<WireFormat>() {
                Ok(wire) => self.wire_format = wire,
                Err(e) => log::warn!("Ignoring EDITOR_BRIDGE_WIRE_FORMAT: {e}"),
            }
        }
    }

    /// Persists the configuration to `path`.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// Log file to use: the configured one, else the config directory,
    /// else the system temp directory.
    pub fn log_path(&self) -> PathBuf {
        if let Some(path) = &self.log_file {
            return path.clone();
        }
        Self::config_dir()
            .unwrap_or_else(|_| std::env::temp_dir())
            .join("editor-bridge.log")
    }

    /// Editor argv: the split launch string followed by `extra`.
    pub fn editor_argv(&self, extra: &[String]) -> Result<Vec<String>> {
        let mut argv = split_command(&self.editor_command)?;
        if argv.is_empty() {
            bail!("Editor command is empty");
        }
        argv.extend(extra.iter().cloned());
        Ok(argv)
    }
}

/// Split a launch string into words.
///
/// Single quotes are literal, double quotes allow `\"` and `\\`, and a
/// backslash outside quotes escapes the next character. Each word is then
/// expanded with [`shellexpand::full`] (`~`, `$VAR`, `${VAR}`).
pub fn split_command(command: &str) -> Result<Vec<String>> {
    #[derive(PartialEq)]
    enum Quote {
        None,
        Single,
        Double,
    }

    let mut words = Vec::new();
    let mut word = String::new();
    let mut in_word = false;
    let mut quote = Quote::None;
    let mut chars = command.chars();

    while let Some(c) = chars.next() {
        match (&quote, c) {
            (Quote::Single, '\'') | (Quote::Double, '"') => quote = Quote::None,
            (Quote::Single, c) => word.push(c),
            (Quote::Double, '\\') => match chars.next() {
                Some(next @ ('"' | '\\')) => word.push(next),
                Some(next) => {
                    word.push('\\');
                    word.push(next);
                }
                None => bail!("Unterminated quote in command: {command}"),
            },
            (Quote::Double, c) => word.push(c),
            (Quote::None, '\'') => {
                quote = Quote::Single;
                in_word = true;
            }
            (Quote::None, '"') => {
                quote = Quote::Double;
                in_word = true;
            }
            (Quote::None, '\\') => {
                let next = chars
                    .next()
                    .with_context(|| format!("Trailing backslash in command: {command}"))?;
                word.push(next);
                in_word = true;
            }
            (Quote::None, c) if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut word));
                    in_word = false;
                }
            }
            (Quote::None, c) => {
                word.push(c);
                in_word = true;
            }
        }
    }
    if quote != Quote::None {
        bail!("Unterminated quote in command: {command}");
    }
    if in_word {
        words.push(word);
    }

    words
        .into_iter()
        .map(|word| {
            shellexpand::full(&word)
                .map(|expanded| expanded.into_owned())
                .with_context(|| format!("Failed to expand '{word}'"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.editor_command, "nvim --embed");
        assert_eq!(config.initial_columns, 153);
        assert_eq!(config.initial_rows, 39);
        assert_eq!(config.wire_format, WireFormat::MessagePack);
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, r#"{"initial_rows": 50}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.initial_rows, 50);
        assert_eq!(config.initial_columns, 153);
        assert_eq!(config.editor_command, "nvim --embed");
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "not json").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let config = Config {
            editor_command: "vim --embed".to_string(),
            log_file: Some(PathBuf::from("/tmp/bridge.log")),
            ..Config::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_overrides(|key| match key {
            "EDITOR_BRIDGE_COMMAND" => Some("nvim --embed --clean".to_string()),
            "EDITOR_BRIDGE_LOG_FILE" => Some("/var/log/bridge.log".to_string()),
            "EDITOR_BRIDGE_WIRE_FORMAT" => Some("json-lines".to_string()),
            _ => None,
        });
        assert_eq!(config.wire_format, WireFormat::JsonLines);
        assert_eq!(config.editor_command, "nvim --embed --clean");
        assert_eq!(config.log_file, Some(PathBuf::from("/var/log/bridge.log")));
        assert_eq!(config.log_path(), PathBuf::from("/var/log/bridge.log"));
    }

    #[test]
    fn test_unknown_wire_format_override_is_ignored() {
        let mut config = Config::default();
        config.apply_overrides(|key| {
            (key == "EDITOR_BRIDGE_WIRE_FORMAT").then(|| "xml".to_string())
        });
        assert_eq!(config.wire_format, WireFormat::MessagePack);
    }

    #[test]
    fn test_wire_format_read_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, r#"{"wire_format": "json-lines"}"#).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().wire_format, WireFormat::JsonLines);
    }

    #[test]
    fn test_split_plain_words() {
        assert_eq!(
            split_command("  nvim   --embed -u NONE ").unwrap(),
            vec!["nvim", "--embed", "-u", "NONE"]
        );
    }

    #[test]
    fn test_split_quotes_and_escapes() {
        assert_eq!(
            split_command(r#"nvim -c 'set nu' "a \"b\"" c\ d ''"#).unwrap(),
            vec!["nvim", "-c", "set nu", r#"a "b""#, "c d", ""]
        );
    }

    #[test]
    fn test_split_unterminated_quote_fails() {
        assert!(split_command("nvim 'oops").is_err());
        assert!(split_command("nvim \"oops").is_err());
        assert!(split_command("nvim \\").is_err());
    }

    #[test]
    fn test_split_expands_tilde() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        let words = split_command("nvim ~/notes.txt").unwrap();
        assert_eq!(words[1], format!("{}/notes.txt", home.display()));
    }

    #[test]
    fn test_editor_argv_appends_extra() {
        let config = Config::default();
        let argv = config.editor_argv(&["file.txt".to_string()]).unwrap();
        assert_eq!(argv, vec!["nvim", "--embed", "file.txt"]);
    }

    #[test]
    fn test_editor_argv_rejects_empty_command() {
        let config = Config {
            editor_command: "   ".to_string(),
            ..Config::default()
        };
        assert!(config.editor_argv(&[]).is_err());
    }
}
