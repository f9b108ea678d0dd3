//! Persisted workspace configuration

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Config file name inside the workspace directory.
pub const CONFIG_FILE: &str = "config";

/// Contents of the workspace `config` file.
///
/// Unset fields are left out when writing, and keys this version does not
/// know about survive a load/save round trip in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_dir: Option<PathBuf>,

    /// Basenames never walked, at any depth.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_files: Vec<String>,

    /// Module search path roots, in lookup order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub python_path: Vec<PathBuf>,

    /// Root-relative paths of files open in the editor.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub open_files: Vec<String>,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub editor_options: Map<String, Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Outcome of reading the config file.
#[derive(Debug)]
pub enum ConfigLoad {
    Loaded(WorkspaceConfig),
    /// No config file exists. Not an error.
    Missing,
    /// A config file exists but could not be read or parsed.
    Failed(String),
}

impl WorkspaceConfig {
    pub fn path(workspace_dir: &Path) -> PathBuf {
        workspace_dir.join(CONFIG_FILE)
    }

    pub fn load(workspace_dir: &Path) -> ConfigLoad {
        let path = Self::path(workspace_dir);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return ConfigLoad::Missing,
            Err(e) => return ConfigLoad::Failed(e.to_string()),
        };
        match serde_json::from_str(&text) {
            Ok(config) => ConfigLoad::Loaded(config),
            Err(e) => ConfigLoad::Failed(e.to_string()),
        }
    }

    /// Pretty-printed JSON with a 4-space indent and no trailing newline.
    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    pub fn save(&self, workspace_dir: &Path) -> anyhow::Result<()> {
        let json = self.to_pretty_json()?;
        std::fs::write(Self::path(workspace_dir), json)?;
        Ok(())
    }
}

/// Editor preferences, with config overrides applied on top of fixed
/// defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct EditorOptions {
    pub style: String,
    pub auto_indent: bool,
    pub indent_width: u32,
    pub tab_width: u32,
    pub insert_spaces_instead_of_tabs: bool,
    pub highlight_current_line: bool,
    pub show_right_margin: bool,
    pub right_margin_position: u32,
    pub show_line_numbers: bool,
    pub smart_backspace: bool,
}

impl Default for EditorOptions {
    fn default() -> Self {
        EditorOptions {
            style: "solarized-light".to_string(),
            auto_indent: true,
            indent_width: 4,
            tab_width: 4,
            insert_spaces_instead_of_tabs: true,
            highlight_current_line: true,
            show_right_margin: true,
            right_margin_position: 80,
            show_line_numbers: true,
            smart_backspace: true,
        }
    }
}

impl EditorOptions {
    /// Defaults with each recognized key in `overrides` replaced. Unknown
    /// keys are ignored; a badly typed override falls back to the defaults.
    pub fn with_overrides(overrides: &Map<String, Value>) -> Self {
        let defaults = Self::default();
        let Ok(Value::Object(mut merged)) = serde_json::to_value(&defaults) else {
            return defaults;
        };
        for (key, value) in overrides {
            if merged.contains_key(key) {
                merged.insert(key.clone(), value.clone());
            } else {
                tracing::debug!("Ignoring unknown editor option: {}", key);
            }
        }
        match serde_json::from_value(Value::Object(merged)) {
            Ok(options) => options,
            Err(e) => {
                tracing::warn!("Invalid editor options in config, using defaults: {}", e);
                defaults
            }
        }
    }

    /// Options as a flat key/value map, keyed by their config names.
    pub fn to_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}
