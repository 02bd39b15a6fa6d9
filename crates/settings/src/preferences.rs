use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

const PREFERENCES_VERSION: u32 = 1;
const MAX_UNTITLED_START: u32 = 1_000_000;

#[derive(Debug, Error)]
pub enum PreferencesError {
    #[error("failed to read preferences {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse preferences {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize preferences {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write preferences {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to prepare directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// 專案層級的偏好設定。 / Project-level preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub files: FilePreferences,
    #[serde(default)]
    pub editor: EditorPreferences,
}

fn default_version() -> u32 {
    PREFERENCES_VERSION
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            version: PREFERENCES_VERSION,
            files: FilePreferences::default(),
            editor: EditorPreferences::default(),
        }
    }
}

impl Preferences {
    pub fn sanitize(&mut self) {
        if self.version == 0 {
            self.version = PREFERENCES_VERSION;
        }
        self.files.sanitize();
    }
}

/// Values feeding the file naming policy.
/// 檔名規則使用的設定值。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePreferences {
    #[serde(default = "default_stem")]
    pub default_stem: String,
    #[serde(default = "default_extension")]
    pub extension: String,
    #[serde(default = "default_untitled_stem")]
    pub untitled_stem: String,
    #[serde(default = "default_untitled_start")]
    pub untitled_start: u32,
}

fn default_stem() -> String {
    "main".to_string()
}

fn default_extension() -> String {
    "kcl".to_string()
}

fn default_untitled_stem() -> String {
    "Untitled".to_string()
}

fn default_untitled_start() -> u32 {
    1
}

impl Default for FilePreferences {
    fn default() -> Self {
        Self {
            default_stem: default_stem(),
            extension: default_extension(),
            untitled_stem: default_untitled_stem(),
            untitled_start: default_untitled_start(),
        }
    }
}

impl FilePreferences {
    fn sanitize(&mut self) {
        if !is_plain_component(&self.default_stem) {
            self.default_stem = default_stem();
        }
        let extension = self.extension.trim().trim_start_matches('.').to_string();
        self.extension = if is_plain_component(&extension) {
            extension
        } else {
            default_extension()
        };
        if !is_plain_component(&self.untitled_stem) {
            self.untitled_stem = default_untitled_stem();
        }
        if self.untitled_start == 0 {
            self.untitled_start = default_untitled_start();
        }
        self.untitled_start = self.untitled_start.min(MAX_UNTITLED_START);
    }
}

fn is_plain_component(value: &str) -> bool {
    let trimmed = value.trim();
    !trimmed.is_empty()
        && trimmed == value
        && !trimmed.starts_with('.')
        && !trimmed
            .chars()
            .any(|ch| ch == '/' || ch == '\\' || ch.is_control())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorPreferences {
    /// Flush unsaved buffer edits before switching or renaming the bound file.
    #[serde(default = "default_true")]
    pub save_before_switch: bool,
}

fn default_true() -> bool {
    true
}

impl Default for EditorPreferences {
    fn default() -> Self {
        Self {
            save_before_switch: true,
        }
    }
}

#[derive(Debug)]
pub struct PreferencesStore {
    path: PathBuf,
    data: Preferences,
}

impl PreferencesStore {
    pub fn new(path: impl Into<PathBuf>, preferences: Preferences) -> Self {
        Self {
            path: path.into(),
            data: preferences,
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, PreferencesError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            let mut data = Preferences::default();
            data.sanitize();
            return Ok(Self { path, data });
        }

        let contents = fs::read_to_string(&path).map_err(|source| PreferencesError::Read {
            path: path.clone(),
            source,
        })?;
        let mut data: Preferences =
            serde_json::from_str(&contents).map_err(|source| PreferencesError::Parse {
                path: path.clone(),
                source,
            })?;
        data.sanitize();
        Ok(Self { path, data })
    }

    pub fn preferences(&self) -> &Preferences {
        &self.data
    }

    pub fn update<F>(&mut self, mut op: F) -> Result<(), PreferencesError>
    where
        F: FnMut(&mut Preferences),
    {
        op(&mut self.data);
        self.data.sanitize();
        self.save()
    }

    pub fn overwrite(&mut self, preferences: Preferences) -> Result<(), PreferencesError> {
        self.data = preferences;
        self.data.sanitize();
        self.save()
    }

    pub fn save(&self) -> Result<(), PreferencesError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| PreferencesError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let payload = serde_json::to_string_pretty(&self.data).map_err(|source| {
            PreferencesError::Serialize {
                path: self.path.clone(),
                source,
            }
        })?;

        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, payload.as_bytes()).map_err(|source| PreferencesError::Write {
            path: tmp_path.clone(),
            source,
        })?;
        fs::rename(&tmp_path, &self.path).map_err(|source| PreferencesError::Write {
            path: self.path.clone(),
            source,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
