//! Project preferences persisted next to the project files.
//! 與專案檔案一同保存的偏好設定。

pub mod preferences;

pub use preferences::{
    EditorPreferences, FilePreferences, Preferences, PreferencesError, PreferencesStore,
};
