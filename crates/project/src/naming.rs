use codepad_settings::FilePreferences;
use thiserror::Error;

/// Why a proposed file name was refused.
/// 拒絕檔名的原因。
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NameError {
    #[error("file name is empty")]
    Empty,
    #[error("`{0}` is reserved")]
    Reserved(String),
    #[error("`{0}` must not start with '.'")]
    Hidden(String),
    #[error("`{name}` contains the disallowed character {ch:?}")]
    InvalidCharacter { name: String, ch: char },
}

/// Naming rules for the files of a project: default name, untitled names, collisions.
/// 專案檔名規則：預設檔名、未命名檔名與名稱衝突判定。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamePolicy {
    default_stem: String,
    extension: String,
    untitled_stem: String,
    untitled_start: u32,
}

impl Default for NamePolicy {
    fn default() -> Self {
        Self::from(&FilePreferences::default())
    }
}

impl From<&FilePreferences> for NamePolicy {
    fn from(prefs: &FilePreferences) -> Self {
        Self {
            default_stem: prefs.default_stem.clone(),
            extension: prefs.extension.trim_start_matches('.').to_string(),
            untitled_stem: prefs.untitled_stem.clone(),
            untitled_start: prefs.untitled_start,
        }
    }
}

impl NamePolicy {
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// The name of the file every project starts with (and falls back to).
    /// 專案的第一個（及回退用的）檔名。
    pub fn default_name(&self) -> String {
        self.with_extension(&self.default_stem)
    }

    /// Returns the first unused name of the sequence `Untitled`, `Untitled-1`, `Untitled-2`, ...
    /// Holes left by deleted files are reused before the sequence grows.
    /// 回傳序列中第一個未被使用的未命名檔名；會優先填補空缺。
    pub fn next_untitled_name<'a, I>(&self, existing: I) -> String
    where
        I: IntoIterator<Item = &'a str>,
    {
        let taken: Vec<&str> = existing.into_iter().map(normalize).collect();
        let bare = self.with_extension(&self.untitled_stem);
        if !taken.contains(&bare.as_str()) {
            return bare;
        }
        (self.untitled_start..=u32::MAX)
            .map(|n| self.with_extension(&format!("{}-{n}", self.untitled_stem)))
            .find(|candidate| !taken.contains(&candidate.as_str()))
            .unwrap_or(bare)
    }

    /// Exact, case-sensitive comparison after trimming.
    /// 去除前後空白後以區分大小寫的方式比對。
    pub fn is_collision<'a, I>(&self, name: &str, existing: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        let name = normalize(name);
        existing.into_iter().any(|other| normalize(other) == name)
    }

    /// Normalises and checks a user-supplied name.
    /// 正規化並驗證使用者提供的檔名。
    pub fn validate(&self, name: &str) -> Result<String, NameError> {
        let name = normalize(name);
        if name.is_empty() {
            return Err(NameError::Empty);
        }
        if name == "." || name == ".." {
            return Err(NameError::Reserved(name.to_string()));
        }
        if name.starts_with('.') {
            return Err(NameError::Hidden(name.to_string()));
        }
        if let Some(ch) = name
            .chars()
            .find(|ch| *ch == '/' || *ch == '\\' || ch.is_control())
        {
            return Err(NameError::InvalidCharacter {
                name: name.to_string(),
                ch,
            });
        }
        Ok(name.to_string())
    }

    fn with_extension(&self, stem: &str) -> String {
        if self.extension.is_empty() {
            stem.to_string()
        } else {
            format!("{stem}.{}", self.extension)
        }
    }
}

pub fn normalize(name: &str) -> &str {
    name.trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn untitled_pattern(name: &str) -> bool {
        let Some(stem) = name.strip_suffix(".kcl") else {
            return false;
        };
        match stem.strip_prefix("Untitled") {
            Some("") => true,
            Some(rest) => rest
                .strip_prefix('-')
                .map(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
                .unwrap_or(false),
            None => false,
        }
    }

    #[test]
    fn default_name_uses_extension() {
        assert_eq!(NamePolicy::default().default_name(), "main.kcl");
    }

    #[test]
    fn untitled_names_grow_without_duplicates() {
        let policy = NamePolicy::default();
        let mut existing = BTreeSet::new();
        for _ in 0..5 {
            let name = policy.next_untitled_name(existing.iter().map(String::as_str));
            assert!(untitled_pattern(&name), "{name} should look untitled");
            assert!(existing.insert(name));
        }
        assert_eq!(existing.len(), 5);
        assert!(existing.contains("Untitled.kcl"));
        assert!(existing.contains("Untitled-4.kcl"));
    }

    #[test]
    fn untitled_names_fill_gaps() {
        let policy = NamePolicy::default();
        let existing = ["Untitled.kcl", "Untitled-2.kcl", "main.kcl"];
        assert_eq!(policy.next_untitled_name(existing), "Untitled-1.kcl");
    }

    #[test]
    fn untitled_start_follows_preferences() {
        let prefs = FilePreferences {
            untitled_start: 7,
            ..FilePreferences::default()
        };
        let policy = NamePolicy::from(&prefs);
        assert_eq!(policy.next_untitled_name(["Untitled.kcl"]), "Untitled-7.kcl");
    }

    #[test]
    fn untitled_sequence_stops_at_the_top_of_the_range() {
        let prefs = FilePreferences {
            untitled_start: u32::MAX,
            ..FilePreferences::default()
        };
        let policy = NamePolicy::from(&prefs);
        let top = format!("Untitled-{}.kcl", u32::MAX);
        let existing = ["Untitled.kcl", top.as_str()];
        let name = policy.next_untitled_name(existing);
        assert!(policy.is_collision(&name, existing));
    }

    #[test]
    fn collisions_compare_trimmed_and_case_sensitive() {
        let policy = NamePolicy::default();
        let existing = ["main.kcl", "2.kcl"];
        assert!(policy.is_collision(" main.kcl ", existing));
        assert!(!policy.is_collision("Main.kcl", existing));
        assert!(!policy.is_collision("hello.kcl", existing));
    }

    #[test]
    fn validate_rejects_unsafe_names() {
        let policy = NamePolicy::default();
        assert_eq!(policy.validate("  hello.kcl "), Ok("hello.kcl".to_string()));
        assert_eq!(policy.validate("   "), Err(NameError::Empty));
        assert!(matches!(policy.validate(".."), Err(NameError::Reserved(_))));
        assert!(matches!(policy.validate(".codepad"), Err(NameError::Hidden(_))));
        assert!(matches!(
            policy.validate("parts/gear.kcl"),
            Err(NameError::InvalidCharacter { ch: '/', .. })
        ));
    }
}
