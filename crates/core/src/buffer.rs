/// The editor surface the project layer drives: content plus the file it saves to.
/// 專案層驅動的編輯器介面：內容與其綁定的檔案。
pub trait EditorBuffer {
    /// Replaces the displayed content with persisted bytes; the buffer becomes unmodified.
    fn set_content(&mut self, bytes: Vec<u8>);
    fn content(&self) -> &[u8];
    /// Changes which file future saves target without touching the content.
    fn bind_to_file(&mut self, name: &str);
    fn bound_file(&self) -> Option<&str>;
    /// Whether the content differs from what was last loaded or saved.
    fn is_modified(&self) -> bool;
    fn mark_saved(&mut self);
}

/// 行程內的文字緩衝。 / In-process byte buffer bound to at most one project file.
#[derive(Debug, Clone, Default)]
pub struct TextBuffer {
    contents: Vec<u8>,
    bound_file: Option<String>,
    modified: bool,
    revision: u64,
}

impl TextBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts every change to the content, loads included.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// 以使用者輸入取代全部內容。 / Replaces the whole content as a user edit.
    pub fn replace(&mut self, bytes: impl Into<Vec<u8>>) {
        self.contents = bytes.into();
        self.modified = true;
        self.revision += 1;
    }
}

impl EditorBuffer for TextBuffer {
    fn set_content(&mut self, bytes: Vec<u8>) {
        self.contents = bytes;
        self.modified = false;
        self.revision += 1;
    }

    fn content(&self) -> &[u8] {
        &self.contents
    }

    fn bind_to_file(&mut self, name: &str) {
        self.bound_file = Some(name.to_string());
    }

    fn bound_file(&self) -> Option<&str> {
        self.bound_file.as_deref()
    }

    fn is_modified(&self) -> bool {
        self.modified
    }

    fn mark_saved(&mut self) {
        self.modified = false;
    }
}
