use std::path::Path;

use crate::error::UnifyResult;

/// A fully buffered source artifact.
///
/// Both parsing passes index into `lines`, so the file is read exactly once.
#[derive(Debug, Clone)]
pub struct SourceLines {
    /// Display name used in error messages (usually the file name).
    pub name: String,
    pub lines: Vec<String>,
}

impl SourceLines {
    /// Read the whole file into memory. `\n` and `\r\n` terminators are stripped.
    pub fn read(path: &Path) -> UnifyResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("<input>")
            .to_string();
        log::debug!("read {} bytes from {}", text.len(), path.display());
        Ok(Self::from_text(name, &text))
    }

    pub fn from_text(name: impl Into<String>, text: &str) -> Self {
        SourceLines {
            name: name.into(),
            lines: text.lines().map(str::to_string).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Position of the 0-based line `idx`, 1-indexed for messages.
    pub fn pos(&self, idx: usize) -> SourcePos<'_> {
        SourcePos {
            source_name: &self.name,
            line: idx + 1,
        }
    }
}

/// Where a token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourcePos<'a> {
    pub source_name: &'a str,
    pub line: usize,
}
