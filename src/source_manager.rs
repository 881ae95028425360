use serde::Serialize;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};

/// Source ID for identifying source buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SourceId(NonZeroU32);

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SourceId({})", self.0)
    }
}

impl SourceId {
    /// Id reserved for spans that do not point into any buffer.
    pub const BUILTIN: Self = Self(NonZeroU32::MIN);

    fn from_index(index: usize) -> Self {
        // index 0 is the first registered buffer, which gets id 2
        SourceId(NonZeroU32::new(index as u32 + 2).unwrap_or(NonZeroU32::MIN))
    }

    fn index(self) -> Option<usize> {
        (self.0.get() as usize).checked_sub(2)
    }
}

/// A half-open byte range `[start, end)` inside one source buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SourceSpan {
    pub source_id: SourceId,
    pub start: u32,
    pub end: u32,
}

impl Default for SourceSpan {
    fn default() -> Self {
        Self::empty()
    }
}

impl SourceSpan {
    pub fn new(source_id: SourceId, start: u32, end: u32) -> Self {
        debug_assert!(start <= end, "span start {} past end {}", start, end);
        SourceSpan { source_id, start, end }
    }

    pub fn empty() -> Self {
        SourceSpan::new(SourceId::BUILTIN, 0, 0)
    }

    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Zero-length span at the end of this one
    pub fn end_point(&self) -> Self {
        SourceSpan::new(self.source_id, self.end, self.end)
    }

    /// Merge two source spans into a single span covering both
    pub fn merge(self, other: SourceSpan) -> SourceSpan {
        if self.source_id != other.source_id {
            return self;
        }
        SourceSpan::new(self.source_id, self.start.min(other.start), self.end.max(other.end))
    }
}

impl std::fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// File information for a registered source buffer
#[derive(Debug)]
pub struct FileInfo {
    pub file_id: SourceId,
    pub path: PathBuf,
    pub text: String,
    /// Byte offset of the first character of every line
    pub line_starts: Vec<u32>,
}

impl FileInfo {
    fn new(file_id: SourceId, path: PathBuf, text: String) -> Self {
        let line_starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i as u32 + 1))
            .collect();
        FileInfo {
            file_id,
            path,
            text,
            line_starts,
        }
    }
}

/// Owns the text of every buffer the driver compiles and maps offsets back to lines.
#[derive(Debug, Default)]
pub struct SourceManager {
    file_infos: Vec<FileInfo>,
}

impl SourceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file to the source manager from a file path
    pub fn add_file_from_path(&mut self, path: &Path) -> Result<SourceId, std::io::Error> {
        let text = std::fs::read_to_string(path)?;
        Ok(self.add_buffer(text, path))
    }

    /// Add an in-memory buffer under the given display path
    pub fn add_buffer(&mut self, text: impl Into<String>, path: impl Into<PathBuf>) -> SourceId {
        let file_id = SourceId::from_index(self.file_infos.len());
        self.file_infos.push(FileInfo::new(file_id, path.into(), text.into()));
        file_id
    }

    pub fn get_file_info(&self, source_id: SourceId) -> Option<&FileInfo> {
        source_id.index().and_then(|i| self.file_infos.get(i))
    }

    pub fn get_text(&self, source_id: SourceId) -> Option<&str> {
        self.get_file_info(source_id).map(|f| f.text.as_str())
    }

    /// 1-based line and column of a byte offset
    pub fn get_line_column(&self, source_id: SourceId, offset: u32) -> Option<(u32, u32)> {
        let info = self.get_file_info(source_id)?;
        let line_index = info.line_starts.partition_point(|&start| start <= offset) - 1;
        let column = offset - info.line_starts[line_index] + 1;
        Some((line_index as u32 + 1, column))
    }

    /// Text of a 1-based line, without its terminator
    pub fn get_line_text(&self, source_id: SourceId, line: u32) -> Option<&str> {
        let info = self.get_file_info(source_id)?;
        let index = (line as usize).checked_sub(1)?;
        let start = *info.line_starts.get(index)? as usize;
        let end = info
            .line_starts
            .get(index + 1)
            .map(|&next| next as usize - 1)
            .unwrap_or(info.text.len());
        info.text.get(start..end).map(|l| l.trim_end_matches('\r'))
    }

    /// Text covered by a span
    pub fn get_source_text(&self, span: SourceSpan) -> &str {
        self.get_text(span.source_id)
            .and_then(|text| text.get(span.start as usize..span.end as usize))
            .unwrap_or("")
    }
}
