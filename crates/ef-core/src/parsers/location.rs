/// Converter from byte offsets to line and column numbers
pub struct LocationConverter {
    len: usize,
    line_starts: Vec<usize>,
}

impl LocationConverter {
    pub fn new(source: &str) -> Self {
        Self {
            len: source.len(),
            line_starts: Self::calculate_line_starts(source),
        }
    }

    /// Converts byte offset to line and column number (1-based)
    pub fn byte_offset_to_location(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.len);
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx.saturating_sub(1),
        };
        let line_start = self.line_starts.get(line_idx).copied().unwrap_or(0);
        (line_idx + 1, offset - line_start + 1)
    }

    /// Byte offset where the given 1-based line starts
    pub fn line_start(&self, line: usize) -> Option<usize> {
        line.checked_sub(1)
            .and_then(|idx| self.line_starts.get(idx).copied())
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    fn calculate_line_starts(source: &str) -> Vec<usize> {
        let mut line_starts = vec![0];
        line_starts.extend(
            source
                .bytes()
                .enumerate()
                .filter(|(_, byte)| *byte == b'\n')
                .map(|(pos, _)| pos + 1),
        );
        line_starts
    }
}
