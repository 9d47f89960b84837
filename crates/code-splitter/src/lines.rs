use std::ops::Range;

/// Byte offsets of line starts, for slicing whole lines out of a source text
#[derive(Debug, Clone)]
pub(crate) struct LineIndex<'a> {
    source: &'a str,
    starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub(crate) fn new(source: &'a str) -> Self {
        let mut starts = Vec::new();
        if !source.is_empty() {
            starts.push(0);
        }
        starts.extend(
            source
                .match_indices('\n')
                .map(|(offset, _)| offset + 1)
                .filter(|&start| start < source.len()),
        );
        Self { source, starts }
    }

    /// Number of lines; a trailing newline does not open a new line
    pub(crate) fn line_count(&self) -> usize {
        self.starts.len()
    }

    /// Byte range of a 1-based line, without its newline
    pub(crate) fn line_range(&self, line: usize) -> Range<usize> {
        let Some(&start) = line.checked_sub(1).and_then(|ix| self.starts.get(ix)) else {
            return self.source.len()..self.source.len();
        };
        let end = match self.starts.get(line) {
            Some(&next) => next - 1,
            None => self.source.len() - usize::from(self.source.ends_with('\n')),
        };
        start..end
    }

    pub(crate) fn line(&self, line: usize) -> &'a str {
        self.source.get(self.line_range(line)).unwrap_or("")
    }

    pub(crate) fn is_blank(&self, line: usize) -> bool {
        self.line(line).trim().is_empty()
    }

    /// Byte range and text of lines `start..=end`
    pub(crate) fn slice(&self, start: usize, end: usize) -> (Range<usize>, &'a str) {
        let range = self.line_range(start).start..self.line_range(end).end;
        let text = self.source.get(range.clone()).unwrap_or("");
        (range, text)
    }
}
