use crate::types::Position;

#[derive(Debug, Clone, PartialEq)]
struct MappedFile {
    name: String,
    base: usize,
    size: usize,
    /// Global offsets at which each line starts.
    line_starts: Vec<usize>,
}

/// Assigns every file a disjoint range of global byte offsets and converts
/// offsets back into `(file, line, column)`.
///
/// Bases start at 1 and leave a one-byte gap between files, so offset 0 never
/// belongs to a file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceMap {
    files: Vec<MappedFile>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a file and returns its base offset.
    pub fn add_file(&mut self, name: &str, source: &str) -> usize {
        let base = self
            .files
            .last()
            .map(|f| f.base + f.size + 1)
            .unwrap_or(1);
        let mut line_starts = vec![base];
        line_starts.extend(
            source
                .bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| base + i + 1),
        );
        self.files.push(MappedFile {
            name: name.to_string(),
            base,
            size: source.len(),
            line_starts,
        });
        base
    }

    /// Base offset previously assigned to `name`.
    pub fn base_of(&self, name: &str) -> Option<usize> {
        self.files.iter().find(|f| f.name == name).map(|f| f.base)
    }

    /// Name of the file that contains `offset`.
    pub fn file_name(&self, offset: usize) -> Option<&str> {
        self.find(offset).map(|f| f.name.as_str())
    }

    pub fn position(&self, offset: usize) -> Option<Position> {
        let file = self.find(offset)?;
        let line_index = file.line_starts.partition_point(|start| *start <= offset) - 1;
        let line_start = file.line_starts[line_index];
        Some(Position {
            file: file.name.clone(),
            line: line_index as u32 + 1,
            column: (offset - line_start) as u32 + 1,
        })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn find(&self, offset: usize) -> Option<&MappedFile> {
        let idx = self.files.partition_point(|f| f.base <= offset);
        let file = self.files.get(idx.checked_sub(1)?)?;
        if offset <= file.base + file.size {
            Some(file)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bases_are_disjoint_and_start_at_one() {
        let mut map = SourceMap::new();
        let a = map.add_file("a.go", "package a\n");
        let b = map.add_file("b.go", "package b\n");
        assert_eq!(a, 1);
        assert_eq!(b, 1 + 10 + 1);
        assert_eq!(map.base_of("b.go"), Some(b));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn position_reports_line_and_column() {
        let mut map = SourceMap::new();
        map.add_file("a.go", "package a\n\nfunc f() {}\n");
        let base = map.add_file("b.go", "package b\nfunc g() {\n\tf()\n}\n");

        let call_offset = base + "package b\nfunc g() {\n\t".len();
        let pos = map.position(call_offset).unwrap();
        assert_eq!(pos.file, "b.go");
        assert_eq!(pos.line, 3);
        assert_eq!(pos.column, 2);
        assert_eq!(pos.to_string(), "b.go:3");
    }

    #[test]
    fn offset_zero_and_gaps_are_unmapped() {
        let mut map = SourceMap::new();
        map.add_file("a.go", "ab");
        assert!(map.position(0).is_none());
        assert!(map.position(100).is_none());
        assert_eq!(map.file_name(1), Some("a.go"));
    }
}
