#[cfg(test)]
use bstr::ByteSlice;
use serde::Serialize;

/// 1-based line and column. Columns count characters, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Position {
    pub line: u32,
    pub col: u32,
}

impl Default for Position {
    fn default() -> Self {
        Position { line: 1, col: 1 }
    }
}

#[cfg(test)]
const SPARSE_POSITION_INTERVAL: usize = 64;

/// Maps byte offsets back to line/column pairs.
///
/// `\n`, `\r\n` and a lone `\r` all count as a single line break, which is
/// the same rule the scanner applies while it reads. Tests use it to check
/// the positions the scanner tracks incrementally.
#[cfg(test)]
#[derive(Debug, Clone)]
pub(crate) struct SourceLocator {
    line_starts: Vec<usize>,
    sparse_line_index: Vec<u32>,
}

#[cfg(test)]
fn is_line_break(source: &[u8], i: usize) -> bool {
    let ch = source[i];
    ch == b'\n' || (ch == b'\r' && source.get(i + 1) != Some(&b'\n'))
}

#[cfg(test)]
impl SourceLocator {
    pub(crate) fn new(source: &[u8]) -> Self {
        let line_starts = (0..source.len())
            .filter(|&i| is_line_break(source, i))
            .map(|i| i + 1)
            .collect::<Vec<_>>();

        let mut sparse_line_index = vec![0; source.len() / SPARSE_POSITION_INTERVAL + 1];
        let mut line = 0;
        for (i, entry) in sparse_line_index.iter_mut().enumerate() {
            while line < line_starts.len() && line_starts[line] <= i * SPARSE_POSITION_INTERVAL {
                line += 1;
            }
            *entry = line as u32;
        }
        SourceLocator {
            line_starts,
            sparse_line_index,
        }
    }

    pub(crate) fn position(&self, source: &[u8], index: usize) -> Position {
        let index = index.min(source.len());
        let mut line = self.sparse_line_index[index / SPARSE_POSITION_INTERVAL];
        let mut i = index / SPARSE_POSITION_INTERVAL * SPARSE_POSITION_INTERVAL;
        while i < index {
            if is_line_break(source, i) {
                line += 1;
            }
            i += 1;
        }
        let line_beginning = if line == 0 {
            0
        } else {
            self.line_starts[line as usize - 1]
        };
        let col = source[line_beginning..index].chars().count() as u32;
        Position {
            line: line + 1,
            col: col + 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_breaks() {
        let source = b"a\r\nbc\rd\n\ne";
        let locator = SourceLocator::new(source);
        let positions = [0, 3, 4, 6, 9]
            .iter()
            .map(|&i| locator.position(source, i))
            .map(|p| (p.line, p.col))
            .collect::<Vec<_>>();
        assert_eq!(positions, vec![(1, 1), (2, 1), (2, 2), (3, 1), (5, 1)]);
    }

    #[test]
    fn test_columns_count_characters() {
        let source = "x := \"é\" y".as_bytes();
        let locator = SourceLocator::new(source);
        let y = source.len() - 1;
        assert_eq!(locator.position(source, y), Position { line: 1, col: 10 });
    }

    #[test]
    fn test_sparse_index_long_source() {
        let source = "ab\n".repeat(100);
        let locator = SourceLocator::new(source.as_bytes());
        assert_eq!(
            locator.position(source.as_bytes(), 3 * 70 + 1),
            Position { line: 71, col: 2 }
        );
    }
}
