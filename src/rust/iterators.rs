use crate::aminoacid::AlignmentSymbol;
use crate::types::{Column, Position};

/// One step of an aligned row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignedResidue {
    /// Character offset in the aligned string
    pub offset: usize,
    pub symbol: AlignmentSymbol,
    /// Original-sequence position, for residues only
    pub position: Option<Position>,
    /// Match-state column, for match residues and deletions only
    pub column: Option<Column>,
}

/// Iterator walking an aligned row in original-sequence order.
///
/// Match residues advance both counters, insertions only the position,
/// deletions only the column; padding advances neither.
pub struct AlignedResidues<'a> {
    inner: std::iter::Enumerate<std::slice::Iter<'a, AlignmentSymbol>>,
    next_position: usize,
    next_column: usize,
}

impl<'a> AlignedResidues<'a> {
    pub fn new(symbols: &'a [AlignmentSymbol], start: usize) -> Self {
        Self { inner: symbols.iter().enumerate(), next_position: start, next_column: 1 }
    }
}

impl<'a> Iterator for AlignedResidues<'a> {
    type Item = AlignedResidue;

    fn next(&mut self) -> Option<Self::Item> {
        let (offset, &symbol) = self.inner.next()?;

        let position = if symbol.is_residue() {
            let pos = Position(self.next_position);
            self.next_position += 1;
            Some(pos)
        } else {
            None
        };

        let column = if symbol.is_match_state() {
            let col = Column(self.next_column);
            self.next_column += 1;
            Some(col)
        } else {
            None
        };

        Some(AlignedResidue { offset, symbol, position, column })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a> ExactSizeIterator for AlignedResidues<'a> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}
