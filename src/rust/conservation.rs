//! Per-column residue agreement across an alignment.

use tracing::debug;

use crate::alignment::Alignment;
use crate::aminoacid::{residue_slot, RESIDUE_ALPHABET};
use crate::mapper::ColumnMaps;
use crate::types::{Column, ConservationScore};

/// Conservation of every match column of one alignment
#[derive(Debug, Clone)]
pub struct ColumnConservation {
    scores: Vec<ConservationScore>,
    /// Most common residue; ties go to the alphabetically first letter
    consensus: Vec<Option<char>>,
    all_gap: Vec<bool>,
}

impl ColumnConservation {
    /// Score of a column; out-of-range columns score zero
    pub fn score(&self, column: Column) -> ConservationScore {
        column
            .index()
            .and_then(|idx| self.scores.get(idx))
            .copied()
            .unwrap_or(ConservationScore::ZERO)
    }

    pub fn consensus(&self, column: Column) -> Option<char> {
        self.consensus.get(column.index()?).copied().flatten()
    }

    /// Columns where no consistent row has a residue
    pub fn is_all_gap(&self, column: Column) -> bool {
        column.index().and_then(|idx| self.all_gap.get(idx)).copied().unwrap_or(true)
    }

    pub fn all_gap_columns(&self) -> impl Iterator<Item = Column> + '_ {
        self.all_gap.iter().enumerate().filter(|&(_, &gap)| gap).map(|(idx, _)| Column(idx + 1))
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

pub struct ConservationScorer;

impl ConservationScorer {
    /// Modal residue frequency per column over every consistent row.
    ///
    /// Counts are accumulated per column, so the result does not depend on
    /// the order of rows in the alignment.
    pub fn score(alignment: &Alignment, maps: &ColumnMaps) -> ColumnConservation {
        let width = maps.column_count;
        let mut counts = vec![[0usize; RESIDUE_ALPHABET]; width];

        for (_, map) in maps.consistent() {
            for (position, column) in map.pairs() {
                let slot = map.residue_at(position).and_then(residue_slot);
                let column_counts = column.index().and_then(|i| counts.get_mut(i));
                if let (Some(slot), Some(column_counts)) = (slot, column_counts) {
                    column_counts[slot] += 1;
                }
            }
        }

        let mut scores = Vec::with_capacity(width);
        let mut consensus = Vec::with_capacity(width);
        let mut all_gap = Vec::with_capacity(width);

        for column_counts in &counts {
            let total: usize = column_counts.iter().sum();
            // max_by_key keeps the last maximum, so walk the slots in reverse
            let modal = column_counts
                .iter()
                .enumerate()
                .rev()
                .max_by_key(|&(_, &count)| count)
                .filter(|&(_, &count)| count > 0);

            scores.push(ConservationScore::from_counts(modal.map_or(0, |(_, &c)| c), total));
            consensus.push(modal.map(|(slot, _)| (b'A' + slot as u8) as char));
            all_gap.push(total == 0);
        }

        let gap_columns = all_gap.iter().filter(|&&g| g).count();
        if gap_columns > 0 {
            debug!(domain = %alignment.domain, gap_columns, "Columns with no residues score zero");
        }

        ColumnConservation { scores, consensus, all_gap }
    }
}
