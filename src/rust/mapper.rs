//! Correspondence between original residue positions and match-state columns.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::alignment::{AlignedRow, Alignment};
use crate::errors::TransferError;
use crate::types::{Column, Position};

/// Where an in-range residue of a row landed in the alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionMapping {
    Column(Column),
    /// Insert-state residue: no cross-sequence correspondence
    Insertion,
}

/// Bidirectional position <-> column map for one row, restricted to match columns
#[derive(Debug, Clone)]
pub struct ColumnMap {
    /// Original position of the first residue
    start: usize,
    /// Indexed by position - start
    positions: Vec<PositionMapping>,
    residues: Vec<char>,
    /// Indexed by column - 1
    columns: Vec<Option<Position>>,
}

impl ColumnMap {
    /// Build the map for one row
    pub fn from_row(row: &AlignedRow) -> Self {
        let mut positions = Vec::new();
        let mut residues = Vec::new();
        let mut columns = Vec::new();

        for step in row.residues() {
            if let Some(column) = step.column {
                columns.push(step.position);
                debug_assert_eq!(columns.len(), column.get());
            }
            if let (Some(_), Some(residue)) = (step.position, step.symbol.residue()) {
                residues.push(residue);
                positions.push(match step.column {
                    Some(column) => PositionMapping::Column(column),
                    None => PositionMapping::Insertion,
                });
            }
        }

        Self { start: row.region.start, positions, residues, columns }
    }

    /// Mapping of an original position; `None` when it lies outside this row
    pub fn mapping(&self, position: Position) -> Option<PositionMapping> {
        let offset = position.get().checked_sub(self.start)?;
        self.positions.get(offset).copied()
    }

    /// Column of an original position, if it is a match-state residue
    pub fn column_of(&self, position: Position) -> Option<Column> {
        match self.mapping(position)? {
            PositionMapping::Column(column) => Some(column),
            PositionMapping::Insertion => None,
        }
    }

    /// Residue at a match column; `None` for a deletion or an out-of-range column
    pub fn position_at(&self, column: Column) -> Option<Position> {
        self.columns.get(column.index()?).copied().flatten()
    }

    pub fn residue_at(&self, position: Position) -> Option<char> {
        let offset = position.get().checked_sub(self.start)?;
        self.residues.get(offset).copied()
    }

    pub fn contains(&self, position: Position) -> bool {
        self.mapping(position).is_some()
    }

    /// Number of match columns the row spans
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Number of positions mapped onto match columns
    pub fn mapped_count(&self) -> usize {
        self.columns.iter().filter(|p| p.is_some()).count()
    }

    /// Insert-state positions, which can neither carry nor receive an annotation
    pub fn insertions(&self) -> impl Iterator<Item = Position> + '_ {
        self.positions.iter().enumerate().filter_map(move |(offset, m)| match m {
            PositionMapping::Insertion => Some(Position(self.start + offset)),
            PositionMapping::Column(_) => None,
        })
    }

    /// (position, column) pairs in ascending order of both
    pub fn pairs(&self) -> impl Iterator<Item = (Position, Column)> + '_ {
        self.columns
            .iter()
            .enumerate()
            .filter_map(|(idx, p)| p.map(|position| (position, Column(idx + 1))))
    }
}

/// Column maps for every row of one alignment
#[derive(Debug)]
pub struct ColumnMaps {
    pub domain: String,
    /// Match-column count every consistent row agrees on
    pub column_count: usize,
    /// Parallel to `Alignment::rows`
    rows: Vec<Result<ColumnMap, TransferError>>,
}

impl ColumnMaps {
    pub fn get(&self, row_index: usize) -> Option<&ColumnMap> {
        self.rows.get(row_index).and_then(|r| r.as_ref().ok())
    }

    /// The inconsistency recorded for a row, if any
    pub fn error(&self, row_index: usize) -> Option<&TransferError> {
        self.rows.get(row_index).and_then(|r| r.as_ref().err())
    }

    pub fn is_consistent(&self, row_index: usize) -> bool {
        self.get(row_index).is_some()
    }

    /// Maps of every consistent row
    pub fn consistent(&self) -> impl Iterator<Item = (usize, &ColumnMap)> + '_ {
        self.rows.iter().enumerate().filter_map(|(idx, r)| r.as_ref().ok().map(|m| (idx, m)))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

pub struct AlignmentColumnMapper;

impl AlignmentColumnMapper {
    /// Build column maps for every row. Rows whose match-column count
    /// disagrees with the reference are kept as `AlignmentInconsistency`.
    pub fn map(alignment: &Alignment) -> ColumnMaps {
        let column_count = Self::reference_count(alignment);

        let rows = alignment
            .rows
            .iter()
            .map(|row| {
                let found = row.match_column_count();
                if found != column_count {
                    warn!(
                        domain = %alignment.domain,
                        row = %row.name,
                        expected = column_count,
                        found,
                        "Match-column count disagrees with the alignment"
                    );
                    return Err(TransferError::AlignmentInconsistency {
                        domain: alignment.domain.clone(),
                        sequence: row.sequence_id.clone(),
                        message: format!(
                            "row {} has {} match columns, expected {}",
                            row.name, found, column_count
                        ),
                    });
                }

                let map = ColumnMap::from_row(row);
                let insertions = map.insertions().count();
                if insertions > 0 {
                    debug!(row = %row.name, insertions, "Insert-state residues left unmapped");
                }
                Ok(map)
            })
            .collect();

        ColumnMaps { domain: alignment.domain.clone(), column_count, rows }
    }

    /// The RF line wins; otherwise the most common count among seed rows,
    /// falling back to all rows. Ties go to the larger count.
    fn reference_count(alignment: &Alignment) -> usize {
        if let Some(count) = alignment.reference_column_count() {
            return count;
        }

        modal_count(alignment.rows.iter().filter(|r| !r.is_target()))
            .or_else(|| modal_count(alignment.rows.iter()))
            .unwrap_or(0)
    }
}

fn modal_count<'a>(rows: impl Iterator<Item = &'a AlignedRow>) -> Option<usize> {
    let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
    for row in rows {
        *counts.entry(row.match_column_count()).or_insert(0) += 1;
    }
    counts.into_iter().max_by_key(|&(count, freq)| (freq, count)).map(|(count, _)| count)
}
