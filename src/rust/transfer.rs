//! Resolution of curated seed annotations onto novel sequences through the
//! shared match-column coordinate space.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::alignment::{Alignment, Region};
use crate::config::EngineConfig;
use crate::conservation::ColumnConservation;
use crate::mapper::{ColumnMap, ColumnMaps, PositionMapping};
use crate::registry::{DomainAnnotations, Evidence, PositionalAnnotation};
use crate::types::{Column, Confidence, ConservationScore, Position};

/// Where a transferred annotation came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub seed: String,
    /// Aligned range of the seed row used; absent when the seed is not in the alignment
    pub seed_region: Option<Region>,
    pub seed_position: Position,
    pub accession: Option<String>,
    /// Evidence surviving the configured filter
    pub evidence: Vec<Evidence>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairedTransfer {
    pub seed_position: Position,
    /// `None` when the partner does not land on a target residue
    pub target_position: Option<Position>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmappedReason {
    /// The seed position sits in an insert state
    Insertion,
    /// The seed is not part of this alignment
    SequenceAbsent,
    /// The seed row disagrees with the alignment's match-column count
    InconsistentSeedRow,
    /// The position lies outside every aligned range of the seed
    OutsideAlignedRange,
}

/// Outcome of one annotation for one target row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TransferStatus {
    Transferred {
        target_position: Position,
        column: Column,
        conservation: ConservationScore,
        confidence: Confidence,
        seed_residue: Option<char>,
        target_residue: Option<char>,
        residue_match: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        paired: Option<PairedTransfer>,
    },
    /// The target has a deletion at the seed's column
    Gap { column: Column },
    Unmapped { reason: UnmappedReason },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferredAnnotation {
    pub domain: String,
    pub target: String,
    pub target_region: Region,
    pub kind: String,
    pub value: Option<String>,
    pub provenance: Provenance,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
    #[serde(flatten)]
    pub status: TransferStatus,
}

impl TransferredAnnotation {
    pub fn target_position(&self) -> Option<Position> {
        match self.status {
            TransferStatus::Transferred { target_position, .. } => Some(target_position),
            _ => None,
        }
    }

    pub fn is_transferred(&self) -> bool {
        matches!(self.status, TransferStatus::Transferred { .. })
    }
}

/// Every outcome for one target row
#[derive(Debug, Clone)]
pub struct TargetTransfers {
    pub row_index: usize,
    pub target: String,
    pub region: Region,
    pub entries: Vec<TransferredAnnotation>,
    /// Annotations dropped because no accepted evidence remained
    pub excluded_by_evidence: usize,
    /// Entries unmapped because their position lies outside every aligned range of their seed
    pub outside_range: usize,
}

/// Where a seed annotation lands in the alignment
#[derive(Debug, Clone, Copy)]
enum SeedLocation {
    Column { row: usize, column: Column },
    Unmapped { row: Option<usize>, reason: UnmappedReason },
}

struct Located<'a> {
    annotation: &'a PositionalAnnotation,
    evidence: Vec<Evidence>,
    location: SeedLocation,
}

/// Resolves seed annotations onto every consistent target row of one alignment
pub struct TransferResolver<'a> {
    alignment: &'a Alignment,
    maps: &'a ColumnMaps,
    conservation: &'a ColumnConservation,
    config: &'a EngineConfig,
    seed_rows: HashMap<&'a str, Vec<usize>>,
}

impl<'a> TransferResolver<'a> {
    pub fn new(
        alignment: &'a Alignment,
        maps: &'a ColumnMaps,
        conservation: &'a ColumnConservation,
        config: &'a EngineConfig,
    ) -> Self {
        let mut seed_rows: HashMap<&'a str, Vec<usize>> = HashMap::new();
        for (idx, row) in alignment.seeds() {
            seed_rows.entry(row.sequence_id.as_str()).or_default().push(idx);
        }
        Self { alignment, maps, conservation, config, seed_rows }
    }

    /// Resolve every curated positional annotation onto every consistent target row
    pub fn resolve(&self, annotations: &DomainAnnotations) -> Vec<TargetTransfers> {
        let mut excluded_by_evidence = 0;
        let mut outside_range = 0;
        let mut located = Vec::new();

        for annotation in annotations.positional() {
            let evidence: Vec<Evidence> = annotation
                .evidence
                .iter()
                .filter(|e| self.config.accepts_eco_code(&e.code))
                .cloned()
                .collect();
            if evidence.is_empty() && self.config.require_evidence {
                debug!(
                    seed = %annotation.seed,
                    position = %annotation.position,
                    kind = %annotation.kind,
                    "No accepted evidence, annotation excluded"
                );
                excluded_by_evidence += 1;
                continue;
            }

            let location = self.locate(annotation);
            if matches!(
                location,
                SeedLocation::Unmapped { reason: UnmappedReason::OutsideAlignedRange, .. }
            ) {
                outside_range += 1;
            }
            located.push(Located { annotation, evidence, location });
        }

        self.alignment
            .targets()
            .filter_map(|(idx, row)| self.maps.get(idx).map(|map| (idx, row, map)))
            .map(|(idx, row, target_map)| {
                let entries = located
                    .iter()
                    .map(|l| self.resolve_one(l, &row.sequence_id, row.region, target_map))
                    .collect();
                TargetTransfers {
                    row_index: idx,
                    target: row.sequence_id.clone(),
                    region: row.region,
                    entries,
                    excluded_by_evidence,
                    outside_range,
                }
            })
            .collect()
    }

    fn locate(&self, annotation: &PositionalAnnotation) -> SeedLocation {
        let Some(rows) = self.seed_rows.get(annotation.seed.as_str()) else {
            return SeedLocation::Unmapped { row: None, reason: UnmappedReason::SequenceAbsent };
        };

        for &row in rows {
            match self.maps.get(row) {
                Some(map) => match map.mapping(annotation.position) {
                    Some(PositionMapping::Column(column)) => {
                        return SeedLocation::Column { row, column }
                    }
                    Some(PositionMapping::Insertion) => {
                        return SeedLocation::Unmapped {
                            row: Some(row),
                            reason: UnmappedReason::Insertion,
                        }
                    }
                    None => continue,
                },
                None if self.alignment.rows[row].region.contains(annotation.position) => {
                    return SeedLocation::Unmapped {
                        row: Some(row),
                        reason: UnmappedReason::InconsistentSeedRow,
                    }
                }
                None => continue,
            }
        }

        debug!(
            seed = %annotation.seed,
            position = %annotation.position,
            "Annotation lies outside every aligned range of its seed"
        );
        SeedLocation::Unmapped { row: None, reason: UnmappedReason::OutsideAlignedRange }
    }

    fn resolve_one(
        &self,
        located: &Located<'_>,
        target: &str,
        target_region: Region,
        target_map: &ColumnMap,
    ) -> TransferredAnnotation {
        let annotation = located.annotation;

        let (seed_row, status) = match located.location {
            SeedLocation::Column { row, column } => {
                let status = match (self.maps.get(row), target_map.position_at(column)) {
                    (Some(seed_map), Some(target_position)) => {
                        self.transferred(annotation, seed_map, target_map, column, target_position)
                    }
                    _ => {
                        debug!(sequence = target, seed = %annotation.seed, column = %column, "Target has a gap");
                        TransferStatus::Gap { column }
                    }
                };
                (Some(row), status)
            }
            SeedLocation::Unmapped { row, reason } => {
                debug!(
                    sequence = target,
                    seed = %annotation.seed,
                    position = %annotation.position,
                    ?reason,
                    "Annotation unmapped"
                );
                (row, TransferStatus::Unmapped { reason })
            }
        };

        TransferredAnnotation {
            domain: annotation.domain.clone(),
            target: target.to_string(),
            target_region,
            kind: annotation.kind.clone(),
            value: annotation.value.clone(),
            provenance: Provenance {
                seed: annotation.seed.clone(),
                seed_region: seed_row.map(|r| self.alignment.rows[r].region),
                seed_position: annotation.position,
                accession: annotation.accession.clone(),
                evidence: located.evidence.clone(),
            },
            extra: annotation.extra.clone(),
            status,
        }
    }

    fn transferred(
        &self,
        annotation: &PositionalAnnotation,
        seed_map: &ColumnMap,
        target_map: &ColumnMap,
        column: Column,
        target_position: Position,
    ) -> TransferStatus {
        let conservation = self.conservation.score(column);
        let seed_residue = seed_map.residue_at(annotation.position);
        let target_residue = target_map.residue_at(target_position);

        let paired = annotation
            .paired_position
            .filter(|_| self.config.is_paired_kind(&annotation.kind))
            .map(|seed_position| PairedTransfer {
                seed_position,
                target_position: seed_map
                    .column_of(seed_position)
                    .and_then(|c| target_map.position_at(c)),
            });

        TransferStatus::Transferred {
            target_position,
            column,
            conservation,
            confidence: Confidence::from_score(conservation, self.config.confidence_threshold),
            seed_residue,
            target_residue,
            residue_match: seed_residue.is_some() && seed_residue == target_residue,
            paired,
        }
    }
}
