//! Per (domain, target) curation report.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::alignment::Region;
use crate::engine::FailedUnit;
use crate::errors::{TransferResult, TransferResultExt};
use crate::go_terms::{GoTermComparison, SeedGoComparison};
use crate::registry::DomainAnnotation;
use crate::transfer::{TargetTransfers, TransferStatus, TransferredAnnotation};
use crate::types::Position;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ReportStatus {
    Complete,
    /// Built, but without curated data for the domain
    Degraded { reason: String },
    /// Nothing could be transferred for this pair
    Failed { reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coverage {
    pub transferred: usize,
    pub gap: usize,
    pub unmapped: usize,
    pub filtered_by_evidence: usize,
    pub outside_range: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictingValue {
    pub seed: String,
    pub seed_position: Position,
    pub value: Option<String>,
}

/// Different curated values of one kind landing on the same target residue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub target_position: Position,
    pub kind: String,
    pub values: Vec<ConflictingValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoReport {
    /// Union of all seed GO terms against the target's terms
    pub domain: GoTermComparison,
    pub per_seed: Vec<SeedGoComparison>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub domain: String,
    pub target: String,
    /// Aligned ranges of the target in this domain's alignment
    pub regions: Vec<Region>,
    pub status: ReportStatus,
    pub positional: Vec<TransferredAnnotation>,
    pub domain_annotations: Vec<DomainAnnotation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub go: Option<GoReport>,
    pub conflicts: Vec<Conflict>,
    pub coverage: Coverage,
}

impl Report {
    pub fn is_failed(&self) -> bool {
        matches!(self.status, ReportStatus::Failed { .. })
    }

    /// Transferred entries landing on a target position
    pub fn at(&self, position: Position) -> impl Iterator<Item = &TransferredAnnotation> + '_ {
        self.positional.iter().filter(move |e| e.target_position() == Some(position))
    }
}

pub struct ReportAssembler;

impl ReportAssembler {
    /// Compose the outcomes of every aligned region of one target
    pub fn assemble(
        domain: &str,
        target: &str,
        transfers: Vec<TargetTransfers>,
        domain_annotations: &[DomainAnnotation],
        go: Option<GoReport>,
        status: ReportStatus,
    ) -> Report {
        let mut coverage = transfers
            .first()
            .map(|t| Coverage {
                filtered_by_evidence: t.excluded_by_evidence,
                outside_range: t.outside_range,
                ..Default::default()
            })
            .unwrap_or_default();

        let mut regions = Vec::with_capacity(transfers.len());
        let mut positional = Vec::new();
        for t in transfers {
            regions.push(t.region);
            positional.extend(t.entries);
        }
        regions.sort();

        for entry in &positional {
            match entry.status {
                TransferStatus::Transferred { .. } => coverage.transferred += 1,
                TransferStatus::Gap { .. } => coverage.gap += 1,
                TransferStatus::Unmapped { .. } => coverage.unmapped += 1,
            }
        }

        // Transferred entries by target position; gaps and unmapped after, by seed
        positional.sort_by(|a, b| {
            let key = |e: &TransferredAnnotation| {
                (
                    e.target_position().is_none(),
                    e.target_position(),
                    e.provenance.seed.clone(),
                    e.provenance.seed_position,
                    e.kind.clone(),
                    e.target_region,
                )
            };
            key(a).cmp(&key(b))
        });

        let conflicts = find_conflicts(&positional);
        debug!(
            domain,
            sequence = target,
            transferred = coverage.transferred,
            gap = coverage.gap,
            unmapped = coverage.unmapped,
            conflicts = conflicts.len(),
            "Assembled report"
        );

        Report {
            domain: domain.to_string(),
            target: target.to_string(),
            regions,
            status,
            positional,
            domain_annotations: domain_annotations.to_vec(),
            go,
            conflicts,
            coverage,
        }
    }

    /// A report standing in for a pair whose transfer failed
    pub fn failed(domain: &str, target: &str, regions: Vec<Region>, reason: String) -> Report {
        Report {
            domain: domain.to_string(),
            target: target.to_string(),
            regions,
            status: ReportStatus::Failed { reason },
            positional: Vec::new(),
            domain_annotations: Vec::new(),
            go: None,
            conflicts: Vec::new(),
            coverage: Coverage::default(),
        }
    }
}

/// Same kind, different values, from more than one seed at one target position
fn find_conflicts(entries: &[TransferredAnnotation]) -> Vec<Conflict> {
    let mut groups: BTreeMap<(Position, &str), Vec<&TransferredAnnotation>> = BTreeMap::new();
    for entry in entries {
        if let Some(position) = entry.target_position() {
            groups.entry((position, entry.kind.as_str())).or_default().push(entry);
        }
    }

    groups
        .into_iter()
        .filter(|(_, group)| {
            let values: BTreeSet<_> = group.iter().map(|e| &e.value).collect();
            let seeds: BTreeSet<_> = group.iter().map(|e| &e.provenance.seed).collect();
            values.len() > 1 && seeds.len() > 1
        })
        .map(|((target_position, kind), group)| Conflict {
            target_position,
            kind: kind.to_string(),
            values: group
                .into_iter()
                .map(|e| ConflictingValue {
                    seed: e.provenance.seed.clone(),
                    seed_position: e.provenance.seed_position,
                    value: e.value.clone(),
                })
                .collect(),
        })
        .collect()
}

pub const FAILED_UNITS_FILE: &str = "failed_units.json";

/// `<output_dir>/<target, '|' replaced by '-'>/<DOMAIN>_report.json`
pub fn report_path(output_dir: &Path, domain: &str, target: &str) -> PathBuf {
    output_dir.join(target.replace('|', "-")).join(format!("{}_report.json", domain))
}

/// Write one report as pretty JSON, creating its directory
pub fn write_report(report: &Report, output_dir: &Path) -> TransferResult<PathBuf> {
    let path = report_path(output_dir, &report.domain, &report.target);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("cannot create {}", parent.display()))?;
    }

    let file = File::create(&path).with_context(|| format!("cannot create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer.write_all(b"\n")?;
    writer.flush()?;

    debug!(path = %path.display(), "Wrote report");
    Ok(path)
}

/// Write the units skipped by a batch to `<output_dir>/failed_units.json`.
/// An empty list is written too, so a finished run always leaves the file.
pub fn write_failed_units(failed: &[FailedUnit], output_dir: &Path) -> TransferResult<PathBuf> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("cannot create {}", output_dir.display()))?;
    let path = output_dir.join(FAILED_UNITS_FILE);

    let file = File::create(&path).with_context(|| format!("cannot create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, failed)?;
    writer.write_all(b"\n")?;
    writer.flush()?;

    debug!(path = %path.display(), failed = failed.len(), "Wrote failed units");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::{Provenance, UnmappedReason};
    use crate::types::{Column, Confidence, ConservationScore};
    use tempfile::TempDir;

    fn entry(seed: &str, seed_position: usize, value: &str, status: TransferStatus) -> TransferredAnnotation {
        TransferredAnnotation {
            domain: "PF00001".to_string(),
            target: "sp|Q9NU22|MDN1_HUMAN".to_string(),
            target_region: Region { start: 1, end: 10 },
            kind: "BINDING".to_string(),
            value: Some(value.to_string()),
            provenance: Provenance {
                seed: seed.to_string(),
                seed_region: Some(Region { start: 1, end: 10 }),
                seed_position: Position(seed_position),
                accession: None,
                evidence: Vec::new(),
            },
            extra: BTreeMap::new(),
            status,
        }
    }

    fn transferred(position: usize) -> TransferStatus {
        TransferStatus::Transferred {
            target_position: Position(position),
            column: Column(position),
            conservation: ConservationScore::from_counts(1, 1),
            confidence: Confidence::High,
            seed_residue: Some('K'),
            target_residue: Some('K'),
            residue_match: true,
            paired: None,
        }
    }

    fn transfers(entries: Vec<TransferredAnnotation>) -> TargetTransfers {
        TargetTransfers {
            row_index: 1,
            target: "sp|Q9NU22|MDN1_HUMAN".to_string(),
            region: Region { start: 1, end: 10 },
            entries,
            excluded_by_evidence: 2,
            outside_range: 1,
        }
    }

    #[test]
    fn test_assemble_orders_and_counts() {
        let entries = vec![
            entry("B", 3, "ATP", TransferStatus::Gap { column: Column(4) }),
            entry("A", 9, "ATP", transferred(7)),
            entry("A", 1, "ATP", TransferStatus::Unmapped { reason: UnmappedReason::Insertion }),
            entry("A", 4, "ATP", transferred(2)),
        ];
        let report = ReportAssembler::assemble(
            "PF00001",
            "sp|Q9NU22|MDN1_HUMAN",
            vec![transfers(entries)],
            &[],
            None,
            ReportStatus::Complete,
        );

        let positions: Vec<_> = report.positional.iter().map(|e| e.target_position()).collect();
        assert_eq!(positions, vec![Some(Position(2)), Some(Position(7)), None, None]);
        assert_eq!(report.positional[2].provenance.seed, "A");
        assert_eq!(report.positional[3].provenance.seed, "B");
        assert_eq!(report.coverage, Coverage {
            transferred: 2,
            gap: 1,
            unmapped: 1,
            filtered_by_evidence: 2,
            outside_range: 1,
        });
        assert!(report.conflicts.is_empty());
        assert_eq!(report.at(Position(7)).count(), 1);
    }

    #[test]
    fn test_conflicts_surface_without_merging() {
        let entries = vec![
            entry("A", 4, "ATP", transferred(5)),
            entry("B", 6, "GTP", transferred(5)),
            entry("C", 6, "ATP", transferred(6)),
            entry("C", 6, "ADP", transferred(6)),
        ];
        let report = ReportAssembler::assemble(
            "PF00001",
            "T",
            vec![transfers(entries)],
            &[],
            None,
            ReportStatus::Complete,
        );

        assert_eq!(report.positional.len(), 4);
        // Differing values from a single seed are not a conflict
        assert_eq!(report.conflicts.len(), 1);
        let conflict = &report.conflicts[0];
        assert_eq!(conflict.target_position, Position(5));
        assert_eq!(conflict.values.len(), 2);
    }

    #[test]
    fn test_write_report_path() -> TransferResult<()> {
        let dir = TempDir::new()?;
        let report = ReportAssembler::failed(
            "PF07728",
            "sp|Q9NU22|MDN1_HUMAN",
            vec![Region { start: 325, end: 451 }],
            "bad alignment".to_string(),
        );
        assert!(report.is_failed());

        let path = write_report(&report, dir.path())?;
        assert_eq!(path, dir.path().join("sp-Q9NU22-MDN1_HUMAN").join("PF07728_report.json"));

        let written: Report = serde_json::from_str(&fs::read_to_string(&path)?)?;
        assert_eq!(written, report);
        Ok(())
    }

    #[test]
    fn test_write_failed_units() -> TransferResult<()> {
        let dir = TempDir::new()?;
        let failed = vec![FailedUnit {
            domain: "PF07728".to_string(),
            source: "PF07728_hmmalign.sth".to_string(),
            reason: "row has 2 fields".to_string(),
        }];

        let path = write_failed_units(&failed, dir.path())?;
        assert_eq!(path, dir.path().join(FAILED_UNITS_FILE));
        let written: Vec<FailedUnit> = serde_json::from_str(&fs::read_to_string(&path)?)?;
        assert_eq!(written, failed);

        write_failed_units(&[], dir.path())?;
        assert_eq!(fs::read_to_string(&path)?.trim(), "[]");
        Ok(())
    }
}
