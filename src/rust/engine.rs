//! The annotation transfer engine: one alignment in, one report per target out.
//!
//! Every (domain, alignment) unit is independent. The registry is shared
//! read-only and a failing unit never affects its siblings.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::alignment::{domain_from_filename, Alignment, Region};
use crate::config::EngineConfig;
use crate::conservation::ConservationScorer;
use crate::errors::{TransferError, TransferResult};
use crate::go_terms::{self, GoTermSet, SeedGoComparison};
use crate::mapper::AlignmentColumnMapper;
use crate::metrics::{MetricsCollector, PerformanceTimer, TransferMetrics};
use crate::registry::{AnnotationRegistry, DomainAnnotations};
use crate::report::{GoReport, Report, ReportAssembler, ReportStatus};
use crate::transfer::TransferResolver;

#[derive(Debug, Clone)]
pub enum AlignmentInput {
    Path(PathBuf),
    Text(String),
}

/// One alignment of novel hits against one domain model
#[derive(Debug, Clone)]
pub struct DomainUnit {
    pub domain: String,
    pub input: AlignmentInput,
}

impl DomainUnit {
    /// A unit for an alignment file; the domain defaults to the one in the file name
    pub fn from_path<P: AsRef<Path>>(path: P, domain: Option<&str>) -> TransferResult<Self> {
        let path = path.as_ref();
        let domain = match domain {
            Some(domain) => domain.to_string(),
            None => domain_from_filename(path).ok_or_else(|| {
                TransferError::Parse(format!("cannot derive a domain id from {}", path.display()))
            })?,
        };
        Ok(Self { domain, input: AlignmentInput::Path(path.to_path_buf()) })
    }

    pub fn from_text(domain: &str, text: impl Into<String>) -> Self {
        Self { domain: domain.to_string(), input: AlignmentInput::Text(text.into()) }
    }

    fn source(&self) -> String {
        match &self.input {
            AlignmentInput::Path(path) => path.display().to_string(),
            AlignmentInput::Text(_) => "<inline>".to_string(),
        }
    }
}

/// A unit whose alignment could not be read or parsed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedUnit {
    pub domain: String,
    pub source: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct BatchReport {
    pub reports: Vec<Report>,
    pub failed_units: Vec<FailedUnit>,
    pub metrics: TransferMetrics,
}

pub struct TransferEngine<'a> {
    registry: &'a AnnotationRegistry,
    config: &'a EngineConfig,
    target_go: HashMap<String, GoTermSet>,
    metrics: MetricsCollector,
}

impl<'a> TransferEngine<'a> {
    pub fn new(registry: &'a AnnotationRegistry, config: &'a EngineConfig) -> Self {
        Self { registry, config, target_go: HashMap::new(), metrics: MetricsCollector::new() }
    }

    /// GO terms independently derived for target sequences, keyed by sequence id
    pub fn with_target_go_terms(mut self, target_go: HashMap<String, GoTermSet>) -> Self {
        self.target_go = target_go;
        self
    }

    pub fn metrics(&self) -> TransferMetrics {
        self.metrics.get_metrics()
    }

    /// Build one report per target sequence of an alignment
    pub fn process_alignment(&self, alignment: &Alignment) -> Vec<Report> {
        let domain = alignment.domain.as_str();

        // Target ids in order of first appearance, with all their rows
        let mut targets: Vec<(&str, Vec<usize>)> = Vec::new();
        for (idx, row) in alignment.targets() {
            match targets.iter_mut().find(|(id, _)| *id == row.sequence_id) {
                Some((_, rows)) => rows.push(idx),
                None => targets.push((row.sequence_id.as_str(), vec![idx])),
            }
        }
        if targets.is_empty() {
            warn!(domain, marker = %self.config.target_marker, "Alignment has no target rows");
            return Vec::new();
        }

        let (annotations, status) = match self.registry.load(domain) {
            Ok(annotations) => (annotations, ReportStatus::Complete),
            Err(e) if e.is_degrading() => {
                warn!(domain, error = %e, "Transferring without curated annotations");
                (Arc::new(DomainAnnotations::empty(domain)), ReportStatus::Degraded {
                    reason: e.to_string(),
                })
            }
            Err(e) => {
                error!(domain, error = %e, "Curated annotations unusable");
                return targets
                    .iter()
                    .map(|(target, rows)| {
                        let regions = target_regions(alignment, rows);
                        self.record(ReportAssembler::failed(domain, target, regions, e.to_string()))
                    })
                    .collect();
            }
        };

        let maps = AlignmentColumnMapper::map(alignment);
        let conservation = ConservationScorer::score(alignment, &maps);
        let resolver = TransferResolver::new(alignment, &maps, &conservation, self.config);
        let mut transfers = resolver.resolve(&annotations);

        let domain_go = annotations.domain_go_terms();

        targets
            .iter()
            .map(|(target, rows)| {
                if let Some(err) = rows.iter().find_map(|&i| maps.error(i)) {
                    error!(
                        domain,
                        sequence = %target,
                        error = %err,
                        "Target row is inconsistent with the alignment"
                    );
                    return self.record(ReportAssembler::failed(
                        domain,
                        target,
                        target_regions(alignment, rows),
                        err.to_string(),
                    ));
                }

                let (own, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut transfers)
                    .into_iter()
                    .partition(|t| rows.contains(&t.row_index));
                transfers = rest;

                let go = self.target_go.get(*target).map(|target_terms| GoReport {
                    domain: go_terms::compare(&domain_go, target_terms),
                    per_seed: annotations
                        .seed_go_terms()
                        .iter()
                        .map(|(seed, seed_terms)| SeedGoComparison {
                            seed: seed.clone(),
                            comparison: go_terms::compare(seed_terms, target_terms),
                        })
                        .collect(),
                });

                self.record(ReportAssembler::assemble(
                    domain,
                    target,
                    own,
                    &annotations.domain_level,
                    go,
                    status.clone(),
                ))
            })
            .collect()
    }

    fn record(&self, report: Report) -> Report {
        self.metrics.record_report(
            report.coverage.transferred as u64,
            report.coverage.gap as u64,
            report.coverage.unmapped as u64,
        );
        report
    }

    /// Parse and process one unit; a unit that cannot be parsed is returned as failed
    pub fn process_unit(&self, unit: &DomainUnit) -> Result<Vec<Report>, FailedUnit> {
        let timer = PerformanceTimer::start(&format!("transfer {}", unit.domain));
        self.metrics.record_unit();

        let marker = self.config.target_marker.as_str();
        let parsed = match &unit.input {
            AlignmentInput::Path(path) => Alignment::from_path(path, Some(&unit.domain), marker),
            AlignmentInput::Text(text) => Alignment::parse(&unit.domain, text, marker),
        };

        let alignment = match parsed {
            Ok(alignment) => alignment,
            Err(e) => {
                self.metrics.record_failed_unit();
                error!(domain = %unit.domain, source = %unit.source(), error = %e, "Failed to read alignment");
                return Err(FailedUnit {
                    domain: unit.domain.clone(),
                    source: unit.source(),
                    reason: e.to_string(),
                });
            }
        };

        let reports = self.process_alignment(&alignment);
        let failed = reports.iter().filter(|r| r.is_failed()).count();
        info!(
            domain = %unit.domain,
            targets = reports.len(),
            failed,
            transferred = reports.iter().map(|r| r.coverage.transferred).sum::<usize>(),
            "Processed alignment"
        );
        timer.finish_and_log();
        Ok(reports)
    }

    /// Process many units in parallel on a pool sized by the configuration
    pub fn process_batch(&self, units: &[DomainUnit]) -> TransferResult<BatchReport> {
        let threads = self.config.effective_thread_count();
        let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build().map_err(|e| {
            TransferError::ConfigurationError {
                field: "num_threads".to_string(),
                message: e.to_string(),
            }
        })?;
        debug!(units = units.len(), threads, "Starting batch");

        let results: Vec<Result<Vec<Report>, FailedUnit>> =
            pool.install(|| units.par_iter().map(|unit| self.process_unit(unit)).collect());

        let mut reports = Vec::new();
        let mut failed_units = Vec::new();
        for result in results {
            match result {
                Ok(unit_reports) => reports.extend(unit_reports),
                Err(failed) => failed_units.push(failed),
            }
        }
        reports.sort_by(|a, b| (&a.target, &a.domain).cmp(&(&b.target, &b.domain)));

        Ok(BatchReport { reports, failed_units, metrics: self.metrics() })
    }
}

fn target_regions(alignment: &Alignment, rows: &[usize]) -> Vec<Region> {
    let mut regions: Vec<Region> = rows.iter().map(|&i| alignment.rows[i].region).collect();
    regions.sort();
    regions
}
