use super::test_fixtures::*;
use crate::alignment::{Alignment, Region};
use crate::config::{EngineConfig, EngineConfigBuilder};
use crate::engine::TransferEngine;
use crate::go_terms::read_iprscan;
use crate::report::{Report, ReportStatus};
use crate::transfer::TransferStatus;
use crate::types::{Confidence, Position};

fn run(config: &EngineConfig) -> Vec<Report> {
    let registry = pf07728_registry();
    let target_go = read_iprscan(IPRSCAN_TSV.as_bytes()).unwrap();
    let engine = TransferEngine::new(&registry, config).with_target_go_terms(target_go);
    let alignment = Alignment::parse("PF07728", PF07728_ALIGNMENT, "target/").unwrap();
    engine.process_alignment(&alignment)
}

fn report<'a>(reports: &'a [Report], target: &str) -> &'a Report {
    reports.iter().find(|r| r.target == target).unwrap()
}

#[test]
fn test_fixture_annotations_load() {
    let annotations = pf07728_annotations();
    assert_eq!(annotations.positional_count(), 6);
    assert_eq!(annotations.seeds().collect::<Vec<_>>(), vec!["CBXX_TOBAC", "MCRB_ECOLI"]);
    assert_eq!(annotations.seed_go_terms().len(), 1);
    assert_eq!(annotations.domain_go_terms().len(), 2);
    assert_eq!(annotations.domain_level.len(), 2);

    let binding = &annotations.at("MCRB_ECOLI", Position(203))[0];
    assert_eq!(binding.kind, "BINDING");
    assert_eq!(binding.value.as_deref(), Some("ATP"));
    assert_eq!(binding.residue, Some('G'));
    assert_eq!(binding.accession.as_deref(), Some("P15005"));
    assert_eq!(binding.evidence[0].code, "ECO:0000269");
    assert_eq!(binding.evidence[0].source.as_deref(), Some("PubMed:8022269"));
    assert!(binding.extra.contains_key("ligand_id"));
}

#[test]
fn test_pipeline_reports_per_target() {
    let reports = run(&EngineConfig::default());
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].target, MDN1);
    assert_eq!(reports[1].target, YEAST);

    for report in &reports {
        assert_eq!(report.domain, "PF07728");
        assert_eq!(report.status, ReportStatus::Complete);
        assert_eq!(report.positional.len(), 6);
        assert_eq!(report.domain_annotations.len(), 2);
    }
    assert_eq!(report(&reports, MDN1).regions, vec![Region { start: 325, end: 341 }]);
}

#[test]
fn test_pipeline_insert_states_shift_target_positions() {
    let reports = run(&EngineConfig::default());
    let mdn1 = report(&reports, MDN1);

    assert_eq!(mdn1.coverage.transferred, 6);
    assert_eq!(mdn1.coverage.gap, 0);

    // The two insert-state residues (334, 335) push later columns forward
    let positions: Vec<_> = mdn1.positional.iter().filter_map(|e| e.target_position()).collect();
    assert_eq!(
        positions,
        vec![
            Position(332),
            Position(333),
            Position(333),
            Position(337),
            Position(338),
            Position(338)
        ]
    );
    assert_eq!(mdn1.at(Position(333)).count(), 2);
}

#[test]
fn test_pipeline_target_deletion_is_a_gap() {
    let reports = run(&EngineConfig::default());
    let yeast = report(&reports, YEAST);

    assert_eq!(yeast.coverage.transferred, 4);
    assert_eq!(yeast.coverage.gap, 2);
    assert_eq!(yeast.coverage.unmapped, 0);

    let gaps: Vec<_> = yeast
        .positional
        .iter()
        .filter(|e| matches!(e.status, TransferStatus::Gap { .. }))
        .map(|e| (e.provenance.seed.as_str(), e.provenance.seed_position))
        .collect();
    assert_eq!(gaps, vec![("CBXX_TOBAC", Position(105)), ("MCRB_ECOLI", Position(204))]);
}

#[test]
fn test_pipeline_confidence_and_residue_identity() {
    let reports = run(&EngineConfig::default());

    let mdn1 = report(&reports, MDN1);
    let glycine = mdn1.at(Position(332)).next().unwrap();
    match &glycine.status {
        TransferStatus::Transferred { conservation, confidence, residue_match, .. } => {
            assert_eq!(conservation.get(), 1.0);
            assert_eq!(*confidence, Confidence::High);
            assert!(*residue_match);
        }
        other => panic!("expected a transfer, got {other:?}"),
    }

    // Column 12 reads T, T, T, S
    let yeast = report(&reports, YEAST);
    for entry in yeast.at(Position(20)) {
        match &entry.status {
            TransferStatus::Transferred {
                conservation,
                confidence,
                target_residue,
                residue_match,
                ..
            } => {
                assert_eq!(conservation.get(), 0.75);
                assert_eq!(*confidence, Confidence::Low);
                assert_eq!(*target_residue, Some('S'));
                assert!(!*residue_match);
            }
            other => panic!("expected a transfer, got {other:?}"),
        }
    }

    let lenient = run(&EngineConfigBuilder::new().confidence_threshold(0.7).build().unwrap());
    let yeast = report(&lenient, YEAST);
    assert!(yeast.at(Position(20)).all(|e| matches!(
        e.status,
        TransferStatus::Transferred { confidence: Confidence::High, .. }
    )));
}

#[test]
fn test_pipeline_surfaces_conflicts() {
    let reports = run(&EngineConfig::default());

    let mdn1 = report(&reports, MDN1);
    assert_eq!(mdn1.conflicts.len(), 1);
    let conflict = &mdn1.conflicts[0];
    assert_eq!(conflict.target_position, Position(338));
    assert_eq!(conflict.kind, "BINDING");
    let values: Vec<_> = conflict.values.iter().filter_map(|v| v.value.as_deref()).collect();
    assert_eq!(values.len(), 2);
    assert!(values.contains(&"ATP"));
    assert!(values.contains(&"GTP"));

    let yeast = report(&reports, YEAST);
    assert_eq!(yeast.conflicts.len(), 1);
    assert_eq!(yeast.conflicts[0].target_position, Position(20));
}

#[test]
fn test_pipeline_go_comparison() {
    let reports = run(&EngineConfig::default());

    let mdn1 = report(&reports, MDN1).go.as_ref().unwrap();
    assert_eq!(mdn1.domain.overlap_ratio, 1.0);
    assert_eq!(mdn1.per_seed.len(), 1);
    assert_eq!(mdn1.per_seed[0].seed, "MCRB_ECOLI");

    let yeast = report(&reports, YEAST).go.as_ref().unwrap();
    assert!((yeast.domain.overlap_ratio - 1.0 / 3.0).abs() < 1e-9);
    assert!(yeast.domain.intersection.contains("GO:0005524"));
    assert!(yeast.domain.seed_only.contains("GO:0016887"));
    assert!(yeast.domain.target_only.contains("GO:0003677"));
}

#[test]
fn test_pipeline_evidence_filter() {
    let config = EngineConfigBuilder::new()
        .accepted_eco_codes(["ECO:0000269"])
        .require_evidence(true)
        .build()
        .unwrap();
    let reports = run(&config);

    let mdn1 = report(&reports, MDN1);
    assert_eq!(mdn1.coverage.filtered_by_evidence, 2);
    assert_eq!(mdn1.coverage.transferred, 4);
    assert!(mdn1
        .positional
        .iter()
        .all(|e| e.provenance.evidence.iter().all(|ev| ev.code == "ECO:0000269")));
    // Only the ATP/GTP disagreement at 338 remains
    assert_eq!(mdn1.conflicts.len(), 1);
}

#[test]
fn test_pipeline_report_serializes() {
    let reports = run(&EngineConfig::default());
    let json = serde_json::to_value(report(&reports, MDN1)).unwrap();

    assert_eq!(json["status"]["state"], "complete");
    let first = &json["positional"][0];
    assert_eq!(first["status"], "transferred");
    assert_eq!(first["target_position"], 332);
    assert_eq!(first["confidence"], "high");
    assert_eq!(first["provenance"]["seed"], "MCRB_ECOLI");
    assert_eq!(first["provenance"]["seed_position"], 203);

    let back: Report = serde_json::from_value(json).unwrap();
    assert_eq!(&back, report(&reports, MDN1));
}
