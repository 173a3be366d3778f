//! End-to-end scenarios: whole documents in, tables and alignment text out.

use blast_report::{
    parse_report, render, Orientation, ParseWarning, Program, SubstitutionMatrix,
};
use serde_json::json;

fn single_hit_blastn_json(hit_from: u64, hit_to: u64, hit_strand: &str) -> String {
    json!({
        "BlastOutput2": [{
            "report": {
                "program": "blastn",
                "version": "BLASTN 2.13.0+",
                "params": {"expect": 10},
                "search_target": {"db": "demo_db"},
                "results": {
                    "search": {
                        "query_id": "Query_1",
                        "query_title": "sample query",
                        "query_len": 100,
                        "hits": [{
                            "description": [{"accession": "StrainA_NODE_5"}],
                            "hsps": [{
                                "num": 1,
                                "bit_score": 180.2,
                                "score": 200,
                                "evalue": 2.5e-52,
                                "identity": 95,
                                "query_from": 1,
                                "query_to": 100,
                                "query_strand": "Plus",
                                "hit_from": hit_from,
                                "hit_to": hit_to,
                                "hit_strand": hit_strand,
                                "align_len": 100,
                                "gaps": 0,
                                "qseq": "ACGT".repeat(25),
                                "hseq": "ACGT".repeat(25),
                                "midline": "|".repeat(100),
                            }]
                        }]
                    }
                }
            }
        }]
    })
    .to_string()
}

/// Coordinate pairs of every Query or Sbjct line in a rendered alignment.
fn coords(text: &str, label: &str) -> Vec<(u64, u64)> {
    text.lines()
        .filter(|l| l.starts_with(label))
        .map(|l| {
            let fields: Vec<&str> = l.split_whitespace().collect();
            (fields[1].parse().unwrap(), fields[3].parse().unwrap())
        })
        .collect()
}

#[test]
fn forward_blastn_report_end_to_end() {
    let report = parse_report(&single_hit_blastn_json(50, 149, "Plus")).unwrap();
    assert_eq!(report.program, Program::Blastn);
    assert_eq!(report.table.len(), 1);

    let record = &report.table.records()[0];
    assert_eq!(record.perc_identity, 95);
    assert_eq!(record.perc_alignment, 100);

    let text = render(record, &SubstitutionMatrix::blosum62());
    assert_eq!(coords(&text, "Query"), vec![(1, 60), (61, 100)]);
    assert_eq!(coords(&text, "Sbjct"), vec![(50, 109), (110, 149)]);
}

#[test]
fn reverse_blastn_subject_counts_down() {
    let report = parse_report(&single_hit_blastn_json(149, 50, "Minus")).unwrap();
    let record = &report.table.records()[0];
    assert_eq!(record.subject_orientation, Orientation::Reverse);

    let text = render(record, &SubstitutionMatrix::blosum62());
    assert_eq!(coords(&text, "Query"), vec![(1, 60), (61, 100)]);
    assert_eq!(coords(&text, "Sbjct"), vec![(149, 90), (89, 50)]);

    // Strand/frame symmetry: subject windows descend while query windows
    // ascend.
    let sbjct = coords(&text, "Sbjct");
    assert!(sbjct.windows(2).all(|w| w[0].1 > w[1].0));
    let query = coords(&text, "Query");
    assert!(query.windows(2).all(|w| w[0].1 < w[1].0));
}

#[test]
fn tblastn_reverse_frame_advances_three_per_residue() {
    let doc = json!({
        "BlastOutput2": [{
            "report": {
                "program": "tblastn",
                "version": "TBLASTN 2.13.0+",
                "results": {
                    "search": {
                        "query_id": "prot_1",
                        "query_len": 50,
                        "hits": [{
                            "description": [{"accession": "StrainB_NODE_2"}],
                            "hsps": [{
                                "bit_score": 95.1,
                                "score": 240,
                                "evalue": 3.1e-25,
                                "identity": 48,
                                "positive": 50,
                                "query_from": 1,
                                "query_to": 50,
                                "hit_from": 300,
                                "hit_to": 151,
                                "hit_frame": -1,
                                "align_len": 50,
                                "gaps": 0,
                                "qseq": "MKLV".repeat(12) + "MK",
                                "hseq": "MKLV".repeat(12) + "MK",
                                "midline": "MKLV".repeat(12) + "MK",
                            }]
                        }]
                    }
                }
            }
        }]
    })
    .to_string();

    let report = parse_report(&doc).unwrap();
    let record = &report.table.records()[0];
    assert_eq!(record.subject_orientation, Orientation::Reverse);
    assert_eq!(record.perc_positive, Some(100));

    let text = render(record, &SubstitutionMatrix::blosum62());
    // 50 protein residues cover 150 nucleotides, walked backwards.
    assert_eq!(coords(&text, "Sbjct"), vec![(300, 151)]);
    assert_eq!(coords(&text, "Query"), vec![(1, 50)]);
    assert!(text.contains("Frame = -1"));
}

#[test]
fn tabular_zero_hit_document_is_not_an_error() {
    let doc = "# BLASTN 2.13.0+\n\
               # Query: Query_1 sample\n\
               # Database: demo_db\n\
               # 0 hits found\n";
    let report = parse_report(doc).unwrap();
    assert!(report.table.is_empty());
    assert_eq!(report.queries().len(), 1);
    assert_eq!(report.queries()[0].hit_count, 0);
    assert!(report.table.group_by_query("Query_1").is_empty());
}

#[test]
fn accession_without_node_separator_is_collected() {
    let doc = single_hit_blastn_json(50, 149, "Plus").replace("StrainA_NODE_5", "StrainA");
    // The only declared HSP is rejected, so the report has nothing left to
    // offer; the anomaly itself is a typed warning, not a crash.
    let err = parse_report(&doc).unwrap_err();
    assert!(matches!(err, blast_report::ReportError::EmptyResult));

    // With a second, well-formed hit the parse succeeds and carries the
    // warning.
    let doc = json!({
        "BlastOutput2": [{
            "report": {
                "program": "blastn",
                "results": {
                    "search": {
                        "query_id": "Query_1",
                        "query_len": 100,
                        "hits": [
                            {
                                "description": [{"accession": "StrainA"}],
                                "hsps": [{
                                    "bit_score": 100.0, "score": 100, "evalue": 1e-10,
                                    "identity": 100,
                                    "query_from": 1, "query_to": 100,
                                    "query_strand": "Plus",
                                    "hit_from": 1, "hit_to": 100,
                                    "hit_strand": "Plus",
                                    "align_len": 100, "gaps": 0,
                                    "qseq": "A".repeat(100),
                                    "hseq": "A".repeat(100),
                                    "midline": "|".repeat(100),
                                }]
                            },
                            {
                                "description": [{"accession": "StrainB_NODE_1"}],
                                "hsps": [{
                                    "bit_score": 100.0, "score": 100, "evalue": 1e-10,
                                    "identity": 100,
                                    "query_from": 1, "query_to": 100,
                                    "query_strand": "Plus",
                                    "hit_from": 1, "hit_to": 100,
                                    "hit_strand": "Plus",
                                    "align_len": 100, "gaps": 0,
                                    "qseq": "A".repeat(100),
                                    "hseq": "A".repeat(100),
                                    "midline": "|".repeat(100),
                                }]
                            }
                        ]
                    }
                }
            }
        }]
    })
    .to_string();
    let report = parse_report(&doc).unwrap();
    assert_eq!(report.table.len(), 1);
    assert_eq!(report.warnings.len(), 1);
    assert!(matches!(
        report.warnings[0],
        ParseWarning::MalformedSubjectId { .. }
    ));
}

#[test]
fn identifiers_unique_and_dense_across_queries() {
    let doc = json!({
        "BlastOutput2": [
            {
                "report": {
                    "program": "blastn",
                    "results": {
                        "search": {
                            "query_id": "q1",
                            "query_len": 100,
                            "hits": [{
                                "description": [{"accession": "S1_NODE_1"}],
                                "hsps": [
                                    {
                                        "bit_score": 90.0, "score": 95, "evalue": 1e-9,
                                        "identity": 100,
                                        "query_from": 1, "query_to": 100,
                                        "query_strand": "Plus",
                                        "hit_from": 1, "hit_to": 100,
                                        "hit_strand": "Plus",
                                        "align_len": 100, "gaps": 0,
                                        "qseq": "A".repeat(100),
                                        "hseq": "A".repeat(100),
                                        "midline": "|".repeat(100),
                                    },
                                    {
                                        "bit_score": 50.0, "score": 52, "evalue": 1e-4,
                                        "identity": 40,
                                        "query_from": 1, "query_to": 40,
                                        "query_strand": "Plus",
                                        "hit_from": 200, "hit_to": 239,
                                        "hit_strand": "Plus",
                                        "align_len": 40, "gaps": 0,
                                        "qseq": "A".repeat(40),
                                        "hseq": "A".repeat(40),
                                        "midline": "|".repeat(40),
                                    }
                                ]
                            }]
                        }
                    }
                }
            },
            {
                "report": {
                    "program": "blastn",
                    "results": {
                        "search": {
                            "query_id": "q2",
                            "query_len": 60,
                            "hits": [{
                                "description": [{"accession": "S2_NODE_4"}],
                                "hsps": [{
                                    "bit_score": 60.0, "score": 66, "evalue": 1e-6,
                                    "identity": 60,
                                    "query_from": 1, "query_to": 60,
                                    "query_strand": "Plus",
                                    "hit_from": 1, "hit_to": 60,
                                    "hit_strand": "Plus",
                                    "align_len": 60, "gaps": 0,
                                    "qseq": "A".repeat(60),
                                    "hseq": "A".repeat(60),
                                    "midline": "|".repeat(60),
                                }]
                            }]
                        }
                    }
                }
            }
        ]
    })
    .to_string();

    let report = parse_report(&doc).unwrap();
    let ids: Vec<u64> = report.table.records().iter().map(|r| r.identifier).collect();
    assert_eq!(ids, vec![0, 1, 2]);

    // Identifiers resolve back to the same records for row selection.
    let selected = report.table.by_identifier(&[2, 0]).unwrap();
    assert_eq!(selected[0].query_id, "q2");
    assert_eq!(selected[1].query_id, "q1");

    assert_eq!(report.table.group_by_query("q1").len(), 2);
    assert_eq!(report.table.group_by_query("q2").len(), 1);
}

#[test]
fn filtered_views_honor_thresholds_end_to_end() {
    let report = parse_report(&single_hit_blastn_json(50, 149, "Plus")).unwrap();
    assert_eq!(report.table.filtered(90.0, 90.0).unwrap().len(), 1);
    assert_eq!(report.table.filtered(96.0, 90.0).unwrap().len(), 0);
    assert!(report.table.filtered(101.0, 0.0).is_err());
}
