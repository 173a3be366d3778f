//! BLAST-style pairwise alignment text.
//!
//! Rebuilds the classic `Query`/midline/`Sbjct` triplet blocks from a
//! [`MatchRecord`]: a header with the match statistics, then the alignment
//! wrapped at 60 columns with per-line coordinates. Coordinates advance by
//! the program's translation multiplier per non-gap column and run backwards
//! for reverse-oriented sides, which is where every program variant differs;
//! all of that is driven by the [`crate::types::ProgramProfile`] table.
//!
//! Rendering is pure: records are immutable and no scratch state is shared,
//! so batches fan out safely across a rayon pool.

use crate::record::MatchRecord;
use crate::scoring::SubstitutionMatrix;
use crate::types::{Orientation, Program};
use rayon::prelude::*;

/// Alignment line width, matching BLAST's pairwise display.
pub const LINE_WIDTH: usize = 60;

/// Render one record as BLAST-style pairwise alignment text.
pub fn render(record: &MatchRecord, matrix: &SubstitutionMatrix) -> String {
    let mut text = String::with_capacity(record.query_seq.len() * 4 + 256);
    push_header(&mut text, record);
    push_body(&mut text, record, matrix);
    text
}

/// Render many records in parallel. Output order matches input order.
pub fn render_batch(records: &[&MatchRecord], matrix: &SubstitutionMatrix) -> Vec<String> {
    records.par_iter().map(|r| render(r, matrix)).collect()
}

/// Reconstruct the midline for an aligned pair.
///
/// blastn marks identities with `|`. The protein-involving programs show the
/// residue itself on identity, `+` for a conservative substitution under the
/// matrix, and a space for gaps and non-conservative mismatches.
pub fn midline(
    program: Program,
    query_seq: &str,
    subject_seq: &str,
    matrix: &SubstitutionMatrix,
) -> String {
    let mut line = String::with_capacity(query_seq.len());
    for (q, s) in query_seq.bytes().zip(subject_seq.bytes()) {
        let qu = q.to_ascii_uppercase();
        let su = s.to_ascii_uppercase();
        let mark = if q == b'-' || s == b'-' {
            ' '
        } else if program == Program::Blastn {
            if qu == su {
                '|'
            } else {
                ' '
            }
        } else if qu == su {
            qu as char
        } else if matrix.is_conservative(q, s) {
            '+'
        } else {
            ' '
        };
        line.push(mark);
    }
    line
}

fn push_header(text: &mut String, record: &MatchRecord) {
    text.push_str(&format!(">{}\n", record.query_title));
    text.push_str(&format!(
        "Strain = {}, Node = {}\n",
        record.strain, record.node
    ));
    text.push_str(&format!(
        "\tScore = {:.0} bits ({}), E-value = {}\n",
        record.bit_score,
        record.raw_score,
        format_sig3(record.evalue)
    ));

    let len = record.align_length;
    let mut stats = format!(
        "\tIdentities = {}/{} ({}%), Query coverage = {}/{} ({}%)",
        record.identity_count, len, record.perc_identity, len, record.query_len,
        record.perc_alignment
    );
    if let Some(gap_opens) = record.gap_opens {
        stats.push_str(&format!(", Gap opens = {}", gap_opens));
    }
    stats.push('\n');
    text.push_str(&stats);

    let mut counts = String::from("\t");
    if let (Some(positive), Some(perc)) = (record.positive_count, record.perc_positive) {
        counts.push_str(&format!("Positives = {}/{} ({}%), ", positive, len, perc));
    }
    counts.push_str(&format!(
        "Mismatches = {}/{} ({}%), Gaps = {}/{} ({}%)\n",
        record.mismatch_count, len, record.perc_mismatch, record.gap_count, len,
        record.perc_gaps
    ));
    text.push_str(&counts);

    match (record.program, record.query_frame, record.subject_frame) {
        (Program::Blastn, _, _) => text.push_str(&format!(
            "\tStrand = {}/{}\n",
            record.query_orientation, record.subject_orientation
        )),
        (_, Some(qf), Some(sf)) => text.push_str(&format!("\tFrame = {}/{}\n", qf, sf)),
        (_, Some(qf), None) => text.push_str(&format!("\tQuery frame = {}\n", qf)),
        (_, None, Some(sf)) => text.push_str(&format!("\tFrame = {}\n", sf)),
        (_, None, None) => {}
    }
    text.push('\n');
}

fn push_body(text: &mut String, record: &MatchRecord, matrix: &SubstitutionMatrix) {
    let profile = record.program.profile();
    let reconstructed;
    let mid: &str = match &record.midline {
        Some(m) => m,
        None => {
            reconstructed = midline(
                record.program,
                &record.query_seq,
                &record.subject_seq,
                matrix,
            );
            &reconstructed
        }
    };

    let pad = coordinate_width(record);
    let qseq = record.query_seq.as_bytes();
    let sseq = record.subject_seq.as_bytes();
    let columns = qseq.len();

    let mut query_gaps = 0u64;
    let mut subject_gaps = 0u64;
    let mut offset = 0usize;
    while offset < columns {
        let end = (offset + LINE_WIDTH).min(columns);
        let query_gaps_before = query_gaps;
        let subject_gaps_before = subject_gaps;
        query_gaps += count_gaps(&qseq[offset..end]);
        subject_gaps += count_gaps(&sseq[offset..end]);

        let (q_from, q_to) = window_range(
            record.query_start,
            record.query_end,
            record.query_orientation,
            profile.query_multiplier,
            offset,
            query_gaps_before,
            query_gaps,
        );
        let (s_from, s_to) = window_range(
            record.subject_start,
            record.subject_end,
            record.subject_orientation,
            profile.subject_multiplier,
            offset,
            subject_gaps_before,
            subject_gaps,
        );

        text.push_str(&format!(
            "Query  {:>pad$}  {}  {:>pad$}\n",
            q_from,
            &record.query_seq[offset..end],
            q_to,
        ));
        text.push_str(&format!("       {:>pad$}  {}\n", "", &mid[offset..end]));
        text.push_str(&format!(
            "Sbjct  {:>pad$}  {}  {:>pad$}\n\n",
            s_from,
            &record.subject_seq[offset..end],
            s_to,
        ));

        offset = end;
    }
}

/// Displayed coordinate range for one 60-column window of one side.
///
/// The start picks up where the previous window ended; the end advances by
/// one multiplier step per non-gap column and is clamped at the record's own
/// boundary, which truncates the arithmetic overshoot of the final short
/// window.
fn window_range(
    anchor: u64,
    bound: u64,
    orientation: Orientation,
    multiplier: u64,
    offset: usize,
    gaps_before: u64,
    gaps_through: u64,
) -> (u64, u64) {
    let anchor = anchor as i64;
    let bound = bound as i64;
    let multiplier = multiplier as i64;
    let consumed_before = offset as i64 - gaps_before as i64;
    let consumed_through = (offset + LINE_WIDTH) as i64 - gaps_through as i64;

    let (from, to) = if orientation.is_forward() {
        (
            anchor + consumed_before * multiplier,
            (anchor + consumed_through * multiplier - 1).min(bound),
        )
    } else {
        (
            anchor - consumed_before * multiplier,
            (anchor - consumed_through * multiplier + 1).max(bound),
        )
    };
    (from as u64, to as u64)
}

/// Uniform coordinate column width: the widest of the record's four
/// boundary coordinates.
fn coordinate_width(record: &MatchRecord) -> usize {
    [
        record.query_start,
        record.query_end,
        record.subject_start,
        record.subject_end,
    ]
    .iter()
    .map(|c| c.to_string().len())
    .max()
    .unwrap_or(1)
}

fn count_gaps(window: &[u8]) -> u64 {
    window.iter().filter(|&&b| b == b'-').count() as u64
}

/// E-value formatting: three significant digits, scientific notation for
/// very small or very large magnitudes (`printf %.3g` behavior).
fn format_sig3(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    let mut exponent = value.abs().log10().floor() as i32;
    if !(-4..=2).contains(&exponent) {
        // Round the mantissa to three significant digits first; a mantissa
        // that rounds to 10 carries into the exponent.
        let mut mantissa = value / 10f64.powi(exponent);
        mantissa = (mantissa * 100.0).round() / 100.0;
        if mantissa.abs() >= 10.0 {
            mantissa /= 10.0;
            exponent += 1;
        } else if mantissa.abs() < 1.0 {
            mantissa *= 10.0;
            exponent -= 1;
        }
        let mantissa = format!("{:.2}", mantissa);
        let mantissa = mantissa.trim_end_matches('0').trim_end_matches('.');
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exponent.abs())
    } else {
        let decimals = (2 - exponent).max(0) as usize;
        let fixed = format!("{:.*}", decimals, value);
        if fixed.contains('.') {
            fixed.trim_end_matches('0').trim_end_matches('.').to_string()
        } else {
            fixed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Hsp;
    use crate::types::QueryInfo;

    fn query(len: u64) -> QueryInfo {
        QueryInfo {
            query_id: "Query_1".to_string(),
            query_title: "test query".to_string(),
            query_len: len,
            hit_count: 1,
            message: None,
        }
    }

    fn build(program: Program, query_len: u64, hsp: &Hsp) -> MatchRecord {
        MatchRecord::from_hsp(0, program, &query(query_len), "StrainA", "7", hsp).unwrap()
    }

    /// Collect the (from, to) pairs of every `Query` or `Sbjct` line.
    fn line_coords(text: &str, label: &str) -> Vec<(u64, u64)> {
        text.lines()
            .filter(|l| l.starts_with(label))
            .map(|l| {
                let fields: Vec<&str> = l.split_whitespace().collect();
                (fields[1].parse().unwrap(), fields[3].parse().unwrap())
            })
            .collect()
    }

    fn blastn_hsp_100() -> Hsp {
        Hsp {
            bit_score: 180.0,
            score: 200,
            evalue: 1e-50,
            identity: 95,
            query_from: 1,
            query_to: 100,
            hit_from: 50,
            hit_to: 149,
            query_strand: Some("Plus".to_string()),
            hit_strand: Some("Plus".to_string()),
            align_len: 100,
            gaps: 0,
            qseq: "ACGT".repeat(25),
            hseq: "ACGT".repeat(25),
            midline: Some("|".repeat(100)),
            ..Hsp::default()
        }
    }

    #[test]
    fn test_forward_blastn_window_coordinates() {
        let record = build(Program::Blastn, 100, &blastn_hsp_100());
        let text = render(&record, &SubstitutionMatrix::blosum62());
        assert_eq!(line_coords(&text, "Query"), vec![(1, 60), (61, 100)]);
        assert_eq!(line_coords(&text, "Sbjct"), vec![(50, 109), (110, 149)]);
    }

    #[test]
    fn test_reverse_subject_window_coordinates() {
        let mut hsp = blastn_hsp_100();
        hsp.hit_strand = Some("Minus".to_string());
        hsp.hit_from = 149;
        hsp.hit_to = 50;
        let record = build(Program::Blastn, 100, &hsp);
        let text = render(&record, &SubstitutionMatrix::blosum62());
        assert_eq!(line_coords(&text, "Query"), vec![(1, 60), (61, 100)]);
        assert_eq!(line_coords(&text, "Sbjct"), vec![(149, 90), (89, 50)]);
        assert!(text.contains("Strand = Plus/Minus"));
    }

    #[test]
    fn test_tblastn_reverse_frame_advances_by_three() {
        // 50 protein residues against a reverse-frame nucleotide subject:
        // 150 nucleotides, walked backwards.
        let hsp = Hsp {
            bit_score: 90.0,
            score: 220,
            evalue: 1e-20,
            identity: 50,
            positive: Some(50),
            query_from: 1,
            query_to: 50,
            hit_from: 300,
            hit_to: 151,
            hit_frame: Some(-1),
            align_len: 50,
            gaps: 0,
            qseq: "M".repeat(50),
            hseq: "M".repeat(50),
            ..Hsp::default()
        };
        let record = build(Program::Tblastn, 50, &hsp);
        let text = render(&record, &SubstitutionMatrix::blosum62());
        assert_eq!(line_coords(&text, "Query"), vec![(1, 50)]);
        assert_eq!(line_coords(&text, "Sbjct"), vec![(300, 151)]);
        assert!(text.contains("Frame = -1"));
    }

    #[test]
    fn test_gap_columns_do_not_consume_coordinates() {
        // 62 columns with 2 query gaps in the first window: the second
        // window's query start continues from 58, not 60.
        let qseq = format!("{}--{}{}", "A".repeat(30), "A".repeat(28), "AA");
        let sseq = "A".repeat(62);
        let hsp = Hsp {
            bit_score: 50.0,
            score: 55,
            evalue: 0.001,
            identity: 60,
            query_from: 1,
            query_to: 60,
            hit_from: 1,
            hit_to: 62,
            query_strand: Some("Plus".to_string()),
            hit_strand: Some("Plus".to_string()),
            align_len: 62,
            gaps: 2,
            qseq,
            hseq: sseq,
            ..Hsp::default()
        };
        let record = build(Program::Blastn, 60, &hsp);
        let text = render(&record, &SubstitutionMatrix::blosum62());
        assert_eq!(line_coords(&text, "Query"), vec![(1, 58), (59, 60)]);
        assert_eq!(line_coords(&text, "Sbjct"), vec![(1, 60), (61, 62)]);
    }

    #[test]
    fn test_round_trip_residues() {
        let mut hsp = blastn_hsp_100();
        hsp.qseq = format!("{}-{}", "ACGT".repeat(12), "TGCA".repeat(12));
        hsp.hseq = format!("{}A{}", "ACGT".repeat(12), "TGCA".repeat(12));
        hsp.identity = 96;
        hsp.gaps = 1;
        hsp.align_len = 97;
        hsp.query_to = 96;
        hsp.hit_to = 146;
        hsp.midline = None;
        let record = build(Program::Blastn, 100, &hsp);
        let text = render(&record, &SubstitutionMatrix::blosum62());

        let mut shown_query = String::new();
        for line in text.lines().filter(|l| l.starts_with("Query")) {
            shown_query.push_str(line.split_whitespace().nth(2).unwrap());
        }
        assert_eq!(shown_query.replace('-', ""), record.query_seq.replace('-', ""));
        let last = *line_coords(&text, "Query").last().unwrap();
        assert_eq!(last.1, record.query_end);
        let last_s = *line_coords(&text, "Sbjct").last().unwrap();
        assert_eq!(last_s.1, record.subject_end);
    }

    #[test]
    fn test_midline_blastn() {
        let m = SubstitutionMatrix::blosum62();
        assert_eq!(midline(Program::Blastn, "ACGT", "ACTT", &m), "|| |");
        assert_eq!(midline(Program::Blastn, "acgt", "ACGT", &m), "||||");
        assert_eq!(midline(Program::Blastn, "A-GT", "AAGT", &m), "| ||");
    }

    #[test]
    fn test_midline_protein() {
        let m = SubstitutionMatrix::blosum62();
        // K/R scores +2 (conservative), W/G scores -2, gaps blank out.
        assert_eq!(midline(Program::Blastp, "KWAC", "RGAC", &m), "+ AC");
        assert_eq!(midline(Program::Tblastn, "M-KL", "MAKL", &m), "M KL");
    }

    #[test]
    fn test_header_contents() {
        let record = build(Program::Blastn, 100, &blastn_hsp_100());
        let text = render(&record, &SubstitutionMatrix::blosum62());
        assert!(text.starts_with(">test query\n"));
        assert!(text.contains("Strain = StrainA, Node = 7"));
        assert!(text.contains("Score = 180 bits (200), E-value = 1e-50"));
        assert!(text.contains("Identities = 95/100 (95%)"));
        assert!(text.contains("Query coverage = 100/100 (100%)"));
        assert!(text.contains("Mismatches = 5/100 (5%)"));
        assert!(text.contains("Gaps = 0/100 (0%)"));
        // blastn never reports positives.
        assert!(!text.contains("Positives"));
    }

    #[test]
    fn test_padding_uniform_across_lines() {
        let record = build(Program::Blastn, 100, &blastn_hsp_100());
        let text = render(&record, &SubstitutionMatrix::blosum62());
        // Widest coordinate is 149 -> width 3; every Query line aligns its
        // sequence at the same column.
        let starts: Vec<usize> = text
            .lines()
            .filter(|l| l.starts_with("Query"))
            .map(|l| l.find("ACGT").unwrap())
            .collect();
        assert!(starts.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_format_sig3() {
        assert_eq!(format_sig3(0.0), "0");
        assert_eq!(format_sig3(1e-50), "1e-50");
        assert_eq!(format_sig3(2.5e-7), "2.5e-07");
        assert_eq!(format_sig3(0.00123), "0.00123");
        assert_eq!(format_sig3(0.5), "0.5");
        assert_eq!(format_sig3(10.0), "10");
        assert_eq!(format_sig3(1.23), "1.23");
        // A mantissa that rounds up to 10 carries into the exponent.
        assert_eq!(format_sig3(9.999e-8), "1e-07");
    }

    #[test]
    fn test_render_batch_preserves_order() {
        let r1 = build(Program::Blastn, 100, &blastn_hsp_100());
        let mut hsp = blastn_hsp_100();
        hsp.hit_from = 500;
        hsp.hit_to = 599;
        let r2 = build(Program::Blastn, 100, &hsp);
        let matrix = SubstitutionMatrix::blosum62();
        let batch = render_batch(&[&r1, &r2], &matrix);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0], render(&r1, &matrix));
        assert_eq!(batch[1], render(&r2, &matrix));
    }
}
