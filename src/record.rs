//! Normalized per-HSP records.
//!
//! A [`MatchRecord`] is built exactly once from the raw HSP fields a report
//! parser extracted, validates everything up front, and is immutable
//! afterward. All derived statistics (mismatches, integer percentages,
//! orientations) are computed here so that filtering and sorting never
//! re-derive them.

use crate::types::{Orientation, OrientationSource, Program, QueryInfo};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("alignment length must be >= 1")]
    EmptyAlignment,
    #[error("coordinate {name} is 0 (BLAST coordinates are 1-based)")]
    ZeroCoordinate { name: &'static str },
    #[error("query length must be >= 1")]
    ZeroQueryLength,
    #[error("aligned strings have different lengths (query {query}, subject {subject})")]
    UnevenAlignment { query: usize, subject: usize },
    #[error("midline length {midline} does not match alignment length {alignment}")]
    UnevenMidline { midline: usize, alignment: usize },
    #[error("identities ({identity}) plus gaps ({gaps}) exceed alignment length ({align_len})")]
    NegativeMismatch {
        identity: u64,
        gaps: u64,
        align_len: u64,
    },
    #[error("query gaps ({gaps}) exceed alignment length ({align_len})")]
    ExcessQueryGaps { gaps: u64, align_len: u64 },
    #[error("{name} = {value}% falls outside [0, 100]")]
    PercentOutOfRange { name: &'static str, value: u64 },
    #[error("{name} must be a non-negative number, got {value}")]
    NegativeScore { name: &'static str, value: f64 },
}

/// Raw HSP fields as a report carries them, before validation.
///
/// Optional fields are those that only some programs (or only some input
/// formats) provide: strands for blastn, frames for translated sides,
/// positives for everything but blastn, a midline only in JSON reports,
/// gap opens only in tabular reports.
#[derive(Debug, Clone, Default)]
pub struct Hsp {
    pub bit_score: f64,
    pub score: u64,
    pub evalue: f64,
    pub identity: u64,
    pub positive: Option<u64>,
    pub query_from: u64,
    pub query_to: u64,
    pub hit_from: u64,
    pub hit_to: u64,
    pub query_strand: Option<String>,
    pub hit_strand: Option<String>,
    pub query_frame: Option<i8>,
    pub hit_frame: Option<i8>,
    pub align_len: u64,
    pub gaps: u64,
    pub gap_opens: Option<u64>,
    pub qseq: String,
    pub hseq: String,
    pub midline: Option<String>,
}

/// One validated, immutable HSP with derived statistics.
///
/// Coordinates are 1-based inclusive, normalized so that a reverse-oriented
/// side has `start > end`; rendering walks from `start` toward `end`.
#[derive(Debug, Clone, Serialize)]
pub struct MatchRecord {
    /// Report-wide stable identifier, the join key for row selection.
    pub identifier: u64,
    pub program: Program,
    pub query_id: String,
    pub query_title: String,
    pub query_len: u64,
    /// Genome assembly part of the subject accession (`<strain>_NODE_<node>`).
    pub strain: String,
    /// Contig part of the subject accession.
    pub node: String,

    pub query_start: u64,
    pub query_end: u64,
    pub subject_start: u64,
    pub subject_end: u64,

    pub query_seq: String,
    pub subject_seq: String,
    /// Midline as reported by the document; tabular reports carry none and
    /// the renderer reconstructs it.
    pub midline: Option<String>,

    pub align_length: u64,
    pub identity_count: u64,
    pub positive_count: Option<u64>,
    pub gap_count: u64,
    pub gap_opens: Option<u64>,
    pub mismatch_count: u64,
    pub query_gap_count: u64,
    pub subject_gap_count: u64,

    pub perc_identity: u64,
    pub perc_alignment: u64,
    pub perc_gaps: u64,
    pub perc_mismatch: u64,
    pub perc_positive: Option<u64>,

    pub evalue: f64,
    pub bit_score: f64,
    pub raw_score: u64,

    pub query_orientation: Orientation,
    pub subject_orientation: Orientation,
    /// Reading frame, kept only for sides whose orientation is frame-driven.
    pub query_frame: Option<i8>,
    pub subject_frame: Option<i8>,
}

impl MatchRecord {
    /// Validate a raw HSP and derive every computed field.
    pub fn from_hsp(
        identifier: u64,
        program: Program,
        query: &QueryInfo,
        strain: &str,
        node: &str,
        hsp: &Hsp,
    ) -> Result<MatchRecord, RecordError> {
        if hsp.align_len < 1 {
            return Err(RecordError::EmptyAlignment);
        }
        if query.query_len < 1 {
            return Err(RecordError::ZeroQueryLength);
        }
        for (name, value) in [
            ("query_start", hsp.query_from),
            ("query_end", hsp.query_to),
            ("subject_start", hsp.hit_from),
            ("subject_end", hsp.hit_to),
        ] {
            if value == 0 {
                return Err(RecordError::ZeroCoordinate { name });
            }
        }
        if hsp.qseq.len() != hsp.hseq.len() {
            return Err(RecordError::UnevenAlignment {
                query: hsp.qseq.len(),
                subject: hsp.hseq.len(),
            });
        }
        if let Some(midline) = &hsp.midline {
            if midline.len() != hsp.qseq.len() {
                return Err(RecordError::UnevenMidline {
                    midline: midline.len(),
                    alignment: hsp.qseq.len(),
                });
            }
        }
        for (name, value) in [("evalue", hsp.evalue), ("bit_score", hsp.bit_score)] {
            if !(value >= 0.0) {
                return Err(RecordError::NegativeScore { name, value });
            }
        }

        let query_gap_count = count_gaps(&hsp.qseq);
        let subject_gap_count = count_gaps(&hsp.hseq);

        let mismatch_count = hsp
            .align_len
            .checked_sub(hsp.identity + hsp.gaps)
            .ok_or(RecordError::NegativeMismatch {
                identity: hsp.identity,
                gaps: hsp.gaps,
                align_len: hsp.align_len,
            })?;
        let covered = hsp
            .align_len
            .checked_sub(query_gap_count)
            .ok_or(RecordError::ExcessQueryGaps {
                gaps: query_gap_count,
                align_len: hsp.align_len,
            })?;

        let profile = program.profile();
        let positive_count = if profile.has_positives { hsp.positive } else { None };

        let perc_identity = percent("perc_identity", hsp.identity, hsp.align_len)?;
        let perc_alignment = percent("perc_alignment", covered, query.query_len)?;
        let perc_gaps = percent("perc_gaps", hsp.gaps, hsp.align_len)?;
        let perc_mismatch = percent("perc_mismatch", mismatch_count, hsp.align_len)?;
        let perc_positive = positive_count
            .map(|p| percent("perc_positive", p, hsp.align_len))
            .transpose()?;

        let query_orientation = resolve_orientation(
            profile.query_orientation,
            hsp.query_strand.as_deref(),
            hsp.query_frame,
            hsp.query_from,
            hsp.query_to,
        );
        let subject_orientation = resolve_orientation(
            profile.subject_orientation,
            hsp.hit_strand.as_deref(),
            hsp.hit_frame,
            hsp.hit_from,
            hsp.hit_to,
        );

        let (query_start, query_end) =
            oriented(query_orientation, hsp.query_from, hsp.query_to);
        let (subject_start, subject_end) =
            oriented(subject_orientation, hsp.hit_from, hsp.hit_to);

        let query_frame = match profile.query_orientation {
            OrientationSource::Frame => hsp.query_frame,
            _ => None,
        };
        let subject_frame = match profile.subject_orientation {
            OrientationSource::Frame => hsp.hit_frame,
            _ => None,
        };

        Ok(MatchRecord {
            identifier,
            program,
            query_id: query.query_id.clone(),
            query_title: query.query_title.clone(),
            query_len: query.query_len,
            strain: strain.to_string(),
            node: node.to_string(),
            query_start,
            query_end,
            subject_start,
            subject_end,
            query_seq: hsp.qseq.clone(),
            subject_seq: hsp.hseq.clone(),
            midline: hsp.midline.clone(),
            align_length: hsp.align_len,
            identity_count: hsp.identity,
            positive_count,
            gap_count: hsp.gaps,
            gap_opens: hsp.gap_opens,
            mismatch_count,
            query_gap_count,
            subject_gap_count,
            perc_identity,
            perc_alignment,
            perc_gaps,
            perc_mismatch,
            perc_positive,
            evalue: hsp.evalue,
            bit_score: hsp.bit_score,
            raw_score: hsp.score,
            query_orientation,
            subject_orientation,
            query_frame,
            subject_frame,
        })
    }
}

fn count_gaps(seq: &str) -> u64 {
    seq.bytes().filter(|&b| b == b'-').count() as u64
}

/// Integer percentage with round-half-to-even, validated to [0, 100].
fn percent(name: &'static str, numerator: u64, denominator: u64) -> Result<u64, RecordError> {
    let value = round_half_even(numerator as f64 / denominator as f64 * 100.0);
    if value > 100 {
        return Err(RecordError::PercentOutOfRange { name, value });
    }
    Ok(value)
}

/// Round to the nearest integer, ties to even.
fn round_half_even(value: f64) -> u64 {
    let floor = value.floor();
    let fraction = value - floor;
    if (fraction - 0.5).abs() < 1e-9 {
        let down = floor as u64;
        if down % 2 == 0 {
            down
        } else {
            down + 1
        }
    } else {
        value.round() as u64
    }
}

fn resolve_orientation(
    source: OrientationSource,
    strand: Option<&str>,
    frame: Option<i8>,
    from: u64,
    to: u64,
) -> Orientation {
    let from_coords = if from > to {
        Orientation::Reverse
    } else {
        Orientation::Forward
    };
    match source {
        OrientationSource::FixedForward => Orientation::Forward,
        OrientationSource::Strand => strand
            .and_then(Orientation::from_strand)
            .or(frame.map(Orientation::from_frame))
            .unwrap_or(from_coords),
        OrientationSource::Frame => frame.map(Orientation::from_frame).unwrap_or(from_coords),
    }
}

/// Normalize a coordinate pair to the resolved orientation: forward runs
/// low to high, reverse runs high to low.
fn oriented(orientation: Orientation, from: u64, to: u64) -> (u64, u64) {
    let (low, high) = (from.min(to), from.max(to));
    if orientation.is_forward() {
        (low, high)
    } else {
        (high, low)
    }
}
