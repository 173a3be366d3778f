//! Shared types: BLAST program variants, orientation, and query metadata.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The five supported BLAST program variants.
///
/// The variant determines which fields an HSP carries (strands for blastn,
/// frames for the translated programs, positives for everything except
/// blastn) and which coordinate multipliers apply when an alignment is
/// rendered. All of that per-program knowledge lives in [`ProgramProfile`];
/// the rest of the crate consults the profile instead of matching on the
/// program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Program {
    Blastn,
    Blastp,
    Blastx,
    Tblastn,
    Tblastx,
}

impl Program {
    /// Parse a program name as it appears in report headers. Case-insensitive.
    /// Returns `None` for anything outside the five supported variants.
    pub fn from_name(name: &str) -> Option<Program> {
        match name.to_ascii_lowercase().as_str() {
            "blastn" => Some(Program::Blastn),
            "blastp" => Some(Program::Blastp),
            "blastx" => Some(Program::Blastx),
            "tblastn" => Some(Program::Tblastn),
            "tblastx" => Some(Program::Tblastx),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Program::Blastn => "blastn",
            Program::Blastp => "blastp",
            Program::Blastx => "blastx",
            Program::Tblastn => "tblastn",
            Program::Tblastx => "tblastx",
        }
    }

    /// The strategy table consulted by record construction and rendering.
    pub fn profile(&self) -> ProgramProfile {
        match self {
            Program::Blastn => ProgramProfile {
                query_multiplier: 1,
                subject_multiplier: 1,
                query_orientation: OrientationSource::Strand,
                subject_orientation: OrientationSource::Strand,
                has_positives: false,
            },
            Program::Blastp => ProgramProfile {
                query_multiplier: 1,
                subject_multiplier: 1,
                query_orientation: OrientationSource::FixedForward,
                subject_orientation: OrientationSource::FixedForward,
                has_positives: true,
            },
            Program::Blastx => ProgramProfile {
                query_multiplier: 3,
                subject_multiplier: 1,
                query_orientation: OrientationSource::Frame,
                subject_orientation: OrientationSource::FixedForward,
                has_positives: true,
            },
            Program::Tblastn => ProgramProfile {
                query_multiplier: 1,
                subject_multiplier: 3,
                query_orientation: OrientationSource::FixedForward,
                subject_orientation: OrientationSource::Frame,
                has_positives: true,
            },
            Program::Tblastx => ProgramProfile {
                query_multiplier: 3,
                subject_multiplier: 3,
                query_orientation: OrientationSource::Frame,
                subject_orientation: OrientationSource::Frame,
                has_positives: true,
            },
        }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where the orientation of one side of an alignment comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrientationSource {
    /// Always forward (protein coordinates: blastp, and the protein side of
    /// blastx/tblastn).
    FixedForward,
    /// A `Plus`/`Minus` strand field (blastn).
    Strand,
    /// The sign of a reading frame (translated sides).
    Frame,
}

/// Per-program rendering and construction parameters.
///
/// Multipliers are 3 on a translated side: one aligned residue there spans
/// three nucleotides of the underlying sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramProfile {
    pub query_multiplier: u64,
    pub subject_multiplier: u64,
    pub query_orientation: OrientationSource,
    pub subject_orientation: OrientationSource,
    pub has_positives: bool,
}

/// Orientation of one side of an alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    Forward,
    Reverse,
}

impl Orientation {
    /// Parse a BLAST strand label (`Plus`/`Minus`).
    pub fn from_strand(strand: &str) -> Option<Orientation> {
        match strand {
            "Plus" => Some(Orientation::Forward),
            "Minus" => Some(Orientation::Reverse),
            _ => None,
        }
    }

    /// Orientation implied by a reading frame: negative frames are reverse.
    pub fn from_frame(frame: i8) -> Orientation {
        if frame < 0 {
            Orientation::Reverse
        } else {
            Orientation::Forward
        }
    }

    pub fn is_forward(&self) -> bool {
        matches!(self, Orientation::Forward)
    }

    /// The strand label BLAST prints for this orientation.
    pub fn strand_label(&self) -> &'static str {
        match self {
            Orientation::Forward => "Plus",
            Orientation::Reverse => "Minus",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.strand_label())
    }
}

/// Metadata for one query sequence of a report.
///
/// `hit_count` is the number of HSPs the document reported for this query
/// before any record-level filtering; zero hits is normal, not an error.
/// `message` carries informational search-level text such as
/// "No hits found".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryInfo {
    pub query_id: String,
    pub query_title: String,
    pub query_len: u64,
    pub hit_count: u64,
    pub message: Option<String>,
}
