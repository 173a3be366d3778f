//! BLAST report core library
//!
//! Parses BLAST output (JSON `-outfmt 15` or commented tabular `-outfmt 7`)
//! into validated, immutable match records, serves them through a filterable
//! result table, and reconstructs BLAST-style pairwise alignment text across
//! the five program variants (blastn, blastp, blastx, tblastn, tblastx).

pub mod io;
pub mod record;
pub mod render;
pub mod scoring;
pub mod table;
pub mod types;

// Re-export the types most callers touch.
pub use io::{
    document_fingerprint, parse_report, parse_report_file, BlastReport, ParseWarning,
    ReportError,
};
pub use record::{Hsp, MatchRecord, RecordError};
pub use render::{midline, render, render_batch, LINE_WIDTH};
pub use scoring::{ScoringError, SubstitutionMatrix};
pub use table::{display_columns, Column, ResultTable, ResultView, SortKey, TableError};
pub use types::{Orientation, Program, ProgramProfile, QueryInfo};

/// Version information for the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
