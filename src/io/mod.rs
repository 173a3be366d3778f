//! Report parsers.
//!
//! Entry point for turning a BLAST output document into a [`BlastReport`].
//! Two formats are supported: the JSON report (`-outfmt 15`) and the
//! commented tabular report (`-outfmt 7`) with the front-end's embedded
//! `# [PARAMS]` block. [`parse_report`] auto-detects which one it was given.
//!
//! Record-level anomalies (a subject accession without the `_NODE_`
//! separator, an HSP that fails validation) never abort a parse: the record
//! is skipped, the anomaly is logged and collected as a [`ParseWarning`],
//! and parsing continues. Document-level problems (unknown program, nothing
//! to report on) are hard errors.

pub mod json;
pub mod tabular;

use crate::record::{Hsp, MatchRecord, RecordError};
use crate::table::ResultTable;
use crate::types::{Program, QueryInfo};
use anyhow::Context;
use flate2::read::GzDecoder;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("unsupported BLAST program: {0}")]
    UnsupportedProgram(String),
    #[error("report contains no results")]
    EmptyResult,
    #[error("malformed JSON report: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed tabular report at line {line}: {message}")]
    Tabular { line: usize, message: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A record-level anomaly that was skipped during parsing.
#[derive(Debug, Error)]
pub enum ParseWarning {
    #[error("query {query_id}: subject accession `{accession}` lacks the _NODE_ separator")]
    MalformedSubjectId { query_id: String, accession: String },
    #[error("query {query_id}: rejected HSP for `{accession}`: {source}")]
    InvalidRecord {
        query_id: String,
        accession: String,
        source: RecordError,
    },
}

/// A fully parsed report: metadata, the result table, and any warnings
/// collected along the way.
#[derive(Debug)]
pub struct BlastReport {
    pub program: Program,
    pub version: String,
    pub database: Option<String>,
    /// Search parameters, from the JSON `params` object or the tabular
    /// `# [PARAMS]` block.
    pub params: BTreeMap<String, String>,
    pub table: ResultTable,
    pub warnings: Vec<ParseWarning>,
}

impl BlastReport {
    /// Query metadata in document order, including hitless queries.
    pub fn queries(&self) -> &[QueryInfo] {
        self.table.queries()
    }

    /// The substitution matrix named in the search parameters, if any.
    pub fn matrix_name(&self) -> Option<&str> {
        self.params.get("matrix").map(String::as_str)
    }
}

/// Parse a report document, auto-detecting JSON vs tabular.
pub fn parse_report(input: &str) -> Result<BlastReport, ReportError> {
    if input.trim_start().starts_with('{') {
        json::parse_json(input)
    } else {
        tabular::parse_tabular(input)
    }
}

/// Read and parse a report file. Transparently decompresses `.gz` files.
pub fn parse_report_file<P: AsRef<Path>>(path: P) -> anyhow::Result<BlastReport> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut raw = String::new();
    if path.extension().is_some_and(|ext| ext == "gz") {
        GzDecoder::new(file)
            .read_to_string(&mut raw)
            .with_context(|| format!("decompressing {}", path.display()))?;
    } else {
        let mut file = file;
        file.read_to_string(&mut raw)
            .with_context(|| format!("reading {}", path.display()))?;
    }
    parse_report(&raw).with_context(|| format!("parsing {}", path.display()))
}

/// Content key for a report document.
///
/// Callers that cache parsed reports key the cache on this; the crate itself
/// never caches.
pub fn document_fingerprint(bytes: &[u8]) -> u64 {
    xxhash_rust::xxh64::xxh64(bytes, 0)
}

/// Accumulates validated records and warnings while a parser walks the
/// document. Identifiers are dense over accepted records, report-wide.
pub(crate) struct RecordAssembler {
    program: Program,
    next_identifier: u64,
    records: Vec<MatchRecord>,
    warnings: Vec<ParseWarning>,
}

impl RecordAssembler {
    pub(crate) fn new(program: Program) -> RecordAssembler {
        RecordAssembler {
            program,
            next_identifier: 0,
            records: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, query: &QueryInfo, accession: &str, hsp: &Hsp) {
        let Some((strain, node)) = accession.split_once("_NODE_") else {
            log::warn!(
                "query {}: skipping HSP, accession `{}` lacks the _NODE_ separator",
                query.query_id,
                accession
            );
            self.warnings.push(ParseWarning::MalformedSubjectId {
                query_id: query.query_id.clone(),
                accession: accession.to_string(),
            });
            return;
        };
        match MatchRecord::from_hsp(
            self.next_identifier,
            self.program,
            query,
            strain,
            node,
            hsp,
        ) {
            Ok(record) => {
                self.records.push(record);
                self.next_identifier += 1;
            }
            Err(source) => {
                log::warn!(
                    "query {}: rejecting HSP for `{}`: {}",
                    query.query_id,
                    accession,
                    source
                );
                self.warnings.push(ParseWarning::InvalidRecord {
                    query_id: query.query_id.clone(),
                    accession: accession.to_string(),
                    source,
                });
            }
        }
    }

    /// Close out the parse. A report with no queries at all, or one where
    /// every declared HSP was rejected, has nothing to report on; queries
    /// that legitimately found no hits are fine.
    pub(crate) fn finish(
        self,
        queries: Vec<QueryInfo>,
    ) -> Result<(ResultTable, Vec<ParseWarning>), ReportError> {
        if queries.is_empty() {
            return Err(ReportError::EmptyResult);
        }
        if self.records.is_empty() {
            let declared: u64 = queries.iter().map(|q| q.hit_count).sum();
            if declared > 0 {
                return Err(ReportError::EmptyResult);
            }
        }
        log::debug!(
            "parsed {} records across {} queries ({} skipped)",
            self.records.len(),
            queries.len(),
            self.warnings.len()
        );
        Ok((ResultTable::new(self.records, queries), self.warnings))
    }
}
