//! JSON report parser (`-outfmt 15`).
//!
//! The document is a `BlastOutput2` list with one report per query. Serde
//! mirrors the parts of the schema this crate consumes; unknown fields are
//! ignored. The per-HSP midline is taken verbatim from the document.

use super::{BlastReport, RecordAssembler, ReportError};
use crate::record::Hsp;
use crate::types::{Program, QueryInfo};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Document {
    #[serde(rename = "BlastOutput2")]
    reports: Vec<ReportEnvelope>,
}

#[derive(Debug, Deserialize)]
struct ReportEnvelope {
    report: Report,
}

#[derive(Debug, Deserialize)]
struct Report {
    program: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    params: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    search_target: Option<SearchTarget>,
    results: Results,
}

#[derive(Debug, Deserialize)]
struct SearchTarget {
    #[serde(default)]
    db: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Results {
    search: Search,
}

#[derive(Debug, Deserialize)]
struct Search {
    query_id: String,
    #[serde(default)]
    query_title: Option<String>,
    query_len: u64,
    #[serde(default)]
    hits: Vec<Hit>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(default)]
    description: Vec<Description>,
    #[serde(default)]
    hsps: Vec<JsonHsp>,
}

#[derive(Debug, Deserialize)]
struct Description {
    accession: String,
}

#[derive(Debug, Deserialize)]
struct JsonHsp {
    bit_score: f64,
    score: u64,
    evalue: f64,
    identity: u64,
    #[serde(default)]
    positive: Option<u64>,
    query_from: u64,
    query_to: u64,
    #[serde(default)]
    query_strand: Option<String>,
    hit_from: u64,
    hit_to: u64,
    #[serde(default)]
    hit_strand: Option<String>,
    #[serde(default)]
    query_frame: Option<i8>,
    #[serde(default)]
    hit_frame: Option<i8>,
    align_len: u64,
    #[serde(default)]
    gaps: u64,
    qseq: String,
    hseq: String,
    midline: String,
}

impl JsonHsp {
    fn to_hsp(&self) -> Hsp {
        Hsp {
            bit_score: self.bit_score,
            score: self.score,
            evalue: self.evalue,
            identity: self.identity,
            positive: self.positive,
            query_from: self.query_from,
            query_to: self.query_to,
            hit_from: self.hit_from,
            hit_to: self.hit_to,
            query_strand: self.query_strand.clone(),
            hit_strand: self.hit_strand.clone(),
            query_frame: self.query_frame,
            hit_frame: self.hit_frame,
            align_len: self.align_len,
            gaps: self.gaps,
            gap_opens: None,
            qseq: self.qseq.clone(),
            hseq: self.hseq.clone(),
            midline: Some(self.midline.clone()),
        }
    }
}

pub(crate) fn parse_json(input: &str) -> Result<BlastReport, ReportError> {
    let document: Document = serde_json::from_str(input)?;
    let first = match document.reports.first() {
        Some(envelope) => &envelope.report,
        None => return Err(ReportError::EmptyResult),
    };
    let program = Program::from_name(&first.program)
        .ok_or_else(|| ReportError::UnsupportedProgram(first.program.clone()))?;
    let version = first.version.clone();
    let database = first.search_target.as_ref().and_then(|t| t.db.clone());
    let params = first
        .params
        .iter()
        .map(|(key, value)| (key.clone(), param_string(value)))
        .collect();

    let mut assembler = RecordAssembler::new(program);
    let mut queries = Vec::with_capacity(document.reports.len());
    for envelope in &document.reports {
        let search = &envelope.report.results.search;
        let query = QueryInfo {
            query_id: search.query_id.clone(),
            query_title: search
                .query_title
                .clone()
                .unwrap_or_else(|| search.query_id.clone()),
            query_len: search.query_len,
            hit_count: search.hits.iter().map(|h| h.hsps.len() as u64).sum(),
            message: search.message.clone(),
        };
        for hit in &search.hits {
            let accession = hit
                .description
                .first()
                .map(|d| d.accession.as_str())
                .unwrap_or("");
            for hsp in &hit.hsps {
                assembler.push(&query, accession, &hsp.to_hsp());
            }
        }
        queries.push(query);
    }

    let (table, warnings) = assembler.finish(queries)?;
    Ok(BlastReport {
        program,
        version,
        database,
        params,
        table,
        warnings,
    })
}

fn param_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
