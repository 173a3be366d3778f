//! Commented tabular report parser (`-outfmt 7`).
//!
//! The front-end runs BLAST with a fixed 23-column field list (identical for
//! all five programs) and appends a `# [PARAMS] ... # [END PARAMS]` comment
//! block to round-trip the search parameters through the file:
//!
//! ```text
//! qaccver saccver nident pident qlen length qcovhsp gaps gapopen mismatch
//! positive ppos qstart qend sstart send qframe sframe score evalue bitscore
//! qseq sseq
//! ```
//!
//! Derived percentages are recomputed from the counts rather than trusted
//! from the file; tabular reports carry no midline, so the renderer
//! reconstructs one on demand. Orientation comes from the frame columns
//! (blastn reports strandedness as `sframe` ±1) with the coordinate order as
//! a fallback.

use super::{BlastReport, RecordAssembler, ReportError};
use crate::record::Hsp;
use crate::types::{Program, QueryInfo};
use regex::Regex;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::OnceLock;

const COLUMNS: usize = 23;

fn program_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^# ([A-Za-z]+) ([\d][\w.+-]*)\s*$").expect("valid regex")
    })
}

fn query_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^# Query: (.+)$").expect("valid regex"))
}

fn database_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^# Database: (.+)$").expect("valid regex"))
}

fn hits_found_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^# (\d+) hits found").expect("valid regex"))
}

fn param_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^# ([^:]+):\s*(.*)$").expect("valid regex"))
}

pub(crate) fn parse_tabular(input: &str) -> Result<BlastReport, ReportError> {
    let mut program: Option<Program> = None;
    let mut version = String::new();
    let mut database: Option<String> = None;
    let mut params: BTreeMap<String, String> = BTreeMap::new();
    let mut queries: Vec<QueryInfo> = Vec::new();
    let mut current: Option<QueryInfo> = None;
    let mut assembler: Option<RecordAssembler> = None;
    let mut in_params = false;

    for (index, raw_line) in input.lines().enumerate() {
        let line_no = index + 1;
        let line = raw_line.trim_end();
        if line.is_empty() {
            continue;
        }

        if line.starts_with('#') {
            if line.starts_with("# [PARAMS]") {
                in_params = true;
            } else if line.starts_with("# [END PARAMS]") {
                in_params = false;
            } else if in_params {
                if let Some(captures) = param_line().captures(line) {
                    params.insert(
                        captures[1].trim().to_string(),
                        captures[2].trim().to_string(),
                    );
                }
            } else if let Some(captures) = query_line().captures(line) {
                if let Some(finished) = current.take() {
                    queries.push(finished);
                }
                let title = captures[1].trim().to_string();
                let id = title
                    .split_whitespace()
                    .next()
                    .unwrap_or(title.as_str())
                    .to_string();
                current = Some(QueryInfo {
                    query_id: id,
                    query_title: title,
                    query_len: 0,
                    hit_count: 0,
                    message: None,
                });
            } else if let Some(captures) = database_line().captures(line) {
                database = Some(captures[1].trim().to_string());
            } else if let Some(captures) = hits_found_line().captures(line) {
                let count: u64 =
                    captures[1].parse().map_err(|_| ReportError::Tabular {
                        line: line_no,
                        message: format!("invalid hit count `{}`", &captures[1]),
                    })?;
                match current.as_mut() {
                    Some(query) => query.hit_count = count,
                    None => {
                        return Err(ReportError::Tabular {
                            line: line_no,
                            message: "hits-found line before any query".to_string(),
                        })
                    }
                }
            } else if let Some(captures) = program_line().captures(line) {
                let name = &captures[1];
                let parsed = Program::from_name(name)
                    .ok_or_else(|| ReportError::UnsupportedProgram(name.to_string()))?;
                program = Some(parsed);
                version = captures[2].to_string();
            }
            continue;
        }

        // Data row.
        let program = program.ok_or_else(|| ReportError::Tabular {
            line: line_no,
            message: "data row before the program header".to_string(),
        })?;
        let assembler = assembler.get_or_insert_with(|| RecordAssembler::new(program));
        let query = current.as_mut().ok_or_else(|| ReportError::Tabular {
            line: line_no,
            message: "data row outside a query block".to_string(),
        })?;

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < COLUMNS {
            return Err(ReportError::Tabular {
                line: line_no,
                message: format!(
                    "expected {} tab-separated columns, found {}",
                    COLUMNS,
                    fields.len()
                ),
            });
        }

        if query.query_len == 0 {
            // First row of this query: the row carries the query accession
            // and length the comment block does not.
            query.query_id = fields[0].to_string();
            query.query_len = field(&fields, 4, "qlen", line_no)?;
        }

        let hsp = Hsp {
            identity: field(&fields, 2, "nident", line_no)?,
            align_len: field(&fields, 5, "length", line_no)?,
            gaps: field(&fields, 7, "gaps", line_no)?,
            gap_opens: Some(field(&fields, 8, "gapopen", line_no)?),
            positive: fields[10].parse().ok(),
            query_from: field(&fields, 12, "qstart", line_no)?,
            query_to: field(&fields, 13, "qend", line_no)?,
            hit_from: field(&fields, 14, "sstart", line_no)?,
            hit_to: field(&fields, 15, "send", line_no)?,
            query_frame: fields[16].parse().ok(),
            hit_frame: fields[17].parse().ok(),
            score: field(&fields, 18, "score", line_no)?,
            evalue: field(&fields, 19, "evalue", line_no)?,
            bit_score: field(&fields, 20, "bitscore", line_no)?,
            qseq: fields[21].to_string(),
            hseq: fields[22].to_string(),
            query_strand: None,
            hit_strand: None,
            midline: None,
        };
        assembler.push(query, fields[1], &hsp);
    }

    if let Some(finished) = current.take() {
        queries.push(finished);
    }
    let program = program.ok_or_else(|| ReportError::Tabular {
        line: 0,
        message: "missing program header".to_string(),
    })?;
    let assembler = assembler.unwrap_or_else(|| RecordAssembler::new(program));
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

fn field<T: FromStr>(
    fields: &[&str],
    index: usize,
    name: &str,
    line: usize,
) -> Result<T, ReportError> {
    fields[index].parse().map_err(|_| ReportError::Tabular {
        line,
        message: format!("invalid {name}: `{}`", fields[index]),
    })
}
