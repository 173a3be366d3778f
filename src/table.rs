//! Queryable result tables.
//!
//! A [`ResultTable`] owns every [`MatchRecord`] of one parsed report in
//! document order, together with the per-query metadata. Filtering,
//! grouping, and sorting all produce borrowed [`ResultView`]s over the same
//! records; the table itself is never mutated and records are never copied.

use crate::record::MatchRecord;
use crate::types::{Program, QueryInfo};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("filter threshold {value} falls outside [0, 100]")]
    InvalidThreshold { value: f64 },
    #[error("unknown record identifier {0}")]
    UnknownIdentifier(u64),
}

/// All records of one report, indexed by their stable identifier.
#[derive(Debug)]
pub struct ResultTable {
    records: Vec<MatchRecord>,
    queries: Vec<QueryInfo>,
    by_identifier: HashMap<u64, usize>,
}

impl ResultTable {
    /// Build a table from records in document order. Parsers do this;
    /// callers with records of their own may too.
    pub fn new(records: Vec<MatchRecord>, queries: Vec<QueryInfo>) -> ResultTable {
        let by_identifier = records
            .iter()
            .enumerate()
            .map(|(index, record)| (record.identifier, index))
            .collect();
        ResultTable {
            records,
            queries,
            by_identifier,
        }
    }

    pub fn records(&self) -> &[MatchRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Query metadata in document order, including hitless queries.
    pub fn queries(&self) -> &[QueryInfo] {
        &self.queries
    }

    pub fn query(&self, query_id: &str) -> Option<&QueryInfo> {
        self.queries.iter().find(|q| q.query_id == query_id)
    }

    /// A view over every record, in document order.
    pub fn view(&self) -> ResultView<'_> {
        ResultView {
            records: self.records.iter().collect(),
        }
    }

    /// Records passing both thresholds, preserving document order.
    pub fn filtered(
        &self,
        min_identity: f64,
        min_coverage: f64,
    ) -> Result<ResultView<'_>, TableError> {
        for value in [min_identity, min_coverage] {
            if !(0.0..=100.0).contains(&value) {
                return Err(TableError::InvalidThreshold { value });
            }
        }
        Ok(ResultView {
            records: self
                .records
                .iter()
                .filter(|r| {
                    r.perc_identity as f64 >= min_identity
                        && r.perc_alignment as f64 >= min_coverage
                })
                .collect(),
        })
    }

    /// Resolve selected rows back to records, in the order requested.
    pub fn by_identifier(&self, ids: &[u64]) -> Result<Vec<&MatchRecord>, TableError> {
        ids.iter()
            .map(|id| {
                self.by_identifier
                    .get(id)
                    .map(|&index| &self.records[index])
                    .ok_or(TableError::UnknownIdentifier(*id))
            })
            .collect()
    }

    /// All records of one query. Empty for unknown or hitless queries.
    pub fn group_by_query(&self, query_id: &str) -> ResultView<'_> {
        ResultView {
            records: self
                .records
                .iter()
                .filter(|r| r.query_id == query_id)
                .collect(),
        }
    }
}

/// Sort orders offered to the result grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// Percent identity descending, coverage descending — the grid default.
    IdentityThenCoverage,
    /// E-value ascending, ties broken by bit score descending.
    Evalue,
    /// Bit score descending.
    BitScore,
}

/// A read-only, borrowed subset of a table.
#[derive(Debug, Clone)]
pub struct ResultView<'a> {
    records: Vec<&'a MatchRecord>,
}

impl<'a> ResultView<'a> {
    pub fn records(&self) -> &[&'a MatchRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a MatchRecord> + '_ {
        self.records.iter().copied()
    }

    /// A re-ordered copy of this view. Sorting is stable, so equal keys keep
    /// their document order.
    pub fn sorted_by(&self, key: SortKey) -> ResultView<'a> {
        let mut records = self.records.clone();
        match key {
            SortKey::IdentityThenCoverage => records.sort_by(|a, b| {
                (b.perc_identity, b.perc_alignment).cmp(&(a.perc_identity, a.perc_alignment))
            }),
            SortKey::Evalue => records.sort_by(|a, b| {
                a.evalue
                    .total_cmp(&b.evalue)
                    .then(b.bit_score.total_cmp(&a.bit_score))
            }),
            SortKey::BitScore => records.sort_by(|a, b| b.bit_score.total_cmp(&a.bit_score)),
        }
        ResultView { records }
    }
}

/// Columns the result grid can display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    QueryTitle,
    Strain,
    Node,
    PercIdentity,
    PercAlignment,
    QueryLen,
    AlignLength,
    IdentityCount,
    PositiveCount,
    MismatchCount,
    GapOpens,
    QueryStart,
    QueryEnd,
    SubjectStart,
    SubjectEnd,
    Evalue,
    BitScore,
    QueryFrame,
    SubjectFrame,
    Identifier,
}

impl Column {
    pub fn header(&self) -> &'static str {
        match self {
            Column::QueryTitle => "query_title",
            Column::Strain => "strain",
            Column::Node => "node",
            Column::PercIdentity => "perc_identity",
            Column::PercAlignment => "perc_alignment",
            Column::QueryLen => "query_len",
            Column::AlignLength => "align_len",
            Column::IdentityCount => "identity",
            Column::PositiveCount => "positive",
            Column::MismatchCount => "mismatch",
            Column::GapOpens => "gap_opens",
            Column::QueryStart => "query_start",
            Column::QueryEnd => "query_end",
            Column::SubjectStart => "subject_start",
            Column::SubjectEnd => "subject_end",
            Column::Evalue => "evalue",
            Column::BitScore => "bit_score",
            Column::QueryFrame => "query_frame",
            Column::SubjectFrame => "subject_frame",
            Column::Identifier => "id",
        }
    }
}

/// The column set the grid shows for a program: blastn has no positives or
/// frames, translated programs add the frame of their translated side(s).
pub fn display_columns(program: Program) -> &'static [Column] {
    use Column::*;
    match program {
        Program::Blastn => &[
            QueryTitle, Strain, Node, PercIdentity, PercAlignment, QueryLen, AlignLength,
            IdentityCount, MismatchCount, GapOpens, QueryStart, QueryEnd, SubjectStart,
            SubjectEnd, Evalue, BitScore, Identifier,
        ],
        Program::Blastp => &[
            QueryTitle, Strain, Node, PercIdentity, PercAlignment, QueryLen, AlignLength,
            IdentityCount, PositiveCount, MismatchCount, GapOpens, QueryStart, QueryEnd,
            SubjectStart, SubjectEnd, Evalue, BitScore, Identifier,
        ],
        Program::Blastx => &[
            QueryTitle, Strain, Node, PercIdentity, PercAlignment, QueryLen, AlignLength,
            IdentityCount, PositiveCount, MismatchCount, GapOpens, QueryStart, QueryEnd,
            SubjectStart, SubjectEnd, Evalue, BitScore, QueryFrame, Identifier,
        ],
        Program::Tblastn => &[
            QueryTitle, Strain, Node, PercIdentity, PercAlignment, QueryLen, AlignLength,
            IdentityCount, PositiveCount, MismatchCount, GapOpens, QueryStart, QueryEnd,
            SubjectStart, SubjectEnd, Evalue, BitScore, SubjectFrame, Identifier,
        ],
        Program::Tblastx => &[
            QueryTitle, Strain, Node, PercIdentity, PercAlignment, QueryLen, AlignLength,
            IdentityCount, PositiveCount, MismatchCount, GapOpens, QueryStart, QueryEnd,
            SubjectStart, SubjectEnd, Evalue, BitScore, QueryFrame, SubjectFrame, Identifier,
        ],
    }
}

impl MatchRecord {
    /// The display value of one grid cell. Fields a record does not carry
    /// (positives for blastn, absent frames) render as an empty string.
    pub fn column_value(&self, column: Column) -> String {
        match column {
            Column::QueryTitle => self.query_title.clone(),
            Column::Strain => self.strain.clone(),
            Column::Node => self.node.clone(),
            Column::PercIdentity => self.perc_identity.to_string(),
            Column::PercAlignment => self.perc_alignment.to_string(),
            Column::QueryLen => self.query_len.to_string(),
            Column::AlignLength => self.align_length.to_string(),
            Column::IdentityCount => self.identity_count.to_string(),
            Column::PositiveCount => opt_string(self.positive_count),
            Column::MismatchCount => self.mismatch_count.to_string(),
            Column::GapOpens => opt_string(self.gap_opens),
            Column::QueryStart => self.query_start.to_string(),
            Column::QueryEnd => self.query_end.to_string(),
            Column::SubjectStart => self.subject_start.to_string(),
            Column::SubjectEnd => self.subject_end.to_string(),
            Column::Evalue => format!("{:e}", self.evalue),
            Column::BitScore => self.bit_score.to_string(),
            Column::QueryFrame => opt_string(self.query_frame),
            Column::SubjectFrame => opt_string(self.subject_frame),
            Column::Identifier => self.identifier.to_string(),
        }
    }
}

fn opt_string<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
