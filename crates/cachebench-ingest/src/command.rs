//! Control command texts.

use std::fmt;

use cachebench_core::MappingKind;

use crate::config::{BatchingPolicy, format_time_span};

/// An administrative command sent to the warehouse management endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand<'a> {
    /// `.create table <T> <schema>`
    CreateTable { table: &'a str, schema: &'a str },
    /// `.alter-merge table <T> <schema>`; only adds missing columns.
    AlterMergeTable { table: &'a str, schema: &'a str },
    /// `.alter table <T> policy ingestionbatching '<json>'`
    AlterBatchingPolicy {
        table: &'a str,
        policy: &'a BatchingPolicy,
    },
    /// `.create-or-alter table <T> ingestion <kind> mapping '<name>' '<value>'`
    CreateOrAlterMapping {
        table: &'a str,
        kind: MappingKind,
        name: &'a str,
        value: &'a str,
    },
}

impl fmt::Display for ControlCommand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateTable { table, schema } => write!(f, ".create table {table} {schema}"),
            Self::AlterMergeTable { table, schema } => {
                write!(f, ".alter-merge table {table} {schema}")
            }
            Self::AlterBatchingPolicy { table, policy } => {
                let policy = serde_json::json!({
                    "MaximumBatchingTimeSpan": format_time_span(policy.batching_time_span()),
                    "MaximumNumberOfItems": policy.maximum_number_of_items,
                    "MaximumRawDataSizeMB": policy.maximum_raw_data_size_mb,
                });
                write!(f, ".alter table {table} policy ingestionbatching '{policy}'")
            }
            Self::CreateOrAlterMapping {
                table,
                kind,
                name,
                value,
            } => write!(
                f,
                ".create-or-alter table {table} ingestion {kind} mapping '{name}' '{value}'"
            ),
        }
    }
}

/// Returns the query counting every row of `table`.
pub fn row_count_query(table: &str) -> String {
    format!("{table} | count")
}
