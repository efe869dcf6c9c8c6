//! The fixed set of structured values the gateway knows how to marshal.
//!
//! All of them travel as JSON objects. Missing fields take their default, so
//! an empty wire value decodes to the all-default struct.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Array criterion for knowledge-db filtering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbArrayFilter {
    /// All entries of `filter_data` must match, instead of any.
    pub need_all: bool,
    pub filter_data: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbJsonFilter {
    pub field_name: String,
    pub field_type: String,
    pub filter_data: Vec<String>,
    pub need_all: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbFilters {
    pub guid_filter: Vec<String>,
    pub document_id_filter: Vec<String>,
    pub document_name_filter: Vec<String>,
    pub level_filter: Vec<String>,
    pub tags_filter: DbArrayFilter,
    pub keywords_filter: DbArrayFilter,
    pub metadata_filter: Vec<DbJsonFilter>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbResponse {
    pub guid: String,
    pub document_id: String,
    pub document_name: String,
    pub text: String,
    pub keywords: Vec<String>,
    pub summary: String,
    pub level: String,
    pub parent_id: String,
    pub child_ids: Vec<String>,
    pub distance: f64,
    pub metadata: BTreeMap<String, String>,
}

/// One turn of a conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoricMessage {
    pub role: String,
    pub content: String,
}

impl HistoricMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}
