//! Domain models for the Tally server.

use serde_json::Value as JsonValue;
use utoipa::ToSchema;

pub mod document;
pub mod import;
pub mod project;
pub mod report;
pub mod result;
pub mod run;
pub mod task;

// Re-export commonly used types
pub use import::{ImportStatus, RunArchive};
pub use project::{CreateProjectRequest, ProjectResponse};
pub use report::{CreateReportRequest, ReportStatus, ReportView};
pub use result::ResultOutcome;
pub use run::{RunSummary, METADATA_BACKFILL_KEYS};
pub use task::{TaskState, TaskStatusResponse};

/// Query parameters shared by the list endpoints.
///
/// Kept flat: the urlencoded deserializer cannot drive `serde(flatten)`
/// through typed fields.
#[derive(Debug, Clone, serde::Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    /// 1-based page number.
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    /// Use the planner's row estimate instead of counting.
    pub estimate: Option<bool>,
    /// "exact" retries a timed-out count without the time budget.
    pub count_mode: Option<String>,
    /// Project id or name scoping the query.
    pub project: Option<String>,
}

fn default_page() -> u64 {
    1
}

fn default_page_size() -> u64 {
    25
}

impl ListParams {
    /// Requested page, clamped to at least 1.
    pub fn page(&self) -> u64 {
        self.page.unwrap_or(default_page()).max(1)
    }

    /// Page size clamped to 1..=500.
    pub fn page_size(&self) -> u64 {
        self.page_size.unwrap_or(default_page_size()).clamp(1, 500)
    }
}

/// Pagination metadata for responses.
#[derive(Debug, Clone, serde::Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u64,
    pub page_size: u64,
    pub total_items: u64,
    pub total_pages: u64,
}

impl Pagination {
    /// Create pagination metadata.
    pub fn new(page: u64, page_size: u64, total_items: u64) -> Self {
        let total_pages = if total_items == 0 {
            0
        } else {
            total_items.div_ceil(page_size)
        };

        Pagination {
            page,
            page_size,
            total_items,
            total_pages,
        }
    }
}

/// List response envelope: merged JSON documents plus pagination metadata.
#[derive(Debug, serde::Serialize, ToSchema)]
pub struct PagedDocuments {
    #[schema(value_type = Vec<Object>)]
    pub items: Vec<JsonValue>,
    pub pagination: Pagination,
}

/// Collect `filter=` values from a raw query string.
///
/// The parameter may be repeated and each occurrence may hold several
/// comma-separated expressions. Percent-encoding is decoded before splitting.
pub fn parse_filter_params(query: &str) -> Vec<String> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .filter(|(key, _)| *key == "filter")
        .filter_map(|(_, value)| urlencoding::decode(value).ok().map(|v| v.into_owned()))
        .flat_map(|value| {
            value
                .split(',')
                .map(|s| s.trim().to_string())
                .collect::<Vec<_>>()
        })
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_params() -> ListParams {
        ListParams {
            page: None,
            page_size: None,
            estimate: None,
            count_mode: None,
            project: None,
        }
    }

    #[test]
    fn test_pagination_math() {
        let p = Pagination::new(1, 25, 25);
        assert_eq!(p.total_pages, 1);

        let p = Pagination::new(1, 25, 26);
        assert_eq!(p.total_pages, 2);

        let p = Pagination::new(1, 25, 0);
        assert_eq!(p.total_pages, 0);

        let p = Pagination::new(3, 10, 95);
        assert_eq!(p.total_pages, 10);
    }

    #[test]
    fn test_list_params_defaults() {
        let params = bare_params();
        assert_eq!(params.page(), 1);
        assert_eq!(params.page_size(), 25);
    }

    #[test]
    fn test_list_params_clamping() {
        let params = ListParams {
            page: Some(0),
            page_size: Some(10_000),
            ..bare_params()
        };
        assert_eq!(params.page(), 1);
        assert_eq!(params.page_size(), 500);
    }

    #[test]
    fn test_parse_filter_params_repeated_and_comma_separated() {
        let filters = parse_filter_params("filter=result=failed&page=2&filter=env=prod,component=api");
        assert_eq!(
            filters,
            vec!["result=failed", "env=prod", "component=api"]
        );
    }

    #[test]
    fn test_parse_filter_params_percent_decoding() {
        let filters = parse_filter_params("filter=metadata.run%3D63fe5");
        assert_eq!(filters, vec!["metadata.run=63fe5"]);
    }

    #[test]
    fn test_parse_filter_params_empty() {
        assert!(parse_filter_params("page=1&pageSize=25").is_empty());
        assert!(parse_filter_params("filter=").is_empty());
    }
}
