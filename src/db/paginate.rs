//! Pagination with bounded counting.
//!
//! Counting an arbitrarily filtered JSONB query can be slower than fetching
//! the page itself, so counts run under a statement timeout. When the timeout
//! fires the caller either gets a capped total (fast mode) or a second,
//! unbounded count (exact mode). Callers can also ask for a planner estimate
//! instead of a real count.

use sea_orm::{
    ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QuerySelect, QueryTrait,
    Select, TransactionTrait,
};
use serde_json::Value as JsonValue;

use crate::config::QueryConfig;
use crate::error::{AppError, AppResult};
use crate::models::Pagination;

/// Ceiling reported for counts that hit the statement timeout in fast mode.
pub const MAX_DOCUMENTS: u64 = 100_000;

/// How to behave when the count times out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CountPolicy {
    /// Report [`MAX_DOCUMENTS`] and mark the total as capped.
    #[default]
    Fast,
    /// Retry the count without a timeout.
    Exact,
}

impl CountPolicy {
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("exact") => Self::Exact,
            _ => Self::Fast,
        }
    }
}

/// A total that may be capped by the fast-count policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentCount {
    pub total: u64,
    pub capped: bool,
}

/// One page worth of query parameters, resolved from the request.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    pub page: u64,
    pub page_size: u64,
    pub estimate: bool,
    pub policy: CountPolicy,
}

impl PageRequest {
    pub fn offset(&self) -> u64 {
        (self.page - 1) * self.page_size
    }
}

impl From<&crate::models::ListParams> for PageRequest {
    fn from(params: &crate::models::ListParams) -> Self {
        PageRequest {
            page: params.page(),
            page_size: params.page_size(),
            estimate: params.estimate.unwrap_or(false),
            policy: CountPolicy::from_param(params.count_mode.as_deref()),
        }
    }
}

/// Counts the documents matched by `select` under a statement timeout.
pub async fn count_documents<E: EntityTrait>(
    db: &DatabaseConnection,
    select: Select<E>,
    timeout_ms: u64,
    policy: CountPolicy,
) -> AppResult<DocumentCount>
where
    E::Model: Sync,
{
    let txn = db
        .begin()
        .await
        .map_err(|e| AppError::Database(format!("Failed to open count transaction: {}", e)))?;
    txn.execute_unprepared(&format!("SET LOCAL statement_timeout = '{}ms'", timeout_ms))
        .await
        .map_err(|e| AppError::Database(format!("Failed to set count timeout: {}", e)))?;

    match select.clone().count(&txn).await {
        Ok(total) => {
            txn.commit()
                .await
                .map_err(|e| AppError::Database(format!("Failed to finish count: {}", e)))?;
            Ok(DocumentCount {
                total,
                capped: false,
            })
        }
        Err(err) if is_statement_timeout(&err) => {
            let _ = txn.rollback().await;
            match policy {
                CountPolicy::Fast => Ok(DocumentCount {
                    total: MAX_DOCUMENTS,
                    capped: true,
                }),
                CountPolicy::Exact => {
                    let total = select
                        .count(db)
                        .await
                        .map_err(|e| AppError::Database(format!("Failed to count: {}", e)))?;
                    Ok(DocumentCount {
                        total,
                        capped: false,
                    })
                }
            }
        }
        Err(err) => {
            let _ = txn.rollback().await;
            Err(AppError::Database(format!("Failed to count: {}", err)))
        }
    }
}

/// Asks the query planner how many rows `select` would return.
pub async fn estimate_count<E: EntityTrait>(
    db: &DatabaseConnection,
    select: Select<E>,
) -> AppResult<u64> {
    let mut stmt = select.build(db.get_database_backend());
    stmt.sql = format!("EXPLAIN (FORMAT JSON) {}", stmt.sql);
    let row = db
        .query_one_raw(stmt)
        .await
        .map_err(|e| AppError::Database(format!("Failed to estimate count: {}", e)))?
        .ok_or_else(|| AppError::Database("Query plan returned no rows".to_string()))?;
    let plan: JsonValue = row
        .try_get_by_index(0)
        .map_err(|e| AppError::Database(format!("Failed to read query plan: {}", e)))?;
    plan_rows(&plan)
        .ok_or_else(|| AppError::Database("Query plan had no row estimate".to_string()))
}

/// Planner estimate when the table is large, exact count when it is small
/// enough that exactness is cheap.
pub async fn estimated_or_exact_count<E: EntityTrait>(
    db: &DatabaseConnection,
    select: Select<E>,
    threshold: u64,
) -> AppResult<u64>
where
    E::Model: Sync,
{
    let estimate = estimate_count(db, select.clone()).await?;
    if estimate >= threshold {
        return Ok(estimate);
    }
    select
        .count(db)
        .await
        .map_err(|e| AppError::Database(format!("Failed to count: {}", e)))
}

/// Counts and fetches one page. The select's ordering is preserved.
pub async fn paginate<E: EntityTrait>(
    db: &DatabaseConnection,
    select: Select<E>,
    request: &PageRequest,
    query_config: &QueryConfig,
) -> AppResult<(Vec<E::Model>, Pagination)>
where
    E::Model: Sync,
{
    let count = if request.estimate {
        DocumentCount {
            total: estimated_or_exact_count(db, select.clone(), query_config.estimate_threshold)
                .await?,
            capped: false,
        }
    } else {
        count_documents(
            db,
            select.clone(),
            query_config.count_timeout_ms,
            request.policy,
        )
        .await?
    };

    let offset = request.offset();
    if cap_excludes_offset(&count, offset) {
        return Err(AppError::InvalidInput(format!(
            "Page {} is beyond the countable window of {} documents",
            request.page, count.total
        )));
    }

    let items = select
        .offset(offset)
        .limit(request.page_size)
        .all(db)
        .await
        .map_err(|e| AppError::Database(format!("Failed to fetch page: {}", e)))?;

    Ok((
        items,
        Pagination::new(request.page, request.page_size, count.total),
    ))
}

fn is_statement_timeout(err: &sea_orm::DbErr) -> bool {
    let text = err.to_string().to_lowercase();
    text.contains("statement timeout") || text.contains("57014")
}

fn plan_rows(plan: &JsonValue) -> Option<u64> {
    plan.get(0)?
        .get("Plan")?
        .get("Plan Rows")?
        .as_f64()
        .map(|rows| rows.max(0.0) as u64)
}

fn cap_excludes_offset(count: &DocumentCount, offset: u64) -> bool {
    count.capped && offset >= count.total
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_count_policy_from_param() {
        assert_eq!(CountPolicy::from_param(None), CountPolicy::Fast);
        assert_eq!(CountPolicy::from_param(Some("fast")), CountPolicy::Fast);
        assert_eq!(CountPolicy::from_param(Some("exact")), CountPolicy::Exact);
        assert_eq!(CountPolicy::from_param(Some("bogus")), CountPolicy::Fast);
    }

    #[test]
    fn test_statement_timeout_detection() {
        let err = sea_orm::DbErr::Custom(
            "canceling statement due to statement timeout".to_string(),
        );
        assert!(is_statement_timeout(&err));
        let err = sea_orm::DbErr::Custom("SQLSTATE 57014".to_string());
        assert!(is_statement_timeout(&err));
        let err = sea_orm::DbErr::Custom("connection refused".to_string());
        assert!(!is_statement_timeout(&err));
    }

    #[test]
    fn test_plan_rows_extraction() {
        let plan = json!([{"Plan": {"Node Type": "Seq Scan", "Plan Rows": 123456.0}}]);
        assert_eq!(plan_rows(&plan), Some(123456));
        assert_eq!(plan_rows(&json!([])), None);
        assert_eq!(plan_rows(&json!([{"Plan": {}}])), None);
    }

    #[test]
    fn test_capped_count_excludes_pages_past_the_cap() {
        let capped = DocumentCount {
            total: MAX_DOCUMENTS,
            capped: true,
        };
        assert!(!cap_excludes_offset(&capped, 0));
        assert!(!cap_excludes_offset(&capped, MAX_DOCUMENTS - 1));
        assert!(cap_excludes_offset(&capped, MAX_DOCUMENTS));
        let exact = DocumentCount {
            total: 10,
            capped: false,
        };
        assert!(!cap_excludes_offset(&exact, 50));
    }

    #[test]
    fn test_page_request_offset() {
        let request = PageRequest {
            page: 3,
            page_size: 25,
            estimate: false,
            policy: CountPolicy::Fast,
        };
        assert_eq!(request.offset(), 50);
    }
}
