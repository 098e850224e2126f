//! Builds SQL predicates from parsed filters and attaches them to queries.

use sea_orm::sea_query::Expr;
use sea_orm::{EntityTrait, QueryFilter, Select, Value};
use tracing::debug;
use uuid::Uuid;

use crate::filters::column::{self, ColumnKind, ColumnSet, JsonShape, ResolvedColumn};
use crate::filters::parser::{self, FilterExpression, FilterOp, FilterValue};

/// Applies each filter expression to the query. Expressions that do not
/// parse, name an unknown field or carry an unusable value are dropped.
pub fn apply_filters<E: EntityTrait>(
    mut select: Select<E>,
    filters: &[String],
    columns: &ColumnSet,
) -> Select<E> {
    for expression in filters {
        match build_predicate(expression, columns) {
            Some(predicate) => select = select.filter(predicate),
            None => debug!(filter = %expression, "dropping unusable filter expression"),
        }
    }
    select
}

/// Builds one SQL predicate, or `None` when the expression is unusable.
pub fn build_predicate(expression: &str, columns: &ColumnSet) -> Option<Expr> {
    let filter = parser::parse(expression)?;
    let column = column::resolve(&filter.field, columns)?;
    predicate(&column, &filter)
}

fn predicate(column: &ResolvedColumn, filter: &FilterExpression) -> Option<Expr> {
    if column.is_array() {
        // Array paths only support containment, overlap and existence.
        return match filter.op {
            FilterOp::Eq => Some(containment_predicate(column, filter)),
            FilterOp::In => in_predicate(column, filter),
            FilterOp::Exists => Some(exists_predicate(column, exists_wanted(filter))),
            _ => None,
        };
    }
    match filter.op {
        FilterOp::Exists => Some(exists_predicate(column, exists_wanted(filter))),
        FilterOp::In => in_predicate(column, filter),
        FilterOp::Regex => Some(Expr::cust_with_values(
            format!("{} ~ $1", column.text_sql()),
            [Value::from(filter.raw_value.clone())],
        )),
        FilterOp::Ilike => Some(Expr::cust_with_values(
            format!("{} ILIKE $1", column.text_sql()),
            [Value::from(format!("%{}%", filter.raw_value))],
        )),
        op => comparison_predicate(column, op, filter),
    }
}

fn exists_wanted(filter: &FilterExpression) -> bool {
    matches!(filter.value, FilterValue::Bool(true))
}

fn exists_predicate(column: &ResolvedColumn, wanted: bool) -> Expr {
    let clause = if wanted { "IS NOT NULL" } else { "IS NULL" };
    Expr::cust(format!("{} {}", column.null_sql(), clause))
}

/// Array contains the given member: `data #> '{...}' @> '["member"]'`.
fn containment_predicate(column: &ResolvedColumn, filter: &FilterExpression) -> Expr {
    Expr::cust_with_values(
        format!("{} @> $1", column.null_sql()),
        [Value::from(serde_json::json!([filter.raw_value]))],
    )
}

fn comparison_predicate(
    column: &ResolvedColumn,
    op: FilterOp,
    filter: &FilterExpression,
) -> Option<Expr> {
    let sql_op = match op {
        FilterOp::Eq => "=",
        FilterOp::Ne => "<>",
        FilterOp::Gt => ">",
        FilterOp::Lt => "<",
        FilterOp::Gte => ">=",
        FilterOp::Lte => "<=",
        _ => return None,
    };
    let value = bind_value(bind_kind(column), filter)?;
    Some(Expr::cust_with_values(
        format!("{} {} $1", column.compare_sql(), sql_op),
        [value],
    ))
}

fn in_predicate(column: &ResolvedColumn, filter: &FilterExpression) -> Option<Expr> {
    let FilterValue::List(items) = &filter.value else {
        return None;
    };
    let members: Vec<&str> = items
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .collect();
    if members.is_empty() {
        return None;
    }

    if column.is_array() {
        // Overlap: any listed member present in the stored array.
        let placeholders: Vec<String> = (1..=members.len()).map(|n| format!("${n}")).collect();
        let values: Vec<Value> = members
            .iter()
            .map(|member| Value::from((*member).to_string()))
            .collect();
        return Some(Expr::cust_with_values(
            format!(
                "jsonb_exists_any({}, array[{}])",
                column.null_sql(),
                placeholders.join(", ")
            ),
            values,
        ));
    }

    let kind = bind_kind(column);
    let values: Vec<Value> = members
        .iter()
        .filter_map(|member| member_value(kind, member))
        .collect();
    if values.is_empty() {
        return None;
    }
    let placeholders: Vec<String> = (1..=values.len()).map(|n| format!("${n}")).collect();
    Some(Expr::cust_with_values(
        format!("{} IN ({})", column.compare_sql(), placeholders.join(", ")),
        values,
    ))
}

fn bind_kind(column: &ResolvedColumn) -> ColumnKind {
    match column {
        ResolvedColumn::Scalar { kind, .. } => *kind,
        ResolvedColumn::Json {
            shape: JsonShape::Numeric,
            ..
        } => ColumnKind::Double,
        ResolvedColumn::Json { .. } => ColumnKind::Text,
    }
}

/// Adapts the parsed value to the column's bind type. Values that cannot be
/// adapted (a malformed UUID, a non-numeric string against a numeric column)
/// make the whole predicate unusable.
fn bind_value(kind: ColumnKind, filter: &FilterExpression) -> Option<Value> {
    match kind {
        ColumnKind::Text => Some(Value::from(filter.raw_value.clone())),
        ColumnKind::Double => numeric_value(filter).map(Value::from),
        _ => member_value(kind, &filter.raw_value),
    }
}

fn member_value(kind: ColumnKind, member: &str) -> Option<Value> {
    match kind {
        ColumnKind::Uuid => Uuid::parse_str(member).ok().map(Value::from),
        ColumnKind::Text => Some(Value::from(member.to_string())),
        ColumnKind::Timestamp => parse_timestamp(member).map(Value::from),
        ColumnKind::Double => member.parse::<f64>().ok().map(Value::from),
        ColumnKind::Integer => member.parse::<i64>().ok().map(Value::from),
    }
}

fn numeric_value(filter: &FilterExpression) -> Option<f64> {
    match &filter.value {
        FilterValue::Int(number) => Some(*number as f64),
        FilterValue::Float(number) => Some(*number),
        // Version-like strings kept textual by the parser still work here.
        FilterValue::Str(_) => filter.raw_value.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn parse_timestamp(value: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    let value = value.trim();
    if let Ok(parsed) = chrono::DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&chrono::Utc));
    }
    if let Ok(parsed) = chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(parsed.and_utc());
    }
    if let Ok(parsed) = chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(parsed.and_hms_opt(0, 0, 0)?.and_utc());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{result, run};
    use crate::filters::column::{RESULT_COLUMNS, RUN_COLUMNS};
    use sea_orm::{DbBackend, EntityTrait, QueryTrait};

    fn result_sql(filters: &[&str]) -> String {
        let filters: Vec<String> = filters.iter().map(|f| f.to_string()).collect();
        apply_filters(result::Entity::find(), &filters, &RESULT_COLUMNS)
            .build(DbBackend::Postgres)
            .to_string()
    }

    fn run_sql(filters: &[&str]) -> String {
        let filters: Vec<String> = filters.iter().map(|f| f.to_string()).collect();
        apply_filters(run::Entity::find(), &filters, &RUN_COLUMNS)
            .build(DbBackend::Postgres)
            .to_string()
    }

    #[test]
    fn test_scalar_equality() {
        let sql = result_sql(&["result=failed"]);
        assert!(sql.contains("result = 'failed'"), "{sql}");
    }

    #[test]
    fn test_metadata_path_equality() {
        let sql = result_sql(&["metadata.run=63fe5"]);
        assert!(sql.contains("data #>> '{metadata,run}' = '63fe5'"), "{sql}");
    }

    #[test]
    fn test_summary_counter_compares_numerically() {
        let sql = run_sql(&["summary.failures>0"]);
        assert!(
            sql.contains("(data #>> '{summary,failures}')::double precision >"),
            "{sql}"
        );
    }

    #[test]
    fn test_version_like_value_still_binds_on_numeric_column() {
        let sql = run_sql(&["duration>1.5"]);
        assert!(sql.contains("duration >"), "{sql}");
    }

    #[test]
    fn test_substring_match_wraps_with_wildcards() {
        let sql = result_sql(&["component%api"]);
        assert!(sql.contains("component ILIKE '%api%'"), "{sql}");
    }

    #[test]
    fn test_regex_on_uuid_column_casts_to_text() {
        let sql = result_sql(&["id~^0195"]);
        assert!(sql.contains("id::text ~ '^0195'"), "{sql}");
    }

    #[test]
    fn test_in_list_on_scalar() {
        let sql = result_sql(&["env*prod;stage"]);
        assert!(sql.contains("env IN ('prod', 'stage')"), "{sql}");
    }

    #[test]
    fn test_in_list_on_array_path_uses_overlap() {
        let sql = run_sql(&["metadata.tags*smoke;nightly"]);
        assert!(
            sql.contains("jsonb_exists_any(data #> '{metadata,tags}', array['smoke', 'nightly'])"),
            "{sql}"
        );
    }

    #[test]
    fn test_array_equality_uses_containment() {
        let sql = run_sql(&["metadata.tags=smoke"]);
        assert!(sql.contains("data #> '{metadata,tags}' @>"), "{sql}");
    }

    #[test]
    fn test_array_path_rejects_ordering_operators() {
        let unfiltered = run_sql(&[]);
        assert_eq!(run_sql(&["metadata.tags>smoke"]), unfiltered);
        assert_eq!(run_sql(&["metadata.tags%smo"]), unfiltered);
    }

    #[test]
    fn test_exists_checks_jsonb_null() {
        let sql = result_sql(&["metadata.classification@y"]);
        assert!(
            sql.contains("data #> '{metadata,classification}' IS NOT NULL"),
            "{sql}"
        );
        let sql = result_sql(&["metadata.classification@n"]);
        assert!(
            sql.contains("data #> '{metadata,classification}' IS NULL"),
            "{sql}"
        );
    }

    #[test]
    fn test_timestamp_comparison_binds() {
        let sql = run_sql(&["start_time)2026-03-01T10:00:00Z"]);
        assert!(sql.contains("start_time >="), "{sql}");
    }

    #[test]
    fn test_unusable_filters_are_dropped() {
        let unfiltered = result_sql(&[]);
        assert_eq!(result_sql(&["bogus=1"]), unfiltered);
        assert_eq!(result_sql(&["no_operator"]), unfiltered);
        assert_eq!(result_sql(&["run_id=not-a-uuid"]), unfiltered);
        assert_eq!(result_sql(&["duration>abc"]), unfiltered);
    }

    #[test]
    fn test_usable_filters_survive_dropped_neighbors() {
        let sql = result_sql(&["bogus=1", "result=passed"]);
        assert!(sql.contains("result = 'passed'"), "{sql}");
    }

    #[test]
    fn test_invalid_list_members_are_skipped() {
        let sql = result_sql(&["run_id*not-a-uuid;0195d3a0-0000-7000-8000-000000000000"]);
        assert!(sql.contains("run_id IN"), "{sql}");
        assert!(!sql.contains("not-a-uuid"), "{sql}");
    }
}
