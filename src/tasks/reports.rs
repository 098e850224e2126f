//! Report artifact generation.

use serde_json::{json, Value as JsonValue};
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::paginate::MAX_DOCUMENTS;
use crate::error::{AppError, AppResult};
use crate::models::{document, result, ReportStatus, ReportView};
use crate::services::Storage;
use crate::tasks::{TaskContext, TaskPayload};

pub const GENERATE_REPORT: &str = "generate_report";

pub async fn generate_report_task(
    ctx: TaskContext,
    payload: TaskPayload,
) -> AppResult<Option<JsonValue>> {
    let Some(report_id) = payload.first_object_id() else {
        return Err(AppError::InvalidInput(
            "generate_report requires an object argument with a report id".to_string(),
        ));
    };
    generate_report(&ctx, report_id).await
}

async fn generate_report(ctx: &TaskContext, report_id: Uuid) -> AppResult<Option<JsonValue>> {
    let Some(report) = ctx.db.get_report(report_id).await? else {
        debug!(report = %report_id, "report does not exist, nothing to generate");
        return Ok(None);
    };
    ctx.db
        .set_report_status(report_id, ReportStatus::Running)
        .await?;

    let view = ReportView::parse(&report.view).ok_or_else(|| {
        AppError::InvalidInput(format!("Report has unknown view '{}'", report.view))
    })?;

    let filter_strings = filter_strings_from_params(&report.params);
    let results = ctx
        .db
        .filtered_results(&filter_strings, report.project_id, MAX_DOCUMENTS)
        .await?;

    if results.is_empty() {
        ctx.db
            .set_report_status(report_id, ReportStatus::Empty)
            .await?;
        info!(report = %report_id, "report filter matched nothing");
        return Ok(None);
    }

    let documents: Vec<JsonValue> = results.iter().map(result::to_document).collect();
    let body = match view {
        ReportView::Csv => render_csv(&documents),
        ReportView::Json => render_json(&documents)?,
        ReportView::Text => render_text(&documents),
    };

    let key = Storage::report_key(report_id, &report.filename);
    ctx.storage
        .put(&key, body.into_bytes(), Some(&report.mimetype))
        .await?;
    ctx.db
        .set_report_status(report_id, ReportStatus::Done)
        .await?;

    info!(report = %report_id, results = documents.len(), filename = %report.filename, "report generated");
    Ok(Some(json!({
        "filename": report.filename,
        "results": documents.len(),
    })))
}

/// Turns stored report params back into filter expressions.
fn filter_strings_from_params(params: &JsonValue) -> Vec<String> {
    let mut filter_strings: Vec<String> = document::get_str(params, "filter")
        .map(|filter| {
            filter
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default();
    if let Some(source) = document::get_str(params, "source") {
        filter_strings.push(format!("source={}", source));
    }
    filter_strings
}

fn render_csv(documents: &[JsonValue]) -> String {
    const COLUMNS: &[&str] = &[
        "id",
        "test_id",
        "result",
        "component",
        "env",
        "source",
        "start_time",
        "duration",
    ];
    let mut out = String::with_capacity(documents.len() * 64);
    out.push_str(&COLUMNS.join(","));
    out.push('\n');
    for doc in documents {
        let row: Vec<String> = COLUMNS
            .iter()
            .map(|column| csv_field(doc.get(*column)))
            .collect();
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

fn csv_field(value: Option<&JsonValue>) -> String {
    let text = match value {
        None | Some(JsonValue::Null) => String::new(),
        Some(JsonValue::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };
    if text.contains(',') || text.contains('"') || text.contains('\n') {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text
    }
}

fn render_json(documents: &[JsonValue]) -> AppResult<String> {
    Ok(serde_json::to_string_pretty(documents)?)
}

fn render_text(documents: &[JsonValue]) -> String {
    let mut out = String::with_capacity(documents.len() * 48);
    for doc in documents {
        let result = doc
            .get("result")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown");
        let test_id = doc
            .get("test_id")
            .and_then(|v| v.as_str())
            .unwrap_or("<unnamed>");
        out.push_str(result);
        out.push_str(": ");
        out.push_str(test_id);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_strings_from_params() {
        let params = json!({"filter": "result=failed, env=prod", "source": "jenkins"});
        assert_eq!(
            filter_strings_from_params(&params),
            vec!["result=failed", "env=prod", "source=jenkins"]
        );
        assert!(filter_strings_from_params(&json!({})).is_empty());
    }

    #[test]
    fn test_render_csv_escapes_fields() {
        let documents = vec![json!({
            "id": "1",
            "test_id": "tests/test_a.py::test_one[a,b]",
            "result": "failed",
            "duration": 1.5,
            "component": "say \"hi\""
        })];
        let csv = render_csv(&documents);
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "id,test_id,result,component,env,source,start_time,duration"
        );
        let row = lines.next().unwrap();
        assert!(row.contains("\"tests/test_a.py::test_one[a,b]\""), "{row}");
        assert!(row.contains("\"say \"\"hi\"\"\""), "{row}");
        assert!(row.ends_with("1.5"), "{row}");
    }

    #[test]
    fn test_render_text_lists_outcome_per_line() {
        let documents = vec![
            json!({"test_id": "tests/a", "result": "passed"}),
            json!({"test_id": "tests/b", "result": "failed"}),
        ];
        let text = render_text(&documents);
        assert_eq!(text, "passed: tests/a\nfailed: tests/b\n");
    }

    #[test]
    fn test_render_json_is_an_array() {
        let documents = vec![json!({"test_id": "tests/a"})];
        let rendered = render_json(&documents).unwrap();
        let parsed: JsonValue = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed.as_array().unwrap().len(), 1);
    }
}
