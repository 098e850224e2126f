//! Maps filter field names onto SQL column expressions.
//!
//! Each filterable table declares a [`ColumnSet`]: its promoted scalar columns
//! plus an optional JSONB document column. Dotted fields under the `data`,
//! `metadata` or `summary` namespaces resolve to path extractions inside the
//! document; everything else must name a promoted column.

/// Type of a promoted scalar column, used to pick bind-parameter types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Uuid,
    Text,
    Timestamp,
    Double,
    Integer,
}

/// Shape of a value extracted from the JSONB document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonShape {
    /// Extracted as text with `#>>`.
    Text,
    /// Extracted as text and cast to `double precision`.
    Numeric,
    /// Kept as raw `jsonb` for containment and overlap operators.
    Array,
}

/// The filterable columns of one table.
#[derive(Debug, Clone, Copy)]
pub struct ColumnSet {
    document: Option<&'static str>,
    scalars: &'static [(&'static str, ColumnKind)],
}

impl ColumnSet {
    pub const fn new(
        document: Option<&'static str>,
        scalars: &'static [(&'static str, ColumnKind)],
    ) -> Self {
        Self { document, scalars }
    }

    pub fn document(&self) -> Option<&'static str> {
        self.document
    }

    fn scalar(&self, field: &str) -> Option<(&'static str, ColumnKind)> {
        self.scalars
            .iter()
            .find(|(name, _)| *name == field)
            .copied()
    }
}

pub const RUN_COLUMNS: ColumnSet = ColumnSet::new(
    Some("data"),
    &[
        ("id", ColumnKind::Uuid),
        ("project_id", ColumnKind::Uuid),
        ("component", ColumnKind::Text),
        ("env", ColumnKind::Text),
        ("source", ColumnKind::Text),
        ("start_time", ColumnKind::Timestamp),
        ("duration", ColumnKind::Double),
    ],
);

pub const RESULT_COLUMNS: ColumnSet = ColumnSet::new(
    Some("data"),
    &[
        ("id", ColumnKind::Uuid),
        ("run_id", ColumnKind::Uuid),
        ("project_id", ColumnKind::Uuid),
        ("test_id", ColumnKind::Text),
        ("result", ColumnKind::Text),
        ("component", ColumnKind::Text),
        ("env", ColumnKind::Text),
        ("source", ColumnKind::Text),
        ("start_time", ColumnKind::Timestamp),
        ("duration", ColumnKind::Double),
    ],
);

pub const PROJECT_COLUMNS: ColumnSet = ColumnSet::new(
    None,
    &[
        ("id", ColumnKind::Uuid),
        ("name", ColumnKind::Text),
        ("title", ColumnKind::Text),
    ],
);

/// Document paths stored as JSON arrays.
const ARRAY_FIELDS: &[&str] = &["metadata.tags", "metadata.markers"];

/// Document paths compared numerically.
const NUMERIC_FIELDS: &[&str] = &[
    "duration",
    "summary.tests",
    "summary.failures",
    "summary.errors",
    "summary.skips",
    "summary.xfailures",
    "summary.xpasses",
    "summary.collected",
    "summary.not_run",
];

/// A field resolved against a [`ColumnSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedColumn {
    Scalar {
        name: &'static str,
        kind: ColumnKind,
    },
    Json {
        document: &'static str,
        /// Postgres array-path literal, e.g. `{metadata,tags}`.
        path: String,
        shape: JsonShape,
    },
}

impl ResolvedColumn {
    /// SQL expression used for typed comparisons.
    pub fn compare_sql(&self) -> String {
        match self {
            Self::Scalar { name, .. } => (*name).to_string(),
            Self::Json {
                document,
                path,
                shape: JsonShape::Numeric,
            } => format!("({document} #>> '{path}')::double precision"),
            Self::Json {
                document,
                path,
                shape: JsonShape::Array,
            } => format!("{document} #> '{path}'"),
            Self::Json { document, path, .. } => format!("{document} #>> '{path}'"),
        }
    }

    /// SQL expression for existence checks. Document paths stay uncast so a
    /// JSON `null` or absent key both read as SQL NULL.
    pub fn null_sql(&self) -> String {
        match self {
            Self::Scalar { name, .. } => (*name).to_string(),
            Self::Json { document, path, .. } => format!("{document} #> '{path}'"),
        }
    }

    /// SQL expression yielding text, for regex and substring matching.
    pub fn text_sql(&self) -> String {
        match self {
            Self::Scalar {
                name,
                kind: ColumnKind::Text,
            } => (*name).to_string(),
            Self::Scalar { name, .. } => format!("{name}::text"),
            Self::Json { document, path, .. } => format!("{document} #>> '{path}'"),
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(
            self,
            Self::Json {
                shape: JsonShape::Array,
                ..
            }
        )
    }
}

/// Resolves a field name to a column expression, or `None` when the field is
/// unknown for this table.
pub fn resolve(field: &str, columns: &ColumnSet) -> Option<ResolvedColumn> {
    if let Some((namespace, rest)) = field.split_once('.') {
        if matches!(namespace, "data" | "metadata" | "summary") {
            let document = columns.document()?;
            // `data.` is an explicit prefix for top-level document keys;
            // `metadata.` and `summary.` already name top-level keys.
            let doc_path = if namespace == "data" { rest } else { field };
            return resolve_document_path(document, doc_path);
        }
        return None;
    }
    let (name, kind) = columns.scalar(field)?;
    Some(ResolvedColumn::Scalar { name, kind })
}

fn resolve_document_path(document: &'static str, doc_path: &str) -> Option<ResolvedColumn> {
    let parts: Vec<&str> = doc_path.split('.').collect();
    if parts.is_empty() || parts.iter().any(|part| part.is_empty()) {
        return None;
    }
    let shape = if ARRAY_FIELDS.contains(&doc_path) {
        JsonShape::Array
    } else if NUMERIC_FIELDS.contains(&doc_path) {
        JsonShape::Numeric
    } else {
        JsonShape::Text
    };
    Some(ResolvedColumn::Json {
        document,
        path: format!("{{{}}}", parts.join(",")),
        shape,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_promoted_scalar() {
        let column = resolve("result", &RESULT_COLUMNS).unwrap();
        assert_eq!(
            column,
            ResolvedColumn::Scalar {
                name: "result",
                kind: ColumnKind::Text
            }
        );
        assert_eq!(column.compare_sql(), "result");
        assert_eq!(column.text_sql(), "result");
    }

    #[test]
    fn test_non_text_scalar_casts_for_text_matching() {
        let column = resolve("id", &RESULT_COLUMNS).unwrap();
        assert_eq!(column.text_sql(), "id::text");
        let column = resolve("duration", &RUN_COLUMNS).unwrap();
        assert_eq!(column.text_sql(), "duration::text");
    }

    #[test]
    fn test_resolve_metadata_path() {
        let column = resolve("metadata.run", &RESULT_COLUMNS).unwrap();
        assert_eq!(column.compare_sql(), "data #>> '{metadata,run}'");
        assert_eq!(column.null_sql(), "data #> '{metadata,run}'");
    }

    #[test]
    fn test_data_prefix_names_top_level_keys() {
        let column = resolve("data.metadata.run", &RESULT_COLUMNS).unwrap();
        assert_eq!(column.compare_sql(), "data #>> '{metadata,run}'");
        let column = resolve("data.exception_name", &RESULT_COLUMNS).unwrap();
        assert_eq!(column.compare_sql(), "data #>> '{exception_name}'");
    }

    #[test]
    fn test_summary_counters_are_numeric() {
        let column = resolve("summary.failures", &RUN_COLUMNS).unwrap();
        assert_eq!(
            column.compare_sql(),
            "(data #>> '{summary,failures}')::double precision"
        );
    }

    #[test]
    fn test_tag_paths_are_arrays() {
        let column = resolve("metadata.tags", &RUN_COLUMNS).unwrap();
        assert!(column.is_array());
        assert_eq!(column.compare_sql(), "data #> '{metadata,tags}'");
        let column = resolve("data.metadata.markers", &RESULT_COLUMNS).unwrap();
        assert!(column.is_array());
    }

    #[test]
    fn test_unknown_fields_resolve_to_none() {
        assert!(resolve("bogus", &RESULT_COLUMNS).is_none());
        assert!(resolve("user.name", &RESULT_COLUMNS).is_none());
        assert!(resolve("metadata..run", &RESULT_COLUMNS).is_none());
        assert!(resolve("data.", &RESULT_COLUMNS).is_none());
    }

    #[test]
    fn test_document_namespaces_need_a_document_column() {
        assert!(resolve("metadata.run", &PROJECT_COLUMNS).is_none());
        assert!(resolve("name", &PROJECT_COLUMNS).is_some());
    }
}
