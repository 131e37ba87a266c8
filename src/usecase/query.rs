//! Translation of raw query-string pairs into a typed, storage-agnostic
//! [`ApiQuery`]: filter, sort, field projection and pagination, always
//! applied in that order.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value as Json;
use uuid::Uuid;

use crate::domain::resource::{FieldDef, FieldKind, ResourceSchema};
use crate::usecase::error::UsecaseError;

pub const RESERVED_KEYS: [&str; 4] = ["page", "sort", "limit", "fields"];
pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 100;
const DEFAULT_SORT_FIELD: &str = "created_at";

/// Query-string pairs in arrival order; keys may repeat.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams(pub Vec<(String, String)>);

impl QueryParams {
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    /// Last value given for `key`.
    pub fn last(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.0.retain(|(k, _)| k != key);
        self.0.push((key.to_string(), value.to_string()));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Gte,
    Gt,
    Lte,
    Lt,
}

impl CompareOp {
    fn parse(op: &str) -> Option<Self> {
        match op {
            "gte" => Some(CompareOp::Gte),
            "gt" => Some(CompareOp::Gt),
            "lte" => Some(CompareOp::Lte),
            "lt" => Some(CompareOp::Lt),
            _ => None,
        }
    }

    pub fn sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => " = ",
            CompareOp::Gte => " >= ",
            CompareOp::Gt => " > ",
            CompareOp::Lte => " <= ",
            CompareOp::Lt => " < ",
        }
    }
}

/// A filter operand converted to the field's declared type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Timestamp(DateTime<Utc>),
    Uuid(Uuid),
}

impl Value {
    pub fn parse(kind: FieldKind, raw: &str) -> Option<Self> {
        match kind {
            FieldKind::Text => Some(Value::Text(raw.to_string())),
            FieldKind::Integer => raw.trim().parse().ok().map(Value::Integer),
            FieldKind::Float => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(Value::Float),
            FieldKind::Boolean => match raw.trim() {
                "true" => Some(Value::Boolean(true)),
                "false" => Some(Value::Boolean(false)),
                _ => None,
            },
            FieldKind::Timestamp => parse_timestamp(raw.trim()).map(Value::Timestamp),
            FieldKind::Uuid => Uuid::parse_str(raw.trim()).ok().map(Value::Uuid),
            FieldKind::Composite => None,
        }
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Compare(CompareOp, Value),
    /// Membership: the field equals one of the values.
    AnyOf(Vec<Value>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: &'static str,
    pub condition: Condition,
}

impl Filter {
    pub fn eq(field: &'static str, value: Value) -> Self {
        Self {
            field,
            condition: Condition::Compare(CompareOp::Eq, value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub field: &'static str,
    pub descending: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// Every field except the resource's hidden ones.
    Default(&'static [&'static str]),
    Include(Vec<&'static str>),
}

impl Projection {
    /// Shapes a serialized document according to the projection.
    pub fn apply(&self, document: Json) -> Json {
        match document {
            Json::Object(mut map) => {
                match self {
                    Projection::Default(hidden) => map.retain(|k, _| !hidden.contains(&k.as_str())),
                    Projection::Include(fields) => map.retain(|k, _| fields.contains(&k.as_str())),
                }
                Json::Object(map)
            }
            other => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiQuery {
    pub filters: Vec<Filter>,
    pub sort: Vec<SortKey>,
    pub projection: Projection,
    pub page: i64,
    pub limit: i64,
}

impl ApiQuery {
    /// Query matching everything: default sort, projection and paging.
    pub fn all(schema: &'static ResourceSchema) -> Self {
        Self {
            filters: Vec::new(),
            sort: default_sort(schema),
            projection: Projection::Default(schema.hidden),
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }

    pub fn from_params(
        schema: &'static ResourceSchema,
        params: &QueryParams,
    ) -> Result<Self, UsecaseError> {
        Ok(ApiFeatures::new(schema, params)
            .filter()?
            .sort()
            .limit_fields()
            .paginate()
            .build())
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    /// Adds a scoping equality filter, e.g. the parent id of a nested route.
    pub fn scoped(mut self, scope: Option<Filter>) -> Self {
        if let Some(filter) = scope {
            self.filters.push(filter);
        }
        self
    }
}

/// Builder applying each query feature in turn.
pub struct ApiFeatures<'a> {
    schema: &'static ResourceSchema,
    params: &'a QueryParams,
    query: ApiQuery,
}

impl<'a> ApiFeatures<'a> {
    pub fn new(schema: &'static ResourceSchema, params: &'a QueryParams) -> Self {
        Self {
            schema,
            params,
            query: ApiQuery::all(schema),
        }
    }

    pub fn filter(mut self) -> Result<Self, UsecaseError> {
        // (field, op) -> raw values, in first-seen order
        let mut grouped: Vec<(&'static FieldDef, CompareOp, Vec<&str>)> = Vec::new();

        for (key, raw) in &self.params.0 {
            if RESERVED_KEYS.contains(&key.as_str()) {
                continue;
            }
            let (name, op) = split_operator(key);
            let Some(field) = self.schema.field(name) else {
                continue;
            };
            if !field.is_scalar() {
                continue;
            }
            let op = op?;
            match grouped
                .iter_mut()
                .find(|(f, o, _)| f.name == field.name && *o == op)
            {
                Some((_, _, values)) => values.push(raw.as_str()),
                None => grouped.push((field, op, vec![raw.as_str()])),
            }
        }

        for (field, op, raws) in grouped {
            let convert = |raw: &str| {
                Value::parse(field.kind, raw)
                    .ok_or_else(|| UsecaseError::Validation(format!("Invalid {}: {}", field.name, raw)))
            };

            let condition = if op == CompareOp::Eq && raws.len() > 1 && self.schema.allows_multiple(field.name) {
                Condition::AnyOf(raws.into_iter().map(convert).collect::<Result<_, _>>()?)
            } else {
                // pollution guard: only the last value counts
                let last = raws.last().copied().unwrap_or_default();
                Condition::Compare(op, convert(last)?)
            };

            self.query.filters.push(Filter {
                field: field.name,
                condition,
            });
        }

        Ok(self)
    }

    pub fn sort(mut self) -> Self {
        let Some(raw) = self.params.last("sort") else {
            return self;
        };

        let mut keys: Vec<SortKey> = Vec::new();
        for token in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let (name, descending) = match token.strip_prefix('-') {
                Some(name) => (name, true),
                None => (token, false),
            };
            let Some(field) = self.schema.field(name).filter(|f| f.is_scalar()) else {
                continue;
            };
            if keys.iter().any(|k| k.field == field.name) {
                continue;
            }
            keys.push(SortKey {
                field: field.name,
                descending,
            });
        }

        if !keys.is_empty() {
            if !keys.iter().any(|k| k.field == "id") {
                keys.push(SortKey {
                    field: "id",
                    descending: false,
                });
            }
            self.query.sort = keys;
        }
        self
    }

    pub fn limit_fields(mut self) -> Self {
        let Some(raw) = self.params.last("fields") else {
            return self;
        };

        let mut selected: Vec<&'static str> = vec!["id"];
        for name in raw.split(',').map(str::trim) {
            if let Some(field) = self.schema.field(name) {
                if !selected.contains(&field.name) {
                    selected.push(field.name);
                }
            }
        }

        if selected.len() > 1 {
            self.query.projection = Projection::Include(selected);
        }
        self
    }

    pub fn paginate(mut self) -> Self {
        self.query.page = positive_or(self.params.last("page"), DEFAULT_PAGE);
        self.query.limit = positive_or(self.params.last("limit"), DEFAULT_LIMIT);
        self
    }

    pub fn build(self) -> ApiQuery {
        self.query
    }
}

fn default_sort(schema: &ResourceSchema) -> Vec<SortKey> {
    let mut keys = Vec::with_capacity(2);
    if schema.field(DEFAULT_SORT_FIELD).is_some() {
        keys.push(SortKey {
            field: DEFAULT_SORT_FIELD,
            descending: true,
        });
    }
    keys.push(SortKey {
        field: "id",
        descending: false,
    });
    keys
}

/// `price[gte]` -> (`price`, Gte); `price` -> (`price`, Eq).
fn split_operator(key: &str) -> (&str, Result<CompareOp, UsecaseError>) {
    match key.split_once('[') {
        Some((name, rest)) if rest.ends_with(']') => {
            let op = &rest[..rest.len() - 1];
            let parsed = CompareOp::parse(op)
                .ok_or_else(|| UsecaseError::Validation(format!("Unsupported operator: {op}")));
            (name, parsed)
        }
        _ => (key, Ok(CompareOp::Eq)),
    }
}

fn positive_or(raw: Option<&str>, default: i64) -> i64 {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|v| *v >= 1)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::review::REVIEW_SCHEMA;
    use crate::domain::tour::TOUR_SCHEMA;
    use serde_json::json;

    fn build(pairs: &[(&str, &str)]) -> Result<ApiQuery, UsecaseError> {
        ApiQuery::from_params(&TOUR_SCHEMA, &QueryParams::from_pairs(pairs))
    }

    #[test]
    fn test_reserved_keys_never_become_filters() {
        let query = build(&[
            ("page", "2"),
            ("sort", "price"),
            ("limit", "10"),
            ("fields", "name"),
            ("difficulty", "easy"),
        ])
        .unwrap();

        assert_eq!(query.filters, vec![Filter::eq("difficulty", Value::Text("easy".to_string()))]);
    }

    #[test]
    fn test_comparison_operators() {
        let query = build(&[("duration[gte]", "5"), ("price[lt]", "1500")]).unwrap();

        assert_eq!(
            query.filters,
            vec![
                Filter {
                    field: "duration",
                    condition: Condition::Compare(CompareOp::Gte, Value::Integer(5)),
                },
                Filter {
                    field: "price",
                    condition: Condition::Compare(CompareOp::Lt, Value::Float(1500.0)),
                },
            ]
        );
    }

    #[test]
    fn test_unknown_fields_are_dropped() {
        let query = build(&[("colour", "red"), ("password_hash", "x")]).unwrap();

        assert!(query.filters.is_empty());
    }

    #[test]
    fn test_unconvertible_value_is_a_validation_error() {
        let err = build(&[("duration", "five")]).unwrap_err();

        assert!(matches!(err, UsecaseError::Validation(ref m) if m == "Invalid duration: five"));
    }

    #[test]
    fn test_unsupported_operator_is_a_validation_error() {
        let err = build(&[("price[ne]", "5")]).unwrap_err();

        assert!(matches!(err, UsecaseError::Validation(_)));
    }

    #[test]
    fn test_repeated_whitelisted_key_becomes_membership() {
        let query = build(&[("difficulty", "easy"), ("difficulty", "medium")]).unwrap();

        assert_eq!(
            query.filters,
            vec![Filter {
                field: "difficulty",
                condition: Condition::AnyOf(vec![
                    Value::Text("easy".to_string()),
                    Value::Text("medium".to_string()),
                ]),
            }]
        );
    }

    #[test]
    fn test_repeated_plain_key_keeps_last_value() {
        let query = build(&[("name", "The Forest Hiker"), ("name", "The Sea Explorer")]).unwrap();

        assert_eq!(
            query.filters,
            vec![Filter::eq("name", Value::Text("The Sea Explorer".to_string()))]
        );
    }

    #[test]
    fn test_default_sort_is_newest_first_with_tie_breaker() {
        let query = build(&[]).unwrap();

        assert_eq!(
            query.sort,
            vec![
                SortKey { field: "created_at", descending: true },
                SortKey { field: "id", descending: false },
            ]
        );
    }

    #[test]
    fn test_sort_list_with_descending_prefix() {
        let query = build(&[("sort", "-ratings_average,price,unknown")]).unwrap();

        assert_eq!(
            query.sort,
            vec![
                SortKey { field: "ratings_average", descending: true },
                SortKey { field: "price", descending: false },
                SortKey { field: "id", descending: false },
            ]
        );
    }

    #[test]
    fn test_pagination_offset() {
        let query = build(&[("page", "3"), ("limit", "10")]).unwrap();

        assert_eq!(query.page, 3);
        assert_eq!(query.limit, 10);
        assert_eq!(query.offset(), 20);
    }

    #[test]
    fn test_invalid_pagination_falls_back_to_defaults() {
        let query = build(&[("page", "0"), ("limit", "abc")]).unwrap();

        assert_eq!(query.page, DEFAULT_PAGE);
        assert_eq!(query.limit, DEFAULT_LIMIT);
        assert_eq!(query.offset(), 0);
    }

    #[test]
    fn test_projection_always_keeps_id() {
        let query = build(&[("fields", "name,price")]).unwrap();
        let document = json!({"id": "1", "name": "Hiker", "price": 397.0, "summary": "x", "version": 2});

        assert_eq!(query.projection, Projection::Include(vec!["id", "name", "price"]));
        assert_eq!(
            query.projection.apply(document),
            json!({"id": "1", "name": "Hiker", "price": 397.0})
        );
    }

    #[test]
    fn test_default_projection_hides_version() {
        let query = build(&[]).unwrap();
        let document = json!({"id": "1", "name": "Hiker", "version": 2});

        assert_eq!(query.projection.apply(document), json!({"id": "1", "name": "Hiker"}));
    }

    #[test]
    fn test_scope_is_merged_with_parsed_filters() {
        let tour_id = Uuid::new_v4();
        let params = QueryParams::from_pairs(&[("rating[gte]", "4")]);
        let query = ApiQuery::from_params(&REVIEW_SCHEMA, &params)
            .unwrap()
            .scoped(Some(Filter::eq("tour_id", Value::Uuid(tour_id))));

        assert_eq!(query.filters.len(), 2);
        assert_eq!(query.filters[1], Filter::eq("tour_id", Value::Uuid(tour_id)));
    }

    #[test]
    fn test_timestamp_values_accept_plain_dates() {
        let value = Value::parse(FieldKind::Timestamp, "2021-07-20").unwrap();

        assert_eq!(
            value,
            Value::Timestamp(DateTime::parse_from_rfc3339("2021-07-20T00:00:00Z").unwrap().with_timezone(&Utc))
        );
    }
}
