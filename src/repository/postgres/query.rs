use sqlx::{Postgres, QueryBuilder};

use crate::usecase::query::{ApiQuery, Condition, Filter, SortKey, Value};

pub fn push_value(builder: &mut QueryBuilder<'_, Postgres>, value: &Value) {
    match value {
        Value::Text(v) => builder.push_bind(v.clone()),
        Value::Integer(v) => builder.push_bind(*v),
        Value::Float(v) => builder.push_bind(*v),
        Value::Boolean(v) => builder.push_bind(*v),
        Value::Timestamp(v) => builder.push_bind(*v),
        Value::Uuid(v) => builder.push_bind(*v),
    };
}

/// Appends ` AND <condition>` per filter. Field names come from a resource
/// schema, never from the request, so they are pushed unquoted.
pub fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filters: &[Filter]) {
    for filter in filters {
        builder.push(" AND ").push(filter.field);
        match &filter.condition {
            Condition::Compare(op, value) => {
                builder.push(op.sql());
                push_value(builder, value);
            }
            Condition::AnyOf(values) => {
                builder.push(" IN (");
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        builder.push(", ");
                    }
                    push_value(builder, value);
                }
                builder.push(")");
            }
        }
    }
}

pub fn push_order(builder: &mut QueryBuilder<'_, Postgres>, sort: &[SortKey]) {
    if sort.is_empty() {
        return;
    }
    builder.push(" ORDER BY ");
    for (i, key) in sort.iter().enumerate() {
        if i > 0 {
            builder.push(", ");
        }
        builder
            .push(key.field)
            .push(if key.descending { " DESC" } else { " ASC" });
    }
}

pub fn push_page(builder: &mut QueryBuilder<'_, Postgres>, query: &ApiQuery) {
    builder
        .push(" LIMIT ")
        .push_bind(query.limit)
        .push(" OFFSET ")
        .push_bind(query.offset());
}
