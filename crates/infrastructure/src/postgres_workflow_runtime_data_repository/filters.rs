use flowvault_application::{
    RuntimeDataConditionNode, RuntimeDataLogicalMode, RuntimeDataSort, SortDirection,
};

use super::*;

/// Compiles a filter tree into a parenthesized boolean SQL expression.
pub(super) fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &RuntimeDataFilter) {
    if filter.nodes.is_empty() {
        match filter.logical_mode {
            RuntimeDataLogicalMode::And => builder.push("TRUE"),
            RuntimeDataLogicalMode::Or => builder.push("FALSE"),
        };
        return;
    }

    builder.push('(');

    for (index, node) in filter.nodes.iter().enumerate() {
        if index > 0 {
            match filter.logical_mode {
                RuntimeDataLogicalMode::And => builder.push(" AND "),
                RuntimeDataLogicalMode::Or => builder.push(" OR "),
            };
        }

        match node {
            RuntimeDataConditionNode::Condition(condition) => push_condition(builder, condition),
            RuntimeDataConditionNode::Group(group) => push_filter(builder, group),
        }
    }

    builder.push(')');
}

fn push_condition(builder: &mut QueryBuilder<'_, Postgres>, condition: &RuntimeDataCondition) {
    match condition {
        RuntimeDataCondition::Eq(field, value) => {
            builder.push(field.column_name());
            builder.push(" = ");
            builder.push_bind(value.clone());
        }
        RuntimeDataCondition::Neq(field, value) => {
            builder.push(field.column_name());
            builder.push(" <> ");
            builder.push_bind(value.clone());
        }
        RuntimeDataCondition::In(field, values) => {
            if values.is_empty() {
                builder.push("FALSE");
                return;
            }

            builder.push(field.column_name());
            builder.push(" = ANY(");
            builder.push_bind(values.clone());
            builder.push(')');
        }
        RuntimeDataCondition::IsNull(field) => {
            builder.push(field.column_name());
            builder.push(" IS NULL");
        }
        RuntimeDataCondition::IsNotNull(field) => {
            builder.push(field.column_name());
            builder.push(" IS NOT NULL");
        }
        RuntimeDataCondition::CreatedBefore(instant) => {
            builder.push("created_at < ");
            builder.push_bind(*instant);
        }
        RuntimeDataCondition::CreatedAfter(instant) => {
            builder.push("created_at > ");
            builder.push_bind(*instant);
        }
        RuntimeDataCondition::ContextContains(fragment) => {
            builder.push("context @> ");
            builder.push_bind(fragment.clone());
            builder.push("::jsonb");
        }
        RuntimeDataCondition::HasTag(tag) => {
            builder.push_bind(tag.clone());
            builder.push(" = ANY(tags)");
        }
    }
}

/// Appends `ORDER BY`; every ordering ends with `id ASC` so pages are stable.
pub(super) fn push_order_by(builder: &mut QueryBuilder<'_, Postgres>, sort: &[RuntimeDataSort]) {
    builder.push(" ORDER BY ");

    if sort.is_empty() {
        builder.push("created_at DESC, id ASC");
        return;
    }

    for sort in sort {
        builder.push(sort.field.column_name());
        match sort.direction {
            SortDirection::Asc => builder.push(" ASC, "),
            SortDirection::Desc => builder.push(" DESC, "),
        };
    }

    builder.push("id ASC");
}
