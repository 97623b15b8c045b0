use std::cmp::Ordering;

use flowvault_application::{
    RuntimeDataCondition, RuntimeDataConditionNode, RuntimeDataField, RuntimeDataFilter,
    RuntimeDataLogicalMode, RuntimeDataOrderBy, RuntimeDataSort, RuntimeDataSortField,
    SearchArguments, SearchOrderColumn, SortDirection,
};
use flowvault_domain::{WorkflowRuntimeData, json_values_equal};
use serde_json::Value;

pub(super) fn field_value(record: &WorkflowRuntimeData, field: RuntimeDataField) -> Option<&str> {
    match field {
        RuntimeDataField::Id => Some(record.id().as_str()),
        RuntimeDataField::ProjectId => Some(record.project_id().as_str()),
        RuntimeDataField::WorkflowDefinitionId => Some(record.workflow_definition_id().as_str()),
        RuntimeDataField::Status => Some(record.status().as_str()),
        RuntimeDataField::State => record.state(),
        RuntimeDataField::BusinessId => record.entity().business_id(),
        RuntimeDataField::EndUserId => record.entity().end_user_id(),
        RuntimeDataField::AssigneeId => record.assignee_id(),
    }
}

pub(super) fn matches_filter(record: &WorkflowRuntimeData, filter: &RuntimeDataFilter) -> bool {
    let mut nodes = filter.nodes.iter().map(|node| match node {
        RuntimeDataConditionNode::Condition(condition) => matches_condition(record, condition),
        RuntimeDataConditionNode::Group(group) => matches_filter(record, group),
    });

    match filter.logical_mode {
        RuntimeDataLogicalMode::And => nodes.all(|matched| matched),
        RuntimeDataLogicalMode::Or => nodes.any(|matched| matched),
    }
}

fn matches_condition(record: &WorkflowRuntimeData, condition: &RuntimeDataCondition) -> bool {
    match condition {
        RuntimeDataCondition::Eq(field, value) => {
            field_value(record, *field) == Some(value.as_str())
        }
        RuntimeDataCondition::Neq(field, value) => {
            field_value(record, *field).is_some_and(|current| current != value.as_str())
        }
        RuntimeDataCondition::In(field, values) => field_value(record, *field)
            .is_some_and(|current| values.iter().any(|value| value.as_str() == current)),
        RuntimeDataCondition::IsNull(field) => field_value(record, *field).is_none(),
        RuntimeDataCondition::IsNotNull(field) => field_value(record, *field).is_some(),
        RuntimeDataCondition::CreatedBefore(instant) => record.created_at() < *instant,
        RuntimeDataCondition::CreatedAfter(instant) => record.created_at() > *instant,
        RuntimeDataCondition::ContextContains(fragment) => {
            json_contains(record.context(), fragment)
        }
        RuntimeDataCondition::HasTag(tag) => record.tags().iter().any(|current| current == tag),
    }
}

/// JSONB `@>` containment.
pub(super) fn json_contains(container: &Value, contained: &Value) -> bool {
    match (container, contained) {
        (Value::Object(container), Value::Object(contained)) => {
            contained.iter().all(|(key, value)| {
                container
                    .get(key)
                    .is_some_and(|current| json_contains(current, value))
            })
        }
        (Value::Array(container), Value::Array(contained)) => contained.iter().all(|value| {
            container
                .iter()
                .any(|current| json_contains(current, value))
        }),
        _ => json_values_equal(container, contained),
    }
}

/// Orders by the requested sort keys, then `id` ascending; without sort keys
/// the order is `created_at` descending.
pub(super) fn compare_records(
    left: &WorkflowRuntimeData,
    right: &WorkflowRuntimeData,
    sort: &[RuntimeDataSort],
) -> Ordering {
    let ordering = if sort.is_empty() {
        right.created_at().cmp(&left.created_at())
    } else {
        sort.iter().fold(Ordering::Equal, |ordering, sort| {
            ordering.then_with(|| {
                directed(compare_sort_field(left, right, sort.field), sort.direction)
            })
        })
    };

    ordering.then_with(|| left.id().as_str().cmp(right.id().as_str()))
}

fn compare_sort_field(
    left: &WorkflowRuntimeData,
    right: &WorkflowRuntimeData,
    field: RuntimeDataSortField,
) -> Ordering {
    match field {
        RuntimeDataSortField::CreatedAt => left.created_at().cmp(&right.created_at()),
        RuntimeDataSortField::UpdatedAt => left.updated_at().cmp(&right.updated_at()),
        RuntimeDataSortField::Status => left.status().as_str().cmp(right.status().as_str()),
        RuntimeDataSortField::WorkflowDefinitionId => left
            .workflow_definition_id()
            .as_str()
            .cmp(right.workflow_definition_id().as_str()),
        RuntimeDataSortField::Id => left.id().as_str().cmp(right.id().as_str()),
    }
}

fn directed(ordering: Ordering, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

pub(super) fn matches_search(record: &WorkflowRuntimeData, arguments: &SearchArguments) -> bool {
    let entity = record.entity();

    if !arguments
        .project_ids
        .iter()
        .any(|project_id| project_id == record.project_id().as_str())
    {
        return false;
    }
    if entity.entity_type().as_str() != arguments.entity_type {
        return false;
    }
    if !arguments.workflow_definition_ids.is_empty()
        && !arguments
            .workflow_definition_ids
            .iter()
            .any(|id| id == record.workflow_definition_id().as_str())
    {
        return false;
    }
    if !arguments.statuses.is_empty()
        && !arguments
            .statuses
            .iter()
            .any(|status| status == record.status().as_str())
    {
        return false;
    }
    if !arguments.case_statuses.is_empty()
        && !record
            .tags()
            .iter()
            .any(|tag| arguments.case_statuses.contains(tag))
    {
        return false;
    }
    let assignee_matches = match record.assignee_id() {
        Some(assignee_id) => arguments.assignee_ids.iter().any(|id| id == assignee_id),
        None => arguments.include_unassigned,
    };
    if (!arguments.assignee_ids.is_empty() || arguments.include_unassigned) && !assignee_matches {
        return false;
    }

    let Some(search) = arguments.search.as_deref() else {
        return true;
    };
    let search = search.to_lowercase();
    let entity_document = record
        .context()
        .get("entity")
        .map(Value::to_string)
        .unwrap_or_default();

    [
        record.id().as_str(),
        entity.id(),
        record.workflow_definition_id().as_str(),
        entity_document.as_str(),
    ]
    .iter()
    .any(|candidate| candidate.to_lowercase().contains(search.as_str()))
}

/// Orders search results by the requested column with nulls last, then `id`.
pub(super) fn compare_search_results(
    left: &WorkflowRuntimeData,
    right: &WorkflowRuntimeData,
    order_by: &RuntimeDataOrderBy,
) -> Ordering {
    let ordering = match order_by.column {
        SearchOrderColumn::CreatedAt => {
            directed(left.created_at().cmp(&right.created_at()), order_by.direction)
        }
        SearchOrderColumn::UpdatedAt => {
            directed(left.updated_at().cmp(&right.updated_at()), order_by.direction)
        }
        SearchOrderColumn::Status => directed(
            left.status().as_str().cmp(right.status().as_str()),
            order_by.direction,
        ),
        SearchOrderColumn::WorkflowDefinitionId => directed(
            left.workflow_definition_id()
                .as_str()
                .cmp(right.workflow_definition_id().as_str()),
            order_by.direction,
        ),
        SearchOrderColumn::AssigneeId => match (left.assignee_id(), right.assignee_id()) {
            (Some(left), Some(right)) => directed(left.cmp(right), order_by.direction),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
    };

    ordering.then_with(|| left.id().as_str().cmp(right.id().as_str()))
}
