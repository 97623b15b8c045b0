use chrono::{DateTime, Utc};
use flowvault_core::{AppError, AppResult};
use serde_json::Value;

/// Filterable scalar column of a workflow runtime record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RuntimeDataField {
    /// Record identifier.
    Id,
    /// Owning project.
    ProjectId,
    /// Executed workflow definition.
    WorkflowDefinitionId,
    /// Lifecycle status.
    Status,
    /// State-machine state name.
    State,
    /// Owning business, when the entity is a business.
    BusinessId,
    /// Owning end user, when the entity is an end user.
    EndUserId,
    /// Assigned operator.
    AssigneeId,
}

impl RuntimeDataField {
    /// Returns the storage column name.
    #[must_use]
    pub fn column_name(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::ProjectId => "project_id",
            Self::WorkflowDefinitionId => "workflow_definition_id",
            Self::Status => "status",
            Self::State => "state",
            Self::BusinessId => "business_id",
            Self::EndUserId => "end_user_id",
            Self::AssigneeId => "assignee_id",
        }
    }
}

/// One typed predicate over a runtime record.
///
/// `Neq` follows SQL semantics: a null column never matches.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeDataCondition {
    /// Column equals value.
    Eq(RuntimeDataField, String),
    /// Column is non-null and differs from value.
    Neq(RuntimeDataField, String),
    /// Column equals one of the values; an empty list matches nothing.
    In(RuntimeDataField, Vec<String>),
    /// Column is null.
    IsNull(RuntimeDataField),
    /// Column is not null.
    IsNotNull(RuntimeDataField),
    /// Record was created strictly before the instant.
    CreatedBefore(DateTime<Utc>),
    /// Record was created strictly after the instant.
    CreatedAfter(DateTime<Utc>),
    /// Context document contains the given JSON fragment.
    ContextContains(Value),
    /// Record carries the case status tag.
    HasTag(String),
}

/// Logical composition mode for filter nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeDataLogicalMode {
    /// Every node must match; an empty group matches everything.
    And,
    /// Any node may match; an empty group matches nothing.
    Or,
}

/// Node of a recursive runtime data filter.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeDataConditionNode {
    /// One typed condition.
    Condition(RuntimeDataCondition),
    /// Nested logical group.
    Group(RuntimeDataFilter),
}

impl From<RuntimeDataCondition> for RuntimeDataConditionNode {
    fn from(value: RuntimeDataCondition) -> Self {
        Self::Condition(value)
    }
}

impl From<RuntimeDataFilter> for RuntimeDataConditionNode {
    fn from(value: RuntimeDataFilter) -> Self {
        Self::Group(value)
    }
}

/// Recursive filter tree evaluated by repository adapters.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeDataFilter {
    /// Logical mode for evaluating child nodes.
    pub logical_mode: RuntimeDataLogicalMode,
    /// Child nodes.
    pub nodes: Vec<RuntimeDataConditionNode>,
}

impl RuntimeDataFilter {
    /// Filter that matches every record.
    #[must_use]
    pub fn everything() -> Self {
        Self {
            logical_mode: RuntimeDataLogicalMode::And,
            nodes: Vec::new(),
        }
    }

    /// Conjunction of nodes.
    #[must_use]
    pub fn all<I, N>(nodes: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<RuntimeDataConditionNode>,
    {
        Self {
            logical_mode: RuntimeDataLogicalMode::And,
            nodes: nodes.into_iter().map(Into::into).collect(),
        }
    }

    /// Disjunction of nodes.
    #[must_use]
    pub fn any<I, N>(nodes: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<RuntimeDataConditionNode>,
    {
        Self {
            logical_mode: RuntimeDataLogicalMode::Or,
            nodes: nodes.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for RuntimeDataFilter {
    fn default() -> Self {
        Self::everything()
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Ascending sort direction.
    Asc,
    /// Descending sort direction.
    Desc,
}

impl SortDirection {
    /// Parses transport value into sort direction.
    pub fn parse_transport(value: &str) -> AppResult<Self> {
        match value {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(AppError::Validation(format!(
                "unknown sort direction '{value}'"
            ))),
        }
    }

    /// Returns the stable transport value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Sortable runtime record column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeDataSortField {
    /// Creation timestamp.
    CreatedAt,
    /// Last modification timestamp.
    UpdatedAt,
    /// Lifecycle status.
    Status,
    /// Workflow definition identifier.
    WorkflowDefinitionId,
    /// Record identifier.
    Id,
}

impl RuntimeDataSortField {
    /// Returns the storage column name.
    #[must_use]
    pub fn column_name(&self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
            Self::Status => "status",
            Self::WorkflowDefinitionId => "workflow_definition_id",
            Self::Id => "id",
        }
    }
}

/// Sort instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeDataSort {
    /// Column to sort by.
    pub field: RuntimeDataSortField,
    /// Sort direction.
    pub direction: SortDirection,
}

impl RuntimeDataSort {
    /// Newest records first.
    #[must_use]
    pub fn newest_first() -> Self {
        Self {
            field: RuntimeDataSortField::CreatedAt,
            direction: SortDirection::Desc,
        }
    }
}

/// Single-record lookup descriptor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOneArgs {
    /// Record filter.
    pub filter: RuntimeDataFilter,
    /// Sort instructions applied before picking the first row.
    pub sort: Vec<RuntimeDataSort>,
}

/// Multi-record listing descriptor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindManyArgs {
    /// Record filter.
    pub filter: RuntimeDataFilter,
    /// Sort instructions.
    pub sort: Vec<RuntimeDataSort>,
    /// Maximum rows returned; `None` returns every match.
    pub limit: Option<usize>,
    /// Number of rows skipped.
    pub offset: usize,
}

/// Count descriptor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountArgs {
    /// Record filter.
    pub filter: RuntimeDataFilter,
}

/// Delete descriptor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeleteArgs {
    /// Record filter.
    pub filter: RuntimeDataFilter,
}

/// Group-by aggregation descriptor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupByArgs {
    /// Grouping columns, in key order.
    pub by: Vec<RuntimeDataField>,
    /// Record filter applied before grouping.
    pub filter: RuntimeDataFilter,
}

/// One aggregated group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeDataGroup {
    /// Grouping column values in the requested order.
    pub key: Vec<(RuntimeDataField, Option<String>)>,
    /// Number of records in the group.
    pub count: u64,
}
