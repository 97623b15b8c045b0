use flowvault_core::{AppError, AppResult, ProjectScope};
use flowvault_domain::{EntityType, WorkflowRuntimeStatus};

use super::query::SortDirection;

/// Column accepted by the search procedure ordering argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOrderColumn {
    /// Creation timestamp.
    CreatedAt,
    /// Last modification timestamp.
    UpdatedAt,
    /// Lifecycle status.
    Status,
    /// Workflow definition identifier.
    WorkflowDefinitionId,
    /// Assigned operator.
    AssigneeId,
}

impl SearchOrderColumn {
    /// Returns the column name passed to `search_workflow_data`.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
            Self::Status => "status",
            Self::WorkflowDefinitionId => "workflow_definition_id",
            Self::AssigneeId => "assignee_id",
        }
    }

    /// Parses transport value.
    pub fn parse_transport(value: &str) -> AppResult<Self> {
        match value {
            "created_at" => Ok(Self::CreatedAt),
            "updated_at" => Ok(Self::UpdatedAt),
            "status" => Ok(Self::Status),
            "workflow_definition_id" => Ok(Self::WorkflowDefinitionId),
            "assignee_id" => Ok(Self::AssigneeId),
            _ => Err(AppError::Validation(format!(
                "unknown search order column '{value}'"
            ))),
        }
    }
}

/// Search ordering parsed from a combined `column:direction` token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeDataOrderBy {
    /// Ordering column.
    pub column: SearchOrderColumn,
    /// Ordering direction.
    pub direction: SortDirection,
}

impl RuntimeDataOrderBy {
    /// Parses `column:direction`; a missing direction means descending.
    pub fn parse(token: &str) -> AppResult<Self> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AppError::Validation(
                "search order token must not be empty".to_owned(),
            ));
        }

        let (column, direction) = match token.split_once(':') {
            Some((column, direction)) => (column, SortDirection::parse_transport(direction)?),
            None => (token, SortDirection::Desc),
        };

        Ok(Self {
            column: SearchOrderColumn::parse_transport(column)?,
            direction,
        })
    }
}

impl Default for RuntimeDataOrderBy {
    fn default() -> Self {
        Self {
            column: SearchOrderColumn::CreatedAt,
            direction: SortDirection::Desc,
        }
    }
}

/// Search and pagination inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeDataSearchQuery {
    /// Free-text term.
    pub search: Option<String>,
    /// Entity kind the result must reference.
    pub entity_type: EntityType,
    /// Result ordering.
    pub order_by: RuntimeDataOrderBy,
    /// Allowed workflow definitions; empty means any.
    pub workflow_definition_ids: Vec<String>,
    /// Allowed statuses; empty means any.
    pub statuses: Vec<WorkflowRuntimeStatus>,
    /// Page size.
    pub limit: usize,
    /// Rows skipped.
    pub offset: usize,
}

impl RuntimeDataSearchQuery {
    /// Creates a first-page query for one entity kind.
    #[must_use]
    pub fn new(entity_type: EntityType, limit: usize) -> Self {
        Self {
            search: None,
            entity_type,
            order_by: RuntimeDataOrderBy::default(),
            workflow_definition_ids: Vec::new(),
            statuses: Vec::new(),
            limit,
            offset: 0,
        }
    }
}

/// Facet filters applied by search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeDataSearchFilters {
    /// Allowed case status tags; empty means any.
    pub case_statuses: Vec<String>,
    /// Allowed assignees; `None` selects unassigned records.
    pub assignee_ids: Vec<Option<String>>,
}

/// Assignee filter split into concrete ids and the unassigned marker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssigneeSelection {
    /// Concrete assignee identifiers.
    pub assignee_ids: Vec<String>,
    /// Whether records without an assignee are included.
    pub include_unassigned: bool,
}

impl AssigneeSelection {
    /// Splits an assignee filter list.
    #[must_use]
    pub fn from_filter(assignee_ids: &[Option<String>]) -> Self {
        Self {
            assignee_ids: assignee_ids.iter().flatten().cloned().collect(),
            include_unassigned: assignee_ids.iter().any(Option::is_none),
        }
    }
}

/// Positional arguments of one `search_workflow_data` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchArguments {
    /// Trimmed free-text term, `None` when blank.
    pub search: Option<String>,
    /// Entity type discriminator.
    pub entity_type: &'static str,
    /// Ordering column.
    pub order_column: &'static str,
    /// Ordering direction.
    pub order_direction: &'static str,
    /// Allowed workflow definitions.
    pub workflow_definition_ids: Vec<String>,
    /// Allowed statuses.
    pub statuses: Vec<String>,
    /// Authorized projects, always taken from the caller scope.
    pub project_ids: Vec<String>,
    /// Concrete assignees.
    pub assignee_ids: Vec<String>,
    /// Allowed case status tags.
    pub case_statuses: Vec<String>,
    /// Whether unassigned records are included.
    pub include_unassigned: bool,
    /// Page size.
    pub limit: i64,
    /// Rows skipped.
    pub offset: i64,
}

impl SearchArguments {
    /// Builds procedure arguments; project ids come only from `scope`.
    pub fn build(
        query: &RuntimeDataSearchQuery,
        filters: &RuntimeDataSearchFilters,
        scope: &ProjectScope,
    ) -> AppResult<Self> {
        let assignees = AssigneeSelection::from_filter(&filters.assignee_ids);

        Ok(Self {
            search: query
                .search
                .as_deref()
                .map(str::trim)
                .filter(|search| !search.is_empty())
                .map(str::to_owned),
            entity_type: query.entity_type.as_str(),
            order_column: query.order_by.column.as_str(),
            order_direction: query.order_by.direction.as_str(),
            workflow_definition_ids: query.workflow_definition_ids.clone(),
            statuses: query
                .statuses
                .iter()
                .map(|status| status.as_str().to_owned())
                .collect(),
            project_ids: scope.as_strings(),
            assignee_ids: assignees.assignee_ids,
            case_statuses: filters.case_statuses.clone(),
            include_unassigned: assignees.include_unassigned,
            limit: i64::try_from(query.limit).map_err(|error| {
                AppError::Validation(format!("invalid search limit: {error}"))
            })?,
            offset: i64::try_from(query.offset).map_err(|error| {
                AppError::Validation(format!("invalid search offset: {error}"))
            })?,
        })
    }
}
