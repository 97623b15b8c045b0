//! Application services and ports.

#![forbid(unsafe_code)]

mod project_scope_service;
mod runtime_data_ports;
mod runtime_data_service;

pub use project_scope_service::{ProjectScopeService, Scoped};
pub use runtime_data_ports::{
    ActiveWorkflowQuery, AssigneeSelection, CountArgs, CreateRuntimeDataInput, DeleteArgs,
    FindManyArgs, FindOneArgs, GroupByArgs, LastActiveQuery, RuntimeDataCondition,
    RuntimeDataConditionNode, RuntimeDataField, RuntimeDataFilter, RuntimeDataGroup,
    RuntimeDataLogicalMode, RuntimeDataOrderBy, RuntimeDataSearchFilters, RuntimeDataSearchQuery,
    RuntimeDataSort, RuntimeDataSortField, SearchArguments, SearchOrderColumn, SortDirection,
    UpdateRuntimeDataInput, WorkflowRuntimeDataRepository,
};
pub use runtime_data_service::WorkflowRuntimeDataService;
