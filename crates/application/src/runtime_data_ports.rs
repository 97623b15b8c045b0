mod inputs;
mod query;
mod repository;
mod search;

pub use inputs::{
    ActiveWorkflowQuery, CreateRuntimeDataInput, LastActiveQuery, UpdateRuntimeDataInput,
};
pub use query::{
    CountArgs, DeleteArgs, FindManyArgs, FindOneArgs, GroupByArgs, RuntimeDataCondition,
    RuntimeDataConditionNode, RuntimeDataField, RuntimeDataFilter, RuntimeDataGroup,
    RuntimeDataLogicalMode, RuntimeDataSort, RuntimeDataSortField, SortDirection,
};
pub use repository::WorkflowRuntimeDataRepository;
pub use search::{
    AssigneeSelection, RuntimeDataOrderBy, RuntimeDataSearchFilters, RuntimeDataSearchQuery,
    SearchArguments, SearchOrderColumn,
};
