use async_trait::async_trait;
use flowvault_core::{AppError, AppResult, ProjectScope};
use flowvault_domain::{ArrayMergeOption, EntityRef, WorkflowRuntimeData, WorkflowRuntimeStatus};
use serde_json::Value;

use super::inputs::{
    ActiveWorkflowQuery, CreateRuntimeDataInput, LastActiveQuery, UpdateRuntimeDataInput,
};
use super::query::{
    CountArgs, FindManyArgs, FindOneArgs, GroupByArgs, RuntimeDataCondition, RuntimeDataField,
    RuntimeDataFilter, RuntimeDataGroup, RuntimeDataSort,
};
use super::search::{RuntimeDataSearchFilters, RuntimeDataSearchQuery};

/// Repository port for workflow runtime records.
///
/// Every operation taking a [`ProjectScope`] only reads or mutates records
/// whose project is in that scope. Records outside the scope are reported
/// exactly like missing ones.
#[async_trait]
pub trait WorkflowRuntimeDataRepository: Send + Sync {
    /// Persists a new record after assigning document ids.
    async fn create(&self, input: CreateRuntimeDataInput) -> AppResult<WorkflowRuntimeData>;

    /// Lists records matching the filter.
    async fn find_many(
        &self,
        args: FindManyArgs,
        scope: &ProjectScope,
    ) -> AppResult<Vec<WorkflowRuntimeData>>;

    /// Returns the first record matching the filter, if any.
    async fn find_one(
        &self,
        args: FindOneArgs,
        scope: &ProjectScope,
    ) -> AppResult<Option<WorkflowRuntimeData>>;

    /// Returns one record regardless of project.
    ///
    /// Reserved for trusted internal callers that established authorization
    /// by other means.
    async fn find_by_id_unscoped(&self, id: &str) -> AppResult<WorkflowRuntimeData>;

    /// Applies direct column updates and returns the re-read record.
    async fn update_by_id(
        &self,
        id: &str,
        input: UpdateRuntimeDataInput,
        scope: &ProjectScope,
    ) -> AppResult<WorkflowRuntimeData>;

    /// Deep-merges `patch` into the context document in one atomic statement.
    async fn update_context_by_id(
        &self,
        id: &str,
        patch: Value,
        merge_option: ArrayMergeOption,
        scope: &ProjectScope,
    ) -> AppResult<WorkflowRuntimeData>;

    /// Deep-merges `patch` into the config document in one atomic statement.
    async fn update_config_by_id(
        &self,
        id: &str,
        patch: Value,
        merge_option: ArrayMergeOption,
        scope: &ProjectScope,
    ) -> AppResult<WorkflowRuntimeData>;

    /// Deletes one record and returns it.
    async fn delete_by_id(&self, id: &str, scope: &ProjectScope)
    -> AppResult<WorkflowRuntimeData>;

    /// Counts records matching the filter.
    async fn count(&self, args: CountArgs, scope: &ProjectScope) -> AppResult<u64>;

    /// Counts records per distinct combination of the grouping columns.
    async fn group_by(
        &self,
        args: GroupByArgs,
        scope: &ProjectScope,
    ) -> AppResult<Vec<RuntimeDataGroup>>;

    /// Runs the server-side search and returns one page of record ids.
    async fn search(
        &self,
        query: RuntimeDataSearchQuery,
        filters: RuntimeDataSearchFilters,
        scope: &ProjectScope,
    ) -> AppResult<Vec<String>>;

    /// Returns one record or fails with `NotFound`.
    async fn find_by_id(&self, id: &str, scope: &ProjectScope) -> AppResult<WorkflowRuntimeData> {
        self.find_one(
            FindOneArgs {
                filter: RuntimeDataFilter::all([RuntimeDataCondition::Eq(
                    RuntimeDataField::Id,
                    id.to_owned(),
                )]),
                sort: Vec::new(),
            },
            scope,
        )
        .await?
        .ok_or_else(|| AppError::NotFound(format!("workflow runtime data '{id}' not found")))
    }

    /// Returns the in-flight (not completed) record of an entity and definition.
    async fn find_active_workflow_by_entity(
        &self,
        query: ActiveWorkflowQuery,
        scope: &ProjectScope,
    ) -> AppResult<Option<WorkflowRuntimeData>> {
        let entity_field = match query.entity {
            EntityRef::Business(_) => RuntimeDataField::BusinessId,
            EntityRef::EndUser(_) => RuntimeDataField::EndUserId,
        };

        self.find_one(
            FindOneArgs {
                filter: RuntimeDataFilter::all([
                    RuntimeDataCondition::Eq(
                        RuntimeDataField::WorkflowDefinitionId,
                        query.workflow_definition_id,
                    ),
                    RuntimeDataCondition::Eq(entity_field, query.entity.id().to_owned()),
                    RuntimeDataCondition::Neq(
                        RuntimeDataField::Status,
                        WorkflowRuntimeStatus::Completed.as_str().to_owned(),
                    ),
                ]),
                sort: vec![RuntimeDataSort::newest_first()],
            },
            scope,
        )
        .await
    }

    /// Returns the owning entity of one record, if visible.
    async fn find_entity_ref(
        &self,
        id: &str,
        scope: &ProjectScope,
    ) -> AppResult<Option<EntityRef>> {
        Ok(self
            .find_one(
                FindOneArgs {
                    filter: RuntimeDataFilter::all([RuntimeDataCondition::Eq(
                        RuntimeDataField::Id,
                        id.to_owned(),
                    )]),
                    sort: Vec::new(),
                },
                scope,
            )
            .await?
            .map(|record| record.entity().clone()))
    }

    /// Returns the context document of one record or fails with `NotFound`.
    async fn find_context(&self, id: &str, scope: &ProjectScope) -> AppResult<Value> {
        Ok(self.find_by_id(id, scope).await?.context().clone())
    }

    /// Returns the most recently created record of a business and definition,
    /// whatever its status.
    async fn find_last_active(
        &self,
        query: LastActiveQuery,
        scope: &ProjectScope,
    ) -> AppResult<Option<WorkflowRuntimeData>> {
        self.find_one(
            FindOneArgs {
                filter: RuntimeDataFilter::all([
                    RuntimeDataCondition::Eq(RuntimeDataField::BusinessId, query.business_id),
                    RuntimeDataCondition::Eq(
                        RuntimeDataField::WorkflowDefinitionId,
                        query.workflow_definition_id,
                    ),
                ]),
                sort: vec![RuntimeDataSort::newest_first()],
            },
            scope,
        )
        .await
    }
}
