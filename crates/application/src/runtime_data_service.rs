use std::sync::Arc;

use flowvault_core::{AppError, AppResult, ProjectId, ProjectScope};
use flowvault_domain::{ArrayMergeOption, EntityRef, WorkflowRuntimeData};
use serde_json::Value;

use crate::runtime_data_ports::{
    ActiveWorkflowQuery, CountArgs, CreateRuntimeDataInput, FindManyArgs, GroupByArgs,
    LastActiveQuery, RuntimeDataGroup, RuntimeDataSearchFilters, RuntimeDataSearchQuery,
    UpdateRuntimeDataInput, WorkflowRuntimeDataRepository,
};

const MAX_PAGE_SIZE: usize = 1000;

/// Tenant-facing access to workflow runtime records.
///
/// Every read and mutation takes the caller's [`ProjectScope`] explicitly.
#[derive(Clone)]
pub struct WorkflowRuntimeDataService {
    repository: Arc<dyn WorkflowRuntimeDataRepository>,
}

impl WorkflowRuntimeDataService {
    /// Creates a runtime data service.
    #[must_use]
    pub fn new(repository: Arc<dyn WorkflowRuntimeDataRepository>) -> Self {
        Self { repository }
    }

    /// Persists a runtime record for a newly initiated workflow.
    pub async fn create(&self, input: CreateRuntimeDataInput) -> AppResult<WorkflowRuntimeData> {
        self.repository.create(input).await
    }

    /// Returns one record or `NotFound`.
    pub async fn get(&self, id: &str, scope: &ProjectScope) -> AppResult<WorkflowRuntimeData> {
        self.repository.find_by_id(id, scope).await
    }

    /// Lists records; the page size must be between 1 and 1000 when set.
    pub async fn list(
        &self,
        args: FindManyArgs,
        scope: &ProjectScope,
    ) -> AppResult<Vec<WorkflowRuntimeData>> {
        if let Some(limit) = args.limit {
            validate_page_size(limit)?;
        }

        self.repository.find_many(args, scope).await
    }

    /// Counts matching records.
    pub async fn count(&self, args: CountArgs, scope: &ProjectScope) -> AppResult<u64> {
        self.repository.count(args, scope).await
    }

    /// Counts records per group.
    pub async fn group_by(
        &self,
        args: GroupByArgs,
        scope: &ProjectScope,
    ) -> AppResult<Vec<RuntimeDataGroup>> {
        if args.by.is_empty() {
            return Err(AppError::Validation(
                "group by requires at least one field".to_owned(),
            ));
        }

        self.repository.group_by(args, scope).await
    }

    /// Applies direct column updates.
    pub async fn update(
        &self,
        id: &str,
        input: UpdateRuntimeDataInput,
        scope: &ProjectScope,
    ) -> AppResult<WorkflowRuntimeData> {
        input.validate()?;
        self.repository.update_by_id(id, input, scope).await
    }

    /// Deep-merges a context patch.
    pub async fn merge_context(
        &self,
        id: &str,
        patch: Value,
        merge_option: ArrayMergeOption,
        scope: &ProjectScope,
    ) -> AppResult<WorkflowRuntimeData> {
        self.repository
            .update_context_by_id(id, patch, merge_option, scope)
            .await
    }

    /// Deep-merges a config patch.
    pub async fn merge_config(
        &self,
        id: &str,
        patch: Value,
        merge_option: ArrayMergeOption,
        scope: &ProjectScope,
    ) -> AppResult<WorkflowRuntimeData> {
        self.repository
            .update_config_by_id(id, patch, merge_option, scope)
            .await
    }

    /// Deletes one record.
    pub async fn delete(&self, id: &str, scope: &ProjectScope) -> AppResult<WorkflowRuntimeData> {
        self.repository.delete_by_id(id, scope).await
    }

    /// Returns the context document of one record.
    pub async fn context(&self, id: &str, scope: &ProjectScope) -> AppResult<Value> {
        self.repository.find_context(id, scope).await
    }

    /// Returns the owning entity of one record, if visible.
    pub async fn entity_ref(&self, id: &str, scope: &ProjectScope) -> AppResult<Option<EntityRef>> {
        self.repository.find_entity_ref(id, scope).await
    }

    /// Returns the in-flight record of an entity and definition.
    pub async fn active_workflow_for_entity(
        &self,
        query: ActiveWorkflowQuery,
        scope: &ProjectScope,
    ) -> AppResult<Option<WorkflowRuntimeData>> {
        self.repository
            .find_active_workflow_by_entity(query, scope)
            .await
    }

    /// Returns the most recently created record of a business and definition.
    pub async fn last_active(
        &self,
        query: LastActiveQuery,
        scope: &ProjectScope,
    ) -> AppResult<Option<WorkflowRuntimeData>> {
        self.repository.find_last_active(query, scope).await
    }

    /// Searches records and returns one page of ids.
    pub async fn search(
        &self,
        query: RuntimeDataSearchQuery,
        filters: RuntimeDataSearchFilters,
        scope: &ProjectScope,
    ) -> AppResult<Vec<String>> {
        validate_page_size(query.limit)?;
        self.repository.search(query, filters, scope).await
    }

    /// Resolves the project and owning entity of a record before any
    /// project scope is known.
    ///
    /// Trusted internal path only; never reachable with tenant input.
    pub async fn resolve_owner_unscoped(&self, id: &str) -> AppResult<(ProjectId, EntityRef)> {
        let record = self.repository.find_by_id_unscoped(id).await?;
        Ok((record.project_id().clone(), record.entity().clone()))
    }
}

fn validate_page_size(limit: usize) -> AppResult<()> {
    if limit == 0 || limit > MAX_PAGE_SIZE {
        return Err(AppError::Validation(format!(
            "page size must be between 1 and {MAX_PAGE_SIZE}, got {limit}"
        )));
    }

    Ok(())
}
