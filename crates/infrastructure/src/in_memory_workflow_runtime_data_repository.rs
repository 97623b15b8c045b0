use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use flowvault_application::{
    CountArgs, CreateRuntimeDataInput, DeleteArgs, FindManyArgs, FindOneArgs, GroupByArgs,
    ProjectScopeService, RuntimeDataCondition, RuntimeDataField, RuntimeDataFilter,
    RuntimeDataGroup, RuntimeDataSearchFilters, RuntimeDataSearchQuery, SearchArguments,
    UpdateRuntimeDataInput, WorkflowRuntimeDataRepository,
};
use flowvault_core::{AppError, AppResult, ProjectScope};
use flowvault_domain::{
    ArrayMergeOption, WorkflowRuntimeData, WorkflowRuntimeDataInput, assign_document_ids,
    deep_merge,
};
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

mod evaluation;


use evaluation::{
    compare_records, compare_search_results, field_value, matches_filter, matches_search,
};

#[derive(Debug, Clone, Copy)]
enum MergeTarget {
    Context,
    Config,
}

/// In-memory workflow runtime data repository.
///
/// Evaluates the same query descriptors as the PostgreSQL adapter. Merges
/// run under the write lock, so concurrent patches never overwrite each other.
#[derive(Debug, Default)]
pub struct InMemoryWorkflowRuntimeDataRepository {
    records: RwLock<HashMap<String, WorkflowRuntimeData>>,
    scope_service: ProjectScopeService,
}

impl InMemoryWorkflowRuntimeDataRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            scope_service: ProjectScopeService::new(),
        }
    }

    async fn merge_document(
        &self,
        id: &str,
        patch: Value,
        merge_option: ArrayMergeOption,
        scope: &ProjectScope,
        target: MergeTarget,
    ) -> AppResult<WorkflowRuntimeData> {
        let filter = self.scope_service.scope_record(id, scope).into_inner();
        let mut records = self.records.write().await;
        let record = records
            .get_mut(id)
            .filter(|record| matches_filter(record, &filter))
            .ok_or_else(|| not_found(id))?;

        let now = Utc::now();
        match target {
            MergeTarget::Context => {
                let merged =
                    assign_document_ids(deep_merge(record.context(), &patch, merge_option))?;
                record.replace_context(merged, now)?;
            }
            MergeTarget::Config => {
                let merged = deep_merge(record.config(), &patch, merge_option);
                record.replace_config(merged, now)?;
            }
        }

        Ok(record.clone())
    }

    async fn matching(&self, filter: &RuntimeDataFilter) -> Vec<WorkflowRuntimeData> {
        self.records
            .read()
            .await
            .values()
            .filter(|record| matches_filter(record, filter))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl WorkflowRuntimeDataRepository for InMemoryWorkflowRuntimeDataRepository {
    async fn create(&self, input: CreateRuntimeDataInput) -> AppResult<WorkflowRuntimeData> {
        let input = input.normalized()?;
        let now = Utc::now();
        let created_at = input.created_at.unwrap_or(now);

        let record = WorkflowRuntimeData::new(WorkflowRuntimeDataInput {
            id: Uuid::new_v4().to_string(),
            project_id: input.project_id,
            workflow_definition_id: input.workflow_definition_id,
            workflow_definition_version: input.workflow_definition_version,
            entity: input.entity,
            status: input.status,
            state: input.state,
            context: input.context,
            config: input.config,
            tags: input.tags,
            assignee_id: input.assignee_id,
            created_at,
            updated_at: created_at,
        })?;

        let mut records = self.records.write().await;
        let id = record.id().as_str().to_owned();
        if records.contains_key(&id) {
            return Err(AppError::Conflict(format!(
                "workflow runtime data '{id}' already exists"
            )));
        }

        records.insert(id, record.clone());
        Ok(record)
    }

    async fn find_many(
        &self,
        args: FindManyArgs,
        scope: &ProjectScope,
    ) -> AppResult<Vec<WorkflowRuntimeData>> {
        let args = self.scope_service.scope_find_many(args, scope).into_inner();
        let mut records = self.matching(&args.filter).await;
        records.sort_by(|left, right| compare_records(left, right, &args.sort));

        let page = records.into_iter().skip(args.offset);
        Ok(match args.limit {
            Some(limit) => page.take(limit).collect(),
            None => page.collect(),
        })
    }

    async fn find_one(
        &self,
        args: FindOneArgs,
        scope: &ProjectScope,
    ) -> AppResult<Option<WorkflowRuntimeData>> {
        let args = self.scope_service.scope_find_one(args, scope).into_inner();
        let records = self.matching(&args.filter).await;

        Ok(records
            .into_iter()
            .min_by(|left, right| compare_records(left, right, &args.sort)))
    }

    async fn find_by_id_unscoped(&self, id: &str) -> AppResult<WorkflowRuntimeData> {
        self.records
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    async fn update_by_id(
        &self,
        id: &str,
        input: UpdateRuntimeDataInput,
        scope: &ProjectScope,
    ) -> AppResult<WorkflowRuntimeData> {
        input.validate()?;

        let filter = self.scope_service.scope_record(id, scope).into_inner();
        let mut records = self.records.write().await;
        let record = records
            .get_mut(id)
            .filter(|record| matches_filter(record, &filter))
            .ok_or_else(|| not_found(id))?;

        let now = Utc::now();
        if let Some(status) = input.status {
            record.set_status(status, now);
        }
        if let Some(state) = input.state {
            record.set_state(state, now);
        }
        if let Some(assignee_id) = input.assignee_id {
            record.set_assignee_id(assignee_id, now);
        }
        if let Some(tags) = input.tags {
            record.set_tags(tags, now);
        }

        Ok(record.clone())
    }

    async fn update_context_by_id(
        &self,
        id: &str,
        patch: Value,
        merge_option: ArrayMergeOption,
        scope: &ProjectScope,
    ) -> AppResult<WorkflowRuntimeData> {
        self.merge_document(id, patch, merge_option, scope, MergeTarget::Context)
            .await
    }

    async fn update_config_by_id(
        &self,
        id: &str,
        patch: Value,
        merge_option: ArrayMergeOption,
        scope: &ProjectScope,
    ) -> AppResult<WorkflowRuntimeData> {
        self.merge_document(id, patch, merge_option, scope, MergeTarget::Config)
            .await
    }

    async fn delete_by_id(
        &self,
        id: &str,
        scope: &ProjectScope,
    ) -> AppResult<WorkflowRuntimeData> {
        let args = self
            .scope_service
            .scope_delete(
                DeleteArgs {
                    filter: RuntimeDataFilter::all([RuntimeDataCondition::Eq(
                        RuntimeDataField::Id,
                        id.to_owned(),
                    )]),
                },
                scope,
            )
            .into_inner();

        let mut records = self.records.write().await;
        let visible = records
            .get(id)
            .is_some_and(|record| matches_filter(record, &args.filter));
        if !visible {
            return Err(not_found(id));
        }

        records.remove(id).ok_or_else(|| not_found(id))
    }

    async fn count(&self, args: CountArgs, scope: &ProjectScope) -> AppResult<u64> {
        let args = self.scope_service.scope_count(args, scope).into_inner();
        let count = self.matching(&args.filter).await.len();

        u64::try_from(count).map_err(|error| {
            AppError::Internal(format!("invalid workflow runtime data count {count}: {error}"))
        })
    }

    async fn group_by(
        &self,
        args: GroupByArgs,
        scope: &ProjectScope,
    ) -> AppResult<Vec<RuntimeDataGroup>> {
        let args = self.scope_service.scope_group_by(args, scope).into_inner();
        if args.by.is_empty() {
            return Err(AppError::Validation(
                "group by requires at least one field".to_owned(),
            ));
        }

        let mut groups: BTreeMap<Vec<Option<String>>, u64> = BTreeMap::new();
        for record in self.matching(&args.filter).await {
            let key = args
                .by
                .iter()
                .map(|field| field_value(&record, *field).map(str::to_owned))
                .collect();
            *groups.entry(key).or_insert(0) += 1;
        }

        Ok(groups
            .into_iter()
            .map(|(values, count)| RuntimeDataGroup {
                key: args.by.iter().copied().zip(values).collect(),
                count,
            })
            .collect())
    }

    async fn search(
        &self,
        query: RuntimeDataSearchQuery,
        filters: RuntimeDataSearchFilters,
        scope: &ProjectScope,
    ) -> AppResult<Vec<String>> {
        let arguments = SearchArguments::build(&query, &filters, scope)?;

        let mut records: Vec<WorkflowRuntimeData> = self
            .records
            .read()
            .await
            .values()
            .filter(|record| matches_search(record, &arguments))
            .cloned()
            .collect();
        records.sort_by(|left, right| compare_search_results(left, right, &query.order_by));

        Ok(records
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .map(|record| record.id().as_str().to_owned())
            .collect())
    }
}

fn not_found(id: &str) -> AppError {
    AppError::NotFound(format!("workflow runtime data '{id}' not found"))
}
