use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flowvault_application::{
    CountArgs, CreateRuntimeDataInput, DeleteArgs, FindManyArgs, FindOneArgs, GroupByArgs,
    ProjectScopeService, RuntimeDataCondition, RuntimeDataField, RuntimeDataFilter,
    RuntimeDataGroup, RuntimeDataSearchFilters, RuntimeDataSearchQuery, UpdateRuntimeDataInput,
    WorkflowRuntimeDataRepository,
};
use flowvault_core::{AppError, AppResult, ProjectId, ProjectScope};
use flowvault_domain::{
    ArrayMergeOption, EntityRef, WorkflowRuntimeData, WorkflowRuntimeDataInput,
    WorkflowRuntimeStatus,
};
use serde_json::Value;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use tracing::{debug, warn};

mod filters;
mod reads;
mod search;
mod writes;

#[cfg(test)]
mod tests;

const RUNTIME_DATA_COLUMNS: &str = "id, project_id, workflow_definition_id, \
    workflow_definition_version, business_id, end_user_id, status, state, context, config, \
    tags, assignee_id, created_at, updated_at";

/// PostgreSQL-backed workflow runtime data repository.
#[derive(Clone)]
pub struct PostgresWorkflowRuntimeDataRepository {
    pool: PgPool,
    scope_service: ProjectScopeService,
}

impl PostgresWorkflowRuntimeDataRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            scope_service: ProjectScopeService::new(),
        }
    }
}

#[derive(Debug, FromRow)]
struct RuntimeDataRow {
    id: String,
    project_id: String,
    workflow_definition_id: String,
    workflow_definition_version: i32,
    business_id: Option<String>,
    end_user_id: Option<String>,
    status: String,
    state: Option<String>,
    context: Value,
    config: Value,
    tags: Vec<String>,
    assignee_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// JSON document column targeted by a merge update.
#[derive(Debug, Clone, Copy)]
enum DocumentColumn {
    Context,
    Config,
}

impl DocumentColumn {
    fn as_str(self) -> &'static str {
        match self {
            Self::Context => "context",
            Self::Config => "config",
        }
    }

    /// SQL function applied to the merged document before it is stored.
    fn normalizer(self) -> Option<&'static str> {
        match self {
            Self::Context => Some("workflow_context_with_document_ids"),
            Self::Config => None,
        }
    }
}

#[async_trait]
impl WorkflowRuntimeDataRepository for PostgresWorkflowRuntimeDataRepository {
    async fn create(&self, input: CreateRuntimeDataInput) -> AppResult<WorkflowRuntimeData> {
        self.create_impl(input).await
    }

    async fn find_many(
        &self,
        args: FindManyArgs,
        scope: &ProjectScope,
    ) -> AppResult<Vec<WorkflowRuntimeData>> {
        self.find_many_impl(args, scope).await
    }

    async fn find_one(
        &self,
        args: FindOneArgs,
        scope: &ProjectScope,
    ) -> AppResult<Option<WorkflowRuntimeData>> {
        self.find_one_impl(args, scope).await
    }

    async fn find_by_id_unscoped(&self, id: &str) -> AppResult<WorkflowRuntimeData> {
        self.find_by_id_unscoped_impl(id).await
    }

    async fn update_by_id(
        &self,
        id: &str,
        input: UpdateRuntimeDataInput,
        scope: &ProjectScope,
    ) -> AppResult<WorkflowRuntimeData> {
        self.update_by_id_impl(id, input, scope).await
    }

    async fn update_context_by_id(
        &self,
        id: &str,
        patch: Value,
        merge_option: ArrayMergeOption,
        scope: &ProjectScope,
    ) -> AppResult<WorkflowRuntimeData> {
        self.merge_document_impl(DocumentColumn::Context, id, patch, merge_option, scope)
            .await
    }

    async fn update_config_by_id(
        &self,
        id: &str,
        patch: Value,
        merge_option: ArrayMergeOption,
        scope: &ProjectScope,
    ) -> AppResult<WorkflowRuntimeData> {
        self.merge_document_impl(DocumentColumn::Config, id, patch, merge_option, scope)
            .await
    }

    async fn delete_by_id(
        &self,
        id: &str,
        scope: &ProjectScope,
    ) -> AppResult<WorkflowRuntimeData> {
        self.delete_by_id_impl(id, scope).await
    }

    async fn count(&self, args: CountArgs, scope: &ProjectScope) -> AppResult<u64> {
        self.count_impl(args, scope).await
    }

    async fn group_by(
        &self,
        args: GroupByArgs,
        scope: &ProjectScope,
    ) -> AppResult<Vec<RuntimeDataGroup>> {
        self.group_by_impl(args, scope).await
    }

    async fn search(
        &self,
        query: RuntimeDataSearchQuery,
        filters: RuntimeDataSearchFilters,
        scope: &ProjectScope,
    ) -> AppResult<Vec<String>> {
        self.search_impl(query, filters, scope).await
    }
}

fn id_filter(id: &str) -> RuntimeDataFilter {
    RuntimeDataFilter::all([RuntimeDataCondition::Eq(
        RuntimeDataField::Id,
        id.to_owned(),
    )])
}

fn not_found(id: &str) -> AppError {
    AppError::NotFound(format!("workflow runtime data '{id}' not found"))
}

/// Maps a driver error onto the application taxonomy.
///
/// Unique and foreign key violations are conflicts; invalid input, invalid
/// parameter, not-null and check violations are validation failures.
fn map_database_error(error: sqlx::Error, action: String) -> AppError {
    if let sqlx::Error::Database(database_error) = &error {
        match database_error.code().as_deref() {
            Some("23505" | "23503") => {
                return AppError::Conflict(format!("{action}: {database_error}"));
            }
            Some("22P02" | "22023" | "23502" | "23514") => {
                return AppError::Validation(format!("{action}: {database_error}"));
            }
            _ => {}
        }
    }

    AppError::Internal(format!("{action}: {error}"))
}

fn runtime_data_from_row(row: RuntimeDataRow) -> AppResult<WorkflowRuntimeData> {
    let entity = EntityRef::from_columns(row.business_id, row.end_user_id).map_err(|error| {
        AppError::Internal(format!(
            "persisted workflow runtime data '{}' has an invalid entity: {error}",
            row.id
        ))
    })?;

    WorkflowRuntimeData::new(WorkflowRuntimeDataInput {
        project_id: ProjectId::new(row.project_id)?,
        workflow_definition_id: row.workflow_definition_id,
        workflow_definition_version: row.workflow_definition_version,
        entity,
        status: WorkflowRuntimeStatus::parse(row.status.as_str())?,
        state: row.state,
        context: row.context,
        config: row.config,
        tags: row.tags,
        assignee_id: row.assignee_id,
        created_at: row.created_at,
        updated_at: row.updated_at,
        id: row.id,
    })
}

fn select_runtime_data() -> QueryBuilder<'static, Postgres> {
    QueryBuilder::new(format!(
        "SELECT {RUNTIME_DATA_COLUMNS} FROM workflow_runtime_data WHERE "
    ))
}

fn log_round_trip(operation: &'static str, scope: &ProjectScope, rows: usize) {
    debug!(
        operation,
        project_count = scope.len(),
        rows,
        "workflow runtime data round trip"
    );
}

fn log_unmatched_mutation(operation: &'static str, id: &str, scope: &ProjectScope) {
    warn!(
        operation,
        record_id = %id,
        project_count = scope.len(),
        "scoped mutation matched no workflow runtime data"
    );
}
