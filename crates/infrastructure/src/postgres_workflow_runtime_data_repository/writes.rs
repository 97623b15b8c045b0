use uuid::Uuid;

use super::filters::push_filter;
use super::*;

impl PostgresWorkflowRuntimeDataRepository {
    pub(super) async fn create_impl(
        &self,
        input: CreateRuntimeDataInput,
    ) -> AppResult<WorkflowRuntimeData> {
        let input = input.normalized()?;
        let id = Uuid::new_v4().to_string();

        let sql = format!(
            r#"
            INSERT INTO workflow_runtime_data (
                id,
                project_id,
                workflow_definition_id,
                workflow_definition_version,
                business_id,
                end_user_id,
                status,
                state,
                context,
                config,
                tags,
                assignee_id,
                created_at,
                updated_at
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                COALESCE($13, now()),
                COALESCE($13, now())
            )
            RETURNING {RUNTIME_DATA_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, RuntimeDataRow>(sql.as_str())
            .bind(id.as_str())
            .bind(input.project_id.as_str())
            .bind(input.workflow_definition_id.as_str())
            .bind(input.workflow_definition_version)
            .bind(input.entity.business_id())
            .bind(input.entity.end_user_id())
            .bind(input.status.as_str())
            .bind(input.state.as_deref())
            .bind(&input.context)
            .bind(&input.config)
            .bind(&input.tags)
            .bind(input.assignee_id.as_deref())
            .bind(input.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|error| {
                map_database_error(
                    error,
                    format!(
                        "failed to create workflow runtime data for definition '{}' in project '{}'",
                        input.workflow_definition_id, input.project_id
                    ),
                )
            })?;

        debug!(
            record_id = %id,
            project_id = %input.project_id,
            workflow_definition_id = %input.workflow_definition_id,
            "created workflow runtime data"
        );
        runtime_data_from_row(row)
    }

    pub(super) async fn update_by_id_impl(
        &self,
        id: &str,
        input: UpdateRuntimeDataInput,
        scope: &ProjectScope,
    ) -> AppResult<WorkflowRuntimeData> {
        input.validate()?;

        let mut builder: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("UPDATE workflow_runtime_data SET updated_at = now()");

        if let Some(status) = input.status {
            builder.push(", status = ");
            builder.push_bind(status.as_str());
        }
        if let Some(state) = input.state {
            builder.push(", state = ");
            builder.push_bind(state);
        }
        if let Some(assignee_id) = input.assignee_id {
            builder.push(", assignee_id = ");
            builder.push_bind(assignee_id);
        }
        if let Some(tags) = input.tags {
            builder.push(", tags = ");
            builder.push_bind(tags);
        }

        builder.push(" WHERE ");
        push_filter(&mut builder, self.scope_service.scope_record(id, scope).args());
        builder.push(format!(" RETURNING {RUNTIME_DATA_COLUMNS}"));

        let row = builder
            .build_query_as::<RuntimeDataRow>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| {
                map_database_error(error, format!("failed to update workflow runtime data '{id}'"))
            })?;

        let Some(row) = row else {
            log_unmatched_mutation("update_by_id", id, scope);
            return Err(not_found(id));
        };

        debug!(record_id = %id, project_count = scope.len(), "updated workflow runtime data");
        runtime_data_from_row(row)
    }

    /// Deep-merges a patch into one JSON document column in a single statement.
    ///
    /// The merge runs inside the database, so concurrent patches to the same
    /// record serialize on the row lock and none of them is lost. Context
    /// merges also assign ids to documents that arrive without one.
    pub(super) async fn merge_document_impl(
        &self,
        column: DocumentColumn,
        id: &str,
        patch: Value,
        merge_option: ArrayMergeOption,
        scope: &ProjectScope,
    ) -> AppResult<WorkflowRuntimeData> {
        let mut builder: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("UPDATE workflow_runtime_data SET ");
        builder.push(column.as_str());
        builder.push(" = ");
        if let Some(normalizer) = column.normalizer() {
            builder.push(normalizer);
            builder.push('(');
        }
        builder.push("jsonb_deep_merge_with_options(");
        builder.push(column.as_str());
        builder.push(", ");
        builder.push_bind(patch);
        builder.push("::jsonb, ");
        builder.push_bind(merge_option.as_str());
        builder.push(')');
        if column.normalizer().is_some() {
            builder.push(')');
        }
        builder.push(", updated_at = now() WHERE ");
        push_filter(&mut builder, self.scope_service.scope_record(id, scope).args());
        builder.push(format!(" RETURNING {RUNTIME_DATA_COLUMNS}"));

        let row = builder
            .build_query_as::<RuntimeDataRow>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| {
                map_database_error(
                    error,
                    format!(
                        "failed to merge {} of workflow runtime data '{id}'",
                        column.as_str()
                    ),
                )
            })?;

        let Some(row) = row else {
            log_unmatched_mutation("merge_document", id, scope);
            return Err(not_found(id));
        };

        debug!(
            record_id = %id,
            document = column.as_str(),
            merge_option = merge_option.as_str(),
            rows_affected = 1,
            "merged workflow runtime data document"
        );
        runtime_data_from_row(row)
    }

    pub(super) async fn delete_by_id_impl(
        &self,
        id: &str,
        scope: &ProjectScope,
    ) -> AppResult<WorkflowRuntimeData> {
        let args = self
            .scope_service
            .scope_delete(
                DeleteArgs {
                    filter: id_filter(id),
                },
                scope,
            )
            .into_inner();

        let mut builder: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("DELETE FROM workflow_runtime_data WHERE ");
        push_filter(&mut builder, &args.filter);
        builder.push(format!(" RETURNING {RUNTIME_DATA_COLUMNS}"));

        let row = builder
            .build_query_as::<RuntimeDataRow>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| {
                map_database_error(error, format!("failed to delete workflow runtime data '{id}'"))
            })?;

        let Some(row) = row else {
            log_unmatched_mutation("delete_by_id", id, scope);
            return Err(not_found(id));
        };

        debug!(record_id = %id, project_count = scope.len(), "deleted workflow runtime data");
        runtime_data_from_row(row)
    }
}
