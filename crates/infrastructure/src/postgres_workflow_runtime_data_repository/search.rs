use flowvault_application::SearchArguments;

use super::*;

impl PostgresWorkflowRuntimeDataRepository {
    pub(super) async fn search_impl(
        &self,
        query: RuntimeDataSearchQuery,
        filters: RuntimeDataSearchFilters,
        scope: &ProjectScope,
    ) -> AppResult<Vec<String>> {
        let arguments = SearchArguments::build(&query, &filters, scope)?;

        let ids = sqlx::query_scalar::<_, String>(
            r#"
            SELECT id
            FROM search_workflow_data(
                $1::text,
                $2::text,
                $3::text,
                $4::text,
                $5::text[],
                $6::text[],
                $7::text[],
                $8::text[],
                $9::text[],
                $10::boolean
            )
            LIMIT $11
            OFFSET $12
            "#,
        )
        .bind(arguments.search.as_deref())
        .bind(arguments.entity_type)
        .bind(arguments.order_column)
        .bind(arguments.order_direction)
        .bind(&arguments.workflow_definition_ids)
        .bind(&arguments.statuses)
        .bind(&arguments.project_ids)
        .bind(&arguments.assignee_ids)
        .bind(&arguments.case_statuses)
        .bind(arguments.include_unassigned)
        .bind(arguments.limit)
        .bind(arguments.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            map_database_error(error, "failed to search workflow runtime data".to_owned())
        })?;

        debug!(
            entity_type = arguments.entity_type,
            order_column = arguments.order_column,
            order_direction = arguments.order_direction,
            project_count = arguments.project_ids.len(),
            rows = ids.len(),
            "searched workflow runtime data"
        );
        Ok(ids)
    }
}
