use sqlx::Row;

use super::filters::{push_filter, push_order_by};
use super::*;

impl PostgresWorkflowRuntimeDataRepository {
    pub(super) async fn find_many_impl(
        &self,
        args: FindManyArgs,
        scope: &ProjectScope,
    ) -> AppResult<Vec<WorkflowRuntimeData>> {
        let args = self.scope_service.scope_find_many(args, scope).into_inner();
        let limit = args
            .limit
            .map(i64::try_from)
            .transpose()
            .map_err(|error| AppError::Validation(format!("invalid page size: {error}")))?;
        let offset = i64::try_from(args.offset)
            .map_err(|error| AppError::Validation(format!("invalid page offset: {error}")))?;

        let mut builder = select_runtime_data();
        push_filter(&mut builder, &args.filter);
        push_order_by(&mut builder, &args.sort);

        if let Some(limit) = limit {
            builder.push(" LIMIT ");
            builder.push_bind(limit);
        }
        builder.push(" OFFSET ");
        builder.push_bind(offset);

        let rows = builder
            .build_query_as::<RuntimeDataRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|error| {
                map_database_error(error, "failed to list workflow runtime data".to_owned())
            })?;

        log_round_trip("find_many", scope, rows.len());
        rows.into_iter().map(runtime_data_from_row).collect()
    }

    pub(super) async fn find_one_impl(
        &self,
        args: FindOneArgs,
        scope: &ProjectScope,
    ) -> AppResult<Option<WorkflowRuntimeData>> {
        let args = self.scope_service.scope_find_one(args, scope).into_inner();

        let mut builder = select_runtime_data();
        push_filter(&mut builder, &args.filter);
        push_order_by(&mut builder, &args.sort);
        builder.push(" LIMIT 1");

        let row = builder
            .build_query_as::<RuntimeDataRow>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| {
                map_database_error(error, "failed to find workflow runtime data".to_owned())
            })?;

        log_round_trip("find_one", scope, usize::from(row.is_some()));
        row.map(runtime_data_from_row).transpose()
    }

    pub(super) async fn find_by_id_unscoped_impl(
        &self,
        id: &str,
    ) -> AppResult<WorkflowRuntimeData> {
        let mut builder = select_runtime_data();
        builder.push("id = ");
        builder.push_bind(id.to_owned());

        let row = builder
            .build_query_as::<RuntimeDataRow>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| {
                map_database_error(error, format!("failed to find workflow runtime data '{id}'"))
            })?;

        debug!(
            record_id = %id,
            found = row.is_some(),
            "unscoped workflow runtime data lookup"
        );
        row.map(runtime_data_from_row)
            .transpose()?
            .ok_or_else(|| not_found(id))
    }

    pub(super) async fn count_impl(&self, args: CountArgs, scope: &ProjectScope) -> AppResult<u64> {
        let args = self.scope_service.scope_count(args, scope).into_inner();

        let mut builder: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM workflow_runtime_data WHERE ");
        push_filter(&mut builder, &args.filter);

        let count = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(|error| {
                map_database_error(error, "failed to count workflow runtime data".to_owned())
            })?;

        log_round_trip("count", scope, 1);
        u64::try_from(count).map_err(|error| {
            AppError::Internal(format!("invalid workflow runtime data count {count}: {error}"))
        })
    }

    pub(super) async fn group_by_impl(
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

        let columns = args
            .by
            .iter()
            .map(RuntimeDataField::column_name)
            .collect::<Vec<_>>();

        let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new("SELECT ");
        builder.push(columns.join(", "));
        builder.push(", COUNT(*) AS group_count FROM workflow_runtime_data WHERE ");
        push_filter(&mut builder, &args.filter);
        builder.push(" GROUP BY ");
        builder.push(columns.join(", "));
        builder.push(" ORDER BY ");
        builder.push(
            columns
                .iter()
                .map(|column| format!("{column} ASC NULLS FIRST"))
                .collect::<Vec<_>>()
                .join(", "),
        );

        let rows = builder.build().fetch_all(&self.pool).await.map_err(|error| {
            map_database_error(error, "failed to group workflow runtime data".to_owned())
        })?;

        log_round_trip("group_by", scope, rows.len());
        rows.into_iter()
            .map(|row| -> AppResult<RuntimeDataGroup> {
                let key = args
                    .by
                    .iter()
                    .enumerate()
                    .map(|(index, field)| {
                        row.try_get::<Option<String>, _>(index)
                            .map(|value| (*field, value))
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|error| {
                        AppError::Internal(format!("failed to decode group key: {error}"))
                    })?;
                let count = row.try_get::<i64, _>("group_count").map_err(|error| {
                    AppError::Internal(format!("failed to decode group count: {error}"))
                })?;

                Ok(RuntimeDataGroup {
                    key,
                    count: u64::try_from(count).map_err(|error| {
                        AppError::Internal(format!("invalid group count {count}: {error}"))
                    })?,
                })
            })
            .collect()
    }
}
