use flowvault_application::{
    CountArgs, CreateRuntimeDataInput, FindManyArgs, GroupByArgs, RuntimeDataCondition,
    RuntimeDataField, RuntimeDataFilter, RuntimeDataSearchFilters, RuntimeDataSearchQuery,
    UpdateRuntimeDataInput, WorkflowRuntimeDataRepository,
};
use flowvault_core::{AppError, ProjectId, ProjectScope};
use flowvault_domain::{
    ArrayMergeOption, EntityRef, EntityType, WorkflowRuntimeData, WorkflowRuntimeStatus,
};
use serde_json::json;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use super::PostgresWorkflowRuntimeDataRepository;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

async fn test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        return None;
    };

    let pool = match PgPoolOptions::new()
        .max_connections(4)
        .connect(database_url.as_str())
        .await
    {
        Ok(pool) => pool,
        Err(error) => panic!("failed to connect to DATABASE_URL in test: {error}"),
    };

    if let Err(error) = MIGRATOR.run(&pool).await {
        panic!("failed to run migrations for postgres runtime data tests: {error}");
    }

    Some(pool)
}

fn unique_project() -> ProjectId {
    ProjectId::new(format!("project-{}", Uuid::new_v4())).unwrap_or_else(|_| unreachable!())
}

fn business(id: &str) -> EntityRef {
    EntityRef::new(EntityType::Business, id).unwrap_or_else(|_| unreachable!())
}

async fn create_record(
    repository: &PostgresWorkflowRuntimeDataRepository,
    input: CreateRuntimeDataInput,
) -> WorkflowRuntimeData {
    let created = repository.create(input).await;
    assert!(created.is_ok());
    created.unwrap_or_else(|_| unreachable!())
}

#[tokio::test]
async fn records_outside_scope_are_invisible() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresWorkflowRuntimeDataRepository::new(pool);
    let owner = unique_project();
    let other = unique_project();
    let record = create_record(
        &repository,
        CreateRuntimeDataInput::new(owner.clone(), "kyb", business("b-1")),
    )
    .await;
    let id = record.id().as_str();

    let foreign = repository
        .find_by_id(id, &ProjectScope::single(other.clone()))
        .await;
    assert!(matches!(foreign, Err(AppError::NotFound(_))));

    let empty = repository.find_by_id(id, &ProjectScope::empty()).await;
    assert!(matches!(empty, Err(AppError::NotFound(_))));

    let merged = repository
        .update_context_by_id(
            id,
            json!({"hijacked": true}),
            ArrayMergeOption::ById,
            &ProjectScope::single(other.clone()),
        )
        .await;
    assert!(matches!(merged, Err(AppError::NotFound(_))));

    let deleted = repository
        .delete_by_id(id, &ProjectScope::single(other))
        .await;
    assert!(matches!(deleted, Err(AppError::NotFound(_))));

    let visible = repository
        .find_by_id(id, &ProjectScope::single(owner.clone()))
        .await;
    assert!(visible.is_ok());
    let visible = visible.unwrap_or_else(|_| unreachable!());
    assert_eq!(visible.context(), &json!({"documents": []}));

    let unscoped = repository.find_by_id_unscoped(id).await;
    assert!(unscoped.is_ok());
    assert_eq!(
        unscoped.unwrap_or_else(|_| unreachable!()).project_id(),
        &owner
    );
}

#[tokio::test]
async fn create_assigns_document_ids() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresWorkflowRuntimeDataRepository::new(pool);
    let project = unique_project();
    let record = create_record(
        &repository,
        CreateRuntimeDataInput::new(project, "kyb", business("b-2")).with_context(json!({
            "documents": [{"type": "passport"}, {"id": "doc-1", "type": "license"}],
            "entity": {"name": "Acme"}
        })),
    )
    .await;

    let documents = record
        .context()
        .get("documents")
        .and_then(|value| value.as_array())
        .cloned()
        .unwrap_or_default();
    assert_eq!(documents.len(), 2);
    assert!(
        documents
            .iter()
            .all(|document| document.get("id").and_then(|id| id.as_str()).is_some())
    );
    assert_eq!(documents[1]["id"], json!("doc-1"));
    assert_eq!(record.context()["entity"], json!({"name": "Acme"}));
}

#[tokio::test]
async fn context_merge_runs_in_the_database() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresWorkflowRuntimeDataRepository::new(pool);
    let project = unique_project();
    let scope = ProjectScope::single(project.clone());
    let record = create_record(
        &repository,
        CreateRuntimeDataInput::new(project, "kyb", business("b-3")).with_context(json!({
            "documents": [{"id": "d1", "status": "pending", "pages": [1]}],
            "obsolete": "x"
        })),
    )
    .await;
    let id = record.id().as_str();

    let merged = repository
        .update_context_by_id(
            id,
            json!({
                "documents": [
                    {"id": "d1", "status": "approved"},
                    {"id": "d2", "status": "pending"}
                ],
                "obsolete": null
            }),
            ArrayMergeOption::ById,
            &scope,
        )
        .await;
    assert!(merged.is_ok());
    assert_eq!(
        merged.unwrap_or_else(|_| unreachable!()).context(),
        &json!({
            "documents": [
                {"id": "d1", "status": "approved", "pages": [1]},
                {"id": "d2", "status": "pending"}
            ]
        })
    );

    let replaced = repository
        .update_config_by_id(
            id,
            json!({"steps": ["a", "b"]}),
            ArrayMergeOption::Replace,
            &scope,
        )
        .await;
    assert!(replaced.is_ok());
    assert_eq!(
        replaced.unwrap_or_else(|_| unreachable!()).config(),
        &json!({"steps": ["a", "b"]})
    );

    let not_an_object = repository
        .update_context_by_id(id, json!(["x"]), ArrayMergeOption::ById, &scope)
        .await;
    assert!(matches!(not_an_object, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn context_merges_assign_ids_to_new_documents() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresWorkflowRuntimeDataRepository::new(pool);
    let project = unique_project();
    let scope = ProjectScope::single(project.clone());

    for (option, expected_len) in [
        (ArrayMergeOption::ById, 2),
        (ArrayMergeOption::Concat, 2),
        (ArrayMergeOption::Replace, 1),
    ] {
        let record = create_record(
            &repository,
            CreateRuntimeDataInput::new(project.clone(), "kyb", business("b-7"))
                .with_context(json!({"documents": [{"id": "x"}]})),
        )
        .await;

        let merged = repository
            .update_context_by_id(
                record.id().as_str(),
                json!({"documents": [{"foo": 1}, {"id": "", "foo": 2}]}),
                option,
                &scope,
            )
            .await;
        assert!(merged.is_ok(), "{option:?} merge failed");

        let stored = repository
            .find_context(record.id().as_str(), &scope)
            .await
            .unwrap_or_else(|_| unreachable!());
        let documents = stored["documents"].as_array().cloned().unwrap_or_default();
        assert_eq!(documents.len(), expected_len + 1, "{option:?}");
        assert!(
            documents.iter().all(|document| {
                document["id"]
                    .as_str()
                    .is_some_and(|id| !id.trim().is_empty())
            }),
            "{option:?} left a document without an id: {documents:?}"
        );
        assert!(documents.iter().any(|document| document["foo"] == json!(1)));
    }

    let record = create_record(
        &repository,
        CreateRuntimeDataInput::new(project, "kyb", business("b-8"))
            .with_context(json!({"documents": [{"id": "x"}]})),
    )
    .await;
    let rejected = repository
        .update_context_by_id(
            record.id().as_str(),
            json!({"documents": ["scan"]}),
            ArrayMergeOption::Replace,
            &scope,
        )
        .await;
    assert!(matches!(rejected, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn numeric_ids_merge_by_value() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresWorkflowRuntimeDataRepository::new(pool);
    let project = unique_project();
    let scope = ProjectScope::single(project.clone());
    let record = create_record(
        &repository,
        CreateRuntimeDataInput::new(project, "kyb", business("b-9"))
            .with_config(json!({"items": [{"id": 1, "v": 0}]})),
    )
    .await;

    let merged = repository
        .update_config_by_id(
            record.id().as_str(),
            json!({"items": [{"id": 1.0, "v": 1}]}),
            ArrayMergeOption::ById,
            &scope,
        )
        .await;
    assert!(merged.is_ok());
    let config = merged.unwrap_or_else(|_| unreachable!()).config().clone();
    assert_eq!(config["items"].as_array().map(Vec::len), Some(1));
    assert_eq!(config["items"][0]["v"], json!(1));
}

#[tokio::test]
async fn concurrent_concat_merges_are_not_lost() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresWorkflowRuntimeDataRepository::new(pool);
    let project = unique_project();
    let scope = ProjectScope::single(project.clone());
    let record = create_record(
        &repository,
        CreateRuntimeDataInput::new(project, "kyb", business("b-4"))
            .with_context(json!({"events": []})),
    )
    .await;
    let id = record.id().as_str();

    let (first, second) = tokio::join!(
        repository.update_context_by_id(
            id,
            json!({"events": ["first"]}),
            ArrayMergeOption::Concat,
            &scope,
        ),
        repository.update_context_by_id(
            id,
            json!({"events": ["second"]}),
            ArrayMergeOption::Concat,
            &scope,
        ),
    );
    assert!(first.is_ok());
    assert!(second.is_ok());

    let stored = repository.find_context(id, &scope).await;
    assert!(stored.is_ok());
    let events = stored
        .unwrap_or_else(|_| unreachable!())
        .get("events")
        .and_then(|value| value.as_array())
        .map(Vec::len);
    assert_eq!(events, Some(2));
}

#[tokio::test]
async fn aggregates_and_updates_respect_scope() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresWorkflowRuntimeDataRepository::new(pool);
    let first = unique_project();
    let second = unique_project();

    for (project, business_id) in [
        (first.clone(), "b-10"),
        (first.clone(), "b-11"),
        (second.clone(), "b-12"),
    ] {
        create_record(
            &repository,
            CreateRuntimeDataInput::new(project, "kyb", business(business_id)),
        )
        .await;
    }

    let first_scope = ProjectScope::single(first.clone());
    let count = repository.count(CountArgs::default(), &first_scope).await;
    assert_eq!(count.ok(), Some(2));

    let both = ProjectScope::new([first.clone(), second.clone()]);
    let groups = repository
        .group_by(
            GroupByArgs {
                by: vec![RuntimeDataField::ProjectId],
                filter: RuntimeDataFilter::everything(),
            },
            &both,
        )
        .await;
    assert!(groups.is_ok());
    let groups = groups.unwrap_or_else(|_| unreachable!());
    assert_eq!(groups.len(), 2);
    assert_eq!(groups.iter().map(|group| group.count).sum::<u64>(), 3);

    let empty_count = repository
        .count(CountArgs::default(), &ProjectScope::empty())
        .await;
    assert_eq!(empty_count.ok(), Some(0));

    let listed = repository
        .find_many(
            FindManyArgs {
                filter: RuntimeDataFilter::all([RuntimeDataCondition::Eq(
                    RuntimeDataField::BusinessId,
                    "b-12".to_owned(),
                )]),
                ..FindManyArgs::default()
            },
            &first_scope,
        )
        .await;
    assert_eq!(listed.map(|records| records.len()).ok(), Some(0));

    let target = repository
        .find_many(FindManyArgs::default(), &first_scope)
        .await
        .unwrap_or_else(|_| unreachable!());
    let target_id = target[0].id().as_str().to_owned();
    let update = UpdateRuntimeDataInput {
        status: Some(WorkflowRuntimeStatus::Completed),
        assignee_id: Some(Some("agent-1".to_owned())),
        ..UpdateRuntimeDataInput::default()
    };

    let foreign = repository
        .update_by_id(&target_id, update.clone(), &ProjectScope::single(second))
        .await;
    assert!(matches!(foreign, Err(AppError::NotFound(_))));

    let updated = repository
        .update_by_id(&target_id, update, &first_scope)
        .await;
    assert!(updated.is_ok());
    let updated = updated.unwrap_or_else(|_| unreachable!());
    assert_eq!(updated.status(), WorkflowRuntimeStatus::Completed);
    assert_eq!(updated.assignee_id(), Some("agent-1"));
}

#[tokio::test]
async fn search_filters_and_fails_closed() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresWorkflowRuntimeDataRepository::new(pool);
    let project = unique_project();
    let scope = ProjectScope::single(project.clone());

    let acme = create_record(
        &repository,
        CreateRuntimeDataInput::new(project.clone(), "kyb", business("b-20"))
            .with_context(json!({"entity": {"name": "Acme Holdings"}})),
    )
    .await;
    let mut other = CreateRuntimeDataInput::new(project, "kyb", business("b-21"))
        .with_context(json!({"entity": {"name": "Globex"}}));
    other.assignee_id = Some("agent-7".to_owned());
    other.tags = vec!["review".to_owned()];
    let globex = create_record(&repository, other).await;

    let mut query = RuntimeDataSearchQuery::new(EntityType::Business, 20);
    query.search = Some("  acme ".to_owned());
    let by_text = repository
        .search(query.clone(), RuntimeDataSearchFilters::default(), &scope)
        .await;
    assert_eq!(
        by_text.ok(),
        Some(vec![acme.id().as_str().to_owned()])
    );

    let by_assignee = repository
        .search(
            RuntimeDataSearchQuery::new(EntityType::Business, 20),
            RuntimeDataSearchFilters {
                case_statuses: vec!["review".to_owned()],
                assignee_ids: vec![Some("agent-7".to_owned())],
            },
            &scope,
        )
        .await;
    assert_eq!(
        by_assignee.ok(),
        Some(vec![globex.id().as_str().to_owned()])
    );

    let unassigned = repository
        .search(
            RuntimeDataSearchQuery::new(EntityType::Business, 20),
            RuntimeDataSearchFilters {
                case_statuses: Vec::new(),
                assignee_ids: vec![None],
            },
            &scope,
        )
        .await;
    assert_eq!(unassigned.ok(), Some(vec![acme.id().as_str().to_owned()]));

    let end_users = repository
        .search(
            RuntimeDataSearchQuery::new(EntityType::EndUser, 20),
            RuntimeDataSearchFilters::default(),
            &scope,
        )
        .await;
    assert_eq!(end_users.ok(), Some(Vec::new()));

    let no_projects = repository
        .search(query, RuntimeDataSearchFilters::default(), &ProjectScope::empty())
        .await;
    assert_eq!(no_projects.ok(), Some(Vec::new()));
}
