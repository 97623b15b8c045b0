use chrono::{DateTime, Utc};
use flowvault_core::{AppError, AppResult, NonEmptyString, ProjectId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle status of one workflow runtime instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowRuntimeStatus {
    /// Workflow is in flight.
    Active,
    /// Workflow reached a final state.
    Completed,
    /// Workflow stopped because of an unrecoverable error.
    Failed,
}

impl WorkflowRuntimeStatus {
    /// Returns stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parses storage value.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(AppError::Validation(format!(
                "unknown workflow runtime status '{value}'"
            ))),
        }
    }
}

/// Kind of business entity that owns a runtime instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    /// Company-level entity.
    Business,
    /// Individual end user.
    EndUser,
}

impl EntityType {
    /// Returns stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Business => "business",
            Self::EndUser => "end_user",
        }
    }

    /// Parses storage value.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "business" => Ok(Self::Business),
            "end_user" => Ok(Self::EndUser),
            _ => Err(AppError::Validation(format!("unknown entity type '{value}'"))),
        }
    }
}

/// Owning entity reference; exactly one kind is populated per record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum EntityRef {
    /// Owned by a business.
    Business(String),
    /// Owned by an end user.
    EndUser(String),
}

impl EntityRef {
    /// Builds a reference from its type discriminator and identifier.
    pub fn new(entity_type: EntityType, id: impl Into<String>) -> AppResult<Self> {
        let id = NonEmptyString::new(id)
            .map_err(|_| AppError::Validation("entity id must not be empty".to_owned()))?;

        Ok(match entity_type {
            EntityType::Business => Self::Business(id.into()),
            EntityType::EndUser => Self::EndUser(id.into()),
        })
    }

    /// Rebuilds a reference from the two nullable storage columns.
    pub fn from_columns(business_id: Option<String>, end_user_id: Option<String>) -> AppResult<Self> {
        match (business_id, end_user_id) {
            (Some(business_id), None) => Self::new(EntityType::Business, business_id),
            (None, Some(end_user_id)) => Self::new(EntityType::EndUser, end_user_id),
            (Some(_), Some(_)) => Err(AppError::Validation(
                "runtime data references both a business and an end user".to_owned(),
            )),
            (None, None) => Err(AppError::Validation(
                "runtime data references neither a business nor an end user".to_owned(),
            )),
        }
    }

    /// Returns the entity type discriminator.
    #[must_use]
    pub fn entity_type(&self) -> EntityType {
        match self {
            Self::Business(_) => EntityType::Business,
            Self::EndUser(_) => EntityType::EndUser,
        }
    }

    /// Returns the referenced entity identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Business(id) | Self::EndUser(id) => id.as_str(),
        }
    }

    /// Returns the business identifier column value.
    #[must_use]
    pub fn business_id(&self) -> Option<&str> {
        match self {
            Self::Business(id) => Some(id.as_str()),
            Self::EndUser(_) => None,
        }
    }

    /// Returns the end-user identifier column value.
    #[must_use]
    pub fn end_user_id(&self) -> Option<&str> {
        match self {
            Self::Business(_) => None,
            Self::EndUser(id) => Some(id.as_str()),
        }
    }
}

/// Persisted runtime state of one workflow execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRuntimeData {
    id: NonEmptyString,
    project_id: ProjectId,
    workflow_definition_id: NonEmptyString,
    workflow_definition_version: i32,
    entity: EntityRef,
    status: WorkflowRuntimeStatus,
    state: Option<String>,
    context: Value,
    config: Value,
    tags: Vec<String>,
    assignee_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Input payload used to construct a validated runtime record.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowRuntimeDataInput {
    /// Stable record identifier.
    pub id: String,
    /// Owning project.
    pub project_id: ProjectId,
    /// Executed workflow definition.
    pub workflow_definition_id: String,
    /// Executed workflow definition version.
    pub workflow_definition_version: i32,
    /// Owning business entity.
    pub entity: EntityRef,
    /// Lifecycle status.
    pub status: WorkflowRuntimeStatus,
    /// Current state-machine state name.
    pub state: Option<String>,
    /// Execution context document.
    pub context: Value,
    /// Per-instance configuration overrides.
    pub config: Value,
    /// Case status tags.
    pub tags: Vec<String>,
    /// Assigned operator.
    pub assignee_id: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl WorkflowRuntimeData {
    /// Creates a validated runtime record.
    pub fn new(input: WorkflowRuntimeDataInput) -> AppResult<Self> {
        let WorkflowRuntimeDataInput {
            id,
            project_id,
            workflow_definition_id,
            workflow_definition_version,
            entity,
            status,
            state,
            context,
            config,
            tags,
            assignee_id,
            created_at,
            updated_at,
        } = input;

        if !context.is_object() {
            return Err(AppError::Validation(format!(
                "runtime data '{id}' context must be a JSON object"
            )));
        }
        if !config.is_object() {
            return Err(AppError::Validation(format!(
                "runtime data '{id}' config must be a JSON object"
            )));
        }

        Ok(Self {
            id: NonEmptyString::new(id)?,
            project_id,
            workflow_definition_id: NonEmptyString::new(workflow_definition_id)?,
            workflow_definition_version,
            entity,
            status,
            state,
            context,
            config,
            tags,
            assignee_id,
            created_at,
            updated_at,
        })
    }

    /// Returns the record identifier.
    #[must_use]
    pub fn id(&self) -> &NonEmptyString {
        &self.id
    }

    /// Returns the owning project.
    #[must_use]
    pub fn project_id(&self) -> &ProjectId {
        &self.project_id
    }

    /// Returns the executed workflow definition identifier.
    #[must_use]
    pub fn workflow_definition_id(&self) -> &NonEmptyString {
        &self.workflow_definition_id
    }

    /// Returns the executed workflow definition version.
    #[must_use]
    pub fn workflow_definition_version(&self) -> i32 {
        self.workflow_definition_version
    }

    /// Returns the owning entity reference.
    #[must_use]
    pub fn entity(&self) -> &EntityRef {
        &self.entity
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub fn status(&self) -> WorkflowRuntimeStatus {
        self.status
    }

    /// Returns the current state-machine state name.
    #[must_use]
    pub fn state(&self) -> Option<&str> {
        self.state.as_deref()
    }

    /// Returns the execution context document.
    #[must_use]
    pub fn context(&self) -> &Value {
        &self.context
    }

    /// Returns the configuration document.
    #[must_use]
    pub fn config(&self) -> &Value {
        &self.config
    }

    /// Returns case status tags.
    #[must_use]
    pub fn tags(&self) -> &[String] {
        self.tags.as_slice()
    }

    /// Returns the assigned operator.
    #[must_use]
    pub fn assignee_id(&self) -> Option<&str> {
        self.assignee_id.as_deref()
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the last modification timestamp.
    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Replaces the context document with an already merged value.
    pub fn replace_context(&mut self, context: Value, now: DateTime<Utc>) -> AppResult<()> {
        if !context.is_object() {
            return Err(AppError::Validation(format!(
                "runtime data '{}' context must remain a JSON object",
                self.id.as_str()
            )));
        }

        self.context = context;
        self.updated_at = now;
        Ok(())
    }

    /// Replaces the config document with an already merged value.
    pub fn replace_config(&mut self, config: Value, now: DateTime<Utc>) -> AppResult<()> {
        if !config.is_object() {
            return Err(AppError::Validation(format!(
                "runtime data '{}' config must remain a JSON object",
                self.id.as_str()
            )));
        }

        self.config = config;
        self.updated_at = now;
        Ok(())
    }

    /// Updates the lifecycle status.
    pub fn set_status(&mut self, status: WorkflowRuntimeStatus, now: DateTime<Utc>) {
        self.status = status;
        self.updated_at = now;
    }

    /// Updates the state-machine state name.
    pub fn set_state(&mut self, state: Option<String>, now: DateTime<Utc>) {
        self.state = state;
        self.updated_at = now;
    }

    /// Updates the assigned operator.
    pub fn set_assignee_id(&mut self, assignee_id: Option<String>, now: DateTime<Utc>) {
        self.assignee_id = assignee_id;
        self.updated_at = now;
    }

    /// Replaces case status tags.
    pub fn set_tags(&mut self, tags: Vec<String>, now: DateTime<Utc>) {
        self.tags = tags;
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use flowvault_core::ProjectId;
    use serde_json::json;

    use super::{
        EntityRef, EntityType, WorkflowRuntimeData, WorkflowRuntimeDataInput,
        WorkflowRuntimeStatus,
    };

    fn input() -> WorkflowRuntimeDataInput {
        WorkflowRuntimeDataInput {
            id: "wf-1".to_owned(),
            project_id: ProjectId::new("project-a").unwrap_or_else(|_| unreachable!()),
            workflow_definition_id: "kyb".to_owned(),
            workflow_definition_version: 1,
            entity: EntityRef::Business("biz-1".to_owned()),
            status: WorkflowRuntimeStatus::Active,
            state: None,
            context: json!({}),
            config: json!({}),
            tags: Vec::new(),
            assignee_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn entity_ref_requires_exactly_one_column() {
        assert!(EntityRef::from_columns(None, None).is_err());
        assert!(EntityRef::from_columns(Some("b".to_owned()), Some("e".to_owned())).is_err());

        let entity = EntityRef::from_columns(None, Some("e".to_owned()));
        assert!(entity.is_ok());
        let entity = entity.unwrap_or_else(|_| unreachable!());
        assert_eq!(entity.entity_type(), EntityType::EndUser);
        assert_eq!(entity.end_user_id(), Some("e"));
        assert_eq!(entity.business_id(), None);
    }

    #[test]
    fn entity_ref_rejects_blank_id() {
        assert!(EntityRef::new(EntityType::Business, "  ").is_err());
    }

    #[test]
    fn status_round_trips_storage_values() {
        for status in [
            WorkflowRuntimeStatus::Active,
            WorkflowRuntimeStatus::Completed,
            WorkflowRuntimeStatus::Failed,
        ] {
            assert_eq!(WorkflowRuntimeStatus::parse(status.as_str()).ok(), Some(status));
        }
        assert!(WorkflowRuntimeStatus::parse("paused").is_err());
    }

    #[test]
    fn runtime_data_requires_object_documents() {
        let mut invalid = input();
        invalid.context = json!([1, 2]);
        assert!(WorkflowRuntimeData::new(invalid).is_err());

        let mut invalid = input();
        invalid.config = json!("text");
        assert!(WorkflowRuntimeData::new(invalid).is_err());
    }

    #[test]
    fn replace_context_keeps_object_invariant() {
        let record = WorkflowRuntimeData::new(input());
        assert!(record.is_ok());
        let mut record = record.unwrap_or_else(|_| unreachable!());

        assert!(record.replace_context(json!(null), Utc::now()).is_err());
        assert!(record.replace_context(json!({"a": 1}), Utc::now()).is_ok());
        assert_eq!(record.context(), &json!({"a": 1}));
    }
}
