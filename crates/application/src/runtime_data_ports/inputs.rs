use chrono::{DateTime, Utc};
use flowvault_core::{AppError, AppResult, ProjectId};
use flowvault_domain::{EntityRef, WorkflowRuntimeStatus, assign_document_ids};
use serde_json::{Map, Value};

/// Payload used by workflow initiation to persist a new runtime record.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateRuntimeDataInput {
    /// Owning project; immutable after creation.
    pub project_id: ProjectId,
    /// Executed workflow definition.
    pub workflow_definition_id: String,
    /// Executed workflow definition version.
    pub workflow_definition_version: i32,
    /// Owning business entity.
    pub entity: EntityRef,
    /// Initial lifecycle status.
    pub status: WorkflowRuntimeStatus,
    /// Initial state-machine state name.
    pub state: Option<String>,
    /// Initial context document.
    pub context: Value,
    /// Initial configuration overrides.
    pub config: Value,
    /// Initial case status tags.
    pub tags: Vec<String>,
    /// Initially assigned operator.
    pub assignee_id: Option<String>,
    /// Explicit creation timestamp for imports; defaults to now.
    pub created_at: Option<DateTime<Utc>>,
}

impl CreateRuntimeDataInput {
    /// Creates an active record payload with empty documents.
    #[must_use]
    pub fn new(
        project_id: ProjectId,
        workflow_definition_id: impl Into<String>,
        entity: EntityRef,
    ) -> Self {
        Self {
            project_id,
            workflow_definition_id: workflow_definition_id.into(),
            workflow_definition_version: 1,
            entity,
            status: WorkflowRuntimeStatus::Active,
            state: None,
            context: Value::Object(Map::new()),
            config: Value::Object(Map::new()),
            tags: Vec::new(),
            assignee_id: None,
            created_at: None,
        }
    }

    /// Sets the initial context document.
    #[must_use]
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = context;
        self
    }

    /// Sets the initial configuration document.
    #[must_use]
    pub fn with_config(mut self, config: Value) -> Self {
        self.config = config;
        self
    }

    /// Returns the payload ready to persist: document ids assigned and
    /// documents normalized to JSON objects.
    pub fn normalized(mut self) -> AppResult<Self> {
        if self.workflow_definition_id.trim().is_empty() {
            return Err(AppError::Validation(
                "workflow definition id must not be empty".to_owned(),
            ));
        }

        self.context = assign_document_ids(self.context)?;
        self.config = match self.config {
            Value::Null => Value::Object(Map::new()),
            Value::Object(config) => Value::Object(config),
            _ => {
                return Err(AppError::Validation(
                    "workflow config must be a JSON object".to_owned(),
                ));
            }
        };

        Ok(self)
    }
}

/// Direct column updates; `None` leaves a column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateRuntimeDataInput {
    /// New lifecycle status.
    pub status: Option<WorkflowRuntimeStatus>,
    /// New state name; `Some(None)` clears it.
    pub state: Option<Option<String>>,
    /// New assignee; `Some(None)` unassigns.
    pub assignee_id: Option<Option<String>>,
    /// Replacement case status tags.
    pub tags: Option<Vec<String>>,
}

impl UpdateRuntimeDataInput {
    /// Returns whether the update changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.state.is_none()
            && self.assignee_id.is_none()
            && self.tags.is_none()
    }

    /// Rejects updates that would not change any column.
    pub fn validate(&self) -> AppResult<()> {
        if self.is_empty() {
            return Err(AppError::Validation(
                "runtime data update must change at least one field".to_owned(),
            ));
        }

        Ok(())
    }
}

/// Lookup for the in-flight runtime of one entity and definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveWorkflowQuery {
    /// Owning entity.
    pub entity: EntityRef,
    /// Workflow definition identifier.
    pub workflow_definition_id: String,
}

/// Lookup for the most recently created runtime of one business and definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastActiveQuery {
    /// Workflow definition identifier.
    pub workflow_definition_id: String,
    /// Owning business identifier.
    pub business_id: String,
}
