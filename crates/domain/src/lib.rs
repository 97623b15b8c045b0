//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod documents;
mod json_merge;
mod workflow_runtime;

pub use documents::{DOCUMENTS_KEY, assign_document_ids};
pub use json_merge::{ArrayMergeOption, deep_merge, json_values_equal};
pub use workflow_runtime::{
    EntityRef, EntityType, WorkflowRuntimeData, WorkflowRuntimeDataInput, WorkflowRuntimeStatus,
};
