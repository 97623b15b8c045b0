use flowvault_core::{AppError, AppResult};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Context key holding the workflow document collection.
pub const DOCUMENTS_KEY: &str = "documents";

/// Gives every element of `context.documents` a stable identifier.
///
/// Elements that already carry a non-blank `id` are left untouched, and all
/// other context keys are preserved. A missing collection becomes `[]`.
pub fn assign_document_ids(context: Value) -> AppResult<Value> {
    let mut context = match context {
        Value::Null => Map::new(),
        Value::Object(map) => map,
        _ => {
            return Err(AppError::Validation(
                "workflow context must be a JSON object".to_owned(),
            ));
        }
    };

    let documents = match context.remove(DOCUMENTS_KEY) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(documents)) => documents,
        Some(_) => {
            return Err(AppError::Validation(
                "workflow context documents must be a JSON array".to_owned(),
            ));
        }
    };

    let documents = documents
        .into_iter()
        .enumerate()
        .map(|(index, document)| with_document_id(index, document))
        .collect::<AppResult<Vec<_>>>()?;

    context.insert(DOCUMENTS_KEY.to_owned(), Value::Array(documents));
    Ok(Value::Object(context))
}

fn with_document_id(index: usize, document: Value) -> AppResult<Value> {
    let Value::Object(mut document) = document else {
        return Err(AppError::Validation(format!(
            "workflow context document at index {index} must be a JSON object"
        )));
    };

    if !has_stable_id(document.get("id")) {
        document.insert(
            "id".to_owned(),
            Value::String(Uuid::new_v4().to_string()),
        );
    }

    Ok(Value::Object(document))
}

fn has_stable_id(id: Option<&Value>) -> bool {
    match id {
        None | Some(Value::Null) => false,
        Some(Value::String(id)) => !id.trim().is_empty(),
        Some(_) => true,
    }
}
