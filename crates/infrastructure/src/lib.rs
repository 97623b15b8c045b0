//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod database;
mod in_memory_workflow_runtime_data_repository;
mod postgres_workflow_runtime_data_repository;

pub use database::{
    DatabaseConfig, MIGRATOR, connect, connect_and_migrate, run_migrations,
};
pub use in_memory_workflow_runtime_data_repository::InMemoryWorkflowRuntimeDataRepository;
pub use postgres_workflow_runtime_data_repository::PostgresWorkflowRuntimeDataRepository;
