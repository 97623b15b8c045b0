use flowvault_core::ProjectScope;

use crate::runtime_data_ports::{
    CountArgs, DeleteArgs, FindManyArgs, FindOneArgs, GroupByArgs, RuntimeDataCondition,
    RuntimeDataField, RuntimeDataFilter,
};

/// Query descriptor restricted to the caller's authorized projects.
///
/// Only [`ProjectScopeService`] can construct one. Adapters obtain every
/// tenant predicate through it and unwrap the descriptor right before
/// compiling or evaluating the filter.
#[derive(Debug, Clone, PartialEq)]
pub struct Scoped<T> {
    args: T,
}

impl<T> Scoped<T> {
    /// Returns the rewritten descriptor.
    #[must_use]
    pub fn args(&self) -> &T {
        &self.args
    }

    /// Consumes the wrapper.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.args
    }
}

/// Rewrites query descriptors so they only reach authorized projects.
///
/// The rewritten filter is `project_id IN scope AND original`. An empty scope
/// yields `project_id IN ()`, which matches no row.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectScopeService;

impl ProjectScopeService {
    /// Creates the scoping service.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Scopes a single-record lookup.
    #[must_use]
    pub fn scope_find_one(&self, args: FindOneArgs, scope: &ProjectScope) -> Scoped<FindOneArgs> {
        Scoped {
            args: FindOneArgs {
                filter: scope_filter(args.filter, scope),
                sort: args.sort,
            },
        }
    }

    /// Scopes a multi-record listing.
    #[must_use]
    pub fn scope_find_many(
        &self,
        args: FindManyArgs,
        scope: &ProjectScope,
    ) -> Scoped<FindManyArgs> {
        Scoped {
            args: FindManyArgs {
                filter: scope_filter(args.filter, scope),
                ..args
            },
        }
    }

    /// Scopes a count aggregation.
    #[must_use]
    pub fn scope_count(&self, args: CountArgs, scope: &ProjectScope) -> Scoped<CountArgs> {
        Scoped {
            args: CountArgs {
                filter: scope_filter(args.filter, scope),
            },
        }
    }

    /// Scopes a delete.
    #[must_use]
    pub fn scope_delete(&self, args: DeleteArgs, scope: &ProjectScope) -> Scoped<DeleteArgs> {
        Scoped {
            args: DeleteArgs {
                filter: scope_filter(args.filter, scope),
            },
        }
    }

    /// Scopes a single-record mutation addressed by id.
    ///
    /// Used by update and merge paths, which have no descriptor of their own.
    #[must_use]
    pub fn scope_record(&self, id: &str, scope: &ProjectScope) -> Scoped<RuntimeDataFilter> {
        Scoped {
            args: scope_filter(
                RuntimeDataFilter::all([RuntimeDataCondition::Eq(
                    RuntimeDataField::Id,
                    id.to_owned(),
                )]),
                scope,
            ),
        }
    }

    /// Scopes a group-by aggregation.
    #[must_use]
    pub fn scope_group_by(&self, args: GroupByArgs, scope: &ProjectScope) -> Scoped<GroupByArgs> {
        Scoped {
            args: GroupByArgs {
                by: args.by,
                filter: scope_filter(args.filter, scope),
            },
        }
    }
}

fn scope_filter(filter: RuntimeDataFilter, scope: &ProjectScope) -> RuntimeDataFilter {
    RuntimeDataFilter::all([
        RuntimeDataFilter::all([RuntimeDataCondition::In(
            RuntimeDataField::ProjectId,
            scope.as_strings(),
        )]),
        filter,
    ])
}
