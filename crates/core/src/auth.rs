use std::collections::BTreeSet;

use crate::ProjectId;

/// Set of project identifiers the authenticated caller may access.
///
/// Resolved once by the request layer and passed explicitly through every
/// scoped call. An empty scope authorizes nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectScope {
    project_ids: BTreeSet<ProjectId>,
}

impl ProjectScope {
    /// Creates a scope from authorized project identifiers.
    #[must_use]
    pub fn new(project_ids: impl IntoIterator<Item = ProjectId>) -> Self {
        Self {
            project_ids: project_ids.into_iter().collect(),
        }
    }

    /// Creates a scope that authorizes no project.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a scope for exactly one project.
    #[must_use]
    pub fn single(project_id: ProjectId) -> Self {
        Self::new([project_id])
    }

    /// Returns whether the project is authorized by this scope.
    #[must_use]
    pub fn contains(&self, project_id: &ProjectId) -> bool {
        self.project_ids.contains(project_id)
    }

    /// Returns whether the scope authorizes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.project_ids.is_empty()
    }

    /// Returns the authorized identifiers in stable order.
    pub fn project_ids(&self) -> impl Iterator<Item = &ProjectId> {
        self.project_ids.iter()
    }

    /// Returns the number of authorized projects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.project_ids.len()
    }

    /// Returns owned string values for driver array binding.
    #[must_use]
    pub fn as_strings(&self) -> Vec<String> {
        self.project_ids
            .iter()
            .map(|project_id| project_id.as_str().to_owned())
            .collect()
    }
}

impl FromIterator<ProjectId> for ProjectScope {
    fn from_iter<T: IntoIterator<Item = ProjectId>>(iter: T) -> Self {
        Self::new(iter)
    }
}
