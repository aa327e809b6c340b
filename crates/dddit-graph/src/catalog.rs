//! Users, repositories, resources and branches.
//!
//! [`Catalog`] is the structural CRUD the commit engine relies on: it
//! creates the containment path a version chain hangs off and answers the
//! ownership questions a commit guard asks.

use tracing::info;

use dddit_types::{validate_name, BranchKey, NameKind, ResourceKey, VersionKey};

use crate::error::{GraphError, GraphResult};
use crate::model::{keys, EdgeLabel, Label, Properties, VertexId};
use crate::query;
use crate::traits::GraphStore;

/// Structural operations over a [`GraphStore`].
#[derive(Debug)]
pub struct Catalog<G> {
    graph: G,
}

fn props(pairs: &[(&str, &str)]) -> Properties {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

impl<G: GraphStore> Catalog<G> {
    pub fn new(graph: G) -> Self {
        Self { graph }
    }

    /// The underlying graph.
    pub fn graph(&self) -> &G {
        &self.graph
    }

    pub fn into_graph(self) -> G {
        self.graph
    }

    // ---------------------------------------------------------------
    // Users and repositories
    // ---------------------------------------------------------------

    /// Register a user.
    pub fn create_user(&self, username: &str) -> GraphResult<VertexId> {
        validate_name(NameKind::User, username)?;
        if query::find_user(&self.graph, username)?.is_some() {
            return Err(GraphError::AlreadyExists(format!("user {username}")));
        }
        let id = self
            .graph
            .add_vertex(Label::User, props(&[(keys::USERNAME, username)]))?;
        info!(username, "created user");
        Ok(id)
    }

    pub fn user_exists(&self, username: &str) -> GraphResult<bool> {
        Ok(query::find_user(&self.graph, username)?.is_some())
    }

    /// Create a repository owned by `owner`. Repository names are global.
    pub fn create_repository(&self, owner: &str, name: &str) -> GraphResult<VertexId> {
        validate_name(NameKind::Repository, name)?;
        let user = query::find_user(&self.graph, owner)?
            .ok_or_else(|| GraphError::ParentNotFound(format!("user {owner}")))?;
        if query::find_repository(&self.graph, name)?.is_some() {
            return Err(GraphError::AlreadyExists(format!("repository {name}")));
        }
        let repo = self
            .graph
            .add_vertex(Label::Repository, props(&[(keys::REPOSITORY_NAME, name)]))?;
        self.graph.add_edge(user, EdgeLabel::Owns, repo)?;
        info!(repository = name, owner, "created repository");
        Ok(repo)
    }

    pub fn repository_exists(&self, name: &str) -> GraphResult<bool> {
        Ok(query::find_repository(&self.graph, name)?.is_some())
    }

    /// Grant `username` contributor access to a repository.
    ///
    /// Returns `Ok(false)` if the user already owns or contributes to it.
    pub fn add_contributor(&self, repository: &str, username: &str) -> GraphResult<bool> {
        let repo = self.require_repository(repository)?;
        let user = query::find_user(&self.graph, username)?
            .ok_or_else(|| GraphError::NotFound(format!("user {username}")))?;
        let linked = |label| -> GraphResult<bool> {
            Ok(self.graph.inbound(repo, label)?.contains(&user))
        };
        if linked(EdgeLabel::Owns)? || linked(EdgeLabel::ContributesTo)? {
            return Ok(false);
        }
        self.graph.add_edge(user, EdgeLabel::ContributesTo, repo)?;
        info!(repository, username, "added contributor");
        Ok(true)
    }

    pub fn is_owner(&self, username: &str, repository: &str) -> GraphResult<bool> {
        self.has_link(username, EdgeLabel::Owns, repository)
    }

    pub fn is_contributor(&self, username: &str, repository: &str) -> GraphResult<bool> {
        self.has_link(username, EdgeLabel::ContributesTo, repository)
    }

    /// Owners and contributors of a repository, sorted and deduplicated.
    pub fn contributors(&self, repository: &str) -> GraphResult<Vec<String>> {
        let repo = self.require_repository(repository)?;
        let mut users = Vec::new();
        for label in [EdgeLabel::Owns, EdgeLabel::ContributesTo] {
            for id in self.graph.inbound(repo, label)? {
                users.push(self.name_of(id, keys::USERNAME)?);
            }
        }
        users.sort();
        users.dedup();
        Ok(users)
    }

    pub fn owned_repositories(&self, username: &str) -> GraphResult<Vec<String>> {
        self.linked_repositories(username, EdgeLabel::Owns)
    }

    pub fn contributed_repositories(&self, username: &str) -> GraphResult<Vec<String>> {
        self.linked_repositories(username, EdgeLabel::ContributesTo)
    }

    // ---------------------------------------------------------------
    // Resources and branches
    // ---------------------------------------------------------------

    /// Create a resource inside an existing repository.
    pub fn create_resource(&self, key: &ResourceKey) -> GraphResult<VertexId> {
        key.validate()?;
        let repo = query::find_repository(&self.graph, &key.repository)?
            .ok_or_else(|| GraphError::ParentNotFound(format!("repository {}", key.repository)))?;
        if query::find_resource(&self.graph, key)?.is_some() {
            return Err(GraphError::AlreadyExists(format!("resource {key}")));
        }
        let resource = self.graph.add_vertex(
            Label::Resource,
            props(&[
                (keys::REPOSITORY_NAME, key.repository.as_str()),
                (keys::RESOURCE_NAME, key.resource.as_str()),
            ]),
        )?;
        self.graph.add_edge(repo, EdgeLabel::Contains, resource)?;
        info!(resource = %key, "created resource");
        Ok(resource)
    }

    pub fn resource_exists(&self, key: &ResourceKey) -> GraphResult<bool> {
        Ok(query::find_resource(&self.graph, key)?.is_some())
    }

    /// Resource names in a repository, sorted.
    pub fn resources(&self, repository: &str) -> GraphResult<Vec<String>> {
        let repo = self.require_repository(repository)?;
        self.sorted_names(repo, EdgeLabel::Contains, keys::RESOURCE_NAME)
    }

    /// Create a branch on an existing resource.
    pub fn create_branch(&self, key: &BranchKey) -> GraphResult<VertexId> {
        key.validate()?;
        let resource_key = key.resource_key();
        let resource = query::find_resource(&self.graph, &resource_key)?
            .ok_or_else(|| GraphError::ParentNotFound(format!("resource {resource_key}")))?;
        if query::find_branch(&self.graph, key)?.is_some() {
            return Err(GraphError::AlreadyExists(format!("branch {key}")));
        }
        let branch = self.graph.add_vertex(
            Label::Branch,
            props(&[
                (keys::REPOSITORY_NAME, key.repository.as_str()),
                (keys::RESOURCE_NAME, key.resource.as_str()),
                (keys::BRANCH_NAME, key.branch.as_str()),
            ]),
        )?;
        self.graph.add_edge(resource, EdgeLabel::HasBranch, branch)?;
        info!(branch = %key, "created branch");
        Ok(branch)
    }

    pub fn branch_exists(&self, key: &BranchKey) -> GraphResult<bool> {
        Ok(query::find_branch(&self.graph, key)?.is_some())
    }

    /// Branch names of a resource, sorted.
    pub fn branches(&self, key: &ResourceKey) -> GraphResult<Vec<String>> {
        let resource = query::find_resource(&self.graph, key)?
            .ok_or_else(|| GraphError::NotFound(format!("resource {key}")))?;
        self.sorted_names(resource, EdgeLabel::HasBranch, keys::BRANCH_NAME)
    }

    pub fn version_exists(&self, key: &VersionKey) -> GraphResult<bool> {
        Ok(query::find_version(&self.graph, key)?.is_some())
    }

    // ---------------------------------------------------------------
    // Helpers
    // ---------------------------------------------------------------

    fn require_repository(&self, name: &str) -> GraphResult<VertexId> {
        query::find_repository(&self.graph, name)?
            .ok_or_else(|| GraphError::NotFound(format!("repository {name}")))
    }

    fn name_of(&self, id: VertexId, key: &str) -> GraphResult<String> {
        let vertex = self.graph.vertex(id)?;
        vertex
            .get(key)
            .map(str::to_string)
            .ok_or_else(|| GraphError::MalformedVertex {
                vertex: id,
                reason: format!("missing property {key}"),
            })
    }

    fn sorted_names(
        &self,
        from: VertexId,
        label: EdgeLabel,
        key: &str,
    ) -> GraphResult<Vec<String>> {
        let mut names = self
            .graph
            .out(from, label)?
            .into_iter()
            .map(|id| self.name_of(id, key))
            .collect::<GraphResult<Vec<_>>>()?;
        names.sort();
        Ok(names)
    }

    fn has_link(&self, username: &str, label: EdgeLabel, repository: &str) -> GraphResult<bool> {
        let (Some(user), Some(repo)) = (
            query::find_user(&self.graph, username)?,
            query::find_repository(&self.graph, repository)?,
        ) else {
            return Ok(false);
        };
        Ok(self.graph.out(user, label)?.contains(&repo))
    }

    fn linked_repositories(&self, username: &str, label: EdgeLabel) -> GraphResult<Vec<String>> {
        let user = query::find_user(&self.graph, username)?
            .ok_or_else(|| GraphError::NotFound(format!("user {username}")))?;
        self.sorted_names(user, label, keys::REPOSITORY_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryGraph;

    fn catalog() -> Catalog<InMemoryGraph> {
        let catalog = Catalog::new(InMemoryGraph::new());
        catalog.create_user("alice").unwrap();
        catalog.create_user("bob").unwrap();
        catalog.create_repository("alice", "game").unwrap();
        catalog
    }

    // -- users & repositories ---------------------------------------------

    #[test]
    fn duplicate_user_and_repository_rejected() {
        let catalog = catalog();
        assert!(matches!(
            catalog.create_user("alice").unwrap_err(),
            GraphError::AlreadyExists(_)
        ));
        assert!(matches!(
            catalog.create_repository("bob", "game").unwrap_err(),
            GraphError::AlreadyExists(_)
        ));
        assert!(matches!(
            catalog.create_repository("carol", "film").unwrap_err(),
            GraphError::ParentNotFound(_)
        ));
    }

    #[test]
    fn invalid_names_rejected() {
        let catalog = catalog();
        assert!(matches!(
            catalog.create_repository("alice", "a/b").unwrap_err(),
            GraphError::Type(_)
        ));
        assert!(catalog.create_user("").is_err());
    }

    #[test]
    fn ownership_and_contribution() {
        let catalog = catalog();
        assert!(catalog.is_owner("alice", "game").unwrap());
        assert!(!catalog.is_contributor("bob", "game").unwrap());

        assert!(catalog.add_contributor("game", "bob").unwrap());
        assert!(!catalog.add_contributor("game", "bob").unwrap());
        assert!(!catalog.add_contributor("game", "alice").unwrap());

        assert!(catalog.is_contributor("bob", "game").unwrap());
        assert!(!catalog.is_owner("bob", "game").unwrap());
        assert_eq!(catalog.contributors("game").unwrap(), vec!["alice", "bob"]);
        assert_eq!(catalog.owned_repositories("alice").unwrap(), vec!["game"]);
        assert_eq!(catalog.contributed_repositories("bob").unwrap(), vec!["game"]);
        assert!(catalog.contributed_repositories("alice").unwrap().is_empty());
    }

    #[test]
    fn unknown_user_or_repository_is_not_a_member() {
        let catalog = catalog();
        assert!(!catalog.is_owner("nobody", "game").unwrap());
        assert!(!catalog.is_contributor("alice", "nothing").unwrap());
        assert!(matches!(
            catalog.add_contributor("game", "nobody").unwrap_err(),
            GraphError::NotFound(_)
        ));
    }

    // -- resources & branches ---------------------------------------------

    #[test]
    fn resources_and_branches() {
        let catalog = catalog();
        let char_a = ResourceKey::new("game", "charA");
        catalog.create_resource(&char_a).unwrap();
        catalog.create_resource(&ResourceKey::new("game", "rock")).unwrap();
        catalog.create_branch(&char_a.branch("main")).unwrap();
        catalog.create_branch(&char_a.branch("dev")).unwrap();

        assert_eq!(catalog.resources("game").unwrap(), vec!["charA", "rock"]);
        assert_eq!(catalog.branches(&char_a).unwrap(), vec!["dev", "main"]);
        assert!(catalog.branch_exists(&char_a.branch("main")).unwrap());
        assert!(!catalog.branch_exists(&char_a.branch("release")).unwrap());
        assert!(!catalog.version_exists(&char_a.branch("main").version("v1")).unwrap());
    }

    #[test]
    fn same_branch_name_on_different_resources() {
        let catalog = catalog();
        let a = ResourceKey::new("game", "charA");
        let b = ResourceKey::new("game", "charB");
        catalog.create_resource(&a).unwrap();
        catalog.create_resource(&b).unwrap();
        let main_a = catalog.create_branch(&a.branch("main")).unwrap();
        let main_b = catalog.create_branch(&b.branch("main")).unwrap();
        assert_ne!(main_a, main_b);
        assert!(matches!(
            catalog.create_branch(&a.branch("main")).unwrap_err(),
            GraphError::AlreadyExists(_)
        ));
    }

    #[test]
    fn children_need_parents() {
        let catalog = catalog();
        assert!(matches!(
            catalog
                .create_resource(&ResourceKey::new("film", "x"))
                .unwrap_err(),
            GraphError::ParentNotFound(_)
        ));
        assert!(matches!(
            catalog
                .create_branch(&BranchKey::new("game", "missing", "main"))
                .unwrap_err(),
            GraphError::ParentNotFound(_)
        ));
    }
}
