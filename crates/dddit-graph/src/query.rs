//! Traversal queries over the asset graph.
//!
//! Lookups follow the containment path
//! `Repository -CONTAINS-> Resource -HAS_BRANCH-> Branch`, matching names at
//! each hop, then walk a branch's chain from its `HAS_VERSION` head along
//! `HAS_NEXT_VERSION` edges.

use std::collections::HashSet;

use tracing::debug;

use dddit_types::{
    decode_tags, encode_tags, format_timestamp, parse_timestamp, BranchKey, ResourceKey,
    ResourceType, VersionKey, VersionRecord,
};

use crate::error::{GraphError, GraphResult};
use crate::model::{keys, EdgeLabel, Label, Properties, Vertex, VertexId};
use crate::traits::GraphStore;

/// Find a user vertex by username.
pub fn find_user<G: GraphStore + ?Sized>(
    graph: &G,
    username: &str,
) -> GraphResult<Option<VertexId>> {
    Ok(graph
        .vertices(Label::User, &[(keys::USERNAME, username)])?
        .into_iter()
        .next())
}

/// Find a repository vertex by name.
pub fn find_repository<G: GraphStore + ?Sized>(
    graph: &G,
    name: &str,
) -> GraphResult<Option<VertexId>> {
    Ok(graph
        .vertices(Label::Repository, &[(keys::REPOSITORY_NAME, name)])?
        .into_iter()
        .next())
}

/// The first vertex reachable from `from` over `label` whose `key` property
/// equals `value`.
fn child_named<G: GraphStore + ?Sized>(
    graph: &G,
    from: VertexId,
    label: EdgeLabel,
    key: &str,
    value: &str,
) -> GraphResult<Option<VertexId>> {
    for id in graph.out(from, label)? {
        if graph.vertex(id)?.get(key) == Some(value) {
            return Ok(Some(id));
        }
    }
    Ok(None)
}

/// Find a resource vertex through its repository.
pub fn find_resource<G: GraphStore + ?Sized>(
    graph: &G,
    key: &ResourceKey,
) -> GraphResult<Option<VertexId>> {
    let Some(repository) = find_repository(graph, &key.repository)? else {
        return Ok(None);
    };
    child_named(
        graph,
        repository,
        EdgeLabel::Contains,
        keys::RESOURCE_NAME,
        &key.resource,
    )
}

/// Find a branch vertex through its repository and resource.
pub fn find_branch<G: GraphStore + ?Sized>(
    graph: &G,
    key: &BranchKey,
) -> GraphResult<Option<VertexId>> {
    let Some(resource) = find_resource(graph, &key.resource_key())? else {
        return Ok(None);
    };
    child_named(
        graph,
        resource,
        EdgeLabel::HasBranch,
        keys::BRANCH_NAME,
        &key.branch,
    )
}

/// Walk the chain hanging off `branch`, oldest first.
///
/// Fails with [`GraphError::CorruptChain`] on a second head, a fork, or a
/// cycle rather than returning a partial or endless walk.
pub fn walk_chain<G: GraphStore + ?Sized>(
    graph: &G,
    branch: VertexId,
    key: &BranchKey,
) -> GraphResult<Vec<VertexId>> {
    let corrupt = |reason: String| GraphError::CorruptChain {
        branch: key.to_string(),
        reason,
    };

    let heads = graph.out(branch, EdgeLabel::HasVersion)?;
    let mut current = match heads.as_slice() {
        [] => return Ok(Vec::new()),
        [head] => *head,
        _ => return Err(corrupt(format!("{} heads", heads.len()))),
    };

    let mut chain = Vec::new();
    let mut seen = HashSet::new();
    loop {
        if !seen.insert(current) {
            return Err(corrupt(format!("cycle through {current}")));
        }
        chain.push(current);
        let next = graph.out(current, EdgeLabel::HasNextVersion)?;
        match next.as_slice() {
            [] => break,
            [successor] => current = *successor,
            _ => return Err(corrupt(format!("fork after {current}"))),
        }
    }
    debug!(branch = %key, length = chain.len(), "walked chain");
    Ok(chain)
}

/// The current tail of a branch's chain, if it has one.
pub fn chain_tail<G: GraphStore + ?Sized>(
    graph: &G,
    branch: VertexId,
    key: &BranchKey,
) -> GraphResult<Option<VertexId>> {
    Ok(walk_chain(graph, branch, key)?.last().copied())
}

/// Version names on a branch, oldest first.
///
/// An existing branch without commits yields an empty list; a missing branch
/// is [`GraphError::NotFound`].
pub fn list_chain<G: GraphStore + ?Sized>(graph: &G, key: &BranchKey) -> GraphResult<Vec<String>> {
    let branch = find_branch(graph, key)?.ok_or_else(|| GraphError::NotFound(key.to_string()))?;
    walk_chain(graph, branch, key)?
        .into_iter()
        .map(|id| {
            let vertex = graph.vertex(id)?;
            required(&vertex, keys::VERSION_NAME).map(str::to_string)
        })
        .collect()
}

/// Find a version vertex by walking its branch's chain.
///
/// Returns `Ok(None)` if the branch or the version does not exist.
pub fn find_version<G: GraphStore + ?Sized>(
    graph: &G,
    key: &VersionKey,
) -> GraphResult<Option<VertexId>> {
    let branch_key = key.branch_key();
    let Some(branch) = find_branch(graph, &branch_key)? else {
        return Ok(None);
    };
    for id in walk_chain(graph, branch, &branch_key)? {
        if graph.vertex(id)?.get(keys::VERSION_NAME) == Some(key.version.as_str()) {
            return Ok(Some(id));
        }
    }
    Ok(None)
}

/// The property map stored on a version vertex.
pub fn version_properties(record: &VersionRecord) -> Properties {
    let mut p = Properties::new();
    p.insert(keys::VERSION_NAME.into(), record.name.clone());
    p.insert(keys::RESOURCE_TYPE.into(), record.resource_type.to_string());
    p.insert(keys::METADATA_LOCATOR.into(), record.metadata_locator.clone());
    p.insert(keys::PUSHED_AT.into(), format_timestamp(&record.pushed_at));
    p.insert(keys::USERNAME.into(), record.username.clone());
    p.insert(keys::COMMENT.into(), record.comment.clone());
    p.insert(keys::TAGS.into(), encode_tags(&record.tags));
    p
}

/// Read a version vertex back into a [`VersionRecord`].
pub fn read_version<G: GraphStore + ?Sized>(graph: &G, id: VertexId) -> GraphResult<VersionRecord> {
    let vertex = graph.vertex(id)?;
    if vertex.label != Label::Version {
        return Err(malformed(&vertex, format!("expected version, found {}", vertex.label)));
    }
    let resource_type: ResourceType = required(&vertex, keys::RESOURCE_TYPE)?
        .parse()
        .map_err(|e| malformed(&vertex, format!("{e}")))?;
    let pushed_at = parse_timestamp(required(&vertex, keys::PUSHED_AT)?)
        .map_err(|e| malformed(&vertex, format!("{e}")))?;
    let tags = match vertex.get(keys::TAGS) {
        Some(raw) => decode_tags(raw).map_err(|e| malformed(&vertex, format!("{e}")))?,
        None => Vec::new(),
    };
    Ok(VersionRecord {
        name: required(&vertex, keys::VERSION_NAME)?.to_string(),
        resource_type,
        metadata_locator: required(&vertex, keys::METADATA_LOCATOR)?.to_string(),
        pushed_at,
        username: vertex.get(keys::USERNAME).unwrap_or_default().to_string(),
        comment: vertex.get(keys::COMMENT).unwrap_or_default().to_string(),
        tags,
    })
}

fn required<'a>(vertex: &'a Vertex, key: &str) -> GraphResult<&'a str> {
    vertex
        .get(key)
        .ok_or_else(|| malformed(vertex, format!("missing property {key}")))
}

fn malformed(vertex: &Vertex, reason: String) -> GraphError {
    GraphError::MalformedVertex {
        vertex: vertex.id,
        reason,
    }
}
