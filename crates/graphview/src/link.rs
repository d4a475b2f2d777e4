use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::node::NodeSet;

/// A link between two nodes, addressed by node id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub source: String,
    pub target: String,
    /// Distinguishes links sharing the same endpoints
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Link {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            id: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// `id` when set, `"{source}-{target}"` otherwise.
    pub fn link_id(&self) -> String {
        match &self.id {
            Some(id) => id.clone(),
            None => format!("{}-{}", self.source, self.target),
        }
    }
}

/// A link whose ends were found in the current node set.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedLink {
    pub id: String,
    /// Index into the node set
    pub source: usize,
    pub target: usize,
    /// Index into the host's link list
    pub link: usize,
}

/// Resolves `links` against `nodes`, dropping links with a missing end.
pub fn resolve_links(links: &[Link], nodes: &NodeSet) -> Vec<ResolvedLink> {
    let resolved: Vec<ResolvedLink> = links
        .iter()
        .enumerate()
        .filter_map(|(link, l)| {
            let source = nodes.index_of(&l.source)?;
            let target = nodes.index_of(&l.target)?;
            Some(ResolvedLink {
                id: l.link_id(),
                source,
                target,
                link,
            })
        })
        .collect();
    if resolved.len() != links.len() {
        debug!(
            dropped = links.len() - resolved.len(),
            "dropping links with unknown endpoints"
        );
    }
    resolved
}
