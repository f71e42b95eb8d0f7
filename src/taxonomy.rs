//! Taxonomy tree stored as an arena of nodes linked by index.

use crate::{error::Error, Result};
use log::debug;
use std::collections::HashMap;

/// External taxon identifier as found in the reference database
pub type TaxonId = u64;

/// Position of a node in the [`Taxonomy`] arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(usize);

impl NodeIndex {
    /// Arena position
    pub fn index(self) -> usize {
        self.0
    }
}

/// Taxon as supplied by the database before the tree is linked
#[derive(Debug, Clone, PartialEq)]
pub struct TaxonRecord {
    /// Unique identifier
    pub id: TaxonId,
    /// Rank such as `species` or `genus`
    pub rank: String,
    /// Scientific name
    pub name: String,
    /// Identifier of the parent, `None` for top level taxa
    pub parent_id: Option<TaxonId>,
    /// Maximum distance at which a query may be assigned to this taxon
    pub threshold: Option<f64>,
}

impl TaxonRecord {
    /// Creates a record without a threshold
    pub fn new<R: Into<String>, N: Into<String>>(
        id: TaxonId,
        rank: R,
        name: N,
        parent_id: Option<TaxonId>,
    ) -> Self {
        Self {
            id,
            rank: rank.into(),
            name: name.into(),
            parent_id,
            threshold: None,
        }
    }

    /// Sets the classification threshold
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }
}

/// Linked node of the taxonomy
#[derive(Debug, Clone, PartialEq)]
pub struct TaxonNode {
    id: TaxonId,
    rank: String,
    name: String,
    threshold: Option<f64>,
    parent: Option<NodeIndex>,
    children: Vec<NodeIndex>,
    depth: usize,
}

impl TaxonNode {
    /// External identifier
    pub fn id(&self) -> TaxonId {
        self.id
    }

    /// Taxonomic rank
    pub fn rank(&self) -> &str {
        &self.rank
    }

    /// Scientific name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Classification threshold. Nodes without one are not used for predictions.
    pub fn threshold(&self) -> Option<f64> {
        self.threshold
    }

    /// Parent node, `None` at the top of the tree
    pub fn parent(&self) -> Option<NodeIndex> {
        self.parent
    }

    /// Direct descendants
    pub fn children(&self) -> &[NodeIndex] {
        &self.children
    }

    /// Number of ancestors
    pub fn depth(&self) -> usize {
        self.depth
    }
}

/// Immutable taxonomy tree
#[derive(Debug, Clone, Default)]
pub struct Taxonomy {
    nodes: Vec<TaxonNode>,
    by_id: HashMap<TaxonId, NodeIndex>,
}

impl Taxonomy {
    /// Links the records into a tree, checking for duplicate ids, dangling parents, cycles and
    /// invalid thresholds
    pub fn from_records<I: IntoIterator<Item = TaxonRecord>>(records: I) -> Result<Self> {
        let records = records.into_iter().collect::<Vec<_>>();
        let mut by_id = HashMap::with_capacity(records.len());

        for (i, record) in records.iter().enumerate() {
            if by_id.insert(record.id, NodeIndex(i)).is_some() {
                return Err(Error::DatabaseCorrupt(format!(
                    "taxon {} is defined more than once",
                    record.id
                )));
            }
            if let Some(threshold) = record.threshold {
                if !(threshold >= 0.0) {
                    return Err(Error::DatabaseCorrupt(format!(
                        "taxon {} has invalid threshold {}",
                        record.id, threshold
                    )));
                }
            }
        }

        let mut nodes = records
            .into_iter()
            .map(|record| -> Result<TaxonNode> {
                let parent = match record.parent_id {
                    Some(parent_id) => Some(*by_id.get(&parent_id).ok_or_else(|| {
                        Error::DatabaseCorrupt(format!(
                            "taxon {} refers to missing parent {}",
                            record.id, parent_id
                        ))
                    })?),
                    None => None,
                };
                Ok(TaxonNode {
                    id: record.id,
                    rank: record.rank,
                    name: record.name,
                    threshold: record.threshold,
                    parent,
                    children: Vec::new(),
                    depth: 0,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        for i in 0..nodes.len() {
            if let Some(parent) = nodes[i].parent {
                nodes[parent.0].children.push(NodeIndex(i));
            }
        }

        let mut taxonomy = Self { nodes, by_id };
        taxonomy.set_depths()?;
        debug!("Linked taxonomy of {} taxa", taxonomy.len());
        Ok(taxonomy)
    }

    /// Walks down from the top level taxa. Nodes never reached are part of a cycle.
    fn set_depths(&mut self) -> Result<()> {
        let mut queue = self.roots().collect::<Vec<_>>();
        let mut reached = queue.len();
        while let Some(idx) = queue.pop() {
            let depth = self.nodes[idx.0].depth + 1;
            for child in self.nodes[idx.0].children.clone() {
                self.nodes[child.0].depth = depth;
                queue.push(child);
                reached += 1;
            }
        }

        if reached != self.nodes.len() {
            let in_cycle = self
                .nodes
                .iter()
                .find(|node| node.parent.is_some() && node.depth == 0)
                .map(|node| node.id)
                .unwrap_or_default();
            return Err(Error::DatabaseCorrupt(format!(
                "taxon {} is its own ancestor",
                in_cycle
            )));
        }
        Ok(())
    }

    /// Number of taxa
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Checks if there are no taxa
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node at the arena position
    ///
    /// # Panics
    ///
    /// If `idx` was produced by another, larger taxonomy. See [`Taxonomy::get_node`].
    pub fn node(&self, idx: NodeIndex) -> &TaxonNode {
        &self.nodes[idx.0]
    }

    /// Node at the arena position, `None` if it is out of range
    pub fn get_node(&self, idx: NodeIndex) -> Option<&TaxonNode> {
        self.nodes.get(idx.0)
    }

    /// Arena position of a taxon
    pub fn index_of(&self, id: TaxonId) -> Option<NodeIndex> {
        self.by_id.get(&id).copied()
    }

    /// Node of a taxon
    pub fn get(&self, id: TaxonId) -> Option<&TaxonNode> {
        self.index_of(id).map(|idx| self.node(idx))
    }

    /// Taxa without a parent
    pub fn roots(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.parent.is_none())
            .map(|(i, _)| NodeIndex(i))
    }

    /// All nodes with their positions
    pub fn iter(&self) -> impl Iterator<Item = (NodeIndex, &TaxonNode)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (NodeIndex(i), node))
    }

    /// The node followed by its ancestors up to the top of the tree
    pub fn ancestors(&self, idx: NodeIndex) -> Ancestors<'_> {
        Ancestors {
            taxonomy: self,
            next: Some(idx),
        }
    }

    /// Path from the top of the tree down to the node, inclusive
    pub fn lineage(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut lineage = self.ancestors(idx).collect::<Vec<_>>();
        lineage.reverse();
        lineage
    }

    /// Checks if `ancestor` is `idx` or one of its ancestors
    pub fn is_ancestor_of(&self, ancestor: NodeIndex, idx: NodeIndex) -> bool {
        let depth = self.node(ancestor).depth;
        self.ancestors(idx)
            .find(|a| self.node(*a).depth == depth)
            .map_or(false, |a| a == ancestor)
    }
}

/// Iterator walking from a node towards the top of the tree
#[derive(Debug, Clone)]
pub struct Ancestors<'a> {
    taxonomy: &'a Taxonomy,
    next: Option<NodeIndex>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = NodeIndex;

    fn next(&mut self) -> Option<NodeIndex> {
        let current = self.next?;
        self.next = self.taxonomy.node(current).parent;
        Some(current)
    }
}
