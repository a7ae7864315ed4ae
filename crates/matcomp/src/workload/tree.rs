//! Arena-backed workload tree.

use matcomp_core::{CompressionMode, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// Operation that will consume the candidate matrix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WorkloadOp {
    /// Grouping node; carries no cost of its own.
    Root,
    /// `A %*% X` where `A` has `rows` rows.
    LeftMatMult { rows: usize },
    /// `X %*% B` where `B` has `cols` columns.
    RightMatMult { cols: usize },
    /// Full, row, or column aggregate such as `sum` or `colSums`.
    Aggregate,
    /// Cell-wise operation with a scalar, such as `X * 2`.
    ScalarElementwise,
    /// Operation that requires the uncompressed matrix.
    Decompress,
    /// Row or column slicing.
    Indexing,
    /// `t(X)`.
    Transpose,
}

impl WorkloadOp {
    /// Whether the op runs directly on compressed column groups.
    pub fn is_compression_friendly(self) -> bool {
        matches!(
            self,
            WorkloadOp::LeftMatMult { .. }
                | WorkloadOp::RightMatMult { .. }
                | WorkloadOp::Aggregate
                | WorkloadOp::ScalarElementwise
        )
    }

    /// Whether the op forces the matrix back into dense form.
    pub fn forces_decompression(self) -> bool {
        matches!(
            self,
            WorkloadOp::Decompress | WorkloadOp::Indexing | WorkloadOp::Transpose
        )
    }
}

/// A node of the workload tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadNode {
    /// Operation at this node.
    pub op: WorkloadOp,
    /// Executions per execution of the parent (loop trip count).
    pub frequency: f64,
    /// Child node ids.
    pub children: Vec<usize>,
}

/// Flat node description emitted by the compiler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    /// Compiler-assigned node id.
    pub id: u64,
    /// Parent id, `None` for the root.
    pub parent: Option<u64>,
    /// Operation at this node.
    pub op: WorkloadOp,
    /// Executions per execution of the parent.
    pub frequency: f64,
}

/// Immutable tree of the operations consuming a compressed matrix.
///
/// Deserialization checks the arena the same way [`WorkloadTree::from_specs`]
/// checks a node list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TreeRepr")]
pub struct WorkloadTree {
    nodes: Vec<WorkloadNode>,
    site_mode: Option<CompressionMode>,
}

/// Unchecked serialized form of [`WorkloadTree`].
#[derive(Deserialize)]
struct TreeRepr {
    nodes: Vec<WorkloadNode>,
    site_mode: Option<CompressionMode>,
}

impl TryFrom<TreeRepr> for WorkloadTree {
    type Error = Error;

    fn try_from(repr: TreeRepr) -> Result<Self> {
        validate_arena(&repr.nodes)?;
        Ok(Self {
            nodes: repr.nodes,
            site_mode: repr.site_mode,
        })
    }
}

/// Node 0 is the root, every other node has exactly one parent, and every
/// node is reachable from the root.
fn validate_arena(nodes: &[WorkloadNode]) -> Result<()> {
    if nodes.is_empty() {
        return Err(Error::workload("no nodes"));
    }
    let mut parent = vec![None; nodes.len()];
    for (id, node) in nodes.iter().enumerate() {
        check_frequency(node.frequency)?;
        for &child in &node.children {
            if child >= nodes.len() {
                return Err(Error::workload(format!(
                    "node {id} has unknown child {child}"
                )));
            }
            if child == 0 {
                return Err(Error::workload(format!("node {id} points back at the root")));
            }
            if let Some(other) = parent[child].replace(id) {
                return Err(Error::workload(format!(
                    "node {child} has two parents ({other} and {id})"
                )));
            }
        }
    }

    let mut reached = 0;
    let mut stack = vec![0usize];
    while let Some(id) = stack.pop() {
        reached += 1;
        stack.extend(nodes[id].children.iter().copied());
    }
    if reached != nodes.len() {
        return Err(Error::workload(format!(
            "{} nodes are unreachable from the root (cycle or detached subtree)",
            nodes.len() - reached
        )));
    }
    Ok(())
}

impl WorkloadTree {
    /// Start building a tree; node 0 is a [`WorkloadOp::Root`].
    pub fn builder() -> WorkloadTreeBuilder {
        WorkloadTreeBuilder {
            nodes: vec![WorkloadNode {
                op: WorkloadOp::Root,
                frequency: 1.0,
                children: Vec::new(),
            }],
            site_mode: None,
        }
    }

    /// Build a tree from the compiler's flat node list.
    ///
    /// Fails fast on zero or several roots, duplicate or unknown ids,
    /// cycles, unreachable nodes, and non-positive frequencies.
    pub fn from_specs(specs: &[NodeSpec]) -> Result<Self> {
        if specs.is_empty() {
            return Err(Error::workload("no nodes"));
        }

        let mut index: HashMap<u64, usize> = HashMap::with_capacity(specs.len());
        for (i, spec) in specs.iter().enumerate() {
            check_frequency(spec.frequency)?;
            if index.insert(spec.id, i).is_some() {
                return Err(Error::workload(format!("duplicate node id {}", spec.id)));
            }
        }

        let mut roots = specs.iter().enumerate().filter(|(_, s)| s.parent.is_none());
        let root = match (roots.next(), roots.next()) {
            (Some((i, _)), None) => i,
            (None, _) => return Err(Error::workload("no root node (every node has a parent)")),
            (Some(_), Some(_)) => return Err(Error::workload("more than one root node")),
        };

        let mut children: Vec<Vec<usize>> = vec![Vec::new(); specs.len()];
        for (i, spec) in specs.iter().enumerate() {
            if let Some(parent) = spec.parent {
                let p = *index.get(&parent).ok_or_else(|| {
                    Error::workload(format!("node {} has unknown parent {}", spec.id, parent))
                })?;
                children[p].push(i);
            }
        }

        // Breadth-first from the root; with one parent per node a cycle
        // shows up as nodes that are never reached.
        let mut order = vec![usize::MAX; specs.len()];
        let mut queue = VecDeque::from([root]);
        let mut visited = 0;
        while let Some(i) = queue.pop_front() {
            order[i] = visited;
            visited += 1;
            queue.extend(children[i].iter().copied());
        }
        if visited != specs.len() {
            let stray = specs
                .iter()
                .zip(&order)
                .find(|(_, &o)| o == usize::MAX)
                .map(|(s, _)| s.id)
                .unwrap_or_default();
            return Err(Error::workload(format!(
                "node {stray} is unreachable from the root (cycle or detached subtree)"
            )));
        }

        let mut nodes: Vec<Option<WorkloadNode>> = vec![None; specs.len()];
        for (i, spec) in specs.iter().enumerate() {
            nodes[order[i]] = Some(WorkloadNode {
                op: spec.op,
                frequency: spec.frequency,
                children: children[i].iter().map(|&c| order[c]).collect(),
            });
        }

        Ok(Self {
            nodes: nodes.into_iter().flatten().collect(),
            site_mode: None,
        })
    }

    /// Attach the compression mode configured at the compression site.
    pub fn with_site_mode(mut self, mode: CompressionMode) -> Self {
        self.site_mode = Some(mode);
        self
    }

    /// Mode configured at the compression site, if any.
    pub fn site_mode(&self) -> Option<CompressionMode> {
        self.site_mode
    }

    /// Root node.
    pub fn root(&self) -> &WorkloadNode {
        &self.nodes[0]
    }

    /// Node by id.
    pub fn node(&self, id: usize) -> Option<&WorkloadNode> {
        self.nodes.get(id)
    }

    /// Number of nodes including the root.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false; a tree has at least its root.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Visit every node with its effective frequency (product of frequencies
    /// on the path from the root).
    pub fn for_each_weighted(&self, mut f: impl FnMut(&WorkloadNode, f64)) {
        let mut stack = vec![(0usize, self.nodes[0].frequency)];
        while let Some((id, weight)) = stack.pop() {
            let node = &self.nodes[id];
            f(node, weight);
            for &child in &node.children {
                stack.push((child, weight * self.nodes[child].frequency));
            }
        }
    }
}

/// Incremental builder for [`WorkloadTree`].
#[derive(Debug, Clone)]
pub struct WorkloadTreeBuilder {
    nodes: Vec<WorkloadNode>,
    site_mode: Option<CompressionMode>,
}

impl WorkloadTreeBuilder {
    /// Id of the root node.
    pub const ROOT: usize = 0;

    /// Add a node under `parent` and return its id.
    pub fn add(&mut self, parent: usize, op: WorkloadOp, frequency: f64) -> Result<usize> {
        check_frequency(frequency)?;
        if parent >= self.nodes.len() {
            return Err(Error::workload(format!("unknown parent node {parent}")));
        }
        let id = self.nodes.len();
        self.nodes.push(WorkloadNode {
            op,
            frequency,
            children: Vec::new(),
        });
        self.nodes[parent].children.push(id);
        Ok(id)
    }

    /// Add an op under the root that executes once.
    pub fn op(mut self, op: WorkloadOp) -> Self {
        let id = self.nodes.len();
        self.nodes.push(WorkloadNode {
            op,
            frequency: 1.0,
            children: Vec::new(),
        });
        self.nodes[Self::ROOT].children.push(id);
        self
    }

    /// Set the site-configured mode.
    pub fn site_mode(mut self, mode: CompressionMode) -> Self {
        self.site_mode = Some(mode);
        self
    }

    /// Finish the tree.
    pub fn build(self) -> WorkloadTree {
        WorkloadTree {
            nodes: self.nodes,
            site_mode: self.site_mode,
        }
    }
}

fn check_frequency(frequency: f64) -> Result<()> {
    if !frequency.is_finite() || frequency <= 0.0 {
        return Err(Error::workload(format!(
            "frequency must be finite and positive, got {frequency}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(id: u64, parent: Option<u64>, op: WorkloadOp, frequency: f64) -> NodeSpec {
        NodeSpec {
            id,
            parent,
            op,
            frequency,
        }
    }

    #[test]
    fn test_from_specs_reorders_root_first() {
        let specs = [
            spec(7, Some(3), WorkloadOp::Aggregate, 1.0),
            spec(3, None, WorkloadOp::Root, 1.0),
            spec(9, Some(3), WorkloadOp::RightMatMult { cols: 4 }, 10.0),
        ];
        let tree = WorkloadTree::from_specs(&specs).unwrap();
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.root().op, WorkloadOp::Root);
        assert_eq!(tree.root().children.len(), 2);
    }

    #[test]
    fn test_rejects_malformed_trees() {
        let two_roots = [
            spec(1, None, WorkloadOp::Root, 1.0),
            spec(2, None, WorkloadOp::Aggregate, 1.0),
        ];
        assert!(WorkloadTree::from_specs(&two_roots).is_err());

        let unknown_parent = [
            spec(1, None, WorkloadOp::Root, 1.0),
            spec(2, Some(5), WorkloadOp::Aggregate, 1.0),
        ];
        assert!(WorkloadTree::from_specs(&unknown_parent).is_err());

        let cycle = [
            spec(1, None, WorkloadOp::Root, 1.0),
            spec(2, Some(3), WorkloadOp::Aggregate, 1.0),
            spec(3, Some(2), WorkloadOp::Aggregate, 1.0),
        ];
        let err = WorkloadTree::from_specs(&cycle).unwrap_err();
        assert!(err.to_string().contains("unreachable"));

        let no_root = [spec(1, Some(1), WorkloadOp::Aggregate, 1.0)];
        assert!(WorkloadTree::from_specs(&no_root).is_err());

        let duplicate = [
            spec(1, None, WorkloadOp::Root, 1.0),
            spec(1, Some(1), WorkloadOp::Aggregate, 1.0),
        ];
        assert!(WorkloadTree::from_specs(&duplicate).is_err());

        let bad_frequency = [spec(1, None, WorkloadOp::Root, 0.0)];
        assert!(WorkloadTree::from_specs(&bad_frequency).is_err());

        assert!(WorkloadTree::from_specs(&[]).is_err());
    }

    fn parse(json: &str) -> std::result::Result<WorkloadTree, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[test]
    fn test_deserialize_round_trip() {
        let mut builder = WorkloadTree::builder();
        let body = builder
            .add(WorkloadTreeBuilder::ROOT, WorkloadOp::Root, 10.0)
            .unwrap();
        builder
            .add(body, WorkloadOp::RightMatMult { cols: 3 }, 1.0)
            .unwrap();
        let tree = builder.site_mode(CompressionMode::Cost).build();

        let json = serde_json::to_string(&tree).unwrap();
        assert_eq!(parse(&json).unwrap(), tree);
    }

    #[test]
    fn test_deserialize_rejects_malformed_arenas() {
        let dangling = r#"{"nodes":[{"op":"Root","frequency":1.0,"children":[5]}],"site_mode":null}"#;
        assert!(parse(dangling).unwrap_err().to_string().contains("unknown child 5"));

        let empty = r#"{"nodes":[],"site_mode":null}"#;
        assert!(parse(empty).unwrap_err().to_string().contains("no nodes"));

        let back_to_root = r#"{"nodes":[
            {"op":"Root","frequency":1.0,"children":[1]},
            {"op":"Aggregate","frequency":1.0,"children":[0]}
        ],"site_mode":null}"#;
        assert!(parse(back_to_root).is_err());

        let detached_cycle = r#"{"nodes":[
            {"op":"Root","frequency":1.0,"children":[]},
            {"op":"Aggregate","frequency":1.0,"children":[2]},
            {"op":"Indexing","frequency":1.0,"children":[1]}
        ],"site_mode":null}"#;
        assert!(parse(detached_cycle).unwrap_err().to_string().contains("unreachable"));

        let shared_child = r#"{"nodes":[
            {"op":"Root","frequency":1.0,"children":[1,2]},
            {"op":"Aggregate","frequency":1.0,"children":[2]},
            {"op":"Indexing","frequency":1.0,"children":[]}
        ],"site_mode":null}"#;
        assert!(parse(shared_child).unwrap_err().to_string().contains("two parents"));

        let bad_frequency = r#"{"nodes":[{"op":"Root","frequency":-2.0,"children":[]}],"site_mode":null}"#;
        assert!(parse(bad_frequency).is_err());
    }

    #[test]
    fn test_weighted_frequencies_multiply() {
        let mut builder = WorkloadTree::builder();
        let body = builder
            .add(WorkloadTreeBuilder::ROOT, WorkloadOp::Root, 10.0)
            .unwrap();
        builder.add(body, WorkloadOp::Aggregate, 2.0).unwrap();
        let tree = builder.build();

        let mut aggregate_weight = 0.0;
        tree.for_each_weighted(|node, weight| {
            if node.op == WorkloadOp::Aggregate {
                aggregate_weight = weight;
            }
        });
        assert!((aggregate_weight - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_builder_rejects_unknown_parent() {
        let mut builder = WorkloadTree::builder();
        assert!(builder.add(4, WorkloadOp::Aggregate, 1.0).is_err());
        assert!(builder
            .add(WorkloadTreeBuilder::ROOT, WorkloadOp::Aggregate, -1.0)
            .is_err());
    }

    #[test]
    fn test_site_mode() {
        let tree = WorkloadTree::builder()
            .op(WorkloadOp::Aggregate)
            .site_mode(CompressionMode::Cost)
            .build();
        assert_eq!(tree.site_mode(), Some(CompressionMode::Cost));
        let tree = tree.with_site_mode(CompressionMode::True);
        assert_eq!(tree.site_mode(), Some(CompressionMode::True));
    }
}
