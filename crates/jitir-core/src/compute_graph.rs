//! The compute graph: the runtime layer's DAG of [`ComputeNode`]s (§3
//! "Compute graph (runtime layer)").
//!
//! This is a thinner structure than the method IR above: external
//! schedulers (§6) only need topological iteration and a place to stash a
//! per-node device assignment, so it is represented directly as a
//! `petgraph` DAG rather than going through the builder/arena machinery
//! that method IR needs for SSA mutation.

use petgraph::algo::toposort;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use serde::{Deserialize, Serialize};

use crate::id::ComputeNodeId;

/// An operation descriptor a compute-graph node wraps. External schedulers
/// interpret these opaquely; the core never executes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComputeOpKind {
    MatMul,
    Vector,
    Convolution,
    Reduce,
    Custom(String),
}

/// Opaque scheduling-policy label external schedulers interpret (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchedulingPolicy {
    PerformanceOptimized,
    EnergyEfficient,
    LatencyOptimized,
    LoadBalanced,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputeNode {
    pub id: ComputeNodeId,
    pub op: ComputeOpKind,
    /// Which accelerator this node has been assigned to, if any. Assignment
    /// is an external input (§1 non-goals: no cross-device scheduler here).
    pub device_assignment: Option<String>,
}

/// A DAG of compute nodes with ordered dependency edges.
#[derive(Debug, Default)]
pub struct ComputeGraph {
    graph: StableDiGraph<ComputeNode, ()>,
    by_id: std::collections::HashMap<ComputeNodeId, NodeIndex>,
    next_id: u32,
}

impl ComputeGraph {
    pub fn new() -> Self {
        ComputeGraph {
            graph: StableDiGraph::new(),
            by_id: std::collections::HashMap::new(),
            next_id: 0,
        }
    }

    pub fn add_node(&mut self, op: ComputeOpKind) -> ComputeNodeId {
        let id = ComputeNodeId(self.next_id);
        self.next_id += 1;
        let idx = self.graph.add_node(ComputeNode {
            id,
            op,
            device_assignment: None,
        });
        self.by_id.insert(id, idx);
        id
    }

    /// Record that `dependent` depends on `dependency` completing first.
    pub fn add_dependency(&mut self, dependency: ComputeNodeId, dependent: ComputeNodeId) -> Option<()> {
        let a = *self.by_id.get(&dependency)?;
        let b = *self.by_id.get(&dependent)?;
        self.graph.add_edge(a, b, ());
        Some(())
    }

    pub fn assign_device(&mut self, node: ComputeNodeId, device: impl Into<String>) -> Option<()> {
        let idx = *self.by_id.get(&node)?;
        self.graph.node_weight_mut(idx)?.device_assignment = Some(device.into());
        Some(())
    }

    pub fn node(&self, node: ComputeNodeId) -> Option<&ComputeNode> {
        let idx = *self.by_id.get(&node)?;
        self.graph.node_weight(idx)
    }

    /// Iterate nodes in topological order. `None` if the graph has a cycle
    /// (a compute graph must be a DAG per §3).
    pub fn topological_order(&self) -> Option<Vec<ComputeNodeId>> {
        let order = toposort(&self.graph, None).ok()?;
        Some(
            order
                .into_iter()
                .filter_map(|idx| self.graph.node_weight(idx).map(|n| n.id))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topological_order_respects_dependencies() {
        let mut g = ComputeGraph::new();
        let a = g.add_node(ComputeOpKind::MatMul);
        let b = g.add_node(ComputeOpKind::Vector);
        let c = g.add_node(ComputeOpKind::Reduce);
        g.add_dependency(a, b);
        g.add_dependency(b, c);

        let order = g.topological_order().unwrap();
        let pos = |id: ComputeNodeId| order.iter().position(|&x| x == id).unwrap();
        assert!(pos(a) < pos(b));
        assert!(pos(b) < pos(c));
    }

    #[test]
    fn cyclic_graph_has_no_topological_order() {
        let mut g = ComputeGraph::new();
        let a = g.add_node(ComputeOpKind::MatMul);
        let b = g.add_node(ComputeOpKind::Vector);
        g.add_dependency(a, b);
        g.add_dependency(b, a);
        assert!(g.topological_order().is_none());
    }

    #[test]
    fn device_assignment_is_recorded() {
        let mut g = ComputeGraph::new();
        let a = g.add_node(ComputeOpKind::Convolution);
        g.assign_device(a, "velocity-0");
        assert_eq!(g.node(a).unwrap().device_assignment.as_deref(), Some("velocity-0"));
    }
}
