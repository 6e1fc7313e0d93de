use std::collections::BTreeSet;

use itertools::Itertools;

use crate::error::{BnetError, Result};
use crate::potential::{CondPot, Potential};
use crate::values::PotArray;

/// A discrete random variable of the network: identity, family links
/// (by arena index), state space, evidence mask and conditional
/// potential. Nodes are created and wired through [`BayesNet`], which
/// keeps the parent/child sets of both endpoints consistent.
#[derive(Debug, Clone)]
pub struct BayesNode {
    id: usize,
    name: String,
    topo_index: usize,
    parents: BTreeSet<usize>,
    children: BTreeSet<usize>,
    size: usize,
    state_names: Vec<String>,
    active_states: BTreeSet<usize>,
    potential: Option<CondPot>,
}

impl BayesNode {
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Position in the topological order; parents always come lower.
    pub fn topo_index(&self) -> usize {
        self.topo_index
    }

    pub fn parents(&self) -> &BTreeSet<usize> {
        &self.parents
    }

    pub fn children(&self) -> &BTreeSet<usize> {
        &self.children
    }

    pub fn has_parent(&self, other: usize) -> bool {
        self.parents.contains(&other)
    }

    pub fn has_child(&self, other: usize) -> bool {
        self.children.contains(&other)
    }

    /// Number of states.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn state_names(&self) -> &[String] {
        &self.state_names
    }

    pub fn state_index(&self, state_name: &str) -> Option<usize> {
        self.state_names.iter().position(|s| s == state_name)
    }

    /// The evidence mask: states this node is currently allowed to
    /// take. Defaults to the full range.
    pub fn active_states(&self) -> &BTreeSet<usize> {
        &self.active_states
    }

    pub fn potential(&self) -> Option<&CondPot> {
        self.potential.as_ref()
    }
}

/// A classical or quantum Bayesian network: a DAG of [`BayesNode`]s
/// held in an arena and referenced by index everywhere else. Cloning
/// the network duplicates every potential array while preserving the
/// topology, since all links are indices.
#[derive(Debug, Clone, Default)]
pub struct BayesNet {
    nodes: Vec<BayesNode>,
}

impl BayesNet {
    pub fn new() -> BayesNet {
        BayesNet { nodes: Vec::new() }
    }

    /// Adds a node with the given state names and returns its id.
    ///
    /// Panics if `state_names` is empty or contains duplicates.
    pub fn add_node(&mut self, name: &str, state_names: &[&str]) -> usize {
        assert!(!state_names.is_empty(), "a node needs at least one state");
        assert!(
            state_names.iter().collect::<BTreeSet<_>>().len() == state_names.len(),
            "state names of {} must be distinct",
            name
        );
        let id = self.nodes.len();
        let size = state_names.len();
        self.nodes.push(BayesNode {
            id,
            name: name.to_owned(),
            topo_index: id,
            parents: BTreeSet::new(),
            children: BTreeSet::new(),
            size,
            state_names: state_names.iter().map(|s| s.to_string()).collect(),
            active_states: (0..size).collect(),
            potential: None,
        });
        id
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, id: usize) -> &BayesNode {
        &self.nodes[id]
    }

    pub fn nodes(&self) -> impl Iterator<Item = &BayesNode> {
        self.nodes.iter()
    }

    pub fn node_named(&self, name: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.name == name)
    }

    /// Adds `pa → ch`, maintaining both endpoint sets, and re-sorts.
    /// Cycles introduced by the edge are detected here.
    pub fn add_edge(&mut self, pa: usize, ch: usize) -> Result<()> {
        if pa == ch {
            return Err(BnetError::GraphStructure(format!(
                "self edge on {}",
                self.nodes[pa].name
            )));
        }
        self.nodes[ch].parents.insert(pa);
        self.nodes[pa].children.insert(ch);
        self.topological_sort()
    }

    pub fn remove_edge(&mut self, pa: usize, ch: usize) -> Result<()> {
        if !self.nodes[ch].parents.remove(&pa) {
            return Err(BnetError::GraphStructure(format!(
                "no edge {} -> {}",
                self.nodes[pa].name, self.nodes[ch].name
            )));
        }
        self.nodes[pa].children.remove(&ch);
        self.topological_sort()
    }

    /// Assigns `topo_index` so that parents come before children.
    /// Kahn-style extraction, lowest node id first among the eligible,
    /// so the order is deterministic.
    pub fn topological_sort(&mut self) -> Result<()> {
        for node in &self.nodes {
            if node.parents.intersection(&node.children).next().is_some() {
                return Err(BnetError::GraphStructure("two node cycle detected".into()));
            }
        }
        let n = self.nodes.len();
        let mut placed = vec![false; n];
        for next_index in 0..n {
            let pick = (0..n)
                .find(|&id| !placed[id] && self.nodes[id].parents.iter().all(|&p| placed[p]));
            match pick {
                Some(id) => {
                    placed[id] = true;
                    self.nodes[id].topo_index = next_index;
                }
                None => return Err(BnetError::GraphStructure("graph must be acyclic".into())),
            }
        }
        Ok(())
    }

    /// Node ids sorted by `topo_index`.
    pub fn topo_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.nodes.len()).collect();
        order.sort_by_key(|&id| self.nodes[id].topo_index);
        order
    }

    /// Attaches the conditional potential of `nd`. `parent_order`
    /// fixes the axis order of the parents; the focus node is always
    /// the last axis.
    pub fn set_potential(&mut self, nd: usize, parent_order: &[usize], arr: PotArray) -> Result<()> {
        let node = &self.nodes[nd];
        let pset: BTreeSet<usize> = parent_order.iter().copied().collect();
        if pset.len() != parent_order.len() || pset != node.parents {
            return Err(BnetError::PotentialShape(format!(
                "potential of {} must range over exactly its parents",
                node.name
            )));
        }
        let mut ord: Vec<usize> = parent_order.to_vec();
        ord.push(nd);
        let sizes: Vec<usize> = ord.iter().map(|&i| self.nodes[i].size).collect();
        let pot = Potential::new(ord, sizes, arr)?;
        self.nodes[nd].potential = Some(CondPot::new(pot)?);
        Ok(())
    }

    /// Normalizes the stored potential of `nd` in place. On an
    /// `UnNormalizablePot` error the caller may mend the offending
    /// slice through [`potential_mut`](Self::potential_mut) and retry
    /// once.
    pub fn normalize_potential(&mut self, nd: usize) -> Result<()> {
        let name = self.nodes[nd].name.clone();
        match self.nodes[nd].potential.as_mut() {
            Some(pot) => pot.normalize(&name),
            None => Err(BnetError::PotentialShape(format!(
                "node {} has no potential",
                name
            ))),
        }
    }

    pub fn potential_mut(&mut self, nd: usize) -> Option<&mut CondPot> {
        self.nodes[nd].potential.as_mut()
    }

    /// Restricts the states `nd` may take; this is how evidence is
    /// entered. Engines pick the mask up on their next query.
    ///
    /// Panics if `states` is empty or out of range.
    pub fn set_active_states(&mut self, nd: usize, states: &[usize]) {
        assert!(!states.is_empty(), "active states must not be empty");
        let size = self.nodes[nd].size;
        assert!(
            states.iter().all(|&s| s < size),
            "active state out of range for {}",
            self.nodes[nd].name
        );
        self.nodes[nd].active_states = states.iter().copied().collect();
    }

    /// Re-activates all states of `nd`.
    pub fn forget_all_evidence(&mut self, nd: usize) {
        self.nodes[nd].active_states = (0..self.nodes[nd].size).collect();
    }

    /// Parents, children and children's other parents of `nd`.
    pub fn markov_blanket(&self, nd: usize) -> BTreeSet<usize> {
        let node = &self.nodes[nd];
        let mut mb: BTreeSet<usize> = node.parents.union(&node.children).copied().collect();
        for &ch in &node.children {
            mb.extend(self.nodes[ch].parents.iter().copied());
        }
        mb.remove(&nd);
        mb
    }

    /// Undirected adjacency of the moral graph: edge direction is
    /// dropped and every pair of parents of every node is connected.
    pub fn moral_adjacency(&self) -> Vec<BTreeSet<usize>> {
        let mut adj: Vec<BTreeSet<usize>> = self
            .nodes
            .iter()
            .map(|n| n.parents.union(&n.children).copied().collect())
            .collect();
        for node in &self.nodes {
            for (&p1, &p2) in node.parents.iter().tuple_combinations() {
                adj[p1].insert(p2);
                adj[p2].insert(p1);
            }
        }
        adj
    }

    /// True when the node potentials carry complex amplitudes.
    pub fn is_quantum(&self) -> bool {
        self.nodes
            .iter()
            .filter_map(|n| n.potential.as_ref())
            .any(|p| p.is_quantum())
    }

    /// Checks the invariants the engines rely on: every node carries a
    /// potential, all potentials share one element type, and the
    /// topological indices are consistent with the edges.
    pub fn validate(&self) -> Result<()> {
        let mut quantum: Option<bool> = None;
        for node in &self.nodes {
            let pot = node.potential.as_ref().ok_or_else(|| {
                BnetError::PotentialShape(format!("node {} has no potential", node.name))
            })?;
            match quantum {
                None => quantum = Some(pot.is_quantum()),
                Some(q) if q != pot.is_quantum() => {
                    return Err(BnetError::PotentialShape(
                        "network mixes real and complex potentials".into(),
                    ))
                }
                _ => {}
            }
            for &p in &node.parents {
                if self.nodes[p].topo_index >= node.topo_index {
                    return Err(BnetError::GraphStructure(
                        "nodes are not topologically sorted".into(),
                    ));
                }
            }
        }
        Ok(())
    }

    pub(crate) fn node_pot(&self, nd: usize) -> Result<&CondPot> {
        self.nodes[nd].potential.as_ref().ok_or_else(|| {
            BnetError::PotentialShape(format!("node {} has no potential", self.nodes[nd].name))
        })
    }
}
