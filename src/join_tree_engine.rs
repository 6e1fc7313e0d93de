use ndarray::Array1;

use crate::bayesnet::BayesNet;
use crate::error::{BnetError, Result};
use crate::join_tree::JoinTree;

/// Exact inference by junction-tree message passing, after Huang and
/// Darwiche's procedural guide. The tree is built once; every
/// [`marginals`](Self::marginals) call re-initializes the clique and
/// sepset potentials, absorbs the node conditionals, masks by the
/// current evidence and runs the collect/distribute passes, so
/// evidence may change between calls without rebuilding anything.
///
/// The same machinery serves classical and quantum networks; the only
/// difference is which norm is used at readout.
pub struct JoinTreeEngine {
    jtree: JoinTree,
    is_quantum: bool,
    num_nodes: usize,
}

impl JoinTreeEngine {
    pub fn new(bnet: &BayesNet) -> Result<JoinTreeEngine> {
        bnet.validate()?;
        let jtree = JoinTree::build(bnet)?;
        Ok(JoinTreeEngine {
            jtree,
            is_quantum: bnet.is_quantum(),
            num_nodes: bnet.num_nodes(),
        })
    }

    /// The tree this engine propagates over.
    pub fn jtree(&self) -> &JoinTree {
        &self.jtree
    }

    /// Probability distribution over the states of each listed node,
    /// given the active-state masks currently set on `bnet`. Quantum
    /// amplitudes are converted to probabilities at readout.
    ///
    /// An `UnNormalizablePot` here means the evidence has zero measure
    /// under the model.
    pub fn marginals(&mut self, bnet: &BayesNet, node_list: &[usize]) -> Result<Vec<Array1<f64>>> {
        self.check(bnet)?;
        self.global_propagation(bnet)?;
        let mut out = Vec::with_capacity(node_list.len());
        for &nd in node_list {
            let host = self.jtree.clique_of(nd);
            let marg = self.jtree.cliques[host].potential.marginal(&[nd])?;
            out.push(marg.into_distribution(bnet.node(nd).name())?);
        }
        Ok(out)
    }

    fn check(&self, bnet: &BayesNet) -> Result<()> {
        if bnet.num_nodes() != self.num_nodes {
            return Err(BnetError::GraphStructure(
                "engine was built for a different network".into(),
            ));
        }
        bnet.validate()
    }

    fn global_propagation(&mut self, bnet: &BayesNet) -> Result<()> {
        self.jtree.set_pots_to_one(self.is_quantum)?;

        // absorb each node's conditional into its hosting clique,
        // exactly once per node
        for nd in 0..self.num_nodes {
            let host = self.jtree.clique_of(nd);
            self.jtree.cliques[host]
                .potential
                .mul_assign(bnet.node_pot(nd)?.pot())?;
        }

        // evidence enters here; sepsets inherit the masking through
        // marginalization during message passing
        for clique in &mut self.jtree.cliques {
            clique
                .potential
                .mask_self(|nd, st| bnet.node(nd).active_states().contains(&st));
        }

        let root_nd = bnet.topo_order()[0];
        let start = self.jtree.clique_of(root_nd);
        log::debug!("start clique: {}", self.jtree.cliques[start].name);

        self.jtree.reset_visited();
        self.collect_evidence(None, start)?;
        self.jtree.reset_visited();
        self.distribute_evidence(start)
    }

    /// Post-order pass: every clique sends a message toward the start
    /// clique once all of its own subtrees have reported.
    fn collect_evidence(&mut self, parent: Option<(usize, usize)>, cur: usize) -> Result<()> {
        self.jtree.visited[cur] = true;
        for s in self.jtree.cliques[cur].sepsets.clone() {
            let other = self.jtree.sepsets[s].other_clique(cur);
            if !self.jtree.visited[other] {
                self.collect_evidence(Some((cur, s)), other)?;
            }
        }
        if let Some((up, s)) = parent {
            self.pass_message(cur, up, s)?;
        }
        Ok(())
    }

    /// Pre-order pass: messages flow away from the start clique.
    fn distribute_evidence(&mut self, cur: usize) -> Result<()> {
        self.jtree.visited[cur] = true;
        for s in self.jtree.cliques[cur].sepsets.clone() {
            let other = self.jtree.sepsets[s].other_clique(cur);
            if !self.jtree.visited[other] {
                self.pass_message(cur, other, s)?;
                self.distribute_evidence(other)?;
            }
        }
        Ok(())
    }

    // The division-based absorb: the sepset keeps the marginal of the
    // sender, and the receiver is scaled by new/old. Wherever the old
    // sepset entry is zero the new marginal is zero too, and 0/0 is
    // defined as 0.
    fn pass_message(&mut self, from: usize, to: usize, s: usize) -> Result<()> {
        log::trace!(
            "passing message from {} to {}",
            self.jtree.cliques[from].name,
            self.jtree.cliques[to].name
        );
        let sep_nodes: Vec<usize> = self.jtree.sepsets[s].subnodes.iter().copied().collect();
        let new_pot = self.jtree.cliques[from].potential.marginal(&sep_nodes)?;
        let old = std::mem::replace(&mut self.jtree.sepsets[s].potential, new_pot);
        let ratio = self.jtree.sepsets[s].potential.div(&old)?;
        self.jtree.cliques[to].potential.mul_assign(&ratio)
    }
}
