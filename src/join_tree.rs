use std::collections::BTreeSet;

use itertools::Itertools;

use crate::bayesnet::BayesNet;
use crate::error::{BnetError, Result};
use crate::potential::Potential;
use crate::triangulate::triangulate;

/// A maximal cluster of network nodes; one vertex of the join tree.
#[derive(Debug, Clone)]
pub struct Clique {
    pub(crate) id: usize,
    pub(crate) name: String,
    pub(crate) subnodes: BTreeSet<usize>,
    pub(crate) sepsets: Vec<usize>,
    pub(crate) potential: Potential,
}

impl Clique {
    pub fn id(&self) -> usize {
        self.id
    }

    /// Alphabetically joined subnode names, for logging.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn subnodes(&self) -> &BTreeSet<usize> {
        &self.subnodes
    }

    pub fn sepsets(&self) -> &[usize] {
        &self.sepsets
    }

    pub fn potential(&self) -> &Potential {
        &self.potential
    }
}

/// The intersection of two adjacent cliques; sits on the tree edge
/// between them and carries the message potential.
#[derive(Debug, Clone)]
pub struct Sepset {
    pub(crate) id: usize,
    pub(crate) name: String,
    pub(crate) cliques: (usize, usize),
    pub(crate) subnodes: BTreeSet<usize>,
    pub(crate) potential: Potential,
}

impl Sepset {
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cliques(&self) -> (usize, usize) {
        self.cliques
    }

    pub fn subnodes(&self) -> &BTreeSet<usize> {
        &self.subnodes
    }

    /// The clique on the other side of this sepset.
    pub fn other_clique(&self, clique: usize) -> usize {
        if clique == self.cliques.0 {
            self.cliques.1
        } else {
            self.cliques.0
        }
    }
}

// Candidate edge of the clique graph, kept only while merging.
struct Candidate {
    id: usize,
    cx: usize,
    cy: usize,
    subnodes: BTreeSet<usize>,
    mass: usize,
    cost: f64,
}

/// The tree of cliques the junction-tree engine propagates over.
/// Built once per engine; clique and sepset potentials are rewritten
/// on every query while the structure is reused.
#[derive(Debug, Clone)]
pub struct JoinTree {
    pub(crate) cliques: Vec<Clique>,
    pub(crate) sepsets: Vec<Sepset>,
    pub(crate) node_clique: Vec<usize>,
    pub(crate) visited: Vec<bool>,
}

impl JoinTree {
    /// Moralizes and triangulates the network, then merges the cliques
    /// into a single tree through the highest-mass, lowest-cost
    /// sepsets. A network whose moral graph is disconnected cannot be
    /// covered by one tree and is rejected.
    pub fn build(bnet: &BayesNet) -> Result<JoinTree> {
        if bnet.num_nodes() == 0 {
            return Err(BnetError::GraphStructure("network has no nodes".into()));
        }
        let sizes: Vec<usize> = bnet.nodes().map(|n| n.size()).collect();
        let is_quantum = bnet.is_quantum();
        let clique_sets = triangulate(bnet.moral_adjacency(), &sizes);

        let mut cliques = Vec::with_capacity(clique_sets.len());
        for (id, subnodes) in clique_sets.into_iter().enumerate() {
            let name = subnodes
                .iter()
                .map(|&n| bnet.node(n).name())
                .sorted()
                .join("_");
            let ord: Vec<usize> = subnodes.iter().copied().collect();
            let nd_sizes: Vec<usize> = ord.iter().map(|&n| sizes[n]).collect();
            let potential = Potential::ones(is_quantum, ord, nd_sizes)?;
            log::debug!("clique {}: {}", id, name);
            cliques.push(Clique {
                id,
                name,
                subnodes,
                sepsets: Vec::new(),
                potential,
            });
        }

        // one candidate per clique pair with a non-empty intersection,
        // ids dense in pair order
        let mut candidates = Vec::new();
        for i in 0..cliques.len() {
            for j in i + 1..cliques.len() {
                let subnodes: BTreeSet<usize> = cliques[i]
                    .subnodes
                    .intersection(&cliques[j].subnodes)
                    .copied()
                    .collect();
                if subnodes.is_empty() {
                    continue;
                }
                let weight = |c: &Clique| {
                    c.subnodes
                        .iter()
                        .fold(1.0, |w, &n| w * sizes[n] as f64)
                };
                candidates.push(Candidate {
                    id: candidates.len(),
                    cx: i,
                    cy: j,
                    mass: subnodes.len(),
                    cost: weight(&cliques[i]) + weight(&cliques[j]),
                    subnodes,
                });
            }
        }
        candidates.sort_by(|a, b| {
            b.mass
                .cmp(&a.mass)
                .then(a.cost.total_cmp(&b.cost))
                .then(a.id.cmp(&b.id))
        });

        let mut tree_of: Vec<usize> = (0..cliques.len()).collect();
        let mut sepsets: Vec<Sepset> = Vec::new();
        for cand in candidates {
            if sepsets.len() + 1 == cliques.len() {
                break;
            }
            let (tx, ty) = (tree_of[cand.cx], tree_of[cand.cy]);
            if tx == ty {
                continue;
            }
            let sid = sepsets.len();
            cliques[cand.cx].sepsets.push(sid);
            cliques[cand.cy].sepsets.push(sid);
            let name = cand
                .subnodes
                .iter()
                .map(|&n| bnet.node(n).name())
                .sorted()
                .join("_");
            let ord: Vec<usize> = cand.subnodes.iter().copied().collect();
            let nd_sizes: Vec<usize> = ord.iter().map(|&n| sizes[n]).collect();
            log::debug!(
                "sepset {}: {} between {} and {}",
                sid,
                name,
                cliques[cand.cx].name,
                cliques[cand.cy].name
            );
            sepsets.push(Sepset {
                id: sid,
                name,
                cliques: (cand.cx, cand.cy),
                subnodes: cand.subnodes,
                potential: Potential::ones(is_quantum, ord, nd_sizes)?,
            });
            for t in tree_of.iter_mut() {
                if *t == ty {
                    *t = tx;
                }
            }
        }
        if sepsets.len() + 1 != cliques.len() {
            return Err(BnetError::GraphStructure(
                "network is disconnected; a single join tree needs a connected graph".into(),
            ));
        }

        // the family property guarantees a hosting clique per node;
        // the first one in id order makes the choice deterministic
        let mut node_clique = Vec::with_capacity(bnet.num_nodes());
        for node in bnet.nodes() {
            let mut family = node.parents().clone();
            family.insert(node.id());
            let host = cliques
                .iter()
                .position(|c| c.subnodes.is_superset(&family))
                .ok_or_else(|| {
                    BnetError::GraphStructure(format!(
                        "no clique contains the family of {}",
                        node.name()
                    ))
                })?;
            node_clique.push(host);
        }

        let visited = vec![false; cliques.len()];
        Ok(JoinTree {
            cliques,
            sepsets,
            node_clique,
            visited,
        })
    }

    pub fn cliques(&self) -> &[Clique] {
        &self.cliques
    }

    pub fn sepsets(&self) -> &[Sepset] {
        &self.sepsets
    }

    /// The clique hosting the family of `nd`.
    pub fn clique_of(&self, nd: usize) -> usize {
        self.node_clique[nd]
    }

    pub(crate) fn reset_visited(&mut self) {
        for v in &mut self.visited {
            *v = false;
        }
    }

    /// Rewrites every clique and sepset potential to the constant 1
    /// over its subnodes, the state a fresh propagation starts from.
    pub(crate) fn set_pots_to_one(&mut self, is_quantum: bool) -> Result<()> {
        for clique in &mut self.cliques {
            clique.potential = Potential::ones(
                is_quantum,
                clique.potential.ord_nodes().to_vec(),
                clique.potential.nd_sizes().to_vec(),
            )?;
        }
        for sepset in &mut self.sepsets {
            sepset.potential = Potential::ones(
                is_quantum,
                sepset.potential.ord_nodes().to_vec(),
                sepset.potential.nd_sizes().to_vec(),
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values::PotArray;
    use ndarray::{arr1, arr2, arr3};

    fn diamond() -> BayesNet {
        let mut net = BayesNet::new();
        let c = net.add_node("cloudy", &["off", "on"]);
        let s = net.add_node("sprinkler", &["off", "on"]);
        let r = net.add_node("rain", &["off", "on"]);
        let w = net.add_node("wet", &["off", "on"]);
        net.add_edge(c, s).unwrap();
        net.add_edge(c, r).unwrap();
        net.add_edge(s, w).unwrap();
        net.add_edge(r, w).unwrap();
        net.set_potential(c, &[], PotArray::Real(arr1(&[0.5, 0.5]).into_dyn()))
            .unwrap();
        net.set_potential(
            s,
            &[c],
            PotArray::Real(arr2(&[[0.2, 0.8], [0.7, 0.3]]).into_dyn()),
        )
        .unwrap();
        net.set_potential(
            r,
            &[c],
            PotArray::Real(arr2(&[[0.4, 0.6], [0.5, 0.5]]).into_dyn()),
        )
        .unwrap();
        net.set_potential(
            w,
            &[s, r],
            PotArray::Real(
                arr3(&[[[0.99, 0.01], [0.01, 0.99]], [[0.01, 0.99], [0.01, 0.99]]]).into_dyn(),
            ),
        )
        .unwrap();
        net
    }

    #[test]
    fn diamond_builds_a_two_clique_tree() {
        let net = diamond();
        let jtree = JoinTree::build(&net).unwrap();
        assert_eq!(jtree.cliques().len(), 2);
        assert_eq!(jtree.sepsets().len(), 1);
        let sep: Vec<usize> = jtree.sepsets()[0].subnodes().iter().copied().collect();
        assert_eq!(sep, vec![1, 2]);
        assert_eq!(jtree.cliques()[0].name(), "cloudy_rain_sprinkler");
    }

    #[test]
    fn every_family_is_hosted() {
        let net = diamond();
        let jtree = JoinTree::build(&net).unwrap();
        for node in net.nodes() {
            let host = &jtree.cliques()[jtree.clique_of(node.id())];
            assert!(host.subnodes().contains(&node.id()));
            for &p in node.parents() {
                assert!(host.subnodes().contains(&p));
            }
        }
    }

    #[test]
    fn disconnected_network_is_rejected() {
        let mut net = BayesNet::new();
        let a = net.add_node("a", &["0", "1"]);
        let b = net.add_node("b", &["0", "1"]);
        let prior = PotArray::Real(arr1(&[0.5, 0.5]).into_dyn());
        net.set_potential(a, &[], prior.clone()).unwrap();
        net.set_potential(b, &[], prior).unwrap();
        let err = JoinTree::build(&net).unwrap_err();
        assert!(err.to_string().contains("disconnected"));
    }
}
