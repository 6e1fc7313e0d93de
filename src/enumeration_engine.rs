use itertools::Itertools;
use ndarray::Array1;
use num_complex::Complex64;

use crate::bayesnet::BayesNet;
use crate::error::{BnetError, Result};
use crate::potential::Potential;
use crate::values::PotArray;

/// Brute-force reference engine: sums the product of all node
/// potentials over every joint assignment ("story") consistent with
/// the active states. Exponential in the number of nodes; its value
/// is validating the junction-tree engine on small networks.
pub struct EnumerationEngine {
    num_nodes: usize,
}

impl EnumerationEngine {
    pub fn new(bnet: &BayesNet) -> Result<EnumerationEngine> {
        bnet.validate()?;
        Ok(EnumerationEngine {
            num_nodes: bnet.num_nodes(),
        })
    }

    /// Probability distribution over the states of each listed node
    /// under the current evidence.
    pub fn marginals(&self, bnet: &BayesNet, node_list: &[usize]) -> Result<Vec<Array1<f64>>> {
        if bnet.num_nodes() != self.num_nodes {
            return Err(BnetError::GraphStructure(
                "engine was built for a different network".into(),
            ));
        }
        bnet.validate()?;
        let n = self.num_nodes;
        let is_quantum = bnet.is_quantum();
        let pots: Vec<&Potential> = (0..n)
            .map(|id| bnet.node_pot(id).map(|c| c.pot()))
            .collect::<Result<_>>()?;
        let actives: Vec<Vec<usize>> = (0..n)
            .map(|id| bnet.node(id).active_states().iter().copied().collect())
            .collect();

        let mut acc: Vec<Vec<Complex64>> = node_list
            .iter()
            .map(|&nd| vec![Complex64::new(0.0, 0.0); bnet.node(nd).size()])
            .collect();
        if n > 0 {
            // a story assigns one active state per node, in id order
            let stories = actives
                .iter()
                .map(|a| a.iter().copied())
                .multi_cartesian_product();
            for story in stories {
                let mut weight = Complex64::new(1.0, 0.0);
                for pot in &pots {
                    let idx: Vec<usize> = pot.ord_nodes().iter().map(|&m| story[m]).collect();
                    weight *= pot.value(&idx);
                }
                log::trace!("story {:?} weight {}", story, weight);
                for (k, &nd) in node_list.iter().enumerate() {
                    acc[k][story[nd]] += weight;
                }
            }
        }

        node_list
            .iter()
            .zip(acc)
            .map(|(&nd, weights)| {
                let arr = if is_quantum {
                    PotArray::Complex(Array1::from(weights).into_dyn())
                } else {
                    PotArray::Real(
                        Array1::from(weights.iter().map(|c| c.re).collect::<Vec<f64>>()).into_dyn(),
                    )
                };
                Potential::new(vec![nd], vec![bnet.node(nd).size()], arr)?
                    .into_distribution(bnet.node(nd).name())
            })
            .collect()
    }
}
