use ndarray::Array1;
use num_complex::Complex64;
use rand::Rng;

use crate::bayesnet::BayesNet;
use crate::error::{BnetError, Result};
use crate::potential::Potential;
use crate::values::PotArray;

/// Gibbs-sampling reference engine, after Russell and Norvig's
/// treatment of approximate inference. Each cycle resamples every
/// multi-state node from the product of the potentials of its Markov
/// blanket; occupancy counts after burn-in estimate the marginals.
///
/// The entry point takes the random source, so tests run it on a
/// seeded `StdRng` for reproducible draws.
pub struct McmcEngine {
    num_nodes: usize,
}

impl McmcEngine {
    pub fn new(bnet: &BayesNet) -> Result<McmcEngine> {
        bnet.validate()?;
        Ok(McmcEngine {
            num_nodes: bnet.num_nodes(),
        })
    }

    /// Estimated distribution over the states of each listed node.
    /// `num_cycles` full sweeps are run in topological order and the
    /// first `warmup` of them are discarded.
    pub fn marginals<R: Rng + ?Sized>(
        &self,
        bnet: &BayesNet,
        node_list: &[usize],
        num_cycles: usize,
        warmup: usize,
        rng: &mut R,
    ) -> Result<Vec<Array1<f64>>> {
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
        // blanket of the node plus the node itself: the only
        // potentials whose value depends on the node's state
        let near: Vec<Vec<usize>> = (0..n)
            .map(|id| {
                let mut nb = bnet.markov_blanket(id);
                nb.insert(id);
                nb.into_iter().collect()
            })
            .collect();
        let order = bnet.topo_order();

        let mut query_pos = vec![None; n];
        for (k, &nd) in node_list.iter().enumerate() {
            query_pos[nd] = Some(k);
        }
        let mut counts: Vec<Vec<f64>> = node_list
            .iter()
            .map(|&nd| vec![0.0; bnet.node(nd).size()])
            .collect();

        let mut story: Vec<usize> = (0..n)
            .map(|id| actives[id][rng.gen_range(0..actives[id].len())])
            .collect();

        for cy in 0..num_cycles {
            for &nd in &order {
                if actives[nd].len() > 1 {
                    let mut weights = Vec::with_capacity(actives[nd].len());
                    for &s in &actives[nd] {
                        story[nd] = s;
                        let mut w = Complex64::new(1.0, 0.0);
                        for &m in &near[nd] {
                            let idx: Vec<usize> =
                                pots[m].ord_nodes().iter().map(|&v| story[v]).collect();
                            w *= pots[m].value(&idx);
                        }
                        weights.push(if is_quantum { w.norm_sqr() } else { w.re });
                    }
                    story[nd] = self.sample(bnet, nd, &actives[nd], &weights, rng)?;
                }
                if cy >= warmup {
                    if let Some(k) = query_pos[nd] {
                        counts[k][story[nd]] += 1.0;
                    }
                }
            }
        }

        node_list
            .iter()
            .zip(counts)
            .map(|(&nd, freq)| {
                let arr = if is_quantum {
                    PotArray::Complex(
                        Array1::from(
                            freq.iter()
                                .map(|&c| Complex64::new(c, 0.0))
                                .collect::<Vec<_>>(),
                        )
                        .into_dyn(),
                    )
                } else {
                    PotArray::Real(Array1::from(freq).into_dyn())
                };
                Potential::new(vec![nd], vec![bnet.node(nd).size()], arr)?
                    .into_distribution(bnet.node(nd).name())
            })
            .collect()
    }

    fn sample<R: Rng + ?Sized>(
        &self,
        bnet: &BayesNet,
        nd: usize,
        states: &[usize],
        weights: &[f64],
        rng: &mut R,
    ) -> Result<usize> {
        let total: f64 = weights.iter().sum();
        if !(total > 1e-300) {
            return Err(BnetError::UnNormalizablePot {
                label: bnet.node(nd).name().into(),
                parent_states: vec![],
            });
        }
        let mut r = rng.gen::<f64>() * total;
        for (&s, &w) in states.iter().zip(weights) {
            if r < w {
                return Ok(s);
            }
            r -= w;
        }
        Ok(states[states.len() - 1])
    }
}
