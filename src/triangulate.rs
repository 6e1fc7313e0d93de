use std::collections::BTreeSet;

// Triangulation of the moral graph by the minimum-deficiency /
// minimum-weight heuristic of Huang and Darwiche. Each round removes
// one node after connecting its not-yet-adjacent neighbors; the
// neighborhoods swallowed along the way are the cliques of the
// original network.

struct Star {
    node: usize,
    missing: Vec<(usize, usize)>,
    weight: f64,
}

impl Star {
    fn compute(node: usize, adj: &[BTreeSet<usize>], sizes: &[usize]) -> Star {
        let neighbors: Vec<usize> = adj[node].iter().copied().collect();
        let mut missing = Vec::new();
        for (i, &a) in neighbors.iter().enumerate() {
            for &b in &neighbors[i + 1..] {
                if !adj[a].contains(&b) {
                    missing.push((a, b));
                }
            }
        }
        let weight = neighbors
            .iter()
            .fold(sizes[node] as f64, |w, &u| w * sizes[u] as f64);
        Star {
            node,
            missing,
            weight,
        }
    }
}

/// Consumes the moral adjacency and returns the cliques in acceptance
/// order. Node selection is by fewest missing edges, then smallest
/// cluster weight, then lowest node id; the id tie-break keeps the
/// output stable across runs.
pub(crate) fn triangulate(mut adj: Vec<BTreeSet<usize>>, sizes: &[usize]) -> Vec<BTreeSet<usize>> {
    let mut alive: BTreeSet<usize> = (0..adj.len()).collect();
    let mut cliques: Vec<BTreeSet<usize>> = Vec::new();
    while !alive.is_empty() {
        let star = alive
            .iter()
            .map(|&v| Star::compute(v, &adj, sizes))
            .min_by(|a, b| {
                a.missing
                    .len()
                    .cmp(&b.missing.len())
                    .then(a.weight.total_cmp(&b.weight))
                    .then(a.node.cmp(&b.node))
            })
            .expect("alive set is non-empty");
        for &(a, b) in &star.missing {
            adj[a].insert(b);
            adj[b].insert(a);
        }
        let mut preclique = adj[star.node].clone();
        preclique.insert(star.node);
        log::debug!(
            "popped node {}, {} fill-in edges, weight {}",
            star.node,
            star.missing.len(),
            star.weight
        );
        if !cliques.iter().any(|c| c.is_superset(&preclique)) {
            cliques.push(preclique);
        }
        let neighbors: Vec<usize> = adj[star.node].iter().copied().collect();
        for u in neighbors {
            adj[u].remove(&star.node);
        }
        adj[star.node].clear();
        alive.remove(&star.node);
    }
    cliques
}
