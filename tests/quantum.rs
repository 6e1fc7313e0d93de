mod common;

use common::{assert_agree, build_qu_wet_grass};
use junctionbayesnet::{EnumerationEngine, JoinTreeEngine};

#[test]
fn amplitudes_are_normalized_at_construction() {
    let net = build_qu_wet_grass();
    for node in net.nodes() {
        let totals = node.potential().unwrap().total_probs();
        for d in totals.values() {
            assert!((d - 1.0).abs() < 1e-9, "2-norm of a slice is {}", d);
        }
    }
}

#[test]
fn quantum_join_tree_matches_enumeration() {
    let net = build_qu_wet_grass();
    assert!(net.is_quantum());
    let nodes: Vec<usize> = (0..net.num_nodes()).collect();

    let brute = EnumerationEngine::new(&net)
        .unwrap()
        .marginals(&net, &nodes)
        .unwrap();
    let mut jtree_eng = JoinTreeEngine::new(&net).unwrap();
    let jtree = jtree_eng.marginals(&net, &nodes).unwrap();
    assert_agree(&brute, &jtree, 1e-9);
    for dist in &jtree {
        assert!((dist.sum() - 1.0).abs() < 1e-9);
        assert!(dist.iter().all(|&p| p >= 0.0));
    }
}

#[test]
fn quantum_join_tree_matches_enumeration_under_evidence() {
    let mut net = build_qu_wet_grass();
    let nodes: Vec<usize> = (0..net.num_nodes()).collect();
    net.set_active_states(net.node_named("WetGrass").unwrap(), &[1]);

    let brute = EnumerationEngine::new(&net)
        .unwrap()
        .marginals(&net, &nodes)
        .unwrap();
    let mut jtree_eng = JoinTreeEngine::new(&net).unwrap();
    let jtree = jtree_eng.marginals(&net, &nodes).unwrap();
    assert_agree(&brute, &jtree, 1e-9);
}
