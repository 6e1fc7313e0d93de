mod common;

use common::{assert_agree, assert_all_close, build_hua_dar, build_wet_grass};
use junctionbayesnet::{EnumerationEngine, JoinTreeEngine, McmcEngine};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[test]
fn wet_grass_three_engines_agree() {
    let mut net = build_wet_grass();
    let nodes: Vec<usize> = (0..net.num_nodes()).collect();
    let we = net.node_named("WetGrass").unwrap();
    net.set_active_states(we, &[1]);

    let brute = EnumerationEngine::new(&net)
        .unwrap()
        .marginals(&net, &nodes)
        .unwrap();
    let mut jtree_eng = JoinTreeEngine::new(&net).unwrap();
    let jtree = jtree_eng.marginals(&net, &nodes).unwrap();
    assert_agree(&brute, &jtree, 1e-9);

    // P(Cloudy | WetGrass=on), worked out by hand from the tables
    let z = 0.4558 + 0.3235;
    assert_all_close(&brute[0], &[0.4558 / z, 0.3235 / z], 1e-9);
    assert_all_close(&brute[3], &[0.0, 1.0], 1e-9);

    let mut rng = StdRng::seed_from_u64(0);
    let monte = McmcEngine::new(&net)
        .unwrap()
        .marginals(&net, &nodes, 10_000, 1_000, &mut rng)
        .unwrap();
    assert_agree(&brute, &monte, 5e-2);
}

#[test]
fn hua_dar_join_tree_matches_enumeration() {
    let mut net = build_hua_dar();
    let nodes: Vec<usize> = (0..net.num_nodes()).collect();
    net.set_active_states(net.node_named("D").unwrap(), &[0]);
    net.set_active_states(net.node_named("G").unwrap(), &[1]);

    let brute = EnumerationEngine::new(&net)
        .unwrap()
        .marginals(&net, &nodes)
        .unwrap();
    let mut jtree_eng = JoinTreeEngine::new(&net).unwrap();
    let jtree = jtree_eng.marginals(&net, &nodes).unwrap();
    assert_agree(&brute, &jtree, 1e-9);
}

#[test]
fn hua_dar_tree_is_connected_and_hosts_every_family() {
    let net = build_hua_dar();
    let engine = JoinTreeEngine::new(&net).unwrap();
    let jtree = engine.jtree();
    assert_eq!(jtree.sepsets().len(), jtree.cliques().len() - 1);
    for node in net.nodes() {
        let host = &jtree.cliques()[jtree.clique_of(node.id())];
        assert!(host.subnodes().contains(&node.id()));
        for &p in node.parents() {
            assert!(host.subnodes().contains(&p));
        }
    }
}

#[test]
fn evidence_changes_between_queries_without_rebuilding() {
    let mut net = build_wet_grass();
    let nodes: Vec<usize> = (0..net.num_nodes()).collect();
    let mut jtree_eng = JoinTreeEngine::new(&net).unwrap();
    let brute_eng = EnumerationEngine::new(&net).unwrap();

    let jtree = jtree_eng.marginals(&net, &nodes).unwrap();
    let brute = brute_eng.marginals(&net, &nodes).unwrap();
    assert_agree(&brute, &jtree, 1e-9);
    // the prior marginal of Cloudy is its table
    assert_all_close(&jtree[0], &[0.5, 0.5], 1e-9);

    let ra = net.node_named("Rain").unwrap();
    net.set_active_states(ra, &[0]);
    let jtree = jtree_eng.marginals(&net, &nodes).unwrap();
    let brute = brute_eng.marginals(&net, &nodes).unwrap();
    assert_agree(&brute, &jtree, 1e-9);

    net.forget_all_evidence(ra);
    let jtree = jtree_eng.marginals(&net, &nodes).unwrap();
    assert_all_close(&jtree[0], &[0.5, 0.5], 1e-9);
}

#[test]
fn seeded_mcmc_is_reproducible() {
    let mut net = build_wet_grass();
    let nodes: Vec<usize> = (0..net.num_nodes()).collect();
    net.set_active_states(net.node_named("WetGrass").unwrap(), &[1]);
    let engine = McmcEngine::new(&net).unwrap();

    let mut rng = StdRng::seed_from_u64(42);
    let first = engine
        .marginals(&net, &nodes, 500, 50, &mut rng)
        .unwrap();
    let mut rng = StdRng::seed_from_u64(42);
    let second = engine
        .marginals(&net, &nodes, 500, 50, &mut rng)
        .unwrap();
    assert_agree(&first, &second, 0.0);
}
