use junctionbayesnet::{BayesNet, EnumerationEngine, JoinTreeEngine, McmcEngine, PotArray};
use ndarray::{arr1, arr2, arr3};

fn main() {
    // the classic diamond:
    //
    //             +--------+
    //             | Cloudy |
    //             +--------+
    //              /      \
    //             v        v
    //   +-----------+    +------+
    //   | Sprinkler |    | Rain |
    //   +-----------+    +------+
    //             \        /
    //              v      v
    //            +----------+
    //            | WetGrass |
    //            +----------+

    let mut net = BayesNet::new();
    let cloudy = net.add_node("Cloudy", &["off", "on"]);
    let sprinkler = net.add_node("Sprinkler", &["off", "on"]);
    let rain = net.add_node("Rain", &["off", "on"]);
    let wet = net.add_node("WetGrass", &["off", "on"]);
    net.add_edge(cloudy, sprinkler).unwrap();
    net.add_edge(cloudy, rain).unwrap();
    net.add_edge(sprinkler, wet).unwrap();
    net.add_edge(rain, wet).unwrap();

    // P(Cloudy)
    net.set_potential(cloudy, &[], PotArray::Real(arr1(&[0.5, 0.5]).into_dyn()))
        .unwrap();
    // P(Sprinkler | Cloudy): people rarely run the sprinkler under clouds
    net.set_potential(
        sprinkler,
        &[cloudy],
        PotArray::Real(arr2(&[[0.2, 0.8], [0.7, 0.3]]).into_dyn()),
    )
    .unwrap();
    // P(Rain | Cloudy)
    net.set_potential(
        rain,
        &[cloudy],
        PotArray::Real(arr2(&[[0.4, 0.6], [0.5, 0.5]]).into_dyn()),
    )
    .unwrap();
    // P(WetGrass | Sprinkler, Rain): wet unless both are off
    net.set_potential(
        wet,
        &[sprinkler, rain],
        PotArray::Real(
            arr3(&[[[0.99, 0.01], [0.01, 0.99]], [[0.01, 0.99], [0.01, 0.99]]]).into_dyn(),
        ),
    )
    .unwrap();

    let nodes = [cloudy, sprinkler, rain, wet];
    let names = ["Cloudy", "Sprinkler", "Rain", "WetGrass"];

    let mut jtree_eng = JoinTreeEngine::new(&net).unwrap();
    println!("===== prior marginals (no evidence) =====");
    for (name, dist) in names.iter().zip(jtree_eng.marginals(&net, &nodes).unwrap()) {
        println!("    {}: {}", name, dist);
    }

    // the evidence channel is the active-states mask; the engine picks
    // it up on the next query without rebuilding the tree
    net.set_active_states(wet, &[1]);

    println!();
    println!("===== marginals given that the grass is wet =====");
    let jtree = jtree_eng.marginals(&net, &nodes).unwrap();
    let brute = EnumerationEngine::new(&net)
        .unwrap()
        .marginals(&net, &nodes)
        .unwrap();
    let mut rng = rand::thread_rng();
    let monte = McmcEngine::new(&net)
        .unwrap()
        .marginals(&net, &nodes, 10_000, 1_000, &mut rng)
        .unwrap();
    for (k, name) in names.iter().enumerate() {
        println!("    {}:", name);
        println!("        join tree:   {}", jtree[k]);
        println!("        enumeration: {}", brute[k]);
        println!("        mcmc:        {}", monte[k]);
    }
}
