#![allow(dead_code)]

use junctionbayesnet::{BayesNet, PotArray};
use ndarray::{arr1, arr2, arr3, Array1, Array3};
use num_complex::Complex64;

pub fn assert_all_close(a: &Array1<f64>, b: &[f64], eps: f64) {
    if a.len() != b.len() || a.iter().zip(b.iter()).any(|(&a, &b)| (a - b).abs() > eps) {
        panic!("{:?} != {:?} (+/- {})", a.as_slice().unwrap(), b, eps);
    }
}

pub fn assert_agree(a: &[Array1<f64>], b: &[Array1<f64>], eps: f64) {
    assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(b) {
        assert_all_close(x, y.as_slice().unwrap(), eps);
    }
}

/// The diamond-shaped WetGrass network:
///
///         Cloudy
///         /    \
///   Sprinkler  Rain
///         \    /
///        WetGrass
pub fn build_wet_grass() -> BayesNet {
    let mut net = BayesNet::new();
    let cl = net.add_node("Cloudy", &["off", "on"]);
    let sp = net.add_node("Sprinkler", &["off", "on"]);
    let ra = net.add_node("Rain", &["off", "on"]);
    let we = net.add_node("WetGrass", &["off", "on"]);
    net.add_edge(cl, sp).unwrap();
    net.add_edge(cl, ra).unwrap();
    net.add_edge(sp, we).unwrap();
    net.add_edge(ra, we).unwrap();

    net.set_potential(cl, &[], PotArray::Real(arr1(&[0.5, 0.5]).into_dyn()))
        .unwrap();
    net.set_potential(
        sp,
        &[cl],
        PotArray::Real(arr2(&[[0.2, 0.8], [0.7, 0.3]]).into_dyn()),
    )
    .unwrap();
    net.set_potential(
        ra,
        &[cl],
        PotArray::Real(arr2(&[[0.4, 0.6], [0.5, 0.5]]).into_dyn()),
    )
    .unwrap();
    net.set_potential(
        we,
        &[sp, ra],
        PotArray::Real(
            arr3(&[[[0.99, 0.01], [0.01, 0.99]], [[0.01, 0.99], [0.01, 0.99]]]).into_dyn(),
        ),
    )
    .unwrap();
    net
}

/// Same graph as WetGrass with complex amplitudes, normalized at
/// construction with the 2-norm.
pub fn build_qu_wet_grass() -> BayesNet {
    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }
    let mut net = BayesNet::new();
    let cl = net.add_node("Cloudy", &["off", "on"]);
    let sp = net.add_node("Sprinkler", &["off", "on"]);
    let ra = net.add_node("Rain", &["off", "on"]);
    let we = net.add_node("WetGrass", &["off", "on"]);
    net.add_edge(cl, sp).unwrap();
    net.add_edge(cl, ra).unwrap();
    net.add_edge(sp, we).unwrap();
    net.add_edge(ra, we).unwrap();

    net.set_potential(
        cl,
        &[],
        PotArray::Complex(arr1(&[c(0.5, 0.1), c(0.5, 0.0)]).into_dyn()),
    )
    .unwrap();
    net.set_potential(
        sp,
        &[cl],
        PotArray::Complex(
            arr2(&[
                [c(0.2, 0.5), c(0.8, 0.0)],
                [c(0.7, 3.0), c(0.3, -1.0)],
            ])
            .into_dyn(),
        ),
    )
    .unwrap();
    net.set_potential(
        ra,
        &[cl],
        PotArray::Complex(
            arr2(&[
                [c(0.4, 0.0), c(0.6, -0.7)],
                [c(0.5, -0.1), c(0.5, 0.3)],
            ])
            .into_dyn(),
        ),
    )
    .unwrap();
    net.set_potential(
        we,
        &[sp, ra],
        PotArray::Complex(
            arr3(&[
                [
                    [c(0.99, 0.0), c(0.01, -0.01)],
                    [c(0.01, 0.0), c(0.99, 2.3)],
                ],
                [
                    [c(0.01, -5.0), c(0.99, 0.0)],
                    [c(0.01, 1.0), c(0.99, 0.0)],
                ],
            ])
            .into_dyn(),
        ),
    )
    .unwrap();
    for nd in [cl, sp, ra, we] {
        net.normalize_potential(nd).unwrap();
    }
    net
}

/// The eight-node chain of diamonds from Huang and Darwiche's
/// procedural guide.
pub fn build_hua_dar() -> BayesNet {
    let mut net = BayesNet::new();
    let a = net.add_node("A", &["off", "on"]);
    let b = net.add_node("B", &["off", "on"]);
    let c = net.add_node("C", &["off", "on"]);
    let d = net.add_node("D", &["off", "on"]);
    let e = net.add_node("E", &["off", "on"]);
    let f = net.add_node("F", &["off", "on"]);
    let g = net.add_node("G", &["off", "on"]);
    let h = net.add_node("H", &["off", "on"]);
    for (pa, ch) in [
        (a, b),
        (a, c),
        (b, d),
        (c, e),
        (d, f),
        (e, f),
        (c, g),
        (e, h),
        (g, h),
    ] {
        net.add_edge(pa, ch).unwrap();
    }

    net.set_potential(a, &[], PotArray::Real(arr1(&[0.5, 0.5]).into_dyn()))
        .unwrap();
    net.set_potential(
        b,
        &[a],
        PotArray::Real(arr2(&[[0.4, 0.6], [0.5, 0.5]]).into_dyn()),
    )
    .unwrap();
    net.set_potential(
        c,
        &[a],
        PotArray::Real(arr2(&[[0.2, 0.8], [0.7, 0.3]]).into_dyn()),
    )
    .unwrap();
    net.set_potential(
        d,
        &[b],
        PotArray::Real(arr2(&[[0.5, 0.5], [0.9, 0.1]]).into_dyn()),
    )
    .unwrap();
    net.set_potential(
        e,
        &[c],
        PotArray::Real(arr2(&[[0.6, 0.4], [0.3, 0.7]]).into_dyn()),
    )
    .unwrap();
    net.set_potential(
        f,
        &[d, e],
        PotArray::Real(
            arr3(&[[[0.99, 0.01], [0.01, 0.99]], [[0.01, 0.99], [0.01, 0.99]]]).into_dyn(),
        ),
    )
    .unwrap();
    net.set_potential(
        g,
        &[c],
        PotArray::Real(arr2(&[[0.1, 0.9], [0.8, 0.2]]).into_dyn()),
    )
    .unwrap();
    net.set_potential(
        h,
        &[e, g],
        PotArray::Real(
            arr3(&[[[0.95, 0.05], [0.95, 0.05]], [[0.95, 0.05], [0.05, 0.95]]]).into_dyn(),
        ),
    )
    .unwrap();
    net
}

/// Monty Hall as a three-node network: Monty opens a door that hides
/// no prize and was not chosen, at random when he has two options.
pub fn build_monty_hall() -> BayesNet {
    let doors = ["door1", "door2", "door3"];
    let mut net = BayesNet::new();
    let fc = net.add_node("FirstChoice", &doors);
    let pd = net.add_node("PrizeDoor", &doors);
    let mo = net.add_node("MontyOpens", &doors);
    net.add_edge(fc, mo).unwrap();
    net.add_edge(pd, mo).unwrap();

    let third = 1.0 / 3.0;
    net.set_potential(fc, &[], PotArray::Real(arr1(&[third; 3]).into_dyn()))
        .unwrap();
    net.set_potential(pd, &[], PotArray::Real(arr1(&[third; 3]).into_dyn()))
        .unwrap();

    let mut cpt = Array3::<f64>::zeros((3, 3, 3));
    for f in 0..3 {
        for p in 0..3 {
            let options: Vec<usize> = (0..3).filter(|&m| m != f && m != p).collect();
            for &m in &options {
                cpt[[f, p, m]] = 1.0 / options.len() as f64;
            }
        }
    }
    net.set_potential(mo, &[fc, pd], PotArray::Real(cpt.into_dyn()))
        .unwrap();
    net
}
