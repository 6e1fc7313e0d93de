use std::collections::{BTreeMap, BTreeSet};

use itertools::Itertools;
use ndarray::{Array1, Ix1, IxDyn};
use num_complex::Complex64;

use crate::error::{BnetError, Result};
use crate::values::{ArrOp, PotArray};

/// A function of several nodes: a tensor whose axis `i` ranges over
/// the states of `ord_nodes[i]`. Nodes are arena indices into the
/// owning [`BayesNet`](crate::BayesNet); a potential owns its array
/// but not its nodes.
///
/// Permuting `ord_nodes` together with the matching axis permutation
/// of the array leaves the potential "the same"; equality is defined
/// up to that symmetry.
#[derive(Debug, Clone)]
pub struct Potential {
    ord_nodes: Vec<usize>,
    nd_sizes: Vec<usize>,
    arr: PotArray,
}

impl Potential {
    /// Wraps an array over an ordered node list. The array shape must
    /// equal the node sizes, and a node may appear only once.
    pub fn new(ord_nodes: Vec<usize>, nd_sizes: Vec<usize>, arr: PotArray) -> Result<Potential> {
        if ord_nodes.iter().collect::<BTreeSet<_>>().len() != ord_nodes.len() {
            return Err(BnetError::PotentialShape(
                "duplicate node in potential".into(),
            ));
        }
        if ord_nodes.len() != nd_sizes.len() || arr.shape() != nd_sizes {
            return Err(BnetError::PotentialShape(format!(
                "array shape {:?} does not match node sizes {:?}",
                arr.shape(),
                nd_sizes
            )));
        }
        Ok(Potential {
            ord_nodes,
            nd_sizes,
            arr,
        })
    }

    /// Potential with every entry set to `bias`.
    pub fn filled(
        is_quantum: bool,
        ord_nodes: Vec<usize>,
        nd_sizes: Vec<usize>,
        bias: f64,
    ) -> Result<Potential> {
        let arr = PotArray::filled(is_quantum, &nd_sizes, bias);
        Potential::new(ord_nodes, nd_sizes, arr)
    }

    /// The constant 1 potential, the multiplicative identity used to
    /// seed clique and sepset potentials.
    pub fn ones(is_quantum: bool, ord_nodes: Vec<usize>, nd_sizes: Vec<usize>) -> Result<Potential> {
        Potential::filled(is_quantum, ord_nodes, nd_sizes, 1.0)
    }

    pub fn ord_nodes(&self) -> &[usize] {
        &self.ord_nodes
    }

    pub fn nd_sizes(&self) -> &[usize] {
        &self.nd_sizes
    }

    pub fn nodes(&self) -> BTreeSet<usize> {
        self.ord_nodes.iter().copied().collect()
    }

    pub fn arr(&self) -> &PotArray {
        &self.arr
    }

    pub fn is_quantum(&self) -> bool {
        self.arr.is_quantum()
    }

    /// Entry at a full index tuple (one state per ord-node).
    ///
    /// Panics if the index is out of bounds.
    pub fn value(&self, idx: &[usize]) -> Complex64 {
        self.arr.value_at(idx)
    }

    /// Writes one entry; for a classical potential only the real part
    /// is stored. This is the mend channel for unnormalizable slices.
    pub fn set_entry(&mut self, idx: &[usize], val: Complex64) -> Result<()> {
        if idx.len() != self.ord_nodes.len()
            || idx.iter().zip(&self.nd_sizes).any(|(&i, &s)| i >= s)
        {
            return Err(BnetError::PotentialShape(format!(
                "index {:?} out of bounds for sizes {:?}",
                idx, self.nd_sizes
            )));
        }
        self.arr.set_at(idx, val);
        Ok(())
    }

    /// Reorders the nodes, applying the matching axis permutation to
    /// the array. `new_ord` must contain exactly the same nodes.
    pub fn transposed(self, new_ord: &[usize]) -> Result<Potential> {
        if new_ord.len() != self.ord_nodes.len()
            || new_ord.iter().collect::<BTreeSet<_>>() != self.ord_nodes.iter().collect()
        {
            return Err(BnetError::PotentialShape(
                "transpose requires a permutation of the potential's nodes".into(),
            ));
        }
        let axes: Vec<usize> = new_ord
            .iter()
            .map(|n| self.ord_nodes.iter().position(|m| m == n).expect("checked"))
            .collect();
        let nd_sizes: Vec<usize> = axes.iter().map(|&a| self.nd_sizes[a]).collect();
        Ok(Potential {
            ord_nodes: new_ord.to_vec(),
            nd_sizes,
            arr: self.arr.permuted(&axes),
        })
    }

    /// Sums out every node not in `fin_nodes`. An empty `fin_nodes`
    /// leaves the scalar-shaped total.
    pub fn marginal(&self, fin_nodes: &[usize]) -> Result<Potential> {
        let fset: BTreeSet<usize> = fin_nodes.iter().copied().collect();
        if fset.len() != fin_nodes.len() || !fset.is_subset(&self.nodes()) {
            return Err(BnetError::PotentialShape(
                "marginal nodes must be a duplicate-free subset of the potential's nodes".into(),
            ));
        }
        let mut order: Vec<usize> = fin_nodes.to_vec();
        order.extend(self.ord_nodes.iter().copied().filter(|n| !fset.contains(n)));
        let t = self.clone().transposed(&order)?;
        let mut arr = t.arr;
        for _ in fin_nodes.len()..self.ord_nodes.len() {
            arr = arr.sum_last_axis();
        }
        Potential::new(fin_nodes.to_vec(), t.nd_sizes[..fin_nodes.len()].to_vec(), arr)
    }

    /// Sum of all entries.
    pub fn total(&self) -> Complex64 {
        self.arr.total()
    }

    /// Zeroes every entry whose state along some axis the predicate
    /// `is_active(node, state)` rejects. This is how evidence enters
    /// a clique potential.
    pub fn mask_self(&mut self, is_active: impl Fn(usize, usize) -> bool) {
        for axis in 0..self.ord_nodes.len() {
            let nd = self.ord_nodes[axis];
            for st in 0..self.nd_sizes[axis] {
                if !is_active(nd, st) {
                    self.arr.zero_axis_state(axis, st);
                }
            }
        }
    }

    // Binary ops are defined over the union of the two node sets.
    // Partition into A = self only, B = shared, C = right only, align
    // both operands to A‖B‖C and apply the op elementwise with unit
    // axes broadcast over the missing parts.
    fn binary(&self, right: &Potential, op: ArrOp) -> Result<Potential> {
        let lset = self.nodes();
        let rset = right.nodes();
        let mut left_ord: Vec<usize> = self
            .ord_nodes
            .iter()
            .copied()
            .filter(|n| !rset.contains(n))
            .collect();
        let shared: Vec<usize> = self
            .ord_nodes
            .iter()
            .copied()
            .filter(|n| rset.contains(n))
            .collect();
        let c_ord: Vec<usize> = right
            .ord_nodes
            .iter()
            .copied()
            .filter(|n| !lset.contains(n))
            .collect();
        left_ord.extend(&shared);

        let lhs = self.clone().transposed(&left_ord)?;
        let mut right_ord = shared;
        right_ord.extend(&c_ord);
        let rhs = right.clone().transposed(&right_ord)?;

        let mut out_ord = left_ord;
        out_ord.extend(&c_ord);
        let mut out_sizes = lhs.nd_sizes.clone();
        out_sizes.extend(&rhs.nd_sizes[rhs.nd_sizes.len() - c_ord.len()..]);

        let mut larr = lhs.arr;
        for _ in 0..c_ord.len() {
            let pos = larr.ndim();
            larr = larr.insert_axis(pos);
        }
        let arr = larr.broadcast_op(&rhs.arr, &out_sizes, op)?;
        Potential::new(out_ord, out_sizes, arr)
    }

    fn binary_assign(&mut self, right: &Potential, op: ArrOp) -> Result<()> {
        let lset = self.nodes();
        if !right.ord_nodes.iter().all(|n| lset.contains(n)) {
            return Err(BnetError::PotentialShape(
                "in-place operand must be contained in the left node set".into(),
            ));
        }
        let target: Vec<usize> = self
            .ord_nodes
            .iter()
            .copied()
            .filter(|n| right.ord_nodes.contains(n))
            .collect();
        let rhs = right.clone().transposed(&target)?;
        let mut arr = rhs.arr;
        for (i, n) in self.ord_nodes.iter().enumerate() {
            if !target.contains(n) {
                arr = arr.insert_axis(i);
            }
        }
        self.arr.assign_op(&arr, op)
    }

    pub fn add(&self, right: &Potential) -> Result<Potential> {
        self.binary(right, ArrOp::Add)
    }

    pub fn sub(&self, right: &Potential) -> Result<Potential> {
        self.binary(right, ArrOp::Sub)
    }

    pub fn mul(&self, right: &Potential) -> Result<Potential> {
        self.binary(right, ArrOp::Mul)
    }

    /// Entrywise division. Degenerate quotients (0/0 and anything
    /// else non-finite) become exactly 0, which is what makes sepset
    /// absorption well defined at zero-measure entries.
    pub fn div(&self, right: &Potential) -> Result<Potential> {
        self.binary(right, ArrOp::Div)
    }

    pub fn add_assign(&mut self, right: &Potential) -> Result<()> {
        self.binary_assign(right, ArrOp::Add)
    }

    pub fn sub_assign(&mut self, right: &Potential) -> Result<()> {
        self.binary_assign(right, ArrOp::Sub)
    }

    pub fn mul_assign(&mut self, right: &Potential) -> Result<()> {
        self.binary_assign(right, ArrOp::Mul)
    }

    pub fn div_assign(&mut self, right: &Potential) -> Result<()> {
        self.binary_assign(right, ArrOp::Div)
    }

    /// 2-norm of the (broadcast) difference of two potentials.
    pub fn distance(&self, other: &Potential) -> Result<f64> {
        Ok(self.sub(other)?.arr.norm2())
    }

    /// Normalizes a single-node potential into a probability
    /// distribution over the node's states: classical entries are
    /// divided by their sum, quantum amplitudes by their 2-norm and
    /// then squared. A divisor below 1e-6 means the potential carries
    /// no measure, which at readout means inconsistent evidence.
    pub fn into_distribution(self, label: &str) -> Result<Array1<f64>> {
        if self.ord_nodes.len() != 1 {
            return Err(BnetError::PotentialShape(
                "a distribution requires a single-node potential".into(),
            ));
        }
        match self.arr {
            PotArray::Real(a) => {
                let v = a.into_dimensionality::<Ix1>().expect("single axis");
                let d = v.sum();
                if d.abs() < 1e-6 {
                    return Err(BnetError::UnNormalizablePot {
                        label: label.into(),
                        parent_states: vec![],
                    });
                }
                if !d.is_finite() {
                    return Err(BnetError::Arithmetic(label.into()));
                }
                Ok(v.mapv(|x| x / d))
            }
            PotArray::Complex(a) => {
                let v = a.into_dimensionality::<Ix1>().expect("single axis");
                let d = v.iter().map(|x| x.norm_sqr()).sum::<f64>().sqrt();
                if d < 1e-6 {
                    return Err(BnetError::UnNormalizablePot {
                        label: label.into(),
                        parent_states: vec![],
                    });
                }
                if !d.is_finite() {
                    return Err(BnetError::Arithmetic(label.into()));
                }
                Ok(v.mapv(|x| (x / d).norm_sqr()))
            }
        }
    }
}

impl PartialEq for Potential {
    /// Two potentials are equal when they carry the same node set and
    /// their arrays agree to within 1e-6 in 2-norm after aligning the
    /// axes.
    fn eq(&self, other: &Self) -> bool {
        self.nodes() == other.nodes()
            && self.distance(other).map(|d| d < 1e-6).unwrap_or(false)
    }
}

/// A potential whose last ord-node is the focus: P(focus | rest) for
/// classical networks, A(focus | rest) for quantum ones. Every
/// operation preserves the focus position.
#[derive(Debug, Clone)]
pub struct CondPot {
    pot: Potential,
}

impl CondPot {
    pub fn new(pot: Potential) -> Result<CondPot> {
        if pot.ord_nodes().is_empty() {
            return Err(BnetError::PotentialShape(
                "a conditional potential needs a focus node".into(),
            ));
        }
        Ok(CondPot { pot })
    }

    /// The node this potential is a distribution over.
    pub fn focus(&self) -> usize {
        self.pot.ord_nodes[self.pot.ord_nodes.len() - 1]
    }

    pub fn pot(&self) -> &Potential {
        &self.pot
    }

    /// Mutable access for entry edits (the mend path). The focus stays
    /// the last ord-node; callers must not transpose through this.
    pub fn pot_mut(&mut self) -> &mut Potential {
        &mut self.pot
    }

    pub fn is_quantum(&self) -> bool {
        self.pot.is_quantum()
    }

    fn parent_combos(&self) -> Vec<Vec<usize>> {
        let n = self.pot.nd_sizes.len();
        self.pot.nd_sizes[..n - 1]
            .iter()
            .map(|&s| 0..s)
            .multi_cartesian_product()
            .collect()
    }

    fn slice_divisor(&self, idx_p: &[usize]) -> f64 {
        let k = *self.pot.nd_sizes.last().expect("focus axis");
        let mut idx = idx_p.to_vec();
        idx.push(0);
        let last = idx.len() - 1;
        match &self.pot.arr {
            PotArray::Real(a) => (0..k)
                .map(|s| {
                    idx[last] = s;
                    a[IxDyn(&idx)]
                })
                .sum(),
            PotArray::Complex(a) => (0..k)
                .map(|s| {
                    idx[last] = s;
                    a[IxDyn(&idx)].norm_sqr()
                })
                .sum::<f64>()
                .sqrt(),
        }
    }

    fn scale_slice(&mut self, idx_p: &[usize], d: f64) {
        let k = *self.pot.nd_sizes.last().expect("focus axis");
        let mut idx = idx_p.to_vec();
        idx.push(0);
        let last = idx.len() - 1;
        match &mut self.pot.arr {
            PotArray::Real(a) => {
                for s in 0..k {
                    idx[last] = s;
                    a[IxDyn(&idx)] /= d;
                }
            }
            PotArray::Complex(a) => {
                for s in 0..k {
                    idx[last] = s;
                    a[IxDyn(&idx)] /= Complex64::new(d, 0.0);
                }
            }
        }
    }

    /// Divides every parent slice by its sum (classical) or 2-norm
    /// (quantum) so that the potential becomes a proper conditional
    /// distribution of the focus node. `label` tags the error when a
    /// slice carries no measure.
    pub fn normalize(&mut self, label: &str) -> Result<()> {
        if self.pot.ord_nodes.len() == 1 {
            let d = self.slice_divisor(&[]);
            if d.abs() < 1e-6 {
                return Err(BnetError::UnNormalizablePot {
                    label: label.into(),
                    parent_states: vec![],
                });
            }
            self.scale_slice(&[], d);
            return Ok(());
        }
        for idx_p in self.parent_combos() {
            let d = self.slice_divisor(&idx_p);
            if d.abs() < 1e-6 {
                return Err(BnetError::UnNormalizablePot {
                    label: label.into(),
                    parent_states: idx_p,
                });
            }
            self.scale_slice(&idx_p, d);
        }
        Ok(())
    }

    /// The divisors `normalize` would apply, per parent-state tuple,
    /// without applying them. For a properly conditional potential
    /// every value is 1; anything else measures how far a slice is
    /// from normalized.
    pub fn total_probs(&self) -> BTreeMap<Vec<usize>, f64> {
        let mut totals = BTreeMap::new();
        if self.pot.ord_nodes.len() == 1 {
            totals.insert(Vec::new(), self.slice_divisor(&[]));
        } else {
            for idx_p in self.parent_combos() {
                let d = self.slice_divisor(&idx_p);
                totals.insert(idx_p, d);
            }
        }
        totals
    }
}
