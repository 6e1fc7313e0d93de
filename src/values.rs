use ndarray::{ArrayD, Axis, IxDyn, Zip};
use num_complex::Complex64;

use crate::error::{BnetError, Result};

/// Entries of a potential. Classical networks store non-negative
/// reals, quantum networks store complex probability amplitudes; the
/// variant is the single source of truth for "is this quantum".
#[derive(Debug, Clone)]
pub enum PotArray {
    Real(ArrayD<f64>),
    Complex(ArrayD<Complex64>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArrOp {
    Add,
    Sub,
    Mul,
    Div,
}

fn real_op(op: ArrOp) -> impl Fn(f64, f64) -> f64 {
    move |x, y| match op {
        ArrOp::Add => x + y,
        ArrOp::Sub => x - y,
        ArrOp::Mul => x * y,
        ArrOp::Div => {
            let v = x / y;
            // 0/0 and every other non-finite quotient become exactly 0
            if v.is_finite() {
                v
            } else {
                0.0
            }
        }
    }
}

fn complex_op(op: ArrOp) -> impl Fn(Complex64, Complex64) -> Complex64 {
    move |x, y| match op {
        ArrOp::Add => x + y,
        ArrOp::Sub => x - y,
        ArrOp::Mul => x * y,
        ArrOp::Div => {
            let v = x / y;
            if v.is_finite() {
                v
            } else {
                Complex64::new(0.0, 0.0)
            }
        }
    }
}

fn broadcast_zip<T, F>(a: &ArrayD<T>, b: &ArrayD<T>, shape: &[usize], f: F) -> ArrayD<T>
where
    T: Copy,
    F: Fn(T, T) -> T,
{
    let lhs = a.broadcast(IxDyn(shape)).expect("aligned operand broadcasts");
    let rhs = b.broadcast(IxDyn(shape)).expect("aligned operand broadcasts");
    Zip::from(&lhs).and(&rhs).map_collect(|&x, &y| f(x, y))
}

fn mixed_operands() -> BnetError {
    BnetError::PotentialShape("mixed real and complex operands".into())
}

impl PotArray {
    /// Array of the given shape with every entry set to `bias`.
    pub fn filled(is_quantum: bool, shape: &[usize], bias: f64) -> PotArray {
        if is_quantum {
            PotArray::Complex(ArrayD::from_elem(IxDyn(shape), Complex64::new(bias, 0.0)))
        } else {
            PotArray::Real(ArrayD::from_elem(IxDyn(shape), bias))
        }
    }

    pub fn is_quantum(&self) -> bool {
        matches!(self, PotArray::Complex(_))
    }

    pub fn shape(&self) -> &[usize] {
        match self {
            PotArray::Real(a) => a.shape(),
            PotArray::Complex(a) => a.shape(),
        }
    }

    pub fn ndim(&self) -> usize {
        match self {
            PotArray::Real(a) => a.ndim(),
            PotArray::Complex(a) => a.ndim(),
        }
    }

    /// Entry at a full index, promoted to a complex value (real
    /// entries have zero imaginary part).
    pub fn value_at(&self, idx: &[usize]) -> Complex64 {
        match self {
            PotArray::Real(a) => Complex64::new(a[IxDyn(idx)], 0.0),
            PotArray::Complex(a) => a[IxDyn(idx)],
        }
    }

    /// Writes an entry. For a real array only the real part of `val`
    /// is stored.
    pub fn set_at(&mut self, idx: &[usize], val: Complex64) {
        match self {
            PotArray::Real(a) => a[IxDyn(idx)] = val.re,
            PotArray::Complex(a) => a[IxDyn(idx)] = val,
        }
    }

    /// Frobenius norm, the 2-norm used for quantum normalization.
    pub fn norm2(&self) -> f64 {
        match self {
            PotArray::Real(a) => a.iter().map(|v| v * v).sum::<f64>().sqrt(),
            PotArray::Complex(a) => a.iter().map(|v| v.norm_sqr()).sum::<f64>().sqrt(),
        }
    }

    /// Sum of all entries.
    pub fn total(&self) -> Complex64 {
        match self {
            PotArray::Real(a) => Complex64::new(a.sum(), 0.0),
            PotArray::Complex(a) => a.sum(),
        }
    }

    pub(crate) fn permuted(self, axes: &[usize]) -> PotArray {
        match self {
            PotArray::Real(a) => PotArray::Real(a.permuted_axes(IxDyn(axes))),
            PotArray::Complex(a) => PotArray::Complex(a.permuted_axes(IxDyn(axes))),
        }
    }

    pub(crate) fn sum_last_axis(self) -> PotArray {
        let last = Axis(self.ndim() - 1);
        match self {
            PotArray::Real(a) => PotArray::Real(a.sum_axis(last)),
            PotArray::Complex(a) => PotArray::Complex(a.sum_axis(last)),
        }
    }

    pub(crate) fn insert_axis(self, pos: usize) -> PotArray {
        match self {
            PotArray::Real(a) => PotArray::Real(a.insert_axis(Axis(pos))),
            PotArray::Complex(a) => PotArray::Complex(a.insert_axis(Axis(pos))),
        }
    }

    /// Zeroes the `state` hyperplane along `axis`.
    pub(crate) fn zero_axis_state(&mut self, axis: usize, state: usize) {
        match self {
            PotArray::Real(a) => a.index_axis_mut(Axis(axis), state).fill(0.0),
            PotArray::Complex(a) => a
                .index_axis_mut(Axis(axis), state)
                .fill(Complex64::new(0.0, 0.0)),
        }
    }

    /// Elementwise `self op rhs` after both operands have been
    /// aligned to a common `shape` (unit axes already inserted).
    pub(crate) fn broadcast_op(&self, rhs: &PotArray, shape: &[usize], op: ArrOp) -> Result<PotArray> {
        match (self, rhs) {
            (PotArray::Real(a), PotArray::Real(b)) => {
                Ok(PotArray::Real(broadcast_zip(a, b, shape, real_op(op))))
            }
            (PotArray::Complex(a), PotArray::Complex(b)) => {
                Ok(PotArray::Complex(broadcast_zip(a, b, shape, complex_op(op))))
            }
            _ => Err(mixed_operands()),
        }
    }

    /// Elementwise `self op= rhs`; `rhs` must broadcast to the shape
    /// of `self`, which is never reshaped.
    pub(crate) fn assign_op(&mut self, rhs: &PotArray, op: ArrOp) -> Result<()> {
        match (self, rhs) {
            (PotArray::Real(a), PotArray::Real(b)) => {
                let f = real_op(op);
                a.zip_mut_with(b, |x, &y| *x = f(*x, y));
                Ok(())
            }
            (PotArray::Complex(a), PotArray::Complex(b)) => {
                let f = complex_op(op);
                a.zip_mut_with(b, |x, &y| *x = f(*x, y));
                Ok(())
            }
            _ => Err(mixed_operands()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr1;

    #[test]
    fn division_by_zero_yields_zero() {
        let a = PotArray::Real(arr1(&[2.0, 5.0, 0.0]).into_dyn());
        let b = PotArray::Real(arr1(&[1.0, 0.0, 0.0]).into_dyn());
        let q = a.broadcast_op(&b, &[3], ArrOp::Div).unwrap();
        match q {
            PotArray::Real(arr) => assert_eq!(arr.as_slice().unwrap(), &[2.0, 0.0, 0.0]),
            _ => unreachable!(),
        }
    }

    #[test]
    fn complex_division_by_zero_yields_zero() {
        let z = Complex64::new(0.0, 0.0);
        let a = PotArray::Complex(arr1(&[Complex64::new(2.0, 1.0), z]).into_dyn());
        let b = PotArray::Complex(arr1(&[Complex64::new(0.0, 1.0), z]).into_dyn());
        let q = a.broadcast_op(&b, &[2], ArrOp::Div).unwrap();
        match q {
            PotArray::Complex(arr) => {
                assert_eq!(arr[0], Complex64::new(1.0, -2.0));
                assert_eq!(arr[1], z);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn mixed_operands_are_rejected() {
        let a = PotArray::Real(arr1(&[1.0]).into_dyn());
        let b = PotArray::filled(true, &[1], 1.0);
        assert!(a.broadcast_op(&b, &[1], ArrOp::Mul).is_err());
    }
}
