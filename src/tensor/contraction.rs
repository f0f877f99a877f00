//! Labelled-index tensor contraction
//!
//! Every operand carries one integer label per axis. The result keeps the
//! labels listed in the output and sums over all others, exactly like
//! `einsum` with explicit output indices. Labels are plain integers so that
//! label lists can be assembled programmatically from the number of agents.
//!
//! Operands are contracted pairwise. With `optimize` enabled the pair whose
//! intermediate result is smallest is contracted first (greedy path search);
//! otherwise operands are folded strictly left to right. Both orders compute
//! the same sums and differ only in floating-point rounding.

use std::collections::BTreeMap;

use ndarray::{ArrayD, ArrayView, ArrayViewD, Dimension, IxDyn};

use crate::{Error, Result};

/// Symbolic index label.
pub type Label = usize;

/// Hands out fresh, distinct labels.
#[derive(Debug, Clone, Default)]
pub struct LabelAllocator {
    next: Label,
}

impl LabelAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// A single fresh label.
    pub fn one(&mut self) -> Label {
        let label = self.next;
        self.next += 1;
        label
    }

    /// `count` fresh labels, in allocation order.
    pub fn many(&mut self, count: usize) -> Vec<Label> {
        (0..count).map(|_| self.one()).collect()
    }
}

/// A borrowed array together with the labels of its axes.
#[derive(Debug, Clone)]
pub struct Operand<'a> {
    array: ArrayViewD<'a, f64>,
    labels: Vec<Label>,
}

impl<'a> Operand<'a> {
    pub fn new<D: Dimension>(array: ArrayView<'a, f64, D>, labels: &[Label]) -> Self {
        Self {
            array: array.into_dyn(),
            labels: labels.to_vec(),
        }
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }
}

/// Row-major dense intermediate.
#[derive(Debug, Clone)]
struct Term {
    data: Vec<f64>,
    shape: Vec<usize>,
    labels: Vec<Label>,
}

impl Term {
    fn scalar(value: f64) -> Self {
        Self {
            data: vec![value],
            shape: Vec::new(),
            labels: Vec::new(),
        }
    }
}

fn row_major_strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![0; shape.len()];
    let mut acc = 1;
    for (axis, &len) in shape.iter().enumerate().rev() {
        strides[axis] = acc;
        acc *= len;
    }
    strides
}

fn union_labels(a: &[Label], b: &[Label]) -> Vec<Label> {
    let mut union = Vec::with_capacity(a.len() + b.len());
    for &label in a.iter().chain(b) {
        if !union.contains(&label) {
            union.push(label);
        }
    }
    union
}

/// Contract `a` and `b`, keeping `result_labels` in the given order.
fn contract_pair(
    a: &Term,
    b: &Term,
    result_labels: &[Label],
    dims: &BTreeMap<Label, usize>,
) -> Term {
    let union = union_labels(&a.labels, &b.labels);
    let position = |label: Label| union.iter().position(|&l| l == label);
    let union_shape: Vec<usize> = union.iter().map(|label| dims[label]).collect();

    // Repeated labels within one operand accumulate strides, which walks the diagonal.
    let mut a_steps = vec![0usize; union.len()];
    for (axis, stride) in row_major_strides(&a.shape).into_iter().enumerate() {
        if let Some(p) = position(a.labels[axis]) {
            a_steps[p] += stride;
        }
    }
    let mut b_steps = vec![0usize; union.len()];
    for (axis, stride) in row_major_strides(&b.shape).into_iter().enumerate() {
        if let Some(p) = position(b.labels[axis]) {
            b_steps[p] += stride;
        }
    }
    let result_shape: Vec<usize> = result_labels.iter().map(|label| dims[label]).collect();
    let mut r_steps = vec![0usize; union.len()];
    for (axis, stride) in row_major_strides(&result_shape).into_iter().enumerate() {
        if let Some(p) = position(result_labels[axis]) {
            r_steps[p] = stride;
        }
    }

    let result_len: usize = result_shape.iter().product();
    let mut data = vec![0.0; result_len];
    let total: usize = union_shape.iter().product();
    let mut counter = vec![0usize; union.len()];
    let (mut ao, mut bo, mut ro) = (0usize, 0usize, 0usize);

    for _ in 0..total {
        data[ro] += a.data[ao] * b.data[bo];
        for axis in (0..union.len()).rev() {
            counter[axis] += 1;
            ao += a_steps[axis];
            bo += b_steps[axis];
            ro += r_steps[axis];
            if counter[axis] < union_shape[axis] {
                break;
            }
            ao -= a_steps[axis] * union_shape[axis];
            bo -= b_steps[axis] * union_shape[axis];
            ro -= r_steps[axis] * union_shape[axis];
            counter[axis] = 0;
        }
    }

    Term {
        data,
        shape: result_shape,
        labels: result_labels.to_vec(),
    }
}

/// Labels of the pair `(p, q)` still needed by the output or another term.
fn surviving_labels(terms: &[Term], p: usize, q: usize, output: &[Label]) -> Vec<Label> {
    union_labels(&terms[p].labels, &terms[q].labels)
        .into_iter()
        .filter(|label| {
            output.contains(label)
                || terms
                    .iter()
                    .enumerate()
                    .any(|(k, term)| k != p && k != q && term.labels.contains(label))
        })
        .collect()
}

/// Greedy choice: smallest intermediate first, then the cheapest loop.
fn cheapest_pair(terms: &[Term], output: &[Label], dims: &BTreeMap<Label, usize>) -> (usize, usize) {
    let mut best = (0, 1);
    let mut best_cost = (usize::MAX, usize::MAX);
    for p in 0..terms.len() {
        for q in (p + 1)..terms.len() {
            let kept = surviving_labels(terms, p, q, output);
            let size: usize = kept.iter().map(|label| dims[label]).product();
            let work: usize = union_labels(&terms[p].labels, &terms[q].labels)
                .iter()
                .map(|label| dims[label])
                .product();
            if (size, work) < best_cost {
                best_cost = (size, work);
                best = (p, q);
            }
        }
    }
    best
}

fn collect_dimensions(operands: &[Operand<'_>]) -> Result<BTreeMap<Label, usize>> {
    let mut dims = BTreeMap::new();
    for (index, operand) in operands.iter().enumerate() {
        if operand.array.ndim() != operand.labels.len() {
            return Err(Error::Contraction {
                message: format!(
                    "operand {index} has {} axes but {} labels",
                    operand.array.ndim(),
                    operand.labels.len()
                ),
            });
        }
        for (&label, &len) in operand.labels.iter().zip(operand.array.shape()) {
            match dims.get(&label) {
                Some(&existing) if existing != len => {
                    return Err(Error::Contraction {
                        message: format!(
                            "label {label} has extent {existing} but operand {index} has extent {len}"
                        ),
                    });
                }
                Some(_) => {}
                None => {
                    dims.insert(label, len);
                }
            }
        }
    }
    Ok(dims)
}

/// Contract the labelled operands into an array indexed by `output`.
///
/// Labels absent from `output` are summed over. Fails when operand ranks do
/// not match their label lists, when one label is bound to two different
/// extents, or when an output label is repeated or unbound.
///
/// ```
/// use crld::tensor::{LabelAllocator, Operand, contract};
/// use ndarray::array;
///
/// let mut labels = LabelAllocator::new();
/// let (i, j, k) = (labels.one(), labels.one(), labels.one());
/// let a = array![[1.0, 2.0], [3.0, 4.0]];
/// let b = array![[1.0, 0.0], [0.0, 1.0]];
/// let product = contract(
///     &[Operand::new(a.view(), &[i, j]), Operand::new(b.view(), &[j, k])],
///     &[i, k],
///     true,
/// )?;
/// assert_eq!(product, a.into_dyn());
/// # Ok::<(), crld::Error>(())
/// ```
pub fn contract(operands: &[Operand<'_>], output: &[Label], optimize: bool) -> Result<ArrayD<f64>> {
    if operands.is_empty() {
        return Err(Error::Contraction {
            message: "no operands".to_string(),
        });
    }
    let dims = collect_dimensions(operands)?;
    for (position, label) in output.iter().enumerate() {
        if !dims.contains_key(label) {
            return Err(Error::Contraction {
                message: format!("output label {label} does not appear in any operand"),
            });
        }
        if output[..position].contains(label) {
            return Err(Error::Contraction {
                message: format!("output label {label} is repeated"),
            });
        }
    }

    let mut terms: Vec<Term> = operands
        .iter()
        .map(|operand| Term {
            data: operand.array.iter().copied().collect(),
            shape: operand.array.shape().to_vec(),
            labels: operand.labels.clone(),
        })
        .collect();

    while terms.len() > 1 {
        let (p, q) = if optimize {
            cheapest_pair(&terms, output, &dims)
        } else {
            (0, 1)
        };
        let kept = surviving_labels(&terms, p, q, output);
        let merged = contract_pair(&terms[p], &terms[q], &kept, &dims);
        terms.remove(q);
        terms.remove(p);
        if optimize {
            terms.push(merged);
        } else {
            terms.insert(0, merged);
        }
    }

    let last = terms.pop().ok_or_else(|| Error::Contraction {
        message: "contraction produced no result".to_string(),
    })?;
    let result = contract_pair(&last, &Term::scalar(1.0), output, &dims);
    Ok(ArrayD::from_shape_vec(IxDyn(&result.shape), result.data)?)
}
