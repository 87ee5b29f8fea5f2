//! Pareto dominance over (risk, return, cost).
//!
//! Risk and cost are minimised, return is maximised. A point dominates
//! another if it is no worse on all three and strictly better on at least
//! one. Non-dominated points are ordered by `(risk, −return, cost)` and
//! then by their input position, so the frontier is reproducible for a
//! fixed candidate set.

use std::cmp::Ordering;
use tranche_risk::FrontierPoint;

/// Whether `a` dominates `b`.
///
/// # Examples
///
/// ```
/// use tranche_optimiser::pareto::dominates;
/// use tranche_risk::FrontierPoint;
///
/// let a = FrontierPoint { risk: 1.0, ret: 0.10, cost: 0.05 };
/// let b = FrontierPoint { risk: 1.0, ret: 0.08, cost: 0.05 };
/// assert!(dominates(&a, &b));
/// assert!(!dominates(&b, &a));
/// assert!(!dominates(&a, &a));
/// ```
pub fn dominates(a: &FrontierPoint, b: &FrontierPoint) -> bool {
    let no_worse = a.risk <= b.risk && a.ret >= b.ret && a.cost <= b.cost;
    let better = a.risk < b.risk || a.ret > b.ret || a.cost < b.cost;
    no_worse && better
}

/// Lexicographic frontier order.
pub fn frontier_order(a: &FrontierPoint, b: &FrontierPoint) -> Ordering {
    a.risk
        .total_cmp(&b.risk)
        .then(b.ret.total_cmp(&a.ret))
        .then(a.cost.total_cmp(&b.cost))
}

/// Indices of the non-dominated points, in frontier order.
///
/// Points with a NaN coordinate are never on the frontier.
pub fn pareto_frontier(points: &[FrontierPoint]) -> Vec<usize> {
    let finite = |p: &FrontierPoint| !(p.risk.is_nan() || p.ret.is_nan() || p.cost.is_nan());
    let mut frontier: Vec<usize> = (0..points.len())
        .filter(|&i| finite(&points[i]))
        .filter(|&i| {
            !points
                .iter()
                .enumerate()
                .any(|(j, p)| j != i && finite(p) && dominates(p, &points[i]))
        })
        .collect();
    frontier.sort_by(|&i, &j| frontier_order(&points[i], &points[j]).then(i.cmp(&j)));
    frontier
}
