//! TreeSHAP - exact Shapley values for one tree
//!
//! Path-dependent algorithm (Lundberg et al.): walk every root→leaf path once,
//! tracking for each feature on the path the fraction of "feature absent"
//! (cover ratio) and "feature present" (follows x) flow. O(L·D²) per tree.
//!
//! The value function is E[f(X) | X_S = x_S] where unknown splits are averaged
//! by training cover, so Σφ + E[f(X)] == f(x) holds exactly per tree.

use crate::logic::model::{Node, Tree};

#[derive(Debug, Clone, Copy)]
struct PathElement {
    /// `None` only for the root sentinel
    feature: Option<usize>,
    zero_fraction: f64,
    one_fraction: f64,
    pweight: f64,
}

/// Add this tree's attributions (times `scale`) into `phi`
pub fn accumulate(tree: &Tree, x: &[f64], scale: f64, phi: &mut [f64]) {
    if tree.nodes().is_empty() {
        return;
    }
    recurse(tree, x, scale, phi, 0, &[], 1.0, 1.0, None);
}

#[allow(clippy::too_many_arguments)]
fn recurse(
    tree: &Tree,
    x: &[f64],
    scale: f64,
    phi: &mut [f64],
    node: usize,
    parent_path: &[PathElement],
    zero_fraction: f64,
    one_fraction: f64,
    feature: Option<usize>,
) {
    let mut path = parent_path.to_vec();
    extend_path(&mut path, zero_fraction, one_fraction, feature);

    match tree.node(node) {
        Node::Leaf { value, .. } => {
            for i in 1..path.len() {
                let w = unwound_path_sum(&path, i);
                let el = path[i];
                if let Some(f) = el.feature {
                    if let Some(slot) = phi.get_mut(f) {
                        *slot += w * (el.one_fraction - el.zero_fraction) * value * scale;
                    }
                }
            }
        }
        Node::Split { feature: split, rule, left, right, cover } => {
            let value = x.get(*split).copied().unwrap_or(f64::NAN);
            let (hot, cold) = if rule.goes_left(value) { (*left, *right) } else { (*right, *left) };

            let hot_zero = tree.node(hot).cover() / cover;
            let cold_zero = tree.node(cold).cover() / cover;
            let mut incoming_zero = 1.0;
            let mut incoming_one = 1.0;

            // Feature already split above: undo it, the fractions combine below
            if let Some(k) = path.iter().position(|e| e.feature == Some(*split)) {
                incoming_zero = path[k].zero_fraction;
                incoming_one = path[k].one_fraction;
                unwind_path(&mut path, k);
            }

            recurse(tree, x, scale, phi, hot, &path, hot_zero * incoming_zero, incoming_one, Some(*split));
            recurse(tree, x, scale, phi, cold, &path, cold_zero * incoming_zero, 0.0, Some(*split));
        }
    }
}

fn extend_path(path: &mut Vec<PathElement>, zero_fraction: f64, one_fraction: f64, feature: Option<usize>) {
    let depth = path.len();
    path.push(PathElement {
        feature,
        zero_fraction,
        one_fraction,
        pweight: if depth == 0 { 1.0 } else { 0.0 },
    });
    let d1 = (depth + 1) as f64;
    for i in (0..depth).rev() {
        path[i + 1].pweight += one_fraction * path[i].pweight * (i + 1) as f64 / d1;
        path[i].pweight = zero_fraction * path[i].pweight * (depth - i) as f64 / d1;
    }
}

fn unwind_path(path: &mut Vec<PathElement>, index: usize) {
    let depth = path.len() - 1;
    let d1 = (depth + 1) as f64;
    let one = path[index].one_fraction;
    let zero = path[index].zero_fraction;
    let mut next_one_portion = path[depth].pweight;

    for i in (0..depth).rev() {
        if one != 0.0 {
            let tmp = path[i].pweight;
            path[i].pweight = next_one_portion * d1 / ((i + 1) as f64 * one);
            next_one_portion = tmp - path[i].pweight * zero * (depth - i) as f64 / d1;
        } else {
            path[i].pweight = path[i].pweight * d1 / (zero * (depth - i) as f64);
        }
    }

    for i in index..depth {
        path[i].feature = path[i + 1].feature;
        path[i].zero_fraction = path[i + 1].zero_fraction;
        path[i].one_fraction = path[i + 1].one_fraction;
    }
    path.pop();
}

/// Total permutation weight of the path with element `index` removed
fn unwound_path_sum(path: &[PathElement], index: usize) -> f64 {
    let depth = path.len() - 1;
    let d1 = (depth + 1) as f64;
    let one = path[index].one_fraction;
    let zero = path[index].zero_fraction;
    let mut next_one_portion = path[depth].pweight;
    let mut total = 0.0;

    for i in (0..depth).rev() {
        if one != 0.0 {
            let tmp = next_one_portion * d1 / ((i + 1) as f64 * one);
            total += tmp;
            next_one_portion = path[i].pweight - tmp * zero * (depth - i) as f64 / d1;
        } else if zero != 0.0 {
            total += (path[i].pweight / zero) / ((depth - i) as f64 / d1);
        }
    }
    total
}

// ============================================================================
// TESTS
// ============================================================================
