//! Tree Ensemble - LightGBM model representation
//!
//! Parse `dump_model()` JSON thành cây phẳng (flat node arrays).
//! Split semantics follow LightGBM exactly, including missing-value routing,
//! because the explainer must follow the same path the predictor does.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::artifact::ModelError;
use super::Regressor;

/// LightGBM treats |x| <= this as zero for `missing_type = Zero`
const ZERO_THRESHOLD: f64 = 1e-35;

// ============================================================================
// NODES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MissingType {
    #[default]
    None,
    Zero,
    NaN,
}

/// Routing rule of one internal node
#[derive(Debug, Clone, PartialEq)]
pub enum SplitRule {
    /// `x <= threshold` goes left
    Numerical { threshold: f64, default_left: bool, missing: MissingType },
    /// `x ∈ categories` goes left
    Categorical { categories: BTreeSet<i64>, missing: MissingType },
}

impl SplitRule {
    pub fn goes_left(&self, value: f64) -> bool {
        match self {
            SplitRule::Numerical { threshold, default_left, missing } => {
                let mut v = value;
                if v.is_nan() && *missing != MissingType::NaN {
                    v = 0.0;
                }
                if (*missing == MissingType::Zero && v.abs() <= ZERO_THRESHOLD)
                    || (*missing == MissingType::NaN && v.is_nan())
                {
                    return *default_left;
                }
                v <= *threshold
            }
            SplitRule::Categorical { categories, missing } => {
                let mut v = value;
                if v.is_nan() {
                    if *missing == MissingType::NaN {
                        return false;
                    }
                    v = 0.0;
                }
                // LightGBM casts to int before the bitset lookup
                let code = v.trunc() as i64;
                code >= 0 && categories.contains(&code)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Split { feature: usize, rule: SplitRule, left: usize, right: usize, cover: f64 },
    Leaf { value: f64, cover: f64 },
}

impl Node {
    pub fn cover(&self) -> f64 {
        match self {
            Node::Split { cover, .. } | Node::Leaf { cover, .. } => *cover,
        }
    }
}

// ============================================================================
// TREE
// ============================================================================

/// One regression tree; node 0 is the root
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> &Node {
        &self.nodes[index]
    }

    /// Walk from the root to the leaf `x` falls into
    pub fn leaf_for(&self, x: &[f64]) -> usize {
        let mut index = 0;
        while let Node::Split { feature, rule, left, right, .. } = &self.nodes[index] {
            let value = x.get(*feature).copied().unwrap_or(f64::NAN);
            index = if rule.goes_left(value) { *left } else { *right };
        }
        index
    }

    pub fn predict(&self, x: &[f64]) -> f64 {
        match &self.nodes[self.leaf_for(x)] {
            Node::Leaf { value, .. } => *value,
            Node::Split { .. } => 0.0,
        }
    }

    /// Cover-weighted mean output, i.e. E[f(X)] over the training data
    pub fn expected_value(&self) -> f64 {
        self.expected_from(0)
    }

    fn expected_from(&self, index: usize) -> f64 {
        match &self.nodes[index] {
            Node::Leaf { value, .. } => *value,
            Node::Split { left, right, cover, .. } => {
                let l = self.nodes[*left].cover() / cover;
                let r = self.nodes[*right].cover() / cover;
                l * self.expected_from(*left) + r * self.expected_from(*right)
            }
        }
    }

    pub fn max_feature(&self) -> Option<usize> {
        self.nodes
            .iter()
            .filter_map(|n| match n {
                Node::Split { feature, .. } => Some(*feature),
                Node::Leaf { .. } => None,
            })
            .max()
    }

    fn check_covers(&self, tree_index: usize) -> Result<(), ModelError> {
        for (i, node) in self.nodes.iter().enumerate() {
            if let Node::Split { cover, .. } = node {
                if *cover <= 0.0 || !cover.is_finite() {
                    return Err(ModelError::InvalidTree {
                        tree: tree_index,
                        reason: format!("node {} has non-positive cover {}", i, cover),
                    });
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// OUTPUT TRANSFORM
// ============================================================================

/// Maps the summed raw margin to the reported score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutputTransform {
    Identity,
    Exp,
    Sigmoid { scale: f64 },
}

impl OutputTransform {
    /// Parse a LightGBM objective string such as `"binary sigmoid:1"`
    pub fn from_objective(objective: &str) -> Self {
        let mut parts = objective.split_whitespace();
        match parts.next().unwrap_or("regression") {
            "binary" | "cross_entropy" | "xentropy" => {
                let scale = parts
                    .filter_map(|p| p.strip_prefix("sigmoid:"))
                    .find_map(|s| s.parse::<f64>().ok())
                    .unwrap_or(1.0);
                OutputTransform::Sigmoid { scale }
            }
            "poisson" | "gamma" | "tweedie" => OutputTransform::Exp,
            _ => OutputTransform::Identity,
        }
    }

    pub fn apply(&self, raw: f64) -> f64 {
        match self {
            OutputTransform::Identity => raw,
            OutputTransform::Exp => raw.exp(),
            OutputTransform::Sigmoid { scale } => 1.0 / (1.0 + (-scale * raw).exp()),
        }
    }
}

// ============================================================================
// FOREST
// ============================================================================

/// Gradient-boosted (or averaged) ensemble of regression trees
#[derive(Debug, Clone, PartialEq)]
pub struct Forest {
    trees: Vec<Tree>,
    average_output: bool,
    objective: String,
    transform: OutputTransform,
    feature_names: Vec<String>,
}

impl Forest {
    pub fn new(trees: Vec<Tree>, average_output: bool, objective: &str) -> Self {
        Self {
            trees,
            average_output,
            objective: objective.to_string(),
            transform: OutputTransform::from_objective(objective),
            feature_names: Vec::new(),
        }
    }

    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    pub fn average_output(&self) -> bool {
        self.average_output
    }

    pub fn objective(&self) -> &str {
        &self.objective
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Per-tree scale: 1 for boosting, 1/T for random-forest mode
    pub fn tree_weight(&self) -> f64 {
        if self.average_output && !self.trees.is_empty() {
            1.0 / self.trees.len() as f64
        } else {
            1.0
        }
    }

    pub fn expected_value(&self) -> f64 {
        self.trees.iter().map(Tree::expected_value).sum::<f64>() * self.tree_weight()
    }

    /// Parse LightGBM `dump_model()` JSON
    pub fn from_lightgbm_json(doc: serde_json::Value) -> Result<Self, ModelError> {
        let dump: LgbmDump =
            serde_json::from_value(doc).map_err(|e| ModelError::Parse(e.to_string()))?;

        if dump.num_tree_per_iteration != 1 {
            return Err(ModelError::Unsupported(format!(
                "{} trees per iteration (multi-output models are not supported)",
                dump.num_tree_per_iteration
            )));
        }

        let mut trees = Vec::with_capacity(dump.tree_info.len());
        for (i, info) in dump.tree_info.iter().enumerate() {
            let mut nodes = Vec::new();
            flatten(&info.tree_structure, &mut nodes)?;
            let tree = Tree::new(nodes);
            tree.check_covers(i)?;
            if let Some(f) = tree.max_feature() {
                if f > dump.max_feature_idx {
                    return Err(ModelError::InvalidTree {
                        tree: i,
                        reason: format!("split on feature {} beyond max_feature_idx {}", f, dump.max_feature_idx),
                    });
                }
            }
            trees.push(tree);
        }

        let objective = dump.objective.as_deref().unwrap_or("regression");
        let mut forest = Forest::new(trees, dump.average_output, objective);
        forest.feature_names = dump.feature_names;
        Ok(forest)
    }

    /// Number of input columns the model was trained on
    pub fn n_features_hint(&self) -> Option<usize> {
        if !self.feature_names.is_empty() {
            return Some(self.feature_names.len());
        }
        self.trees.iter().filter_map(Tree::max_feature).max().map(|f| f + 1)
    }
}

impl Regressor for Forest {
    fn predict_raw(&self, x: &[f64]) -> f64 {
        self.trees.iter().map(|t| t.predict(x)).sum::<f64>() * self.tree_weight()
    }

    fn output(&self, raw: f64) -> f64 {
        self.transform.apply(raw)
    }
}

// ============================================================================
// LIGHTGBM JSON
// ============================================================================

fn default_one() -> usize {
    1
}

#[derive(Debug, Deserialize)]
struct LgbmDump {
    #[serde(default)]
    objective: Option<String>,
    max_feature_idx: usize,
    #[serde(default)]
    average_output: bool,
    #[serde(default)]
    feature_names: Vec<String>,
    #[serde(default = "default_one")]
    num_tree_per_iteration: usize,
    tree_info: Vec<LgbmTreeInfo>,
}

#[derive(Debug, Deserialize)]
struct LgbmTreeInfo {
    tree_structure: LgbmNode,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LgbmNode {
    Split(Box<LgbmSplit>),
    Leaf(LgbmLeaf),
}

#[derive(Debug, Deserialize)]
struct LgbmSplit {
    split_feature: usize,
    threshold: LgbmThreshold,
    decision_type: String,
    #[serde(default)]
    default_left: bool,
    #[serde(default)]
    missing_type: MissingType,
    #[serde(default)]
    internal_count: Option<f64>,
    left_child: LgbmNode,
    right_child: LgbmNode,
}

#[derive(Debug, Deserialize)]
struct LgbmLeaf {
    leaf_value: f64,
    #[serde(default)]
    leaf_count: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LgbmThreshold {
    Number(f64),
    Categories(String),
}

/// Pre-order flatten; returns the index assigned to `node`
fn flatten(node: &LgbmNode, out: &mut Vec<Node>) -> Result<usize, ModelError> {
    let index = out.len();
    match node {
        LgbmNode::Leaf(leaf) => {
            out.push(Node::Leaf { value: leaf.leaf_value, cover: leaf.leaf_count.unwrap_or(0.0) });
        }
        LgbmNode::Split(split) => {
            let rule = parse_rule(split)?;
            // placeholder, patched once children are known
            out.push(Node::Leaf { value: 0.0, cover: 0.0 });
            let left = flatten(&split.left_child, out)?;
            let right = flatten(&split.right_child, out)?;
            let cover = split
                .internal_count
                .unwrap_or_else(|| out[left].cover() + out[right].cover());
            out[index] = Node::Split { feature: split.split_feature, rule, left, right, cover };
        }
    }
    Ok(index)
}

fn parse_rule(split: &LgbmSplit) -> Result<SplitRule, ModelError> {
    match (split.decision_type.as_str(), &split.threshold) {
        ("<=", LgbmThreshold::Number(threshold)) => Ok(SplitRule::Numerical {
            threshold: *threshold,
            default_left: split.default_left,
            missing: split.missing_type,
        }),
        ("==", LgbmThreshold::Categories(text)) => {
            let categories = text
                .split("||")
                .map(|c| c.trim().parse::<i64>())
                .collect::<Result<BTreeSet<_>, _>>()
                .map_err(|e| ModelError::Parse(format!("bad categorical threshold '{}': {}", text, e)))?;
            Ok(SplitRule::Categorical { categories, missing: split.missing_type })
        }
        ("==", LgbmThreshold::Number(n)) if n.fract() == 0.0 => Ok(SplitRule::Categorical {
            categories: BTreeSet::from([*n as i64]),
            missing: split.missing_type,
        }),
        (other, _) => Err(ModelError::Unsupported(format!("decision_type '{}'", other))),
    }
}

// ============================================================================
// TESTS
// ============================================================================
