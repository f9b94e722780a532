//! On-disk classifier artifact.
//!
//! The trained model is exported as a JSON document. Three model families are
//! understood, all in the flattened layout scikit-learn uses internally:
//!
//! - `logistic_regression`: one coefficient per feature plus an intercept.
//! - `decision_tree`: a single tree in pre-order array form.
//! - `random_forest`: a list of such trees, combined by averaging each tree's
//!   normalized leaf class distribution.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::features::{FeatureVector, FEATURE_COUNT};
use super::{Classifier, Label, ModelError};

pub const SUPPORTED_FORMAT_VERSION: u32 = 1;

/// Marker for "no child" in `children_left` / `children_right`.
const LEAF: i64 = -1;

fn default_classes() -> Vec<Label> {
    vec![0, 1]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    #[serde(default)]
    pub name: Option<String>,
    pub model: ModelSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModelSpec {
    LogisticRegression(LogisticRegression),
    DecisionTree(DecisionTree),
    RandomForest(RandomForest),
}

impl ModelArtifact {
    pub fn from_json(raw: &str) -> Result<Self, ModelError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Validate the artifact and turn it into a usable classifier.
    pub fn into_classifier(self) -> Result<Arc<dyn Classifier>, ModelError> {
        if self.format_version != SUPPORTED_FORMAT_VERSION {
            return Err(ModelError::UnsupportedVersion {
                found: self.format_version,
                expected: SUPPORTED_FORMAT_VERSION,
            });
        }

        match self.model {
            ModelSpec::LogisticRegression(m) => {
                m.validate()?;
                Ok(Arc::new(m))
            }
            ModelSpec::DecisionTree(m) => {
                validate_classes(&m.classes)?;
                m.tree.validate(m.classes.len())?;
                Ok(Arc::new(m))
            }
            ModelSpec::RandomForest(m) => {
                m.validate()?;
                Ok(Arc::new(m))
            }
        }
    }
}

fn validate_classes(classes: &[Label]) -> Result<(), ModelError> {
    if classes.len() < 2 {
        return Err(ModelError::Invalid(format!(
            "expected at least 2 classes, got {}",
            classes.len()
        )));
    }
    Ok(())
}

/// Index of the largest element; ties go to the lowest index.
fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

fn class_at(classes: &[Label], index: usize) -> Result<Label, ModelError> {
    classes
        .get(index)
        .copied()
        .ok_or_else(|| ModelError::Invalid(format!("class index {index} out of range")))
}

// ---------------------------------------------------------------------------
// Logistic regression
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    coefficients: Vec<f64>,
    intercept: f64,
    #[serde(default = "default_classes")]
    classes: Vec<Label>,
}

impl LogisticRegression {
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Self {
        Self {
            coefficients,
            intercept,
            classes: default_classes(),
        }
    }

    fn validate(&self) -> Result<(), ModelError> {
        if self.coefficients.len() != FEATURE_COUNT {
            return Err(ModelError::Invalid(format!(
                "expected {FEATURE_COUNT} coefficients, got {}",
                self.coefficients.len()
            )));
        }
        if self.classes.len() != 2 {
            return Err(ModelError::Invalid(format!(
                "logistic regression is binary, got {} classes",
                self.classes.len()
            )));
        }
        if !self.intercept.is_finite() || self.coefficients.iter().any(|c| !c.is_finite()) {
            return Err(ModelError::Invalid("non-finite coefficient".into()));
        }
        Ok(())
    }

    fn decision(&self, x: &FeatureVector) -> f64 {
        self.coefficients
            .iter()
            .zip(x.as_slice())
            .map(|(w, v)| w * v)
            .sum::<f64>()
            + self.intercept
    }
}

impl Classifier for LogisticRegression {
    fn kind(&self) -> &'static str {
        "logistic_regression"
    }

    fn predict(&self, batch: &[FeatureVector]) -> Result<Vec<Label>, ModelError> {
        batch
            .iter()
            .map(|x| {
                let idx = if self.decision(x) > 0.0 { 1 } else { 0 };
                class_at(&self.classes, idx)
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Trees
// ---------------------------------------------------------------------------

/// One decision tree in flattened pre-order layout.
///
/// Node `i` is a leaf when `children_left[i] == -1`. Otherwise the walk goes
/// left when `x[feature[i]] <= threshold[i]`. `value[i]` holds per-class
/// weights and is only read at leaves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree {
    children_left: Vec<i64>,
    children_right: Vec<i64>,
    feature: Vec<i64>,
    threshold: Vec<f64>,
    value: Vec<Vec<f64>>,
}

impl Tree {
    pub fn new(
        children_left: Vec<i64>,
        children_right: Vec<i64>,
        feature: Vec<i64>,
        threshold: Vec<f64>,
        value: Vec<Vec<f64>>,
    ) -> Self {
        Self {
            children_left,
            children_right,
            feature,
            threshold,
            value,
        }
    }

    fn node_count(&self) -> usize {
        self.children_left.len()
    }

    fn validate(&self, n_classes: usize) -> Result<(), ModelError> {
        let n = self.node_count();
        if n == 0 {
            return Err(ModelError::Invalid("tree has no nodes".into()));
        }
        if self.children_right.len() != n
            || self.feature.len() != n
            || self.threshold.len() != n
            || self.value.len() != n
        {
            return Err(ModelError::Invalid("tree arrays differ in length".into()));
        }

        for i in 0..n {
            let (left, right) = (self.children_left[i], self.children_right[i]);
            if left == LEAF {
                if right != LEAF {
                    return Err(ModelError::Invalid(format!("node {i} has only a right child")));
                }
                if self.value[i].len() != n_classes {
                    return Err(ModelError::Invalid(format!(
                        "leaf {i} has {} class weights, expected {n_classes}",
                        self.value[i].len()
                    )));
                }
                continue;
            }

            // Children always come after their parent in pre-order, which also
            // rules out cycles.
            for child in [left, right] {
                if child <= i as i64 || child >= n as i64 {
                    return Err(ModelError::Invalid(format!(
                        "node {i} points to invalid child {child}"
                    )));
                }
            }
            let f = self.feature[i];
            if f < 0 || f >= FEATURE_COUNT as i64 {
                return Err(ModelError::Invalid(format!(
                    "node {i} splits on unknown feature {f}"
                )));
            }
        }
        Ok(())
    }

    /// Class weights of the leaf `x` falls into.
    fn leaf_value(&self, x: &FeatureVector) -> Result<&[f64], ModelError> {
        let corrupt = || ModelError::Invalid("tree walk left the node arrays".into());
        let mut node = 0usize;

        loop {
            let left = *self.children_left.get(node).ok_or_else(corrupt)?;
            if left == LEAF {
                return self.value.get(node).map(Vec::as_slice).ok_or_else(corrupt);
            }

            let feature = *self.feature.get(node).ok_or_else(corrupt)?;
            let threshold = *self.threshold.get(node).ok_or_else(corrupt)?;
            let v = usize::try_from(feature)
                .ok()
                .and_then(|f| x.get(f))
                .ok_or_else(corrupt)?;

            let next = if v <= threshold {
                left
            } else {
                *self.children_right.get(node).ok_or_else(corrupt)?
            };
            let next = usize::try_from(next).map_err(|_| corrupt())?;
            if next <= node {
                return Err(corrupt());
            }
            node = next;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    #[serde(default = "default_classes")]
    classes: Vec<Label>,
    tree: Tree,
}

impl DecisionTree {
    pub fn new(classes: Vec<Label>, tree: Tree) -> Self {
        Self { classes, tree }
    }
}

impl Classifier for DecisionTree {
    fn kind(&self) -> &'static str {
        "decision_tree"
    }

    fn predict(&self, batch: &[FeatureVector]) -> Result<Vec<Label>, ModelError> {
        batch
            .iter()
            .map(|x| {
                let leaf = self.tree.leaf_value(x)?;
                class_at(&self.classes, argmax(leaf))
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    #[serde(default = "default_classes")]
    classes: Vec<Label>,
    trees: Vec<Tree>,
}

impl RandomForest {
    pub fn new(classes: Vec<Label>, trees: Vec<Tree>) -> Self {
        Self { classes, trees }
    }

    fn validate(&self) -> Result<(), ModelError> {
        validate_classes(&self.classes)?;
        if self.trees.is_empty() {
            return Err(ModelError::Invalid("forest has no trees".into()));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.classes.len()).map_err(|e| match e {
                ModelError::Invalid(msg) => ModelError::Invalid(format!("tree {i}: {msg}")),
                other => other,
            })?;
        }
        Ok(())
    }

    fn predict_one(&self, x: &FeatureVector) -> Result<Label, ModelError> {
        let mut proba = vec![0.0; self.classes.len()];

        for tree in &self.trees {
            let leaf = tree.leaf_value(x)?;
            let total: f64 = leaf.iter().sum();
            for (acc, w) in proba.iter_mut().zip(leaf) {
                *acc += if total > 0.0 { w / total } else { 0.0 };
            }
        }

        class_at(&self.classes, argmax(&proba))
    }
}

impl Classifier for RandomForest {
    fn kind(&self) -> &'static str {
        "random_forest"
    }

    fn predict(&self, batch: &[FeatureVector]) -> Result<Vec<Label>, ModelError> {
        batch.iter().map(|x| self.predict_one(x)).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
