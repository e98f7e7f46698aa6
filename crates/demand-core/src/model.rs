//! Trained model families that can sit behind the inference service.
//!
//! Every family implements [`DemandModel`]. Models are immutable once
//! constructed and are shared between requests behind an `Arc`.

use anyhow::{anyhow, bail, ensure, Result};
use serde::{Deserialize, Serialize};

use crate::features::FEATURE_COUNT;

/// A trained regression model over the ten-feature row.
pub trait DemandModel: Send + Sync + std::fmt::Debug {
    /// Short name of the model family, e.g. `random_forest`.
    fn family(&self) -> &str;

    /// Predict demand (MW) for a single row in feature order.
    fn predict(&self, row: &[f64; FEATURE_COUNT]) -> Result<f64>;

    /// One importance score per feature, in feature order.
    ///
    /// `None` when the family has no notion of importances.
    fn feature_importances(&self) -> Option<&[f64]> {
        None
    }
}

/// One node of a regression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeNode {
    /// Rows with `row[feature] <= threshold` continue at `left`, others at `right`.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf { value: f64 },
}

/// A regression tree stored as a flat node array rooted at index 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    pub nodes: Vec<TreeNode>,
}

impl RegressionTree {
    /// Check that the tree is non-empty, acyclic and only references
    /// existing nodes and features.
    ///
    /// Children must come after their parent, which rules out cycles.
    pub fn check(&self) -> Result<()> {
        ensure!(!self.nodes.is_empty(), "tree has no nodes");
        for (idx, node) in self.nodes.iter().enumerate() {
            match *node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    ensure!(
                        feature < FEATURE_COUNT,
                        "node {idx} splits on feature {feature}, model has {FEATURE_COUNT}"
                    );
                    ensure!(
                        threshold.is_finite(),
                        "node {idx} has non-finite threshold"
                    );
                    for child in [left, right] {
                        ensure!(
                            child > idx && child < self.nodes.len(),
                            "node {idx} points at invalid child {child}"
                        );
                    }
                }
                TreeNode::Leaf { value } => {
                    ensure!(value.is_finite(), "leaf {idx} has non-finite value");
                }
            }
        }
        Ok(())
    }

    /// Walk the tree for one row.
    pub fn evaluate(&self, row: &[f64; FEATURE_COUNT]) -> Result<f64> {
        let mut idx = 0;
        // A well-formed tree visits each node at most once.
        for _ in 0..self.nodes.len() {
            match self.nodes.get(idx) {
                Some(TreeNode::Leaf { value }) => return Ok(*value),
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let x = row
                        .get(*feature)
                        .ok_or_else(|| anyhow!("split references feature {feature}"))?;
                    idx = if *x <= *threshold { *left } else { *right };
                }
                None => bail!("node index {idx} out of range"),
            }
        }
        bail!("tree traversal did not reach a leaf")
    }
}

/// Mean of an ensemble of regression trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub trees: Vec<RegressionTree>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_importances: Option<Vec<f64>>,
}

impl RandomForest {
    pub fn check(&self) -> Result<()> {
        ensure!(!self.trees.is_empty(), "forest has no trees");
        for (i, tree) in self.trees.iter().enumerate() {
            tree.check().map_err(|e| anyhow!("tree {i}: {e}"))?;
        }
        Ok(())
    }
}

impl DemandModel for RandomForest {
    fn family(&self) -> &str {
        "random_forest"
    }

    fn predict(&self, row: &[f64; FEATURE_COUNT]) -> Result<f64> {
        if let Some(pos) = row.iter().position(|x| !x.is_finite()) {
            bail!("input {pos} is not a finite number");
        }
        ensure!(!self.trees.is_empty(), "forest has no trees");
        let mut total = 0.0;
        for (i, tree) in self.trees.iter().enumerate() {
            total += tree.evaluate(row).map_err(|e| anyhow!("tree {i}: {e}"))?;
        }
        Ok(total / self.trees.len() as f64)
    }

    fn feature_importances(&self) -> Option<&[f64]> {
        self.feature_importances.as_deref()
    }
}

/// `intercept + sum(coefficients[i] * row[i])`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl LinearModel {
    pub fn check(&self) -> Result<()> {
        ensure!(
            self.coefficients.len() == FEATURE_COUNT,
            "expected {FEATURE_COUNT} coefficients, found {}",
            self.coefficients.len()
        );
        ensure!(
            self.intercept.is_finite() && self.coefficients.iter().all(|c| c.is_finite()),
            "coefficients must be finite"
        );
        Ok(())
    }
}

impl DemandModel for LinearModel {
    fn family(&self) -> &str {
        "linear"
    }

    fn predict(&self, row: &[f64; FEATURE_COUNT]) -> Result<f64> {
        ensure!(
            self.coefficients.len() == FEATURE_COUNT,
            "feature count mismatch: expected {}, got {}",
            self.coefficients.len(),
            FEATURE_COUNT
        );
        let value = self
            .coefficients
            .iter()
            .zip(row.iter())
            .map(|(c, x)| c * x)
            .sum::<f64>()
            + self.intercept;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROW: [f64; FEATURE_COUNT] = [
        2025.0, 2.0, 6.0, 2.0, 0.0, 12.0, 35000.0, 36000.0, 35500.0, 500.0,
    ];

    fn stump(feature: usize, threshold: f64, low: f64, high: f64) -> RegressionTree {
        RegressionTree {
            nodes: vec![
                TreeNode::Split {
                    feature,
                    threshold,
                    left: 1,
                    right: 2,
                },
                TreeNode::Leaf { value: low },
                TreeNode::Leaf { value: high },
            ],
        }
    }

    #[test]
    fn test_tree_goes_left_on_equal() {
        let tree = stump(5, 12.0, 1.0, 2.0);
        assert_eq!(tree.evaluate(&ROW).unwrap(), 1.0);
        let tree = stump(5, 11.0, 1.0, 2.0);
        assert_eq!(tree.evaluate(&ROW).unwrap(), 2.0);
    }

    #[test]
    fn test_forest_averages_trees() {
        let forest = RandomForest {
            trees: vec![stump(6, 40000.0, 30000.0, 0.0), stump(0, 2000.0, 0.0, 50000.0)],
            feature_importances: None,
        };
        assert_eq!(forest.predict(&ROW).unwrap(), 40000.0);
        assert!(forest.feature_importances().is_none());
    }

    #[test]
    fn test_forest_rejects_non_finite_input() {
        let forest = RandomForest {
            trees: vec![stump(0, 0.0, 1.0, 2.0)],
            feature_importances: None,
        };
        let mut row = ROW;
        row[7] = f64::INFINITY;
        let err = forest.predict(&row).unwrap_err();
        assert!(err.to_string().contains("input 7"));
    }

    #[test]
    fn test_check_rejects_backward_child() {
        let tree = RegressionTree {
            nodes: vec![
                TreeNode::Leaf { value: 1.0 },
                TreeNode::Split {
                    feature: 0,
                    threshold: 1.0,
                    left: 0,
                    right: 0,
                },
            ],
        };
        assert!(tree.check().is_err());
    }

    #[test]
    fn test_check_rejects_unknown_feature() {
        assert!(stump(FEATURE_COUNT, 1.0, 0.0, 0.0).check().is_err());
        assert!(stump(3, 1.0, 0.0, 0.0).check().is_ok());
    }

    #[test]
    fn test_unchecked_tree_fails_instead_of_looping() {
        let tree = RegressionTree {
            nodes: vec![TreeNode::Split {
                feature: 0,
                threshold: 1.0,
                left: 0,
                right: 0,
            }],
        };
        assert!(tree.evaluate(&ROW).is_err());
    }

    #[test]
    fn test_linear_model() {
        let mut coefficients = vec![0.0; FEATURE_COUNT];
        coefficients[6] = 1.0;
        let model = LinearModel {
            intercept: 100.0,
            coefficients,
        };
        assert!(model.check().is_ok());
        assert_eq!(model.predict(&ROW).unwrap(), 35100.0);
        assert!(model.feature_importances().is_none());
    }

    #[test]
    fn test_node_json_shape() {
        let node: TreeNode = serde_json::from_str(
            r#"{"split":{"feature":2,"threshold":6.5,"left":1,"right":2}}"#,
        )
        .unwrap();
        assert!(matches!(node, TreeNode::Split { feature: 2, .. }));
        let leaf: TreeNode = serde_json::from_str(r#"{"leaf":{"value":3.0}}"#).unwrap();
        assert_eq!(leaf, TreeNode::Leaf { value: 3.0 });
    }
}
