//! Read-only view of the logic system a worksheet is checked against.
//!
//! The worksheet never owns the database; it only asks whether labels exist and what a known
//! theorem's hypotheses look like.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A logical hypothesis of a theorem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HypothesisInfo {
    /// Hypothesis label, e.g. `syl.1`.
    pub label: String,
    /// Formula text, e.g. `|- ( ph -> ps )`.
    pub formula: String,
}

/// What a worksheet needs to know about an existing theorem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TheoremInfo {
    /// Theorem label.
    pub label: String,
    /// Logical (essential) hypotheses, in database order.
    #[serde(default)]
    pub hypotheses: Vec<HypothesisInfo>,
    /// Conclusion formula text.
    pub conclusion: String,
    /// Mandatory hypothesis labels (floating and essential) in frame order; compressed proofs
    /// number these implicitly.
    #[serde(default)]
    pub mandatory_frame: Vec<String>,
}

impl TheoremInfo {
    /// Number of logical hypotheses.
    pub fn logical_hyp_count(&self) -> usize {
        self.hypotheses.len()
    }
}

/// Lookup interface onto the loaded database.
pub trait LogicSystem {
    /// Find an existing theorem by label.
    fn theorem(&self, label: &str) -> Option<&TheoremInfo>;

    /// Returns `true` if `label` names any statement in the database.
    fn has_label(&self, label: &str) -> bool {
        self.theorem(label).is_some()
    }
}

/// In-memory [`LogicSystem`], typically deserialized from YAML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TheoremTable {
    #[serde(default)]
    theorems: Vec<TheoremInfo>,
    /// Labels of other statements (axioms, definitions) that may be named but are not theorems
    /// we know the frame of.
    #[serde(default)]
    labels: Vec<String>,
    #[serde(skip)]
    by_label: HashMap<String, usize>,
    #[serde(skip)]
    label_set: HashSet<String>,
}

impl TheoremTable {
    /// Create an empty table; every theorem is new.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a table from YAML (`theorems:` and `labels:` lists).
    pub fn from_yaml_str(yaml: &str) -> Result<Self, serde_yaml::Error> {
        let mut table: Self = serde_yaml::from_str(yaml)?;
        table.reindex();
        Ok(table)
    }

    /// Add or replace a theorem.
    pub fn insert(&mut self, theorem: TheoremInfo) {
        match self.by_label.get(&theorem.label) {
            Some(&index) => self.theorems[index] = theorem,
            None => {
                self.by_label
                    .insert(theorem.label.clone(), self.theorems.len());
                self.theorems.push(theorem);
            }
        }
    }

    /// Add a non-theorem label.
    pub fn insert_label(&mut self, label: impl Into<String>) {
        let label = label.into();
        if self.label_set.insert(label.clone()) {
            self.labels.push(label);
        }
    }

    /// Number of known theorems.
    pub fn len(&self) -> usize {
        self.theorems.len()
    }

    /// Returns `true` if no theorems are known.
    pub fn is_empty(&self) -> bool {
        self.theorems.is_empty()
    }

    fn reindex(&mut self) {
        self.by_label = self
            .theorems
            .iter()
            .enumerate()
            .map(|(i, t)| (t.label.clone(), i))
            .collect();
        self.label_set = self.labels.iter().cloned().collect();
    }
}

impl LogicSystem for TheoremTable {
    fn theorem(&self, label: &str) -> Option<&TheoremInfo> {
        self.by_label.get(label).map(|&i| &self.theorems[i])
    }

    fn has_label(&self, label: &str) -> bool {
        self.by_label.contains_key(label) || self.label_set.contains(label)
    }
}
