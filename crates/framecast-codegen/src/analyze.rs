//! Structural analysis stage

use std::collections::BTreeMap;

use framecast_core::NodeKind;

use crate::stage::{Stage, StageFailure};
use crate::state::{AnalysisSummary, GenerationState, StateField, StateUpdate};

/// Summarizes the design tree before emission
pub struct AnalyzeDesign;

impl AnalyzeDesign {
    /// Stage name
    pub const NAME: &'static str = "analyze";
}

impl Stage for AnalyzeDesign {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn produces(&self) -> &[StateField] {
        &[StateField::Analysis]
    }

    fn run(&self, state: &GenerationState) -> Result<StateUpdate, StageFailure> {
        let tree = state.tree();

        let mut kind_counts: BTreeMap<String, usize> = BTreeMap::new();
        for node in tree.iter() {
            *kind_counts.entry(node.kind.to_string()).or_default() += 1;
        }

        let summary = AnalysisSummary {
            root_name: tree.root().name.clone(),
            node_count: tree.node_count(),
            depth: tree.depth(),
            text_nodes: tree.iter().filter(|n| n.kind == NodeKind::Text).count(),
            kind_counts,
            components: tree.component_names().into_iter().collect(),
            style_variables: tree.style_variables().into_iter().collect(),
        };

        tracing::debug!(
            nodes = summary.node_count,
            depth = summary.depth,
            components = summary.components.len(),
            "Analyzed design"
        );
        Ok(StateUpdate::new().with_analysis(summary))
    }
}
