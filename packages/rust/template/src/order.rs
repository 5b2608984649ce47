//! Document-order index shared by the classifier and the discoverer.

use std::collections::HashMap;

use letterpress_dom::{Dom, NodeId};

/// Pre-order position of every element.
///
/// Locked section roots and editable elements are distinct nodes, so their
/// positions never collide and sort into one interleaved sequence.
pub(crate) struct DocumentOrder {
    positions: HashMap<NodeId, usize>,
}

impl DocumentOrder {
    pub(crate) fn new(dom: &Dom) -> Self {
        let positions = dom
            .elements()
            .into_iter()
            .enumerate()
            .map(|(position, id)| (id, position))
            .collect();
        Self { positions }
    }

    pub(crate) fn position(&self, id: NodeId) -> usize {
        self.positions.get(&id).copied().unwrap_or(usize::MAX)
    }
}
