/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.
 * Copyright Nate Lust 2019*/

//! The dependency graph built while resolving one `setup` request. It
//! exists for cycle detection only -- the plan's actual action order
//! comes from the resolver's recursive walk (`visit`/`recurse_child` in
//! `resolver::mod`), which interleaves a parent's pre-`setupRequired`
//! actions, the child's whole subtree, and the parent's remaining
//! actions in table-file source order. A graph-level toposort can't
//! reproduce that interleaving -- it only knows product-level edges, not
//! where within one table file a `setupRequired` line falls -- so it is
//! never used to order the plan.
//!
//! Cycle detection is split from ordering on purpose: re-entering a
//! product that is still on the recursion stack (`visiting`) is a normal
//! short circuit that stops infinite recursion, not necessarily an error
//! -- only a cycle made up entirely of `setupRequired` edges is fatal.
//! That distinction is why `required_cycle` walks an `EdgeFiltered` view
//! instead of the whole graph.

use std::collections::HashMap;

use petgraph::algo::toposort;
use petgraph::visit::EdgeFiltered;
use petgraph::Graph;

use crate::error::EupsError;

pub struct DepGraph {
    graph: Graph<String, bool>,
    index: HashMap<String, petgraph::graph::NodeIndex>,
}

impl DepGraph {
    pub fn new() -> DepGraph {
        DepGraph {
            graph: Graph::new(),
            index: HashMap::new(),
        }
    }

    pub fn ensure_node(&mut self, product: &str) -> petgraph::graph::NodeIndex {
        if let Some(idx) = self.index.get(product) {
            return *idx;
        }
        let idx = self.graph.add_node(product.to_string());
        self.index.insert(product.to_string(), idx);
        idx
    }

    /// Adds a dependency -> dependent edge. `required` marks whether this
    /// particular edge came from `setupRequired` (as opposed to
    /// `setupOptional`); the same product pair is never added twice with
    /// conflicting directionality, so duplicate calls just add a parallel
    /// edge, which toposort tolerates fine.
    pub fn add_edge(&mut self, dependency: &str, dependent: &str, required: bool) {
        let dep_idx = self.ensure_node(dependency);
        let dependent_idx = self.ensure_node(dependent);
        self.graph.add_edge(dep_idx, dependent_idx, required);
    }

    /// Runs toposort restricted to edges that came from `setupRequired`.
    /// An error here is the real §7 `CYCLE` condition; a cycle made up
    /// purely of `setupOptional` edges does not trigger this.
    pub fn required_cycle(&self) -> Option<String> {
        let filtered = EdgeFiltered::from_fn(&self.graph, |edge| *edge.weight());
        match toposort(&filtered, None) {
            Ok(_) => None,
            Err(cycle) => Some(self.graph[cycle.node_id()].clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_cycle_detected() {
        let mut g = DepGraph::new();
        g.add_edge("a", "b", true);
        g.add_edge("b", "a", true);
        assert!(g.required_cycle().is_some());
    }

    #[test]
    fn optional_cycle_not_flagged_as_required_cycle() {
        let mut g = DepGraph::new();
        g.add_edge("a", "b", false);
        g.add_edge("b", "a", false);
        assert!(g.required_cycle().is_none());
    }
}
