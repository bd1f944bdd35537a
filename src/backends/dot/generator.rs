use petgraph::{
    dot::{Config, Dot},
    graph::{DiGraph, NodeIndex},
};
use ahash::{AHashMap, AHashSet};
use std::{
    fs::File,
    io::Write,
    path::Path,
};

use crate::{
    atn::{Atn, AtnPrinter, StateId, TransitionKind},
    grammar::Grammar,
};

/// This is the main struct of the [`dot`](crate::backends::dot) backend.
pub struct DotGenerator {
    rule: Option<String>,
}

impl DotGenerator {
    /// Create a new DotGenerator that renders all states.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            rule: None,
        }
    }

    /// Only render the states reachable from the start state of rule `name`.
    pub fn rule<S: Into<String>>(mut self, name: S) -> Self {
        self.rule = Some(name.into());
        self
    }

    fn selected_states(&self, grammar: &Grammar, atn: &Atn) -> Option<AHashSet<StateId>> {
        let rule = grammar.rule(self.rule.as_ref()?)?;
        let start = atn.rule_to_start_state().get(rule.index())?;
        Some(atn.reachable_from(*start))
    }

    /// Build the graph of `atn`. Nodes are labeled like in [`AtnPrinter`] dumps.
    pub fn graph(&self, grammar: &Grammar, atn: &Atn) -> DiGraph<String, String> {
        let selected = self.selected_states(grammar, atn);
        let printer = AtnPrinter::new(grammar, atn, 0);
        let mut graph = DiGraph::new();
        let mut nodes: AHashMap<StateId, NodeIndex> = AHashMap::new();

        for (id, _) in atn.states() {
            if selected.as_ref().map(|s| s.contains(&id)).unwrap_or(true) {
                nodes.insert(id, graph.add_node(printer.state_string(id)));
            }
        }

        for (id, state) in atn.states() {
            let Some(src) = nodes.get(&id).copied() else {
                continue;
            };

            for transition in state.transitions() {
                let Some(dst) = nodes.get(&transition.target).copied() else {
                    continue;
                };

                let label = match &transition.kind {
                    TransitionKind::Epsilon => "ε".to_string(),
                    kind => printer.label_string(kind),
                };

                graph.add_edge(src, dst, label);
            }
        }

        graph
    }

    /// The graph of `atn` in Graphviz syntax.
    pub fn render(&self, grammar: &Grammar, atn: &Atn) -> String {
        let graph = self.graph(grammar, atn);
        format!("{}", Dot::with_config(&graph, &[Config::GraphContentOnly]))
            .lines()
            .fold(String::from("digraph ATN {\n    rankdir=LR;\n"), |mut buffer, line| {
                buffer.push_str(line);
                buffer.push('\n');
                buffer
            })
            + "}\n"
    }

    /// Write the graph of `atn` into the output file `path`.
    pub fn generate<P: AsRef<Path>>(self, path: P, grammar: &Grammar, atn: &Atn) -> std::io::Result<()> {
        let mut file = File::create(path)?;
        file.write_all(self.render(grammar, atn).as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        automata::create_atn,
        grammar::{Alternative, Element, Rule},
        tool::ErrorManager,
    };

    #[test]
    fn test_generator() {
        let grammar = Grammar::parser("P")
            .rule(Rule::new("a", vec![Alternative::new(vec![Element::token_ref("A"), Element::rule_ref("b")])]))
            .rule(Rule::new("b", vec![Alternative::new(vec![Element::token_ref("B")])]))
            .build()
            .unwrap();
        let mut errors = ErrorManager::new();
        let atn = create_atn(&grammar, &mut errors).unwrap();

        let graph = DotGenerator::new().graph(&grammar, &atn);
        assert_eq!(graph.node_count(), atn.num_states());
        assert_eq!(graph.edge_count(), atn.num_transitions());

        let only_b = DotGenerator::new().rule("b").graph(&grammar, &atn);
        assert!(only_b.node_count() < graph.node_count());

        let dot = DotGenerator::new().render(&grammar, &atn);
        assert!(dot.starts_with("digraph ATN {"));
        assert!(dot.contains("RuleStart_a_0"));
        assert!(dot.trim_end().ends_with('}'));
    }
}
