//! Message Type Graph
//!
//! Directed graph of message-typed field references, built on petgraph.
//! Strongly connected components identify recursive message groups, which
//! schema expansion has to cut.

use std::collections::{HashMap, HashSet};

use petgraph::algo::kosaraju_scc;
use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};

use super::{CoreDesc, FieldType, MessageId, Model};

/// Message reference graph; edges are labeled with the field name
#[derive(Debug)]
pub struct TypeGraph {
    graph: DiGraph<String, String>,
    nodes: HashMap<MessageId, NodeIndex>,
}

impl TypeGraph {
    pub fn build(model: &Model) -> Self {
        let mut graph = DiGraph::new();
        let mut nodes = HashMap::new();

        for (id, message) in model.messages() {
            let index = graph.add_node(model.absolute_name(message));
            nodes.insert(id, index);
        }

        for (id, message) in model.messages() {
            for field_id in &message.fields {
                let field = model.field(*field_id);
                if let Some(FieldType::Message(target)) = field.field_type {
                    graph.add_edge(nodes[&id], nodes[&target], field.name().to_string());
                }
            }
        }

        Self { graph, nodes }
    }

    pub fn message_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Groups of mutually recursive messages, including self-referencing ones.
    /// Names within a group and the groups themselves are sorted.
    pub fn recursive_groups(&self) -> Vec<Vec<String>> {
        let mut groups: Vec<Vec<String>> = kosaraju_scc(&self.graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || self.graph.contains_edge(scc[0], scc[0]))
            .map(|scc| {
                let mut names: Vec<String> = scc.iter().map(|n| self.graph[*n].clone()).collect();
                names.sort();
                names
            })
            .collect();
        groups.sort();
        groups
    }

    /// Messages that take part in a reference cycle
    pub fn recursive_messages(&self) -> HashSet<MessageId> {
        let cyclic: HashSet<NodeIndex> = kosaraju_scc(&self.graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || self.graph.contains_edge(scc[0], scc[0]))
            .flatten()
            .collect();
        self.nodes
            .iter()
            .filter(|(_, index)| cyclic.contains(*index))
            .map(|(id, _)| *id)
            .collect()
    }

    /// Render in GraphViz DOT format
    pub fn to_dot(&self) -> String {
        Dot::with_config(&self.graph, &[Config::EdgeNoLabel]).to_string()
    }
}
