//! Foreign-key dependency graph over the tables of a merge job, and its load order
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeMap, BTreeSet};

use crate::catalog::TableDescriptor;
use crate::error::{MergeError, MergeResult};

/// Nodes are table names. `depends_on[a]` holds every table `a` references
/// through a foreign key and which must therefore be loaded first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    depends_on: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_table(&mut self, table: &str) {
        self.depends_on.entry(table.to_string()).or_default();
    }

    /// Record that `table` must come after `referenced`.
    /// Self-references and tables outside the graph are ignored.
    pub fn add_dependency(&mut self, table: &str, referenced: &str) {
        if table == referenced || !self.depends_on.contains_key(referenced) {
            return;
        }
        if let Some(deps) = self.depends_on.get_mut(table) {
            deps.insert(referenced.to_string());
        }
    }

    /// Build the graph for a universe of table descriptors, possibly several per name
    /// (one per source schema). Edges from every version of a table are combined.
    ///
    /// Foreign keys into another schema, into a table outside the universe, or back
    /// into the same table do not constrain the order.
    pub fn from_tables<'a, I>(tables: I) -> Self
    where
        I: IntoIterator<Item = &'a TableDescriptor>,
        I::IntoIter: Clone,
    {
        let tables = tables.into_iter();
        let mut graph = Self::new();
        for table in tables.clone() {
            graph.add_table(&table.name);
        }
        for table in tables {
            for fk in &table.foreign_keys {
                if fk.referenced_schema == table.schema
                    && !fk.is_self_reference(&table.schema, &table.name)
                {
                    graph.add_dependency(&table.name, &fk.referenced_table);
                }
            }
        }
        graph
    }

    pub fn len(&self) -> usize {
        self.depends_on.len()
    }

    pub fn is_empty(&self) -> bool {
        self.depends_on.is_empty()
    }

    pub fn dependencies_of(&self, table: &str) -> Option<&BTreeSet<String>> {
        self.depends_on.get(table)
    }

    /// Kahn's algorithm with ties broken by table name, so identical graphs always
    /// produce identical orders.
    pub fn topological_order(&self) -> MergeResult<Vec<String>> {
        let mut in_degree: BTreeMap<&str, usize> = BTreeMap::new();
        let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();

        for (table, deps) in &self.depends_on {
            in_degree.insert(table.as_str(), deps.len());
            for dep in deps {
                dependents.entry(dep.as_str()).or_default().push(table.as_str());
            }
        }

        // Start with tables that reference nothing
        let mut ready: BTreeSet<&str> = in_degree
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(table, _)| *table)
            .collect();

        let mut ordered = Vec::with_capacity(self.depends_on.len());
        while let Some(current) = ready.pop_first() {
            ordered.push(current.to_string());

            for dependent in dependents.get(current).into_iter().flatten() {
                if let Some(count) = in_degree.get_mut(dependent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(*dependent);
                    }
                }
            }
        }

        if ordered.len() != self.depends_on.len() {
            let placed: BTreeSet<&str> = ordered.iter().map(|s| s.as_str()).collect();
            let tables: Vec<String> = self
                .depends_on
                .keys()
                .filter(|t| !placed.contains(t.as_str()))
                .cloned()
                .collect();
            let cycles = self.cycles_among(&tables);
            return Err(MergeError::CircularDependency { tables, cycles });
        }

        Ok(ordered)
    }

    /// Strongly connected components (size > 1) of the subgraph induced by `tables`
    fn cycles_among(&self, tables: &[String]) -> Vec<Vec<String>> {
        let mut graph: DiGraph<&str, ()> = DiGraph::new();
        let nodes: BTreeMap<&str, NodeIndex> = tables
            .iter()
            .map(|t| (t.as_str(), graph.add_node(t.as_str())))
            .collect();

        for (table, from) in &nodes {
            for dep in self.depends_on.get(*table).into_iter().flatten() {
                if let Some(to) = nodes.get(dep.as_str()) {
                    graph.add_edge(*from, *to, ());
                }
            }
        }

        let mut cycles: Vec<Vec<String>> = tarjan_scc(&graph)
            .into_iter()
            .filter(|component| component.len() > 1)
            .map(|component| {
                let mut names: Vec<String> =
                    component.iter().map(|idx| graph[*idx].to_string()).collect();
                names.sort();
                names
            })
            .collect();
        cycles.sort();
        cycles
    }
}

/// Load order for a set of tables keyed by name.
///
/// Fails with [`MergeError::CircularDependency`] naming every table that could not be placed.
pub fn build_order(tables_by_name: &BTreeMap<String, TableDescriptor>) -> MergeResult<Vec<String>> {
    DependencyGraph::from_tables(tables_by_name.values()).topological_order()
}
