//! Recipe graph construction and dependency resolution
//!
//! Uses petgraph to build a DAG of recipes. Execution order is a depth-first
//! walk that honours the declared order of `depends`, so an aggregate recipe
//! runs its steps exactly as listed.

use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeMap, HashSet};

use crate::config::{Config, Recipe};
use crate::error::{ChoreError, Result};

/// A node in the recipe graph
#[derive(Debug, Clone)]
pub struct RecipeNode {
    pub name: String,
    pub recipe: Recipe,
}

/// The recipe dependency graph
#[derive(Debug)]
pub struct RecipeGraph {
    graph: DiGraph<RecipeNode, ()>,
    name_to_index: BTreeMap<String, NodeIndex>,
}

impl RecipeGraph {
    /// Build a recipe graph from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut graph = DiGraph::new();
        let mut name_to_index = BTreeMap::new();

        for (name, recipe) in &config.recipes {
            let idx = graph.add_node(RecipeNode {
                name: name.clone(),
                recipe: recipe.clone(),
            });
            name_to_index.insert(name.clone(), idx);
        }

        // Edge goes from dependency TO dependent (dep must run first)
        for (name, recipe) in &config.recipes {
            let recipe_idx = name_to_index[name];

            for dep in &recipe.depends {
                let dep_idx = name_to_index
                    .get(dep)
                    .ok_or_else(|| not_found(dep, name_to_index.keys()))?;
                graph.update_edge(*dep_idx, recipe_idx, ());
            }
        }

        if is_cyclic_directed(&graph) {
            let cycle = Self::find_cycle_description(&graph, &name_to_index);
            return Err(ChoreError::CyclicDependency { cycle });
        }

        Ok(Self {
            graph,
            name_to_index,
        })
    }

    /// Get the run order for the requested recipes, dependencies included.
    ///
    /// Each recipe appears once; the first request that reaches it decides
    /// its position.
    pub fn execution_order<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<&RecipeNode>> {
        let mut order = Vec::new();
        let mut seen = HashSet::new();

        for name in names {
            let idx = self.index_of(name.as_ref())?;
            self.visit(idx, &mut seen, &mut order);
        }

        Ok(order.into_iter().map(|idx| &self.graph[idx]).collect())
    }

    fn visit(&self, idx: NodeIndex, seen: &mut HashSet<NodeIndex>, order: &mut Vec<NodeIndex>) {
        if !seen.insert(idx) {
            return;
        }

        // Edges were validated in from_config, so every dependency resolves
        for dep in &self.graph[idx].recipe.depends {
            if let Some(&dep_idx) = self.name_to_index.get(dep) {
                self.visit(dep_idx, seen, order);
            }
        }

        order.push(idx);
    }

    fn index_of(&self, name: &str) -> Result<NodeIndex> {
        self.name_to_index
            .get(name)
            .copied()
            .ok_or_else(|| not_found(name, self.name_to_index.keys()))
    }

    /// Find a human-readable description of a cycle
    fn find_cycle_description(
        graph: &DiGraph<RecipeNode, ()>,
        name_to_index: &BTreeMap<String, NodeIndex>,
    ) -> String {
        for (name, &idx) in name_to_index {
            let mut visited = HashSet::new();
            let mut path = vec![name.clone()];

            if Self::dfs_find_cycle(graph, idx, idx, &mut visited, &mut path) {
                return path.join(" -> ");
            }
        }

        "unknown cycle".to_string()
    }

    fn dfs_find_cycle(
        graph: &DiGraph<RecipeNode, ()>,
        current: NodeIndex,
        target: NodeIndex,
        visited: &mut HashSet<NodeIndex>,
        path: &mut Vec<String>,
    ) -> bool {
        for neighbor in graph.neighbors(current) {
            if neighbor == target {
                path.push(graph[target].name.clone());
                return true;
            }

            if visited.insert(neighbor) {
                path.push(graph[neighbor].name.clone());
                if Self::dfs_find_cycle(graph, neighbor, target, visited, path) {
                    return true;
                }
                path.pop();
            }
        }

        false
    }

    /// Check if a recipe exists
    pub fn has_recipe(&self, name: &str) -> bool {
        self.name_to_index.contains_key(name)
    }

    /// Get a recipe by name
    pub fn get_recipe(&self, name: &str) -> Option<&RecipeNode> {
        self.name_to_index.get(name).map(|&idx| &self.graph[idx])
    }

    /// All recipe names, sorted
    pub fn recipe_names(&self) -> impl Iterator<Item = &str> {
        self.name_to_index.keys().map(|s| s.as_str())
    }

    /// Direct dependencies of a recipe, in declared order
    pub fn dependencies(&self, name: &str) -> Option<Vec<&str>> {
        self.get_recipe(name)
            .map(|node| node.recipe.depends.iter().map(|s| s.as_str()).collect())
    }
}

fn not_found<'a>(name: &str, available: impl Iterator<Item = &'a String>) -> ChoreError {
    let available: Vec<String> = available.cloned().collect();
    let suggestion = suggest(name, &available)
        .map(|close| format!("Did you mean `{}`?", close))
        .or_else(|| {
            (!available.is_empty())
                .then(|| format!("Available recipes: {}", available.join(", ")))
        });

    ChoreError::RecipeNotFound {
        name: name.to_string(),
        available,
        suggestion,
    }
}

/// Pick a recipe name that looks like a typo or abbreviation of `name`
fn suggest<'a>(name: &str, available: &'a [String]) -> Option<&'a str> {
    let lower = name.to_lowercase();
    if lower.is_empty() {
        return None;
    }

    available
        .iter()
        .map(|s| s.as_str())
        .find(|candidate| {
            let candidate = candidate.to_lowercase();
            candidate == lower || candidate.starts_with(&lower) || lower.starts_with(&candidate)
        })
}
