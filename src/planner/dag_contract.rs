use super::Plan;
use anyhow::{Result, bail};
use std::collections::{BTreeMap, BTreeSet};

/// Dependency edge `from -> to`: `to` may only run after `from` completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DagEdge {
    pub from: String,
    pub to: String,
}

impl DagEdge {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// A dependency reference that names no step in the plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingDependency {
    pub step_id: String,
    pub missing: String,
}

/// Step dependency graph of a plan, used to diagnose plans the scheduler cannot finish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DagContract {
    pub nodes: Vec<String>,
    pub edges: Vec<DagEdge>,
    pub dangling: Vec<DanglingDependency>,
}

impl DagContract {
    pub fn from_plan(plan: &Plan) -> Self {
        let nodes: Vec<String> = plan.steps.iter().map(|s| s.id.clone()).collect();
        let known: BTreeSet<&str> = nodes.iter().map(String::as_str).collect();

        let mut edges = Vec::new();
        let mut dangling = Vec::new();
        for step in &plan.steps {
            for dep in &step.depends_on {
                if known.contains(dep.as_str()) {
                    edges.push(DagEdge::new(dep, &step.id));
                } else {
                    dangling.push(DanglingDependency {
                        step_id: step.id.clone(),
                        missing: dep.clone(),
                    });
                }
            }
        }

        Self {
            nodes,
            edges,
            dangling,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = BTreeSet::new();
        for id in &self.nodes {
            if id.trim().is_empty() {
                bail!("step id cannot be empty");
            }
            if !seen.insert(id.as_str()) {
                bail!("duplicate step id: {id}");
            }
        }

        if let Some(first) = self.dangling.first() {
            bail!(
                "step {} depends on unknown step {}",
                first.step_id,
                first.missing
            );
        }

        if let Some(path) = self.find_cycle() {
            bail!("cycle detected: {}", path.join(" -> "));
        }

        Ok(())
    }

    /// First dependency cycle found, as a closed path (`A -> B -> A`).
    ///
    /// Nodes are visited in lexical order so the reported path is stable.
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        let mut adjacency: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for id in &self.nodes {
            adjacency.entry(id.as_str()).or_default();
        }
        for edge in &self.edges {
            adjacency
                .entry(edge.from.as_str())
                .or_default()
                .push(edge.to.as_str());
        }
        for neighbors in adjacency.values_mut() {
            neighbors.sort_unstable();
            neighbors.dedup();
        }

        let mut states = BTreeMap::new();
        let mut stack = Vec::new();
        let roots: Vec<&str> = adjacency.keys().copied().collect();
        for root in roots {
            if states.contains_key(root) {
                continue;
            }
            if let Some(path) = visit(root, &adjacency, &mut states, &mut stack) {
                return Some(path);
            }
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    OnStack,
    Done,
}

fn visit<'a>(
    node: &'a str,
    adjacency: &BTreeMap<&'a str, Vec<&'a str>>,
    states: &mut BTreeMap<&'a str, VisitState>,
    stack: &mut Vec<&'a str>,
) -> Option<Vec<String>> {
    states.insert(node, VisitState::OnStack);
    stack.push(node);

    for &next in adjacency.get(node).map(Vec::as_slice).unwrap_or_default() {
        match states.get(next) {
            Some(VisitState::OnStack) => {
                let start = stack.iter().position(|entry| *entry == next).unwrap_or(0);
                let mut cycle: Vec<String> = stack[start..].iter().map(|s| (*s).to_string()).collect();
                cycle.push(next.to_string());
                return Some(cycle);
            }
            Some(VisitState::Done) => {}
            None => {
                if let Some(path) = visit(next, adjacency, states, stack) {
                    return Some(path);
                }
            }
        }
    }

    stack.pop();
    states.insert(node, VisitState::Done);
    None
}
