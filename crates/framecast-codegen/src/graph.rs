//! Stage graph definition, validation and execution
//!
//! A graph is declared with [`GraphBuilder`]: stage nodes, at most one
//! platform router, sequential edges, and the router's per-platform
//! branches. [`GraphBuilder::compile`] checks the declaration and produces an
//! index-based [`StageGraph`]:
//!
//! ```text
//! START ──▶ analyze ──▶ route_platform ─┬─ web ────▶ emit_web ────┬──▶ validate ──▶ END
//!                                       └─ mobile ─▶ emit_mobile ─┘
//! ```
//!
//! Compilation rejects duplicate names, dangling edges, stages without
//! exactly one successor, cycles, unreachable nodes, and stages whose
//! required inputs are not produced on every path leading to them.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Write;
use std::sync::Arc;

use crate::aggregate::{ErrorAggregator, Invocation};
use crate::error::{Error, Result, RoutingError};
use crate::stage::Stage;
use crate::state::{ErrorKind, ErrorRecord, GenerationState, StateField, TargetPlatform};

/// Name of the virtual entry node
pub const START: &str = "__start__";

/// Name of the virtual exit node
pub const END: &str = "__end__";

enum Declared {
    Stage(Arc<dyn Stage>),
    Router,
}

/// Declarative graph definition
pub struct GraphBuilder {
    name: String,
    nodes: Vec<(String, Declared)>,
    edges: Vec<(String, String)>,
    routes: Vec<(String, TargetPlatform, String)>,
}

impl GraphBuilder {
    /// Start a new graph definition
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            edges: Vec::new(),
            routes: Vec::new(),
        }
    }

    /// Add a stage node, named by [`Stage::name`]
    pub fn stage(self, stage: impl Stage + 'static) -> Self {
        self.shared_stage(Arc::new(stage))
    }

    /// Add a stage node that is shared with other graphs
    pub fn shared_stage(mut self, stage: Arc<dyn Stage>) -> Self {
        self.nodes.push((stage.name().to_string(), Declared::Stage(stage)));
        self
    }

    /// Add the platform router node
    pub fn router(mut self, name: impl Into<String>) -> Self {
        self.nodes.push((name.into(), Declared::Router));
        self
    }

    /// Add a sequential edge; use [`START`] and [`END`] for the virtual nodes
    pub fn edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.edges.push((from.into(), to.into()));
        self
    }

    /// Add a router branch taken for `platform`
    pub fn route(
        mut self,
        router: impl Into<String>,
        platform: TargetPlatform,
        to: impl Into<String>,
    ) -> Self {
        self.routes.push((router.into(), platform, to.into()));
        self
    }

    fn invalid(&self, message: impl Into<String>) -> Error {
        Error::InvalidGraph {
            graph: self.name.clone(),
            message: message.into(),
        }
    }

    /// Validate the definition and build the executable graph
    pub fn compile(self) -> Result<StageGraph> {
        let mut index: HashMap<&str, usize> = HashMap::new();
        for (i, (name, _)) in self.nodes.iter().enumerate() {
            if name == START || name == END {
                return Err(self.invalid(format!("'{}' is a reserved node name", name)));
            }
            if index.insert(name.as_str(), i).is_some() {
                return Err(self.invalid(format!("duplicate node '{}'", name)));
            }
        }

        let routers = self
            .nodes
            .iter()
            .filter(|(_, node)| matches!(node, Declared::Router))
            .count();
        if routers > 1 {
            return Err(self.invalid("at most one router is supported"));
        }

        let resolve = |name: &str| -> Result<Target> {
            if name == END {
                Ok(Target::End)
            } else {
                index
                    .get(name)
                    .map(|i| Target::Node(*i))
                    .ok_or_else(|| self.invalid(format!("edge to unknown node '{}'", name)))
            }
        };

        let mut entry = None;
        let mut next: Vec<Vec<Target>> = vec![Vec::new(); self.nodes.len()];
        for (from, to) in &self.edges {
            let target = resolve(to)?;
            if from == START {
                if entry.replace(target).is_some() {
                    return Err(self.invalid("START has more than one edge"));
                }
                continue;
            }
            let source = *index
                .get(from.as_str())
                .ok_or_else(|| self.invalid(format!("edge from unknown node '{}'", from)))?;
            next[source].push(target);
        }
        let entry = match entry {
            Some(Target::Node(i)) => i,
            Some(Target::End) => return Err(self.invalid("START leads directly to END")),
            None => return Err(self.invalid("no edge from START")),
        };

        let mut branches: Vec<BTreeMap<TargetPlatform, Target>> =
            vec![BTreeMap::new(); self.nodes.len()];
        for (router, platform, to) in &self.routes {
            let source = *index
                .get(router.as_str())
                .ok_or_else(|| self.invalid(format!("route from unknown node '{}'", router)))?;
            if !matches!(self.nodes[source].1, Declared::Router) {
                return Err(self.invalid(format!("'{}' is not a router", router)));
            }
            let target = match resolve(to)? {
                Target::End => {
                    return Err(self.invalid(format!("route '{}' leads directly to END", platform)));
                }
                target => target,
            };
            if branches[source].insert(*platform, target).is_some() {
                return Err(self.invalid(format!(
                    "router '{}' has two branches for '{}'",
                    router, platform
                )));
            }
        }

        let mut steps = Vec::with_capacity(self.nodes.len());
        for (i, (name, node)) in self.nodes.iter().enumerate() {
            let step = match node {
                Declared::Stage(stage) => match next[i].as_slice() {
                    [target] => Step::Stage {
                        stage: Arc::clone(stage),
                        next: target.node(),
                    },
                    [] => return Err(self.invalid(format!("stage '{}' has no outgoing edge", name))),
                    _ => {
                        return Err(self.invalid(format!(
                            "stage '{}' has more than one outgoing edge",
                            name
                        )));
                    }
                },
                Declared::Router => {
                    if !next[i].is_empty() {
                        return Err(self.invalid(format!(
                            "router '{}' takes routes, not edges",
                            name
                        )));
                    }
                    if branches[i].is_empty() {
                        return Err(self.invalid(format!("router '{}' has no routes", name)));
                    }
                    Step::Router {
                        name: name.clone(),
                        branches: branches[i]
                            .iter()
                            .filter_map(|(platform, target)| Some((*platform, target.node()?)))
                            .collect(),
                    }
                }
            };
            steps.push(step);
        }

        let graph = StageGraph {
            name: self.name.clone(),
            entry,
            steps,
        };
        graph.check_acyclic().map_err(|m| self.invalid(m))?;
        graph.check_reachable().map_err(|m| self.invalid(m))?;
        graph.check_requirements().map_err(|m| self.invalid(m))?;
        Ok(graph)
    }
}

#[derive(Debug, Clone, Copy)]
enum Target {
    Node(usize),
    End,
}

impl Target {
    fn node(&self) -> Option<usize> {
        match self {
            Self::Node(i) => Some(*i),
            Self::End => None,
        }
    }
}

enum Step {
    Stage {
        stage: Arc<dyn Stage>,
        next: Option<usize>,
    },
    Router {
        name: String,
        branches: BTreeMap<TargetPlatform, usize>,
    },
}

impl Step {
    fn name(&self) -> &str {
        match self {
            Self::Stage { stage, .. } => stage.name(),
            Self::Router { name, .. } => name,
        }
    }

    fn successors(&self) -> Vec<usize> {
        match self {
            Self::Stage { next, .. } => next.iter().copied().collect(),
            Self::Router { branches, .. } => branches.values().copied().collect(),
        }
    }
}

/// Outcome of executing a graph
#[derive(Debug)]
pub struct GraphRun {
    /// Final state
    pub state: GenerationState,
    /// Whether a fatal error stopped the run early
    pub aborted: bool,
}

/// A compiled, validated stage graph
pub struct StageGraph {
    name: String,
    entry: usize,
    steps: Vec<Step>,
}

impl StageGraph {
    /// Graph name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Names of every node, in declaration order
    pub fn node_names(&self) -> Vec<&str> {
        self.steps.iter().map(Step::name).collect()
    }

    /// Platforms the router has branches for
    pub fn platforms(&self) -> Vec<TargetPlatform> {
        self.steps
            .iter()
            .find_map(|step| match step {
                Step::Router { branches, .. } => Some(branches.keys().copied().collect()),
                Step::Stage { .. } => None,
            })
            .unwrap_or_default()
    }

    fn has_router(&self) -> bool {
        self.steps.iter().any(|s| matches!(s, Step::Router { .. }))
    }

    /// Resolve the route for a state's requested platform. `None` when the
    /// graph has no router.
    pub fn resolve_route(
        &self,
        state: &GenerationState,
    ) -> std::result::Result<Option<TargetPlatform>, RoutingError> {
        if !self.has_router() {
            return Ok(None);
        }
        let platform: TargetPlatform = state.target_platform().parse()?;
        if self.platforms().contains(&platform) {
            Ok(Some(platform))
        } else {
            Err(RoutingError::new(state.target_platform()))
        }
    }

    /// Stage names visited for a route, in execution order
    pub fn path_for(&self, route: Option<TargetPlatform>) -> Vec<&str> {
        let mut path = Vec::new();
        let mut cursor = Some(self.entry);
        while let Some(i) = cursor {
            cursor = match &self.steps[i] {
                Step::Stage { stage, next } => {
                    path.push(stage.name());
                    *next
                }
                Step::Router { branches, .. } => route.and_then(|p| branches.get(&p).copied()),
            };
        }
        path
    }

    /// Execute the graph from START for a resolved route
    pub fn run(
        &self,
        state: GenerationState,
        route: Option<TargetPlatform>,
        aggregator: &ErrorAggregator,
    ) -> GraphRun {
        let mut state = state;
        let mut cursor = Some(self.entry);
        while let Some(i) = cursor {
            match &self.steps[i] {
                Step::Stage { stage, next } => match aggregator.invoke(stage.as_ref(), state) {
                    Invocation::Continue(updated) => {
                        state = updated;
                        cursor = *next;
                    }
                    Invocation::Abort(updated) => {
                        return GraphRun {
                            state: updated,
                            aborted: true,
                        };
                    }
                },
                Step::Router { name, branches } => {
                    match route.and_then(|p| branches.get(&p).copied()) {
                        Some(target) => {
                            tracing::debug!(router = %name, route = ?route, "Routing");
                            cursor = Some(target);
                        }
                        None => {
                            let record = ErrorRecord::fatal(
                                name.as_str(),
                                ErrorKind::Routing,
                                format!("no branch for '{}'", state.target_platform()),
                            );
                            return GraphRun {
                                state: state.record_error(record),
                                aborted: true,
                            };
                        }
                    }
                }
            }
        }
        GraphRun {
            state,
            aborted: false,
        }
    }

    /// Render the graph as a Mermaid flowchart
    pub fn to_mermaid(&self) -> String {
        let mut out = String::from("flowchart TD\n");
        let id = |i: usize| format!("n{}", i);
        let _ = writeln!(out, "    start([START])");
        let _ = writeln!(out, "    finish([END])");
        for (i, step) in self.steps.iter().enumerate() {
            match step {
                Step::Stage { .. } => {
                    let _ = writeln!(out, "    {}[{}]", id(i), step.name());
                }
                Step::Router { .. } => {
                    let _ = writeln!(out, "    {}{{{}}}", id(i), step.name());
                }
            }
        }
        let _ = writeln!(out, "    start --> {}", id(self.entry));
        for (i, step) in self.steps.iter().enumerate() {
            match step {
                Step::Stage { next, .. } => {
                    let to = next.map(id).unwrap_or_else(|| "finish".to_string());
                    let _ = writeln!(out, "    {} --> {}", id(i), to);
                }
                Step::Router { branches, .. } => {
                    for (platform, target) in branches {
                        let _ = writeln!(out, "    {} -->|{}| {}", id(i), platform, id(*target));
                    }
                }
            }
        }
        out
    }

    fn check_acyclic(&self) -> std::result::Result<(), String> {
        // 0 = unvisited, 1 = on stack, 2 = done
        fn visit(graph: &StageGraph, i: usize, marks: &mut [u8]) -> std::result::Result<(), String> {
            match marks[i] {
                1 => return Err(format!("cycle through '{}'", graph.steps[i].name())),
                2 => return Ok(()),
                _ => {}
            }
            marks[i] = 1;
            for next in graph.steps[i].successors() {
                visit(graph, next, marks)?;
            }
            marks[i] = 2;
            Ok(())
        }

        let mut marks = vec![0u8; self.steps.len()];
        visit(self, self.entry, &mut marks)
    }

    fn check_reachable(&self) -> std::result::Result<(), String> {
        let mut seen = BTreeSet::new();
        let mut stack = vec![self.entry];
        while let Some(i) = stack.pop() {
            if seen.insert(i) {
                stack.extend(self.steps[i].successors());
            }
        }
        match (0..self.steps.len()).find(|i| !seen.contains(i)) {
            Some(i) => Err(format!("node '{}' is unreachable", self.steps[i].name())),
            None => Ok(()),
        }
    }

    fn check_requirements(&self) -> std::result::Result<(), String> {
        fn walk(
            graph: &StageGraph,
            i: usize,
            produced: &BTreeSet<StateField>,
        ) -> std::result::Result<(), String> {
            match &graph.steps[i] {
                Step::Stage { stage, next } => {
                    if let Some(missing) = stage.requires().iter().find(|f| !produced.contains(*f)) {
                        return Err(format!(
                            "stage '{}' requires {} which no earlier stage produces",
                            stage.name(),
                            missing
                        ));
                    }
                    let mut produced = produced.clone();
                    produced.extend(stage.produces().iter().copied());
                    match next {
                        Some(n) => walk(graph, *n, &produced),
                        None => Ok(()),
                    }
                }
                Step::Router { branches, .. } => branches
                    .values()
                    .try_for_each(|n| walk(graph, *n, produced)),
            }
        }

        walk(self, self.entry, &BTreeSet::new())
    }
}

impl std::fmt::Debug for StageGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageGraph")
            .field("name", &self.name)
            .field("nodes", &self.node_names())
            .finish()
    }
}
