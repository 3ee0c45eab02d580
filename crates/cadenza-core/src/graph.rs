//! Directed audio graph, rendered in dependency order.
//!
//! Nodes live in generation-checked slots so a stale [`NodeIndex`] is
//! rejected instead of silently addressing a newer node. Edges are stored on
//! the consumer as an ordered input list; the order of that list is the order
//! in which input blocks reach [`Node::render`].
//!
//! Cycles are refused when an edge is added, so the topological order
//! (Kahn's algorithm) always covers every node. A graph is itself a [`Node`]:
//! its external inputs are prepended to the designated input node's inputs and
//! its outputs are the designated output node's outputs.

use crate::node::{prepare_outputs, Arity, Node, RenderContext};
use crate::{Block, EngineConfig, Error, Result};
use smallvec::SmallVec;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use tracing::{debug, warn};

/// Stable handle to a node inside a [`Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex {
    slot: u32,
    generation: u32,
}

impl NodeIndex {
    #[inline]
    fn slot(self) -> usize {
        self.slot as usize
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.slot, self.generation)
    }
}

/// One edge into a node. `port: None` feeds every output of `source`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Input {
    pub source: NodeIndex,
    pub port: Option<usize>,
}

struct Entry {
    node: Box<dyn Node>,
    inputs: SmallVec<[Input; 4]>,
    outputs: Vec<Block>,
}

struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

pub struct Graph {
    slots: Vec<Slot>,
    free: Vec<u32>,
    input: Option<NodeIndex>,
    output: Option<NodeIndex>,
    order: Vec<NodeIndex>,
    dirty: bool,
    config: Option<EngineConfig>,
    gathered: Vec<Block>,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("nodes", &self.len())
            .field("input", &self.input)
            .field("output", &self.output)
            .finish()
    }
}

impl Graph {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            input: None,
            output: None,
            order: Vec::new(),
            dirty: false,
            config: None,
            gathered: Vec::new(),
        }
    }

    pub fn add<N: Node + 'static>(&mut self, node: N) -> NodeIndex {
        self.add_boxed(Box::new(node))
    }

    pub fn add_boxed(&mut self, mut node: Box<dyn Node>) -> NodeIndex {
        let mut outputs = Vec::new();
        if let Some(config) = self.config {
            node.prepare(&config);
            prepare_outputs(&mut outputs, node.outputs(), &RenderContext::from_config(&config));
        }
        let entry = Entry {
            node,
            inputs: SmallVec::new(),
            outputs,
        };

        let index = match self.free.pop() {
            Some(slot) => {
                let slot_ref = &mut self.slots[slot as usize];
                slot_ref.entry = Some(entry);
                NodeIndex {
                    slot,
                    generation: slot_ref.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    entry: Some(entry),
                });
                NodeIndex {
                    slot: (self.slots.len() - 1) as u32,
                    generation: 0,
                }
            }
        };
        self.dirty = true;
        index
    }

    /// Remove a node and every edge touching it.
    pub fn remove(&mut self, index: NodeIndex) -> Result<Box<dyn Node>> {
        self.entry(index)?;
        let slot = &mut self.slots[index.slot()];
        let entry = slot.entry.take().ok_or(Error::IllegalIndex(index))?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(index.slot);

        for other in self.slots.iter_mut().filter_map(|s| s.entry.as_mut()) {
            other.inputs.retain(|input| input.source != index);
        }
        if self.input == Some(index) {
            self.input = None;
        }
        if self.output == Some(index) {
            self.output = None;
        }
        self.dirty = true;
        Ok(entry.node)
    }

    pub fn contains(&self, index: NodeIndex) -> bool {
        self.entry(index).is_ok()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.entry.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn node(&self, index: NodeIndex) -> Result<&dyn Node> {
        Ok(self.entry(index)?.node.as_ref())
    }

    pub fn node_mut(&mut self, index: NodeIndex) -> Result<&mut dyn Node> {
        Ok(self.entry_mut(index)?.node.as_mut())
    }

    /// Feed every output of `source` into `dest`.
    pub fn connect(&mut self, source: NodeIndex, dest: NodeIndex) -> Result<()> {
        self.connect_port(source, dest, None)
    }

    /// Feed `source`'s output `port` (or all outputs for `None`) into `dest`,
    /// appended after `dest`'s existing inputs.
    pub fn connect_port(
        &mut self,
        source: NodeIndex,
        dest: NodeIndex,
        port: Option<usize>,
    ) -> Result<()> {
        let source_outputs = self.entry(source)?.node.outputs();
        let dest_entry = self.entry(dest)?;

        if source == dest || self.depends_on(source, dest) {
            return Err(Error::Cycle {
                from: source,
                to: dest,
            });
        }

        if let Some(port) = port {
            if port >= source_outputs {
                return Err(Error::PortOutOfRange {
                    node: source,
                    port,
                    outputs: source_outputs,
                });
            }
        }

        let edge = Input { source, port };
        let found = self.input_width(&dest_entry.inputs) + self.edge_width(&edge);
        let expected = dest_entry.node.inputs();
        if expected.max.is_some_and(|max| found > max) {
            return Err(Error::Arity {
                node: dest,
                name: dest_entry.node.name(),
                expected,
                found,
            });
        }

        self.entry_mut(dest)?.inputs.push(edge);
        self.dirty = true;
        Ok(())
    }

    /// Remove every edge from `source` into `dest`, returning how many were removed.
    pub fn disconnect(&mut self, source: NodeIndex, dest: NodeIndex) -> Result<usize> {
        self.entry(source)?;
        let entry = self.entry_mut(dest)?;
        let before = entry.inputs.len();
        entry.inputs.retain(|input| input.source != source);
        let removed = before - entry.inputs.len();
        if removed > 0 {
            self.dirty = true;
        }
        Ok(removed)
    }

    pub fn inputs_of(&self, index: NodeIndex) -> Result<&[Input]> {
        Ok(self.entry(index)?.inputs.as_slice())
    }

    /// Designate the node that receives the graph's external inputs.
    pub fn set_input(&mut self, index: Option<NodeIndex>) -> Result<()> {
        if let Some(index) = index {
            self.entry(index)?;
        }
        self.input = index;
        Ok(())
    }

    /// Designate the node whose outputs become the graph's outputs.
    pub fn set_output(&mut self, index: Option<NodeIndex>) -> Result<()> {
        if let Some(index) = index {
            self.entry(index)?;
        }
        self.output = index;
        Ok(())
    }

    pub fn input(&self) -> Option<NodeIndex> {
        self.input
    }

    pub fn output(&self) -> Option<NodeIndex> {
        self.output
    }

    /// Check every node's input count against its arity and fix the render order.
    ///
    /// The input node is only checked against its maximum, since external
    /// inputs make up the rest. Nested graphs are validated too.
    pub fn validate(&mut self) -> Result<()> {
        for index in self.indices() {
            self.entry_mut(index)?.node.validate()?;
            let entry = self.entry(index)?;
            let expected = entry.node.inputs();
            let found = self.input_width(&entry.inputs);
            let ok = if Some(index) == self.input {
                expected.max.map_or(true, |max| found <= max)
            } else {
                expected.accepts(found)
            };
            if !ok {
                return Err(Error::Arity {
                    node: index,
                    name: entry.node.name(),
                    expected,
                    found,
                });
            }
        }
        self.rebuild_order();
        debug!(
            nodes = self.order.len(),
            input = ?self.input,
            output = ?self.output,
            "Graph validated"
        );
        Ok(())
    }

    /// Nodes in the order they render.
    pub fn render_order(&mut self) -> &[NodeIndex] {
        if self.dirty {
            self.rebuild_order();
        }
        &self.order
    }

    fn indices(&self) -> Vec<NodeIndex> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.entry.is_some())
            .map(|(i, s)| NodeIndex {
                slot: i as u32,
                generation: s.generation,
            })
            .collect()
    }

    fn entry(&self, index: NodeIndex) -> Result<&Entry> {
        self.slots
            .get(index.slot())
            .filter(|s| s.generation == index.generation)
            .and_then(|s| s.entry.as_ref())
            .ok_or(Error::IllegalIndex(index))
    }

    fn entry_mut(&mut self, index: NodeIndex) -> Result<&mut Entry> {
        self.slots
            .get_mut(index.slot())
            .filter(|s| s.generation == index.generation)
            .and_then(|s| s.entry.as_mut())
            .ok_or(Error::IllegalIndex(index))
    }

    fn edge_width(&self, edge: &Input) -> usize {
        match edge.port {
            Some(_) => 1,
            None => self.entry(edge.source).map_or(0, |e| e.node.outputs()),
        }
    }

    fn input_width(&self, inputs: &[Input]) -> usize {
        inputs.iter().map(|edge| self.edge_width(edge)).sum()
    }

    /// True if `node` reads (directly or transitively) from `target`.
    fn depends_on(&self, node: NodeIndex, target: NodeIndex) -> bool {
        let mut stack = vec![node];
        let mut seen = vec![false; self.slots.len()];
        while let Some(current) = stack.pop() {
            if current == target {
                return true;
            }
            if std::mem::replace(&mut seen[current.slot()], true) {
                continue;
            }
            if let Ok(entry) = self.entry(current) {
                stack.extend(entry.inputs.iter().map(|input| input.source));
            }
        }
        false
    }

    /// Kahn's algorithm over the consumer-side edge lists.
    fn rebuild_order(&mut self) {
        let nodes = self.indices();
        let mut in_degree: HashMap<NodeIndex, usize> = HashMap::with_capacity(nodes.len());
        let mut dependents: HashMap<NodeIndex, Vec<NodeIndex>> =
            HashMap::with_capacity(nodes.len());

        for &index in &nodes {
            in_degree.insert(index, 0);
            dependents.entry(index).or_default();
        }
        for &index in &nodes {
            if let Ok(entry) = self.entry(index) {
                for input in &entry.inputs {
                    dependents.entry(input.source).or_default().push(index);
                    *in_degree.entry(index).or_insert(0) += 1;
                }
            }
        }

        let mut queue: VecDeque<NodeIndex> = nodes
            .iter()
            .copied()
            .filter(|index| in_degree.get(index) == Some(&0))
            .collect();

        self.order.clear();
        while let Some(index) = queue.pop_front() {
            self.order.push(index);
            if let Some(deps) = dependents.get(&index) {
                for &dep in deps {
                    if let Some(degree) = in_degree.get_mut(&dep) {
                        *degree -= 1;
                        if *degree == 0 {
                            queue.push_back(dep);
                        }
                    }
                }
            }
        }

        if self.order.len() != nodes.len() {
            warn!(
                ordered = self.order.len(),
                nodes = nodes.len(),
                "Graph order does not cover every node"
            );
        }
        self.dirty = false;
    }
}

fn place(gathered: &mut Vec<Block>, position: usize, block: &Block) {
    if gathered.len() <= position {
        gathered.push(Block::default());
    }
    gathered[position].copy_from(block);
}

impl Node for Graph {
    fn name(&self) -> &'static str {
        "graph"
    }

    fn inputs(&self) -> Arity {
        match self.input.and_then(|index| self.entry(index).ok()) {
            Some(entry) => {
                let arity = entry.node.inputs();
                let internal = self.input_width(&entry.inputs);
                Arity {
                    min: arity.min.saturating_sub(internal),
                    max: arity.max.map(|max| max.saturating_sub(internal)),
                }
            }
            None => Arity::NONE,
        }
    }

    fn outputs(&self) -> usize {
        self.output
            .and_then(|index| self.entry(index).ok())
            .map_or(0, |entry| entry.node.outputs())
    }

    fn prepare(&mut self, config: &EngineConfig) {
        self.config = Some(*config);
        let ctx = RenderContext::from_config(config);
        for entry in self.slots.iter_mut().filter_map(|s| s.entry.as_mut()) {
            entry.node.prepare(config);
            let count = entry.node.outputs();
            prepare_outputs(&mut entry.outputs, count, &ctx);
        }
    }

    fn render(&mut self, ctx: &RenderContext, inputs: &[Block], outputs: &mut [Block]) {
        if self.dirty {
            self.rebuild_order();
        }

        let mut gathered = std::mem::take(&mut self.gathered);
        for position in 0..self.order.len() {
            let index = self.order[position];
            let mut count = 0;

            if Some(index) == self.input {
                for block in inputs {
                    place(&mut gathered, count, block);
                    count += 1;
                }
            }

            let Ok(entry) = self.entry(index) else {
                continue;
            };
            for edge in &entry.inputs {
                let Ok(source) = self.entry(edge.source) else {
                    continue;
                };
                match edge.port {
                    Some(port) => {
                        match source.outputs.get(port) {
                            Some(block) => place(&mut gathered, count, block),
                            None => {
                                place(&mut gathered, count, &Block::default());
                                gathered[count].resize(ctx.channels, ctx.frames);
                            }
                        }
                        count += 1;
                    }
                    None => {
                        for block in &source.outputs {
                            place(&mut gathered, count, block);
                            count += 1;
                        }
                    }
                }
            }

            let Ok(entry) = self.entry_mut(index) else {
                continue;
            };
            let width = entry.node.outputs();
            prepare_outputs(&mut entry.outputs, width, ctx);
            entry.node.render(ctx, &gathered[..count], &mut entry.outputs);
        }
        self.gathered = gathered;

        let source = self.output.and_then(|index| self.entry(index).ok());
        for (port, out) in outputs.iter_mut().enumerate() {
            match source.and_then(|entry| entry.outputs.get(port)) {
                Some(block) => out.copy_from(block),
                None => out.resize(ctx.channels, ctx.frames),
            }
        }
    }

    fn reset(&mut self) {
        for entry in self.slots.iter_mut().filter_map(|s| s.entry.as_mut()) {
            entry.node.reset();
            for block in &mut entry.outputs {
                block.clear();
            }
        }
    }

    fn finished(&self) -> bool {
        self.output
            .and_then(|index| self.entry(index).ok())
            .is_some_and(|entry| entry.node.finished())
    }

    fn validate(&mut self) -> Result<()> {
        Graph::validate(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Const(f32);

    impl Node for Const {
        fn name(&self) -> &'static str {
            "const"
        }

        fn render(&mut self, _ctx: &RenderContext, _inputs: &[Block], outputs: &mut [Block]) {
            outputs[0].fill(self.0);
        }
    }

    /// Two outputs: `a` and `b`.
    struct Pair(f32, f32);

    impl Node for Pair {
        fn outputs(&self) -> usize {
            2
        }

        fn render(&mut self, _ctx: &RenderContext, _inputs: &[Block], outputs: &mut [Block]) {
            outputs[0].fill(self.0);
            outputs[1].fill(self.1);
        }
    }

    struct Sum;

    impl Node for Sum {
        fn name(&self) -> &'static str {
            "sum"
        }

        fn inputs(&self) -> Arity {
            Arity::at_least(0)
        }

        fn render(&mut self, _ctx: &RenderContext, inputs: &[Block], outputs: &mut [Block]) {
            for input in inputs {
                outputs[0].mix(input);
            }
        }
    }

    struct Halve;

    impl Node for Halve {
        fn inputs(&self) -> Arity {
            Arity::exactly(1)
        }

        fn render(&mut self, _ctx: &RenderContext, inputs: &[Block], outputs: &mut [Block]) {
            outputs[0].copy_from(&inputs[0]);
            outputs[0].scale(0.5);
        }
    }

    fn ctx() -> RenderContext {
        RenderContext::new(48000.0, 1, 8)
    }

    fn render_once(graph: &mut Graph) -> Vec<Block> {
        let ctx = ctx();
        let mut outputs = vec![Block::new(1, ctx.frames); graph.outputs()];
        graph.render(&ctx, &[], &mut outputs);
        outputs
    }

    #[test]
    fn test_self_loop_is_cycle() {
        let mut graph = Graph::new();
        let sum = graph.add(Sum);
        assert!(matches!(
            graph.connect(sum, sum),
            Err(Error::Cycle { .. })
        ));
    }

    #[test]
    fn test_back_edge_is_cycle() {
        let mut graph = Graph::new();
        let a = graph.add(Sum);
        let b = graph.add(Sum);
        let c = graph.add(Sum);
        graph.connect(a, b).unwrap();
        graph.connect(b, c).unwrap();
        let err = graph.connect(c, a).unwrap_err();
        assert_eq!(err, Error::Cycle { from: c, to: a });
        assert!(err.is_graph_error());
    }

    #[test]
    fn test_arity_exceeded_on_connect() {
        let mut graph = Graph::new();
        let one = graph.add(Const(1.0));
        let two = graph.add(Const(2.0));
        let halve = graph.add(Halve);
        graph.connect(one, halve).unwrap();
        assert!(matches!(
            graph.connect(two, halve),
            Err(Error::Arity { found: 2, .. })
        ));
        assert!(matches!(
            graph.connect(halve, two),
            Err(Error::Arity { name: "const", .. })
        ));
    }

    #[test]
    fn test_validate_checks_nested_graphs() {
        let mut inner = Graph::new();
        let halve = inner.add(Halve);
        inner.set_output(Some(halve)).unwrap();

        let mut outer = Graph::new();
        let nested = outer.add(inner);
        outer.set_output(Some(nested)).unwrap();
        assert!(matches!(
            outer.validate(),
            Err(Error::Arity { found: 0, .. })
        ));

        // Deeper nesting reaches the same node.
        let mut outermost = Graph::new();
        let wrapped = outermost.add(outer);
        outermost.set_output(Some(wrapped)).unwrap();
        assert!(outermost.validate().is_err());
    }

    #[test]
    fn test_validate_reports_missing_inputs() {
        let mut graph = Graph::new();
        let halve = graph.add(Halve);
        graph.set_output(Some(halve)).unwrap();
        assert!(matches!(
            graph.validate(),
            Err(Error::Arity { found: 0, .. })
        ));
    }

    #[test]
    fn test_port_out_of_range() {
        let mut graph = Graph::new();
        let pair = graph.add(Pair(1.0, 2.0));
        let sum = graph.add(Sum);
        assert!(matches!(
            graph.connect_port(pair, sum, Some(2)),
            Err(Error::PortOutOfRange { outputs: 2, .. })
        ));
    }

    #[test]
    fn test_renders_in_dependency_order() {
        let mut graph = Graph::new();
        // Added consumer-first so slot order differs from render order.
        let halve = graph.add(Halve);
        let sum = graph.add(Sum);
        let one = graph.add(Const(1.0));
        let two = graph.add(Const(2.0));
        graph.connect(one, sum).unwrap();
        graph.connect(two, sum).unwrap();
        graph.connect(sum, halve).unwrap();
        graph.set_output(Some(halve)).unwrap();
        graph.validate().unwrap();

        let order = graph.render_order().to_vec();
        let pos = |i| order.iter().position(|&x| x == i).unwrap();
        assert!(pos(one) < pos(sum));
        assert!(pos(two) < pos(sum));
        assert!(pos(sum) < pos(halve));

        let out = render_once(&mut graph);
        assert!(out[0].channel(0).iter().all(|&s| (s - 1.5).abs() < 1e-6));
    }

    #[test]
    fn test_port_selection() {
        let mut graph = Graph::new();
        let pair = graph.add(Pair(1.0, 2.0));
        let sum = graph.add(Sum);
        graph.connect_port(pair, sum, Some(1)).unwrap();
        graph.set_output(Some(sum)).unwrap();
        let out = render_once(&mut graph);
        assert_eq!(out[0].channel(0)[0], 2.0);

        graph.connect(pair, sum).unwrap();
        let out = render_once(&mut graph);
        assert_eq!(out[0].channel(0)[0], 5.0);
    }

    #[test]
    fn test_nested_graph_forwards_inputs() {
        let mut inner = Graph::new();
        let halve = inner.add(Halve);
        inner.set_input(Some(halve)).unwrap();
        inner.set_output(Some(halve)).unwrap();
        assert_eq!(inner.inputs(), Arity::exactly(1));

        let mut outer = Graph::new();
        let source = outer.add(Const(0.5));
        let nested = outer.add(inner);
        outer.connect(source, nested).unwrap();
        outer.set_output(Some(nested)).unwrap();
        outer.validate().unwrap();

        let out = render_once(&mut outer);
        assert_eq!(out[0].channel(0)[3], 0.25);
    }

    #[test]
    fn test_remove_invalidates_index_and_edges() {
        let mut graph = Graph::new();
        let one = graph.add(Const(1.0));
        let sum = graph.add(Sum);
        graph.connect(one, sum).unwrap();
        graph.remove(one).unwrap();

        assert!(graph.inputs_of(sum).unwrap().is_empty());
        assert_eq!(graph.remove(one).unwrap_err(), Error::IllegalIndex(one));

        let reused = graph.add(Const(3.0));
        assert_ne!(reused, one);
        assert!(!graph.contains(one));
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn test_missing_output_renders_silence() {
        let mut graph = Graph::new();
        graph.add(Const(1.0));
        let ctx = ctx();
        let mut outputs = vec![Block::filled(1, ctx.frames, 9.0)];
        graph.render(&ctx, &[], &mut outputs);
        assert!(outputs[0].is_silent(0.0));
    }
}
