//! Authoritative session model
//!
//! Each `apply_*` method touches only its own slice of state and is
//! idempotent: applying the same data twice changes nothing the second time.
//! None of them fail; bad input leaves the slice unchanged.

use indexmap::IndexMap;

use lookout_protocol::{
    find_variable_mut, Breakpoint, BreakpointId, ExecutionState, Location, Scope, StackFrame,
    VariableNode,
};

/// Breakpoint changes produced by a fresh server listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BreakpointDiff {
    pub added: Vec<Breakpoint>,
    pub removed: Vec<Breakpoint>,
}

impl BreakpointDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Debugger session state as last reported by the server
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    breakpoints: IndexMap<BreakpointId, Breakpoint>,
    current_break: Option<Location>,
    execution_state: Option<ExecutionState>,
    local: Vec<VariableNode>,
    global: Vec<VariableNode>,
    active_scope: Scope,
    call_stack: Vec<StackFrame>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    // ==================== Breakpoints ====================

    /// Replace the breakpoint set with a server listing.
    ///
    /// A known id at a new location is reported as removed at the old
    /// location and added at the new one.
    pub fn apply_breakpoint_list(&mut self, list: Vec<Breakpoint>) -> BreakpointDiff {
        let mut next: IndexMap<BreakpointId, Breakpoint> = IndexMap::with_capacity(list.len());
        for bp in list {
            if next.contains_key(&bp.id) {
                tracing::warn!(id = %bp.id, "Duplicate breakpoint id in listing, keeping the first");
                continue;
            }
            next.insert(bp.id.clone(), bp);
        }

        let mut diff = BreakpointDiff::default();
        for (id, old) in &self.breakpoints {
            match next.get(id) {
                Some(new) if new.same_place(old) => {}
                _ => diff.removed.push(old.clone()),
            }
        }
        for (id, new) in &next {
            match self.breakpoints.get(id) {
                Some(old) if old.same_place(new) => {}
                _ => diff.added.push(new.clone()),
            }
        }

        self.breakpoints = next;
        diff
    }

    pub fn breakpoint_at(&self, filepath: &str, line: u32) -> Option<&Breakpoint> {
        self.breakpoints
            .values()
            .find(|bp| bp.filepath == filepath && bp.line == line)
    }

    pub fn breakpoints_in(&self, filepath: &str) -> Vec<Breakpoint> {
        self.breakpoints
            .values()
            .filter(|bp| bp.filepath == filepath)
            .cloned()
            .collect()
    }

    pub fn breakpoints(&self) -> impl Iterator<Item = &Breakpoint> {
        self.breakpoints.values()
    }

    // ==================== Break ====================

    /// Set the current break, returning the one it replaces
    pub fn apply_break(&mut self, location: Location) -> Option<Location> {
        self.current_break.replace(location)
    }

    /// Clear the current break, returning it
    pub fn apply_stopped(&mut self) -> Option<Location> {
        self.current_break.take()
    }

    pub fn current_break(&self) -> Option<&Location> {
        self.current_break.as_ref()
    }

    // ==================== Execution State ====================

    /// Record a reported execution state.
    ///
    /// Missing and `waiting` states are ignored. Returns whether the state
    /// changed.
    pub fn apply_execution_state(&mut self, state: Option<ExecutionState>) -> bool {
        match state {
            Some(state) if state.is_visible() => {
                let changed = self.execution_state != Some(state);
                self.execution_state = Some(state);
                changed
            }
            _ => false,
        }
    }

    pub fn execution_state(&self) -> Option<ExecutionState> {
        self.execution_state
    }

    // ==================== Variables ====================

    /// Replace the root variables of a scope and make it the displayed one.
    ///
    /// An empty list is not a request to blank the display and is ignored.
    /// Returns whether anything changed.
    pub fn apply_variables(&mut self, scope: Scope, nodes: Vec<VariableNode>) -> bool {
        if nodes.is_empty() {
            return false;
        }

        let roots = match scope {
            Scope::Local => &mut self.local,
            Scope::Global => &mut self.global,
        };
        let changed = *roots != nodes || self.active_scope != scope;
        *roots = nodes;
        self.active_scope = scope;
        changed
    }

    /// Replace the children of one variable, found by full name in either
    /// scope. Returns false if no such variable is loaded.
    pub fn apply_variable_children(&mut self, full_name: &str, children: Vec<VariableNode>) -> bool {
        let (first, second) = match self.active_scope {
            Scope::Local => (&mut self.local, &mut self.global),
            Scope::Global => (&mut self.global, &mut self.local),
        };

        let node = match find_variable_mut(first, full_name) {
            Some(node) => node,
            None => match find_variable_mut(second, full_name) {
                Some(node) => node,
                None => {
                    tracing::debug!(full_name, "Children for a variable no longer shown");
                    return false;
                }
            },
        };

        node.children = children;
        node.has_loaded_children = true;
        true
    }

    /// The displayed scope and its root variables
    pub fn variables(&self) -> (Scope, &[VariableNode]) {
        match self.active_scope {
            Scope::Local => (Scope::Local, &self.local),
            Scope::Global => (Scope::Global, &self.global),
        }
    }

    // ==================== Call Stack ====================

    pub fn apply_call_stack(&mut self, frames: Vec<StackFrame>) {
        self.call_stack = frames;
    }

    pub fn call_stack(&self) -> &[StackFrame] {
        &self.call_stack
    }
}
