/*!
The arena that backs a model: every `Region`, `State`, `PseudoState` and `Transition` is an
entry in one of four maps keyed by [`ID`](crate::id::ID), addressed by value rather than by
shared, cyclic `Rc` pointers (see the design notes on arena-vs-`Rc` representations). Handle
types in [`crate::model::handles`] borrow the arena and a single `ID` to present the fluent,
per-element API described by the construction contract.

# Example

TBD
*/

use crate::error::{ErrorKind, Result};
use crate::id::ID;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

// ------------------------------------------------------------------------------------------------
// Public Types
// ------------------------------------------------------------------------------------------------

/// A guard evaluated against the current message and instance. `message` is `None` only when
/// the engine is probing for a completion transition — ordinary evaluation always
/// passes `Some`.
pub type GuardFn<M, I> = Rc<dyn Fn(Option<&M>, &I) -> bool>;

/// A transition effect, or a state's entry/exit action. `history` is `true` only when an
/// entry action runs as part of re-entering a state via history. `message` follows the same
/// `None`-means-completion convention as [`GuardFn`].
pub type ActionFn<M, I> = Rc<dyn Fn(Option<&M>, &mut I, bool)>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PseudoStateKind {
    Initial,
    ShallowHistory,
    DeepHistory,
    Choice,
    Junction,
    Terminate,
}

impl PseudoStateKind {
    pub fn is_initial_family(&self) -> bool {
        matches!(
            self,
            PseudoStateKind::Initial | PseudoStateKind::ShallowHistory | PseudoStateKind::DeepHistory
        )
    }

    pub fn is_history(&self) -> bool {
        matches!(
            self,
            PseudoStateKind::ShallowHistory | PseudoStateKind::DeepHistory
        )
    }
}

/// Derived, not stored — see [`crate::model::ancestry::classify_transition`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransitionKind {
    Internal,
    Local,
    External,
}

pub(crate) struct RegionData {
    pub(crate) id: ID,
    pub(crate) name: String,
    /// The `State` (or root `StateMachine`) that owns this region.
    pub(crate) owner: ID,
    pub(crate) vertices: Vec<ID>,
    pub(crate) initial: Option<ID>,
}

pub(crate) struct StateData<M, I> {
    pub(crate) id: ID,
    pub(crate) name: String,
    /// `None` only for the root `StateMachine`.
    pub(crate) parent_region: Option<ID>,
    pub(crate) child_regions: Vec<ID>,
    pub(crate) entry: Vec<ActionFn<M, I>>,
    pub(crate) exit: Vec<ActionFn<M, I>>,
    pub(crate) outbound: Vec<ID>,
    pub(crate) is_final: bool,
    pub(crate) is_root: bool,
}

pub(crate) struct PseudoStateData<M, I> {
    pub(crate) id: ID,
    pub(crate) name: String,
    pub(crate) parent_region: ID,
    pub(crate) kind: PseudoStateKind,
    pub(crate) outbound: Vec<ID>,
    #[allow(dead_code)]
    pub(crate) _phantom: std::marker::PhantomData<fn(&M, &I)>,
}

pub(crate) struct TransitionData<M, I> {
    pub(crate) id: ID,
    pub(crate) name: Option<String>,
    pub(crate) source: ID,
    pub(crate) target: Option<ID>,
    pub(crate) guard: Option<GuardFn<M, I>>,
    pub(crate) is_else: bool,
    pub(crate) effects: Vec<ActionFn<M, I>>,
    pub(crate) compiled: RefCell<Option<CompiledTransition>>,
}

/// The ordered traverse steps the bootstrap compiler attaches to a transition. Exiting
/// only ever needs a single state: `leaveState` on that state recurses bottom-up through
/// whatever is currently active beneath it, so there is nothing to flatten. Entering a target
/// nested several levels below the point of divergence does need every intermediate state
/// named explicitly — `enterState` on an intermediate only recurses *generically* (via initial
/// or history) into the child regions not on this path.
#[derive(Clone, Debug)]
pub(crate) struct CompiledTransition {
    pub(crate) kind: TransitionKind,
    pub(crate) exit: Option<ID>,
    pub(crate) entry_chain: Vec<ID>,
    pub(crate) target_pseudo: Option<ID>,
}

/// Which kind of vertex an [`ID`] resolves to; returned by lookups so callers can match
/// instead of guessing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum VertexKind {
    State,
    PseudoState,
}

// ------------------------------------------------------------------------------------------------
// The Arena
// ------------------------------------------------------------------------------------------------

/// Owns every element of a model, addressed by stable [`ID`]. Shared by all the handle types
/// and by the bootstrap compiler and evaluator; never exposed directly to application code.
pub(crate) struct Model<M, I> {
    pub(crate) regions: RefCell<HashMap<ID, RegionData>>,
    pub(crate) states: RefCell<HashMap<ID, StateData<M, I>>>,
    pub(crate) pseudo_states: RefCell<HashMap<ID, PseudoStateData<M, I>>>,
    pub(crate) transitions: RefCell<HashMap<ID, TransitionData<M, I>>>,
    pub(crate) default_region_name: String,
    pub(crate) qualified_name_separator: String,
    /// Set on every mutation, cleared once bootstrap completes.
    pub(crate) dirty: std::cell::Cell<bool>,
}

impl<M, I> Model<M, I> {
    pub(crate) fn new(default_region_name: &str, qualified_name_separator: &str) -> Self {
        Self {
            regions: RefCell::new(HashMap::new()),
            states: RefCell::new(HashMap::new()),
            pseudo_states: RefCell::new(HashMap::new()),
            transitions: RefCell::new(HashMap::new()),
            default_region_name: default_region_name.to_string(),
            qualified_name_separator: qualified_name_separator.to_string(),
            dirty: std::cell::Cell::new(true),
        }
    }

    pub(crate) fn mark_dirty(&self) {
        self.dirty.set(true);
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    pub(crate) fn clear_dirty(&self) {
        self.dirty.set(false);
    }

    pub(crate) fn vertex_kind(&self, id: &ID) -> Option<VertexKind> {
        if self.states.borrow().contains_key(id) {
            Some(VertexKind::State)
        } else if self.pseudo_states.borrow().contains_key(id) {
            Some(VertexKind::PseudoState)
        } else {
            None
        }
    }

    pub(crate) fn parent_region_of(&self, id: &ID) -> Option<ID> {
        if let Some(state) = self.states.borrow().get(id) {
            return state.parent_region.clone();
        }
        if let Some(pseudo) = self.pseudo_states.borrow().get(id) {
            return Some(pseudo.parent_region.clone());
        }
        None
    }

    pub(crate) fn owner_state_of(&self, region: &ID) -> Option<ID> {
        self.regions.borrow().get(region).map(|r| r.owner.clone())
    }

    /// Ensures `state` has at least one child region, auto-creating the default-named one
    /// the first time a vertex is attached underneath it.
    pub(crate) fn ensure_region(&self, state: &ID) -> ID {
        self.mark_dirty();
        {
            let states = self.states.borrow();
            let existing = &states.get(state).expect("state exists").child_regions;
            if let Some(first) = existing.first() {
                return first.clone();
            }
        }
        let region_id = ID::random_with_prefix("region").expect("static prefix is valid");
        self.regions.borrow_mut().insert(
            region_id.clone(),
            RegionData {
                id: region_id.clone(),
                name: self.default_region_name.clone(),
                owner: state.clone(),
                vertices: Vec::new(),
                initial: None,
            },
        );
        self.states
            .borrow_mut()
            .get_mut(state)
            .expect("state exists")
            .child_regions
            .push(region_id.clone());
        region_id
    }

    pub(crate) fn add_region(&self, state: &ID, name: &str) -> ID {
        self.mark_dirty();
        let region_id = ID::random_with_prefix("region").expect("static prefix is valid");
        self.regions.borrow_mut().insert(
            region_id.clone(),
            RegionData {
                id: region_id.clone(),
                name: name.to_string(),
                owner: state.clone(),
                vertices: Vec::new(),
                initial: None,
            },
        );
        self.states
            .borrow_mut()
            .get_mut(state)
            .expect("state exists")
            .child_regions
            .push(region_id.clone());
        region_id
    }

    pub(crate) fn new_state(&self, region: &ID, name: &str, is_final: bool) -> ID {
        self.mark_dirty();
        let id = ID::random_with_prefix(if is_final { "final" } else { "state" })
            .expect("static prefix is valid");
        self.states.borrow_mut().insert(
            id.clone(),
            StateData {
                id: id.clone(),
                name: name.to_string(),
                parent_region: Some(region.clone()),
                child_regions: Vec::new(),
                entry: Vec::new(),
                exit: Vec::new(),
                outbound: Vec::new(),
                is_final,
                is_root: false,
            },
        );
        self.regions
            .borrow_mut()
            .get_mut(region)
            .expect("region exists")
            .vertices
            .push(id.clone());
        id
    }

    pub(crate) fn new_root_state(&self, name: &str) -> ID {
        self.mark_dirty();
        let id = ID::random_with_prefix("machine").expect("static prefix is valid");
        self.states.borrow_mut().insert(
            id.clone(),
            StateData {
                id: id.clone(),
                name: name.to_string(),
                parent_region: None,
                child_regions: Vec::new(),
                entry: Vec::new(),
                exit: Vec::new(),
                outbound: Vec::new(),
                is_final: false,
                is_root: true,
            },
        );
        id
    }

    pub(crate) fn new_pseudo_state(&self, region: &ID, name: &str, kind: PseudoStateKind) -> Result<ID> {
        self.mark_dirty();
        if kind.is_initial_family() {
            let regions = self.regions.borrow();
            let existing = &regions.get(region).expect("region exists").initial;
            if existing.is_some() {
                return Err(ErrorKind::DuplicateInitialPseudoState(region.to_string()).into());
            }
        }
        let id = ID::random_with_prefix("pseudo").expect("static prefix is valid");
        self.pseudo_states.borrow_mut().insert(
            id.clone(),
            PseudoStateData {
                id: id.clone(),
                name: name.to_string(),
                parent_region: region.clone(),
                kind: kind.clone(),
                outbound: Vec::new(),
                _phantom: std::marker::PhantomData,
            },
        );
        self.regions
            .borrow_mut()
            .get_mut(region)
            .expect("region exists")
            .vertices
            .push(id.clone());
        if kind.is_initial_family() {
            self.regions.borrow_mut().get_mut(region).expect("region exists").initial = Some(id.clone());
        }
        Ok(id)
    }

    pub(crate) fn new_transition(&self, source: &ID) -> Result<ID> {
        self.mark_dirty();
        if let Some(state) = self.states.borrow().get(source) {
            if state.is_final {
                return Err(ErrorKind::FinalStateOutboundTransition(state.name.clone()).into());
            }
        }
        if let Some(pseudo) = self.pseudo_states.borrow().get(source) {
            if pseudo.kind == PseudoStateKind::Terminate {
                return Err(ErrorKind::TerminateOutboundTransition(pseudo.name.clone()).into());
            }
        }
        let id = ID::random_with_prefix("transition").expect("static prefix is valid");
        self.transitions.borrow_mut().insert(
            id.clone(),
            TransitionData {
                id: id.clone(),
                name: None,
                source: source.clone(),
                target: None,
                guard: None,
                is_else: false,
                effects: Vec::new(),
                compiled: RefCell::new(None),
            },
        );
        self.add_outbound(source, &id);
        Ok(id)
    }

    pub(crate) fn set_target(&self, transition: &ID, target: &ID) {
        self.mark_dirty();
        if let Some(t) = self.transitions.borrow_mut().get_mut(transition) {
            t.target = Some(target.clone());
        }
    }

    pub(crate) fn set_guard(&self, transition: &ID, guard: GuardFn<M, I>) {
        self.mark_dirty();
        if let Some(t) = self.transitions.borrow_mut().get_mut(transition) {
            t.guard = Some(guard);
        }
    }

    pub(crate) fn set_else(&self, transition: &ID) {
        self.mark_dirty();
        if let Some(t) = self.transitions.borrow_mut().get_mut(transition) {
            t.is_else = true;
        }
    }

    pub(crate) fn set_name(&self, transition: &ID, name: &str) {
        self.mark_dirty();
        if let Some(t) = self.transitions.borrow_mut().get_mut(transition) {
            t.name = Some(name.to_string());
        }
    }

    pub(crate) fn add_effect(&self, transition: &ID, effect: ActionFn<M, I>) {
        self.mark_dirty();
        if let Some(t) = self.transitions.borrow_mut().get_mut(transition) {
            t.effects.push(effect);
        }
    }

    pub(crate) fn add_entry_action(&self, state: &ID, action: ActionFn<M, I>) {
        self.mark_dirty();
        if let Some(s) = self.states.borrow_mut().get_mut(state) {
            s.entry.push(action);
        }
    }

    pub(crate) fn add_exit_action(&self, state: &ID, action: ActionFn<M, I>) {
        self.mark_dirty();
        if let Some(s) = self.states.borrow_mut().get_mut(state) {
            s.exit.push(action);
        }
    }

    fn add_outbound(&self, source: &ID, transition: &ID) {
        if let Some(state) = self.states.borrow_mut().get_mut(source) {
            state.outbound.push(transition.clone());
            return;
        }
        if let Some(pseudo) = self.pseudo_states.borrow_mut().get_mut(source) {
            pseudo.outbound.push(transition.clone());
        }
    }

    pub(crate) fn outbound_of(&self, vertex: &ID) -> Vec<ID> {
        if let Some(state) = self.states.borrow().get(vertex) {
            return state.outbound.clone();
        }
        if let Some(pseudo) = self.pseudo_states.borrow().get(vertex) {
            return pseudo.outbound.clone();
        }
        Vec::new()
    }

    pub(crate) fn name_of(&self, id: &ID) -> String {
        if let Some(state) = self.states.borrow().get(id) {
            return state.name.clone();
        }
        if let Some(pseudo) = self.pseudo_states.borrow().get(id) {
            return pseudo.name.clone();
        }
        if let Some(region) = self.regions.borrow().get(id) {
            return region.name.clone();
        }
        id.to_string()
    }

    /// The ancestor names of `id`, root-first, joined by [`Model::qualified_name_separator`]
    /// (the `toString`-style qualified name). `id` may be a vertex or a region itself — a
    /// region's own name has already been pushed, so the walk starts from its owning state
    /// rather than (as for a vertex) the region that directly owns it.
    pub(crate) fn qualified_name(&self, id: &ID) -> String {
        let mut names = vec![self.name_of(id)];
        let mut region = if self.regions.borrow().contains_key(id) {
            Some(id.clone())
        } else {
            self.parent_region_of(id)
        };
        while let Some(r) = region {
            let owner = match self.owner_state_of(&r) {
                Some(o) => o,
                None => break,
            };
            names.push(self.name_of(&owner));
            let is_root = self
                .states
                .borrow()
                .get(&owner)
                .map(|s| s.is_root)
                .unwrap_or(false);
            if is_root {
                break;
            }
            region = self.parent_region_of(&owner);
        }
        names.reverse();
        names.join(&self.qualified_name_separator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualified_name_of_a_nested_state() {
        let model: Model<(), ()> = Model::new("default", ".");
        let root = model.new_root_state("Root");
        let root_region = model.ensure_region(&root);
        let outer = model.new_state(&root_region, "Outer", false);
        let outer_region = model.ensure_region(&outer);
        let inner = model.new_state(&outer_region, "Inner", false);
        assert_eq!(model.qualified_name(&inner), "Root.Outer.Inner");
    }

    #[test]
    fn qualified_name_of_a_region_includes_its_owner() {
        let model: Model<(), ()> = Model::new("default", ".");
        let root = model.new_root_state("Root");
        let root_region = model.ensure_region(&root);
        assert_eq!(model.qualified_name(&root_region), "Root.default");
    }
}
