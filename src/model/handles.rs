/*!
The fluent construction API. Every handle here is a thin, `Clone`-able wrapper around a
shared [`Model`] and a single [`ID`] — cheap to pass around, cheap to store on the side while
building a model piece by piece. None of these types hold any model data themselves; all reads
and writes go through the arena.
*/

use super::types::{ActionFn, GuardFn, Model, PseudoStateKind};
use crate::error::Result;
use crate::id::ID;
use crate::instance::Instance;
use std::rc::Rc;

// ------------------------------------------------------------------------------------------------
// Vertex
// ------------------------------------------------------------------------------------------------

/// Anything that can be named as a transition's target: a [`State`] or a [`PseudoState`] of the
/// same model. Implemented as a trait (rather than an enum) so `to()` reads naturally at the
/// call site: `outer.to(Some(&inner))`.
pub trait VertexHandle<M, I> {
    #[doc(hidden)]
    fn vertex_id(&self) -> ID;
}

// ------------------------------------------------------------------------------------------------
// StateMachine
// ------------------------------------------------------------------------------------------------

/// The root of a model. Owns the arena; every other handle is reached by navigating from one of
/// these, directly or transitively.
pub struct StateMachine<M, I> {
    model: Rc<Model<M, I>>,
    root: ID,
}

impl<M, I> StateMachine<M, I> {
    /// A new, empty model named `name`, using `"region"` as the default auto-created region
    /// name and `"."` as the qualified-name separator.
    pub fn new(name: &str) -> Self {
        Self::with_names(name, "region", ".")
    }

    /// As [`StateMachine::new`] but with an explicit default region name and qualified-name
    /// separator (see `toString`-style qualified names).
    pub fn with_names(name: &str, default_region_name: &str, qualified_name_separator: &str) -> Self {
        let model = Rc::new(Model::new(default_region_name, qualified_name_separator));
        let root = model.new_root_state(name);
        Self { model, root }
    }

    pub fn name(&self) -> String {
        self.model.name_of(&self.root)
    }

    pub fn qualified_name(&self) -> String {
        self.model.qualified_name(&self.root)
    }

    /// The root's default region, auto-created on first use.
    pub fn root_region(&self) -> Region<M, I> {
        let id = self.model.ensure_region(&self.root);
        Region {
            model: self.model.clone(),
            id,
        }
    }

    /// An additional, explicitly-named region of the root — makes the root state orthogonal.
    pub fn region(&self, name: &str) -> Region<M, I> {
        let id = self.model.add_region(&self.root, name);
        Region {
            model: self.model.clone(),
            id,
        }
    }

    /// Runs the bootstrap compiler if the model is dirty; a no-op otherwise — bootstrap is idempotent.
    pub fn initialise_model(&self) -> Result<()> {
        super::bootstrap::compile(&self.model)
    }

    /// Every region owned directly by the root, in declaration order — one for a simple model,
    /// more than one if the root itself was made orthogonal via [`StateMachine::region`].
    pub(crate) fn root_regions(&self) -> Vec<Region<M, I>> {
        self.model
            .states
            .borrow()
            .get(&self.root)
            .map(|s| s.child_regions.clone())
            .unwrap_or_default()
            .into_iter()
            .map(|id| Region {
                model: self.model.clone(),
                id,
            })
            .collect()
    }
}

impl<M, I> StateMachine<M, I>
where
    I: crate::instance::Instance,
{
    /// Bootstraps the model if needed, then enters the root region, writing `instance`'s
    /// initial configuration.
    pub fn initialise(&self, instance: &mut I) -> Result<()> {
        crate::evaluator::initialise(&self.model, &self.root, instance)
    }

    /// Delivers `message` to `instance`. Returns `Ok(true)` if some transition fired (including
    /// any completion cascade it triggered), `Ok(false)` if nothing matched or the instance was
    /// already terminated.
    pub fn evaluate(&self, message: &M, instance: &mut I) -> Result<bool> {
        crate::evaluator::evaluate(&self.model, &self.root, message, instance)
    }
}

// ------------------------------------------------------------------------------------------------
// Region
// ------------------------------------------------------------------------------------------------

pub struct Region<M, I> {
    model: Rc<Model<M, I>>,
    id: ID,
}

impl<M, I> Clone for Region<M, I> {
    fn clone(&self) -> Self {
        Self {
            model: self.model.clone(),
            id: self.id.clone(),
        }
    }
}

impl<M, I> Region<M, I> {
    pub fn name(&self) -> String {
        self.model.name_of(&self.id)
    }

    pub fn qualified_name(&self) -> String {
        self.model.qualified_name(&self.id)
    }

    /// A new simple `State` in this region.
    pub fn state(&self, name: &str) -> State<M, I> {
        let id = self.model.new_state(&self.id, name, false);
        State {
            model: self.model.clone(),
            id,
        }
    }

    /// A new `FinalState` in this region — zero outbound transitions, zero child regions.
    pub fn final_state(&self, name: &str) -> State<M, I> {
        let id = self.model.new_state(&self.id, name, true);
        State {
            model: self.model.clone(),
            id,
        }
    }

    /// A new `PseudoState` of `kind` in this region. Errors if `kind` is an initial-family kind
    /// and the region already has one.
    pub fn pseudo_state(&self, name: &str, kind: PseudoStateKind) -> Result<PseudoState<M, I>> {
        let id = self.model.new_pseudo_state(&self.id, name, kind)?;
        Ok(PseudoState {
            model: self.model.clone(),
            id,
        })
    }

    /// Every vertex owned by this region, in declaration order, tagged by kind — used by the
    /// visitor, which needs to know whether to dispatch to a state or a pseudo state without
    /// probing the arena itself.
    pub(crate) fn vertices(&self) -> Vec<RegionVertex<M, I>> {
        let ids = self
            .model
            .regions
            .borrow()
            .get(&self.id)
            .map(|r| r.vertices.clone())
            .unwrap_or_default();
        ids.into_iter()
            .map(|id| match self.model.vertex_kind(&id) {
                Some(super::types::VertexKind::PseudoState) => RegionVertex::PseudoState(PseudoState {
                    model: self.model.clone(),
                    id,
                }),
                _ => RegionVertex::State(State {
                    model: self.model.clone(),
                    id,
                }),
            })
            .collect()
    }
}

/// A region's child vertex, tagged by kind. See [`Region::vertices`].
pub(crate) enum RegionVertex<M, I> {
    State(State<M, I>),
    PseudoState(PseudoState<M, I>),
}

// ------------------------------------------------------------------------------------------------
// State
// ------------------------------------------------------------------------------------------------

pub struct State<M, I> {
    model: Rc<Model<M, I>>,
    id: ID,
}

impl<M, I> Clone for State<M, I> {
    fn clone(&self) -> Self {
        Self {
            model: self.model.clone(),
            id: self.id.clone(),
        }
    }
}

impl<M, I> State<M, I> {
    pub fn name(&self) -> String {
        self.model.name_of(&self.id)
    }

    pub fn qualified_name(&self) -> String {
        self.model.qualified_name(&self.id)
    }

    /// This state's default child region, auto-created the first time it is asked for —
    /// calling it twice returns the same region, and calling it at all makes this
    /// state composite.
    pub fn region(&self) -> Region<M, I> {
        let id = self.model.ensure_region(&self.id);
        Region {
            model: self.model.clone(),
            id,
        }
    }

    /// An additional, explicitly-named child region — makes this state orthogonal.
    pub fn named_region(&self, name: &str) -> Region<M, I> {
        let id = self.model.add_region(&self.id, name);
        Region {
            model: self.model.clone(),
            id,
        }
    }

    /// Appends an entry action, run in insertion order whenever this state is entered.
    pub fn on_entry(&self, action: ActionFn<M, I>) -> &Self {
        self.model.add_entry_action(&self.id, action);
        self
    }

    /// Appends an exit action, run in insertion order whenever this state is left.
    pub fn on_exit(&self, action: ActionFn<M, I>) -> &Self {
        self.model.add_exit_action(&self.id, action);
        self
    }

    /// Creates an outbound transition from this state. `target` of `None` makes it internal.
    /// Errors if this state is a `FinalState`.
    pub fn to(&self, target: Option<&dyn VertexHandle<M, I>>) -> Result<Transition<M, I>> {
        let id = self.model.new_transition(&self.id)?;
        if let Some(target) = target {
            self.model.set_target(&id, &target.vertex_id());
        }
        Ok(Transition {
            model: self.model.clone(),
            id,
        })
    }
}

impl<M, I> VertexHandle<M, I> for State<M, I> {
    fn vertex_id(&self) -> ID {
        self.id.clone()
    }
}

impl<M, I> State<M, I> {
    /// `true` for a `FinalState` — zero outbound transitions, zero child regions, and the
    /// vertex whose presence makes a region [`Region::is_complete`]-worthy. Read by the
    /// visitor to route to `visit_final_state` instead of `visit_state`.
    pub(crate) fn is_final(&self) -> bool {
        self.model
            .states
            .borrow()
            .get(&self.id)
            .map(|s| s.is_final)
            .unwrap_or(false)
    }

    /// This state's child regions, in declaration order. Empty for a simple state.
    pub(crate) fn child_regions(&self) -> Vec<Region<M, I>> {
        self.model
            .states
            .borrow()
            .get(&self.id)
            .map(|s| s.child_regions.clone())
            .unwrap_or_default()
            .into_iter()
            .map(|id| Region {
                model: self.model.clone(),
                id,
            })
            .collect()
    }

    /// This state's outbound transitions, in declaration order.
    pub(crate) fn outbound_transitions(&self) -> Vec<Transition<M, I>> {
        self.model
            .outbound_of(&self.id)
            .into_iter()
            .map(|id| Transition {
                model: self.model.clone(),
                id,
            })
            .collect()
    }
}

impl<M, I: Instance> State<M, I> {
    /// Whether this state is the currently active vertex of its parent region in `instance`.
    /// Always `false` for the root `StateMachine`'s own state id, which has no parent region —
    /// use [`StateMachine::evaluate`]'s return value to observe whether the machine overall
    /// accepted a message instead.
    pub fn is_active(&self, instance: &I) -> bool {
        self.model
            .parent_region_of(&self.id)
            .map(|region| instance.get_current(&region).as_ref() == Some(&self.id))
            .unwrap_or(false)
    }
}

// ------------------------------------------------------------------------------------------------
// PseudoState
// ------------------------------------------------------------------------------------------------

pub struct PseudoState<M, I> {
    model: Rc<Model<M, I>>,
    id: ID,
}

impl<M, I> Clone for PseudoState<M, I> {
    fn clone(&self) -> Self {
        Self {
            model: self.model.clone(),
            id: self.id.clone(),
        }
    }
}

impl<M, I> PseudoState<M, I> {
    pub fn name(&self) -> String {
        self.model.name_of(&self.id)
    }

    pub fn qualified_name(&self) -> String {
        self.model.qualified_name(&self.id)
    }

    pub fn kind(&self) -> PseudoStateKind {
        self.model
            .pseudo_states
            .borrow()
            .get(&self.id)
            .expect("pseudo state exists")
            .kind
            .clone()
    }

    /// Creates an outbound transition from this pseudo state. Errors if this is a `Terminate`.
    pub fn to(&self, target: Option<&dyn VertexHandle<M, I>>) -> Result<Transition<M, I>> {
        let id = self.model.new_transition(&self.id)?;
        if let Some(target) = target {
            self.model.set_target(&id, &target.vertex_id());
        }
        Ok(Transition {
            model: self.model.clone(),
            id,
        })
    }
}

impl<M, I> VertexHandle<M, I> for PseudoState<M, I> {
    fn vertex_id(&self) -> ID {
        self.id.clone()
    }
}

impl<M, I> PseudoState<M, I> {
    /// This pseudo state's outbound transitions, in declaration order.
    pub(crate) fn outbound_transitions(&self) -> Vec<Transition<M, I>> {
        self.model
            .outbound_of(&self.id)
            .into_iter()
            .map(|id| Transition {
                model: self.model.clone(),
                id,
            })
            .collect()
    }
}

// ------------------------------------------------------------------------------------------------
// Transition
// ------------------------------------------------------------------------------------------------

pub struct Transition<M, I> {
    model: Rc<Model<M, I>>,
    id: ID,
}

impl<M, I> Clone for Transition<M, I> {
    fn clone(&self) -> Self {
        Self {
            model: self.model.clone(),
            id: self.id.clone(),
        }
    }
}

impl<M, I> Transition<M, I> {
    /// Names this transition — purely cosmetic, shows up in logs and the visitor.
    pub fn named(&self, name: &str) -> &Self {
        self.model.set_name(&self.id, name);
        self
    }

    /// Sets (overwriting any previous) guard.
    pub fn when(&self, guard: GuardFn<M, I>) -> &Self {
        self.model.set_guard(&self.id, guard);
        self
    }

    /// Appends an effect action, run in insertion order after exit and before entry.
    pub fn effect(&self, action: ActionFn<M, I>) -> &Self {
        self.model.add_effect(&self.id, action);
        self
    }

    /// Marks this transition as the else-branch of its source vertex's outbound set —
    /// considered only once every non-else guard has failed.
    pub fn otherwise(&self) -> &Self {
        self.model.set_else(&self.id);
        self
    }
}

