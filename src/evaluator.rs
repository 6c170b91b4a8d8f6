/*!
The evaluation loop. Given a bootstrapped model, an instance and (for `evaluate`) a message,
this module selects a transition at the active leaf, runs its precomputed traverse steps, and
cascades completion transitions until the instance reaches a quiescent configuration.

Nothing here mutates the model; everything here mutates the instance via the
[`Instance`](crate::instance::Instance) trait and invokes user guard/action callbacks inline.
A panicking guard or action unwinds straight through these functions and out of `evaluate` —
the instance is left with whatever `set_current`/exit actions already ran before the panic.
*/

use crate::error::{ErrorKind, Result};
use crate::id::ID;
use crate::instance::Instance;
use crate::model::bootstrap;
use crate::model::types::{Model, PseudoStateKind, TransitionKind};

/// Bootstraps `model` if needed, then enters every one of the root's regions, writing
/// `instance`'s initial configuration. Entry actions run with `message = None`, the same
/// convention used for the completion cascade's probing guards.
pub(crate) fn initialise<M, I: Instance>(model: &Model<M, I>, root: &ID, instance: &mut I) -> Result<()> {
    debug!("evaluator::initialise");
    bootstrap::compile(model)?;
    let regions = child_regions_of(model, root);
    for region in regions {
        enter_region(model, &region, None, instance, false)?;
    }
    Ok(())
}

/// Delivers `message` to `instance`. Returns `Ok(true)` if some transition fired (including any
/// completion cascade it triggered), `Ok(false)` if nothing matched or the instance was already
/// terminated.
pub(crate) fn evaluate<M, I: Instance>(
    model: &Model<M, I>,
    root: &ID,
    message: &M,
    instance: &mut I,
) -> Result<bool> {
    debug!("evaluator::evaluate");
    bootstrap::compile(model)?;
    if instance.is_terminated() {
        trace!("evaluator::evaluate > instance already terminated");
        return Ok(false);
    }
    let regions = child_regions_of(model, root);
    if !regions.is_empty() && regions.iter().all(|r| instance.get_current(r).is_none()) {
        return Err(ErrorKind::EvaluateBeforeInitialise.into());
    }
    for region in &regions {
        if evaluate_region(model, region, Some(message), instance)? {
            return Ok(true);
        }
    }
    Ok(false)
}

// ------------------------------------------------------------------------------------------------
// Selection
// ------------------------------------------------------------------------------------------------

/// Offers `message` to whatever is currently active in `region`, per the recursive rule: a
/// composite/orthogonal state first offers the message to each child region in declared order,
/// then attempts selection at itself.
fn evaluate_region<M, I: Instance>(
    model: &Model<M, I>,
    region: &ID,
    message: Option<&M>,
    instance: &mut I,
) -> Result<bool> {
    let current = match instance.get_current(region) {
        Some(v) => v,
        None => return Ok(false),
    };
    evaluate_state(model, &current, message, instance)
}

fn evaluate_state<M, I: Instance>(
    model: &Model<M, I>,
    state: &ID,
    message: Option<&M>,
    instance: &mut I,
) -> Result<bool> {
    for region in child_regions_of(model, state) {
        if evaluate_region(model, &region, message, instance)? {
            // the region-consuming transition may have landed on a `FinalState`, completing
            // this state without ever going through `enter_directed`/`enter_state_with_history`
            // — re-check completion here so that case fires its completion transition too.
            try_completion_cascade(model, state, instance)?;
            return Ok(true);
        }
    }
    if let Some(transition) = select_first_match(model, state, message, instance) {
        run_traverse(model, &transition, message, instance)?;
        return Ok(true);
    }
    Ok(false)
}

/// Selection at a plain state or pseudo state: the first non-else transition whose guard
/// accepts `message` wins (§4.4's tie-break — first satisfied non-else wins); if none match,
/// the else transition (if any) wins. A missing guard is an unconditional match. Does not
/// handle Choice/Junction branching, which have their own dedicated selectors in
/// [`enter_pseudo_state`] — Junction is the only vertex kind where an ambiguous match is an
/// error rather than resolved by declaration order.
fn select_first_match<M, I>(
    model: &Model<M, I>,
    vertex: &ID,
    message: Option<&M>,
    instance: &I,
) -> Option<ID> {
    let outbound = outbound_of(model, vertex);
    let transitions = model.transitions.borrow();
    let mut else_branch = None;
    for id in &outbound {
        let t = transitions.get(id).expect("outbound transition exists");
        if t.is_else {
            else_branch.get_or_insert_with(|| id.clone());
            continue;
        }
        let matched = match &t.guard {
            Some(guard) => guard(message, instance),
            None => true,
        };
        if matched {
            trace!("evaluator::select_first_match > guard matched");
            return Some(id.clone());
        }
    }
    else_branch
}

// ------------------------------------------------------------------------------------------------
// Traverse
// ------------------------------------------------------------------------------------------------

fn run_traverse<M, I: Instance>(
    model: &Model<M, I>,
    transition: &ID,
    message: Option<&M>,
    instance: &mut I,
) -> Result<()> {
    let compiled = {
        let transitions = model.transitions.borrow();
        let t = transitions.get(transition).expect("transition exists");
        t.compiled
            .borrow()
            .clone()
            .expect("bootstrap compiled every transition")
    };
    debug!("evaluator::run_traverse kind={:?}", compiled.kind);

    if compiled.kind == TransitionKind::Internal {
        run_effects(model, transition, message, instance);
        return Ok(());
    }

    if let Some(exit) = &compiled.exit {
        leave_state(model, exit, message, instance);
    }
    run_effects(model, transition, message, instance);
    if !compiled.entry_chain.is_empty() || compiled.target_pseudo.is_some() {
        enter_directed(
            model,
            message,
            instance,
            &compiled.entry_chain,
            0,
            compiled.target_pseudo.as_ref(),
        )?;
    }
    Ok(())
}

fn run_effects<M, I>(model: &Model<M, I>, transition: &ID, message: Option<&M>, instance: &mut I) {
    let effects = {
        let transitions = model.transitions.borrow();
        transitions
            .get(transition)
            .expect("transition exists")
            .effects
            .clone()
    };
    for effect in &effects {
        effect(message, instance, false);
    }
}

/// Exits `state`: if composite/orthogonal, recursively exits whatever is currently active in
/// every child region first (innermost-first), then runs this state's own exit actions.
fn leave_state<M, I: Instance>(model: &Model<M, I>, state: &ID, message: Option<&M>, instance: &mut I) {
    debug!("evaluator::leave_state");
    for region in child_regions_of(model, state) {
        if let Some(child) = instance.get_current(&region) {
            leave_state(model, &child, message, instance);
        }
    }
    let exit_actions = {
        let states = model.states.borrow();
        states.get(state).expect("state exists").exit.clone()
    };
    for action in &exit_actions {
        action(message, instance, false);
    }
}

/// Enters every state in `path` top-down (outermost first). Child regions not on the path are
/// entered via their own initial/history pointer; the region that owns `path[i + 1]` (or, at the
/// end of the path, `target_pseudo`) is entered directly rather than through its initial pointer
/// — that is what makes this a *directed* entry rather than a default one. Completion is
/// evaluated for a state only once every one of its child regions — directed or not — has
/// settled, which this recursion gives for free: the directed branch's own completion check
/// always runs (as that call returns) before this level's.
fn enter_directed<M, I: Instance>(
    model: &Model<M, I>,
    message: Option<&M>,
    instance: &mut I,
    path: &[ID],
    index: usize,
    target_pseudo: Option<&ID>,
) -> Result<()> {
    if index == path.len() {
        if let Some(pseudo) = target_pseudo {
            return enter_pseudo_state(model, pseudo, message, instance);
        }
        return Ok(());
    }

    let state = &path[index];
    debug!("evaluator::enter_directed");
    let entry_actions = {
        let states = model.states.borrow();
        states.get(state).expect("state exists").entry.clone()
    };
    for action in &entry_actions {
        action(message, instance, false);
    }
    if let Some(parent) = model.parent_region_of(state) {
        instance.set_current(&parent, state);
    }

    let regions = child_regions_of(model, state);
    if !regions.is_empty() {
        let next_hop = if index + 1 < path.len() {
            Some(path[index + 1].clone())
        } else {
            target_pseudo.cloned()
        };
        let directed_region = next_hop.as_ref().and_then(|v| model.parent_region_of(v));
        for region in &regions {
            if directed_region.as_ref() == Some(region) {
                enter_directed(model, message, instance, path, index + 1, target_pseudo)?;
            } else {
                enter_region(model, region, message, instance, false)?;
            }
        }
        try_completion_cascade(model, state, instance)?;
    }
    Ok(())
}

/// Enters `region`'s active child: via last-known state if `history` (the region was entered as
/// part of a deep-history cascade) or the region's own initial pointer is itself a
/// shallow/deep-history pseudo state and a last-known state has been recorded; otherwise via the
/// region's `initial` pointer, traversed unconditionally.
fn enter_region<M, I: Instance>(
    model: &Model<M, I>,
    region: &ID,
    message: Option<&M>,
    instance: &mut I,
    history: bool,
) -> Result<()> {
    debug!("evaluator::enter_region history={}", history);
    let (initial, local_kind) = {
        let regions = model.regions.borrow();
        let r = regions.get(region).expect("region exists");
        let initial = r.initial.clone().expect("region has an initial vertex");
        let kind = {
            let pseudo_states = model.pseudo_states.borrow();
            pseudo_states.get(&initial).map(|p| p.kind.clone())
        };
        (initial, kind)
    };

    let use_history = history || local_kind.as_ref().map(|k| k.is_history()).unwrap_or(false);
    if use_history {
        if let Some(last) = instance.get_current(region) {
            let propagate = history || local_kind == Some(PseudoStateKind::DeepHistory);
            return enter_state_with_history(model, &last, message, instance, propagate);
        }
    }
    enter_pseudo_state(model, &initial, message, instance)
}

/// Re-enters `state` (a last-known state restored via history), propagating `history` into its
/// own child regions so a deep-history cascade keeps restoring at every nested level.
fn enter_state_with_history<M, I: Instance>(
    model: &Model<M, I>,
    state: &ID,
    message: Option<&M>,
    instance: &mut I,
    history: bool,
) -> Result<()> {
    debug!("evaluator::enter_state_with_history");
    let entry_actions = {
        let states = model.states.borrow();
        states.get(state).expect("state exists").entry.clone()
    };
    for action in &entry_actions {
        action(message, instance, true);
    }
    if let Some(parent) = model.parent_region_of(state) {
        instance.set_current(&parent, state);
    }
    let regions = child_regions_of(model, state);
    if !regions.is_empty() {
        for region in &regions {
            enter_region(model, region, message, instance, history)?;
        }
        try_completion_cascade(model, state, instance)?;
    }
    Ok(())
}

/// Handles reaching a pseudo state during traversal: Initial traverses its single outbound
/// transition unconditionally; ShallowHistory/DeepHistory restore the owning region's
/// last-known state if one was ever recorded, else fall back to their own single outbound
/// transition exactly as Initial does; Choice and Junction branch on guards; Terminate sets
/// `instance.is_terminated` and stops.
fn enter_pseudo_state<M, I: Instance>(
    model: &Model<M, I>,
    pseudo: &ID,
    message: Option<&M>,
    instance: &mut I,
) -> Result<()> {
    let kind = {
        let pseudo_states = model.pseudo_states.borrow();
        pseudo_states.get(pseudo).expect("pseudo state exists").kind.clone()
    };
    debug!("evaluator::enter_pseudo_state kind={:?}", kind);

    match kind {
        PseudoStateKind::Terminate => {
            instance.set_terminated(true);
            return Ok(());
        }
        PseudoStateKind::ShallowHistory | PseudoStateKind::DeepHistory => {
            let region = model.parent_region_of(pseudo).expect("pseudo state has a parent region");
            if let Some(last) = instance.get_current(&region) {
                let propagate = kind == PseudoStateKind::DeepHistory;
                return enter_state_with_history(model, &last, message, instance, propagate);
            }
            let outbound = outbound_of(model, pseudo);
            if outbound.len() != 1 {
                return Err(ErrorKind::AmbiguousSelection(model.name_of(pseudo)).into());
            }
            return run_traverse(model, &outbound[0], message, instance);
        }
        PseudoStateKind::Initial => {
            let outbound = outbound_of(model, pseudo);
            if outbound.len() != 1 {
                return Err(ErrorKind::AmbiguousSelection(model.name_of(pseudo)).into());
            }
            return run_traverse(model, &outbound[0], message, instance);
        }
        PseudoStateKind::Choice => {
            let selected = select_first_match(model, pseudo, message, instance);
            match selected {
                Some(transition) => return run_traverse(model, &transition, message, instance),
                None => return Err(ErrorKind::ChoiceNoMatch(model.name_of(pseudo)).into()),
            }
        }
        PseudoStateKind::Junction => {
            let outbound = outbound_of(model, pseudo);
            let transitions = model.transitions.borrow();
            let mut matches = Vec::new();
            let mut else_branch = None;
            for id in &outbound {
                let t = transitions.get(id).expect("outbound transition exists");
                if t.is_else {
                    else_branch.get_or_insert_with(|| id.clone());
                    continue;
                }
                let matched = match &t.guard {
                    Some(guard) => guard(message, instance),
                    None => true,
                };
                if matched {
                    matches.push(id.clone());
                }
            }
            drop(transitions);
            match matches.len() {
                1 => return run_traverse(model, &matches[0], message, instance),
                0 => match else_branch {
                    Some(id) => return run_traverse(model, &id, message, instance),
                    None => return Err(ErrorKind::ChoiceNoMatch(model.name_of(pseudo)).into()),
                },
                _ => return Err(ErrorKind::JunctionAmbiguous(model.name_of(pseudo)).into()),
            }
        }
    }
}

/// Fires `state`'s own completion transition (selected with `message = None`) if every child
/// region is complete — current vertex is a final state. Called both after entering a
/// composite/orthogonal state (`enter_directed`/`enter_state_with_history`) and after a
/// region-consuming transition leaves a child region complete without re-entering `state` itself
/// (`evaluate_state`). The cascade continues naturally: running the selected transition may
/// itself enter another composite state whose entry call ends with another completion check.
fn try_completion_cascade<M, I: Instance>(model: &Model<M, I>, state: &ID, instance: &mut I) -> Result<()> {
    let regions = child_regions_of(model, state);
    if regions.is_empty() {
        return Ok(());
    }
    for region in &regions {
        if !is_region_complete(model, region, instance) {
            return Ok(());
        }
    }
    debug!("evaluator::try_completion_cascade > all child regions complete");
    if let Some(transition) = select_first_match(model, state, None, instance) {
        run_traverse(model, &transition, None, instance)?;
    }
    Ok(())
}

fn is_region_complete<M, I: Instance>(model: &Model<M, I>, region: &ID, instance: &I) -> bool {
    match instance.get_current(region) {
        Some(state) => {
            let states = model.states.borrow();
            states.get(&state).map(|s| s.is_final).unwrap_or(false)
        }
        None => false,
    }
}

// ------------------------------------------------------------------------------------------------
// Small arena accessors shared by the functions above
// ------------------------------------------------------------------------------------------------

fn child_regions_of<M, I>(model: &Model<M, I>, state: &ID) -> Vec<ID> {
    model
        .states
        .borrow()
        .get(state)
        .map(|s| s.child_regions.clone())
        .unwrap_or_default()
}

fn outbound_of<M, I>(model: &Model<M, I>, vertex: &ID) -> Vec<ID> {
    model.outbound_of(vertex)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::InMemoryInstance;
    use crate::model::types::{Model, PseudoStateKind};
    use std::rc::Rc;

    fn guard(f: impl Fn(Option<&&str>, &InMemoryInstance) -> bool + 'static) -> crate::model::types::GuardFn<&'static str, InMemoryInstance> {
        Rc::new(f)
    }

    #[test]
    fn simple_toggle() {
        // S1: Initial -> Off; Off --[on]--> On; On --[off]--> Off.
        let model: Model<&'static str, InMemoryInstance> = Model::new("default", ".");
        let root = model.new_root_state("Root");
        let region = model.ensure_region(&root);
        let initial = model
            .new_pseudo_state(&region, "Initial", PseudoStateKind::Initial)
            .unwrap();
        let off = model.new_state(&region, "Off", false);
        let on = model.new_state(&region, "On", false);

        let t0 = model.new_transition(&initial).unwrap();
        model.set_target(&t0, &off);

        let to_on = model.new_transition(&off).unwrap();
        model.set_target(&to_on, &on);
        model.set_guard(&to_on, guard(|m, _| m == Some(&"on")));

        let to_off = model.new_transition(&on).unwrap();
        model.set_target(&to_off, &off);
        model.set_guard(&to_off, guard(|m, _| m == Some(&"off")));

        bootstrap::compile(&model).unwrap();
        let mut instance = InMemoryInstance::new();
        initialise(&model, &root, &mut instance).unwrap();
        assert_eq!(instance.get_current(&region), Some(off.clone()));

        assert!(evaluate(&model, &root, &"on", &mut instance).unwrap());
        assert_eq!(instance.get_current(&region), Some(on.clone()));

        assert!(!evaluate(&model, &root, &"on", &mut instance).unwrap());

        assert!(evaluate(&model, &root, &"off", &mut instance).unwrap());
        assert_eq!(instance.get_current(&region), Some(off));
    }

    #[test]
    fn terminate_stops_further_evaluation() {
        let model: Model<&'static str, InMemoryInstance> = Model::new("default", ".");
        let root = model.new_root_state("Root");
        let region = model.ensure_region(&root);
        let initial = model
            .new_pseudo_state(&region, "Initial", PseudoStateKind::Initial)
            .unwrap();
        let s = model.new_state(&region, "S", false);
        let term = model
            .new_pseudo_state(&region, "Term", PseudoStateKind::Terminate)
            .unwrap();

        let t0 = model.new_transition(&initial).unwrap();
        model.set_target(&t0, &s);
        let to_term = model.new_transition(&s).unwrap();
        model.set_target(&to_term, &term);

        let mut instance = InMemoryInstance::new();
        initialise(&model, &root, &mut instance).unwrap();
        assert!(evaluate(&model, &root, &"die", &mut instance).unwrap());
        assert!(instance.is_terminated());
        assert!(!evaluate(&model, &root, &"anything", &mut instance).unwrap());
        // the active-state map is not cleared by termination
        assert_eq!(instance.get_current(&region), Some(s));
    }

    #[test]
    fn evaluate_before_initialise_is_an_error() {
        let model: Model<&'static str, InMemoryInstance> = Model::new("default", ".");
        let root = model.new_root_state("Root");
        let region = model.ensure_region(&root);
        model
            .new_pseudo_state(&region, "Initial", PseudoStateKind::Initial)
            .unwrap();
        model.new_state(&region, "S", false);
        let mut instance = InMemoryInstance::new();
        assert!(evaluate(&model, &root, &"go", &mut instance).is_err());
    }

    #[test]
    fn deep_history_restores_exact_leaf_when_targeted_directly() {
        // A (composite, deep-history) contains B (composite) contains B1, B2. Reach B2, leave to
        // X, then transition directly into A's DeepHistory pseudo state — configuration must
        // land back on B2, not A's (irrelevant, since A has no separate Initial) default entry.
        let model: Model<&'static str, InMemoryInstance> = Model::new("default", ".");
        let root = model.new_root_state("Root");
        let root_region = model.ensure_region(&root);
        let root_initial = model
            .new_pseudo_state(&root_region, "RootInitial", PseudoStateKind::Initial)
            .unwrap();

        let a = model.new_state(&root_region, "A", false);
        let a_region = model.ensure_region(&a);
        let deep_history = model
            .new_pseudo_state(&a_region, "DeepHistory", PseudoStateKind::DeepHistory)
            .unwrap();
        let b = model.new_state(&a_region, "B", false);
        let t_deep_history = model.new_transition(&deep_history).unwrap();
        model.set_target(&t_deep_history, &b);
        let b_region = model.ensure_region(&b);
        let b_initial = model
            .new_pseudo_state(&b_region, "BInitial", PseudoStateKind::Initial)
            .unwrap();
        let b1 = model.new_state(&b_region, "B1", false);
        let b2 = model.new_state(&b_region, "B2", false);

        let x = model.new_state(&root_region, "X", false);

        let t_root = model.new_transition(&root_initial).unwrap();
        model.set_target(&t_root, &a);
        let t_b_init = model.new_transition(&b_initial).unwrap();
        model.set_target(&t_b_init, &b1);
        let advance = model.new_transition(&b1).unwrap();
        model.set_target(&advance, &b2);
        model.set_guard(&advance, guard(|m, _| m == Some(&"advance")));
        let leave = model.new_transition(&a).unwrap();
        model.set_target(&leave, &x);
        model.set_guard(&leave, guard(|m, _| m == Some(&"leave")));
        let restore = model.new_transition(&x).unwrap();
        model.set_target(&restore, &deep_history);
        model.set_guard(&restore, guard(|m, _| m == Some(&"return")));

        let mut instance = InMemoryInstance::new();
        initialise(&model, &root, &mut instance).unwrap();
        assert!(evaluate(&model, &root, &"advance", &mut instance).unwrap());
        assert_eq!(instance.get_current(&b_region), Some(b2.clone()));

        assert!(evaluate(&model, &root, &"leave", &mut instance).unwrap());
        assert_eq!(instance.get_current(&root_region), Some(x));

        assert!(evaluate(&model, &root, &"return", &mut instance).unwrap());
        assert_eq!(instance.get_current(&root_region), Some(a));
        assert_eq!(instance.get_current(&b_region), Some(b2));
    }

    #[test]
    fn completion_cascade_fires_when_region_completes_without_reentering_owner() {
        // Outer (composite) contains S --advance--> Fin (a FinalState). Outer's own completion
        // transition (guarded on the conventional no-message event) must fire the moment the
        // child region becomes complete, even though that completion is reached via an
        // intra-region transition rather than by entering Outer itself.
        let model: Model<&'static str, InMemoryInstance> = Model::new("default", ".");
        let root = model.new_root_state("Root");
        let root_region = model.ensure_region(&root);
        let root_initial = model
            .new_pseudo_state(&root_region, "RootInitial", PseudoStateKind::Initial)
            .unwrap();

        let outer = model.new_state(&root_region, "Outer", false);
        let outer_region = model.ensure_region(&outer);
        let outer_initial = model
            .new_pseudo_state(&outer_region, "Initial", PseudoStateKind::Initial)
            .unwrap();
        let s = model.new_state(&outer_region, "S", false);
        let fin = model.new_state(&outer_region, "Fin", true);
        let done = model.new_state(&root_region, "Done", false);

        let t_root = model.new_transition(&root_initial).unwrap();
        model.set_target(&t_root, &outer);
        let t_outer_init = model.new_transition(&outer_initial).unwrap();
        model.set_target(&t_outer_init, &s);
        let advance = model.new_transition(&s).unwrap();
        model.set_target(&advance, &fin);
        model.set_guard(&advance, guard(|m, _| m == Some(&"advance")));
        let completion = model.new_transition(&outer).unwrap();
        model.set_target(&completion, &done);
        model.set_guard(&completion, guard(|m, _| m.is_none()));

        let mut instance = InMemoryInstance::new();
        initialise(&model, &root, &mut instance).unwrap();
        assert_eq!(instance.get_current(&root_region), Some(outer));

        assert!(evaluate(&model, &root, &"advance", &mut instance).unwrap());
        assert_eq!(instance.get_current(&root_region), Some(done));
    }
}
