/*!
Ancestry, least-common-ancestor and transition classification. Every function here reads
the arena but never mutates it — it exists to let the bootstrap compiler turn tree
structure into the flat `exit`/`entry_chain` steps a transition executes at evaluation time.
*/

use super::types::{CompiledTransition, Model, TransitionKind, VertexKind};
use crate::id::ID;

/// The chain of states from the root `StateMachine` down to `vertex`, root-first. If `vertex`
/// is a `State` it is the *last* element of its own chain; if it is a `PseudoState` the chain
/// ends at the state that directly owns its region — the pseudo state itself is never a state
/// and so never appears.
pub(crate) fn state_chain<M, I>(model: &Model<M, I>, vertex: &ID) -> Vec<ID> {
    let mut current_state = match model.vertex_kind(vertex) {
        Some(VertexKind::State) => Some(vertex.clone()),
        Some(VertexKind::PseudoState) => model
            .parent_region_of(vertex)
            .and_then(|region| model.owner_state_of(&region)),
        None => None,
    };

    let mut chain = Vec::new();
    while let Some(state) = current_state {
        chain.push(state.clone());
        let is_root = model
            .states
            .borrow()
            .get(&state)
            .map(|s| s.is_root)
            .unwrap_or(true);
        if is_root {
            break;
        }
        current_state = model
            .parent_region_of(&state)
            .and_then(|region| model.owner_state_of(&region));
    }
    chain.reverse();
    chain
}

/// Classifies a transition: local if either endpoint's state chain contains the other vertex,
/// internal if there is no target, external otherwise.
pub(crate) fn classify_transition<M, I>(
    model: &Model<M, I>,
    source: &ID,
    target: Option<&ID>,
) -> TransitionKind {
    let target = match target {
        None => return TransitionKind::Internal,
        Some(t) => t,
    };
    let source_chain = state_chain(model, source);
    let target_chain = state_chain(model, target);
    if target_chain.contains(source) || source_chain.contains(target) {
        TransitionKind::Local
    } else {
        TransitionKind::External
    }
}

/// Computes the `exit`/`entry_chain`/`target_pseudo` triple the evaluator needs to traverse a
/// transition. `source` and `target` are assumed already well-formed (no dangling references) —
/// the bootstrap compiler checks that before calling in.
pub(crate) fn compile_traversal<M, I>(
    model: &Model<M, I>,
    source: &ID,
    target: Option<&ID>,
) -> CompiledTransition {
    let target = match target {
        None => {
            return CompiledTransition {
                kind: TransitionKind::Internal,
                exit: None,
                entry_chain: Vec::new(),
                target_pseudo: None,
            }
        }
        Some(t) => t,
    };

    let source_chain = state_chain(model, source);
    let target_chain = state_chain(model, target);
    let target_is_pseudo = matches!(model.vertex_kind(target), Some(VertexKind::PseudoState));

    if target_chain.contains(source) {
        // Local, source is source's own ancestor (or itself): source is not exited; enter
        // every state strictly below source down to (and including, if a State) target.
        let idx = target_chain.iter().position(|s| s == source).expect("contains checked");
        let entry_chain = target_chain[idx + 1..].to_vec();
        return CompiledTransition {
            kind: TransitionKind::Local,
            exit: None,
            entry_chain,
            target_pseudo: if target_is_pseudo { Some(target.clone()) } else { None },
        };
    }

    if source_chain.contains(target) {
        // Local, target is an ancestor of source: nothing is entered (target is already
        // active). `leaveState` on the immediate child of target recurses down to whatever is
        // currently active and exits it innermost-first, then exits that immediate child itself.
        let idx = source_chain.iter().position(|s| s == target).expect("contains checked");
        let exit = source_chain.get(idx + 1).cloned();
        return CompiledTransition {
            kind: TransitionKind::Local,
            exit,
            entry_chain: Vec::new(),
            target_pseudo: None,
        };
    }

    // External: find the longest common prefix of the two state chains; the divergence point
    // is the single state to exit (its own `leaveState` recurses through whatever is active
    // beneath it) and the remaining target-side suffix is the directed entry path.
    let common_len = source_chain
        .iter()
        .zip(target_chain.iter())
        .take_while(|(a, b)| a == b)
        .count();
    let exit = source_chain.get(common_len).cloned();
    let entry_chain = target_chain[common_len..].to_vec();
    CompiledTransition {
        kind: TransitionKind::External,
        exit,
        entry_chain,
        target_pseudo: if target_is_pseudo { Some(target.clone()) } else { None },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::PseudoStateKind;

    fn sample() -> (Model<(), ()>, ID, ID, ID, ID, ID) {
        let model: Model<(), ()> = Model::new("default", ".");
        let root = model.new_root_state("Root");
        let root_region = model.ensure_region(&root);
        let outer = model.new_state(&root_region, "Outer", false);
        let outer_region = model.ensure_region(&outer);
        let inner1 = model.new_state(&outer_region, "Inner1", false);
        let inner2 = model.new_state(&outer_region, "Inner2", false);
        let sibling = model.new_state(&root_region, "Sibling", false);
        (model, root, outer, inner1, inner2, sibling)
    }

    #[test]
    fn siblings_are_external() {
        let (model, _root, _outer, inner1, inner2, _sibling) = sample();
        assert_eq!(
            classify_transition(&model, &inner1, Some(&inner2)),
            TransitionKind::External
        );
    }

    #[test]
    fn cross_composite_is_external_and_exits_the_composite() {
        let (model, _root, outer, inner2, _unused, sibling) = sample();
        let compiled = compile_traversal(&model, &inner2, Some(&sibling));
        assert_eq!(compiled.kind, TransitionKind::External);
        assert_eq!(compiled.exit, Some(outer));
    }

    #[test]
    fn transition_into_own_descendant_is_local() {
        let (model, _root, outer, inner1, _inner2, _sibling) = sample();
        let compiled = compile_traversal(&model, &outer, Some(&inner1));
        assert_eq!(compiled.kind, TransitionKind::Local);
        assert_eq!(compiled.exit, None);
        assert_eq!(compiled.entry_chain, vec![inner1]);
    }

    #[test]
    fn no_target_is_internal() {
        let (model, _root, _outer, inner1, _inner2, _sibling) = sample();
        let compiled = compile_traversal(&model, &inner1, None);
        assert_eq!(compiled.kind, TransitionKind::Internal);
        assert!(compiled.entry_chain.is_empty());
    }

    #[test]
    fn pseudo_state_target_is_recorded_separately() {
        let (model, _root, outer, _inner1, _inner2, _sibling) = sample();
        let region = model.ensure_region(&outer);
        let choice = model
            .new_pseudo_state(&region, "C", PseudoStateKind::Choice)
            .unwrap();
        let compiled = compile_traversal(&model, &outer, Some(&choice));
        assert_eq!(compiled.target_pseudo, Some(choice));
    }
}
