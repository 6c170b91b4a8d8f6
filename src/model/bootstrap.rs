/*!
The bootstrap compiler. Walks the whole arena once, checks the well-formedness
invariants that can be checked without a message or an instance, and attaches a
[`CompiledTransition`](super::types::CompiledTransition) to every transition. Idempotent: if the
model is not dirty, `compile` is a no-op.
*/

use super::ancestry::compile_traversal;
use super::types::Model;
use crate::error::{ErrorKind, Result};

/// Compiles `model` if dirty. Safe to call any number of times; the second and subsequent
/// calls before the next mutation do nothing.
pub(crate) fn compile<M, I>(model: &Model<M, I>) -> Result<()> {
    if !model.is_dirty() {
        return Ok(());
    }

    check_well_formed(model)?;

    let ids: Vec<_> = model.transitions.borrow().keys().cloned().collect();
    for id in ids {
        let (source, target) = {
            let transitions = model.transitions.borrow();
            let t = transitions.get(&id).expect("just collected");
            (t.source.clone(), t.target.clone())
        };
        let compiled = compile_traversal(model, &source, target.as_ref());
        model
            .transitions
            .borrow()
            .get(&id)
            .expect("just collected")
            .compiled
            .replace(Some(compiled));
    }

    model.clear_dirty();
    Ok(())
}

fn check_well_formed<M, I>(model: &Model<M, I>) -> Result<()> {
    for state in model.states.borrow().values() {
        for region in &state.child_regions {
            let regions = model.regions.borrow();
            let region_data = regions.get(region).expect("region exists");
            if region_data.vertices.is_empty() {
                return Err(ErrorKind::EmptyChildRegions(state.name.clone()).into());
            }
        }
    }

    for transition in model.transitions.borrow().values() {
        if model.vertex_kind(&transition.source).is_none() {
            return Err(ErrorKind::DanglingVertexReference(transition.source.to_string()).into());
        }
        if let Some(target) = &transition.target {
            if model.vertex_kind(target).is_none() {
                return Err(ErrorKind::DanglingVertexReference(target.to_string()).into());
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::PseudoStateKind;

    #[test]
    fn compile_is_idempotent() {
        let model: Model<(), ()> = Model::new("default", ".");
        let root = model.new_root_state("Root");
        let region = model.ensure_region(&root);
        let initial = model
            .new_pseudo_state(&region, "Initial", PseudoStateKind::Initial)
            .unwrap();
        let off = model.new_state(&region, "Off", false);
        let transition = model.new_transition(&initial).unwrap();
        model.set_target(&transition, &off);

        compile(&model).unwrap();
        assert!(!model.is_dirty());
        let first: Vec<_> = model
            .transitions
            .borrow()
            .values()
            .map(|t| t.compiled.borrow().clone())
            .collect();

        compile(&model).unwrap();
        let second: Vec<_> = model
            .transitions
            .borrow()
            .values()
            .map(|t| t.compiled.borrow().clone())
            .collect();
        assert_eq!(
            format!("{:?}", first),
            format!("{:?}", second)
        );
    }

    #[test]
    fn empty_child_region_is_rejected() {
        let model: Model<(), ()> = Model::new("default", ".");
        let root = model.new_root_state("Root");
        let region = model.ensure_region(&root);
        let outer = model.new_state(&region, "Outer", false);
        model.ensure_region(&outer);
        assert!(compile(&model).is_err());
    }
}
