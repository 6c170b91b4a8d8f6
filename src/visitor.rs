/*!
Generic double-dispatch traversal of a model tree (§4.6), for external tooling — diagram
generators, validators, anything that wants to walk the tree without re-deriving ownership and
hierarchy. Never called by [`crate::evaluator`]; `accept`/`Visitor` are a read-only side door.

Every model element kind routes to its own `Visitor` method; every method has a default that
falls back to [`Visitor::visit_element`], so a visitor that only cares about, say, pseudo
states can override `visit_pseudo_state` and leave everything else as the generic fallback.
*/

use crate::model::handles::{PseudoState, Region, RegionVertex, State, StateMachine, Transition};

/// Implemented by tooling that wants to walk a model tree via [`StateMachine::accept`]. `A` is
/// whatever accumulator or context the visitor needs threaded through the walk (a `String`
/// buffer for a diagram writer, a `Vec` of collected errors for a validator, `()` if nothing is
/// needed).
#[allow(unused_variables)]
pub trait Visitor<M, I, A> {
    fn visit_state_machine(&mut self, machine: &StateMachine<M, I>, arg: &mut A) {
        self.visit_element(&machine.qualified_name(), arg);
    }

    fn visit_region(&mut self, region: &Region<M, I>, arg: &mut A) {
        self.visit_element(&region.qualified_name(), arg);
    }

    fn visit_state(&mut self, state: &State<M, I>, arg: &mut A) {
        self.visit_element(&state.qualified_name(), arg);
    }

    fn visit_final_state(&mut self, state: &State<M, I>, arg: &mut A) {
        self.visit_element(&state.qualified_name(), arg);
    }

    fn visit_pseudo_state(&mut self, pseudo_state: &PseudoState<M, I>, arg: &mut A) {
        self.visit_element(&pseudo_state.qualified_name(), arg);
    }

    fn visit_transition(&mut self, transition: &Transition<M, I>, arg: &mut A) {
        let _ = transition;
        let _ = arg;
    }

    /// Generic element handling every other default routes through.
    fn visit_element(&mut self, qualified_name: &str, arg: &mut A) {
        let _ = qualified_name;
        let _ = arg;
    }
}

impl<M, I> StateMachine<M, I> {
    /// The entry point named by §4.6: visits the root, then recursively every region, vertex
    /// and transition beneath it, in declaration order.
    pub fn accept<A>(&self, visitor: &mut dyn Visitor<M, I, A>, arg: &mut A) {
        visitor.visit_state_machine(self, arg);
        for region in self.root_regions() {
            accept_region(&region, visitor, arg);
        }
    }
}

fn accept_region<M, I, A>(region: &Region<M, I>, visitor: &mut dyn Visitor<M, I, A>, arg: &mut A) {
    visitor.visit_region(region, arg);
    for vertex in region.vertices() {
        match vertex {
            RegionVertex::State(state) => accept_state(&state, visitor, arg),
            RegionVertex::PseudoState(pseudo_state) => accept_pseudo_state(&pseudo_state, visitor, arg),
        }
    }
}

fn accept_state<M, I, A>(state: &State<M, I>, visitor: &mut dyn Visitor<M, I, A>, arg: &mut A) {
    if state.is_final() {
        visitor.visit_final_state(state, arg);
    } else {
        visitor.visit_state(state, arg);
    }
    for region in state.child_regions() {
        accept_region(&region, visitor, arg);
    }
    for transition in state.outbound_transitions() {
        visitor.visit_transition(&transition, arg);
    }
}

fn accept_pseudo_state<M, I, A>(pseudo_state: &PseudoState<M, I>, visitor: &mut dyn Visitor<M, I, A>, arg: &mut A) {
    visitor.visit_pseudo_state(pseudo_state, arg);
    for transition in pseudo_state.outbound_transitions() {
        visitor.visit_transition(&transition, arg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::InMemoryInstance;
    use crate::PseudoStateKind;

    struct Counter {
        states: usize,
        pseudo_states: usize,
        regions: usize,
        transitions: usize,
    }

    impl<M, I> Visitor<M, I, ()> for Counter {
        fn visit_state(&mut self, _state: &State<M, I>, _arg: &mut ()) {
            self.states += 1;
        }

        fn visit_final_state(&mut self, _state: &State<M, I>, _arg: &mut ()) {
            self.states += 1;
        }

        fn visit_pseudo_state(&mut self, _pseudo_state: &PseudoState<M, I>, _arg: &mut ()) {
            self.pseudo_states += 1;
        }

        fn visit_region(&mut self, _region: &Region<M, I>, _arg: &mut ()) {
            self.regions += 1;
        }

        fn visit_transition(&mut self, _transition: &Transition<M, I>, _arg: &mut ()) {
            self.transitions += 1;
        }
    }

    #[test]
    fn walks_every_element_once() {
        let machine: StateMachine<&str, InMemoryInstance> = StateMachine::new("Toggle");
        let region = machine.root_region();
        let initial = region.pseudo_state("Initial", PseudoStateKind::Initial).unwrap();
        let off = region.state("Off");
        let on = region.state("On");
        initial.to(Some(&off)).unwrap();
        off.to(Some(&on)).unwrap();
        on.to(Some(&off)).unwrap();

        let mut counter = Counter {
            states: 0,
            pseudo_states: 0,
            regions: 0,
            transitions: 0,
        };
        machine.accept(&mut counter, &mut ());

        assert_eq!(counter.regions, 1);
        assert_eq!(counter.states, 2);
        assert_eq!(counter.pseudo_states, 1);
        assert_eq!(counter.transitions, 3);
    }

    #[test]
    fn default_methods_fall_back_to_generic_element_handling() {
        struct NameCollector(Vec<String>);
        impl<M, I> Visitor<M, I, ()> for NameCollector {
            fn visit_element(&mut self, qualified_name: &str, _arg: &mut ()) {
                self.0.push(qualified_name.to_string());
            }
        }

        let machine: StateMachine<&str, InMemoryInstance> = StateMachine::new("Root");
        let region = machine.root_region();
        let _initial = region.pseudo_state("Initial", PseudoStateKind::Initial).unwrap();
        let _s = region.state("S");

        let mut collector = NameCollector(Vec::new());
        machine.accept(&mut collector, &mut ());

        assert!(collector.0.iter().any(|n| n == "Root"));
        assert!(collector.0.iter().any(|n| n == "Root.region"));
        assert!(collector.0.iter().any(|n| n == "Root.S"));
    }
}
