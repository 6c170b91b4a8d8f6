/*!
A reasonably faithful implementation of the [Unified Modeling Language (UML)](http://uml.org/) State Machine.

The goal is to not just provide another state machine crate but to do so with a formal specification
that describes the description and execution semantics. This implementation is based upon the
[2.5.1](https://www.omg.org/spec/UML/2.5.1/PDF) version, dated 5th December 2017. The following
image is from §14.2.2 **Abstract Syntax** and provides a very useful overview of the components
of the model. As such, wherever possible the text of the documentation will reference the
specification, especially copies of the constraints and semantic rules.

A model is a tree of regions, states, pseudo states and transitions, built once via the fluent
[`StateMachine`] builder. One model may back many running instances: call [`StateMachine::initialise`]
to give an [`instance::Instance`] its starting configuration, then [`StateMachine::evaluate`] to
deliver it messages one at a time.

# Example

```rust
use uml_hsm::{PseudoStateKind, StateMachine};
use uml_hsm::instance::InMemoryInstance;
use std::rc::Rc;

let machine: StateMachine<&str, InMemoryInstance> = StateMachine::new("Toggle");
let region = machine.root_region();
let initial = region.pseudo_state("Initial", PseudoStateKind::Initial).unwrap();
let off = region.state("Off");
let on = region.state("On");

initial.to(Some(&off)).unwrap();
off.to(Some(&on)).unwrap().when(Rc::new(|m: Option<&&str>, _: &InMemoryInstance| m == Some(&"on")));
on.to(Some(&off)).unwrap().when(Rc::new(|m: Option<&&str>, _: &InMemoryInstance| m == Some(&"off")));

let mut instance = InMemoryInstance::new();
machine.initialise(&mut instance).unwrap();
assert_eq!(off.name(), "Off");

assert!(machine.evaluate(&"on", &mut instance).unwrap());
assert!(!machine.evaluate(&"on", &mut instance).unwrap());
assert!(machine.evaluate(&"off", &mut instance).unwrap());
```

# See Also

* [OMG Unified Modeling Language, Version 2.5.1](https://www.omg.org/spec/UML/2.5.1/PDF)
* [State Diagram (Wikipedia)](https://en.wikipedia.org/wiki/State_diagram)
* [UML State Machine (Wikipedia)](https://en.wikipedia.org/wiki/UML_state_machine)
* [StateMachines: A Visual Formalism for Complex Systems](https://www.inf.ed.ac.uk/teaching/courses/seoc/2005_2006/resources/StateMachines.pdf)
* [State Chart XML (SCXML): State Machine Notation for Control Abstraction](https://www.w3.org/TR/scxml/)
* [JavaScript state machines and StateMachines](https://xstate.js.org/)

*/

#![warn(
    // ---------- Stylistic
    future_incompatible,
    nonstandard_style,
    rust_2018_idioms,
    trivial_casts,
    trivial_numeric_casts,
    // ---------- Public
    // missing_debug_implementations,
    // missing_docs,
    unreachable_pub,
    // ---------- Unsafe
    unsafe_code,
    // ---------- Unused
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications,
    unused_results,
)]

#[macro_use]
extern crate error_chain;

#[macro_use]
extern crate log;

// ------------------------------------------------------------------------------------------------
// Modules
// ------------------------------------------------------------------------------------------------

pub mod error;

pub mod id;

pub mod instance;

mod evaluator;

mod model;

pub mod visitor;

pub use model::handles::{PseudoState, Region, State, StateMachine, Transition, VertexHandle};
pub use model::types::{ActionFn, GuardFn, PseudoStateKind, TransitionKind};
