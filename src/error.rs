/*!
Provides a common error implementation, error kind enumeration, and constrained result type.

The four error families from the specification's error-handling design map onto
`ErrorKind` as follows:

* `ModelWellFormedness` — `DuplicateInitialPseudoState`, `FinalStateOutboundTransition`,
  `TransitionMissingSource`, `DanglingVertexReference`, `EmptyChildRegions`.
* `IllformedTransition` — `JunctionAmbiguous`, `ChoiceNoMatch`, `AmbiguousSelection`.
* `InvalidUse` — `EvaluateBeforeInitialise`. (Delivering a message to a terminated
  instance is *not* an error — `evaluate` just returns `false` — so it has no `ErrorKind`.)
* `UserCallbackFault` — not represented here. A panicking guard or action unwinds
  through `evaluate` uninterpreted; wrapping that in an `Error` would mean catching
  the unwind, which the source material never asks for.
*/

error_chain! {
    errors {
        #[doc = "A region already has an Initial/ShallowHistory/DeepHistory pseudo state."]
        DuplicateInitialPseudoState(region: String) {
            description("a region may have at most one Initial/ShallowHistory/DeepHistory pseudo state")
            display("region '{}' already has an initial-family pseudo state", region)
        }

        #[doc = "An outbound transition was attached to a `FinalState`."]
        FinalStateOutboundTransition(state: String) {
            description("a final state may not have outbound transitions")
            display("state '{}' is final and may not have outbound transitions", state)
        }

        #[doc = "A transition was built with no source vertex."]
        TransitionMissingSource {
            description("a transition must have a source vertex")
            display("a transition must have a source vertex")
        }

        #[doc = "An outbound transition was attached to a Terminate pseudo state."]
        TerminateOutboundTransition(id: String) {
            description("a Terminate pseudo state may not have outbound transitions")
            display("pseudo state '{}' is Terminate and may not have outbound transitions", id)
        }

        #[doc = "A transition or vertex reference points at an element not attached to the model."]
        DanglingVertexReference(id: String) {
            description("a referenced vertex is not attached to the model")
            display("vertex '{}' is not attached to the model", id)
        }

        #[doc = "A composite/orthogonal state declares a region with no vertices in it."]
        EmptyChildRegions(state: String) {
            description("a composite/orthogonal state's regions may not be empty")
            display("state '{}' declares a region with no vertices", state)
        }

        #[doc = "A Junction pseudo state has more than one satisfied guard and no else-transition."]
        JunctionAmbiguous(id: String) {
            description("a junction with more than one satisfied guard must have no other matches, or an else")
            display("junction '{}' has more than one satisfied guard and no else-transition", id)
        }

        #[doc = "A Choice or Junction pseudo state has no satisfied guard and no else-transition."]
        ChoiceNoMatch(id: String) {
            description("a choice/junction with no satisfied guard must have an else-transition")
            display("pseudo state '{}' matched no guard and has no else-transition", id)
        }

        #[doc = "Selection at a non-Choice vertex produced more than one candidate."]
        AmbiguousSelection(id: String) {
            description("selection at a non-choice vertex must yield at most one transition")
            display("vertex '{}' selection is ambiguous", id)
        }

        #[doc = "`evaluate` was called on an instance that was never `initialise`d."]
        EvaluateBeforeInitialise {
            description("evaluate requires a prior call to initialise")
            display("instance has not been initialised")
        }
    }
}
