/*!
The instance-store interface and a default in-memory implementation. An instance is
everything that distinguishes one running state machine from another sharing the same model:
whether it has terminated, and which child vertex is currently active in each of its regions.

Applications that want to persist an instance externally (a database row, a serialized blob)
implement [`Instance`] themselves rather than using [`InMemoryInstance`]; the evaluator never
assumes a particular backing store.
*/

use crate::id::ID;
use std::collections::HashMap;

/// Per-instance mutable state, read and written by the evaluator as it traverses transitions.
/// Never constructed or consulted by user guard/action callbacks except through whatever extra
/// methods a concrete implementation adds alongside this trait.
pub trait Instance {
    /// Whether a `Terminate` pseudo state has been entered. Once `true`, `evaluate` always
    /// returns `false` and performs no side effects.
    fn is_terminated(&self) -> bool;

    fn set_terminated(&mut self, terminated: bool);

    /// Records `state` as the last-known active vertex of `region`. Called at the moment a
    /// state is entered.
    fn set_current(&mut self, region: &ID, state: &ID);

    /// The last-known active vertex of `region`, if any has ever been recorded. Read by history
    /// pseudo states and by the evaluator's upward walk to find the active leaf.
    fn get_current(&self, region: &ID) -> Option<ID>;
}

/// A plain in-memory [`Instance`]: a `HashMap` from region to last-known state plus a
/// terminated flag. Sufficient for tests and for applications with no persistence requirement.
#[derive(Debug, Default, Clone)]
pub struct InMemoryInstance {
    current: HashMap<ID, ID>,
    terminated: bool,
}

impl InMemoryInstance {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Instance for InMemoryInstance {
    fn is_terminated(&self) -> bool {
        self.terminated
    }

    fn set_terminated(&mut self, terminated: bool) {
        self.terminated = terminated;
    }

    fn set_current(&mut self, region: &ID, state: &ID) {
        self.current.insert(region.clone(), state.clone());
    }

    fn get_current(&self, region: &ID) -> Option<ID> {
        self.current.get(region).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_current_state_per_region() {
        let mut instance = InMemoryInstance::new();
        let region = ID::random_with_prefix("region").unwrap();
        let state = ID::random_with_prefix("state").unwrap();
        assert_eq!(instance.get_current(&region), None);
        instance.set_current(&region, &state);
        assert_eq!(instance.get_current(&region), Some(state));
    }

    #[test]
    fn terminated_flag_round_trips() {
        let mut instance = InMemoryInstance::new();
        assert!(!instance.is_terminated());
        instance.set_terminated(true);
        assert!(instance.is_terminated());
    }
}
