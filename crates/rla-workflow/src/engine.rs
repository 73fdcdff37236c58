//! Generic state-machine engine.
//!
//! Evaluates (state, event) pairs against an immutable transition table
//! supplied at construction. The engine holds no domain knowledge; the
//! concrete workflow modules in this crate supply the tables. Tables are
//! built once and shared read-only for the life of the process.

use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;
use thiserror::Error;

/// Errors that can occur while stepping a workflow machine.
#[derive(Debug, Error)]
pub enum WorkflowError {
	/// The requested event is not legal from the machine's current state.
	/// Never retried automatically; the machine is left unchanged.
	#[error("illegal transition in workflow {workflow}: no transition from {state} on {event}")]
	IllegalTransition {
		workflow: &'static str,
		state: String,
		event: String,
	},
}

/// An immutable workflow: a named transition table with a distinguished
/// initial state and a set of final states.
///
/// Multiple transitions may share a from-state with different events, but
/// each (state, event) pair maps to exactly one target state; a duplicate
/// pair in the input is a programming error and panics at construction.
pub struct WorkflowDefinition<S, E> {
	name: &'static str,
	initial: S,
	finals: HashSet<S>,
	table: HashMap<(S, E), S>,
}

impl<S, E> WorkflowDefinition<S, E>
where
	S: Copy + Eq + Hash + Debug,
	E: Clone + Eq + Hash + Debug,
{
	/// Builds a definition from (from, event, to) triples.
	pub fn new(
		name: &'static str,
		initial: S,
		finals: &[S],
		transitions: Vec<(S, E, S)>,
	) -> Self {
		let mut table = HashMap::with_capacity(transitions.len());
		for (from, event, to) in transitions {
			if let Some(previous) = table.insert((from, event.clone()), to) {
				panic!(
					"workflow {}: duplicate transition from {:?} on {:?} (to {:?} and {:?})",
					name, from, event, previous, to
				);
			}
		}
		Self {
			name,
			initial,
			finals: finals.iter().copied().collect(),
			table,
		}
	}

	/// The workflow's name, used in logs and errors.
	pub fn name(&self) -> &'static str {
		self.name
	}

	/// The workflow's initial state.
	pub fn initial_state(&self) -> S {
		self.initial
	}

	/// Whether the given state is declared final for this workflow.
	pub fn is_final(&self, state: S) -> bool {
		self.finals.contains(&state)
	}

	/// The target state for (from, event), if the pair is in the table.
	pub fn next(&self, from: S, event: &E) -> Option<S> {
		self.table.get(&(from, event.clone())).copied()
	}
}

/// One machine instance: a current state bound to its workflow definition.
///
/// Instances are created in the workflow's initial state, or rehydrated
/// from a persisted state via `with_state`. Mutation happens only through
/// `step`, which either applies a table transition or fails leaving the
/// instance untouched.
#[derive(Clone)]
pub struct Machine<S: 'static, E: 'static> {
	definition: &'static WorkflowDefinition<S, E>,
	current: S,
}

impl<S, E> Machine<S, E>
where
	S: Copy + Eq + Hash + Debug,
	E: Clone + Eq + Hash + Debug,
{
	/// Creates an instance in the workflow's initial state.
	pub fn new(definition: &'static WorkflowDefinition<S, E>) -> Self {
		Self {
			definition,
			current: definition.initial_state(),
		}
	}

	/// Rehydrates an instance from a persisted state.
	pub fn with_state(definition: &'static WorkflowDefinition<S, E>, state: S) -> Self {
		Self {
			definition,
			current: state,
		}
	}

	/// The current state.
	pub fn current_state(&self) -> S {
		self.current
	}

	/// Whether the instance is still in the workflow's initial state.
	pub fn is_in_initial_state(&self) -> bool {
		self.current == self.definition.initial_state()
	}

	/// Whether the instance has reached a final state.
	pub fn is_in_final_state(&self) -> bool {
		self.definition.is_final(self.current)
	}

	/// Applies the given event. Returns the new state, or
	/// `WorkflowError::IllegalTransition` with the instance unchanged if
	/// the (state, event) pair is not in the table.
	pub fn step(&mut self, event: &E) -> Result<S, WorkflowError> {
		match self.definition.next(self.current, event) {
			Some(next) => {
				tracing::debug!(
					workflow = self.definition.name(),
					from = ?self.current,
					event = ?event,
					to = ?next,
					"workflow transition"
				);
				self.current = next;
				Ok(next)
			}
			None => Err(WorkflowError::IllegalTransition {
				workflow: self.definition.name(),
				state: format!("{:?}", self.current),
				event: format!("{:?}", event),
			}),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use once_cell::sync::Lazy;

	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
	enum TestState {
		Start,
		Middle,
		Done,
	}

	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
	enum TestEvent {
		Go,
		Finish,
	}

	static DEFINITION: Lazy<WorkflowDefinition<TestState, TestEvent>> = Lazy::new(|| {
		WorkflowDefinition::new(
			"test",
			TestState::Start,
			&[TestState::Done],
			vec![
				(TestState::Start, TestEvent::Go, TestState::Middle),
				(TestState::Middle, TestEvent::Finish, TestState::Done),
			],
		)
	});

	#[test]
	fn step_follows_the_table() {
		let mut machine = Machine::new(&DEFINITION);
		assert!(machine.is_in_initial_state());
		assert_eq!(machine.step(&TestEvent::Go).unwrap(), TestState::Middle);
		assert_eq!(machine.step(&TestEvent::Finish).unwrap(), TestState::Done);
		assert!(machine.is_in_final_state());
	}

	#[test]
	fn illegal_transition_leaves_state_unchanged() {
		let mut machine = Machine::new(&DEFINITION);
		let err = machine.step(&TestEvent::Finish).unwrap_err();
		assert!(matches!(err, WorkflowError::IllegalTransition { .. }));
		assert_eq!(machine.current_state(), TestState::Start);
	}

	#[test]
	fn final_states_are_only_those_declared() {
		assert!(!DEFINITION.is_final(TestState::Start));
		assert!(!DEFINITION.is_final(TestState::Middle));
		assert!(DEFINITION.is_final(TestState::Done));
	}

	#[test]
	fn rehydrated_machine_keeps_its_state() {
		let machine = Machine::with_state(&DEFINITION, TestState::Middle);
		assert_eq!(machine.current_state(), TestState::Middle);
		assert!(!machine.is_in_initial_state());
	}

	#[test]
	#[should_panic(expected = "duplicate transition")]
	fn duplicate_pair_panics_at_construction() {
		WorkflowDefinition::new(
			"broken",
			TestState::Start,
			&[],
			vec![
				(TestState::Start, TestEvent::Go, TestState::Middle),
				(TestState::Start, TestEvent::Go, TestState::Done),
			],
		);
	}
}
