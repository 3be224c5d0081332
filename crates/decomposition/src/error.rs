use cascade_automaton::AutomatonError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecompositionError {
    #[error("The automaton cannot be decomposed: {0}")]
    InvalidAutomaton(#[from] AutomatonError),

    #[error("The automaton is not counter-free, layer {layer} of the cascade is not a reset automaton")]
    NotCounterFree { layer: usize },
}
