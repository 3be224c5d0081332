use cascade_automaton::Letter;
use cascade_automaton::StateIndex;
use cascade_formula::Formula;
use log::debug;
use rustc_hash::FxHashMap;

use crate::CascadeDecomposition;
use crate::CascadeState;
use crate::LayerTransition;

/// Synthesises past-time formulas that hold at the last position of a
/// non-empty word iff the cascade is in a given configuration after reading
/// that word. The formulas of the cascade states are shared between all
/// formulas built by one synthesizer.
pub struct FormulaSynthesizer<'a> {
    cascade: &'a CascadeDecomposition,
    state_formulas: FxHashMap<(usize, CascadeState), Formula>,
}

impl<'a> FormulaSynthesizer<'a> {
    pub fn new(cascade: &'a CascadeDecomposition) -> FormulaSynthesizer<'a> {
        FormulaSynthesizer {
            cascade,
            state_formulas: FxHashMap::default(),
        }
    }

    /// Holds exactly at the positions labelled with the given letter.
    pub fn letter_formula(&self, letter: Letter) -> Formula {
        let alphabet = self.cascade.automaton().alphabet();

        Formula::conjunction(alphabet.propositions().iter().enumerate().map(|(index, proposition)| {
            if alphabet.holds(letter, index) {
                Formula::atom(proposition.clone())
            } else {
                Formula::not(Formula::atom(proposition.clone()))
            }
        }))
    }

    /// Holds at the positions where the given configuration of the first
    /// layers is the configuration before reading the current letter.
    pub fn previous_configuration_formula(&mut self, configuration: &[CascadeState]) -> Formula {
        let previous = Formula::before(self.configuration_formula(configuration));

        let initial = self.cascade.initial_configuration();
        if initial[..configuration.len()] == *configuration {
            Formula::or(previous, Formula::first())
        } else {
            previous
        }
    }

    /// Holds at the positions where the given layer is in the given state
    /// after reading the current letter.
    pub fn cascade_state_formula(&mut self, layer: usize, state: CascadeState) -> Formula {
        if layer == 0 {
            return Formula::tt();
        }

        if let Some(formula) = self.state_formulas.get(&(layer, state)) {
            return formula.clone();
        }

        let cascade = self.cascade;
        let automaton = cascade.layer(layer);

        let mut ins = Vec::new();
        let mut outs = Vec::new();
        for parent in automaton.parent_configurations() {
            for letter in cascade.automaton().alphabet().letters() {
                let kind = automaton
                    .transition_kind(parent, letter)
                    .expect("Every parent configuration has a transition for every letter");

                match kind {
                    LayerTransition::Identity => {}
                    LayerTransition::Reset(target) if target == state => {
                        ins.push((parent.clone(), letter));
                    }
                    LayerTransition::Reset(_) => {
                        if automaton.local_states(parent).contains(&state) {
                            outs.push((parent.clone(), letter));
                        }
                    }
                }
            }
        }

        let into = self.step_formula(&ins);
        let out_of = self.step_formula(&outs);

        let mut formula = Formula::since(Formula::not(out_of.clone()), into);
        if state == automaton.initial_state() {
            formula = Formula::or(formula, Formula::historically(Formula::not(out_of)));
        }

        self.state_formulas.insert((layer, state), formula.clone());
        formula
    }

    /// Holds at the positions where the first layers are in the given
    /// configuration after reading the current letter.
    pub fn configuration_formula(&mut self, configuration: &[CascadeState]) -> Formula {
        let operands: Vec<Formula> = configuration
            .iter()
            .enumerate()
            .map(|(layer, state)| self.cascade_state_formula(layer, *state))
            .collect();

        Formula::conjunction(operands)
    }

    /// Holds at the positions where the automaton is in the given state after
    /// reading the current letter.
    pub fn automaton_state_formula(&mut self, state: StateIndex) -> Formula {
        let cascade = self.cascade;
        let operands: Vec<Formula> = cascade
            .phi_inv(state)
            .iter()
            .map(|configuration| self.configuration_formula(configuration))
            .collect();

        Formula::disjunction(operands)
    }

    /// Holds at the last position of exactly the non-empty words accepted by
    /// the automaton.
    pub fn synthesize_formula(&mut self) -> Formula {
        let start = std::time::Instant::now();

        let accepting: Vec<StateIndex> = self.cascade.automaton().accepting_states().collect();
        let operands: Vec<Formula> = accepting
            .into_iter()
            .map(|state| self.automaton_state_formula(state))
            .collect();
        let formula = Formula::disjunction(operands);

        debug!("Synthesised a formula with {} distinct subformulas", formula.size());
        debug!("Time synthesis: {:.3}s", start.elapsed().as_secs_f64());
        formula
    }

    /// The disjunction of reading one of the letters while the layers above
    /// were in the corresponding configuration.
    fn step_formula(&mut self, steps: &[(Vec<CascadeState>, Letter)]) -> Formula {
        let operands: Vec<Formula> = steps
            .iter()
            .map(|(parent, letter)| {
                let letter = self.letter_formula(*letter);
                Formula::and(letter, self.previous_configuration_formula(parent))
            })
            .collect();

        Formula::disjunction(operands)
    }
}

impl CascadeDecomposition {
    /// Returns a past-time formula that holds at the end of a non-empty word
    /// iff the automaton accepts the word.
    pub fn synthesize_formula(&self) -> Formula {
        FormulaSynthesizer::new(self).synthesize_formula()
    }
}
