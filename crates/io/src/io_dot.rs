use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::error::Error;
use std::io::Read;
use std::io::Write;

use cascade_automaton::Alphabet;
use cascade_automaton::Automaton;
use cascade_automaton::Letter;
use cascade_automaton::StateIndex;
use cascade_automaton::Transition;
use cascade_automaton::TransitionLabel;
use itertools::Itertools;
use log::debug;
use log::trace;
use regex::Regex;
use streaming_iterator::StreamingIterator;
use thiserror::Error;

use crate::guard::Guard;
use crate::line_iterator::LineIterator;

#[derive(Error, Debug)]
pub enum IOError {
    #[error("Invalid DOT header {0}")]
    InvalidHeader(&'static str),

    #[error("Invalid transition on line {0}")]
    InvalidTransition(usize),

    #[error("Invalid accepting states on line {0}")]
    InvalidAcceptingStates(usize),

    #[error("Invalid guard {0}")]
    InvalidGuard(String),

    #[error("Proposition {0} does not occur in the given propositions")]
    UnknownProposition(String),

    #[error("At most {max} atomic propositions are supported, got {actual}")]
    TooManyPropositions { max: usize, actual: usize },

    #[error("The automaton has no initial state")]
    MissingInitialState,

    #[error("Epsilon transitions of state {0} cannot be written")]
    EpsilonTransition(StateIndex),
}

/// A transition as it occurs in the input, before the guard is expanded.
struct GuardedTransition {
    from: StateIndex,
    to: StateIndex,
    guard: Guard,
}

/// Loads a deterministic automaton in the DOT format produced by MONA from the
/// given reader.
///
/// The format consists of a header `digraph <name> {`, followed by lines of the
/// following shapes, where all other lines are ignored:
///     `node [shape = doublecircle]; 3; 4;` lists the accepting states
///     `init -> 1;` sets the initial state
///     `1 -> 2 [label="~a & b"];` is a transition guarded by a propositional formula
///
/// Every guard is expanded into one transition for every interpretation of
/// `propositions` that satisfies it. When `propositions` is empty the
/// propositions occurring in the guards are used. State indices that cannot be
/// reached from the initial state are removed.
pub fn read_dot(reader: impl Read, propositions: Vec<String>) -> Result<Automaton, Box<dyn Error>> {
    let mut lines = LineIterator::new(reader);

    // Regex for digraph <name> {
    let header_regex = Regex::new(r#"^\s*digraph\s*("[^"]*"|[^\s{]*)\s*\{\s*$"#).expect("Regex compilation should not fail");

    // Regex for node [shape = doublecircle]; <state>; ... <state>;
    let accepting_regex = Regex::new(r#"^\s*node\s*\[\s*shape\s*=\s*doublecircle\s*\]\s*;(.*)$"#)
        .expect("Regex compilation should not fail");

    // Regex for init -> <state>;
    let initial_regex = Regex::new(r#"^\s*init\s*->\s*([0-9]+)\s*;?\s*$"#).expect("Regex compilation should not fail");

    // Regex for <from> -> <to> [label="<guard>"];
    let transition_regex = Regex::new(r#"^\s*([0-9]+)\s*->\s*([0-9]+)\s*\[\s*label\s*=\s*"(.*)"\s*\]\s*;?\s*$"#)
        .expect("Regex compilation should not fail");

    // Any line starting with <from> -> is meant to be a transition.
    let edge_regex = Regex::new(r#"^\s*[0-9]+\s*->"#).expect("Regex compilation should not fail");

    // Skip leading empty lines to find the header.
    loop {
        lines.advance();
        match lines.get() {
            Some(line) if line.trim().is_empty() => continue,
            Some(line) => {
                if !header_regex.is_match(line) {
                    return Err(IOError::InvalidHeader("does not match digraph <name> {").into());
                }
                break;
            }
            None => {
                if let Some(error) = lines.take_error() {
                    return Err(error.into());
                }
                return Err(IOError::InvalidHeader("The first line should be the header").into());
            }
        }
    }

    let mut initial_state: Option<StateIndex> = None;
    let mut accepting_states: Vec<StateIndex> = Vec::new();
    let mut transitions: Vec<GuardedTransition> = Vec::new();

    loop {
        lines.advance();
        let Some(line) = lines.get() else {
            break;
        };
        trace!("{}", line);

        if let Some(captures) = transition_regex.captures(line) {
            let (_, [from_txt, to_txt, guard_txt]) = captures.extract();
            let from: StateIndex = from_txt.parse()?;
            let to: StateIndex = to_txt.parse()?;
            let guard = Guard::parse(guard_txt)?;

            trace!("Read transition {} --[{}]-> {}", from, guard, to);
            transitions.push(GuardedTransition { from, to, guard });
        } else if edge_regex.is_match(line) {
            return Err(IOError::InvalidTransition(lines.line_number()).into());
        } else if let Some(captures) = initial_regex.captures(line) {
            let (_, [initial_txt]) = captures.extract();
            initial_state = Some(initial_txt.parse()?);
        } else if let Some(captures) = accepting_regex.captures(line) {
            let (_, [states_txt]) = captures.extract();
            for state_txt in states_txt.split(';').map(str::trim).filter(|text| !text.is_empty()) {
                let state: StateIndex = state_txt
                    .parse()
                    .map_err(|_| IOError::InvalidAcceptingStates(lines.line_number()))?;
                accepting_states.push(state);
            }
        }
    }

    if let Some(error) = lines.take_error() {
        return Err(error.into());
    }

    let initial_state = initial_state.ok_or(IOError::MissingInitialState)?;

    // Determine the alphabet, either given or from the guards.
    let mut occurring = BTreeSet::new();
    for transition in &transitions {
        transition.guard.propositions(&mut occurring);
    }

    let propositions: Vec<String> = if propositions.is_empty() {
        occurring.into_iter().collect()
    } else {
        if let Some(unknown) = occurring.iter().find(|name| !propositions.contains(name)) {
            return Err(IOError::UnknownProposition(unknown.clone()).into());
        }
        propositions.into_iter().collect::<BTreeSet<_>>().into_iter().collect()
    };

    if propositions.len() > Alphabet::MAX_PROPOSITIONS {
        return Err(IOError::TooManyPropositions {
            max: Alphabet::MAX_PROPOSITIONS,
            actual: propositions.len(),
        }
        .into());
    }
    let alphabet = Alphabet::new(propositions);

    let num_of_states = transitions
        .iter()
        .flat_map(|transition| [transition.from, transition.to])
        .chain(accepting_states.iter().copied())
        .chain([initial_state])
        .max()
        .map_or(0, |max| max + 1);

    let mut expanded: Vec<(StateIndex, Transition)> = Vec::new();
    for transition in &transitions {
        for letter in alphabet.letters() {
            if transition.guard.holds(&alphabet, letter) {
                expanded.push((transition.from, Transition::new(letter, transition.to)));
            }
        }
    }

    let automaton = Automaton::new(num_of_states, initial_state, accepting_states, alphabet, expanded);
    debug!(
        "Read automaton with {} states and {} transitions",
        automaton.num_of_states(),
        automaton.num_of_transitions()
    );

    Ok(automaton.remove_unreachable_states())
}

/// Writes the automaton in the format read by [read_dot]. The letters leading
/// from one state to the same target are combined into a single guard.
pub fn write_dot(automaton: &Automaton, mut writer: impl Write) -> Result<(), Box<dyn Error>> {
    let alphabet = automaton.alphabet();

    writeln!(writer, "digraph FA {{")?;
    writeln!(writer, "    rankdir = LR;")?;
    write!(writer, "    node [shape = doublecircle];")?;
    for state in automaton.accepting_states() {
        write!(writer, " {};", state)?;
    }
    writeln!(writer)?;
    writeln!(writer, "    node [shape = circle];")?;
    writeln!(writer, "    init [shape = plaintext, label = \"\"];")?;
    writeln!(writer, "    init -> {};", automaton.initial_state())?;

    for (state_index, state) in automaton.iter_states() {
        let mut letters_per_target: BTreeMap<StateIndex, Vec<Letter>> = BTreeMap::new();
        for transition in &state.outgoing {
            match transition.label {
                TransitionLabel::Letter(letter) => {
                    letters_per_target.entry(transition.target).or_default().push(letter)
                }
                TransitionLabel::Epsilon => return Err(IOError::EpsilonTransition(state_index).into()),
            }
        }

        for (target, letters) in letters_per_target {
            writeln!(
                writer,
                "    {} -> {} [label=\"{}\"];",
                state_index,
                target,
                format_guard(alphabet, &letters)
            )?;
        }
    }

    writeln!(writer, "}}")?;
    Ok(())
}

/// Returns the disjunction of the given letters.
fn format_guard(alphabet: &Alphabet, letters: &[Letter]) -> String {
    if letters.len() == alphabet.num_of_letters() {
        return "true".to_string();
    }

    if letters.len() == 1 {
        return alphabet.format_letter(letters[0]);
    }

    letters
        .iter()
        .format_with(" || ", |letter, f| f(&format_args!("({})", alphabet.format_letter(*letter))))
        .to_string()
}

#[cfg(test)]
mod tests {
    use cascade_automaton::random_automaton;
    use cascade_automaton::all_words;
    use indoc::indoc;
    use test_case::test_case;
    use test_log::test;

    use super::*;

    /// The output of MONA for the formula `a && X(a)`, without the sink state.
    const A_AND_NEXT_A: &str = indoc! {r#"
        digraph MONA_DFA {
         rankdir = LR;
         center = true;
         size = "7.5,10.5";
         edge [fontname = Courier];
         node [height = .5, width = .5];
         node [shape = doublecircle]; 3;
         node [shape = circle]; 1;
         init [shape = plaintext, label = ""];
         init -> 1;
         1 -> 2 [label="a"];
         2 -> 3 [label="a"];
         3 -> 3 [label="true"];
        }
    "#};

    #[test]
    fn test_reading_mona_output() {
        let automaton = read_dot(A_AND_NEXT_A.as_bytes(), Vec::new()).unwrap();

        assert_eq!(automaton.num_of_states(), 3);
        assert_eq!(automaton.initial_state(), 0);
        assert_eq!(automaton.alphabet().propositions(), &["a".to_string()]);
        assert_eq!(automaton.num_of_transitions(), 4);

        let a = Letter::new(1);
        let not_a = Letter::new(0);
        assert!(automaton.accepts(&[a, a]));
        assert!(automaton.accepts(&[a, a, not_a]));
        assert!(!automaton.accepts(&[a, not_a]));
        assert!(!automaton.accepts(&[a]));
    }

    #[test]
    fn test_reading_with_additional_propositions() {
        let automaton = read_dot(A_AND_NEXT_A.as_bytes(), vec!["a".into(), "b".into()]).unwrap();

        // Every guard is expanded over both propositions.
        assert_eq!(automaton.alphabet().num_of_letters(), 4);
        assert_eq!(automaton.num_of_transitions(), 8);
    }

    #[test]
    fn test_unknown_proposition() {
        assert!(read_dot(A_AND_NEXT_A.as_bytes(), vec!["b".into()]).is_err());
    }

    #[test]
    fn test_too_many_propositions() {
        let propositions: Vec<String> = (0..=Alphabet::MAX_PROPOSITIONS).map(|index| format!("p{index}")).collect();

        let error = read_dot(A_AND_NEXT_A.as_bytes(), propositions).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<IOError>(),
            Some(IOError::TooManyPropositions { actual, .. }) if *actual == Alphabet::MAX_PROPOSITIONS + 1
        ));

        // Duplicates are not counted.
        let mut propositions: Vec<String> = (0..Alphabet::MAX_PROPOSITIONS - 1)
            .map(|index| format!("p{index}"))
            .collect();
        propositions.extend(["a".to_string(), "a".to_string()]);
        let automaton = read_dot(A_AND_NEXT_A.as_bytes(), propositions).unwrap();
        assert_eq!(automaton.alphabet().num_of_propositions(), Alphabet::MAX_PROPOSITIONS);
    }

    #[test_case("graph G {\n init -> 0;\n}\n" ; "wrong header")]
    #[test_case("digraph G {\n 0 -> 1 [label=\"a\"];\n}\n" ; "missing initial state")]
    #[test_case("digraph G {\n init -> 0;\n 0 -> 1 label=a;\n}\n" ; "malformed transition")]
    #[test_case("digraph G {\n init -> 0;\n 0 -> 1 [label=\"a &\"];\n}\n" ; "malformed guard")]
    #[test_case("" ; "empty input")]
    fn test_invalid_input(input: &str) {
        assert!(read_dot(input.as_bytes(), Vec::new()).is_err());
    }

    #[test]
    fn test_write_dot_round_trip() {
        for _ in 0..20 {
            let automaton = random_automaton(6, 2, true).remove_unreachable_states();

            let mut buffer: Vec<u8> = Vec::new();
            write_dot(&automaton, &mut buffer).unwrap();

            let propositions = automaton.alphabet().propositions().to_vec();
            let result = read_dot(&buffer[..], propositions).unwrap();

            for word in all_words(automaton.alphabet(), 4) {
                assert_eq!(automaton.accepts(&word), result.accepts(&word), "Word {:?}", word);
            }
        }
    }
}
