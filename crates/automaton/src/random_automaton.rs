use rand::Rng;

use crate::Alphabet;
use crate::Automaton;
use crate::Letter;
use crate::Transition;

/// Generates an automaton with the desired number of states over the
/// propositions `a`, `b`, ... The initial state is zero.
///
/// A deterministic automaton has exactly one transition for every state and
/// letter. Otherwise every state has up to two transitions per letter and
/// occasionally an epsilon transition.
pub fn random_automaton(num_of_states: usize, num_of_propositions: u32, deterministic: bool) -> Automaton {
    let alphabet = Alphabet::new(
        (0..num_of_propositions)
            .map(|i| char::from_digit(i + 10, 36).expect("At most 26 propositions are generated").to_string()),
    );

    let mut rng = rand::rng();
    let mut transitions = Vec::new();
    let mut accepting = Vec::new();

    for state in 0..num_of_states {
        if rng.random_bool(0.5) {
            accepting.push(state);
        }

        for letter in alphabet.letters() {
            let outdegree = if deterministic { 1 } else { rng.random_range(0..3) };

            for _ in 0..outdegree {
                transitions.push((state, Transition::new(letter, rng.random_range(0..num_of_states))));
            }
        }

        if !deterministic && rng.random_bool(0.2) {
            transitions.push((state, Transition::epsilon(rng.random_range(0..num_of_states))));
        }
    }

    Automaton::new(num_of_states, 0, accepting, alphabet, transitions)
}

/// Returns all words over the alphabet with a length of at most `max_length`,
/// ordered by length.
pub fn all_words(alphabet: &Alphabet, max_length: usize) -> Vec<Vec<Letter>> {
    let mut result: Vec<Vec<Letter>> = vec![Vec::new()];
    let mut previous: Vec<Vec<Letter>> = vec![Vec::new()];

    for _ in 0..max_length {
        let mut next = Vec::with_capacity(previous.len() * alphabet.num_of_letters());
        for word in &previous {
            for letter in alphabet.letters() {
                let mut extended = word.clone();
                extended.push(letter);
                next.push(extended);
            }
        }

        result.extend(next.iter().cloned());
        previous = next;
    }

    result
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_random_automaton() {
        let automaton = random_automaton(10, 2, true);
        assert_eq!(automaton.num_of_states(), 10);
        assert_eq!(automaton.validate(), Ok(()));

        let _nfa = random_automaton(10, 3, false);
    }

    #[test]
    fn test_all_words() {
        let alphabet = Alphabet::new(["a"]);
        let words = all_words(&alphabet, 3);

        assert_eq!(words.len(), 1 + 2 + 4 + 8);
        assert!(words[0].is_empty());
    }
}
