use cascade_automaton::Alphabet;
use cascade_automaton::Automaton;
use cascade_automaton::Transition;

/// Builds a total automaton from a table with one row of targets per state,
/// indexed by letter.
pub(crate) fn from_table(propositions: &[&str], accepting: &[usize], table: &[&[usize]]) -> Automaton {
    let alphabet = Alphabet::new(propositions.iter().copied());

    let transitions: Vec<_> = table
        .iter()
        .enumerate()
        .flat_map(|(state, row)| {
            alphabet
                .letters()
                .zip(row.iter())
                .map(move |(letter, target)| (state, Transition::new(letter, *target)))
        })
        .collect();

    Automaton::new(table.len(), 0, accepting.iter().copied(), alphabet, transitions)
}

/// Accepts the words over {a, b} in which an `a` is followed later by a `b`.
pub(crate) fn once_a_then_b() -> Automaton {
    // Letters are ordered {}, {a}, {b}, {a, b}.
    from_table(&["a", "b"], &[2], &[&[0, 1, 0, 1], &[1, 1, 2, 2], &[2, 2, 2, 2]])
}

/// Accepts the words over {a} that end with an `a`.
pub(crate) fn last_letter_a() -> Automaton {
    from_table(&["a"], &[1], &[&[0, 1], &[0, 1]])
}

/// Accepts the words over {a} that start with two letters `a`, with a sink.
pub(crate) fn a_and_next_a() -> Automaton {
    from_table(&["a"], &[2], &[&[3, 1], &[3, 2], &[2, 2], &[3, 3]])
}

/// Accepts the words over {a} with an even number of `a`, which is not counter-free.
pub(crate) fn parity() -> Automaton {
    from_table(&["a"], &[0], &[&[0, 1], &[1, 0]])
}

/// A nine state automaton over {a} with a tree subset automaton of more than
/// twenty thousand nodes. It is not counter-free.
pub(crate) fn large_tree() -> Automaton {
    from_table(
        &["a"],
        &[1, 3, 8],
        &[
            &[1, 2],
            &[3, 4],
            &[5, 5],
            &[2, 3],
            &[6, 1],
            &[7, 8],
            &[8, 7],
            &[1, 2],
            &[4, 5],
        ],
    )
}
