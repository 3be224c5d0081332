use cascade_automaton::all_words;
use cascade_io::io_dot::read_dot;
use indoc::indoc;
use test_log::test;

/// The output of MONA for `a && X(a)`, where the rejecting sink is omitted.
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
fn test_reversal_of_compiled_formula() {
    let automaton = read_dot(A_AND_NEXT_A.as_bytes(), Vec::new()).unwrap();

    let reversed = automaton.reverse_transitions(true);
    assert_eq!(reversed.num_of_states(), automaton.num_of_states() + 1);

    let determinized = reversed.determinize(true);
    assert!(determinized.is_deterministic());

    for word in all_words(automaton.alphabet(), 5) {
        let reversed_word: Vec<_> = word.iter().rev().copied().collect();
        assert_eq!(
            automaton.accepts(&word),
            determinized.accepts(&reversed_word),
            "Word {:?}",
            word
        );
    }
}

#[test]
fn test_minimization_of_compiled_formula() {
    let automaton = read_dot(A_AND_NEXT_A.as_bytes(), vec!["a".into(), "b".into()]).unwrap();

    let minimal = automaton.minimize();
    for word in all_words(automaton.alphabet(), 4) {
        assert_eq!(automaton.accepts(&word), minimal.accepts(&word), "Word {:?}", word);
    }
}
