use cascade_automaton::all_words;
use cascade_automaton::Automaton;
use cascade_automaton::Letter;
use cascade_decomposition::CascadeDecomposition;
use cascade_decomposition::TreeSubsetAutomaton;
use cascade_formula::Formula;
use cascade_io::io_dot::read_dot;
use indoc::indoc;
use test_case::test_case;
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

/// Some `a` is followed later by a `b`.
const ONCE_A_THEN_B: &str = indoc! {r#"
    digraph MONA_DFA {
     rankdir = LR;
     node [shape = doublecircle]; 3;
     node [shape = circle]; 1; 2;
     init [shape = plaintext, label = ""];
     init -> 1;
     1 -> 1 [label="~a"];
     1 -> 2 [label="a"];
     2 -> 2 [label="~b"];
     2 -> 3 [label="b"];
     3 -> 3 [label="true"];
    }
"#};

/// Some `a` occurred and no `b` without `a` occurred since.
const A_SINCE_NOT_B: &str = indoc! {r#"
    digraph MONA_DFA {
     rankdir = LR;
     node [shape = doublecircle]; 2;
     node [shape = circle]; 1;
     init [shape = plaintext, label = ""];
     init -> 1;
     1 -> 1 [label="~a"];
     1 -> 2 [label="a"];
     2 -> 2 [label="~b | a"];
     2 -> 1 [label="b & ~a"];
    }
"#};

fn valuation<'a>(automaton: &'a Automaton, word: &'a [Letter]) -> impl Fn(usize, &str) -> bool + Copy + 'a {
    move |t, name| {
        automaton
            .alphabet()
            .true_propositions(word[t])
            .any(|proposition| proposition == name)
    }
}

/// Reads the automaton and brings it into the form accepted by the decomposition.
fn prepare(text: &str) -> Automaton {
    read_dot(text.as_bytes(), Vec::new()).unwrap().minimize().complete()
}

#[test_case(A_AND_NEXT_A ; "a and next a")]
#[test_case(ONCE_A_THEN_B ; "once a then b")]
#[test_case(A_SINCE_NOT_B ; "a since not b")]
fn test_past_formula(text: &str) {
    let automaton = prepare(text);
    let cascade = CascadeDecomposition::new(&automaton).unwrap();
    let formula = cascade.synthesize_formula();
    assert!(formula.is_past());

    for word in all_words(automaton.alphabet(), 6).iter().filter(|word| !word.is_empty()) {
        assert_eq!(
            formula.holds_at_end(word.len(), valuation(&automaton, word)),
            automaton.accepts(word),
            "Word {:?}",
            word
        );
    }
}

#[test_case(A_AND_NEXT_A ; "a and next a")]
#[test_case(ONCE_A_THEN_B ; "once a then b")]
fn test_future_formula(text: &str) {
    let automaton = prepare(text);

    // The past formula of the reversed language is a future formula for the
    // original language once the operators are switched.
    let reversed = automaton.reverse_transitions(true).determinize(true).minimize().complete();
    let cascade = CascadeDecomposition::new(&reversed).unwrap();
    let formula: Formula = cascade.synthesize_formula().switch_direction();
    assert!(formula.is_future());

    for word in all_words(automaton.alphabet(), 5).iter().filter(|word| !word.is_empty()) {
        assert_eq!(
            formula.holds_at_start(word.len(), valuation(&automaton, word)),
            automaton.accepts(word),
            "Word {:?}",
            word
        );
    }
}

#[test]
fn test_isomorphic_automata() {
    let automaton = prepare(ONCE_A_THEN_B);

    let tsa = TreeSubsetAutomaton::new(&automaton).unwrap();
    let cascade = CascadeDecomposition::new(&automaton).unwrap();

    let from_tsa = tsa.isomorphic_automaton();
    let from_cascade = cascade.isomorphic_automaton();
    // A state can be represented by several leaves.
    assert!(from_tsa.num_of_states() >= automaton.num_of_states());
    assert_eq!(from_cascade.num_of_states(), from_tsa.num_of_states());

    for word in all_words(automaton.alphabet(), 6) {
        assert_eq!(automaton.accepts(&word), from_tsa.accepts(&word));
        assert_eq!(automaton.accepts(&word), from_cascade.accepts(&word));
    }
}
