use std::fmt;

use itertools::Itertools;

/// A propositional interpretation, encoded as a bit mask over the
/// propositions of an [Alphabet]. Bit `i` is set iff proposition `i` holds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Letter(usize);

impl Letter {
    /// Creates the letter with the given bit mask.
    pub fn new(mask: usize) -> Letter {
        Letter(mask)
    }

    /// Returns the bit mask, which is also the position of the letter in
    /// [Alphabet::letters].
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for Letter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The ordered set of atomic propositions of an automaton. The letters of the
/// automaton are all the propositional interpretations over these propositions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Alphabet {
    propositions: Vec<String>,
}

impl Alphabet {
    /// The alphabet is exponential in the number of propositions, so it is bounded.
    pub const MAX_PROPOSITIONS: usize = 16;

    /// Creates an alphabet over the given propositions, which are sorted and
    /// deduplicated.
    pub fn new<I, S>(propositions: I) -> Alphabet
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut propositions: Vec<String> = propositions.into_iter().map(Into::into).collect();
        propositions.sort();
        propositions.dedup();

        assert!(
            propositions.len() <= Self::MAX_PROPOSITIONS,
            "At most {} atomic propositions are supported, got {}",
            Self::MAX_PROPOSITIONS,
            propositions.len()
        );

        Alphabet { propositions }
    }

    /// Returns the sorted atomic propositions.
    pub fn propositions(&self) -> &[String] {
        &self.propositions
    }

    pub fn num_of_propositions(&self) -> usize {
        self.propositions.len()
    }

    /// Returns the number of letters, i.e. 2^k for k propositions.
    pub fn num_of_letters(&self) -> usize {
        1 << self.propositions.len()
    }

    /// Enumerates all propositional interpretations, starting with the empty one.
    pub fn letters(&self) -> impl Iterator<Item = Letter> {
        (0..self.num_of_letters()).map(Letter)
    }

    /// Returns the index of the given proposition.
    pub fn index_of(&self, proposition: &str) -> Option<usize> {
        self.propositions
            .binary_search_by(|other| other.as_str().cmp(proposition))
            .ok()
    }

    /// Returns the letter in which exactly the given propositions hold.
    ///
    /// Panics when one of the propositions is not part of the alphabet.
    pub fn letter<I, S>(&self, true_propositions: I) -> Letter
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut mask = 0;
        for proposition in true_propositions {
            let index = self
                .index_of(proposition.as_ref())
                .unwrap_or_else(|| panic!("Proposition {} is not in the alphabet", proposition.as_ref()));
            mask |= 1 << index;
        }

        Letter(mask)
    }

    /// Returns true iff the proposition with the given index holds in the letter.
    pub fn holds(&self, letter: Letter, proposition_index: usize) -> bool {
        debug_assert!(proposition_index < self.propositions.len());
        letter.0 & (1 << proposition_index) != 0
    }

    /// Returns the propositions that hold in the given letter.
    pub fn true_propositions(&self, letter: Letter) -> impl Iterator<Item = &str> + '_ {
        self.propositions
            .iter()
            .enumerate()
            .filter(move |(index, _)| self.holds(letter, *index))
            .map(|(_, proposition)| proposition.as_str())
    }

    /// Returns true iff the letter is one of the letters of this alphabet.
    pub fn contains(&self, letter: Letter) -> bool {
        letter.0 < self.num_of_letters()
    }

    /// Returns the alphabet over the propositions of both alphabets.
    pub fn union(&self, other: &Alphabet) -> Alphabet {
        Alphabet::new(self.propositions.iter().chain(other.propositions.iter()).cloned())
    }

    /// Returns the letter as a conjunction of literals, for example `a && !b`.
    pub fn format_letter(&self, letter: Letter) -> String {
        if self.propositions.is_empty() {
            return "true".to_string();
        }

        self.propositions
            .iter()
            .enumerate()
            .format_with(" && ", |(index, proposition), f| {
                if self.holds(letter, index) {
                    f(&format_args!("{}", proposition))
                } else {
                    f(&format_args!("!{}", proposition))
                }
            })
            .to_string()
    }
}

impl fmt::Display for Alphabet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.propositions.iter().format(", "))
    }
}
