use std::collections::BTreeMap;
use std::io;
use std::io::Write;

use itertools::Itertools;

use crate::CascadeDecomposition;
use crate::CascadeState;
use crate::TreeSubsetAutomaton;

const DOT_HEADER: &str = "    rankdir = TD;
    center = true;
    edge [fontname = Courier];
    node [height = .5, width = .5];
    node [shape = square];";

impl TreeSubsetAutomaton {
    /// Writes the tree subset automaton in the DOT format. The tree edges are
    /// red and undirected, and with `force_height` the nodes of one height
    /// are placed on the same rank.
    pub fn write_dot(&self, mut writer: impl Write, force_height: bool) -> io::Result<()> {
        writeln!(writer, "digraph TSA {{")?;
        writeln!(writer, "{}", DOT_HEADER)?;

        for (index, node) in self.nodes().iter().enumerate() {
            writeln!(writer, "    {} [label=\"{{{}}}\"];", index, node.states().iter().format(", "))?;

            for letter in self.alphabet().letters() {
                writeln!(
                    writer,
                    "    {} -> {} [label=\"{}\"];",
                    index,
                    node.transition(letter),
                    self.alphabet().format_letter(letter)
                )?;
            }
        }

        for (index, node) in self.nodes().iter().enumerate() {
            if let Some(parent) = node.parent() {
                writeln!(writer, "    {} -> {} [dir=none, color=\"red\"];", parent, index)?;
            }
        }

        if force_height {
            for height in 0..=self.height() {
                writeln!(
                    writer,
                    "    {{rank = same; {}}};",
                    self.nodes_at_height(height)
                        .iter()
                        .format_with(" ", |node, f| f(&format_args!("{};", node)))
                )?;
            }
        }

        writeln!(writer, "}}")
    }
}

impl CascadeDecomposition {
    /// Writes the layers of the cascade in the DOT format, one cluster per
    /// layer. The transitions are labelled with the configuration of the
    /// layers above and the letters.
    pub fn write_dot(&self, mut writer: impl Write) -> io::Result<()> {
        let alphabet = self.automaton().alphabet();

        writeln!(writer, "digraph CD {{")?;
        writeln!(writer, "{}", DOT_HEADER)?;
        writeln!(writer, "    graph [nodesep=0.7, rankdir=RL];")?;

        for layer in self.layers().iter().rev() {
            let index = layer.layer();
            writeln!(writer, "    subgraph cluster_{} {{", index)?;
            writeln!(writer, "        label=\"layer {}\";", index)?;

            for state in 0..layer.num_of_states() {
                writeln!(
                    writer,
                    "        l{}s{} [label=\"{} {}\"];",
                    index,
                    state,
                    state,
                    layer.theta_inv(state).iter().format_with(" ", |node, f| f(&format_args!(
                        "{{{}}}",
                        self.tsa().node(*node).states().iter().format(", ")
                    )))
                )?;
            }

            for parent in layer.parent_configurations() {
                // The letters that lead from a state to the same target.
                let mut edges: BTreeMap<(CascadeState, CascadeState), Vec<String>> = BTreeMap::new();

                for state in layer.local_states(parent) {
                    for letter in alphabet.letters() {
                        let target = layer
                            .delta(*state, parent, letter)
                            .expect("Every local state has a transition for every letter");
                        edges
                            .entry((*state, target))
                            .or_default()
                            .push(alphabet.format_letter(letter));
                    }
                }

                for ((from, to), letters) in edges {
                    writeln!(
                        writer,
                        "        l{}s{} -> l{}s{} [label=\"[{}] {}\"];",
                        index,
                        from,
                        index,
                        to,
                        parent.iter().format(","),
                        letters.iter().format(" | ")
                    )?;
                }
            }

            writeln!(writer, "    }}")?;
        }

        writeln!(writer, "}}")
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use crate::test_automata::last_letter_a;
    use crate::test_automata::once_a_then_b;

    use super::*;

    #[test]
    fn test_tsa_dot() {
        let tsa = TreeSubsetAutomaton::new(&once_a_then_b()).unwrap();

        let mut output = Vec::new();
        tsa.write_dot(&mut output, true).unwrap();
        let text = String::from_utf8(output).unwrap();

        assert!(text.starts_with("digraph TSA {"));
        assert!(text.contains("0 [label=\"{0, 1, 2}\"];"));
        assert!(text.contains("[dir=none, color=\"red\"]"));
        assert_eq!(text.matches("rank = same").count(), tsa.height() + 1);
        assert_eq!(text.matches("color=\"red\"").count(), tsa.num_of_nodes() - 1);

        let mut unranked = Vec::new();
        tsa.write_dot(&mut unranked, false).unwrap();
        assert!(!String::from_utf8(unranked).unwrap().contains("rank = same"));
    }

    #[test]
    fn test_cascade_dot() {
        let cascade = CascadeDecomposition::new(&last_letter_a()).unwrap();

        let mut output = Vec::new();
        cascade.write_dot(&mut output).unwrap();
        let text = String::from_utf8(output).unwrap();

        assert!(text.starts_with("digraph CD {"));
        assert!(text.contains("subgraph cluster_0"));
        assert!(text.contains("subgraph cluster_1"));
        assert!(text.contains("l1s0 -> l1s1 [label=\"[0] a\"];"));
    }
}
