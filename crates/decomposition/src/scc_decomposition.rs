use log::debug;
use log::trace;

/// Computes the strongly connected components of a graph with nodes
/// `0..num_of_nodes`, where `successors(node)` returns the targets of the
/// outgoing edges of a node.
///
/// Returns the component number of every node. Components are numbered in the
/// order in which Tarjan's algorithm completes them, so every edge leads to a
/// component with a smaller or equal number.
pub fn scc_decomposition<F, I>(num_of_nodes: usize, successors: F) -> Vec<usize>
where
    F: Fn(usize) -> I,
    I: IntoIterator<Item = usize>,
{
    let start = std::time::Instant::now();

    let mut components = vec![0; num_of_nodes];

    // The stack for the depth first search.
    let mut stack = Vec::new();

    // Keep track of already visited nodes.
    let mut indices: Vec<Option<NodeInfo>> = vec![None; num_of_nodes];

    let mut smallest_index = 0;
    let mut next_component = 0;

    // The outer depth first search used to traverse all the nodes.
    for node in 0..num_of_nodes {
        if indices[node].is_none() {
            trace!("Node {node}");

            strongly_connect(
                node,
                &successors,
                &mut components,
                &mut smallest_index,
                &mut next_component,
                &mut stack,
                &mut indices,
            )
        }
    }

    debug!("Found {} strongly connected components", next_component);
    debug!("Time scc_decomposition: {:.3}s", start.elapsed().as_secs_f64());
    components
}

#[derive(Clone, Debug)]
struct NodeInfo {
    /// A unique index for every node.
    index: usize,

    /// Keeps track of the lowest node that can be reached on the stack.
    lowlink: usize,

    /// Keeps track of whether this node is on the stack.
    on_stack: bool,
}

/// Tarjan's strongly connected components algorithm, starting from the given
/// node.
///
/// The depth first search keeps its own stack of frames with the remaining
/// successors of every node, so the depth of the search is not bounded by the
/// thread stack. The `smallest_index`, `stack` and `indices` are shared with
/// the other searches started by [scc_decomposition].
fn strongly_connect<F, I>(
    root: usize,
    successors: &F,
    components: &mut [usize],
    smallest_index: &mut usize,
    next_component: &mut usize,
    stack: &mut Vec<usize>,
    indices: &mut [Option<NodeInfo>],
) where
    F: Fn(usize) -> I,
    I: IntoIterator<Item = usize>,
{
    let mut frames: Vec<(usize, I::IntoIter)> = Vec::new();

    visit(root, smallest_index, stack, indices);
    frames.push((root, successors(root).into_iter()));

    loop {
        let (node, next) = match frames.last_mut() {
            Some((node, remaining)) => (*node, remaining.next()),
            None => break,
        };

        match next {
            Some(to) => match &indices[to] {
                Some(info) => {
                    if info.on_stack {
                        // Successor w is on the stack and hence in the current component.
                        // v.lowlink := min(v.lowlink, w.index);
                        let w_index = info.index;
                        let info = indices[node].as_mut().expect("This node was added before");
                        info.lowlink = info.lowlink.min(w_index);
                    }
                }
                None => {
                    // Successor w has not yet been visited, continue the search from it.
                    visit(to, smallest_index, stack, indices);
                    frames.push((to, successors(to).into_iter()));
                }
            },
            None => {
                frames.pop();

                let info = indices[node].as_ref().expect("This node was added before");
                let lowlink = info.lowlink;
                if info.lowlink == info.index {
                    // The node is the root of a new strongly connected component.
                    while let Some(member) = stack.pop() {
                        let info = indices[member].as_mut().expect("This node was on the stack");
                        info.on_stack = false;

                        trace!("Added node {member} to component {}", next_component);
                        components[member] = *next_component;

                        if member == node {
                            break;
                        }
                    }

                    *next_component += 1;
                }

                // v.lowlink := min(v.lowlink, w.lowlink) for the node v that reached w.
                if let Some((parent, _)) = frames.last() {
                    let info = indices[*parent].as_mut().expect("This node was added before");
                    info.lowlink = info.lowlink.min(lowlink);
                }
            }
        }
    }
}

/// Assigns the next index to the node and pushes it on the stack.
fn visit(node: usize, smallest_index: &mut usize, stack: &mut Vec<usize>, indices: &mut [Option<NodeInfo>]) {
    trace!("Visiting node {node}");

    indices[node] = Some(NodeInfo {
        index: *smallest_index,
        lowlink: *smallest_index,
        on_stack: true,
    });

    *smallest_index += 1;
    stack.push(node);
}

#[cfg(test)]
mod tests {
    use rand::Rng;
    use test_log::test;

    use super::*;

    /// Returns the nodes reachable from the given node, including itself.
    fn reachable(edges: &[Vec<usize>], node: usize) -> Vec<bool> {
        let mut visited = vec![false; edges.len()];
        let mut stack = vec![node];
        visited[node] = true;

        while let Some(inner) = stack.pop() {
            for to in &edges[inner] {
                if !visited[*to] {
                    visited[*to] = true;
                    stack.push(*to);
                }
            }
        }

        visited
    }

    #[test]
    fn test_cycles() {
        let edges = vec![vec![1], vec![2], vec![0, 3], vec![4], vec![3], vec![]];

        let components = scc_decomposition(edges.len(), |node| edges[node].iter().copied());

        assert_eq!(components[0], components[1]);
        assert_eq!(components[1], components[2]);
        assert_eq!(components[3], components[4]);
        assert_ne!(components[2], components[3]);
        assert_ne!(components[5], components[0]);
    }

    #[test]
    fn test_long_cycle() {
        // Deep enough to exhaust the thread stack of a recursive search.
        let num_of_nodes = 1_000_000;

        let components = scc_decomposition(num_of_nodes, |node| [(node + 1) % num_of_nodes]);
        assert!(components.iter().all(|component| *component == 0));

        let components = scc_decomposition(num_of_nodes, |node| (node + 1..num_of_nodes).take(1));
        for node in 1..num_of_nodes {
            assert!(components[node] < components[node - 1]);
        }
    }

    #[test]
    fn test_random_scc_decomposition() {
        let mut rng = rand::rng();

        for _ in 0..20 {
            let num_of_nodes = 12;
            let edges: Vec<Vec<usize>> = (0..num_of_nodes)
                .map(|_| (0..2).map(|_| rng.random_range(0..num_of_nodes)).collect())
                .collect();

            let components = scc_decomposition(num_of_nodes, |node| edges[node].iter().copied());
            let reachability: Vec<Vec<bool>> = (0..num_of_nodes).map(|node| reachable(&edges, node)).collect();

            for from in 0..num_of_nodes {
                for to in 0..num_of_nodes {
                    let mutual = reachability[from][to] && reachability[to][from];
                    assert_eq!(
                        components[from] == components[to],
                        mutual,
                        "Nodes {from} and {to} are classified incorrectly"
                    );
                }

                // Edges never lead to a component that is completed later.
                for to in &edges[from] {
                    assert!(components[*to] <= components[from]);
                }
            }
        }
    }
}
