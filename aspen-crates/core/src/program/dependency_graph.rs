//! The positive dependency graph of a program and its strongly connected components.

const UNVISITED: u32 = u32::MAX;

/// An edge leads from the head of a rule to every atom of its positive body.
#[derive(Clone, Debug, Default)]
pub(crate) struct DependencyGraph {
    successors: Vec<Vec<u32>>,
}

impl DependencyGraph {
    pub(crate) fn new(num_nodes: usize) -> DependencyGraph {
        DependencyGraph {
            successors: vec![vec![]; num_nodes],
        }
    }

    pub(crate) fn add_edge(&mut self, from: u32, to: u32) {
        self.successors[from as usize].push(to);
    }

    /// The components which contain a cycle, i.e. more than one node or a node depending on
    /// itself. Components are listed in reverse topological order (Tarjan), nodes by the order in
    /// which they were completed.
    pub(crate) fn cyclic_components(&self) -> Vec<Vec<u32>> {
        self.components()
            .into_iter()
            .filter(|component| {
                component.len() > 1
                    || self.successors[component[0] as usize].contains(&component[0])
            })
            .collect()
    }

    /// Tarjan's algorithm with an explicit call stack.
    fn components(&self) -> Vec<Vec<u32>> {
        let num_nodes = self.successors.len();
        let mut index = vec![UNVISITED; num_nodes];
        let mut lowlink = vec![0; num_nodes];
        let mut on_stack = vec![false; num_nodes];
        let mut stack: Vec<u32> = vec![];
        let mut next_index = 0;
        let mut components = vec![];

        for root in 0..num_nodes {
            if index[root] != UNVISITED {
                continue;
            }
            // (node, next successor to visit)
            let mut call_stack = vec![(root, 0)];
            index[root] = next_index;
            lowlink[root] = next_index;
            next_index += 1;
            stack.push(root as u32);
            on_stack[root] = true;

            while let Some(frame) = call_stack.last_mut() {
                let node = frame.0;
                if let Some(&successor) = self.successors[node].get(frame.1) {
                    frame.1 += 1;
                    let successor = successor as usize;
                    if index[successor] == UNVISITED {
                        index[successor] = next_index;
                        lowlink[successor] = next_index;
                        next_index += 1;
                        stack.push(successor as u32);
                        on_stack[successor] = true;
                        call_stack.push((successor, 0));
                    } else if on_stack[successor] {
                        lowlink[node] = lowlink[node].min(index[successor]);
                    }
                    continue;
                }

                let _ = call_stack.pop();
                if let Some(&(parent, _)) = call_stack.last() {
                    lowlink[parent] = lowlink[parent].min(lowlink[node]);
                }
                if lowlink[node] == index[node] {
                    let mut component = vec![];
                    while let Some(member) = stack.pop() {
                        on_stack[member as usize] = false;
                        component.push(member);
                        if member as usize == node {
                            break;
                        }
                    }
                    components.push(component);
                }
            }
        }
        components
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(mut components: Vec<Vec<u32>>) -> Vec<Vec<u32>> {
        for component in components.iter_mut() {
            component.sort_unstable();
        }
        components.sort();
        components
    }

    #[test]
    fn only_cycles_are_reported() {
        // 1 -> 2 -> 3 -> 1, 3 -> 4, 4 -> 5, 5 -> 5
        let mut graph = DependencyGraph::new(6);
        for (from, to) in [(1, 2), (2, 3), (3, 1), (3, 4), (4, 5), (5, 5)] {
            graph.add_edge(from, to);
        }

        assert_eq!(
            sorted(graph.cyclic_components()),
            vec![vec![1, 2, 3], vec![5]]
        );
    }

    #[test]
    fn components_come_in_reverse_topological_order() {
        // {1, 2} depends on {3, 4}
        let mut graph = DependencyGraph::new(5);
        for (from, to) in [(1, 2), (2, 1), (2, 3), (3, 4), (4, 3)] {
            graph.add_edge(from, to);
        }

        let components = sorted_members(graph.cyclic_components());
        assert_eq!(components, vec![vec![3, 4], vec![1, 2]]);
    }

    fn sorted_members(mut components: Vec<Vec<u32>>) -> Vec<Vec<u32>> {
        for component in components.iter_mut() {
            component.sort_unstable();
        }
        components
    }

    #[test]
    fn long_chains_do_not_overflow_the_stack() {
        let num_nodes = 200_000;
        let mut graph = DependencyGraph::new(num_nodes);
        for node in 1..num_nodes as u32 - 1 {
            graph.add_edge(node, node + 1);
        }
        graph.add_edge(num_nodes as u32 - 1, 1);

        let components = graph.cyclic_components();
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].len(), num_nodes - 1);
    }
}
