//! Radix tree over dotted package paths.
//!
//! Each node is one package segment; values sit on the node their path names.
//! A node may hold values and children at the same time (that shape is what
//! the clash diagnostic reports, but the tree itself allows it).

#[derive(Debug)]
struct RadixNode<E> {
    name: String,
    children: Vec<RadixNode<E>>,
    values: Vec<E>,
}

impl<E> RadixNode<E> {
    fn new(name: String) -> Self {
        Self {
            name,
            children: Vec::new(),
            values: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub struct PackageRadixTree<E> {
    root: RadixNode<E>,
}

impl<E> PackageRadixTree<E> {
    pub fn new() -> Self {
        Self {
            root: RadixNode::new(String::new()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.root.children.is_empty() && self.root.values.is_empty()
    }

    /// Inserts a value at the node addressed by `path`. An empty path
    /// addresses the root.
    pub fn insert(&mut self, path: &str, value: E) {
        let mut node = &mut self.root;
        for segment in path.split('.').filter(|s| !s.is_empty()) {
            let position = node.children.iter().position(|c| c.name == segment);
            let index = match position {
                Some(index) => index,
                None => {
                    node.children.push(RadixNode::new(segment.to_string()));
                    node.children.len() - 1
                }
            };
            node = &mut node.children[index];
        }
        node.values.push(value);
    }

    /// Bottom-up fold: children are folded first (in insertion order), then
    /// `f` combines the node name, folded children, and the node's values.
    pub fn fold<T>(self, f: &mut impl FnMut(&str, Vec<T>, Vec<E>) -> T) -> T {
        Self::fold_node(self.root, f)
    }

    fn fold_node<T>(node: RadixNode<E>, f: &mut impl FnMut(&str, Vec<T>, Vec<E>) -> T) -> T {
        let children = node
            .children
            .into_iter()
            .map(|child| Self::fold_node(child, f))
            .collect();
        f(&node.name, children, node.values)
    }
}

impl<E> Default for PackageRadixTree<E> {
    fn default() -> Self {
        Self::new()
    }
}
