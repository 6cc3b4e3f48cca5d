//! Read-only, top-down traversal of a [`Quadtree`].
//!
//! Meant for debug renderers: one wireframe per node boundary, one marker per point.
use super::Quadtree;
use crate::{BoundingSquare, Coordinate};

/// A borrowed snapshot of a single node.
#[derive(Debug, Clone, Copy)]
pub struct NodeView<'a> {
    depth: u32,
    node: &'a Quadtree,
}

impl<'a> NodeView<'a> {
    /// Distance from the root, which is at depth 0.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn boundary(&self) -> &'a BoundingSquare {
        &self.node.boundary
    }

    pub fn points(&self) -> impl Iterator<Item = &'a Coordinate> {
        self.node.points()
    }

    /// Number of points held by this node alone.
    pub fn len(&self) -> usize {
        self.points().count()
    }

    pub fn is_leaf(&self) -> bool {
        self.node.is_leaf()
    }
}

pub trait Visitor {
    fn visit(&mut self, node: NodeView<'_>);
}

impl<F> Visitor for F
where
    F: FnMut(NodeView<'_>),
{
    fn visit(&mut self, node: NodeView<'_>) {
        self(node)
    }
}

/// Pre-order iterator over every node: parent first, then NW, NE, SW, SE.
pub struct Nodes<'a> {
    stack: Vec<NodeView<'a>>,
}

impl<'a> Iterator for Nodes<'a> {
    type Item = NodeView<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let view = self.stack.pop()?;
        if let Some(children) = view.node.children() {
            // reversed so NW is popped first
            for child in children.iter().rev() {
                self.stack.push(NodeView {
                    depth: view.depth + 1,
                    node: child,
                });
            }
        }
        Some(view)
    }
}

impl Quadtree {
    /// Call `visitor` on every node, top-down, in the same order as [`Quadtree::nodes`].
    pub fn visit<V: Visitor>(&self, visitor: &mut V) {
        self.visit_impl(0, visitor);
    }

    fn visit_impl<V: Visitor>(&self, depth: u32, visitor: &mut V) {
        visitor.visit(NodeView { depth, node: self });

        if let Some(children) = self.children() {
            for child in children.iter() {
                child.visit_impl(depth + 1, visitor);
            }
        }
    }

    pub fn nodes(&self) -> Nodes<'_> {
        Nodes {
            stack: vec![NodeView {
                depth: 0,
                node: self,
            }],
        }
    }
}
