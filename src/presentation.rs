//! Presentation trees: the parent-child forest derived from a
//! `PresentationLinkbase`'s base sets, one tree per extended link role.

use crate::error::{Error, Result, TaxonomyCreationError};
use crate::ids::{ConceptId, ElementId};
use crate::linkbase::PresentationLinkbase;
use crate::xlink::arcrole;
use compact_str::CompactString;
use indexmap::IndexMap;

/// One node in a presentation tree. Indices (`parent`/`children`) are
/// positions into the owning `PresentationTree::nodes`.
#[derive(Debug, Clone)]
pub struct PresentationNode {
    pub concept: ConceptId,
    pub element: ElementId,
    pub extended_link_role: CompactString,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub level: u32,
    /// Count of this node's descendants (itself included) that sit at the
    /// tree's deepest level.
    pub num_successor_at_deepest_level: u32,
    /// 1-based rank in depth-first pre-order among deepest-level nodes;
    /// `0` for nodes that aren't at the deepest level.
    pub position_deepest_level: u32,
}

#[derive(Debug, Default)]
pub struct PresentationTree {
    pub role: CompactString,
    pub nodes: Vec<PresentationNode>,
    pub roots: Vec<usize>,
}

impl PresentationTree {
    pub fn node(&self, index: usize) -> &PresentationNode {
        &self.nodes[index]
    }

    /// Pre-order walk of `index` and every descendant.
    pub fn subtree(&self, index: usize) -> Vec<&PresentationNode> {
        let mut out = Vec::new();
        let mut stack = vec![index];
        while let Some(i) = stack.pop() {
            out.push(&self.nodes[i]);
            stack.extend(self.nodes[i].children.iter().rev().copied());
        }
        out
    }
}

#[derive(Debug, Default)]
pub struct PresentationEngine {
    trees: IndexMap<CompactString, PresentationTree>,
}

impl PresentationEngine {
    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.trees.keys().map(|s| s.as_str())
    }

    pub fn tree(&self, role: &str) -> Option<&PresentationTree> {
        self.trees.get(role)
    }

    pub fn root(&self, role: &str) -> Vec<&PresentationNode> {
        self.tree(role)
            .map(|t| t.roots.iter().map(|&i| &t.nodes[i]).collect())
            .unwrap_or_default()
    }

    pub fn elements_for(&self, role: &str, concept: ConceptId) -> Vec<&PresentationNode> {
        self.tree(role)
            .map(|t| t.nodes.iter().filter(|n| n.concept == concept).collect())
            .unwrap_or_default()
    }

    pub fn subtree_for(&self, role: &str, concept: ConceptId) -> Vec<&PresentationNode> {
        let Some(tree) = self.tree(role) else {
            return Vec::new();
        };
        tree.nodes
            .iter()
            .position(|n| n.concept == concept)
            .map(|i| tree.subtree(i))
            .unwrap_or_default()
    }
}

/// Build every role's presentation tree from its `parent-child` base set.
pub fn build(presentation: &PresentationLinkbase, legacy_parent: bool) -> Result<PresentationEngine> {
    let mut engine = PresentationEngine::default();
    for role in presentation.0.extended_link_roles() {
        let tree = build_tree(presentation, role, legacy_parent)?;
        engine.trees.insert(CompactString::new(role), tree);
    }
    Ok(engine)
}

fn build_tree(
    presentation: &PresentationLinkbase,
    role: &str,
    legacy_parent: bool,
) -> Result<PresentationTree> {
    let graph = &presentation.0;
    let arcs = graph.arc_base_set(arcrole::PARENT_CHILD, role);

    let mut children_of: IndexMap<ElementId, Vec<(f64, ElementId)>> = IndexMap::new();
    let mut parents_of: IndexMap<ElementId, Vec<ElementId>> = IndexMap::new();
    for arc in &arcs {
        children_of.entry(arc.source).or_default().push((arc.order, arc.target));
        parents_of.entry(arc.target).or_default().push(arc.source);
    }
    for v in children_of.values_mut() {
        v.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
    }

    if !legacy_parent {
        if parents_of.values().any(|sources| sources.len() > 1) {
            return Err(Error::TaxonomyCreation(TaxonomyCreationError::AmbiguousPresentationParent {
                role: CompactString::new(role),
            }));
        }
    } else {
        for (target, sources) in parents_of.iter() {
            if sources.len() > 1 {
                for &extra_source in &sources[1..] {
                    if let Some(v) = children_of.get_mut(&extra_source) {
                        v.retain(|&(_, t)| t != *target);
                    }
                }
            }
        }
    }

    let elements = graph.elements_in_role(role);
    let roots: Vec<ElementId> = elements
        .iter()
        .copied()
        .filter(|e| graph.locator(*e).is_some() && !parents_of.contains_key(e))
        .collect();

    struct Frame {
        element: ElementId,
        parent: Option<usize>,
        level: u32,
    }

    let mut nodes: Vec<PresentationNode> = Vec::new();
    let mut root_indices = Vec::new();
    let mut visited: std::collections::HashSet<ElementId> = std::collections::HashSet::new();
    let mut stack: Vec<Frame> = roots
        .iter()
        .rev()
        .map(|&e| Frame {
            element: e,
            parent: None,
            level: 1,
        })
        .collect();

    while let Some(frame) = stack.pop() {
        if !visited.insert(frame.element) {
            continue; // malformed cyclic taxonomy, tolerated like buildTargetNetwork
        }
        let Some(concept) = graph.locator(frame.element).and_then(|l| l.concept()) else {
            continue; // resource-targeted locator: not a valid presentation node
        };
        let node_index = nodes.len();
        nodes.push(PresentationNode {
            concept,
            element: frame.element,
            extended_link_role: CompactString::new(role),
            parent: frame.parent,
            children: Vec::new(),
            level: frame.level,
            num_successor_at_deepest_level: 0,
            position_deepest_level: 0,
        });
        match frame.parent {
            Some(p) => nodes[p].children.push(node_index),
            None => root_indices.push(node_index),
        }
        if let Some(kids) = children_of.get(&frame.element) {
            for &(_, child) in kids.iter().rev() {
                stack.push(Frame {
                    element: child,
                    parent: Some(node_index),
                    level: frame.level + 1,
                });
            }
        }
    }

    annotate_deepest_level(&mut nodes);

    Ok(PresentationTree {
        role: CompactString::new(role),
        nodes,
        roots: root_indices,
    })
}

fn annotate_deepest_level(nodes: &mut [PresentationNode]) {
    let deepest_level = nodes.iter().map(|n| n.level).max().unwrap_or(0);

    let mut counts = vec![0u32; nodes.len()];
    for i in (0..nodes.len()).rev() {
        if nodes[i].level == deepest_level {
            counts[i] = 1;
        }
        if let Some(p) = nodes[i].parent {
            counts[p] += counts[i];
        }
    }
    for (i, n) in nodes.iter_mut().enumerate() {
        n.num_successor_at_deepest_level = counts[i];
    }

    let mut position = 0u32;
    for n in nodes.iter_mut() {
        if n.level == deepest_level {
            position += 1;
            n.position_deepest_level = position;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linkbase::LinkbaseGraph;

    fn two_level_tree() -> PresentationLinkbase {
        let mut graph = LinkbaseGraph::new();
        let role = CompactString::new("role");
        let file = CompactString::new("t.xml");
        let root = graph.add_locator(
            CompactString::new("root"),
            None,
            None,
            None,
            crate::xlink::LocatorTarget::Concept(ConceptId(0)),
            file.clone(),
            role.clone(),
        );
        let child = graph.add_locator(
            CompactString::new("child"),
            None,
            None,
            None,
            crate::xlink::LocatorTarget::Concept(ConceptId(1)),
            file.clone(),
            role.clone(),
        );
        let _ = root;
        graph.add_arc(crate::xlink::Arc {
            source: graph.locators_for_concept(ConceptId(0))[0],
            target: child,
            arcrole: CompactString::new(arcrole::PARENT_CHILD),
            extended_link_role: role,
            context_element: crate::xlink::ContextElement::Unset,
            target_role: None,
            order: 1.0,
            weight: 1.0,
            priority: 0,
            use_: crate::xlink::ArcUse::Optional,
        });
        PresentationLinkbase(graph)
    }

    #[test]
    fn root_has_level_one_and_child_has_level_two() {
        let linkbase = two_level_tree();
        let engine = build(&linkbase, false).unwrap();
        let tree = engine.tree("role").unwrap();

        assert_eq!(tree.roots.len(), 1);
        let root = tree.node(tree.roots[0]);
        assert_eq!(root.level, 1);
        assert_eq!(root.children.len(), 1);
        let child = tree.node(root.children[0]);
        assert_eq!(child.level, 2);
        assert_eq!(child.parent, Some(tree.roots[0]));
    }

    #[test]
    fn deepest_level_annotation_counts_leaf_successors() {
        let linkbase = two_level_tree();
        let engine = build(&linkbase, false).unwrap();
        let tree = engine.tree("role").unwrap();

        let root = tree.node(tree.roots[0]);
        assert_eq!(root.num_successor_at_deepest_level, 1);
        let child = tree.node(root.children[0]);
        assert_eq!(child.position_deepest_level, 1);
    }
}
