use super::dom::*;

/// Child indices from a list of contents down to an element.
///
/// Paths compare in document order: an ancestor sorts before its
/// descendants, and earlier siblings before later ones.
#[derive(Debug, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct NodePath(pub Vec<usize>);

impl NodePath {
    pub fn child(&self, index: usize) -> Self {
        let mut path = self.0.clone();
        path.push(index);
        Self(path)
    }

    /// Append a path that is relative to the element at `self`
    pub fn join(&self, relative: &NodePath) -> Self {
        Self(self.0.iter().chain(relative.0.iter()).copied().collect())
    }

    /// True when `self` lies strictly above `other`
    pub fn is_ancestor_of(&self, other: &NodePath) -> bool {
        other.0.len() > self.0.len() && other.0.starts_with(&self.0)
    }
}

/// Preorder walk over every element below a list of contents, yielding
/// each element with its path and its parent element (if any).
pub struct Descendants<'a> {
    stack: Vec<(NodePath, &'a DOMElement, Option<&'a DOMElement>)>,
}

impl<'a> Descendants<'a> {
    pub fn of(contents: &'a [DOMContent]) -> Self {
        let mut walk = Self { stack: Vec::new() };
        walk.push_children(&NodePath::default(), contents, None);
        walk
    }

    fn push_children(
        &mut self,
        path: &NodePath,
        contents: &'a [DOMContent],
        parent: Option<&'a DOMElement>,
    ) {
        for (i, content) in contents.iter().enumerate().rev() {
            if let DOMContent::Element(e) = content {
                self.stack.push((path.child(i), e, parent));
            }
        }
    }
}

impl<'a> Iterator for Descendants<'a> {
    type Item = (NodePath, &'a DOMElement, Option<&'a DOMElement>);

    fn next(&mut self) -> Option<Self::Item> {
        let (path, element, parent) = self.stack.pop()?;
        self.push_children(&path, &element.contents, Some(element));
        Some((path, element, parent))
    }
}

fn element_at<'a>(contents: &'a [DOMContent], path: &NodePath) -> Option<&'a DOMElement> {
    let (first, rest) = path.0.split_first()?;
    let mut current = match contents.get(*first)? {
        DOMContent::Element(e) => e,
        _ => return None,
    };
    for i in rest {
        current = match current.contents.get(*i)? {
            DOMContent::Element(e) => e,
            _ => return None,
        };
    }
    Some(current)
}

fn element_at_mut<'a>(
    contents: &'a mut [DOMContent],
    path: &NodePath,
) -> Option<&'a mut DOMElement> {
    let (first, rest) = path.0.split_first()?;
    let mut current = match contents.get_mut(*first)? {
        DOMContent::Element(e) => e,
        _ => return None,
    };
    for i in rest {
        current = match current.contents.get_mut(*i)? {
            DOMContent::Element(e) => e,
            _ => return None,
        };
    }
    Some(current)
}

impl Document {
    /// Every element in document order
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants::of(&self.contents)
    }

    /// The first element in document order carrying `id`
    pub fn find_by_id(&self, id: &str) -> Option<(NodePath, &DOMElement)> {
        self.descendants()
            .find(|(_, e, _)| e.id() == Some(id))
            .map(|(path, e, _)| (path, e))
    }

    pub fn element_at(&self, path: &NodePath) -> Option<&DOMElement> {
        element_at(&self.contents, path)
    }

    pub fn element_at_mut(&mut self, path: &NodePath) -> Option<&mut DOMElement> {
        element_at_mut(&mut self.contents, path)
    }

    pub fn get_elements_by_name(&self, name: &str) -> Vec<&DOMElement> {
        self.descendants()
            .filter(|(_, e, _)| e.name == name)
            .map(|(_, e, _)| e)
            .collect()
    }
}

impl DOMElement {
    /// Every element below this one, with paths relative to it
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants::of(&self.contents)
    }

    pub fn element_at(&self, path: &NodePath) -> Option<&DOMElement> {
        element_at(&self.contents, path)
    }

    pub fn element_at_mut(&mut self, path: &NodePath) -> Option<&mut DOMElement> {
        element_at_mut(&mut self.contents, path)
    }
}
