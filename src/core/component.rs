//! Component and Focusable traits.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::runtime::wake::RenderHandle;

/// Process-unique component identifier.
///
/// Ids are handed out from a global counter and never reused. They address components for
/// focus and debugging; the renderer never looks at them.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ComponentId(u64);

impl ComponentId {
    pub fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Renderable component interface.
pub trait Component {
    /// Render to a list of lines at the given width.
    ///
    /// Lines may carry SGR escapes but never a newline. Rendering the same state at the same
    /// width must give the same lines.
    fn render(&mut self, width: usize) -> Vec<String>;

    /// Handle one chunk of raw terminal input.
    fn handle_input(&mut self, _data: &str) {}

    /// Invalidate any cached state.
    fn invalidate(&mut self) {}

    fn id(&self) -> Option<ComponentId> {
        None
    }

    /// Owned children, for components that contain others.
    fn children_mut(&mut self) -> Option<&mut [Box<dyn Component>]> {
        None
    }

    /// Called with the owning runtime's render handle when the component joins a tree, and
    /// with `None` when it leaves.
    fn attach(&mut self, _handle: Option<RenderHandle>) {}

    fn as_focusable(&mut self) -> Option<&mut dyn Focusable> {
        None
    }
}

/// Focusable behavior for components that track focus.
pub trait Focusable {
    fn set_focused(&mut self, focused: bool);
    fn is_focused(&self) -> bool;
}

/// Depth-first search for the component with `id`, starting at `node`.
pub fn find_component_mut(
    node: &mut dyn Component,
    id: ComponentId,
) -> Option<&mut dyn Component> {
    if node.id() == Some(id) {
        return Some(node);
    }
    let children = node.children_mut()?;
    for child in children.iter_mut() {
        if let Some(found) = find_component_mut(child.as_mut(), id) {
            return Some(found);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::{find_component_mut, Component, ComponentId};

    struct Leaf {
        id: ComponentId,
        label: &'static str,
    }

    impl Component for Leaf {
        fn render(&mut self, _width: usize) -> Vec<String> {
            vec![self.label.to_string()]
        }

        fn id(&self) -> Option<ComponentId> {
            Some(self.id)
        }
    }

    struct Branch {
        children: Vec<Box<dyn Component>>,
    }

    impl Component for Branch {
        fn render(&mut self, width: usize) -> Vec<String> {
            self.children
                .iter_mut()
                .flat_map(|child| child.render(width))
                .collect()
        }

        fn children_mut(&mut self) -> Option<&mut [Box<dyn Component>]> {
            Some(&mut self.children)
        }
    }

    #[test]
    fn ids_are_unique_and_increasing() {
        let a = ComponentId::next();
        let b = ComponentId::next();
        assert!(b > a);
    }

    #[test]
    fn finds_nested_component() {
        let target = ComponentId::next();
        let mut root = Branch {
            children: vec![
                Box::new(Leaf {
                    id: ComponentId::next(),
                    label: "first",
                }),
                Box::new(Branch {
                    children: vec![Box::new(Leaf {
                        id: target,
                        label: "deep",
                    })],
                }),
            ],
        };

        let found = find_component_mut(&mut root, target).expect("component");
        assert_eq!(found.render(10), vec!["deep"]);
        assert!(find_component_mut(&mut root, ComponentId::next()).is_none());
    }
}
