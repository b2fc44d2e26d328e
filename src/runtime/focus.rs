//! Focus tracking.
//!
//! Focus is stored as a [`ComponentId`] and resolved against the tree on demand, so a
//! component removed from the tree silently stops receiving input.

use crate::core::component::{find_component_mut, Component, ComponentId};

#[derive(Debug, Default)]
pub struct FocusState {
    focused: Option<ComponentId>,
}

impl FocusState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move focus to `target`, updating `Focusable` flags on both ends.
    pub fn set_focus(&mut self, root: &mut dyn Component, target: Option<ComponentId>) {
        if self.focused == target {
            return;
        }

        if let Some(previous) = self.focused.take() {
            set_flag(root, previous, false);
        }
        if let Some(next) = target {
            set_flag(root, next, true);
        }
        self.focused = target;
    }

    pub fn clear(&mut self, root: &mut dyn Component) {
        self.set_focus(root, None);
    }

    pub fn focused(&self) -> Option<ComponentId> {
        self.focused
    }

    /// The focused component, if it is still in the tree.
    pub fn focused_mut<'a>(&self, root: &'a mut dyn Component) -> Option<&'a mut dyn Component> {
        find_component_mut(root, self.focused?)
    }
}

fn set_flag(root: &mut dyn Component, id: ComponentId, focused: bool) {
    if let Some(focusable) = find_component_mut(root, id).and_then(|c| c.as_focusable()) {
        focusable.set_focused(focused);
    }
}

#[cfg(test)]
mod tests {
    use super::FocusState;
    use crate::core::component::{find_component_mut, Component, ComponentId, Focusable};
    use crate::widgets::Container;

    struct TestComponent {
        id: ComponentId,
        focused: bool,
    }

    impl TestComponent {
        fn boxed() -> (ComponentId, Box<dyn Component>) {
            let id = ComponentId::next();
            (id, Box::new(Self { id, focused: false }))
        }
    }

    impl Component for TestComponent {
        fn render(&mut self, _width: usize) -> Vec<String> {
            Vec::new()
        }

        fn id(&self) -> Option<ComponentId> {
            Some(self.id)
        }

        fn as_focusable(&mut self) -> Option<&mut dyn Focusable> {
            Some(self)
        }
    }

    impl Focusable for TestComponent {
        fn set_focused(&mut self, focused: bool) {
            self.focused = focused;
        }

        fn is_focused(&self) -> bool {
            self.focused
        }
    }

    fn is_focused(root: &mut Container, id: ComponentId) -> bool {
        find_component_mut(root, id)
            .and_then(|component| component.as_focusable())
            .is_some_and(|focusable| focusable.is_focused())
    }

    #[test]
    fn focus_toggles_flags() {
        let mut root = Container::new();
        let (first, first_component) = TestComponent::boxed();
        let (second, second_component) = TestComponent::boxed();
        root.add_child(first_component);
        root.add_child(second_component);

        let mut focus = FocusState::new();
        focus.set_focus(&mut root, Some(first));
        assert!(is_focused(&mut root, first));
        assert!(!is_focused(&mut root, second));

        focus.set_focus(&mut root, Some(second));
        assert!(!is_focused(&mut root, first));
        assert!(is_focused(&mut root, second));

        focus.clear(&mut root);
        assert!(!is_focused(&mut root, second));
        assert_eq!(focus.focused(), None);
    }

    #[test]
    fn removed_component_is_not_resolved() {
        let mut root = Container::new();
        let (id, component) = TestComponent::boxed();
        root.add_child(component);

        let mut focus = FocusState::new();
        focus.set_focus(&mut root, Some(id));
        assert!(focus.focused_mut(&mut root).is_some());

        root.remove_child(id);
        assert!(focus.focused_mut(&mut root).is_none());
    }
}
