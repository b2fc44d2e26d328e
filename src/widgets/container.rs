//! Container widget: vertical stacking of owned children.

use crate::core::component::{Component, ComponentId};
use crate::runtime::wake::RenderHandle;

pub struct Container {
    id: ComponentId,
    children: Vec<Box<dyn Component>>,
    handle: Option<RenderHandle>,
    previous_child_count: usize,
}

impl Default for Container {
    fn default() -> Self {
        Self {
            id: ComponentId::next(),
            children: Vec::new(),
            handle: None,
            previous_child_count: 0,
        }
    }
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a child, wiring it to this container's render handle.
    ///
    /// Returns the child's id, if it has one.
    pub fn add_child(&mut self, mut component: Box<dyn Component>) -> Option<ComponentId> {
        let id = component.id();
        if let Some(handle) = &self.handle {
            component.attach(Some(handle.clone()));
        }
        self.children.push(component);
        self.request_render();
        id
    }

    /// Remove the child whose id is `id`. Only direct children are searched.
    pub fn remove_child(&mut self, id: ComponentId) -> Option<Box<dyn Component>> {
        let index = self
            .children
            .iter()
            .position(|child| child.id() == Some(id))?;
        self.remove_child_at(index)
    }

    pub fn remove_child_at(&mut self, index: usize) -> Option<Box<dyn Component>> {
        if index >= self.children.len() {
            return None;
        }
        let mut child = self.children.remove(index);
        child.attach(None);
        self.request_render();
        Some(child)
    }

    pub fn clear(&mut self) {
        if self.children.is_empty() {
            return;
        }
        for child in self.children.iter_mut() {
            child.attach(None);
        }
        self.children.clear();
        self.request_render();
    }

    pub fn get_child(&self, index: usize) -> Option<&dyn Component> {
        self.children.get(index).map(|child| child.as_ref())
    }

    pub fn get_child_mut(&mut self, index: usize) -> Option<&mut (dyn Component + 'static)> {
        self.children.get_mut(index).map(|child| child.as_mut())
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Whether children were added or removed since the last render.
    pub fn structure_changed(&self) -> bool {
        self.children.len() != self.previous_child_count
    }

    fn request_render(&self) {
        if let Some(handle) = &self.handle {
            handle.request_render();
        }
    }
}

impl Component for Container {
    fn render(&mut self, width: usize) -> Vec<String> {
        let mut lines = Vec::new();
        for child in self.children.iter_mut() {
            lines.extend(child.render(width));
        }
        self.previous_child_count = self.children.len();
        lines
    }

    fn invalidate(&mut self) {
        for child in self.children.iter_mut() {
            child.invalidate();
        }
    }

    fn id(&self) -> Option<ComponentId> {
        Some(self.id)
    }

    fn children_mut(&mut self) -> Option<&mut [Box<dyn Component>]> {
        Some(&mut self.children)
    }

    fn attach(&mut self, handle: Option<RenderHandle>) {
        for child in self.children.iter_mut() {
            child.attach(handle.clone());
        }
        self.handle = handle;
    }
}
