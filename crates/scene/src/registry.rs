//! Non-owning render registry.
//!
//! # Invariants
//! - The registry never owns nodes; it only stores handles.
//! - A handle is present exactly while its node is attached to the tree.
//! - Registering or unregistering `None` is a no-op. Unregistering a handle
//!   that is not present is a no-op.
//! - Registering is a plain append. Each handle is registered once; the scene
//!   tree does so when the node is attached.

use crate::node::NodeId;

#[derive(Debug, Clone, Default)]
pub struct RenderRegistry {
    drawables: Vec<NodeId>,
    gui_canvases: Vec<NodeId>,
    point_lights: Vec<NodeId>,
    cameras: Vec<NodeId>,
    current_camera: Option<NodeId>,
}

fn register(list: &mut Vec<NodeId>, id: Option<NodeId>, what: &str) {
    let Some(id) = id else { return };
    list.push(id);
    tracing::trace!(?id, what, "registered");
}

fn unregister(list: &mut Vec<NodeId>, id: Option<NodeId>, what: &str) {
    let Some(id) = id else { return };
    if let Some(pos) = list.iter().position(|&x| x == id) {
        list.remove(pos);
        tracing::trace!(?id, what, "unregistered");
    }
}

impl RenderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_drawable(&mut self, id: impl Into<Option<NodeId>>) {
        register(&mut self.drawables, id.into(), "drawable");
    }

    pub fn unregister_drawable(&mut self, id: impl Into<Option<NodeId>>) {
        unregister(&mut self.drawables, id.into(), "drawable");
    }

    pub fn register_gui_canvas(&mut self, id: impl Into<Option<NodeId>>) {
        register(&mut self.gui_canvases, id.into(), "gui_canvas");
    }

    pub fn unregister_gui_canvas(&mut self, id: impl Into<Option<NodeId>>) {
        unregister(&mut self.gui_canvases, id.into(), "gui_canvas");
    }

    pub fn register_point_light(&mut self, id: impl Into<Option<NodeId>>) {
        register(&mut self.point_lights, id.into(), "point_light");
    }

    pub fn unregister_point_light(&mut self, id: impl Into<Option<NodeId>>) {
        unregister(&mut self.point_lights, id.into(), "point_light");
    }

    pub fn register_camera(&mut self, id: impl Into<Option<NodeId>>) {
        register(&mut self.cameras, id.into(), "camera");
    }

    pub fn unregister_camera(&mut self, id: impl Into<Option<NodeId>>) {
        let id = id.into();
        unregister(&mut self.cameras, id, "camera");
        if id.is_some() && self.current_camera == id {
            self.current_camera = None;
        }
    }

    /// Selects a registered camera as the current one. Unknown handles are
    /// ignored and `false` is returned.
    pub fn make_current_camera(&mut self, id: NodeId) -> bool {
        if self.cameras.contains(&id) {
            self.current_camera = Some(id);
            true
        } else {
            false
        }
    }

    /// The camera picked with [`make_current_camera`](Self::make_current_camera),
    /// otherwise the first registered one.
    pub fn current_camera(&self) -> Option<NodeId> {
        self.current_camera.or_else(|| self.cameras.first().copied())
    }

    pub fn drawables(&self) -> &[NodeId] {
        &self.drawables
    }

    pub fn gui_canvases(&self) -> &[NodeId] {
        &self.gui_canvases
    }

    pub fn point_lights(&self) -> &[NodeId] {
        &self.point_lights
    }

    pub fn cameras(&self) -> &[NodeId] {
        &self.cameras
    }

    pub fn len(&self) -> usize {
        self.drawables.len()
            + self.gui_canvases.len()
            + self.point_lights.len()
            + self.cameras.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn ids(n: usize) -> Vec<NodeId> {
        let mut map: SlotMap<NodeId, ()> = SlotMap::with_key();
        (0..n).map(|_| map.insert(())).collect()
    }

    #[test]
    fn none_is_a_no_op() {
        let mut registry = RenderRegistry::new();
        registry.register_drawable(None::<NodeId>);
        registry.register_camera(None::<NodeId>);
        registry.unregister_point_light(None::<NodeId>);
        registry.unregister_camera(None::<NodeId>);
        assert!(registry.is_empty());
        assert!(registry.current_camera().is_none());
    }

    #[test]
    fn double_unregister_is_harmless() {
        let ids = ids(2);
        let mut registry = RenderRegistry::new();
        registry.register_drawable(ids[0]);
        registry.register_drawable(ids[1]);
        registry.unregister_drawable(ids[0]);
        assert_eq!(registry.drawables(), &[ids[1]]);
        registry.unregister_drawable(ids[0]);
        assert_eq!(registry.drawables(), &[ids[1]]);
    }

    #[test]
    fn unknown_handle_is_ignored() {
        let ids = ids(2);
        let mut registry = RenderRegistry::new();
        registry.register_point_light(ids[0]);
        registry.unregister_point_light(ids[1]);
        assert_eq!(registry.point_lights(), &[ids[0]]);
    }

    #[test]
    fn registration_appends_in_order() {
        let ids = ids(3);
        let mut registry = RenderRegistry::new();
        for &id in &ids {
            registry.register_gui_canvas(id);
        }
        assert_eq!(registry.gui_canvases(), ids.as_slice());
        registry.unregister_gui_canvas(ids[1]);
        assert_eq!(registry.gui_canvases(), &[ids[0], ids[2]]);
    }

    #[test]
    fn current_camera_selection() {
        let ids = ids(3);
        let mut registry = RenderRegistry::new();
        registry.register_camera(ids[0]);
        registry.register_camera(ids[1]);
        assert_eq!(registry.current_camera(), Some(ids[0]));

        assert!(registry.make_current_camera(ids[1]));
        assert_eq!(registry.current_camera(), Some(ids[1]));
        assert!(!registry.make_current_camera(ids[2]));

        registry.unregister_camera(ids[1]);
        assert_eq!(registry.current_camera(), Some(ids[0]));
        registry.unregister_camera(ids[0]);
        assert_eq!(registry.current_camera(), None);
    }
}
