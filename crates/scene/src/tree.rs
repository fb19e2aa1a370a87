use glam::{Mat4, Quat, UVec2, Vec3};
use lumen_common::{Frustum, InputState, Transform};
use slotmap::SlotMap;

use crate::behavior::{Behavior, UpdateContext};
use crate::camera::Camera;
use crate::node::{Node, NodeId, NodeKind};
use crate::registry::RenderRegistry;

/// Errors from scene tree operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SceneError {
    #[error("node not found: {0:?}")]
    NodeNotFound(NodeId),
    #[error("node {0:?} is not a camera")]
    NotACamera(NodeId),
    #[error("the root node cannot be removed")]
    RootRemoval,
    #[error("cannot move {node:?} under {new_parent:?}")]
    InvalidReparent { node: NodeId, new_parent: NodeId },
}

/// Arena-backed scene hierarchy.
///
/// The tree exclusively owns every node; parents own their children and a
/// child's lifetime ends with its parent's. Parent links are plain handles, so
/// there are no ownership cycles.
///
/// Nodes register with the [`RenderRegistry`] once fully attached and
/// unregister before their slot is freed, so the registry only ever holds
/// handles of live nodes.
///
/// Removal requested while [`update`](Self::update) is walking the tree is
/// queued and carried out when the walk ends; the queue is also drained at the
/// start of every update, so no request survives into the next frame's walk.
#[derive(Debug)]
pub struct SceneTree {
    nodes: SlotMap<NodeId, Node>,
    root: NodeId,
    registry: RenderRegistry,
    pending_removals: Vec<NodeId>,
    traversal_depth: u32,
    /// Copy of the behaviour currently detached for its `update` call.
    running: Option<(NodeId, Box<dyn Behavior>)>,
    framebuffer_size: UVec2,
}

impl Default for SceneTree {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneTree {
    /// Create a tree holding only a spatial root named `"root"`.
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Node::spatial("root"));
        Self {
            nodes,
            root,
            registry: RenderRegistry::new(),
            pending_removals: Vec::new(),
            traversal_depth: 0,
            running: None,
            framebuffer_size: UVec2::new(1280, 720),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of live nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    fn get(&self, id: NodeId) -> Result<&Node, SceneError> {
        self.nodes.get(id).ok_or(SceneError::NodeNotFound(id))
    }

    fn get_mut(&mut self, id: NodeId) -> Result<&mut Node, SceneError> {
        self.nodes.get_mut(id).ok_or(SceneError::NodeNotFound(id))
    }

    pub fn registry(&self) -> &RenderRegistry {
        &self.registry
    }

    pub fn framebuffer_size(&self) -> UVec2 {
        self.framebuffer_size
    }

    /// Framebuffer extent used by cameras in automatic aspect mode.
    pub fn set_framebuffer_size(&mut self, size: UVec2) {
        if size != self.framebuffer_size {
            tracing::debug!(width = size.x, height = size.y, "framebuffer resized");
            self.framebuffer_size = size;
        }
    }

    // ---- structure ----

    /// Attach `node` as the last child of `parent` and register it.
    pub fn add_child(&mut self, parent: NodeId, mut node: Node) -> Result<NodeId, SceneError> {
        self.get(parent)?;
        node.parent = Some(parent);
        node.children.clear();
        let id = self.nodes.insert(node);
        self.get_mut(parent)?.children.push(id);
        self.register(id);
        tracing::debug!(?id, ?parent, "node attached");
        Ok(id)
    }

    fn register(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        match node.kind() {
            NodeKind::Spatial => {}
            NodeKind::Camera(_) => self.registry.register_camera(id),
            NodeKind::Drawable(_) => self.registry.register_drawable(id),
            NodeKind::PointLight(_) => self.registry.register_point_light(id),
            NodeKind::GuiCanvas(_) => self.registry.register_gui_canvas(id),
        }
    }

    fn unregister(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        match node.kind() {
            NodeKind::Spatial => {}
            NodeKind::Camera(_) => self.registry.unregister_camera(id),
            NodeKind::Drawable(_) => self.registry.unregister_drawable(id),
            NodeKind::PointLight(_) => self.registry.unregister_point_light(id),
            NodeKind::GuiCanvas(_) => self.registry.unregister_gui_canvas(id),
        }
    }

    /// Pick which registered camera renders.
    pub fn make_current_camera(&mut self, id: NodeId) -> Result<(), SceneError> {
        self.get(id)?.as_camera().ok_or(SceneError::NotACamera(id))?;
        self.registry.make_current_camera(id);
        Ok(())
    }

    /// Destroy `id` and its whole subtree.
    ///
    /// During an update walk the request is queued instead and carried out
    /// when the walk ends.
    pub fn remove_node(&mut self, id: NodeId) -> Result<(), SceneError> {
        if id == self.root {
            return Err(SceneError::RootRemoval);
        }
        self.get(id)?;
        if self.traversal_depth > 0 {
            self.queue_remove(id);
            return Ok(());
        }
        self.destroy_subtree(id);
        Ok(())
    }

    /// Ask for `id` to be removed at the next flush point.
    pub fn queue_remove(&mut self, id: NodeId) {
        if id == self.root {
            tracing::warn!("ignoring removal request for the root node");
            return;
        }
        if !self.pending_removals.contains(&id) {
            tracing::debug!(?id, "node removal queued");
            self.pending_removals.push(id);
        }
    }

    pub fn pending_removals(&self) -> &[NodeId] {
        &self.pending_removals
    }

    /// Carry out queued removals. Requests for nodes that are already gone
    /// (for instance removed along with an ancestor) are dropped silently.
    pub fn flush_removals(&mut self) {
        if self.pending_removals.is_empty() {
            return;
        }
        let pending = std::mem::take(&mut self.pending_removals);
        tracing::debug!(count = pending.len(), "flushing queued removals");
        for id in pending {
            if self.nodes.contains_key(id) {
                self.destroy_subtree(id);
            }
        }
    }

    fn destroy_subtree(&mut self, id: NodeId) {
        let parent = self.nodes.get(id).and_then(Node::parent);
        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(p)) {
            parent.children.retain(|&c| c != id);
        }
        let mut doomed = self.subtree_preorder(id);
        // Children go before their parents.
        doomed.reverse();
        for victim in &doomed {
            self.unregister(*victim);
            self.nodes.remove(*victim);
            self.pending_removals.retain(|p| p != victim);
        }
        tracing::debug!(?id, count = doomed.len(), "subtree destroyed");
    }

    /// Move `node` (with its subtree) under `new_parent`, as the last child.
    ///
    /// Fails for the root and when `new_parent` lies inside `node`'s subtree.
    pub fn reparent(&mut self, node: NodeId, new_parent: NodeId) -> Result<(), SceneError> {
        self.get(node)?;
        self.get(new_parent)?;
        if node == self.root || self.is_ancestor_or_self(node, new_parent) {
            return Err(SceneError::InvalidReparent { node, new_parent });
        }
        if let Some(old_parent) = self.get(node)?.parent() {
            self.get_mut(old_parent)?.children.retain(|&c| c != node);
        }
        self.get_mut(node)?.parent = Some(new_parent);
        self.get_mut(new_parent)?.children.push(node);
        tracing::debug!(?node, ?new_parent, "node reparented");
        Ok(())
    }

    fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(c) = current {
            if c == ancestor {
                return true;
            }
            current = self.nodes.get(c).and_then(Node::parent);
        }
        false
    }

    /// Deep-copy the subtree at `source` under `new_parent`.
    ///
    /// Copies keep names, transforms, enable flags, role state and behaviours,
    /// start with empty caches, and register like freshly built nodes.
    pub fn copy_subtree(&mut self, source: NodeId, new_parent: NodeId) -> Result<NodeId, SceneError> {
        self.get(source)?;
        self.get(new_parent)?;
        // Snapshot the source first so copying into its own subtree terminates.
        let mut plan: Vec<(NodeId, Option<NodeId>)> = Vec::new();
        for id in self.subtree_preorder(source) {
            let parent = if id == source { None } else { self.get(id)?.parent() };
            plan.push((id, parent));
        }
        let mut copies: Vec<(NodeId, NodeId)> = Vec::with_capacity(plan.len());
        for (original, original_parent) in plan {
            let target_parent = match original_parent {
                None => new_parent,
                Some(p) => copies
                    .iter()
                    .find(|(o, _)| *o == p)
                    .map(|(_, c)| *c)
                    .ok_or(SceneError::NodeNotFound(p))?,
            };
            let mut copy = self.get(original)?.detached_copy();
            if copy.behavior.is_none() {
                copy.behavior = self
                    .running
                    .as_ref()
                    .filter(|(running, _)| *running == original)
                    .map(|(_, behavior)| behavior.box_clone());
            }
            let id = self.add_child(target_parent, copy)?;
            copies.push((original, id));
        }
        let root_copy = copies
            .first()
            .map(|(_, c)| *c)
            .ok_or(SceneError::NodeNotFound(source))?;
        tracing::debug!(?source, copy = ?root_copy, count = copies.len(), "subtree copied");
        Ok(root_copy)
    }

    /// Ids of `id` and all its descendants, parents before children.
    pub fn subtree_preorder(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get(current) else {
                continue;
            };
            out.push(current);
            stack.extend(node.children().iter().rev().copied());
        }
        out
    }

    /// First node named `name`, searching the whole tree in pre-order.
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.subtree_preorder(self.root)
            .into_iter()
            .find(|&id| self.nodes.get(id).is_some_and(|n| n.name() == name))
    }

    // ---- enable / disable ----

    pub fn set_enabled(&mut self, id: NodeId, enabled: bool) -> Result<(), SceneError> {
        self.get_mut(id)?.set_self_enabled(enabled);
        Ok(())
    }

    /// Enabled when the node and every ancestor are enabled.
    pub fn is_enabled(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(c) = current {
            match self.nodes.get(c) {
                Some(node) if node.is_self_enabled() => current = node.parent(),
                _ => return false,
            }
        }
        true
    }

    // ---- per-frame update ----

    /// Run every enabled node's behaviour, parents before children.
    ///
    /// Queued removals are flushed before the walk and again after it.
    /// Nodes attached during the walk are first updated next frame.
    pub fn update(&mut self, delta_time: f32, input: &dyn InputState) {
        let _span = tracing::info_span!("scene_update").entered();
        self.flush_removals();

        let order: Vec<NodeId> = self
            .subtree_preorder(self.root)
            .into_iter()
            .filter(|&id| self.nodes.get(id).is_some_and(Node::has_behavior))
            .collect();

        self.traversal_depth += 1;
        for id in order {
            if !self.is_enabled(id) {
                continue;
            }
            let Some(mut behavior) = self.nodes.get_mut(id).and_then(|n| n.behavior.take()) else {
                continue;
            };
            // Copies of this node made from inside `update` still get a behaviour.
            self.running = Some((id, behavior.box_clone()));
            let mut ctx = UpdateContext {
                tree: self,
                delta_time,
                input,
            };
            behavior.update(id, &mut ctx);
            self.running = None;
            // A behaviour may have installed a replacement on its own node.
            if let Some(node) = self.nodes.get_mut(id) {
                node.behavior.get_or_insert(behavior);
            }
        }
        self.traversal_depth -= 1;

        self.flush_removals();
    }

    // ---- transform setters ----

    pub fn set_transform(&mut self, id: NodeId, transform: Transform) -> Result<(), SceneError> {
        self.get_mut(id)?.set_transform(transform);
        Ok(())
    }

    pub fn set_translation(&mut self, id: NodeId, translation: Vec3) -> Result<(), SceneError> {
        self.get_mut(id)?.set_translation(translation);
        Ok(())
    }

    pub fn translate(&mut self, id: NodeId, delta: Vec3) -> Result<(), SceneError> {
        self.get_mut(id)?.translate(delta);
        Ok(())
    }

    pub fn set_scale(&mut self, id: NodeId, scale: Vec3) -> Result<(), SceneError> {
        self.get_mut(id)?.set_scale(scale);
        Ok(())
    }

    pub fn set_rotation(&mut self, id: NodeId, rotation: Quat) -> Result<(), SceneError> {
        self.get_mut(id)?.set_rotation(rotation);
        Ok(())
    }

    // ---- transform queries ----

    pub fn transform(&self, id: NodeId) -> Result<Transform, SceneError> {
        Ok(*self.get(id)?.transform())
    }

    pub fn local_matrix(&self, id: NodeId) -> Result<Mat4, SceneError> {
        Ok(self.get(id)?.local_matrix())
    }

    /// The node followed by its ancestors up to the root.
    fn lineage(&self, id: NodeId) -> Result<impl Iterator<Item = &Node>, SceneError> {
        let first = self.get(id)?;
        Ok(std::iter::successors(Some(first), |n| {
            n.parent().and_then(|p| self.nodes.get(p))
        }))
    }

    /// Sum of translations from the node up to the root.
    pub fn global_position(&self, id: NodeId) -> Result<Vec3, SceneError> {
        Ok(self.lineage(id)?.map(|n| n.transform().translation).sum())
    }

    /// Product of scales from the node up to the root.
    pub fn global_scale(&self, id: NodeId) -> Result<Vec3, SceneError> {
        Ok(self.lineage(id)?.map(|n| n.transform().scale).product())
    }

    /// `local * parent_global`, applied up to the root.
    pub fn global_rotation(&self, id: NodeId) -> Result<Quat, SceneError> {
        Ok(self
            .lineage(id)?
            .fold(Quat::IDENTITY, |acc, n| acc * n.transform().rotation))
    }

    pub fn global_transform(&self, id: NodeId) -> Result<Transform, SceneError> {
        Ok(self
            .lineage(id)?
            .fold(Transform::IDENTITY, |acc, n| acc * *n.transform()))
    }

    /// `local_matrix * parent_global_matrix`, applied up to the root.
    ///
    /// Recomputed on every call; only the per-node local matrices are cached.
    pub fn global_matrix(&self, id: NodeId) -> Result<Mat4, SceneError> {
        Ok(self
            .lineage(id)?
            .fold(Mat4::IDENTITY, |acc, n| acc * n.local_matrix()))
    }

    // ---- cameras ----

    pub fn camera(&self, id: NodeId) -> Result<CameraView<'_>, SceneError> {
        let camera = self.get(id)?.as_camera().ok_or(SceneError::NotACamera(id))?;
        Ok(CameraView {
            tree: self,
            id,
            camera,
        })
    }

    pub fn camera_mut(&mut self, id: NodeId) -> Result<&mut Camera, SceneError> {
        self.get_mut(id)?
            .as_camera_mut()
            .ok_or(SceneError::NotACamera(id))
    }

    /// The registry's current camera, if any.
    pub fn current_camera(&self) -> Option<CameraView<'_>> {
        let id = self.registry.current_camera()?;
        self.camera(id).ok()
    }
}

/// A camera node bound to its tree, so queries can resolve the global pose
/// and framebuffer size.
#[derive(Debug, Clone, Copy)]
pub struct CameraView<'a> {
    tree: &'a SceneTree,
    id: NodeId,
    camera: &'a Camera,
}

impl<'a> CameraView<'a> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn camera(&self) -> &'a Camera {
        self.camera
    }

    fn pose(&self) -> (Vec3, Quat) {
        let position = self.tree.global_position(self.id).unwrap_or(Vec3::ZERO);
        let rotation = self.tree.global_rotation(self.id).unwrap_or(Quat::IDENTITY);
        (position, rotation)
    }

    pub fn position(&self) -> Vec3 {
        self.pose().0
    }

    /// World-space looking direction.
    pub fn direction(&self) -> Vec3 {
        self.pose().1 * Vec3::Z
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.camera.aspect_ratio(self.tree.framebuffer_size())
    }

    pub fn view_matrix(&self) -> Mat4 {
        let (position, rotation) = self.pose();
        self.camera.view_matrix(position, rotation)
    }

    pub fn proj_matrix(&self) -> Mat4 {
        self.camera.proj_matrix(self.tree.framebuffer_size())
    }

    pub fn view_proj_matrix(&self) -> Mat4 {
        let (position, rotation) = self.pose();
        self.camera
            .view_proj_matrix(position, rotation, self.tree.framebuffer_size())
    }

    pub fn frustum(&self) -> Frustum {
        let global = self.tree.global_matrix(self.id).unwrap_or(Mat4::IDENTITY);
        self.camera.frustum(&global, self.tree.framebuffer_size())
    }
}
