use std::cell::Cell;

use glam::{Mat4, Quat, Vec3};
use lumen_common::Transform;

use crate::behavior::Behavior;
use crate::camera::Camera;
use crate::drawable::{Drawable, GuiCanvas};
use crate::light::PointLight;

slotmap::new_key_type! {
    /// Handle to a node in a [`SceneTree`](crate::SceneTree).
    ///
    /// Handles are generational: once a node is destroyed its handle never
    /// resolves again, even if the slot is reused.
    pub struct NodeId;
}

/// Local transform with a lazily computed local matrix.
///
/// States: clean (`dirty == false`, cache equals `transform.calculate_matrix()`)
/// and dirty. Every mutator goes to dirty; reading the matrix while dirty
/// recomputes and goes back to clean.
#[derive(Debug, Clone)]
pub struct Spatial {
    transform: Transform,
    local_matrix: Cell<Mat4>,
    dirty: Cell<bool>,
    recomputations: Cell<u64>,
}

impl Spatial {
    pub fn new(transform: Transform) -> Self {
        Self {
            transform,
            local_matrix: Cell::new(Mat4::IDENTITY),
            dirty: Cell::new(true),
            recomputations: Cell::new(0),
        }
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
        self.dirty.set(true);
    }

    pub fn set_translation(&mut self, translation: Vec3) {
        self.transform.translation = translation;
        self.dirty.set(true);
    }

    pub fn translate(&mut self, delta: Vec3) {
        self.transform.translation += delta;
        self.dirty.set(true);
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.transform.scale = scale;
        self.dirty.set(true);
    }

    pub fn set_rotation(&mut self, rotation: Quat) {
        self.transform.rotation = rotation;
        self.dirty.set(true);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    pub fn local_matrix(&self) -> Mat4 {
        if self.dirty.get() {
            self.local_matrix.set(self.transform.calculate_matrix());
            self.dirty.set(false);
            self.recomputations.set(self.recomputations.get() + 1);
        }
        self.local_matrix.get()
    }

    /// How many times the local matrix has been rebuilt.
    pub fn recomputations(&self) -> u64 {
        self.recomputations.get()
    }
}

impl Default for Spatial {
    fn default() -> Self {
        Self::new(Transform::IDENTITY)
    }
}

/// Role-specific payload of a node.
#[derive(Debug)]
pub enum NodeKind {
    Spatial,
    Camera(Camera),
    Drawable(Box<dyn Drawable>),
    PointLight(PointLight),
    GuiCanvas(GuiCanvas),
}

impl Clone for NodeKind {
    fn clone(&self) -> Self {
        match self {
            NodeKind::Spatial => NodeKind::Spatial,
            NodeKind::Camera(camera) => NodeKind::Camera(camera.clone()),
            NodeKind::Drawable(drawable) => NodeKind::Drawable(drawable.box_clone()),
            NodeKind::PointLight(light) => NodeKind::PointLight(*light),
            NodeKind::GuiCanvas(canvas) => NodeKind::GuiCanvas(canvas.clone()),
        }
    }
}

impl NodeKind {
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Spatial => "spatial",
            NodeKind::Camera(_) => "camera",
            NodeKind::Drawable(_) => "drawable",
            NodeKind::PointLight(_) => "point_light",
            NodeKind::GuiCanvas(_) => "gui_canvas",
        }
    }
}

/// A scene node: name, enable flag, local transform, role payload and an
/// optional per-frame behaviour.
///
/// Parent and children links are owned by the tree; a node built on its own
/// is detached until passed to [`SceneTree::add_child`](crate::SceneTree::add_child).
#[derive(Debug)]
pub struct Node {
    name: String,
    enabled: bool,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    spatial: Spatial,
    kind: NodeKind,
    pub(crate) behavior: Option<Box<dyn Behavior>>,
}

impl Node {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            parent: None,
            children: Vec::new(),
            spatial: Spatial::default(),
            kind,
            behavior: None,
        }
    }

    pub fn spatial(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Spatial)
    }

    pub fn camera(name: impl Into<String>, camera: Camera) -> Self {
        Self::new(name, NodeKind::Camera(camera))
    }

    pub fn drawable(name: impl Into<String>, drawable: impl Drawable + 'static) -> Self {
        Self::new(name, NodeKind::Drawable(Box::new(drawable)))
    }

    pub fn point_light(name: impl Into<String>, light: PointLight) -> Self {
        Self::new(name, NodeKind::PointLight(light))
    }

    pub fn gui_canvas(name: impl Into<String>, canvas: GuiCanvas) -> Self {
        Self::new(name, NodeKind::GuiCanvas(canvas))
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.spatial.set_transform(transform);
        self
    }

    pub fn with_translation(mut self, translation: Vec3) -> Self {
        self.spatial.set_translation(translation);
        self
    }

    pub fn with_behavior(mut self, behavior: impl Behavior + 'static) -> Self {
        self.behavior = Some(Box::new(behavior));
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Detached copy with fresh caches and no links.
    pub(crate) fn detached_copy(&self) -> Self {
        Self {
            name: self.name.clone(),
            enabled: self.enabled,
            parent: None,
            children: Vec::new(),
            spatial: Spatial::new(*self.spatial.transform()),
            kind: self.kind.clone(),
            behavior: self.behavior.as_ref().map(|b| b.box_clone()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// The node's own flag, ignoring ancestors.
    pub fn is_self_enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn set_self_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn has_behavior(&self) -> bool {
        self.behavior.is_some()
    }

    pub fn set_behavior(&mut self, behavior: Option<Box<dyn Behavior>>) {
        self.behavior = behavior;
    }

    pub fn transform(&self) -> &Transform {
        self.spatial.transform()
    }

    pub fn local_matrix(&self) -> Mat4 {
        self.spatial.local_matrix()
    }

    pub fn local_matrix_recomputations(&self) -> u64 {
        self.spatial.recomputations()
    }

    pub fn is_dirty(&self) -> bool {
        self.spatial.is_dirty()
    }

    pub fn set_transform(&mut self, transform: Transform) {
        self.spatial.set_transform(transform);
        self.invalidate_camera_view();
    }

    pub fn set_translation(&mut self, translation: Vec3) {
        self.spatial.set_translation(translation);
        self.invalidate_camera_view();
    }

    pub fn translate(&mut self, delta: Vec3) {
        self.spatial.translate(delta);
        self.invalidate_camera_view();
    }

    /// Scale does not feed the view matrix, so camera caches stay valid.
    pub fn set_scale(&mut self, scale: Vec3) {
        self.spatial.set_scale(scale);
    }

    pub fn set_rotation(&mut self, rotation: Quat) {
        self.spatial.set_rotation(rotation);
        self.invalidate_camera_view();
    }

    fn invalidate_camera_view(&mut self) {
        if let NodeKind::Camera(camera) = &mut self.kind {
            camera.invalidate_view();
        }
    }

    pub fn as_camera(&self) -> Option<&Camera> {
        match &self.kind {
            NodeKind::Camera(camera) => Some(camera),
            _ => None,
        }
    }

    pub fn as_camera_mut(&mut self) -> Option<&mut Camera> {
        match &mut self.kind {
            NodeKind::Camera(camera) => Some(camera),
            _ => None,
        }
    }

    pub fn as_drawable(&self) -> Option<&dyn Drawable> {
        match &self.kind {
            NodeKind::Drawable(drawable) => Some(drawable.as_ref()),
            _ => None,
        }
    }

    pub fn as_drawable_mut(&mut self) -> Option<&mut (dyn Drawable + 'static)> {
        match &mut self.kind {
            NodeKind::Drawable(drawable) => Some(drawable.as_mut()),
            _ => None,
        }
    }

    pub fn as_point_light(&self) -> Option<&PointLight> {
        match &self.kind {
            NodeKind::PointLight(light) => Some(light),
            _ => None,
        }
    }

    pub fn as_point_light_mut(&mut self) -> Option<&mut PointLight> {
        match &mut self.kind {
            NodeKind::PointLight(light) => Some(light),
            _ => None,
        }
    }

    pub fn as_gui_canvas(&self) -> Option<&GuiCanvas> {
        match &self.kind {
            NodeKind::GuiCanvas(canvas) => Some(canvas),
            _ => None,
        }
    }

    pub fn as_gui_canvas_mut(&mut self) -> Option<&mut GuiCanvas> {
        match &mut self.kind {
            NodeKind::GuiCanvas(canvas) => Some(canvas),
            _ => None,
        }
    }
}
