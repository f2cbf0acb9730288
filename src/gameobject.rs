//! Game objects: identity, components and user callbacks.
//!
//! A [`GameObject`] is built by user code with [`GameObject::builder`], then
//! handed to the engine through
//! [`EngineContext::create`](crate::context::EngineContext::create) or
//! [`EngineContext::instantiate`](crate::context::EngineContext::instantiate).
//! It only enters the object pool when the physical loop drains its register
//! request, and leaves it when an unregister request is drained. From then on
//! the pool owns it; every other holder keeps an `Arc` clone.
//!
//! # Example
//!
//! ```ignore
//! let obj = GameObject::builder("player")
//!     .with_component(Transform2D::new(Vec2::new(32.0, 32.0)))
//!     .with_component(Sprite::new("spr_megaman", 0))
//!     .on_step(|obj, ctx| {
//!         if ctx.input().is_held(Key::D) {
//!             obj.transform().unwrap().translate(Vec2::new(1.0, 0.0));
//!         }
//!     })
//!     .build();
//! ```

use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::Serialize;
use smallvec::SmallVec;

use crate::components::Component;
use crate::components::sprite::Sprite;
use crate::components::transform::Transform2D;
use crate::context::EngineContext;
use crate::systems::render::FrameInfo;

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique object identifier. Ids grow with creation order, which
/// gives pools a deterministic iteration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ObjectId(u64);

impl ObjectId {
    fn next() -> Self {
        ObjectId(NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Pool partition key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(Cow<'static, str>);

impl Label {
    pub const DEFAULT: Label = Label(Cow::Borrowed("default"));

    pub const fn from_static(name: &'static str) -> Self {
        Label(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<String>) -> Self {
        Label(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Label {
    fn default() -> Self {
        Label::DEFAULT
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Called once per physical tick while the object is active.
pub type StepFn = dyn Fn(&GameObject, &EngineContext) + Send + Sync;
/// Called once per render frame while the object is active.
pub type RenderFn = dyn Fn(&GameObject, &FrameInfo) + Send + Sync;
/// Called once when the object's unregister request is drained.
pub type DestroyFn = dyn Fn(&GameObject, &EngineContext) + Send + Sync;

type ComponentSlot = (&'static str, Arc<dyn Any + Send + Sync>);

/// A unit of simulation identity.
pub struct GameObject {
    id: ObjectId,
    name: String,
    label: Label,
    active: AtomicBool,
    destroyed: AtomicBool,
    components: SmallVec<[ComponentSlot; 4]>,
    transform: Option<Arc<Transform2D>>,
    sprite: Option<Arc<Sprite>>,
    on_step: Option<Arc<StepFn>>,
    on_render: Option<Arc<RenderFn>>,
    on_destroy: Option<Arc<DestroyFn>>,
    subscriptions: Mutex<SmallVec<[String; 2]>>,
}

impl fmt::Debug for GameObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.components.iter().map(|(n, _)| *n).collect();
        f.debug_struct("GameObject")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("label", &self.label)
            .field("active", &self.is_active())
            .field("destroyed", &self.is_destroyed())
            .field("components", &names)
            .finish()
    }
}

impl GameObject {
    /// Start building an object of kind `name`.
    pub fn builder(name: impl Into<String>) -> GameObjectBuilder {
        GameObjectBuilder {
            name: name.into(),
            label: Label::DEFAULT,
            components: SmallVec::new(),
            on_step: None,
            on_render: None,
            on_destroy: None,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Kind tag given at construction.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> &Label {
        &self.label
    }

    /// Whether the object sits in the active pool. Updated by the physical
    /// loop when register requests are drained.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub(crate) fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Release);
    }

    /// Whether an unregister request for this object has been drained.
    /// Destruction is terminal: the object never re-enters the pool.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// Returns `true` only for the first call.
    pub(crate) fn mark_destroyed(&self) -> bool {
        !self.destroyed.swap(true, Ordering::SeqCst)
    }

    /// Typed component lookup.
    pub fn component<C: Component>(&self) -> Option<Arc<C>> {
        self.components
            .iter()
            .find(|(name, _)| *name == C::NAME)
            .and_then(|(_, slot)| Arc::clone(slot).downcast::<C>().ok())
    }

    pub fn has_component(&self, name: &str) -> bool {
        self.components.iter().any(|(n, _)| *n == name)
    }

    pub fn component_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.components.iter().map(|(n, _)| *n)
    }

    pub fn transform(&self) -> Option<&Arc<Transform2D>> {
        self.transform.as_ref()
    }

    pub fn sprite(&self) -> Option<&Arc<Sprite>> {
        self.sprite.as_ref()
    }

    /// Render sort key; objects without a sprite sit at depth 0.
    pub fn depth(&self) -> i32 {
        self.sprite.as_ref().map_or(0, |s| s.depth())
    }

    /// Names of the systems this object is subscribed to.
    pub fn subscriptions(&self) -> Vec<String> {
        self.subscriptions.lock().to_vec()
    }

    pub(crate) fn add_subscription(&self, system: &str) -> bool {
        let mut subs = self.subscriptions.lock();
        if subs.iter().any(|s| s == system) {
            return false;
        }
        subs.push(system.to_string());
        true
    }

    pub(crate) fn remove_subscription(&self, system: &str) -> bool {
        let mut subs = self.subscriptions.lock();
        match subs.iter().position(|s| s == system) {
            Some(idx) => {
                subs.remove(idx);
                true
            }
            None => false,
        }
    }

    pub(crate) fn take_subscriptions(&self) -> SmallVec<[String; 2]> {
        std::mem::take(&mut *self.subscriptions.lock())
    }

    pub(crate) fn step(&self, ctx: &EngineContext) {
        if let Some(cb) = &self.on_step {
            cb(self, ctx);
        }
        if let Some(sprite) = &self.sprite {
            sprite.step_frame();
        }
    }

    pub(crate) fn render(&self, frame: &FrameInfo) {
        if let Some(cb) = &self.on_render {
            cb(self, frame);
        }
    }

    pub(crate) fn destroy(&self, ctx: &EngineContext) {
        if let Some(cb) = &self.on_destroy {
            cb(self, ctx);
        }
    }
}

/// Builder returned by [`GameObject::builder`].
pub struct GameObjectBuilder {
    name: String,
    label: Label,
    components: SmallVec<[ComponentSlot; 4]>,
    on_step: Option<Arc<StepFn>>,
    on_render: Option<Arc<RenderFn>>,
    on_destroy: Option<Arc<DestroyFn>>,
}

impl GameObjectBuilder {
    pub fn label(mut self, label: Label) -> Self {
        self.label = label;
        self
    }

    /// Attach a component unless one with the same name is already present.
    pub fn with_component<C: Component>(mut self, component: C) -> Self {
        self.insert_component(Arc::new(component));
        self
    }

    /// Attach an already shared component (same if-absent rule).
    pub fn with_shared_component<C: Component>(mut self, component: Arc<C>) -> Self {
        self.insert_component(component);
        self
    }

    fn insert_component<C: Component>(&mut self, component: Arc<C>) {
        if self.components.iter().any(|(n, _)| *n == C::NAME) {
            log::warn!(
                "object `{}` already has a `{}` component, ignoring duplicate",
                self.name,
                C::NAME
            );
            return;
        }
        let slot: Arc<dyn Any + Send + Sync> = component;
        self.components.push((C::NAME, slot));
    }

    pub fn on_step<F>(mut self, f: F) -> Self
    where
        F: Fn(&GameObject, &EngineContext) + Send + Sync + 'static,
    {
        self.on_step = Some(Arc::new(f));
        self
    }

    pub fn on_render<F>(mut self, f: F) -> Self
    where
        F: Fn(&GameObject, &FrameInfo) + Send + Sync + 'static,
    {
        self.on_render = Some(Arc::new(f));
        self
    }

    pub fn on_destroy<F>(mut self, f: F) -> Self
    where
        F: Fn(&GameObject, &EngineContext) + Send + Sync + 'static,
    {
        self.on_destroy = Some(Arc::new(f));
        self
    }

    pub fn build(self) -> GameObject {
        let find = |name: &str| {
            self.components
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, slot)| Arc::clone(slot))
        };
        let transform = find(Transform2D::NAME).and_then(|s| s.downcast::<Transform2D>().ok());
        let sprite = find(Sprite::NAME).and_then(|s| s.downcast::<Sprite>().ok());

        GameObject {
            id: ObjectId::next(),
            name: self.name,
            label: self.label,
            active: AtomicBool::new(false),
            destroyed: AtomicBool::new(false),
            components: self.components,
            transform,
            sprite,
            on_step: self.on_step,
            on_render: self.on_render,
            on_destroy: self.on_destroy,
            subscriptions: Mutex::new(SmallVec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::rigidbody::RigidBody;
    use crate::math::Vec2;

    #[test]
    fn ids_grow_with_creation_order() {
        let a = GameObject::builder("a").build();
        let b = GameObject::builder("b").build();
        assert!(a.id() < b.id());
    }

    #[test]
    fn duplicate_component_is_ignored() {
        let obj = GameObject::builder("crate")
            .with_component(Transform2D::new(Vec2::new(1.0, 1.0)))
            .with_component(Transform2D::new(Vec2::new(9.0, 9.0)))
            .build();
        assert_eq!(obj.component_names().count(), 1);
        assert_eq!(obj.transform().unwrap().position(), Vec2::new(1.0, 1.0));
    }

    #[test]
    fn typed_lookup_and_depth() {
        let obj = GameObject::builder("crate")
            .with_component(RigidBody::new())
            .with_component(Sprite::new("spr_crate", 7))
            .build();
        assert!(obj.component::<RigidBody>().is_some());
        assert!(obj.component::<Transform2D>().is_none());
        assert!(obj.has_component("Sprite"));
        assert_eq!(obj.depth(), 7);
        assert_eq!(GameObject::builder("bare").build().depth(), 0);
    }

    #[test]
    fn subscriptions_are_unique() {
        let obj = GameObject::builder("crate").build();
        assert!(obj.add_subscription("sys_Physics2D"));
        assert!(!obj.add_subscription("sys_Physics2D"));
        assert_eq!(obj.subscriptions(), vec!["sys_Physics2D".to_string()]);
        assert!(obj.remove_subscription("sys_Physics2D"));
        assert!(obj.take_subscriptions().is_empty());
    }

    #[test]
    fn new_objects_start_inactive_with_default_label() {
        let obj = GameObject::builder("crate").build();
        assert!(!obj.is_active());
        assert_eq!(obj.label(), &Label::DEFAULT);
        assert_eq!(obj.label().as_str(), "default");
    }

    #[test]
    fn destruction_is_marked_once() {
        let obj = GameObject::builder("crate").build();
        assert!(!obj.is_destroyed());
        assert!(obj.mark_destroyed());
        assert!(!obj.mark_destroyed());
        assert!(obj.is_destroyed());
    }
}
