//! Label-partitioned pool of registered game objects.
//!
//! The pool is split into an active and an inactive side. Each side is a
//! [`LabelBuckets`] map behind its own `RwLock`: the render thread and any
//! reader take the read lock, the physical loop takes the write lock while
//! draining requests. A registered object lives on exactly one side and in
//! exactly one label bucket.
//!
//! # Iteration order
//!
//! Buckets are ordered by label and objects by [`ObjectId`], so two walks
//! over the same pool contents always visit objects in the same order.
//!
//! # Mutation
//!
//! `register`/`unregister` are crate-private: user code and systems go
//! through the request queues on
//! [`EngineContext`](crate::context::EngineContext) and the physical loop
//! applies them between iterations.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard};

use crate::gameobject::{GameObject, Label, ObjectId};

type Bucket = BTreeMap<ObjectId, Arc<GameObject>>;

/// What a register request did to the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// The object entered the pool.
    Added,
    /// The object switched sides.
    Moved,
    /// The object already sat on the requested side.
    Unchanged,
    /// The object was destroyed before the request was drained.
    Refused,
}

/// Objects grouped by label.
#[derive(Debug, Default)]
pub struct LabelBuckets {
    buckets: BTreeMap<Label, Bucket>,
    len: usize,
}

impl LabelBuckets {
    /// Insert under the object's label, creating the bucket on first use.
    /// Returns `false` if the object was already present.
    fn insert(&mut self, obj: Arc<GameObject>) -> bool {
        let bucket = self.buckets.entry(obj.label().clone()).or_default();
        let inserted = bucket.insert(obj.id(), obj).is_none();
        if inserted {
            self.len += 1;
        }
        inserted
    }

    fn remove(&mut self, obj: &GameObject) -> Option<Arc<GameObject>> {
        let removed = self
            .buckets
            .get_mut(obj.label())
            .and_then(|bucket| bucket.remove(&obj.id()));
        if removed.is_some() {
            self.len -= 1;
        }
        removed
    }

    pub fn contains(&self, obj: &GameObject) -> bool {
        self.buckets
            .get(obj.label())
            .is_some_and(|bucket| bucket.contains_key(&obj.id()))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Every object, label by label.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<GameObject>> {
        self.buckets.values().flat_map(|bucket| bucket.values())
    }

    /// Objects in one label bucket.
    pub fn with_label<'a>(&'a self, label: &Label) -> impl Iterator<Item = &'a Arc<GameObject>> {
        self.buckets
            .get(label)
            .into_iter()
            .flat_map(|bucket| bucket.values())
    }

    /// Labels that have had a bucket created, including now-empty ones.
    pub fn labels(&self) -> impl Iterator<Item = &Label> {
        self.buckets.keys()
    }
}

/// Active and inactive object sets.
#[derive(Debug, Default)]
pub struct ObjectPool {
    active: RwLock<LabelBuckets>,
    inactive: RwLock<LabelBuckets>,
}

impl ObjectPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put `obj` on the requested side, moving it if it sits on the other
    /// one. Destroyed objects are refused.
    pub(crate) fn register(&self, obj: Arc<GameObject>, active: bool) -> Registration {
        if obj.is_destroyed() {
            return Registration::Refused;
        }
        // lock order: active, then inactive
        let mut act = self.active.write();
        let mut inact = self.inactive.write();
        let (to, from) = if active {
            (&mut *act, &mut *inact)
        } else {
            (&mut *inact, &mut *act)
        };
        let moved = from.remove(&obj).is_some();
        obj.set_active(active);
        match (to.insert(obj), moved) {
            (true, false) => Registration::Added,
            (true, true) => Registration::Moved,
            (false, _) => Registration::Unchanged,
        }
    }

    /// Remove `obj` from the side it was on. `was_active` is tried first,
    /// then the other side.
    pub(crate) fn unregister(&self, obj: &GameObject, was_active: bool) -> Option<Arc<GameObject>> {
        let mut act = self.active.write();
        let mut inact = self.inactive.write();
        let (first, second) = if was_active {
            (&mut *act, &mut *inact)
        } else {
            (&mut *inact, &mut *act)
        };
        let removed = first.remove(obj).or_else(|| second.remove(obj));
        if removed.is_some() {
            obj.set_active(false);
        }
        removed
    }

    /// Read guard over the active side. Holding it blocks request draining,
    /// so keep the critical section short.
    pub fn read_active(&self) -> RwLockReadGuard<'_, LabelBuckets> {
        self.active.read()
    }

    pub fn read_inactive(&self) -> RwLockReadGuard<'_, LabelBuckets> {
        self.inactive.read()
    }

    /// Owned copy of the active side, in iteration order.
    pub fn active_snapshot(&self) -> Vec<Arc<GameObject>> {
        self.active.read().iter().cloned().collect()
    }

    pub fn active_with_label(&self, label: &Label) -> Vec<Arc<GameObject>> {
        self.active.read().with_label(label).cloned().collect()
    }

    pub fn active_len(&self) -> usize {
        self.active.read().len()
    }

    pub fn inactive_len(&self) -> usize {
        self.inactive.read().len()
    }

    /// `Some(true)` if active, `Some(false)` if inactive, `None` if the
    /// object is not registered.
    pub fn membership(&self, obj: &GameObject) -> Option<bool> {
        if self.active.read().contains(obj) {
            Some(true)
        } else if self.inactive.read().contains(obj) {
            Some(false)
        } else {
            None
        }
    }

    pub fn contains(&self, obj: &GameObject) -> bool {
        self.membership(obj).is_some()
    }

    pub fn is_active(&self, obj: &GameObject) -> bool {
        self.active.read().contains(obj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_obj(name: &str, label: Label) -> Arc<GameObject> {
        Arc::new(GameObject::builder(name).label(label).build())
    }

    #[test]
    fn register_creates_label_buckets_lazily() {
        let pool = ObjectPool::new();
        let enemy = Label::from_static("enemy");
        assert_eq!(pool.read_active().labels().count(), 0);

        assert_eq!(pool.register(make_obj("a", Label::DEFAULT), true), Registration::Added);
        assert_eq!(pool.register(make_obj("b", enemy.clone()), true), Registration::Added);
        assert_eq!(pool.register(make_obj("c", enemy.clone()), true), Registration::Added);

        assert_eq!(pool.active_len(), 3);
        assert_eq!(pool.active_with_label(&enemy).len(), 2);
        assert_eq!(pool.read_active().labels().count(), 2);
    }

    #[test]
    fn register_twice_is_a_no_op() {
        let pool = ObjectPool::new();
        let obj = make_obj("a", Label::DEFAULT);
        assert_eq!(pool.register(Arc::clone(&obj), true), Registration::Added);
        assert_eq!(pool.register(Arc::clone(&obj), true), Registration::Unchanged);
        assert_eq!(pool.active_len(), 1);
    }

    #[test]
    fn register_moves_between_sides() {
        let pool = ObjectPool::new();
        let obj = make_obj("a", Label::DEFAULT);
        pool.register(Arc::clone(&obj), true);
        assert!(obj.is_active());

        assert_eq!(pool.register(Arc::clone(&obj), false), Registration::Moved);
        assert_eq!(pool.active_len(), 0);
        assert_eq!(pool.inactive_len(), 1);
        assert_eq!(pool.membership(&obj), Some(false));
        assert!(pool.contains(&obj));
        assert!(!pool.is_active(&obj));
        assert!(!obj.is_active());
    }

    #[test]
    fn unregister_falls_back_to_other_side() {
        let pool = ObjectPool::new();
        let obj = make_obj("a", Label::DEFAULT);
        pool.register(Arc::clone(&obj), false);

        let removed = pool.unregister(&obj, true);
        assert!(removed.is_some());
        assert_eq!(pool.membership(&obj), None);
        assert!(!pool.contains(&obj));
        assert!(pool.unregister(&obj, true).is_none());
    }

    #[test]
    fn destroyed_object_is_refused() {
        let pool = ObjectPool::new();
        let obj = make_obj("a", Label::DEFAULT);
        obj.mark_destroyed();
        assert_eq!(pool.register(Arc::clone(&obj), true), Registration::Refused);
        assert!(!pool.contains(&obj));
        assert!(!obj.is_active());
    }

    #[test]
    fn iteration_follows_label_then_id() {
        let pool = ObjectPool::new();
        let z = make_obj("z", Label::from_static("zeta"));
        let a1 = make_obj("a1", Label::from_static("alpha"));
        let a2 = make_obj("a2", Label::from_static("alpha"));
        pool.register(Arc::clone(&z), true);
        pool.register(Arc::clone(&a2), true);
        pool.register(Arc::clone(&a1), true);

        let names: Vec<String> = pool
            .active_snapshot()
            .iter()
            .map(|o| o.name().to_string())
            .collect();
        assert_eq!(names, vec!["a1", "a2", "z"]);
    }
}
