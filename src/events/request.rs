//! Deferred pool mutation requests.
//!
//! Any thread may ask for an object to enter or leave the pool; only the
//! physical loop applies the request, at fixed points of its tick. This is
//! what makes creating and destroying objects safe while the active pool is
//! being iterated.

use std::sync::Arc;

use crate::gameobject::GameObject;

/// Intent to register or unregister `object`.
///
/// For register requests `active` selects the target bucket. For unregister
/// requests it records which bucket the object was in when the request was
/// made; the pool falls back to the other bucket if the object moved since.
#[derive(Debug, Clone)]
pub struct ResourceAccessRequest {
    pub object: Arc<GameObject>,
    pub active: bool,
}

impl ResourceAccessRequest {
    pub fn new(object: Arc<GameObject>, active: bool) -> Self {
        Self { object, active }
    }
}
