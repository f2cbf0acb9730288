//! Messages exchanged between threads.
//!
//! Submodules:
//! - [`input`] – key events produced by the input-polling collaborator
//! - [`request`] – register/unregister intents consumed by the physical loop
pub mod input;
pub mod request;
