//! Spatial note-board engine.
//!
//! This crate owns the interactive core of a note board: free-form notes placed
//! on an infinite 2-D canvas that can be dragged, resized, panned, zoomed and
//! multi-selected, with every mutation applied optimistically to a local
//! registry and reconciled against a REST backend. The engine itself performs
//! no I/O; it emits [`engine::Action`]s that the async [`session`] driver (or any
//! other host) executes, then feeds the results back in.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Board controller: public operations and event wiring |
//! | [`doc`] | Note/tag types and the in-memory [`doc::NoteRegistry`] |
//! | [`camera`] | Pan/zoom camera and coordinate conversions |
//! | [`input`] | Input event types and per-pointer gesture states |
//! | [`gesture`] | Drag/resize/pan gesture controller |
//! | [`hit`] | Hit-testing against notes and their resize handles |
//! | [`selection`] | Selected note ids for bulk operations |
//! | [`sync`] | Optimistic commits, revision tracking and rollback |
//! | [`backend`] | Async persistence contract consumed by the session |
//! | [`http`] | REST implementation of the backend contract |
//! | [`session`] | Async driver tying the engine to a backend |
//! | [`config`] | Environment-driven configuration |
//! | [`error`] | Engine error taxonomy |
//! | [`consts`] | Shared numeric defaults (zoom limits, minimum sizes, etc.) |

pub mod backend;
pub mod camera;
pub mod config;
pub mod consts;
pub mod doc;
pub mod engine;
pub mod error;
pub mod gesture;
pub mod hit;
pub mod http;
pub mod input;
pub mod selection;
pub mod session;
pub mod sync;
