//! Shared types for the application-model bridge.
//!
//! Both sides of the loopback bridge depend on this crate:
//! - `document` - the hierarchical model (namespaces, data objects, reports, flows)
//! - `kind` - discriminant classification of the shared `objectWorkflow` array
//! - `family` - entity families and their nested child collections
//! - `wire` - request/response envelopes for the data and command planes
//!
//! # Model shape
//!
//! ```text
//! Document
//! └── root
//!     └── namespace[]
//!         ├── object[]  (DataObject)
//!         │   ├── report[]          -> reportColumn[] / reportButton[] / reportParam[]
//!         │   └── objectWorkflow[]  -> PageInitFlow | Workflow | WorkflowTask | GeneralFlow
//!         └── userStory[]
//! ```

pub mod document;
pub mod family;
pub mod kind;
pub mod wire;

pub use document::{
    merge_into, DataObject, Document, FlowRecord, Item, ModelError, ModelRoot, Namespace, Report,
    UserStory,
};
pub use family::{ChildKind, Family};
pub use kind::{has_page_init_suffix, Classification, FlowKind, KindConflict, PAGE_INIT_SUFFIXES};
pub use wire::{
    error_codes, AuthStatus, CommandRequest, CommandResponse, HostAck, LocatedRecord,
    ModelStatus, Plane,
};
