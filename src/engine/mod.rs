//! The mutation engine.
//!
//! - `locator` - case-insensitive, owner-scoped, discriminant-aware lookup
//! - `projector` - public/canonical field mapping and hidden-field stripping
//! - `validator` - declarative schema + business-rule validation
//! - `reorder` - splice-out/splice-in move of a named element
//!
//! None of these hold state: each works on a snapshot or payload handed to it
//! for the duration of one call.

pub mod locator;
pub mod projector;
pub mod reorder;
pub mod validator;

pub use locator::{names_match, EntityLocator, LocateError, Located, Miss, Position};
pub use projector::{FieldAlias, ProjectionSpec, PropertyProjector};
pub use reorder::{move_item, move_named, MoveOutcome, ReorderError};
pub use validator::{
    BusinessRule, Condition, EntitySchema, FieldSpec, FieldType, UpdateMode, UpdateValidator,
    Violation,
};
