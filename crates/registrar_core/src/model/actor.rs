//! Actor identity threaded through every mutating call.
//!
//! # Invariants
//! - There is no ambient "current user"; callers pass an `ActorContext`.
//! - An anonymous context is valid input and leaves audit fields untouched.

use std::fmt::{Display, Formatter};

/// Identity of an authenticated user as resolved by the identity provider.
pub type ActorId = i64;

/// The actor performing an operation, or none.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ActorContext {
    actor: Option<ActorId>,
}

impl ActorContext {
    /// Context for calls made without an authenticated identity.
    pub const fn anonymous() -> Self {
        Self { actor: None }
    }

    /// Context for calls made by the given authenticated actor.
    pub const fn authenticated(actor: ActorId) -> Self {
        Self { actor: Some(actor) }
    }

    pub const fn actor(&self) -> Option<ActorId> {
        self.actor
    }

    pub const fn is_authenticated(&self) -> bool {
        self.actor.is_some()
    }
}

impl From<Option<ActorId>> for ActorContext {
    fn from(actor: Option<ActorId>) -> Self {
        Self { actor }
    }
}

impl Display for ActorContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.actor {
            Some(id) => write!(f, "actor {id}"),
            None => f.write_str("anonymous"),
        }
    }
}
