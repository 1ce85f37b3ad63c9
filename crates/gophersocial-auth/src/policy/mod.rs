//! Authorization policy.
//!
//! Authorization is by role precedence: a named role resolves to a level and
//! an actor passes when its own role's level is at least that high. Resource
//! owners always pass.

pub mod precedence;

pub use precedence::RolePrecedence;
