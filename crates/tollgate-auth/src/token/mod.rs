//! Token generation, lifetimes and result shapes.
//!
//! This module provides:
//!
//! - The injectable [`Clock`] and [`TokenGenerator`]
//! - [`IssuedToken`], the result of issue and refresh
//! - [`Introspection`], the result of token introspection

pub mod clock;
pub mod generator;
pub mod introspection;
pub mod issued;

pub use clock::{Clock, ManualClock, SystemClock};
pub use generator::{
    GeneratedToken, RandomTokenGenerator, TokenGenerator, TokenKind, expires_after,
};
pub use introspection::Introspection;
pub use issued::IssuedToken;
