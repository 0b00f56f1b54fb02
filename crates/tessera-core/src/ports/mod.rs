//! Ports: the seams between the workspace and its execution engines.
//!
//! The workspace only ever sees nets and operators through these traits.
//! Concrete engines live in `impls`, and are reached through the factory
//! registry.

pub mod net;
pub mod operator;

pub use self::net::Net;
pub use self::operator::Operator;
