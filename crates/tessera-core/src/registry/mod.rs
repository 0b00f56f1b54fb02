//! Registries consulted by workspaces: how to build nets and operators, and
//! how to measure blob values.

pub mod factory;
pub mod shape;

pub use self::factory::{FactoryRegistry, NetFactory, OperatorFactory};
pub use self::shape::{BlobShape, ShapeRegistry};
