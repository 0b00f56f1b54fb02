//! FactoryRegistry - net and operator construction
//!
//! Maps a type name (`NetDef::net_type`, `OperatorDef::op_type`) to a factory
//! closure. Factories receive the owning workspace mutably so they can create
//! the blobs they write to.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::{NetDef, OperatorDef};
use crate::error::{ConstructionError, RegistryError};
use crate::impls;
use crate::ports::{Net, Operator};
use crate::workspace::Workspace;

pub type NetFactory = Arc<
    dyn Fn(&NetDef, &mut Workspace<'_>) -> Result<Box<dyn Net>, ConstructionError> + Send + Sync,
>;

pub type OperatorFactory = Arc<
    dyn Fn(&OperatorDef, &mut Workspace<'_>) -> Result<Box<dyn Operator>, ConstructionError>
        + Send
        + Sync,
>;

/// Registry of net and operator factories.
///
/// Built during initialization (mutable), then shared by workspaces behind
/// an `Arc` (immutable).
///
/// # Example
/// ```ignore
/// let mut registry = FactoryRegistry::with_builtins();
/// registry.register_operator("Relu", |def, ws| Ok(Box::new(Relu::new(def, ws)?)))?;
/// let ws = Workspace::builder().registry(Arc::new(registry)).build();
/// ```
#[derive(Clone, Default)]
pub struct FactoryRegistry {
    nets: HashMap<String, NetFactory>,
    operators: HashMap<String, OperatorFactory>,
}

impl FactoryRegistry {
    /// Registry with nothing registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the `simple` net and the built-in operators.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for (net_type, factory) in impls::builtin_nets() {
            registry.nets.insert(net_type.to_string(), factory);
        }
        for (op_type, factory) in impls::builtin_operators() {
            registry.operators.insert(op_type.to_string(), factory);
        }
        registry
    }

    pub fn register_net<F>(
        &mut self,
        net_type: impl Into<String>,
        factory: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn(&NetDef, &mut Workspace<'_>) -> Result<Box<dyn Net>, ConstructionError>
            + Send
            + Sync
            + 'static,
    {
        let net_type = net_type.into();
        if self.nets.contains_key(&net_type) {
            return Err(RegistryError::AlreadyRegistered {
                kind: "net",
                name: net_type,
            });
        }
        self.nets.insert(net_type, Arc::new(factory));
        Ok(())
    }

    pub fn register_operator<F>(
        &mut self,
        op_type: impl Into<String>,
        factory: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn(&OperatorDef, &mut Workspace<'_>) -> Result<Box<dyn Operator>, ConstructionError>
            + Send
            + Sync
            + 'static,
    {
        let op_type = op_type.into();
        if self.operators.contains_key(&op_type) {
            return Err(RegistryError::AlreadyRegistered {
                kind: "operator",
                name: op_type,
            });
        }
        self.operators.insert(op_type, Arc::new(factory));
        Ok(())
    }

    pub fn create_net(
        &self,
        def: &NetDef,
        ws: &mut Workspace<'_>,
    ) -> Result<Box<dyn Net>, ConstructionError> {
        let factory = self
            .nets
            .get(def.net_type())
            .ok_or_else(|| ConstructionError::UnknownNetType(def.net_type().to_string()))?;
        factory(def, ws)
    }

    pub fn create_operator(
        &self,
        def: &OperatorDef,
        ws: &mut Workspace<'_>,
    ) -> Result<Box<dyn Operator>, ConstructionError> {
        let factory = self
            .operators
            .get(&def.op_type)
            .ok_or_else(|| ConstructionError::UnknownOperatorType(def.op_type.clone()))?;
        factory(def, ws)
    }

    pub fn has_net_type(&self, net_type: &str) -> bool {
        self.nets.contains_key(net_type)
    }

    pub fn has_operator_type(&self, op_type: &str) -> bool {
        self.operators.contains_key(op_type)
    }

    /// Registered net types, sorted.
    pub fn net_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.nets.keys().cloned().collect();
        types.sort();
        types
    }

    /// Registered operator types, sorted.
    pub fn operator_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.operators.keys().cloned().collect();
        types.sort();
        types
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::SimpleNet;

    #[test]
    fn builtins_are_registered() {
        let registry = FactoryRegistry::with_builtins();
        assert!(registry.has_net_type("simple"));
        for op in ["ConstantFill", "Copy", "Add", "Scale", "Alias", "CountDown", "Fail"] {
            assert!(registry.has_operator_type(op), "missing {op}");
        }
    }

    #[test]
    fn double_registration_is_rejected() {
        let mut registry = FactoryRegistry::new();
        registry
            .register_net("simple", |def, ws| Ok(Box::new(SimpleNet::new(def, ws)?)))
            .unwrap();
        let result =
            registry.register_net("simple", |def, ws| Ok(Box::new(SimpleNet::new(def, ws)?)));
        assert!(matches!(
            result,
            Err(RegistryError::AlreadyRegistered { kind: "net", .. })
        ));
    }

    #[test]
    fn types_are_listed_sorted() {
        let registry = FactoryRegistry::with_builtins();
        let ops = registry.operator_types();
        let mut sorted = ops.clone();
        sorted.sort();
        assert_eq!(ops, sorted);
        assert_eq!(registry.net_types(), vec!["simple".to_string()]);
    }

    #[test]
    fn unknown_types_fail_construction() {
        let registry = FactoryRegistry::new();
        let mut ws = Workspace::new();
        let err = registry
            .create_net(&NetDef::new("n").with_type("nope"), &mut ws)
            .err()
            .unwrap();
        assert!(matches!(err, ConstructionError::UnknownNetType(t) if t == "nope"));

        let err = registry
            .create_operator(&OperatorDef::new("Nope"), &mut ws)
            .err()
            .unwrap();
        assert!(matches!(err, ConstructionError::UnknownOperatorType(_)));
    }
}
