use std::sync::Arc;

use tracing::{debug, error};

use super::Workspace;
use crate::domain::{NetDef, OperatorDef, PlanDef};
use crate::error::{ConstructionError, WorkspaceError};
use crate::plan;
use crate::ports::{Net, Operator};

impl<'p> Workspace<'p> {
    /// Build a net from `def` and register it under its name.
    ///
    /// - A definition without a name is a usage error.
    /// - An existing net of the same name is kept and an error returned,
    ///   unless `overwrite` is set. With `overwrite`, the old net is dropped
    ///   before the new one is constructed.
    /// - A factory failure is logged and yields `Ok(None)`; nothing stays
    ///   registered under the name.
    pub fn create_net(
        &mut self,
        def: &NetDef,
        overwrite: bool,
    ) -> Result<Option<&dyn Net>, WorkspaceError> {
        let name = def.name().ok_or(WorkspaceError::MissingNetName)?.to_string();
        if self.net_map.contains_key(&name) {
            if !overwrite {
                return Err(WorkspaceError::NetExists(name));
            }
            debug!(net = %name, "Deleting existing network of the same name.");
            // Resources held by the old net (open handles, ...) may block
            // construction of the new one, so it has to go first.
            drop(self.net_map.remove(&name));
        }

        debug!(net = %name, net_type = def.net_type(), "Initializing network");
        let registry = Arc::clone(&self.registry);
        match registry.create_net(def, self) {
            Ok(net) => {
                self.net_map.insert(name.clone(), net);
                Ok(self.get_net(&name))
            }
            Err(e) => {
                error!(
                    net = %name,
                    "Error when creating the network. Maybe net type [{}] does not exist: {e}",
                    def.net_type()
                );
                Ok(None)
            }
        }
    }

    /// Local lookup only; nets are never resolved through the parent.
    pub fn get_net(&self, name: &str) -> Option<&dyn Net> {
        self.net_map.get(name).map(|net| net.as_ref())
    }

    pub fn has_net(&self, name: &str) -> bool {
        self.net_map.contains_key(name)
    }

    /// Names of local nets, sorted.
    pub fn nets(&self) -> Vec<String> {
        let mut names: Vec<String> = self.net_map.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn delete_net(&mut self, name: &str) {
        if self.net_map.remove(name).is_some() {
            debug!(net = name, "Deleted network");
        }
    }

    pub fn run_net(&self, name: &str) -> bool {
        let Some(net) = self.net_map.get(name) else {
            error!(net = name, "Network does not exist yet.");
            return false;
        };
        net.run(self)
    }

    /// Build an operator bound to this workspace without running it.
    pub fn create_operator(
        &mut self,
        def: &OperatorDef,
    ) -> Result<Box<dyn Operator>, ConstructionError> {
        let registry = Arc::clone(&self.registry);
        registry.create_operator(def, self)
    }

    /// Build, run and discard a single operator.
    pub fn run_operator_once(&mut self, def: &OperatorDef) -> bool {
        let op = match self.create_operator(def) {
            Ok(op) => op,
            Err(e) => {
                error!(op_type = %def.op_type, "Cannot create operator: {e}");
                return false;
            }
        };
        if !op.run(self) {
            error!(op_type = %def.op_type, "Error when running operator");
            return false;
        }
        true
    }

    /// Build, run and discard a net that is never registered.
    ///
    /// Construction failure is raised; a failed run is logged and returned
    /// as `Ok(false)`.
    pub fn run_net_once(&mut self, def: &NetDef) -> Result<bool, WorkspaceError> {
        let registry = Arc::clone(&self.registry);
        let net = registry
            .create_net(def, self)
            .map_err(|source| WorkspaceError::NetConstruction {
                name: def.name.clone().unwrap_or_default(),
                net_type: def.net_type().to_string(),
                source,
            })?;
        if !net.run(self) {
            error!(net = ?def.name, "Error when running network");
            return Ok(false);
        }
        Ok(true)
    }

    /// Run a plan on this workspace.
    ///
    /// `should_continue` receives the iteration index of the step about to
    /// run; returning `false` stops that step before it executes any net.
    /// Concurrent substeps poll it from their own threads, hence `Send`.
    pub fn run_plan<F>(&mut self, plan: &PlanDef, mut should_continue: F) -> Result<bool, WorkspaceError>
    where
        F: FnMut(u64) -> bool + Send,
    {
        plan::run_plan_on_workspace(self, plan, &mut should_continue)
    }
}
