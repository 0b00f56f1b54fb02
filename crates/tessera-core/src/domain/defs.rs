//! Definitions for operators, nets and plans.
//!
//! These are plain serde structures, so they can be written by hand as JSON
//! or produced by a frontend. Arguments stay as `serde_json::Value` and are
//! interpreted by the operator that reads them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ConstructionError;

/// Net type used when a definition does not name one.
pub const DEFAULT_NET_TYPE: &str = "simple";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperatorDef {
    #[serde(rename = "type")]
    pub op_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub inputs: Vec<String>,

    #[serde(default)]
    pub outputs: Vec<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub args: BTreeMap<String, serde_json::Value>,
}

impl OperatorDef {
    pub fn new(op_type: impl Into<String>) -> Self {
        Self {
            op_type: op_type.into(),
            ..Self::default()
        }
    }

    pub fn input(mut self, blob: impl Into<String>) -> Self {
        self.inputs.push(blob.into());
        self
    }

    pub fn output(mut self, blob: impl Into<String>) -> Self {
        self.outputs.push(blob.into());
        self
    }

    pub fn arg(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.args.insert(key.into(), value);
        self
    }

    pub fn arg_f32(&self, key: &str) -> Result<Option<f32>, ConstructionError> {
        self.args
            .get(key)
            .map(|v| {
                v.as_f64()
                    .map(|f| f as f32)
                    .ok_or_else(|| self.invalid(key, "expected a number"))
            })
            .transpose()
    }

    pub fn arg_i64(&self, key: &str) -> Result<Option<i64>, ConstructionError> {
        self.args
            .get(key)
            .map(|v| v.as_i64().ok_or_else(|| self.invalid(key, "expected an integer")))
            .transpose()
    }

    pub fn arg_dims(&self, key: &str) -> Result<Option<Vec<usize>>, ConstructionError> {
        let Some(value) = self.args.get(key) else {
            return Ok(None);
        };
        serde_json::from_value::<Vec<usize>>(value.clone())
            .map(Some)
            .map_err(|e| self.invalid(key, &e.to_string()))
    }

    pub(crate) fn invalid(&self, key: &str, reason: &str) -> ConstructionError {
        ConstructionError::InvalidArgument {
            op_type: self.op_type.clone(),
            arg: key.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetDef {
    /// Mandatory for nets registered in a workspace.
    #[serde(default)]
    pub name: Option<String>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub net_type: Option<String>,

    #[serde(default)]
    pub ops: Vec<OperatorDef>,
}

impl NetDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_type(mut self, net_type: impl Into<String>) -> Self {
        self.net_type = Some(net_type.into());
        self
    }

    pub fn op(mut self, op: OperatorDef) -> Self {
        self.ops.push(op);
        self
    }

    /// Name if present and non-empty.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref().filter(|n| !n.is_empty())
    }

    pub fn net_type(&self) -> &str {
        self.net_type
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_NET_TYPE)
    }
}

/// A multi-step execution sequence over a set of nets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanDef {
    #[serde(default)]
    pub name: String,

    /// Nets created in the workspace before any step runs.
    #[serde(default)]
    pub networks: Vec<NetDef>,

    #[serde(default)]
    pub execution_steps: Vec<ExecutionStep>,
}

/// One step of a plan.
///
/// A step either runs `networks` in order, or runs `substeps`; never both.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionStep {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub networks: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub substeps: Vec<ExecutionStep>,

    /// Iterations of this step; one when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_iter: Option<u64>,

    /// Blob holding a `bool`; the step stops once it reads `true`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub should_stop_blob: Option<String>,

    /// Run substeps on separate threads instead of in order.
    #[serde(default)]
    pub concurrent_substeps: bool,
}

impl ExecutionStep {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn network(mut self, net: impl Into<String>) -> Self {
        self.networks.push(net.into());
        self
    }

    pub fn substep(mut self, step: ExecutionStep) -> Self {
        self.substeps.push(step);
        self
    }

    pub fn iterations(mut self, n: u64) -> Self {
        self.num_iter = Some(n);
        self
    }

    pub fn stop_on(mut self, blob: impl Into<String>) -> Self {
        self.should_stop_blob = Some(blob.into());
        self
    }
}
