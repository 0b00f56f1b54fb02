//! SimpleNet - runs its operators one after another on the calling thread.

use tracing::error;

use crate::domain::NetDef;
use crate::error::ConstructionError;
use crate::ports::{Net, Operator};
use crate::workspace::Workspace;

pub struct SimpleNet {
    name: String,
    def: NetDef,
    ops: Vec<Box<dyn Operator>>,
}

impl SimpleNet {
    /// Construct every operator of `def` against `ws`.
    ///
    /// The first operator that fails to build aborts construction; operators
    /// built before it are dropped, blobs they created stay.
    pub fn new(def: &NetDef, ws: &mut Workspace<'_>) -> Result<Self, ConstructionError> {
        let name = def.name().unwrap_or_default().to_string();
        let mut ops = Vec::with_capacity(def.ops.len());
        for (index, op_def) in def.ops.iter().enumerate() {
            let op = ws
                .create_operator(op_def)
                .map_err(|source| ConstructionError::Operator {
                    net: name.clone(),
                    index,
                    op_type: op_def.op_type.clone(),
                    source: Box::new(source),
                })?;
            ops.push(op);
        }
        Ok(Self {
            name,
            def: def.clone(),
            ops,
        })
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl Net for SimpleNet {
    fn name(&self) -> &str {
        &self.name
    }

    fn def(&self) -> &NetDef {
        &self.def
    }

    fn run(&self, ws: &Workspace<'_>) -> bool {
        for (index, op) in self.ops.iter().enumerate() {
            if !op.run(ws) {
                error!(
                    net = %self.name,
                    index,
                    op_type = %op.def().op_type,
                    "Operator failed"
                );
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OperatorDef, Tensor};
    use serde_json::json;

    #[test]
    fn runs_ops_in_order() {
        let mut ws = Workspace::new();
        let def = NetDef::new("n")
            .op(OperatorDef::new("ConstantFill")
                .output("a")
                .arg("shape", json!([3]))
                .arg("value", json!(2.0)))
            .op(OperatorDef::new("Scale").input("a").output("b").arg("scale", json!(3.0)));
        let net = SimpleNet::new(&def, &mut ws).unwrap();
        assert_eq!(net.len(), 2);
        assert!(net.run(&ws));

        let b = ws.get_blob("b").unwrap().get_cloned::<Tensor>().unwrap();
        assert_eq!(b.data(), &[6.0, 6.0, 6.0]);
    }

    #[test]
    fn bad_operator_names_its_position() {
        let mut ws = Workspace::new();
        let def = NetDef::new("n")
            .op(OperatorDef::new("ConstantFill").output("a"))
            .op(OperatorDef::new("Mystery"));
        let err = SimpleNet::new(&def, &mut ws).err().unwrap();
        assert!(matches!(
            err,
            ConstructionError::Operator { index: 1, ref op_type, .. } if op_type == "Mystery"
        ));
    }

    #[test]
    fn stops_at_first_failure() {
        let mut ws = Workspace::new();
        let def = NetDef::new("n")
            .op(OperatorDef::new("Fail"))
            .op(OperatorDef::new("ConstantFill").output("a"));
        let net = SimpleNet::new(&def, &mut ws).unwrap();
        assert!(!net.run(&ws));
        assert!(ws.get_blob("a").unwrap().is_empty());
    }
}
