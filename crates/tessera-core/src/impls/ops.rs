//! Built-in operators.
//!
//! Operators check their arity and input blobs when they are built and
//! create their output blobs right away; `run` only reads and writes blob
//! contents. The arithmetic ones work on `Tensor` values; `CountDown` writes
//! a `bool` meant to be used as a plan step's stop blob.

use std::sync::atomic::{AtomicI64, Ordering};

use tracing::error;

use crate::domain::{OperatorDef, Tensor};
use crate::error::ConstructionError;
use crate::ports::Operator;
use crate::workspace::Workspace;

fn check_arity(def: &OperatorDef, inputs: usize, outputs: usize) -> Result<(), ConstructionError> {
    if def.inputs.len() != inputs {
        return Err(ConstructionError::Arity {
            op_type: def.op_type.clone(),
            what: "inputs",
            expected: inputs,
            actual: def.inputs.len(),
        });
    }
    if def.outputs.len() != outputs {
        return Err(ConstructionError::Arity {
            op_type: def.op_type.clone(),
            what: "outputs",
            expected: outputs,
            actual: def.outputs.len(),
        });
    }
    Ok(())
}

/// Validate arity, resolve inputs and create outputs.
fn bind(
    def: &OperatorDef,
    ws: &mut Workspace<'_>,
    inputs: usize,
    outputs: usize,
) -> Result<(), ConstructionError> {
    check_arity(def, inputs, outputs)?;
    if let Some(missing) = def.inputs.iter().find(|name| !ws.has_blob(name)) {
        return Err(ConstructionError::MissingInput {
            op_type: def.op_type.clone(),
            blob: missing.clone(),
        });
    }
    for name in &def.outputs {
        ws.create_blob(name);
    }
    Ok(())
}

fn read_tensor(ws: &Workspace<'_>, def: &OperatorDef, name: &str) -> Option<Tensor> {
    let blob = ws.get_blob(name)?;
    match blob.get_cloned::<Tensor>() {
        Ok(tensor) => Some(tensor),
        Err(e) => {
            error!(op_type = %def.op_type, blob = name, "Cannot read input: {e}");
            None
        }
    }
}

fn write_output<T: std::any::Any + Send + Sync>(
    ws: &Workspace<'_>,
    def: &OperatorDef,
    name: &str,
    value: T,
) -> bool {
    match ws.get_blob(name) {
        Some(blob) => {
            blob.set(value);
            true
        }
        None => {
            error!(op_type = %def.op_type, blob = name, "Output blob disappeared");
            false
        }
    }
}

/// `outputs[0] <- fill(shape, value)`
pub struct ConstantFill {
    def: OperatorDef,
    dims: Vec<usize>,
    value: f32,
}

impl ConstantFill {
    pub fn new(def: &OperatorDef, ws: &mut Workspace<'_>) -> Result<Self, ConstructionError> {
        let dims = def.arg_dims("shape")?.unwrap_or_else(|| vec![1]);
        let value = def.arg_f32("value")?.unwrap_or(0.0);
        bind(def, ws, 0, 1)?;
        Ok(Self {
            def: def.clone(),
            dims,
            value,
        })
    }
}

impl Operator for ConstantFill {
    fn def(&self) -> &OperatorDef {
        &self.def
    }

    fn run(&self, ws: &Workspace<'_>) -> bool {
        let tensor = Tensor::filled(self.dims.clone(), self.value);
        write_output(ws, &self.def, &self.def.outputs[0], tensor)
    }
}

/// `outputs[0] <- inputs[0]`
pub struct Copy {
    def: OperatorDef,
}

impl Copy {
    pub fn new(def: &OperatorDef, ws: &mut Workspace<'_>) -> Result<Self, ConstructionError> {
        bind(def, ws, 1, 1)?;
        Ok(Self { def: def.clone() })
    }
}

impl Operator for Copy {
    fn def(&self) -> &OperatorDef {
        &self.def
    }

    fn run(&self, ws: &Workspace<'_>) -> bool {
        let Some(input) = read_tensor(ws, &self.def, &self.def.inputs[0]) else {
            return false;
        };
        write_output(ws, &self.def, &self.def.outputs[0], input)
    }
}

/// `outputs[0] <- inputs[0] + inputs[1]`, element-wise on equal shapes.
pub struct Add {
    def: OperatorDef,
}

impl Add {
    pub fn new(def: &OperatorDef, ws: &mut Workspace<'_>) -> Result<Self, ConstructionError> {
        bind(def, ws, 2, 1)?;
        Ok(Self { def: def.clone() })
    }
}

impl Operator for Add {
    fn def(&self) -> &OperatorDef {
        &self.def
    }

    fn run(&self, ws: &Workspace<'_>) -> bool {
        let (Some(mut a), Some(b)) = (
            read_tensor(ws, &self.def, &self.def.inputs[0]),
            read_tensor(ws, &self.def, &self.def.inputs[1]),
        ) else {
            return false;
        };
        if a.dims() != b.dims() {
            error!(
                op_type = %self.def.op_type,
                "Shape mismatch: {:?} vs {:?}",
                a.dims(),
                b.dims()
            );
            return false;
        }
        for (x, y) in a.data_mut().iter_mut().zip(b.data()) {
            *x += y;
        }
        write_output(ws, &self.def, &self.def.outputs[0], a)
    }
}

/// `outputs[0] <- inputs[0] * scale`, split across the workspace thread pool.
pub struct Scale {
    def: OperatorDef,
    scale: f32,
}

impl Scale {
    pub fn new(def: &OperatorDef, ws: &mut Workspace<'_>) -> Result<Self, ConstructionError> {
        let scale = def.arg_f32("scale")?.unwrap_or(1.0);
        bind(def, ws, 1, 1)?;
        Ok(Self {
            def: def.clone(),
            scale,
        })
    }
}

impl Operator for Scale {
    fn def(&self) -> &OperatorDef {
        &self.def
    }

    fn run(&self, ws: &Workspace<'_>) -> bool {
        let Some(input) = read_tensor(ws, &self.def, &self.def.inputs[0]) else {
            return false;
        };
        let pool = match ws.thread_pool() {
            Ok(pool) => pool,
            Err(e) => {
                error!(op_type = %self.def.op_type, "No thread pool: {e}");
                return false;
            }
        };

        let chunk = input.len().div_ceil(pool.num_threads()).max(1);
        let chunks: Vec<Vec<f32>> = input.data().chunks(chunk).map(<[f32]>::to_vec).collect();
        let scale = self.scale;
        let scaled = match pool.map(chunks, move |mut chunk| {
            chunk.iter_mut().for_each(|v| *v *= scale);
            chunk
        }) {
            Ok(scaled) => scaled,
            Err(e) => {
                error!(op_type = %self.def.op_type, "Scaling failed: {e}");
                return false;
            }
        };

        let data: Vec<f32> = scaled.into_iter().flatten().collect();
        match Tensor::from_vec(input.dims().to_vec(), data) {
            Some(output) => write_output(ws, &self.def, &self.def.outputs[0], output),
            None => {
                error!(op_type = %self.def.op_type, "Scaled data does not match input shape");
                false
            }
        }
    }
}

/// `outputs[0]` aliases the storage of `inputs[0]`.
pub struct Alias {
    def: OperatorDef,
}

impl Alias {
    pub fn new(def: &OperatorDef, ws: &mut Workspace<'_>) -> Result<Self, ConstructionError> {
        bind(def, ws, 1, 1)?;
        Ok(Self { def: def.clone() })
    }
}

impl Operator for Alias {
    fn def(&self) -> &OperatorDef {
        &self.def
    }

    fn run(&self, ws: &Workspace<'_>) -> bool {
        let name = &self.def.inputs[0];
        let Some(blob) = ws.get_blob(name) else {
            return false;
        };
        // Read guard is released before the output is written.
        let alias = match blob.read().get::<Tensor>() {
            Ok(source) => Tensor::share_data(source),
            Err(e) => {
                error!(op_type = %self.def.op_type, blob = %name, "Cannot read input: {e}");
                return false;
            }
        };
        write_output(ws, &self.def, &self.def.outputs[0], alias)
    }
}

/// Writes `true` to `outputs[0]` once it has run `count` times.
///
/// The output starts as `false` when the operator is built.
pub struct CountDown {
    def: OperatorDef,
    remaining: AtomicI64,
}

impl CountDown {
    pub fn new(def: &OperatorDef, ws: &mut Workspace<'_>) -> Result<Self, ConstructionError> {
        let count = def.arg_i64("count")?.unwrap_or(1);
        if count < 0 {
            return Err(def.invalid("count", "must not be negative"));
        }
        bind(def, ws, 0, 1)?;
        ws.create_blob(&def.outputs[0]).set(false);
        Ok(Self {
            def: def.clone(),
            remaining: AtomicI64::new(count),
        })
    }
}

impl Operator for CountDown {
    fn def(&self) -> &OperatorDef {
        &self.def
    }

    fn run(&self, ws: &Workspace<'_>) -> bool {
        let left = self.remaining.fetch_sub(1, Ordering::SeqCst) - 1;
        write_output(ws, &self.def, &self.def.outputs[0], left <= 0)
    }
}

/// Always fails. Useful for exercising failure paths.
pub struct Fail {
    def: OperatorDef,
}

impl Fail {
    pub fn new(def: &OperatorDef, _ws: &mut Workspace<'_>) -> Result<Self, ConstructionError> {
        Ok(Self { def: def.clone() })
    }
}

impl Operator for Fail {
    fn def(&self) -> &OperatorDef {
        &self.def
    }

    fn run(&self, _ws: &Workspace<'_>) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ThreadPoolConfig, WorkspaceConfig};
    use crate::registry::ShapeRegistry;
    use rstest::rstest;
    use serde_json::json;

    fn tensor(ws: &Workspace<'_>, name: &str) -> Tensor {
        ws.get_blob(name).unwrap().get_cloned::<Tensor>().unwrap()
    }

    fn workspace() -> Workspace<'static> {
        Workspace::with_config(WorkspaceConfig {
            thread_pool: ThreadPoolConfig {
                num_threads: Some(3),
                apply_cap: false,
            },
            ..WorkspaceConfig::default()
        })
    }

    #[test]
    fn constant_fill_defaults() {
        let mut ws = workspace();
        assert!(ws.run_operator_once(&OperatorDef::new("ConstantFill").output("x")));
        let x = tensor(&ws, "x");
        assert_eq!(x.dims(), &[1]);
        assert_eq!(x.data(), &[0.0]);
    }

    #[test]
    fn copy_and_add() {
        let mut ws = workspace();
        ws.create_blob("a").set(Tensor::from_vec(vec![2], vec![1.0, 2.0]).unwrap());
        assert!(ws.run_operator_once(&OperatorDef::new("Copy").input("a").output("b")));
        assert!(ws.run_operator_once(
            &OperatorDef::new("Add").input("a").input("b").output("c")
        ));
        assert_eq!(tensor(&ws, "c").data(), &[2.0, 4.0]);
    }

    #[test]
    fn add_rejects_shape_mismatch() {
        let mut ws = workspace();
        ws.create_blob("a").set(Tensor::filled(vec![2], 1.0));
        ws.create_blob("b").set(Tensor::filled(vec![3], 1.0));
        assert!(!ws.run_operator_once(
            &OperatorDef::new("Add").input("a").input("b").output("c")
        ));
    }

    #[rstest]
    #[case::even(vec![6], 2.0)]
    #[case::uneven(vec![7], -1.0)]
    #[case::matrix(vec![3, 5], 0.5)]
    #[case::empty(vec![0], 3.0)]
    fn scale_uses_thread_pool(#[case] dims: Vec<usize>, #[case] factor: f32) {
        let mut ws = workspace();
        let len: usize = dims.iter().product();
        let data: Vec<f32> = (0..len).map(|i| i as f32).collect();
        ws.create_blob("a").set(Tensor::from_vec(dims.clone(), data.clone()).unwrap());

        let op = OperatorDef::new("Scale")
            .input("a")
            .output("b")
            .arg("scale", json!(factor));
        assert!(ws.run_operator_once(&op));

        let b = tensor(&ws, "b");
        assert_eq!(b.dims(), dims.as_slice());
        let expected: Vec<f32> = data.iter().map(|v| v * factor).collect();
        assert_eq!(b.data(), expected.as_slice());
    }

    #[test]
    fn alias_shares_storage() {
        let mut ws = workspace();
        ws.create_blob("a").set(Tensor::filled(vec![4], 1.0));
        assert!(ws.run_operator_once(&OperatorDef::new("Alias").input("a").output("view")));
        {
            let source_value = ws.get_blob("a").unwrap().read();
            let view_value = ws.get_blob("view").unwrap().read();
            let view = view_value.get::<Tensor>().unwrap();
            assert!(view.same_buffer(source_value.get::<Tensor>().unwrap()));
            assert!(view.shares_data());
        }

        let shape = ShapeRegistry::with_builtins()
            .shape_of(&ws.get_blob("view").unwrap().read())
            .unwrap();
        assert!(shape.shares_data);
    }

    #[test]
    fn count_down_flips_after_count_runs() {
        let mut ws = workspace();
        let def = OperatorDef::new("CountDown").output("done").arg("count", json!(2));
        let op = ws.create_operator(&def).unwrap();
        assert_eq!(ws.get_blob("done").unwrap().get_cloned::<bool>(), Ok(false));

        assert!(op.run(&ws));
        assert_eq!(ws.get_blob("done").unwrap().get_cloned::<bool>(), Ok(false));
        assert!(op.run(&ws));
        assert_eq!(ws.get_blob("done").unwrap().get_cloned::<bool>(), Ok(true));
    }

    #[test]
    fn count_down_rejects_negative_count() {
        let mut ws = workspace();
        let def = OperatorDef::new("CountDown").output("done").arg("count", json!(-1));
        assert!(matches!(
            ws.create_operator(&def),
            Err(ConstructionError::InvalidArgument { .. })
        ));
    }

    #[rstest]
    #[case::missing_input(OperatorDef::new("Copy").input("ghost").output("b"))]
    #[case::too_few_inputs(OperatorDef::new("Add").input("a").output("c"))]
    #[case::no_output(OperatorDef::new("ConstantFill"))]
    #[case::bad_arg(OperatorDef::new("Scale").input("a").output("b").arg("scale", json!("big")))]
    fn construction_errors(#[case] def: OperatorDef) {
        let mut ws = workspace();
        ws.create_blob("a").set(Tensor::filled(vec![1], 1.0));
        assert!(ws.create_operator(&def).is_err());
        assert!(!ws.run_operator_once(&def));
    }

    #[test]
    fn inputs_resolve_through_parent() {
        let mut parent = workspace();
        parent.create_blob("a").set(Tensor::filled(vec![2], 5.0));
        let mut child = Workspace::with_shared(&parent);
        assert!(child.run_operator_once(&OperatorDef::new("Copy").input("a").output("b")));
        assert!(child.has_local_blob("b"));
        assert!(!parent.has_local_blob("b"));
        assert_eq!(tensor(&child, "b").data(), &[5.0, 5.0]);
    }
}
