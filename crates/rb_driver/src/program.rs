use rb_ir::Node;
use rb_runtime::{Code, ExecError, ExecResult, Runtime, Value};

use crate::Error;

/// A compiled unit. Holds no runtime state, so one program can run against
/// any number of independent runtimes.
#[derive(Clone)]
pub struct Program {
    code: Code,
}

impl Program {
    pub(crate) fn new(code: Code) -> Self {
        Self { code }
    }

    pub fn run(&self, rt: &mut Runtime) -> Result<Value, ExecError> {
        rt.run_program(&self.code)
    }

    /// Runs and drains the host's captured output.
    pub fn exec(&self, rt: &mut Runtime) -> Result<ExecResult, ExecError> {
        let value = self.run(rt)?;
        Ok(ExecResult {
            value,
            output: rt.take_output(),
        })
    }
}

/// Compiles `root` and runs it against `rt`.
pub fn eval(root: &Node, rt: &mut Runtime) -> Result<Value, Error> {
    let program = crate::compile(root)?;
    Ok(program.run(rt)?)
}
