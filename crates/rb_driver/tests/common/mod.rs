#![allow(dead_code)]

use std::thread;

use rb_ir::{Node, sexp};
use rb_runtime::{CaptureHost, Runtime, RuntimeConfig};

/// What one program run left behind. Values are inspected inside the
/// runner thread because runtime objects cannot cross threads.
#[derive(Debug)]
pub struct Run {
    pub output: String,
    /// `inspect` of the program value, or the uncaught exception's class
    /// and message.
    pub result: Result<String, (String, String)>,
    pub balanced: bool,
}

/// Compiled closures nest one host frame per tree level; give deep
/// recursion room before the call-depth limit trips.
const STACK: usize = 256 << 20;

pub fn run_full(cfg: RuntimeConfig, src: &str, input: &[&str]) -> Run {
    let src = src.to_string();
    run_loaded(cfg, input, move || sexp::parse(&src).expect("fixture parses"))
}

/// Runs a tree in parser JSON form.
pub fn run_json(json: &str) -> Run {
    let json = json.to_string();
    run_loaded(RuntimeConfig::default(), &[], move || {
        serde_json::from_str::<Node>(&json).expect("fixture deserializes")
    })
}

fn run_loaded<F>(cfg: RuntimeConfig, input: &[&str], load: F) -> Run
where
    F: FnOnce() -> Node + Send + 'static,
{
    let input: Vec<String> = input.iter().map(|s| s.to_string()).collect();
    thread::Builder::new()
        .stack_size(STACK)
        .spawn(move || {
            let root = load();
            let program = rb_driver::compile(&root).expect("program compiles");
            let mut rt = Runtime::with_host(cfg, Box::new(CaptureHost::with_input(input)));
            let before = rt.stack_depths();
            let result = match program.run(&mut rt) {
                Ok(v) => Ok(rt.inspect(&v).unwrap_or_else(|_| "<inspect failed>".into())),
                Err(e) => Err((e.class_name().to_string(), e.message().to_string())),
            };
            Run {
                output: rt.take_output(),
                result,
                balanced: rt.stack_depths() == before,
            }
        })
        .expect("spawn runner")
        .join()
        .expect("runner thread")
}

pub fn run(src: &str) -> Run {
    run_full(RuntimeConfig::default(), src, &[])
}

/// Inspected program value; panics on an uncaught exception.
pub fn value(src: &str) -> String {
    let r = run(src);
    match r.result {
        Ok(v) => v,
        Err((class, msg)) => panic!("uncaught {class}: {msg}\noutput: {}", r.output),
    }
}

pub fn output(src: &str) -> String {
    let r = run(src);
    if let Err((class, msg)) = &r.result {
        panic!("uncaught {class}: {msg}\noutput: {}", r.output);
    }
    r.output
}

/// Class and message of the uncaught exception.
pub fn error(src: &str) -> (String, String) {
    match run(src).result {
        Ok(v) => panic!("expected an exception, program returned {v}"),
        Err(e) => e,
    }
}

pub fn compile_error(src: &str) -> rb_driver::CompileError {
    let root = sexp::parse(src).expect("fixture parses");
    match rb_driver::compile(&root) {
        Ok(_) => panic!("expected a compile error"),
        Err(e) => e,
    }
}

/// Opt-in log output: `RUST_LOG=rb_runtime=trace cargo test`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
