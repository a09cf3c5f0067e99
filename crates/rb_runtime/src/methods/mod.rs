//! Builtin class library.

use crate::Runtime;
use crate::core::{Data, Value};

mod array;
mod common;
mod comparable;
mod enumerable;
mod exception;
mod float;
mod hash;
mod integer;
mod io;
mod kernel;
mod module;
mod nil;
mod object;
mod proc_;
mod range;
mod regexp;
mod string;
mod symbol;

/// Wires mixins and installs every builtin method. Runs once per runtime.
pub(crate) fn bootstrap(rt: &mut Runtime) {
    let c = &rt.classes;
    let mixins = [
        (&c.object, &c.kernel),
        (&c.array, &c.enumerable),
        (&c.hash, &c.enumerable),
        (&c.range, &c.enumerable),
        (&c.string, &c.comparable),
        (&c.integer, &c.comparable),
        (&c.float, &c.comparable),
    ];
    for (class, module) in mixins {
        let _ = crate::core::class::include(class, module);
    }

    object::install(rt);
    kernel::install(rt);
    module::install(rt);
    comparable::install(rt);
    enumerable::install(rt);
    nil::install(rt);
    integer::install(rt);
    float::install(rt);
    string::install(rt);
    symbol::install(rt);
    array::install(rt);
    hash::install(rt);
    range::install(rt);
    proc_::install(rt);
    exception::install(rt);
    regexp::install(rt);
    io::install(rt);
}

/// `puts` for one argument: arrays one element per line, a newline unless
/// the text already ends with one.
pub(crate) fn puts_value(rt: &mut Runtime, v: &Value, out: &mut String) -> crate::RbResult<()> {
    if let Data::Array(items) = v.data() {
        let items = items.borrow().clone();
        if items.is_empty() {
            out.push('\n');
        }
        for item in &items {
            puts_value(rt, item, out)?;
        }
        return Ok(());
    }
    let s = rt.to_s(v)?;
    out.push_str(&s);
    if !s.ends_with('\n') {
        out.push('\n');
    }
    Ok(())
}
