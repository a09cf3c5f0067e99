use regex::{Captures, Regex};

use super::common::*;
use crate::Runtime;
use crate::core::Value;
use crate::errors::RbResult;

pub(super) fn install(rt: &mut Runtime) {
    let c = rt.classes.regexp.clone();
    def(&c, "match?", match_p);
    def(&c, "=~", match_op);
    def(&c, "===", case_eq);
    def(&c, "match", match_);
    def(&c, "source", source);
    def(&c, "to_s", to_s);
    def(&c, "inspect", inspect);
    def(&c, "==", eq);
    def_singleton(&c, "new", new);
    def_singleton(&c, "escape", escape);
}

/// A Regexp argument's compiled pattern, or a String taken literally.
pub(crate) fn pattern(rt: &Runtime, v: &Value) -> RbResult<Regex> {
    if let Some(r) = v.as_regexp() {
        return Ok(r.regex.clone());
    }
    if let Some(s) = v.as_str() {
        return Regex::new(&regex::escape(&s)).map_err(|e| rt.runtime_error(e.to_string()));
    }
    Err(rt.type_error(format!(
        "wrong argument type {} (expected Regexp)",
        type_label(v)
    )))
}

/// Records `caps` for `$~` and `$1`...
pub(crate) fn record(rt: &mut Runtime, caps: Option<&Captures<'_>>) {
    rt.last_match = caps.map(|c| {
        c.iter()
            .map(|m| m.map(|m| m.as_str().to_string()))
            .collect()
    });
}

/// Character index of the first match, recording it as the last match.
pub(crate) fn match_index(rt: &mut Runtime, re: &Regex, text: &str) -> Option<usize> {
    let caps = re.captures(text);
    record(rt, caps.as_ref());
    let start = caps.as_ref()?.get(0)?.start();
    Some(text[..start].chars().count())
}

fn subject(rt: &Runtime, v: &Value) -> RbResult<Option<String>> {
    match v.data() {
        crate::core::Data::Nil => Ok(None),
        _ => match v.as_symbol() {
            Some(s) => Ok(Some(s.to_string())),
            None => expect_str(rt, v).map(Some),
        },
    }
}

fn regex(recv: &Value) -> Option<&Regex> {
    recv.as_regexp().map(|r| &r.regex)
}

fn match_p(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    let hit = match (regex(recv), subject(rt, &args[0])?) {
        (Some(re), Some(text)) => re.is_match(&text),
        _ => false,
    };
    Ok(rt.bool(hit))
}

fn match_op(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    let Some(text) = subject(rt, &args[0])? else {
        rt.last_match = None;
        return Ok(rt.nil());
    };
    let Some(re) = regex(recv).cloned() else {
        return Ok(rt.nil());
    };
    Ok(match match_index(rt, &re, &text) {
        Some(i) => rt.int(i as i64),
        None => rt.nil(),
    })
}

fn case_eq(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    if args[0].as_str().is_none() && args[0].as_symbol().is_none() {
        return Ok(rt.bool(false));
    }
    let r = match_op(rt, recv, args, None)?;
    Ok(rt.bool(!r.is_nil()))
}

/// The groups of the first match as an Array (index 0 is the whole match),
/// nil when nothing matched.
fn match_(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    match_op(rt, recv, args, None)?;
    Ok(rt.get_global("$~"))
}

fn source(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let src = recv.as_regexp().map(|r| r.source.clone()).unwrap_or_default();
    Ok(rt.str(src))
}

/// `(?i-mx:abc)`
fn to_s(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let Some(r) = recv.as_regexp() else {
        return Ok(rt.str(""));
    };
    let on: String = "mix".chars().filter(|c| r.flags.contains(*c)).collect();
    let off: String = "mix".chars().filter(|c| !r.flags.contains(*c)).collect();
    let text = if off.is_empty() {
        format!("(?{on}:{})", r.source)
    } else {
        format!("(?{on}-{off}:{})", r.source)
    };
    Ok(rt.str(text))
}

fn inspect(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let text = recv
        .as_regexp()
        .map(|r| format!("/{}/{}", r.source.replace('/', "\\/"), r.flags))
        .unwrap_or_default();
    Ok(rt.str(text))
}

fn eq(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    let same = match (recv.as_regexp(), args[0].as_regexp()) {
        (Some(a), Some(b)) => a.source == b.source && a.flags == b.flags,
        _ => false,
    };
    Ok(rt.bool(same))
}

/// `Regexp.new(source)` / `Regexp.new(source, "i")`.
fn new(rt: &mut Runtime, _recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 2)?;
    if let Some(r) = args[0].as_regexp() {
        return rt.regexp(&r.source, &r.flags);
    }
    let source = expect_str(rt, &args[0])?;
    let flags = match args.get(1) {
        Some(f) if f.as_str().is_some() => expect_str(rt, f)?,
        Some(f) if f.truthy() => "i".to_string(),
        _ => String::new(),
    };
    rt.regexp(&source, &flags)
}

fn escape(rt: &mut Runtime, _recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    let s = expect_str(rt, &args[0])?;
    Ok(rt.str(regex::escape(&s)))
}

