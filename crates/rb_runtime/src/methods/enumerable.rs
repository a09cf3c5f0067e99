//! `Enumerable`, written against `each`.
//!
//! Methods are driven element by element through [`walk`]: Arrays are
//! indexed live, anything else is handed a native block for `each`. A
//! visitor that has its answer ends the walk with a private break site, so
//! `find` over an endless source returns as soon as it hits.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::ops::ControlFlow;
use std::rc::Rc;

use super::common::*;
use crate::Runtime;
use crate::core::{HashData, NativeBlockFn, Value};
use crate::errors::{RbResult, Unwind};

pub(super) fn install(rt: &mut Runtime) {
    let e = rt.classes.enumerable.clone();
    def_all(&e, &["map", "collect"], map);
    def_all(&e, &["flat_map", "collect_concat"], flat_map);
    def_all(&e, &["select", "filter"], select);
    def(&e, "reject", reject);
    def(&e, "filter_map", filter_map);
    def_all(&e, &["find", "detect"], find);
    def(&e, "find_index", find_index);
    def(&e, "each_with_index", each_with_index);
    def(&e, "each_with_object", each_with_object);
    def(&e, "each_slice", each_slice);
    def(&e, "each_cons", each_cons);
    def_all(&e, &["inject", "reduce"], inject);
    def(&e, "sum", sum);
    def(&e, "count", count);
    def_all(&e, &["to_a", "entries"], to_a);
    def_all(&e, &["include?", "member?"], include);
    def(&e, "first", first);
    def(&e, "take", take);
    def(&e, "min", min);
    def(&e, "max", max);
    def(&e, "min_by", min_by);
    def(&e, "max_by", max_by);
    def(&e, "minmax", minmax);
    def(&e, "sort", sort);
    def(&e, "sort_by", sort_by);
    def(&e, "any?", any);
    def(&e, "all?", all);
    def(&e, "none?", none);
    def(&e, "group_by", group_by);
    def(&e, "partition", partition);
    def(&e, "tally", tally);
    def(&e, "uniq", uniq);
    def(&e, "zip", zip);
    def(&e, "to_h", to_h);
    def(&e, "each_entry", each_entry);
}

/// Feeds each element to `step`, threading `state` through. A step that
/// returns `Break` ends the walk. Multiple yielded values arrive packed
/// into one Array.
fn walk<S, F>(rt: &mut Runtime, recv: &Value, state: S, step: F) -> RbResult<S>
where
    S: 'static,
    F: Fn(&mut Runtime, &mut S, Value) -> RbResult<ControlFlow<()>> + 'static,
{
    let mut state = state;
    if let Some(items) = recv.as_array() {
        let mut i = 0;
        loop {
            let item = match items.borrow().get(i) {
                Some(v) => v.clone(),
                None => break,
            };
            i += 1;
            if step(rt, &mut state, item)?.is_break() {
                break;
            }
        }
        return Ok(state);
    }
    let site = rt.next_stop_site();
    let cell = Rc::new(RefCell::new(Some(state)));
    let slot = cell.clone();
    let f: Rc<NativeBlockFn> = Rc::new(move |rt: &mut Runtime, args: &[Value]| {
        // Gone once the walk is over, or while a step re-enters this block.
        let Some(mut state) = slot.borrow_mut().take() else {
            return Ok(rt.nil());
        };
        let item = match args {
            [one] => one.clone(),
            _ => rt.array(args.to_vec()),
        };
        let flow = step(rt, &mut state, item);
        *slot.borrow_mut() = Some(state);
        match flow? {
            ControlFlow::Continue(()) => Ok(rt.nil()),
            ControlFlow::Break(()) => Err(Unwind::Break { site, value: rt.nil() }),
        }
    });
    let blk = rt.native_proc(f);
    match rt.send(recv, "each", &[], Some(&blk)) {
        Ok(_) => {}
        Err(Unwind::Break { site: s, .. }) if s == site => {}
        Err(e) => return Err(e),
    }
    let state = cell.borrow_mut().take();
    state.ok_or_else(|| rt.runtime_error("iteration state lost"))
}

const GO: RbResult<ControlFlow<()>> = Ok(ControlFlow::Continue(()));
const STOP: RbResult<ControlFlow<()>> = Ok(ControlFlow::Break(()));

/// Every element, in order.
fn gather(rt: &mut Runtime, recv: &Value) -> RbResult<Vec<Value>> {
    if let Some(items) = recv.as_array() {
        return Ok(items.borrow().clone());
    }
    walk(rt, recv, Vec::new(), |_rt, out: &mut Vec<Value>, item| {
        out.push(item);
        GO
    })
}

/// Calls `blk` with one element. Hash pairs are spread over the block's
/// parameters by the non-strict binding rules.
fn yield1(rt: &mut Runtime, blk: &Value, item: &Value) -> RbResult<Value> {
    rt.call_block(blk, std::slice::from_ref(item))
}

fn map(rt: &mut Runtime, recv: &Value, _args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    let Some(blk) = block else {
        let items = gather(rt, recv)?;
        return Ok(rt.array(items));
    };
    let (_, out) = walk(rt, recv, (blk.clone(), Vec::new()), |rt, (blk, out): &mut (Value, Vec<Value>), item| {
        out.push(yield1(rt, blk, &item)?);
        GO
    })?;
    Ok(rt.array(out))
}

fn flat_map(rt: &mut Runtime, recv: &Value, _args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    let blk = expect_block(rt, block)?.clone();
    let (_, out) = walk(rt, recv, (blk, Vec::new()), |rt, (blk, out): &mut (Value, Vec<Value>), item| {
        let v = yield1(rt, blk, &item)?;
        match v.as_array() {
            Some(a) => out.extend(a.borrow().iter().cloned()),
            None => out.push(v),
        }
        GO
    })?;
    Ok(rt.array(out))
}

fn filter_by(rt: &mut Runtime, recv: &Value, block: Option<&Value>, keep: bool) -> RbResult<Vec<Value>> {
    let blk = expect_block(rt, block)?.clone();
    let state = (blk, keep, Vec::new());
    let (_, _, out) = walk(rt, recv, state, |rt, (blk, keep, out): &mut (Value, bool, Vec<Value>), item| {
        if yield1(rt, blk, &item)?.truthy() == *keep {
            out.push(item);
        }
        GO
    })?;
    Ok(out)
}

/// Hash receivers keep their type through `select` and `reject`.
fn rebuild(rt: &Runtime, recv: &Value, items: Vec<Value>) -> Value {
    if recv.as_hash().is_none() {
        return rt.array(items);
    }
    let mut h = HashData::new(None);
    for pair in items {
        let kv = rt.to_ary(&pair);
        h.insert(arg(rt, &kv, 0), arg(rt, &kv, 1));
    }
    rt.hash(h)
}

fn select(rt: &mut Runtime, recv: &Value, _args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    let items = filter_by(rt, recv, block, true)?;
    Ok(rebuild(rt, recv, items))
}

fn reject(rt: &mut Runtime, recv: &Value, _args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    let items = filter_by(rt, recv, block, false)?;
    Ok(rebuild(rt, recv, items))
}

fn filter_map(rt: &mut Runtime, recv: &Value, _args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    let blk = expect_block(rt, block)?.clone();
    let (_, out) = walk(rt, recv, (blk, Vec::new()), |rt, (blk, out): &mut (Value, Vec<Value>), item| {
        let v = yield1(rt, blk, &item)?;
        if v.truthy() {
            out.push(v);
        }
        GO
    })?;
    Ok(rt.array(out))
}

fn find(rt: &mut Runtime, recv: &Value, _args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    let blk = expect_block(rt, block)?.clone();
    let (_, hit) = walk(rt, recv, (blk, None), |rt, (blk, hit): &mut (Value, Option<Value>), item| {
        if yield1(rt, blk, &item)?.truthy() {
            *hit = Some(item);
            return STOP;
        }
        GO
    })?;
    Ok(hit.unwrap_or_else(|| rt.nil()))
}

/// Target or block, whichever an element is tested against.
#[derive(Clone)]
enum Test {
    Equal(Value),
    Block(Value),
}

impl Test {
    fn hit(&self, rt: &mut Runtime, item: &Value) -> RbResult<bool> {
        match self {
            Test::Equal(target) => rt.equals(item, target),
            Test::Block(blk) => Ok(yield1(rt, blk, item)?.truthy()),
        }
    }
}

fn find_index(rt: &mut Runtime, recv: &Value, args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 0, 1)?;
    let test = match args.first() {
        Some(target) => Test::Equal(target.clone()),
        None => Test::Block(expect_block(rt, block)?.clone()),
    };
    let state = (test, 0usize, None);
    let (_, _, found) = walk(rt, recv, state, |rt, (test, i, found): &mut (Test, usize, Option<usize>), item| {
        if test.hit(rt, &item)? {
            *found = Some(*i);
            return STOP;
        }
        *i += 1;
        GO
    })?;
    Ok(match found {
        Some(i) => rt.int(i as i64),
        None => rt.nil(),
    })
}

fn each_with_index(rt: &mut Runtime, recv: &Value, _args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    let blk = expect_block(rt, block)?.clone();
    walk(rt, recv, (blk, 0i64), |rt, (blk, i): &mut (Value, i64), item| {
        let idx = rt.int(*i);
        *i += 1;
        rt.call_block(blk, &[item, idx])?;
        GO
    })?;
    Ok(recv.clone())
}

fn each_with_object(rt: &mut Runtime, recv: &Value, args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    let blk = expect_block(rt, block)?.clone();
    let memo = args[0].clone();
    walk(rt, recv, (blk, memo.clone()), |rt, (blk, memo): &mut (Value, Value), item| {
        rt.call_block(blk, &[item, memo.clone()])?;
        GO
    })?;
    Ok(memo)
}

/// Window state for `each_slice` and `each_cons`. Groups go to the block as
/// soon as they fill, or are kept when there is none.
struct Chunks {
    blk: Option<Value>,
    size: usize,
    cons: bool,
    buf: Vec<Value>,
    groups: Vec<Value>,
}

impl Chunks {
    fn emit(&mut self, rt: &mut Runtime, group: Vec<Value>) -> RbResult<()> {
        let g = rt.array(group);
        match &self.blk {
            Some(blk) => {
                rt.call_block(blk, &[g])?;
            }
            None => self.groups.push(g),
        }
        Ok(())
    }

    fn push(&mut self, rt: &mut Runtime, item: Value) -> RbResult<()> {
        self.buf.push(item);
        if self.buf.len() < self.size {
            return Ok(());
        }
        let group = if self.cons {
            let g = self.buf.clone();
            self.buf.remove(0);
            g
        } else {
            std::mem::take(&mut self.buf)
        };
        self.emit(rt, group)
    }
}

fn chunked(rt: &mut Runtime, recv: &Value, args: &[Value], block: Option<&Value>, cons: bool) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    let n = expect_i64(rt, &args[0])?;
    if n <= 0 {
        return Err(rt.arg_error("invalid slice size"));
    }
    let state = Chunks {
        blk: block.cloned(),
        size: n as usize,
        cons,
        buf: Vec::new(),
        groups: Vec::new(),
    };
    let mut state = walk(rt, recv, state, |rt, st: &mut Chunks, item| {
        st.push(rt, item)?;
        GO
    })?;
    if !cons && !state.buf.is_empty() {
        let rest = std::mem::take(&mut state.buf);
        state.emit(rt, rest)?;
    }
    match block {
        Some(_) => Ok(recv.clone()),
        None => Ok(rt.array(state.groups)),
    }
}

fn each_slice(rt: &mut Runtime, recv: &Value, args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    chunked(rt, recv, args, block, false)
}

fn each_cons(rt: &mut Runtime, recv: &Value, args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    chunked(rt, recv, args, block, true)
}

/// How `inject` folds: by method name or by block.
struct Fold {
    op: Option<String>,
    blk: Option<Value>,
    acc: Option<Value>,
}

/// `inject(init) { |acc, x| }`, `inject(:+)`, `inject(init, :+)`.
fn inject(rt: &mut Runtime, recv: &Value, args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 0, 2)?;
    let (acc, op) = match (args, block) {
        ([sym], None) => (None, Some(rt.name_of(sym)?)),
        ([init, sym], _) => (Some(init.clone()), Some(rt.name_of(sym)?)),
        ([init], Some(_)) => (Some(init.clone()), None),
        _ => (None, None),
    };
    let state = Fold {
        op,
        blk: block.cloned(),
        acc,
    };
    let state = walk(rt, recv, state, |rt, st: &mut Fold, item| {
        let Some(acc) = st.acc.take() else {
            st.acc = Some(item);
            return GO;
        };
        let next = match &st.op {
            Some(name) => rt.send(&acc, name, &[item], None)?,
            None => {
                let blk = expect_block(rt, st.blk.as_ref())?;
                rt.call_block(blk, &[acc, item])?
            }
        };
        st.acc = Some(next);
        GO
    })?;
    Ok(state.acc.unwrap_or_else(|| rt.nil()))
}

fn sum(rt: &mut Runtime, recv: &Value, args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 0, 1)?;
    let acc = match args.first() {
        Some(v) => v.clone(),
        None => rt.int(0),
    };
    let state = (block.cloned(), acc);
    let (_, acc) = walk(rt, recv, state, |rt, (blk, acc): &mut (Option<Value>, Value), item| {
        let v = match blk {
            Some(blk) => yield1(rt, blk, &item)?,
            None => item,
        };
        let next = rt.send(acc, "+", &[v], None)?;
        *acc = next;
        GO
    })?;
    Ok(acc)
}

fn count(rt: &mut Runtime, recv: &Value, args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 0, 1)?;
    let test = match (args.first(), block) {
        (Some(target), _) => Some(Test::Equal(target.clone())),
        (None, Some(blk)) => Some(Test::Block(blk.clone())),
        (None, None) => None,
    };
    let (_, n) = walk(rt, recv, (test, 0i64), |rt, (test, n): &mut (Option<Test>, i64), item| {
        let hit = match test {
            Some(t) => t.hit(rt, &item)?,
            None => true,
        };
        if hit {
            *n += 1;
        }
        GO
    })?;
    Ok(rt.int(n))
}

fn to_a(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let items = gather(rt, recv)?;
    Ok(rt.array(items))
}

fn include(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    let state = (Test::Equal(args[0].clone()), false);
    let (_, found) = walk(rt, recv, state, |rt, (test, found): &mut (Test, bool), item| {
        if test.hit(rt, &item)? {
            *found = true;
            return STOP;
        }
        GO
    })?;
    Ok(rt.bool(found))
}

fn first(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 0, 1)?;
    let Some(n) = args.first() else {
        let hit = walk(rt, recv, None, |_rt, hit: &mut Option<Value>, item| {
            *hit = Some(item);
            STOP
        })?;
        return Ok(hit.unwrap_or_else(|| rt.nil()));
    };
    let n = expect_i64(rt, n)?;
    if n < 0 {
        return Err(rt.arg_error("attempt to take negative size"));
    }
    if n == 0 {
        return Ok(rt.array(Vec::new()));
    }
    let (_, out) = walk(rt, recv, (n as usize, Vec::new()), |_rt, (n, out): &mut (usize, Vec<Value>), item| {
        out.push(item);
        if out.len() >= *n {
            return STOP;
        }
        GO
    })?;
    Ok(rt.array(out))
}

fn take(rt: &mut Runtime, recv: &Value, args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    first(rt, recv, args, block)
}

/// Stable merge sort with a comparison that may raise.
pub(crate) fn sort_values(
    rt: &mut Runtime,
    items: Vec<Value>,
    cmp: &mut dyn FnMut(&mut Runtime, &Value, &Value) -> RbResult<Ordering>,
) -> RbResult<Vec<Value>> {
    if items.len() <= 1 {
        return Ok(items);
    }
    let mut right = items;
    let left: Vec<Value> = right.drain(..right.len() / 2).collect();
    let left = sort_values(rt, left, cmp)?;
    let right = sort_values(rt, right, cmp)?;
    let mut out = Vec::with_capacity(left.len() + right.len());
    let (mut l, mut r) = (left.into_iter().peekable(), right.into_iter().peekable());
    loop {
        let take_right = match (l.peek(), r.peek()) {
            (Some(a), Some(b)) => cmp(rt, b, a)? == Ordering::Less,
            _ => break,
        };
        if take_right {
            out.extend(r.next());
        } else {
            out.extend(l.next());
        }
    }
    out.extend(l);
    out.extend(r);
    Ok(out)
}

/// Ordering from a `<=>`-style block result.
fn block_order(rt: &mut Runtime, blk: &Value, a: &Value, b: &Value) -> RbResult<Ordering> {
    let r = rt.call_block(blk, &[a.clone(), b.clone()])?;
    match r.as_i64() {
        Some(n) => Ok(n.cmp(&0)),
        None => Err(rt.arg_error(format!(
            "comparison of {} with {} failed",
            a.class_name(),
            b.class_name()
        ))),
    }
}

pub(crate) fn sorted(rt: &mut Runtime, items: Vec<Value>, block: Option<&Value>) -> RbResult<Vec<Value>> {
    match block {
        Some(blk) => sort_values(rt, items, &mut |rt: &mut Runtime, a: &Value, b: &Value| {
            block_order(rt, blk, a, b)
        }),
        None => sort_values(rt, items, &mut |rt: &mut Runtime, a: &Value, b: &Value| {
            rt.compare(a, b)
        }),
    }
}

fn sort(rt: &mut Runtime, recv: &Value, _args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    let items = gather(rt, recv)?;
    let out = sorted(rt, items, block)?;
    Ok(rt.array(out))
}

/// Elements paired with their block keys.
fn keyed(rt: &mut Runtime, recv: &Value, block: Option<&Value>) -> RbResult<Vec<Value>> {
    let blk = expect_block(rt, block)?.clone();
    let (_, out) = walk(rt, recv, (blk, Vec::new()), |rt, (blk, out): &mut (Value, Vec<Value>), item| {
        let key = yield1(rt, blk, &item)?;
        out.push(rt.array(vec![key, item]));
        GO
    })?;
    Ok(out)
}

fn pair_key(v: &Value) -> Value {
    v.as_array().and_then(|a| a.borrow().first().cloned()).unwrap_or_else(|| v.clone())
}

fn pair_value(v: &Value) -> Value {
    v.as_array().and_then(|a| a.borrow().get(1).cloned()).unwrap_or_else(|| v.clone())
}

fn sort_by(rt: &mut Runtime, recv: &Value, _args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    let pairs = keyed(rt, recv, block)?;
    let out = sort_values(rt, pairs, &mut |rt: &mut Runtime, a: &Value, b: &Value| {
        rt.compare(&pair_key(a), &pair_key(b))
    })?;
    let items = out.iter().map(pair_value).collect();
    Ok(rt.array(items))
}

fn extreme(rt: &mut Runtime, items: Vec<Value>, block: Option<&Value>, want: Ordering) -> RbResult<Option<Value>> {
    let mut best: Option<Value> = None;
    for item in items {
        let better = match &best {
            None => true,
            Some(b) => {
                let o = match block {
                    Some(blk) => block_order(rt, blk, &item, b)?,
                    None => rt.compare(&item, b)?,
                };
                o == want
            }
        };
        if better {
            best = Some(item);
        }
    }
    Ok(best)
}

fn min_max(rt: &mut Runtime, recv: &Value, args: &[Value], block: Option<&Value>, want: Ordering) -> RbResult<Value> {
    validate_arity(rt, args.len(), 0, 1)?;
    let items = gather(rt, recv)?;
    if let Some(n) = args.first() {
        let n = expect_i64(rt, n)?.max(0) as usize;
        let mut out = sorted(rt, items, block)?;
        if want == Ordering::Greater {
            out.reverse();
        }
        out.truncate(n);
        return Ok(rt.array(out));
    }
    Ok(extreme(rt, items, block, want)?.unwrap_or_else(|| rt.nil()))
}

fn min(rt: &mut Runtime, recv: &Value, args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    min_max(rt, recv, args, block, Ordering::Less)
}

fn max(rt: &mut Runtime, recv: &Value, args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    min_max(rt, recv, args, block, Ordering::Greater)
}

fn extreme_by(rt: &mut Runtime, recv: &Value, block: Option<&Value>, want: Ordering) -> RbResult<Value> {
    let pairs = keyed(rt, recv, block)?;
    let mut best: Option<Value> = None;
    for p in pairs {
        let better = match &best {
            None => true,
            Some(b) => rt.compare(&pair_key(&p), &pair_key(b))? == want,
        };
        if better {
            best = Some(p);
        }
    }
    Ok(best.map(|p| pair_value(&p)).unwrap_or_else(|| rt.nil()))
}

fn min_by(rt: &mut Runtime, recv: &Value, _args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    extreme_by(rt, recv, block, Ordering::Less)
}

fn max_by(rt: &mut Runtime, recv: &Value, _args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    extreme_by(rt, recv, block, Ordering::Greater)
}

fn minmax(rt: &mut Runtime, recv: &Value, _args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    let items = gather(rt, recv)?;
    let lo = extreme(rt, items.clone(), block, Ordering::Less)?;
    let hi = extreme(rt, items, block, Ordering::Greater)?;
    let nil = rt.nil();
    Ok(rt.array(vec![lo.unwrap_or_else(|| nil.clone()), hi.unwrap_or(nil)]))
}

struct Until {
    pattern: Option<Value>,
    blk: Option<Value>,
    stop_on: bool,
    stopped: bool,
}

/// Shared body of `any?`, `all?` and `none?`: true as soon as some element
/// tests `stop_on`. A pattern argument is matched with `===`, a block is
/// called, otherwise elements are tested for truth.
fn test_until(rt: &mut Runtime, recv: &Value, args: &[Value], block: Option<&Value>, stop_on: bool) -> RbResult<bool> {
    validate_arity(rt, args.len(), 0, 1)?;
    let state = Until {
        pattern: args.first().cloned(),
        blk: block.cloned(),
        stop_on,
        stopped: false,
    };
    let state = walk(rt, recv, state, |rt, st: &mut Until, item| {
        let hit = match (&st.pattern, &st.blk) {
            (Some(pattern), _) => rt.case_eq(pattern, &item)?,
            (None, Some(blk)) => yield1(rt, blk, &item)?.truthy(),
            (None, None) => item.truthy(),
        };
        if hit == st.stop_on {
            st.stopped = true;
            return STOP;
        }
        GO
    })?;
    Ok(state.stopped)
}

fn any(rt: &mut Runtime, recv: &Value, args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    let found = test_until(rt, recv, args, block, true)?;
    Ok(rt.bool(found))
}

fn all(rt: &mut Runtime, recv: &Value, args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    let failed = test_until(rt, recv, args, block, false)?;
    Ok(rt.bool(!failed))
}

fn none(rt: &mut Runtime, recv: &Value, args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    let found = test_until(rt, recv, args, block, true)?;
    Ok(rt.bool(!found))
}

fn group_by(rt: &mut Runtime, recv: &Value, _args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    let pairs = keyed(rt, recv, block)?;
    let mut groups = HashData::new(None);
    for p in pairs {
        let key = pair_key(&p);
        let item = pair_value(&p);
        match groups.get(&key) {
            Some(list) => {
                if let Some(a) = list.as_array() {
                    a.borrow_mut().push(item);
                }
            }
            None => groups.insert(key, rt.array(vec![item])),
        }
    }
    Ok(rt.hash(groups))
}

fn partition(rt: &mut Runtime, recv: &Value, _args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    let blk = expect_block(rt, block)?.clone();
    let state = (blk, Vec::new(), Vec::new());
    let (_, yes, no) = walk(rt, recv, state, |rt, (blk, yes, no): &mut (Value, Vec<Value>, Vec<Value>), item| {
        if yield1(rt, blk, &item)?.truthy() {
            yes.push(item);
        } else {
            no.push(item);
        }
        GO
    })?;
    let (yes, no) = (rt.array(yes), rt.array(no));
    Ok(rt.array(vec![yes, no]))
}

fn tally(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let counts = walk(rt, recv, HashData::new(None), |rt, counts: &mut HashData, item| {
        let n = counts.get(&item).and_then(|v| v.as_i64()).unwrap_or(0);
        counts.insert(item, rt.int(n + 1));
        GO
    })?;
    Ok(rt.hash(counts))
}

/// Distinct by `eql?`, or by block key.
pub(crate) fn uniq_values(rt: &mut Runtime, items: Vec<Value>, block: Option<&Value>) -> RbResult<Vec<Value>> {
    let mut seen = HashData::new(None);
    let mut out = Vec::new();
    for item in items {
        let key = match block {
            Some(blk) => yield1(rt, blk, &item)?,
            None => item.clone(),
        };
        if seen.position(&key).is_none() {
            seen.insert(key, rt.nil());
            out.push(item);
        }
    }
    Ok(out)
}

fn uniq(rt: &mut Runtime, recv: &Value, _args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    let items = gather(rt, recv)?;
    let out = uniq_values(rt, items, block)?;
    Ok(rt.array(out))
}

fn zip(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let items = gather(rt, recv)?;
    let mut others = Vec::with_capacity(args.len());
    for a in args {
        others.push(gather(rt, a)?);
    }
    let rows = items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            let mut row = vec![item];
            row.extend(others.iter().map(|o| o.get(i).cloned().unwrap_or_else(|| rt.nil())));
            rt.array(row)
        })
        .collect();
    Ok(rt.array(rows))
}

fn to_h(rt: &mut Runtime, recv: &Value, _args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    let state = (block.cloned(), HashData::new(None));
    let (_, h) = walk(rt, recv, state, |rt, (blk, h): &mut (Option<Value>, HashData), item| {
        let pair = match blk {
            Some(blk) => yield1(rt, blk, &item)?,
            None => item,
        };
        let Some(kv) = pair.as_array().map(|a| a.borrow().clone()).filter(|kv| kv.len() == 2) else {
            return Err(rt.type_error(format!(
                "wrong element type {} (expected array)",
                pair.class_name()
            )));
        };
        h.insert(kv[0].clone(), kv[1].clone());
        GO
    })?;
    Ok(rt.hash(h))
}

fn each_entry(rt: &mut Runtime, recv: &Value, _args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    let blk = expect_block(rt, block)?.clone();
    walk(rt, recv, blk, |rt, blk: &mut Value, item| {
        yield1(rt, blk, &item)?;
        GO
    })?;
    Ok(recv.clone())
}
