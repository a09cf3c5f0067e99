use std::cell::RefCell;

use num_bigint::BigInt;
use regex::{Captures, Regex};

use super::common::*;
use super::regexp;
use crate::Runtime;
use crate::core::{Data, Value};
use crate::errors::RbResult;
use crate::runtime::format;

pub(super) fn install(rt: &mut Runtime) {
    let c = rt.classes.string.clone();
    def(&c, "initialize", initialize);
    def(&c, "+", plus);
    def(&c, "*", times);
    def(&c, "%", percent);
    def_all(&c, &["==", "===", "eql?"], eq);
    def(&c, "<=>", cmp);
    def(&c, "=~", match_op);
    def(&c, "match?", match_p);
    def(&c, "match", match_);
    def(&c, "scan", scan);
    def_all(&c, &["[]", "slice"], index);
    def(&c, "[]=", index_set);
    def_all(&c, &["<<", "concat"], append);
    def(&c, "replace", replace);
    def_all(&c, &["length", "size"], length);
    def(&c, "bytesize", bytesize);
    def(&c, "empty?", empty);
    def(&c, "upcase", upcase);
    def(&c, "downcase", downcase);
    def(&c, "capitalize", capitalize);
    def(&c, "swapcase", swapcase);
    def(&c, "upcase!", upcase_bang);
    def(&c, "downcase!", downcase_bang);
    def(&c, "reverse", reverse);
    def(&c, "include?", include);
    def(&c, "start_with?", start_with);
    def(&c, "end_with?", end_with);
    def(&c, "index", str_index);
    def(&c, "strip", strip);
    def(&c, "lstrip", lstrip);
    def(&c, "rstrip", rstrip);
    def(&c, "chomp", chomp);
    def(&c, "chop", chop);
    def(&c, "chars", chars);
    def(&c, "bytes", bytes);
    def(&c, "each_char", each_char);
    def(&c, "split", split);
    def(&c, "lines", lines);
    def(&c, "center", center);
    def(&c, "ljust", ljust);
    def(&c, "rjust", rjust);
    def(&c, "count", count);
    def(&c, "delete", delete);
    def(&c, "squeeze", squeeze);
    def(&c, "tr", tr);
    def(&c, "sub", sub);
    def(&c, "gsub", gsub);
    def(&c, "sub!", sub_bang);
    def(&c, "gsub!", gsub_bang);
    def_all(&c, &["succ", "next"], succ);
    def(&c, "ord", ord);
    def(&c, "hex", hex);
    def_all(&c, &["to_s", "to_str"], to_s);
    def_all(&c, &["to_sym", "intern"], to_sym);
    def(&c, "to_i", to_i);
    def(&c, "to_f", to_f);
    def(&c, "inspect", inspect);
    def(&c, "dump", inspect);
    def(&c, "hash", hash);
    def(&c, "freeze", itself);
    def(&c, "+@", dup);
    def(&c, "-@", itself);
}

fn buf(v: &Value) -> Option<&RefCell<String>> {
    match v.data() {
        Data::Str(s) => Some(s),
        _ => None,
    }
}

fn text(v: &Value) -> String {
    v.as_str().map(|s| s.clone()).unwrap_or_default()
}

fn str_arg(rt: &Runtime, args: &[Value], i: usize) -> RbResult<String> {
    match args.get(i) {
        Some(v) => expect_str(rt, v),
        None => Err(rt.arg_error("wrong number of arguments")),
    }
}

fn initialize(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 0, 1)?;
    if let (Some(b), Some(v)) = (buf(recv), args.first()) {
        let s = expect_str(rt, v)?;
        *b.borrow_mut() = s;
    }
    Ok(rt.nil())
}

fn plus(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    let rhs = expect_str(rt, &args[0])?;
    Ok(rt.str(text(recv) + &rhs))
}

fn times(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    let n = expect_i64(rt, &args[0])?;
    if n < 0 {
        return Err(rt.arg_error("negative argument"));
    }
    let s = text(recv);
    repeat_len(rt, s.len(), n)?;
    if s.is_empty() {
        return Ok(rt.str(s));
    }
    Ok(rt.str(s.repeat(n as usize)))
}

fn percent(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    let values = rt.to_ary(&args[0]);
    let out = sprintf(rt, &text(recv), &values)?;
    Ok(rt.str(out))
}

fn eq(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    let same = args[0].as_str().is_some_and(|s| *s == text(recv));
    Ok(rt.bool(same))
}

fn cmp(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    let order = args[0].as_str().map(|other| text(recv).as_str().cmp(other.as_str()));
    Ok(match order {
        Some(o) => rt.int(o as i64),
        None => rt.nil(),
    })
}

fn match_op(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    if args[0].as_str().is_some() {
        return Err(rt.type_error("wrong argument type String (expected Regexp)"));
    }
    let re = regexp::pattern(rt, &args[0])?;
    Ok(match regexp::match_index(rt, &re, &text(recv)) {
        Some(i) => rt.int(i as i64),
        None => rt.nil(),
    })
}

fn match_p(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    let re = regexp::pattern(rt, &args[0])?;
    Ok(rt.bool(re.is_match(&text(recv))))
}

fn match_(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    let re = regexp::pattern(rt, &args[0])?;
    regexp::match_index(rt, &re, &text(recv));
    Ok(rt.get_global("$~"))
}

/// All matches; each is the whole match, or an Array of groups when the
/// pattern has groups. With a block, yields each instead.
fn scan(rt: &mut Runtime, recv: &Value, args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    let re = regexp::pattern(rt, &args[0])?;
    let s = text(recv);
    let mut found = Vec::new();
    for caps in re.captures_iter(&s) {
        let item = if caps.len() > 1 {
            let groups = caps
                .iter()
                .skip(1)
                .map(|m| m.map(|m| rt.str(m.as_str())).unwrap_or_else(|| rt.nil()))
                .collect();
            rt.array(groups)
        } else {
            rt.str(caps.get(0).map(|m| m.as_str()).unwrap_or_default())
        };
        regexp::record(rt, Some(&caps));
        match block {
            Some(blk) => {
                rt.call_block(blk, &[item])?;
            }
            None => found.push(item),
        }
    }
    match block {
        Some(_) => Ok(recv.clone()),
        None => Ok(rt.array(found)),
    }
}

fn char_slice(rt: &Runtime, chars: &[char], s: usize, e: usize) -> Value {
    rt.str(chars[s..e].iter().collect::<String>())
}

/// `s[i]`, `s[start, len]`, `s[range]`, `s["sub"]`, `s[/re/]`.
fn index(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 2)?;
    let s = text(recv);
    let chars: Vec<char> = s.chars().collect();
    if let Some(len) = args.get(1) {
        let start = expect_i64(rt, &args[0])?;
        let count = expect_i64(rt, len)?;
        return Ok(match slice_bounds(start, count, chars.len()) {
            Some((a, b)) => char_slice(rt, &chars, a, b),
            None => rt.nil(),
        });
    }
    let key = &args[0];
    if key.as_range().is_some() {
        return Ok(match range_bounds(rt, key, chars.len())? {
            Some((a, b)) => char_slice(rt, &chars, a, b),
            None => rt.nil(),
        });
    }
    if let Some(sub) = key.as_str() {
        let hit = s.contains(sub.as_str()).then(|| sub.clone());
        drop(sub);
        return Ok(hit.map(|h| rt.str(h)).unwrap_or_else(|| rt.nil()));
    }
    if key.as_regexp().is_some() {
        let re = regexp::pattern(rt, key)?;
        regexp::match_index(rt, &re, &s);
        return Ok(rt.nth_ref(0));
    }
    let i = expect_i64(rt, key)?;
    Ok(match norm_index(i, chars.len()) {
        Some(i) => rt.str(chars[i].to_string()),
        None => rt.nil(),
    })
}

/// `s[i] = x`, `s[start, len] = x`, `s["sub"] = x`.
fn index_set(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 2, 3)?;
    let value = &args[args.len() - 1];
    let repl = expect_str(rt, value)?;
    let s = text(recv);
    let chars: Vec<char> = s.chars().collect();
    let bounds = if args.len() == 3 {
        let start = expect_i64(rt, &args[0])?;
        let count = expect_i64(rt, &args[1])?;
        slice_bounds(start, count, chars.len())
    } else if args[0].as_range().is_some() {
        range_bounds(rt, &args[0], chars.len())?
    } else if let Some(sub) = args[0].as_str() {
        s.find(sub.as_str()).map(|byte| {
            let a = s[..byte].chars().count();
            (a, a + sub.chars().count())
        })
    } else {
        let i = expect_i64(rt, &args[0])?;
        norm_index(i, chars.len()).map(|i| (i, i + 1))
    };
    let Some((a, b)) = bounds else {
        return Err(rt.index_error(format!("index {} out of string", rt.builtin_to_s(&args[0]).unwrap_or_default())));
    };
    let mut out: String = chars[..a].iter().collect();
    out.push_str(&repl);
    out.extend(&chars[b..]);
    if let Some(cell) = buf(recv) {
        *cell.borrow_mut() = out;
    }
    Ok(value.clone())
}

fn append(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let mut tail = String::new();
    for a in args {
        match a.as_i64() {
            Some(code) => tail.extend(u32::try_from(code).ok().and_then(char::from_u32)),
            None => tail.push_str(&expect_str(rt, a)?),
        }
    }
    if let Some(cell) = buf(recv) {
        cell.borrow_mut().push_str(&tail);
    }
    Ok(recv.clone())
}

fn replace(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let s = str_arg(rt, args, 0)?;
    if let Some(cell) = buf(recv) {
        *cell.borrow_mut() = s;
    }
    Ok(recv.clone())
}

fn length(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.int(text(recv).chars().count() as i64))
}

fn bytesize(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.int(text(recv).len() as i64))
}

fn empty(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.bool(text(recv).is_empty()))
}

fn upcase(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.str(text(recv).to_uppercase()))
}

fn downcase(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.str(text(recv).to_lowercase()))
}

fn capitalize_str(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.as_str().to_lowercase().chars()).collect(),
        None => String::new(),
    }
}

fn capitalize(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.str(capitalize_str(&text(recv))))
}

fn swapcase(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let out: String = text(recv)
        .chars()
        .flat_map(|c| -> Vec<char> {
            if c.is_uppercase() {
                c.to_lowercase().collect()
            } else {
                c.to_uppercase().collect()
            }
        })
        .collect();
    Ok(rt.str(out))
}

/// In-place variant: nil when nothing changed.
fn mutate(rt: &Runtime, recv: &Value, f: impl FnOnce(&str) -> String) -> Value {
    let Some(cell) = buf(recv) else {
        return rt.nil();
    };
    let next = f(&cell.borrow());
    if *cell.borrow() == next {
        return rt.nil();
    }
    *cell.borrow_mut() = next;
    recv.clone()
}

fn upcase_bang(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(mutate(rt, recv, str::to_uppercase))
}

fn downcase_bang(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(mutate(rt, recv, str::to_lowercase))
}

fn reverse(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.str(text(recv).chars().rev().collect::<String>()))
}

fn include(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let sub = str_arg(rt, args, 0)?;
    Ok(rt.bool(text(recv).contains(&sub)))
}

fn start_with(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let s = text(recv);
    for a in args {
        if a.as_regexp().is_some() {
            let re = regexp::pattern(rt, a)?;
            if re.find(&s).is_some_and(|m| m.start() == 0) {
                return Ok(rt.bool(true));
            }
        } else if s.starts_with(expect_str(rt, a)?.as_str()) {
            return Ok(rt.bool(true));
        }
    }
    Ok(rt.bool(false))
}

fn end_with(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let s = text(recv);
    for a in args {
        if s.ends_with(expect_str(rt, a)?.as_str()) {
            return Ok(rt.bool(true));
        }
    }
    Ok(rt.bool(false))
}

/// Character index of a substring or pattern, searching from `start`.
fn str_index(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 2)?;
    let s = text(recv);
    let total = s.chars().count();
    let from = match args.get(1) {
        Some(v) => {
            let i = expect_i64(rt, v)?;
            let i = if i < 0 { i + total as i64 } else { i };
            if i < 0 || i as usize > total {
                return Ok(rt.nil());
            }
            i as usize
        }
        None => 0,
    };
    let offset = s.char_indices().nth(from).map(|(b, _)| b).unwrap_or(s.len());
    let re = regexp::pattern(rt, &args[0])?;
    Ok(match re.find(&s[offset..]) {
        Some(m) => rt.int((from + s[offset..offset + m.start()].chars().count()) as i64),
        None => rt.nil(),
    })
}

fn strip(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.str(text(recv).trim_matches(|c: char| c.is_whitespace() || c == '\0')))
}

fn lstrip(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.str(text(recv).trim_start()))
}

fn rstrip(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.str(text(recv).trim_end_matches(|c: char| c.is_whitespace() || c == '\0')))
}

/// Drops one trailing `\n`, `\r\n` or `\r`, or the given suffix.
fn chomp(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 0, 1)?;
    let s = text(recv);
    let out = match args.first() {
        Some(suffix) => {
            let suffix = expect_str(rt, suffix)?;
            s.strip_suffix(suffix.as_str()).unwrap_or(&s).to_string()
        }
        None => s
            .strip_suffix("\r\n")
            .or_else(|| s.strip_suffix('\n'))
            .or_else(|| s.strip_suffix('\r'))
            .unwrap_or(&s)
            .to_string(),
    };
    Ok(rt.str(out))
}

fn chop(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let s = text(recv);
    let out = match s.strip_suffix("\r\n") {
        Some(rest) => rest.to_string(),
        None => {
            let mut t = s.clone();
            t.pop();
            t
        }
    };
    Ok(rt.str(out))
}

fn char_values(rt: &Runtime, s: &str) -> Vec<Value> {
    s.chars().map(|c| rt.str(c.to_string())).collect()
}

fn chars(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let items = char_values(rt, &text(recv));
    Ok(rt.array(items))
}

fn bytes(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let items = text(recv).bytes().map(|b| rt.int(i64::from(b))).collect();
    Ok(rt.array(items))
}

fn each_char(rt: &mut Runtime, recv: &Value, _args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    let items = char_values(rt, &text(recv));
    let Some(blk) = block else {
        return Ok(rt.array(items));
    };
    for c in items {
        rt.call_block(blk, &[c])?;
    }
    Ok(recv.clone())
}

/// Without a separator splits on runs of whitespace; trailing empty fields
/// are dropped.
fn split(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 0, 2)?;
    let s = text(recv);
    let limit = match args.get(1) {
        Some(l) => expect_i64(rt, l)?,
        None => 0,
    };
    let sep = args.first().filter(|v| !v.is_nil());
    let mut parts: Vec<String> = match sep {
        None => match limit {
            l if l > 0 => s.trim_start().splitn(l as usize, char::is_whitespace).map(str::to_string).collect(),
            _ => s.split_whitespace().map(str::to_string).collect(),
        },
        Some(v) if v.as_str().is_some_and(|p| *p == " ") => s.split_whitespace().map(str::to_string).collect(),
        Some(v) if v.as_str().is_some_and(|p| p.is_empty()) => s.chars().map(String::from).collect(),
        Some(v) => {
            let re = regexp::pattern(rt, v)?;
            if limit > 0 {
                re.splitn(&s, limit as usize).map(str::to_string).collect()
            } else {
                re.split(&s).map(str::to_string).collect()
            }
        }
    };
    if limit == 0 {
        while parts.last().is_some_and(|p| p.is_empty()) {
            parts.pop();
        }
    }
    let items = parts.into_iter().map(|p| rt.str(p)).collect();
    Ok(rt.array(items))
}

fn lines(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let s = text(recv);
    let items = s.split_inclusive('\n').map(|l| rt.str(l)).collect();
    Ok(rt.array(items))
}

fn pad(rt: &Runtime, recv: &Value, args: &[Value]) -> RbResult<(String, usize, Vec<char>)> {
    validate_arity(rt, args.len(), 1, 2)?;
    let width = expect_i64(rt, &args[0])?.max(0) as usize;
    let fill = match args.get(1) {
        Some(f) => expect_str(rt, f)?,
        None => " ".to_string(),
    };
    if fill.is_empty() {
        return Err(rt.arg_error("zero width padding"));
    }
    Ok((text(recv), width, fill.chars().collect()))
}

fn fill_to(fill: &[char], n: usize) -> String {
    fill.iter().cycle().take(n).collect()
}

fn center(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let (s, width, fill) = pad(rt, recv, args)?;
    let len = s.chars().count();
    if width <= len {
        return Ok(rt.str(s));
    }
    let total = width - len;
    let left = total / 2;
    Ok(rt.str(format!("{}{}{}", fill_to(&fill, left), s, fill_to(&fill, total - left))))
}

fn ljust(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let (s, width, fill) = pad(rt, recv, args)?;
    let n = width.saturating_sub(s.chars().count());
    Ok(rt.str(s + &fill_to(&fill, n)))
}

fn rjust(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let (s, width, fill) = pad(rt, recv, args)?;
    let n = width.saturating_sub(s.chars().count());
    Ok(rt.str(fill_to(&fill, n) + &s))
}

/// A `tr`-style character set: `a-z`, `^abc` negation.
struct CharSet {
    chars: Vec<char>,
    negated: bool,
}

impl CharSet {
    fn parse(set: &str) -> Self {
        let (negated, body) = match set.strip_prefix('^') {
            Some(rest) if !rest.is_empty() => (true, rest),
            _ => (false, set),
        };
        Self {
            chars: expand_ranges(body),
            negated,
        }
    }

    fn contains(&self, c: char) -> bool {
        self.chars.contains(&c) != self.negated
    }
}

fn expand_ranges(set: &str) -> Vec<char> {
    let src: Vec<char> = set.chars().collect();
    let mut out = Vec::new();
    let mut i = 0;
    while i < src.len() {
        if i + 2 < src.len() && src[i + 1] == '-' && src[i] <= src[i + 2] {
            out.extend(src[i]..=src[i + 2]);
            i += 3;
        } else {
            out.push(src[i]);
            i += 1;
        }
    }
    out
}

fn count(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let set = CharSet::parse(&str_arg(rt, args, 0)?);
    let n = text(recv).chars().filter(|c| set.contains(*c)).count();
    Ok(rt.int(n as i64))
}

fn delete(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let set = CharSet::parse(&str_arg(rt, args, 0)?);
    let out: String = text(recv).chars().filter(|c| !set.contains(*c)).collect();
    Ok(rt.str(out))
}

fn squeeze(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let set = match args.first() {
        Some(a) => Some(CharSet::parse(&expect_str(rt, a)?)),
        None => None,
    };
    let mut out = String::new();
    for c in text(recv).chars() {
        let squeezable = set.as_ref().is_none_or(|s| s.contains(c));
        if squeezable && out.ends_with(c) {
            continue;
        }
        out.push(c);
    }
    Ok(rt.str(out))
}

fn tr(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 2, 2)?;
    let from = CharSet::parse(&expect_str(rt, &args[0])?);
    let to = expand_ranges(&expect_str(rt, &args[1])?);
    let out: String = text(recv)
        .chars()
        .filter_map(|c| {
            if !from.contains(c) {
                return Some(c);
            }
            if from.negated {
                return to.last().copied();
            }
            let pos = from.chars.iter().position(|x| *x == c).unwrap_or(0);
            to.get(pos).or(to.last()).copied()
        })
        .collect();
    Ok(rt.str(out))
}

/// Expands `\0`-`\9` and `\k<name>` style group references in a
/// replacement string.
fn expand_replacement(template: &str, caps: &Captures<'_>) -> String {
    let mut out = String::new();
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.peek().copied() {
            Some(d) if d.is_ascii_digit() => {
                chars.next();
                let n = d as usize - '0' as usize;
                out.push_str(caps.get(n).map(|m| m.as_str()).unwrap_or_default());
            }
            Some('&') => {
                chars.next();
                out.push_str(caps.get(0).map(|m| m.as_str()).unwrap_or_default());
            }
            Some('\\') => {
                chars.next();
                out.push('\\');
            }
            _ => out.push('\\'),
        }
    }
    out
}

/// Shared body of `sub` and `gsub`.
fn substitute(
    rt: &mut Runtime,
    recv: &Value,
    args: &[Value],
    block: Option<&Value>,
    global: bool,
) -> RbResult<String> {
    validate_arity(rt, args.len(), 1, 2)?;
    let re: Regex = regexp::pattern(rt, &args[0])?;
    let replacement = match args.get(1) {
        Some(r) if r.as_hash().is_none() => Some(expect_str(rt, r)?),
        _ => None,
    };
    let map = args.get(1).filter(|r| r.as_hash().is_some()).cloned();
    if replacement.is_none() && map.is_none() {
        expect_block(rt, block)?;
    }
    let s = text(recv);
    let mut out = String::new();
    let mut last = 0;
    for caps in re.captures_iter(&s) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&s[last..whole.start()]);
        regexp::record(rt, Some(&caps));
        let piece = match (&replacement, &map, block) {
            (Some(t), _, _) => expand_replacement(t, &caps),
            (None, Some(h), _) => {
                let key = rt.str(whole.as_str());
                let v = rt.send(h, "[]", &[key], None)?;
                rt.to_s(&v)?
            }
            (None, None, Some(blk)) => {
                let m = rt.str(whole.as_str());
                let v = rt.call_block(blk, &[m])?;
                rt.to_s(&v)?
            }
            (None, None, None) => String::new(),
        };
        out.push_str(&piece);
        last = whole.end();
        if !global {
            break;
        }
    }
    out.push_str(&s[last..]);
    Ok(out)
}

fn sub(rt: &mut Runtime, recv: &Value, args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    let out = substitute(rt, recv, args, block, false)?;
    Ok(rt.str(out))
}

fn gsub(rt: &mut Runtime, recv: &Value, args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    let out = substitute(rt, recv, args, block, true)?;
    Ok(rt.str(out))
}

fn sub_bang(rt: &mut Runtime, recv: &Value, args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    let out = substitute(rt, recv, args, block, false)?;
    Ok(mutate(rt, recv, |_| out))
}

fn gsub_bang(rt: &mut Runtime, recv: &Value, args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    let out = substitute(rt, recv, args, block, true)?;
    Ok(mutate(rt, recv, |_| out))
}

fn bump(c: char) -> (char, bool) {
    match c {
        'z' => ('a', true),
        'Z' => ('A', true),
        '9' => ('0', true),
        c => (char::from_u32(c as u32 + 1).unwrap_or(c), false),
    }
}

/// `String#succ`: increments the rightmost alphanumeric run with carry,
/// `"az"` to `"ba"`, `"zz"` to `"aaa"`, `"a9"` to `"b0"`.
pub(crate) fn str_succ(s: &str) -> String {
    let mut chars: Vec<char> = s.chars().collect();
    if chars.is_empty() {
        return String::new();
    }
    if !chars.iter().any(|c| c.is_ascii_alphanumeric()) {
        if let Some(last) = chars.last_mut() {
            *last = char::from_u32(*last as u32 + 1).unwrap_or(*last);
        }
        return chars.into_iter().collect();
    }
    let mut i = chars.len();
    let mut leftmost = 0;
    while i > 0 {
        i -= 1;
        if !chars[i].is_ascii_alphanumeric() {
            continue;
        }
        leftmost = i;
        let (next, carry) = bump(chars[i]);
        chars[i] = next;
        if !carry {
            return chars.into_iter().collect();
        }
        // Carry passes over non-alphanumerics only when more alphanumerics
        // lie further left.
        if !chars[..i].iter().any(|c| c.is_ascii_alphanumeric()) {
            break;
        }
    }
    let insert = match chars[leftmost] {
        '0' => '1',
        'A' => 'A',
        _ => 'a',
    };
    chars.insert(leftmost, insert);
    chars.into_iter().collect()
}

fn succ(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.str(str_succ(&text(recv))))
}

fn ord(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    match text(recv).chars().next() {
        Some(c) => Ok(rt.int(c as i64)),
        None => Err(rt.arg_error("empty string")),
    }
}

fn hex(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let s = text(recv);
    let t = s.trim();
    let (neg, t) = match t.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, t),
    };
    let t = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")).unwrap_or(t);
    let digits: String = t.chars().take_while(|c| c.is_ascii_hexdigit()).collect();
    let v = BigInt::parse_bytes(digits.as_bytes(), 16).unwrap_or_default();
    Ok(rt.integer(if neg { -v } else { v }))
}

fn to_s(_rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(recv.clone())
}

fn itself(_rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(recv.clone())
}

fn dup(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.str(text(recv)))
}

fn to_sym(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.sym(&text(recv)))
}

/// Leading integer prefix in `base`; 0 when there is none.
fn to_i(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 0, 1)?;
    let base = match args.first() {
        Some(b) => expect_i64(rt, b)?,
        None => 10,
    };
    if !(2..=36).contains(&base) {
        return Err(rt.arg_error(format!("invalid radix {base}")));
    }
    let s = text(recv);
    let t = s.trim_start();
    let (neg, t) = match t.as_bytes().first() {
        Some(b'-') => (true, &t[1..]),
        Some(b'+') => (false, &t[1..]),
        _ => (false, t),
    };
    let digits: String = t
        .chars()
        .take_while(|c| c.is_digit(base as u32) || *c == '_')
        .filter(|c| *c != '_')
        .collect();
    let v = BigInt::parse_bytes(digits.as_bytes(), base as u32).unwrap_or_default();
    Ok(rt.integer(if neg { -v } else { v }))
}

/// Longest leading prefix that reads as a decimal float.
fn to_f(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let s = text(recv);
    let t = s.trim_start();
    let mut best = 0.0;
    for (i, c) in t.char_indices() {
        if !(c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E' | '_')) {
            break;
        }
        let end = i + c.len_utf8();
        if let Ok(f) = t[..end].replace('_', "").parse::<f64>() {
            best = f;
        }
    }
    Ok(rt.float(best))
}

fn inspect(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.str(format::inspect_str(&text(recv))))
}

fn hash(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.int(rt.hash_code(recv)))
}

/// `format` directives: `%[flags][width][.precision]type` with flags
/// `-+ 0` and types `d i f g e x o b s p c %`.
pub(crate) fn sprintf(rt: &mut Runtime, fmt: &str, args: &[Value]) -> RbResult<String> {
    let mut out = String::new();
    let mut next = args.iter();
    let mut chars = fmt.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let mut left = false;
        let mut plus = false;
        let mut space = false;
        let mut zero = false;
        while let Some(f) = chars.peek().copied() {
            match f {
                '-' => left = true,
                '+' => plus = true,
                ' ' => space = true,
                '0' => zero = true,
                _ => break,
            }
            chars.next();
        }
        let mut width = 0usize;
        while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
            width = width * 10 + d as usize;
            chars.next();
        }
        let mut precision = None;
        if chars.peek() == Some(&'.') {
            chars.next();
            let mut p = 0usize;
            while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
                p = p * 10 + d as usize;
                chars.next();
            }
            precision = Some(p);
        }
        let Some(kind) = chars.next() else {
            return Err(rt.arg_error("incomplete format specifier; use %% (double %) instead"));
        };
        if kind == '%' {
            out.push('%');
            continue;
        }
        let Some(v) = next.next() else {
            return Err(rt.arg_error("too few arguments"));
        };
        let (sign, body) = match kind {
            'd' | 'i' | 'u' | 'x' | 'X' | 'o' | 'b' | 'B' => {
                let i = match v.data() {
                    Data::Float(f) => BigInt::from(f.floor() as i64),
                    _ => match v.as_int() {
                        Some(i) => i.clone(),
                        None => {
                            let s = rt.to_s(v)?;
                            s.trim().parse::<BigInt>().map_err(|_| {
                                rt.arg_error(format!("invalid value for Integer(): {}", format::inspect_str(&s)))
                            })?
                        }
                    },
                };
                let neg = i.sign() == num_bigint::Sign::Minus;
                let mag = if neg { -i } else { i };
                let digits = match kind {
                    'x' => mag.to_str_radix(16),
                    'X' => mag.to_str_radix(16).to_uppercase(),
                    'o' => mag.to_str_radix(8),
                    'b' | 'B' => mag.to_str_radix(2),
                    _ => format::int_to_s(&mag),
                };
                (neg, digits)
            }
            'f' | 'e' | 'E' | 'g' | 'G' => {
                let f = rt.number(v).ok_or_else(|| {
                    rt.type_error(format!("can't convert {} into Float", type_label(v)))
                })?;
                let p = precision.unwrap_or(6);
                let digits = match kind {
                    'f' => format!("{:.*}", p, f.abs()),
                    'e' => exp_format(f.abs(), p, false),
                    'E' => exp_format(f.abs(), p, true),
                    _ => format::float_to_s(f.abs()),
                };
                (f.is_sign_negative() && f != 0.0, digits)
            }
            'c' => {
                let s = match v.as_i64() {
                    Some(code) => u32::try_from(code).ok().and_then(char::from_u32).map(String::from).unwrap_or_default(),
                    None => rt.to_s(v)?.chars().take(1).collect(),
                };
                (false, s)
            }
            'p' => (false, rt.inspect(v)?),
            's' => {
                let mut s = rt.to_s(v)?;
                if let Some(p) = precision {
                    s = s.chars().take(p).collect();
                }
                (false, s)
            }
            other => return Err(rt.arg_error(format!("malformed format string - %{other}"))),
        };
        let numeric = !matches!(kind, 's' | 'p' | 'c');
        let sign_text = if sign {
            "-"
        } else if numeric && plus {
            "+"
        } else if numeric && space {
            " "
        } else {
            ""
        };
        let len = sign_text.len() + body.chars().count();
        let padding = width.saturating_sub(len);
        if left {
            out.push_str(sign_text);
            out.push_str(&body);
            out.extend(std::iter::repeat_n(' ', padding));
        } else if zero && numeric {
            out.push_str(sign_text);
            out.extend(std::iter::repeat_n('0', padding));
            out.push_str(&body);
        } else {
            out.extend(std::iter::repeat_n(' ', padding));
            out.push_str(sign_text);
            out.push_str(&body);
        }
    }
    Ok(out)
}

/// `1.500000e+02`
fn exp_format(f: f64, precision: usize, upper: bool) -> String {
    let raw = format!("{:.*e}", precision, f);
    let (mantissa, exp) = raw.split_once('e').unwrap_or((&raw, "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    let sign = if exp < 0 { '-' } else { '+' };
    let e = if upper { 'E' } else { 'e' };
    format!("{mantissa}{e}{sign}{:02}", exp.unsigned_abs())
}

