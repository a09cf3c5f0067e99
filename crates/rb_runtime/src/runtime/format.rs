//! Text conversion for builtin values.

use num_bigint::BigInt;
use num_traits::ToPrimitive;

use crate::core::RegexpData;

pub fn int_to_s(i: &BigInt) -> String {
    match i.to_i64() {
        Some(small) => itoa::Buffer::new().format(small).to_string(),
        None => i.to_string(),
    }
}

/// `Float#to_s`: shortest round-trip digits, fixed notation for decimal
/// exponents in `-3..=16`, `d.ddde+XX` outside it.
pub fn float_to_s(f: f64) -> String {
    if f.is_nan() {
        return "NaN".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if f == 0.0 {
        return if f.is_sign_negative() { "-0.0" } else { "0.0" }.to_string();
    }
    let mut buf = ryu::Buffer::new();
    let text = buf.format_finite(f.abs());
    let (mantissa, exp) = match text.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (text, 0),
    };
    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let joined = format!("{int_part}{frac_part}");
    let trimmed = joined.trim_start_matches('0');
    let lead = (joined.len() - trimmed.len()) as i32;
    let digits = trimmed.trim_end_matches('0');
    let digits = if digits.is_empty() { "0" } else { digits };
    let decpt = int_part.len() as i32 + exp - lead;

    let mut out = String::new();
    if f < 0.0 {
        out.push('-');
    }
    if decpt > -4 && decpt <= 16 {
        if decpt <= 0 {
            out.push_str("0.");
            out.extend(std::iter::repeat_n('0', (-decpt) as usize));
            out.push_str(digits);
        } else if decpt as usize >= digits.len() {
            out.push_str(digits);
            out.extend(std::iter::repeat_n('0', decpt as usize - digits.len()));
            out.push_str(".0");
        } else {
            let (a, b) = digits.split_at(decpt as usize);
            out.push_str(a);
            out.push('.');
            out.push_str(b);
        }
    } else {
        let (first, rest) = digits.split_at(1);
        out.push_str(first);
        out.push('.');
        out.push_str(if rest.is_empty() { "0" } else { rest });
        let e = decpt - 1;
        out.push('e');
        out.push(if e < 0 { '-' } else { '+' });
        let mut ibuf = itoa::Buffer::new();
        let mag = ibuf.format(e.unsigned_abs());
        if mag.len() < 2 {
            out.push('0');
        }
        out.push_str(mag);
    }
    out
}

pub fn inspect_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\u{1b}' => out.push_str("\\e"),
            '#' if matches!(chars.peek(), Some('{' | '$' | '@')) => out.push_str("\\#"),
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                out.push_str(&format!("\\x{:02X}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

const OPERATOR_SYMBOLS: &[&str] = &[
    "+", "-", "*", "/", "%", "**", "==", "!=", "<", ">", "<=", ">=", "<=>", "===", "[]", "[]=",
    "!", "=~", "!~", "<<", ">>", "&", "|", "^", "~", "+@", "-@",
];

fn is_plain_symbol(s: &str) -> bool {
    if OPERATOR_SYMBOLS.contains(&s) {
        return true;
    }
    let sigil = s
        .strip_prefix("@@")
        .or_else(|| s.strip_prefix('@'))
        .or_else(|| s.strip_prefix('$'));
    let body = match sigil {
        Some(rest) => rest,
        None => s.strip_suffix(['?', '!', '=']).unwrap_or(s),
    };
    let mut chars = body.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => chars.all(|c| c.is_alphanumeric() || c == '_'),
        _ => false,
    }
}

pub fn inspect_symbol(s: &str) -> String {
    if is_plain_symbol(s) {
        format!(":{s}")
    } else {
        format!(":{}", inspect_str(s))
    }
}

/// Translates a literal's source and option letters into a compiled regex.
pub fn compile_regexp(source: &str, flags: &str) -> Result<RegexpData, String> {
    let mut prefix = String::new();
    for f in flags.chars() {
        match f {
            'i' => prefix.push_str("(?i)"),
            'm' => prefix.push_str("(?s)"),
            'x' => prefix.push_str("(?x)"),
            _ => {}
        }
    }
    let translated = source.replace("\\h", "[0-9a-fA-F]").replace("\\Z", "\\z");
    let regex = regex::Regex::new(&format!("{prefix}{translated}")).map_err(|e| e.to_string())?;
    Ok(RegexpData {
        regex,
        source: source.to_string(),
        flags: flags.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_formats() {
        assert_eq!(float_to_s(1.0), "1.0");
        assert_eq!(float_to_s(2.5), "2.5");
        assert_eq!(float_to_s(-0.5), "-0.5");
        assert_eq!(float_to_s(1e20), "1.0e+20");
        assert_eq!(float_to_s(1e15), "1000000000000000.0");
        assert_eq!(float_to_s(1e16), "1.0e+16");
        assert_eq!(float_to_s(0.0001), "0.0001");
        assert_eq!(float_to_s(0.00001), "1.0e-05");
        assert_eq!(float_to_s(123.456), "123.456");
        assert_eq!(float_to_s(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(float_to_s(f64::INFINITY), "Infinity");
        assert_eq!(float_to_s(f64::NAN), "NaN");
    }

    #[test]
    fn symbol_inspect() {
        assert_eq!(inspect_symbol("foo"), ":foo");
        assert_eq!(inspect_symbol("empty?"), ":empty?");
        assert_eq!(inspect_symbol("<=>"), ":<=>");
        assert_eq!(inspect_symbol("@x"), ":@x");
        assert_eq!(inspect_symbol("a b"), ":\"a b\"");
    }

    #[test]
    fn string_inspect() {
        assert_eq!(inspect_str("a\"b\n"), "\"a\\\"b\\n\"");
        assert_eq!(inspect_str("#{x}"), "\"\\#{x}\"");
    }
}
