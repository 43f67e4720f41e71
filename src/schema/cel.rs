//! CEL rule preprocessing
//!
//! `XValidation` rules may use shorthand macros that are expanded before the
//! rule is written into a schema:
//!
//! - `default(self.a, x)` becomes `(has(self.a) ? self.a : x)`
//! - `oneof(self.a, self.b, ...)` becomes
//!   `((has(self.a)?1:0)+(has(self.b)?1:0)<=1)`
//!
//! Every other global call must be a function of standard CEL or of the
//! Kubernetes CEL libraries. Member calls (`self.a.size()`) are left alone.
//! The expanded rule must parse as CEL.

use cel_interpreter::Program;

/// Global functions the apiserver understands
const KNOWN_FUNCTIONS: &[&str] = &[
    "has", "size", "int", "uint", "double", "string", "bytes", "bool", "type", "dyn", "duration", "timestamp",
    "matches", "quantity", "isQuantity", "url", "isURL", "ip", "isIP", "cidr", "isCIDR", "semver", "isSemver",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Macro {
    Default,
    Oneof,
}

impl Macro {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "default" => Some(Macro::Default),
            "oneof" => Some(Macro::Oneof),
            _ => None,
        }
    }

    fn expand(self, args: &[String]) -> Result<String, String> {
        match self {
            Macro::Default => {
                let [field, fallback] = args else {
                    return Err(format!("default() takes 2 arguments, got {}", args.len()));
                };
                require_selection("default", field)?;
                Ok(format!("(has({field}) ? {field} : {fallback})"))
            }
            Macro::Oneof => {
                if args.len() < 2 {
                    return Err(format!("oneof() takes at least 2 arguments, got {}", args.len()));
                }
                let clauses = args
                    .iter()
                    .map(|field| {
                        require_selection("oneof", field)?;
                        Ok(format!("(has({})?1:0)", field))
                    })
                    .collect::<Result<Vec<_>, String>>()?;
                Ok(format!("({}<=1)", clauses.join("+")))
            }
        }
    }
}

/// `has()` only accepts a field selection such as `self.spec.port`
fn require_selection(name: &str, arg: &str) -> Result<(), String> {
    let mut segments = arg.split('.');
    let valid = arg.contains('.') && segments.all(is_identifier);
    if valid {
        Ok(())
    } else {
        Err(format!("{}() needs a field selection like self.field, got {:?}", name, arg))
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Expand the macros in `expr` and check that the result parses
pub fn preprocess(expr: &str) -> Result<String, String> {
    let expanded = expand(expr)?;
    Program::compile(&expanded).map_err(|e| format!("invalid CEL rule {:?}: {}", expanded, e))?;
    Ok(expanded)
}

fn expand(expr: &str) -> Result<String, String> {
    let mut out = String::with_capacity(expr.len());
    let mut pos = 0;

    while let Some(c) = expr[pos..].chars().next() {
        if c == '"' || c == '\'' {
            let end = string_end(expr, pos)?;
            out.push_str(&expr[pos..end]);
            pos = end;
            continue;
        }
        if !(c.is_ascii_alphabetic() || c == '_') {
            out.push(c);
            pos += c.len_utf8();
            // digits and letters of a number literal stay together
            if c.is_ascii_digit() {
                let rest = &expr[pos..];
                let len = rest.find(|ch: char| !ch.is_ascii_alphanumeric()).unwrap_or(rest.len());
                out.push_str(&rest[..len]);
                pos += len;
            }
            continue;
        }

        let rest = &expr[pos..];
        let len = rest
            .find(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '_'))
            .unwrap_or(rest.len());
        let ident = &rest[..len];
        let after = pos + len;
        let is_member = expr[..pos].trim_end().ends_with('.');
        let paren = after + (expr[after..].len() - expr[after..].trim_start().len());

        let keyword = matches!(ident, "in" | "true" | "false" | "null");
        if !is_member && !keyword && expr[paren..].starts_with('(') {
            if let Some(m) = Macro::from_name(ident) {
                let (args, end) = call_args(expr, paren)?;
                let args = args.into_iter().map(expand).collect::<Result<Vec<_>, String>>()?;
                out.push_str(&m.expand(&args)?);
                pos = end;
                continue;
            }
            if !KNOWN_FUNCTIONS.contains(&ident) {
                return Err(format!("unknown function or macro {:?} in {:?}", ident, expr));
            }
        }
        out.push_str(ident);
        pos = after;
    }
    Ok(out)
}

/// Index just past the string literal starting at `start`
fn string_end(expr: &str, start: usize) -> Result<usize, String> {
    let rest = &expr[start..];
    let quote = &rest[..1];
    let triple = quote.repeat(3);
    if rest.starts_with(&triple) {
        return rest[3..]
            .find(&triple)
            .map(|i| start + 3 + i + 3)
            .ok_or_else(|| format!("unterminated string in {:?}", expr));
    }

    let mut escaped = false;
    for (i, c) in rest.char_indices().skip(1) {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if rest[i..].starts_with(quote) {
            return Ok(start + i + 1);
        }
    }
    Err(format!("unterminated string in {:?}", expr))
}

/// Top-level arguments of the call whose `(` is at `open`, and the index
/// just past the closing `)`
fn call_args(expr: &str, open: usize) -> Result<(Vec<&str>, usize), String> {
    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut start = open + 1;
    let mut pos = open + 1;

    while let Some(c) = expr[pos..].chars().next() {
        match c {
            '"' | '\'' => {
                pos = string_end(expr, pos)?;
                continue;
            }
            '(' | '[' | '{' => depth += 1,
            ')' if depth == 0 => {
                let last = expr[start..pos].trim();
                if !last.is_empty() || !args.is_empty() {
                    args.push(last);
                }
                return Ok((args, pos + 1));
            }
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                args.push(expr[start..pos].trim());
                start = pos + 1;
            }
            _ => {}
        }
        pos += c.len_utf8();
    }
    Err(format!("unbalanced parentheses in {:?}", expr))
}
