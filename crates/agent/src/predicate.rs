//! Goal predicates in `name(arg1, arg2, ...)` form.
//!
//! Arguments are free text. Commas nested inside `()`, `[]`, `{}` or quotes
//! belong to the enclosing argument, so `adapt_content(v1, {"a": 1, "b": 2})`
//! has two arguments.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct GoalPredicate {
    name: String,
    args: Vec<String>,
}

impl GoalPredicate {
    /// Parse a goal string. Parsing never fails: text without a parenthesis is
    /// a bare name, and an unterminated argument list runs to the end of input.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let Some(open) = raw.find('(') else {
            return Self {
                name: raw.to_string(),
                args: Vec::new(),
            };
        };

        let name = raw[..open].trim().to_string();
        let rest = &raw[open + 1..];
        let inner = match closing_paren(rest) {
            Some(close) => &rest[..close],
            None => rest,
        };

        Self {
            name,
            args: split_top_level(inner),
        }
    }

    pub fn new<I, S>(name: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }

    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    /// Canonical string form. A predicate without arguments renders as its name.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for GoalPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.args.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}({})", self.name, self.args.join(", "))
        }
    }
}

pub fn goal<I, S>(name: &str, args: I) -> String
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    GoalPredicate::new(name, args).render()
}

/// Tracks quoting while scanning argument text. Inside a quoted run a
/// backslash escapes the next character, so JSON strings such as `"a\"b"`
/// stay one quoted run.
#[derive(Default)]
struct Quoting {
    quote: Option<char>,
    escaped: bool,
}

impl Quoting {
    fn step(&mut self, c: char) -> bool {
        let Some(q) = self.quote else {
            if c == '\'' || c == '"' {
                self.quote = Some(c);
                return true;
            }
            return false;
        };
        if self.escaped {
            self.escaped = false;
        } else if c == '\\' {
            self.escaped = true;
        } else if c == q {
            self.quote = None;
        }
        true
    }
}

/// Byte offset of the `)` that closes an argument list whose `(` was already consumed.
fn closing_paren(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quoting = Quoting::default();

    for (i, c) in text.char_indices() {
        if quoting.step(c) {
            continue;
        }
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' if depth == 0 => return Some(i),
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    None
}

fn split_top_level(inner: &str) -> Vec<String> {
    if inner.trim().is_empty() {
        return Vec::new();
    }

    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut quoting = Quoting::default();
    let mut start = 0;

    for (i, c) in inner.char_indices() {
        if quoting.step(c) {
            continue;
        }
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                args.push(inner[start..i].trim().to_string());
                start = i + 1;
            }
            _ => {}
        }
    }
    args.push(inner[start..].trim().to_string());
    args
}
