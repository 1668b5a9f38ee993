//! Placeholder substitution for build configurations.
//!
//! Placeholders are written `${name}`:
//! - `${version}` - a template or variant parameter
//! - `${java}` or `${matrix.java}` - the current value of a matrix axis
//! - `${env.JDK_17}` - a parameter named `env.JDK_17`, else the environment
//!   variable `JDK_17`
//!
//! Names may embed placeholders: `${env.JDK_${java}}` resolves `${java}`
//! first and then looks up the resulting name. `$${` is a literal `${`; any
//! other `$` is kept as is.
//!
//! Lookup order is axis, then parameter, then environment. Parameter values
//! are substituted recursively; axis and environment values are inserted
//! verbatim. Undefined names, cycles and malformed placeholders are errors,
//! so every input either resolves completely or fails.

use buildplan_core::variant::AxisValue;
use buildplan_core::{Error, Result};
use std::collections::HashMap;

/// Everything a placeholder can refer to.
#[derive(Debug, Clone, Default)]
pub struct SubstitutionContext {
    /// Matrix axis values for the current run
    pub axes: HashMap<String, String>,
    /// Raw (unsubstituted) parameter values
    pub params: HashMap<String, String>,
    /// Environment variables
    pub env: HashMap<String, String>,
}

impl SubstitutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_axis(&mut self, axis: &str, value: impl Into<String>) {
        self.axes.insert(axis.to_string(), value.into());
    }

    pub fn set_axes(&mut self, combination: &[AxisValue]) {
        for av in combination {
            self.set_axis(&av.axis, av.value.clone());
        }
    }

    pub fn set_param(&mut self, name: &str, value: impl Into<String>) {
        self.params.insert(name.to_string(), value.into());
    }

    /// Start a substitution session that caches resolved parameters.
    pub fn substituter(&self) -> Substituter<'_> {
        Substituter {
            ctx: self,
            cache: HashMap::new(),
            stack: Vec::new(),
        }
    }

    /// Substitute every placeholder in `input`.
    pub fn substitute(&self, input: &str) -> Result<String> {
        self.substituter().substitute(input)
    }

    /// Resolve a single name as if written `${name}`.
    pub fn resolve(&self, name: &str) -> Result<String> {
        self.substituter().resolve(name)
    }
}

/// A substitution session over one context.
pub struct Substituter<'a> {
    ctx: &'a SubstitutionContext,
    cache: HashMap<String, String>,
    stack: Vec<String>,
}

impl Substituter<'_> {
    pub fn substitute(&mut self, input: &str) -> Result<String> {
        let segments = parse(input)?;
        self.evaluate(&segments)
    }

    pub fn substitute_opt(&mut self, input: &Option<String>) -> Result<Option<String>> {
        input.as_deref().map(|s| self.substitute(s)).transpose()
    }

    pub fn resolve(&mut self, name: &str) -> Result<String> {
        let ctx = self.ctx;

        if let Some(axis) = name.strip_prefix("matrix.") {
            return ctx
                .axes
                .get(axis)
                .cloned()
                .ok_or_else(|| Error::placeholder(name, "undefined matrix axis"));
        }

        if let Some(value) = ctx.axes.get(name) {
            return Ok(value.clone());
        }

        if let Some(raw) = ctx.params.get(name) {
            if let Some(value) = self.cache.get(name) {
                return Ok(value.clone());
            }
            if self.stack.iter().any(|n| n == name) {
                let mut chain = self.stack.clone();
                chain.push(name.to_string());
                return Err(Error::placeholder(
                    name,
                    format!("cyclic reference {}", chain.join(" -> ")),
                ));
            }
            self.stack.push(name.to_string());
            let value = self.substitute(raw);
            self.stack.pop();
            let value = value?;
            self.cache.insert(name.to_string(), value.clone());
            return Ok(value);
        }

        if let Some(var) = name.strip_prefix("env.") {
            return ctx
                .env
                .get(var)
                .cloned()
                .ok_or_else(|| Error::placeholder(name, "undefined environment variable"));
        }

        Err(Error::placeholder(
            name,
            "undefined parameter or matrix axis",
        ))
    }

    fn evaluate(&mut self, segments: &[Segment]) -> Result<String> {
        let mut out = String::new();
        for segment in segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Ref(name) => {
                    let name = self.evaluate(name)?;
                    out.push_str(&self.resolve(&name)?);
                }
            }
        }
        Ok(out)
    }
}

#[derive(Debug, PartialEq)]
enum Segment {
    Text(String),
    Ref(Vec<Segment>),
}

fn parse(input: &str) -> Result<Vec<Segment>> {
    let chars: Vec<char> = input.chars().collect();
    let mut pos = 0;
    parse_segments(input, &chars, &mut pos, false)
}

fn parse_segments(
    input: &str,
    chars: &[char],
    pos: &mut usize,
    nested: bool,
) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut text = String::new();

    while *pos < chars.len() {
        let c = chars[*pos];
        let next = chars.get(*pos + 1).copied();
        if c == '$' && next == Some('$') && chars.get(*pos + 2) == Some(&'{') {
            text.push_str("${");
            *pos += 3;
        } else if c == '$' && next == Some('{') {
            *pos += 2;
            if !text.is_empty() {
                segments.push(Segment::Text(std::mem::take(&mut text)));
            }
            let name = parse_segments(input, chars, pos, true)?;
            if name.is_empty() {
                return Err(Error::placeholder(input, "empty placeholder name"));
            }
            segments.push(Segment::Ref(name));
        } else if c == '}' && nested {
            *pos += 1;
            if !text.is_empty() {
                segments.push(Segment::Text(text));
            }
            return Ok(segments);
        } else {
            text.push(c);
            *pos += 1;
        }
    }

    if nested {
        return Err(Error::placeholder(input, "unterminated placeholder"));
    }
    if !text.is_empty() {
        segments.push(Segment::Text(text));
    }
    Ok(segments)
}

/// Builder for creating SubstitutionContext.
pub struct SubstitutionContextBuilder {
    ctx: SubstitutionContext,
}

impl SubstitutionContextBuilder {
    pub fn new() -> Self {
        Self {
            ctx: SubstitutionContext::new(),
        }
    }

    pub fn with_axis(mut self, axis: &str, value: impl Into<String>) -> Self {
        self.ctx.set_axis(axis, value);
        self
    }

    pub fn with_param(mut self, name: &str, value: impl Into<String>) -> Self {
        self.ctx.set_param(name, value);
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.ctx.env.insert(key.into(), value.into());
        self
    }

    pub fn with_envs(mut self, env: &HashMap<String, String>) -> Self {
        self.ctx.env.extend(env.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    pub fn build(self) -> SubstitutionContext {
        self.ctx
    }
}

impl Default for SubstitutionContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}
