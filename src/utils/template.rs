//! Command template rendering.
//!
//! Templates are plain text with `{{...}}` directives:
//!
//! - `{{key}}` substitutes a scalar value
//! - `{{#if key}}...{{/if}}` renders the body when `key` is truthy; an
//!   absent key and an empty string/list/map are all falsy
//! - `{{#each key}}...{{/each}}` iterates a list (body sees `{{this}}`)
//!   or a map (body sees `{{@key}}` and `{{@value}}`, sorted by key)
//!
//! Expansion is a pure function of the template and the variable source:
//! the same inputs always produce byte-identical output. Generated
//! configuration files (compose files) rely on this for golden-output
//! comparison.

use crate::error::{Error, Result};

/// A value a template directive can resolve to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Str(String),
    List(Vec<String>),
    Map(Vec<(String, String)>),
}

impl Value {
    fn is_truthy(&self) -> bool {
        match self {
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Map(entries) => !entries.is_empty(),
        }
    }
}

/// Source of variable values for expansion.
pub trait Vars {
    fn value(&self, key: &str) -> Option<Value>;
}

impl Vars for &[(&str, &str)] {
    fn value(&self, key: &str) -> Option<Value> {
        self.iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| Value::Str((*v).to_string()))
    }
}

#[derive(Debug)]
enum Node {
    Text(String),
    Var(String),
    If { key: String, body: Vec<Node> },
    Each { key: String, body: Vec<Node> },
}

/// Expand a command template against a variable source.
///
/// Fails with a `TemplateParse` error for malformed directives and a
/// `TemplateRender` error for references the source cannot satisfy.
pub fn expand(template: &str, vars: &dyn Vars) -> Result<String> {
    let nodes = parse(template)?;
    let mut out = String::with_capacity(template.len());
    render_nodes(&nodes, vars, None, template, &mut out)?;
    Ok(out)
}

// ============================================================================
// Parsing
// ============================================================================

fn parse(template: &str) -> Result<Vec<Node>> {
    // Stack of open blocks: (directive name, key, collected body).
    let mut stack: Vec<(&'static str, String, Vec<Node>)> = Vec::new();
    let mut current: Vec<Node> = Vec::new();
    let mut rest = template;

    while let Some(open) = rest.find("{{") {
        if open > 0 {
            current.push(Node::Text(rest[..open].to_string()));
        }
        let after_open = &rest[open + 2..];
        let close = after_open.find("}}").ok_or_else(|| {
            Error::template_parse("Unterminated '{{' directive", template)
        })?;
        let tag = after_open[..close].trim();
        rest = &after_open[close + 2..];

        if let Some(raw) = tag.strip_prefix('#') {
            let (directive, key) = split_directive(raw, template)?;
            match directive {
                "if" | "each" => {
                    let name = if directive == "if" { "if" } else { "each" };
                    stack.push((name, key.to_string(), std::mem::take(&mut current)));
                }
                other => {
                    return Err(Error::template_parse(
                        format!("Unknown directive '#{}'", other),
                        template,
                    ));
                }
            }
        } else if let Some(closing) = tag.strip_prefix('/') {
            let (directive, key, outer) = match stack.pop() {
                Some((directive, key, outer)) => (directive, key, outer),
                None => {
                    return Err(Error::template_parse(
                        format!("'{{{{/{}}}}}' without a matching open block", closing),
                        template,
                    ));
                }
            };
            if closing != directive {
                return Err(Error::template_parse(
                    format!("Expected '{{{{/{}}}}}' but found '{{{{/{}}}}}'", directive, closing),
                    template,
                ));
            }
            let body = std::mem::replace(&mut current, outer);
            let node = if directive == "if" {
                Node::If { key, body }
            } else {
                Node::Each { key, body }
            };
            current.push(node);
        } else {
            validate_key(tag, template)?;
            current.push(Node::Var(tag.to_string()));
        }
    }

    if let Some((directive, key, _)) = stack.pop() {
        return Err(Error::template_parse(
            format!("Unclosed '{{{{#{} {}}}}}' block", directive, key),
            template,
        ));
    }

    if !rest.is_empty() {
        current.push(Node::Text(rest.to_string()));
    }

    Ok(current)
}

fn split_directive<'a>(raw: &'a str, template: &str) -> Result<(&'a str, &'a str)> {
    let mut parts = raw.splitn(2, char::is_whitespace);
    let directive = parts.next().unwrap_or_default();
    let key = parts.next().map(str::trim).unwrap_or_default();
    if key.is_empty() {
        return Err(Error::template_parse(
            format!("Directive '#{}' is missing a key", directive),
            template,
        ));
    }
    validate_key(key, template)?;
    Ok((directive, key))
}

fn validate_key(key: &str, template: &str) -> Result<()> {
    if key.is_empty() || key.contains(char::is_whitespace) {
        return Err(Error::template_parse(
            format!("Invalid placeholder '{{{{{}}}}}'", key),
            template,
        ));
    }
    Ok(())
}

// ============================================================================
// Rendering
// ============================================================================

/// Loop-local bindings available inside an `#each` body.
struct LoopScope<'a> {
    this: Option<&'a str>,
    key: Option<&'a str>,
    value: Option<&'a str>,
    parent: Option<&'a LoopScope<'a>>,
}

impl<'a> LoopScope<'a> {
    fn lookup(&self, name: &str) -> Option<&'a str> {
        let found = match name {
            "this" => self.this,
            "@key" => self.key,
            "@value" => self.value,
            _ => None,
        };
        found.or_else(|| self.parent.and_then(|p| p.lookup(name)))
    }
}

fn is_loop_var(name: &str) -> bool {
    matches!(name, "this" | "@key" | "@value")
}

fn render_nodes(
    nodes: &[Node],
    vars: &dyn Vars,
    scope: Option<&LoopScope<'_>>,
    template: &str,
    out: &mut String,
) -> Result<()> {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Var(name) => render_var(name, vars, scope, template, out)?,
            Node::If { key, body } => {
                let truthy = resolve(key, vars, scope)
                    .map(|v| v.is_truthy())
                    .unwrap_or(false);
                if truthy {
                    render_nodes(body, vars, scope, template, out)?;
                }
            }
            Node::Each { key, body } => render_each(key, body, vars, scope, template, out)?,
        }
    }
    Ok(())
}

fn resolve(name: &str, vars: &dyn Vars, scope: Option<&LoopScope<'_>>) -> Option<Value> {
    if is_loop_var(name) {
        return scope
            .and_then(|s| s.lookup(name))
            .map(|v| Value::Str(v.to_string()));
    }
    vars.value(name)
}

fn render_var(
    name: &str,
    vars: &dyn Vars,
    scope: Option<&LoopScope<'_>>,
    template: &str,
    out: &mut String,
) -> Result<()> {
    if is_loop_var(name) {
        let bound = scope.and_then(|s| s.lookup(name)).ok_or_else(|| {
            Error::template_render(
                format!("'{{{{{}}}}}' used outside of an '#each' block", name),
                template,
            )
        })?;
        out.push_str(bound);
        return Ok(());
    }

    match vars.value(name) {
        Some(Value::Str(s)) => {
            out.push_str(&s);
            Ok(())
        }
        Some(_) => Err(Error::template_render(
            format!("'{}' is a collection and cannot be substituted directly", name),
            template,
        )),
        None => Err(Error::template_render(
            format!("Unknown template variable '{}'", name),
            template,
        )),
    }
}

fn render_each(
    key: &str,
    body: &[Node],
    vars: &dyn Vars,
    scope: Option<&LoopScope<'_>>,
    template: &str,
    out: &mut String,
) -> Result<()> {
    match resolve(key, vars, scope) {
        Some(Value::List(items)) => {
            for item in &items {
                let inner = LoopScope {
                    this: Some(item),
                    key: None,
                    value: None,
                    parent: scope,
                };
                render_nodes(body, vars, Some(&inner), template, out)?;
            }
            Ok(())
        }
        Some(Value::Map(entries)) => {
            // Map sources are expected to come pre-sorted (BTreeMap order)
            // so rendering stays deterministic.
            for (k, v) in &entries {
                let inner = LoopScope {
                    this: None,
                    key: Some(k),
                    value: Some(v),
                    parent: scope,
                };
                render_nodes(body, vars, Some(&inner), template, out)?;
            }
            Ok(())
        }
        Some(Value::Str(_)) => Err(Error::template_render(
            format!("Cannot iterate over scalar '{}'", key),
            template,
        )),
        None => Err(Error::template_render(
            format!("Unknown template variable '{}'", key),
            template,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use std::collections::HashMap;

    struct TestVars(HashMap<String, Value>);

    impl TestVars {
        fn new(entries: &[(&str, Value)]) -> Self {
            Self(
                entries
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect(),
            )
        }
    }

    impl Vars for TestVars {
        fn value(&self, key: &str) -> Option<Value> {
            self.0.get(key).cloned()
        }
    }

    fn s(v: &str) -> Value {
        Value::Str(v.to_string())
    }

    #[test]
    fn plain_text_passes_through() {
        let vars = TestVars::new(&[]);
        assert_eq!(expand("sudo apt update -y", &vars).unwrap(), "sudo apt update -y");
    }

    #[test]
    fn substitutes_variables() {
        let vars = TestVars::new(&[("serviceName", s("api")), ("port", s("9000"))]);
        let out = expand("docker run -p {{port}} {{serviceName}}:latest", &vars).unwrap();
        assert_eq!(out, "docker run -p 9000 api:latest");
    }

    #[test]
    fn slice_vars_work() {
        let vars: &[(&str, &str)] = &[("serviceName", "api")];
        assert_eq!(expand("{{serviceName}}", &vars).unwrap(), "api");
    }

    #[test]
    fn unknown_variable_is_render_error() {
        let vars = TestVars::new(&[]);
        let err = expand("echo {{missing}}", &vars).unwrap_err();
        assert_eq!(err.code, ErrorCode::TemplateRender);
    }

    #[test]
    fn unterminated_directive_is_parse_error() {
        let vars = TestVars::new(&[]);
        let err = expand("echo {{serviceName", &vars).unwrap_err();
        assert_eq!(err.code, ErrorCode::TemplateParse);
    }

    #[test]
    fn unknown_directive_is_parse_error() {
        let vars = TestVars::new(&[]);
        let err = expand("{{#unless x}}{{/unless}}", &vars).unwrap_err();
        assert_eq!(err.code, ErrorCode::TemplateParse);
    }

    #[test]
    fn unclosed_block_is_parse_error() {
        let vars = TestVars::new(&[("deps", Value::List(vec![]))]);
        let err = expand("{{#if deps}}body", &vars).unwrap_err();
        assert_eq!(err.code, ErrorCode::TemplateParse);
    }

    #[test]
    fn mismatched_close_is_parse_error() {
        let vars = TestVars::new(&[("deps", Value::List(vec![]))]);
        let err = expand("{{#if deps}}body{{/each}}", &vars).unwrap_err();
        assert_eq!(err.code, ErrorCode::TemplateParse);
    }

    #[test]
    fn if_skips_body_for_empty_list_and_absent_key() {
        let empty = TestVars::new(&[("deps", Value::List(vec![]))]);
        let absent = TestVars::new(&[]);
        let template = "base{{#if deps}} extra{{/if}}";
        assert_eq!(expand(template, &empty).unwrap(), "base");
        assert_eq!(expand(template, &absent).unwrap(), "base");
    }

    #[test]
    fn if_renders_body_for_non_empty_list() {
        let vars = TestVars::new(&[("deps", Value::List(vec!["postgres".to_string()]))]);
        let out = expand("base{{#if deps}} extra{{/if}}", &vars).unwrap();
        assert_eq!(out, "base extra");
    }

    #[test]
    fn each_renders_list_in_order() {
        let vars = TestVars::new(&[(
            "deps",
            Value::List(vec!["postgres".to_string(), "redis".to_string()]),
        )]);
        let out = expand("{{#each deps}}\n  - {{this}}{{/each}}", &vars).unwrap();
        assert_eq!(out, "\n  - postgres\n  - redis");
    }

    #[test]
    fn each_renders_map_entries() {
        let vars = TestVars::new(&[(
            "env",
            Value::Map(vec![
                ("POSTGRES_PASSWORD".to_string(), "secret".to_string()),
                ("POSTGRES_USER".to_string(), "root".to_string()),
            ]),
        )]);
        let out = expand("{{#each env}}\n  {{@key}}: \"{{@value}}\"{{/each}}", &vars).unwrap();
        assert_eq!(out, "\n  POSTGRES_PASSWORD: \"secret\"\n  POSTGRES_USER: \"root\"");
    }

    #[test]
    fn each_over_scalar_is_render_error() {
        let vars = TestVars::new(&[("port", s("9000"))]);
        let err = expand("{{#each port}}{{this}}{{/each}}", &vars).unwrap_err();
        assert_eq!(err.code, ErrorCode::TemplateRender);
    }

    #[test]
    fn this_outside_each_is_render_error() {
        let vars = TestVars::new(&[]);
        let err = expand("{{this}}", &vars).unwrap_err();
        assert_eq!(err.code, ErrorCode::TemplateRender);
    }

    #[test]
    fn collection_as_scalar_is_render_error() {
        let vars = TestVars::new(&[("deps", Value::List(vec!["a".to_string()]))]);
        let err = expand("echo {{deps}}", &vars).unwrap_err();
        assert_eq!(err.code, ErrorCode::TemplateRender);
    }

    #[test]
    fn nested_blocks_render() {
        let vars = TestVars::new(&[(
            "mounts",
            Value::List(vec!["/data:/var/data".to_string()]),
        )]);
        let out = expand(
            "{{#if mounts}}volumes:{{#each mounts}}\n  - {{this}}{{/each}}{{/if}}",
            &vars,
        )
        .unwrap();
        assert_eq!(out, "volumes:\n  - /data:/var/data");
    }

    #[test]
    fn expansion_is_deterministic() {
        let vars = TestVars::new(&[
            ("serviceName", s("api")),
            (
                "env",
                Value::Map(vec![
                    ("A".to_string(), "1".to_string()),
                    ("B".to_string(), "2".to_string()),
                ]),
            ),
        ]);
        let template = "{{serviceName}}:{{#each env}} {{@key}}={{@value}}{{/each}}";
        let first = expand(template, &vars).unwrap();
        for _ in 0..10 {
            assert_eq!(expand(template, &vars).unwrap(), first);
        }
    }
}
