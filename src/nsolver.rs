use boa_engine::{Context, Source};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::structs::VideoError;
use crate::utils::cut_after_js;

/// Iteration cap for one evaluation; the real transform finishes in a few
/// thousand iterations, so anything near this limit is pathological.
const LOOP_ITERATION_LIMIT: u64 = 500_000;
const RECURSION_LIMIT: usize = 512;

/// The obfuscated throttling transform lifted from the player script.
///
/// The function body is evaluated inside an embedded interpreter with no host
/// capabilities. Once an evaluation fails the solver flips to degraded and
/// every later solve returns its input unchanged; downloads still work, just
/// throttled.
#[derive(Debug)]
pub struct NSolver {
    source: Option<String>,
    degraded: AtomicBool,
}

impl NSolver {
    /// Locate the transform inside the player script. A script where no probe
    /// matches produces a solver that is degraded from the start.
    pub fn from_player_js(js: &str) -> Self {
        match locate_n_function(js) {
            Ok(decl) => NSolver {
                source: Some(format!("var nFunction={decl};")),
                degraded: AtomicBool::new(false),
            },
            Err(err) => {
                tracing::warn!("n-parameter transform not found, downloads may be throttled: {err}");
                NSolver {
                    source: None,
                    degraded: AtomicBool::new(true),
                }
            }
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }

    /// Solve one n value, building a fresh interpreter.
    pub fn solve(&self, input: &str) -> String {
        let mut context = None;
        let mut cache = HashMap::new();
        self.solve_with(&mut context, &mut cache, input)
    }

    /// Batch-friendly solve: the interpreter context and the result cache are
    /// owned by the caller so one rewrite pass compiles the function once.
    pub(crate) fn solve_with(
        &self,
        context: &mut Option<Context>,
        cache: &mut HashMap<String, String>,
        input: &str,
    ) -> String {
        if self.is_degraded() {
            return input.to_string();
        }

        let Some(source) = self.source.as_deref() else {
            return input.to_string();
        };

        if let Some(result) = cache.get(input) {
            return result.clone();
        }

        if context.is_none() {
            match build_context(source) {
                Some(ctx) => *context = Some(ctx),
                None => {
                    self.mark_degraded("transform source does not evaluate");
                    return input.to_string();
                }
            }
        }

        let ctx = context.as_mut().expect("context installed above");

        let call = format!(r#"nFunction("{}")"#, js_string_escape(input));
        let result = ctx
            .eval(Source::from_bytes(&call))
            .ok()
            .and_then(|value| value.as_string().and_then(|s| s.to_std_string().ok()));

        match result {
            Some(solved) => {
                cache.insert(input.to_string(), solved.clone());
                solved
            }
            None => {
                self.mark_degraded("evaluation failed");
                input.to_string()
            }
        }
    }

    fn mark_degraded(&self, reason: &str) {
        if !self.degraded.swap(true, Ordering::Relaxed) {
            tracing::warn!("n-parameter solver degraded ({reason}); downloads may be throttled");
        }
    }
}

fn build_context(source: &str) -> Option<Context> {
    let mut context = Context::default();
    context
        .runtime_limits_mut()
        .set_loop_iteration_limit(LOOP_ITERATION_LIMIT);
    context
        .runtime_limits_mut()
        .set_recursion_limit(RECURSION_LIMIT);

    context.eval(Source::from_bytes(source)).ok()?;
    Some(context)
}

fn js_string_escape(input: &str) -> String {
    input.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Find the transform declaration and return it as a `function(a){...}`
/// expression. Probes, in order: the modern usage site (with one level of
/// array indirection), the direct declaration shape, and finally any
/// declaration whose body nests at least two blocks and ends by re-joining
/// its argument.
fn locate_n_function(js: &str) -> Result<String, VideoError> {
    static USAGE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r#"\.get\("n"\)\)&&\(\w+=([a-zA-Z0-9_$]+)(?:\[(\d+)\])?\("#).unwrap()
    });

    if let Some(caps) = USAGE.captures(js) {
        let mut name = caps.get(1).map(|m| m.as_str().to_string()).unwrap_or_default();

        // `b=Xq[0](b)` points through a one-element lookup array.
        if let Some(index) = caps.get(2) {
            let index: usize = index.as_str().parse().unwrap_or(0);
            let table = Regex::new(&format!(
                r#"var {}\s*=\s*\[([a-zA-Z0-9_$,\s]*)\]"#,
                regex::escape(&name)
            ))
            .expect("static pattern");

            if let Some(table_caps) = table.captures(js) {
                let entries = table_caps.get(1).map(|m| m.as_str()).unwrap_or_default();
                if let Some(real) = entries.split(',').map(str::trim).nth(index) {
                    name = real.to_string();
                }
            }
        }

        if let Some(decl) = declaration_for(js, &name) {
            return Ok(decl);
        }
    }

    static DIRECT: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r#"([a-zA-Z0-9_$]+)\s*=\s*function\(\s*([a-zA-Z0-9_$]+)\s*\)\s*\{\s*var\s+[a-zA-Z0-9_$]+\s*=\s*([a-zA-Z0-9_$]+)[\.\[]"#)
            .unwrap()
    });

    for caps in DIRECT.captures_iter(js) {
        // The first local must derive from the argument.
        if caps.get(2).map(|m| m.as_str()) != caps.get(3).map(|m| m.as_str()) {
            continue;
        }

        let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        if let Some(decl) = declaration_for(js, name) {
            if looks_like_n_body(&decl) {
                return Ok(decl);
            }
        }
    }

    static ANY_DECL: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r#"([a-zA-Z0-9_$]+)\s*=\s*function\(\s*([a-zA-Z0-9_$]+)\s*\)\s*\{"#).unwrap()
    });

    for caps in ANY_DECL.captures_iter(js) {
        let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let arg = caps.get(2).map(|m| m.as_str()).unwrap_or_default();

        let Some(decl) = declaration_for(js, name) else {
            continue;
        };

        let nested_blocks = decl.matches('{').count().saturating_sub(1);
        let joins_arg = decl
            .trim_end()
            .trim_end_matches(['}', ';'])
            .trim_end()
            .ends_with(&format!(r#"return {arg}.join("")"#));

        if nested_blocks >= 2 && joins_arg {
            return Ok(decl);
        }
    }

    Err(VideoError::PlayerParseFailed(
        "n transform function not found".to_string(),
    ))
}

/// Extract `function(<arg>){<body>}` for a named declaration. A single-level
/// regex goes first; bodies with nested blocks fall back to brace matching
/// from the first `{` after the `function` keyword.
fn declaration_for(js: &str, name: &str) -> Option<String> {
    let flat = Regex::new(&format!(
        r#"{}\s*=\s*(function\(\s*[a-zA-Z0-9_$]*\s*\)\s*\{{[^{{}}]*\}})"#,
        regex::escape(name)
    ))
    .ok()?;

    if let Some(caps) = flat.captures(js) {
        return caps.get(1).map(|m| m.as_str().to_string());
    }

    let head = Regex::new(&format!(
        r#"{}\s*=\s*function\(\s*[a-zA-Z0-9_$]*\s*\)\s*"#,
        regex::escape(name)
    ))
    .ok()?;

    let m = head.find(js)?;
    let header = &js[m.start()..m.end()];
    let body = cut_after_js(&js[m.end()..])?;

    let keyword = header.find("function")?;
    Some(format!("{}{}", &header[keyword..], body))
}

fn looks_like_n_body(decl: &str) -> bool {
    decl.contains(".join(") || decl.contains("enhanced_except_")
}
