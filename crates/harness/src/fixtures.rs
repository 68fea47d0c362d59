//! Simulated page content for the headless backend
//!
//! Without a script engine the headless renderer needs a model of what the
//! hosted page does. [`ScriptedPage`] understands the two statement forms the
//! scenarios use:
//! - `window.NAME = VALUE` with a string or number literal,
//! - `window.external.invoke(EXPR)` where `EXPR` concatenates string
//!   literals, number literals and `window.NAME` reads with `+`.
//!
//! Assignments in init scripts run on load, before the load handlers;
//! invocations in init scripts run as the page's load handlers.

use std::collections::HashMap;

use pane_ipc::BridgeSender;
use pane_webview::{Page, PageEvent};

const INVOKE: &str = "external.invoke(";

#[derive(Debug, Default)]
pub struct ScriptedPage {
    globals: HashMap<String, String>,
}

impl ScriptedPage {
    fn run_assignments(&mut self, script: &str) {
        for statement in script.split([';', '\n']) {
            let Some(rest) = statement.trim().strip_prefix("window.") else {
                continue;
            };
            let Some((name, value)) = rest.split_once('=') else {
                continue;
            };
            let name = name.trim();
            if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                continue;
            }
            if let Some(value) = literal(value.trim()) {
                self.globals.insert(name.to_string(), value);
            }
        }
    }

    fn run_invocations(&self, script: &str, bridge: &BridgeSender) {
        for expr in invocations(script) {
            match self.evaluate(expr) {
                Some(payload) => {
                    if bridge.post(payload).is_err() {
                        tracing::warn!("page message dropped: engine is gone");
                    }
                }
                None => tracing::warn!(expr, "scripted page can not evaluate expression"),
            }
        }
    }

    fn evaluate(&self, expr: &str) -> Option<String> {
        expr.split('+')
            .map(str::trim)
            .map(|term| match term.strip_prefix("window.") {
                Some(name) => Some(
                    self.globals
                        .get(name)
                        .cloned()
                        .unwrap_or_else(|| "undefined".into()),
                ),
                None => literal(term),
            })
            .collect()
    }
}

impl Page for ScriptedPage {
    fn handle(&mut self, event: PageEvent, bridge: &BridgeSender) {
        match event {
            PageEvent::Load { init_scripts, .. } => {
                self.globals.clear();
                for script in &init_scripts {
                    self.run_assignments(script);
                }
                for script in &init_scripts {
                    self.run_invocations(script, bridge);
                }
            }
            PageEvent::Eval { script } => {
                self.run_assignments(&script);
                self.run_invocations(&script, bridge);
            }
        }
    }
}

/// Argument text of every `external.invoke(...)` call in `script`
fn invocations(script: &str) -> Vec<&str> {
    let mut found = Vec::new();
    let mut rest = script;
    while let Some(start) = rest.find(INVOKE) {
        let after = &rest[start + INVOKE.len()..];
        let Some(end) = after.find(')') else {
            break;
        };
        found.push(after[..end].trim());
        rest = &after[end..];
    }
    found
}

fn literal(term: &str) -> Option<String> {
    let quoted = term
        .strip_prefix('\'')
        .and_then(|t| t.strip_suffix('\''))
        .or_else(|| term.strip_prefix('"').and_then(|t| t.strip_suffix('"')));
    match quoted {
        Some(text) => Some(text.to_string()),
        None if term.parse::<f64>().is_ok() => Some(term.to_string()),
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_runs_assignments_before_handlers() {
        let (bridge, mut inbox) = pane_ipc::bridge();
        let mut page = ScriptedPage::default();
        page.handle(
            PageEvent::Load {
                url: "data:text/html,<html></html>".into(),
                init_scripts: vec![
                    pane_ipc::BRIDGE_SHIM.to_string(),
                    "window.onload = () => { window.external.invoke('x is ' + window.x); };"
                        .to_string(),
                    "window.x = 42;".to_string(),
                ],
            },
            &bridge,
        );
        assert_eq!(inbox.try_recv().unwrap().payload, "x is 42");
        assert!(inbox.try_recv().is_none());
    }

    #[test]
    fn test_eval_reads_globals() {
        let (bridge, mut inbox) = pane_ipc::bridge();
        let mut page = ScriptedPage::default();
        page.handle(
            PageEvent::Eval {
                script: "window.name = \"pane\"; window.external.invoke('hi ' + window.name + ' ' + window.missing)".into(),
            },
            &bridge,
        );
        assert_eq!(inbox.try_recv().unwrap().payload, "hi pane undefined");
    }

    #[test]
    fn test_invocations_are_found_in_order() {
        let script = "external.invoke('a'); foo(); window.external.invoke( 'b' )";
        assert_eq!(invocations(script), vec!["'a'", "'b'"]);
    }

    #[test]
    fn test_unknown_terms_are_not_posted() {
        let (bridge, mut inbox) = pane_ipc::bridge();
        let page = ScriptedPage::default();
        page.run_invocations("window.external.invoke(compute())", &bridge);
        assert!(inbox.try_recv().is_none());
    }
}
