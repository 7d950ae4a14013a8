//! Serialized forms of a [`MockSet`].

use crate::route::{MockSet, RouteAction};
use anyhow::{bail, Context, Result};
use serde_json::{json, Value};
use std::fmt::{self, Write as _};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MockFormat {
    #[default]
    Json,
    Yaml,
    /// TypeScript module installing the routes on a Playwright page
    Playwright,
}

impl MockFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            MockFormat::Json => "json",
            MockFormat::Yaml => "yaml",
            MockFormat::Playwright => "ts",
        }
    }

    pub fn render(&self, set: &MockSet) -> Result<String> {
        match self {
            MockFormat::Json => {
                let mut out = serde_json::to_string_pretty(set).context("Failed to serialize mocks")?;
                out.push('\n');
                Ok(out)
            }
            MockFormat::Yaml => serde_yaml::to_string(set).context("Failed to serialize mocks"),
            MockFormat::Playwright => render_playwright(set),
        }
    }
}

impl FromStr for MockFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(MockFormat::Json),
            "yaml" | "yml" => Ok(MockFormat::Yaml),
            "playwright" | "ts" => Ok(MockFormat::Playwright),
            other => bail!("Unknown mock format '{}'", other),
        }
    }
}

impl fmt::Display for MockFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MockFormat::Json => "json",
            MockFormat::Yaml => "yaml",
            MockFormat::Playwright => "playwright",
        };
        f.write_str(s)
    }
}

/// JavaScript regex source equivalent to a route glob, anchored on both ends
pub fn glob_to_regex(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::from("^");
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') => {
                let at_start = i == 0 || chars[i - 1] == '/';
                if at_start && chars.get(i + 2) == Some(&'/') {
                    out.push_str("(?:.*/)?");
                    i += 3;
                    continue;
                }
                if i > 0 && chars[i - 1] == '/' && i + 2 == chars.len() {
                    // trailing `/**` also matches the bare prefix
                    out.pop();
                    out.push_str("(?:/.*)?");
                } else {
                    out.push_str(".*");
                }
                i += 2;
                continue;
            }
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            c if "\\^$.|+()[]{}".contains(c) => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
        i += 1;
    }
    out.push('$');
    out
}

const PLAYWRIGHT_RUNTIME: &str = r#"
export async function installMocks(page: Page): Promise<void> {
  const compiled = routes.map((route) => ({ ...route, regex: new RegExp(route.pattern) }));
  await page.route(
    (url) => compiled.some((route) => route.regex.test(url.origin + url.pathname)),
    async (route: Route) => {
      const request = route.request();
      const url = new URL(request.url());
      const target = url.origin + url.pathname;
      const match = compiled.find(
        (candidate) =>
          (candidate.method === null || candidate.method === request.method()) &&
          candidate.regex.test(target),
      );
      if (!match) {
        return route.fallback();
      }
      if (match.abort) {
        return route.abort('blockedbyclient');
      }
      if (match.delayMs > 0) {
        await new Promise((resolve) => setTimeout(resolve, match.delayMs));
      }
      if (match.body === null) {
        return route.fulfill({ status: match.status });
      }
      return route.fulfill({
        status: match.status,
        contentType: 'application/json',
        body: JSON.stringify(match.body),
      });
    },
  );
  await page.addInitScript((installed) => {
    (window as unknown as Record<string, unknown>).__E2E_FORGE_STUBS__ = installed;
  }, stubs);
}
"#;

/// Playwright fixture: route table, integration stubs and `installMocks(page)`
pub fn render_playwright(set: &MockSet) -> Result<String> {
    let routes: Vec<Value> = set
        .routes
        .iter()
        .map(|route| {
            let (status, body, delay_ms, abort) = match &route.action {
                RouteAction::Fulfill {
                    status,
                    body,
                    delay_ms,
                } => (*status, body.clone().unwrap_or(Value::Null), *delay_ms, false),
                RouteAction::Abort => (0, Value::Null, 0, true),
            };
            json!({
                "id": route.id,
                "method": route.method.map(|m| m.as_str()),
                "pattern": glob_to_regex(&route.pattern),
                "status": status,
                "body": body,
                "delayMs": delay_ms,
                "abort": abort,
            })
        })
        .collect();
    let stubs: serde_json::Map<String, Value> = set
        .stubs
        .iter()
        .map(|stub| {
            let members: serde_json::Map<String, Value> = stub
                .members
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            (stub.name.clone(), Value::Object(members))
        })
        .collect();

    let mut out = String::new();
    writeln!(out, "// Generated by e2e-forge. Regenerate with `e2e-forge mocks --format playwright`.")?;
    writeln!(out, "import type {{ Page, Route }} from '@playwright/test';")?;
    writeln!(out)?;
    writeln!(out, "export interface MockRoute {{")?;
    writeln!(out, "  id: string;")?;
    writeln!(out, "  method: string | null;")?;
    writeln!(out, "  pattern: string;")?;
    writeln!(out, "  status: number;")?;
    writeln!(out, "  body: unknown;")?;
    writeln!(out, "  delayMs: number;")?;
    writeln!(out, "  abort: boolean;")?;
    writeln!(out, "}}")?;
    writeln!(out)?;
    writeln!(
        out,
        "export const routes: MockRoute[] = {};",
        serde_json::to_string_pretty(&routes).context("Failed to serialize routes")?
    )?;
    writeln!(out)?;
    writeln!(
        out,
        "export const stubs: Record<string, Record<string, unknown>> = {};",
        serde_json::to_string_pretty(&stubs).context("Failed to serialize stubs")?
    )?;
    out.push_str(PLAYWRIGHT_RUNTIME);
    Ok(out)
}
