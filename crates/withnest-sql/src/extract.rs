//! Component extraction
//!
//! Splits a normalized query into its named WITH components and the final
//! query body. The scanner is a plain value advanced one character at a time
//! by [`Scanner::step`]; no state survives between extractions.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Optional comma/space, a name, ` as`, optional space, then the opening `(`
static COMPONENT_HEAD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[,\s]?(.*?) as ?\($").unwrap());

/// A named WITH component and its body (without enclosing parentheses)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub name: String,
    pub body: String,
}

/// Scanner state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ScanState {
    /// Looking for `<name> as (`
    #[default]
    ScanningName,

    /// Inside a component body
    ///
    /// Counters accumulate over the whole body; the body closes when they
    /// become equal.
    InBody {
        name: String,
        open: usize,
        close: usize,
    },
}

/// Character scanner carrying its state and the text accumulated so far
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Scanner {
    pub state: ScanState,
    pub buffer: String,
}

impl Scanner {
    /// Advance the scanner by one character
    ///
    /// Returns the next scanner and, when `ch` closed a component body, the
    /// completed component.
    pub fn step(self, ch: char) -> (Scanner, Option<Component>) {
        let Scanner { state, mut buffer } = self;
        buffer.push(ch);

        match state {
            ScanState::ScanningName => {
                if ch == '(' {
                    if let Some(name) = component_name(&buffer) {
                        let next = Scanner {
                            state: ScanState::InBody { name, open: 1, close: 0 },
                            buffer: String::new(),
                        };
                        return (next, None);
                    }
                }

                (Scanner { state: ScanState::ScanningName, buffer }, None)
            }
            ScanState::InBody { name, mut open, mut close } => {
                match ch {
                    '(' => open += 1,
                    ')' => close += 1,
                    _ => {}
                }

                if open == close && open > 0 {
                    let body = buffer.strip_suffix(')').unwrap_or(&buffer).trim().to_string();
                    return (Scanner::default(), Some(Component { name, body }));
                }

                (Scanner { state: ScanState::InBody { name, open, close }, buffer }, None)
            }
        }
    }
}

/// Name of the component whose body opens at the end of `buffer`
fn component_name(buffer: &str) -> Option<String> {
    let caps = COMPONENT_HEAD_RE.captures(buffer)?;
    let head = caps.get(0)?;
    let name = format!("{}{}", &buffer[..head.start()], &caps[1]);

    Some(name.replace(',', "").trim().to_string())
}

/// Components found in a query, in discovery order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// Component names in discovery order, final query name last
    pub build_order: Vec<String>,

    /// Component name -> body, including the final query
    pub bodies: HashMap<String, String>,

    /// Synthesized name of the final (non-component) query
    pub final_name: String,
}

/// `_`-joined component names, padded with `_` while it names a component
///
/// A single component would otherwise share its name with the final query.
fn final_query_name(names: &[String], bodies: &HashMap<String, String>) -> String {
    let mut name = names.join("_");
    while !names.is_empty() && bodies.contains_key(&name) {
        name.push('_');
    }
    name
}

/// Split a normalized query into components and the final query
///
/// The final query is registered under the `_`-joined component names.
/// Unbalanced parentheses never close a body; the unclosed text ends up in
/// the final query instead of raising.
pub fn extract_components(query: &str) -> Extraction {
    let (scanner, components) = query.chars().fold(
        (Scanner::default(), Vec::new()),
        |(scanner, mut found), ch| {
            let (next, completed) = scanner.step(ch);
            found.extend(completed);
            (next, found)
        },
    );

    if let ScanState::InBody { name, open, close } = &scanner.state {
        tracing::warn!(
            component = %name,
            open,
            close,
            "input ended inside a component body, unbalanced parentheses"
        );
    }

    let mut build_order = Vec::with_capacity(components.len() + 1);
    let mut bodies = HashMap::with_capacity(components.len() + 1);
    for Component { name, body } in components {
        tracing::trace!(component = %name, "extracted component");
        build_order.push(name.clone());
        bodies.insert(name, body);
    }

    let final_name = final_query_name(&build_order, &bodies);
    build_order.push(final_name.clone());
    bodies.insert(final_name.clone(), scanner.buffer);

    Extraction {
        build_order,
        bodies,
        final_name,
    }
}
