#![forbid(unsafe_code)]

//! Host output snapshots: markup serialization and class-selector queries.
//!
//! A [`HostNode`] tree is what the renderer's output looks like with every
//! component and fragment flattened away. Selectors are descendant chains
//! of compound parts, e.g. `.outer .inner span.value`.

use std::fmt;

/// Query failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// The selector had no parts.
    EmptySelector,
    /// A part was not `tag`, `.class`, or `tag.class`.
    InvalidSelector(String),
    /// Nothing matched.
    NoMatch(String),
    /// A single match was required but several matched.
    Ambiguous { selector: String, count: usize },
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptySelector => write!(f, "empty selector"),
            Self::InvalidSelector(part) => write!(f, "invalid selector part: {part}"),
            Self::NoMatch(selector) => write!(f, "no node matches '{selector}'"),
            Self::Ambiguous { selector, count } => {
                write!(f, "'{selector}' matches {count} nodes, expected one")
            }
        }
    }
}

impl std::error::Error for QueryError {}

/// A node of host output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostNode {
    Text(String),
    Tag {
        name: String,
        class: Option<String>,
        children: Vec<HostNode>,
    },
}

impl HostNode {
    /// Concatenated text of this node and all its descendants.
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Self::Text(text) => out.push_str(text),
            Self::Tag { children, .. } => {
                for child in children {
                    child.collect_text(out);
                }
            }
        }
    }

    fn write_markup(&self, out: &mut String) {
        match self {
            Self::Text(text) => escape_into(text, false, out),
            Self::Tag {
                name,
                class,
                children,
            } => {
                out.push('<');
                out.push_str(name);
                if let Some(class) = class {
                    out.push_str(" class=\"");
                    escape_into(class, true, out);
                    out.push('"');
                }
                out.push('>');
                for child in children {
                    child.write_markup(out);
                }
                out.push_str("</");
                out.push_str(name);
                out.push('>');
            }
        }
    }

    fn has_class(&self, wanted: &str) -> bool {
        match self {
            Self::Tag {
                class: Some(class), ..
            } => class.split_whitespace().any(|c| c == wanted),
            _ => false,
        }
    }
}

fn escape_into(text: &str, attribute: bool, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

/// Serialize `nodes` as HTML-like markup.
#[must_use]
pub fn to_markup(nodes: &[HostNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        node.write_markup(&mut out);
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Part {
    tag: Option<String>,
    classes: Vec<String>,
}

impl Part {
    fn parse(raw: &str) -> Result<Self, QueryError> {
        let mut segments = raw.split('.');
        let tag = segments.next().unwrap_or_default();
        let classes: Vec<String> = segments.map(str::to_string).collect();
        let valid = |s: &str| {
            !s.is_empty()
                && s
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        };
        if (!tag.is_empty() && !valid(tag)) || classes.iter().any(|c| !valid(c)) {
            return Err(QueryError::InvalidSelector(raw.to_string()));
        }
        if tag.is_empty() && classes.is_empty() {
            return Err(QueryError::InvalidSelector(raw.to_string()));
        }
        Ok(Self {
            tag: (!tag.is_empty()).then(|| tag.to_string()),
            classes,
        })
    }

    fn matches(&self, node: &HostNode) -> bool {
        let HostNode::Tag { name, .. } = node else {
            return false;
        };
        self.tag.as_ref().is_none_or(|tag| tag == name)
            && self.classes.iter().all(|c| node.has_class(c))
    }
}

/// A parsed descendant selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    parts: Vec<Part>,
}

impl Selector {
    /// Parse a whitespace-separated chain of `tag`, `.class` or
    /// `tag.class` parts.
    pub fn parse(selector: &str) -> Result<Self, QueryError> {
        let parts = selector
            .split_whitespace()
            .map(Part::parse)
            .collect::<Result<Vec<_>, _>>()?;
        if parts.is_empty() {
            return Err(QueryError::EmptySelector);
        }
        Ok(Self {
            source: selector.to_string(),
            parts,
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    fn matches(&self, node: &HostNode, ancestors: &[&HostNode]) -> bool {
        let Some((last, rest)) = self.parts.split_last() else {
            return false;
        };
        if !last.matches(node) {
            return false;
        }
        // Greedy nearest-first matching is exact for descendant chains.
        let mut remaining = rest.iter().rev().peekable();
        for ancestor in ancestors.iter().rev() {
            match remaining.peek() {
                Some(part) if part.matches(ancestor) => {
                    remaining.next();
                }
                Some(_) => {}
                None => break,
            }
        }
        remaining.peek().is_none()
    }

    /// Every tag node under `roots` matching this selector, in document
    /// order.
    #[must_use]
    pub fn select<'a>(&self, roots: &'a [HostNode]) -> Vec<&'a HostNode> {
        let mut out = Vec::new();
        let mut ancestors = Vec::new();
        for root in roots {
            self.walk(root, &mut ancestors, &mut out);
        }
        out
    }

    fn walk<'a>(
        &self,
        node: &'a HostNode,
        ancestors: &mut Vec<&'a HostNode>,
        out: &mut Vec<&'a HostNode>,
    ) {
        let HostNode::Tag { children, .. } = node else {
            return;
        };
        if self.matches(node, ancestors) {
            out.push(node);
        }
        ancestors.push(node);
        for child in children {
            self.walk(child, ancestors, out);
        }
        ancestors.pop();
    }

    /// The single match under `roots`.
    pub fn select_one<'a>(&self, roots: &'a [HostNode]) -> Result<&'a HostNode, QueryError> {
        match self.select(roots).as_slice() {
            [] => Err(QueryError::NoMatch(self.source.clone())),
            [one] => Ok(*one),
            many => Err(QueryError::Ambiguous {
                selector: self.source.clone(),
                count: many.len(),
            }),
        }
    }
}
