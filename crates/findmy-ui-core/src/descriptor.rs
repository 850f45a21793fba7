//! Typed element descriptors.
//!
//! A [`Descriptor`] says *which* element is wanted without holding on to one.
//! Every wait or dispatch re-evaluates it against a fresh snapshot of the
//! tree, so a descriptor stays valid while the screen changes underneath it.
//!
//! # Example
//!
//! ```
//! use findmy_ui_core::descriptor::Descriptor;
//! use findmy_ui_core::element::kind;
//!
//! // The first table cell whose label mentions "laptop" (any case).
//! let cell = Descriptor::label_contains("laptop")
//!     .of_type(kind::CELL)
//!     .within(Descriptor::of_kind(kind::TABLE));
//!
//! // The "OK" button of a system alert.
//! let ok = Descriptor::label("OK")
//!     .of_type(kind::BUTTON)
//!     .within(Descriptor::of_kind(kind::ALERT))
//!     .system();
//! # let _ = (cell, ok);
//! ```

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::element::{walk, UIElement};

/// Errors raised while building a descriptor.
#[derive(Error, Debug)]
pub enum DescriptorError {
    /// The label pattern is not a valid regular expression.
    #[error("invalid label pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// The element layer a descriptor is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// The application under test.
    #[default]
    App,
    /// The system overlay layer (springboard alerts, notifications, status bar).
    System,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::App => write!(f, "app"),
            Scope::System => write!(f, "system"),
        }
    }
}

/// A predicate over a single element's attributes.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Identifier equals the value.
    Identifier(String),
    /// Identifier contains the value (case-sensitive).
    IdentifierContains(String),
    /// Label equals the value.
    Label(String),
    /// Label contains the value, ignoring case. Stored lowercased.
    LabelContains(String),
    /// Label matches a `*`/`?` glob.
    LabelGlob(String),
    /// Label matches a regular expression over the whole label.
    LabelMatches(Regex),
    /// Element type equals the value.
    Type(String),
    Selected(bool),
    Enabled(bool),
    /// Some strict descendant satisfies the inner matcher.
    HasDescendant(Box<Matcher>),
    /// Every inner matcher holds. An empty list matches everything.
    All(Vec<Matcher>),
    /// At least one inner matcher holds.
    Any(Vec<Matcher>),
}

impl Matcher {
    pub fn matches(&self, element: &UIElement) -> bool {
        match self {
            Matcher::Identifier(id) => element.identifier.as_deref() == Some(id.as_str()),
            Matcher::IdentifierContains(part) => element
                .identifier
                .as_deref()
                .map_or(false, |id| id.contains(part.as_str())),
            Matcher::Label(label) => element.label.as_deref() == Some(label.as_str()),
            Matcher::LabelContains(lowered) => element
                .label
                .as_deref()
                .map_or(false, |l| l.to_lowercase().contains(lowered.as_str())),
            Matcher::LabelGlob(pattern) => element
                .label
                .as_deref()
                .map_or(false, |l| glob_match(pattern, l)),
            Matcher::LabelMatches(re) => element.label.as_deref().map_or(false, |l| re.is_match(l)),
            Matcher::Type(typ) => element.is_type(typ),
            Matcher::Selected(selected) => element.is_selected() == *selected,
            Matcher::Enabled(enabled) => element.is_enabled() == *enabled,
            Matcher::HasDescendant(inner) => element
                .descendants()
                .skip(1)
                .any(|d| inner.matches(d)),
            Matcher::All(all) => all.iter().all(|m| m.matches(element)),
            Matcher::Any(any) => any.iter().any(|m| m.matches(element)),
        }
    }

    /// Combines two matchers with AND, flattening nested conjunctions.
    fn and(self, other: Matcher) -> Matcher {
        match self {
            Matcher::All(mut all) => {
                all.push(other);
                Matcher::All(all)
            }
            first => Matcher::All(vec![first, other]),
        }
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Identifier(id) => write!(f, "id={id:?}"),
            Matcher::IdentifierContains(part) => write!(f, "id~{part:?}"),
            Matcher::Label(label) => write!(f, "label={label:?}"),
            Matcher::LabelContains(part) => write!(f, "label~{part:?}"),
            Matcher::LabelGlob(pattern) => write!(f, "label glob {pattern:?}"),
            Matcher::LabelMatches(re) => write!(f, "label matches /{}/", re.as_str()),
            Matcher::Type(typ) => write!(f, "type={typ}"),
            Matcher::Selected(s) => write!(f, "selected={s}"),
            Matcher::Enabled(e) => write!(f, "enabled={e}"),
            Matcher::HasDescendant(inner) => write!(f, "containing({inner})"),
            Matcher::All(all) if all.is_empty() => write!(f, "any element"),
            Matcher::All(all) => join(f, all, " & "),
            Matcher::Any(any) => {
                write!(f, "(")?;
                join(f, any, " | ")?;
                write!(f, ")")
            }
        }
    }
}

fn join(f: &mut fmt::Formatter<'_>, matchers: &[Matcher], sep: &str) -> fmt::Result {
    for (i, m) in matchers.iter().enumerate() {
        if i > 0 {
            write!(f, "{sep}")?;
        }
        write!(f, "{m}")?;
    }
    Ok(())
}

/// Describes how to find one element in the accessibility tree.
#[derive(Debug, Clone)]
pub struct Descriptor {
    matcher: Matcher,
    within: Option<Box<Descriptor>>,
    index: usize,
    scope: Scope,
}

impl Descriptor {
    /// Wraps an arbitrary matcher.
    pub fn matching(matcher: Matcher) -> Self {
        Self {
            matcher,
            within: None,
            index: 0,
            scope: Scope::App,
        }
    }

    /// Exact accessibility identifier.
    pub fn id(identifier: impl Into<String>) -> Self {
        Self::matching(Matcher::Identifier(identifier.into()))
    }

    /// Identifier containing a substring.
    pub fn id_contains(part: impl Into<String>) -> Self {
        Self::matching(Matcher::IdentifierContains(part.into()))
    }

    /// Exact visible label.
    pub fn label(label: impl Into<String>) -> Self {
        Self::matching(Matcher::Label(label.into()))
    }

    /// Label containing `part`, ignoring case.
    pub fn label_contains(part: impl AsRef<str>) -> Self {
        Self::matching(Matcher::LabelContains(part.as_ref().to_lowercase()))
    }

    /// Label matching a glob with `*` and `?` wildcards.
    pub fn label_glob(pattern: impl Into<String>) -> Self {
        Self::matching(Matcher::LabelGlob(pattern.into()))
    }

    /// Label matching a regular expression. The whole label must match.
    pub fn label_matches(pattern: &str) -> Result<Self, DescriptorError> {
        let anchored = format!("^(?:{pattern})$");
        let re = Regex::new(&anchored).map_err(|source| DescriptorError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self::matching(Matcher::LabelMatches(re)))
    }

    /// Any element of the given type.
    pub fn of_kind(element_type: impl Into<String>) -> Self {
        Self::matching(Matcher::Type(element_type.into()))
    }

    /// Restricts matches to the given element type.
    pub fn of_type(self, element_type: impl Into<String>) -> Self {
        self.and(Matcher::Type(element_type.into()))
    }

    /// Restricts matches to elements whose subtree contains a match for `inner`.
    pub fn containing(self, inner: Matcher) -> Self {
        self.and(Matcher::HasDescendant(Box::new(inner)))
    }

    pub fn selected(self, selected: bool) -> Self {
        self.and(Matcher::Selected(selected))
    }

    pub fn enabled(self, enabled: bool) -> Self {
        self.and(Matcher::Enabled(enabled))
    }

    /// Adds an extra predicate (logical AND).
    pub fn and(mut self, matcher: Matcher) -> Self {
        self.matcher = self.matcher.and(matcher);
        self
    }

    /// Only search the descendants of the element matched by `container`.
    ///
    /// The container inherits this descriptor's scope when resolved.
    pub fn within(mut self, container: Descriptor) -> Self {
        self.within = Some(Box::new(container));
        self
    }

    /// Selects the `index`-th match (zero based) in document order.
    pub fn nth(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    /// Evaluates against the system overlay layer instead of the app.
    pub fn system(self) -> Self {
        self.in_scope(Scope::System)
    }

    pub fn in_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// Finds the element this descriptor refers to in a snapshot.
    pub fn resolve<'a>(&self, roots: &'a [UIElement]) -> Option<&'a UIElement> {
        self.candidates(roots).nth(self.index)
    }

    /// All elements matching this descriptor, ignoring the index.
    pub fn resolve_all<'a>(&self, roots: &'a [UIElement]) -> Vec<&'a UIElement> {
        self.candidates(roots).collect()
    }

    fn candidates<'s, 'a: 's>(&'s self, roots: &'a [UIElement]) -> Box<dyn Iterator<Item = &'a UIElement> + 's> {
        match &self.within {
            None => Box::new(walk(roots).filter(move |e| self.matcher.matches(e))),
            Some(container) => match container.resolve(roots) {
                Some(parent) => Box::new(
                    walk(&parent.children).filter(move |e| self.matcher.matches(e)),
                ),
                None => Box::new(std::iter::empty()),
            },
        }
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.matcher)?;
        if self.index > 0 {
            write!(f, " #{}", self.index)?;
        }
        if let Some(container) = &self.within {
            write!(f, " within [{container}]")?;
        }
        if self.scope == Scope::System {
            write!(f, " (system)")?;
        }
        Ok(())
    }
}

/// Label pattern match. `*` stands for any run of characters and `?` for
/// exactly one; a pattern without either must equal `text`.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pat: Vec<char> = pattern.chars().collect();
    let txt: Vec<char> = text.chars().collect();

    let (mut p, mut t) = (0, 0);
    // Position of the last `*` seen and the text index it is currently swallowing up to.
    let mut star: Option<(usize, usize)> = None;

    while t < txt.len() {
        match pat.get(p) {
            Some('*') => {
                star = Some((p, t));
                p += 1;
            }
            Some(&c) if c == '?' || c == txt[t] => {
                p += 1;
                t += 1;
            }
            _ => match star {
                Some((sp, st)) => {
                    p = sp + 1;
                    t = st + 1;
                    star = Some((sp, st + 1));
                }
                None => return false,
            },
        }
    }
    pat[p..].iter().all(|&c| c == '*')
}
