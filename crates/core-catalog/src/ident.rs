use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{self as catalog_err, Error, Result};

/// Maximum identifier depth: metalake.catalog.schema.object
pub const MAX_DEPTH: usize = 4;

#[allow(clippy::unwrap_used)]
static SEGMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_.\-]*$").unwrap());

/// A hierarchical name: `metalake[.catalog[.schema[.object]]]`.
///
/// Immutable value object; equality is structural. Parsing enforces the
/// segment charset (letter/underscore start, then alphanumerics, underscore,
/// hyphen or dot) and the maximum depth. Serialized as the segment vector,
/// not the dotted form: segments may themselves contain dots, so only the
/// structural form round-trips faithfully.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct NameIdent {
    segments: Vec<String>,
}

impl NameIdent {
    /// Build an identifier from pre-split segments, validating each one.
    pub fn from_segments<I, S>(segments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return catalog_err::MalformedIdentifierSnafu {
                ident: String::new(),
                reason: "identifier must have at least one segment".to_string(),
            }
            .fail();
        }
        if segments.len() > MAX_DEPTH {
            return catalog_err::InvalidDepthSnafu {
                ident: segments.join("."),
                expected: MAX_DEPTH,
                actual: segments.len(),
            }
            .fail();
        }
        for segment in &segments {
            if !SEGMENT_RE.is_match(segment) {
                return catalog_err::MalformedIdentifierSnafu {
                    ident: segments.join("."),
                    reason: format!("invalid segment '{segment}'"),
                }
                .fail();
            }
        }
        Ok(Self { segments })
    }

    /// Parse a dotted path. Segments may not be empty, so `".."`, leading or
    /// trailing dots are rejected.
    pub fn parse(path: &str) -> Result<Self> {
        if path.is_empty() {
            return catalog_err::MalformedIdentifierSnafu {
                ident: path.to_string(),
                reason: "identifier is empty".to_string(),
            }
            .fail();
        }
        // NB: segments themselves may contain dots per the charset, but the
        // dotted wire form splits on every dot; only parse can introduce
        // ambiguity, from_segments keeps dotted segments intact.
        Self::from_segments(path.split('.').map(str::to_string))
    }

    pub fn metalake(name: &str) -> Result<Self> {
        Self::from_segments([name])
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Last segment: the entity's own name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.segments
            .last()
            .map_or("", String::as_str)
    }

    #[must_use]
    pub fn metalake_name(&self) -> &str {
        self.segments.first().map_or("", String::as_str)
    }

    #[must_use]
    pub fn catalog_name(&self) -> Option<&str> {
        self.segments.get(1).map(String::as_str)
    }

    #[must_use]
    pub fn schema_name(&self) -> Option<&str> {
        self.segments.get(2).map(String::as_str)
    }

    /// The depth n-1 prefix, if any.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.segments.len() <= 1 {
            None
        } else {
            Some(Self {
                segments: self.segments[..self.segments.len() - 1].to_vec(),
            })
        }
    }

    /// Append a child segment, validating it.
    pub fn child(&self, name: &str) -> Result<Self> {
        let mut segments = self.segments.clone();
        segments.push(name.to_string());
        Self::from_segments(segments)
    }

    /// Replace the last segment (rename), keeping the prefix.
    pub fn renamed(&self, name: &str) -> Result<Self> {
        let mut segments = self.segments.clone();
        if let Some(last) = segments.last_mut() {
            *last = name.to_string();
        }
        Self::from_segments(segments)
    }

    /// Fail unless the identifier has exactly the expected depth.
    pub fn require_depth(&self, expected: usize) -> Result<()> {
        if self.depth() == expected {
            Ok(())
        } else {
            catalog_err::InvalidDepthSnafu {
                ident: self.to_string(),
                expected,
                actual: self.depth(),
            }
            .fail()
        }
    }
}

impl fmt::Display for NameIdent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

impl TryFrom<Vec<String>> for NameIdent {
    type Error = Error;

    fn try_from(value: Vec<String>) -> Result<Self> {
        Self::from_segments(value)
    }
}

impl From<NameIdent> for Vec<String> {
    fn from(ident: NameIdent) -> Self {
        ident.segments
    }
}
