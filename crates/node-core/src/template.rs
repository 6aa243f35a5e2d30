//! `{field}` placeholder templates.
//!
//! Used for request paths (`/mars-photos/api/v1/rovers/{roverName}/photos`)
//! and for node subtitles (`{operation}: {resource}`).

use serde::{Deserialize, Serialize};

use crate::FieldName;

/// A string with `{field}` placeholders.
///
/// Text outside braces is copied verbatim. An unmatched `{` is kept as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Template(String);

enum Segment<'a> {
    Literal(&'a str),
    Placeholder(&'a str),
}

impl Template {
    pub fn new(source: impl Into<String>) -> Self {
        Self(source.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Names of the fields referenced by placeholders, in order of appearance.
    pub fn placeholders(&self) -> Vec<&str> {
        self.segments()
            .into_iter()
            .filter_map(|segment| match segment {
                Segment::Placeholder(name) => Some(name),
                Segment::Literal(_) => None,
            })
            .collect()
    }

    /// Substitutes every placeholder with the value `lookup` returns.
    ///
    /// Fails with the name of the first placeholder for which `lookup`
    /// returns `None` or an empty string.
    pub fn render<F>(&self, mut lookup: F) -> Result<String, FieldName>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut out = String::with_capacity(self.0.len());
        for segment in self.segments() {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(name) => match lookup(name) {
                    Some(value) if !value.is_empty() => out.push_str(&value),
                    _ => return Err(FieldName::trusted(name)),
                },
            }
        }
        Ok(out)
    }

    fn segments(&self) -> Vec<Segment<'_>> {
        let mut segments = Vec::new();
        let mut rest = self.0.as_str();
        while let Some(open) = rest.find('{') {
            let Some(close) = rest[open..].find('}').map(|c| open + c) else {
                break;
            };
            if open > 0 {
                segments.push(Segment::Literal(&rest[..open]));
            }
            segments.push(Segment::Placeholder(&rest[open + 1..close]));
            rest = &rest[close + 1..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest));
        }
        segments
    }
}

impl std::fmt::Display for Template {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders() {
        let t = Template::new("/rovers/{roverName}/photos");
        assert_eq!(t.placeholders(), vec!["roverName"]);
        assert!(Template::new("/planetary/apod").placeholders().is_empty());
    }

    #[test]
    fn test_render_substitutes_in_order() {
        let t = Template::new("{operation}: {resource}");
        let rendered = t
            .render(|name| Some(name.to_uppercase()))
            .unwrap();
        assert_eq!(rendered, "OPERATION: RESOURCE");
    }

    #[test]
    fn test_render_reports_missing_placeholder() {
        let t = Template::new("/rovers/{roverName}/photos");
        let err = t.render(|_| Some(String::new())).unwrap_err();
        assert_eq!(err.as_str(), "roverName");
    }

    #[test]
    fn test_unmatched_brace_is_literal() {
        let t = Template::new("/a/{b");
        assert_eq!(t.render(|_| None).unwrap(), "/a/{b");
    }
}
