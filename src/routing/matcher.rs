//! Path template matching.
//!
//! # Responsibilities
//! - Classify template segments as literal or `{name}` variables
//! - Match fully static templates by exact segment equality
//! - Bind variables of parametrized templates, all-or-nothing
//!
//! # Design Decisions
//! - Segment counts must be equal; there are no optional or catch-all segments
//! - Case folding (when enabled) applies to literal segments only; bound
//!   values are returned exactly as requested (decoded)
//! - No regex, O(n) in the number of segments

use std::collections::HashMap;

use crate::routing::components::join_path;

/// A single segment of a path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Variable(String),
}

impl Segment {
    pub fn classify(raw: &str) -> Self {
        if is_variable_segment(raw) {
            Segment::Variable(raw[1..raw.len() - 1].to_string())
        } else {
            Segment::Literal(raw.to_string())
        }
    }
}

/// True iff the segment is wrapped in `{` and `}` with a non-empty name.
pub fn is_variable_segment(segment: &str) -> bool {
    segment.len() > 2 && segment.starts_with('{') && segment.ends_with('}')
}

/// A variable name that occurs more than once in one template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateVariable(pub String);

/// Compiled path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    segments: Vec<Segment>,
    case_sensitive: bool,
}

impl PathPattern {
    /// Compile decoded template segments.
    pub fn new<S: AsRef<str>>(
        segments: &[S],
        case_sensitive: bool,
    ) -> Result<Self, DuplicateVariable> {
        let segments: Vec<Segment> = segments.iter().map(|s| Segment::classify(s.as_ref())).collect();

        let mut seen: Vec<&str> = Vec::new();
        for segment in &segments {
            if let Segment::Variable(name) = segment {
                if seen.contains(&name.as_str()) {
                    return Err(DuplicateVariable(name.clone()));
                }
                seen.push(name);
            }
        }

        Ok(Self {
            segments,
            case_sensitive,
        })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// True when the template has no variable segments.
    pub fn is_static(&self) -> bool {
        self.segments
            .iter()
            .all(|s| matches!(s, Segment::Literal(_)))
    }

    /// Variable names in declaration order.
    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Variable(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Exact segment equality for static templates.
    pub fn matches_static<S: AsRef<str>>(&self, request: &[S]) -> bool {
        self.is_static()
            && self.segments.len() == request.len()
            && self
                .segments
                .iter()
                .zip(request)
                .all(|(segment, value)| match segment {
                    Segment::Literal(lit) => self.literal_eq(lit, value.as_ref()),
                    Segment::Variable(_) => false,
                })
    }

    /// Bind variables against request segments.
    ///
    /// Returns `None` on the first literal mismatch or if the segment counts
    /// differ; never a partial map.
    pub fn bind_variables<S: AsRef<str>>(&self, request: &[S]) -> Option<HashMap<String, String>> {
        if self.segments.len() != request.len() {
            return None;
        }

        let mut vars = HashMap::new();
        for (segment, value) in self.segments.iter().zip(request) {
            let value = value.as_ref();
            match segment {
                Segment::Literal(lit) => {
                    if !self.literal_eq(lit, value) {
                        return None;
                    }
                }
                Segment::Variable(name) => {
                    vars.insert(name.clone(), value.to_string());
                }
            }
        }
        Some(vars)
    }

    /// Substitute variables by name. Unknown variables are left as `{name}`.
    pub fn render(&self, values: &HashMap<&str, &str>) -> String {
        self.render_with(values, |lit| lit.to_string())
    }

    /// Like [`render`](Self::render), but literal segments are
    /// percent-encoded. Values are substituted as given.
    pub fn render_encoded(&self, values: &HashMap<&str, &str>) -> String {
        self.render_with(values, |lit| urlencoding::encode(lit).into_owned())
    }

    fn render_with<F>(&self, values: &HashMap<&str, &str>, literal: F) -> String
    where
        F: Fn(&str) -> String,
    {
        let parts: Vec<String> = self
            .segments
            .iter()
            .map(|s| match s {
                Segment::Literal(lit) => literal(lit),
                Segment::Variable(name) => match values.get(name.as_str()) {
                    Some(v) => (*v).to_string(),
                    None => format!("{{{name}}}"),
                },
            })
            .collect();
        join_path(&parts)
    }

    /// The template as written, e.g. `/users/{id}`.
    pub fn display(&self) -> String {
        self.render(&HashMap::new())
    }

    fn literal_eq(&self, template: &str, request: &str) -> bool {
        if self.case_sensitive {
            template == request
        } else {
            template.to_lowercase() == request.to_lowercase()
        }
    }
}
