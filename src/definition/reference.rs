use std::sync::Arc;

use super::{SelfResolvingDefinition, Value};
use crate::container::Container;
use crate::errors::{ContainerError, InvalidDefinitionReason, Result};

/// Points at another entry; resolves through `Container::get`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    target: String,
}

impl Reference {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

impl SelfResolvingDefinition for Reference {
    fn resolve(&self, container: &Container) -> Result<Value> {
        container.get(&self.target)
    }

    fn is_resolvable(&self, container: &Container) -> bool {
        container.has(&self.target)
    }
}

/// String with `{entry}` placeholders replaced by the named entries.
///
/// Placeholder entries must resolve to a `String` or a scalar (`i64`, `f64`,
/// `bool`). A `{` without a closing `}` is kept literally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringExpression {
    expression: String,
}

impl StringExpression {
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
        }
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Entry names referenced by the expression, in order of appearance.
    pub fn placeholders(&self) -> Vec<&str> {
        self.segments()
            .into_iter()
            .filter_map(|segment| match segment {
                Segment::Placeholder(name) => Some(name),
                Segment::Literal(_) => None,
            })
            .collect()
    }

    /// Substitutes placeholders in one pass over the expression, so text
    /// coming from an entry is never scanned for placeholders again.
    pub fn render(&self, container: &Container) -> Result<String> {
        let mut output = String::with_capacity(self.expression.len());
        for segment in self.segments() {
            match segment {
                Segment::Literal(text) => output.push_str(text),
                Segment::Placeholder(name) => {
                    let value = container.get(name)?;
                    let text = stringify(&value).ok_or_else(|| {
                        ContainerError::invalid(
                            name,
                            InvalidDefinitionReason::TypeMismatch {
                                expected: "alloc::string::String",
                            },
                        )
                    })?;
                    output.push_str(&text);
                }
            }
        }
        Ok(output)
    }

    fn segments(&self) -> Vec<Segment<'_>> {
        let mut segments = Vec::new();
        let mut rest = self.expression.as_str();
        while let Some(start) = rest.find('{') {
            let after = &rest[start + 1..];
            match after.find(['{', '}']) {
                Some(end) if after.as_bytes()[end] == b'}' && end > 0 => {
                    segments.push(Segment::Literal(&rest[..start]));
                    segments.push(Segment::Placeholder(&after[..end]));
                    rest = &after[end + 1..];
                }
                Some(end) => {
                    segments.push(Segment::Literal(&rest[..start + 1 + end]));
                    rest = &after[end..];
                }
                None => break,
            }
        }
        segments.push(Segment::Literal(rest));
        segments
    }
}

enum Segment<'a> {
    Literal(&'a str),
    Placeholder(&'a str),
}

impl SelfResolvingDefinition for StringExpression {
    fn resolve(&self, container: &Container) -> Result<Value> {
        Ok(Arc::new(self.render(container)?))
    }

    fn is_resolvable(&self, container: &Container) -> bool {
        self.placeholders().into_iter().all(|name| container.has(name))
    }
}

fn stringify(value: &Value) -> Option<String> {
    if let Some(text) = value.downcast_ref::<String>() {
        return Some(text.clone());
    }
    if let Some(number) = value.downcast_ref::<i64>() {
        return Some(number.to_string());
    }
    if let Some(number) = value.downcast_ref::<f64>() {
        return Some(number.to_string());
    }
    value.downcast_ref::<bool>().map(bool::to_string)
}
