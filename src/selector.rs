use crate::dom::{Dom, NodeId};
use crate::{Error, Result};

/// One compound selector step: optional tag plus any number of `#id`,
/// `.class`, and `[attr='value']` conditions. Combinators are not supported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Selector {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<(String, String)>,
}

impl Selector {
    pub(crate) fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(Error::UnsupportedSelector(input.to_string()));
        }

        let chars: Vec<char> = trimmed.chars().collect();
        let mut pos = 0;
        let mut selector = Selector::default();

        if chars[0].is_ascii_alphabetic() {
            selector.tag = Some(read_ident(&chars, &mut pos).to_ascii_lowercase());
        }

        while pos < chars.len() {
            match chars[pos] {
                '#' => {
                    pos += 1;
                    let ident = read_ident(&chars, &mut pos);
                    if ident.is_empty() {
                        return Err(Error::UnsupportedSelector(input.to_string()));
                    }
                    selector.id = Some(ident);
                }
                '.' => {
                    pos += 1;
                    let ident = read_ident(&chars, &mut pos);
                    if ident.is_empty() {
                        return Err(Error::UnsupportedSelector(input.to_string()));
                    }
                    selector.classes.push(ident);
                }
                '[' => {
                    pos += 1;
                    let name = read_ident(&chars, &mut pos).to_ascii_lowercase();
                    if name.is_empty() || pos >= chars.len() || chars[pos] != '=' {
                        return Err(Error::UnsupportedSelector(input.to_string()));
                    }
                    pos += 1;
                    let value = read_attr_value(&chars, &mut pos)
                        .ok_or_else(|| Error::UnsupportedSelector(input.to_string()))?;
                    if pos >= chars.len() || chars[pos] != ']' {
                        return Err(Error::UnsupportedSelector(input.to_string()));
                    }
                    pos += 1;
                    selector.attrs.push((name, value));
                }
                _ => return Err(Error::UnsupportedSelector(input.to_string())),
            }
        }

        Ok(selector)
    }

    /// Fast path: a bare `#id` selector resolves through the id index.
    fn id_only(&self) -> Option<&str> {
        if self.tag.is_none() && self.classes.is_empty() && self.attrs.is_empty() {
            self.id.as_deref()
        } else {
            None
        }
    }

    fn matches(&self, dom: &Dom, node: NodeId) -> bool {
        if let Some(tag) = &self.tag {
            if dom.tag_name(node) != Some(tag.as_str()) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if dom.attr(node, "id") != Some(id.as_str()) {
                return false;
            }
        }
        for class in &self.classes {
            if !dom.has_class(node, class) {
                return false;
            }
        }
        for (name, value) in &self.attrs {
            if dom.attr(node, name) != Some(value.as_str()) {
                return false;
            }
        }
        true
    }
}

pub(crate) fn query_all(dom: &Dom, selector: &str) -> Result<Vec<NodeId>> {
    let parsed = Selector::parse(selector)?;
    if let Some(id) = parsed.id_only() {
        return Ok(dom.element_by_id(id).into_iter().collect());
    }
    Ok(dom
        .elements()
        .into_iter()
        .filter(|node| parsed.matches(dom, *node))
        .collect())
}

pub(crate) fn query_one(dom: &Dom, selector: &str) -> Result<NodeId> {
    query_all(dom, selector)?
        .into_iter()
        .next()
        .ok_or_else(|| Error::SelectorNotFound(selector.to_string()))
}

fn read_ident(chars: &[char], pos: &mut usize) -> String {
    let start = *pos;
    while *pos < chars.len() {
        let next = chars[*pos];
        if next.is_ascii_alphanumeric() || next == '-' || next == '_' {
            *pos += 1;
        } else {
            break;
        }
    }
    chars[start..*pos].iter().collect()
}

fn read_attr_value(chars: &[char], pos: &mut usize) -> Option<String> {
    match chars.get(*pos) {
        Some(quote @ ('"' | '\'')) => {
            *pos += 1;
            let start = *pos;
            while *pos < chars.len() && chars[*pos] != *quote {
                *pos += 1;
            }
            if *pos >= chars.len() {
                return None;
            }
            let value: String = chars[start..*pos].iter().collect();
            *pos += 1;
            Some(value)
        }
        Some(_) => {
            let value = read_ident(chars, pos);
            if value.is_empty() { None } else { Some(value) }
        }
        None => None,
    }
}
