use std::collections::HashMap;

use crate::dom::{Dom, NodeId};
use crate::{Error, Result};

const RED_ZONE: usize = 64 * 1024;
const STACK_GROWTH: usize = 1024 * 1024;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Raw-text elements whose bodies are consumed verbatim up to the matching
/// closing tag.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

pub(crate) fn parse_html(input: &str) -> Result<Dom> {
    let mut dom = Dom::new();
    let mut parser = Parser {
        chars: input.chars().collect(),
        pos: 0,
    };
    let root = dom.root();
    parser.parse_children(&mut dom, root, None)?;
    Ok(dom)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn parse_children(
        &mut self,
        dom: &mut Dom,
        parent: NodeId,
        enclosing_tag: Option<&str>,
    ) -> Result<()> {
        loop {
            if self.at_end() {
                return match enclosing_tag {
                    Some(tag) => Err(Error::HtmlParse(format!("unclosed element <{tag}>"))),
                    None => Ok(()),
                };
            }

            if self.starts_with("</") {
                let close_pos = self.pos;
                self.pos += 2;
                let name = self.read_name()?;
                self.skip_whitespace();
                self.expect('>')?;
                return match enclosing_tag {
                    Some(tag) if tag == name => Ok(()),
                    _ => Err(Error::HtmlParse(format!(
                        "unexpected closing tag </{name}> at offset {close_pos}"
                    ))),
                };
            }

            if self.starts_with("<!--") {
                self.skip_comment()?;
                continue;
            }

            if self.starts_with("<!") {
                self.skip_until('>')?;
                continue;
            }

            if self.peek() == Some('<') {
                self.parse_element(dom, parent)?;
                continue;
            }

            let text = self.read_text();
            if !text.is_empty() {
                dom.create_text(parent, text);
            }
        }
    }

    fn parse_element(&mut self, dom: &mut Dom, parent: NodeId) -> Result<()> {
        self.expect('<')?;
        let tag_name = self.read_name()?;
        let mut attrs = HashMap::new();

        loop {
            self.skip_whitespace();
            match self.peek() {
                Some('>') => {
                    self.pos += 1;
                    break;
                }
                Some('/') => {
                    self.pos += 1;
                    self.skip_whitespace();
                    self.expect('>')?;
                    dom.create_element(parent, tag_name, attrs);
                    return Ok(());
                }
                Some(_) => {
                    let (name, value) = self.read_attr()?;
                    attrs.entry(name).or_insert(value);
                }
                None => {
                    return Err(Error::HtmlParse(format!("unclosed tag <{tag_name}>")));
                }
            }
        }

        let node = dom.create_element(parent, tag_name.clone(), attrs);
        if VOID_ELEMENTS.contains(&tag_name.as_str()) {
            return Ok(());
        }
        if RAW_TEXT_ELEMENTS.contains(&tag_name.as_str()) {
            let body = self.read_raw_text(&tag_name)?;
            if !body.is_empty() {
                dom.create_text(node, body);
            }
            return Ok(());
        }
        stacker::maybe_grow(RED_ZONE, STACK_GROWTH, || {
            self.parse_children(dom, node, Some(&tag_name))
        })
    }

    fn read_attr(&mut self) -> Result<(String, String)> {
        let name = self.read_name()?;
        self.skip_whitespace();
        if self.peek() != Some('=') {
            // Bare boolean attribute.
            return Ok((name, String::new()));
        }
        self.pos += 1;
        self.skip_whitespace();
        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                let start = self.pos;
                while self.peek() != Some(quote) {
                    if self.at_end() {
                        return Err(Error::HtmlParse(format!(
                            "unterminated attribute value for {name}"
                        )));
                    }
                    self.pos += 1;
                }
                let value: String = self.chars[start..self.pos].iter().collect();
                self.pos += 1;
                value
            }
            _ => {
                let start = self.pos;
                while let Some(next) = self.peek() {
                    if next.is_whitespace() || next == '>' || next == '/' {
                        break;
                    }
                    self.pos += 1;
                }
                self.chars[start..self.pos].iter().collect()
            }
        };
        Ok((name, value))
    }

    fn read_name(&mut self) -> Result<String> {
        let start = self.pos;
        while let Some(next) = self.peek() {
            if next.is_ascii_alphanumeric() || next == '-' || next == '_' || next == ':' {
                self.pos += 1;
            } else {
                break;
            }
        }
        if self.pos == start {
            return Err(Error::HtmlParse(format!(
                "expected a name at offset {start}"
            )));
        }
        let name: String = self.chars[start..self.pos].iter().collect();
        Ok(name.to_ascii_lowercase())
    }

    fn read_text(&mut self) -> String {
        let start = self.pos;
        while let Some(next) = self.peek() {
            if next == '<' {
                break;
            }
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn read_raw_text(&mut self, tag_name: &str) -> Result<String> {
        let closing = format!("</{tag_name}");
        let start = self.pos;
        while !self.at_end() {
            if self.starts_with(&closing) {
                let body: String = self.chars[start..self.pos].iter().collect();
                self.pos += closing.chars().count();
                self.skip_whitespace();
                self.expect('>')?;
                return Ok(body);
            }
            self.pos += 1;
        }
        Err(Error::HtmlParse(format!("unclosed element <{tag_name}>")))
    }

    fn skip_comment(&mut self) -> Result<()> {
        let start = self.pos;
        self.pos += 4;
        while !self.at_end() {
            if self.starts_with("-->") {
                self.pos += 3;
                return Ok(());
            }
            self.pos += 1;
        }
        Err(Error::HtmlParse(format!(
            "unterminated comment at offset {start}"
        )))
    }

    fn skip_until(&mut self, stop: char) -> Result<()> {
        while let Some(next) = self.peek() {
            self.pos += 1;
            if next == stop {
                return Ok(());
            }
        }
        Err(Error::HtmlParse(format!("expected '{stop}' before end")))
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, wanted: char) -> Result<()> {
        if self.peek() == Some(wanted) {
            self.pos += 1;
            Ok(())
        } else {
            Err(Error::HtmlParse(format!(
                "expected '{wanted}' at offset {}",
                self.pos
            )))
        }
    }

    fn starts_with(&self, prefix: &str) -> bool {
        let mut pos = self.pos;
        for wanted in prefix.chars() {
            if self.chars.get(pos) != Some(&wanted) {
                return false;
            }
            pos += 1;
        }
        true
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }
}
