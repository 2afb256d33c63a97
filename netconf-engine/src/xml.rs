//! Minimal, lenient element tree used to read incoming requests and hellos.
//!
//! Lookups are keyed on local names, so namespace prefixes and `xmlns`
//! declarations do not matter. Anything that is not well formed XML yields
//! `None` instead of an error; callers decide on the fallback.

use log::debug;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Element>,
    text: String,
}

impl Element {
    pub fn parse(xml: &str) -> Option<Element> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut stack: Vec<Element> = Vec::new();
        loop {
            let element = match reader.read_event() {
                Ok(Event::Start(start)) => {
                    stack.push(Element::from_start(&start));
                    continue;
                }
                Ok(Event::Empty(start)) => Element::from_start(&start),
                Ok(Event::End(_)) => stack.pop()?,
                Ok(Event::Text(text)) => {
                    if let (Some(current), Ok(text)) = (stack.last_mut(), text.unescape()) {
                        current.text.push_str(&text);
                    }
                    continue;
                }
                Ok(Event::CData(data)) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&String::from_utf8_lossy(&data));
                    }
                    continue;
                }
                Ok(Event::Eof) => return None,
                Ok(_) => continue,
                Err(err) => {
                    debug!(
                        "Unparsable xml at position {}: {}",
                        reader.buffer_position(),
                        err
                    );
                    return None;
                }
            };
            match stack.last_mut() {
                Some(parent) => parent.children.push(element),
                None => return Some(element),
            }
        }
    }

    fn from_start(start: &BytesStart) -> Element {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).to_string();
        let attributes = start
            .attributes()
            .flatten()
            .map(|attr| {
                let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).to_string();
                let value = attr
                    .unescape_value()
                    .map(|value| value.to_string())
                    .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).to_string());
                (key, value)
            })
            .collect();
        Element {
            name,
            attributes,
            children: Vec::new(),
            text: String::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        self.text.trim()
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|child| child.name == name)
    }

    /// Text of the named direct child, `None` when absent or empty.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name)
            .map(Element::text)
            .filter(|text| !text.is_empty())
    }

    /// All descendants with the given name, depth first, stopping at matches.
    pub fn find_all<'a>(&'a self, name: &str) -> Vec<&'a Element> {
        let mut found = Vec::new();
        self.collect(name, &mut found);
        found
    }

    fn collect<'a>(&'a self, name: &str, found: &mut Vec<&'a Element>) {
        for child in &self.children {
            if child.name == name {
                found.push(child);
            } else {
                child.collect(name, found);
            }
        }
    }
}
