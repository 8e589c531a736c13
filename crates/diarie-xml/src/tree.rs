//! A small owned element tree built with `quick-xml`'s pull reader.
//!
//! Case documents are a few kilobytes at most, so the whole document is read
//! into memory and queried by element name. Namespace prefixes are dropped.

use std::fmt::Display;

use quick_xml::{
  Reader,
  events::{BytesStart, Event},
};

use crate::error::{Error, Result};

#[derive(Debug, Default)]
pub(crate) struct Element {
  pub name:       String,
  pub attributes: Vec<(String, String)>,
  /// Direct text content, trimmed.
  pub text:       String,
  pub children:   Vec<Element>,
}

impl Element {
  fn open(start: &BytesStart<'_>) -> Result<Self> {
    let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in start.attributes() {
      let attr = attr.map_err(xml_err)?;
      let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
      let value = attr.unescape_value().map_err(xml_err)?.into_owned();
      attributes.push((key, value));
    }
    Ok(Self { name, attributes, ..Self::default() })
  }

  pub fn child(&self, name: &str) -> Option<&Element> {
    self.children.iter().find(|c| c.name == name)
  }

  /// Text of the first child named `name`; empty when there is none.
  pub fn child_text(&self, name: &str) -> &str {
    self.child(name).map_or("", |c| c.text.as_str())
  }

  pub fn attribute(&self, name: &str) -> Option<&str> {
    self
      .attributes
      .iter()
      .find(|(k, _)| k == name)
      .map(|(_, v)| v.as_str())
  }

  /// First element named `name` in document order, `self` included.
  pub fn find(&self, name: &str) -> Option<&Element> {
    if self.name == name {
      return Some(self);
    }
    self.children.iter().find_map(|c| c.find(name))
  }

  /// Every element below `self` named `name`, in document order.
  pub fn descendants<'a>(&'a self, name: &str) -> Vec<&'a Element> {
    fn walk<'a>(el: &'a Element, name: &str, out: &mut Vec<&'a Element>) {
      for child in &el.children {
        if child.name == name {
          out.push(child);
        }
        walk(child, name, out);
      }
    }
    let mut out = Vec::new();
    walk(self, name, &mut out);
    out
  }
}

fn xml_err(e: impl Display) -> Error { Error::Xml(e.to_string()) }

/// Parse `input` into its root element.
pub(crate) fn parse_document(input: &str) -> Result<Element> {
  let mut reader = Reader::from_str(input);
  reader.config_mut().trim_text(true);

  let mut stack: Vec<Element> = Vec::new();
  let mut root: Option<Element> = None;

  let mut close = |el: Element, stack: &mut Vec<Element>| -> Result<()> {
    match stack.last_mut() {
      Some(parent) => parent.children.push(el),
      None if root.is_none() => root = Some(el),
      None => return Err(Error::Xml(format!("second root element <{}>", el.name))),
    }
    Ok(())
  };

  loop {
    match reader.read_event().map_err(xml_err)? {
      Event::Start(ref e) => stack.push(Element::open(e)?),
      Event::Empty(ref e) => close(Element::open(e)?, &mut stack)?,
      Event::End(_) => {
        let el = stack
          .pop()
          .ok_or_else(|| Error::Xml("unbalanced end tag".into()))?;
        close(el, &mut stack)?;
      }
      Event::Text(ref e) => {
        if let Some(top) = stack.last_mut() {
          top.text.push_str(&e.unescape().map_err(xml_err)?);
        }
      }
      Event::CData(ref e) => {
        if let Some(top) = stack.last_mut() {
          top.text.push_str(String::from_utf8_lossy(e).trim());
        }
      }
      Event::Eof => break,
      _ => {}
    }
  }

  if let Some(open) = stack.last() {
    return Err(Error::Xml(format!("document ends inside <{}>", open.name)));
  }
  root.ok_or_else(|| Error::Xml("document has no root element".into()))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn builds_nested_tree_without_prefixes() {
    let doc = parse_document(
      r#"<?xml version="1.0"?>
         <x:Export xmlns:x="urn:example">
           <Post nr="1">ett &amp; två</Post>
           <Post nr="2"><Inre/></Post>
         </x:Export>"#,
    )
    .unwrap();

    assert_eq!(doc.name, "Export");
    assert_eq!(doc.children.len(), 2);
    assert_eq!(doc.child_text("Post"), "ett & två");
    assert_eq!(doc.children[1].attribute("nr"), Some("2"));
    assert_eq!(doc.descendants("Inre").len(), 1);
    assert_eq!(doc.child_text("Saknas"), "");
  }

  #[test]
  fn find_includes_the_element_itself() {
    let doc = parse_document("<AErende><Diarienummer>5</Diarienummer></AErende>").unwrap();
    assert_eq!(doc.find("AErende").map(|e| e.name.as_str()), Some("AErende"));
  }

  #[test]
  fn truncated_and_mismatched_documents_are_rejected() {
    assert!(matches!(parse_document("<a><b></b>"), Err(Error::Xml(_))));
    assert!(matches!(parse_document("<a><b></a>"), Err(Error::Xml(_))));
    assert!(matches!(parse_document(""), Err(Error::Xml(_))));
  }
}
