//! Namespace-aware XML element tree
//!
//! CSW responses are small enough to load fully, so they are parsed into an
//! owned tree with every element tagged by its resolved namespace URI. Lookups
//! go through [`Step`] paths so namespace URIs never leak into mapping code.

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace as ResolvedNamespace, ResolveResult};
use quick_xml::NsReader;

use geonode_core::error::{GeonodeError, Result};

/// XML namespaces used by CSW 2.0.2 responses in the ISO 19139 schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Csw,
    Gco,
    Gmd,
    Gml,
    Ows,
}

impl Namespace {
    pub fn uri(&self) -> &'static str {
        match self {
            Namespace::Csw => "http://www.opengis.net/cat/csw/2.0.2",
            Namespace::Gco => "http://www.isotc211.org/2005/gco",
            Namespace::Gmd => "http://www.isotc211.org/2005/gmd",
            Namespace::Gml => "http://www.opengis.net/gml",
            Namespace::Ows => "http://www.opengis.net/ows",
        }
    }
}

/// One namespace-qualified step of an element path
pub type Step = (Namespace, &'static str);

pub const fn csw(name: &'static str) -> Step {
    (Namespace::Csw, name)
}

pub const fn gco(name: &'static str) -> Step {
    (Namespace::Gco, name)
}

pub const fn gmd(name: &'static str) -> Step {
    (Namespace::Gmd, name)
}

pub const fn gml(name: &'static str) -> Step {
    (Namespace::Gml, name)
}

pub const fn ows(name: &'static str) -> Step {
    (Namespace::Ows, name)
}

/// An owned XML element
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    namespace: Option<String>,
    name: String,
    attributes: Vec<(String, String)>,
    text: String,
    children: Vec<Element>,
}

impl Element {
    /// Parse a document and return its root element
    pub fn parse(xml: &str) -> Result<Element> {
        let mut reader = NsReader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let (resolved, event) =
                reader.read_resolved_event().map_err(|e| GeonodeError::Xml(e.to_string()))?;

            match event {
                Event::Start(start) => {
                    stack.push(Element::open(resolved, &start)?);
                }
                Event::Empty(start) => {
                    let element = Element::open(resolved, &start)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| GeonodeError::Xml("unbalanced closing tag".to_string()))?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(text) => {
                    if let Some(current) = stack.last_mut() {
                        let unescaped =
                            text.unescape().map_err(|e| GeonodeError::Xml(e.to_string()))?;
                        current.text.push_str(&unescaped);
                    }
                }
                Event::CData(data) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&String::from_utf8_lossy(&data));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(open) = stack.last() {
            return Err(GeonodeError::Xml(format!("element <{}> is never closed", open.name)));
        }

        root.ok_or_else(|| GeonodeError::Xml("document has no root element".to_string()))
    }

    fn open(resolved: ResolveResult, start: &BytesStart) -> Result<Element> {
        let namespace = match resolved {
            ResolveResult::Bound(ResolvedNamespace(uri)) => {
                Some(String::from_utf8_lossy(uri).into_owned())
            }
            _ => None,
        };

        let mut attributes = Vec::new();
        for attribute in start.attributes() {
            let attribute = attribute.map_err(|e| GeonodeError::Xml(e.to_string()))?;
            let key = String::from_utf8_lossy(attribute.key.local_name().as_ref()).into_owned();
            let value = attribute
                .unescape_value()
                .map_err(|e| GeonodeError::Xml(e.to_string()))?
                .into_owned();
            attributes.push((key, value));
        }

        Ok(Element {
            namespace,
            name: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
            attributes,
            text: String::new(),
            children: Vec::new(),
        })
    }

    /// Local (unprefixed) element name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn is(&self, step: Step) -> bool {
        self.name == step.1 && self.namespace.as_deref() == Some(step.0.uri())
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    pub fn child(&self, step: Step) -> Option<&Element> {
        self.children.iter().find(|child| child.is(step))
    }

    pub fn has_child(&self, step: Step) -> bool {
        self.child(step).is_some()
    }

    /// All elements reached by following `path` from this element
    pub fn find_all(&self, path: &[Step]) -> Vec<&Element> {
        let mut current = vec![self];
        for step in path {
            current = current
                .into_iter()
                .flat_map(|element| element.children.iter().filter(|child| child.is(*step)))
                .collect();
        }
        current
    }

    /// First element reached by following `path`, in document order
    pub fn find(&self, path: &[Step]) -> Option<&Element> {
        self.find_all(path).into_iter().next()
    }

    /// Trimmed text of the first element reached by `path`, if not blank
    pub fn find_text(&self, path: &[Step]) -> Option<&str> {
        self.find(path).and_then(Element::text)
    }

    /// Every descendant matching `step`, in document order
    pub fn descendants(&self, step: Step) -> Vec<&Element> {
        let mut found = Vec::new();
        self.collect_descendants(step, &mut found);
        found
    }

    fn collect_descendants<'a>(&'a self, step: Step, found: &mut Vec<&'a Element>) {
        for child in &self.children {
            if child.is(step) {
                found.push(child);
            }
            child.collect_descendants(step, found);
        }
    }

    /// Trimmed text content, `None` when blank
    pub fn text(&self) -> Option<&str> {
        let trimmed = self.text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    }

    /// Attribute value by local name
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => {
            return Err(GeonodeError::Xml(format!(
                "unexpected second root element <{}>",
                element.name
            )))
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gmd:MD_Metadata xmlns:gmd="http://www.isotc211.org/2005/gmd"
                 xmlns:gco="http://www.isotc211.org/2005/gco">
  <gmd:fileIdentifier>
    <gco:CharacterString> abc </gco:CharacterString>
  </gmd:fileIdentifier>
  <gmd:keyword><gco:CharacterString>one</gco:CharacterString></gmd:keyword>
  <gmd:nested>
    <gmd:keyword><gco:CharacterString>two &amp; three</gco:CharacterString></gmd:keyword>
  </gmd:nested>
  <gmd:contentInfo><gmd:MD_CoverageDescription/></gmd:contentInfo>
  <gmd:code codeListValue="license"><![CDATA[raw <text>]]></gmd:code>
  <other:keyword xmlns:other="urn:other">ignored</other:keyword>
</gmd:MD_Metadata>"#;

    #[test]
    fn test_parse_resolves_namespaces() {
        let root = Element::parse(DOC).unwrap();

        assert!(root.is(gmd("MD_Metadata")));
        assert_eq!(root.namespace(), Some(Namespace::Gmd.uri()));
        assert_eq!(root.find_text(&[gmd("fileIdentifier"), gco("CharacterString")]), Some("abc"));
    }

    #[test]
    fn test_descendants_in_document_order() {
        let root = Element::parse(DOC).unwrap();

        let keywords: Vec<&str> = root
            .descendants(gmd("keyword"))
            .into_iter()
            .filter_map(|k| k.find_text(&[gco("CharacterString")]))
            .collect();

        assert_eq!(keywords, vec!["one", "two & three"]);
    }

    #[test]
    fn test_empty_element_is_present() {
        let root = Element::parse(DOC).unwrap();
        let content = root.child(gmd("contentInfo")).unwrap();

        assert!(content.has_child(gmd("MD_CoverageDescription")));
        assert!(!content.has_child(gmd("MD_FeatureCatalogueDescription")));
    }

    #[test]
    fn test_attributes_and_cdata() {
        let root = Element::parse(DOC).unwrap();
        let code = root.child(gmd("code")).unwrap();

        assert_eq!(code.attribute("codeListValue"), Some("license"));
        assert_eq!(code.text(), Some("raw <text>"));
    }

    #[test]
    fn test_find_all_follows_every_branch() {
        let xml = r#"<a:root xmlns:a="http://www.isotc211.org/2005/gmd">
            <a:onLine><a:CI_OnlineResource/></a:onLine>
            <a:onLine><a:CI_OnlineResource/><a:CI_OnlineResource/></a:onLine>
        </a:root>"#;
        let root = Element::parse(xml).unwrap();

        assert_eq!(root.find_all(&[gmd("onLine"), gmd("CI_OnlineResource")]).len(), 3);
        assert!(root.find(&[gmd("missing")]).is_none());
    }

    #[test]
    fn test_malformed_documents_are_rejected() {
        assert!(matches!(Element::parse("<a><b></a>"), Err(GeonodeError::Xml(_))));
        assert!(matches!(Element::parse("<a>"), Err(GeonodeError::Xml(_))));
        assert!(matches!(Element::parse(""), Err(GeonodeError::Xml(_))));
    }
}
