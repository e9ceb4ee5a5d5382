//! Arena document tree.
//!
//! `html5ever` parses into an `RcDom`, which is immediately copied into a
//! flat arena of owned nodes addressed by [`NodeId`]. The arena is `Send`,
//! so a document can be held across `.await` points while images resolve.
//!
//! Mutations are applied in two steps: collect the ids to touch with one of
//! the query methods, then mutate. Detached nodes stay in the arena but are
//! no longer reachable from the root.

use std::fmt::Write as _;

use html5ever::tendril::TendrilSink;
use html5ever::tree_builder::TreeBuilderOpts;
use html5ever::{parse_document, ParseOpts};
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};

/// Elements serialized without a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "basefont", "bgsound", "br", "col", "embed", "frame", "hr", "img", "input",
    "keygen", "link", "meta", "param", "source", "track", "wbr",
];

/// Elements whose text children are written without escaping.
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "iframe", "noembed", "noframes", "plaintext", "script", "style", "xmp",
];

/// Handle to a node inside a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Local name, lowercase for HTML elements.
    pub name: String,
    pub attrs: Vec<Attribute>,
}

impl Element {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.iter().any(|a| a.name == name)
    }

    /// Overwrite `name`, appending it if absent.
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|a| a.name == name) {
            Some(attr) => attr.value = value,
            None => self.attrs.push(Attribute {
                name: name.to_string(),
                value,
            }),
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let index = self.attrs.iter().position(|a| a.name == name)?;
        Some(self.attrs.remove(index).value)
    }

    /// True if the whitespace-separated attribute contains `token`
    /// (ASCII case-insensitive), as in `rel="alternate stylesheet"`.
    pub fn has_token(&self, name: &str, token: &str) -> bool {
        self.attr(name).is_some_and(|value| {
            value
                .split_ascii_whitespace()
                .any(|t| t.eq_ignore_ascii_case(token))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Document,
    Doctype { name: String },
    Text(String),
    Comment(String),
    Element(Element),
}

#[derive(Debug)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

/// A parsed HTML document.
#[derive(Debug)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Document {
    /// Parse a complete HTML document.
    ///
    /// Scripting is treated as disabled, so `<noscript>` content is parsed
    /// as markup rather than as a raw text blob.
    pub fn parse(html: &str) -> Self {
        let opts = ParseOpts {
            tree_builder: TreeBuilderOpts {
                scripting_enabled: false,
                ..Default::default()
            },
            ..Default::default()
        };
        let dom = parse_document(RcDom::default(), opts).one(html);

        let mut doc = Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                data: NodeData::Document,
            }],
        };
        doc.import(&dom);
        doc
    }

    // Iterative so that arbitrarily deep upstream markup cannot exhaust the
    // stack. Children are pushed in reverse to keep document order.
    fn import(&mut self, dom: &RcDom) {
        let root = self.root();
        let mut stack: Vec<(Handle, NodeId)> = dom
            .document
            .children
            .borrow()
            .iter()
            .rev()
            .map(|child| (child.clone(), root))
            .collect();

        while let Some((handle, parent)) = stack.pop() {
            let Some(data) = convert(&handle.data) else {
                continue;
            };
            let id = self.push(parent, data);

            stack.extend(handle.children.borrow().iter().rev().map(|c| (c.clone(), id)));
            // <template> keeps its children in a separate fragment, which
            // comes first.
            if let RcNodeData::Element {
                template_contents, ..
            } = &handle.data
            {
                if let Some(fragment) = template_contents.borrow().as_ref() {
                    stack.extend(fragment.children.borrow().iter().rev().map(|c| (c.clone(), id)));
                }
            }
        }
    }

    fn push(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: Some(parent),
            children: Vec::new(),
            data,
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0].data
    }

    pub fn data_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.0].data
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes[id.0].data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes[id.0].data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Every node reachable from the root, in document order, root excluded.
    pub fn descendants(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(self.root()).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    /// Attached elements matching `pred`, in document order.
    pub fn select(&self, pred: impl Fn(&Element) -> bool) -> Vec<NodeId> {
        self.descendants()
            .into_iter()
            .filter(|&id| self.element(id).is_some_and(&pred))
            .collect()
    }

    pub fn elements_named(&self, name: &str) -> Vec<NodeId> {
        self.select(|el| el.name == name)
    }

    /// Unlink `id` (and its subtree) from its parent.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != id);
        }
    }

    /// Move the children of `id` into its parent, immediately before `id`.
    /// `id` itself stays in place, now empty.
    pub fn promote_children(&mut self, id: NodeId) {
        let Some(parent) = self.nodes[id.0].parent else {
            return;
        };
        let children = std::mem::take(&mut self.nodes[id.0].children);
        for &child in &children {
            self.nodes[child.0].parent = Some(parent);
        }
        let siblings = &mut self.nodes[parent.0].children;
        if let Some(at) = siblings.iter().position(|&c| c == id) {
            siblings.splice(at..at, children);
        }
    }

    /// Nesting depth of the deepest attached node; the root is 0.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self.root(), 0usize)];
        while let Some((id, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            stack.extend(self.children(id).iter().map(|&child| (child, depth + 1)));
        }
        deepest
    }

    /// Serialize the document back to HTML.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        let mut stack: Vec<Step> = self
            .children(self.root())
            .iter()
            .rev()
            .map(|&child| Step::Open(child, false))
            .collect();

        while let Some(step) = stack.pop() {
            let (id, raw_text) = match step {
                Step::Open(id, raw_text) => (id, raw_text),
                Step::Close(id) => {
                    if let Some(el) = self.element(id) {
                        let _ = write!(out, "</{}>", el.name);
                    }
                    continue;
                }
            };
            match self.data(id) {
                NodeData::Document => {}
                NodeData::Doctype { name } => {
                    let _ = write!(out, "<!DOCTYPE {}>", name);
                }
                NodeData::Text(text) if raw_text => out.push_str(text),
                NodeData::Text(text) => out.push_str(&html_escape::encode_text(text)),
                NodeData::Comment(text) => {
                    let _ = write!(out, "<!--{}-->", text);
                }
                NodeData::Element(el) => {
                    out.push('<');
                    out.push_str(&el.name);
                    for attr in &el.attrs {
                        let _ = write!(
                            out,
                            " {}=\"{}\"",
                            attr.name,
                            html_escape::encode_double_quoted_attribute(&attr.value)
                        );
                    }
                    out.push('>');

                    if VOID_ELEMENTS.contains(&el.name.as_str()) {
                        continue;
                    }
                    let raw = RAW_TEXT_ELEMENTS.contains(&el.name.as_str());
                    stack.push(Step::Close(id));
                    stack.extend(self.children(id).iter().rev().map(|&child| Step::Open(child, raw)));
                }
            }
        }
        out
    }
}

/// Serializer work item.
enum Step {
    /// Write the node; the flag marks raw-text content.
    Open(NodeId, bool),
    /// Write the end tag of an element.
    Close(NodeId),
}

fn convert(data: &RcNodeData) -> Option<NodeData> {
    let data = match data {
        RcNodeData::Document | RcNodeData::ProcessingInstruction { .. } => return None,
        RcNodeData::Doctype { name, .. } => NodeData::Doctype {
            name: name.to_string(),
        },
        RcNodeData::Text { contents } => NodeData::Text(contents.borrow().to_string()),
        RcNodeData::Comment { contents } => NodeData::Comment(contents.to_string()),
        RcNodeData::Element { name, attrs, .. } => NodeData::Element(Element {
            name: name.local.to_string(),
            attrs: attrs
                .borrow()
                .iter()
                .map(|a| Attribute {
                    name: match &a.name.prefix {
                        Some(prefix) => format!("{}:{}", prefix, a.name.local),
                        None => a.name.local.to_string(),
                    },
                    value: a.value.to_string(),
                })
                .collect(),
        }),
    };
    Some(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_serialize() {
        let doc = Document::parse(
            "<!DOCTYPE html><html><head><title>T &amp; U</title></head>\
             <body><p class=\"x\">a<br>b</p><!-- note --></body></html>",
        );
        assert_eq!(
            doc.serialize(),
            "<!DOCTYPE html><html><head><title>T &amp; U</title></head>\
             <body><p class=\"x\">a<br>b</p><!-- note --></body></html>"
        );
    }

    #[test]
    fn test_raw_text_is_not_escaped() {
        let doc = Document::parse("<style>a > b { color: red }</style><script>if (a < b) {}</script>");
        let html = doc.serialize();
        assert!(html.contains("<style>a > b { color: red }</style>"));
        assert!(html.contains("<script>if (a < b) {}</script>"));
    }

    #[test]
    fn test_attribute_escaping() {
        let doc = Document::parse(r#"<a title='say "hi" & go'>x</a>"#);
        assert!(doc
            .serialize()
            .contains(r#"<a title="say &quot;hi&quot; &amp; go">x</a>"#));
    }

    #[test]
    fn test_noscript_is_parsed_as_markup() {
        let doc = Document::parse("<body><noscript><img src=\"a.png\"></noscript></body>");
        let noscript = doc.elements_named("noscript")[0];
        let img = doc.children(noscript)[0];
        assert_eq!(doc.element(img).unwrap().name, "img");
    }

    #[test]
    fn test_detach_removes_subtree() {
        let mut doc = Document::parse("<body><div><span>gone</span></div><p>kept</p></body>");
        let div = doc.elements_named("div")[0];
        doc.detach(div);
        assert!(doc.elements_named("span").is_empty());
        assert_eq!(
            doc.serialize(),
            "<html><head></head><body><p>kept</p></body></html>"
        );
    }

    #[test]
    fn test_promote_children_keeps_order() {
        let mut doc = Document::parse("<body><b>1</b><noscript><i>2</i><u>3</u></noscript><s>4</s></body>");
        let noscript = doc.elements_named("noscript")[0];
        doc.promote_children(noscript);
        assert!(doc.children(noscript).is_empty());
        doc.detach(noscript);
        assert_eq!(
            doc.serialize(),
            "<html><head></head><body><b>1</b><i>2</i><u>3</u><s>4</s></body></html>"
        );
    }

    #[test]
    fn test_element_attribute_helpers() {
        let mut el = Element {
            name: "link".into(),
            attrs: vec![Attribute {
                name: "rel".into(),
                value: "Alternate  StyleSheet".into(),
            }],
        };
        assert!(el.has_token("rel", "stylesheet"));
        assert!(!el.has_token("rel", "icon"));

        el.set_attr("href", "/a.css");
        el.set_attr("href", "/b.css");
        assert_eq!(el.attr("href"), Some("/b.css"));
        assert_eq!(el.remove_attr("href").as_deref(), Some("/b.css"));
        assert!(!el.has_attr("href"));
    }

    #[test]
    fn test_deeply_nested_markup() {
        let levels = 20_000;
        let doc = Document::parse(&"<div>".repeat(levels));
        assert_eq!(doc.depth(), levels + 2);

        let html = doc.serialize();
        assert_eq!(html.matches("<div>").count(), levels);
        assert_eq!(html.matches("</div>").count(), levels);
        assert!(html.ends_with("</div></body></html>"));
    }

    #[test]
    fn test_template_contents_are_kept() {
        let doc = Document::parse("<body><template><b>x</b></template><p>y</p></body>");
        assert!(doc
            .serialize()
            .contains("<template><b>x</b></template><p>y</p>"));
    }

    #[test]
    fn test_select_in_document_order() {
        let doc = Document::parse("<body><img id=a><div><img id=b></div><img id=c></body>");
        let ids: Vec<_> = doc
            .elements_named("img")
            .into_iter()
            .map(|id| doc.element(id).unwrap().attr("id").unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
