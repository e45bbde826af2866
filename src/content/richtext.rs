//! Structured rich text and its conversion to plain text and HTML
//!
//! HTML is produced by handing an event stream to `pulldown-cmark`'s HTML
//! writer, which owns escaping of text, attributes and URLs.

use std::cmp::Reverse;
use std::collections::BTreeSet;

use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, HeadingLevel, LinkType, Tag, TagEnd};
use serde::Deserialize;

use crate::helpers::{is_safe_link, link_resolver};
use crate::prismic::null_default;

/// An ordered sequence of rich text blocks
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct RichText(pub Vec<RichTextNode>);

/// A single block of rich text
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RichTextNode {
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default, deserialize_with = "null_default")]
    pub text: String,
    #[serde(default, deserialize_with = "null_default")]
    pub spans: Vec<Span>,
    /// Image source, for image blocks
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub alt: Option<String>,
    #[serde(default)]
    pub oembed: Option<Oembed>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum NodeKind {
    #[serde(rename = "heading1")]
    Heading1,
    #[serde(rename = "heading2")]
    Heading2,
    #[serde(rename = "heading3")]
    Heading3,
    #[serde(rename = "heading4")]
    Heading4,
    #[serde(rename = "heading5")]
    Heading5,
    #[serde(rename = "heading6")]
    Heading6,
    #[serde(rename = "paragraph")]
    Paragraph,
    #[serde(rename = "preformatted")]
    Preformatted,
    #[serde(rename = "list-item")]
    ListItem,
    #[serde(rename = "o-list-item")]
    OrderedListItem,
    #[serde(rename = "image")]
    Image,
    #[serde(rename = "embed")]
    Embed,
    #[serde(other)]
    Unsupported,
}

impl NodeKind {
    fn heading_level(self) -> Option<HeadingLevel> {
        match self {
            NodeKind::Heading1 => Some(HeadingLevel::H1),
            NodeKind::Heading2 => Some(HeadingLevel::H2),
            NodeKind::Heading3 => Some(HeadingLevel::H3),
            NodeKind::Heading4 => Some(HeadingLevel::H4),
            NodeKind::Heading5 => Some(HeadingLevel::H5),
            NodeKind::Heading6 => Some(HeadingLevel::H6),
            _ => None,
        }
    }

    fn has_text(self) -> bool {
        !matches!(
            self,
            NodeKind::Image | NodeKind::Embed | NodeKind::Unsupported
        )
    }
}

/// Inline formatting over a range of a block's text
///
/// `start` and `end` are UTF-16 code unit offsets, as the editor records them.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    #[serde(rename = "type")]
    pub kind: SpanKind,
    #[serde(default)]
    pub data: Option<SpanData>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanKind {
    Strong,
    Em,
    Hyperlink,
    Label,
    #[serde(other)]
    Other,
}

/// Link target of a hyperlink span (or label of a label span)
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SpanData {
    #[serde(default)]
    pub link_type: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(rename = "type", default)]
    pub doc_type: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
}

impl SpanData {
    /// Resolve the href of a hyperlink
    fn href(&self) -> Option<String> {
        match self.link_type.as_deref() {
            Some("Document") => Some(link_resolver(
                self.doc_type.as_deref().unwrap_or_default(),
                self.uid.as_deref(),
            )),
            _ => self.url.clone().filter(|url| is_safe_link(url)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Oembed {
    #[serde(default)]
    pub embed_url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Unordered,
    Ordered,
}

/// An inline span resolved to byte offsets
struct Inline {
    start: usize,
    end: usize,
    kind: SpanKind,
    href: Option<String>,
}

impl Inline {
    fn start_event(&self) -> Event<'static> {
        match self.kind {
            SpanKind::Strong => Event::Start(Tag::Strong),
            SpanKind::Em => Event::Start(Tag::Emphasis),
            _ => Event::Start(Tag::Link {
                link_type: LinkType::Inline,
                dest_url: CowStr::from(self.href.clone().unwrap_or_default()),
                title: CowStr::Borrowed(""),
                id: CowStr::Borrowed(""),
            }),
        }
    }

    fn end_event(&self) -> Event<'static> {
        match self.kind {
            SpanKind::Strong => Event::End(TagEnd::Strong),
            SpanKind::Em => Event::End(TagEnd::Emphasis),
            _ => Event::End(TagEnd::Link),
        }
    }
}

impl RichText {
    pub fn nodes(&self) -> &[RichTextNode] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when anything would be shown: non-blank text, an image or an embed
    pub fn has_content(&self) -> bool {
        self.0.iter().any(|node| match node.kind {
            NodeKind::Image | NodeKind::Embed => true,
            NodeKind::Unsupported => false,
            _ => !node.text.trim().is_empty(),
        })
    }

    /// Plain text of every text block, joined by a single space
    pub fn as_text(&self) -> String {
        self.0
            .iter()
            .filter(|node| node.kind.has_text())
            .map(|node| node.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Render to HTML
    pub fn as_html(&self) -> String {
        let mut events: Vec<Event> = Vec::new();
        let mut open_list: Option<ListKind> = None;

        for node in &self.0 {
            let list = match node.kind {
                NodeKind::ListItem => Some(ListKind::Unordered),
                NodeKind::OrderedListItem => Some(ListKind::Ordered),
                _ => None,
            };

            if open_list != list {
                if let Some(kind) = open_list.take() {
                    events.push(Event::End(TagEnd::List(kind == ListKind::Ordered)));
                }
                if let Some(kind) = list {
                    let start = match kind {
                        ListKind::Ordered => Some(1),
                        ListKind::Unordered => None,
                    };
                    events.push(Event::Start(Tag::List(start)));
                    open_list = Some(kind);
                }
            }

            node_events(node, &mut events);
        }

        if let Some(kind) = open_list {
            events.push(Event::End(TagEnd::List(kind == ListKind::Ordered)));
        }

        let mut html_output = String::new();
        html::push_html(&mut html_output, events.into_iter());
        html_output
    }
}

fn node_events<'a>(node: &'a RichTextNode, events: &mut Vec<Event<'a>>) {
    if let Some(level) = node.kind.heading_level() {
        events.push(Event::Start(Tag::Heading {
            level,
            id: None,
            classes: Vec::new(),
            attrs: Vec::new(),
        }));
        inline_events(&node.text, &node.spans, true, events);
        events.push(Event::End(TagEnd::Heading(level)));
        return;
    }

    match node.kind {
        NodeKind::Paragraph => {
            events.push(Event::Start(Tag::Paragraph));
            inline_events(&node.text, &node.spans, true, events);
            events.push(Event::End(TagEnd::Paragraph));
        }
        NodeKind::Preformatted => {
            events.push(Event::Start(Tag::CodeBlock(CodeBlockKind::Indented)));
            inline_events(&node.text, &node.spans, false, events);
            events.push(Event::End(TagEnd::CodeBlock));
        }
        NodeKind::ListItem | NodeKind::OrderedListItem => {
            events.push(Event::Start(Tag::Item));
            inline_events(&node.text, &node.spans, true, events);
            events.push(Event::End(TagEnd::Item));
        }
        NodeKind::Image => {
            let Some(url) = node.url.as_deref().filter(|url| is_safe_link(url)) else {
                return;
            };
            events.push(Event::Start(Tag::Paragraph));
            events.push(Event::Start(Tag::Image {
                link_type: LinkType::Inline,
                dest_url: CowStr::Borrowed(url),
                title: CowStr::Borrowed(""),
                id: CowStr::Borrowed(""),
            }));
            if let Some(alt) = node.alt.as_deref() {
                events.push(Event::Text(CowStr::Borrowed(alt)));
            }
            events.push(Event::End(TagEnd::Image));
            events.push(Event::End(TagEnd::Paragraph));
        }
        NodeKind::Embed => {
            let Some(oembed) = &node.oembed else {
                return;
            };
            let Some(url) = oembed.embed_url.as_deref().filter(|url| is_safe_link(url)) else {
                return;
            };
            let label = oembed.title.as_deref().unwrap_or(url);
            events.push(Event::Start(Tag::Paragraph));
            events.push(Event::Start(Tag::Link {
                link_type: LinkType::Inline,
                dest_url: CowStr::Borrowed(url),
                title: CowStr::Borrowed(""),
                id: CowStr::Borrowed(""),
            }));
            events.push(Event::Text(CowStr::Borrowed(label)));
            events.push(Event::End(TagEnd::Link));
            events.push(Event::End(TagEnd::Paragraph));
        }
        _ => {}
    }
}

/// Emit text with its spans, re-nesting spans that overlap
fn inline_events<'a>(text: &'a str, spans: &[Span], hard_breaks: bool, events: &mut Vec<Event<'a>>) {
    let inlines: Vec<Inline> = spans
        .iter()
        .filter_map(|span| {
            let href = match span.kind {
                SpanKind::Strong | SpanKind::Em => None,
                SpanKind::Hyperlink => Some(span.data.as_ref()?.href()?),
                SpanKind::Label | SpanKind::Other => return None,
            };
            let start = byte_offset(text, span.start);
            let end = byte_offset(text, span.end);
            (start < end).then_some(Inline {
                start,
                end,
                kind: span.kind,
                href,
            })
        })
        .collect();

    let mut boundaries: BTreeSet<usize> = BTreeSet::from([0, text.len()]);
    for inline in &inlines {
        boundaries.insert(inline.start);
        boundaries.insert(inline.end);
    }
    let boundaries: Vec<usize> = boundaries.into_iter().collect();

    let mut stack: Vec<usize> = Vec::new();
    for window in boundaries.windows(2) {
        let (from, to) = (window[0], window[1]);

        let mut active: Vec<usize> = (0..inlines.len())
            .filter(|&i| inlines[i].start <= from && inlines[i].end >= to)
            .collect();
        active.sort_by_key(|&i| (inlines[i].start, Reverse(inlines[i].end), i));

        let common = stack
            .iter()
            .zip(active.iter())
            .take_while(|(a, b)| a == b)
            .count();
        while stack.len() > common {
            if let Some(i) = stack.pop() {
                events.push(inlines[i].end_event());
            }
        }
        for &i in &active[common..] {
            events.push(inlines[i].start_event());
            stack.push(i);
        }

        text_events(&text[from..to], hard_breaks, events);
    }

    while let Some(i) = stack.pop() {
        events.push(inlines[i].end_event());
    }
}

fn text_events<'a>(text: &'a str, hard_breaks: bool, events: &mut Vec<Event<'a>>) {
    if !hard_breaks {
        if !text.is_empty() {
            events.push(Event::Text(CowStr::Borrowed(text)));
        }
        return;
    }

    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            events.push(Event::HardBreak);
        }
        if !line.is_empty() {
            events.push(Event::Text(CowStr::Borrowed(line)));
        }
    }
}

/// Convert a UTF-16 offset into a byte offset on a char boundary
fn byte_offset(text: &str, utf16_offset: usize) -> usize {
    let mut units = 0;
    for (index, c) in text.char_indices() {
        if units >= utf16_offset {
            return index;
        }
        units += c.len_utf16();
    }
    text.len()
}
