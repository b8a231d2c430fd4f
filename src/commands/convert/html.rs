use std::fmt::Write as _;

use html_escape::{encode_double_quoted_attribute, encode_text};

use super::*;

const UNRESOLVED_CAVEAT: &str = "not listed in the table of contents";
const STYLE: &str = ".caveat { color: #a40000; font-style: italic; }";
const STRAY_CAVEAT: &str = "The reference marks of the following footnotes could not be \
located in the text; they are listed here so that nothing is lost.";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Html(String),
    Pre(String),
    Tag(Tag),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Tag {
    name: &'static str,
    attributes: Vec<(&'static str, String)>,
    children: Vec<Node>,
}

impl Tag {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    fn attr(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.attributes.push((name, value.into()));
        self
    }

    fn html(mut self, markup: impl Into<String>) -> Self {
        self.children.push(Node::Html(markup.into()));
        self
    }

    fn child(mut self, tag: Tag) -> Self {
        self.children.push(Node::Tag(tag));
        self
    }

    fn push(&mut self, tag: Tag) {
        self.children.push(Node::Tag(tag));
    }

    fn render(&self, depth: usize, out: &mut String) {
        let indent = "  ".repeat(depth);
        let _ = write!(out, "{indent}<{}", self.name);
        for (name, value) in &self.attributes {
            let value = encode_double_quoted_attribute(value);
            let _ = write!(out, " {name}=\"{value}\"");
        }
        out.push_str(">\n");

        for child in &self.children {
            match child {
                Node::Html(markup) => {
                    for line in markup.lines() {
                        let _ = writeln!(out, "{indent}  {line}");
                    }
                }
                Node::Pre(text) => {
                    let _ = writeln!(out, "{indent}  <pre>{text}</pre>");
                }
                Node::Tag(tag) => tag.render(depth + 1, out),
            }
        }

        let _ = writeln!(out, "{indent}</{}>", self.name);
    }
}

fn inline_html(text: &RichText) -> String {
    let mut out = String::new();
    for run in &text.runs {
        match run {
            Inline::Text(value) => out.push_str(&encode_text(value)),
            Inline::FootnoteMarker(number) => {
                let _ = write!(
                    out,
                    "<a href=\"#{}\" class=\"footnote\">{number})</a>",
                    footnote_anchor_id(*number)
                );
            }
            Inline::Link { target, label } => {
                let _ = write!(
                    out,
                    "<a href=\"{}\">{}</a>",
                    encode_double_quoted_attribute(&target.href()),
                    encode_text(label)
                );
            }
        }
    }
    out
}

fn self_link(id: &str, label: &str) -> String {
    format!(
        "<a href=\"#{}\">{}</a>",
        encode_double_quoted_attribute(id),
        encode_text(label)
    )
}

pub fn render_document(document: &Document) -> String {
    let head = Tag::new("head")
        .html("<meta charset=\"utf-8\">")
        .child(Tag::new("style").html(STYLE))
        .child(Tag::new("title").html(encode_text(&document.title)));

    let mut body = Tag::new("body");
    for part in document.parts() {
        match part {
            Part::Cover { title, section } => {
                body.push(Tag::new("h1").html(encode_text(title)));
                render_section(&mut body, "cover", section);
            }
            Part::Abstract(r#abstract) => render_abstract(&mut body, r#abstract),
            Part::Contents(toc) => render_toc(&mut body, toc),
            Part::Section { name, section } => render_section(&mut body, name, section),
        }
    }

    let html = Tag::new("html").attr("lang", "en").child(head).child(body);
    let mut out = String::from("<!DOCTYPE html>\n");
    html.render(0, &mut out);
    out
}

fn render_abstract(body: &mut Tag, r#abstract: &Abstract) {
    body.push(
        Tag::new("h1")
            .attr("id", r#abstract.title.as_str())
            .html(self_link(&r#abstract.title, &r#abstract.title)),
    );
    body.push(Tag::new("p").html(encode_text(&r#abstract.note)));
    for paragraph in &r#abstract.paragraphs {
        body.push(Tag::new("p").html(inline_html(&paragraph.text)));
    }
}

fn render_toc(body: &mut Tag, toc: &TableOfContents) {
    body.push(
        Tag::new("h1")
            .attr("id", toc.heading.as_str())
            .html(self_link(&toc.heading, &toc.heading)),
    );

    let mut position = 0usize;
    while let Some(first) = toc.entries.get(position) {
        body.push(toc_list(&toc.entries, &mut position, first.level));
    }
}

fn toc_list(entries: &[TocEntry], position: &mut usize, level: usize) -> Tag {
    let mut list = Tag::new("ul");
    while let Some(entry) = entries.get(*position) {
        if entry.level < level {
            break;
        }

        if entry.level > level {
            let nested = toc_list(entries, position, entry.level);
            match list.children.last_mut() {
                Some(Node::Tag(item)) => item.push(nested),
                _ => list.push(Tag::new("li").child(nested)),
            }
            continue;
        }

        let link = self_link(&entry.anchor_id(), &entry.title_text());
        let markup = match &entry.number {
            Some(number) => format!("{} {}", encode_text(number), link),
            None => link,
        };
        list.push(Tag::new("li").html(markup));
        *position += 1;
    }
    list
}

fn render_section(body: &mut Tag, name: &'static str, section: &MergedSection) {
    let mut container = Tag::new("section").attr("class", name);
    let mut clause = name.to_string();
    render_elements(&mut container, &section.elements, &mut clause);

    let (anchored, stray): (Vec<&Footnote>, Vec<&Footnote>) = section
        .footnotes
        .values()
        .partition(|footnote| !section.stray.contains(&footnote.number));

    if !anchored.is_empty() {
        let mut list = Tag::new("div").attr("class", "footnotes");
        for footnote in anchored {
            list.push(footnote_block(footnote));
        }
        container.push(list);
    }

    if !stray.is_empty() {
        let mut list = Tag::new("div")
            .attr("class", "stray-footnotes")
            .child(Tag::new("p").attr("class", "caveat").html(encode_text(STRAY_CAVEAT)));
        for footnote in stray {
            list.push(footnote_block(footnote));
        }
        container.push(list);
    }

    body.push(container);
}

fn footnote_block(footnote: &Footnote) -> Tag {
    let id = footnote_anchor_id(footnote.number);
    let mut block = Tag::new("div")
        .attr("class", "footnote")
        .attr("id", id.as_str())
        .child(Tag::new("p").html(self_link(&id, &format!("{})", footnote.number))));
    let mut clause = id;
    render_elements(&mut block, &footnote.elements, &mut clause);
    block
}

fn render_elements(parent: &mut Tag, elements: &[Element], clause: &mut String) {
    let mut index = 0usize;
    while index < elements.len() {
        let run = elements[index..]
            .iter()
            .take_while(|element| {
                std::mem::discriminant(*element) == std::mem::discriminant(&elements[index])
            })
            .count();
        let group = &elements[index..index + run];

        match &elements[index] {
            Element::ListItem(_) => {
                let items = group
                    .iter()
                    .filter_map(|element| match element {
                        Element::ListItem(item) => Some(item),
                        _ => None,
                    })
                    .collect::<Vec<&ListItem>>();
                let mut position = 0usize;
                while let Some(first) = items.get(position) {
                    parent.push(item_list(&items, &mut position, first.level));
                }
                index += run;
            }
            Element::Definition(_) => {
                let mut list = Tag::new("dl");
                for element in group {
                    if let Element::Definition(definition) = element {
                        list.push(Tag::new("dt").html(encode_text(&definition.term)));
                        list.push(Tag::new("dd").html(inline_html(&definition.text)));
                    }
                }
                parent.push(list);
                index += run;
            }
            Element::TableRow(_) => {
                let mut table = Tag::new("table");
                for element in group {
                    if let Element::TableRow(row) = element {
                        let mut tr = Tag::new("tr");
                        for cell in &row.cells {
                            tr.push(Tag::new("td").html(inline_html(cell)));
                        }
                        table.push(tr);
                    }
                }
                parent.push(table);
                index += run;
            }
            Element::Heading(heading) => {
                *clause = heading.anchor_id();
                parent.push(heading_tag(heading));
                index += 1;
            }
            Element::Paragraph(paragraph) => {
                parent.push(paragraph_tag(paragraph, clause));
                index += 1;
            }
            Element::Code(code) => {
                parent.push(code_tag(code, clause));
                index += 1;
            }
            Element::Caption(caption) => {
                parent.push(caption_tag(caption));
                index += 1;
            }
            Element::FootnoteDefinition(definition) => {
                let mut block = Tag::new("div").attr("class", "footnote-definition");
                render_elements(&mut block, &definition.elements, clause);
                parent.push(block);
                index += 1;
            }
        }
    }
}

fn heading_tag(heading: &Heading) -> Tag {
    let name = match heading.level {
        0 | 1 => "h2",
        2 => "h3",
        3 => "h4",
        4 => "h5",
        _ => "h6",
    };
    let id = heading.anchor_id();
    let label = match &heading.number {
        Some(number) if !heading.title.is_empty() => format!("{} {}", number, heading.title),
        Some(number) => number.clone(),
        None => heading.title.clone(),
    };

    let tag = Tag::new(name).attr("id", id.as_str());
    if heading.entry.is_some() {
        return tag.html(self_link(&id, &label));
    }
    tag.attr("class", "unresolved").html(format!(
        "{} <span class=\"caveat\">({})</span>",
        self_link(&id, &label),
        UNRESOLVED_CAVEAT
    ))
}

fn paragraph_tag(paragraph: &Paragraph, clause: &str) -> Tag {
    let mut markup = String::new();
    if let Some(label) = paragraph.kind.label() {
        let _ = write!(markup, "<span class=\"label\">{}</span> ", encode_text(&label));
    }
    markup.push_str(&inline_html(&paragraph.text));

    match paragraph.number {
        Some(number) => {
            let id = format!("{clause}.p{number}");
            Tag::new("div")
                .attr("class", "numbered")
                .attr("id", id.as_str())
                .child(Tag::new("aside").html(self_link(&id, &number.to_string())))
                .child(Tag::new("p").html(markup))
        }
        None => Tag::new("p").html(markup),
    }
}

fn code_tag(code: &CodeBlock, clause: &str) -> Tag {
    let text = code
        .lines
        .iter()
        .map(|line| format!("{}{}", " ".repeat(line.indent), inline_html(&line.text)))
        .collect::<Vec<String>>()
        .join("\n");

    let mut block = Tag::new("div").attr("class", "code");
    if let Some(number) = code.number {
        let id = format!("{clause}.p{number}");
        block = block
            .attr("id", id.as_str())
            .child(Tag::new("aside").html(self_link(&id, &number.to_string())));
    }
    block.children.push(Node::Pre(text));
    block
}

fn caption_tag(caption: &Caption) -> Tag {
    let id = caption.anchor_id();
    let label = format!("{} {}", caption.kind.as_str(), caption.label);
    Tag::new("p")
        .attr("class", "caption")
        .attr("id", id.as_str())
        .html(format!(
            "{} — {}",
            self_link(&id, &label),
            inline_html(&caption.text)
        ))
}

fn item_list(items: &[&ListItem], position: &mut usize, level: usize) -> Tag {
    let ordered = items.get(*position).is_some_and(|item| item.ordered);
    let mut list = Tag::new(if ordered { "ol" } else { "ul" });
    while let Some(item) = items.get(*position) {
        if item.level < level {
            break;
        }

        if item.level > level {
            let nested = item_list(items, position, item.level);
            match list.children.last_mut() {
                Some(Node::Tag(last)) => last.push(nested),
                _ => list.push(Tag::new("li").child(nested)),
            }
            continue;
        }

        let mut li = Tag::new("li");
        if item.ordered {
            li = li.attr("data-marker", item.marker.as_str());
        }
        list.push(li.html(inline_html(&item.text)));
        *position += 1;
    }
    list
}
