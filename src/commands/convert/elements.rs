#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    FootnoteMarker(u32),
    Link { target: LinkTarget, label: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LinkTarget {
    Section(String),
    Caption(String),
    Footnote(u32),
    External(String),
}

impl LinkTarget {
    pub fn href(&self) -> String {
        match self {
            LinkTarget::Section(id) | LinkTarget::Caption(id) => format!("#{id}"),
            LinkTarget::Footnote(number) => format!("#{}", footnote_anchor_id(*number)),
            LinkTarget::External(url) => url.clone(),
        }
    }
}

pub fn footnote_anchor_id(number: u32) -> String {
    format!("footnote{number}")
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinRules {
    pub compound_prefixes: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Join {
    Space,
    Glue,
    Dehyphenate,
}

impl JoinRules {
    fn join_kind(&self, left: &str, right: &str) -> Join {
        let Some(last_word) = left.split_whitespace().last() else {
            return Join::Glue;
        };

        let lowered = last_word.to_lowercase();
        if (lowered.starts_with("http:") || lowered.starts_with("https:"))
            && (lowered.ends_with(':') || lowered.ends_with('/'))
        {
            return Join::Glue;
        }

        if !lowered.ends_with('-') {
            return Join::Space;
        }

        let before_hyphen = lowered.trim_end_matches('-').chars().last();
        if !before_hyphen.is_some_and(char::is_alphabetic) {
            return Join::Space;
        }

        let stem = lowered.trim_start_matches(|ch: char| !ch.is_alphanumeric());
        if self
            .compound_prefixes
            .iter()
            .any(|prefix| prefix.eq_ignore_ascii_case(stem))
        {
            return Join::Glue;
        }

        let right_starts_lowercase = right.chars().next().is_some_and(char::is_lowercase);
        if right_starts_lowercase {
            Join::Dehyphenate
        } else {
            Join::Glue
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RichText {
    pub runs: Vec<Inline>,
}

impl RichText {
    pub fn new(text: &str) -> Self {
        let text = text.trim();
        if text.is_empty() {
            return Self::default();
        }
        Self {
            runs: vec![Inline::Text(text.to_string())],
        }
    }

    pub fn push(&mut self, run: Inline) {
        if let Inline::Text(text) = &run {
            if text.is_empty() {
                return;
            }
            if let Some(Inline::Text(last)) = self.runs.last_mut() {
                last.push_str(text);
                return;
            }
        }
        self.runs.push(run);
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn plain(&self) -> String {
        let mut out = String::new();
        for run in &self.runs {
            match run {
                Inline::Text(text) => out.push_str(text),
                Inline::FootnoteMarker(number) => out.push_str(&format!("{number})")),
                Inline::Link { label, .. } => out.push_str(label),
            }
        }
        out
    }

    pub fn first_char(&self) -> Option<char> {
        self.plain().trim_start().chars().next()
    }

    pub fn ends_with_terminal_punctuation(&self) -> bool {
        let last_text = self.runs.iter().rev().find_map(|run| match run {
            Inline::Text(text) if !text.trim().is_empty() => Some(text),
            _ => None,
        });
        match last_text {
            Some(text) => text
                .trim_end()
                .chars()
                .last()
                .is_some_and(|ch| matches!(ch, '.' | ':' | ';' | '?' | '!')),
            None => self.runs.is_empty(),
        }
    }

    pub fn append_line(&mut self, line: &str, rules: &JoinRules) {
        self.append(RichText::new(line), rules);
    }

    pub fn append(&mut self, other: RichText, rules: &JoinRules) {
        if other.is_empty() {
            return;
        }
        if self.is_empty() {
            *self = other;
            return;
        }

        let right = other.plain();
        let join = match self.runs.last_mut() {
            Some(Inline::Text(left)) => {
                let join = rules.join_kind(left, &right);
                if join == Join::Dehyphenate {
                    left.pop();
                }
                join
            }
            _ => Join::Space,
        };
        if join == Join::Space {
            self.push(Inline::Text(" ".to_string()));
        }

        for run in other.runs {
            self.push(run);
        }
    }

    pub fn map_text<F>(self, mut f: F) -> RichText
    where
        F: FnMut(String) -> Vec<Inline>,
    {
        let mut out = RichText::default();
        for run in self.runs {
            match run {
                Inline::Text(text) => {
                    for mapped in f(text) {
                        out.push(mapped);
                    }
                }
                other => out.push(other),
            }
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParagraphKind {
    Plain,
    Note(Option<u32>),
    NoteToEntry(u32),
    Example(Option<u32>),
    ForwardReferences,
}

impl ParagraphKind {
    pub fn label(self) -> Option<String> {
        match self {
            ParagraphKind::Plain => None,
            ParagraphKind::Note(None) => Some("NOTE".to_string()),
            ParagraphKind::Note(Some(number)) => Some(format!("NOTE {number}")),
            ParagraphKind::NoteToEntry(number) => Some(format!("Note {number} to entry:")),
            ParagraphKind::Example(None) => Some("EXAMPLE".to_string()),
            ParagraphKind::Example(Some(number)) => Some(format!("EXAMPLE {number}")),
            ParagraphKind::ForwardReferences => Some("Forward references:".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paragraph {
    pub number: Option<u32>,
    pub kind: ParagraphKind,
    pub text: RichText,
}

impl Paragraph {
    pub fn plain(text: &str) -> Self {
        Self {
            number: None,
            kind: ParagraphKind::Plain,
            text: RichText::new(text),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub level: usize,
    pub number: Option<String>,
    pub title: String,
    pub entry: Option<usize>,
}

impl Heading {
    pub fn anchor_id(&self) -> String {
        heading_anchor_id(self.number.as_deref(), &self.title)
    }
}

pub fn heading_anchor_id(number: Option<&str>, title: &str) -> String {
    if let Some(number) = number.map(|value| value.trim_end_matches('.')) {
        if !number.is_empty() {
            return number.to_string();
        }
    }

    if let Some(rest) = title.strip_prefix("Annex ") {
        if let Some(letter) = rest.split_whitespace().next() {
            return letter.to_string();
        }
    }

    title.split_whitespace().collect::<Vec<&str>>().join("-")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeLine {
    pub indent: usize,
    pub text: RichText,
}

impl CodeLine {
    pub fn from_raw(raw: &str) -> Self {
        let raw = raw.trim_end();
        let text = raw.trim_start();
        Self {
            indent: if text.is_empty() {
                0
            } else {
                raw.chars().count() - text.chars().count()
            },
            text: RichText::new(text),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.text.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    pub number: Option<u32>,
    pub lines: Vec<CodeLine>,
}

impl CodeBlock {
    pub fn new(number: Option<u32>, raw: &str) -> Self {
        Self {
            number,
            lines: vec![CodeLine::from_raw(raw)],
        }
    }

    pub fn min_indent(&self) -> usize {
        self.lines
            .iter()
            .filter(|line| !line.is_blank())
            .map(|line| line.indent)
            .min()
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListItem {
    pub marker: String,
    pub ordered: bool,
    pub level: usize,
    pub indent: usize,
    pub text: RichText,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    pub term: String,
    pub text: RichText,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub cells: Vec<RichText>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptionKind {
    Table,
    Figure,
}

impl CaptionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CaptionKind::Table => "Table",
            CaptionKind::Figure => "Figure",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caption {
    pub kind: CaptionKind,
    pub label: String,
    pub text: RichText,
}

impl Caption {
    pub fn anchor_id(&self) -> String {
        caption_anchor_id(self.kind, &self.label)
    }
}

pub fn caption_anchor_id(kind: CaptionKind, label: &str) -> String {
    format!("{}-{}", kind.as_str().to_ascii_lowercase(), label)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FootnoteDefinition {
    pub number: u32,
    pub elements: Vec<Element>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    Heading(Heading),
    Paragraph(Paragraph),
    Code(CodeBlock),
    ListItem(ListItem),
    Definition(Definition),
    TableRow(TableRow),
    Caption(Caption),
    // Only present between building a page and reworking its footnotes.
    FootnoteDefinition(FootnoteDefinition),
}

impl Element {
    pub fn text_mut(&mut self) -> Option<&mut RichText> {
        match self {
            Element::Paragraph(paragraph) => Some(&mut paragraph.text),
            Element::ListItem(item) => Some(&mut item.text),
            Element::Definition(definition) => Some(&mut definition.text),
            Element::Caption(caption) => Some(&mut caption.text),
            _ => None,
        }
    }

    pub fn texts_mut(&mut self) -> Vec<&mut RichText> {
        match self {
            Element::Heading(_) => Vec::new(),
            Element::Paragraph(paragraph) => vec![&mut paragraph.text],
            Element::Code(code) => code.lines.iter_mut().map(|line| &mut line.text).collect(),
            Element::ListItem(item) => vec![&mut item.text],
            Element::Definition(definition) => vec![&mut definition.text],
            Element::TableRow(row) => row.cells.iter_mut().collect(),
            Element::Caption(caption) => vec![&mut caption.text],
            Element::FootnoteDefinition(definition) => definition
                .elements
                .iter_mut()
                .flat_map(Element::texts_mut)
                .collect(),
        }
    }

    pub fn map_texts<F>(mut self, mut f: F) -> Element
    where
        F: FnMut(RichText) -> RichText,
    {
        for text in self.texts_mut() {
            let taken = std::mem::take(text);
            *text = f(taken);
        }
        self
    }
}
