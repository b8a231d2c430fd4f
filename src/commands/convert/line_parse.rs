use super::*;

const CODE_INDENT: usize = 7;
const CONTINUATION_INDENT: usize = 4;
const DEFINITION_COLUMNS: std::ops::RangeInclusive<usize> = 12..=15;
const TABLE_MIN_CELLS: usize = 3;
const TABLE_MIN_GAP: usize = 3;
const TABLE_MAX_AVERAGE_CELL: usize = 30;
const SYNTAX_OPENER: &str = "Syntax";
const SYNTAX_CLOSERS: [&str; 3] = ["Constraints", "Description", "Semantics"];

#[derive(Debug)]
pub struct LinePatterns {
    pub footnote_start: Regex,
    pub separator: Regex,
    pub clause_number: Regex,
    pub leading_clause_number: Regex,
    ordered_item: Regex,
    caption: Regex,
    note: Regex,
    note_to_entry: Regex,
    example: Regex,
    forward_references: Regex,
}

impl LinePatterns {
    pub fn new() -> Result<Self> {
        Ok(Self {
            footnote_start: Regex::new(r"^(?P<lead>\s+)(?P<number>\d{1,4})\)\s?(?P<text>\S.*)$")
                .context("failed to compile footnote definition regex")?,
            separator: Regex::new(r"^\s*[_─—-]{8,}\s*$")
                .context("failed to compile footnote separator regex")?,
            clause_number: Regex::new(r"^(?:\d+|[A-Z])(?:\.\d+)+\.?$|^\d+\.?$")
                .context("failed to compile clause number regex")?,
            leading_clause_number: Regex::new(
                r"^(?P<number>(?:\d+|[A-Z])(?:\.\d+)+\.?|\d+\.?)\s(?P<title>\S.*)$",
            )
            .context("failed to compile leading clause number regex")?,
            ordered_item: Regex::new(r"^(?P<marker>(?:\d{1,2}|[a-z]|[ivx]{1,4})[.)])\s+(?P<text>\S.*)$")
                .context("failed to compile ordered list regex")?,
            caption: Regex::new(
                r"^(?P<kind>Table|Figure)\s+(?P<label>(?:[A-Z]\.)?\d+(?:\.\d+)*)\s+[—–-]\s+(?P<text>\S.*)$",
            )
            .context("failed to compile caption regex")?,
            note: Regex::new(r"^NOTE(?:\s+(?P<number>\d+))?(?:\s+(?P<text>\S.*))?$")
                .context("failed to compile note regex")?,
            note_to_entry: Regex::new(r"^Note\s+(?P<number>\d+)\s+to entry:\s*(?P<text>.*)$")
                .context("failed to compile note-to-entry regex")?,
            example: Regex::new(r"^EXAMPLE(?:\s+(?P<number>\d+))?(?:\s+(?P<text>\S.*))?$")
                .context("failed to compile example regex")?,
            forward_references: Regex::new(r"^Forward references:\s*(?P<text>.*)$")
                .context("failed to compile forward references regex")?,
        })
    }

    pub fn split_heading_groups(&self, groups: Vec<String>) -> Vec<String> {
        let Some(first) = groups.first() else {
            return groups;
        };
        if self.clause_number.is_match(first) {
            return groups;
        }

        let Some(captures) = self.leading_clause_number.captures(first) else {
            return groups;
        };
        let number = captures.name("number").map(|value| value.as_str().to_string());
        let title = captures.name("title").map(|value| value.as_str().to_string());
        let (Some(number), Some(title)) = (number, title) else {
            return groups;
        };

        let mut split = vec![number, title];
        split.extend(groups.into_iter().skip(1));
        split
    }

    fn paragraph_kind(&self, text: &str) -> (ParagraphKind, String) {
        if let Some(captures) = self.forward_references.captures(text) {
            let body = captures.name("text").map(|value| value.as_str()).unwrap_or("");
            return (ParagraphKind::ForwardReferences, body.to_string());
        }

        if let Some(captures) = self.note_to_entry.captures(text) {
            let number = captures
                .name("number")
                .and_then(|value| value.as_str().parse::<u32>().ok());
            if let Some(number) = number {
                let body = captures.name("text").map(|value| value.as_str()).unwrap_or("");
                return (ParagraphKind::NoteToEntry(number), body.to_string());
            }
        }

        if let Some(captures) = self.note.captures(text) {
            let number = captures
                .name("number")
                .and_then(|value| value.as_str().parse::<u32>().ok());
            let body = captures.name("text").map(|value| value.as_str()).unwrap_or("");
            return (ParagraphKind::Note(number), body.to_string());
        }

        if let Some(captures) = self.example.captures(text) {
            let number = captures
                .name("number")
                .and_then(|value| value.as_str().parse::<u32>().ok());
            let body = captures.name("text").map(|value| value.as_str()).unwrap_or("");
            return (ParagraphKind::Example(number), body.to_string());
        }

        (ParagraphKind::Plain, text.to_string())
    }
}

#[derive(Debug)]
pub struct LineParser<'a> {
    patterns: &'a LinePatterns,
    rules: &'a JoinRules,
    margin: usize,
    elements: Vec<Element>,
    in_element: bool,
    syntax: SyntaxBlock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyntaxBlock {
    Outside,
    Opened,
    Inside,
}

impl<'a> LineParser<'a> {
    pub fn new(patterns: &'a LinePatterns, rules: &'a JoinRules, margin: usize) -> Self {
        Self {
            patterns,
            rules,
            margin,
            elements: Vec::new(),
            in_element: false,
            syntax: SyntaxBlock::Outside,
        }
    }

    pub fn finish(self) -> Vec<Element> {
        self.elements
    }

    pub fn push_heading(&mut self, heading: Heading) {
        self.elements.push(Element::Heading(heading));
        self.in_element = false;
        self.syntax = SyntaxBlock::Outside;
    }

    pub fn parse_line(&mut self, line: &str) {
        if line.trim().is_empty() {
            self.in_element = false;
            return;
        }

        if self.margin == 0 {
            self.parse_unnumbered(line);
            return;
        }

        let (margin, rest) = split_at_column(line, self.margin);
        if margin.trim().is_empty() {
            self.parse_unnumbered(rest);
            return;
        }

        match margin.trim().parse::<u32>() {
            Ok(number) => self.parse_numbered(number, rest),
            Err(_) => {
                debug!(line, margin = self.margin, "margin holds no paragraph number");
                self.parse_unnumbered(line.trim_start());
            }
        }
    }

    fn parse_numbered(&mut self, number: u32, rest: &str) {
        if indent_of(rest) >= CODE_INDENT || self.syntax == SyntaxBlock::Opened {
            self.elements
                .push(Element::Code(CodeBlock::new(Some(number), rest)));
            if self.syntax == SyntaxBlock::Opened {
                self.syntax = SyntaxBlock::Inside;
            }
        } else {
            self.syntax = SyntaxBlock::Outside;
            let (kind, body) = self.patterns.paragraph_kind(rest.trim());
            self.elements.push(Element::Paragraph(Paragraph {
                number: Some(number),
                kind,
                text: RichText::new(&body),
            }));
        }
        self.in_element = true;
    }

    fn parse_unnumbered(&mut self, line: &str) {
        let lead = indent_of(line);
        let trimmed = line.trim();

        if self.syntax != SyntaxBlock::Outside && !SYNTAX_CLOSERS.contains(&trimmed) {
            self.push_syntax_line(line);
            return;
        }

        if trimmed == SYNTAX_OPENER || SYNTAX_CLOSERS.contains(&trimmed) {
            self.elements.push(Element::Paragraph(Paragraph::plain(trimmed)));
            self.in_element = false;
            self.syntax = if trimmed == SYNTAX_OPENER {
                SyntaxBlock::Opened
            } else {
                SyntaxBlock::Outside
            };
            return;
        }

        if self.patterns.forward_references.is_match(trimmed) {
            self.push_paragraph(trimmed);
            return;
        }

        if lead < CODE_INDENT {
            if let Some(element) = self.structured_line(line, lead, trimmed) {
                self.in_element = !matches!(element, Element::TableRow(_));
                self.elements.push(element);
                return;
            }
        }

        if lead >= CONTINUATION_INDENT {
            if self.in_element && self.continues_previous(lead) {
                self.append_to_previous(line);
                return;
            }

            if lead >= CODE_INDENT {
                match self.elements.last_mut() {
                    // A blank line ended the element, but the block goes on.
                    Some(Element::Code(code)) => {
                        code.lines.push(CodeLine::from_raw(""));
                        code.lines.push(CodeLine::from_raw(line));
                    }
                    _ => self.elements.push(Element::Code(CodeBlock::new(None, line))),
                }
                self.in_element = true;
                return;
            }
        }

        if self.in_element {
            let joinable = matches!(
                self.elements.last(),
                Some(Element::Paragraph(_) | Element::ListItem(_) | Element::Caption(_))
            );
            if joinable {
                if let Some(text) = self.elements.last_mut().and_then(Element::text_mut) {
                    text.append_line(trimmed, self.rules);
                    return;
                }
            }
        }

        self.push_paragraph(trimmed);
    }

    fn push_paragraph(&mut self, trimmed: &str) {
        let (kind, body) = self.patterns.paragraph_kind(trimmed);
        self.elements.push(Element::Paragraph(Paragraph {
            number: None,
            kind,
            text: RichText::new(&body),
        }));
        self.in_element = true;
    }

    fn push_syntax_line(&mut self, line: &str) {
        let in_element = self.in_element;
        match self.elements.last_mut() {
            Some(Element::Code(code)) if self.syntax == SyntaxBlock::Inside => {
                if !in_element {
                    code.lines.push(CodeLine::from_raw(""));
                }
                code.lines.push(CodeLine::from_raw(line));
            }
            _ => self.elements.push(Element::Code(CodeBlock::new(None, line))),
        }
        self.syntax = SyntaxBlock::Inside;
        self.in_element = true;
    }

    fn structured_line(&self, line: &str, lead: usize, trimmed: &str) -> Option<Element> {
        if let Some(captures) = self.patterns.caption.captures(trimmed) {
            let kind = match captures.name("kind").map(|value| value.as_str()) {
                Some("Figure") => CaptionKind::Figure,
                _ => CaptionKind::Table,
            };
            let label = captures.name("label")?.as_str().to_string();
            let text = captures.name("text")?.as_str();
            return Some(Element::Caption(Caption {
                kind,
                label,
                text: RichText::new(text),
            }));
        }

        if let Some((bullet, rest)) = split_bullet(trimmed) {
            let level = if bullet == '•' {
                2
            } else {
                match self.elements.last() {
                    Some(Element::ListItem(previous)) if lead > previous.indent + 1 => {
                        previous.level + 1
                    }
                    _ => 1,
                }
            };
            return Some(Element::ListItem(ListItem {
                marker: bullet.to_string(),
                ordered: false,
                level,
                indent: lead,
                text: RichText::new(rest),
            }));
        }

        if let Some(captures) = self.patterns.ordered_item.captures(trimmed) {
            let marker = captures.name("marker")?.as_str().to_string();
            let text = captures.name("text")?.as_str();
            let level = match self.elements.last() {
                Some(Element::ListItem(previous)) if lead > previous.indent + 1 => {
                    previous.level + 1
                }
                Some(Element::ListItem(previous)) if lead + 1 >= previous.indent => previous.level,
                _ => 1,
            };
            return Some(Element::ListItem(ListItem {
                marker,
                ordered: true,
                level,
                indent: lead,
                text: RichText::new(text),
            }));
        }

        let groups = group_words(line);
        if lead < 2 && groups.len() == 2 {
            let term = &groups[0];
            let term_len = term.chars().count();
            let definition_column = trimmed
                .get(term.len()..)
                .map(|tail| term_len + indent_of(tail));
            if let Some(column) = definition_column {
                if DEFINITION_COLUMNS.contains(&column) && column >= term_len + 4 {
                    return Some(Element::Definition(Definition {
                        term: term.trim_end_matches(':').to_string(),
                        text: RichText::new(&groups[1]),
                    }));
                }
            }
        }

        if groups.len() >= TABLE_MIN_CELLS
            && narrowest_inner_gap(line).is_some_and(|gap| gap >= TABLE_MIN_GAP)
        {
            let average = groups.iter().map(|cell| cell.chars().count()).sum::<usize>()
                / groups.len();
            if average <= TABLE_MAX_AVERAGE_CELL {
                return Some(Element::TableRow(TableRow {
                    cells: groups.iter().map(|cell| RichText::new(cell)).collect(),
                }));
            }
        }

        None
    }

    fn continues_previous(&self, lead: usize) -> bool {
        match self.elements.last() {
            Some(Element::Code(_)) | Some(Element::Definition(_)) => true,
            Some(Element::ListItem(item)) if item.ordered => true,
            Some(Element::ListItem(item)) => lead >= item.indent + 2,
            _ => false,
        }
    }

    fn append_to_previous(&mut self, line: &str) {
        match self.elements.last_mut() {
            Some(Element::Code(code)) => code.lines.push(CodeLine::from_raw(line)),
            Some(element) => {
                if let Some(text) = element.text_mut() {
                    text.append_line(line, self.rules);
                }
            }
            None => {}
        }
    }
}

fn split_bullet(trimmed: &str) -> Option<(char, &str)> {
    let mut chars = trimmed.chars();
    let bullet = chars.next()?;
    if !matches!(bullet, '—' | '–' | '•' | '-' | '*') {
        return None;
    }

    let rest = chars.as_str();
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let rest = rest.trim_start();
    if rest.is_empty() {
        return None;
    }

    Some((bullet, rest))
}
