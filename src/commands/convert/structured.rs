use super::*;

const MAX_HEADING_CONTINUATION_LINES: usize = 3;
const MAX_HEADING_INDENT: usize = 2;
const MAX_HEADING_TITLE_CHARS: usize = 120;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StructuredPage {
    pub index: usize,
    pub elements: Vec<Element>,
    pub footnotes: BTreeMap<u32, Vec<Element>>,
    pub anchored: BTreeSet<u32>,
    pub continued: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverPage {
    pub subheader: Vec<String>,
    pub title: String,
    pub page: StructuredPage,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Carry {
    pub cursor: TocCursor,
    // Footnote numbering never goes back.
    pub last_footnote: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadingCounts {
    pub resolved: usize,
    pub unresolved: Vec<String>,
}

pub struct PageBuilder<'a> {
    pub matcher: &'a TocMatcher<'a>,
    pub patterns: &'a LinePatterns,
    pub rules: &'a JoinRules,
}

impl<'a> PageBuilder<'a> {
    pub fn build(
        &self,
        page: &Page,
        skip: usize,
        carry: Carry,
        counts: &mut HeadingCounts,
    ) -> (StructuredPage, Carry) {
        let lines = page.body.get(skip..).unwrap_or(&[]);
        let region = self.footnote_region(lines, carry.last_footnote);
        let (body_lines, foot_lines) = lines.split_at(region);

        let mut parser = LineParser::new(self.patterns, self.rules, page.indent);
        let mut cursor = carry.cursor;
        let mut index = 0usize;
        while index < body_lines.len() {
            if let Some((heading, consumed, next)) =
                self.detect_heading(body_lines, index, page.indent, cursor)
            {
                if heading.entry.is_some() {
                    counts.resolved += 1;
                } else {
                    counts.unresolved.push(format!(
                        "{} {} (page {})",
                        heading.number.as_deref().unwrap_or_default(),
                        heading.title,
                        page.index
                    ));
                }
                cursor = next;
                parser.push_heading(heading);
                index += consumed;
                continue;
            }

            parser.parse_line(&body_lines[index]);
            index += 1;
        }
        let mut elements = parser.finish();

        let mut last_footnote = carry.last_footnote;
        let mut continued = None;
        for (number, group) in self.group_footnote_lines(foot_lines, carry.last_footnote) {
            let mut footnote_parser = LineParser::new(self.patterns, self.rules, 0);
            for line in &group {
                footnote_parser.parse_line(line);
            }
            if Some(number) == carry.last_footnote {
                continued = Some(number);
            }
            elements.push(Element::FootnoteDefinition(FootnoteDefinition {
                number,
                elements: footnote_parser.finish(),
            }));
            last_footnote = Some(last_footnote.map_or(number, |last| last.max(number)));
        }

        let structured = StructuredPage {
            index: page.index,
            elements,
            footnotes: BTreeMap::new(),
            anchored: BTreeSet::new(),
            continued,
        };
        (
            structured,
            Carry {
                cursor,
                last_footnote,
            },
        )
    }

    pub fn build_cover(
        &self,
        page: &Page,
        carry: Carry,
        counts: &mut HeadingCounts,
    ) -> (CoverPage, Carry) {
        let mut non_empty = page
            .body
            .iter()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty());
        let subheader = non_empty.next();
        let title = non_empty.next();

        let skip = title
            .or(subheader)
            .map_or(page.body.len(), |(index, _)| index + 1);
        let (structured, carry) = self.build(page, skip, carry, counts);

        let cover = CoverPage {
            subheader: subheader
                .map(|(_, line)| group_words(line))
                .unwrap_or_default(),
            title: title
                .map(|(_, line)| line.trim().to_string())
                .unwrap_or_default(),
            page: structured,
        };
        (cover, carry)
    }

    fn footnote_region(&self, lines: &[String], last_footnote: Option<u32>) -> usize {
        let mut separator = None;
        for (index, line) in lines.iter().enumerate() {
            if self.patterns.separator.is_match(line) {
                separator.get_or_insert(index);
                continue;
            }

            if let Some(number) = self.footnote_number(line) {
                if last_footnote.is_none_or(|last| number > last) {
                    return separator.unwrap_or(index);
                }
            }
        }

        // A rule with no new definition below it only continues a carried footnote.
        match (separator, last_footnote) {
            (Some(index), Some(_)) => index,
            _ => lines.len(),
        }
    }

    fn footnote_number(&self, line: &str) -> Option<u32> {
        self.patterns
            .footnote_start
            .captures(line)
            .and_then(|captures| captures.name("number"))
            .and_then(|value| value.as_str().parse::<u32>().ok())
    }

    fn group_footnote_lines(
        &self,
        lines: &[String],
        carried: Option<u32>,
    ) -> Vec<(u32, Vec<String>)> {
        let mut groups = Vec::<(u32, Vec<String>)>::new();
        let mut text_column = 0usize;
        let mut last = carried;

        for line in lines {
            if self.patterns.separator.is_match(line) {
                continue;
            }

            if let Some(captures) = self.patterns.footnote_start.captures(line) {
                let number = captures
                    .name("number")
                    .and_then(|value| value.as_str().parse::<u32>().ok());
                let text = captures.name("text");
                if let (Some(number), Some(text)) = (number, text) {
                    if last.is_none_or(|last| number > last) {
                        text_column = line[..text.start()].chars().count();
                        groups.push((number, vec![text.as_str().to_string()]));
                        last = Some(number);
                        continue;
                    }
                }
            }

            if groups.is_empty() {
                let Some(number) = carried else {
                    debug!(line, "footnote area line without a footnote");
                    continue;
                };
                text_column = indent_of(line);
                groups.push((number, Vec::new()));
            }

            if let Some((_, group)) = groups.last_mut() {
                let strip = indent_of(line).min(text_column);
                let (_, rest) = split_at_column(line, strip);
                group.push(rest.to_string());
            }
        }

        groups
    }

    fn detect_heading(
        &self,
        lines: &[String],
        at: usize,
        margin: usize,
        cursor: TocCursor,
    ) -> Option<(Heading, usize, TocCursor)> {
        let text = strip_blank_margin(&lines[at], margin)?;
        let lead = indent_of(text);
        let groups = self.patterns.split_heading_groups(group_words(text));
        let first = groups.first()?;

        let numbered = self.patterns.clause_number.is_match(first);
        if numbered && lead > MAX_HEADING_INDENT {
            return None;
        }
        // A lone undotted number is a table cell or a page artefact.
        if numbered && groups.len() == 1 && !first.contains('.') {
            return None;
        }

        match self.matcher.match_heading(&groups, cursor) {
            HeadingMatch::Matched { entry, cursor } => {
                return Some((self.resolved_heading(entry), 1, cursor));
            }
            HeadingMatch::Prefix => {
                let mut joined = groups.clone();
                let mut consumed = 1usize;
                for line in lines.iter().skip(at + 1).take(MAX_HEADING_CONTINUATION_LINES) {
                    let Some(next) = strip_blank_margin(line, margin) else {
                        break;
                    };
                    if next.trim().is_empty() {
                        break;
                    }
                    joined.extend(group_words(next));
                    consumed += 1;
                    match self.matcher.match_heading(&joined, cursor) {
                        HeadingMatch::Matched { entry, cursor } => {
                            return Some((self.resolved_heading(entry), consumed, cursor));
                        }
                        HeadingMatch::Prefix => continue,
                        HeadingMatch::Unmatched => break,
                    }
                }
            }
            HeadingMatch::Unmatched => {}
        }

        let dotted = numbered && first.contains('.') && !first.ends_with('.');
        if !dotted || groups.len() > 2 {
            return None;
        }
        let title = groups.get(1).cloned().unwrap_or_default();
        let title_like = title.is_empty()
            || (title.chars().next().is_some_and(char::is_uppercase)
                && !title.ends_with('.')
                && title.chars().count() <= MAX_HEADING_TITLE_CHARS);
        if !title_like {
            return None;
        }

        debug!(number = %first, title = %title, "heading has no table-of-contents entry");
        let heading = Heading {
            level: first.matches('.').count() + 1,
            number: Some(first.clone()),
            title,
            entry: None,
        };
        Some((heading, 1, cursor))
    }

    fn resolved_heading(&self, entry: usize) -> Heading {
        match self.matcher.entry(entry) {
            Some(toc_entry) => Heading {
                level: toc_entry.level,
                number: toc_entry.number.clone(),
                title: toc_entry.title_text(),
                entry: Some(entry),
            },
            None => Heading {
                level: 1,
                number: None,
                title: String::new(),
                entry: None,
            },
        }
    }
}

fn strip_blank_margin(line: &str, margin: usize) -> Option<&str> {
    if margin == 0 {
        return Some(line);
    }
    let (head, rest) = split_at_column(line, margin);
    head.trim().is_empty().then_some(rest)
}

pub fn reindent_code(elements: Vec<Element>) -> Vec<Element> {
    elements.into_iter().map(reindent_element).collect()
}

fn reindent_element(element: Element) -> Element {
    match element {
        Element::Code(code) => Element::Code(reindent_block(code)),
        Element::FootnoteDefinition(definition) => {
            Element::FootnoteDefinition(FootnoteDefinition {
                number: definition.number,
                elements: reindent_code(definition.elements),
            })
        }
        other => other,
    }
}

fn reindent_block(code: CodeBlock) -> CodeBlock {
    let margin = code.min_indent();
    CodeBlock {
        number: code.number,
        lines: code
            .lines
            .into_iter()
            .map(|line| CodeLine {
                indent: line.indent.saturating_sub(margin),
                text: line.text,
            })
            .collect(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Abstract {
    pub title: String,
    pub note: String,
    pub paragraphs: Vec<Paragraph>,
}

const ABSTRACT_PARAGRAPH_INDENT: usize = 8;

pub fn parse_abstract(pages: &[&Page], rules: &JoinRules) -> Abstract {
    let mut lines = pages
        .iter()
        .flat_map(|page| page.body.iter())
        .filter(|line| !line.trim().is_empty());

    let title = lines.next().map(|line| line.trim().to_string()).unwrap_or_default();
    let note = lines.next().map(|line| line.trim().to_string()).unwrap_or_default();

    let mut paragraphs = Vec::<Paragraph>::new();
    for line in lines {
        match paragraphs.last_mut() {
            Some(last) if indent_of(line) < ABSTRACT_PARAGRAPH_INDENT => {
                last.text.append_line(line, rules);
            }
            _ => paragraphs.push(Paragraph::plain(line)),
        }
    }

    Abstract {
        title,
        note,
        paragraphs,
    }
}
