use super::*;

const UNNUMBERED_LEVEL_STEP: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    pub number: Option<String>,
    pub title: Vec<String>,
    pub level: usize,
    pub toc_page: usize,
    pub page_label: Option<String>,
}

impl TocEntry {
    pub fn title_text(&self) -> String {
        self.title.join(" ")
    }

    pub fn anchor_id(&self) -> String {
        heading_anchor_id(self.number.as_deref(), &self.title_text())
    }

    pub fn display(&self) -> String {
        match &self.number {
            Some(number) => format!("{} {}", number, self.title_text()),
            None => self.title_text(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableOfContents {
    pub heading: String,
    pub entries: Vec<TocEntry>,
}

#[derive(Debug)]
pub struct TocPatterns {
    entry_line: Regex,
    bare_line: Regex,
    trailing_leader: Regex,
}

impl TocPatterns {
    pub fn new() -> Result<Self> {
        Ok(Self {
            entry_line: Regex::new(
                r"^(?P<indent>\s*)(?:(?P<number>\d+(?:\.\d+)*\.?|[A-Z](?:\.\d+)+)\s+)?(?P<title>\S.*?)(?:(?:\s*\.){3,}\s*|\s{2,})(?P<page>\d+|[ivxlcdm]+)$",
            )
            .context("failed to compile table-of-contents entry regex")?,
            bare_line: Regex::new(
                r"^(?P<indent>\s*)(?:(?P<number>\d+(?:\.\d+)*\.?|[A-Z](?:\.\d+)+)\s+)?(?P<title>\S.*)$",
            )
            .context("failed to compile table-of-contents line regex")?,
            trailing_leader: Regex::new(r"(?:\s*\.){2,}\s*$")
                .context("failed to compile dotted leader regex")?,
        })
    }
}

#[derive(Debug)]
struct PendingEntry {
    number: Option<String>,
    title: String,
    indent: usize,
    toc_page: usize,
}

impl PendingEntry {
    fn finish(self, page_label: Option<String>) -> RawEntry {
        RawEntry {
            number: self.number,
            title: self.title,
            indent: self.indent,
            toc_page: self.toc_page,
            page_label,
        }
    }
}

#[derive(Debug)]
struct RawEntry {
    number: Option<String>,
    title: String,
    indent: usize,
    toc_page: usize,
    page_label: Option<String>,
}

pub fn parse_toc(pages: &[&Page], patterns: &TocPatterns) -> Result<TableOfContents> {
    let mut lines = pages
        .iter()
        .flat_map(|page| page.body.iter().map(move |line| (page.index, line.as_str())))
        .filter(|(_, line)| !line.trim().is_empty());

    let heading = lines
        .next()
        .map(|(_, line)| line.trim().to_string())
        .unwrap_or_default();

    let mut raw_entries = Vec::<RawEntry>::new();
    let mut pending: Option<PendingEntry> = None;
    let mut matched_lines = 0usize;

    for (toc_page, line) in lines {
        let indent = indent_of(line);
        if let Some(captures) = patterns.entry_line.captures(line) {
            matched_lines += 1;
            let number = captures.name("number").map(|value| clean_number(value.as_str()));
            let title = captures
                .name("title")
                .map(|value| value.as_str().trim().to_string())
                .unwrap_or_default();
            let page_label = captures.name("page").map(|value| value.as_str().to_string());

            if let Some(mut open) = pending.take() {
                if number.is_none() && indent > open.indent {
                    open.title.push(' ');
                    open.title.push_str(&title);
                    raw_entries.push(open.finish(page_label));
                    continue;
                }
                raw_entries.push(open.finish(None));
            }

            raw_entries.push(RawEntry {
                number,
                title,
                indent,
                toc_page,
                page_label,
            });
            continue;
        }

        let Some(captures) = patterns.bare_line.captures(line) else {
            continue;
        };
        let number = captures.name("number").map(|value| clean_number(value.as_str()));
        let title = captures
            .name("title")
            .map(|value| value.as_str())
            .unwrap_or_default();
        let title = patterns
            .trailing_leader
            .replace(title, "")
            .trim()
            .to_string();

        if let Some(open) = pending.as_mut() {
            if number.is_none() && indent > open.indent {
                open.title.push(' ');
                open.title.push_str(&title);
                continue;
            }
        }
        if let Some(open) = pending.take() {
            raw_entries.push(open.finish(None));
        }
        pending = Some(PendingEntry {
            number,
            title,
            indent,
            toc_page,
        });
    }

    if let Some(open) = pending.take() {
        raw_entries.push(open.finish(None));
    }

    if matched_lines == 0 {
        let first = pages.first().map(|page| page.index).unwrap_or(0);
        let last = pages.last().map(|page| page.index).unwrap_or(first);
        return Err(StructureError::EmptyTableOfContents { first, last }.into());
    }

    let base_indent = raw_entries
        .iter()
        .map(|entry| entry.indent)
        .min()
        .unwrap_or(0);

    let entries = raw_entries
        .into_iter()
        .map(|raw| {
            let level = match &raw.number {
                Some(number) => number.matches('.').count() + 1,
                None => 1 + (raw.indent - base_indent) / UNNUMBERED_LEVEL_STEP,
            };
            TocEntry {
                number: raw.number,
                title: group_words(&raw.title),
                level,
                toc_page: raw.toc_page,
                page_label: raw.page_label,
            }
        })
        .collect::<Vec<TocEntry>>();

    info!(
        heading = %heading,
        entries = entries.len(),
        matched_lines,
        "parsed table of contents"
    );

    Ok(TableOfContents { heading, entries })
}

fn clean_number(raw: &str) -> String {
    raw.trim().trim_end_matches('.').to_string()
}

impl TableOfContents {
    pub fn remove_trailing_index(&mut self, index_marker: &str) {
        match self.entries.last() {
            Some(entry)
                if entry.number.is_none()
                    && normalize_title(&entry.title_text()) == normalize_title(index_marker) =>
            {
                self.entries.pop();
                debug!(marker = index_marker, "removed trailing index entry");
            }
            Some(entry) => {
                warn!(
                    last_entry = %entry.display(),
                    marker = index_marker,
                    "table of contents does not end with an index entry"
                );
            }
            None => {}
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct TocCursor(pub usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadingMatch {
    Matched { entry: usize, cursor: TocCursor },
    Prefix,
    Unmatched,
}

#[derive(Debug)]
pub struct TocMatcher<'a> {
    toc: &'a TableOfContents,
    keys: Vec<EntryKey>,
}

#[derive(Debug)]
struct EntryKey {
    number: Option<String>,
    grouped: Vec<String>,
    title: String,
    full: String,
}

impl<'a> TocMatcher<'a> {
    pub fn new(toc: &'a TableOfContents) -> Self {
        let keys = toc
            .entries
            .iter()
            .map(|entry| {
                let title = normalize_title(&entry.title_text());
                let full = normalize_title(&entry.display());
                EntryKey {
                    number: entry.number.clone(),
                    grouped: entry.title.clone(),
                    title,
                    full,
                }
            })
            .collect();

        Self { toc, keys }
    }

    pub fn entry(&self, index: usize) -> Option<&'a TocEntry> {
        self.toc.entries.get(index)
    }

    // The returned cursor points past the match, so later headings never resolve to earlier entries.
    pub fn match_heading(&self, groups: &[String], cursor: TocCursor) -> HeadingMatch {
        let Some(first) = groups.first() else {
            return HeadingMatch::Unmatched;
        };

        let first_clean = first.trim_end_matches('.');
        let rest = &groups[1..];
        let rest_norm = normalize_title(&rest.join(" "));
        let all_norm = normalize_title(&groups.join(" "));
        if all_norm.is_empty() {
            return HeadingMatch::Unmatched;
        }

        let mut prefix = false;
        for (index, key) in self.keys.iter().enumerate().skip(cursor.0) {
            let matched = match &key.number {
                Some(number) if number == first_clean => {
                    let exact =
                        rest.is_empty() || rest == key.grouped.as_slice() || rest_norm == key.title;
                    if !exact && !rest_norm.is_empty() && key.title.starts_with(&rest_norm) {
                        prefix = true;
                    }
                    exact
                }
                Some(_) => false,
                None => {
                    let exact = groups == key.grouped.as_slice() || all_norm == key.full;
                    if !exact && key.full.starts_with(&all_norm) {
                        prefix = true;
                    }
                    exact
                }
            };

            if matched {
                return HeadingMatch::Matched {
                    entry: index,
                    cursor: TocCursor(index + 1),
                };
            }
        }

        if prefix {
            return HeadingMatch::Prefix;
        }
        HeadingMatch::Unmatched
    }
}
