use super::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub index: usize,
    pub header: Vec<String>,
    pub body: Vec<String>,
    pub footer: Vec<String>,
    pub indent: usize,
}

impl Page {
    pub fn first_body_line(&self) -> Option<&str> {
        self.body
            .iter()
            .map(|line| line.trim())
            .find(|line| !line.is_empty())
    }
}

pub fn split_page_chunks(raw: &str) -> Vec<String> {
    raw.split('\u{000C}')
        .map(|chunk| chunk.replace('\u{0000}', ""))
        .filter(|chunk| !chunk.trim().is_empty())
        .collect()
}

pub fn segment_pages(chunks: &[String]) -> Vec<Page> {
    chunks
        .iter()
        .enumerate()
        .map(|(index, chunk)| segment_page(index, chunk))
        .collect()
}

pub fn segment_page(index: usize, chunk: &str) -> Page {
    let lines = chunk
        .lines()
        .map(|line| line.trim_end().to_string())
        .collect::<Vec<String>>();

    let Some(first) = lines.iter().position(|line| !line.is_empty()) else {
        return Page {
            index,
            header: Vec::new(),
            body: Vec::new(),
            footer: Vec::new(),
            indent: 0,
        };
    };
    let header_end = lines[first..]
        .iter()
        .position(String::is_empty)
        .map_or(lines.len(), |offset| first + offset);

    let last = lines
        .iter()
        .rposition(|line| !line.is_empty())
        .unwrap_or(first);
    let footer_begin = lines[..=last]
        .iter()
        .rposition(String::is_empty)
        .map_or(first, |blank| blank + 1);

    let header = lines[first..header_end]
        .iter()
        .map(|line| line.trim_start().to_string())
        .collect::<Vec<String>>();

    // A single block of text is all header: the page has no body.
    if footer_begin <= first {
        return Page {
            index,
            header,
            body: Vec::new(),
            footer: Vec::new(),
            indent: 0,
        };
    }

    let footer = lines[footer_begin..=last]
        .iter()
        .map(|line| line.trim_start().to_string())
        .collect::<Vec<String>>();

    let mut body = lines[header_end..footer_begin].to_vec();
    while body.first().is_some_and(String::is_empty) {
        body.remove(0);
    }
    while body.last().is_some_and(String::is_empty) {
        body.pop();
    }

    let indent = detect_number_margin(&body);

    Page {
        index,
        header,
        body,
        footer,
        indent,
    }
}

// Zero when every line is indented or when unindented text exists.
pub fn detect_number_margin(lines: &[String]) -> usize {
    let mut indents = lines
        .iter()
        .filter(|line| !line.is_empty())
        .map(|line| indent_of(line))
        .collect::<Vec<usize>>();
    indents.sort_unstable();
    indents.dedup();

    if indents.len() < 2 || indents[0] != 0 {
        return 0;
    }

    let widest = lines
        .iter()
        .map(|line| line.chars().count())
        .max()
        .unwrap_or(0);

    let mut margin = indents[1];
    if only_numbers_in_margin(lines, margin) {
        while margin < widest && only_numbers_in_margin(lines, margin + 1) {
            margin += 1;
        }
    } else {
        while margin > 0 && !only_numbers_in_margin(lines, margin) {
            margin -= 1;
        }
    }

    margin
}

fn only_numbers_in_margin(lines: &[String], margin: usize) -> bool {
    if margin == 0 {
        return true;
    }

    lines.iter().all(|line| {
        let prefix = line.chars().take(margin).collect::<String>();
        let prefix = prefix.trim();
        prefix.is_empty() || prefix.parse::<u32>().is_ok()
    })
}

pub fn split_at_column(line: &str, column: usize) -> (&str, &str) {
    match line.char_indices().nth(column) {
        Some((offset, _)) => line.split_at(offset),
        None => (line, ""),
    }
}
