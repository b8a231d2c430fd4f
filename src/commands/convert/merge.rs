use super::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Footnote {
    pub number: u32,
    pub elements: Vec<Element>,
    pub page: usize,
    pub anchored: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedSection {
    pub elements: Vec<Element>,
    pub footnotes: BTreeMap<u32, Footnote>,
    // (page index, offset of its first element) in reading order.
    pub page_starts: Vec<(usize, usize)>,
    pub stray: Vec<u32>,
}

pub fn page_end(page_starts: &[(usize, usize)], page: usize, len: usize) -> usize {
    page_starts
        .iter()
        .skip_while(|(index, _)| *index <= page)
        .map(|(_, offset)| *offset)
        .next()
        .unwrap_or(len)
}

pub fn merge_pages(pages: Vec<StructuredPage>, rules: &JoinRules) -> MergedSection {
    let mut merged = MergedSection::default();

    for page in pages {
        merged.page_starts.push((page.index, merged.elements.len()));

        let mut incoming = page.elements.into_iter();
        if let Some(first) = incoming.next() {
            let leftover = match merged.elements.last_mut() {
                Some(previous) => join_across_break(previous, first, rules),
                None => Some(first),
            };
            merged.elements.extend(leftover);
        }
        merged.elements.extend(incoming);

        for (number, elements) in page.footnotes {
            let anchored = page.anchored.contains(&number);
            match merged.footnotes.get_mut(&number) {
                Some(existing) => {
                    append_continuation(&mut existing.elements, elements, rules);
                    existing.anchored |= anchored;
                }
                None => {
                    merged.footnotes.insert(
                        number,
                        Footnote {
                            number,
                            elements,
                            page: page.index,
                            anchored,
                        },
                    );
                }
            }
        }
    }

    merged
}

fn join_across_break(previous: &mut Element, next: Element, rules: &JoinRules) -> Option<Element> {
    match (previous, next) {
        (Element::Paragraph(previous), Element::Paragraph(next))
            if is_plain_continuation(&next)
                && (starts_lowercase(&next) || !previous.text.ends_with_terminal_punctuation()) =>
        {
            previous.text.append(next.text, rules);
            None
        }
        (Element::Code(previous), Element::Code(next)) if next.number.is_none() => {
            previous.lines.extend(next.lines);
            None
        }
        (Element::ListItem(previous), Element::Paragraph(next))
            if is_plain_continuation(&next) && starts_lowercase(&next) =>
        {
            previous.text.append(next.text, rules);
            None
        }
        (Element::Definition(previous), Element::Code(next)) if next.number.is_none() => {
            for line in next.lines {
                previous.text.append(line.text, rules);
            }
            None
        }
        (_, next) => Some(next),
    }
}

fn is_plain_continuation(paragraph: &Paragraph) -> bool {
    paragraph.number.is_none() && paragraph.kind == ParagraphKind::Plain
}

fn starts_lowercase(paragraph: &Paragraph) -> bool {
    paragraph.text.first_char().is_some_and(char::is_lowercase)
}

pub fn append_continuation(
    existing: &mut Vec<Element>,
    continuation: Vec<Element>,
    rules: &JoinRules,
) {
    let mut incoming = continuation.into_iter();
    if let Some(first) = incoming.next() {
        let leftover = match existing.last_mut() {
            Some(Element::Paragraph(previous)) => match first {
                Element::Paragraph(next) if is_plain_continuation(&next) => {
                    previous.text.append(next.text, rules);
                    None
                }
                other => Some(other),
            },
            Some(previous) => join_across_break(previous, first, rules),
            None => Some(first),
        };
        existing.extend(leftover);
    }
    existing.extend(incoming);
}
