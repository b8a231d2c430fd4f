use super::*;

pub fn rework_footnotes(page: StructuredPage, rules: &JoinRules) -> StructuredPage {
    let StructuredPage {
        index,
        elements,
        mut footnotes,
        anchored,
        continued,
    } = page;

    let mut body = Vec::with_capacity(elements.len());
    for element in elements {
        match element {
            Element::FootnoteDefinition(definition) => {
                let cleaned = clean_footnote(definition.elements, rules);
                footnotes.entry(definition.number).or_default().extend(cleaned);
            }
            other => body.push(other),
        }
    }

    StructuredPage {
        index,
        elements: body,
        footnotes,
        anchored,
        continued,
    }
}

fn clean_footnote(elements: Vec<Element>, rules: &JoinRules) -> Vec<Element> {
    let mut cleaned = Vec::<Element>::with_capacity(elements.len());

    for (position, element) in elements.into_iter().enumerate() {
        let element = match element {
            Element::Definition(definition) if position == 0 => {
                let mut text = RichText::new(&definition.term);
                text.append(definition.text, rules);
                Element::Paragraph(Paragraph {
                    number: None,
                    kind: ParagraphKind::Plain,
                    text,
                })
            }
            code @ Element::Code(_) => code,
            other => other.map_texts(collapse_spacing),
        };

        if let Some(Element::Paragraph(previous)) = cleaned.last_mut() {
            match element {
                Element::Paragraph(next) if next.number.is_none() => {
                    previous.text.append(next.text, rules);
                    continue;
                }
                Element::ListItem(item) if item.marker == "—" => {
                    let mut dashed = RichText::new("—");
                    dashed.append(item.text, rules);
                    previous.text.append(dashed, rules);
                    continue;
                }
                other => {
                    cleaned.push(other);
                    continue;
                }
            }
        }
        cleaned.push(element);
    }

    cleaned
}

fn collapse_spacing(text: RichText) -> RichText {
    text.map_text(|value| {
        let mut collapsed = String::with_capacity(value.len());
        let mut in_gap = false;
        for ch in value.chars() {
            if ch.is_whitespace() {
                if !in_gap {
                    collapsed.push(' ');
                }
                in_gap = true;
            } else {
                collapsed.push(ch);
                in_gap = false;
            }
        }
        vec![Inline::Text(collapsed)]
    })
}

pub fn fix_footnote_refs(page: StructuredPage) -> StructuredPage {
    let StructuredPage {
        index,
        elements,
        footnotes,
        anchored,
        continued,
    } = page;

    let mut fixed = Vec::<Element>::with_capacity(elements.len());
    for element in elements {
        let Element::Code(mut code) = element else {
            fixed.push(element);
            continue;
        };

        let marker = code
            .lines
            .first()
            .and_then(|line| marker_number(&line.text.plain()))
            .filter(|number| footnotes.contains_key(number));
        let previous_text = fixed.last_mut().and_then(Element::text_mut);
        let (Some(number), Some(previous_text)) = (marker, previous_text) else {
            fixed.push(Element::Code(code));
            continue;
        };

        debug!(page = index, footnote = number, "rejoined footnote marker line");
        code.lines.remove(0);
        let mut lines = code.lines.into_iter().filter(|line| !line.is_blank());
        match lines.next() {
            Some(first) => {
                let mut rejoined = first.text;
                rejoined.push(Inline::Text(format!("{number})")));
                previous_text.push(Inline::Text(" ".to_string()));
                for run in rejoined.runs {
                    previous_text.push(run);
                }
            }
            None => previous_text.push(Inline::Text(format!("{number})"))),
        }
        for line in lines {
            previous_text.push(Inline::Text(" ".to_string()));
            for run in line.text.runs {
                previous_text.push(run);
            }
        }
    }

    StructuredPage {
        index,
        elements: fixed,
        footnotes,
        anchored,
        continued,
    }
}

fn marker_number(text: &str) -> Option<u32> {
    text.trim().strip_suffix(')')?.parse::<u32>().ok()
}

// The marker nearest the end of the page wins.
pub fn put_footnote_placeholders(page: StructuredPage) -> StructuredPage {
    let StructuredPage {
        index,
        mut elements,
        footnotes,
        mut anchored,
        continued,
    } = page;

    for number in footnotes.keys().copied() {
        if Some(number) == continued {
            continue;
        }
        if place_marker(&mut elements, number) {
            anchored.insert(number);
        }
    }

    StructuredPage {
        index,
        elements,
        footnotes,
        anchored,
        continued,
    }
}

pub fn place_marker(elements: &mut [Element], number: u32) -> bool {
    for element in elements.iter_mut().rev() {
        let skipped = match element {
            Element::FootnoteDefinition(_) => true,
            Element::Paragraph(paragraph) => paragraph.kind == ParagraphKind::ForwardReferences,
            _ => false,
        };
        if skipped {
            continue;
        }
        for text in element.texts_mut().into_iter().rev() {
            if place_in_text(text, number) {
                return true;
            }
        }
    }
    false
}

fn place_in_text(text: &mut RichText, number: u32) -> bool {
    let needle = format!("{number})");
    let found = text
        .runs
        .iter()
        .enumerate()
        .rev()
        .find_map(|(position, run)| match run {
            Inline::Text(value) => last_marker_offset(value, &needle).map(|offset| (position, offset)),
            _ => None,
        });
    let Some((target, offset)) = found else {
        return false;
    };

    let runs = std::mem::take(&mut text.runs);
    let mut rebuilt = RichText::default();
    for (position, run) in runs.into_iter().enumerate() {
        match run {
            Inline::Text(value) if position == target => {
                rebuilt.push(Inline::Text(value[..offset].to_string()));
                rebuilt.push(Inline::FootnoteMarker(number));
                rebuilt.push(Inline::Text(value[offset + needle.len()..].to_string()));
            }
            other => rebuilt.push(other),
        }
    }
    *text = rebuilt;
    true
}

// A marker never continues a number, so "6.2)" and "(2)" are not footnote 2.
fn last_marker_offset(text: &str, needle: &str) -> Option<usize> {
    text.rmatch_indices(needle)
        .map(|(offset, _)| offset)
        .find(|offset| {
            let mut before = text[..*offset].chars().rev();
            match before.next() {
                Some(ch) if ch.is_ascii_digit() || ch == '(' => false,
                Some('.') => !before.next().is_some_and(|ch| ch.is_ascii_digit()),
                _ => true,
            }
        })
}

pub fn anchor_section_footnotes(section: &mut MergedSection, section_name: &str) {
    let len = section.elements.len();
    let mut stray = Vec::new();

    for footnote in section.footnotes.values_mut() {
        if footnote.anchored {
            continue;
        }

        let end = page_end(&section.page_starts, footnote.page, len);
        if place_marker(&mut section.elements[..end], footnote.number) {
            footnote.anchored = true;
            debug!(
                section = section_name,
                footnote = footnote.number,
                page = footnote.page,
                "anchored footnote in an earlier page"
            );
            continue;
        }

        warn!(
            section = section_name,
            footnote = footnote.number,
            page = footnote.page,
            "footnote marker not found; rendering as stray"
        );
        stray.push(footnote.number);
    }

    section.stray = stray;
}

pub fn footnote_states<'a>(
    sections: impl IntoIterator<Item = &'a MergedSection>,
) -> BTreeMap<u32, bool> {
    let mut states = BTreeMap::new();
    for section in sections {
        for (number, footnote) in &section.footnotes {
            states.insert(*number, footnote.anchored);
        }
    }
    states
}
