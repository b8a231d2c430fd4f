use super::*;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceIndex {
    sections: BTreeMap<String, String>,
    captions: BTreeSet<String>,
    footnotes: BTreeSet<u32>,
}

impl ReferenceIndex {
    pub fn new<'a>(
        toc: &TableOfContents,
        sections: impl IntoIterator<Item = &'a MergedSection>,
    ) -> Self {
        let mut index = Self::default();
        for entry in &toc.entries {
            let anchor = entry.anchor_id();
            if let Some(number) = &entry.number {
                index.sections.insert(number.clone(), anchor);
            } else if entry.title_text().starts_with("Annex ") {
                index.sections.insert(anchor.clone(), anchor);
            }
        }

        for section in sections {
            for element in &section.elements {
                if let Element::Caption(caption) = element {
                    index.captions.insert(caption.anchor_id());
                }
            }
            index.footnotes.extend(
                section
                    .footnotes
                    .values()
                    .filter(|footnote| footnote.anchored)
                    .map(|footnote| footnote.number),
            );
        }

        index
    }

    fn section(&self, number: &str) -> Option<LinkTarget> {
        self.sections
            .get(number.trim_end_matches('.'))
            .map(|anchor| LinkTarget::Section(anchor.clone()))
    }

    fn caption(&self, kind: CaptionKind, label: &str) -> Option<LinkTarget> {
        let anchor = caption_anchor_id(kind, label);
        self.captions
            .contains(&anchor)
            .then_some(LinkTarget::Caption(anchor))
    }

    fn footnote(&self, number: u32) -> Option<LinkTarget> {
        self.footnotes
            .contains(&number)
            .then_some(LinkTarget::Footnote(number))
    }
}

#[derive(Debug)]
pub struct ReferencePatterns {
    url: Regex,
    deep_clause: Regex,
    cued_clause: Regex,
    chapter: Regex,
    clause_range: Regex,
    bracketed: Regex,
    annex: Regex,
    caption: Regex,
    footnote: Regex,
    key: Regex,
}

impl ReferencePatterns {
    pub fn new() -> Result<Self> {
        Ok(Self {
            url: Regex::new(r"https?://[-A-Za-z0-9_/.~%?=&#+]*[A-Za-z0-9_/]")
                .context("failed to compile URL regex")?,
            deep_clause: Regex::new(r"\b(?P<number>(?:\d+|[A-Z])(?:\.\d+){2,})\b")
                .context("failed to compile clause number regex")?,
            cued_clause: Regex::new(
                r"(?:\b(?:[Ss]ee|[Ii]n|[Bb]y|[Ss]ubclauses?)\s+|§\s*)(?P<number>(?:\d+|[A-Z])(?:\.\d+)+)\b",
            )
            .context("failed to compile cued clause regex")?,
            chapter: Regex::new(r"\b[Cc]lause\s+(?P<number>\d+)\b")
                .context("failed to compile clause regex")?,
            clause_range: Regex::new(r"\b[Cc]lauses\s+(?P<first>\d+)\s*[–-]\s*(?P<second>\d+)\b")
                .context("failed to compile clause range regex")?,
            bracketed: Regex::new(r"(?:\[|\s\()(?P<number>(?:\d+|[A-Z])\.\d+(?:\.\d+)*)[\])]")
                .context("failed to compile bracketed clause regex")?,
            annex: Regex::new(r"\b[Aa]nnex\s+(?P<letter>[A-Z])\b")
                .context("failed to compile annex regex")?,
            caption: Regex::new(r"\b(?P<kind>Table|Figure)\s+(?P<label>(?:[A-Z]\.)?\d+(?:\.\d+)*)\b")
                .context("failed to compile caption reference regex")?,
            footnote: Regex::new(r"\b[Ff]ootnote\s+(?P<number>\d+)\b")
                .context("failed to compile footnote reference regex")?,
            key: Regex::new(r"\b(?P<number>(?:\d+|[A-Z])(?:\.\d+)+)\b")
                .context("failed to compile clause key regex")?,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkCounts {
    pub resolved: usize,
    pub unresolved: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Candidate {
    start: usize,
    end: usize,
    target: Option<LinkTarget>,
}

pub struct Linker<'a> {
    pub patterns: &'a ReferencePatterns,
    pub index: &'a ReferenceIndex,
}

impl<'a> Linker<'a> {
    pub fn link_section(
        &self,
        section: &mut MergedSection,
        counts: &mut LinkCounts,
        misses: &mut Vec<String>,
    ) {
        let elements = std::mem::take(&mut section.elements);
        section.elements = self.link_elements(elements, counts, misses);

        for footnote in section.footnotes.values_mut() {
            let elements = std::mem::take(&mut footnote.elements);
            footnote.elements = self.link_elements(elements, counts, misses);
        }
    }

    pub fn link_elements(
        &self,
        elements: Vec<Element>,
        counts: &mut LinkCounts,
        misses: &mut Vec<String>,
    ) -> Vec<Element> {
        elements
            .into_iter()
            .map(|element| match element {
                Element::Paragraph(ref paragraph)
                    if paragraph.kind == ParagraphKind::ForwardReferences =>
                {
                    element.map_texts(|text| {
                        text.map_text(|value| {
                            self.link_run(value, Self::forward_candidates, counts, misses)
                        })
                    })
                }
                Element::Paragraph(_)
                | Element::Code(_)
                | Element::ListItem(_)
                | Element::TableRow(_)
                | Element::Definition(_) => element.map_texts(|text| {
                    text.map_text(|value| self.link_run(value, Self::candidates, counts, misses))
                }),
                other => other,
            })
            .collect()
    }

    fn link_run(
        &self,
        value: String,
        find: fn(&Self, &str) -> Vec<Candidate>,
        counts: &mut LinkCounts,
        misses: &mut Vec<String>,
    ) -> Vec<Inline> {
        let candidates = find(self, &value);
        if candidates.is_empty() {
            return vec![Inline::Text(value)];
        }

        let mut runs = Vec::new();
        let mut cursor = 0usize;
        for candidate in candidates {
            let label = &value[candidate.start..candidate.end];
            let Some(target) = candidate.target else {
                counts.unresolved += 1;
                debug!(reference = label, "reference target not found");
                misses.push(label.to_string());
                continue;
            };

            counts.resolved += 1;
            runs.push(Inline::Text(value[cursor..candidate.start].to_string()));
            runs.push(Inline::Link {
                target,
                label: label.to_string(),
            });
            cursor = candidate.end;
        }
        runs.push(Inline::Text(value[cursor..].to_string()));
        runs
    }

    fn forward_candidates(&self, text: &str) -> Vec<Candidate> {
        self.patterns
            .key
            .captures_iter(text)
            .filter_map(|captures| captures.name("number"))
            .map(|number| Candidate {
                start: number.start(),
                end: number.end(),
                target: self.index.section(number.as_str()),
            })
            .collect()
    }

    fn candidates(&self, text: &str) -> Vec<Candidate> {
        let patterns = self.patterns;
        let index = self.index;
        let mut found = Vec::<Candidate>::new();

        for matched in patterns.url.find_iter(text) {
            found.push(Candidate {
                start: matched.start(),
                end: matched.end(),
                target: Some(LinkTarget::External(matched.as_str().to_string())),
            });
        }

        let numbered = |captures: &Captures<'_>, name: &str| {
            captures.name(name).map(|value| Candidate {
                start: value.start(),
                end: value.end(),
                target: index.section(value.as_str()),
            })
        };

        for captures in patterns.deep_clause.captures_iter(text) {
            found.extend(numbered(&captures, "number"));
        }
        for captures in patterns.cued_clause.captures_iter(text) {
            found.extend(numbered(&captures, "number"));
        }
        for captures in patterns.chapter.captures_iter(text) {
            found.extend(numbered(&captures, "number"));
        }
        for captures in patterns.clause_range.captures_iter(text) {
            found.extend(numbered(&captures, "first"));
            found.extend(numbered(&captures, "second"));
        }
        for captures in patterns.bracketed.captures_iter(text) {
            found.extend(numbered(&captures, "number"));
        }

        for captures in patterns.annex.captures_iter(text) {
            let (Some(whole), Some(letter)) = (captures.get(0), captures.name("letter")) else {
                continue;
            };
            found.push(Candidate {
                start: whole.start(),
                end: whole.end(),
                target: index.section(letter.as_str()),
            });
        }

        for captures in patterns.caption.captures_iter(text) {
            let (Some(whole), Some(kind), Some(label)) =
                (captures.get(0), captures.name("kind"), captures.name("label"))
            else {
                continue;
            };
            let kind = if kind.as_str() == "Figure" {
                CaptionKind::Figure
            } else {
                CaptionKind::Table
            };
            found.push(Candidate {
                start: whole.start(),
                end: whole.end(),
                target: index.caption(kind, label.as_str()),
            });
        }

        for captures in patterns.footnote.captures_iter(text) {
            let whole = captures.get(0);
            let number = captures
                .name("number")
                .and_then(|value| value.as_str().parse::<u32>().ok());
            let (Some(whole), Some(number)) = (whole, number) else {
                continue;
            };
            found.push(Candidate {
                start: whole.start(),
                end: whole.end(),
                target: index.footnote(number),
            });
        }

        // Resolved spans win over misses at the same place.
        found.sort_by(|left, right| {
            left.start
                .cmp(&right.start)
                .then(right.target.is_some().cmp(&left.target.is_some()))
                .then(right.end.cmp(&left.end))
        });

        let mut kept = Vec::<Candidate>::with_capacity(found.len());
        for candidate in found {
            if kept.last().is_some_and(|last| candidate.start < last.end) {
                continue;
            }
            kept.push(candidate);
        }
        kept
    }
}
