use super::*;

fn entry(number: Option<&str>, title: &str, level: usize) -> TocEntry {
    TocEntry {
        number: number.map(str::to_string),
        title: group_words(title),
        level,
        toc_page: 0,
        page_label: None,
    }
}

fn toc(entries: Vec<TocEntry>) -> TableOfContents {
    TableOfContents {
        heading: "Contents".to_string(),
        entries,
    }
}

fn page(index: usize, indent: usize, body: &[&str]) -> Page {
    Page {
        index,
        header: Vec::new(),
        body: body.iter().map(|line| line.to_string()).collect(),
        footer: Vec::new(),
        indent,
    }
}

fn default_rules() -> JoinRules {
    JoinRules {
        compound_prefixes: PipelineConfig::default().compound_prefixes,
    }
}

fn plain_text(element: &Element) -> String {
    match element {
        Element::Paragraph(paragraph) => paragraph.text.plain(),
        Element::ListItem(item) => item.text.plain(),
        Element::Definition(definition) => definition.text.plain(),
        Element::Caption(caption) => caption.text.plain(),
        other => panic!("element without running text: {other:?}"),
    }
}

fn has_marker(elements: &[Element], number: u32) -> bool {
    elements.iter().any(|element| match element {
        Element::Paragraph(paragraph) => paragraph
            .text
            .runs
            .iter()
            .any(|run| *run == Inline::FootnoteMarker(number)),
        _ => false,
    })
}

fn build_pages(builder: &PageBuilder<'_>, pages: &[Page]) -> Vec<StructuredPage> {
    let mut carry = Carry::default();
    let mut counts = HeadingCounts::default();
    let mut built = Vec::new();
    for page in pages {
        let (structured, next) = builder.build(page, 0, carry, &mut counts);
        carry = next;
        let structured = StructuredPage {
            elements: reindent_code(structured.elements.clone()),
            ..structured
        };
        let structured = rework_footnotes(structured, builder.rules);
        let structured = fix_footnote_refs(structured);
        built.push(put_footnote_placeholders(structured));
    }
    built
}

#[test]
fn group_words_splits_on_wide_gaps_only() {
    assert_eq!(
        group_words("  6.2.1   Scope of  identifiers "),
        vec!["6.2.1", "Scope of", "identifiers"]
    );
    assert_eq!(group_words("a\tb"), vec!["a", "b"]);
    assert!(group_words("   ").is_empty());
}

#[test]
fn segment_page_splits_header_body_footer_and_margin() {
    let chunk = "\n   ISO/IEC 9899:TC3      Committee Draft\n\n1     The first paragraph starts\n      and continues here.\n2     Second paragraph.\n\n                 12\n";
    let page = segment_page(7, chunk);

    assert_eq!(page.index, 7);
    assert_eq!(page.header, vec!["ISO/IEC 9899:TC3      Committee Draft"]);
    assert_eq!(page.footer, vec!["12"]);
    assert_eq!(page.body.len(), 3);
    assert_eq!(page.indent, 6);
    assert_eq!(page.first_body_line(), Some("1     The first paragraph starts"));
}

#[test]
fn segment_pages_skips_blank_chunks_and_keeps_empty_bodies() {
    let raw = "Header\n\nBody line\n\n1\u{000C}   \n\u{000C}Header only\n\n2\n";
    let chunks = split_page_chunks(raw);
    assert_eq!(chunks.len(), 2);

    let pages = segment_pages(&chunks);
    assert_eq!(pages[0].body, vec!["Body line"]);
    assert!(pages[1].body.is_empty());
}

#[test]
fn parse_toc_reads_levels_and_drops_trailing_index() {
    let contents = page(
        1,
        0,
        &[
            "Contents",
            "Foreword .................... ii",
            "1   Scope ................... 1",
            "2   Normative references .... 2",
            "    2.1   General ........... 2",
            "Index ....................... 12",
        ],
    );
    let patterns = TocPatterns::new().expect("compile toc patterns");
    let mut parsed = parse_toc(&[&contents], &patterns).expect("parse toc");
    parsed.remove_trailing_index("Index");

    assert_eq!(parsed.heading, "Contents");
    let shown = parsed
        .entries
        .iter()
        .map(|entry| (entry.number.clone(), entry.title_text(), entry.level))
        .collect::<Vec<_>>();
    assert_eq!(
        shown,
        vec![
            (None, "Foreword".to_string(), 1),
            (Some("1".to_string()), "Scope".to_string(), 1),
            (Some("2".to_string()), "Normative references".to_string(), 1),
            (Some("2.1".to_string()), "General".to_string(), 2),
        ]
    );
    assert_eq!(parsed.entries[3].page_label.as_deref(), Some("2"));
}

#[test]
fn parse_toc_without_entries_is_a_structure_error() {
    let contents = page(3, 0, &["Contents", "nothing that looks like an entry"]);
    let patterns = TocPatterns::new().expect("compile toc patterns");
    let err = parse_toc(&[&contents], &patterns).expect_err("empty toc must fail");

    assert_eq!(
        err.downcast_ref::<StructureError>(),
        Some(&StructureError::EmptyTableOfContents { first: 3, last: 3 })
    );
}

#[test]
fn matcher_resolves_spaced_heading_to_the_numbered_entry() {
    let contents = toc(vec![
        entry(Some("1"), "Scope", 1),
        entry(Some("2"), "Normative references", 1),
        entry(Some("2.1"), "General", 2),
    ]);
    let matcher = TocMatcher::new(&contents);

    assert_eq!(
        matcher.match_heading(&group_words("2.1  General"), TocCursor(0)),
        HeadingMatch::Matched {
            entry: 2,
            cursor: TocCursor(3)
        }
    );
}

#[test]
fn matcher_cursor_only_moves_forward() {
    let contents = toc(vec![
        entry(None, "Foreword", 1),
        entry(Some("1"), "General", 1),
        entry(Some("2"), "Terms", 1),
        entry(Some("2.1"), "General", 2),
    ]);
    let matcher = TocMatcher::new(&contents);

    let mut cursor = TocCursor::default();
    let mut matched = Vec::new();
    for heading in ["Foreword", "1  General", "2  Terms", "2.1  General"] {
        match matcher.match_heading(&group_words(heading), cursor) {
            HeadingMatch::Matched { entry, cursor: next } => {
                matched.push(entry);
                cursor = next;
            }
            other => panic!("{heading} did not match: {other:?}"),
        }
    }

    assert_eq!(matched, vec![0, 1, 2, 3]);
    assert!(matched.windows(2).all(|pair| pair[0] < pair[1]));
    assert_eq!(
        matcher.match_heading(&group_words("1  General"), cursor),
        HeadingMatch::Unmatched
    );
}

#[test]
fn repeated_body_heading_does_not_resolve_to_the_same_entry_twice() {
    let contents = toc(vec![entry(Some("1"), "Scope", 1), entry(Some("2"), "Terms", 1)]);
    let matcher = TocMatcher::new(&contents);

    let HeadingMatch::Matched { entry, cursor } =
        matcher.match_heading(&group_words("2  Terms"), TocCursor(0))
    else {
        panic!("first occurrence must match");
    };
    assert_eq!((entry, cursor), (1, TocCursor(2)));
    assert_eq!(
        matcher.match_heading(&group_words("2  Terms"), cursor),
        HeadingMatch::Unmatched
    );
}

#[test]
fn builder_joins_wrapped_heading_and_flags_unknown_dotted_heading() {
    let contents = toc(vec![entry(
        Some("6.2.1"),
        "Scopes of identifiers and their lifetimes",
        3,
    )]);
    let matcher = TocMatcher::new(&contents);
    let patterns = LinePatterns::new().expect("compile line patterns");
    let rules = default_rules();
    let builder = PageBuilder {
        matcher: &matcher,
        patterns: &patterns,
        rules: &rules,
    };

    let body = page(
        10,
        0,
        &[
            "6.2.1  Scopes of identifiers and",
            "their lifetimes",
            "An identifier can denote an object.",
            "",
            "6.9.9  Mystery clause",
        ],
    );
    let mut counts = HeadingCounts::default();
    let (built, carry) = builder.build(&body, 0, Carry::default(), &mut counts);

    match &built.elements[0] {
        Element::Heading(heading) => {
            assert_eq!(heading.entry, Some(0));
            assert_eq!(heading.level, 3);
            assert_eq!(heading.title, "Scopes of identifiers and their lifetimes");
        }
        other => panic!("expected heading, got {other:?}"),
    }
    assert_eq!(plain_text(&built.elements[1]), "An identifier can denote an object.");
    match &built.elements[2] {
        Element::Heading(heading) => {
            assert_eq!(heading.entry, None);
            assert_eq!(heading.number.as_deref(), Some("6.9.9"));
            assert_eq!(heading.level, 3);
        }
        other => panic!("expected unresolved heading, got {other:?}"),
    }
    assert_eq!(counts.resolved, 1);
    assert_eq!(counts.unresolved.len(), 1);
    assert_eq!(carry.cursor, TocCursor(1));
}

#[test]
fn line_parser_classifies_structured_lines() {
    let patterns = LinePatterns::new().expect("compile line patterns");
    let rules = default_rules();
    let mut parser = LineParser::new(&patterns, &rules, 0);
    for line in [
        "NOTE 1 Notes are informative.",
        "",
        "— first item",
        "  • nested item",
        "Table 3 — Limits of things",
        "term          the definition text",
        "int      long      char",
        "           x = 1;",
    ] {
        parser.parse_line(line);
    }
    let elements = parser.finish();
    assert_eq!(elements.len(), 7);

    match &elements[0] {
        Element::Paragraph(paragraph) => {
            assert_eq!(paragraph.kind, ParagraphKind::Note(Some(1)));
            assert_eq!(paragraph.text.plain(), "Notes are informative.");
        }
        other => panic!("expected note, got {other:?}"),
    }
    match (&elements[1], &elements[2]) {
        (Element::ListItem(first), Element::ListItem(nested)) => {
            assert_eq!((first.level, nested.level), (1, 2));
            assert!(!first.ordered);
        }
        other => panic!("expected list items, got {other:?}"),
    }
    match &elements[3] {
        Element::Caption(caption) => {
            assert_eq!(caption.kind, CaptionKind::Table);
            assert_eq!(caption.anchor_id(), "table-3");
        }
        other => panic!("expected caption, got {other:?}"),
    }
    match &elements[4] {
        Element::Definition(definition) => {
            assert_eq!(definition.term, "term");
            assert_eq!(definition.text.plain(), "the definition text");
        }
        other => panic!("expected definition, got {other:?}"),
    }
    match &elements[5] {
        Element::TableRow(row) => assert_eq!(row.cells.len(), 3),
        other => panic!("expected table row, got {other:?}"),
    }
    assert!(matches!(&elements[6], Element::Code(code) if code.lines[0].indent == 11));
}

#[test]
fn forward_references_start_their_own_paragraph() {
    let patterns = LinePatterns::new().expect("compile line patterns");
    let rules = default_rules();
    let mut parser = LineParser::new(&patterns, &rules, 0);
    for line in [
        "The previous paragraph does not end",
        "Forward references: conversions (6.3), expressions",
        "(6.5).",
    ] {
        parser.parse_line(line);
    }
    let elements = parser.finish();
    assert_eq!(elements.len(), 2);

    match &elements[1] {
        Element::Paragraph(paragraph) => {
            assert_eq!(paragraph.kind, ParagraphKind::ForwardReferences);
            assert_eq!(paragraph.text.plain(), "conversions (6.3), expressions (6.5).");
        }
        other => panic!("expected forward references, got {other:?}"),
    }
}

#[test]
fn syntax_block_is_code_until_a_closing_subheading() {
    let patterns = LinePatterns::new().expect("compile line patterns");
    let rules = default_rules();
    let mut parser = LineParser::new(&patterns, &rules, 0);
    for line in [
        "Syntax",
        "    selection-statement:",
        "        if ( expression ) statement",
        "",
        "    iteration-statement:",
        "Constraints",
        "The controlling expression shall have scalar type.",
    ] {
        parser.parse_line(line);
    }
    let elements = parser.finish();
    assert_eq!(elements.len(), 4);

    assert_eq!(plain_text(&elements[0]), "Syntax");
    match &elements[1] {
        Element::Code(code) => {
            let lines = code
                .lines
                .iter()
                .map(|line| (line.indent, line.text.plain()))
                .collect::<Vec<_>>();
            assert_eq!(
                lines,
                vec![
                    (4, "selection-statement:".to_string()),
                    (8, "if ( expression ) statement".to_string()),
                    (0, String::new()),
                    (4, "iteration-statement:".to_string()),
                ]
            );
        }
        other => panic!("expected syntax code block, got {other:?}"),
    }
    assert_eq!(plain_text(&elements[2]), "Constraints");
    assert_eq!(
        plain_text(&elements[3]),
        "The controlling expression shall have scalar type."
    );
}

#[test]
fn wrapped_lines_join_with_hyphen_and_url_rules() {
    let rules = default_rules();

    let mut compound = RichText::new("floating-");
    compound.append_line("point values", &rules);
    assert_eq!(compound.plain(), "floating-point values");

    let mut broken = RichText::new("imple-");
    broken.append_line("mentation", &rules);
    assert_eq!(broken.plain(), "implementation");

    let mut url = RichText::new("see https://example.org/");
    url.append_line("path", &rules);
    assert_eq!(url.plain(), "see https://example.org/path");
}

#[test]
fn reindent_makes_code_indentation_relative() {
    let block = CodeBlock {
        number: None,
        lines: vec![
            CodeLine::from_raw("            int x;"),
            CodeLine::from_raw("                x = 1;"),
            CodeLine::from_raw(""),
            CodeLine::from_raw("              return x;"),
        ],
    };

    let reindented = reindent_code(vec![Element::Code(block)]);
    match &reindented[0] {
        Element::Code(code) => {
            let indents = code.lines.iter().map(|line| line.indent).collect::<Vec<_>>();
            assert_eq!(indents, vec![0, 4, 0, 2]);
            assert_eq!(code.min_indent(), 0);
        }
        other => panic!("expected code, got {other:?}"),
    }
}

#[test]
fn merge_joins_paragraph_split_by_page_break() {
    let rules = default_rules();
    let pages = vec![
        StructuredPage {
            index: 0,
            elements: vec![Element::Paragraph(Paragraph::plain("The standard requires that"))],
            ..StructuredPage::default()
        },
        StructuredPage {
            index: 1,
            elements: vec![
                Element::Paragraph(Paragraph::plain("all conforming implementations accept it.")),
                Element::Paragraph(Paragraph::plain("A new paragraph.")),
            ],
            ..StructuredPage::default()
        },
    ];

    let merged = merge_pages(pages, &rules);
    assert_eq!(merged.elements.len(), 2);
    assert_eq!(
        plain_text(&merged.elements[0]),
        "The standard requires that all conforming implementations accept it."
    );
    assert_eq!(merged.page_starts, vec![(0, 0), (1, 1)]);
}

#[test]
fn merge_keeps_sentence_ending_in_a_footnote_marker_apart() {
    let rules = default_rules();
    let mut ended = RichText::new("The behavior is undefined.");
    ended.push(Inline::FootnoteMarker(3));
    let pages = vec![
        StructuredPage {
            index: 0,
            elements: vec![Element::Paragraph(Paragraph {
                number: None,
                kind: ParagraphKind::Plain,
                text: ended,
            })],
            ..StructuredPage::default()
        },
        StructuredPage {
            index: 1,
            elements: vec![Element::Paragraph(Paragraph::plain("A new paragraph starts here."))],
            ..StructuredPage::default()
        },
    ];

    let merged = merge_pages(pages, &rules);
    assert_eq!(merged.elements.len(), 2);
    assert_eq!(plain_text(&merged.elements[0]), "The behavior is undefined.3)");
    assert_eq!(plain_text(&merged.elements[1]), "A new paragraph starts here.");
}

#[test]
fn merge_is_idempotent_on_a_merged_section() {
    let rules = default_rules();
    let pages = vec![
        StructuredPage {
            index: 0,
            elements: vec![
                Element::Paragraph(Paragraph::plain("First sentence without an end")),
                Element::Code(CodeBlock::new(None, "int a;")),
            ],
            ..StructuredPage::default()
        },
        StructuredPage {
            index: 1,
            elements: vec![
                Element::Code(CodeBlock::new(None, "int b;")),
                Element::Paragraph(Paragraph::plain("Closing text.")),
            ],
            ..StructuredPage::default()
        },
    ];

    let merged = merge_pages(pages, &rules);
    let again = merge_pages(
        vec![StructuredPage {
            index: 0,
            elements: merged.elements.clone(),
            ..StructuredPage::default()
        }],
        &rules,
    );

    assert_eq!(again.elements, merged.elements);
}

#[test]
fn footnote_continued_on_next_page_is_joined_and_anchored_on_first_page() {
    let contents = toc(vec![entry(Some("1"), "Scope", 1)]);
    let matcher = TocMatcher::new(&contents);
    let patterns = LinePatterns::new().expect("compile line patterns");
    let rules = default_rules();
    let builder = PageBuilder {
        matcher: &matcher,
        patterns: &patterns,
        rules: &rules,
    };

    let pages = [
        page(
            3,
            0,
            &[
                "Objects declared here have static storage duration.12)",
                "Further text follows the declaration.",
                "  ____________________",
                "    12) This footnote begins on this page and",
                "        carries on",
            ],
        ),
        page(
            4,
            0,
            &[
                "Subsequent body text on page four.",
                "  ____________________",
                "        onto the next page.",
            ],
        ),
    ];

    let built = build_pages(&builder, &pages);
    assert_eq!(built[0].anchored.iter().copied().collect::<Vec<_>>(), vec![12]);
    assert_eq!(built[1].continued, Some(12));

    let mut section = merge_pages(built, &rules);
    anchor_section_footnotes(&mut section, "body");

    assert_eq!(section.elements.len(), 2);
    assert!(has_marker(&section.elements[..1], 12));
    assert_eq!(section.footnotes.len(), 1);
    let footnote = &section.footnotes[&12];
    assert!(footnote.anchored);
    assert_eq!(footnote.page, 3);
    assert_eq!(footnote.elements.len(), 1);
    assert_eq!(
        plain_text(&footnote.elements[0]),
        "This footnote begins on this page and carries on onto the next page."
    );
    assert!(section.stray.is_empty());
}

#[test]
fn every_footnote_is_anchored_or_listed_as_stray() {
    let contents = toc(vec![entry(Some("1"), "Scope", 1)]);
    let matcher = TocMatcher::new(&contents);
    let patterns = LinePatterns::new().expect("compile line patterns");
    let rules = default_rules();
    let builder = PageBuilder {
        matcher: &matcher,
        patterns: &patterns,
        rules: &rules,
    };

    let pages = [page(
        5,
        0,
        &[
            "Body text refers to a note.8)",
            "Body text without any marker.",
            "    7) Orphan footnote text.",
            "    8) Anchored footnote text.",
        ],
    )];

    let mut section: MergedSection = merge_pages(build_pages(&builder, &pages), &rules);
    anchor_section_footnotes(&mut section, "body");

    let defined = section.footnotes.keys().copied().collect::<Vec<_>>();
    assert_eq!(defined, vec![7, 8]);
    for number in defined {
        let anchored = has_marker(&section.elements, number);
        let stray = section.stray.contains(&number);
        assert!(anchored != stray, "footnote {number} must be exactly one of anchored or stray");
    }
    assert_eq!(section.stray, vec![7]);
}

#[test]
fn marker_pushed_onto_its_own_line_is_spliced_back() {
    let page = StructuredPage {
        index: 2,
        elements: vec![
            Element::Paragraph(Paragraph::plain("The value is unspecified")),
            Element::Code(CodeBlock {
                number: None,
                lines: vec![CodeLine::from_raw("45)"), CodeLine::from_raw("in that case.")],
            }),
        ],
        footnotes: [(45, vec![Element::Paragraph(Paragraph::plain("See the annex."))])]
            .into_iter()
            .collect(),
        ..StructuredPage::default()
    };

    let fixed = put_footnote_placeholders(fix_footnote_refs(page));
    assert_eq!(fixed.elements.len(), 1);
    assert!(has_marker(&fixed.elements, 45));
    assert_eq!(
        plain_text(&fixed.elements[0]),
        "The value is unspecified in that case.45)"
    );
}

#[test]
fn placeholder_ignores_clause_numbers_in_parentheses() {
    let page = StructuredPage {
        index: 6,
        elements: vec![Element::Paragraph(Paragraph::plain(
            "Objects have static duration.2) Conversions are described elsewhere (6.2).",
        ))],
        footnotes: [(2, vec![Element::Paragraph(Paragraph::plain("Or thread duration."))])]
            .into_iter()
            .collect(),
        ..StructuredPage::default()
    };

    let placed = put_footnote_placeholders(page);
    assert!(placed.anchored.contains(&2));
    let Element::Paragraph(paragraph) = &placed.elements[0] else {
        panic!("expected paragraph");
    };
    assert_eq!(
        paragraph.text.runs,
        vec![
            Inline::Text("Objects have static duration.".to_string()),
            Inline::FootnoteMarker(2),
            Inline::Text(" Conversions are described elsewhere (6.2).".to_string()),
        ]
    );
}

#[test]
fn placeholder_skips_forward_references() {
    let page = StructuredPage {
        index: 7,
        elements: vec![
            Element::Paragraph(Paragraph::plain("Values are converted as needed.3)")),
            Element::Paragraph(Paragraph {
                number: None,
                kind: ParagraphKind::ForwardReferences,
                text: RichText::new("bit-fields 3), conversions (6.3)."),
            }),
        ],
        footnotes: [(3, vec![Element::Paragraph(Paragraph::plain("Usual conversions."))])]
            .into_iter()
            .collect(),
        ..StructuredPage::default()
    };

    let placed = put_footnote_placeholders(page);
    assert!(has_marker(&placed.elements[..1], 3));
    assert_eq!(plain_text(&placed.elements[1]), "bit-fields 3), conversions (6.3).");
    assert!(!has_marker(&placed.elements[1..], 3));
}

#[test]
fn linker_links_forward_references_and_code_lines() {
    let contents = toc(vec![
        entry(Some("6.2.1"), "Scopes of identifiers", 3),
        entry(Some("6.3"), "Conversions", 2),
        entry(Some("6.5"), "Expressions", 2),
    ]);
    let patterns = ReferencePatterns::new().expect("compile reference patterns");
    let index = ReferenceIndex::new(&contents, std::iter::empty::<&MergedSection>());
    let linker = Linker {
        patterns: &patterns,
        index: &index,
    };

    let mut counts = LinkCounts::default();
    let mut misses = Vec::new();
    let linked = linker.link_elements(
        vec![
            Element::Paragraph(Paragraph {
                number: None,
                kind: ParagraphKind::ForwardReferences,
                text: RichText::new("conversions (6.3), expressions 6.5, statements 6.8."),
            }),
            Element::Code(CodeBlock::new(None, "int x; /* see 6.2.1 */")),
        ],
        &mut counts,
        &mut misses,
    );

    let Element::Paragraph(forward) = &linked[0] else {
        panic!("expected paragraph");
    };
    let targets = forward
        .text
        .runs
        .iter()
        .filter_map(|run| match run {
            Inline::Link { target, .. } => Some(target.clone()),
            _ => None,
        })
        .collect::<Vec<_>>();
    assert_eq!(
        targets,
        vec![
            LinkTarget::Section("6.3".to_string()),
            LinkTarget::Section("6.5".to_string()),
        ]
    );

    let Element::Code(code) = &linked[1] else {
        panic!("expected code");
    };
    assert!(code.lines[0].text.runs.contains(&Inline::Link {
        target: LinkTarget::Section("6.2.1".to_string()),
        label: "6.2.1".to_string(),
    }));
    assert_eq!(counts, LinkCounts { resolved: 3, unresolved: 1 });
    assert_eq!(misses, vec!["6.8"]);
}

#[test]
fn linker_resolves_known_clauses_and_leaves_misses_as_text() {
    let contents = toc(vec![
        entry(Some("6.2.1"), "Scopes of identifiers", 3),
        entry(Some("6.3"), "Conversions", 2),
    ]);
    let patterns = ReferencePatterns::new().expect("compile reference patterns");
    let index = ReferenceIndex::new(&contents, std::iter::empty::<&MergedSection>());
    let linker = Linker {
        patterns: &patterns,
        index: &index,
    };

    let mut counts = LinkCounts::default();
    let mut misses = Vec::new();
    let linked = linker.link_elements(
        vec![Element::Paragraph(Paragraph::plain(
            "as described in 6.2.1 and see 6.3, also 9.9.9.",
        ))],
        &mut counts,
        &mut misses,
    );

    let Element::Paragraph(paragraph) = &linked[0] else {
        panic!("expected paragraph");
    };
    assert_eq!(
        paragraph.text.runs,
        vec![
            Inline::Text("as described in ".to_string()),
            Inline::Link {
                target: LinkTarget::Section("6.2.1".to_string()),
                label: "6.2.1".to_string(),
            },
            Inline::Text(" and see ".to_string()),
            Inline::Link {
                target: LinkTarget::Section("6.3".to_string()),
                label: "6.3".to_string(),
            },
            Inline::Text(", also 9.9.9.".to_string()),
        ]
    );
    assert_eq!(counts, LinkCounts { resolved: 2, unresolved: 1 });
    assert_eq!(misses, vec!["9.9.9"]);
}

#[test]
fn irregularity_rules_rewrite_text_and_report_unused() {
    let mut rules = IrregularityRules::compile(&[
        Irregularity {
            description: "misspelt month in the running header".to_string(),
            stage: IrregularityStage::Element,
            page: None,
            pattern: "Septermber".to_string(),
            replacement: "September".to_string(),
        },
        Irregularity {
            description: "broken rule on a page that does not exist".to_string(),
            stage: IrregularityStage::Page,
            page: Some(99),
            pattern: "x".to_string(),
            replacement: "y".to_string(),
        },
    ])
    .expect("compile irregularities");

    let chunks = rules.apply_to_pages(vec!["x marks the spot".to_string()]);
    assert_eq!(chunks, vec!["x marks the spot"]);

    let elements = rules.apply_to_elements(
        0,
        vec![Element::Paragraph(Paragraph::plain("Committee Draft — Septermber 7, 2007"))],
    );
    assert_eq!(plain_text(&elements[0]), "Committee Draft — September 7, 2007");
    assert_eq!(rules.applied(), 1);
    assert_eq!(rules.report_unused().len(), 1);
}

#[test]
fn invalid_irregularity_pattern_is_reported_with_its_description() {
    let err = IrregularityRules::compile(&[Irregularity {
        description: "unbalanced".to_string(),
        stage: IrregularityStage::Element,
        page: None,
        pattern: "(".to_string(),
        replacement: String::new(),
    }])
    .expect_err("invalid regex must fail");

    assert!(err.to_string().contains("unbalanced"));
}

#[test]
fn missing_foreword_is_a_structure_error() {
    let pages = vec![
        page(0, 0, &["DRAFT  STANDARD", "Title"]),
        page(1, 0, &["Contents", "1   Scope ....... 1"]),
        page(2, 0, &["Introduction"]),
    ];

    let err = locate_sections(&pages, &SectionMarkers::default()).expect_err("must fail");
    assert_eq!(
        err.downcast_ref::<StructureError>(),
        Some(&StructureError::MissingSection {
            marker: "Foreword".to_string(),
            after: 1,
        })
    );
}

#[test]
fn abstract_paragraphs_start_on_deeply_indented_lines() {
    let rules = default_rules();
    let first = page(
        1,
        0,
        &[
            "Abstract",
            "(Cover sheet to the draft)",
            "        This paragraph starts here",
            "and wraps onto this line.",
        ],
    );
    let second = page(2, 0, &["        Second paragraph."]);

    let parsed = parse_abstract(&[&first, &second], &rules);
    assert_eq!(parsed.title, "Abstract");
    assert_eq!(parsed.note, "(Cover sheet to the draft)");
    let texts = parsed
        .paragraphs
        .iter()
        .map(|paragraph| paragraph.text.plain())
        .collect::<Vec<_>>();
    assert_eq!(
        texts,
        vec![
            "This paragraph starts here and wraps onto this line.",
            "Second paragraph."
        ]
    );
}

#[test]
fn anchors_follow_clause_number_annex_letter_or_title() {
    assert_eq!(heading_anchor_id(Some("6.2.1."), "Scopes"), "6.2.1");
    assert_eq!(heading_anchor_id(None, "Annex B (informative) Library summary"), "B");
    assert_eq!(heading_anchor_id(None, "Foreword"), "Foreword");
}

const HEADER: &str = "ISO/IEC 9999 header";

fn layout_page(body: &[&str], footer: &str) -> String {
    format!("{HEADER}\n\n{}\n\n{footer}\n", body.join("\n"))
}

fn synthetic_document() -> String {
    let pages = [
        layout_page(
            &[
                "DRAFT  STANDARD",
                "Programming languages — Example",
                "",
                "Cover paragraph text.",
            ],
            "i",
        ),
        layout_page(
            &[
                "Contents",
                "Foreword .................... ii",
                "Introduction ................ ii",
                "1   Scope ................... 3",
                "2   Terms ................... 3",
                "    2.1   General ........... 3",
                "Bibliography ................ 4",
                "Index ....................... 5",
            ],
            "ii",
        ),
        layout_page(
            &["Foreword", "", "This document was prepared by a committee."],
            "ii",
        ),
        layout_page(
            &["Introduction", "", "This introduction explains the purpose."],
            "ii",
        ),
        format!("{HEADER}\n\n3\n"),
        layout_page(
            &[
                "    DRAFT  STANDARD",
                "    Programming languages — Example",
                "",
                "    1  Scope",
                "",
                "1   This standard specifies the form of programs.",
                "    It applies to every implementation.12)",
                "",
                "    2  Terms",
                "",
                "    2.1  General",
                "",
                "1   The standard requires that",
                "    ____________________",
                "    12) Footnote about implementations.",
            ],
            "3",
        ),
        layout_page(
            &[
                "    all conforming implementations accept it.",
                "",
                "2   See 2.1 for the general terms & <symbols>.",
                "",
                "    6.9.9  Mystery clause",
            ],
            "4",
        ),
        layout_page(
            &["Bibliography", "", "1.  ISO/IEC 646, Information technology."],
            "5",
        ),
        layout_page(&["Index", "", "  scope, 1"], "6"),
    ];
    pages.join("\u{000C}")
}

#[test]
fn run_converts_layout_text_to_html_with_manifest() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let input = temp.path().join("standard.txt");
    fs::write(&input, synthetic_document()).expect("write layout text");
    let output = temp.path().join("out").join("standard.html");
    let manifest = temp.path().join("manifest.json");
    let dump = temp.path().join("dump");

    run(ConvertArgs {
        input: input.clone(),
        output: Some(output.clone()),
        from_text: true,
        pdftotext: "pdftotext".to_string(),
        config: None,
        manifest: Some(manifest.clone()),
        dump_pages: Some(dump.clone()),
    })
    .expect("conversion succeeds");

    let html = fs::read_to_string(&output).expect("read html");
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("<title>"));
    assert!(html.contains("DRAFT STANDARD"));
    assert!(html.contains("Programming languages — Example"));
    assert!(html.contains("id=\"2.1\""));
    assert!(html.contains("The standard requires that all conforming implementations accept it."));
    assert!(html.contains("<a href=\"#footnote12\" class=\"footnote\">12)</a>"));
    assert!(html.contains("id=\"footnote12\""));
    assert!(html.contains("<a href=\"#2.1\">2.1</a>"));
    assert!(html.contains("general terms &amp; &lt;symbols&gt;."));
    assert!(html.contains("<h4 id=\"6.9.9\" class=\"unresolved\">"));
    assert!(html.contains("<span class=\"caveat\">(not listed in the table of contents)</span>"));
    assert!(html.contains(".caveat {"));
    assert!(!html.contains("stray-footnotes"));

    let manifest: serde_json::Value =
        serde_json::from_slice(&fs::read(&manifest).expect("read manifest")).expect("parse manifest");
    let counts = &manifest["counts"];
    assert_eq!(manifest["extraction_mode"], "text");
    assert_eq!(counts["pages"], 8);
    assert_eq!(counts["separator_pages_dropped"], 1);
    assert_eq!(counts["toc_entries"], 6);
    assert_eq!(counts["headings_resolved"], 6);
    assert_eq!(counts["headings_unresolved"], 1);
    assert_eq!(counts["footnotes"], 1);
    assert_eq!(counts["footnotes_stray"], 0);
    assert!(counts["links_resolved"].as_u64().unwrap_or(0) >= 1);

    assert!(dump.join("raw.txt").exists());
    assert!(dump.join("page_0000.txt").exists());
}

#[test]
fn run_fails_on_missing_input() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let err = run(ConvertArgs {
        input: temp.path().join("missing.txt"),
        output: Some(temp.path().join("missing.html")),
        from_text: true,
        pdftotext: "pdftotext".to_string(),
        config: None,
        manifest: None,
        dump_pages: None,
    })
    .expect_err("missing input must fail");

    assert!(err.to_string().contains("failed to read layout text"));
}

#[test]
fn run_passes_extraction_failure_through() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let input = temp.path().join("standard.pdf");
    fs::write(&input, b"%PDF-1.7").expect("write pdf");

    let err = run(ConvertArgs {
        input,
        output: Some(temp.path().join("standard.html")),
        from_text: false,
        pdftotext: "false".to_string(),
        config: None,
        manifest: None,
        dump_pages: None,
    })
    .expect_err("failing extractor must fail the run");

    let extraction = err
        .downcast_ref::<ExtractionError>()
        .expect("extraction error is kept");
    assert_eq!(extraction.program, "false");
    assert_eq!(extraction.code, 1);
}
