use super::*;

pub fn run(args: ConvertArgs) -> Result<()> {
    let output_path = args.output_path();
    info!(
        input = %args.input.display(),
        output = %output_path.display(),
        mode = args.extraction_mode(),
        "starting conversion"
    );

    let config = load_config(args.config.as_deref())?;
    let raw = if args.from_text {
        read_layout_text(&args.input)?
    } else {
        extract_layout_text(&args.pdftotext, &args.input)?
    };

    let mut irregularities = IrregularityRules::compile(&config.irregularities)?;
    let chunks = irregularities.apply_to_pages(split_page_chunks(&raw));
    let (pages, dropped) = drop_separator_pages(segment_pages(&chunks));
    info!(pages = pages.len(), dropped, "segmented pages");

    if let Some(dump_dir) = &args.dump_pages {
        dump_pages(dump_dir, &raw, &pages)?;
    }

    let conversion = convert_pages(&pages, &config, &mut irregularities)?;
    let html = render_document(&conversion.document);
    write_text(&output_path, &html)?;
    info!(path = %output_path.display(), bytes = html.len(), "wrote html");

    let mut warnings = conversion.warnings;
    warnings.extend(irregularities.report_unused());

    let mut counts = conversion.counts;
    counts.pages = pages.len();
    counts.separator_pages_dropped = dropped;
    counts.irregularities_applied = irregularities.applied();

    info!(
        headings_resolved = counts.headings_resolved,
        headings_unresolved = counts.headings_unresolved,
        footnotes = counts.footnotes,
        footnotes_stray = counts.footnotes_stray,
        links_resolved = counts.links_resolved,
        references_unresolved = counts.references_unresolved,
        warnings = warnings.len(),
        "conversion completed"
    );

    if let Some(manifest_path) = &args.manifest {
        let manifest = RunManifest {
            manifest_version: MANIFEST_VERSION,
            generated_at: now_utc_string(),
            input_path: args.input.display().to_string(),
            input_sha256: sha256_file(&args.input)?,
            output_path: output_path.display().to_string(),
            extraction_mode: args.extraction_mode().to_string(),
            document_title: conversion.document.title.clone(),
            counts,
            warnings,
        };
        write_json_pretty(manifest_path, &manifest)?;
        info!(path = %manifest_path.display(), "wrote run manifest");
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let Some(path) = path else {
        return Ok(PipelineConfig::default());
    };

    let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let config: PipelineConfig = serde_json::from_slice(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    info!(
        path = %path.display(),
        irregularities = config.irregularities.len(),
        "loaded pipeline config"
    );
    Ok(config)
}

fn drop_separator_pages(pages: Vec<Page>) -> (Vec<Page>, usize) {
    let total = pages.len();
    let kept = pages
        .into_iter()
        .filter(|page| !page.body.is_empty())
        .collect::<Vec<Page>>();
    let dropped = total - kept.len();
    (kept, dropped)
}

fn dump_pages(dir: &Path, raw: &str, pages: &[Page]) -> Result<()> {
    ensure_directory(dir)?;
    write_text(&dir.join("raw.txt"), raw)?;
    for page in pages {
        let text = format!(
            "{}\n\n{}\n\n{}\n",
            page.header.join("\n"),
            page.body.join("\n"),
            page.footer.join("\n")
        );
        write_text(&dir.join(format!("page_{:04}.txt", page.index)), &text)?;
    }
    info!(dir = %dir.display(), pages = pages.len(), "dumped segmented pages");
    Ok(())
}

struct Conversion {
    document: Document,
    counts: RunCounts,
    warnings: Vec<String>,
}

fn convert_pages(
    pages: &[Page],
    config: &PipelineConfig,
    irregularities: &mut IrregularityRules,
) -> Result<Conversion> {
    let ranges = locate_sections(pages, &config.sections)?;

    let toc_patterns = TocPatterns::new()?;
    let toc_pages = pages[ranges.contents.clone()].iter().collect::<Vec<&Page>>();
    let mut toc = parse_toc(&toc_pages, &toc_patterns)?;
    toc.remove_trailing_index(&config.sections.index);

    let line_patterns = LinePatterns::new()?;
    let rules = JoinRules {
        compound_prefixes: config.compound_prefixes.clone(),
    };

    let r#abstract = ranges.r#abstract.clone().map(|range| {
        let abstract_pages = pages[range].iter().collect::<Vec<&Page>>();
        parse_abstract(&abstract_pages, &rules)
    });

    let matcher = TocMatcher::new(&toc);
    let builder = SectionBuilder {
        pages: PageBuilder {
            matcher: &matcher,
            patterns: &line_patterns,
            rules: &rules,
        },
        all_pages: pages,
    };
    let mut headings = HeadingCounts::default();

    // The cover never advances the contents cursor.
    let mut cover_headings = HeadingCounts::default();
    let (cover, cover_title, _) = builder.build_section(
        ranges.cover.clone(),
        Layout::Cover,
        Carry::default(),
        irregularities,
        &mut cover_headings,
    );

    let carry = Carry::default();
    let (foreword, _, carry) = builder.build_section(
        ranges.foreword.clone(),
        Layout::Plain,
        carry,
        irregularities,
        &mut headings,
    );
    let (introduction, _, carry) = builder.build_section(
        ranges.introduction.clone(),
        Layout::Plain,
        carry,
        irregularities,
        &mut headings,
    );
    let (body, _, carry) = builder.build_section(
        ranges.body.clone(),
        Layout::CoverThenPlain,
        carry,
        irregularities,
        &mut headings,
    );
    let (bibliography, _, carry) = builder.build_section(
        ranges.bibliography.clone(),
        Layout::NoMargin,
        carry,
        irregularities,
        &mut headings,
    );
    info!(
        headings_resolved = headings.resolved,
        headings_unresolved = headings.unresolved.len(),
        last_entry = carry.cursor.0,
        last_footnote = ?carry.last_footnote,
        "built structured pages"
    );
    if !headings.unresolved.is_empty() {
        warn!(
            count = headings.unresolved.len(),
            "headings without a table-of-contents entry are marked unresolved"
        );
    }

    let mut document = Document {
        title: ranges.running_header.join(" "),
        cover_title: cover_title.unwrap_or_default(),
        cover: merge_section("cover", cover, &rules),
        r#abstract,
        toc,
        foreword: merge_section("foreword", foreword, &rules),
        introduction: merge_section("introduction", introduction, &rules),
        body: merge_section("body", body, &rules),
        bibliography: merge_section("bibliography", bibliography, &rules),
    };

    let reference_patterns = ReferencePatterns::new()?;
    let reference_index = ReferenceIndex::new(
        &document.toc,
        document.sections().into_iter().map(|(_, section)| section),
    );
    let linker = Linker {
        patterns: &reference_patterns,
        index: &reference_index,
    };
    let mut links = LinkCounts::default();
    let mut missed_references = Vec::new();
    for (_, section) in document.sections_mut() {
        linker.link_section(section, &mut links, &mut missed_references);
    }
    info!(
        resolved = links.resolved,
        unresolved = links.unresolved,
        "linked cross-references"
    );
    if links.unresolved > 0 {
        warn!(count = links.unresolved, "cross-references left as plain text");
    }

    let footnotes = footnote_states(document.sections().into_iter().map(|(_, section)| section));
    let stray = footnotes.values().filter(|anchored| !**anchored).count();

    let mut warnings = Vec::new();
    warnings.extend(
        headings
            .unresolved
            .iter()
            .map(|heading| format!("unresolved heading: {heading}")),
    );
    for (name, section) in document.sections() {
        warnings.extend(
            section
                .stray
                .iter()
                .map(|number| format!("stray footnote {number} in {name}")),
        );
    }
    warnings.extend(
        missed_references
            .iter()
            .map(|reference| format!("unresolved reference: {reference}")),
    );

    let counts = RunCounts {
        toc_entries: document.toc.entries.len(),
        headings_resolved: headings.resolved,
        headings_unresolved: headings.unresolved.len(),
        footnotes: footnotes.len(),
        footnotes_anchored: footnotes.len() - stray,
        footnotes_stray: stray,
        links_resolved: links.resolved,
        references_unresolved: links.unresolved,
        ..RunCounts::default()
    };

    Ok(Conversion {
        document,
        counts,
        warnings,
    })
}

fn merge_section(name: &str, pages: Vec<StructuredPage>, rules: &JoinRules) -> MergedSection {
    let page_count = pages.len();
    let mut section = merge_pages(pages, rules);
    anchor_section_footnotes(&mut section, name);
    info!(
        section = name,
        pages = page_count,
        elements = section.elements.len(),
        footnotes = section.footnotes.len(),
        stray = section.stray.len(),
        "merged section"
    );
    section
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    Cover,
    CoverThenPlain,
    Plain,
    NoMargin,
}

struct SectionBuilder<'a> {
    pages: PageBuilder<'a>,
    all_pages: &'a [Page],
}

impl<'a> SectionBuilder<'a> {
    fn build_section(
        &self,
        range: Range<usize>,
        layout: Layout,
        mut carry: Carry,
        irregularities: &mut IrregularityRules,
        headings: &mut HeadingCounts,
    ) -> (Vec<StructuredPage>, Option<String>, Carry) {
        let mut built = Vec::with_capacity(range.len());
        let mut title = None;

        for (position, page) in self.all_pages[range].iter().enumerate() {
            let first = position == 0;
            let page = match layout {
                Layout::Cover | Layout::NoMargin => Page {
                    indent: 0,
                    ..page.clone()
                },
                Layout::CoverThenPlain | Layout::Plain => page.clone(),
            };

            let cover_style = first && matches!(layout, Layout::Cover | Layout::CoverThenPlain);
            let (structured, next) = if cover_style {
                let (cover, next) = self.pages.build_cover(&page, carry, headings);
                debug!(
                    page = page.index,
                    subheader = ?cover.subheader,
                    title = %cover.title,
                    "built cover-style page"
                );
                title = Some(cover.title);
                (cover.page, next)
            } else {
                self.pages.build(&page, 0, carry, headings)
            };
            carry = next;

            built.push(finish_page(structured, self.pages.rules, irregularities));
        }

        (built, title, carry)
    }
}

fn finish_page(
    page: StructuredPage,
    rules: &JoinRules,
    irregularities: &mut IrregularityRules,
) -> StructuredPage {
    let elements = irregularities.apply_to_elements(page.index, page.elements);
    let page = StructuredPage {
        elements: reindent_code(elements),
        ..page
    };
    let page = rework_footnotes(page, rules);
    let page = fix_footnote_refs(page);
    put_footnote_placeholders(page)
}
