use super::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionRanges {
    pub running_header: Vec<String>,
    pub cover: Range<usize>,
    pub r#abstract: Option<Range<usize>>,
    pub contents: Range<usize>,
    pub foreword: Range<usize>,
    pub introduction: Range<usize>,
    pub body: Range<usize>,
    pub bibliography: Range<usize>,
    pub index: Option<Range<usize>>,
}

pub fn locate_sections(pages: &[Page], markers: &SectionMarkers) -> Result<SectionRanges> {
    let Some(cover_page) = pages.first() else {
        return Err(StructureError::NoPages.into());
    };
    let running_header = cover_page
        .first_body_line()
        .map(group_words)
        .unwrap_or_default();

    let contents = require(pages, 1, &markers.contents, opens_with(&markers.contents))?;
    let r#abstract = find(pages, 1, opens_with(&markers.r#abstract)).filter(|&start| start < contents);
    let foreword = require(pages, contents + 1, &markers.foreword, opens_with(&markers.foreword))?;
    let introduction = require(
        pages,
        foreword + 1,
        &markers.introduction,
        opens_with(&markers.introduction),
    )?;
    let header_label = running_header.join(" ");
    let body = require(pages, introduction + 1, &header_label, |page: &Page| {
        !running_header.is_empty()
            && page.first_body_line().map(group_words).as_ref() == Some(&running_header)
    })?;
    let bibliography = require(
        pages,
        body + 1,
        &markers.bibliography,
        opens_with(&markers.bibliography),
    )?;
    let index = find(pages, bibliography + 1, opens_with(&markers.index));
    let end = pages.len();

    let cover_end = r#abstract.unwrap_or(contents);
    let ranges = SectionRanges {
        running_header: running_header.clone(),
        cover: 0..cover_end,
        r#abstract: r#abstract.map(|start| start..contents),
        contents: contents..foreword,
        foreword: foreword..introduction,
        introduction: introduction..body,
        body: body..bibliography,
        bibliography: bibliography..index.unwrap_or(end),
        index: index.map(|start| start..end),
    };

    info!(
        cover = ?ranges.cover,
        abstract_pages = ?ranges.r#abstract,
        contents = ?ranges.contents,
        foreword = ?ranges.foreword,
        introduction = ?ranges.introduction,
        body = ?ranges.body,
        bibliography = ?ranges.bibliography,
        index = ?ranges.index,
        "located document sections"
    );

    Ok(ranges)
}

fn opens_with(marker: &str) -> impl Fn(&Page) -> bool + '_ {
    move |page| page.first_body_line() == Some(marker.trim())
}

fn find<F>(pages: &[Page], from: usize, predicate: F) -> Option<usize>
where
    F: Fn(&Page) -> bool,
{
    pages
        .iter()
        .enumerate()
        .skip(from)
        .find(|(_, page)| predicate(page))
        .map(|(index, _)| index)
}

fn require<F>(pages: &[Page], from: usize, marker: &str, predicate: F) -> Result<usize>
where
    F: Fn(&Page) -> bool,
{
    find(pages, from, predicate).ok_or_else(|| {
        StructureError::MissingSection {
            marker: marker.to_string(),
            after: from.saturating_sub(1),
        }
        .into()
    })
}
