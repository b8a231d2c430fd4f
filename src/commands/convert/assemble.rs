use super::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub title: String,
    pub cover_title: String,
    pub cover: MergedSection,
    pub r#abstract: Option<Abstract>,
    pub toc: TableOfContents,
    pub foreword: MergedSection,
    pub introduction: MergedSection,
    pub body: MergedSection,
    pub bibliography: MergedSection,
}

#[derive(Debug, Clone, Copy)]
pub enum Part<'a> {
    Cover {
        title: &'a str,
        section: &'a MergedSection,
    },
    Abstract(&'a Abstract),
    Contents(&'a TableOfContents),
    Section {
        name: &'static str,
        section: &'a MergedSection,
    },
}

impl Document {
    pub fn parts(&self) -> Vec<Part<'_>> {
        let mut parts = vec![Part::Cover {
            title: &self.cover_title,
            section: &self.cover,
        }];
        parts.extend(self.r#abstract.as_ref().map(Part::Abstract));
        parts.push(Part::Contents(&self.toc));
        parts.extend(
            [
                ("foreword", &self.foreword),
                ("introduction", &self.introduction),
                ("body", &self.body),
                ("bibliography", &self.bibliography),
            ]
            .into_iter()
            .map(|(name, section)| Part::Section { name, section }),
        );
        parts
    }

    pub fn sections(&self) -> [(&'static str, &MergedSection); 5] {
        [
            ("cover", &self.cover),
            ("foreword", &self.foreword),
            ("introduction", &self.introduction),
            ("body", &self.body),
            ("bibliography", &self.bibliography),
        ]
    }

    pub fn sections_mut(&mut self) -> [(&'static str, &mut MergedSection); 5] {
        [
            ("cover", &mut self.cover),
            ("foreword", &mut self.foreword),
            ("introduction", &mut self.introduction),
            ("body", &mut self.body),
            ("bibliography", &mut self.bibliography),
        ]
    }
}
