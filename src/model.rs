use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SectionMarkers {
    pub r#abstract: String,
    pub contents: String,
    pub foreword: String,
    pub introduction: String,
    pub bibliography: String,
    pub index: String,
}

impl Default for SectionMarkers {
    fn default() -> Self {
        Self {
            r#abstract: "Abstract".to_string(),
            contents: "Contents".to_string(),
            foreword: "Foreword".to_string(),
            introduction: "Introduction".to_string(),
            bibliography: "Bibliography".to_string(),
            index: "Index".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IrregularityStage {
    Page,
    Element,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Irregularity {
    pub description: String,
    pub stage: IrregularityStage,
    #[serde(default)]
    pub page: Option<usize>,
    pub pattern: String,
    pub replacement: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PipelineConfig {
    pub sections: SectionMarkers,
    pub compound_prefixes: Vec<String>,
    pub irregularities: Vec<Irregularity>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sections: SectionMarkers::default(),
            compound_prefixes: [
                "bit-",
                "cross-",
                "end-of-",
                "floating-",
                "half-",
                "implementation-",
                "little-",
                "locale-",
                "multi-",
                "new-",
                "non-",
                "null-",
                "run-",
                "self-",
                "single-",
                "type-",
                "well-",
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),
            irregularities: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Default, PartialEq, Eq)]
pub struct RunCounts {
    pub pages: usize,
    pub separator_pages_dropped: usize,
    pub toc_entries: usize,
    pub headings_resolved: usize,
    pub headings_unresolved: usize,
    pub footnotes: usize,
    pub footnotes_anchored: usize,
    pub footnotes_stray: usize,
    pub links_resolved: usize,
    pub references_unresolved: usize,
    pub irregularities_applied: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunManifest {
    pub manifest_version: u32,
    pub generated_at: String,
    pub input_path: String,
    pub input_sha256: String,
    pub output_path: String,
    pub extraction_mode: String,
    pub document_title: String,
    pub counts: RunCounts,
    pub warnings: Vec<String>,
}
