use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructureError {
    #[error("input contains no pages")]
    NoPages,

    #[error("section marker '{marker}' not found after page {after}")]
    MissingSection { marker: String, after: usize },

    #[error("no table-of-contents entry found on pages {first}..{last}")]
    EmptyTableOfContents { first: usize, last: usize },
}

#[derive(Error, Debug, Clone)]
#[error("{program} exited with status {code}")]
pub struct ExtractionError {
    pub program: String,
    pub code: i32,
    pub stderr: String,
}
