use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::ops::Range;
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result};
use regex::{Captures, Regex};
use tracing::{debug, info, warn};

use crate::cli::ConvertArgs;
use crate::error::{ExtractionError, StructureError};
use crate::model::{
    Irregularity, IrregularityStage, PipelineConfig, RunCounts, RunManifest, SectionMarkers,
};
use crate::util::{ensure_directory, now_utc_string, sha256_file, write_json_pretty, write_text};

const MANIFEST_VERSION: u32 = 1;

mod assemble;
mod elements;
mod extract;
mod footnotes;
mod html;
mod irregularities;
mod line_parse;
mod linker;
mod merge;
mod pages;
mod run;
mod sections;
mod structured;
#[cfg(test)]
mod tests;
mod toc;
mod words;

pub use run::run;

use assemble::*;
use elements::*;
use extract::*;
use footnotes::*;
use html::*;
use irregularities::*;
use line_parse::*;
use linker::*;
use merge::*;
use pages::*;
use sections::*;
use structured::*;
use toc::*;
use words::*;
