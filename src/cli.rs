use std::path::PathBuf;

use clap::{Args, Parser};

#[derive(Parser, Debug)]
#[command(
    name = "stdhtml",
    version,
    about = "Rebuild a paginated standards document as browsable HTML"
)]
pub struct Cli {
    #[command(flatten)]
    pub convert: ConvertArgs,
}

#[derive(Args, Debug, Clone)]
pub struct ConvertArgs {
    pub input: PathBuf,

    pub output: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub from_text: bool,

    #[arg(long, default_value = "pdftotext")]
    pub pdftotext: String,

    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub manifest: Option<PathBuf>,

    #[arg(long)]
    pub dump_pages: Option<PathBuf>,
}

impl ConvertArgs {
    pub fn output_path(&self) -> PathBuf {
        if let Some(output) = &self.output {
            return output.clone();
        }

        let stem = self
            .input
            .file_stem()
            .map(|value| value.to_os_string())
            .unwrap_or_else(|| "document".into());
        PathBuf::from(stem).with_extension("html")
    }

    pub fn extraction_mode(&self) -> &'static str {
        if self.from_text { "text" } else { "pdftotext" }
    }
}
