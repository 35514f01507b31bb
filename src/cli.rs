use clap::Parser;
use std::path::PathBuf;

/// Batch convert .doc/.docx files in a folder to Markdown
#[derive(Parser, Debug)]
#[command(name = "docs2md", version, about)]
pub struct Cli {
    /// Folder containing .doc/.docx files, or a single document
    pub input: PathBuf,

    /// Output folder. Defaults to "markdown" inside the input folder
    /// (or next to the input file).
    pub output: Option<PathBuf>,

    /// Search subfolders recursively
    #[arg(short, long, default_value_t = false)]
    pub recursive: bool,

    /// Also convert legacy .doc files (requires LibreOffice)
    #[arg(long, default_value_t = false)]
    pub include_doc: bool,

    /// Overwrite existing .md files
    #[arg(long, default_value_t = false)]
    pub overwrite: bool,

    /// Path to the LibreOffice `soffice` executable (default: search PATH)
    #[arg(long, value_name = "PATH")]
    pub soffice: Option<PathBuf>,

    /// Do not show a progress bar
    #[arg(short, long, default_value_t = false)]
    pub quiet: bool,

    /// Log each converted file
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl Cli {
    pub fn output_dir(&self) -> PathBuf {
        if let Some(ref path) = self.output {
            return path.clone();
        }

        if self.input.is_file() {
            self.input
                .parent()
                .unwrap_or_else(|| std::path::Path::new("."))
                .join("markdown")
        } else {
            self.input.join("markdown")
        }
    }
}
