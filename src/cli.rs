use clap::Parser;

use crate::zip::StreamOptions;

#[derive(Parser, Debug, Clone)]
#[command(name = "zip64pat")]
#[command(version)]
#[command(about = "Stream-unzip archives, recovering ZIP64 data descriptors on small entries", long_about = None)]
#[command(after_help = "Examples:\n  \
  zip64pat data1.zip -x joe        extract all files except joe from data1.zip\n  \
  cat foo.zip | zip64pat -p - | more   stream foo.zip from stdin into more\n  \
  zip64pat -l https://example.com/archive.zip   list files of a remote ZIP")]
pub struct Cli {
    /// ZIP file path, HTTP URL, or - for stdin
    #[arg(value_name = "FILE")]
    pub file: String,

    /// Files to extract (default: all)
    #[arg(value_name = "FILES")]
    pub files: Vec<String>,

    /// List files (short format)
    #[arg(short = 'l')]
    pub list: bool,

    /// List verbosely
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Extract files to pipe, no messages
    #[arg(short = 'p')]
    pub pipe: bool,

    /// Extract files into exdir
    #[arg(short = 'd', value_name = "DIR")]
    pub extract_dir: Option<String>,

    /// Exclude files that follow
    #[arg(short = 'x', value_name = "FILE", num_args = 1..)]
    pub exclude: Vec<String>,

    /// Never overwrite existing files
    #[arg(short = 'n')]
    pub never_overwrite: bool,

    /// Overwrite files WITHOUT prompting
    #[arg(short = 'o')]
    pub overwrite: bool,

    /// Junk paths (do not make directories)
    #[arg(short = 'j')]
    pub junk_paths: bool,

    /// Quiet mode (-qq => quieter)
    #[arg(short = 'q', action = clap::ArgAction::Count)]
    pub quiet: u8,

    /// Fail on misread ZIP64 data descriptors instead of recovering
    #[arg(long)]
    pub strict: bool,

    /// Read buffer size in bytes
    #[arg(long, value_name = "BYTES", default_value_t = 8192)]
    pub buffer_size: usize,
}

impl Cli {
    pub fn is_http_url(&self) -> bool {
        self.file.starts_with("http://") || self.file.starts_with("https://")
    }

    pub fn is_stdin(&self) -> bool {
        self.file == "-"
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet > 0 || self.pipe
    }

    pub fn is_very_quiet(&self) -> bool {
        self.quiet > 1
    }

    pub fn stream_options(&self) -> StreamOptions {
        StreamOptions {
            buffer_capacity: self.buffer_size,
            recover_extended_descriptors: !self.strict,
        }
    }
}
