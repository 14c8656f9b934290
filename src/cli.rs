use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::filename::RuleName;

#[derive(Debug, Parser)]
#[command(
    name = "bookbrowser",
    about = "Index and serve a directory of ebooks",
    version = crate::VERSION,
    disable_help_flag = true
)]
pub struct Cli {
    /// The directory to load books from (must exist)
    #[arg(short = 'b', long = "bookdir")]
    pub book_dir: Option<PathBuf>,

    /// The directory to store the database and cover thumbnails
    #[arg(short = 't', long = "datadir")]
    pub data_dir: Option<PathBuf>,

    /// The address to bind the server to ([IP]:PORT)
    #[arg(short = 'a', long, default_value = ":8090")]
    pub addr: String,

    /// Do not index covers
    #[arg(short = 'n', long = "nocovers")]
    pub no_covers: bool,

    /// Filename rules used for books without embedded metadata, in order
    #[arg(
        short = 'r',
        long = "filename-rules",
        value_enum,
        value_delimiter = ',',
        default_values_t = [RuleName::Dashes, RuleName::TitleOnly]
    )]
    pub filename_rules: Vec<RuleName>,

    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Show this help text
    #[arg(short = 'h', long, action = ArgAction::SetTrue)]
    pub help: bool,
}
