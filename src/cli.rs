use clap::{Parser, Subcommand};

use ytlearn::pipeline::DEFAULT_QUESTIONS;
use ytlearn::prompt::NoteStyle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Timestamped,
    Json,
}

#[derive(Parser)]
#[command(
    name = "ytlearn",
    about = "Study notes and quizzes from YouTube transcripts",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Show resolved configuration and extraction details
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API
    Serve {
        /// Address to bind (default from config, else 0.0.0.0)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (default from PORT/config, else 5000)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print the transcript of a video
    Transcript {
        /// YouTube video URL or video ID
        url: String,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Generate study notes and print the JSON response
    Notes {
        /// YouTube video URL or video ID
        url: String,

        /// Note style
        #[arg(short, long, value_enum, default_value_t = NoteStyle::Comprehensive)]
        style: NoteStyle,
    },

    /// Generate a multiple-choice quiz and print the JSON response
    Quiz {
        /// YouTube video URL or video ID
        url: String,

        /// Number of questions
        #[arg(short, long, default_value_t = DEFAULT_QUESTIONS, allow_negative_numbers = true)]
        questions: i64,
    },
}
