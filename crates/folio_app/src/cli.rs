use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "folio")]
#[command(about = "Terminal client for document extraction, page navigation and Q&A sessions")]
pub struct Cli {
    /// Backend base URL (overrides the config file and FOLIO_BASE_URL)
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Configuration file
    #[arg(long, global = true, default_value = "folio.ron")]
    pub config: PathBuf,

    /// Mirror the log to the terminal
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Extract actionables from a document and follow the progress stream
    Extract {
        document_id: String,
        /// Re-run even if a stored result exists
        #[arg(long)]
        force: bool,
    },
    /// List previously extracted actionables
    Actionables {
        document_id: String,
        /// Open the source page of the n-th item (1-based)
        #[arg(long)]
        open: Option<usize>,
    },
    /// Ask a question about a document, or `research` for the whole corpus
    Ask {
        scope: String,
        question: String,
        /// Start a fresh session instead of continuing the latest one
        #[arg(long)]
        new: bool,
        /// Continue a specific stored session
        #[arg(long, conflicts_with = "new")]
        session: Option<String>,
        /// Open the page of the n-th citation of the answer (1-based)
        #[arg(long)]
        open_citation: Option<usize>,
    },
    /// List stored sessions of a scope
    Sessions {
        scope: String,
        /// Delete a session before listing
        #[arg(long)]
        delete: Option<String>,
    },
    /// Fetch a document and show it at a page
    Open {
        document_id: String,
        /// 1-based page number
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Send feedback on an answer
    Feedback {
        record_id: String,
        #[arg(long)]
        rating: Option<u8>,
        #[arg(long, default_value = "")]
        text: String,
    },
}
