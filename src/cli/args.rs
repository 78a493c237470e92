use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Your message to the assistant
    #[arg()]
    pub message: Vec<String>,

    /// Thread id to continue (defaults to the last used thread)
    #[arg(short, long)]
    pub thread: Option<String>,

    /// Start the message in a new thread
    #[arg(long)]
    pub new_thread: bool,

    /// List known threads and exit
    #[arg(long)]
    pub list_threads: bool,

    /// Delete a thread and its uploaded files, then exit
    #[arg(long)]
    pub delete_thread: Option<String>,

    /// Print the history of the selected thread and exit
    #[arg(long)]
    pub history: bool,

    /// Create or validate the assistant, store its id, then exit
    #[arg(long)]
    pub init: bool,

    /// Download an image file by id into the data directory and exit
    #[arg(long, value_name = "FILE_ID")]
    pub save_image: Option<String>,

    /// Attach an image file to the message (repeatable)
    #[arg(long)]
    pub attach: Vec<PathBuf>,

    /// Enable debug output
    #[arg(short, long, default_value = "false")]
    pub debug: bool,
}
