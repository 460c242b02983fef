//! Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use ducket_core::storage::{FileContent, FileRef, UploadRequest};
use tokio_util::io::ReaderStream;

#[derive(Parser, Debug)]
#[command(
    name = "ducket",
    version,
    about = "Store files in an S3-compatible bucket or the hosted Ducket service"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List stored files
    List(ListArgs),
    /// Fetch a file and print its key or URL
    Get(FileArgs),
    /// Upload a local file
    Upload(UploadArgs),
    /// Delete a stored file
    Delete(FileArgs),
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only show files under this project
    #[arg(short, long)]
    pub project: Option<String>,
}

#[derive(Args, Debug)]
pub struct FileArgs {
    /// File id
    pub id: String,

    /// Project the file belongs to
    #[arg(short, long)]
    pub project: Option<String>,
}

impl FileArgs {
    pub fn file_ref(&self) -> FileRef {
        FileRef {
            id: self.id.clone(),
            project: self.project.clone(),
        }
    }
}

#[derive(Args, Debug)]
pub struct UploadArgs {
    /// Local file to upload
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// File id to store it under
    pub id: String,

    /// MIME type of the file
    #[arg(short = 't', long, value_name = "MIME")]
    pub content_type: String,

    /// Project to store the file under
    #[arg(short, long)]
    pub project: Option<String>,

    /// Stream the file from disk instead of reading it up front
    #[arg(long)]
    pub stream: bool,
}

impl UploadArgs {
    /// Open or read the local file and build the upload request.
    pub async fn into_request(self) -> std::io::Result<UploadRequest> {
        let content = if self.stream {
            let file = tokio::fs::File::open(&self.path).await?;
            FileContent::from_stream(ReaderStream::new(file))
        } else {
            FileContent::from(tokio::fs::read(&self.path).await?)
        };

        Ok(UploadRequest {
            content,
            id: self.id,
            content_type: self.content_type,
            project: self.project,
        })
    }
}
