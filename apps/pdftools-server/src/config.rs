//! Command-line and environment configuration

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use pdftools_core::upload::{UploadPolicy, MIB};

/// Command-line arguments for the PDF tools server
#[derive(Parser, Debug)]
#[command(name = "pdftools-server")]
#[command(about = "HTTP server for merging, splitting, cropping and converting PDFs")]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "3000")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Maximum number of files per request
    #[arg(long, env = "PDFTOOLS_MAX_FILES", default_value = "20")]
    pub max_files: usize,

    /// Maximum size of a single file, in MiB
    #[arg(long, env = "PDFTOOLS_MAX_FILE_SIZE_MB", default_value = "200")]
    pub max_file_size_mb: u64,

    /// LibreOffice binary used for word-to-pdf
    #[arg(long, env = "PDFTOOLS_SOFFICE", default_value = "soffice")]
    pub soffice: PathBuf,

    /// Directory with the web frontend, served for unmatched routes
    #[arg(long, env = "PDFTOOLS_STATIC_DIR")]
    pub static_dir: Option<PathBuf>,

    /// Write a copy of every result here (diagnostics only)
    #[arg(long, env = "PDFTOOLS_DEBUG_DUMP_DIR")]
    pub debug_dump_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Settled configuration, fixed for the life of the process.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub policy: UploadPolicy,
    pub soffice: PathBuf,
    pub static_dir: Option<PathBuf>,
    pub debug_dump_dir: Option<PathBuf>,
}

impl ServerConfig {
    pub fn from_args(args: &Args) -> anyhow::Result<Self> {
        let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
        anyhow::ensure!(args.max_files > 0, "max files must be at least 1");
        anyhow::ensure!(args.max_file_size_mb > 0, "max file size must be at least 1 MiB");

        Ok(Self {
            addr,
            policy: UploadPolicy::with_limits(
                args.max_files,
                args.max_file_size_mb.saturating_mul(MIB),
            ),
            soffice: args.soffice.clone(),
            static_dir: args.static_dir.clone(),
            debug_dump_dir: args.debug_dump_dir.clone(),
        })
    }
}
