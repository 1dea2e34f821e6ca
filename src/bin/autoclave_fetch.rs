use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::{debug, info};

use autoclave::archive::{ArchiveReader, LocalContainers};
use autoclave::{ArchiveCoordinates, ReportIdentifier, ResolveCounters, ResolveError, Resolver, ResolverConfig};

#[derive(Parser)]
#[command(name = "autoclave-fetch")]
#[command(about = "Fetch raw measurement bodies from the spool, peers or archive")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve one measurement through every configured source
    Get {
        /// Resolver config (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Measurement uid
        #[arg(long, conflicts_with = "report_id")]
        uid: Option<String>,

        /// Report id, optionally with --input
        #[arg(long)]
        report_id: Option<String>,

        #[arg(long, requires = "report_id")]
        input: Option<String>,

        /// Override the spool directory
        #[arg(long)]
        spool_dir: Option<PathBuf>,

        /// Peer collector, repeatable; replaces the configured list
        #[arg(long = "peer")]
        peers: Vec<String>,

        /// Write the body here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Extract a record from a local container by explicit coordinates
    Extract {
        /// Directory the container path is relative to
        #[arg(long, default_value = ".")]
        root: PathBuf,

        #[arg(long)]
        container: String,

        #[arg(long)]
        frame_offset: u64,

        #[arg(long)]
        frame_length: u64,

        #[arg(long, default_value_t = 0)]
        intra_offset: u64,

        #[arg(long)]
        length: u64,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Get {
            config,
            uid,
            report_id,
            input,
            spool_dir,
            peers,
            output,
        } => {
            let mut config = match config {
                Some(path) => ResolverConfig::load(&path)?,
                None => ResolverConfig::default(),
            };
            if spool_dir.is_some() {
                config.spool_dir = spool_dir;
            }
            if !peers.is_empty() {
                config.peer_hosts = peers;
            }

            let id = match (uid, report_id) {
                (Some(uid), _) => ReportIdentifier::uid(uid),
                (None, Some(report_id)) => ReportIdentifier::report(report_id, input),
                (None, None) => bail!("one of --uid or --report-id is required"),
            };

            let counters = Arc::new(ResolveCounters::new());
            let resolver = Resolver::from_config(&config, counters.clone())?;
            let result = resolver.resolve(&id);
            debug!("{}", counters.summary());

            match result {
                Ok(body) => write_body(output, &body),
                Err(ResolveError::NotFound) => bail!("measurement not found: {id}"),
                Err(err) => Err(err.into()),
            }
        }
        Commands::Extract {
            root,
            container,
            frame_offset,
            frame_length,
            intra_offset,
            length,
            output,
        } => {
            let reader = ArchiveReader::new(Arc::new(LocalContainers::new(root)));
            let coords = ArchiveCoordinates {
                container_path: container,
                frame_byte_offset: frame_offset,
                frame_byte_length: frame_length,
                intra_frame_offset: intra_offset,
                logical_length: length,
            };

            // Nothing is written until the whole record has decoded.
            let mut extractor = reader.extract(&coords)?;
            let mut body = Vec::new();
            for chunk in &mut extractor {
                body.extend_from_slice(&chunk?);
            }
            info!(
                "extracted {} bytes across {} frames",
                extractor.yielded(),
                extractor.frames_decoded()
            );
            write_body(output, &body)
        }
    }
}

fn open_output(output: Option<PathBuf>) -> Result<Box<dyn Write>> {
    Ok(match output {
        Some(path) => Box::new(
            File::create(&path).with_context(|| format!("create {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    })
}

fn write_body(output: Option<PathBuf>, body: &[u8]) -> Result<()> {
    let mut sink = open_output(output)?;
    sink.write_all(body)?;
    sink.flush()?;
    Ok(())
}
