use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "rfb")]
#[command(about = "RFB-RS - ETL for Brazilian Federal Revenue CNPJ registry data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Download data files from Federal Revenue
    Download {
        /// Directory to save downloaded files
        #[arg(short, long, default_value = "data")]
        directory: String,

        /// Skip already downloaded files
        #[arg(short, long)]
        skip_existing: bool,

        /// Maximum parallel downloads
        #[arg(short, long, default_value_t = 4)]
        parallel: usize,

        /// Restart downloads from beginning
        #[arg(short, long)]
        restart: bool,
    },

    /// Transform downloaded CSV shards into gzip-compressed NDJSON
    Transform {
        /// Directory with downloaded and extracted shards
        #[arg(short, long, default_value = "data")]
        directory: String,

        /// Output file for the gzip-compressed NDJSON stream
        #[arg(short, long, default_value = "export.json.gz")]
        output: String,

        /// Enable privacy mode (mask sensitive data)
        #[arg(short, long)]
        privacy: bool,

        /// Rows buffered per writer flush and output-channel capacity unit
        #[arg(short, long, default_value_t = rfb_rs::transform::BATCH_SIZE)]
        batch_size: usize,

        /// Use an in-memory KV staging store instead of spilling to disk
        #[arg(short = 'x', long)]
        high_memory: bool,
    },

    /// Check integrity of downloaded ZIP files
    Check {
        /// Directory with downloaded files
        #[arg(short, long, default_value = "data")]
        directory: String,

        /// Delete corrupted files
        #[arg(short = 'x', long)]
        delete: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Download {
            directory,
            skip_existing,
            parallel,
            restart,
        } => {
            if parallel == 0 {
                eprintln!("Error: parallel downloads must be at least 1");
                std::process::exit(2);
            }

            let config = rfb_rs::download::DownloadConfig {
                data_dir: directory,
                skip_existing,
                max_parallel: parallel,
                restart,
                ..Default::default()
            };
            let downloader = rfb_rs::Downloader::new(config);
            downloader.download().await?;
        }

        Commands::Transform {
            directory,
            output,
            privacy,
            batch_size,
            high_memory,
        } => {
            if batch_size == 0 {
                eprintln!("Error: batch-size must be at least 1");
                std::process::exit(2);
            }

            let config = rfb_rs::transform::TransformConfig {
                data_dir: directory,
                output,
                batch_size,
                high_memory,
                privacy_mode: privacy,
            };
            let mut transformer = rfb_rs::Transformer::new(config);

            if let Err(e) = transformer.load_lookups() {
                eprintln!("Error: {e}");
                std::process::exit(2);
            }

            if let Err(e) = transformer.transform() {
                eprintln!("Error: {e}");
                let exit_code = match e {
                    rfb_rs::transform::TransformError::Config(_) => 2,
                    _ => 1,
                };
                std::process::exit(exit_code);
            }
        }

        Commands::Check { directory, delete } => {
            use std::path::Path;
            use walkdir::WalkDir;

            let data_dir = Path::new(&directory);
            if !data_dir.exists() {
                eprintln!("Directory does not exist: {}", directory);
                std::process::exit(2);
            }

            let mut checked = 0;
            let mut errors = 0;

            for entry in WalkDir::new(data_dir)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("zip"))
            {
                checked += 1;
                let path = entry.path();
                print!("Checking {}... ", path.display());

                match rfb_rs::download::check_zip_integrity(path) {
                    Ok(_) => {
                        println!("OK");
                    }
                    Err(e) => {
                        println!("ERROR: {}", e);
                        errors += 1;
                        if delete {
                            match std::fs::remove_file(path) {
                                Ok(_) => println!("  Deleted corrupted file"),
                                Err(e) => eprintln!("  Failed to delete: {}", e),
                            }
                        }
                    }
                }
            }

            println!("\nChecked {} files, {} errors", checked, errors);
        }
    }

    Ok(())
}
