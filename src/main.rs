use std::fs;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use log::{error, info, LevelFilter};

use pixcat::config::{SettingsSource, ViewerConfig, KEY_SHOW_IMG_CMD, KEY_TEMP_IMG_PATH};
use pixcat::image::tiff;
use pixcat::{init_logging, run_capture, DapClient, FileSink, Severity, VariableRef};

/// PIXCAT - capture raw image buffers from a paused debug session
#[derive(Debug, Parser)]
#[command(name = "pixcat", version, about)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Capture the image behind a variable of a stopped debug session
    Capture {
        /// Address of the debug adapter (host:port)
        #[arg(short, long)]
        connect: String,

        /// JSON settings file holding the image-viewer keys
        #[arg(short, long)]
        settings: Option<PathBuf>,

        /// Override TempImgPath
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Override ShowImgCmd
        #[arg(long)]
        show_cmd: Option<String>,

        /// Seconds to wait for each adapter response
        #[arg(long, default_value_t = 10)]
        timeout: u64,

        /// Expression of the image variable
        expression: String,
    },
    /// Wrap a raw pixel dump in a TIFF file
    Encode {
        #[arg(long)]
        width: u32,

        #[arg(long)]
        height: u32,

        #[arg(short, long, default_value_t = 8)]
        bits_per_pixel: u32,

        /// Raw pixel file
        input: PathBuf,

        /// Destination TIFF file
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Show the metadata of a TIFF file
    Info {
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    });

    info!("Starting PIXCAT v{}", pixcat::VERSION);

    match cli.command {
        Commands::Capture {
            connect,
            settings,
            output,
            show_cmd,
            timeout,
            expression,
        } => {
            let mut source = match settings {
                Some(path) => SettingsSource::from_file(&path)?,
                None => SettingsSource::new(),
            };
            if let Some(output) = output {
                source.set(KEY_TEMP_IMG_PATH, output.display().to_string());
            }
            if let Some(show_cmd) = show_cmd {
                source.set(KEY_SHOW_IMG_CMD, show_cmd);
            }
            let config = ViewerConfig::from_source(&source);

            let client = DapClient::connect_tcp(connect.as_str())
                .await
                .with_context(|| format!("failed to connect to debug adapter at {}", connect))?
                .with_timeout(Duration::from_secs(timeout));
            let mut sink = FileSink::from_config(&config);
            let variable = VariableRef::new(expression);

            let outcome = run_capture(&client, Some(&variable), &config, &mut sink).await;
            match &outcome {
                pixcat::CaptureOutcome::Captured(_) => println!("{}", outcome.message()),
                pixcat::CaptureOutcome::Failed { severity, message, .. } => {
                    eprintln!("{}: {}", severity, message);
                    process::exit(match severity {
                        Severity::Warning => 2,
                        Severity::Error => 1,
                    });
                }
            }
        }
        Commands::Encode {
            width,
            height,
            bits_per_pixel,
            input,
            output,
        } => {
            let data = fs::read(&input)
                .with_context(|| format!("failed to read {}", input.display()))?;
            let raster = tiff::encode(width, height, bits_per_pixel, &data)
                .map_err(|e| anyhow!("cannot encode {}: {}", input.display(), e))?;
            fs::write(&output, raster.as_bytes())
                .with_context(|| format!("failed to write {}", output.display()))?;
            println!(
                "Wrote {} ({}x{} @ {} bpp, {} bytes)",
                output.display(),
                width,
                height,
                bits_per_pixel,
                raster.len()
            );
        }
        Commands::Info { file } => {
            let bytes = fs::read(&file).with_context(|| format!("failed to read {}", file.display()))?;
            match tiff::parse(&bytes) {
                Ok(info) => {
                    println!("{}", file.display());
                    println!("  size:              {}x{}", info.width, info.height);
                    println!("  bits per sample:   {}", info.bits_per_sample);
                    println!("  samples per pixel: {}", info.samples_per_pixel);
                    println!("  compression:       {}", info.compression);
                    println!("  photometric:       {}", info.photometric);
                    println!("  data:              {} bytes at offset {}", info.data.len(), info.strip_offset);
                }
                Err(e) => {
                    error!("Cannot read {}: {}", file.display(), e);
                    process::exit(1);
                }
            }
        }
    }

    info!("PIXCAT exiting");
    Ok(())
}
