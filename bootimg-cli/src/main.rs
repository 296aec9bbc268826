use anyhow::Result;
use bootimg_cli::{commands, parse_padding};
use bootimg_core::PaddingStrategy;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "bootimg")]
#[command(about = "Unpack and repack Android boot images and Huawei UPDATA containers", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract segments and bootimg.json from a boot image
    UnpackBootimg {
        /// Boot image to unpack
        #[arg(short, long)]
        input: String,

        /// Directory receiving the extracted files
        #[arg(short, long, default_value = ".")]
        dir: String,

        /// Padding unit: detect, strict, page, or a size
        #[arg(long, default_value = "detect", value_parser = parse_padding)]
        padding: PaddingStrategy,
    },

    /// Build a boot image from an unpacked directory
    RepackBootimg {
        /// Directory holding bootimg.json and the segments
        #[arg(short, long, default_value = ".")]
        dir: String,

        /// Output boot image
        #[arg(short, long)]
        output: String,
    },

    /// Extract partitions and updatalist.txt from an UPDATA container
    UnpackUpdata {
        /// Container to unpack
        #[arg(short, long)]
        input: String,

        /// Directory receiving the extracted files
        #[arg(short, long, default_value = ".")]
        dir: String,

        /// Check every payload block checksum
        #[arg(long)]
        verify: bool,
    },

    /// Build an UPDATA container from an unpacked directory
    RepackUpdata {
        /// Directory holding updatalist.txt and the partitions
        #[arg(short, long, default_value = ".")]
        dir: String,

        /// Output container
        #[arg(short, long)]
        output: String,
    },

    /// Describe a boot image or UPDATA container
    Info {
        /// File to inspect
        #[arg(short, long)]
        input: String,

        /// Also check UPDATA payload block checksums
        #[arg(long)]
        verify: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    // Execute command
    match cli.command {
        Commands::UnpackBootimg {
            input,
            dir,
            padding,
        } => commands::unpack_bootimg::execute(&input, &dir, padding),

        Commands::RepackBootimg { dir, output } => commands::repack_bootimg::execute(&dir, &output),

        Commands::UnpackUpdata { input, dir, verify } => {
            commands::unpack_updata::execute(&input, &dir, verify)
        }

        Commands::RepackUpdata { dir, output } => commands::repack_updata::execute(&dir, &output),

        Commands::Info { input, verify } => commands::info::execute(&input, verify),
    }
}
