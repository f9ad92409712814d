mod channel;
mod generator;
mod link;
mod sim;
mod stats;
mod throughput;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use polar_common::construction::Method;
use polar_core::Construction;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "polar_host", about = "Polar code construction, decoding and BFER simulation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Construction method selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum MethodArg {
    /// Gaussian approximation, `--noise` is the AWGN sigma
    Ga,
    /// Standardized 5G reliability sequence
    Table,
    /// Error-bound datasets under `--path`, keyed by N and `--noise`
    Bounds,
    /// Binary erasure channel, `--noise` is the erasure probability
    Bec,
    /// Explicit channel-order file at `--path`
    File,
}

impl From<MethodArg> for Method {
    fn from(arg: MethodArg) -> Self {
        match arg {
            MethodArg::Ga => Method::GaussianApproximation,
            MethodArg::Table => Method::ReliabilityTable,
            MethodArg::Bounds => Method::ErrorBounds,
            MethodArg::Bec => Method::ErasureChannel,
            MethodArg::File => Method::ChannelOrder,
        }
    }
}

/// SC kernel used by the decoders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KernelKind {
    MinSum,
    BoxPlus,
}

/// Code parameters shared by the subcommands.
#[derive(Args, Debug, Clone)]
struct CodeArgs {
    /// Code length, a power of two
    #[arg(short, long, default_value_t = 256)]
    n: usize,
    /// Information bits per frame, CRC included
    #[arg(short, long, default_value_t = 128)]
    k: usize,
    #[arg(long, value_enum, default_value_t = MethodArg::Table)]
    method: MethodArg,
    /// Construction noise (sigma, or erasure probability for bec)
    #[arg(long)]
    noise: Option<f64>,
    /// Channel-order file or error-bound dataset root
    #[arg(long)]
    path: Option<PathBuf>,
}

impl CodeArgs {
    fn construction(&self) -> Result<Construction> {
        polar_io::construction::resolve(self.method.into(), self.n, self.noise, self.path.as_deref())
    }
}

/// Decoder parameters shared by `run` and `sim`.
#[derive(Args, Debug, Clone)]
struct DecoderArgs {
    /// Maximum SC-Flip reruns, ignored without a CRC
    #[arg(long, default_value_t = 0)]
    flips: usize,
    /// CRC polynomial, e.g. 8-DVB-S2, 16-CCITT, 24-5GNR-C or 16-0x1021
    #[arg(long)]
    crc: Option<String>,
    #[arg(long, value_enum, default_value_t = KernelKind::MinSum)]
    kernel: KernelKind,
    /// Seed of the noise generator
    #[arg(long, default_value_t = 1)]
    seed: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the frozen mask of a code
    Construct {
        #[command(flatten)]
        code: CodeArgs,
    },
    /// Write random information frames to a .b8 file
    Gen {
        #[arg(long, default_value = "frames.b8")]
        out: PathBuf,
        #[arg(short, long, default_value_t = 128)]
        k: usize,
        #[arg(long, default_value_t = 100_000)]
        frames: usize,
        #[arg(long)]
        crc: Option<String>,
        #[arg(long, default_value_t = 12345)]
        seed: u64,
    },
    /// Decode the frames of a .b8 file through an AWGN channel
    Run {
        #[arg(short, long)]
        frames_file: PathBuf,
        #[arg(long)]
        ebn0: f64,
        #[command(flatten)]
        code: CodeArgs,
        #[command(flatten)]
        decoder: DecoderArgs,
    },
    /// Monte-Carlo BFER sweep over Eb/N0
    Sim {
        #[arg(long, default_value_t = 0.0)]
        min_ebn0: f64,
        #[arg(long, default_value_t = 4.0)]
        max_ebn0: f64,
        #[arg(long, default_value_t = 0.5)]
        step: f64,
        /// Maximum frames per point
        #[arg(long, default_value_t = 100_000)]
        frames: u64,
        /// Frame errors after which a point stops
        #[arg(long)]
        max_fe: Option<u64>,
        #[command(flatten)]
        code: CodeArgs,
        #[command(flatten)]
        decoder: DecoderArgs,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Construct { code } => {
            let link = link::Link::new(code.n, code.k, &code.construction()?, None, 0, KernelKind::MinSum)?;
            println!("N = {}, K = {}, rate = {:.4}", link.n(), link.k(), link.mask.rate());
            println!("Frozen mask (1 = frozen): {}", link.mask);
            println!("Information positions: {:?}", link.mask.info_positions());
        }
        Commands::Gen {
            out,
            k,
            frames,
            crc,
            seed,
        } => {
            generator::generate_frames(&out, k, frames, crc.as_deref(), seed)?;
        }
        Commands::Run {
            frames_file,
            ebn0,
            code,
            decoder,
        } => {
            let link = link::Link::new(
                code.n,
                code.k,
                &code.construction()?,
                decoder.crc.as_deref(),
                decoder.flips,
                decoder.kernel,
            )?;
            throughput::run_benchmark(&link, &frames_file, ebn0, decoder.seed)?;
        }
        Commands::Sim {
            min_ebn0,
            max_ebn0,
            step,
            frames,
            max_fe,
            code,
            decoder,
        } => {
            let cfg = sim::SweepConfig {
                n: code.n,
                k: code.k,
                method: code.method.into(),
                noise: code.noise,
                path: code.path,
                crc: decoder.crc,
                n_flips: decoder.flips,
                kernel: decoder.kernel,
                min_ebn0,
                max_ebn0,
                step,
                max_frames: frames,
                max_fe,
                seed: decoder.seed,
            };
            sim::run_sweep(&cfg)?;
        }
    }
    Ok(())
}
