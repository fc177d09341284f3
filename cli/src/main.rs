use std::{path::PathBuf, time::Instant};

use clap::{Args, Parser, Subcommand, ValueEnum};
use plr_cli::{
    dump_segments, format_lookup, load_config, parse_key, read_index, read_points, setup_logging,
    write_index,
};
use plr_engine::prelude::*;
use tracing::info;

#[derive(Parser)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit an index over a file of `key,position` lines.
    Train(TrainArgs),
    /// Print the position range of each key.
    Query(QueryArgs),
    /// Write the segment table of an index as CSV.
    Dump(DumpArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum KeyType {
    U32,
    I32,
    #[default]
    U64,
    I64,
    U128,
    I128,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum LayoutArg {
    Compact,
    Ranged,
}

impl From<LayoutArg> for Layout {
    fn from(layout: LayoutArg) -> Self {
        match layout {
            LayoutArg::Compact => Layout::Compact,
            LayoutArg::Ranged => Layout::Ranged,
        }
    }
}

#[derive(Args, Debug)]
pub struct IndexArgs {
    #[arg(long, help = "Path to the index blob.")]
    pub index: PathBuf,

    #[arg(
        long,
        value_name = "LAYOUT",
        help = "Read a raw blob without header, whose records have this layout."
    )]
    pub raw: Option<LayoutArg>,
}

impl IndexArgs {
    fn raw_layout(&self) -> Option<Layout> {
        self.raw.map(Layout::from)
    }
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    #[arg(long, help = "File of `key,position` lines sorted by key.")]
    pub input: PathBuf,

    #[arg(long, help = "Where to write the index blob.")]
    pub output: PathBuf,

    #[arg(long, help = "Maximum distance between a prediction and the true position.")]
    pub gamma: Option<f64>,

    #[arg(long, help = "Record layout.")]
    pub layout: Option<LayoutArg>,

    #[arg(long, help = "Write a raw native-endian blob without header.")]
    pub raw: bool,

    #[arg(long, help = "JSON config file; flags take precedence.")]
    pub config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t, help = "Integer key type.")]
    pub key_type: KeyType,
}

#[derive(Args, Debug)]
pub struct QueryArgs {
    #[command(flatten)]
    pub index: IndexArgs,

    #[arg(long, help = "Answer keys before the first segment with the first segment.")]
    pub clamp: bool,

    #[arg(long, value_enum, default_value_t, help = "Integer key type.")]
    pub key_type: KeyType,

    #[arg(required = true)]
    pub keys: Vec<String>,
}

#[derive(Args, Debug)]
pub struct DumpArgs {
    #[command(flatten)]
    pub index: IndexArgs,

    #[arg(long, help = "CSV file to write, stdout if absent.")]
    pub output: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t, help = "Integer key type.")]
    pub key_type: KeyType,
}

/// Expands to a call of the generic function `$func` instantiated with the
/// key type selected on the command line
macro_rules! with_key_type {
    ($key_type:expr, $func:ident ( $($arg:expr),* )) => {
        match $key_type {
            KeyType::U32 => $func::<u32>($($arg),*),
            KeyType::I32 => $func::<i32>($($arg),*),
            KeyType::U64 => $func::<u64>($($arg),*),
            KeyType::I64 => $func::<i64>($($arg),*),
            KeyType::U128 => $func::<u128>($($arg),*),
            KeyType::I128 => $func::<i128>($($arg),*),
        }
    };
}

fn train<K: Key>(args: &TrainArgs) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(gamma) = args.gamma {
        config.gamma = gamma;
    }
    if let Some(layout) = args.layout {
        config.layout = layout.into();
    }
    config.validate()?;

    let points = read_points(&args.input)?;
    info!(points = points.len(), gamma = config.gamma, layout = ?config.layout, "training");

    let start = Instant::now();
    let array = SegmentArray::<K>::train(config.gamma, config.layout, points)?;
    info!(
        segments = array.len(),
        elapsed = %humantime::format_duration(start.elapsed()),
        "trained index"
    );

    write_index(&array, &args.output, args.raw)
}

fn query<K: Key>(args: &QueryArgs) -> anyhow::Result<()> {
    let mut array = read_index::<K>(&args.index.index, args.index.raw_layout())?;
    if args.clamp {
        array.set_out_of_range(OutOfRange::Clamp);
    }

    for key in &args.keys {
        println!("{}", format_lookup(&array, parse_key::<K>(key)?));
    }
    Ok(())
}

fn dump<K: Key>(args: &DumpArgs) -> anyhow::Result<()> {
    let array = read_index::<K>(&args.index.index, args.index.raw_layout())?;
    dump_segments(&array, args.output.as_deref())
}

fn main() -> anyhow::Result<()> {
    setup_logging("info");

    let cli = Cli::parse();
    match &cli.command {
        Commands::Train(args) => with_key_type!(args.key_type, train(args)),
        Commands::Query(args) => with_key_type!(args.key_type, query(args)),
        Commands::Dump(args) => with_key_type!(args.key_type, dump(args)),
    }
}
