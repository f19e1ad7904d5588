use std::path::PathBuf;

/// Snapshot diff/merge/split CLI (argument schema only)
#[derive(clap::Parser, Debug)]
#[command(name = "mapdelta", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// JSON build configuration (node capacity, cache size, scratch dir, ...)
    #[arg(long, global = true, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Write the tombstones that turn <before> into <after>
    Diff(DiffArgs),

    /// Fold diffs (oldest first, optional base first) into one snapshot
    Merge(MergeArgs),

    /// Split a snapshot into one container per region
    Split(SplitArgs),

    /// List ids whose boxes intersect a lon/lat box, per zoom band
    Query(QueryArgs),
}

#[derive(clap::Args, Debug)]
pub struct DiffArgs {
    /// Older snapshot
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub before: PathBuf,

    /// Newer snapshot
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub after: PathBuf,

    /// Output diff container
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: PathBuf,

    /// Restrict to min_lon,min_lat,max_lon,max_lat (defaults to the whole world)
    #[arg(long, value_parser = parse_bbox, allow_hyphen_values = true)]
    pub bbox: Option<[f64; 4]>,
}

#[derive(clap::Args, Debug)]
pub struct MergeArgs {
    /// Input containers, oldest first
    #[arg(required = true, value_hint = clap::ValueHint::FilePath)]
    pub inputs: Vec<PathBuf>,

    /// Output container
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: PathBuf,

    /// Skip when the output is newer than every input
    #[arg(long)]
    pub check_timestamps: bool,
}

#[derive(clap::Args, Debug)]
pub struct SplitArgs {
    /// Global snapshot
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub input: PathBuf,

    /// GeoJSON FeatureCollection of named region polygons
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub regions: PathBuf,

    /// Output directory, one <region>.mdlt per region
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    pub output: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct QueryArgs {
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub input: PathBuf,

    /// min_lon,min_lat,max_lon,max_lat
    #[arg(long, value_parser = parse_bbox, allow_hyphen_values = true)]
    pub bbox: [f64; 4],
}

fn parse_bbox(s: &str) -> Result<[f64; 4], String> {
    let parts = s.split(',')
        .map(|p| p.trim().parse::<f64>().map_err(|e| format!("{p:?}: {e}")))
        .collect::<Result<Vec<_>, _>>()?;
    <[f64; 4]>::try_from(parts)
        .map_err(|parts| format!("expected 4 comma-separated numbers, got {}", parts.len()))
}
