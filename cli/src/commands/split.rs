use anyhow::{Context, Result};
use mapdelta::pipeline::split_file;
use mapdelta::region::PolygonRegions;

pub fn run(cli: &crate::cli::Cli, args: &crate::cli::SplitArgs) -> Result<()> {
    let config = super::load_config(cli)?;
    let regions = PolygonRegions::from_geojson_path(&args.regions)
        .with_context(|| format!("load regions {}", args.regions.display()))?;

    let written = split_file(&args.input, &regions, &args.output, &config)
        .with_context(|| format!("split {}", args.input.display()))?;
    for path in &written {
        println!("{}", path.display());
    }
    tracing::info!(regions = regions.len(), written = written.len(), "split done");
    Ok(())
}
