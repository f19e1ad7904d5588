use anyhow::{Context, Result};
use mapdelta::{diff_files, BBox};

pub fn run(cli: &crate::cli::Cli, args: &crate::cli::DiffArgs) -> Result<()> {
    let config = super::load_config(cli)?;
    let region = match &args.bbox {
        Some(bbox) => super::bbox_arg(bbox)?,
        None => BBox::WORLD,
    };

    let report = diff_files(&args.before, &args.after, &args.output, &region, &config)
        .with_context(|| format!("diff {} -> {}", args.before.display(), args.after.display()))?;
    tracing::info!(bands = report.bands, tombstones = report.tombstones, output = %args.output.display(), "diff written");
    Ok(())
}
