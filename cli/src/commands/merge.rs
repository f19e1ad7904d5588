use anyhow::{Context, Result};
use mapdelta::merge_files;

pub fn run(cli: &crate::cli::Cli, args: &crate::cli::MergeArgs) -> Result<()> {
    let mut config = super::load_config(cli)?;
    config.check_timestamps |= args.check_timestamps;

    let report = merge_files(&args.inputs, &args.output, &config)
        .with_context(|| format!("merge {} inputs into {}", args.inputs.len(), args.output.display()))?;
    if report.skipped {
        tracing::warn!(output = %args.output.display(), "output is up to date, nothing merged");
    } else {
        tracing::info!(objects = report.objects, bands = report.bands, output = %args.output.display(), "merge written");
    }
    Ok(())
}
