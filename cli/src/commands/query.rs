use anyhow::{Context, Result};
use mapdelta::query_file;

pub fn run(cli: &crate::cli::Cli, args: &crate::cli::QueryArgs) -> Result<()> {
    let config = super::load_config(cli)?;
    let bbox = super::bbox_arg(&args.bbox)?;

    let hits = query_file(&args.input, &bbox, &config)
        .with_context(|| format!("query {}", args.input.display()))?;
    for (band, ids) in &hits {
        println!("{band}\t{}", ids.len());
        for id in ids {
            println!("\t{id}");
        }
    }
    Ok(())
}
