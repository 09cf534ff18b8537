use std::path::PathBuf;

use super::Context;
use crate::config::files::{SchemaBindingConfig, read_yaml};
use crate::report::{csv_file_name, validate_all, validate_view, write_csv};

pub fn run_report_validate(ctx: &Context, config_file: PathBuf, output_dir: PathBuf) -> anyhow::Result<()> {
    let config: SchemaBindingConfig = read_yaml(&config_file)?;
    let platform = ctx.platform(false)?;
    let summary = validate_all(platform.as_ref(), &config, &output_dir);

    println!();
    println!("Validation reports");
    println!("  Written: {}", summary.successful.len());
    println!("  Failed: {}", summary.failed.len());
    println!("  Skipped (no fileview): {}", summary.skipped.len());
    for view in &summary.successful {
        println!(
            "  {} {} {}: {} valid, {} invalid",
            view.schema, view.project, view.subfolder, view.valid, view.invalid
        );
    }
    for view in &summary.failed {
        println!(
            "  FAILED {} {}: {}",
            view.schema,
            view.project,
            view.error.as_deref().unwrap_or("unknown error")
        );
    }
    println!();
    Ok(())
}

pub fn run_report_validate_one(
    ctx: &Context,
    folder_id: String,
    fileview_id: String,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let platform = ctx.platform(false)?;
    let rows = validate_view(platform.as_ref(), &folder_id, &fileview_id)?;
    let path = output.unwrap_or_else(|| PathBuf::from(csv_file_name(&fileview_id)));
    write_csv(&path, &rows)?;
    let invalid = rows.iter().filter(|r| !r.is_valid).count();

    println!();
    println!("{} file(s) in {fileview_id}", rows.len());
    println!("  Valid: {}", rows.len() - invalid);
    println!("  Invalid: {invalid}");
    println!("  Report: {}", path.display());
    println!();
    Ok(())
}
