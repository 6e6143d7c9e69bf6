use std::env;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use bim2obj::{BimSource, ExtractSettings, Setting, export};

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("usage: bim2obj <model.bim>");
        return ExitCode::from(1);
    }
    match run(&args[1]) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("[Error] {err:#}");
            ExitCode::from(1)
        }
    }
}

fn run(input: &str) -> Result<()> {
    let obj_path = format!("{input}.obj");
    let mtl_path = format!("{input}.mtl");

    // Both sinks must be open before any processing begins.
    let obj_file = File::create(&obj_path)
        .with_context(|| format!("unable to open {obj_path} for writing"))?;
    let mtl_file = File::create(&mtl_path)
        .with_context(|| format!("unable to open {mtl_path} for writing"))?;
    let mut obj_out = BufWriter::new(obj_file);
    let mut mtl_out = BufWriter::new(mtl_file);

    let mut settings = ExtractSettings::default();
    settings.set(Setting::UseWorldCoords, true);
    settings.set(Setting::WeldVertices, false);
    settings.set(Setting::SewShells, true);

    let mut source = BimSource::open(Path::new(input), settings)
        .context("unable to parse model file or no geometrical entities found")?;

    let stats = export(
        &mut source,
        &mut obj_out,
        &mut mtl_out,
        &mtl_path,
        &mut std::io::stdout(),
    )?;

    println!(
        "Exported {} entities ({} skipped) with {} materials",
        stats.entities_written, stats.entities_skipped, stats.materials
    );

    Ok(())
}
