mod cli;
mod region_arg;

use clap::Parser;
use cli::Cli;
use pdfredact::{RedactOptions, Redactor, overlay};

fn main() {
    let cli = Cli::parse();
    if let Err(code) = run(&cli) {
        std::process::exit(code);
    }
}

fn run(cli: &Cli) -> Result<(), i32> {
    if cli.regions.is_empty() {
        eprintln!("error: at least one --region is required");
        return Err(2);
    }

    let options = RedactOptions {
        descend_into_forms: !cli.no_forms,
        drop_fully_covered_images: cli.drop_covered_images,
        compress_streams: cli.compress,
        ..RedactOptions::default()
    };
    let mut redactor = Redactor::new(options);
    for spec in &cli.regions {
        let (page, rect) = region_arg::parse_region(spec).map_err(|e| {
            eprintln!("error: {e}");
            2
        })?;
        redactor.add_region(page, rect);
    }

    if cli.outline {
        return run_outline(cli, &redactor);
    }

    let summary = redactor.redact_file(&cli.input, &cli.output).map_err(|e| {
        eprintln!("error: {e}");
        1
    })?;

    for warning in &summary.warnings {
        eprintln!("warning: {warning}");
    }

    if cli.json {
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("error: failed to serialize summary: {e}");
                return Err(1);
            }
        }
    } else {
        println!(
            "{} page(s): {} text operator(s) dropped, {} patched; \
             {} image(s) patched, {} dropped; {} form(s) rewritten",
            summary.pages_processed,
            summary.text_operators_dropped,
            summary.text_operators_patched,
            summary.images_patched,
            summary.images_dropped,
            summary.forms_rewritten,
        );
    }
    Ok(())
}

fn run_outline(cli: &Cli, redactor: &Redactor) -> Result<(), i32> {
    let mut doc = pdfredact::lopdf::Document::load(&cli.input).map_err(|e| {
        eprintln!("error: failed to load document: {e}");
        1
    })?;
    overlay::outline_regions(&mut doc, redactor.regions()).map_err(|e| {
        eprintln!("error: {e}");
        1
    })?;
    doc.save(&cli.output).map_err(|e| {
        eprintln!("error: failed to save document: {e}");
        1
    })?;
    println!(
        "outlined {} region(s); no content was redacted",
        redactor.regions().len()
    );
    Ok(())
}
