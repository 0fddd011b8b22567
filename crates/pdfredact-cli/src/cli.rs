use std::path::PathBuf;

use clap::Parser;

/// Redact rectangular regions from PDF documents.
///
/// Glyphs inside a region are removed from the content stream with their
/// horizontal space preserved; images overlapping a region are replaced by
/// copies with the overlapping pixels cleared.
#[derive(Debug, Parser)]
#[command(name = "pdfredact", about, version)]
pub struct Cli {
    /// Path to the input PDF file
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Path the redacted PDF is written to
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Region to redact, as PAGE:X,Y,WxH in points from the bottom-left
    /// page corner (e.g. '1:72,700,200x20'). Repeatable.
    #[arg(long = "region", value_name = "SPEC")]
    pub regions: Vec<String>,

    /// Do not descend into Form XObjects
    #[arg(long)]
    pub no_forms: bool,

    /// Drop image draws whose placement a region fully covers, instead of
    /// blanking their pixels
    #[arg(long)]
    pub drop_covered_images: bool,

    /// Stroke region outlines onto the pages instead of redacting, for
    /// checking coordinates
    #[arg(long)]
    pub outline: bool,

    /// Recompress content streams in the output
    #[arg(long)]
    pub compress: bool,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    pub json: bool,
}
