// ============================================================================
// reframe-cli/src/commands/remux.rs
// ============================================================================
//
// REMUX COMMAND: Parses input specs, builds the RemuxConfig and runs it
//
// Prints a short summary on success. Errors propagate to main, which prints
// them to stderr and exits non-zero.

use console::style;
use log::info;
use reframe_core::config::{InputSpec, RemuxConfig, RemuxConfigBuilder};
use reframe_core::{RemuxReport, format_bytes, remux_files, utils::display_name};

use super::print_info;
use crate::cli::RemuxArgs;
use crate::error::{CliErrorContext, CliResult};
use crate::progress::CliProgress;

/// Builds the run configuration from parsed arguments.
pub fn build_config(args: &RemuxArgs) -> CliResult<RemuxConfig> {
    let inputs = args
        .inputs
        .iter()
        .map(|text| text.parse::<InputSpec>().cli_with_context(|| format!("input '{}'", text)))
        .collect::<CliResult<Vec<_>>>()?;

    let mut builder = RemuxConfigBuilder::new()
        .inputs(inputs)
        .output(&args.output)
        .fragment_base_track(args.fragment_base_track)
        .max_chunk_duration_ms(args.max_chunk_duration_ms)
        .max_chunk_size(args.max_chunk_size)
        .compact_size_table(args.compact_size_table)
        .dry_run(args.dry_run);
    if let Some(seconds) = args.min_fragment_duration {
        builder = builder.min_fragment_duration(seconds);
    }
    if let Some(subsegments) = args.dash_subsegments {
        builder = builder.dash_subsegments(subsegments);
    }
    if let Some(language) = &args.language {
        builder = builder.default_language(language);
    }
    builder.build()
}

pub fn run_remux(args: RemuxArgs) -> CliResult<()> {
    let config = build_config(&args)?;
    for input in &config.inputs {
        info!("Input: {}", input.path.display());
    }
    info!("Output: {}", config.output.display());
    let dry_run = config.dry_run;
    let output = config.output.clone();

    let mut progress = CliProgress::new();
    let report = remux_files(config, &mut progress)?;
    print_summary(&report, &display_name(&output), dry_run);
    Ok(())
}

fn print_summary(report: &RemuxReport, output: &str, dry_run: bool) {
    println!();
    println!("  {} {}", style("✓").green().bold(), style("Remux finished").bold());
    print_info("Output", output);
    print_info("Tracks", report.output_tracks);
    print_info(
        "Samples",
        format!(
            "{} ({})",
            report.progress.appended_samples,
            format_bytes(report.progress.total_media_size)
        ),
    );
    if report.progress.dropped_samples > 0 {
        print_info("Dropped", report.progress.dropped_samples);
    }
    if report.layout.writer.mode.fragmented {
        print_info("Fragments", report.progress.fragments);
    }
    if report.progress.segments > 0 {
        print_info("Segments", report.progress.segments);
    }
    print_info(
        "Brand",
        format!("{} (movie timescale {})", report.layout.file.major_brand, report.layout.movie.timescale),
    );
    if dry_run {
        println!("  {}", style("Dry run: nothing was written").dim());
    }
}
