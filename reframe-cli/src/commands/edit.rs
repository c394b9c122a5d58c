// ============================================================================
// reframe-cli/src/commands/edit.rs
// ============================================================================
//
// EDIT COMMAND: Re-times one track of a movie

use console::style;
use log::info;
use reframe_core::config::{TimelineEditConfig, TimelineEditConfigBuilder};
use reframe_core::media::EditStart;
use reframe_core::{TimelineEditReport, edit_timeline, format_ticks, utils::display_name};

use super::print_info;
use crate::cli::EditArgs;
use crate::error::CliResult;
use crate::progress::CliProgress;

pub fn build_config(args: &EditArgs) -> CliResult<TimelineEditConfig> {
    let mut builder = TimelineEditConfigBuilder::new()
        .input(&args.input)
        .output(&args.output)
        .track_number(args.track_number)
        .dts_compression(args.dts_compression);
    if let Some(path) = &args.timecode {
        builder = builder.timecode(path);
    }
    if let Some(timescale) = args.media_timescale {
        builder = builder.media_timescale(timescale);
    }
    if let Some(timebase) = args.media_timebase {
        builder = builder.media_timebase(timebase);
    }
    if let Some(skip) = args.skip {
        builder = builder.skip(skip);
    }
    if let Some(delay) = args.delay {
        builder = builder.delay(delay);
    }
    builder.build()
}

pub fn run_edit(args: EditArgs) -> CliResult<()> {
    let config = build_config(&args)?;
    info!(
        "Editing track {} of {} into {}",
        config.track_number,
        config.input.display(),
        config.output.display()
    );
    let mut progress = CliProgress::new();
    let report = edit_timeline(&config, &mut progress)?;
    print_summary(&report, &display_name(&config.output));
    Ok(())
}

fn describe_edits(report: &TimelineEditReport) -> String {
    report
        .edits
        .iter()
        .map(|edit| match edit.start {
            EditStart::Empty => format!("empty {}", edit.duration),
            EditStart::Media(start) => format!("{} from {}", edit.duration, start),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Presentation length of the edited track, empty edits included.
fn edited_duration(report: &TimelineEditReport) -> String {
    let ticks = report.edits.iter().map(|edit| edit.duration).sum();
    format_ticks(ticks, report.movie_timescale)
}

fn print_summary(report: &TimelineEditReport, output: &str) {
    println!();
    println!("  {} {}", style("✓").green().bold(), style("Timeline edit finished").bold());
    print_info("Output", output);
    print_info("Track", report.track_id);
    print_info("Timescale", report.media_timescale);
    if report.sample_delay > 0 {
        print_info("Reorder depth", report.sample_delay);
    }
    print_info("Edits", describe_edits(report));
    print_info("Duration", edited_duration(report));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use reframe_core::RemuxProgress;
    use reframe_core::media::Edit;
    use reframe_core::timeline::Rational;

    fn edit_args(extra: &[&str]) -> EditArgs {
        let mut argv = vec!["reframe", "edit", "-i", "in.json", "-o", "out.json"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Commands::Edit(args) => args,
            Commands::Remux(_) => panic!("expected edit"),
        }
    }

    #[test]
    fn arguments_map_onto_the_config() {
        let args = edit_args(&["--track", "2", "--media-timescale", "24000", "--skip", "1001/24000", "--delay", "2"]);
        let config = build_config(&args).unwrap();
        assert_eq!(config.track_number, 2);
        assert_eq!(config.media_timescale, Some(24000));
        assert_eq!(config.skip, Rational::new(1001, 24000).unwrap());
        assert_eq!(config.delay, Rational::new(2, 1).unwrap());
        assert!(config.timecode.is_none());
    }

    #[test]
    fn edits_are_described_in_order() {
        let report = TimelineEditReport {
            track_id: 1,
            media_timescale: 24000,
            movie_timescale: 1000,
            sample_delay: 0,
            edits: vec![Edit::empty(500), Edit::normal(1000, 2002)],
            progress: RemuxProgress::default(),
        };
        assert_eq!(describe_edits(&report), "empty 500, 1000 from 2002");
    }

    #[test]
    fn duration_counts_every_edit_in_movie_ticks() {
        let report = TimelineEditReport {
            track_id: 1,
            media_timescale: 24000,
            movie_timescale: 600,
            sample_delay: 0,
            edits: vec![Edit::empty(300), Edit::normal(1500, 0)],
            progress: RemuxProgress::default(),
        };
        assert_eq!(edited_duration(&report), "00:00:03.000");
    }
}
