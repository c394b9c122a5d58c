// ============================================================================
// reframe-core/src/remux/timeline_map.rs
// ============================================================================
//
// TIMELINE MAPS: Edit lists of the output tracks
//
// A seeked track gets a fresh map: an optional empty edit covering the
// composition delay and skipped lead-in, then one normal edit starting at
// that point. Every other track inherits the input's edit list, rescaled to
// the output timescales.

use crate::engine::{MediaSink, MediaSource};
use crate::error::{CoreError, CoreResult};
use crate::media::{Edit, EditStart, InputMovie, InputTrack, OutputTrack};
use crate::timeline::rescale;

/// Writes the map of a track that starts at a seek point.
pub fn write_seek_timeline(
    sink: &mut dyn MediaSink,
    out: &OutputTrack,
    input: &InputTrack,
    fragmented: bool,
) -> CoreResult<()> {
    sink.clear_edits(out.track_id)?;
    let movie_timescale = sink.movie_timescale();
    let media_timescale = sink.media_timescale(out.track_id)?;
    if media_timescale == 0 {
        return Err(CoreError::ContainerWrite(format!(
            "media timescale of output track {} is 0",
            out.track_id
        )));
    }

    let start_time = input.composition_delay + input.skip_duration;
    if start_time > 0 {
        let shift = sink.composition_to_decode_shift(out.track_id)? as u64;
        let empty = rescale(start_time + shift, media_timescale, movie_timescale);
        sink.push_edit(out.track_id, Edit::empty(empty))?;
    }
    let duration = if fragmented {
        Edit::IMPLICIT_DURATION
    } else {
        let media_duration = (out.last_sample_dts + out.last_sample_delta as u64)
            .saturating_sub(input.skip_duration);
        rescale(media_duration, media_timescale, movie_timescale)
    };
    sink.push_edit(out.track_id, Edit::normal(duration, start_time))
}

/// Copies the edit list of an input track onto an output track.
///
/// Durations are rescaled between movie timescales and media start times
/// between media timescales.
pub fn copy_timeline(
    sink: &mut dyn MediaSink,
    out_track_id: u32,
    source: &dyn MediaSource,
    in_track_id: u32,
    in_media_timescale: u32,
) -> CoreResult<()> {
    let in_movie_timescale = source.movie_params().timescale;
    let movie_timescale = sink.movie_timescale();
    let media_timescale = sink.media_timescale(out_track_id)?;
    sink.clear_edits(out_track_id)?;
    for edit in source.edits(in_track_id)? {
        let start = match edit.start {
            EditStart::Empty => EditStart::Empty,
            EditStart::Media(t) => EditStart::Media(rescale(t, in_media_timescale, media_timescale)),
        };
        let duration = rescale(edit.duration, in_movie_timescale, movie_timescale);
        sink.push_edit(out_track_id, Edit { duration, start, rate: edit.rate })?;
    }
    Ok(())
}

/// Replaces the edit list of an output track.
pub fn replace_timeline(sink: &mut dyn MediaSink, out_track_id: u32, edits: &[Edit]) -> CoreResult<()> {
    sink.clear_edits(out_track_id)?;
    edits.iter().try_for_each(|&edit| sink.push_edit(out_track_id, edit))
}

/// Builds the edit list of every output track.
pub fn construct_timeline_maps(
    sink: &mut dyn MediaSink,
    tracks: &[OutputTrack],
    movies: &[InputMovie],
    fragmented: bool,
) -> CoreResult<()> {
    for out in tracks {
        let movie = &movies[out.movie];
        let input = &movie.tracks[out.track];
        if input.options.seek.is_some() {
            write_seek_timeline(sink, out, input, fragmented)?;
        } else {
            copy_timeline(sink, out.track_id, movie.source(), input.track_id, input.media_params.timescale)?;
        }
    }
    Ok(())
}
