//! Starting points for tracks with a `seek`/`safe-seek` option.

use log::warn;

use crate::engine::MediaSource;
use crate::error::{CoreError, CoreResult};
use crate::media::InputTrack;

fn cts_of(source: &dyn MediaSource, track_id: u32, number: u32) -> CoreResult<u64> {
    source.sample_info(track_id, number).map(|info| info.cts).ok_or_else(|| {
        CoreError::SourceRead(format!("no sample {} in track {}", number, track_id))
    })
}

/// Positions the track cursor for its seek option and records the
/// composition delay and skipped presentation time the timeline map needs.
///
/// Tracks without a seek option are left untouched. An error means the
/// track cannot be started where asked and should be excluded.
pub fn set_starting_point(source: &dyn MediaSource, track: &mut InputTrack) -> CoreResult<()> {
    let Some(seek) = track.options.seek else {
        return Ok(());
    };
    let track_id = track.track_id;
    let consider_rap = track.options.consider_rap;
    if !source.sample_exists(track_id, seek) {
        return Err(CoreError::Configuration(format!(
            "seek position {} is past the end of track {}",
            seek, track_id
        )));
    }

    let Some(first_rap) = source.closest_random_access_point(track_id, 1) else {
        if consider_rap {
            return Err(CoreError::SourceRead(format!(
                "track {} has no random access point",
                track_id
            )));
        }
        warn!("{}: track {} has no random access point", source.name(), track_id);
        track.set_cursor(seek);
        return Ok(());
    };

    let rap_info = source.sample_info(track_id, first_rap).ok_or_else(|| {
        CoreError::SourceRead(format!("no sample {} in track {}", first_rap, track_id))
    })?;
    let shift = source.composition_to_decode_shift(track_id)? as u64;
    track.composition_delay = (rap_info.cts + shift).saturating_sub(rap_info.dts);

    let rap = source.closest_random_access_point(track_id, seek).ok_or_else(|| {
        CoreError::SourceRead(format!("no random access point near sample {}", seek))
    })?;
    if rap != seek {
        warn!(
            "{}: sample {} of track {} is not a random access point (closest is {})",
            source.name(),
            seek,
            track_id,
            rap
        );
        if consider_rap {
            let rap_cts = cts_of(source, track_id, rap)?;
            let seek_cts = cts_of(source, track_id, seek)?;
            if rap_cts < seek_cts {
                track.skip_duration = seek_cts - rap_cts;
            }
        }
    }
    track.set_cursor(if consider_rap { rap } else { seek });
    Ok(())
}
