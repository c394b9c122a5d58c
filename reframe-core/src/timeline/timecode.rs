// ============================================================================
// reframe-core/src/timeline/timecode.rs
// ============================================================================
//
// TIMECODE FILES: Parsing of the v1 and v2 timecode formats
//
//   # timecode format v1           # timecode format v2
//   Assume 23.976                  0
//   100,199,29.97                  41.708
//   # comment                      83.417
//
// v1 gives a default frame rate plus `start,end,rate` override runs (frame
// numbers are 0-based and inclusive). v2 lists one presentation time in
// milliseconds per frame. Empty lines and lines starting with '#' are
// ignored after the header.

use std::fs;
use std::path::Path;

use crate::error::{CoreError, CoreResult};
use crate::timeline::rational::parse_rate;

/// A frame-rate override for frames `start..=end`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameRateRun {
    pub start: u64,
    pub end: u64,
    pub fps: f64,
}

/// A parsed timecode description.
#[derive(Debug, Clone, PartialEq)]
pub enum TimecodeFile {
    V1 { assumed_fps: f64, runs: Vec<FrameRateRun> },
    /// Presentation times in seconds, strictly increasing.
    V2 { times: Vec<f64> },
}

fn is_skip_line(line: &str) -> bool {
    let line = line.trim();
    line.is_empty() || line.starts_with('#')
}

fn format_error(message: impl Into<String>) -> CoreError {
    CoreError::TimecodeFormat(message.into())
}

impl TimecodeFile {
    pub fn load(path: &Path) -> CoreResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            CoreError::SourceRead(format!("failed to read timecode file {}: {}", path.display(), e))
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> CoreResult<Self> {
        let mut lines = text.lines();
        let header = lines.next().unwrap_or_default().trim();
        let version = header
            .strip_prefix("# timecode format v")
            .and_then(|v| v.trim().parse::<u32>().ok())
            .ok_or_else(|| format_error(format!("unsupported timecode header '{}'", header)))?;
        let mut body = lines.filter(|line| !is_skip_line(line)).map(str::trim);
        match version {
            1 => Self::parse_v1(&mut body),
            2 => Self::parse_v2(&mut body),
            v => Err(format_error(format!("unsupported timecode format v{}", v))),
        }
    }

    fn parse_v1<'a>(body: &mut impl Iterator<Item = &'a str>) -> CoreResult<Self> {
        let assume = body.next().ok_or_else(|| format_error("assumed frame rate is missing"))?;
        let rate = assume
            .strip_prefix("assume")
            .or_else(|| assume.strip_prefix("Assume"))
            .ok_or_else(|| format_error("assumed frame rate is missing"))?;
        let assumed_fps = parse_rate(rate)
            .filter(|fps| *fps > 0.0)
            .ok_or_else(|| format_error(format!("invalid assumed frame rate '{}'", rate.trim())))?;

        let mut runs: Vec<FrameRateRun> = Vec::new();
        for line in body {
            let invalid = || format_error(format!("invalid timecode run '{}'", line));
            let mut fields = line.splitn(3, ',');
            let (Some(start), Some(end), Some(fps)) = (fields.next(), fields.next(), fields.next()) else {
                return Err(invalid());
            };
            let start: u64 = start.trim().parse().map_err(|_| invalid())?;
            let end: u64 = end.trim().parse().map_err(|_| invalid())?;
            let fps = parse_rate(fps).ok_or_else(invalid)?;
            let ordered = runs.last().is_none_or(|prev| start > prev.start && end > prev.end);
            if start > end || !ordered || fps <= 0.0 {
                return Err(invalid());
            }
            runs.push(FrameRateRun { start, end, fps });
        }
        Ok(TimecodeFile::V1 { assumed_fps, runs })
    }

    fn parse_v2<'a>(body: &mut impl Iterator<Item = &'a str>) -> CoreResult<Self> {
        let mut times: Vec<f64> = Vec::new();
        for (i, line) in body.enumerate() {
            let ms: f64 = line
                .parse()
                .map_err(|_| format_error(format!("invalid timecode {}: '{}'", i, line)))?;
            let seconds = ms * 1e-3;
            if times.last().is_some_and(|&prev| seconds <= prev) {
                return Err(format_error(format!("timecode {} is not increasing", i)));
            }
            times.push(seconds);
        }
        if times.is_empty() {
            return Err(format_error("no timecodes found"));
        }
        Ok(TimecodeFile::V2 { times })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_v1_runs() {
        let text = "# timecode format v1\n# made by hand\nAssume 24000/1001\n100,199,30000/1001\n\n300,310,25\n";
        match TimecodeFile::parse(text).unwrap() {
            TimecodeFile::V1 { assumed_fps, runs } => {
                assert!((assumed_fps - 23.976_023_976).abs() < 1e-6);
                assert_eq!(runs.len(), 2);
                assert_eq!((runs[0].start, runs[0].end), (100, 199));
                assert_eq!(runs[1].fps, 25.0);
            }
            other => panic!("expected v1, got {:?}", other),
        }
    }

    #[test]
    fn lowercase_assume_is_accepted() {
        let parsed = TimecodeFile::parse("# timecode format v1\nassume 25\n").unwrap();
        assert_eq!(parsed, TimecodeFile::V1 { assumed_fps: 25.0, runs: vec![] });
    }

    #[test]
    fn v1_rejects_bad_runs() {
        for text in [
            "# timecode format v1\n100,199,30\n",
            "# timecode format v1\nAssume 0\n",
            "# timecode format v1\nAssume 24\n10,5,30\n",
            "# timecode format v1\nAssume 24\n10,20,30\n10,30,30\n",
            "# timecode format v1\nAssume 24\n10,20,30\n15,20,30\n",
            "# timecode format v1\nAssume 24\n10,20,-1\n",
            "# timecode format v1\nAssume 24\n10,20\n",
        ] {
            let err = TimecodeFile::parse(text).unwrap_err();
            assert!(matches!(err, CoreError::TimecodeFormat(_)), "{}", text);
        }
    }

    #[test]
    fn parses_v2_in_seconds() {
        let parsed = TimecodeFile::parse("# timecode format v2\n0\n# gap\n41.708\n83.417\n").unwrap();
        match parsed {
            TimecodeFile::V2 { times } => {
                assert_eq!(times.len(), 3);
                assert!((times[1] - 0.041708).abs() < 1e-12);
            }
            other => panic!("expected v2, got {:?}", other),
        }
    }

    #[test]
    fn v2_must_increase_and_not_be_empty() {
        for text in [
            "# timecode format v2\n0\n40\n40\n",
            "# timecode format v2\n# nothing\n",
            "# timecode format v2\n0\nabc\n",
        ] {
            let err = TimecodeFile::parse(text).unwrap_err();
            assert!(matches!(err, CoreError::TimecodeFormat(_)), "{}", text);
        }
    }

    #[test]
    fn unknown_headers_are_rejected() {
        assert!(TimecodeFile::parse("# timecode format v3\n").is_err());
        assert!(TimecodeFile::parse("0\n40\n").is_err());
        assert!(TimecodeFile::parse("").is_err());
    }
}
