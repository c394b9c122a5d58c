use assert_cmd::Command;
use predicates::str::contains;
use serde_json::{Value, json};
use std::error::Error;
use std::path::Path;
use tempfile::tempdir;

// Helper function to get the path to the compiled binary
fn reframe_cmd() -> Command {
    Command::cargo_bin("reframe").expect("Failed to find reframe binary")
}

/// Writes a one-track manifest with `count` samples every `step` ticks and a RAP every `gop` samples.
fn write_movie(path: &Path, handler: &str, timescale: u32, count: u64, step: u64, gop: u64) -> Result<(), Box<dyn Error>> {
    let samples: Vec<Value> = (0..count)
        .map(|i| {
            let ra = if i % gop == 0 { "sync" } else { "none" };
            json!({ "dts": i * step, "cts": i * step, "size": 64, "random_access": ra })
        })
        .collect();
    let manifest = json!({
        "file": { "major_brand": "isom", "minor_version": 512, "brands": ["isom", "avc1"] },
        "movie": { "timescale": 1000 },
        "tracks": [{
            "track_id": 1,
            "handler": handler,
            "timescale": timescale,
            "summaries": [{ "sample_type": if handler == "audio" { "mp4a" } else { "avc1" } }],
            "samples": samples
        }]
    });
    std::fs::write(path, serde_json::to_string_pretty(&manifest)?)?;
    Ok(())
}

fn read_json(path: &Path) -> Result<Value, Box<dyn Error>> {
    Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?)
}

#[test]
fn test_remux_merges_inputs() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let video = dir.path().join("video.json");
    let audio = dir.path().join("audio.json");
    let output = dir.path().join("movie.json");
    write_movie(&video, "video", 24000, 24, 1001, 12)?;
    write_movie(&audio, "audio", 48000, 47, 1024, 1)?;

    reframe_cmd()
        .arg("remux")
        .arg("-i")
        .arg(format!("{}?1:language=jpn", video.display()))
        .arg("-i")
        .arg(&audio)
        .arg("-o")
        .arg(&output)
        .assert()
        .success()
        .stdout(contains("Remux finished"));

    let manifest = read_json(&output)?;
    let tracks = manifest["tracks"].as_array().unwrap();
    assert_eq!(tracks.len(), 2);
    assert_eq!(tracks[0]["language"], "jpn");
    assert_eq!(tracks[0]["samples"].as_array().unwrap().len(), 24);
    assert_eq!(tracks[1]["samples"].as_array().unwrap().len(), 47);
    assert_eq!(manifest["movie"]["timescale"], 600);
    Ok(())
}

#[test]
fn test_remux_dry_run_writes_nothing() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let video = dir.path().join("video.json");
    let output = dir.path().join("movie.json");
    write_movie(&video, "video", 1000, 10, 40, 5)?;

    reframe_cmd()
        .args(["remux", "--dry-run", "-i"])
        .arg(&video)
        .arg("-o")
        .arg(&output)
        .assert()
        .success()
        .stdout(contains("Dry run"));

    assert!(!output.exists());
    Ok(())
}

#[test]
fn test_remux_dash_writes_segment_files() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let video = dir.path().join("video.json");
    let output = dir.path().join("stream.json");
    write_movie(&video, "video", 1000, 9, 100, 3)?;

    reframe_cmd()
        .args(["remux", "--fragment", "1", "--dash", "2", "-i"])
        .arg(&video)
        .arg("-o")
        .arg(&output)
        .assert()
        .success();

    assert!(output.exists());
    assert!(dir.path().join("stream_1.json").exists());
    assert!(dir.path().join("stream_2.json").exists());
    assert!(!dir.path().join("stream_3.json").exists());

    let init = read_json(&output)?;
    assert_eq!(init["file"]["major_brand"], "iso6");
    let first = read_json(&dir.path().join("stream_1.json"))?;
    assert_eq!(first["file"]["major_brand"], "msdh");
    Ok(())
}

#[test]
fn test_remux_missing_input_fails() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    reframe_cmd()
        .args(["remux", "-i", "surely/this/does/not/exist.json", "-o"])
        .arg(dir.path().join("out.json"))
        .assert()
        .failure()
        .stderr(contains("Failed to read source"));
    Ok(())
}

#[test]
fn test_remux_unknown_track_option_fails() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let video = dir.path().join("video.json");
    write_movie(&video, "video", 1000, 4, 40, 1)?;

    reframe_cmd()
        .arg("remux")
        .arg("-i")
        .arg(format!("{}?1:volume=2", video.display()))
        .arg("-o")
        .arg(dir.path().join("out.json"))
        .assert()
        .failure()
        .stderr(contains("unknown track option 'volume'"));
    Ok(())
}

#[test]
fn test_remux_invalid_chunk_size() -> Result<(), Box<dyn Error>> {
    reframe_cmd()
        .args(["remux", "-i", "a.json", "-o", "b.json", "--chunk-size", "0"])
        .assert()
        .failure()
        .stderr(contains("invalid value '0'"));
    Ok(())
}

#[test]
fn test_edit_retimes_track() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("in.json");
    let output = dir.path().join("out.json");
    write_movie(&input, "video", 90000, 5, 3003, 5)?;

    reframe_cmd()
        .args(["edit", "--media-timescale", "30000", "--media-timebase", "1001", "-i"])
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .assert()
        .success()
        .stdout(contains("Timeline edit finished"));

    let manifest = read_json(&output)?;
    let track = &manifest["tracks"][0];
    assert_eq!(track["timescale"], 30000);
    let dts: Vec<u64> = track["samples"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["dts"].as_u64().unwrap())
        .collect();
    assert_eq!(dts, vec![0, 1001, 2002, 3003, 4004]);
    Ok(())
}

#[test]
fn test_edit_rejects_zero_denominator() -> Result<(), Box<dyn Error>> {
    reframe_cmd()
        .args(["edit", "-i", "in.json", "-o", "out.json", "--delay", "1/0"])
        .assert()
        .failure()
        .stderr(contains("invalid rational value"));
    Ok(())
}
