// Unit tests for command derivation and policies

use super::*;

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn clips(count: usize) -> MergeSequence {
    let sources = (0..count)
        .map(|i| MediaSource::new(format!("clip{}.mp4", i), 1024, "video/mp4", format!("/tmp/clip{}.mp4", i)))
        .collect();
    MergeSequence::from_sources(sources).unwrap()
}

fn probe(vcodec: &str, width: u32, acodec: Option<&str>) -> MediaProbe {
    MediaProbe {
        duration: 10.0,
        container: "mov,mp4,m4a,3gp,3g2,mj2".to_string(),
        video: Some(VideoSummary {
            codec: vcodec.to_string(),
            width,
            height: 720,
        }),
        audio: acodec.map(|codec| AudioSummary {
            codec: codec.to_string(),
            sample_rate: 48000,
            channels: 2,
        }),
    }
}

#[test]
fn test_trim_command_arguments() {
    let range = TrimRange::new(120.0).unwrap().with_end(25.0).with_start(10.0);
    let plan = TrimCommandBuilder::build(&range).unwrap();

    assert_eq!(
        plan.args,
        args(&["-ss", "10", "-i", "input.mp4", "-t", "15", "-c", "copy", "output.mp4"])
    );
    assert_eq!(plan.input_name, "input.mp4");
    assert_eq!(plan.output_name, "output.mp4");
}

#[test]
fn test_trim_command_fractional_bounds() {
    let range = TrimRange::from_bounds(60.0, 10.1, 25.3).unwrap();
    let plan = TrimCommandBuilder::build(&range).unwrap();
    assert_eq!(plan.args[1], "10.1");
    assert_eq!(plan.args[5], "15.2");
}

#[test]
fn test_trim_command_rejects_short_media() {
    let range = TrimRange::new(0.4).unwrap();
    assert!(TrimCommandBuilder::build(&range).is_err());
}

#[test]
fn test_trimmed_artifact_name() {
    assert_eq!(TrimCommandBuilder::artifact_name("holiday.mov"), "trimmed-holiday.mov");
}

#[test]
fn test_merge_manifest_lists_inputs_in_order() {
    let plan = MergeCommandBuilder::build(&clips(3)).unwrap();

    assert_eq!(plan.input_names, args(&["input0.mp4", "input1.mp4", "input2.mp4"]));
    assert_eq!(
        plan.manifest,
        "file 'input0.mp4'\nfile 'input1.mp4'\nfile 'input2.mp4'\n"
    );
    assert_eq!(plan.manifest_name, "list.txt");
}

#[test]
fn test_merge_command_arguments() {
    let plan = MergeCommandBuilder::build(&clips(2)).unwrap();
    assert_eq!(
        plan.args,
        args(&["-f", "concat", "-safe", "0", "-i", "list.txt", "-c", "copy", "merged.mp4"])
    );
    assert_eq!(plan.output_name, "merged.mp4");
}

#[test]
fn test_merge_rejects_single_clip() {
    let err = MergeCommandBuilder::build(&clips(1)).unwrap_err();
    assert!(err.is_precondition());
}

#[test]
fn test_merge_preflight_parse() {
    assert_eq!(MergePreflight::parse("Reject").unwrap(), MergePreflight::Reject);
    assert_eq!(MergePreflight::parse("off").unwrap(), MergePreflight::Off);
    assert!(MergePreflight::parse("sometimes").is_err());
}

#[test]
fn test_compatibility_accepts_matching_sources() {
    let probes = vec![
        ("a.mp4".to_string(), probe("h264", 1280, Some("aac"))),
        ("b.mp4".to_string(), probe("h264", 1280, Some("aac"))),
    ];
    assert!(CompatibilityChecker::check(&probes).is_empty());
}

#[test]
fn test_compatibility_reports_each_mismatch() {
    let probes = vec![
        ("a.mp4".to_string(), probe("h264", 1280, Some("aac"))),
        ("b.mp4".to_string(), probe("hevc", 1920, Some("aac"))),
        ("c.mp4".to_string(), probe("h264", 1280, None)),
    ];
    let mismatches = CompatibilityChecker::check(&probes);
    assert_eq!(mismatches.len(), 3);
    assert!(mismatches[0].contains("video codec hevc"));
    assert!(mismatches[1].contains("resolution 1920x720"));
    assert!(mismatches[2].starts_with("c.mp4: audio stream presence"));
}

#[test]
fn test_preview_strip_is_evenly_spaced() {
    let stamps = PreviewSchedule::strip(120.0, DEFAULT_STRIP_FRAMES).unwrap();
    assert_eq!(stamps.len(), 12);
    assert_eq!(stamps[0], 0.0);
    assert_eq!(stamps[1], 10.0);
    assert_eq!(stamps[11], 110.0);
    assert!(stamps.iter().all(|t| *t < 120.0));
}

#[test]
fn test_preview_strip_rejects_bad_input() {
    assert!(PreviewSchedule::strip(0.0, 12).is_err());
    assert!(PreviewSchedule::strip(10.0, 0).is_err());
}

#[test]
fn test_preview_scrub_clamps() {
    assert_eq!(PreviewSchedule::scrub(30.0, 45.0).unwrap(), 30.0);
    assert_eq!(PreviewSchedule::scrub(30.0, -2.0).unwrap(), 0.0);
    assert!(PreviewSchedule::scrub(30.0, f64::NAN).is_err());
}
