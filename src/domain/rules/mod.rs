// Domain rules - Engine command derivation and merge/preview policies

use serde::{Deserialize, Serialize};

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::utils::time::format_arg_seconds;

/// Engine-local name of the staged trim input
pub const TRIM_INPUT_NAME: &str = "input.mp4";
/// Engine-local name of the trim output
pub const TRIM_OUTPUT_NAME: &str = "output.mp4";
/// Engine-local name of the concat manifest
pub const MERGE_MANIFEST_NAME: &str = "list.txt";
/// Engine-local name of the merge output
pub const MERGE_OUTPUT_NAME: &str = "merged.mp4";
/// Suggested download name of a merge result
pub const MERGED_ARTIFACT_NAME: &str = "merged-video.mp4";
/// Content type of every produced artifact
pub const OUTPUT_MIME_TYPE: &str = "video/mp4";
/// Default number of frames in a timeline strip
pub const DEFAULT_STRIP_FRAMES: usize = 12;

/// Builds the single-input extraction command
///
/// The command seeks before the input (`-ss` ahead of `-i`), limits the decode
/// to the range length and stream-copies audio and video. Under stream-copy the
/// output starts at the keyframe at or before `start`: frame-accurate start is
/// not guaranteed.
pub struct TrimCommandBuilder;

impl TrimCommandBuilder {
    pub fn build(range: &TrimRange) -> Result<TrimPlan, DomainError> {
        range.validate()?;

        let args = vec![
            "-ss".to_string(),
            format_arg_seconds(range.start()),
            "-i".to_string(),
            TRIM_INPUT_NAME.to_string(),
            "-t".to_string(),
            format_arg_seconds(range.span()),
            "-c".to_string(),
            "copy".to_string(),
            TRIM_OUTPUT_NAME.to_string(),
        ];

        Ok(TrimPlan {
            input_name: TRIM_INPUT_NAME.to_string(),
            output_name: TRIM_OUTPUT_NAME.to_string(),
            args,
        })
    }

    /// Download name for a trimmed source
    pub fn artifact_name(original_name: &str) -> String {
        format!("trimmed-{}", original_name)
    }
}

/// Builds the concat-demuxer join command
///
/// `-safe 0` relaxes the demuxer's path checks. That is only sound because every
/// manifest entry is a generated engine-local name, never a user path.
pub struct MergeCommandBuilder;

impl MergeCommandBuilder {
    pub fn build(sequence: &MergeSequence) -> Result<MergePlan, DomainError> {
        sequence.validate()?;

        let input_names: Vec<String> = (0..sequence.len()).map(Self::input_name).collect();
        let manifest = Self::manifest(&input_names);

        let args = vec![
            "-f".to_string(),
            "concat".to_string(),
            "-safe".to_string(),
            "0".to_string(),
            "-i".to_string(),
            MERGE_MANIFEST_NAME.to_string(),
            "-c".to_string(),
            "copy".to_string(),
            MERGE_OUTPUT_NAME.to_string(),
        ];

        Ok(MergePlan {
            input_names,
            manifest_name: MERGE_MANIFEST_NAME.to_string(),
            manifest,
            output_name: MERGE_OUTPUT_NAME.to_string(),
            args,
        })
    }

    /// Staged name of the clip at `position`
    pub fn input_name(position: usize) -> String {
        format!("input{}.mp4", position)
    }

    /// One `file '<name>'` line per staged input, in order
    pub fn manifest(input_names: &[String]) -> String {
        input_names
            .iter()
            .map(|name| format!("file '{}'\n", name))
            .collect()
    }
}

/// What to do when merge sources look incompatible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MergePreflight {
    /// Do not probe; let the engine fail
    Off,
    /// Probe and log mismatches, then merge anyway
    #[default]
    Warn,
    /// Probe and refuse to merge on any mismatch
    Reject,
}

impl MergePreflight {
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value.trim().to_lowercase().as_str() {
            "off" => Ok(MergePreflight::Off),
            "warn" => Ok(MergePreflight::Warn),
            "reject" => Ok(MergePreflight::Reject),
            _ => Err(DomainError::BadArgs(format!(
                "Invalid merge preflight policy: {}. Valid policies: off, warn, reject",
                value
            ))),
        }
    }
}

/// Stream-copy concatenation needs matching codec parameters across sources
pub struct CompatibilityChecker;

impl CompatibilityChecker {
    /// Compare every source against the first; returns one line per mismatch
    pub fn check(probes: &[(String, MediaProbe)]) -> Vec<String> {
        let mut mismatches = Vec::new();
        let Some((reference_name, reference)) = probes.first() else {
            return mismatches;
        };

        for (name, probe) in probes.iter().skip(1) {
            match (&reference.video, &probe.video) {
                (Some(a), Some(b)) => {
                    if a.codec != b.codec {
                        mismatches.push(format!(
                            "{}: video codec {} differs from {} in {}",
                            name, b.codec, a.codec, reference_name
                        ));
                    }
                    if (a.width, a.height) != (b.width, b.height) {
                        mismatches.push(format!(
                            "{}: resolution {}x{} differs from {}x{} in {}",
                            name, b.width, b.height, a.width, a.height, reference_name
                        ));
                    }
                }
                (Some(_), None) | (None, Some(_)) => mismatches.push(format!(
                    "{}: video stream presence differs from {}",
                    name, reference_name
                )),
                (None, None) => {}
            }

            match (&reference.audio, &probe.audio) {
                (Some(a), Some(b)) => {
                    if a.codec != b.codec {
                        mismatches.push(format!(
                            "{}: audio codec {} differs from {} in {}",
                            name, b.codec, a.codec, reference_name
                        ));
                    }
                    if (a.sample_rate, a.channels) != (b.sample_rate, b.channels) {
                        mismatches.push(format!(
                            "{}: audio layout {} Hz/{} ch differs from {} Hz/{} ch in {}",
                            name,
                            b.sample_rate,
                            b.channels,
                            a.sample_rate,
                            a.channels,
                            reference_name
                        ));
                    }
                }
                (Some(_), None) | (None, Some(_)) => mismatches.push(format!(
                    "{}: audio stream presence differs from {}",
                    name, reference_name
                )),
                (None, None) => {}
            }
        }

        mismatches
    }
}

/// Timestamps for frame previews
pub struct PreviewSchedule;

impl PreviewSchedule {
    /// `count` evenly spaced timestamps over `[0, duration)`
    pub fn strip(duration: f64, count: usize) -> Result<Vec<f64>, DomainError> {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(DomainError::BadArgs(format!(
                "Cannot preview media with duration {}",
                duration
            )));
        }
        if count == 0 {
            return Err(DomainError::BadArgs(
                "Frame count must be at least 1".to_string(),
            ));
        }
        let interval = duration / count as f64;
        Ok((0..count).map(|i| i as f64 * interval).collect())
    }

    /// Scrub position clamped into the media
    pub fn scrub(duration: f64, at: f64) -> Result<f64, DomainError> {
        if !duration.is_finite() || duration < 0.0 || at.is_nan() {
            return Err(DomainError::BadArgs(format!(
                "Cannot scrub to {} in media with duration {}",
                at, duration
            )));
        }
        Ok(at.clamp(0.0, duration))
    }
}

#[cfg(test)]
mod tests;
