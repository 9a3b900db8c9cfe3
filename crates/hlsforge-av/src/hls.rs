//! HLS segmentation settings and the ffmpeg invocation built from them.
//!
//! The engine always produces a single-rendition VOD playlist: H.264 video,
//! stereo AAC audio, fixed-length MPEG-TS segments named
//! `segment_000.ts`, `segment_001.ts`, … next to `index.m3u8`.

use std::path::{Path, PathBuf};

use hlsforge_common::paths::{self, SEGMENT_PATTERN};
use serde::{Deserialize, Serialize};

/// Encoding parameters for the HLS rendition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HlsSettings {
    /// Video encoder (default: libx264).
    #[serde(default = "default_video_codec")]
    pub video_codec: String,
    /// Audio encoder (default: aac).
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,
    /// Audio bitrate (default: 128k).
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,
    /// Audio channel count (default: 2).
    #[serde(default = "default_audio_channels")]
    pub audio_channels: u32,
    /// Target segment duration in seconds (default: 4).
    #[serde(default = "default_segment_seconds")]
    pub segment_seconds: u32,
    /// Encoder preset (default: veryfast).
    #[serde(default = "default_preset")]
    pub preset: String,
    /// Constant rate factor (default: 23).
    #[serde(default = "default_quality_factor")]
    pub quality_factor: u32,
}

fn default_video_codec() -> String {
    "libx264".to_string()
}
fn default_audio_codec() -> String {
    "aac".to_string()
}
fn default_audio_bitrate() -> String {
    "128k".to_string()
}
fn default_audio_channels() -> u32 {
    2
}
fn default_segment_seconds() -> u32 {
    4
}
fn default_preset() -> String {
    "veryfast".to_string()
}
fn default_quality_factor() -> u32 {
    23
}

impl Default for HlsSettings {
    fn default() -> Self {
        Self {
            video_codec: default_video_codec(),
            audio_codec: default_audio_codec(),
            audio_bitrate: default_audio_bitrate(),
            audio_channels: default_audio_channels(),
            segment_seconds: default_segment_seconds(),
            preset: default_preset(),
            quality_factor: default_quality_factor(),
        }
    }
}

/// A fully-specified engine run: one input file segmented into one directory.
#[derive(Debug, Clone)]
pub struct HlsInvocation {
    input: PathBuf,
    output_dir: PathBuf,
    settings: HlsSettings,
}

impl HlsInvocation {
    /// Describe a run that segments `input` into `output_dir`.
    pub fn new(
        input: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        settings: HlsSettings,
    ) -> Self {
        Self {
            input: input.into(),
            output_dir: output_dir.into(),
            settings,
        }
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn settings(&self) -> &HlsSettings {
        &self.settings
    }

    /// Where the engine writes the playlist.
    pub fn manifest_path(&self) -> PathBuf {
        paths::manifest_path(&self.output_dir)
    }

    /// Where the engine writes segment `index`.
    pub fn segment_path(&self, index: u32) -> PathBuf {
        paths::segment_path(&self.output_dir, index)
    }

    /// Command-line arguments for ffmpeg, in order.
    pub fn args(&self) -> Vec<String> {
        let s = &self.settings;
        let segment_pattern = self.output_dir.join(SEGMENT_PATTERN);

        let mut args: Vec<String> = vec!["-y".into(), "-i".into()];
        args.push(self.input.to_string_lossy().into_owned());

        // Video
        args.extend(["-c:v".into(), s.video_codec.clone()]);
        args.extend(["-preset".into(), s.preset.clone()]);
        args.extend(["-crf".into(), s.quality_factor.to_string()]);

        // Audio
        args.extend(["-c:a".into(), s.audio_codec.clone()]);
        args.extend(["-b:a".into(), s.audio_bitrate.clone()]);
        args.extend(["-ac".into(), s.audio_channels.to_string()]);

        // HLS muxer
        args.extend(["-f".into(), "hls".into()]);
        args.extend(["-hls_time".into(), s.segment_seconds.to_string()]);
        args.extend(["-hls_playlist_type".into(), "vod".into()]);
        args.push("-hls_segment_filename".into());
        args.push(segment_pattern.to_string_lossy().into_owned());
        args.push(self.manifest_path().to_string_lossy().into_owned());

        args
    }
}
