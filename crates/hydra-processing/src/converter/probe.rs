//! ffprobe JSON output (`-v error -show_format -show_streams -of json`)

use hydra_core::{AudioMeta, VideoMeta};
use serde::Deserialize;

use super::ConvertError;

#[derive(Debug, Deserialize)]
struct FFprobeOutput {
    format: Option<FFprobeFormat>,
    streams: Option<Vec<FFprobeStream>>,
}

#[derive(Debug, Deserialize)]
struct FFprobeFormat {
    duration: Option<String>,
    bit_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FFprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    sample_rate: Option<String>,
    channels: Option<u32>,
    avg_frame_rate: Option<String>,
    duration: Option<String>,
    bit_rate: Option<String>,
}

impl FFprobeOutput {
    fn stream(&self, codec_type: &str) -> Option<&FFprobeStream> {
        self.streams
            .as_deref()
            .unwrap_or_default()
            .iter()
            .find(|s| s.codec_type.as_deref() == Some(codec_type))
    }

    fn duration(&self, stream: &FFprobeStream) -> f64 {
        self.format
            .as_ref()
            .and_then(|f| f.duration.as_deref())
            .or(stream.duration.as_deref())
            .and_then(|d| d.parse::<f64>().ok())
            .unwrap_or(0.0)
    }

    fn bitrate(&self, stream: &FFprobeStream) -> Option<u64> {
        self.format
            .as_ref()
            .and_then(|f| f.bit_rate.as_deref())
            .or(stream.bit_rate.as_deref())
            .and_then(|b| b.parse::<u64>().ok())
    }
}

/// "30000/1001" style rational; "0/0" means unknown
fn parse_rate(rate: &str) -> Option<f64> {
    let (numer, denom) = rate.split_once('/')?;
    let numer: f64 = numer.parse().ok()?;
    let denom: f64 = denom.parse().ok()?;
    if denom == 0.0 || numer == 0.0 {
        return None;
    }
    Some(((numer / denom) * 100.0).round() / 100.0)
}

pub(crate) fn parse_video(stdout: &[u8]) -> Result<VideoMeta, ConvertError> {
    let output: FFprobeOutput = serde_json::from_slice(stdout)?;
    let stream = output
        .stream("video")
        .ok_or_else(|| ConvertError::InvalidMedia("no video stream found".to_string()))?;

    let (width, height) = stream
        .width
        .zip(stream.height)
        .ok_or_else(|| ConvertError::InvalidMedia("video stream has no dimensions".to_string()))?;

    Ok(VideoMeta {
        width,
        height,
        duration_secs: output.duration(stream),
        codec: stream.codec_name.clone(),
        bitrate: output.bitrate(stream),
        frame_rate: stream.avg_frame_rate.as_deref().and_then(parse_rate),
    })
}

pub(crate) fn parse_audio(stdout: &[u8]) -> Result<AudioMeta, ConvertError> {
    let output: FFprobeOutput = serde_json::from_slice(stdout)?;
    let stream = output
        .stream("audio")
        .ok_or_else(|| ConvertError::InvalidMedia("no audio stream found".to_string()))?;

    Ok(AudioMeta {
        duration_secs: output.duration(stream),
        codec: stream.codec_name.clone(),
        bitrate: output.bitrate(stream),
        sample_rate: stream.sample_rate.as_deref().and_then(|s| s.parse().ok()),
        channels: stream.channels,
    })
}
