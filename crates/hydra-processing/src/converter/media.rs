//! `Converter` backed by the `image` crate and ffmpeg/ffprobe

use async_trait::async_trait;
use hydra_core::{Config, Meta};
use std::ffi::OsString;
use std::io::{self, Cursor};
use std::path::Path;
use std::pin::Pin;
use std::process::Stdio;
use std::task::{Context, Poll};
use tempfile::TempPath;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt, ReadBuf};
use tokio::process::Command;
use tracing::{debug, error};

use super::{
    document, probe, raster, ByteStream, ConvertError, Converter, MetaKind, Mp4Options, Rendition,
};
use crate::mime::MimeCategory;

/// Highest (lowest quality) LAME VBR level
const MP3_MAX_QUALITY: u8 = 9;

pub struct MediaConverter {
    ffmpeg_path: String,
    ffprobe_path: String,
}

impl MediaConverter {
    pub fn new(ffmpeg_path: impl Into<String>, ffprobe_path: impl Into<String>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            ffprobe_path: ffprobe_path.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.ffmpeg_path(), config.ffprobe_path())
    }

    #[tracing::instrument(skip(self, input), fields(service = "media"))]
    async fn probe(
        &self,
        input: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<Vec<u8>, ConvertError> {
        let source = spool(input).await?;
        let mut args = os_args(&["-v", "error", "-show_format", "-show_streams", "-of", "json"]);
        args.push(source.as_os_str().into());
        run_tool(&self.ffprobe_path, args).await
    }

    /// Decodable raster for `category`: the input itself for images, the first
    /// frame for video, embedded cover art for audio.
    async fn frame_bytes(
        &self,
        category: MimeCategory,
        input: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<Vec<u8>, ConvertError> {
        let extra: &[&str] = match category {
            MimeCategory::Image | MimeCategory::Gif => return read_all(input).await,
            MimeCategory::Video => &[],
            MimeCategory::Audio => &["-an"],
            MimeCategory::Document | MimeCategory::Other => {
                return Err(ConvertError::Unsupported(format!(
                    "no raster source for {} content",
                    category
                )))
            }
        };

        let source = spool(input).await?;
        let frame = temp_output(".png")?;
        let mut args = os_args(&["-y", "-v", "error", "-i"]);
        args.push(source.as_os_str().into());
        args.extend(os_args(extra));
        args.extend(os_args(&["-frames:v", "1", "-f", "image2"]));
        args.push(frame.as_os_str().into());
        run_tool(&self.ffmpeg_path, args).await?;

        Ok(tokio::fs::read(&frame).await?)
    }
}

impl Default for MediaConverter {
    fn default() -> Self {
        Self::new("ffmpeg", "ffprobe")
    }
}

#[async_trait]
impl Converter for MediaConverter {
    async fn meta(
        &self,
        kind: MetaKind,
        input: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<Meta, ConvertError> {
        match kind {
            MetaKind::Image => {
                let data = read_all(input).await?;
                Ok(Meta::Image(blocking(move || raster::image_meta(&data)).await?))
            }
            MetaKind::Gif => {
                let data = read_all(input).await?;
                Ok(Meta::Gif(blocking(move || raster::gif_meta(&data)).await?))
            }
            MetaKind::Document => {
                let data = read_all(input).await?;
                Ok(Meta::Pdf(blocking(move || document::parse_pdf(&data)).await?))
            }
            MetaKind::Video => Ok(Meta::Video(probe::parse_video(&self.probe(input).await?)?)),
            MetaKind::Audio => Ok(Meta::Audio(probe::parse_audio(&self.probe(input).await?)?)),
            MetaKind::Voice => Ok(Meta::Voice(probe::parse_audio(&self.probe(input).await?)?)),
        }
    }

    async fn to_mp4(
        &self,
        input: &mut (dyn AsyncRead + Send + Unpin),
        options: Mp4Options,
    ) -> Result<ByteStream, ConvertError> {
        let source = spool(input).await?;
        let output = temp_output(".mp4")?;
        run_tool(&self.ffmpeg_path, mp4_args(&source, &output, options)).await?;
        open_output(output).await
    }

    async fn to_mp3(
        &self,
        input: &mut (dyn AsyncRead + Send + Unpin),
        quality: u8,
    ) -> Result<ByteStream, ConvertError> {
        let source = spool(input).await?;
        let output = temp_output(".mp3")?;
        run_tool(&self.ffmpeg_path, mp3_args(&source, &output, quality)).await?;
        open_output(output).await
    }

    async fn to_jpeg(
        &self,
        input: &mut (dyn AsyncRead + Send + Unpin),
        max_width: Option<u32>,
        max_height: Option<u32>,
    ) -> Result<ByteStream, ConvertError> {
        let data = read_all(input).await?;
        let encoded = blocking(move || raster::to_jpeg(&data, max_width, max_height)).await?;
        Ok(Box::pin(Cursor::new(encoded.bytes)))
    }

    async fn thumbnail(
        &self,
        input: &mut (dyn AsyncRead + Send + Unpin),
        category: MimeCategory,
        max_width: u32,
        max_height: u32,
    ) -> Result<Rendition, ConvertError> {
        let data = self.frame_bytes(category, input).await?;
        let encoded = blocking(move || raster::thumbnail(&data, max_width, max_height)).await?;
        Ok(rendition(encoded))
    }

    async fn resized(
        &self,
        input: &mut (dyn AsyncRead + Send + Unpin),
        category: MimeCategory,
        max_width: u32,
        max_height: Option<u32>,
    ) -> Result<Rendition, ConvertError> {
        let data = self.frame_bytes(category, input).await?;
        let encoded = blocking(move || raster::resized(&data, max_width, max_height)).await?;
        Ok(rendition(encoded))
    }
}

fn rendition(encoded: raster::Encoded) -> Rendition {
    Rendition {
        width: encoded.width,
        height: encoded.height,
        data: Box::pin(Cursor::new(encoded.bytes)),
    }
}

fn os_args(args: &[&str]) -> Vec<OsString> {
    args.iter().map(OsString::from).collect()
}

/// Scale filter that shrinks to the bounds and keeps both sides even for yuv420p
fn scale_filter(max_width: Option<u32>, max_height: Option<u32>) -> String {
    const EVEN: &str = "scale=trunc(iw/2)*2:trunc(ih/2)*2";
    match (max_width, max_height) {
        (None, None) => EVEN.to_string(),
        (Some(w), None) => format!("scale='min({},iw)':-2", w),
        (None, Some(h)) => format!("scale=-2:'min({},ih)'", h),
        (Some(w), Some(h)) => format!(
            "scale='min({},iw)':'min({},ih)':force_original_aspect_ratio=decrease,{}",
            w, h, EVEN
        ),
    }
}

fn mp4_args(input: &Path, output: &Path, options: Mp4Options) -> Vec<OsString> {
    let mut args = os_args(&["-y", "-v", "error", "-i"]);
    args.push(input.as_os_str().into());
    args.extend(os_args(&["-c:v", "libx264", "-preset", "veryfast", "-crf"]));
    args.push(options.quality.to_string().into());
    args.extend(os_args(&["-pix_fmt", "yuv420p", "-movflags", "+faststart", "-vf"]));
    args.push(scale_filter(options.max_width, options.max_height).into());
    match options.audio_bitrate_kbps {
        Some(kbps) => {
            args.extend(os_args(&["-c:a", "aac", "-b:a"]));
            args.push(format!("{}k", kbps).into());
        }
        None => args.push("-an".into()),
    }
    args.extend(os_args(&["-f", "mp4"]));
    args.push(output.as_os_str().into());
    args
}

fn mp3_args(input: &Path, output: &Path, quality: u8) -> Vec<OsString> {
    let mut args = os_args(&["-y", "-v", "error", "-i"]);
    args.push(input.as_os_str().into());
    args.extend(os_args(&["-vn", "-c:a", "libmp3lame", "-q:a"]));
    args.push(quality.min(MP3_MAX_QUALITY).to_string().into());
    args.extend(os_args(&["-f", "mp3"]));
    args.push(output.as_os_str().into());
    args
}

#[tracing::instrument(skip(args))]
async fn run_tool(tool: &str, args: Vec<OsString>) -> Result<Vec<u8>, ConvertError> {
    debug!(?args, "Running media tool");
    let output = Command::new(tool)
        .args(&args)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| ConvertError::ProcessFailed {
            tool: tool.to_string(),
            stderr: format!("failed to start: {}", e),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        error!(status = %output.status, stderr = %stderr, "Media tool failed");
        return Err(ConvertError::ProcessFailed {
            tool: tool.to_string(),
            stderr,
        });
    }
    Ok(output.stdout)
}

async fn read_all(input: &mut (dyn AsyncRead + Send + Unpin)) -> Result<Vec<u8>, ConvertError> {
    let mut data = Vec::new();
    input.read_to_end(&mut data).await?;
    Ok(data)
}

/// Copy the input into a temp file for tools that need a seekable path
async fn spool(input: &mut (dyn AsyncRead + Send + Unpin)) -> Result<TempPath, ConvertError> {
    let path = tempfile::NamedTempFile::new()?.into_temp_path();
    let mut file = File::create(&path).await?;
    tokio::io::copy(input, &mut file).await?;
    file.flush().await?;
    Ok(path)
}

fn temp_output(suffix: &str) -> io::Result<TempPath> {
    Ok(tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()?
        .into_temp_path())
}

async fn open_output(path: TempPath) -> Result<ByteStream, ConvertError> {
    let file = File::open(&path).await?;
    Ok(Box::pin(TempFileStream { file, _path: path }))
}

async fn blocking<T, F>(f: F) -> Result<T, ConvertError>
where
    F: FnOnce() -> Result<T, ConvertError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ConvertError::Task(e.to_string()))?
}

/// Tool output file, removed once the stream is dropped
struct TempFileStream {
    file: File,
    _path: TempPath,
}

impl AsyncRead for TempFileStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.file).poll_read(cx, buf)
    }
}
