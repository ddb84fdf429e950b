use std::{fmt, io, path::Path};

use image::ImageReader;
use tracing::trace;

use crate::ffprobe::{ffprobe, FfProbeError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Broad kind of a downloaded file, sniffed from its leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Video,
    Other,
}

impl MediaKind {
    pub fn detect(path: &Path) -> Result<Self, io::Error> {
        let kind = match infer::get_from_path(path)?.map(|x| x.matcher_type()) {
            Some(infer::MatcherType::Image) => Self::Image,
            Some(infer::MatcherType::Video) => Self::Video,
            _ => Self::Other,
        };

        Ok(kind)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    FfProbe(#[from] FfProbeError),
    #[error("ffprobe is not available to read video dimensions")]
    MissingFfprobe,
    #[error("No usable dimensions found")]
    NoDimensions,
}

/// Read the pixel size of an image or video file.
///
/// Images only have their header decoded. Videos need `ffprobe`.
pub fn probe_dimensions(path: &Path, ffprobe_path: Option<&Path>) -> Result<Dimensions, ProbeError> {
    let kind = infer::get_from_path(path)?;
    trace!(?path, kind = ?kind.map(|x| x.mime_type()), "Probing dimensions");

    match kind.map(|x| x.matcher_type()) {
        Some(infer::MatcherType::Video) => probe_video(path, ffprobe_path),
        Some(infer::MatcherType::Image) => probe_image(path),
        _ => probe_image(path).or_else(|e| match ffprobe_path {
            Some(_) => probe_video(path, ffprobe_path),
            None => Err(e),
        }),
    }
}

fn probe_image(path: &Path) -> Result<Dimensions, ProbeError> {
    let (width, height) = ImageReader::open(path)?
        .with_guessed_format()?
        .into_dimensions()?;

    non_zero(width, height)
}

fn probe_video(path: &Path, ffprobe_path: Option<&Path>) -> Result<Dimensions, ProbeError> {
    let ffprobe_path = ffprobe_path.ok_or(ProbeError::MissingFfprobe)?;

    let (width, height) = ffprobe(ffprobe_path, path)?
        .video_dimensions()
        .ok_or(ProbeError::NoDimensions)?;

    non_zero(width, height)
}

const fn non_zero(width: u32, height: u32) -> Result<Dimensions, ProbeError> {
    if width == 0 || height == 0 {
        return Err(ProbeError::NoDimensions);
    }

    Ok(Dimensions { width, height })
}
