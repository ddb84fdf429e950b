use std::{io, path::Path, process};

use serde::{Deserialize, Serialize};

/// Run `ffprobe` on `path` and parse its stream listing.
pub fn ffprobe(ffprobe_path: &Path, path: impl AsRef<Path>) -> Result<FfProbeResult, FfProbeError> {
    let path = path.as_ref();

    let mut cmd = process::Command::new(ffprobe_path);
    {
        cmd.args(["-v", "quiet"])
            .args(["-print_format", "json=c=1"])
            .arg("-show_streams")
            .arg(path);
    }

    let out = cmd.output().map_err(FfProbeError::Io)?;

    if !out.status.success() {
        return Err(FfProbeError::Status(out));
    }

    serde_json::from_slice::<FfProbeResult>(&out.stdout).map_err(FfProbeError::Deserialize)
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum FfProbeError {
    #[error(transparent)]
    Io(io::Error),
    #[error("ffprobe exited with status code {}: {}", .0.status, String::from_utf8_lossy(&.0.stderr).trim())]
    Status(process::Output),
    #[error(transparent)]
    Deserialize(serde_json::Error),
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FfProbeResult {
    #[serde(default)]
    pub streams: Vec<Stream>,
}

impl FfProbeResult {
    /// Width and height of the first video stream that reports both.
    #[must_use]
    pub fn video_dimensions(&self) -> Option<(u32, u32)> {
        self.streams
            .iter()
            .filter(|x| x.codec_type.as_deref() == Some("video"))
            .find_map(|x| {
                let width = u32::try_from(x.width?).ok()?;
                let height = u32::try_from(x.height?).ok()?;

                (width > 0 && height > 0).then_some((width, height))
            })
    }
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stream {
    pub index: i64,
    pub codec_name: Option<String>,
    pub codec_type: Option<String>,
    pub width: Option<i64>,
    pub height: Option<i64>,
}
