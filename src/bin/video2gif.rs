//! Converts a video clip into an animated GIF by shelling out to `ffmpeg`.

use anyhow::{Context, bail};
use clap::Parser;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Command;

#[derive(Debug, Parser)]
#[command(name = "video2gif", about = "Convert a video file to an animated GIF")]
struct Args {
    /// Source video
    input: PathBuf,

    /// Destination GIF, overwritten if present
    output: PathBuf,

    /// Output width in pixels; height follows the aspect ratio
    #[arg(long, default_value_t = 300, value_parser = clap::value_parser!(u32).range(1..))]
    width: u32,

    /// Output frame rate
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..))]
    fps: u32,

    /// ffmpeg executable
    #[arg(long, env = "FFMPEG_PATH", default_value = "ffmpeg")]
    ffmpeg: PathBuf,
}

fn ffmpeg_args(args: &Args) -> Vec<OsString> {
    vec![
        "-y".into(),
        "-i".into(),
        args.input.clone().into(),
        "-an".into(),
        "-r".into(),
        args.fps.to_string().into(),
        "-vf".into(),
        format!("scale={}:-1", args.width).into(),
        "-pix_fmt".into(),
        "rgb24".into(),
        args.output.clone().into(),
    ]
}

fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
    let args = Args::parse();

    if !args.input.is_file() {
        bail!("input {} does not exist", args.input.display());
    }

    log::info!(
        "converting {} -> {} ({}px wide, {} fps)",
        args.input.display(),
        args.output.display(),
        args.width,
        args.fps
    );

    let status = Command::new(&args.ffmpeg)
        .args(ffmpeg_args(&args))
        .status()
        .with_context(|| format!("failed to launch {}", args.ffmpeg.display()))?;

    if !status.success() {
        bail!("ffmpeg exited with {}", status);
    }

    log::info!("conversion finished: {}", args.output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_ffmpeg_command_line() {
        let args = Args::parse_from(["video2gif", "clip.mp4", "clip.gif", "--width", "320", "--fps", "12"]);
        let rendered: Vec<String> = ffmpeg_args(&args)
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            rendered,
            [
                "-y", "-i", "clip.mp4", "-an", "-r", "12", "-vf", "scale=320:-1", "-pix_fmt",
                "rgb24", "clip.gif"
            ]
        );
    }

    #[test]
    fn defaults_and_validation() {
        let args = Args::parse_from(["video2gif", "a.mp4", "a.gif"]);
        assert_eq!(args.width, 300);
        assert_eq!(args.fps, 10);

        assert!(Args::try_parse_from(["video2gif", "a.mp4", "a.gif", "--fps", "0"]).is_err());
    }
}
