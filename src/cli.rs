use clap::Parser;
use std::path::PathBuf;

/// Image viewport with annotations, comparison and color inspection
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Image or numbered sequence frame to load (EXR, HDR, PNG, JPEG, TIFF, TGA) - optional, can also drag-and-drop
    #[arg(value_name = "FILE")]
    pub file_path: Option<PathBuf>,

    /// Playback rate of the loaded sequence
    #[arg(long = "fps", value_name = "FPS", default_value_t = 24.0)]
    pub fps: f64,

    /// Auto-play on startup
    #[arg(short = 'a', long = "autoplay")]
    pub autoplay: bool,

    /// Start in fullscreen mode
    #[arg(short = 'F', long = "fullscreen")]
    pub fullscreen: bool,

    /// Start in presentation mode (no panels, fullscreen)
    #[arg(short = 'P', long = "presentation")]
    pub presentation: bool,

    /// Settings JSON file (pen, HUD, scrubbing, pixel bar preferences)
    #[arg(short = 's', long = "settings", value_name = "JSON")]
    pub settings: Option<PathBuf>,

    /// Directory of `<program>.glsl` fragment shader overrides
    #[arg(long = "shaders", value_name = "DIR")]
    pub shader_dir: Option<PathBuf>,

    /// Window size
    #[arg(long = "size", value_names = ["WIDTH", "HEIGHT"], num_args = 2, default_values_t = [1280, 720])]
    pub size: Vec<u32>,

    /// Increase logging verbosity (default: info, -v: debug, -vv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,
}

impl Args {
    pub fn window_size(&self) -> [f32; 2] {
        match self.size.as_slice() {
            [w, h] => [*w as f32, *h as f32],
            _ => [1280.0, 720.0],
        }
    }

    pub fn log_filter(&self) -> &'static str {
        match self.verbosity {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["mrv"]);
        assert!(args.file_path.is_none());
        assert_eq!(args.fps, 24.0);
        assert_eq!(args.window_size(), [1280.0, 720.0]);
        assert_eq!(args.log_filter(), "info");
    }

    #[test]
    fn test_flags() {
        let args = Args::parse_from(["mrv", "shot.0001.exr", "--fps", "25", "-P", "--size", "640", "360", "-vv"]);
        assert_eq!(args.file_path, Some(PathBuf::from("shot.0001.exr")));
        assert_eq!(args.fps, 25.0);
        assert!(args.presentation);
        assert_eq!(args.window_size(), [640.0, 360.0]);
        assert_eq!(args.log_filter(), "trace");
    }
}
