//! Color math: color-space conversions, area statistics and display transforms.

pub mod area;
pub mod ocio;
pub mod spaces;

pub use area::{AreaOptions, ChannelStats, FloatBufferView, Info, PixelSource};
pub use ocio::{LutOptions, LutOrder, OcioOptions};
pub use spaces::{
    calculate_brightness, check_levels, to_color_space, BrightnessType, Chromaticities, Color4f,
    ColorSpace, VideoLevels, YuvCoefficients,
};
