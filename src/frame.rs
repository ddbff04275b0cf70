use std::path::{Path, PathBuf};

use image::{ImageBuffer, Luma, RgbImage};

use crate::error::FrameSourceError;

/// Raw 16-bit depth image as delivered by the sensor
pub type DepthImage = ImageBuffer<Luma<u16>, Vec<u16>>;

/// Distance lookup for a pixel. Returns meters, or 0.0 for "no valid reading".
pub trait DepthQuery {
    fn distance(&self, x: u32, y: u32) -> f32;
}

/// Depth frame aligned with the color frame
#[derive(Debug, Clone)]
pub struct DepthMap {
    raw: DepthImage,
    /// Meters per raw unit (RealSense z16 streams use 0.001)
    scale: f32,
}

impl DepthMap {
    pub fn new(raw: DepthImage, scale: f32) -> Self {
        Self { raw, scale }
    }

    /// Depth map reporting the same distance everywhere (mainly for tests and replays)
    pub fn uniform(width: u32, height: u32, meters: f32) -> Self {
        let scale = 0.001;
        let raw_value = (meters / scale).round().clamp(0.0, u16::MAX as f32) as u16;
        Self::new(ImageBuffer::from_pixel(width, height, Luma([raw_value])), scale)
    }

    pub fn width(&self) -> u32 {
        self.raw.width()
    }

    pub fn height(&self) -> u32 {
        self.raw.height()
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }
}

impl DepthQuery for DepthMap {
    fn distance(&self, x: u32, y: u32) -> f32 {
        if x >= self.raw.width() || y >= self.raw.height() {
            return 0.0;
        }
        self.raw.get_pixel(x, y)[0] as f32 * self.scale
    }
}

/// Time-aligned color/depth pair
#[derive(Debug, Clone)]
pub struct Frame {
    pub index: u64,
    pub color: RgbImage,
    pub depth: DepthMap,
}

impl Frame {
    pub fn new(index: u64, color: RgbImage, depth: DepthMap) -> Self {
        Self {
            index,
            color,
            depth,
        }
    }

    pub fn width(&self) -> u32 {
        self.color.width()
    }

    pub fn height(&self) -> u32 {
        self.color.height()
    }
}

/// Result of asking a source for the next frame
#[derive(Debug)]
pub enum FramePoll {
    Ready(Frame),
    /// Nothing usable this cycle; the caller skips it
    NotReady,
    Finished,
}

/// Supplier of color/depth frames
pub trait FrameSource: Send {
    fn next_frame(&mut self) -> FramePoll;
}

/// Recorded session on disk: `color_<n>.png` frames with matching 16-bit `depth_<n>.png`.
pub struct ImageSequenceSource {
    pairs: Vec<(PathBuf, PathBuf)>,
    cursor: usize,
    depth_scale: f32,
}

/// Numeric suffix of `color_<n>.png`, `None` when it is not a number
fn frame_number(name: &str) -> Option<u64> {
    name.strip_prefix("color_")?.strip_suffix(".png")?.parse().ok()
}

impl ImageSequenceSource {
    /// Open a recorded session. Fails when the directory is missing or holds no color frames.
    pub fn open<P: AsRef<Path>>(dir: P, depth_scale: f32) -> Result<Self, FrameSourceError> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(FrameSourceError::NotFound(dir.to_path_buf()));
        }

        let mut color_names = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let name = entry?.file_name().to_string_lossy().into_owned();
            if name.starts_with("color_") && name.ends_with(".png") {
                color_names.push(name);
            }
        }
        if color_names.is_empty() {
            return Err(FrameSourceError::Empty(dir.to_path_buf()));
        }
        // Numeric order so unpadded recordings replay as 1, 2, 10
        color_names.sort_by_key(|name| (frame_number(name), name.clone()));

        let pairs = color_names
            .into_iter()
            .map(|name| {
                let depth_name = name.replacen("color_", "depth_", 1);
                (dir.join(name), dir.join(depth_name))
            })
            .collect();

        Ok(Self {
            pairs,
            cursor: 0,
            depth_scale,
        })
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    fn load(&self, index: usize) -> anyhow::Result<Frame> {
        let (color_path, depth_path) = &self.pairs[index];
        if !depth_path.exists() {
            anyhow::bail!("missing depth frame {}", depth_path.display());
        }
        let color = image::open(color_path)?.to_rgb8();
        let depth = image::open(depth_path)?.into_luma16();
        if color.dimensions() != depth.dimensions() {
            anyhow::bail!(
                "color {:?} and depth {:?} sizes differ",
                color.dimensions(),
                depth.dimensions()
            );
        }
        Ok(Frame::new(
            index as u64,
            color,
            DepthMap::new(depth, self.depth_scale),
        ))
    }
}

impl FrameSource for ImageSequenceSource {
    fn next_frame(&mut self) -> FramePoll {
        if self.cursor >= self.pairs.len() {
            return FramePoll::Finished;
        }
        let index = self.cursor;
        self.cursor += 1;

        match self.load(index) {
            Ok(frame) => FramePoll::Ready(frame),
            Err(e) => {
                log::warn!("Skipping frame {}: {}", index, e);
                FramePoll::NotReady
            }
        }
    }
}
