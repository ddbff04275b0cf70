use std::collections::BTreeMap;
use std::path::Path;

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::detection::circles::{dedup, CircleDetector, DedupParams};
use crate::error::ConfigError;
use crate::models::{BoundingBox, Circle, CircleCandidate, MarkerIdentity, Point};

/// Static mapping from inner-ring count to marker name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkerCatalog {
    entries: BTreeMap<u32, String>,
}

impl MarkerCatalog {
    pub fn new(entries: BTreeMap<u32, String>) -> Self {
        Self { entries }
    }

    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (u32, S)>,
        S: Into<String>,
    {
        Self::new(pairs.into_iter().map(|(k, v)| (k, v.into())).collect())
    }

    /// Load a catalog from a JSON object such as `{"1": "Chair", "2": "Bench"}`
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn lookup(&self, inner_ring_count: usize) -> MarkerIdentity {
        u32::try_from(inner_ring_count)
            .ok()
            .and_then(|count| self.entries.get(&count))
            .map(|name| MarkerIdentity::Known(name.clone()))
            .unwrap_or(MarkerIdentity::Unknown)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&u32, &String)> {
        self.entries.iter()
    }
}

impl Default for MarkerCatalog {
    fn default() -> Self {
        Self::from_pairs([
            (1, "Chair"),
            (2, "Bench"),
            (3, "Desk"),
            (4, "Wardrobe"),
            (5, "Trash bin"),
        ])
    }
}

/// Outcome of classifying one frame's candidates
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Largest ring, used as reference only
    pub reference: CircleCandidate,
    /// Second-largest ring, the marker of interest
    pub target: CircleCandidate,
    pub roi: BoundingBox,
    /// Inner circles in frame coordinates, after duplicate removal
    pub inner_circles: Vec<Circle>,
    pub inner_ring_count: usize,
    pub identity: MarkerIdentity,
}

/// Picks the marker of interest and identifies it by counting nested circles.
pub struct MarkerClassifier {
    catalog: MarkerCatalog,
    detector: Box<dyn CircleDetector>,
    dedup: DedupParams,
}

impl MarkerClassifier {
    pub fn new(catalog: MarkerCatalog, detector: Box<dyn CircleDetector>, dedup: DedupParams) -> Self {
        Self {
            catalog,
            detector,
            dedup,
        }
    }

    pub fn catalog(&self) -> &MarkerCatalog {
        &self.catalog
    }

    /// Sort candidates largest first by projected area; ties go to the
    /// leftmost, then topmost center so the order never depends on input order.
    pub fn rank(candidates: &[CircleCandidate]) -> Vec<CircleCandidate> {
        let mut ranked = candidates.to_vec();
        ranked.sort_by(|a, b| {
            b.projected_area()
                .total_cmp(&a.projected_area())
                .then_with(|| a.center.x.total_cmp(&b.center.x))
                .then_with(|| a.center.y.total_cmp(&b.center.y))
                .then_with(|| b.major_axis.total_cmp(&a.major_axis))
        });
        ranked
    }

    /// Classify deduplicated candidates against the binary image they came from.
    /// Returns `None` when fewer than two candidates exist.
    pub fn classify(&self, candidates: &[CircleCandidate], binary: &GrayImage) -> Option<Classification> {
        let mut ranked = Self::rank(candidates).into_iter();
        let (Some(reference), Some(target)) = (ranked.next(), ranked.next()) else {
            log::debug!("{} candidate(s), no marker of interest", candidates.len());
            return None;
        };

        let roi = target.roi(binary.width(), binary.height());
        let inner_circles = self.inner_circles(binary, &roi);
        let inner_ring_count = inner_circles.len();
        let identity = self.catalog.lookup(inner_ring_count);

        Some(Classification {
            reference,
            target,
            roi,
            inner_circles,
            inner_ring_count,
            identity,
        })
    }

    fn inner_circles(&self, binary: &GrayImage, roi: &BoundingBox) -> Vec<Circle> {
        if roi.is_empty() {
            return Vec::new();
        }

        let crop = image::imageops::crop_imm(binary, roi.x, roi.y, roi.width, roi.height).to_image();
        let found: Vec<Circle> = self
            .detector
            .detect_circles(&crop)
            .into_iter()
            .map(|c| Circle {
                center: Point::new(c.center.x + roi.x as f32, c.center.y + roi.y as f32),
                radius: c.radius,
            })
            .collect();

        dedup(&found, &self.dedup)
    }
}
