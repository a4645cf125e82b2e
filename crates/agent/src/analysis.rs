//! Stand-in for the video analysis service. Results are random; nothing here
//! looks at real media.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::error::AnalysisError;
use crate::types::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    ObjectDetection,
    ColorAnalysis,
}

impl FromStr for AnalysisKind {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "object_detection" => Ok(AnalysisKind::ObjectDetection),
            "color_analysis" => Ok(AnalysisKind::ColorAnalysis),
            other => Err(AnalysisError::UnsupportedKind(other.to_string())),
        }
    }
}

impl AnalysisKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisKind::ObjectDetection => "object_detection",
            AnalysisKind::ColorAnalysis => "color_analysis",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedObject {
    #[serde(rename = "type")]
    pub object_type: String,
    pub confidence: f64,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorSummary {
    pub dominant_colors: Vec<String>,
    pub color_distribution: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub objects: Vec<DetectedObject>,
    pub colors: Option<ColorSummary>,
    pub timestamp: Timestamp,
}

pub trait VideoAnalyzer: Send + Sync {
    fn analyze(
        &self,
        reference: &str,
        kinds: &[AnalysisKind],
    ) -> Result<AnalysisResult, AnalysisError>;
}

const OBJECT_TYPES: [&str; 6] = ["person", "dog", "car", "bicycle", "cat", "tree"];
const PALETTE: [&str; 6] = ["#FF5733", "#33FF57", "#3357FF", "#FFD700", "#800080", "#00CED1"];

/// Analyzer that fabricates plausible detections from a seeded generator.
pub struct RandomAnalyzer {
    rng: Mutex<StdRng>,
}

impl RandomAnalyzer {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn detect_objects(rng: &mut StdRng) -> Vec<DetectedObject> {
        let count = rng.gen_range(3..=6);
        (0..count)
            .map(|_| DetectedObject {
                object_type: OBJECT_TYPES[rng.gen_range(0..OBJECT_TYPES.len())].to_string(),
                confidence: round2(rng.gen_range(0.7..=0.99)),
                position: Position {
                    x: rng.gen_range(50..=400),
                    y: rng.gen_range(50..=400),
                    width: rng.gen_range(40..=100),
                    height: rng.gen_range(40..=120),
                },
            })
            .collect()
    }

    fn summarize_colors(rng: &mut StdRng) -> ColorSummary {
        let selected: Vec<String> = PALETTE
            .choose_multiple(rng, 3)
            .map(|c| c.to_string())
            .collect();
        let weights: Vec<f64> = selected.iter().map(|_| rng.gen_range(0.2..=0.5)).collect();
        let total: f64 = weights.iter().sum();

        let color_distribution = selected
            .iter()
            .zip(&weights)
            .map(|(color, w)| (color.clone(), round2(w / total)))
            .collect();

        ColorSummary {
            dominant_colors: selected,
            color_distribution,
        }
    }
}

impl Default for RandomAnalyzer {
    fn default() -> Self {
        Self::new(rand::random())
    }
}

impl VideoAnalyzer for RandomAnalyzer {
    fn analyze(
        &self,
        reference: &str,
        kinds: &[AnalysisKind],
    ) -> Result<AnalysisResult, AnalysisError> {
        if reference.trim().is_empty() {
            return Err(AnalysisError::MissingReference);
        }
        if kinds.is_empty() {
            return Err(AnalysisError::NothingRequested);
        }

        let mut rng = self.rng.lock();
        let objects = if kinds.contains(&AnalysisKind::ObjectDetection) {
            Self::detect_objects(&mut rng)
        } else {
            Vec::new()
        };
        let colors = kinds
            .contains(&AnalysisKind::ColorAnalysis)
            .then(|| Self::summarize_colors(&mut rng));

        Ok(AnalysisResult {
            objects,
            colors,
            timestamp: Timestamp::now(),
        })
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
