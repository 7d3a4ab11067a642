//! The per-tile custom-data mini-language.
//!
//! Each line starts with a case-sensitive keyword followed by comma separated
//! values:
//!
//! ```text
//! animatedSprites 0, 1, 2, 3
//! animationSpeed 0.5, 1.5
//! animationStartTime 0
//! animationStartFrame 0, 3
//! ```
//!
//! Lines with any other prefix are ignored. A malformed value only costs that
//! value; the remaining lines are still parsed.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Frame list keyword.
pub const ANIMATED_SPRITES: &str = "animatedSprites";
/// Playback speed range keyword.
pub const ANIMATION_SPEED: &str = "animationSpeed";
/// Start time range keyword.
pub const ANIMATION_START_TIME: &str = "animationStartTime";
/// Start frame range keyword.
pub const ANIMATION_START_FRAME: &str = "animationStartFrame";

/// Inclusive range. `min == max` when a single value was given.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinMax<T> {
    /// Lower bound.
    pub min: T,
    /// Upper bound.
    pub max: T,
}

/// Animation parameters read from a tile's custom data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnimationSpec {
    /// Playback speed multiplier.
    pub speed: Option<MinMax<f32>>,
    /// Start time offset in seconds.
    pub start_time: Option<MinMax<f32>>,
    /// Frame to start on.
    pub start_frame: Option<MinMax<i32>>,
    /// Indices into the standard artifact list, in playback order.
    pub frames: Vec<usize>,
}

/// A recoverable problem in one annotation line.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationWarning {
    /// A value could not be parsed as the keyword's number type.
    BadToken {
        /// Keyword of the offending line.
        keyword: &'static str,
        /// Position of the value on its line.
        index: usize,
        /// Text that failed to parse.
        token: String,
    },
    /// Range keywords take one or two values.
    WrongArity {
        /// Keyword of the offending line.
        keyword: &'static str,
        /// Number of values given.
        found: usize,
    },
    /// `animatedSprites` named a tile that does not exist.
    FrameOutOfRange {
        /// The offending tile id.
        frame: i64,
        /// Number of standard tiles.
        tile_count: usize,
    },
}

impl fmt::Display for AnnotationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnnotationWarning::BadToken {
                keyword,
                index,
                token,
            } => write!(f, "\"{keyword}\" value {index} is not a number: \"{token}\""),
            AnnotationWarning::WrongArity { keyword, found } => write!(
                f,
                "\"{keyword}\" expects 1 or 2 values but there were {found}"
            ),
            AnnotationWarning::FrameOutOfRange { frame, tile_count } => write!(
                f,
                "{ANIMATED_SPRITES} tile id {frame} is out of range (0..{tile_count})"
            ),
        }
    }
}

/// Result of parsing one tile's custom data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedAnnotation {
    /// `None` when no line used a known keyword.
    pub animation: Option<AnimationSpec>,
    /// Problems found along the way.
    pub warnings: Vec<AnnotationWarning>,
}

/// Parses one tile's custom data. `tile_count` bounds the `animatedSprites` indices.
pub fn parse_annotation(text: &str, tile_count: usize) -> ParsedAnnotation {
    let mut out = ParsedAnnotation::default();
    if text.is_empty() {
        return out;
    }

    let mut spec = AnimationSpec::default();
    let mut matched = false;

    for line in text.split('\n') {
        if let Some(tokens) = strip_keyword(line, ANIMATED_SPRITES) {
            matched = true;
            let ids: Vec<i64> = parse_tokens(ANIMATED_SPRITES, &tokens, &mut out.warnings);
            spec.frames = ids
                .into_iter()
                .filter_map(|id| match usize::try_from(id) {
                    Ok(idx) if idx < tile_count => Some(idx),
                    _ => {
                        out.warnings.push(AnnotationWarning::FrameOutOfRange {
                            frame: id,
                            tile_count,
                        });
                        None
                    }
                })
                .collect();
        } else if let Some(tokens) = strip_keyword(line, ANIMATION_SPEED) {
            matched = true;
            let values = parse_tokens(ANIMATION_SPEED, &tokens, &mut out.warnings);
            spec.speed = min_max(ANIMATION_SPEED, &values, &mut out.warnings);
        } else if let Some(tokens) = strip_keyword(line, ANIMATION_START_TIME) {
            matched = true;
            let values = parse_tokens(ANIMATION_START_TIME, &tokens, &mut out.warnings);
            spec.start_time = min_max(ANIMATION_START_TIME, &values, &mut out.warnings);
        } else if let Some(tokens) = strip_keyword(line, ANIMATION_START_FRAME) {
            matched = true;
            let values = parse_tokens(ANIMATION_START_FRAME, &tokens, &mut out.warnings);
            spec.start_frame = min_max(ANIMATION_START_FRAME, &values, &mut out.warnings);
        }
    }

    if matched {
        out.animation = Some(spec);
    }
    out
}

fn strip_keyword<'a>(line: &'a str, keyword: &str) -> Option<Vec<&'a str>> {
    let rest = line.strip_prefix(keyword)?;
    Some(
        rest.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect(),
    )
}

fn parse_tokens<T: FromStr>(
    keyword: &'static str,
    tokens: &[&str],
    warnings: &mut Vec<AnnotationWarning>,
) -> Vec<T> {
    let mut values = Vec::with_capacity(tokens.len());
    for (index, token) in tokens.iter().enumerate() {
        match token.parse() {
            Ok(v) => values.push(v),
            Err(_) => warnings.push(AnnotationWarning::BadToken {
                keyword,
                index,
                token: (*token).to_owned(),
            }),
        }
    }
    values
}

fn min_max<T: Copy>(
    keyword: &'static str,
    values: &[T],
    warnings: &mut Vec<AnnotationWarning>,
) -> Option<MinMax<T>> {
    match *values {
        [v] => Some(MinMax { min: v, max: v }),
        [min, max] => Some(MinMax { min, max }),
        _ => {
            warnings.push(AnnotationWarning::WrongArity {
                keyword,
                found: values.len(),
            });
            None
        }
    }
}
