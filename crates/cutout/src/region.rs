//! Cleanup of externally proposed bounding boxes.

use std::str::FromStr;

use serde::Deserialize;
use tracing::debug;

use crate::{
    error::{CutoutError, Result},
    prompt::PromptIntent,
    types::Region,
};

/// Margin added around a proposal, as a fraction of its own size
pub const GENERIC_MARGIN: f64 = 0.10;
pub const TEXT_MARGIN: f64 = 0.15;

/// Clip a proposed rectangle to the image and grow it by a margin so the
/// design is not cut at its boundary.
///
/// A prompt asking for the whole image yields the full bounds regardless of
/// the proposal. Text prompts get the wider margin, since clipped glyphs are
/// more noticeable than a clipped graphic.
pub fn normalize_region(proposal: Region, prompt: &str, image_size: (u32, u32)) -> Result<Region> {
    let (width, height) = image_size;
    if width == 0 || height == 0 {
        return Err(CutoutError::InvalidRegion { region: proposal, width, height });
    }

    let intent = PromptIntent::parse(prompt);
    if intent.entire {
        debug!(%proposal, "Prompt asks for the entire image");
        return Ok(Region::full(width, height));
    }

    let clipped = clamp_with_nudge(proposal.ordered(), width, height);
    let margin = if intent.is_text() { TEXT_MARGIN } else { GENERIC_MARGIN };
    let margin_x = (clipped.width() as f64 * margin) as i64;
    let margin_y = (clipped.height() as f64 * margin) as i64;

    let expanded = clamp_with_nudge(
        Region::new(
            clipped.x1 - margin_x,
            clipped.y1 - margin_y,
            clipped.x2 + margin_x,
            clipped.y2 + margin_y,
        ),
        width,
        height,
    );
    debug!(%proposal, %expanded, margin_x, margin_y, "Normalized region proposal");
    Ok(expanded)
}

/// Clamp into the image, keeping at least one pixel in each direction.
fn clamp_with_nudge(region: Region, width: u32, height: u32) -> Region {
    let (w, h) = (width as i64, height as i64);
    let x1 = region.x1.clamp(0, w - 1);
    let y1 = region.y1.clamp(0, h - 1);
    Region::new(x1, y1, region.x2.clamp(x1 + 1, w), region.y2.clamp(y1 + 1, h))
}

/// A coordinate as models write it: a number or a numeric string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Coordinate {
    Number(f64),
    Text(String),
}

impl Coordinate {
    fn value(&self) -> Result<i64> {
        match self {
            Coordinate::Number(n) => Ok(*n as i64),
            Coordinate::Text(text) => {
                let text = text.trim();
                text.parse::<i64>()
                    .ok()
                    .or_else(|| text.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f as i64))
                    .ok_or_else(|| CutoutError::InvalidProposal(format!("{text:?} is not a coordinate")))
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawProposal {
    x1: Coordinate,
    y1: Coordinate,
    x2: Coordinate,
    y2: Coordinate,
}

impl RawProposal {
    fn region(&self) -> Result<Region> {
        Ok(Region::new(self.x1.value()?, self.y1.value()?, self.x2.value()?, self.y2.value()?))
    }
}

/// Parse a bounding box out of an external model's answer.
///
/// Tried in order:
/// - the first `{...}` object, with `x1`, `y1`, `x2`, `y2` given as numbers
///   or numeric strings;
/// - `x1: 10, y1 = 20, ...` style labelled pairs;
/// - the first four standalone integers, in that order.
///
/// Digits that are part of a word (the `1` in `x1`) never count as a
/// coordinate.
pub fn parse_proposal(answer: &str) -> Result<Region> {
    if let Some(object) = first_json_object(answer) {
        let raw: RawProposal = serde_json::from_str(object)
            .map_err(|e| CutoutError::InvalidProposal(format!("{e} in {object}")))?;
        return raw.region();
    }

    if let Some(region) = labelled_proposal(answer) {
        return Ok(region);
    }

    let numbers: Vec<i64> = answer
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
        .take(4)
        .map(|s| s.parse::<i64>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| CutoutError::InvalidProposal(e.to_string()))?;

    match numbers[..] {
        [x1, y1, x2, y2] => Ok(Region::new(x1, y1, x2, y2)),
        _ => Err(CutoutError::InvalidProposal(format!(
            "no coordinates found in {answer:?}"
        ))),
    }
}

/// All four corners written as `key: value` or `key = value`.
fn labelled_proposal(answer: &str) -> Option<Region> {
    let text = answer.to_ascii_lowercase();
    let x1 = labelled_value(&text, "x1")?;
    let y1 = labelled_value(&text, "y1")?;
    let x2 = labelled_value(&text, "x2")?;
    let y2 = labelled_value(&text, "y2")?;
    Some(Region::new(x1, y1, x2, y2))
}

/// The integer after the first standalone `key` followed by `:` or `=`.
fn labelled_value(text: &str, key: &str) -> Option<i64> {
    let is_quote_or_space = |c: char| c.is_whitespace() || c == '"' || c == '\'';

    text.match_indices(key).find_map(|(at, _)| {
        if text[..at].chars().next_back().is_some_and(char::is_alphanumeric) {
            return None;
        }
        let rest = text[at + key.len()..].trim_start_matches(is_quote_or_space);
        let rest = rest.strip_prefix(':').or_else(|| rest.strip_prefix('='))?;
        let rest = rest.trim_start_matches(is_quote_or_space);

        let sign = usize::from(rest.starts_with('-'));
        let digits = rest[sign..].bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 {
            return None;
        }
        rest[..sign + digits].parse().ok()
    })
}

/// The first balanced `{...}` span in `text`.
fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    for (offset, c) in text[start..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

impl FromStr for Region {
    type Err = CutoutError;

    /// Parses `x1,y1,x2,y2`.
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<i64> = s
            .split(',')
            .map(|part| part.trim().parse::<i64>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| CutoutError::InvalidProposal(format!("{s:?}: {e}")))?;
        match parts[..] {
            [x1, y1, x2, y2] => Ok(Region::new(x1, y1, x2, y2)),
            _ => Err(CutoutError::InvalidProposal(format!(
                "{s:?}: expected four comma-separated integers"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entire_prompt_returns_full_bounds() {
        for prompt in ["весь", "entire", "the whole thing"] {
            let region = normalize_region(Region::new(10, 20, 30, 40), prompt, (800, 600)).unwrap();
            assert_eq!(region, Region::new(0, 0, 800, 600));
        }
    }

    #[test]
    fn test_margin_depends_on_prompt() {
        let proposal = Region::new(100, 100, 200, 200);
        assert_eq!(
            normalize_region(proposal, "the logo", (1000, 1000)).unwrap(),
            Region::new(90, 90, 210, 210)
        );
        assert_eq!(
            normalize_region(proposal, "the text", (1000, 1000)).unwrap(),
            Region::new(85, 85, 215, 215)
        );
    }

    #[test]
    fn test_expansion_is_clipped_to_image() {
        let region = normalize_region(Region::new(-50, 5, 120, 95), "", (100, 100)).unwrap();
        assert_eq!(region, Region::new(0, 0, 100, 100));
    }

    #[test]
    fn test_degenerate_proposal_is_nudged() {
        let region = normalize_region(Region::new(100, 100, 100, 100), "", (100, 100)).unwrap();
        assert_eq!(region, Region::new(99, 99, 100, 100));

        let region = normalize_region(Region::new(40, 70, 10, 20), "", (100, 100)).unwrap();
        assert_eq!(region, Region::new(7, 15, 43, 75));
    }

    #[test]
    fn test_empty_image_is_rejected() {
        let err = normalize_region(Region::new(0, 0, 1, 1), "", (0, 10)).unwrap_err();
        assert!(matches!(err, CutoutError::InvalidRegion { .. }));
    }

    #[test]
    fn test_parse_json_answer() {
        let answer = "Here you go:\n```json\n{\"x1\": 100, \"y1\": 50.7, \"x2\": 400, \"y2\": 300}\n```";
        assert_eq!(parse_proposal(answer).unwrap(), Region::new(100, 50, 400, 300));
    }

    #[test]
    fn test_parse_missing_field_is_invalid() {
        let err = parse_proposal(r#"{"x1": 1, "y1": 2, "x2": 3}"#).unwrap_err();
        assert!(matches!(err, CutoutError::InvalidProposal(_)));
    }

    #[test]
    fn test_parse_string_coordinates() {
        let answer = r#"{"x1": "100", "y1": " 50 ", "x2": 400, "y2": "300.9"}"#;
        assert_eq!(parse_proposal(answer).unwrap(), Region::new(100, 50, 400, 300));

        let err = parse_proposal(r#"{"x1": "abc", "y1": 2, "x2": 3, "y2": 4}"#).unwrap_err();
        assert!(matches!(err, CutoutError::InvalidProposal(_)));
    }

    #[test]
    fn test_parse_labelled_pairs() {
        let region = parse_proposal("x1: 120, y1: 40, x2: 300, y2: 220").unwrap();
        assert_eq!(region, Region::new(120, 40, 300, 220));
        assert_eq!(
            normalize_region(region, "the logo", (400, 300)).unwrap(),
            Region::new(102, 22, 318, 238)
        );

        assert_eq!(
            parse_proposal("Box: X1=5 y1 = 6, x2='50' y2=60.").unwrap(),
            Region::new(5, 6, 50, 60)
        );
    }

    #[test]
    fn test_digits_inside_words_are_skipped() {
        assert_eq!(
            parse_proposal("corner x1 at 12 30, then x2 at 200 310").unwrap(),
            Region::new(12, 30, 200, 310)
        );
        assert!(parse_proposal("x1 y1 x2 y2").is_err());
    }

    #[test]
    fn test_parse_plain_numbers() {
        assert_eq!(
            parse_proposal("top-left 12, 30 and bottom-right 200, 310").unwrap(),
            Region::new(12, 30, 200, 310)
        );
        assert!(parse_proposal("somewhere near the middle").is_err());
        assert!(parse_proposal("1 2 3").is_err());
    }

    #[test]
    fn test_region_from_str() {
        assert_eq!("1, 2,30,40".parse::<Region>().unwrap(), Region::new(1, 2, 30, 40));
        assert!("1,2,3".parse::<Region>().is_err());
        assert!("a,b,c,d".parse::<Region>().is_err());
    }
}
