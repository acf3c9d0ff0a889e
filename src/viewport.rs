use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Page size handed to the renderer when a session is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 800,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ViewportParseError {
    #[error("Invalid viewport {0:?}: expected WIDTHxHEIGHT (e.g., 1280x800)")]
    InvalidFormat(String),
    #[error("Invalid viewport dimension {0:?}: expected a positive integer")]
    InvalidDimension(String),
}

impl FromStr for Viewport {
    type Err = ViewportParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| ViewportParseError::InvalidFormat(s.to_string()))?;

        let dimension = |raw: &str| {
            raw.trim()
                .parse::<u32>()
                .ok()
                .filter(|v| *v > 0)
                .ok_or_else(|| ViewportParseError::InvalidDimension(raw.trim().to_string()))
        };

        Ok(Viewport {
            width: dimension(w)?,
            height: dimension(h)?,
        })
    }
}

impl TryFrom<String> for Viewport {
    type Error = ViewportParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Viewport> for String {
    fn from(viewport: Viewport) -> Self {
        viewport.to_string()
    }
}

impl fmt::Display for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_width_and_height() {
        let vp: Viewport = "1920x1080".parse().unwrap();
        assert_eq!(vp, Viewport { width: 1920, height: 1080 });
        let vp: Viewport = " 800 X 600 ".parse().unwrap();
        assert_eq!(vp, Viewport { width: 800, height: 600 });
    }

    #[test]
    fn rejects_malformed_or_zero_dimensions() {
        assert!(matches!(
            "1280".parse::<Viewport>(),
            Err(ViewportParseError::InvalidFormat(_))
        ));
        assert!(matches!(
            "0x800".parse::<Viewport>(),
            Err(ViewportParseError::InvalidDimension(_))
        ));
        assert!("1280xabc".parse::<Viewport>().is_err());
        assert!("1280x800x2".parse::<Viewport>().is_err());
    }

    #[test]
    fn display_round_trips_through_string() {
        let vp = Viewport::default();
        assert_eq!(vp.to_string(), "1280x800");
        assert_eq!(Viewport::try_from(vp.to_string()).unwrap(), vp);
    }
}
