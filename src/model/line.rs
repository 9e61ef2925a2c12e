use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;

/// A rail line, identified upstream by a two-letter code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Line {
    #[serde(rename = "RD")]
    Red,
    #[serde(rename = "OR")]
    Orange,
    #[serde(rename = "SV")]
    Silver,
    #[serde(rename = "BL")]
    Blue,
    #[serde(rename = "GR")]
    Green,
    #[serde(rename = "YL")]
    Yellow,
}

impl Line {
    pub const ALL: [Line; 6] = [
        Line::Red,
        Line::Orange,
        Line::Silver,
        Line::Blue,
        Line::Green,
        Line::Yellow,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Line::Red => "RD",
            Line::Orange => "OR",
            Line::Silver => "SV",
            Line::Blue => "BL",
            Line::Green => "GR",
            Line::Yellow => "YL",
        }
    }
}

impl FromStr for Line {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Line::ALL
            .into_iter()
            .find(|line| line.code() == s.trim())
            .ok_or_else(|| ParseError::UnknownLine(s.to_string()))
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_parse_back() {
        for line in Line::ALL {
            assert_eq!(line.code().parse::<Line>().unwrap(), line);
        }
    }

    #[test]
    fn test_non_passenger_codes_are_rejected() {
        assert!(matches!("No".parse::<Line>(), Err(ParseError::UnknownLine(_))));
        assert!("--".parse::<Line>().is_err());
        assert!("".parse::<Line>().is_err());
    }

    #[test]
    fn test_serializes_as_code() {
        assert_eq!(serde_json::to_string(&Line::Silver).unwrap(), "\"SV\"");
    }
}
