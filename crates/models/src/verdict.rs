use serde::{Deserialize, Serialize};

/// Relationship is the chat provider's characterization of a verified pair,
/// beyond the boolean `is_duplicate`. `Error` and `ParseError` are recorded
/// by the engine itself when the provider's response couldn't be used —
/// they never originate from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relationship {
    ExactDuplicate,
    NearDuplicate,
    Related,
    Unrelated,
    Error,
    ParseError,
}

/// Verdict is the closed set of outcomes a pairwise verification can reach,
/// parsed out of the chat provider's dynamic JSON response. Downstream
/// logic (clique grouping, the pairwise cache) switches on this type rather
/// than re-inspecting raw JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Verdict {
    Positive {
        confidence: f64,
        relationship: Relationship,
        rationale: String,
    },
    Negative {
        confidence: f64,
        relationship: Relationship,
        rationale: String,
    },
    Error {
        message: String,
    },
}

impl Verdict {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Verdict::Positive { .. })
    }

    pub fn confidence(&self) -> f64 {
        match self {
            Verdict::Positive { confidence, .. } | Verdict::Negative { confidence, .. } => *confidence,
            Verdict::Error { .. } => 0.0,
        }
    }

    pub fn relationship(&self) -> Relationship {
        match self {
            Verdict::Positive { relationship, .. } | Verdict::Negative { relationship, .. } => {
                *relationship
            }
            Verdict::Error { .. } => Relationship::Error,
        }
    }

    pub fn rationale(&self) -> &str {
        match self {
            Verdict::Positive { rationale, .. } | Verdict::Negative { rationale, .. } => rationale,
            Verdict::Error { message } => message,
        }
    }

    /// parse_error builds the verdict recorded when the provider's JSON
    /// response couldn't be decoded into the expected shape. It is
    /// deliberately not a [`Verdict::Error`] variant of the wire protocol —
    /// `Relationship::ParseError` distinguishes "we couldn't read the
    /// answer" from "the provider told us it failed".
    pub fn parse_error(detail: impl Into<String>) -> Self {
        Verdict::Negative {
            confidence: 0.0,
            relationship: Relationship::ParseError,
            rationale: detail.into(),
        }
    }
}

/// RawVerdict is the JSON shape requested from the chat provider during
/// pairwise verification, before it's lifted into the closed [`Verdict`]
/// enum. Unknown fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct RawVerdict {
    pub is_duplicate: bool,
    pub confidence: f64,
    pub relationship: Relationship,
    pub rationale: String,
}

impl From<RawVerdict> for Verdict {
    fn from(raw: RawVerdict) -> Self {
        if raw.is_duplicate {
            Verdict::Positive {
                confidence: raw.confidence,
                relationship: raw.relationship,
                rationale: raw.rationale,
            }
        } else {
            Verdict::Negative {
                confidence: raw.confidence,
                relationship: raw.relationship,
                rationale: raw.rationale,
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_error_is_not_duplicate() {
        let v = Verdict::parse_error("malformed json");
        assert!(!v.is_duplicate());
        assert_eq!(v.confidence(), 0.0);
        assert_eq!(v.relationship(), Relationship::ParseError);
    }

    #[test]
    fn test_raw_verdict_lifts_into_positive() {
        let raw = RawVerdict {
            is_duplicate: true,
            confidence: 0.9,
            relationship: Relationship::ExactDuplicate,
            rationale: "same fix".into(),
        };
        let verdict: Verdict = raw.into();
        assert!(verdict.is_duplicate());
    }
}
