//! HTTP status classification

/// Outcome category of an HTTP status code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCategory {
    /// 2xx and 3xx
    Success,
    /// 4xx
    ClientError,
    /// 5xx
    ServerError,
    /// Anything outside 200..600
    Other,
}

impl StatusCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::ClientError => "client_error",
            Self::ServerError => "server_error",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for StatusCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of a single status code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub category: StatusCategory,
    /// True iff the code belongs in the report
    pub report_worthy: bool,
}

/// Classifies an HTTP status code
///
/// | Code | Category | Report-worthy |
/// |------|----------|---------------|
/// | 200-399 | Success | no |
/// | 400-499 | ClientError | yes |
/// | 500-599 | ServerError | yes |
/// | otherwise | Other | no |
///
/// # Examples
///
/// ```
/// use sumi_sweep::crawler::{classify, StatusCategory};
///
/// let c = classify(404);
/// assert_eq!(c.category, StatusCategory::ClientError);
/// assert!(c.report_worthy);
/// assert!(!classify(302).report_worthy);
/// ```
pub fn classify(code: u16) -> Classification {
    let category = match code {
        200..=399 => StatusCategory::Success,
        400..=499 => StatusCategory::ClientError,
        500..=599 => StatusCategory::ServerError,
        _ => StatusCategory::Other,
    };

    Classification {
        category,
        report_worthy: is_report_worthy(code),
    }
}

/// Returns true iff `400 <= code < 600`
pub fn is_report_worthy(code: u16) -> bool {
    (400..600).contains(&code)
}
