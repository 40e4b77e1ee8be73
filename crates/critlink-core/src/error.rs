use std::fmt;
use std::path::PathBuf;

/// Machine-readable error codes for scripted callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    ConfigTreeInvalid,
    SourceTextUnreadable,
    ArtifactMalformed,
    StructuralViolation,
    ArtifactUnreadable,
    ArtifactWriteFailed,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::ConfigTreeInvalid => "E1002",
            Self::SourceTextUnreadable => "E1003",
            Self::ArtifactMalformed => "E2001",
            Self::StructuralViolation => "E2002",
            Self::ArtifactUnreadable => "E2003",
            Self::ArtifactWriteFailed => "E5001",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::ConfigTreeInvalid => "Configuration tree unreadable",
            Self::SourceTextUnreadable => "Extracted source text unreadable",
            Self::ArtifactMalformed => "Link artifact malformed",
            Self::StructuralViolation => "Mutual link survived cycle breaking",
            Self::ArtifactUnreadable => "Link artifact unreadable",
            Self::ArtifactWriteFailed => "Link artifact write failed",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in critlink.toml and retry."),
            Self::ConfigTreeInvalid => {
                Some("Check the configuration tree path and that it is valid JSON.")
            }
            Self::SourceTextUnreadable => {
                Some("Re-run text extraction or point --text at the extracted file.")
            }
            Self::ArtifactMalformed => Some(
                "The artifact must be a JSON array of {criteria, linked_criteria} records.",
            ),
            Self::StructuralViolation => {
                Some("Report a bug with the artifact attached; the code ordering is inconsistent.")
            }
            Self::ArtifactUnreadable | Self::ArtifactWriteFailed => {
                Some("Check file permissions and disk space.")
            }
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors raised by the link pipeline.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// The configuration tree could not be read or parsed.
    #[error("failed to load configuration tree {path}: {reason}")]
    ConfigTree { path: PathBuf, reason: String },

    /// The extracted text could not be read.
    #[error("failed to read source text {path}: {source}")]
    SourceText {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The artifact exists but is not a valid record array.
    #[error("malformed link artifact {path}: {reason}")]
    MalformedArtifact { path: PathBuf, reason: String },

    /// The artifact exists but could not be read.
    #[error("failed to read link artifact {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A mutual forward edge survived breaking.
    #[error("mutual link {lower} <-> {higher} survived cycle breaking")]
    StructuralViolation { lower: String, higher: String },

    /// Writing the artifact failed; the previous file is left untouched.
    #[error("failed to write link artifact {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize link artifact: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl LinkError {
    /// Return the machine-readable error code for this error.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::ConfigTree { .. } => ErrorCode::ConfigTreeInvalid,
            Self::SourceText { .. } => ErrorCode::SourceTextUnreadable,
            Self::MalformedArtifact { .. } => ErrorCode::ArtifactMalformed,
            Self::Read { .. } => ErrorCode::ArtifactUnreadable,
            Self::StructuralViolation { .. } => ErrorCode::StructuralViolation,
            Self::Write { .. } => ErrorCode::ArtifactWriteFailed,
            Self::Serialize(_) => ErrorCode::InternalUnexpected,
        }
    }

    /// Remediation text for operators, falling back to the code's message.
    #[must_use]
    pub fn suggestion(&self) -> String {
        let code = self.error_code();
        code.hint().unwrap_or_else(|| code.message()).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorCode, LinkError};
    use std::collections::HashSet;

    #[test]
    fn all_codes_are_unique() {
        let all = [
            ErrorCode::ConfigParseError,
            ErrorCode::ConfigTreeInvalid,
            ErrorCode::SourceTextUnreadable,
            ErrorCode::ArtifactMalformed,
            ErrorCode::StructuralViolation,
            ErrorCode::ArtifactUnreadable,
            ErrorCode::ArtifactWriteFailed,
            ErrorCode::InternalUnexpected,
        ];

        let mut seen = HashSet::new();
        for code in all {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        let code = ErrorCode::StructuralViolation.code();
        assert_eq!(code.len(), 5);
        assert!(code.starts_with('E'));
        assert!(code[1..].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn structural_violation_maps_to_its_code() {
        let err = LinkError::StructuralViolation {
            lower: "1.1.1.1".to_string(),
            higher: "1.1.1.2".to_string(),
        };
        assert_eq!(err.error_code(), ErrorCode::StructuralViolation);
        assert!(err.to_string().contains("1.1.1.1 <-> 1.1.1.2"));
        assert!(err.suggestion().contains("bug"));
    }
}
