// THEORY:
// The `status` module is the shared vocabulary between the harness and the
// algorithm under test. It is a closed, compile-time-fixed set of codes, so it is
// modelled as plain enums rather than anything dynamic:
//
// - `ReturnCode` is the discriminant every operation reports.
// - `ReturnStatus` pairs a code with an optional diagnostic string. It is the
//   "decode status" handed back for each test case and never defaults to success.
// - `ImageLabel` and `Action` describe what kind of input a test case exercises.

use std::fmt;

use crate::error::Error;

/// Result discriminant for harness and algorithm operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnCode {
    /// Success
    Success,
    /// Error reading configuration files
    ConfigError,
    /// Elective refusal to process the input
    RefuseInput,
    /// Involuntary failure to process the image
    ExtractError,
    /// Cannot parse the input data
    ParseError,
    /// Error occurred during the 1:1 match operation
    MatchError,
    /// Unable to detect a face in the image
    FaceDetectionError,
    /// Function is not implemented
    NotImplemented,
    /// Vendor-defined failure
    VendorError,
}

impl ReturnCode {
    /// Short identifier, suitable for log lines and result files.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReturnCode::Success => "Success",
            ReturnCode::ConfigError => "ConfigError",
            ReturnCode::RefuseInput => "RefuseInput",
            ReturnCode::ExtractError => "ExtractError",
            ReturnCode::ParseError => "ParseError",
            ReturnCode::MatchError => "MatchError",
            ReturnCode::FaceDetectionError => "FaceDetectionError",
            ReturnCode::NotImplemented => "NotImplemented",
            ReturnCode::VendorError => "VendorError",
        }
    }

    /// Numeric value as written to result files.
    pub fn as_i32(&self) -> i32 {
        *self as i32
    }
}

impl fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let description = match self {
            ReturnCode::Success => "Success",
            ReturnCode::ConfigError => "Error reading configuration files",
            ReturnCode::RefuseInput => "Elective refusal to process the input",
            ReturnCode::ExtractError => "Involuntary failure to process the image",
            ReturnCode::ParseError => "Cannot parse the input data",
            ReturnCode::MatchError => "Error occurred during the 1:1 match operation",
            ReturnCode::FaceDetectionError => "Unable to detect a face in the image",
            ReturnCode::NotImplemented => "Function is not implemented",
            ReturnCode::VendorError => "Vendor-defined error",
        };
        f.write_str(description)
    }
}

/// A return code plus an optional free-form diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnStatus {
    pub code: ReturnCode,
    pub info: Option<String>,
}

impl ReturnStatus {
    pub fn new(code: ReturnCode, info: impl Into<String>) -> Self {
        Self {
            code,
            info: Some(info.into()),
        }
    }

    pub fn success() -> Self {
        Self {
            code: ReturnCode::Success,
            info: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == ReturnCode::Success
    }
}

impl From<ReturnCode> for ReturnStatus {
    fn from(code: ReturnCode) -> Self {
        Self { code, info: None }
    }
}

impl From<&Error> for ReturnStatus {
    fn from(err: &Error) -> Self {
        let code = match err {
            Error::Configuration(_) => ReturnCode::ConfigError,
            // An unreadable input is, from the algorithm's point of view, an unparseable one.
            Error::Io { .. } | Error::Format { .. } | Error::InvalidImage(_) => {
                ReturnCode::ParseError
            }
            Error::Worker { .. } => ReturnCode::ExtractError,
        };
        ReturnStatus::new(code, err.to_string())
    }
}

impl fmt::Display for ReturnStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.info {
            Some(info) if !info.is_empty() => write!(f, "{}: {}", self.code.as_str(), info),
            _ => f.write_str(self.code.as_str()),
        }
    }
}

/// Labels describing the type of image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ImageLabel {
    /// Image type is unknown or unassigned
    #[default]
    Unknown = 0,
    /// Non-scanned image
    NonScanned = 1,
    /// Printed-and-scanned image
    Scanned = 2,
}

/// The detection task a test run exercises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    DetectNonScannedMorph,
    DetectScannedMorph,
    DetectUnknownMorph,
    DetectNonScannedMorphWithProbeImg,
    DetectScannedMorphWithProbeImg,
    DetectUnknownMorphWithProbeImg,
}

impl Action {
    /// The image label implied by this action.
    pub fn label(&self) -> ImageLabel {
        match self {
            Action::DetectNonScannedMorph | Action::DetectNonScannedMorphWithProbeImg => {
                ImageLabel::NonScanned
            }
            Action::DetectScannedMorph | Action::DetectScannedMorphWithProbeImg => ImageLabel::Scanned,
            Action::DetectUnknownMorph | Action::DetectUnknownMorphWithProbeImg => ImageLabel::Unknown,
        }
    }

    /// Whether the action compares against a live probe image.
    pub fn uses_probe_image(&self) -> bool {
        matches!(
            self,
            Action::DetectNonScannedMorphWithProbeImg
                | Action::DetectScannedMorphWithProbeImg
                | Action::DetectUnknownMorphWithProbeImg
        )
    }
}
