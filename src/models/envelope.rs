use serde::{Serialize, Serializer};

/// Uniform result of every gateway operation
///
/// Serializes as `{"success": true, ...payload fields}` or
/// `{"success": false, "error": "..."}`. The payload type must serialize as a
/// JSON object so its fields can sit next to `success`.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope<T> {
    Success(T),
    Failure { error: String },
}

impl<T> Envelope<T> {
    pub fn failure(error: impl Into<String>) -> Self {
        Envelope::Failure {
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Envelope::Success(_))
    }

    pub fn payload(&self) -> Option<&T> {
        match self {
            Envelope::Success(payload) => Some(payload),
            Envelope::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Envelope::Success(_) => None,
            Envelope::Failure { error } => Some(error),
        }
    }

    pub fn into_result(self) -> Result<T, String> {
        match self {
            Envelope::Success(payload) => Ok(payload),
            Envelope::Failure { error } => Err(error),
        }
    }
}

impl<T> From<crate::error::Result<T>> for Envelope<T> {
    fn from(result: crate::error::Result<T>) -> Self {
        match result {
            Ok(payload) => Envelope::Success(payload),
            Err(e) => Envelope::failure(e.to_string()),
        }
    }
}

#[derive(Serialize)]
struct SuccessRepr<'a, T> {
    success: bool,
    #[serde(flatten)]
    payload: &'a T,
}

#[derive(Serialize)]
struct FailureRepr<'a> {
    success: bool,
    error: &'a str,
}

impl<T: Serialize> Serialize for Envelope<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Envelope::Success(payload) => SuccessRepr {
                success: true,
                payload,
            }
            .serialize(serializer),
            Envelope::Failure { error } => FailureRepr {
                success: false,
                error,
            }
            .serialize(serializer),
        }
    }
}
