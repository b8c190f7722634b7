use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Serialize, Serializer};
use serde_json::Value as JsonValue;
use std::fmt;

pub mod problems {
    pub const INPUT_PATH: &str = "input-path-format";
    pub const INPUT_BODY: &str = "input-body-format";
    pub const INPUT_VALIDATION: &str = "input-validation";
    pub const NOT_FOUND: &str = "not-found";
}

fn serialize_status<S>(value: &StatusCode, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_u16(value.as_u16())
}

/// Problem Details response for HTTP APIs as of [RFC-7807](https://datatracker.ietf.org/doc/html/rfc7807).
#[derive(Debug, Serialize)]
pub struct Problem {
    #[serde(rename = "status", serialize_with = "serialize_status")]
    pub status: StatusCode,
    #[serde(rename = "type")]
    pub ty: &'static str,
    #[serde(rename = "detail")]
    pub detail: String,

    #[serde(rename = "extension")]
    pub extension: JsonValue,
    // returned only if the service configuration allows it
    #[serde(rename = "sensitive")]
    pub sensitive: JsonValue,
}

impl Problem {
    pub fn new(status: StatusCode, ty: &'static str) -> Self {
        Problem {
            status,
            ty,
            detail: String::new(),
            extension: JsonValue::Null,
            sensitive: JsonValue::Null,
        }
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, problems::NOT_FOUND)
    }

    pub fn bad_request(ty: &'static str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ty)
    }

    pub fn conflict(ty: &'static str) -> Self {
        Self::new(StatusCode::CONFLICT, ty)
    }

    pub fn precondition_failed(ty: &'static str) -> Self {
        Self::new(StatusCode::PRECONDITION_FAILED, ty)
    }

    pub fn with_detail<S: ToString>(self, detail: S) -> Self {
        Self {
            detail: detail.to_string(),
            ..self
        }
    }

    pub fn with_extension<S: Serialize>(self, extension: S) -> Self {
        Self {
            extension: serde_json::to_value(extension).unwrap_or(JsonValue::Null),
            ..self
        }
    }

    pub fn with_sensitive<S: Serialize>(self, sensitive: S) -> Self {
        Self {
            sensitive: serde_json::to_value(sensitive).unwrap_or(JsonValue::Null),
            ..self
        }
    }

    pub fn with_sensitive_dbg<S: fmt::Debug>(self, sensitive: S) -> Self {
        self.with_sensitive(format!("{:#?}", sensitive))
    }
}

#[derive(Clone)]
pub struct ProblemConfig {
    include_internal: bool,
}

impl ProblemConfig {
    pub fn new(include_internal: bool) -> Self {
        Self { include_internal }
    }

    pub fn into_layer(self) -> Extension<Self> {
        Extension(self)
    }

    pub fn transform<P>(&self, problem: P) -> Problem
    where
        P: Into<Problem>,
    {
        let problem = problem.into();
        if self.include_internal {
            problem
        } else {
            Problem {
                sensitive: JsonValue::Null,
                ..problem
            }
        }
    }
}

pub trait IntoProblemResponse {
    fn into_response(self, config: &ProblemConfig) -> ProblemResponse;
}

impl<T> IntoProblemResponse for T
where
    T: Into<Problem>,
{
    fn into_response(self, config: &ProblemConfig) -> ProblemResponse {
        ProblemResponse::new(config, self)
    }
}

pub struct ProblemResponse {
    pub config: ProblemConfig,
    pub problem: Problem,
}

impl ProblemResponse {
    pub fn new<P>(config: &ProblemConfig, problem: P) -> Self
    where
        P: Into<Problem>,
    {
        Self {
            config: config.clone(),
            problem: problem.into(),
        }
    }
}

impl IntoResponse for ProblemResponse {
    fn into_response(self) -> Response {
        let ProblemResponse { problem, config } = self;
        log::info!("problem response: {:#?}", problem);
        let problem = config.transform(problem);
        (problem.status, Json(problem)).into_response()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assembly_test::test;

    #[test]
    fn sensitive_data_is_hidden_by_default() {
        let problem = || Problem::conflict("invalid-state").with_detail("boom").with_sensitive("secret");

        let hidden = ProblemConfig::new(false).transform(problem());
        assert_eq!(hidden.sensitive, JsonValue::Null);
        assert_eq!(hidden.detail, "boom");

        let full = ProblemConfig::new(true).transform(problem());
        assert_eq!(full.sensitive, JsonValue::String("secret".into()));

        let json = serde_json::to_value(&hidden).unwrap();
        assert_eq!(json["status"], 409);
        assert_eq!(json["type"], "invalid-state");
        assert!(json.get("instance").is_none());
    }
}
