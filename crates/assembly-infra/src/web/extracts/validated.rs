use crate::web::{problems, Problem, ProblemConfig, ProblemResponse};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        FromRequest, FromRequestParts, Path, Request,
    },
    http::request::Parts,
    Extension, Json, RequestExt, RequestPartsExt,
};
use serde::de::DeserializeOwned;
use thiserror::Error as ThisError;
use validator::{Validate, ValidationErrors};

#[derive(Debug, ThisError)]
pub enum InputError {
    #[error("Path could not be parsed for input")]
    PathFormat(PathRejection),
    #[error("Body could not be parsed for input")]
    JsonFormat(JsonRejection),
    #[error("Input constraint violated")]
    Constraint(ValidationErrors),
}

impl From<InputError> for Problem {
    fn from(value: InputError) -> Self {
        match value {
            InputError::PathFormat(err) => Problem::bad_request(problems::INPUT_PATH).with_detail(err.body_text()),
            InputError::JsonFormat(err) => Problem::bad_request(problems::INPUT_BODY).with_detail(err.body_text()),
            InputError::Constraint(detail) => Problem::bad_request(problems::INPUT_VALIDATION)
                .with_detail("Input constraint violated")
                .with_extension(detail),
        }
    }
}

async fn problem_config(parts: &mut Parts) -> ProblemConfig {
    match parts.extract::<Extension<ProblemConfig>>().await {
        Ok(Extension(config)) => config,
        Err(_) => {
            log::warn!("Missing ProblemConfig extension, sensitive details are hidden");
            ProblemConfig::new(false)
        }
    }
}

/// Path parameters checked by the [`Validate`] rules of the target.
pub struct ValidatedPath<T>(pub T)
where
    T: DeserializeOwned + Validate + 'static;

impl<S, T> FromRequestParts<S> for ValidatedPath<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send + Validate,
{
    type Rejection = ProblemResponse;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let problem_config = problem_config(parts).await;

        let Path(data) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|err| ProblemResponse::new(&problem_config, InputError::PathFormat(err)))?;
        data.validate()
            .map_err(|err| ProblemResponse::new(&problem_config, InputError::Constraint(err)))?;
        Ok(Self(data))
    }
}

/// Json body checked by the [`Validate`] rules of the target.
pub struct ValidatedJson<J>(pub J)
where
    J: Validate + 'static;

impl<S, J> FromRequest<S> for ValidatedJson<J>
where
    S: Send + Sync,
    J: Validate + 'static,
    Json<J>: FromRequest<(), Rejection = JsonRejection>,
{
    type Rejection = ProblemResponse;

    async fn from_request(req: Request, _state: &S) -> Result<Self, Self::Rejection> {
        let (mut parts, body) = req.into_parts();
        let problem_config = problem_config(&mut parts).await;
        let req = Request::from_parts(parts, body);

        let Json(data) = req
            .extract::<Json<J>, _>()
            .await
            .map_err(|err| ProblemResponse::new(&problem_config, InputError::JsonFormat(err)))?;
        data.validate()
            .map_err(|err| ProblemResponse::new(&problem_config, InputError::Constraint(err)))?;
        Ok(Self(data))
    }
}
