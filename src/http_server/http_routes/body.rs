use axum::{
    Json,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::http_server::error::ApiError;
use crate::services::error::{FieldErrors, NON_FIELD_ERRORS};
use crate::services::validation::not_a_dict;

/// A JSON object body read into one of the service `*Fields` types.
///
/// Field values stay raw so type errors surface as field errors from the
/// service validator. A body that is not an object is rejected here.
#[derive(Debug)]
pub struct WriteBody<T>(pub T);

impl<S, T> FromRequest<S> for WriteBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<Value>::from_request(req, state).await?;

        let result = match value {
            Value::Object(map) => {
                serde_json::from_value(Value::Object(map)).map_err(|err| err.to_string())
            }
            other => Err(not_a_dict(&other)),
        };

        result.map(WriteBody).map_err(|message| {
            let mut errors = FieldErrors::new();
            errors.add(NON_FIELD_ERRORS, message);
            ApiError::Params(errors)
        })
    }
}
