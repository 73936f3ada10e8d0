use crate::{
    errors::{FieldErrors, ServiceError},
    ApiResponse,
};
use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    Json,
};
use serde::{de::DeserializeOwned, Serialize};

/// 200 with a message and payload
pub fn ok<T: Serialize>(message: &str, data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse::success(data).with_message(message))
}

/// 201 with the created record
pub fn created<T: Serialize>(message: &str, data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (
        StatusCode::CREATED,
        Json(ApiResponse::success(data).with_message(message)),
    )
}

/// 200 with only a message, used by deletions
pub fn deleted(message: &str) -> Json<ApiResponse<()>> {
    Json(ApiResponse::message(message))
}

/// JSON body extractor whose rejections use the validation error body.
///
/// Syntax and type errors become 422 on field `body`; a missing
/// `Content-Type: application/json` is a plain 400.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ValidJson(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> ServiceError {
    match rejection {
        JsonRejection::MissingJsonContentType(_) => {
            ServiceError::BadRequest("Expected request with `Content-Type: application/json`".into())
        }
        JsonRejection::JsonDataError(e) => {
            ServiceError::Validation(FieldErrors::single("body", e.body_text()))
        }
        JsonRejection::JsonSyntaxError(e) => {
            ServiceError::Validation(FieldErrors::single("body", e.body_text()))
        }
        other => ServiceError::BadRequest(other.body_text()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Payload {
        #[allow(dead_code)]
        name: String,
    }

    fn json_request(body: &str) -> Request {
        Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn type_errors_become_field_errors_on_body() {
        let err = ValidJson::<Payload>::from_request(json_request(r#"{"name": 5}"#), &())
            .await
            .unwrap_err();
        match err {
            ServiceError::Validation(fields) => assert!(fields.contains("body")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn syntax_errors_are_unprocessable() {
        let err = ValidJson::<Payload>::from_request(json_request("{not json"), &())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn missing_content_type_is_bad_request() {
        let req = Request::builder()
            .method("POST")
            .body(Body::from(r#"{"name":"x"}"#))
            .unwrap();
        let err = ValidJson::<Payload>::from_request(req, &()).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
