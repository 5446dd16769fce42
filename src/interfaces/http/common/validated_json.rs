//! Validated JSON extractor for Axum
//!
//! `ValidatedJson<T>` works like `axum::Json<T>`, but additionally runs
//! `validator::Validate::validate()` on the deserialized value.
//! On validation failure it returns a 400 response whose body maps each
//! failing field to its list of error messages. An absent required field
//! is reported the same way, as `{"<field>": ["This field is required."]}`.

use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequest;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde_json::json;
use validator::Validate;

use super::FieldErrors;

/// An extractor that deserializes JSON and validates it.
///
/// # Usage
///
/// ```ignore
/// use validator::Validate;
///
/// #[derive(Deserialize, Validate)]
/// struct CreateAccount {
///     #[validate(length(min = 1, max = 150))]
///     username: String,
///     #[validate(email)]
///     email: String,
/// }
///
/// async fn handler(ValidatedJson(body): ValidatedJson<CreateAccount>) {
///     // `body` is guaranteed to pass validation
/// }
/// ```
pub struct ValidatedJson<T>(pub T);

/// Error type for `ValidatedJson` extraction failures.
pub enum ValidatedJsonRejection {
    /// JSON parsing failed.
    JsonError(JsonRejection),
    /// The body parsed as JSON but does not match the target type.
    SchemaError(serde_json::Error),
    /// Validation failed.
    ValidationError(validator::ValidationErrors),
}

/// serde reports an absent key as "missing field `<name>`".
fn missing_field_name(msg: &str) -> Option<&str> {
    let rest = msg.strip_prefix("missing field `")?;
    rest.split('`').next()
}

impl IntoResponse for ValidatedJsonRejection {
    fn into_response(self) -> Response {
        match self {
            Self::JsonError(rejection) => {
                let body = json!({
                    "success": false,
                    "error": format!("Invalid JSON: {}", rejection)
                });
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
            Self::SchemaError(e) => {
                let msg = e.to_string();
                if let Some(field) = missing_field_name(&msg) {
                    let mut fields = FieldErrors::new();
                    fields.push(field, "This field is required.");
                    fields.into_response()
                } else {
                    let body = json!({
                        "success": false,
                        "error": format!("Invalid JSON: {}", msg)
                    });
                    (StatusCode::BAD_REQUEST, Json(body)).into_response()
                }
            }
            Self::ValidationError(errors) => {
                let mut fields = FieldErrors::new();
                for (field, errs) in errors.field_errors().iter() {
                    for e in errs.iter() {
                        let msg = e
                            .message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| format!("{:?}", e.code));
                        fields.push(field.to_string(), msg);
                    }
                }
                fields.into_response()
            }
        }
    }
}

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ValidatedJsonRejection;

    async fn from_request(
        req: axum::extract::Request,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        // Deserialize in two steps so an absent field surfaces as a
        // per-field error instead of a blanket parse failure.
        let Json(value) = Json::<serde_json::Value>::from_request(req, state)
            .await
            .map_err(ValidatedJsonRejection::JsonError)?;

        let value: T =
            serde_json::from_value(value).map_err(ValidatedJsonRejection::SchemaError)?;

        value
            .validate()
            .map_err(ValidatedJsonRejection::ValidationError)?;

        Ok(ValidatedJson(value))
    }
}

// ── Tests ──────────────────────────────────────────────────────
