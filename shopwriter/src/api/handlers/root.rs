use crate::api::models::content::WelcomeResponse;
use axum::Json;

pub const WELCOME_MESSAGE: &str =
    "Welcome to the E-commerce Content Generator AI. Navigate to /docs for the API interface.";

#[utoipa::path(
    get,
    path = "/",
    tag = "root",
    summary = "Welcome message",
    responses(
        (status = 200, description = "Service is running", body = WelcomeResponse),
    )
)]
pub async fn read_root() -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: WELCOME_MESSAGE.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_app;

    #[tokio::test]
    async fn test_root_returns_welcome_message() {
        let server = create_test_app(None);

        let response = server.get("/").await;

        response.assert_status_ok();
        let body: WelcomeResponse = response.json();
        assert_eq!(body.message, WELCOME_MESSAGE);
    }

    #[tokio::test]
    async fn test_healthz() {
        let server = create_test_app(None);

        let response = server.get("/healthz").await;

        response.assert_status_ok();
        response.assert_text("OK");
    }
}
