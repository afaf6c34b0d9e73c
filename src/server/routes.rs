use axum::response::IntoResponse;
use axum::Json;

pub async fn index() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "running",
        "message": "Virtual Try-On Proxy Server with Gradio Client",
        "endpoint": "/api/virtual-tryon"
    }))
}

pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "model": "IDM-VTON",
        "backend": "Gradio Client"
    }))
}
