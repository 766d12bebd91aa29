use actix_web::{get, HttpResponse};

/// Browser UI: microphone capture, file upload, mobile recording hints
#[get("/")]
pub async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(include_str!("../../static/index.html"))
}
