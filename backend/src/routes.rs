use std::collections::BTreeMap;
use std::io::Write;

use actix_multipart::Multipart;
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use futures::{StreamExt, TryStreamExt};
use log::{error, info, warn};
use shared::{
    ApiInfo, DetectionResponse, ErrorResponse, StartInspectionResponse, SwitchPhaseResponse,
};

use crate::error::InspectionError;
use crate::inference::InferenceError;
use crate::inspection::{InspectionService, parse_session_id};

impl ResponseError for InspectionError {
    fn status_code(&self) -> StatusCode {
        match self {
            InspectionError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            InspectionError::DecodeFailure(_) => StatusCode::BAD_REQUEST,
            InspectionError::InferenceUnavailable(InferenceError::Timeout(_)) => {
                StatusCode::GATEWAY_TIMEOUT
            }
            InspectionError::InferenceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let error = match self {
            InspectionError::SessionNotFound(_) => "Session not found".to_string(),
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(ErrorResponse { error })
    }
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api").route(web::get().to(api_info)))
        .service(web::resource("/api/inspection/start").route(web::post().to(start_inspection)))
        .service(
            web::resource("/api/inspection/{session_id}/detect")
                .route(web::post().to(detect)),
        )
        .service(
            web::resource("/api/inspection/{session_id}/switch-to-return")
                .route(web::post().to(switch_to_return)),
        )
        .service(
            web::resource("/api/inspection/{session_id}/complete")
                .route(web::post().to(complete_inspection)),
        );
}

async fn api_info() -> HttpResponse {
    let endpoints: BTreeMap<String, String> = [
        ("/api/inspection/start", "POST - Start a new inspection in pickup phase"),
        (
            "/api/inspection/{session_id}/detect",
            "POST - Upload an image for damage detection in the current phase",
        ),
        (
            "/api/inspection/{session_id}/switch-to-return",
            "POST - Switch the inspection to return phase",
        ),
        (
            "/api/inspection/{session_id}/complete",
            "POST - Compare pickup and return and report new damages",
        ),
    ]
    .into_iter()
    .map(|(path, desc)| (path.to_string(), desc.to_string()))
    .collect();

    HttpResponse::Ok().json(ApiInfo {
        message: "Car Damage Detection API".into(),
        version: "2.0".into(),
        endpoints,
    })
}

async fn start_inspection(service: web::Data<InspectionService>) -> HttpResponse {
    let session_id = service.start_inspection();
    HttpResponse::Ok().json(StartInspectionResponse {
        session_id,
        message: "Inspection started - in pickup phase".into(),
    })
}

async fn detect(
    service: web::Data<InspectionService>,
    path: web::Path<String>,
    mut payload: Multipart,
) -> Result<HttpResponse, actix_web::Error> {
    let session_id = path.into_inner();

    let mut image_data = Vec::new();
    while let Ok(Some(mut field)) = payload.try_next().await {
        if field.name() != Some("file") {
            continue;
        }
        while let Some(chunk) = field.next().await {
            let data = chunk?;
            image_data.write_all(&data)?;
        }
        if !image_data.is_empty() {
            break;
        }
    }

    if image_data.is_empty() {
        warn!("Detect call for session {} carried no file", session_id);
        return Ok(HttpResponse::BadRequest().json(ErrorResponse {
            error: "Missing image file".into(),
        }));
    }

    let outcome = service
        .submit_image(&session_id, image_data)
        .await
        .map_err(|e| {
            if !e.is_not_found() {
                error!("Detection failed for session {}: {}", session_id, e);
            }
            e
        })?;

    info!(
        "Session {} recorded {} detections in {} phase",
        outcome.session_id,
        outcome.detections.len(),
        outcome.phase
    );
    Ok(HttpResponse::Ok().json(DetectionResponse {
        session_id: outcome.session_id,
        phase: outcome.phase,
        detections_count: outcome.detections_count,
        current_detection: outcome.detections,
    }))
}

async fn switch_to_return(
    service: web::Data<InspectionService>,
    path: web::Path<String>,
) -> Result<HttpResponse, InspectionError> {
    let raw_id = path.into_inner();
    let session_id = parse_session_id(&raw_id)?;
    let phase = service.advance_phase(&raw_id)?;
    Ok(HttpResponse::Ok().json(SwitchPhaseResponse {
        session_id,
        phase,
        message: "Switched to return phase".into(),
    }))
}

async fn complete_inspection(
    service: web::Data<InspectionService>,
    path: web::Path<String>,
) -> Result<HttpResponse, InspectionError> {
    let report = service.finish_inspection(&path.into_inner())?;
    Ok(HttpResponse::Ok().json(report))
}
