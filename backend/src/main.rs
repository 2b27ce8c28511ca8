use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use damage_inspection::config::AppConfig;
use damage_inspection::detection::DetectionPipeline;
use damage_inspection::inference::{Inference, TractInference};
use damage_inspection::inspection::{DamageReconciler, InspectionService, SessionStore};
use damage_inspection::routes::configure_routes;

fn other_error(message: String) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, message)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(|e| {
        log::error!("Invalid configuration: {}", e);
        other_error(e.to_string())
    })?;

    let inference = TractInference::load(&config.model_path, config.detection.input_shape())
        .map_err(|e| {
            log::error!(
                "Failed to load model {} at startup: {}",
                config.model_path.display(),
                e
            );
            other_error(format!("Model loading failed: {}", e))
        })?;
    log::info!(
        "Loaded {} model from {}",
        inference.name(),
        config.model_path.display()
    );

    let store = Arc::new(SessionStore::new());
    let pipeline = DetectionPipeline::new(
        config.detection.detection.clone(),
        config.detection.class_labels.clone(),
    );
    let reconciler = DamageReconciler::new(config.detection.cost_table());
    let service = InspectionService::new(store.clone(), Arc::new(inference), pipeline, reconciler)
        .with_inference_timeout(config.inference_timeout);

    if let Some(max_idle) = config.session_idle_timeout {
        let sweep_every = config.session_sweep_interval;
        log::info!(
            "Idle sessions expire after {:?}, checked every {:?}",
            max_idle,
            sweep_every
        );
        actix_web::rt::spawn(async move {
            let mut ticker = tokio::time::interval(sweep_every);
            loop {
                ticker.tick().await;
                let evicted = store.evict_idle(max_idle);
                if evicted > 0 {
                    log::info!("Evicted {} idle inspection sessions", evicted);
                }
            }
        });
    }

    let bind_address = config.bind_address();
    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .app_data(web::Data::new(service.clone()))
            .configure(configure_routes)
    })
    .bind(&bind_address)?
    .run()
    .await
}
