use std::sync::Arc;
use std::time::Duration;

use actix_web::web;
use image::RgbImage;
use log::{debug, error, warn};
use shared::{ImageDetections, Phase, ReconciliationReport};
use uuid::Uuid;

use super::reconcile::DamageReconciler;
use super::store::{RecordOutcome, SessionStore};
use crate::detection::DetectionPipeline;
use crate::error::{InspectionError, Result};
use crate::inference::preprocess::{decode_image, image_shape};
use crate::inference::{Inference, InferenceError};

/// Unparseable ids can never name a live session.
pub fn parse_session_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| InspectionError::not_found(raw))
}

/// Entry point for callers: start, submit photos, switch phase, finish.
#[derive(Clone)]
pub struct InspectionService {
    store: Arc<SessionStore>,
    inference: Arc<dyn Inference>,
    pipeline: Arc<DetectionPipeline>,
    reconciler: Arc<DamageReconciler>,
    inference_timeout: Duration,
}

impl InspectionService {
    pub fn new(
        store: Arc<SessionStore>,
        inference: Arc<dyn Inference>,
        pipeline: DetectionPipeline,
        reconciler: DamageReconciler,
    ) -> Self {
        Self {
            store,
            inference,
            pipeline: Arc::new(pipeline),
            reconciler: Arc::new(reconciler),
            inference_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_inference_timeout(mut self, timeout: Duration) -> Self {
        self.inference_timeout = timeout;
        self
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn start_inspection(&self) -> Uuid {
        self.store.start()
    }

    /// Decodes the photo, runs the model off the async executor and records
    /// the priced detections into the session's current phase.
    pub async fn submit_image(&self, session_id: &str, image_bytes: Vec<u8>) -> Result<RecordOutcome> {
        let id = parse_session_id(session_id)?;
        if !self.store.contains(&id) {
            warn!("Detection requested for unknown session {}", session_id);
            return Err(InspectionError::not_found(session_id));
        }

        let service = self.clone();
        let work = web::block(move || -> Result<ImageDetections> {
            let image = decode_image(&image_bytes)?;
            service.detect(&image)
        });
        let detections = match tokio::time::timeout(self.inference_timeout, work).await {
            Ok(Ok(result)) => result?,
            Ok(Err(e)) => {
                error!("Inference worker failed: {}", e);
                return Err(InferenceError::Runtime(e.to_string()).into());
            }
            Err(_) => {
                error!("Inference timed out after {:?}", self.inference_timeout);
                return Err(InferenceError::Timeout(self.inference_timeout).into());
            }
        };

        self.store.record_detection(&id, detections)
    }

    /// Runs the model and post-processing on one decoded image.
    pub fn detect(&self, image: &RgbImage) -> Result<ImageDetections> {
        let tensor = self.inference.predict(image).map_err(|e| {
            error!("Inference with {} failed: {}", self.inference.name(), e);
            e
        })?;
        let detections =
            self.pipeline
                .run(tensor.view(), image_shape(image), self.inference.input_shape());
        debug!("{} detections after suppression", detections.len());
        Ok(self.reconciler.costs().price(&detections))
    }

    pub fn advance_phase(&self, session_id: &str) -> Result<Phase> {
        let id = parse_session_id(session_id)?;
        self.store.switch_to_return(&id)
    }

    pub fn finish_inspection(&self, session_id: &str) -> Result<ReconciliationReport> {
        let id = parse_session_id(session_id)?;
        self.store.complete(&id, &self.reconciler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{DetectionParams, Shape};
    use crate::inference::PredictionTensor;
    use crate::inspection::cost::CostTable;
    use image::{ImageFormat, Rgb};
    use ndarray::Array3;
    use shared::BoundingBox;
    use std::io::Cursor;

    struct FixedInference {
        rows: Vec<[f32; 6]>,
    }

    impl Inference for FixedInference {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn input_shape(&self) -> Shape {
            Shape::new(640, 640)
        }

        fn predict(&self, _image: &RgbImage) -> std::result::Result<PredictionTensor, InferenceError> {
            let flat = self.rows.iter().flatten().copied().collect();
            Ok(Array3::from_shape_vec((1, self.rows.len(), 6), flat).unwrap())
        }
    }

    struct BrokenInference;

    impl Inference for BrokenInference {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn input_shape(&self) -> Shape {
            Shape::new(640, 640)
        }

        fn predict(&self, _image: &RgbImage) -> std::result::Result<PredictionTensor, InferenceError> {
            Err(InferenceError::Runtime("device lost".to_string()))
        }
    }

    fn service(inference: Arc<dyn Inference>) -> InspectionService {
        let labels = vec!["dent".to_string(), "damaged door".to_string()];
        InspectionService::new(
            Arc::new(SessionStore::new()),
            inference,
            DetectionPipeline::new(DetectionParams::default(), labels),
            DamageReconciler::new(CostTable::default()),
        )
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let image = RgbImage::from_pixel(width, height, Rgb([0, 0, 255]));
        let mut buf = Cursor::new(Vec::new());
        image.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn parses_only_uuid_session_ids() {
        assert!(parse_session_id("invalid-session-id").unwrap_err().is_not_found());
        let id = Uuid::new_v4();
        assert_eq!(parse_session_id(&id.to_string()).unwrap(), id);
    }

    #[test]
    fn detect_scales_boxes_to_original_image() {
        let service = service(Arc::new(FixedInference {
            rows: vec![[320.0, 320.0, 100.0, 50.0, 0.9, 0.0]],
        }));
        let image = RgbImage::new(1280, 320);
        let detections = service.detect(&image).unwrap();
        assert_eq!(detections.boxes, vec![BoundingBox::new(540, 147, 200, 25)]);
        assert_eq!(detections.classes, vec!["dent"]);
        assert_eq!(detections.repair_costs[0].max, 600);
    }

    #[actix_web::test]
    async fn full_inspection_reports_new_damage() {
        let service = service(Arc::new(FixedInference {
            rows: vec![
                [100.0, 100.0, 20.0, 20.0, 0.8, 0.1],
                [400.0, 400.0, 20.0, 20.0, 0.05, 0.7],
            ],
        }));
        let id = service.start_inspection().to_string();

        let pickup = service.submit_image(&id, png(640, 640)).await.unwrap();
        assert_eq!(pickup.phase, Phase::Pickup);
        assert_eq!(pickup.detections.len(), 2);

        assert_eq!(service.advance_phase(&id).unwrap(), Phase::Return);
        service.submit_image(&id, png(640, 640)).await.unwrap();
        let second = service.submit_image(&id, png(640, 640)).await.unwrap();
        assert_eq!(second.detections_count, 2);

        let report = service.finish_inspection(&id).unwrap();
        let new = &report.new_damages_detected;
        assert_eq!(new.total_new_damages, 2);
        assert_eq!(new.estimated_repair_cost.min, 150 + 300);
        assert_eq!(new.estimated_repair_cost.max, 600 + 1500);
        assert!(service.finish_inspection(&id).unwrap_err().is_not_found());
    }

    #[actix_web::test]
    async fn undecodable_upload_is_a_decode_failure() {
        let service = service(Arc::new(FixedInference { rows: Vec::new() }));
        let id = service.start_inspection().to_string();
        let err = service.submit_image(&id, b"garbage".to_vec()).await.unwrap_err();
        assert!(matches!(err, InspectionError::DecodeFailure(_)));
        assert_eq!(service.store().phase(&parse_session_id(&id).unwrap()).unwrap(), Phase::Pickup);
    }

    #[actix_web::test]
    async fn inference_failure_propagates_unchanged() {
        let service = service(Arc::new(BrokenInference));
        let id = service.start_inspection().to_string();
        let err = service.submit_image(&id, png(8, 8)).await.unwrap_err();
        assert!(matches!(
            err,
            InspectionError::InferenceUnavailable(InferenceError::Runtime(_))
        ));
    }

    #[actix_web::test]
    async fn unknown_session_is_checked_before_inference() {
        let service = service(Arc::new(BrokenInference));
        let err = service
            .submit_image(&Uuid::new_v4().to_string(), png(8, 8))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
