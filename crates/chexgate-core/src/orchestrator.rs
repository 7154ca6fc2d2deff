//! Batch orchestration for classification and report generation.
//!
//! Every batch fans out one tokio task per item, bounded by a semaphore, and
//! awaits the task handles in input order. The settled per-item results are
//! then reduced by [`settle_all`], which applies the all-or-nothing policy:
//! the first failure in input order fails the whole batch.
//!
//! Siblings of a failed item are not cancelled. Each runs to completion or
//! to its own timeout before the batch is reduced.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::classifier::{Classifier, ClassifierInput};
use crate::config::Config;
use crate::credentials::CredentialProvider;
use crate::error::{GatewayError, Result, Stage};
use crate::llm::prompts::{condition_details_prompt, summary_prompt};
use crate::llm::{ChatBackend, ChatRequest};
use crate::pipeline::decode::format_to_string;
use crate::pipeline::{ImageDecoder, ImageSource};
use crate::types::{
    check_class_order, ChatAnswer, ClassificationResult, ConditionDetail, ConversationTurn,
    MedicalReport,
};

/// Knobs for the fan-out.
#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    /// Maximum concurrent per-item upstream calls
    pub max_parallel: usize,
    /// Upper bound on one image fetch
    pub fetch_timeout: Duration,
    /// Maximum image URLs per predict request
    pub max_images: usize,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            max_parallel: 8,
            fetch_timeout: Duration::from_secs(10),
            max_images: 32,
        }
    }
}

impl OrchestratorOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_parallel: config.orchestrator.max_parallel,
            fetch_timeout: Duration::from_millis(config.fetch.timeout_ms),
            max_images: config.limits.max_images_per_request,
        }
    }
}

/// Coordinates the image fetcher, classifier and chat backend per request.
pub struct Orchestrator {
    fetcher: Arc<dyn ImageSource>,
    decoder: Arc<ImageDecoder>,
    classifier: Arc<dyn Classifier>,
    chat: Arc<dyn ChatBackend>,
    credentials: Option<Arc<CredentialProvider>>,
    options: OrchestratorOptions,
}

impl Orchestrator {
    pub fn new(
        fetcher: Arc<dyn ImageSource>,
        decoder: ImageDecoder,
        classifier: Arc<dyn Classifier>,
        chat: Arc<dyn ChatBackend>,
        options: OrchestratorOptions,
    ) -> Self {
        Self {
            fetcher,
            decoder: Arc::new(decoder),
            classifier,
            chat,
            credentials: None,
            options,
        }
    }

    /// Refresh this credential holder at every chat entry point.
    pub fn with_credentials(mut self, credentials: Arc<CredentialProvider>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn options(&self) -> &OrchestratorOptions {
        &self.options
    }

    /// Classify every image URL, returning results in input order.
    ///
    /// An empty list returns immediately without any remote call.
    pub async fn batch_classify(&self, image_urls: &[String]) -> Result<Vec<ClassificationResult>> {
        if image_urls.is_empty() {
            return Ok(Vec::new());
        }
        if image_urls.len() > self.options.max_images {
            return Err(GatewayError::Validation(format!(
                "At most {} image URLs are accepted per request",
                self.options.max_images
            )));
        }

        let start = Instant::now();
        tracing::info!(images = image_urls.len(), "Starting batch classification");

        let semaphore = Arc::new(Semaphore::new(self.options.max_parallel));
        let mut handles = Vec::with_capacity(image_urls.len());

        for url in image_urls {
            let semaphore = semaphore.clone();
            let fetcher = self.fetcher.clone();
            let decoder = self.decoder.clone();
            let classifier = self.classifier.clone();
            let fetch_timeout = self.options.fetch_timeout;
            let url = url.clone();

            handles.push(tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| GatewayError::Internal("concurrency limiter closed".into()))?;
                classify_single(&fetcher, &decoder, &classifier, fetch_timeout, &url).await
            }));
        }

        let settled = join_in_order(handles).await;
        let results = settle_all(settled)?;

        tracing::info!(
            images = results.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Batch classification complete"
        );
        Ok(results)
    }

    /// Answer the latest user turn of a conversation.
    pub async fn chat(&self, turns: Vec<ConversationTurn>) -> Result<ChatAnswer> {
        if turns.is_empty() {
            return Err(GatewayError::Validation(
                "Conversation history is required".into(),
            ));
        }
        self.refresh_credentials().await?;
        converse_bounded(&self.chat, &ChatRequest::conversation(turns)).await
    }

    /// Generate a report for the given conditions.
    ///
    /// The summary call resolves before any per-condition call is issued;
    /// the per-condition calls then run concurrently. Details come back in
    /// request order, one per requested condition, duplicates included.
    pub async fn generate_report(&self, conditions: &[String]) -> Result<MedicalReport> {
        if conditions.is_empty() {
            return Err(GatewayError::Validation("Conditions are required".into()));
        }

        let start = Instant::now();
        self.refresh_credentials().await?;

        let summary =
            converse_bounded(&self.chat, &ChatRequest::single("summary", summary_prompt(conditions)))
                .await?;
        tracing::debug!(
            conditions = conditions.len(),
            summary_secs = summary.elapsed_seconds,
            "Report summary ready, fetching condition details"
        );

        let semaphore = Arc::new(Semaphore::new(self.options.max_parallel));
        let mut handles = Vec::with_capacity(conditions.len());

        for condition in conditions {
            let semaphore = semaphore.clone();
            let chat = self.chat.clone();
            let request = ChatRequest::single(condition.clone(), condition_details_prompt(condition));

            handles.push(tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| GatewayError::Internal("concurrency limiter closed".into()))?;
                converse_bounded(&chat, &request).await
            }));
        }

        let answers = settle_all(join_in_order(handles).await)?;
        let report = conditions
            .iter()
            .zip(answers)
            .map(|(condition, answer)| ConditionDetail {
                condition: condition.clone(),
                details: answer.text,
            })
            .collect::<Vec<_>>();

        let total = start.elapsed();
        tracing::info!(
            conditions = report.len(),
            elapsed_ms = total.as_millis() as u64,
            "Medical report generated"
        );

        Ok(MedicalReport {
            status: "success".to_string(),
            summary: summary.text,
            report,
            timestamp: chrono::Utc::now().to_rfc3339(),
            total_elapsed_seconds: total.as_secs_f64(),
        })
    }

    /// Compare the classifier's reported label order with the canonical list.
    ///
    /// Backends that don't expose labels pass trivially.
    pub async fn verify_classifier_labels(&self) -> Result<()> {
        match self.classifier.labels().await? {
            Some(labels) => {
                check_class_order(&labels)?;
                tracing::info!(
                    classifier = self.classifier.name(),
                    "Classifier label order verified"
                );
                Ok(())
            }
            None => {
                tracing::warn!(
                    classifier = self.classifier.name(),
                    "Classifier does not report labels, class order not verified"
                );
                Ok(())
            }
        }
    }

    async fn refresh_credentials(&self) -> Result<()> {
        match &self.credentials {
            Some(credentials) => credentials.refresh().await,
            None => Ok(()),
        }
    }
}

/// Fetch, decode and classify one image.
///
/// Elapsed time covers the classify call only.
async fn classify_single(
    fetcher: &Arc<dyn ImageSource>,
    decoder: &ImageDecoder,
    classifier: &Arc<dyn Classifier>,
    fetch_timeout: Duration,
    url: &str,
) -> Result<ClassificationResult> {
    let bytes = match tokio::time::timeout(fetch_timeout, fetcher.fetch(url)).await {
        Ok(result) => result?,
        Err(_) => {
            return Err(GatewayError::Timeout {
                stage: Stage::Fetch,
                item: url.to_string(),
                timeout_ms: fetch_timeout.as_millis() as u64,
            })
        }
    };

    let image = decoder.prepare(bytes, url).await?;
    tracing::debug!(
        url,
        format = %format_to_string(image.source_format),
        width = image.width,
        height = image.height,
        "Image prepared"
    );
    let input = ClassifierInput {
        image_url: url.to_string(),
        image,
    };

    let start = Instant::now();
    let predictions = match tokio::time::timeout(classifier.timeout(), classifier.classify(&input)).await {
        Ok(result) => result?,
        Err(_) => {
            return Err(GatewayError::Timeout {
                stage: Stage::Classify,
                item: url.to_string(),
                timeout_ms: classifier.timeout().as_millis() as u64,
            })
        }
    };
    let elapsed_seconds = start.elapsed().as_secs_f64();

    tracing::debug!(url, elapsed_seconds, "Image classified");

    Ok(ClassificationResult {
        image_url: url.to_string(),
        predictions,
        elapsed_seconds,
    })
}

/// Call the chat backend under its own timeout.
async fn converse_bounded(chat: &Arc<dyn ChatBackend>, request: &ChatRequest) -> Result<ChatAnswer> {
    match tokio::time::timeout(chat.timeout(), chat.converse(request)).await {
        Ok(result) => result,
        Err(_) => Err(GatewayError::Timeout {
            stage: Stage::Chat,
            item: request.label.clone(),
            timeout_ms: chat.timeout().as_millis() as u64,
        }),
    }
}

/// Await spawned tasks in the order they were spawned.
///
/// The returned vector is indexed like the input, whatever order the tasks
/// finished in.
async fn join_in_order<T>(handles: Vec<JoinHandle<Result<T>>>) -> Vec<Result<T>> {
    let mut settled = Vec::with_capacity(handles.len());
    for handle in handles {
        settled.push(match handle.await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!("Fan-out task panicked: {e}");
                Err(GatewayError::Internal(format!("task failed: {e}")))
            }
        });
    }
    settled
}

/// All-or-nothing reduction of settled per-item results.
///
/// Returns every value in order if all items succeeded, otherwise the error
/// of the first failed item in input order.
pub fn settle_all<T>(settled: Vec<Result<T>>) -> Result<Vec<T>> {
    let failed = settled.iter().filter(|r| r.is_err()).count();
    if failed > 0 {
        tracing::warn!(
            failed,
            total = settled.len(),
            "Batch item(s) failed, failing the whole batch"
        );
    }
    settled.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LimitsConfig;
    use crate::error::Upstream;
    use crate::pipeline::decode::tests::encoded_image;
    use crate::types::ClassScore;
    use async_trait::async_trait;
    use image::ImageFormat;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Serves a tiny PNG for every URL, with optional per-URL delay and failure.
    #[derive(Default)]
    struct MockFetcher {
        delays: HashMap<String, Duration>,
        not_found: Vec<String>,
        corrupt: Vec<String>,
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl ImageSource for MockFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delays.get(url) {
                tokio::time::sleep(*delay).await;
            }
            if self.not_found.iter().any(|u| u == url) {
                return Err(GatewayError::ImageFetch {
                    url: url.to_string(),
                    status: Some(404),
                    message: "HTTP 404 Not Found".into(),
                });
            }
            if self.corrupt.iter().any(|u| u == url) {
                return Ok(b"notreallyanimage".to_vec());
            }
            Ok(encoded_image(4, 4, ImageFormat::Png))
        }
    }

    /// Returns a logit vector tagged by URL so results can be matched back.
    struct MockClassifier {
        delays: HashMap<String, Duration>,
        calls: Arc<AtomicU32>,
        in_flight: Arc<AtomicU32>,
        max_in_flight: Arc<AtomicU32>,
        timeout: Duration,
        labels: Option<Vec<String>>,
    }

    impl MockClassifier {
        fn new() -> Self {
            Self {
                delays: HashMap::new(),
                calls: Arc::new(AtomicU32::new(0)),
                in_flight: Arc::new(AtomicU32::new(0)),
                max_in_flight: Arc::new(AtomicU32::new(0)),
                timeout: Duration::from_secs(5),
                labels: None,
            }
        }
    }

    #[async_trait]
    impl Classifier for MockClassifier {
        fn name(&self) -> &str {
            "mock"
        }

        async fn classify(&self, input: &ClassifierInput) -> Result<Vec<ClassScore>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);
            if let Some(delay) = self.delays.get(&input.image_url) {
                tokio::time::sleep(*delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            crate::classifier::scores_from_logits(&[0.0; 14])
        }

        async fn labels(&self) -> Result<Option<Vec<String>>> {
            Ok(self.labels.clone())
        }

        fn timeout(&self) -> Duration {
            self.timeout
        }
    }

    /// Records `start:<label>` / `end:<label>` events in call order.
    struct MockChat {
        delays: HashMap<String, Duration>,
        failing: HashMap<String, u16>,
        events: Arc<Mutex<Vec<String>>>,
        calls: Arc<AtomicU32>,
        timeout: Duration,
    }

    impl MockChat {
        fn new() -> Self {
            Self {
                delays: HashMap::new(),
                failing: HashMap::new(),
                events: Arc::new(Mutex::new(Vec::new())),
                calls: Arc::new(AtomicU32::new(0)),
                timeout: Duration::from_secs(5),
            }
        }
    }

    #[async_trait]
    impl ChatBackend for MockChat {
        fn name(&self) -> &str {
            "mock"
        }

        async fn converse(&self, request: &ChatRequest) -> Result<ChatAnswer> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.events
                .lock()
                .unwrap()
                .push(format!("start:{}", request.label));
            if let Some(delay) = self.delays.get(&request.label) {
                tokio::time::sleep(*delay).await;
            }
            self.events
                .lock()
                .unwrap()
                .push(format!("end:{}", request.label));
            if let Some(status) = self.failing.get(&request.label) {
                return Err(GatewayError::UpstreamStatus {
                    service: Upstream::Chat,
                    status: *status,
                    body: format!("failed {}", request.label),
                });
            }
            Ok(ChatAnswer {
                text: format!("about {}", request.label),
                safety_ratings: serde_json::json!([]),
                elapsed_seconds: 0.01,
            })
        }

        fn timeout(&self) -> Duration {
            self.timeout
        }
    }

    fn orchestrator(fetcher: MockFetcher, classifier: MockClassifier, chat: MockChat) -> Orchestrator {
        Orchestrator::new(
            Arc::new(fetcher),
            ImageDecoder::new(LimitsConfig::default()),
            Arc::new(classifier),
            Arc::new(chat),
            OrchestratorOptions::default(),
        )
    }

    fn urls(n: usize) -> Vec<String> {
        (0..n)
            .map(|i| format!("https://example.com/image{i}.png"))
            .collect()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_batch_preserves_input_order_under_latency_skew() {
        let urls = urls(4);
        let mut classifier = MockClassifier::new();
        // Earlier items finish last
        for (i, url) in urls.iter().enumerate() {
            classifier
                .delays
                .insert(url.clone(), Duration::from_millis(200 - 50 * i as u64));
        }
        let orch = orchestrator(MockFetcher::default(), classifier, MockChat::new());

        let results = orch.batch_classify(&urls).await.unwrap();
        let returned: Vec<_> = results.iter().map(|r| r.image_url.clone()).collect();
        assert_eq!(returned, urls);
        assert!(results.iter().all(|r| r.predictions.len() == 14));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_batch_runs_items_concurrently() {
        let urls = urls(4);
        let mut classifier = MockClassifier::new();
        for url in &urls {
            classifier.delays.insert(url.clone(), Duration::from_millis(300));
        }
        let max_in_flight = classifier.max_in_flight.clone();
        let orch = orchestrator(MockFetcher::default(), classifier, MockChat::new());

        let start = Instant::now();
        orch.batch_classify(&urls).await.unwrap();
        // Serialized this would take 1.2s
        assert!(start.elapsed() < Duration::from_millis(1000));
        assert!(max_in_flight.load(Ordering::SeqCst) > 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_batch_respects_max_parallel() {
        let urls = urls(6);
        let mut classifier = MockClassifier::new();
        for url in &urls {
            classifier.delays.insert(url.clone(), Duration::from_millis(100));
        }
        let max_in_flight = classifier.max_in_flight.clone();
        let orch = Orchestrator::new(
            Arc::new(MockFetcher::default()),
            ImageDecoder::new(LimitsConfig::default()),
            Arc::new(classifier),
            Arc::new(MockChat::new()),
            OrchestratorOptions {
                max_parallel: 2,
                ..OrchestratorOptions::default()
            },
        );

        let results = orch.batch_classify(&urls).await.unwrap();
        assert_eq!(results.len(), 6);
        assert!(
            max_in_flight.load(Ordering::SeqCst) <= 2,
            "semaphore violated: max concurrent was {}",
            max_in_flight.load(Ordering::SeqCst)
        );
    }

    #[tokio::test]
    async fn test_empty_batch_makes_no_calls() {
        let fetcher = MockFetcher::default();
        let fetch_calls = fetcher.calls.clone();
        let classifier = MockClassifier::new();
        let classify_calls = classifier.calls.clone();
        let orch = orchestrator(fetcher, classifier, MockChat::new());

        let results = orch.batch_classify(&[]).await.unwrap();
        assert!(results.is_empty());
        assert_eq!(fetch_calls.load(Ordering::SeqCst), 0);
        assert_eq!(classify_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fetch_failure_fails_batch_with_that_url() {
        let urls = urls(3);
        let fetcher = MockFetcher {
            not_found: vec![urls[1].clone()],
            ..MockFetcher::default()
        };
        let orch = orchestrator(fetcher, MockClassifier::new(), MockChat::new());

        let err = orch.batch_classify(&urls).await.unwrap_err();
        match &err {
            GatewayError::ImageFetch { url, status, .. } => {
                assert_eq!(url, &urls[1]);
                assert_eq!(*status, Some(404));
            }
            other => panic!("Expected fetch failure, got {other:?}"),
        }
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn test_corrupt_image_fails_batch_as_decode_error() {
        let urls = urls(2);
        let fetcher = MockFetcher {
            corrupt: vec![urls[0].clone()],
            ..MockFetcher::default()
        };
        let classifier = MockClassifier::new();
        let classify_calls = classifier.calls.clone();
        let orch = orchestrator(fetcher, classifier, MockChat::new());

        let err = orch.batch_classify(&urls).await.unwrap_err();
        assert!(matches!(err, GatewayError::ImageDecode { .. }), "Got: {err:?}");
        // The healthy sibling still ran to completion
        assert_eq!(classify_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_first_failure_in_input_order_wins() {
        let urls = urls(3);
        let fetcher = MockFetcher {
            // Item 2 fails fast, item 0 fails late
            delays: HashMap::from([(urls[0].clone(), Duration::from_millis(150))]),
            not_found: vec![urls[0].clone(), urls[2].clone()],
            ..MockFetcher::default()
        };
        let orch = orchestrator(fetcher, MockClassifier::new(), MockChat::new());

        match orch.batch_classify(&urls).await.unwrap_err() {
            GatewayError::ImageFetch { url, .. } => assert_eq!(url, urls[0]),
            other => panic!("Expected fetch failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_slow_classifier_times_out() {
        let urls = urls(1);
        let mut classifier = MockClassifier::new();
        classifier.timeout = Duration::from_millis(50);
        classifier.delays.insert(urls[0].clone(), Duration::from_secs(10));
        let orch = orchestrator(MockFetcher::default(), classifier, MockChat::new());

        let err = orch.batch_classify(&urls).await.unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Timeout {
                stage: Stage::Classify,
                timeout_ms: 50,
                ..
            }
        ));
        assert_eq!(err.status_code(), 504);
    }

    #[tokio::test]
    async fn test_too_many_images_rejected_before_any_call() {
        let fetcher = MockFetcher::default();
        let fetch_calls = fetcher.calls.clone();
        let orch = Orchestrator::new(
            Arc::new(fetcher),
            ImageDecoder::new(LimitsConfig::default()),
            Arc::new(MockClassifier::new()),
            Arc::new(MockChat::new()),
            OrchestratorOptions {
                max_images: 2,
                ..OrchestratorOptions::default()
            },
        );

        let err = orch.batch_classify(&urls(3)).await.unwrap_err();
        assert!(matches!(err, GatewayError::Validation(_)));
        assert_eq!(fetch_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_report_summary_resolves_before_details() {
        let mut chat = MockChat::new();
        chat.delays
            .insert("summary".into(), Duration::from_millis(100));
        let events = chat.events.clone();
        let orch = orchestrator(MockFetcher::default(), MockClassifier::new(), chat);

        let conditions = vec!["Pneumonia".to_string(), "Edema".to_string(), "Mass".to_string()];
        orch.generate_report(&conditions).await.unwrap();

        let events = events.lock().unwrap().clone();
        let summary_end = events.iter().position(|e| e == "end:summary").unwrap();
        for condition in &conditions {
            let detail_start = events
                .iter()
                .position(|e| e == &format!("start:{condition}"))
                .unwrap();
            assert!(
                summary_end < detail_start,
                "detail for {condition} dispatched before summary resolved: {events:?}"
            );
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_report_details_in_request_order() {
        let mut chat = MockChat::new();
        // Pneumonia resolves last
        chat.delays
            .insert("Pneumonia".into(), Duration::from_millis(200));
        let calls = chat.calls.clone();
        let orch = orchestrator(MockFetcher::default(), MockClassifier::new(), chat);

        let conditions = vec!["Pneumonia".to_string(), "Edema".to_string()];
        let report = orch.generate_report(&conditions).await.unwrap();

        assert_eq!(report.status, "success");
        assert_eq!(report.summary, "about summary");
        assert_eq!(report.report.len(), 2);
        assert_eq!(report.report[0].condition, "Pneumonia");
        assert_eq!(report.report[0].details, "about Pneumonia");
        assert_eq!(report.report[1].condition, "Edema");
        assert_eq!(report.report[1].details, "about Edema");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(chrono::DateTime::parse_from_rfc3339(&report.timestamp).is_ok());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_report_total_time_is_wall_time_not_sum() {
        let mut chat = MockChat::new();
        for condition in ["Atelectasis", "Effusion", "Nodule", "Fibrosis"] {
            chat.delays
                .insert(condition.into(), Duration::from_millis(200));
        }
        let orch = orchestrator(MockFetcher::default(), MockClassifier::new(), chat);

        let conditions: Vec<String> = ["Atelectasis", "Effusion", "Nodule", "Fibrosis"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let report = orch.generate_report(&conditions).await.unwrap();
        assert!(report.total_elapsed_seconds >= 0.2);
        assert!(report.total_elapsed_seconds < 0.8);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_report_keeps_duplicate_conditions() {
        let chat = MockChat::new();
        let calls = chat.calls.clone();
        let orch = orchestrator(MockFetcher::default(), MockClassifier::new(), chat);

        let mut conditions: Vec<String> = crate::types::CLASS_NAMES
            .iter()
            .map(|s| s.to_string())
            .collect();
        conditions.push("Pneumonia".to_string());

        let report = orch.generate_report(&conditions).await.unwrap();
        assert_eq!(report.report.len(), conditions.len());
        assert_eq!(report.report[8].condition, "Pneumonia");
        assert_eq!(report.report[14].condition, "Pneumonia");
        assert_eq!(report.report[14].details, "about Pneumonia");
        // One summary plus one detail call per entry
        assert_eq!(calls.load(Ordering::SeqCst), 16);
    }

    #[tokio::test]
    async fn test_report_fails_if_any_condition_fails() {
        let mut chat = MockChat::new();
        chat.failing.insert("Edema".into(), 503);
        let orch = orchestrator(MockFetcher::default(), MockClassifier::new(), chat);

        let conditions = vec!["Pneumonia".to_string(), "Edema".to_string()];
        let err = orch.generate_report(&conditions).await.unwrap_err();
        assert!(matches!(
            err,
            GatewayError::UpstreamStatus { status: 503, .. }
        ));
        assert!(err.to_string().contains("failed Edema"));
    }

    #[tokio::test]
    async fn test_report_summary_failure_skips_details() {
        let mut chat = MockChat::new();
        chat.failing.insert("summary".into(), 500);
        let calls = chat.calls.clone();
        let orch = orchestrator(MockFetcher::default(), MockClassifier::new(), chat);

        let err = orch
            .generate_report(&["Hernia".to_string()])
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 500);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_report_requires_conditions() {
        let chat = MockChat::new();
        let calls = chat.calls.clone();
        let orch = orchestrator(MockFetcher::default(), MockClassifier::new(), chat);

        let err = orch.generate_report(&[]).await.unwrap_err();
        assert!(matches!(err, GatewayError::Validation(ref m) if m == "Conditions are required"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_chat_times_out() {
        let mut chat = MockChat::new();
        chat.timeout = Duration::from_millis(100);
        chat.delays.insert("chat".into(), Duration::from_secs(60));
        let orch = orchestrator(MockFetcher::default(), MockClassifier::new(), chat);

        let err = orch
            .chat(vec![ConversationTurn::ask("What is a nodule?")])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Timeout {
                stage: Stage::Chat,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_chat_requires_history() {
        let orch = orchestrator(MockFetcher::default(), MockClassifier::new(), MockChat::new());
        let err = orch.chat(vec![]).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn test_chat_returns_backend_answer() {
        let orch = orchestrator(MockFetcher::default(), MockClassifier::new(), MockChat::new());
        let answer = orch
            .chat(vec![ConversationTurn::ask("What is a nodule?")])
            .await
            .unwrap();
        assert_eq!(answer.text, "about chat");
    }

    #[tokio::test]
    async fn test_verify_labels_detects_mismatch() {
        let mut classifier = MockClassifier::new();
        let mut labels: Vec<String> = crate::types::CLASS_NAMES.iter().map(|s| s.to_string()).collect();
        labels.swap(2, 3);
        classifier.labels = Some(labels);
        let orch = orchestrator(MockFetcher::default(), classifier, MockChat::new());

        let err = orch.verify_classifier_labels().await.unwrap_err();
        assert!(matches!(err, GatewayError::Config(_)));
    }

    #[tokio::test]
    async fn test_verify_labels_passes_without_labels() {
        let orch = orchestrator(MockFetcher::default(), MockClassifier::new(), MockChat::new());
        assert!(orch.verify_classifier_labels().await.is_ok());
    }

    #[test]
    fn test_settle_all_success_keeps_order() {
        let settled: Vec<Result<u32>> = vec![Ok(3), Ok(1), Ok(2)];
        assert_eq!(settle_all(settled).unwrap(), vec![3, 1, 2]);
    }

    #[test]
    fn test_settle_all_returns_first_error_by_index() {
        let settled: Vec<Result<u32>> = vec![
            Ok(1),
            Err(GatewayError::Validation("second".into())),
            Err(GatewayError::Validation("third".into())),
        ];
        let err = settle_all(settled).unwrap_err();
        assert_eq!(err.to_string(), "second");
    }
}
