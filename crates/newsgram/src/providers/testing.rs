//! Scripted in-memory providers for exercising the pipeline and job runner
//! without network access.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::worker::job::TimeRange;

use super::{
    Article, ContentExtractor, ImageGenerator, NewsSearch, ProviderError, ProviderFactory,
    Providers, SocialPublisher, TextGenerator,
};

fn scripted_failure(provider: &'static str, what: &str) -> ProviderError {
    ProviderError::Status {
        provider,
        status: 500,
        body: format!("scripted failure: {}", what),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Builds `count` articles titled `"{topic} story {n}"`.
pub fn articles(topic: &str, count: usize) -> Vec<Article> {
    (1..=count)
        .map(|n| Article {
            title: format!("{} story {}", topic, n),
            url: format!("https://news.test/{}/{}", topic.replace(' ', "-"), n),
            summary: Some(format!("Summary of {} story {}", topic, n)),
            published_at: None,
        })
        .collect()
}

// ─── Search ─────────────────────────────────────────────────────────────────

/// Answers a query with the articles scripted for the topic it mentions.
/// Topics without a script return no results.
#[derive(Default)]
pub struct ScriptedSearch {
    by_topic: HashMap<String, Vec<Article>>,
    failing: HashSet<String>,
    delay: Option<Duration>,
    queries: Mutex<Vec<String>>,
}

impl ScriptedSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_articles(mut self, topic: &str, articles: Vec<Article>) -> Self {
        self.by_topic.insert(topic.to_string(), articles);
        self
    }

    pub fn failing(mut self, topic: &str) -> Self {
        self.failing.insert(topic.to_string());
        self
    }

    /// Sleeps before answering, to keep jobs in flight.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn queries(&self) -> Vec<String> {
        lock(&self.queries).clone()
    }

    fn mentions(query: &str, topic: &str) -> bool {
        format!(" {} ", query).contains(&format!(" {} ", topic))
    }
}

#[async_trait]
impl NewsSearch for ScriptedSearch {
    async fn search(
        &self,
        query: &str,
        _time_range: TimeRange,
        max_results: u32,
    ) -> Result<Vec<Article>, ProviderError> {
        lock(&self.queries).push(query.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.iter().any(|t| Self::mentions(query, t)) {
            return Err(scripted_failure("search", query));
        }

        let found = self
            .by_topic
            .iter()
            .find(|(topic, _)| Self::mentions(query, topic))
            .map(|(_, articles)| articles.clone())
            .unwrap_or_default();
        Ok(found.into_iter().take(max_results as usize).collect())
    }
}

// ─── Extraction ─────────────────────────────────────────────────────────────

/// Returns `"Full text of <url>"` unless the URL is scripted to fail or be empty.
#[derive(Default)]
pub struct ScriptedExtractor {
    failing: HashSet<String>,
    empty: HashSet<String>,
    calls: AtomicUsize,
}

impl ScriptedExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    pub fn empty(mut self, url: &str) -> Self {
        self.empty.insert(url.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentExtractor for ScriptedExtractor {
    async fn extract(&self, url: &str) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(url) {
            return Err(scripted_failure("extract", url));
        }
        if self.empty.contains(url) {
            return Ok(String::new());
        }
        Ok(format!("Full text of {}", url))
    }
}

// ─── Text ───────────────────────────────────────────────────────────────────

/// Replies with a fixed caption-like text. Prompts containing a scripted
/// marker fail.
pub struct ScriptedText {
    reply: String,
    fail_on: Vec<String>,
    prompts: Mutex<Vec<String>>,
}

impl Default for ScriptedText {
    fn default() -> Self {
        Self {
            reply: "Kabar terbaru hari ini! Simak selengkapnya. #berita #update #indonesia"
                .to_string(),
            fail_on: Vec::new(),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedText {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(mut self, reply: &str) -> Self {
        self.reply = reply.to_string();
        self
    }

    pub fn failing_on(mut self, marker: &str) -> Self {
        self.fail_on.push(marker.to_string());
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedText {
    async fn complete(
        &self,
        prompt: &str,
        _temperature: f32,
        _max_tokens: u32,
    ) -> Result<String, ProviderError> {
        lock(&self.prompts).push(prompt.to_string());
        if let Some(marker) = self.fail_on.iter().find(|m| prompt.contains(m.as_str())) {
            return Err(scripted_failure("text", marker));
        }
        Ok(self.reply.clone())
    }
}

// ─── Images ─────────────────────────────────────────────────────────────────

/// Returns `https://images.test/<n>.png` for the n-th successful call.
#[derive(Default)]
pub struct ScriptedImage {
    fail_on: Vec<String>,
    succeed_limit: Option<usize>,
    generated: AtomicUsize,
    calls: AtomicUsize,
}

impl ScriptedImage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails any prompt containing `marker`.
    pub fn failing_on(mut self, marker: &str) -> Self {
        self.fail_on.push(marker.to_string());
        self
    }

    /// Succeeds for the first `limit` calls, fails afterwards.
    pub fn succeeding_only(mut self, limit: usize) -> Self {
        self.succeed_limit = Some(limit);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageGenerator for ScriptedImage {
    async fn generate_image(
        &self,
        prompt: &str,
        _size: &str,
        _quality: &str,
    ) -> Result<String, ProviderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_on.iter().any(|m| prompt.contains(m.as_str())) {
            return Err(scripted_failure("image", "marker"));
        }
        if self.succeed_limit.is_some_and(|limit| call >= limit) {
            return Err(scripted_failure("image", "limit reached"));
        }
        let n = self.generated.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("https://images.test/{}.png", n))
    }
}

// ─── Publishing ─────────────────────────────────────────────────────────────

/// Records published posts. Verification and publishing can be scripted to fail.
#[derive(Default)]
pub struct ScriptedPublisher {
    reject_verify: bool,
    reject_publish: bool,
    containers: Mutex<Vec<(String, String)>>,
    published: Mutex<Vec<String>>,
}

impl ScriptedPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting_verify(mut self) -> Self {
        self.reject_verify = true;
        self
    }

    pub fn rejecting_publish(mut self) -> Self {
        self.reject_publish = true;
        self
    }

    /// `(image_url, caption)` of every container created.
    pub fn containers(&self) -> Vec<(String, String)> {
        lock(&self.containers).clone()
    }

    pub fn published(&self) -> Vec<String> {
        lock(&self.published).clone()
    }
}

#[async_trait]
impl SocialPublisher for ScriptedPublisher {
    async fn verify(&self) -> Result<String, ProviderError> {
        if self.reject_verify {
            return Err(ProviderError::Status {
                provider: "publisher",
                status: 401,
                body: "invalid token".to_string(),
            });
        }
        Ok("@scripted".to_string())
    }

    async fn create_container(
        &self,
        image_url: &str,
        caption: &str,
    ) -> Result<String, ProviderError> {
        let mut containers = lock(&self.containers);
        containers.push((image_url.to_string(), caption.to_string()));
        Ok(format!("container-{}", containers.len()))
    }

    async fn publish(&self, container_id: &str) -> Result<String, ProviderError> {
        if self.reject_publish {
            return Err(scripted_failure("publisher", container_id));
        }
        let media_id = format!("media-{}", container_id.trim_start_matches("container-"));
        lock(&self.published).push(media_id.clone());
        Ok(media_id)
    }
}

// ─── Factory ────────────────────────────────────────────────────────────────

/// Hands out the same scripted providers to every job.
pub struct ScriptedFactory {
    providers: Providers,
    not_ready: Option<String>,
    fail_build: Option<String>,
    builds: AtomicUsize,
}

impl ScriptedFactory {
    pub fn new(providers: Providers) -> Self {
        Self {
            providers,
            not_ready: None,
            fail_build: None,
            builds: AtomicUsize::new(0),
        }
    }

    /// `ensure_ready` reports a missing credential.
    pub fn not_ready(mut self, message: &str) -> Self {
        self.not_ready = Some(message.to_string());
        self
    }

    /// `build` fails, as when a client cannot be constructed.
    pub fn failing_build(mut self, message: &str) -> Self {
        self.fail_build = Some(message.to_string());
        self
    }

    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

impl ProviderFactory for ScriptedFactory {
    fn ensure_ready(&self) -> Result<(), ProviderError> {
        match &self.not_ready {
            Some(message) => Err(ProviderError::NotConfigured {
                provider: "scripted",
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }

    fn build(&self) -> Result<Providers, ProviderError> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        match &self.fail_build {
            Some(message) => Err(ProviderError::Client {
                provider: "scripted",
                message: message.clone(),
            }),
            None => Ok(self.providers.clone()),
        }
    }
}

/// Typed handles to the scripted providers behind a [`Providers`] set.
pub struct ScriptedSet {
    pub search: Arc<ScriptedSearch>,
    pub extractor: Arc<ScriptedExtractor>,
    pub text: Arc<ScriptedText>,
    pub image: Arc<ScriptedImage>,
    pub publisher: Option<Arc<ScriptedPublisher>>,
}

impl ScriptedSet {
    pub fn new(search: ScriptedSearch) -> Self {
        Self {
            search: Arc::new(search),
            extractor: Arc::new(ScriptedExtractor::new()),
            text: Arc::new(ScriptedText::new()),
            image: Arc::new(ScriptedImage::new()),
            publisher: None,
        }
    }

    pub fn with_extractor(mut self, extractor: ScriptedExtractor) -> Self {
        self.extractor = Arc::new(extractor);
        self
    }

    pub fn with_text(mut self, text: ScriptedText) -> Self {
        self.text = Arc::new(text);
        self
    }

    pub fn with_image(mut self, image: ScriptedImage) -> Self {
        self.image = Arc::new(image);
        self
    }

    pub fn with_publisher(mut self, publisher: ScriptedPublisher) -> Self {
        self.publisher = Some(Arc::new(publisher));
        self
    }

    pub fn providers(&self) -> Providers {
        Providers {
            search: self.search.clone(),
            extractor: self.extractor.clone(),
            text: self.text.clone(),
            image: self.image.clone(),
            publisher: self
                .publisher
                .clone()
                .map(|p| p as Arc<dyn SocialPublisher>),
        }
    }

    pub fn factory(&self) -> ScriptedFactory {
        ScriptedFactory::new(self.providers())
    }
}
