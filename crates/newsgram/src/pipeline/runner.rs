use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::broadcast::job_progress::JobProgressEvent;
use crate::providers::{Article, Providers};
use crate::sanitize;

use super::config::PipelineConfig;
use super::context::PipelineContext;
use super::error::{PipelineError, PipelineWarning, Stage};
use super::hashtags::extract_hashtags;
use super::post::{PostRecord, PublishStatus};
use super::progress::ProgressReporter;
use super::prompts;
use super::schedule::PostingScheduler;

/// Turns one topic into posts: discover, then per candidate extract,
/// summarize, caption, image and assemble.
pub struct Pipeline {
    config: Arc<PipelineConfig>,
    providers: Providers,
    scheduler: Arc<PostingScheduler>,
}

impl Pipeline {
    /// The scheduler is shared by every topic of a job so posts get distinct slots.
    pub fn new(
        config: Arc<PipelineConfig>,
        providers: Providers,
        scheduler: Arc<PostingScheduler>,
    ) -> Self {
        Self {
            config,
            providers,
            scheduler,
        }
    }

    /// Run the pipeline for a single topic.
    /// Returns the result together with the context holding posts and warnings.
    pub async fn run(
        &self,
        mut ctx: PipelineContext,
        progress: &dyn ProgressReporter,
    ) -> (Result<(), PipelineError>, PipelineContext) {
        let span = info_span!("pipeline", job_id = %ctx.job_id, topic = %ctx.topic);
        let result = self.run_steps(&mut ctx, progress).instrument(span).await;
        (result, ctx)
    }

    /// Run the candidate steps for one caller-supplied article, skipping
    /// news discovery. The topic doubles as the article title.
    pub async fn run_url(
        &self,
        mut ctx: PipelineContext,
        url: &str,
        progress: &dyn ProgressReporter,
    ) -> (Result<(), PipelineError>, PipelineContext) {
        let span = info_span!(
            "pipeline",
            job_id = %ctx.job_id,
            topic = %ctx.topic,
            url = %sanitize::redact_url(url)
        );
        let result = self
            .run_url_steps(&mut ctx, url, progress)
            .instrument(span)
            .await;
        (result, ctx)
    }

    async fn run_steps(
        &self,
        ctx: &mut PipelineContext,
        progress: &dyn ProgressReporter,
    ) -> Result<(), PipelineError> {
        // Step 1: Discover news
        progress.report(JobProgressEvent::message(
            &ctx.job_id,
            &format!("Searching news for {}", ctx.topic),
        ));
        self.step_discover(ctx)
            .instrument(info_span!("discover"))
            .await?;

        if ctx.candidates.is_empty() {
            info!("No news found, nothing to post");
            return Ok(());
        }

        self.build_candidates(ctx, progress).await
    }

    async fn run_url_steps(
        &self,
        ctx: &mut PipelineContext,
        url: &str,
        progress: &dyn ProgressReporter,
    ) -> Result<(), PipelineError> {
        check_cancelled(ctx)?;
        ctx.candidates = vec![Article {
            title: ctx.topic.clone(),
            url: url.to_string(),
            summary: None,
            published_at: None,
        }];
        self.build_candidates(ctx, progress).await
    }

    /// Steps 2-6 for every candidate.
    async fn build_candidates(
        &self,
        ctx: &mut PipelineContext,
        progress: &dyn ProgressReporter,
    ) -> Result<(), PipelineError> {
        let candidates = ctx.candidates.clone();
        let total = candidates.len();
        for (index, article) in candidates.iter().enumerate() {
            check_cancelled(ctx)?;
            progress.report(JobProgressEvent::message(
                &ctx.job_id,
                &format!(
                    "Creating post {}/{} for {}",
                    index + 1,
                    total,
                    ctx.topic
                ),
            ));

            let span = info_span!("candidate", index, source = %sanitize::domain_of(&article.url));
            if let Some(post) = self.build_post(ctx, article).instrument(span).await? {
                ctx.posts.push(post);
            }
        }

        info!(
            posts = ctx.posts.len(),
            skipped = ctx.warnings.len(),
            "Topic finished"
        );
        Ok(())
    }

    async fn step_discover(&self, ctx: &mut PipelineContext) -> Result<(), PipelineError> {
        check_cancelled(ctx)?;
        let query = prompts::render_query(&self.config.query_template, &ctx.topic);
        let mut articles = self
            .providers
            .search
            .search(&query, ctx.options.time_range, self.config.max_results)
            .await
            .map_err(PipelineError::Discovery)?;

        debug!(found = articles.len(), "Search returned");
        articles.truncate(ctx.options.max_posts as usize);
        ctx.candidates = articles;
        Ok(())
    }

    /// `Ok(None)` when the candidate was skipped; the reason is in `ctx.warnings`.
    async fn build_post(
        &self,
        ctx: &mut PipelineContext,
        article: &Article,
    ) -> Result<Option<PostRecord>, PipelineError> {
        let generation = &self.config.generation;
        let source = sanitize::domain_of(&article.url);

        // Step 2: Extract
        let content = match self
            .providers
            .extractor
            .extract(&article.url)
            .instrument(info_span!("extract"))
            .await
        {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => return Ok(skip(ctx, article, Stage::Extract, "empty article text")),
            Err(e) => return Ok(skip(ctx, article, Stage::Extract, &e.to_string())),
        };
        check_cancelled(ctx)?;

        // Step 3: Summarize
        let summary = match self
            .providers
            .text
            .complete(
                &prompts::summary_prompt(&ctx.topic, &content),
                generation.summary_temperature,
                generation.summary_max_tokens,
            )
            .instrument(info_span!("summarize"))
            .await
        {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => return Ok(skip(ctx, article, Stage::Summarize, "empty summary")),
            Err(e) => return Ok(skip(ctx, article, Stage::Summarize, &e.to_string())),
        };
        check_cancelled(ctx)?;

        // Step 4: Caption
        let caption = match self
            .providers
            .text
            .complete(
                &prompts::caption_prompt(&ctx.topic, &article.title, &summary, &source),
                generation.caption_temperature,
                generation.caption_max_tokens,
            )
            .instrument(info_span!("caption"))
            .await
        {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => return Ok(skip(ctx, article, Stage::Caption, "empty caption")),
            Err(e) => return Ok(skip(ctx, article, Stage::Caption, &e.to_string())),
        };
        let hashtags = extract_hashtags(&caption);
        check_cancelled(ctx)?;

        // Step 5: Image
        let image_url = match self
            .providers
            .image
            .generate_image(
                &prompts::image_prompt(
                    &ctx.topic,
                    &article.title,
                    &summary,
                    &source,
                    &generation.image_size,
                ),
                &generation.image_size,
                &generation.image_quality,
            )
            .instrument(info_span!("image"))
            .await
        {
            Ok(url) => url,
            Err(e) => return Ok(skip(ctx, article, Stage::Image, &e.to_string())),
        };

        // Step 6: Assemble
        let post = PostRecord {
            topic: ctx.topic.clone(),
            caption,
            hashtags,
            image_url,
            scheduled_time: self.scheduler.next_slot(),
            created_at: Utc::now(),
            source_url: article.url.clone(),
            publish_status: PublishStatus::Draft,
        };
        debug!(scheduled = %post.scheduled_time, "Post assembled");
        Ok(Some(post))
    }
}

fn check_cancelled(ctx: &PipelineContext) -> Result<(), PipelineError> {
    if ctx.cancel.is_cancelled() {
        return Err(PipelineError::Cancelled);
    }
    Ok(())
}

fn skip(
    ctx: &mut PipelineContext,
    article: &Article,
    stage: Stage,
    error: &str,
) -> Option<PostRecord> {
    let error = sanitize::truncate_for_log(error, sanitize::MAX_BODY_CHARS);
    warn!(stage = %stage, error = %error, "Skipping candidate");
    ctx.warnings.push(PipelineWarning::CandidateSkipped {
        url: article.url.clone(),
        stage,
        error,
    });
    None
}
