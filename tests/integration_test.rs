//! 编排层集成测试
//!
//! 用假的 PageFetcher / StructuredGenerator 驱动完整流程，时间使用 tokio 的暂停时钟

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use campus_scraper::browser::iframe::{inline_iframes, InlinedFrame};
use campus_scraper::config::ExtractorSettings;
use campus_scraper::error::{AppError, AppResult, ExtractionServiceError, FetchError};
use campus_scraper::infrastructure::{
    DocumentStore, GenerationRequest, GenerationResponse, PageFetcher, StructuredGenerator,
    UsageMetadata,
};
use campus_scraper::models::{Category, EntryStatus, UrlEntry};
use campus_scraper::orchestrator::{
    BatchProcessor, BatchSummary, ItemsUpdate, QueueAction, QueueState, QueueStore,
};
use campus_scraper::services::{MemoryStore, ScrapeTool, StructuredExtractor};
use campus_scraper::workflow::ScrapeFlow;
use serde_json::{json, Value as JsonValue};
use tokio::time::{sleep, Instant};
use tokio_test::{assert_err, assert_ok};

const JANE_URL: &str = "https://example.edu/people/jane-doe";

// ========== 测试替身 ==========

#[derive(Clone)]
enum FakePage {
    Html(String),
    Unreachable,
}

/// 按 URL 返回预设页面的抓取器；同一 URL 有多个响应时依次返回，最后一个重复使用
#[derive(Default)]
struct FakeFetcher {
    pages: Mutex<HashMap<String, (Duration, VecDeque<FakePage>)>>,
}

impl FakeFetcher {
    fn page(self, url: &str, delay_ms: u64, html: &str) -> Self {
        self.responses(url, delay_ms, vec![FakePage::Html(html.to_string())])
    }

    fn responses(self, url: &str, delay_ms: u64, responses: Vec<FakePage>) -> Self {
        self.pages.lock().unwrap().insert(
            url.to_string(),
            (Duration::from_millis(delay_ms), responses.into()),
        );
        self
    }
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> AppResult<String> {
        let (delay, page) = {
            let mut pages = self.pages.lock().unwrap();
            let (delay, responses) = pages.get_mut(url).expect("unexpected url");
            let page = if responses.len() > 1 {
                responses.pop_front().unwrap()
            } else {
                responses.front().cloned().unwrap()
            };
            (*delay, page)
        };

        sleep(delay).await;
        match page {
            FakePage::Html(html) => Ok(html),
            FakePage::Unreachable => Err(AppError::Fetch(FetchError::Navigation {
                url: url.to_string(),
                source: "net::ERR_NAME_NOT_RESOLVED".into(),
            })),
        }
    }
}

/// 按 URL 返回预设对象的生成服务，并记录收到的 HTML
#[derive(Default)]
struct FakeGenerator {
    objects: HashMap<String, (Duration, JsonValue)>,
    seen_html: Mutex<Vec<(String, String)>>,
}

impl FakeGenerator {
    fn object(mut self, url: &str, delay_ms: u64, object: JsonValue) -> Self {
        self.objects
            .insert(url.to_string(), (Duration::from_millis(delay_ms), object));
        self
    }

    fn html_for(&self, url: &str) -> Option<String> {
        self.seen_html
            .lock()
            .unwrap()
            .iter()
            .find(|(seen_url, _)| seen_url == url)
            .map(|(_, html)| html.clone())
    }
}

#[async_trait]
impl StructuredGenerator for FakeGenerator {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, ExtractionServiceError> {
        let url = request.source.url().to_string();
        if let campus_scraper::infrastructure::Source::Html { html, .. } = &request.source {
            self.seen_html
                .lock()
                .unwrap()
                .push((url.clone(), html.clone()));
        }

        let Some((delay, object)) = self.objects.get(&url).cloned() else {
            return Err(ExtractionServiceError::Api {
                model: "fake".into(),
                message: format!("no object scripted for {url}"),
                retryable: false,
            });
        };
        sleep(delay).await;

        Ok(GenerationResponse {
            object,
            usage: UsageMetadata {
                prompt_tokens: 100,
                completion_tokens: 20,
                total_tokens: 120,
            },
            warnings: vec![],
        })
    }

    fn model_name(&self) -> &str {
        "fake"
    }
}

fn person(first: &str, last: &str) -> JsonValue {
    json!({
        "preNominal": "Dr.",
        "firstName": first,
        "lastName": last,
        "seo": { "title": format!("{first} {last}"), "description": "Faculty profile" },
        "contact": { "email": "jane@example.edu", "links": [] },
        "content": "Professor of Physics."
    })
}

fn processor(fetcher: FakeFetcher, generator: Arc<FakeGenerator>) -> BatchProcessor {
    let extractor = StructuredExtractor::new(
        generator,
        ExtractorSettings {
            max_retries: 2,
            retry_delay: Duration::from_millis(10),
            max_html_chars: 30_000,
        },
    );
    let flow = Arc::new(ScrapeFlow::new(Arc::new(fetcher), extractor));
    BatchProcessor::new(flow, 8)
}

fn status_of(state: &QueueState, url: &str) -> EntryStatus {
    state
        .items
        .iter()
        .find(|entry| entry.url == url)
        .map(|entry| entry.status.clone())
        .expect("entry missing")
}

// ========== 场景 ==========

#[tokio::test(start_paused = true)]
async fn test_person_page_completes() {
    let generator = Arc::new(FakeGenerator::default().object(JANE_URL, 50, person("Jane", "Doe")));
    let fetcher = FakeFetcher::default().page(JANE_URL, 50, "<h1>Dr. Jane Doe</h1>");
    let processor = processor(fetcher, generator);

    let store = QueueStore::new();
    let id = assert_ok!(store.submit(JANE_URL, "person"));

    let summary = processor.process_queue(&store).await;
    assert_eq!(
        summary,
        BatchSummary {
            selected: 1,
            completed: 1,
            failed: 0
        }
    );

    let state = store.snapshot();
    assert!(!state.is_processing);
    let entry = state.entry(id).unwrap();
    assert!(entry.status.is_completed());
    assert!(entry.error().is_none());
    assert!(entry.processed_at().is_some());

    let result = entry.result().unwrap();
    assert_eq!(result.category(), Category::Person);
    assert_eq!(result.domain, "example.edu");
    assert_eq!(result.data.as_person().unwrap().first_name, "Jane");
    assert!(result.data.is_valid());

    let value = serde_json::to_value(entry).unwrap();
    assert_eq!(value["result"]["data"]["firstName"], "Jane");
}

#[tokio::test(start_paused = true)]
async fn test_schema_failure_marks_entry_error() {
    let generator = Arc::new(
        FakeGenerator::default().object(JANE_URL, 10, json!({ "firstName": "Jane" })),
    );
    let fetcher = FakeFetcher::default().page(JANE_URL, 10, "<h1>Jane</h1>");
    let processor = processor(fetcher, generator);

    let store = QueueStore::new();
    let id = store.submit(JANE_URL, "person").unwrap();
    let summary = processor.process_queue(&store).await;
    assert_eq!(summary.failed, 1);

    let state = store.snapshot();
    let entry = state.entry(id).unwrap();
    assert!(matches!(entry.status, EntryStatus::Error { .. }));
    assert!(entry.result().is_none());
    assert!(!entry.error().unwrap().is_empty());
    // 单个条目失败不会产生批次级错误
    assert!(state.error.is_none());
    assert!(!state.is_processing);
}

#[tokio::test(start_paused = true)]
async fn test_entries_resolve_independently() {
    let fast = "https://example.edu/people/fast";
    let slow = "https://example.edu/people/slow";
    let generator = Arc::new(FakeGenerator::default().object(fast, 0, person("Fast", "One")));
    let fetcher = FakeFetcher::default()
        .page(fast, 100, "<h1>Fast</h1>")
        .responses(slow, 500, vec![FakePage::Unreachable]);
    let processor = processor(fetcher, generator);

    let store = QueueStore::new();
    store.submit(fast, "person").unwrap();
    store.submit(slow, "person").unwrap();

    let started = Instant::now();
    let (summary, midway) = tokio::join!(processor.process_queue(&store), async {
        sleep(Duration::from_millis(200)).await;
        store.snapshot()
    });

    // 200ms 时：快的已完成，慢的仍在处理
    assert!(midway.is_processing);
    assert!(status_of(&midway, fast).is_completed());
    assert_eq!(status_of(&midway, slow), EntryStatus::Processing);

    // 500ms 时两个都进入终态
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(500) && elapsed < Duration::from_millis(510));
    assert_eq!(summary.completed, 1);
    assert_eq!(summary.failed, 1);

    let state = store.snapshot();
    assert!(!state.is_processing);
    assert!(status_of(&state, fast).is_completed());
    match status_of(&state, slow) {
        EntryStatus::Error { message, .. } => assert!(message.contains(slow)),
        other => panic!("unexpected status: {other:?}"),
    }
    assert!(state
        .items
        .iter()
        .all(|entry| entry.status != EntryStatus::Processing));
}

#[tokio::test(start_paused = true)]
async fn test_no_lost_updates_under_concurrent_resolution() {
    const N: u64 = 20;
    let mut fetcher = FakeFetcher::default();
    let mut generator = FakeGenerator::default();
    let urls: Vec<String> = (0..N)
        .map(|i| format!("https://example.edu/people/p{i}"))
        .collect();

    for (i, url) in urls.iter().enumerate() {
        // 越靠后的条目越早完成
        let delay = (N - i as u64) * 7;
        fetcher = fetcher.page(url, delay, &format!("<h1>Person {i}</h1>"));
        generator = generator.object(url, delay % 3, person(&format!("P{i}"), "Doe"));
    }
    let processor = processor(fetcher, Arc::new(generator));

    let store = QueueStore::new();
    for url in &urls {
        store.submit(url, "person").unwrap();
    }

    let summary = processor.process_queue(&store).await;
    assert_eq!(summary.completed, N as usize);

    let state = store.snapshot();
    assert_eq!(state.items.len(), N as usize);
    for (i, entry) in state.items.iter().enumerate() {
        // 顺序不变，结果与自己的 URL 对应
        assert_eq!(entry.url, urls[i]);
        let result = entry.result().expect("entry not completed");
        assert_eq!(result.url, entry.url);
        assert_eq!(
            result.data.as_person().unwrap().first_name,
            format!("P{i}")
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_rerun_without_pending_entries_is_noop() {
    let generator = Arc::new(FakeGenerator::default().object(JANE_URL, 0, person("Jane", "Doe")));
    let fetcher = FakeFetcher::default().page(JANE_URL, 0, "<h1>Jane</h1>");
    let processor = processor(fetcher, generator.clone());

    let store = QueueStore::new();
    store.submit(JANE_URL, "person").unwrap();
    processor.process_queue(&store).await;
    let before = store.snapshot();

    // 手动置为 processing，验证空批次也会清除标记
    store.dispatch(QueueAction::SetIsProcessing(true));
    let summary = processor.process_queue(&store).await;

    assert_eq!(summary, BatchSummary::default());
    let after = store.snapshot();
    assert_eq!(after.items, before.items);
    assert!(!after.is_processing);
    assert_eq!(generator.seen_html.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_error_entry_is_retried_on_next_run() {
    let generator = Arc::new(FakeGenerator::default().object(JANE_URL, 0, person("Jane", "Doe")));
    let fetcher = FakeFetcher::default().responses(
        JANE_URL,
        10,
        vec![
            FakePage::Unreachable,
            FakePage::Html("<h1>Jane</h1>".to_string()),
        ],
    );
    let processor = processor(fetcher, generator);

    let store = QueueStore::new();
    let id = store.submit(JANE_URL, "person").unwrap();

    let first = processor.process_queue(&store).await;
    assert_eq!(first.failed, 1);
    assert!(store.snapshot().entry(id).unwrap().error().is_some());

    // 没有自动重试，由用户再次触发
    let second = processor.process_queue(&store).await;
    assert_eq!(second.completed, 1);
    let state = store.snapshot();
    let entry = state.entry(id).unwrap();
    assert!(entry.status.is_completed());
    assert!(entry.error().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_entries_owned_by_another_pass_are_skipped() {
    let generator = Arc::new(FakeGenerator::default());
    let processor = processor(FakeFetcher::default(), generator.clone());

    let mut in_flight = UrlEntry::new(JANE_URL, Category::Person);
    in_flight.status = EntryStatus::Processing;
    let store = QueueStore::new();
    store.dispatch(QueueAction::SetItems(ItemsUpdate::Add(in_flight.clone())));

    let summary = processor.process_queue(&store).await;
    assert_eq!(summary.selected, 0);
    let state = store.snapshot();
    assert_eq!(state.items, vec![in_flight]);
    // 另一轮仍在处理，标记保持打开
    assert!(state.is_processing);
    assert!(generator.seen_html.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_pass_keeps_processing_flag() {
    let generator = Arc::new(FakeGenerator::default().object(JANE_URL, 0, person("Jane", "Doe")));
    let fetcher = FakeFetcher::default().page(JANE_URL, 500, "<h1>Jane</h1>");
    let processor = processor(fetcher, generator);

    let store = QueueStore::new();
    let id = store.submit(JANE_URL, "person").unwrap();

    let (first, (second, during)) = tokio::join!(processor.process_queue(&store), async {
        sleep(Duration::from_millis(100)).await;
        let summary = processor.process_queue(&store).await;
        (summary, store.snapshot())
    });

    assert_eq!(second, BatchSummary::default());
    assert!(during.is_processing);
    assert_eq!(during.entry(id).unwrap().status, EntryStatus::Processing);

    assert_eq!(first.completed, 1);
    let state = store.snapshot();
    assert!(!state.is_processing);
    assert!(state.entry(id).unwrap().status.is_completed());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_passes_never_share_an_entry() {
    const N: usize = 30;
    let mut fetcher = FakeFetcher::default();
    let mut generator = FakeGenerator::default();
    for i in 0..N {
        let url = format!("https://example.edu/people/p{i}");
        fetcher = fetcher.page(&url, 1, "<h1>Person</h1>");
        generator = generator.object(&url, 0, person(&format!("P{i}"), "Doe"));
    }
    let generator = Arc::new(generator);
    let processor = Arc::new(processor(fetcher, generator.clone()));

    let store = Arc::new(QueueStore::new());
    for i in 0..N {
        store
            .submit(&format!("https://example.edu/people/p{i}"), "person")
            .unwrap();
    }

    let passes: Vec<_> = (0..4)
        .map(|_| {
            let processor = processor.clone();
            let store = store.clone();
            tokio::spawn(async move { processor.process_queue(&store).await })
        })
        .collect();

    let mut selected = 0;
    for pass in passes {
        selected += pass.await.unwrap().selected;
    }

    assert_eq!(selected, N);
    assert_eq!(generator.seen_html.lock().unwrap().len(), N);
    let state = store.snapshot();
    assert!(!state.is_processing);
    assert!(state.items.iter().all(|entry| entry.status.is_completed()));
}

#[tokio::test(start_paused = true)]
async fn test_page_without_iframes_matches_inlined_page() {
    let with_frames = "https://example.edu/news/with-frames";
    let without_frames = "https://example.edu/news/without-frames";

    let headline = "Lab wins grant";
    let body = "The physics lab received a grant.";
    // 文章通过 iframe 嵌入，渲染后被展开
    let flattened = inline_iframes(
        r#"<html><body><main><iframe src="/embed/article?id=7&amp;lang=en"></iframe></main></body></html>"#,
        &[InlinedFrame {
            src: "/embed/article?id=7&lang=en".to_string(),
            html: format!("<h1>{headline}</h1><p>{body}</p>"),
        }],
    );
    // 同一篇文章直接写在页面里
    let plain = format!(
        r#"<html><body><main class="news"><article><h1>{headline}</h1>
           <p>{body}</p></article></main></body></html>"#
    );

    let news = json!({
        "name": headline,
        "slug": "lab-wins-grant",
        "content": [{ "type": "paragraph", "text": body }]
    });
    let generator = Arc::new(
        FakeGenerator::default()
            .object(with_frames, 0, news.clone())
            .object(without_frames, 0, news),
    );
    let fetcher = FakeFetcher::default()
        .page(with_frames, 10, &flattened)
        .page(without_frames, 10, &plain);
    let processor = processor(fetcher, generator.clone());

    let store = QueueStore::new();
    store.submit(with_frames, "news").unwrap();
    store.submit(without_frames, "news").unwrap();
    let summary = processor.process_queue(&store).await;
    assert_eq!(summary.completed, 2);

    for url in [with_frames, without_frames] {
        let html = generator.html_for(url).unwrap();
        assert!(!html.contains("<iframe"), "{url}: {html}");
        let article = format!("<h1>{headline}</h1><p>{body}</p>");
        assert!(html.contains(&article), "{url}: {html}");
    }

    let state = store.snapshot();
    let data: Vec<_> = state
        .items
        .iter()
        .map(|entry| entry.result().unwrap().data.clone())
        .collect();
    assert_eq!(data[0], data[1]);
}

#[tokio::test(start_paused = true)]
async fn test_completed_results_reach_document_store() {
    let generator = Arc::new(FakeGenerator::default().object(JANE_URL, 0, person("Jane", "Doe")));
    let fetcher = FakeFetcher::default().page(JANE_URL, 0, "<h1>Jane</h1>");
    let documents = Arc::new(MemoryStore::new());
    let processor = processor(fetcher, generator).with_document_store(documents.clone());

    let store = QueueStore::new();
    store.submit(JANE_URL, "person").unwrap();
    processor.process_queue(&store).await;

    let saved = documents.list(Category::Person).await.unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].url, JANE_URL);
}

#[tokio::test(start_paused = true)]
async fn test_scrape_tool_call_runs_the_flow() {
    let generator = Arc::new(FakeGenerator::default().object(JANE_URL, 0, person("Jane", "Doe")));
    let fetcher = FakeFetcher::default().page(JANE_URL, 20, "<h1>Dr. Jane Doe</h1>");
    let extractor = StructuredExtractor::new(generator.clone(), ExtractorSettings::default());
    let tool = ScrapeTool::new(Arc::new(ScrapeFlow::new(Arc::new(fetcher), extractor)));

    let result = assert_ok!(
        tool.call(&format!(r#"{{"url": "{JANE_URL}", "category": "person"}}"#))
            .await
    );
    assert_eq!(result.category(), Category::Person);
    assert_eq!(result.data.as_person().unwrap().last_name, "Doe");
    assert_eq!(
        generator.html_for(JANE_URL).as_deref(),
        Some("<h1>Dr. Jane Doe</h1>")
    );

    // 参数不合法时不会触发抓取
    assert_err!(tool.call(r#"{"url": "https://example.edu"}"#).await);
}

#[tokio::test]
async fn test_invalid_submission_sets_top_level_error() {
    let store = QueueStore::new();
    assert_err!(store.submit(JANE_URL, "department"));
    assert_err!(store.submit("jane-doe", "person"));

    let state = store.snapshot();
    assert!(state.items.is_empty());
    assert!(state.error.is_some());
}

/// 需要本机安装 Chrome 并设置 LLM_API_KEY
#[tokio::test]
#[ignore] // 默认忽略，需要手动运行：cargo test -- --ignored
async fn test_live_scrape_example_page() {
    use campus_scraper::browser::ChromiumFetcher;
    use campus_scraper::services::OpenAiGenerator;
    use campus_scraper::Config;

    campus_scraper::utils::logging::init(true);

    let config = Config::from_env();
    let generator = Arc::new(OpenAiGenerator::new(&config).expect("缺少 LLM 配置"));
    let fetcher = Arc::new(ChromiumFetcher::new(config.fetch_settings()));
    let extractor = StructuredExtractor::new(generator, config.extractor_settings());
    let processor = BatchProcessor::new(Arc::new(ScrapeFlow::new(fetcher, extractor)), 2);

    let store = QueueStore::new();
    store.submit("https://example.com", "home").unwrap();
    let summary = processor.process_queue(&store).await;
    assert_eq!(summary.completed, 1);
}
