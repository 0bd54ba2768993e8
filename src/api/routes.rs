//! HTTP route handlers.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse, Json, Response,
    },
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::config::Config;
use crate::crew::Crew;
use crate::files::OutputStore;
use crate::llm::{LlmClient, OpenAiClient};
use crate::task::{TaskRecord, TaskStatus};

use super::session::{run_submission, SessionState};
use super::types::*;

/// Interval at which the SSE stream polls the session.
const STREAM_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Shared application state.
pub struct AppState {
    pub config: Config,
    /// The four-agent pipeline
    pub crew: Crew,
    /// Where generated files are written
    pub outputs: OutputStore,
    pub session: RwLock<SessionState>,
}

impl AppState {
    pub fn new(config: Config, llm: Arc<dyn LlmClient>) -> Self {
        let crew = Crew::from_config(llm, &config.llm);
        let outputs = OutputStore::new(config.output_dir.clone());
        Self {
            config,
            crew,
            outputs,
            session: RwLock::new(SessionState::default()),
        }
    }
}

/// Build the router (without binding a listener).
pub fn create_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/health", get(health))
        .route("/api/task", post(create_task))
        .route("/api/task/:id", get(get_task))
        .route("/api/tasks", get(list_tasks))
        .route("/api/session", get(get_session))
        .route("/api/stream", get(stream_session))
        .route("/api/files", get(list_files))
        .route("/api/files/:name", get(download_file))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let llm: Arc<dyn LlmClient> = Arc::new(OpenAiClient::from_config(&config.llm)?);
    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState::new(config, llm));

    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

/// The single-page UI.
async fn index() -> Html<&'static str> {
    Html(include_str!("ui.html"))
}

/// Health check endpoint.
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        model: state.config.llm.model.clone(),
        output_dir: state.outputs.dir().display().to_string(),
    })
}

/// Submit a task. The crew runs in the background.
async fn create_task(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<Json<CreateTaskResponse>, (StatusCode, String)> {
    let record = TaskRecord::new(req.task.trim())
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let id = state.session.write().await.begin(record).ok_or_else(|| {
        (
            StatusCode::CONFLICT,
            "A task is already in progress".to_string(),
        )
    })?;

    tracing::info!("Accepted task {}", id);

    let state_clone = Arc::clone(&state);
    tokio::spawn(async move {
        run_submission(state_clone, id).await;
    });

    Ok(Json(CreateTaskResponse {
        id,
        status: TaskStatus::Pending,
    }))
}

/// Get a submitted task with its step outputs.
async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<TaskRecord>, (StatusCode, String)> {
    let session = state.session.read().await;
    session
        .task(id.into())
        .cloned()
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("Task {} not found", id)))
}

/// List submitted tasks, most recent first.
async fn list_tasks(State(state): State<Arc<AppState>>) -> Json<Vec<TaskRecord>> {
    let session = state.session.read().await;
    let mut tasks = session.tasks.clone();
    tasks.sort_by_key(|t| std::cmp::Reverse(t.created_at()));
    Json(tasks)
}

/// Chat log, file list and run status.
async fn get_session(State(state): State<Arc<AppState>>) -> Json<SessionSnapshot> {
    Json(state.session.read().await.snapshot())
}

/// Stream new chat entries and status changes via SSE.
///
/// Each `message` event carries its 1-based position in the chat log as the
/// event id, so a reconnecting client (which sends `Last-Event-ID`) resumes
/// after the last entry it saw.
async fn stream_session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let resume_from = headers
        .get("last-event-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let stream = async_stream::stream! {
        let mut sent = resume_from;
        let mut last_status: Option<SessionStatus> = None;

        loop {
            let (new_messages, status) = {
                let session = state.session.read().await;
                (session.messages[sent.min(session.messages.len())..].to_vec(), session.status())
            };

            for entry in &new_messages {
                sent += 1;
                yield Ok(json_event("message", entry).id(sent.to_string()));
            }

            if last_status.as_ref() != Some(&status) {
                yield Ok(json_event("status", &status));
                last_status = Some(status);
            }

            tokio::time::sleep(STREAM_POLL_INTERVAL).await;
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn json_event<T: serde::Serialize>(name: &str, data: &T) -> Event {
    match serde_json::to_string(data) {
        Ok(json) => Event::default().event(name).data(json),
        Err(e) => Event::default().event("error").data(e.to_string()),
    }
}

/// Generated files with their current content.
///
/// Files are re-read on every request; a file removed from disk is reported
/// with an error instead of failing the whole listing.
async fn list_files(State(state): State<Arc<AppState>>) -> Json<Vec<FileView>> {
    let summaries = state.session.read().await.generated_files.clone();

    let mut views = Vec::with_capacity(summaries.len());
    for summary in summaries {
        let view = match tokio::fs::read_to_string(&summary.path).await {
            Ok(content) => FileView {
                summary,
                content: Some(content),
                error: None,
            },
            Err(e) => FileView {
                error: Some(format!("Error loading {}: {}", summary.path.display(), e)),
                summary,
                content: None,
            },
        };
        views.push(view);
    }
    Json(views)
}

/// Download a generated file as an attachment.
async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Response, (StatusCode, String)> {
    let content = state.outputs.read(&name).await.map_err(|e| match e {
        crate::files::OutputError::InvalidName(_) => (StatusCode::BAD_REQUEST, e.to_string()),
        _ => (StatusCode::NOT_FOUND, format!("File not found: {}", name)),
    })?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_DISPOSITION,
        format!("attachment; filename=\"{}\"", quote_filename(&name))
            .parse()
            .map_err(|_| {
                (
                    StatusCode::BAD_REQUEST,
                    format!("Filename produces an invalid header value: {}", name),
                )
            })?,
    );
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );

    Ok((headers, content).into_response())
}

/// Escape `name` for use inside a quoted `filename` parameter.
fn quote_filename(name: &str) -> String {
    name.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;
    use crate::llm::mock::ScriptedLlm;

    const ARCHITECT: &str = "PLAN:\n1. fetch\n\nIMPLEMENTATION:\n```python\nimport requests\n```";
    const TESTER: &str = "TESTS:\n```python\nimport pytest\n\ndef test_ok():\n    assert True\n```";

    fn test_state(dir: &std::path::Path, replies: Vec<Result<&str, &str>>) -> Arc<AppState> {
        state_with_llm(dir, ScriptedLlm::new(replies))
    }

    fn state_with_llm(dir: &std::path::Path, llm: ScriptedLlm) -> Arc<AppState> {
        let config = Config::new("test-key".into(), "gpt-4".into(), dir.to_path_buf());
        Arc::new(AppState::new(config, Arc::new(llm)))
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        serde_json::from_str(&body_string(response).await).unwrap()
    }

    /// Read an SSE body until `needle` shows up.
    async fn read_stream_until(response: Response, needle: &str) -> String {
        use futures::StreamExt;

        let mut body = response.into_body().into_data_stream();
        let mut text = String::new();
        tokio::time::timeout(Duration::from_secs(2), async {
            while !text.contains(needle) {
                let chunk = body.next().await.unwrap().unwrap();
                text.push_str(&String::from_utf8_lossy(&chunk));
            }
        })
        .await
        .unwrap();
        text
    }

    async fn wait_for_agent(state: &AppState, agent: &str) {
        for _ in 0..400 {
            if state.session.read().await.current_agent.as_deref() == Some(agent) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("{} never started", agent);
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn submit(task: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/task")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::json!({ "task": task }).to_string()))
            .unwrap()
    }

    async fn wait_until_idle(state: &AppState) {
        for _ in 0..200 {
            if !state.session.read().await.task_in_progress {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("run did not finish");
    }

    #[tokio::test]
    async fn index_serves_the_page() {
        let tmp = tempfile::tempdir().unwrap();
        let app = create_app(test_state(tmp.path(), vec![]));

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response).await.contains("AutoDev Team"));
    }

    #[tokio::test]
    async fn empty_task_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let state = test_state(tmp.path(), vec![]);

        let response = create_app(Arc::clone(&state))
            .oneshot(submit("   "))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(state.session.read().await.messages.is_empty());
    }

    #[tokio::test]
    async fn concurrent_submission_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let state = test_state(tmp.path(), vec![]);
        state.session.write().await.task_in_progress = true;

        let response = create_app(Arc::clone(&state))
            .oneshot(submit("Build a scraper"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn successful_run_writes_files_and_chat() {
        let tmp = tempfile::tempdir().unwrap();
        let state = test_state(
            tmp.path(),
            vec![Ok(ARCHITECT), Ok("IMPLEMENTATION:\n```python\nprint('hi')\n```"), Ok("REVIEW:\nFine."), Ok(TESTER)],
        );
        let app = create_app(Arc::clone(&state));

        let response = app.clone().oneshot(submit("Fetch weather data")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        wait_until_idle(&state).await;

        let session = state.session.read().await.snapshot();
        let agents: Vec<_> = session
            .messages
            .iter()
            .filter_map(|m| m.agent.as_deref())
            .collect();
        assert_eq!(
            agents,
            vec!["Software Architect", "Senior Python Developer", "Code Reviewer", "Test Engineer"]
        );
        let last = session.messages.last().unwrap();
        assert_eq!(last.role, ChatRole::Assistant);
        assert!(last.content.starts_with("Task completed! Here's the final result:"));
        assert_eq!(session.status.current_agent, None);

        let names: Vec<_> = session.files.iter().map(|f| f.filename.as_str()).collect();
        assert_eq!(
            names,
            vec!["implementation_1.py", "implementation_2.py", "tests_3_test.py", "full_result.txt"]
        );

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/api/files/tests_3_test.py").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"tests_3_test.py\""
        );
        assert!(body_string(response).await.starts_with("import pytest"));

        let response = app
            .oneshot(Request::builder().uri("/api/files").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let files: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(files[0]["content"], "import requests");
        assert_eq!(files[0]["section"], "IMPLEMENTATION");
    }

    #[tokio::test]
    async fn failed_run_reports_a_single_error_message() {
        let tmp = tempfile::tempdir().unwrap();
        let state = test_state(tmp.path(), vec![Ok(ARCHITECT), Err("HTTP 401: invalid api key")]);
        let app = create_app(Arc::clone(&state));

        let response = app.clone().oneshot(submit("Fetch weather data")).await.unwrap();
        let created: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        wait_until_idle(&state).await;

        let session = state.session.read().await.snapshot();
        let last = session.messages.last().unwrap();
        assert!(last.content.starts_with("❌ Error:"));
        assert!(last.content.contains("invalid api key"));
        assert!(session.files.is_empty());
        assert!(!session.status.task_in_progress);
        assert_eq!(session.status.runs_finished, 1);
        assert!(session.status.last_error.unwrap().contains("invalid api key"));

        let uri = format!("/api/task/{}", created["id"].as_str().unwrap());
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let task: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(task["status"]["state"], "failed");
    }

    #[tokio::test]
    async fn download_rejects_bad_names() {
        let tmp = tempfile::tempdir().unwrap();
        let app = create_app(test_state(tmp.path(), vec![]));

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/api/files/..%2Fsecret").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .oneshot(Request::builder().uri("/api/files/missing.py").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn task_record_tracks_the_run_while_it_executes() {
        let tmp = tempfile::tempdir().unwrap();
        let llm = ScriptedLlm::new(vec![Ok(ARCHITECT), Ok("code"), Ok("review"), Ok(TESTER)])
            .with_delay(Duration::from_millis(200));
        let state = state_with_llm(tmp.path(), llm);
        let app = create_app(Arc::clone(&state));

        let created = body_json(app.clone().oneshot(submit("Fetch weather data")).await.unwrap()).await;
        let uri = format!("/api/task/{}", created["id"].as_str().unwrap());

        wait_for_agent(&state, "Senior Python Developer").await;
        let task = body_json(app.clone().oneshot(get(&uri)).await.unwrap()).await;
        assert_eq!(task["status"]["state"], "running");
        assert_eq!(task["steps"][0]["output"], ARCHITECT);
        assert!(task["steps"][1]["output"].is_null());

        wait_until_idle(&state).await;
        let task = body_json(app.oneshot(get(&uri)).await.unwrap()).await;
        assert_eq!(task["status"]["state"], "completed");
        assert_eq!(task["steps"][3]["output"], TESTER);
    }

    #[tokio::test]
    async fn health_reports_model_and_output_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let app = create_app(test_state(tmp.path(), vec![]));

        let health = body_json(app.oneshot(get("/api/health")).await.unwrap()).await;

        assert_eq!(health["status"], "ok");
        assert_eq!(health["model"], "gpt-4");
        assert_eq!(health["output_dir"], tmp.path().display().to_string());
    }

    #[tokio::test]
    async fn tasks_are_listed_newest_first() {
        let tmp = tempfile::tempdir().unwrap();
        let state = test_state(tmp.path(), vec![]);
        let older = TaskRecord::new("older").unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        let newer = TaskRecord::new("newer").unwrap();
        {
            let mut session = state.session.write().await;
            session.store_task(older);
            session.store_task(newer);
        }

        let tasks = body_json(create_app(state).oneshot(get("/api/tasks")).await.unwrap()).await;

        assert_eq!(tasks.as_array().unwrap().len(), 2);
        assert_eq!(tasks[0]["description"], "newer");
        assert_eq!(tasks[1]["description"], "older");
    }

    #[tokio::test]
    async fn stream_sends_chat_then_status() {
        let tmp = tempfile::tempdir().unwrap();
        let state = test_state(tmp.path(), vec![]);
        {
            let mut session = state.session.write().await;
            session.messages.push(ChatEntry::user("Build a scraper"));
            session.messages.push(ChatEntry::agent("Software Architect", "PLAN: scrape"));
        }

        let response = create_app(state).oneshot(get("/api/stream")).await.unwrap();
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/event-stream");

        let text = read_stream_until(response, "event: status").await;
        assert!(text.contains("event: message"));
        assert!(text.contains("Build a scraper"));
        assert!(text.contains("id: 1\n"));
        assert!(text.contains("id: 2\n"));
        assert!(text.contains("\"task_in_progress\":false"));
    }

    #[tokio::test]
    async fn stream_resumes_after_last_event_id() {
        let tmp = tempfile::tempdir().unwrap();
        let state = test_state(tmp.path(), vec![]);
        {
            let mut session = state.session.write().await;
            session.messages.push(ChatEntry::user("Build a scraper"));
            session.messages.push(ChatEntry::agent("Software Architect", "PLAN: scrape"));
        }

        let request = Request::builder()
            .uri("/api/stream")
            .header("last-event-id", "1")
            .body(Body::empty())
            .unwrap();
        let response = create_app(state).oneshot(request).await.unwrap();

        let text = read_stream_until(response, "event: status").await;
        assert!(!text.contains("Build a scraper"));
        assert!(text.contains("PLAN: scrape"));
        assert!(text.contains("id: 2\n"));
        assert!(!text.contains("id: 1\n"));
    }

    #[tokio::test]
    async fn download_escapes_quotes_in_filename() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("say\"hi\".txt"), "hello").unwrap();
        let app = create_app(test_state(tmp.path(), vec![]));

        let response = app.oneshot(get("/api/files/say%22hi%22.txt")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"say\\\"hi\\\".txt\""
        );
    }
}
