use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use salesbrief_core::domain::report::ExecutiveRole;
use salesbrief_core::error::{ErrorKind, PipelineError};
use salesbrief_core::pipeline::{PipelineOutput, ReportPipeline, RunOptions};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = salesbrief_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let pipeline = match ReportPipeline::from_settings(&settings) {
        Ok(pipeline) => Some(Arc::new(pipeline)),
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "model provider not configured; starting API in degraded mode");
            None
        }
    };

    let app = app(AppState { pipeline });

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, company = %settings.company_name, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/roles", get(list_roles))
        .route("/reports", post(create_report))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    pipeline: Option<Arc<ReportPipeline>>,
}

#[derive(Debug, Serialize)]
struct ApiRole {
    role: ExecutiveRole,
    focus: &'static str,
}

async fn list_roles() -> Json<Vec<ApiRole>> {
    Json(
        ExecutiveRole::ALL
            .into_iter()
            .map(|role| ApiRole {
                role,
                focus: role.focus(),
            })
            .collect(),
    )
}

#[derive(Debug, Deserialize)]
struct CreateReportRequest {
    role: String,
    csv: String,
    #[serde(default)]
    skip_research: bool,
}

async fn create_report(
    State(state): State<AppState>,
    Json(req): Json<CreateReportRequest>,
) -> Result<Json<PipelineOutput>, ApiError> {
    let role: ExecutiveRole = req.role.parse().map_err(ApiError::bad_role)?;

    let Some(pipeline) = &state.pipeline else {
        return Err(ApiError::not_configured());
    };

    let opts = RunOptions {
        skip_research: req.skip_research,
    };
    let output = pipeline
        .run(&req.csv, role, opts)
        .await
        .map_err(ApiError::from_pipeline)?;

    Ok(Json(output))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    stage: Option<&'static str>,
    message: String,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn bad_role(message: String) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorBody {
                kind: "invalid_role",
                stage: None,
                message,
            },
        }
    }

    fn not_configured() -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            body: ErrorBody {
                kind: "not_configured",
                stage: None,
                message: "no model provider is configured for this service".to_string(),
            },
        }
    }

    fn from_pipeline(err: anyhow::Error) -> Self {
        let Some(pe) = find_pipeline_error(&err) else {
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(error = %format!("{err:#}"), "report run failed unexpectedly");
            return Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: ErrorBody {
                    kind: "internal",
                    stage: None,
                    message: "internal error".to_string(),
                },
            };
        };

        let status = match pe.kind {
            ErrorKind::DataValidation => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::SynthesisParse | ErrorKind::SynthesisValidation => StatusCode::BAD_GATEWAY,
            ErrorKind::ResearchUnavailable | ErrorKind::SynthesisUnavailable => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        };

        if status.is_server_error() {
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(kind = pe.kind.as_str(), stage = pe.stage, error = %pe, "report run failed");
        } else {
            tracing::info!(kind = pe.kind.as_str(), stage = pe.stage, error = %pe, "report request rejected");
        }

        Self {
            status,
            body: ErrorBody {
                kind: pe.kind.as_str(),
                stage: Some(pe.stage),
                message: pe.detail.clone(),
            },
        }
    }
}

fn find_pipeline_error(err: &anyhow::Error) -> Option<&PipelineError> {
    err.chain().find_map(|e| e.downcast_ref::<PipelineError>())
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}

fn init_sentry(settings: &salesbrief_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use salesbrief_core::llm::{LlmClient, Provider, StructuredPrompt};
    use salesbrief_core::report::ReportSynthesizer;
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::ServiceExt;

    struct CannedLlm(Value);

    #[async_trait::async_trait]
    impl LlmClient for CannedLlm {
        fn provider(&self) -> Provider {
            Provider::Anthropic
        }

        async fn generate_structured(&self, _prompt: &StructuredPrompt) -> anyhow::Result<String> {
            Ok(self.0.to_string())
        }
    }

    fn report_json() -> Value {
        json!({
            "executive_summary": "Sales are concentrated in iPhone.",
            "key_findings": ["iPhone is 51.7% of sales"],
            "strategic_recommendations": [{
                "category": "Strategic",
                "priority": "High",
                "timeline": "Short-term",
                "expected_impact": "Lower concentration",
                "recommendation": "Grow the Mac line"
            }],
            "risk_assessment": "Single-product exposure.",
            "next_steps": ["Review the product mix"]
        })
    }

    fn state_with(reply: Value) -> AppState {
        let synth = ReportSynthesizer::new(Arc::new(CannedLlm(reply)))
            .with_retry_backoff(Duration::from_millis(1));
        AppState {
            pipeline: Some(Arc::new(ReportPipeline::new("Apple Inc.", synth))),
        }
    }

    async fn post_report(state: AppState, body: Value) -> (StatusCode, Value) {
        let req = Request::builder()
            .method("POST")
            .uri("/reports")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let res = app(state).oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    const CSV: &str = "product,region,sales\niPhone,NA,1500000\nMacBook,EU,800000\niPad,Asia,600000\n";

    #[tokio::test]
    async fn creates_report() {
        let (status, body) =
            post_report(state_with(report_json()), json!({"role": "cfo", "csv": CSV})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["role"], "CFO");
        assert_eq!(body["company"], "Apple Inc.");
        assert_eq!(body["summary"]["total_sales"], 2_900_000.0);
        assert_eq!(body["report"]["strategic_recommendations"][0]["priority"], "High");
        assert_eq!(body["warnings"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn invalid_data_is_unprocessable() {
        let (status, body) = post_report(
            state_with(report_json()),
            json!({"role": "CEO", "csv": "product,region,sales\n"}),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["kind"], "data_validation");
        assert_eq!(body["stage"], "aggregate");
    }

    #[tokio::test]
    async fn bad_model_output_is_bad_gateway() {
        let mut reply = report_json();
        reply["strategic_recommendations"] = json!([]);
        let (status, body) =
            post_report(state_with(reply), json!({"role": "CEO", "csv": CSV})).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["kind"], "synthesis_validation");
    }

    #[tokio::test]
    async fn unknown_role_is_bad_request() {
        let (status, body) =
            post_report(state_with(report_json()), json!({"role": "intern", "csv": CSV})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "invalid_role");
    }

    #[tokio::test]
    async fn degraded_mode_reports_unavailable() {
        let (status, body) =
            post_report(AppState { pipeline: None }, json!({"role": "CEO", "csv": CSV})).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["kind"], "not_configured");
    }

    #[tokio::test]
    async fn lists_all_roles() {
        let req = Request::builder().uri("/roles").body(Body::empty()).unwrap();
        let res = app(AppState { pipeline: None }).oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let roles: Vec<Value> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(roles.len(), 10);
        assert_eq!(roles[5]["role"], "Head of Sales");
    }
}
