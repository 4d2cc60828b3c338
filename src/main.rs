use std::{future::IntoFuture, process, sync::Arc};

use studyhall::{
    application::{
        error::AppError, knowledge_points::KnowledgePointService, questions::QuestionService,
        repos::RankedRepo,
    },
    cache::{CacheBackend, CacheConfig, MemoryBackend, PopularityTracker, ReadThroughCache},
    config,
    domain::entities::{KnowledgePointRecord, QuestionRecord},
    domain::types::EntityKind,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, HttpState},
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (_cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    let url = settings.database.url.clone().ok_or_else(|| {
        AppError::from(InfraError::configuration(
            "database.url is required (set STUDYHALL__DATABASE__URL or --database-url)",
        ))
    })?;

    let pool = PostgresRepositories::connect(&url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;
    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    let repositories = PostgresRepositories::new(pool);
    let repo = Arc::new(repositories.clone());

    let cache_config = CacheConfig::from(&settings.cache);
    let backend: Arc<dyn CacheBackend> = Arc::new(MemoryBackend::new());
    let cache = Arc::new(ReadThroughCache::new(backend.clone(), cache_config.clone()));

    let (point_tracker, point_worker) = PopularityTracker::<KnowledgePointRecord>::spawn(
        EntityKind::KnowledgePoint,
        backend.clone(),
        repo.clone() as Arc<dyn RankedRepo<KnowledgePointRecord>>,
        cache_config.clone(),
    );
    let (question_tracker, question_worker) = PopularityTracker::<QuestionRecord>::spawn(
        EntityKind::Question,
        backend.clone(),
        repo.clone() as Arc<dyn RankedRepo<QuestionRecord>>,
        cache_config.clone(),
    );

    let knowledge_points = Arc::new(KnowledgePointService::new(
        repo.clone(),
        repo.clone(),
        repo.clone(),
        repo.clone(),
        repo.clone(),
        repo.clone(),
        cache.clone(),
        point_tracker,
        cache_config.clone(),
    ));
    let questions = Arc::new(QuestionService::new(
        repo.clone(),
        repo.clone(),
        repo.clone(),
        cache.clone(),
        question_tracker,
        cache_config,
    ));

    let state = HttpState {
        knowledge_points,
        questions,
        db: Some(repositories),
    };
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(addr = %settings.server.addr, "listening");

    // On shutdown the drain of in-flight requests is bounded by the
    // configured window; whatever is still running after that is dropped.
    let drain_window = settings.server.graceful_shutdown;
    let (draining_tx, draining_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = draining_tx.send(());
        })
        .into_future();
    tokio::pin!(server);

    let result = tokio::select! {
        served = &mut server => {
            served.map_err(|err| AppError::unexpected(format!("server error: {err}")))
        }
        _ = async {
            let _ = draining_rx.await;
            tokio::time::sleep(drain_window).await;
        } => {
            warn!(window_secs = drain_window.as_secs(), "shutdown window elapsed, dropping in-flight requests");
            Ok(())
        }
    };

    point_worker.abort();
    let _ = point_worker.await;
    question_worker.abort();
    let _ = question_worker.await;

    result
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to install shutdown signal handler");
    }
}
