//! Process lifecycle: wires storage, indexing, liveness and signals around
//! the serve loop.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::{
    book_db::BookDb,
    config::Config,
    error::{Error, Result},
    filename::FilenameInferencer,
    library::Library,
    liveness::{HEARTBEAT_INTERVAL, Heartbeat},
    server,
    signals::{ShutdownContext, SignalCoordinator, Signals},
    supervisor::Supervisor,
    update::UpdateChecker,
};

/// Run until a termination signal arrives.
///
/// Returns `Ok(())` once the ordered shutdown has completed; the caller is
/// expected to exit immediately without waiting on background work. Any
/// error is fatal.
pub async fn run(
    config: Config,
    supervisor: Arc<dyn Supervisor>,
    mut signals: Signals,
) -> Result<()> {
    let db = BookDb::open(&config.data_dir.books_db())?;
    let mut library = Library::new(
        config.book_dir.clone(),
        db,
        FilenameInferencer::from_names(&config.filename_rules),
    );
    if config.covers_enabled {
        library = library.with_covers(config.data_dir.covers_dir()?);
    }
    let library = Arc::new(library);

    let listener = server::bind(&config.bind_addr()).await?;

    let data_dir = config.data_dir.clone();
    let context = ShutdownContext::new(move || data_dir.cleanup());
    let coordinator =
        SignalCoordinator::new(Arc::clone(&supervisor), context.clone());
    coordinator.spawn_reindex_listener(signals.reindex, Arc::clone(&library));

    let heartbeat =
        Heartbeat::start(supervisor, HEARTBEAT_INTERVAL, context.child_token());

    let startup =
        tokio::spawn(startup(Arc::clone(&library), config.version.clone()));
    let app = server::router(&config.version, library);

    tokio::select! {
        served = server::serve(listener, app) => served,
        _ = signals.terminate.recv() => {
            coordinator.shutdown(heartbeat).await;
            Ok(())
        }
        e = startup_failure(startup) => Err(e),
    }
}

/// Initial index, then the update check once books are known to exist.
async fn startup(library: Arc<Library>, version: String) -> Result<usize> {
    tracing::info!(
        book_dir = %library.book_dir().display(),
        "Indexing books"
    );
    let indexer = Arc::clone(&library);
    tokio::task::spawn_blocking(move || indexer.refresh_full()).await??;

    let total = library.verify_not_empty()?;
    tracing::info!("Found {total} books");

    drop(UpdateChecker::new(&version).spawn());
    Ok(total)
}

/// Resolves only if startup failed; a successful startup never wins a
/// `select!`.
async fn startup_failure(handle: JoinHandle<Result<usize>>) -> Error {
    match handle.await {
        Ok(Ok(_)) => std::future::pending().await,
        Ok(Err(e)) => e,
        Err(e) => Error::Task(e),
    }
}
