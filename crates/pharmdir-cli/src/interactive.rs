//! Line-by-line type-ahead search.
//!
//! Each input line is debounced; lines typed in quick succession collapse
//! into one search. Searches may overlap, and only the newest one's result
//! is printed.

use futures::StreamExt;
use pharmdir_core::{Country, SearchRequest};
use pharmdir_search::{
    AnalyticsSink, Applied, Debouncer, PharmacyDirectory, SearchController, SearchService,
    SearchState,
};
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use crate::search::print_results;

/// Build the request for one line of input, or `None` for a blank line.
pub(crate) fn request_for_line(
    line: &str,
    country: Country,
    radius_km: f64,
) -> Option<SearchRequest> {
    let location = line.trim();
    if location.is_empty() {
        return None;
    }
    let mut request = SearchRequest::new(country);
    request.location = Some(location.to_string());
    request.radius_km = radius_km;
    request.limit = Some(20);
    Some(request)
}

/// Write each toast as it arrives until every sender is dropped.
///
/// Toasts still queued when the controller goes away are written before this
/// returns.
pub(crate) async fn print_toasts<W>(mut toasts: mpsc::UnboundedReceiver<String>, mut out: W)
where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = toasts.recv().await {
        let line = format!("! {message}\n");
        if let Err(e) = out.write_all(line.as_bytes()).await {
            tracing::warn!(error = %e, "failed to write toast");
            return;
        }
    }
    if let Err(e) = out.flush().await {
        tracing::warn!(error = %e, "failed to flush toasts");
    }
}

/// # Errors
///
/// Returns an error if stdin cannot be read.
pub(crate) async fn run_interactive<D, A>(
    service: SearchService<D, A>,
    country: Country,
    radius_km: f64,
    debounce_ms: u64,
) -> anyhow::Result<()>
where
    D: PharmacyDirectory,
    A: AnalyticsSink,
{
    let (controller, toasts) = SearchController::new(service);
    let debouncer = Debouncer::from_millis(debounce_ms);

    let toast_printer = tokio::spawn(print_toasts(toasts, tokio::io::stderr()));

    println!("type a location per line (ctrl-d to quit)");
    let lines = futures::stream::unfold(
        BufReader::new(tokio::io::stdin()).lines(),
        |mut lines| async move {
            match lines.next_line().await {
                Ok(Some(line)) => Some((line, lines)),
                Ok(None) => None,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to read stdin");
                    None
                }
            }
        },
    );

    lines
        .for_each_concurrent(None, |line| {
            let controller = controller.clone();
            let debouncer = debouncer.clone();
            async move {
                let Some(line) = debouncer.settle(line).await else {
                    return;
                };
                let Some(request) = request_for_line(&line, country, radius_km) else {
                    return;
                };
                let applied = controller
                    .search(&request, chrono::Local::now().naive_local())
                    .await;
                if applied == Applied::Stale {
                    return;
                }
                match controller.state().await {
                    SearchState::Success(results) => {
                        println!("== {}", line.trim());
                        print_results(&results);
                    }
                    SearchState::Error(message) => println!("== {}: {message}", line.trim()),
                    SearchState::Idle | SearchState::Loading => {}
                }
            }
        })
        .await;

    // Last sender gone: the printer drains what is queued, then exits.
    drop(controller);
    if let Err(e) = toast_printer.await {
        tracing::warn!(error = %e, "toast printer task failed");
    }
    Ok(())
}
