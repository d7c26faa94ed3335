use {super::AppState, axum::extract::State, std::fmt::Write};

/// Dumps the drop-event counters as plain text, one `reason count` pair per
/// line. Deliberately not Prometheus exposition format: metrics
/// aggregation is an out-of-scope collaborator's job, and this keeps the
/// dependency footprint aligned with the rest of the workspace instead of
/// re-implementing a registry for something nothing here scrapes yet.
pub async fn metrics(State(state): State<AppState>) -> String {
    let mut counters: Vec<(String, u64)> = state.drop_counters.snapshot().into_iter().collect();
    counters.sort_by(|a, b| a.0.cmp(&b.0));
    let mut out = String::new();
    for (reason, count) in counters {
        let _ = writeln!(out, "{reason} {count}");
    }
    out
}
