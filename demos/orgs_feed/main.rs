//! Streamstore Demo - Paginated Orgs Feed
//!
//! This demo demonstrates the engine end to end:
//! - Wiring a selector to an in-memory cache and a simulated origin
//! - Refresh and append pagination until the feed is exhausted
//! - An origin failure surfacing as observable state, then recovery
//! - Observing every transition through the state feed
//!
//! Run with: cargo run -p orgs_feed

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use streamstore_engine::{
    DataSelector, FetchOptions, FetchResult, MemoryListCache, OriginStore, StoreResult,
};
use streamstore_state::{FeedStateStore, FetchError, StreamState};

/// One organization in the feed.
#[derive(Debug, Clone, PartialEq)]
struct Org {
    id: u32,
    name: String,
}

impl Org {
    fn new(id: u32) -> Self {
        Self {
            id,
            name: format!("org-{id:03}"),
        }
    }
}

const PAGE_SIZE: u32 = 10;
const TOTAL_ORGS: u32 = 25;

/// A simulated remote source: 25 orgs served in pages of 10, with a
/// switch to make the next call fail.
struct SimulatedOrigin {
    fail_next: AtomicBool,
}

impl SimulatedOrigin {
    fn new() -> Self {
        Self {
            fail_next: AtomicBool::new(false),
        }
    }

    fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    fn page_after(&self, last_id: u32) -> FetchResult<Vec<Org>> {
        let items: Vec<Org> = (last_id + 1..=TOTAL_ORGS)
            .take(PAGE_SIZE as usize)
            .map(Org::new)
            .collect();
        let no_more = last_id + PAGE_SIZE >= TOTAL_ORGS;
        FetchResult::new(items).with_no_more_appending(no_more)
    }

    fn check_failure(&self) -> Result<(), FetchError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            Err(FetchError::new("origin unreachable"))
        } else {
            Ok(())
        }
    }
}

impl OriginStore<Vec<Org>> for SimulatedOrigin {
    fn fetch(&self) -> Result<FetchResult<Vec<Org>>, FetchError> {
        self.check_failure()?;
        Ok(self.page_after(0))
    }

    fn fetch_appending(&self, cached: Option<&Vec<Org>>) -> Result<FetchResult<Vec<Org>>, FetchError> {
        self.check_failure()?;
        // Continuation cursor: the last cached org id
        let last_id = cached.and_then(|orgs| orgs.last()).map_or(0, |org| org.id);
        Ok(self.page_after(last_id))
    }

    fn fetch_prepending(&self, _cached: Option<&Vec<Org>>) -> Result<FetchResult<Vec<Org>>, FetchError> {
        self.check_failure()?;
        Ok(FetchResult::new(Vec::new()).with_no_more_prepending(true))
    }
}

fn describe(state: &StreamState) -> String {
    match state {
        StreamState::Settled {
            appending,
            prepending,
        } => format!("settled (append: {appending:?}, prepend: {prepending:?})"),
        StreamState::Loading => "loading".to_string(),
        StreamState::Error(cause) => format!("error ({cause})"),
    }
}

fn print_snapshot(
    label: &str,
    selector: &DataSelector<
        &'static str,
        Vec<Org>,
        FeedStateStore<&'static str, StreamState>,
        MemoryListCache<Org>,
        Arc<SimulatedOrigin>,
    >,
) -> StoreResult<()> {
    let snapshot = selector.snapshot()?;
    let count = snapshot.payload.as_ref().map_or(0, Vec::len);
    let newest = snapshot
        .payload
        .as_ref()
        .and_then(|orgs| orgs.last())
        .map_or_else(|| "-".to_string(), |org| org.name.clone());
    println!(
        "  [{label}] {count} orgs cached (newest: {newest}), state: {}",
        describe(&snapshot.state)
    );
    Ok(())
}

fn main() -> StoreResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    println!("=== Streamstore Orgs Feed Demo ===\n");

    let states = Arc::new(FeedStateStore::new());
    let feed = states.subscribe();
    let origin = Arc::new(SimulatedOrigin::new());
    let selector = DataSelector::new(
        "orgs",
        Arc::clone(&states),
        MemoryListCache::new(),
        Arc::clone(&origin),
        |_: &Vec<Org>| false,
    );

    println!("1. Passive read before any fetch");
    print_snapshot("initial", &selector)?;

    println!("\n2. First page via append (empty cache forces a fetch)");
    selector.request_append(FetchOptions::default())?;
    print_snapshot("page 1", &selector)?;

    println!("\n3. Paginate until the feed is exhausted");
    selector.request_append(FetchOptions::default())?;
    print_snapshot("page 2", &selector)?;
    selector.request_append(FetchOptions::default())?;
    print_snapshot("page 3", &selector)?;
    selector.request_append(FetchOptions::default())?;
    print_snapshot("page 4 (suppressed, edge exhausted)", &selector)?;

    println!("\n4. Origin failure surfaces as state, not as an error");
    origin.fail_next();
    selector.refresh(FetchOptions::default().with_force_refresh(true))?;
    print_snapshot("after failed refresh", &selector)?;

    println!("\n5. Recovery with continue_when_error");
    selector.refresh(
        FetchOptions::default()
            .with_force_refresh(true)
            .with_continue_when_error(true),
    )?;
    print_snapshot("after recovery", &selector)?;

    println!("\n6. Transitions observed on the state feed");
    let mut transitions = 0;
    while let Ok(event) = feed.try_recv() {
        transitions += 1;
        println!("  {transitions:2}. {}", describe(&event.state));
    }

    println!("\nDone.");
    Ok(())
}
