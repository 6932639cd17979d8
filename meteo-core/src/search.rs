//! Debounced city autocomplete.
//!
//! [`SearchState::step`] is a pure transition function: it takes an event and
//! returns the next state plus the effects to run. [`SearchSession`] runs
//! those effects on tokio.
//!
//! Every event that changes what a late answer would mean bumps
//! `generation`. Timer and result events carry the generation they were
//! issued under and are ignored once it is stale, so a slow response can
//! never overwrite newer suggestions.

use std::{sync::Arc, time::Duration};

use tokio::{sync::mpsc, task::JoinHandle, time::Instant};

use crate::{model::GeocodingResult, provider::GeocodingProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchConfig {
    pub debounce: Duration,
    /// Trimmed queries shorter than this never reach the provider.
    pub min_query_len: usize,
    pub limit: usize,
}

impl SearchConfig {
    /// Same limits, but the search starts as soon as the input arrives.
    ///
    /// For front ends that hand over a finished line instead of keystrokes.
    pub fn without_debounce(self) -> Self {
        Self { debounce: Duration::ZERO, ..self }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchPhase {
    #[default]
    Idle,
    /// Debounce timer armed.
    Pending,
    /// Request in flight.
    Searching,
    /// Suggestions received.
    Resolved,
}

/// Where the detail screen should go: a free-text city name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CityRoute {
    pub city: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchEvent {
    Input(String),
    TimerFired { generation: u64 },
    Results { generation: u64, results: Vec<GeocodingResult> },
    /// Pick the suggestion at this index.
    Select(usize),
    /// Submit the raw query text.
    Submit,
    Dismiss,
    Focus,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchEffect {
    CancelTimer,
    ArmTimer { generation: u64, delay: Duration },
    Search { generation: u64, query: String, limit: usize },
    Navigate(CityRoute),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchState {
    pub query: String,
    pub suggestions: Vec<GeocodingResult>,
    pub phase: SearchPhase,
    pub dropdown_visible: bool,
    pub generation: u64,
}

impl SearchState {
    /// Resolved with nothing to show; the dropdown says so instead of hiding.
    pub fn shows_no_results(&self) -> bool {
        self.dropdown_visible && self.phase == SearchPhase::Resolved && self.suggestions.is_empty()
    }

    pub fn step(&self, config: &SearchConfig, event: SearchEvent) -> (SearchState, Vec<SearchEffect>) {
        let mut next = self.clone();
        let mut effects = Vec::new();

        match event {
            SearchEvent::Input(text) => {
                next.generation += 1;
                next.query = text;
                effects.push(SearchEffect::CancelTimer);

                if next.query.trim().chars().count() < config.min_query_len {
                    next.suggestions.clear();
                    next.dropdown_visible = false;
                    next.phase = SearchPhase::Idle;
                } else {
                    next.phase = SearchPhase::Pending;
                    effects.push(SearchEffect::ArmTimer {
                        generation: next.generation,
                        delay: config.debounce,
                    });
                }
            }
            SearchEvent::TimerFired { generation } => {
                if generation == self.generation && self.phase == SearchPhase::Pending {
                    next.phase = SearchPhase::Searching;
                    effects.push(SearchEffect::Search {
                        generation,
                        query: self.query.trim().to_string(),
                        limit: config.limit,
                    });
                }
            }
            SearchEvent::Results { generation, results } => {
                if generation == self.generation && self.phase == SearchPhase::Searching {
                    next.suggestions = results;
                    next.phase = SearchPhase::Resolved;
                    next.dropdown_visible = true;
                }
            }
            SearchEvent::Select(index) => {
                if let Some(choice) = self.suggestions.get(index) {
                    let city = choice.name.clone();
                    next.end_session();
                    next.query = city.clone();
                    effects.push(SearchEffect::CancelTimer);
                    effects.push(SearchEffect::Navigate(CityRoute { city }));
                }
            }
            SearchEvent::Submit => {
                let city = self.query.trim().to_string();
                next.end_session();
                effects.push(SearchEffect::CancelTimer);
                if !city.is_empty() {
                    effects.push(SearchEffect::Navigate(CityRoute { city }));
                }
            }
            SearchEvent::Dismiss => {
                next.end_session();
                effects.push(SearchEffect::CancelTimer);
            }
            SearchEvent::Focus => {
                next.dropdown_visible = !self.suggestions.is_empty();
            }
        }

        (next, effects)
    }

    fn end_session(&mut self) {
        self.generation += 1;
        self.phase = SearchPhase::Idle;
        self.dropdown_visible = false;
    }
}

/// Drives a [`SearchState`] against a geocoding provider.
///
/// Timers are tasks that get aborted when cancelled, so a discarded keystroke
/// never issues a request. Searches are never aborted once started; their
/// answer is just ignored if it arrives late.
#[derive(Debug)]
pub struct SearchSession<G: ?Sized> {
    config: SearchConfig,
    geocoder: Arc<G>,
    state: SearchState,
    timer: Option<JoinHandle<()>>,
    in_flight: usize,
    tx: mpsc::UnboundedSender<SearchEvent>,
    rx: mpsc::UnboundedReceiver<SearchEvent>,
}

impl<G: GeocodingProvider + ?Sized + 'static> SearchSession<G> {
    pub fn new(geocoder: Arc<G>, config: SearchConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            config,
            geocoder,
            state: SearchState::default(),
            timer: None,
            in_flight: 0,
            tx,
            rx,
        }
    }

    pub fn state(&self) -> &SearchState {
        &self.state
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// A keystroke: `text` is the full current content of the input.
    pub fn input(&mut self, text: impl Into<String>) {
        self.dispatch(SearchEvent::Input(text.into()));
    }

    pub fn select(&mut self, index: usize) -> Option<CityRoute> {
        self.dispatch(SearchEvent::Select(index))
    }

    pub fn submit(&mut self) -> Option<CityRoute> {
        self.dispatch(SearchEvent::Submit)
    }

    pub fn dismiss(&mut self) {
        self.dispatch(SearchEvent::Dismiss);
    }

    pub fn focus(&mut self) {
        self.dispatch(SearchEvent::Focus);
    }

    /// Whether a timer or request can still produce an update.
    pub fn is_busy(&self) -> bool {
        self.timer.is_some() || self.in_flight > 0
    }

    /// Wait for the next timer or search result and apply it.
    ///
    /// Returns `None` when nothing is outstanding.
    pub async fn next_update(&mut self) -> Option<&SearchState> {
        if !self.is_busy() {
            return None;
        }

        let event = self.rx.recv().await?;
        match &event {
            // a stale firing must not forget the timer armed after it
            SearchEvent::TimerFired { generation } if *generation == self.state.generation => {
                self.timer = None
            }
            SearchEvent::Results { .. } => self.in_flight = self.in_flight.saturating_sub(1),
            _ => {}
        }
        self.dispatch(event);
        Some(&self.state)
    }

    /// Run updates until the session settles, e.g. after the final keystroke.
    pub async fn settle(&mut self) -> &SearchState {
        while self.next_update().await.is_some() {}
        &self.state
    }

    fn dispatch(&mut self, event: SearchEvent) -> Option<CityRoute> {
        let (next, effects) = self.state.step(&self.config, event);
        self.state = next;

        let mut route = None;
        for effect in effects {
            match effect {
                SearchEffect::CancelTimer => {
                    if let Some(timer) = self.timer.take() {
                        timer.abort();
                    }
                }
                SearchEffect::ArmTimer { generation, delay } => {
                    let deadline = Instant::now() + delay;
                    let tx = self.tx.clone();
                    self.timer = Some(tokio::spawn(async move {
                        tokio::time::sleep_until(deadline).await;
                        let _ = tx.send(SearchEvent::TimerFired { generation });
                    }));
                }
                SearchEffect::Search { generation, query, limit } => {
                    let geocoder = Arc::clone(&self.geocoder);
                    let tx = self.tx.clone();
                    self.in_flight += 1;
                    tokio::spawn(async move {
                        tracing::debug!("Searching cities for {:?} (generation {})", query, generation);
                        let results = geocoder.search_cities(&query, limit).await;
                        let _ = tx.send(SearchEvent::Results { generation, results });
                    });
                }
                SearchEffect::Navigate(r) => route = Some(r),
            }
        }
        route
    }
}

impl<G: ?Sized> Drop for SearchSession<G> {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GeocodingError;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    fn cfg() -> SearchConfig {
        SearchConfig { debounce: Duration::from_millis(500), min_query_len: 3, limit: 5 }
    }

    fn place(id: i64, name: &str) -> GeocodingResult {
        GeocodingResult {
            id,
            name: name.into(),
            latitude: 0.0,
            longitude: 0.0,
            country: "France".into(),
        }
    }

    #[derive(Debug, Default)]
    struct RecordingGeocoder {
        calls: Mutex<Vec<(String, usize)>>,
        // per-query artificial latency
        slow: Mutex<Vec<(String, Duration)>>,
    }

    impl RecordingGeocoder {
        fn calls(&self) -> Vec<(String, usize)> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl GeocodingProvider for RecordingGeocoder {
        async fn try_search(
            &self,
            query: &str,
            limit: usize,
        ) -> Result<Vec<GeocodingResult>, GeocodingError> {
            self.calls.lock().push((query.to_string(), limit));
            let delay = self
                .slow
                .lock()
                .iter()
                .find(|(q, _)| q == query)
                .map(|(_, d)| *d);
            if let Some(d) = delay {
                tokio::time::sleep(d).await;
            }

            if query.starts_with("xyz") {
                return Ok(Vec::new());
            }
            Ok(vec![place(1, query), place(2, &format!("{query}-sur-Mer"))])
        }
    }

    #[test]
    fn short_query_goes_idle_without_timer() {
        let state = SearchState {
            suggestions: vec![place(1, "Paris")],
            dropdown_visible: true,
            phase: SearchPhase::Resolved,
            ..SearchState::default()
        };

        let (next, effects) = state.step(&cfg(), SearchEvent::Input("  Pa ".into()));

        assert_eq!(next.phase, SearchPhase::Idle);
        assert!(!next.dropdown_visible);
        assert!(next.suggestions.is_empty());
        assert_eq!(effects, vec![SearchEffect::CancelTimer]);
    }

    #[test]
    fn long_query_arms_timer_with_configured_delay() {
        let (next, effects) = SearchState::default().step(&cfg(), SearchEvent::Input("Par".into()));

        assert_eq!(next.phase, SearchPhase::Pending);
        assert_eq!(
            effects,
            vec![
                SearchEffect::CancelTimer,
                SearchEffect::ArmTimer { generation: 1, delay: Duration::from_millis(500) },
            ]
        );
    }

    #[test]
    fn stale_timer_is_ignored() {
        let (s1, _) = SearchState::default().step(&cfg(), SearchEvent::Input("Par".into()));
        let (s2, _) = s1.step(&cfg(), SearchEvent::Input("Pari".into()));

        let (s3, effects) = s2.step(&cfg(), SearchEvent::TimerFired { generation: 1 });
        assert!(effects.is_empty());
        assert_eq!(s3.phase, SearchPhase::Pending);

        let (s4, effects) = s3.step(&cfg(), SearchEvent::TimerFired { generation: 2 });
        assert_eq!(s4.phase, SearchPhase::Searching);
        assert_eq!(
            effects,
            vec![SearchEffect::Search { generation: 2, query: "Pari".into(), limit: 5 }]
        );
    }

    #[test]
    fn stale_results_do_not_overwrite_newer_query() {
        let (s, _) = SearchState::default().step(&cfg(), SearchEvent::Input("Lyon".into()));
        let (s, _) = s.step(&cfg(), SearchEvent::TimerFired { generation: 1 });
        let (s, _) = s.step(&cfg(), SearchEvent::Input("Lille".into()));

        let (s, _) = s.step(
            &cfg(),
            SearchEvent::Results { generation: 1, results: vec![place(1, "Lyon")] },
        );

        assert!(s.suggestions.is_empty());
        assert_eq!(s.phase, SearchPhase::Pending);
        assert!(!s.dropdown_visible);
    }

    #[test]
    fn empty_results_show_no_results_dropdown() {
        let (s, _) = SearchState::default().step(&cfg(), SearchEvent::Input("xyznotacity".into()));
        let (s, _) = s.step(&cfg(), SearchEvent::TimerFired { generation: 1 });
        let (s, _) = s.step(&cfg(), SearchEvent::Results { generation: 1, results: vec![] });

        assert!(s.dropdown_visible);
        assert!(s.shows_no_results());
    }

    #[test]
    fn select_navigates_with_suggestion_name() {
        let state = SearchState {
            query: "Bord".into(),
            suggestions: vec![place(1, "Bordeaux")],
            phase: SearchPhase::Resolved,
            dropdown_visible: true,
            generation: 4,
        };

        let (next, effects) = state.step(&cfg(), SearchEvent::Select(0));

        assert_eq!(next.query, "Bordeaux");
        assert!(!next.dropdown_visible);
        assert_eq!(next.phase, SearchPhase::Idle);
        assert!(next.generation > state.generation);
        assert!(effects.contains(&SearchEffect::Navigate(CityRoute { city: "Bordeaux".into() })));
    }

    #[test]
    fn select_out_of_range_is_noop() {
        let (next, effects) = SearchState::default().step(&cfg(), SearchEvent::Select(3));
        assert_eq!(next, SearchState::default());
        assert!(effects.is_empty());
    }

    #[test]
    fn submit_uses_trimmed_raw_query() {
        let state = SearchState { query: "  Saint-Malo ".into(), ..SearchState::default() };
        let (_, effects) = state.step(&cfg(), SearchEvent::Submit);

        assert!(effects.contains(&SearchEffect::Navigate(CityRoute { city: "Saint-Malo".into() })));
    }

    #[test]
    fn submit_blank_only_hides_dropdown() {
        let state = SearchState { query: "   ".into(), dropdown_visible: true, ..SearchState::default() };
        let (next, effects) = state.step(&cfg(), SearchEvent::Submit);

        assert!(!next.dropdown_visible);
        assert_eq!(effects, vec![SearchEffect::CancelTimer]);
    }

    #[test]
    fn dismiss_keeps_query_text() {
        let state = SearchState {
            query: "Marseille".into(),
            suggestions: vec![place(1, "Marseille")],
            phase: SearchPhase::Resolved,
            dropdown_visible: true,
            generation: 2,
        };

        let (next, _) = state.step(&cfg(), SearchEvent::Dismiss);

        assert_eq!(next.query, "Marseille");
        assert_eq!(next.phase, SearchPhase::Idle);
        assert!(!next.dropdown_visible);

        let (refocused, _) = next.step(&cfg(), SearchEvent::Focus);
        assert!(refocused.dropdown_visible);
    }

    #[test]
    fn focus_without_suggestions_keeps_dropdown_hidden() {
        let (next, _) = SearchState::default().step(&cfg(), SearchEvent::Focus);
        assert!(!next.dropdown_visible);
    }

    #[tokio::test(start_paused = true)]
    async fn short_query_never_calls_provider() {
        let geo = Arc::new(RecordingGeocoder::default());
        let mut session = SearchSession::new(Arc::clone(&geo), cfg());

        session.input("P");
        session.input("Pa");
        session.input("  Pa  ");

        assert!(!session.is_busy());
        assert!(session.next_update().await.is_none());
        tokio::time::advance(Duration::from_secs(5)).await;

        assert!(geo.calls().is_empty());
        assert!(!session.state().dropdown_visible);
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_keystrokes_issue_a_single_search() {
        let geo = Arc::new(RecordingGeocoder::default());
        let mut session = SearchSession::new(Arc::clone(&geo), cfg());

        for text in ["Tou", "Toul", "Toulo", "Toulou", "Toulouse"] {
            session.input(text);
            tokio::time::advance(Duration::from_millis(200)).await;
        }
        assert!(geo.calls().is_empty());

        let state = session.settle().await;

        assert_eq!(state.phase, SearchPhase::Resolved);
        assert!(state.dropdown_visible);
        assert_eq!(state.suggestions[0].name, "Toulouse");
        assert_eq!(geo.calls(), vec![("Toulouse".to_string(), 5)]);
    }

    #[tokio::test(start_paused = true)]
    async fn search_waits_for_the_full_debounce() {
        let geo = Arc::new(RecordingGeocoder::default());
        let mut session = SearchSession::new(Arc::clone(&geo), cfg());

        let started = Instant::now();
        session.input("Nice");
        let state = session.next_update().await.expect("timer fires");

        assert_eq!(state.phase, SearchPhase::Searching);
        assert!(started.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_stale_response_is_discarded() {
        let geo = Arc::new(RecordingGeocoder::default());
        geo.slow.lock().push(("Lyon".into(), Duration::from_secs(3)));
        let mut session = SearchSession::new(Arc::clone(&geo), cfg());

        session.input("Lyon");
        let state = session.next_update().await.expect("timer fires");
        assert_eq!(state.phase, SearchPhase::Searching);

        // new query while the Lyon request is still in flight
        session.input("Lille");
        let state = session.settle().await;

        assert_eq!(geo.calls().len(), 2);
        assert_eq!(state.query, "Lille");
        assert!(state.suggestions.iter().all(|s| s.name.starts_with("Lille")));
    }

    #[tokio::test(start_paused = true)]
    async fn no_match_resolves_with_visible_dropdown() {
        let geo = Arc::new(RecordingGeocoder::default());
        let mut session = SearchSession::new(Arc::clone(&geo), cfg());

        session.input("xyznotacity");
        let state = session.settle().await;

        assert!(state.shows_no_results());
    }

    #[tokio::test(start_paused = true)]
    async fn dismiss_cancels_pending_timer() {
        let geo = Arc::new(RecordingGeocoder::default());
        let mut session = SearchSession::new(Arc::clone(&geo), cfg());

        session.input("Rennes");
        session.dismiss();
        tokio::time::advance(Duration::from_secs(2)).await;

        assert!(session.next_update().await.is_none());
        assert!(geo.calls().is_empty());
        assert_eq!(session.state().query, "Rennes");
    }

    #[tokio::test(start_paused = true)]
    async fn select_after_results_returns_route() {
        let geo = Arc::new(RecordingGeocoder::default());
        let mut session = SearchSession::new(Arc::clone(&geo), cfg());

        session.input("Brest");
        session.settle().await;
        let route = session.select(1).expect("second suggestion exists");

        assert_eq!(route.city, "Brest-sur-Mer");
        assert!(!session.state().dropdown_visible);
    }

    #[tokio::test(start_paused = true)]
    async fn finished_line_searches_without_waiting() {
        let geo = Arc::new(RecordingGeocoder::default());
        let mut session = SearchSession::new(Arc::clone(&geo), cfg().without_debounce());
        let started = Instant::now();

        session.input("Toulouse");
        let state = session.settle().await;

        assert_eq!(state.phase, SearchPhase::Resolved);
        assert_eq!(state.suggestions.len(), 2);
        assert_eq!(Instant::now(), started);
        assert_eq!(geo.calls(), vec![("Toulouse".to_string(), 5)]);
    }

    #[test]
    fn without_debounce_keeps_limits() {
        let config = cfg().without_debounce();
        assert_eq!(config.debounce, Duration::ZERO);
        assert_eq!(config.min_query_len, 3);
        assert_eq!(config.limit, 5);
    }
}
