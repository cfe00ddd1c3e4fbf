//! Typeahead customer search and the Sunday lunch menu used while creating
//! bookings.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use ulid::Ulid;

use crate::api::{CustomerMatch, FloorApi, MenuDish};
use crate::limits::{LOOKUP_DEBOUNCE, MIN_SEARCH_QUERY_LEN};
use crate::observability;

#[derive(Debug, Clone, PartialEq)]
pub enum LookupState {
    Idle,
    Loading { query: String },
    Ready { query: String, matches: Vec<CustomerMatch> },
    Failed { query: String, message: String },
}

/// Debounced customer search. Each new query supersedes the previous one:
/// its pending task is aborted and any late result is dropped.
pub struct CustomerSearch {
    api: Arc<dyn FloorApi>,
    country_code: String,
    generation: Arc<AtomicU64>,
    state: Arc<watch::Sender<LookupState>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl CustomerSearch {
    pub fn new(api: Arc<dyn FloorApi>, default_country_code: impl Into<String>) -> Self {
        let (state, _) = watch::channel(LookupState::Idle);
        Self {
            api,
            country_code: default_country_code.into(),
            generation: Arc::new(AtomicU64::new(0)),
            state: Arc::new(state),
            task: Mutex::new(None),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<LookupState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> LookupState {
        self.state.borrow().clone()
    }

    fn supersede(&self) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(task) = self.task.lock().unwrap_or_else(|e| e.into_inner()).take() {
            task.abort();
        }
        generation
    }

    /// Search for `query` after the debounce. Queries shorter than two
    /// characters reset to idle without calling the backend.
    pub fn set_query(&self, query: &str) {
        let generation = self.supersede();
        let query = query.trim().to_string();
        if query.chars().count() < MIN_SEARCH_QUERY_LEN {
            self.state.send_replace(LookupState::Idle);
            return;
        }

        let api = Arc::clone(&self.api);
        let current = Arc::clone(&self.generation);
        let state = Arc::clone(&self.state);
        let country_code = self.country_code.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(LOOKUP_DEBOUNCE).await;
            if current.load(Ordering::SeqCst) != generation {
                return;
            }
            state.send_replace(LookupState::Loading {
                query: query.clone(),
            });

            let result = api.customer_search(&query, &country_code).await;
            if current.load(Ordering::SeqCst) != generation {
                debug!(%query, "dropping superseded customer search");
                metrics::counter!(observability::STALE_RESPONSES_TOTAL, "source" => "customer_search")
                    .increment(1);
                return;
            }
            let next = match result {
                Ok(mut matches) => {
                    matches.sort_by(|a, b| b.score.total_cmp(&a.score));
                    LookupState::Ready { query, matches }
                }
                Err(e) => {
                    warn!(%query, "customer search failed: {e}");
                    LookupState::Failed {
                        query,
                        message: "Customer search is unavailable. Enter the guest's details manually."
                            .into(),
                    }
                }
            };
            state.send_replace(next);
        });
        *self.task.lock().unwrap_or_else(|e| e.into_inner()) = Some(task);
    }

    pub fn clear(&self) {
        self.supersede();
        self.state.send_replace(LookupState::Idle);
    }
}

impl Drop for CustomerSearch {
    fn drop(&mut self) {
        if let Some(task) = self.task.lock().unwrap_or_else(|e| e.into_inner()).take() {
            task.abort();
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MenuState {
    Loaded(Vec<MenuDish>),
    /// The booking can still be made; dishes are taken on the day.
    Unavailable(String),
}

impl MenuState {
    pub fn dishes(&self) -> &[MenuDish] {
        match self {
            MenuState::Loaded(dishes) => dishes,
            MenuState::Unavailable(_) => &[],
        }
    }

    pub fn dish(&self, dish_id: &Ulid) -> Option<&MenuDish> {
        self.dishes().iter().find(|d| d.dish_id == *dish_id)
    }
}

pub async fn load_menu(api: &dyn FloorApi) -> MenuState {
    match api.sunday_lunch_menu().await {
        Ok(dishes) => MenuState::Loaded(dishes),
        Err(e) => {
            warn!("sunday lunch menu unavailable: {e}");
            MenuState::Unavailable("The Sunday lunch menu couldn't be loaded.".into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dish(price: f64) -> MenuDish {
        MenuDish {
            dish_id: Ulid::new(),
            name: "Roast".into(),
            price,
            category: "main".into(),
        }
    }

    #[test]
    fn dishes_resolve_by_id() {
        let beef = dish(18.5);
        let menu = MenuState::Loaded(vec![beef.clone(), dish(6.0)]);
        assert_eq!(menu.dish(&beef.dish_id).map(|d| d.name.as_str()), Some("Roast"));
        assert!(menu.dish(&Ulid::new()).is_none());
    }

    #[test]
    fn unavailable_menu_has_no_dishes() {
        let menu = MenuState::Unavailable("down".into());
        assert!(menu.dishes().is_empty());
        assert!(menu.dish(&Ulid::new()).is_none());
    }
}
