mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use floorline::api::MenuDish;
use floorline::lookup::{load_menu, CustomerSearch, LookupState, MenuState};

use common::*;

fn searches(api: &FakeApi) -> Vec<String> {
    api.searches.lock().unwrap().clone()
}

#[tokio::test(start_paused = true)]
async fn typing_is_debounced() {
    let api = FakeApi::new();
    api.customers
        .lock()
        .unwrap()
        .extend([customer("Ada Lovelace", 0.4), customer("Adam Smith", 0.9)]);
    let search = CustomerSearch::new(api.clone(), "44");

    search.set_query("ad");
    tokio::time::sleep(Duration::from_millis(100)).await;
    search.set_query("ada");
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(searches(&api).is_empty());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(searches(&api), vec!["ada".to_string()]);
    match search.state() {
        LookupState::Ready { query, matches } => {
            assert_eq!(query, "ada");
            // Best match first.
            assert_eq!(matches[0].name, "Adam Smith");
            assert_eq!(matches.len(), 2);
        }
        other => panic!("expected results, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn short_queries_stay_idle() {
    let api = FakeApi::new();
    let search = CustomerSearch::new(api.clone(), "44");

    search.set_query("  a ");
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(search.state(), LookupState::Idle);
    assert!(searches(&api).is_empty());
}

#[tokio::test(start_paused = true)]
async fn newer_query_supersedes_in_flight_search() {
    let api = FakeApi::new();
    api.customers
        .lock()
        .unwrap()
        .extend([customer("Ada", 1.0), customer("Grace", 1.0)]);
    *api.search_delay.lock().unwrap() = Some(Duration::from_secs(1));
    let search = CustomerSearch::new(api.clone(), "44");
    let mut updates = search.subscribe();

    search.set_query("ada");
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(
        search.state(),
        LookupState::Loading {
            query: "ada".into()
        }
    );
    let _ = updates.borrow_and_update();

    search.set_query("grace");
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(searches(&api), vec!["ada".to_string(), "grace".to_string()]);
    match search.state() {
        LookupState::Ready { query, matches } => {
            assert_eq!(query, "grace");
            assert_eq!(matches.len(), 1);
            assert_eq!(matches[0].name, "Grace");
        }
        other => panic!("expected grace results, got {other:?}"),
    }
    assert!(updates.has_changed().unwrap());
}

#[tokio::test(start_paused = true)]
async fn failed_search_reports_once() {
    let api = FakeApi::new();
    api.fail_search.store(true, Ordering::SeqCst);
    let search = CustomerSearch::new(api.clone(), "44");

    search.set_query("ada");
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(matches!(search.state(), LookupState::Failed { ref query, .. } if query == "ada"));

    search.clear();
    assert_eq!(search.state(), LookupState::Idle);
}

#[tokio::test(start_paused = true)]
async fn clear_cancels_pending_search() {
    let api = FakeApi::new();
    let search = CustomerSearch::new(api.clone(), "44");

    search.set_query("ada");
    search.clear();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(searches(&api).is_empty());
    assert_eq!(search.state(), LookupState::Idle);
}

#[tokio::test]
async fn menu_loads_or_degrades() {
    let api = FakeApi::new();
    assert!(matches!(load_menu(api.as_ref()).await, MenuState::Unavailable(_)));

    *api.menu.lock().unwrap() = Some(vec![MenuDish {
        dish_id: ulid::Ulid::new(),
        name: "Roast beef".into(),
        price: 18.5,
        category: "main".into(),
    }]);
    let menu = load_menu(api.as_ref()).await;
    assert_eq!(menu.dishes().len(), 1);
}
