use super::*;
use crate::catalog::{CatalogPrice, InMemoryCatalog};
use crate::lookup::LookupConfig;
use crate::models::{Budget, Quote, QuoteSettings, ResourceKind};
use crate::store::QuoteLedger;
use crate::testing::{self, LOCATION};

const PREPAID: &str = "prepaid";

/// One instance size, on demand at 200 or one year at 50 plus 1500 upfront
fn catalog() -> InMemoryCatalog {
    InMemoryCatalog::new()
        .with_location(LOCATION)
        .with_type(testing::fixed_type("m.large", ResourceKind::Instance, 2.0, 4000.0, 0.0))
        .with_term(testing::term("on-demand", 0.0, false))
        .with_term(testing::term("1y", 12.0, true))
        .with_price(testing::price("large-od", "m.large", "on-demand", LOCATION, 200.0))
        .with_price(CatalogPrice {
            initial_cost: 1500.0,
            ..testing::price("large-1y", "m.large", "1y", LOCATION, 50.0)
        })
}

fn request(name: &str, budget: Option<&str>) -> ResourceRequest {
    let mut request = testing::request(name, 2.0, 4000.0);
    request.budget = budget.map(String::from);
    request.max_quantity = Some(2);
    request
}

/// Four members of the prepaid budget and one resource without budget
fn quote(cap: f64) -> Quote {
    let mut settings = QuoteSettings::new("quote", LOCATION);
    settings.budgets.push(Budget {
        name: PREPAID.into(),
        initial_cost: cap,
        remaining_budget: None,
    });
    let mut resources: Vec<QuoteResource> = (1..=4)
        .map(|id| QuoteResource {
            id,
            request: request(&format!("app-{}", id), Some(PREPAID)),
            price: None,
            cost: FloatingCost::default(),
        })
        .collect();
    resources.push(QuoteResource {
        id: 5,
        request: request("batch", None),
        price: None,
        cost: FloatingCost::default(),
    });
    Quote {
        settings,
        resources,
    }
}

fn leveler(cap: f64) -> (BudgetLeveler, Arc<QuoteLedger>) {
    let ledger = Arc::new(QuoteLedger::from_quote(quote(cap)));
    let leveler = BudgetLeveler::new(
        Arc::new(LookupEngine::new(LookupConfig::default())),
        Arc::new(catalog()),
        ledger.clone(),
    );
    (leveler, ledger)
}

// Same 6325 to 1228 cap cut as the reference quote, on a one-size catalog:
// the reference totals ([2982.4, 5139.2] to [3165.4, 5615.0]) come from a
// provider catalog and resource mix that are not part of this fixture, so
// only the committed count and the direction of the totals are checked.
#[tokio::test]
async fn test_smaller_budget_demotes_committed_terms() {
    let (leveler, ledger) = leveler(6325.0);

    let generous = leveler.level(Some(PREPAID)).await.unwrap();
    assert_eq!(generous.committed_count(), 4);
    assert_eq!(generous.remaining_budget, 325.0);
    assert!(generous.assignments.iter().all(|a| a.price == "large-1y"));
    let before = ledger.total().await.unwrap().cost;
    assert_eq!((before.min, before.max), (200.0, 400.0));

    let tight = leveler.on_budget_cost_changed(PREPAID, 1228.0).await.unwrap();
    assert_eq!(tight.committed_count(), 0);
    assert_eq!(tight.remaining_budget, 1228.0);
    let after = ledger.total().await.unwrap().cost;
    assert_eq!((after.min, after.max), (800.0, 1600.0));
    assert!(after.min > before.min && after.max > before.max);
}

#[tokio::test]
async fn test_budget_capacity_respected() {
    let (leveler, ledger) = leveler(4000.0);
    let outcome = leveler.level(Some(PREPAID)).await.unwrap();

    assert_eq!(outcome.committed_count(), 2);
    let used: f64 = outcome
        .assignments
        .iter()
        .filter(|a| a.committed)
        .map(|a| a.cost.initial)
        .sum();
    assert!(used <= outcome.capacity);
    assert_eq!(outcome.remaining_budget, 1000.0);

    let settings = ledger.settings().await.unwrap();
    assert_eq!(
        settings.find_budget(PREPAID).unwrap().remaining_budget,
        Some(1000.0)
    );
}

#[tokio::test]
async fn test_default_group_never_commits() {
    let (leveler, ledger) = leveler(6325.0);
    let outcome = leveler.level(None).await.unwrap();

    assert_eq!(outcome.budget, None);
    assert_eq!(outcome.assignments.len(), 1);
    assert_eq!(outcome.assignments[0].price, "large-od");
    assert_eq!(outcome.committed_count(), 0);
    assert_eq!(
        ledger.resource(5).await.unwrap().price.as_deref(),
        Some("large-od")
    );
}

#[tokio::test]
async fn test_unknown_budget_is_not_found() {
    let (leveler, _) = leveler(6325.0);
    let err = leveler.level(Some("missing")).await.unwrap_err();
    assert_eq!(err.code(), "not-found-budget");
}

#[tokio::test]
async fn test_membership_change_levels_both_groups() {
    let (leveler, ledger) = leveler(6325.0);
    let outcomes = leveler
        .on_membership_changed(5, Some(PREPAID.into()))
        .await
        .unwrap();

    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].budget, None);
    assert!(outcomes[0].assignments.is_empty());
    assert_eq!(outcomes[1].assignments.len(), 5);
    // 5 * 1500 exceeds the cap, one member stays on demand
    assert_eq!(outcomes[1].committed_count(), 4);
    assert_eq!(ledger.members(Some(PREPAID)).await.unwrap().len(), 5);
}

#[tokio::test]
async fn test_budget_delete_levels_default_group_once() {
    let (leveler, ledger) = leveler(6325.0);
    leveler.level(Some(PREPAID)).await.unwrap();

    let outcome = leveler.on_budget_deleted(PREPAID).await.unwrap();
    assert_eq!(outcome.budget, None);
    assert_eq!(outcome.assignments.len(), 5);
    assert_eq!(outcome.committed_count(), 0);
    assert!(ledger.settings().await.unwrap().budgets.is_empty());
    assert_eq!(ledger.total().await.unwrap().cost.min, 1000.0);
}

#[tokio::test]
async fn test_failure_keeps_earlier_members() {
    let (leveler, ledger) = leveler(6325.0);
    let mut huge = request("app-4", Some(PREPAID));
    huge.cpu = 999.0;
    // Stored behind the leveler's back, as an external edit would
    ledger.update_request(4, huge).await.unwrap();

    let err = leveler.level(Some(PREPAID)).await.unwrap_err();
    assert_eq!(err.code(), "no-match-instance");
    assert_eq!(
        ledger.resource(1).await.unwrap().price.as_deref(),
        Some("large-1y")
    );
    assert_eq!(ledger.resource(4).await.unwrap().price, None);

    // Three members committed at 1500 each
    let settings = ledger.settings().await.unwrap();
    assert_eq!(
        settings.find_budget(PREPAID).unwrap().remaining_budget,
        Some(1825.0)
    );
}

#[tokio::test]
async fn test_inconsistent_quantities_rejected_before_storing() {
    let (leveler, ledger) = leveler(6325.0);
    let mut changed = request("app-2", Some(PREPAID));
    changed.min_quantity = 3;
    changed.max_quantity = Some(1);

    let err = leveler.on_resource_changed(2, changed).await.unwrap_err();
    assert_eq!(err.code(), "constraint-violation");

    let stored = ledger.resource(2).await.unwrap();
    assert_eq!(stored.request.min_quantity, 1);
    assert_eq!(stored.request.max_quantity, Some(2));
    assert_eq!(stored.price, None);

    let outcome = leveler.level(Some(PREPAID)).await.unwrap();
    assert_eq!(outcome.committed_count(), 4);
}

#[tokio::test]
async fn test_unservable_request_rejected_before_storing() {
    let (leveler, ledger) = leveler(6325.0);
    let mut huge = request("app-4", Some(PREPAID));
    huge.cpu = 999.0;

    let err = leveler.on_resource_changed(4, huge).await.unwrap_err();
    assert_eq!(err.code(), "no-match-instance");
    assert_eq!(ledger.resource(4).await.unwrap().request.cpu, 2.0);

    let outcome = leveler.level(Some(PREPAID)).await.unwrap();
    assert_eq!(outcome.assignments.len(), 4);
    assert_eq!(outcome.remaining_budget, 325.0);
}

#[tokio::test]
async fn test_resource_change_relevels_group() {
    let (leveler, ledger) = leveler(6325.0);
    let mut single = request("app-3", Some(PREPAID));
    single.max_quantity = None;

    let outcome = leveler.on_resource_changed(3, single).await.unwrap();
    assert_eq!(outcome.committed_count(), 4);
    assert_eq!(ledger.resource(3).await.unwrap().request.max_quantity, None);
    assert!(ledger.total().await.unwrap().is_unbound());
}

#[tokio::test]
async fn test_refresh_all_covers_every_group() {
    let (leveler, ledger) = leveler(6325.0);
    let leveler = leveler.with_pool(WorkerPool::new(4));
    let outcomes = leveler.refresh_all().await.unwrap();

    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].budget, None);
    assert_eq!(outcomes[1].budget.as_deref(), Some(PREPAID));
    assert_eq!(outcomes[1].committed_count(), 4);

    let total = ledger.total().await.unwrap();
    assert_eq!(total.cost.min, 4.0 * 50.0 + 200.0);
    assert!(!total.is_unbound());
}

#[tokio::test]
async fn test_concurrent_passes_on_one_budget() {
    let (leveler, ledger) = leveler(6325.0);
    let mut tasks = JoinSet::new();
    for _ in 0..8 {
        let leveler = leveler.clone();
        tasks.spawn(async move { leveler.level(Some(PREPAID)).await });
    }
    while let Some(joined) = tasks.join_next().await {
        assert_eq!(joined.unwrap().unwrap().committed_count(), 4);
    }
    assert_eq!(ledger.total().await.unwrap().cost.min, 200.0);
}
