use super::*;
use crate::fixtures::{order, order_at};
use chrono::NaiveDate;

fn ids(orders: &[&Order]) -> Vec<String> {
    orders.iter().map(|o| o.order_id.to_string()).collect()
}

fn sample() -> Vec<Order> {
    vec![
        order("A1", OrderStatus::Pending),
        order("A2", OrderStatus::Dispatched),
        order("A3", OrderStatus::Cancelled),
        order("B12", OrderStatus::Fullfilled),
        order("A21", OrderStatus::Pending),
    ]
}

#[test]
fn search_matches_order_id_substring() {
    let orders = vec![
        order("A1", OrderStatus::Pending),
        order("A2", OrderStatus::Dispatched),
        order("A3", OrderStatus::Cancelled),
    ];
    let criteria = FilterCriteria {
        search_text: "A2".to_string(),
        ..FilterCriteria::default()
    };

    assert_eq!(ids(&filter_orders(&orders, &criteria)), vec!["A2"]);
}

#[test]
fn search_is_case_sensitive() {
    let orders = sample();
    let criteria = FilterCriteria {
        search_text: "a2".to_string(),
        ..FilterCriteria::default()
    };
    assert!(filter_orders(&orders, &criteria).is_empty());
}

#[test]
fn default_criteria_keep_every_order_in_store_order() {
    let orders = sample();
    let criteria = FilterCriteria::default();
    assert!(criteria.is_unfiltered());
    assert_eq!(
        ids(&filter_orders(&orders, &criteria)),
        vec!["A1", "A2", "A3", "B12", "A21"]
    );
}

#[test]
fn empty_store_yields_nothing() {
    let criteria = FilterCriteria {
        status: StatusFilter::Only(OrderStatus::Pending),
        search_text: "A".to_string(),
        ..FilterCriteria::default()
    };
    assert!(filter_orders(&[], &criteria).is_empty());
    assert!(filter_orders(&[], &FilterCriteria::default()).is_empty());
    assert!(filter_positions(&[], &FilterCriteria::default()).is_empty());
}

#[test]
fn status_filter_selects_one_status() {
    let orders = sample();
    let criteria = FilterCriteria {
        status: StatusFilter::Only(OrderStatus::Pending),
        ..FilterCriteria::default()
    };
    assert_eq!(ids(&filter_orders(&orders, &criteria)), vec!["A1", "A21"]);
}

#[test]
fn fulfillment_filter_is_derived_from_status() {
    let orders = sample();
    let fulfilled = FilterCriteria {
        fulfillment: FulfillmentFilter::Fullfilled,
        ..FilterCriteria::default()
    };
    let unfulfilled = FilterCriteria {
        fulfillment: FulfillmentFilter::UnFullfilled,
        ..FilterCriteria::default()
    };

    assert_eq!(ids(&filter_orders(&orders, &fulfilled)), vec!["B12"]);
    assert_eq!(
        ids(&filter_orders(&orders, &unfulfilled)),
        vec!["A1", "A2", "A3", "A21"]
    );
}

#[test]
fn all_predicates_must_hold() {
    let orders = sample();
    let criteria = FilterCriteria {
        status: StatusFilter::Only(OrderStatus::Pending),
        fulfillment: FulfillmentFilter::UnFullfilled,
        search_text: "A2".to_string(),
        ..FilterCriteria::default()
    };
    assert_eq!(ids(&filter_orders(&orders, &criteria)), vec!["A21"]);

    let contradictory = FilterCriteria {
        status: StatusFilter::Only(OrderStatus::Fullfilled),
        fulfillment: FulfillmentFilter::UnFullfilled,
        ..FilterCriteria::default()
    };
    assert!(filter_orders(&orders, &contradictory).is_empty());
}

#[test]
fn date_filter_ignores_time_of_day() {
    let orders = vec![order_at("A1", OrderStatus::Pending, "2024-03-10T18:00:00Z")];

    let same_day = FilterCriteria::default()
        .with_date_at("2024-03-10T02:15:00Z".parse().expect("instant"));
    assert_eq!(ids(&filter_orders(&orders, &same_day)), vec!["A1"]);

    let next_day = FilterCriteria {
        date: NaiveDate::from_ymd_opt(2024, 3, 11),
        ..FilterCriteria::default()
    };
    assert!(filter_orders(&orders, &next_day).is_empty());
}

#[test]
fn date_filter_uses_the_configured_offset() {
    let orders = vec![order_at("A1", OrderStatus::Pending, "2024-03-10T18:00:00Z")];
    let plus_seven = FixedOffset::east_opt(7 * 3600).expect("offset");

    let criteria = FilterCriteria {
        date: NaiveDate::from_ymd_opt(2024, 3, 11),
        ..FilterCriteria::default()
    }
    .with_offset(plus_seven);
    assert_eq!(ids(&filter_orders(&orders, &criteria)), vec!["A1"]);
}

#[test]
fn positions_follow_store_order() {
    let orders = sample();
    let criteria = FilterCriteria {
        search_text: "A".to_string(),
        ..FilterCriteria::default()
    };
    assert_eq!(filter_positions(&orders, &criteria), vec![0, 1, 2, 4]);
}

#[test]
fn filters_parse_from_cli_words() {
    assert_eq!("all".parse::<StatusFilter>(), Ok(StatusFilter::All));
    assert_eq!(
        "dispatched".parse::<StatusFilter>(),
        Ok(StatusFilter::Only(OrderStatus::Dispatched))
    );
    assert!("lost".parse::<StatusFilter>().is_err());
    assert_eq!(
        "unfulfilled".parse::<FulfillmentFilter>(),
        Ok(FulfillmentFilter::UnFullfilled)
    );
    assert_eq!(
        "Fullfilled".parse::<FulfillmentFilter>(),
        Ok(FulfillmentFilter::Fullfilled)
    );
}
