use chrono::{Duration, TimeZone, Utc};
use rewear::models::{CatalogItem, Category, Condition, Seller};
use rewear::query::{filter, paginate, sort};
use rewear::seed;
use rewear::SortCriterion;

fn item(id: &str, title: &str, price: u32, upvotes: u32, day: i64) -> CatalogItem {
    CatalogItem {
        id: id.into(),
        title: title.into(),
        description: format!("{title} in good shape"),
        price,
        category: Category::Tops,
        item_type: String::new(),
        size: "M".into(),
        condition: Condition::Good,
        color: String::new(),
        brand: String::new(),
        location: "Unknown".into(),
        tags: vec![],
        images: vec![],
        seller: Seller::placeholder(),
        posted_at: Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap() + Duration::days(day),
        upvotes,
        upvoted_by: (0..upvotes).map(|n| format!("v{n}")).collect(),
        views: 0,
    }
}

fn ids(items: &[CatalogItem]) -> Vec<&str> {
    items.iter().map(|i| i.id.as_str()).collect()
}

#[test]
fn highest_price_first_with_id_tie_break() {
    let items = vec![
        item("b", "Shirt", 50, 0, 0),
        item("c", "Coat", 80, 0, 1),
        item("a", "Scarf", 80, 0, 2),
        item("d", "Socks", 5, 0, 3),
    ];
    let sorted = sort(&items, SortCriterion::EcoPointsHigh);
    assert_eq!(sorted[0].price, items.iter().map(|i| i.price).max().unwrap());
    assert_eq!(ids(&sorted), vec!["a", "c", "b", "d"]);

    assert_eq!(ids(&sort(&items, SortCriterion::EcoPointsLow)), vec!["d", "b", "a", "c"]);
}

#[test]
fn dates_names_and_votes_order_totally() {
    let items = vec![
        item("3", "beta", 10, 4, 2),
        item("1", "Alpha", 10, 9, 0),
        item("2", "Alpha", 10, 4, 2),
    ];
    assert_eq!(ids(&sort(&items, SortCriterion::Newest)), vec!["2", "3", "1"]);
    assert_eq!(ids(&sort(&items, SortCriterion::Oldest)), vec!["1", "2", "3"]);
    assert_eq!(ids(&sort(&items, SortCriterion::NameAsc)), vec!["1", "2", "3"]);
    assert_eq!(ids(&sort(&items, SortCriterion::NameDesc)), vec!["3", "1", "2"]);
    assert_eq!(ids(&sort(&items, SortCriterion::Upvotes)), vec!["1", "2", "3"]);
}

#[test]
fn name_sort_ignores_case() {
    let items = vec![
        item("1", "Wool Coat", 10, 1, 0),
        item("2", "denim jacket", 10, 1, 0),
        item("3", "Alpaca Scarf", 10, 1, 0),
        item("4", "Denim Jacket", 10, 1, 0),
    ];
    let titles = |v: Vec<CatalogItem>| v.into_iter().map(|i| i.title).collect::<Vec<_>>();
    assert_eq!(
        titles(sort(&items, SortCriterion::NameAsc)),
        vec!["Alpaca Scarf", "Denim Jacket", "denim jacket", "Wool Coat"]
    );
    assert_eq!(
        titles(sort(&items, SortCriterion::NameDesc)),
        vec!["Wool Coat", "denim jacket", "Denim Jacket", "Alpaca Scarf"]
    );
}

#[test]
fn empty_search_returns_everything_in_order() {
    let items = seed::catalog();
    assert_eq!(filter(&items, ""), items);
    assert_eq!(filter(&items, "   "), items);
}

#[test]
fn search_matches_title_description_and_tags() {
    let items = seed::catalog();
    // tag only
    assert_eq!(ids(&filter(&items, "GALA")), vec!["10"]);
    // description only
    assert_eq!(ids(&filter(&items, "nike air")), vec!["6"]);
    assert!(filter(&items, "tuxedo").is_empty());
}

#[test]
fn out_of_range_page_is_clamped_to_last() {
    let items: Vec<_> = (0..20).map(|n| item(&format!("{n:02}"), "Tee", 10, 0, n)).collect();
    let last = paginate(&items, 8, 3);
    let clamped = paginate(&items, 8, 999);
    assert_eq!(clamped.total_pages, 3);
    assert_eq!(clamped.page, 3);
    assert_eq!(clamped.items, last.items);
    assert_eq!(clamped.items.len(), 4);
}

#[test]
fn denim_search_sorted_by_name() {
    let catalog = vec![
        item("1", "Denim Overalls", 60, 0, 0),
        item("2", "Linen Shirt", 30, 0, 1),
        item("3", "Wool Beanie", 15, 0, 2),
    ];
    let out = sort(&filter(&catalog, "denim"), SortCriterion::NameAsc);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].title, "Denim Overalls");
}
