use std::sync::LazyLock;

use itertools::Itertools;
use scraper::{ElementRef, Html, Selector};

use crate::model::RouteOption;

static ROUTE_SELECT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("select#route").expect("valid route select selector"));
static OPTION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("option").expect("valid option selector"));

/// Lists every entry of the kiosk route dropdown.
///
/// If the page has no `<select id="route">`, every `<option>` of the page is used.
pub fn list_routes(html: &str) -> Vec<RouteOption> {
    let document = Html::parse_document(html);

    route_options(&document)
        .into_iter()
        .filter_map(|option| {
            let id = option.attr("value")?.trim();
            if id.is_empty() {
                return None;
            }

            Some(RouteOption {
                id: id.to_string(),
                code: option.text().collect::<String>().trim().to_string(),
            })
        })
        .collect_vec()
}

/// Finds the internal id of the route whose dropdown text is `route_code`,
/// ignoring case and surrounding whitespace.
pub fn find_route_id(html: &str, route_code: &str) -> Option<String> {
    let wanted = route_code.trim().to_lowercase();

    list_routes(html)
        .into_iter()
        .find(|route| route.code.to_lowercase() == wanted)
        .map(|route| route.id)
}

fn route_options(document: &Html) -> Vec<ElementRef<'_>> {
    match document.select(&ROUTE_SELECT).next() {
        Some(select) => select.select(&OPTION).collect_vec(),
        None => document.select(&OPTION).collect_vec(),
    }
}
