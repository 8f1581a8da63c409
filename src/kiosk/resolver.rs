//! Resolves a route code or id into the route's stops

use tracing::{info, warn};

use super::{
    bstp::extract_stops,
    page_source::{FetchError, PageSource},
    route_lookup::{find_route_id, list_routes},
};
use crate::model::{RouteOption, StopRecord};

#[derive(thiserror::Error, Debug)]
pub enum ResolveError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("could not find route id for code \"{0}\" in the dropdown")]
    RouteNotFound(String),
}

/// Gets the stops of a route.
///
/// A purely numeric `route` is used as the internal route id directly,
/// anything else is looked up in the kiosk route dropdown first.
/// A route page without stop data gives an empty list.
#[tracing::instrument(err, skip(source))]
pub async fn resolve_stops<S: PageSource>(
    source: &S,
    route: &str,
) -> Result<Vec<StopRecord>, ResolveError> {
    let route_id = if is_route_id(route) {
        route.to_string()
    } else {
        let kiosk_html = source.fetch_page("/kiosk").await?;
        find_route_id(&kiosk_html, route)
            .ok_or_else(|| ResolveError::RouteNotFound(route.to_string()))?
    };

    info!("resolved {route} to route id {route_id}");

    let route_html = source
        .fetch_page(&format!("/kiosk?bus=&route={route_id}"))
        .await?;

    let stops = match extract_stops(&route_html) {
        Ok(Some(stops)) => stops,
        Ok(None) => {
            info!("route {route_id} has no stop data");
            vec![]
        }
        Err(e) => {
            warn!("couldn't parse stop data of route {route_id}: {e}");
            vec![]
        }
    };

    info!("got {} stops", stops.len());

    Ok(stops)
}

/// Lists the routes offered by the kiosk dropdown.
#[tracing::instrument(err, skip(source))]
pub async fn fetch_routes<S: PageSource>(source: &S) -> Result<Vec<RouteOption>, ResolveError> {
    let kiosk_html = source.fetch_page("/kiosk").await?;
    let routes = list_routes(&kiosk_html);

    info!("got {} routes", routes.len());

    Ok(routes)
}

fn is_route_id(route: &str) -> bool {
    !route.is_empty() && route.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, sync::Mutex};

    use super::*;

    const KIOSK_HTML: &str = r#"<select id="route"><option value="">-</option><option value="673">T580</option></select>"#;
    const ROUTE_HTML: &str = r#"<script>
var bstp = [{'stop_id':'1','stop_name':'A','lat':'1.23','lng':'4.56','dr':'N','zone':'Z'},{'stop_id':'2','stop_name':'B','lat':'1.24','lng':'4.57','dr':'N','zone':'Z'}];
</script>"#;

    /// Serves canned pages and remembers what was asked for
    #[derive(Default)]
    struct FakeKiosk {
        pages: HashMap<String, Result<String, u16>>,
        requested: Mutex<Vec<String>>,
    }

    impl FakeKiosk {
        fn with_page(mut self, path: &str, page: Result<&str, u16>) -> Self {
            self.pages.insert(path.to_string(), page.map(str::to_string));
            self
        }

        fn requested(&self) -> Vec<String> {
            self.requested.lock().unwrap().clone()
        }
    }

    impl PageSource for FakeKiosk {
        async fn fetch_page(&self, path_and_query: &str) -> Result<String, FetchError> {
            self.requested.lock().unwrap().push(path_and_query.to_string());

            match self.pages.get(path_and_query) {
                Some(Ok(html)) => Ok(html.clone()),
                Some(Err(status)) => Err(FetchError::Status {
                    status: *status,
                    url: path_and_query.to_string(),
                }),
                None => Err(FetchError::Status {
                    status: 404,
                    url: path_and_query.to_string(),
                }),
            }
        }
    }

    #[tokio::test]
    async fn numeric_route_skips_listing() -> Result<(), anyhow::Error> {
        let kiosk = FakeKiosk::default().with_page("/kiosk?bus=&route=673", Ok(ROUTE_HTML));

        let stops = resolve_stops(&kiosk, "673").await?;

        assert_eq!(stops.len(), 2);
        assert_eq!(kiosk.requested(), vec!["/kiosk?bus=&route=673"]);

        Ok(())
    }

    #[tokio::test]
    async fn route_code_is_looked_up() -> Result<(), anyhow::Error> {
        let kiosk = FakeKiosk::default()
            .with_page("/kiosk", Ok(KIOSK_HTML))
            .with_page("/kiosk?bus=&route=673", Ok(ROUTE_HTML));

        let stops = resolve_stops(&kiosk, "T580").await?;

        assert_eq!(kiosk.requested(), vec!["/kiosk", "/kiosk?bus=&route=673"]);
        assert_eq!(stops[0].id, "1");
        assert_eq!(stops[0].name, "A");
        assert_eq!(stops[0].lat, 1.23);
        assert_eq!(stops[1].lng, 4.57);

        Ok(())
    }

    #[tokio::test]
    async fn unknown_code_is_lookup_error() {
        let kiosk = FakeKiosk::default().with_page("/kiosk", Ok(KIOSK_HTML));

        let err = resolve_stops(&kiosk, "X999").await.unwrap_err();

        assert!(matches!(err, ResolveError::RouteNotFound(code) if code == "X999"));
        assert_eq!(kiosk.requested(), vec!["/kiosk"]);
    }

    #[tokio::test]
    async fn page_without_stops_is_empty() -> Result<(), anyhow::Error> {
        let kiosk = FakeKiosk::default()
            .with_page("/kiosk?bus=&route=1", Ok("<html><body>No route</body></html>"));

        assert!(resolve_stops(&kiosk, "1").await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn malformed_stops_are_empty() -> Result<(), anyhow::Error> {
        let kiosk = FakeKiosk::default().with_page("/kiosk?bus=&route=1", Ok("var bstp = [{'a':"));

        assert!(resolve_stops(&kiosk, "1").await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn deeply_nested_stops_are_empty() -> Result<(), anyhow::Error> {
        let page = format!("<script>var bstp = {};</script>", "[".repeat(200_000));
        let kiosk = FakeKiosk::default().with_page("/kiosk?bus=&route=1", Ok(&page));

        assert!(resolve_stops(&kiosk, "1").await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn listing_status_is_transport_error() {
        let kiosk = FakeKiosk::default().with_page("/kiosk", Err(503));

        let err = resolve_stops(&kiosk, "T580").await.unwrap_err();

        match err {
            ResolveError::Fetch(e) => assert_eq!(e.status(), Some(503)),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn route_page_status_is_transport_error() {
        let kiosk = FakeKiosk::default()
            .with_page("/kiosk", Ok(KIOSK_HTML))
            .with_page("/kiosk?bus=&route=673", Err(500));

        let err = resolve_stops(&kiosk, "T580").await.unwrap_err();

        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn lists_routes() -> Result<(), anyhow::Error> {
        let kiosk = FakeKiosk::default().with_page("/kiosk", Ok(KIOSK_HTML));

        let routes = fetch_routes(&kiosk).await?;

        assert_eq!(
            routes,
            vec![RouteOption {
                id: "673".into(),
                code: "T580".into()
            }]
        );

        Ok(())
    }
}
