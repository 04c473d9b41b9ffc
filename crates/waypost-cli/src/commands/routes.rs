use anyhow::Result;
use colored::Colorize;
use indexmap::IndexMap;
use waypost_router::{Route, RouteExport, Router};

pub fn execute(router: &Router, json: bool) -> Result<()> {
    if json {
        let table: IndexMap<&str, Vec<RouteExport>> = router
            .route_scopes()
            .map(|scope| (scope, router.routes(Some(scope)).iter().map(Route::export).collect()))
            .collect();
        println!("{}", serde_json::to_string_pretty(&table)?);
        return Ok(());
    }

    for name in router.scope_names() {
        if let Some(scope) = router.get_scope(name) {
            println!("{} {}  {}", "scope".blue().bold(), name.cyan(), scope.pattern().dimmed());
        }
    }

    for scope in router.route_scopes() {
        println!();
        let label = if scope.is_empty() { "(root)" } else { scope };
        println!("{}", label.green().bold());

        for (index, route) in router.routes(Some(scope)).iter().enumerate() {
            let marker = if route.is_continuation() { "→" } else { " " };
            println!(
                "  {:>3} {} {}  {}",
                index,
                marker.yellow(),
                route.template().bold(),
                describe(route).dimmed()
            );
        }
    }

    Ok(())
}

fn describe(route: &Route) -> String {
    let mut parts: Vec<String> = route
        .static_params()
        .iter()
        .chain(route.defaults())
        .chain(route.meta())
        .map(|(key, value)| format!("{}={}", key, value))
        .collect();

    if !route.persist().is_empty() {
        parts.push(format!("persist=[{}]", route.persist().join(", ")));
    }
    if route.has_handler() {
        parts.push("handler".to_string());
    }

    parts.join(" ")
}
