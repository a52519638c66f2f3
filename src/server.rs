use std::time::Instant;

use actix_cors::Cors;
use actix_web::{
    dev::{Server, Service},
    http::header,
    middleware, web, App, HttpServer,
};
use tracing::info;

use crate::{
    configuration::{AppState, Config, State},
    controller::version,
    error::Error,
};

pub async fn server_task(app_state: &AppState<State>) -> Result<(), Error> {
    let app = app_state.clone();
    tokio::spawn(async move {
        let server = init_server(app)?;
        server.await?;
        Ok(())
    })
    .await?
}

/// Routing table of the API.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(version::index);
}

/// CORS policy for `config.allowed_origins`; `*` allows every origin.
fn build_cors(config: &Config) -> Cors {
    let cors_access_all = config.allows_all_origins();
    let allowed = config.allowed_origins.clone();
    Cors::default()
        .allowed_origin_fn(move |origin, _| {
            if cors_access_all {
                return true;
            }
            if let Ok(origin) = origin.to_str() {
                return allowed.iter().any(|item| item == origin);
            }
            false
        })
        .allowed_methods(vec!["GET"])
        .allowed_header(header::ACCEPT)
}

fn init_server(app_state: AppState<State>) -> Result<Server, Error> {
    let host = app_state.config.server_host.to_owned();
    let port = app_state.config.port;

    let server = HttpServer::new(move || {
        let cors = build_cors(&app_state.config);

        App::new()
            .wrap(cors)
            .wrap(middleware::Compress::default())
            .wrap_fn(|req, srv| {
                let method = req.method().to_owned();
                let path = req.path().to_owned();
                let started = Instant::now();
                let fut = srv.call(req);
                async move {
                    let res = fut.await?;
                    info!(
                        "{} {} {} {:?}",
                        method,
                        path,
                        res.status().as_u16(),
                        started.elapsed()
                    );
                    Ok(res)
                }
            })
            .app_data(web::Data::new(app_state.clone()))
            .configure(configure)
    })
    .bind((host.as_str(), port))?
    .run();

    info!("Server listening on {}:{}", host, port);

    Ok(server)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{configuration::ApiVersion, model::Version};
    use actix_web::{http::StatusCode, test};

    fn config(allowed_origins: &[&str]) -> Config {
        Config {
            server_host: "127.0.0.1".to_string(),
            port: 0,
            allowed_origins: allowed_origins
                .iter()
                .map(|origin| origin.to_string())
                .collect(),
            api_version: ApiVersion::new("1.4.2"),
        }
    }

    fn app_state(version: &str) -> AppState<State> {
        let mut config = config(&["*"]);
        config.api_version = ApiVersion::new(version);
        AppState::new(State::new(config))
    }

    #[actix_web::test]
    async fn test_router_serves_version() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(app_state("1.4.2")))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/version").to_request();
        let body: Version = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body.api_version, "1.4.2");
    }

    #[actix_web::test]
    async fn test_router_unknown_path_is_not_found() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(app_state("1.4.2")))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/flags").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_cors_allows_listed_origin_only() {
        let config = config(&["https://a.example"]);
        let app = test::init_service(
            App::new()
                .wrap(build_cors(&config))
                .app_data(web::Data::new(AppState::new(State::new(
                    config.clone(),
                ))))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/version")
            .insert_header((header::ORIGIN, "https://a.example"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "https://a.example"
        );

        let req = test::TestRequest::get()
            .uri("/version")
            .insert_header((header::ORIGIN, "https://evil.example"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }

    #[actix_web::test]
    async fn test_cors_wildcard_allows_any_origin() {
        let config = config(&["*"]);
        let app = test::init_service(
            App::new()
                .wrap(build_cors(&config))
                .app_data(web::Data::new(AppState::new(State::new(
                    config.clone(),
                ))))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/version")
            .insert_header((header::ORIGIN, "https://anywhere.example"))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_some());
    }
}
