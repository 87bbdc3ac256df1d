//! HTTP server implementation
//!
//! hyper http1 with TokioIo; one spawned task per connection. Route modules
//! each own a prefix and are tried in order until one claims the request.

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::auth::JwtValidator;
use crate::config::Args;
use crate::db::schemas::{
    HerdDoc, ReflectionDoc, UserDoc, HERD_COLLECTION, REFLECTION_COLLECTION, USER_COLLECTION,
};
use crate::db::{MongoClient, MongoCollection};
use crate::routes;
use crate::routes::helpers::{error_response, BoxBody};
use crate::services::FeedService;
use crate::types::{PastureError, Result};

/// Shared application state, built once at startup and cloned into each
/// connection task behind an Arc
pub struct AppState {
    pub args: Args,
    pub mongo: MongoClient,
    pub jwt: JwtValidator,
    pub users: MongoCollection<UserDoc>,
    pub herds: MongoCollection<HerdDoc>,
    pub reflections: MongoCollection<ReflectionDoc>,
    pub feed: FeedService,
}

impl AppState {
    /// Wire up collections and services against a connected client
    pub async fn new(args: Args, mongo: MongoClient) -> Result<Self> {
        let users = mongo.collection::<UserDoc>(USER_COLLECTION).await?;
        let herds = mongo.collection::<HerdDoc>(HERD_COLLECTION).await?;
        let reflections = mongo
            .collection::<ReflectionDoc>(REFLECTION_COLLECTION)
            .await?;

        let jwt = match &args.jwt_secret {
            Some(secret) => JwtValidator::new(secret.clone(), args.jwt_expiry_seconds)?,
            None if args.dev_mode => JwtValidator::new_dev(),
            None => {
                return Err(PastureError::Config(
                    "JWT_SECRET is required in production mode".into(),
                ))
            }
        };

        let feed = FeedService::new(users.clone(), herds.clone(), reflections.clone());

        Ok(Self {
            args,
            mongo,
            jwt,
            users,
            herds,
            reflections,
            feed,
        })
    }
}

/// Accept loop. Runs until ctrl-c, then stops accepting and returns so main
/// can drop the Mongo client.
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!("Pasture listening on {}", state.args.listen);
    if state.args.dev_mode {
        warn!("Development mode enabled - using the built-in dev JWT secret");
    }

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, addr)) => {
                        let state = Arc::clone(&state);
                        tokio::spawn(async move {
                            let io = TokioIo::new(stream);

                            let service = service_fn(move |req| {
                                let state = Arc::clone(&state);
                                async move { handle_request(state, addr, req).await }
                            });

                            if let Err(err) = http1::Builder::new()
                                .preserve_header_case(true)
                                .title_case_headers(true)
                                .serve_connection(io, service)
                                .await
                            {
                                error!("Error serving connection from {}: {:?}", addr, err);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Error accepting connection: {:?}", e);
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received, closing listener");
                break;
            }
        }
    }

    Ok(())
}

async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> std::result::Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    info!("[{}] {} {}", addr, method, path);

    // Utility endpoints outside the /api/v1 prefix
    match (&method, path.as_str()) {
        (&Method::GET, "/") => return Ok(routes::root_banner()),
        (&Method::GET, "/health") | (&Method::GET, "/healthz") => {
            return Ok(routes::health_check())
        }
        (&Method::GET, "/version") => return Ok(routes::version_info()),
        _ => {}
    }

    // Application routes; each dispatcher owns one prefix. The request is
    // consumed by the dispatcher, so the prefix decides which one runs.
    let handled = if path.starts_with("/api/v1/auth") {
        routes::handle_auth_request(req, Arc::clone(&state)).await
    } else if path.starts_with("/api/v1/users") {
        routes::handle_users_request(req, Arc::clone(&state)).await
    } else if path.starts_with("/api/v1/herds") {
        routes::handle_herds_request(req, Arc::clone(&state)).await
    } else if path.starts_with("/api/v1/reflections") {
        routes::handle_reflections_request(req, Arc::clone(&state)).await
    } else if path.starts_with("/api/v1/notifications") {
        routes::handle_notifications_request(req, Arc::clone(&state)).await
    } else {
        None
    };

    if let Some(response) = handled {
        return Ok(response);
    }

    Ok(error_response(&PastureError::NotFound(format!(
        "No route for {} {}",
        method, path
    ))))
}
