use super::error::*;
use super::handler;
use crate::application_port::*;
use crate::domain_model::*;
use crate::server::*;
use std::convert::Infallible;
use std::sync::Arc;
use warp::{Filter, http, reject};

/// An authenticated caller together with the bearer token it presented.
#[derive(Debug, Clone)]
pub struct Caller {
    pub identity: Identity,
    pub token: AccessToken,
}

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let login = warp::post()
        .and(warp::path("login"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and_then(handler::login);

    let register = warp::post()
        .and(warp::path("register"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and_then(handler::register);

    let refresh = warp::post()
        .and(warp::path("refresh"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with(server.session_issuer.clone()))
        .and_then(handler::refresh);

    let logout = warp::post()
        .and(warp::path("logout"))
        .and(warp::path::end())
        .and(with_caller(server.authenticator.clone()))
        .and(with(server.session_issuer.clone()))
        .and_then(handler::logout);

    let logout_all = warp::post()
        .and(warp::path("logout_all"))
        .and(warp::path::end())
        .and(with_caller(server.authenticator.clone()))
        .and(with(server.session_issuer.clone()))
        .and_then(handler::logout_all);

    let me = warp::get()
        .and(warp::path("me"))
        .and(warp::path::end())
        .and(with_caller(server.authenticator.clone()))
        .and_then(handler::me);

    let create_post = warp::post()
        .and(warp::path("posts"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with_caller(server.authenticator.clone()))
        .and(with(server.post_repo.clone()))
        .and(with(server.clock.clone()))
        .and_then(handler::create_post);

    let list_posts = warp::get()
        .and(warp::path("posts"))
        .and(warp::path::end())
        .and(warp::query::<handler::ListPostsQuery>())
        .and(with_caller(server.authenticator.clone()))
        .and(with(server.post_repo.clone()))
        .and_then(handler::list_posts);

    let approve_post = warp::post()
        .and(warp::path!("posts" / i64 / "approve"))
        .and(with_caller(server.authenticator.clone()))
        .and(with(server.moderation_service.clone()))
        .and_then(handler::approve_post);

    let reject_post = warp::post()
        .and(warp::path!("posts" / i64 / "reject"))
        .and(warp::body::json())
        .and(with_caller(server.authenticator.clone()))
        .and(with(server.moderation_service.clone()))
        .and_then(handler::reject_post);

    login
        .or(register)
        .or(refresh)
        .or(logout)
        .or(logout_all)
        .or(me)
        .or(create_post)
        .or(list_posts)
        .or(approve_post)
        .or(reject_post)
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

/// Runs the request authenticator; routes behind it are never reached anonymously.
fn with_caller(
    authenticator: Arc<dyn RequestAuthenticator>,
) -> impl Filter<Extract = (Caller,), Error = warp::Rejection> + Clone {
    warp::header::optional::<String>(http::header::AUTHORIZATION.as_str()).and_then(
        move |header: Option<String>| {
            let authenticator = authenticator.clone();
            async move {
                let mut ctx = RequestContext::new();
                let identity = authenticator
                    .authenticate(header.as_deref(), &mut ctx)
                    .await
                    .and_then(AuthOutcome::require)
                    .map_err(ApiErrorCode::from)
                    .map_err(reject::custom)?;
                let token = bearer_token(header.as_deref())
                    .map(|t| AccessToken(t.to_owned()))
                    .ok_or_else(|| reject::custom(ApiErrorCode::MissingCredential))?;
                Ok::<Caller, warp::Rejection>(Caller { identity, token })
            }
        },
    )
}
