use super::error::*;
use super::router::Caller;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::{Clock, PostRepo};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use warp::{self, reject};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(code: ApiErrorCode, message: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

pub async fn login(
    body: LoginRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let login_input = LoginInput {
        username: body.username,
        password: body.password,
    };
    let login_result = auth_service
        .login(login_input)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(login_result)))
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

pub async fn register(
    body: RegisterRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let login_result = auth_service
        .register(RegisterInput {
            username: body.username,
            password: body.password,
        })
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::with_status(
        warp::reply::json(&ApiResponse::ok(login_result)),
        warp::http::StatusCode::CREATED,
    ))
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

pub async fn refresh(
    body: RefreshRequest,
    session_issuer: Arc<dyn SessionIssuer>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let tokens = session_issuer
        .refresh(&RefreshToken(body.refresh_token))
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(tokens)))
}

pub async fn logout(
    caller: Caller,
    session_issuer: Arc<dyn SessionIssuer>,
) -> Result<impl warp::Reply, warp::Rejection> {
    session_issuer
        .logout(&caller.token)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(())))
}

pub async fn logout_all(
    caller: Caller,
    session_issuer: Arc<dyn SessionIssuer>,
) -> Result<impl warp::Reply, warp::Rejection> {
    session_issuer
        .logout_all(caller.identity.user_id)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(())))
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user_id: UserId,
    pub username: String,
    pub authorities: BTreeSet<String>,
}

pub async fn me(caller: Caller) -> Result<impl warp::Reply, warp::Rejection> {
    let Identity {
        user_id,
        username,
        authorities,
        ..
    } = caller.identity;
    Ok(warp::reply::json(&ApiResponse::ok(MeResponse {
        user_id,
        username,
        authorities,
    })))
}

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub category_id: Option<CategoryId>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: Price,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub media: Vec<PostMedia>,
}

pub async fn create_post(
    body: CreatePostRequest,
    caller: Caller,
    post_repo: Arc<dyn PostRepo>,
    clock: Arc<dyn Clock>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let draft = NewPost {
        author: AuthorRef {
            user_id: caller.identity.user_id,
            username: caller.identity.username,
        },
        category_id: body.category_id,
        title: body.title,
        description: body.description,
        price: body.price,
        location: body.location,
        media: body.media,
    };
    let post = post_repo
        .create(draft, clock.now())
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(post)))
}

fn default_page_size() -> u32 {
    20
}

#[derive(Debug, Deserialize)]
pub struct ListPostsQuery {
    pub status: PostStatus,
    #[serde(default)]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub size: u32,
}

/// Moderation queue: posts in one status, newest first.
pub async fn list_posts(
    query: ListPostsQuery,
    caller: Caller,
    post_repo: Arc<dyn PostRepo>,
) -> Result<impl warp::Reply, warp::Rejection> {
    require_any_authority(&caller.identity, MODERATOR_AUTHORITIES)
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let page = post_repo
        .list_by_status(query.status, PageRequest::new(query.page, query.size))
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(page)))
}

pub async fn approve_post(
    post_id: i64,
    caller: Caller,
    moderation_service: Arc<dyn ModerationService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    require_any_authority(&caller.identity, MODERATOR_AUTHORITIES)
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let post = moderation_service
        .approve(PostId(post_id), caller.identity.user_id)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(post)))
}

#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    #[serde(default)]
    pub reason: String,
}

pub async fn reject_post(
    post_id: i64,
    body: RejectRequest,
    caller: Caller,
    moderation_service: Arc<dyn ModerationService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    require_any_authority(&caller.identity, MODERATOR_AUTHORITIES)
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let post = moderation_service
        .reject(PostId(post_id), caller.identity.user_id, &body.reason)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(post)))
}
