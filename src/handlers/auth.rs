//! Registration, login and logout.

use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use super::{back_to, render};
use crate::app::App;
use crate::error::AppError;
use crate::middleware::auth::{current_user, LOGIN_PATH};
use crate::model::User;
use crate::password;
use crate::request::Request;
use crate::response::Response;
use crate::session::{self, COOKIE_NAME};
use crate::view::Empty;

const REGISTER_PATH: &str = "/auth/register";
const DASHBOARD_PATH: &str = "/dashboard";

#[derive(Deserialize)]
struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Usernames are compared after trimming; passwords are taken verbatim.
    fn validate(self) -> Result<Self, AppError> {
        let username = self.username.trim().to_owned();
        if username.is_empty() || self.password.is_empty() {
            return Err(AppError::Validation("username and password are required".into()));
        }
        Ok(Self { username, password: self.password })
    }
}

// GET /auth/register
pub async fn register_form(app: Arc<App>, req: Request) -> Result<Response, AppError> {
    let user = current_user(&app, &req).await;
    render(&app, "auth/register", &req, user.as_ref(), Empty {})
}

// POST /auth/register
pub async fn register(app: Arc<App>, req: Request) -> Response {
    match try_register(&app, &req).await {
        Ok(user) => {
            info!(user = %user.username, id = %user.id, "user registered");
            Response::redirect(LOGIN_PATH)
        }
        Err(e) => back_to(REGISTER_PATH, &e),
    }
}

async fn try_register(app: &App, req: &Request) -> Result<User, AppError> {
    let Credentials { username, password } = req.form::<Credentials>()?.validate()?;
    // Fail fast on a taken name before paying for the hash; insert re-checks atomically.
    if app.users.find_by_username(&username).await?.is_some() {
        return Err(AppError::Taken(format!("username `{username}`")));
    }
    let hash = password::hash_blocking(password).await?;
    Ok(app.users.insert(&username, &hash).await?)
}

// GET /auth/login
pub async fn login_form(app: Arc<App>, req: Request) -> Result<Response, AppError> {
    let user = current_user(&app, &req).await;
    render(&app, "auth/login", &req, user.as_ref(), Empty {})
}

// POST /auth/login
pub async fn login(app: Arc<App>, req: Request) -> Response {
    match try_login(&app, &req).await {
        Ok(user) => {
            if let Some(previous) = req.cookie(COOKIE_NAME) {
                app.sessions.destroy(previous).await;
            }
            let cookie = app.sessions.create(&user).await;
            info!(user = %user.username, "logged in");
            Response::redirect(DASHBOARD_PATH).with_header("set-cookie", &session::set_cookie(&cookie))
        }
        Err(e) => back_to(LOGIN_PATH, &e),
    }
}

async fn try_login(app: &App, req: &Request) -> Result<User, AppError> {
    let Credentials { username, password } = req.form::<Credentials>()?.validate()?;
    let user = app.users.find_by_username(&username).await?.ok_or(AppError::Auth)?;
    if !password::verify_blocking(password, user.password_hash.clone()).await? {
        return Err(AppError::Auth);
    }
    Ok(user)
}

// GET /auth/logout
pub async fn logout(app: Arc<App>, req: Request) -> Response {
    if let Some(cookie) = req.cookie(COOKIE_NAME) {
        if app.sessions.destroy(cookie).await {
            info!("logged out");
        }
    }
    Response::redirect("/").with_header("set-cookie", &session::clear_cookie())
}
