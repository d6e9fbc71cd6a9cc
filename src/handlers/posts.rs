//! Post pages and form submissions.

use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use super::{back_to, not_found, post_id, render};
use crate::app::App;
use crate::error::AppError;
use crate::middleware::auth::current_user;
use crate::model::{NewPost, PostId, PostUpdate};
use crate::request::Request;
use crate::response::Response;
use crate::session::SessionUser;
use crate::view::{EditForm, Empty, PostList};

#[derive(Deserialize)]
struct PostForm {
    title: String,
    content: String,
}

impl PostForm {
    fn validate(self) -> Result<NewPost, AppError> {
        require("title", &self.title)?;
        require("content", &self.content)?;
        Ok(NewPost { title: self.title, content: self.content })
    }
}

/// Edit submissions may leave a field out; present fields must not be blank.
#[derive(Deserialize)]
struct EditSubmission {
    title: Option<String>,
    content: Option<String>,
}

impl EditSubmission {
    fn validate(self) -> Result<PostUpdate, AppError> {
        if let Some(title) = &self.title {
            require("title", title)?;
        }
        if let Some(content) = &self.content {
            require("content", content)?;
        }
        Ok(PostUpdate { title: self.title, content: self.content })
    }
}

fn require(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(())
}

// GET /
pub async fn index(app: Arc<App>, req: Request) -> Result<Response, AppError> {
    let user = current_user(&app, &req).await;
    let posts = app.posts.list().await?;
    let data = PostList { posts: posts.into_iter().map(Into::into).collect() };
    render(&app, "index", &req, user.as_ref(), data)
}

// GET /dashboard
pub async fn dashboard(app: Arc<App>, req: Request, user: SessionUser) -> Result<Response, AppError> {
    let posts = app.posts.list_by_author(user.id).await?;
    let data = PostList { posts: posts.into_iter().map(Into::into).collect() };
    render(&app, "dashboard", &req, Some(&user), data)
}

// GET /create
pub async fn new_form(app: Arc<App>, req: Request, user: SessionUser) -> Result<Response, AppError> {
    render(&app, "create", &req, Some(&user), Empty {})
}

// POST /create
pub async fn create(app: Arc<App>, req: Request, user: SessionUser) -> Response {
    let created = async {
        let post = req.form::<PostForm>()?.validate()?;
        Ok::<_, AppError>(app.posts.create(post, Some(user.id)).await?)
    }
    .await;

    match created {
        Ok(id) => {
            info!(post = %id, author = %user.username, "post created");
            Response::redirect("/")
        }
        Err(e) => back_to("/create", &e),
    }
}

// GET /edit/{id}
pub async fn edit_form(app: Arc<App>, req: Request, user: SessionUser) -> Result<Response, AppError> {
    let post = match post_id(&req) {
        Ok(id) => app.posts.get(id).await.map_err(AppError::from),
        Err(e) => Err(e),
    };
    match post {
        Ok(post) => render(&app, "edit", &req, Some(&user), EditForm { post: post.into() }),
        Err(AppError::NotFound) => not_found(&app, Some(&user)),
        Err(e) => Err(e),
    }
}

// POST /edit/{id}
pub async fn update(app: Arc<App>, req: Request, user: SessionUser) -> Response {
    let id = match post_id(&req) {
        Ok(id) => id,
        Err(e) => return back_to("/", &e),
    };
    let updated = async {
        let update = req.form::<EditSubmission>()?.validate()?;
        Ok::<_, AppError>(app.posts.update(id, update).await?)
    }
    .await;

    match updated {
        Ok(_) => {
            info!(post = %id, editor = %user.username, "post updated");
            Response::redirect("/")
        }
        Err(e @ AppError::NotFound) => back_to("/", &e),
        Err(e) => back_to(&edit_path(id), &e),
    }
}

// POST /delete/{id}
pub async fn delete(app: Arc<App>, req: Request, user: SessionUser) -> Response {
    // Deleting something that is not there leaves the store as requested.
    let Ok(id) = post_id(&req) else { return Response::redirect("/") };
    match app.posts.delete(id).await {
        Ok(()) => {
            info!(post = %id, by = %user.username, "post deleted");
            Response::redirect("/")
        }
        Err(e) => back_to("/", &AppError::from(e)),
    }
}

fn edit_path(id: PostId) -> String {
    format!("/edit/{id}")
}
