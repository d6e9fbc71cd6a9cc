//! Server-side rendering.
//!
//! Templates live in `templates/` and are compiled into the binary, so a
//! deployment is one file. Handlebars escapes every `{{value}}`, which is
//! what keeps user-supplied titles and content inert.

use handlebars::Handlebars;
use serde::Serialize;

use crate::error::{AppError, Error};
use crate::model::{Post, PostListing};
use crate::session::SessionUser;

const PARTIALS: &[(&str, &str)] = &[
    ("header", include_str!("../templates/header.hbs")),
    ("footer", include_str!("../templates/footer.hbs")),
    ("post_list", include_str!("../templates/post_list.hbs")),
];

const TEMPLATES: &[(&str, &str)] = &[
    ("index", include_str!("../templates/index.hbs")),
    ("dashboard", include_str!("../templates/dashboard.hbs")),
    ("create", include_str!("../templates/create.hbs")),
    ("edit", include_str!("../templates/edit.hbs")),
    ("not_found", include_str!("../templates/not_found.hbs")),
    ("auth/register", include_str!("../templates/auth/register.hbs")),
    ("auth/login", include_str!("../templates/auth/login.hbs")),
];

pub struct Views {
    registry: Handlebars<'static>,
}

impl Views {
    /// Compiles every template. A syntax error is a startup failure.
    pub fn new() -> Result<Self, Error> {
        let mut registry = Handlebars::new();
        for (name, source) in PARTIALS {
            registry.register_partial(name, *source).map_err(Box::new)?;
        }
        for (name, source) in TEMPLATES {
            registry.register_template_string(name, *source).map_err(Box::new)?;
        }
        Ok(Self { registry })
    }

    pub fn render<T: Serialize>(&self, name: &str, data: &T) -> Result<String, AppError> {
        Ok(self.registry.render(name, data)?)
    }
}

/// Data bag shared by every page: who is signed in and any error to show.
#[derive(Serialize)]
pub struct Page<T: Serialize> {
    pub user: Option<UserView>,
    pub error: Option<&'static str>,
    #[serde(flatten)]
    pub data: T,
}

#[derive(Serialize)]
pub struct UserView {
    pub username: String,
}

impl From<&SessionUser> for UserView {
    fn from(user: &SessionUser) -> Self {
        Self { username: user.username.clone() }
    }
}

/// One post as the listing pages show it.
#[derive(Serialize)]
pub struct PostCard {
    pub id: u64,
    pub title: String,
    pub content: String,
    pub author: Option<String>,
    pub created: String,
}

impl From<Post> for PostCard {
    fn from(post: Post) -> Self {
        Self {
            id: post.id.0,
            title: post.title,
            content: post.content,
            author: None,
            created: post.created_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

impl From<PostListing> for PostCard {
    fn from(listing: PostListing) -> Self {
        Self { author: listing.author.map(|u| u.username), ..listing.post.into() }
    }
}

/// For pages that only need the shared header data.
#[derive(Serialize, Default)]
pub struct Empty {}

#[derive(Serialize, Default)]
pub struct PostList {
    pub posts: Vec<PostCard>,
}

#[derive(Serialize)]
pub struct EditForm {
    pub post: PostCard,
}
