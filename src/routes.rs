//! The dispatch table: verb + path → handler.

use std::future::Future;
use std::sync::Arc;

use crate::app::App;
use crate::handler::Handler;
use crate::handlers::{auth, posts};
use crate::health;
use crate::method::Method;
use crate::middleware::auth::require_session;
use crate::request::Request;
use crate::response::IntoResponse;
use crate::router::Router;

/// Binds a state-taking handler to `app`, producing a plain route handler.
pub fn with_app<F, Fut, R>(app: &Arc<App>, handler: F) -> impl Handler
where
    F: Fn(Arc<App>, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    let app = Arc::clone(app);
    move |req: Request| handler(Arc::clone(&app), req)
}

/// Every route the blog serves. Write routes sit behind the session gate.
pub fn routes(app: Arc<App>) -> Router {
    Router::new()
        .on(Method::Get,  "/",               with_app(&app, posts::index))
        .on(Method::Get,  "/dashboard",      require_session(&app, posts::dashboard))
        .on(Method::Get,  "/create",         require_session(&app, posts::new_form))
        .on(Method::Post, "/create",         require_session(&app, posts::create))
        .on(Method::Get,  "/edit/{id}",      require_session(&app, posts::edit_form))
        .on(Method::Post, "/edit/{id}",      require_session(&app, posts::update))
        .on(Method::Post, "/delete/{id}",    require_session(&app, posts::delete))
        .on(Method::Get,  "/auth/register",  with_app(&app, auth::register_form))
        .on(Method::Post, "/auth/register",  with_app(&app, auth::register))
        .on(Method::Get,  "/auth/login",     with_app(&app, auth::login_form))
        .on(Method::Post, "/auth/login",     with_app(&app, auth::login))
        .on(Method::Get,  "/auth/logout",    with_app(&app, auth::logout))
        .on(Method::Get,  "/healthz",        health::liveness)
        .on(Method::Get,  "/readyz",         with_app(&app, health::readiness))
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use http::{header, HeaderMap, HeaderValue};

    use super::*;
    use crate::model::PostId;
    use crate::response::Response;
    use crate::store::DocumentStore;

    struct TestApp {
        app: Arc<App>,
        router: Router,
    }

    impl TestApp {
        fn new() -> Self {
            let app = Arc::new(App::new(Arc::new(DocumentStore::in_memory()), "test-secret").unwrap());
            Self { router: routes(Arc::clone(&app)), app }
        }

        async fn get(&self, path: &str, cookie: Option<&str>) -> Response {
            let req = Request::new(Method::Get, path, headers(cookie, false), Bytes::new());
            self.router.respond(req).await
        }

        async fn post(&self, path: &str, cookie: Option<&str>, fields: &[(&str, &str)]) -> Response {
            let body = serde_urlencoded::to_string(fields).unwrap();
            let req = Request::new(Method::Post, path, headers(cookie, true), body);
            self.router.respond(req).await
        }

        /// Registers `username` and logs in, returning the `Cookie` header value.
        async fn sign_in(&self, username: &str, password: &str) -> String {
            let res = self.post("/auth/register", None, &[("username", username), ("password", password)]).await;
            assert_eq!(location(&res), "/auth/login");
            let res = self.post("/auth/login", None, &[("username", username), ("password", password)]).await;
            assert_eq!(location(&res), "/dashboard");
            session_cookie(&res).expect("login sets a session cookie")
        }

        async fn titles(&self) -> Vec<String> {
            self.app.posts.list().await.unwrap().into_iter().map(|l| l.post.title).collect()
        }

        async fn ids(&self) -> Vec<PostId> {
            self.app.posts.list().await.unwrap().into_iter().map(|l| l.post.id).collect()
        }
    }

    fn headers(cookie: Option<&str>, form: bool) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(cookie) = cookie {
            headers.insert(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
        }
        if form {
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/x-www-form-urlencoded"),
            );
        }
        headers
    }

    fn location(res: &Response) -> &str {
        assert_eq!(res.status_code(), 303, "expected a redirect");
        res.header("location").unwrap()
    }

    fn session_cookie(res: &Response) -> Option<String> {
        let pair = res.header("set-cookie")?.split(';').next()?;
        (!pair.ends_with('=')).then(|| pair.to_owned())
    }

    fn body(res: &Response) -> String {
        String::from_utf8(res.body().to_vec()).unwrap()
    }

    #[tokio::test]
    async fn created_post_is_listed_with_its_author() {
        let t = TestApp::new();
        let alice = t.sign_in("alice", "wonderland").await;

        let res = t.post("/create", Some(&alice), &[("title", "Hello"), ("content", "World")]).await;
        assert_eq!(location(&res), "/");

        let page = body(&t.get("/", None).await);
        assert!(page.contains("Hello"));
        assert!(page.contains("World"));
        assert!(page.contains(r#"<span class="author">alice</span>"#));
        assert_eq!(t.titles().await, ["Hello"]);
    }

    #[tokio::test]
    async fn editing_changes_only_the_target_post() {
        let t = TestApp::new();
        let cookie = t.sign_in("alice", "wonderland").await;
        t.post("/create", Some(&cookie), &[("title", "first"), ("content", "1")]).await;
        t.post("/create", Some(&cookie), &[("title", "second"), ("content", "2")]).await;
        let ids = t.ids().await;

        let path = format!("/edit/{}", ids[0]);
        let res = t.post(&path, Some(&cookie), &[("title", "first, edited"), ("content", "1b")]).await;
        assert_eq!(location(&res), "/");

        let first = t.app.posts.get(ids[0]).await.unwrap();
        let second = t.app.posts.get(ids[1]).await.unwrap();
        assert_eq!((first.title.as_str(), first.content.as_str()), ("first, edited", "1b"));
        assert_eq!((second.title.as_str(), second.content.as_str()), ("second", "2"));
    }

    #[tokio::test]
    async fn edit_form_is_prefilled_and_unknown_ids_are_not_found() {
        let t = TestApp::new();
        let cookie = t.sign_in("alice", "wonderland").await;
        t.post("/create", Some(&cookie), &[("title", "draft"), ("content", "text")]).await;
        let id = t.ids().await[0];

        let res = t.get(&format!("/edit/{id}"), Some(&cookie)).await;
        assert_eq!(res.status_code(), 200);
        assert!(body(&res).contains(r#"value="draft""#));

        assert_eq!(t.get("/edit/999", Some(&cookie)).await.status_code(), 404);
        assert_eq!(t.get("/edit/not-a-number", Some(&cookie)).await.status_code(), 404);

        let res = t.post("/edit/999", Some(&cookie), &[("title", "x"), ("content", "y")]).await;
        assert_eq!(location(&res), "/?error=not_found");
    }

    #[tokio::test]
    async fn deleting_removes_exactly_one_post_and_keeps_other_ids() {
        let t = TestApp::new();
        let cookie = t.sign_in("alice", "wonderland").await;
        for title in ["a", "b", "c"] {
            t.post("/create", Some(&cookie), &[("title", title), ("content", "-")]).await;
        }
        let ids = t.ids().await;

        let res = t.post(&format!("/delete/{}", ids[0]), Some(&cookie), &[]).await;
        assert_eq!(location(&res), "/");

        assert_eq!(t.titles().await, ["b", "c"]);
        assert_eq!(t.ids().await, ids[1..]);
        // Repeating the delete is harmless.
        let res = t.post(&format!("/delete/{}", ids[0]), Some(&cookie), &[]).await;
        assert_eq!(location(&res), "/");
        assert_eq!(t.titles().await.len(), 2);
    }

    #[tokio::test]
    async fn delete_is_post_only() {
        let t = TestApp::new();
        let res = t.get("/delete/1", None).await;
        assert_eq!(res.status_code(), 405);
        assert_eq!(res.header("allow"), Some("POST"));
    }

    #[tokio::test]
    async fn wrong_password_establishes_no_session() {
        let t = TestApp::new();
        t.sign_in("alice", "wonderland").await;
        let before = t.app.sessions.count().await;

        let res = t.post("/auth/login", None, &[("username", "alice"), ("password", "looking-glass")]).await;
        assert_eq!(location(&res), "/auth/login?error=auth");
        assert!(res.header("set-cookie").is_none());
        assert_eq!(t.app.sessions.count().await, before);

        let res = t.post("/auth/login", None, &[("username", "nobody"), ("password", "x")]).await;
        assert_eq!(location(&res), "/auth/login?error=auth");

        let page = body(&t.get("/auth/login?error=auth", None).await);
        assert!(page.contains("Invalid username or password."));
    }

    #[tokio::test]
    async fn logout_destroys_the_session() {
        let t = TestApp::new();
        let cookie = t.sign_in("alice", "wonderland").await;
        assert_eq!(t.get("/create", Some(&cookie)).await.status_code(), 200);

        let res = t.get("/auth/logout", Some(&cookie)).await;
        assert_eq!(location(&res), "/");
        assert!(res.header("set-cookie").unwrap().contains("Max-Age=0"));
        assert_eq!(t.app.sessions.count().await, 0);

        let res = t.get("/create", Some(&cookie)).await;
        assert_eq!(location(&res), "/auth/login");
    }

    #[tokio::test]
    async fn logging_in_again_replaces_the_previous_session() {
        let t = TestApp::new();
        let first = t.sign_in("alice", "wonderland").await;

        let res = t.post("/auth/login", Some(&first), &[("username", "alice"), ("password", "wonderland")]).await;
        assert_eq!(location(&res), "/dashboard");
        let second = session_cookie(&res).unwrap();

        assert_ne!(first, second);
        assert_eq!(t.app.sessions.count().await, 1);
        assert_eq!(location(&t.get("/create", Some(&first)).await), "/auth/login");
        assert_eq!(t.get("/create", Some(&second)).await.status_code(), 200);
    }

    #[tokio::test]
    async fn protected_routes_never_mutate_without_a_session() {
        let t = TestApp::new();
        let cookie = t.sign_in("alice", "wonderland").await;
        t.post("/create", Some(&cookie), &[("title", "keep"), ("content", "me")]).await;
        let id = t.ids().await[0];
        let forged = "quill.sid=deadbeef.0000";

        for cookie in [None, Some(forged)] {
            let res = t.post("/create", cookie, &[("title", "intruder"), ("content", "x")]).await;
            assert_eq!(location(&res), "/auth/login");
            let res = t.post(&format!("/edit/{id}"), cookie, &[("title", "defaced"), ("content", "x")]).await;
            assert_eq!(location(&res), "/auth/login");
            let res = t.post(&format!("/delete/{id}"), cookie, &[]).await;
            assert_eq!(location(&res), "/auth/login");
            assert_eq!(location(&t.get("/dashboard", cookie).await), "/auth/login");
        }

        assert_eq!(t.titles().await, ["keep"]);
    }

    #[tokio::test]
    async fn blank_fields_are_rejected_without_writing() {
        let t = TestApp::new();
        let cookie = t.sign_in("alice", "wonderland").await;

        let res = t.post("/create", Some(&cookie), &[("title", "  "), ("content", "body")]).await;
        assert_eq!(location(&res), "/create?error=validation");
        let res = t.post("/create", Some(&cookie), &[("content", "no title")]).await;
        assert_eq!(location(&res), "/create?error=validation");
        assert!(t.titles().await.is_empty());

        let page = body(&t.get("/create?error=validation", Some(&cookie)).await);
        assert!(page.contains(r#"class="error""#));
        assert!(!page.contains("already taken"));
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let t = TestApp::new();
        t.sign_in("alice", "wonderland").await;

        let res = t.post("/auth/register", None, &[("username", "alice"), ("password", "other")]).await;
        assert_eq!(location(&res), "/auth/register?error=taken");
        let page = body(&t.get("/auth/register?error=taken", None).await);
        assert!(page.contains("That username is already taken."));

        let res = t.post("/auth/register", None, &[("username", ""), ("password", "pw")]).await;
        assert_eq!(location(&res), "/auth/register?error=validation");
    }

    #[tokio::test]
    async fn dashboard_lists_only_own_posts() {
        let t = TestApp::new();
        let alice = t.sign_in("alice", "wonderland").await;
        let bob = t.sign_in("bob", "builder").await;
        t.post("/create", Some(&alice), &[("title", "written by alice"), ("content", "a")]).await;
        t.post("/create", Some(&bob), &[("title", "written by bob"), ("content", "b")]).await;

        let page = body(&t.get("/dashboard", Some(&alice)).await);
        assert!(page.contains("written by alice"));
        assert!(!page.contains("written by bob"));
    }

    #[tokio::test]
    async fn health_probes_answer() {
        let t = TestApp::new();
        assert_eq!(body(&t.get("/healthz", None).await), "ok");
        assert_eq!(body(&t.get("/readyz", None).await), "ready");
    }
}
