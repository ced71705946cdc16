use crate::session::{authenticate_client_by_session, MainData};
use crate::post::PostForTemplate;
use crate::user::{ClientUser, UserProfile};
use actix_session::SessionExt;
use actix_utils::future::{ok, Ready};
use actix_web::dev::{
    forward_ready, Extensions, Payload, Service, ServiceRequest, ServiceResponse, Transform,
};
use actix_web::error::InternalError;
use actix_web::http::header;
use actix_web::{web::Data, Error, FromRequest, HttpMessage, HttpRequest, HttpResponse};
use futures_util::future::{FutureExt as _, LocalBoxFuture};
use std::time::{Duration, Instant};
use std::{cell::RefCell, rc::Rc};

/// Where anonymous clients are sent for protected actions.
pub const LOGIN_URL: &str = "/auth/login/";

/// Client data stored for a single request cycle.
/// Distinct from ClientCtx because it is defined through request data.
#[derive(Clone, Debug)]
pub struct ClientCtxInner {
    pub client: Option<ClientUser>,
    pub request_start: Instant,
}

impl ClientCtxInner {
    fn new() -> Self {
        Self {
            client: None,
            request_start: Instant::now(),
        }
    }
}

/// Client context passed to routes.
/// Wraps ClientCtxInner, which is set at the beginning of the request.
#[derive(Clone, Debug)]
pub struct ClientCtx(Rc<RefCell<ClientCtxInner>>);

impl Default for ClientCtx {
    fn default() -> Self {
        Self(Rc::new(RefCell::new(ClientCtxInner::new())))
    }
}

impl ClientCtx {
    pub(crate) fn get_client_ctx(extensions: &mut Extensions) -> Self {
        match extensions.get::<Rc<RefCell<ClientCtxInner>>>() {
            // Existing record in extensions; pull it.
            Some(s_impl) => Self(Rc::clone(s_impl)),
            // No existing record; create and insert it.
            None => {
                let inner = Rc::new(RefCell::new(ClientCtxInner::new()));
                extensions.insert(inner.clone());
                Self(inner)
            }
        }
    }

    /// Returns either the user's id or None.
    pub fn get_id(&self) -> Option<i32> {
        self.0.borrow().client.as_ref().map(|u| u.id)
    }

    /// Returns either the user's name or the word for guest.
    pub fn get_name(&self) -> String {
        match &self.0.borrow().client {
            Some(user) => user.username.to_owned(),
            None => "Guest".to_owned(),
        }
    }

    pub fn is_user(&self) -> bool {
        self.0.borrow().client.is_some()
    }

    /// True when the client is signed in as `author_id`.
    pub fn is_author(&self, author_id: i32) -> bool {
        self.get_id() == Some(author_id)
    }

    pub fn can_update_post(&self, post: &PostForTemplate) -> bool {
        self.is_user() && self.is_author(post.author_id)
    }

    /// Users may follow anyone but themselves.
    pub fn can_follow(&self, author: &UserProfile) -> bool {
        self.is_user() && !self.is_author(author.id)
    }

    /// Returns the user's id, or an error whose response redirects to the
    /// login page with `next` pointing back at this request.
    pub fn require_user(&self, req: &HttpRequest) -> Result<i32, Error> {
        match self.get_id() {
            Some(id) => Ok(id),
            None => {
                let location = login_url_with_next(&full_path(req));
                log::debug!("anonymous request to {} sent to {}", req.path(), location);
                Err(InternalError::from_response(
                    "Login required.",
                    HttpResponse::Found()
                        .append_header((header::LOCATION, location))
                        .finish(),
                )
                .into())
            }
        }
    }

    /// Returns Duration representing request time.
    pub fn request_time(&self) -> Duration {
        Instant::now() - self.0.borrow().request_start
    }

    /// Returns human readable representing request time.
    pub fn request_time_as_string(&self) -> String {
        let us = self.request_time().as_micros();
        if us > 5000 {
            format!("{}ms", us / 1000)
        } else {
            format!("{}μs", us)
        }
    }

    pub(crate) fn set_client(&self, client: Option<ClientUser>) {
        self.0.borrow_mut().client = client;
    }
}

fn full_path(req: &HttpRequest) -> String {
    match req.query_string() {
        "" => req.path().to_owned(),
        query => format!("{}?{}", req.path(), query),
    }
}

/// `/auth/login/?next=<path>` with everything but slashes percent-encoded.
pub fn login_url_with_next(next: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(next.as_bytes()).collect();
    format!("{}?next={}", LOGIN_URL, encoded.replace("%2F", "/"))
}

/// This implementation is what actually provides the `client: ClientCtx` in the parameters of route functions.
impl FromRequest for ClientCtx {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ok(ClientCtx::get_client_ctx(&mut req.extensions_mut()))
    }
}

impl<S, B> Transform<S, ServiceRequest> for ClientCtx
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = ClientCtxMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(ClientCtxMiddleware {
            service: Rc::new(service),
        })
    }
}

/// Client context middleware
pub struct ClientCtxMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for ClientCtxMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);

        async move {
            let ctx = ClientCtx::get_client_ctx(&mut req.extensions_mut());
            let session = req.get_session();

            // The user must be resolved before the handler extracts ClientCtx.
            match req.app_data::<Data<MainData>>().cloned() {
                Some(data) => {
                    let client = authenticate_client_by_session(&data.pool, &session).await;
                    ctx.set_client(client);
                }
                None => log::error!("ClientCtxMiddleware: no MainData registered on the app"),
            }

            service.call(req).await
        }
        .boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post_by(author_id: i32) -> PostForTemplate {
        PostForTemplate {
            id: 1,
            text: "text".to_owned(),
            created_at: chrono::Utc::now().naive_utc(),
            author_id,
            group_id: None,
            image: None,
            author_name: "someone".to_owned(),
            group_title: None,
            group_slug: None,
        }
    }

    fn profile(id: i32) -> UserProfile {
        UserProfile {
            id,
            username: "someone".to_owned(),
            first_name: String::new(),
            last_name: String::new(),
        }
    }

    #[test]
    fn login_url_keeps_slashes() {
        assert_eq!(login_url_with_next("/create/"), "/auth/login/?next=/create/");
        assert_eq!(
            login_url_with_next("/posts/1/edit/"),
            "/auth/login/?next=/posts/1/edit/"
        );
        assert_eq!(
            login_url_with_next("/follow/?page=2"),
            "/auth/login/?next=/follow/%3Fpage%3D2"
        );
    }

    #[test]
    fn guest_context_permissions() {
        let ctx = ClientCtx::default();
        assert!(!ctx.is_user());
        assert_eq!(ctx.get_name(), "Guest");
        assert!(!ctx.can_update_post(&post_by(1)));
        assert!(!ctx.can_follow(&profile(1)));
    }

    #[test]
    fn user_context_permissions() {
        let ctx = ClientCtx::default();
        ctx.set_client(Some(ClientUser {
            id: 7,
            username: "auth".to_owned(),
        }));
        assert!(ctx.can_update_post(&post_by(7)));
        assert!(!ctx.can_update_post(&post_by(8)));
        assert!(ctx.can_follow(&profile(8)));
        assert!(!ctx.can_follow(&profile(7)));
    }
}
