use super::redirect;
use crate::form::{safe_next, LoginFormData, SignupErrors, SignupFormData};
use crate::middleware::ClientCtx;
use crate::session::{forget_client, remember_client, MainData};
use crate::user::{authenticate, insert_new_user, NewUser};
use actix_session::Session;
use actix_web::{error, get, post, web, Error, HttpResponse, Responder};
use askama_actix::{Template, TemplateToResponse};
use serde::Deserialize;

pub const INVALID_LOGIN: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_signup)
        .service(post_signup)
        .service(view_login)
        .service(post_login)
        .service(view_logout);
}

#[derive(Template)]
#[template(path = "users/signup.html")]
pub struct SignupTemplate<'a> {
    pub client: ClientCtx,
    pub form: &'a SignupFormData,
    pub errors: &'a SignupErrors,
}

#[derive(Template)]
#[template(path = "users/login.html")]
pub struct LoginTemplate<'a> {
    pub client: ClientCtx,
    pub username: &'a str,
    pub next: &'a str,
    pub error: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "users/logged_out.html")]
pub struct LoggedOutTemplate {
    pub client: ClientCtx,
}

#[derive(Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

#[get("/auth/signup/")]
pub async fn view_signup(client: ClientCtx) -> impl Responder {
    SignupTemplate {
        client,
        form: &SignupFormData::default(),
        errors: &SignupErrors::default(),
    }
    .to_response()
}

#[post("/auth/signup/")]
pub async fn post_signup(
    client: ClientCtx,
    data: web::Data<MainData>,
    form: web::Form<SignupFormData>,
) -> Result<HttpResponse, Error> {
    let errors = form
        .validate(&data.pool)
        .await
        .map_err(error::ErrorInternalServerError)?;

    if !errors.is_empty() {
        return Ok(SignupTemplate {
            client,
            form: &form,
            errors: &errors,
        }
        .to_response());
    }

    let user = insert_new_user(
        &data.pool,
        NewUser {
            username: form.username.trim(),
            email: form.email.trim(),
            first_name: form.first_name.trim(),
            last_name: form.last_name.trim(),
            password: &form.password1,
        },
    )
    .await
    .map_err(|e| {
        log::error!("post_signup: {}", e);
        error::ErrorInternalServerError("Failed to create the account.")
    })?;
    log::info!("new user {} ({})", user.username, user.id);

    Ok(redirect("/"))
}

#[get("/auth/login/")]
pub async fn view_login(client: ClientCtx, query: web::Query<NextQuery>) -> impl Responder {
    LoginTemplate {
        client,
        username: "",
        next: query.next.as_deref().unwrap_or_default(),
        error: None,
    }
    .to_response()
}

#[post("/auth/login/")]
pub async fn post_login(
    client: ClientCtx,
    session: Session,
    data: web::Data<MainData>,
    form: web::Form<LoginFormData>,
) -> Result<HttpResponse, Error> {
    let user = authenticate(&data.pool, form.username.trim(), &form.password)
        .await
        .map_err(error::ErrorInternalServerError)?;

    let user = match user {
        Some(user) => user,
        None => {
            log::debug!("post_login: rejected credentials for {:?}", form.username);
            return Ok(LoginTemplate {
                client,
                username: &form.username,
                next: &form.next,
                error: Some(INVALID_LOGIN),
            }
            .to_response());
        }
    };

    remember_client(&session, &user).map_err(|e| {
        log::error!("post_login: session.insert() {}", e);
        error::ErrorInternalServerError("Failed to start the session.")
    })?;
    log::info!("user {} logged in", user.id);

    Ok(redirect(safe_next(&form.next).unwrap_or("/")))
}

#[get("/auth/logout/")]
pub async fn view_logout(client: ClientCtx, session: Session) -> impl Responder {
    forget_client(&session);
    // The rest of this request is served to a guest.
    client.set_client(None);
    LoggedOutTemplate { client }.to_response()
}
