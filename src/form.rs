use crate::filesystem::{inspect_image, read_text, read_upload, ValidImage};
use crate::group::group_exists;
use crate::orm::groups;
use crate::post::PostForTemplate;
use crate::user::username_taken;
use actix_multipart::Multipart;
use actix_web::{error, Error};
use futures_util::TryStreamExt;
use sea_orm::{DatabaseConnection, DbErr};
use serde::Deserialize;

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_GROUP: &str = "Select a valid choice. That choice is not one of the available choices.";
pub const INVALID_IMAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";
pub const CONTRADICTORY_IMAGE: &str =
    "Please either submit a file or check the clear checkbox, not both.";

/// Longest accepted username.
pub const USERNAME_MAX_CHARS: usize = 150;
pub const PASSWORD_MIN_CHARS: usize = 8;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct PostFormErrors {
    pub text: Option<&'static str>,
    pub group: Option<&'static str>,
    pub image: Option<&'static str>,
}

impl PostFormErrors {
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.group.is_none() && self.image.is_none()
    }
}

/// Post create/edit form, bound or unbound.
#[derive(Debug, Default)]
pub struct PostForm {
    pub text: String,
    pub group_id: Option<i32>,
    pub image_clear: bool,
    pub image: Option<ValidImage>,
    pub errors: PostFormErrors,
}

impl PostForm {
    /// Form prefilled from an existing post.
    pub fn from_post(post: &PostForTemplate) -> Self {
        Self {
            text: post.text.to_owned(),
            group_id: post.group_id,
            ..Default::default()
        }
    }

    /// Reads `text`, `group`, `image` and `image_clear` from the request body
    /// and validates them.
    pub async fn from_multipart(
        db: &DatabaseConnection,
        mut fields: Multipart,
    ) -> Result<Self, Error> {
        let mut form = Self::default();
        let mut group_raw = String::new();

        while let Some(mut field) = fields.try_next().await.map_err(|e| {
            log::warn!("PostForm: multipart stream error: {}", e);
            error::ErrorBadRequest("Malformed form data.")
        })? {
            let name = field.content_disposition().get_name().unwrap_or_default().to_owned();
            match name.as_str() {
                "text" => form.text = read_text(&mut field).await?,
                "group" => group_raw = read_text(&mut field).await?,
                "image_clear" => form.image_clear = !read_text(&mut field).await?.is_empty(),
                "image" => {
                    if let Some(upload) = read_upload(&mut field).await? {
                        match inspect_image(upload) {
                            Ok(image) => form.image = Some(image),
                            Err(_) => form.errors.image = Some(INVALID_IMAGE),
                        }
                    }
                }
                _ => log::debug!("PostForm: ignoring unexpected field {:?}", name),
            }
        }

        if form.image_clear && form.image.is_some() {
            form.errors.image = Some(CONTRADICTORY_IMAGE);
        }

        form.text = form.text.trim().to_owned();
        if form.text.is_empty() {
            form.errors.text = Some(REQUIRED);
        }

        let group_raw = group_raw.trim();
        if !group_raw.is_empty() {
            let group_id = match group_raw.parse::<i32>() {
                Ok(id) => group_exists(db, id)
                    .await
                    .map_err(error::ErrorInternalServerError)?
                    .then_some(id),
                Err(_) => None,
            };
            match group_id {
                Some(id) => form.group_id = Some(id),
                None => form.errors.group = Some(INVALID_GROUP),
            }
        }

        Ok(form)
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn is_selected(&self, group: &groups::Model) -> bool {
        self.group_id == Some(group.id)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CommentFormData {
    #[serde(default)]
    pub text: String,
}

impl CommentFormData {
    /// Trimmed text, or `None` when there is nothing to post.
    pub fn cleaned_text(&self) -> Option<&str> {
        match self.text.trim() {
            "" => None,
            text => Some(text),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SignupFormData {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password1: String,
    pub password2: String,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SignupErrors {
    pub username: Option<&'static str>,
    pub email: Option<&'static str>,
    pub password1: Option<&'static str>,
    pub password2: Option<&'static str>,
}

impl SignupErrors {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.password1.is_none()
            && self.password2.is_none()
    }
}

impl SignupFormData {
    /// Checks every field. Only the username check touches the database.
    pub async fn validate(&self, db: &DatabaseConnection) -> Result<SignupErrors, DbErr> {
        let mut errors = self.validate_fields();
        if errors.username.is_none() && username_taken(db, self.username.trim()).await? {
            errors.username = Some("A user with that username already exists.");
        }
        Ok(errors)
    }

    pub fn validate_fields(&self) -> SignupErrors {
        let mut errors = SignupErrors::default();
        let username = self.username.trim();

        if username.is_empty() {
            errors.username = Some(REQUIRED);
        } else if username.chars().count() > USERNAME_MAX_CHARS {
            errors.username = Some("Ensure this value has at most 150 characters.");
        } else if !username
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
        {
            errors.username = Some(
                "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
            );
        }

        let email = self.email.trim();
        if !email.is_empty() && !is_plausible_email(email) {
            errors.email = Some("Enter a valid email address.");
        }

        if self.password1.is_empty() {
            errors.password1 = Some(REQUIRED);
        }
        if self.password2.is_empty() {
            errors.password2 = Some(REQUIRED);
        } else if self.password1 != self.password2 {
            errors.password2 = Some("The two password fields didn't match.");
        } else if self.password2.chars().count() < PASSWORD_MIN_CHARS {
            errors.password2 =
                Some("This password is too short. It must contain at least 8 characters.");
        } else if self.password2.chars().all(|c| c.is_ascii_digit()) {
            errors.password2 = Some("This password is entirely numeric.");
        }

        errors
    }
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !domain.contains('@') && !email.contains(' ')
        }
        None => false,
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginFormData {
    pub username: String,
    pub password: String,
    pub next: String,
}

/// Only same-site absolute paths are followed after login.
pub fn safe_next(next: &str) -> Option<&str> {
    if next.starts_with('/') && !next.starts_with("//") && !next.contains('\\') {
        Some(next)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup(username: &str, email: &str, p1: &str, p2: &str) -> SignupFormData {
        SignupFormData {
            username: username.to_owned(),
            email: email.to_owned(),
            password1: p1.to_owned(),
            password2: p2.to_owned(),
            ..Default::default()
        }
    }

    #[test]
    fn valid_signup_has_no_errors() {
        let errors = signup("leo.t+1@home", "leo@example.com", "war&peace", "war&peace")
            .validate_fields();
        assert!(errors.is_empty(), "{:?}", errors);
        assert!(signup("лев", "", "war&peace", "war&peace").validate_fields().is_empty());
    }

    #[test]
    fn signup_field_errors() {
        let errors = signup("", "nope", "12345678", "12345678").validate_fields();
        assert_eq!(errors.username, Some(REQUIRED));
        assert!(errors.email.is_some());
        assert_eq!(errors.password2, Some("This password is entirely numeric."));

        let errors = signup("has space", "", "abc", "abc").validate_fields();
        assert!(errors.username.is_some());
        assert!(errors.password2.unwrap().contains("too short"));

        let errors = signup("x", "", "war&peace", "war&peace!").validate_fields();
        assert_eq!(errors.password2, Some("The two password fields didn't match."));

        let long = "a".repeat(151);
        assert!(signup(&long, "", "war&peace", "war&peace")
            .validate_fields()
            .username
            .is_some());
    }

    #[test]
    fn comment_text_is_trimmed() {
        let form = CommentFormData {
            text: "  hello  ".to_owned(),
        };
        assert_eq!(form.cleaned_text(), Some("hello"));
        let blank = CommentFormData {
            text: " \n ".to_owned(),
        };
        assert_eq!(blank.cleaned_text(), None);
    }

    #[test]
    fn next_must_be_local() {
        assert_eq!(safe_next("/create/"), Some("/create/"));
        assert_eq!(safe_next("//evil.example/"), None);
        assert_eq!(safe_next("https://evil.example/"), None);
        assert_eq!(safe_next(""), None);
    }
}
