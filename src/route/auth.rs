use mongodb::Database;
use rocket::serde::json::Json;
use rocket::State;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::data::user::db::{problem as user_problem, UserDbExt};
use crate::data::user::{PublicUser, User};
use crate::resp::jwt::UserRoleToken;
use crate::resp::problem::{problems, Problem};
use crate::role::Role;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterData {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize)]
pub struct LoginData {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: PublicUser,
}

fn validate_register(data: &RegisterData) -> Result<(), Problem> {
    if data.name.trim().is_empty() {
        return Err(problems::validation("Name must not be empty."));
    }
    if !data.email.contains('@') {
        return Err(problems::validation("Email address is malformed."));
    }
    if data.password.len() < 8 {
        return Err(problems::validation(
            "Password must be at least 8 characters long.",
        ));
    }
    Ok(())
}

#[post("/register", data = "<register>")]
#[tracing::instrument(skip(register, db, config))]
pub async fn register(
    register: Json<RegisterData>,
    db: &State<Database>,
    config: &State<Config>,
) -> Result<Json<AuthResponse>, Problem> {
    validate_register(&register)?;

    // Emails on the configured admin list register as administrators.
    let role = if config.admin_emails.contains(&register.email) {
        Role::Admin
    } else {
        register.role.unwrap_or(Role::Student)
    };

    let user = User::new(&register.email, &register.name, &register.password, role);
    db.create_user(&user).await?;

    let token = UserRoleToken::new(&user).encode_jwt(&config.jwt_secret)?;
    Ok(Json(AuthResponse {
        token,
        user: PublicUser(user),
    }))
}

#[post("/login", data = "<login>")]
#[tracing::instrument(skip(login, db, config))]
pub async fn login(
    login: Json<LoginData>,
    db: &State<Database>,
    config: &State<Config>,
) -> Result<Json<AuthResponse>, Problem> {
    let user = db
        .find_user_by_email(&login.email)
        .await?
        .ok_or_else(user_problem::bad_login)?;

    if !user.pw_hash.verify(&login.password) {
        return Err(user_problem::bad_login());
    }

    let token = UserRoleToken::new(&user).encode_jwt(&config.jwt_secret)?;
    Ok(Json(AuthResponse {
        token,
        user: PublicUser(user),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(name: &str, email: &str, password: &str) -> RegisterData {
        RegisterData {
            name: name.into(),
            email: email.into(),
            password: password.into(),
            role: None,
        }
    }

    #[test]
    fn register_validation_rejects_bad_input() {
        assert!(validate_register(&data("", "a@example.com", "password123")).is_err());
        assert!(validate_register(&data("A", "not-an-email", "password123")).is_err());
        assert!(validate_register(&data("A", "a@example.com", "short")).is_err());
        assert!(validate_register(&data("A", "a@example.com", "password123")).is_ok());
    }
}
