use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rocket::http::Status;
use rocket::outcome::Outcome::{Error as Failure, Success};
use rocket::request::{self, FromRequest, Request};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::data::user::User;
use crate::resp::problem::Problem;
use crate::role::Role;

pub static AUTH_HEADER_NAME: &str = "Authorization";
pub static AUTH_HEADER_PREFIX: &str = "Bearer ";

/// Bearer token claims carried by every role-sensitive request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRoleToken {
    #[serde(with = "date_time_as_unix_seconds")]
    iat: DateTime<Utc>,
    #[serde(with = "date_time_as_unix_seconds")]
    exp: DateTime<Utc>,
    pub user: Uuid,
    pub role: Role,
}

impl UserRoleToken {
    pub fn new(user: &User) -> UserRoleToken {
        let now = Utc::now();
        UserRoleToken {
            iat: now,
            exp: now + Duration::weeks(1),
            user: user.id,
            role: user.role.role(),
        }
    }

    pub fn encode_jwt(&self, secret: impl AsRef<[u8]>) -> Result<String, Problem> {
        let header = Header::new(Algorithm::HS256);
        let key = EncodingKey::from_secret(secret.as_ref());

        Ok(encode(&header, &self, &key)?)
    }
}

pub fn auth_problem(detail: impl ToString) -> Problem {
    Problem::new_untyped(Status::Unauthorized, "Unable to authorize user.")
        .detail(detail)
        .clone()
}

pub fn extract_claims(
    header: Option<&str>,
    secret: impl AsRef<[u8]>,
) -> Result<UserRoleToken, Problem> {
    let token = match header {
        Some(value) => value
            .strip_prefix(AUTH_HEADER_PREFIX)
            .ok_or_else(|| auth_problem("Authorization header is not a bearer token."))?,
        None => {
            return Err(auth_problem("No Authorization header."));
        }
    };

    match decode::<UserRoleToken>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    {
        Ok(it) => {
            tracing::debug!("decoded user role token for user: {}", it.user);

            Ok(it)
        }
        Err(_) => Err(auth_problem("Bearer token was malformed or expired.")),
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for UserRoleToken {
    type Error = Problem;

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let config: &Config = req
            .rocket()
            .state()
            .expect("Config must be managed by the rocket instance");

        let header = req.headers().get_one(AUTH_HEADER_NAME);
        match extract_claims(header, &config.jwt_secret) {
            Ok(it) => Success(it),
            Err(e) => {
                tracing::debug!("unable to extract claims from request headers");
                Failure((Status::Unauthorized, e))
            }
        }
    }
}

pub mod date_time_as_unix_seconds {
    use chrono::{DateTime, TimeZone, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(date.timestamp())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let seconds = i64::deserialize(deserializer)?;
        Utc.timestamp_opt(seconds, 0)
            .single()
            .ok_or_else(|| serde::de::Error::custom("invalid unix timestamp"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::SubsecRound;

    #[test]
    fn jwt_round_trip_preserves_claims() {
        let mut now = Utc::now();
        now = now.round_subsecs(0);

        let user = Uuid::new_v4();

        let urt = UserRoleToken {
            iat: now,
            exp: now + Duration::weeks(1),
            user,
            role: Role::Admin,
        };

        let secret = "test_secret";

        let token = urt
            .encode_jwt(secret)
            .expect("encoding should work for example");

        let decoded =
            extract_claims(Some(&format!("Bearer {}", token)), secret).expect("claims decode");

        assert_eq!(now, decoded.iat);
        assert_eq!(now + Duration::weeks(1), decoded.exp);
        assert_eq!(user, decoded.user);
        assert_eq!(decoded.role, Role::Admin);
    }

    #[test]
    fn missing_header_is_rejected() {
        assert!(extract_claims(None, "test_secret").is_err());
    }

    #[test]
    fn non_bearer_header_is_rejected() {
        assert!(extract_claims(Some("Basic dXNlcjpwdw=="), "test_secret").is_err());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let user = User::new("a@example.com", "A", "password123", Role::Student);
        let token = UserRoleToken::new(&user)
            .encode_jwt("secret_one")
            .expect("encoding works");

        assert!(extract_claims(Some(&format!("Bearer {}", token)), "secret_two").is_err());
    }
}
