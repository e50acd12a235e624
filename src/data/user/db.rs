use bson::doc;
use mongodb::Database;
use rocket::futures::StreamExt;
use uuid::Uuid;

use super::{User, USER_COLLECTION_NAME};
use crate::data::filter;
use crate::resp::problem::Problem;
use crate::role::Role;

pub mod problem {
    use crate::resp::problem::Problem;
    use rocket::http::Status;
    use uuid::Uuid;

    #[inline]
    pub fn not_found(id: Uuid) -> Problem {
        Problem::new_untyped(Status::NotFound, "User doesn't exist.")
            .insert_str("id", id)
            .to_owned()
    }

    #[inline]
    pub fn wrong_role(id: Uuid, expected: crate::role::Role) -> Problem {
        Problem::new_untyped(Status::NotFound, format!("{} not found.", expected))
            .insert_str("id", id)
            .detail(format!("User is not a {}.", expected))
            .to_owned()
    }

    #[inline]
    pub fn email_taken(email: impl ToString) -> Problem {
        Problem::new_untyped(Status::Conflict, "User with this email already exists.")
            .insert_str("email", email)
            .to_owned()
    }

    #[inline]
    pub fn register_number_taken(register_number: impl ToString) -> Problem {
        Problem::new_untyped(
            Status::Conflict,
            "User with this register number already exists.",
        )
        .insert_str("registerNumber", register_number)
        .to_owned()
    }

    #[inline]
    pub fn bad_login() -> Problem {
        Problem::new_untyped(Status::BadRequest, "Invalid credentials.")
    }
}

#[allow(async_fn_in_trait)]
pub trait UserDbExt {
    /// Inserts a user after checking the email and register-number
    /// uniqueness invariants. The check-then-insert race is accepted.
    async fn create_user(&self, user: &User) -> Result<(), Problem>;

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, Problem>;

    /// Like [`UserDbExt::get_user`] but maps a missing document to a 404
    /// problem. Used before mutations so no write happens on a bad id.
    async fn require_user(&self, id: Uuid) -> Result<User, Problem>;

    /// Resolves `id` to a user of the expected role kind.
    async fn require_role(&self, id: Uuid, role: Role) -> Result<User, Problem>;

    async fn find_user_by_email(&self, email: impl AsRef<str>) -> Result<Option<User>, Problem>;
    async fn find_user_by_register_number(
        &self,
        register_number: impl AsRef<str>,
    ) -> Result<Option<User>, Problem>;

    async fn list_users_by_role(&self, role: Role) -> Result<Vec<User>, Problem>;

    /// Persists a user document mutated in memory.
    async fn save_user(&self, user: &User) -> Result<(), Problem>;

    async fn delete_user(&self, id: Uuid) -> Result<Option<User>, Problem>;
}

impl UserDbExt for Database {
    async fn create_user(&self, user: &User) -> Result<(), Problem> {
        if self.find_user_by_email(&user.email).await?.is_some() {
            return Err(problem::email_taken(&user.email));
        }

        if let Some(register_number) = &user.register_number {
            if self
                .find_user_by_register_number(register_number)
                .await?
                .is_some()
            {
                return Err(problem::register_number_taken(register_number));
            }
        }

        self.collection::<User>(USER_COLLECTION_NAME)
            .insert_one(user, None)
            .await
            .map_err(Problem::from)?;

        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, Problem> {
        self.collection::<User>(USER_COLLECTION_NAME)
            .find_one(filter::by_id(id), None)
            .await
            .map_err(Problem::from)
    }

    async fn require_user(&self, id: Uuid) -> Result<User, Problem> {
        self.get_user(id).await?.ok_or_else(|| problem::not_found(id))
    }

    async fn require_role(&self, id: Uuid, role: Role) -> Result<User, Problem> {
        let user = self.require_user(id).await?;
        if user.role.role() != role {
            return Err(problem::wrong_role(id, role));
        }
        Ok(user)
    }

    async fn find_user_by_email(&self, email: impl AsRef<str>) -> Result<Option<User>, Problem> {
        self.collection::<User>(USER_COLLECTION_NAME)
            .find_one(filter::by_email(email.as_ref()), None)
            .await
            .map_err(Problem::from)
    }

    async fn find_user_by_register_number(
        &self,
        register_number: impl AsRef<str>,
    ) -> Result<Option<User>, Problem> {
        self.collection::<User>(USER_COLLECTION_NAME)
            .find_one(doc! { "registerNumber": register_number.as_ref() }, None)
            .await
            .map_err(Problem::from)
    }

    async fn list_users_by_role(&self, role: Role) -> Result<Vec<User>, Problem> {
        let mut cursor = self
            .collection::<User>(USER_COLLECTION_NAME)
            .find(doc! { "role": role.to_string() }, None)
            .await
            .map_err(Problem::from)?;

        let mut users = vec![];
        while let Some(result) = cursor.next().await {
            match result {
                Ok(user) => users.push(user),
                Err(_) => {
                    // show must go on
                    tracing::warn!("unable to deserialize User document");
                }
            }
        }
        users.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(users)
    }

    async fn save_user(&self, user: &User) -> Result<(), Problem> {
        self.collection::<User>(USER_COLLECTION_NAME)
            .replace_one(filter::by_id(user.id), user, None)
            .await
            .map_err(Problem::from)?;
        Ok(())
    }

    async fn delete_user(&self, id: Uuid) -> Result<Option<User>, Problem> {
        self.collection::<User>(USER_COLLECTION_NAME)
            .find_one_and_delete(filter::by_id(id), None)
            .await
            .map_err(Problem::from)
    }
}
