use crate::config::Config;
use crate::model::role::Role;
use crate::models::{Claims, TokenType};
use crate::service::leave::Actor;
use actix_web::{FromRequest, HttpRequest, dev::Payload, error::ErrorUnauthorized, web::Data};
use futures::future::{Ready, ready};
use jsonwebtoken::{DecodingKey, Validation, decode};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,

    /// Present only if this user is attached to a branch
    pub branch_id: Option<u64>,
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let token = match req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
        {
            Some(t) => t,
            None => return ready(Err(ErrorUnauthorized("Missing token"))),
        };

        let config = match req.app_data::<Data<Config>>() {
            Some(c) => c,
            None => {
                return ready(Err(actix_web::error::ErrorInternalServerError(
                    "Config missing",
                )));
            }
        };

        let data = match decode::<Claims>(
            token,
            &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            &Validation::default(),
        ) {
            Ok(d) => d,
            Err(_) => return ready(Err(ErrorUnauthorized("Invalid token"))),
        };

        // refresh tokens are for /auth/refresh only
        if data.claims.token_type != TokenType::Access {
            return ready(Err(ErrorUnauthorized("Access token required")));
        }

        let role = match Role::from_id(data.claims.role) {
            Some(r) => r,
            None => return ready(Err(ErrorUnauthorized("Invalid role"))),
        };

        ready(Ok(AuthUser {
            user_id: data.claims.user_id,
            username: data.claims.sub,
            role,
            branch_id: data.claims.branch_id,
        }))
    }
}

impl AuthUser {
    pub fn require_admin(&self) -> actix_web::Result<()> {
        if self.role == Role::SuperAdmin {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden("Super admin only"))
        }
    }

    /// Explicit actor handed to the lifecycle service; no ambient session
    /// state below this point.
    pub fn actor(&self) -> Actor {
        Actor {
            id: self.user_id,
            role: self.role,
            branch_id: self.branch_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{generate_access_token, generate_refresh_token};
    use actix_web::test::TestRequest;

    const SECRET: &str = "test-secret";

    fn test_config() -> Config {
        Config {
            database_url: "mysql://unused".into(),
            jwt_secret: SECRET.into(),
            server_addr: "127.0.0.1:0".into(),
            access_token_ttl: 900,
            refresh_token_ttl: 3600,
            rate_login_per_min: 60,
            rate_register_per_min: 30,
            rate_refresh_per_min: 30,
            rate_protected_per_min: 1000,
            api_prefix: "/api/v1".into(),
            annual_leave_days: 30,
        }
    }

    fn request_with_token(token: &str) -> HttpRequest {
        TestRequest::default()
            .insert_header(("Authorization", format!("Bearer {token}")))
            .app_data(Data::new(test_config()))
            .to_http_request()
    }

    #[tokio::test]
    async fn access_token_yields_an_auth_user() {
        let token = generate_access_token(1000, "akou".into(), 3, Some(1), SECRET, 900);
        let req = request_with_token(&token);

        let user = AuthUser::from_request(&req, &mut Payload::None).await.unwrap();

        assert_eq!(user.user_id, 1000);
        assert_eq!(user.role, Role::Staff);
        assert_eq!(user.branch_id, Some(1));
    }

    #[tokio::test]
    async fn refresh_token_is_not_an_access_token() {
        let (token, _) = generate_refresh_token(1000, "akou".into(), 3, Some(1), SECRET, 3600);
        let req = request_with_token(&token);

        assert!(AuthUser::from_request(&req, &mut Payload::None).await.is_err());
    }
}
