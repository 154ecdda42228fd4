//! Identity handed to us by the auth collaborator.
//!
//! The gateway in front of this service authenticates the session and
//! forwards the result as `X-User-Id` / `X-User-Role` headers; the core
//! trusts that identity verbatim. Handlers take [`AuthenticatedUser`] (any
//! role) or [`AdminUser`] as an extractor argument.

use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::error::{ErrorForbidden, ErrorUnauthorized};
use actix_web::{FromRequest, HttpRequest};
use uuid::Uuid;

pub const USER_ID_HEADER: &str = "X-User-Id";
pub const USER_ROLE_HEADER: &str = "X-User-Role";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Customer,
    Admin,
}

#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub role: Role,
}

/// Same identity, admitted only when the forwarded role is `admin`.
#[derive(Debug, Clone, Copy)]
pub struct AdminUser {
    pub user_id: Uuid,
}

fn identity_from(req: &HttpRequest) -> Result<AuthenticatedUser, actix_web::Error> {
    let raw_id = req
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ErrorUnauthorized("Missing user identity"))?;

    let user_id = Uuid::parse_str(raw_id).map_err(|_| ErrorUnauthorized("Invalid user identity"))?;

    let role = match req
        .headers()
        .get(USER_ROLE_HEADER)
        .and_then(|v| v.to_str().ok())
    {
        Some(r) if r.eq_ignore_ascii_case("admin") => Role::Admin,
        _ => Role::Customer,
    };

    Ok(AuthenticatedUser { user_id, role })
}

impl FromRequest for AuthenticatedUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(identity_from(req))
    }
}

impl FromRequest for AdminUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(identity_from(req).and_then(|user| match user.role {
            Role::Admin => Ok(AdminUser {
                user_id: user.user_id,
            }),
            Role::Customer => Err(ErrorForbidden("Admin access required")),
        }))
    }
}

#[cfg(test)]
mod tests {
    use actix_web::test::TestRequest;

    use super::*;

    #[actix_web::test]
    async fn extracts_user_id_and_defaults_to_customer() {
        let id = Uuid::new_v4();
        let req = TestRequest::default()
            .insert_header((USER_ID_HEADER, id.to_string()))
            .to_http_request();

        let user = AuthenticatedUser::from_request(&req, &mut Payload::None)
            .await
            .expect("should authenticate");
        assert_eq!(user.user_id, id);
        assert_eq!(user.role, Role::Customer);
    }

    #[actix_web::test]
    async fn missing_identity_is_unauthorized() {
        let req = TestRequest::default().to_http_request();
        let result = AuthenticatedUser::from_request(&req, &mut Payload::None).await;
        assert!(result.is_err());
    }

    #[actix_web::test]
    async fn malformed_identity_is_unauthorized() {
        let req = TestRequest::default()
            .insert_header((USER_ID_HEADER, "not-a-uuid"))
            .to_http_request();
        let result = AuthenticatedUser::from_request(&req, &mut Payload::None).await;
        assert!(result.is_err());
    }

    #[actix_web::test]
    async fn admin_extractor_rejects_customers() {
        let req = TestRequest::default()
            .insert_header((USER_ID_HEADER, Uuid::new_v4().to_string()))
            .insert_header((USER_ROLE_HEADER, "customer"))
            .to_http_request();
        let result = AdminUser::from_request(&req, &mut Payload::None).await;
        assert!(result.is_err());
    }

    #[actix_web::test]
    async fn admin_extractor_admits_admin_role() {
        let id = Uuid::new_v4();
        let req = TestRequest::default()
            .insert_header((USER_ID_HEADER, id.to_string()))
            .insert_header((USER_ROLE_HEADER, "Admin"))
            .to_http_request();
        let admin = AdminUser::from_request(&req, &mut Payload::None)
            .await
            .expect("admin should be admitted");
        assert_eq!(admin.user_id, id);
    }
}
