use garde::Validate;

use crate::models::envelope::Ack;
use crate::models::user::{LoginRequest, LoginResponse, SignupRequest, User, UserEnvelope};
use crate::services::api::{ApiClient, ApiError};

/// `/auth` endpoints.
pub struct AuthApi<'a> {
    api: &'a ApiClient,
}

impl ApiClient {
    pub fn auth(&self) -> AuthApi<'_> {
        AuthApi { api: self }
    }
}

impl AuthApi<'_> {
    pub async fn signup(&self, request: &SignupRequest) -> Result<User, ApiError> {
        request.validate()?;
        let data: UserEnvelope = self.api.post_json("/auth/signup", request).await?;
        Ok(data.user)
    }

    /// Log in and store the issued token in the session.
    pub async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ApiError> {
        request.validate()?;
        let data: LoginResponse = self.api.post_json("/auth/login", request).await?;

        let session = self.api.session();
        session.set_token(&data.token);
        if let Some(user) = &data.user {
            session.set_user_name(&user.name);
        }
        tracing::info!(email = %request.email, "Logged in");
        Ok(data)
    }

    /// Log out. Local session state is cleared even when the call fails.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let result = self.api.post::<Option<Ack>>("/auth/logout").await;
        self.api.session().clear();
        result.map(|_| ())
    }

    /// Current user. Refreshes the cached user name on success.
    pub async fn me(&self) -> Result<User, ApiError> {
        let data: UserEnvelope = self.api.get("/auth/me").await?;
        self.api.session().set_user_name(&data.user.name);
        Ok(data.user)
    }
}
