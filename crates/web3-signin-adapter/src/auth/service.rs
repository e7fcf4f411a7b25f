/*
[INPUT]:  Web3 credentials, provider handles and session queries
[OUTPUT]: Sessions, user records and raw service errors
[POS]:    Auth layer - boundary to the external authentication service
[UPDATE]: When the service surface used by the flow changes
*/

use async_trait::async_trait;

use crate::auth::{StatementTemplate, negotiator, statement};
use crate::error::{ServiceError, SigninError, classify_service_error};
use crate::types::{Session, UserProfile, Web3Credentials};
use crate::wallet::ProviderHandle;

/// External authentication service
///
/// Implementations return raw [`ServiceError`]s; callers classify them.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Current session, `None` when nobody is signed in
    async fn get_session(&self) -> Result<Option<Session>, ServiceError>;

    /// User behind the current session
    async fn get_user(&self) -> Result<Option<UserProfile>, ServiceError>;

    /// Exchange a signed statement for a session
    async fn sign_in_with_web3(&self, credentials: Web3Credentials) -> Result<Session, ServiceError>;

    /// Drive the wallet behind `handle` and sign in with what it signs
    ///
    /// Returns the session and the identifier that signed. The default
    /// connects, signs a statement rendered from `template`, checks the
    /// signer is still the connected account, then calls
    /// [`AuthService::sign_in_with_web3`]. Services with their own wallet
    /// handshake override it.
    async fn sign_in_with_provider(
        &self,
        handle: &ProviderHandle,
        template: &StatementTemplate,
    ) -> Result<(Session, String), SigninError> {
        let kind = handle.kind();
        let connected = negotiator::connect(handle).await?;
        let signed = statement::sign(&connected, template).await?;
        statement::verify_identifier(&signed, &connected)?;

        let identifier = signed.identifier().to_string();
        let session = self
            .sign_in_with_web3(signed.into_credentials())
            .await
            .map_err(|err| classify_service_error(err, Some(kind)))?;
        Ok((session, identifier))
    }

    async fn sign_out(&self) -> Result<(), ServiceError>;
}
