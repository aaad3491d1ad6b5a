use crate::services::jobservice::UserId;
use tonic::{Request, Status};
use tracing::debug;
use x509_parser::{certificate::X509Certificate, oid_registry::Oid, traits::FromDer};

/// The user every caller is treated as when the server does not authenticate clients.
pub const ANONYMOUS_USER: &str = "anonymous";

/// oid for the subject UID.
const SUBJECT_UID_OID: &[u64] = &[0, 9, 2342, 19200300, 100, 1, 1];

/// Set on every request by the interceptor, identifies the caller.
#[derive(Clone, Debug)]
pub struct UserExtension {
    pub user_id: UserId,
}

/// A tonic interceptor service function.
///
/// Extracts the subject uid from the client certificate and adds it to the request extensions.
pub fn extract_subj_uid(mut req: Request<()>) -> Result<Request<()>, Status> {
    let client_certs = req
        .peer_certs()
        .ok_or_else(|| Status::unauthenticated("Request missing client cert"))?;
    // rustls hands us the DER bytes
    let der = client_certs
        .first()
        .ok_or_else(|| Status::unauthenticated("Request missing client cert"))?
        .get_ref();

    let (rem, cert) =
        X509Certificate::from_der(der).map_err(|_| Status::unauthenticated("Bad client cert"))?;
    if !rem.is_empty() {
        return Err(Status::unauthenticated("Bad client cert"));
    }

    let oid = Oid::from(SUBJECT_UID_OID).map_err(|_| Status::internal("Bad subject uid oid"))?;
    let uid = cert
        .subject()
        .iter_by_oid(&oid)
        .next()
        .ok_or_else(|| Status::unauthenticated("Client cert missing subject uid"))?;
    let user = uid
        .as_str()
        .map_err(|_| Status::unauthenticated("Client cert uid must be UTF8"))?;

    debug!(user, "authenticated client");
    req.extensions_mut().insert(UserExtension {
        user_id: UserId::from(user),
    });
    Ok(req)
}

/// A tonic interceptor for plaintext servers, every caller is the anonymous user.
pub fn anonymous_user(mut req: Request<()>) -> Result<Request<()>, Status> {
    req.extensions_mut().insert(UserExtension {
        user_id: UserId::from(ANONYMOUS_USER),
    });
    Ok(req)
}
