use axum::http::HeaderMap;
use folio_domain::ClientAddress;

/// Resolves the client from the headers set by the reverse proxy.
pub(crate) fn client_address(headers: &HeaderMap) -> ClientAddress {
    let header = |name: &str| headers.get(name).and_then(|value| value.to_str().ok());

    ClientAddress::from_forwarding_headers(header("x-forwarded-for"), header("x-real-ip"))
}
